//! Message passing runtime and process management code.
//!
//! The launcher (`smpi-exec`) hands every process its rank and the address
//! list of the whole group through the environment. A process started
//! without those variables runs as a group of one.
use std::env;
use std::net::SocketAddr;
use log::debug;
use smpi_base::{Error, Result};

/// Environment variable holding the rank of this process.
pub const RANK_VAR: &str = "SMPI_RANK";

/// Environment variable holding the comma separated `ip:port` list, one
/// entry per rank.
pub const CONN_LIST_VAR: &str = "SMPI_CONN_LIST";

#[derive(Debug, Clone)]
pub struct Runtime {
    id: u64,
    conn_list: Vec<SocketAddr>,
}

impl Runtime {
    /// Runtime for a process that was started on its own.
    pub fn single() -> Runtime {
        Runtime {
            id: 0,
            conn_list: vec![],
        }
    }

    pub fn new(id: u64, conn_list: Vec<SocketAddr>) -> Result<Runtime> {
        let size = conn_list.len() as u64;
        if id >= size {
            return Err(Error::InvalidRank { rank: id, size });
        }
        Ok(Runtime { id, conn_list })
    }

    /// Load the runtime information set by the launcher.
    pub fn from_env() -> Result<Runtime> {
        let rank = env::var(RANK_VAR).ok();
        let conn_list = env::var(CONN_LIST_VAR).ok();
        match (rank, conn_list) {
            (None, None) => {
                debug!("no launch environment, running as a single process");
                Ok(Runtime::single())
            }
            (Some(rank), Some(conn_list)) => {
                let rank = parse_rank(&rank)?;
                let conn_list = parse_conn_list(&conn_list)?;
                debug!("rank {} of {} from launch environment", rank, conn_list.len());
                Runtime::new(rank, conn_list)
            }
            _ => Err(Error::Environment(format!(
                "{RANK_VAR} and {CONN_LIST_VAR} must be set together"
            ))),
        }
    }

    /// Return number of members in the process group.
    pub fn size(&self) -> u64 {
        self.conn_list.len().max(1) as u64
    }

    /// Return the ID of this process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Address the process with the given ID listens on.
    pub fn address(&self, id: u64) -> Option<SocketAddr> {
        self.conn_list.get(id as usize).copied()
    }

    pub fn conn_list(&self) -> &[SocketAddr] {
        &self.conn_list
    }

    /// Whether the group spans more than this process.
    pub fn is_distributed(&self) -> bool {
        self.conn_list.len() > 1
    }
}

fn parse_rank(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Environment(format!("{RANK_VAR}={value:?} is not a rank")))
}

/// Parse a comma separated `ip:port` list.
pub fn parse_conn_list(value: &str) -> Result<Vec<SocketAddr>> {
    value
        .split(',')
        .map(|s| {
            s.trim()
                .parse()
                .map_err(|_| Error::Environment(format!("invalid address {s:?} in {CONN_LIST_VAR}")))
        })
        .collect()
}

/// Inverse of [`parse_conn_list`].
pub fn format_conn_list(conn_list: &[SocketAddr]) -> String {
    conn_list
        .iter()
        .map(|addr| addr.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_process_group() {
        let rt = Runtime::single();
        assert_eq!(rt.size(), 1);
        assert_eq!(rt.id(), 0);
        assert!(!rt.is_distributed());
    }

    #[test]
    fn conn_list_round_trips_through_text() {
        let list = parse_conn_list("127.0.0.1:4000, 127.0.0.1:4001").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(format_conn_list(&list), "127.0.0.1:4000,127.0.0.1:4001");
    }

    #[test]
    fn bad_address_is_an_environment_error() {
        assert!(matches!(
            parse_conn_list("127.0.0.1:4000,nope"),
            Err(Error::Environment(_))
        ));
    }

    #[test]
    fn rank_must_be_inside_the_group() {
        let list = parse_conn_list("127.0.0.1:4000,127.0.0.1:4001").unwrap();
        assert!(Runtime::new(1, list.clone()).is_ok());
        assert!(matches!(
            Runtime::new(2, list),
            Err(Error::InvalidRank { rank: 2, size: 2 })
        ));
    }
}
