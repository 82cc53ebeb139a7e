//! Local node parallel process executor.
//!
//! Starts `proc_count` copies of a program, each with its rank and the
//! address list of the whole group in the environment. If any copy fails the
//! rest are terminated, since the survivors would block forever in their
//! next collective.
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::process::{self, Child, Command, ExitStatus};
use std::thread;
use std::time::Duration;
use clap::Parser;
use log::{error, info, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use smpi_runtime::{format_conn_list, CONN_LIST_VAR, RANK_VAR};

const DEFAULT_PROC_COUNT: u64 = 2;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of processes to spawn on this node
    #[arg(short = 'n', long = "np")]
    proc_count: Option<u64>,

    /// Address the processes listen on for each other
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// Binary to run followed by its arguments, passed through untouched
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

/// Reserve one free port per process.
///
/// All listeners are held until every port is known so no two ranks get the
/// same one.
fn allocate_addresses(host: IpAddr, count: u64) -> io::Result<Vec<SocketAddr>> {
    let listeners = (0..count)
        .map(|_| TcpListener::bind((host, 0)))
        .collect::<io::Result<Vec<_>>>()?;
    listeners.iter().map(|l| l.local_addr()).collect()
}

/// Exit code to report for a finished child.
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

fn terminate(children: &mut [Option<Child>]) {
    for (proc_id, child) in children.iter_mut().enumerate() {
        if let Some(child) = child.take() {
            warn!("terminating process {}", proc_id);
            if let Err(err) = signal::kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
                warn!("failed to signal process {}: {}", proc_id, err);
            }
            reap(child, proc_id);
        }
    }
}

fn reap(mut child: Child, proc_id: usize) {
    if let Err(err) = child.wait() {
        warn!("failed to await process {}: {}", proc_id, err);
    }
}

fn run(args: Args) -> io::Result<i32> {
    let Some((binary, binary_args)) = args.command.split_first() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "no binary given"));
    };
    let proc_count = args.proc_count.unwrap_or(DEFAULT_PROC_COUNT).max(1);
    let conn_list = format_conn_list(&allocate_addresses(args.host, proc_count)?);
    info!("group of {} on {}", proc_count, conn_list);

    let mut children = vec![];
    for proc_id in 0..proc_count {
        info!("starting process {}", proc_id);
        let spawned = Command::new(binary)
            .args(binary_args)
            .env(RANK_VAR, proc_id.to_string())
            .env(CONN_LIST_VAR, &conn_list)
            .spawn();
        match spawned {
            Ok(child) => children.push(Some(child)),
            Err(err) => {
                terminate(&mut children);
                return Err(err);
            }
        }
    }

    // Wait for all children, stopping the group at the first failure
    let mut running = children.len();
    while running > 0 {
        for proc_id in 0..children.len() {
            let Some(child) = children[proc_id].as_mut() else {
                continue;
            };
            let status = match child.try_wait() {
                Ok(Some(status)) => status,
                Ok(None) => continue,
                Err(err) => {
                    error!("cannot poll process {}: {}", proc_id, err);
                    terminate(&mut children);
                    return Err(err);
                }
            };
            children[proc_id] = None;
            running -= 1;
            info!("child process {} completed with {}", proc_id, status);
            if !status.success() {
                error!("process {} failed, stopping the group", proc_id);
                terminate(&mut children);
                return Ok(exit_code(status));
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(0)
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => process::exit(code),
        Err(err) => {
            error!("launch failed: {}", err);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_flags_are_forwarded() {
        let args = Args::try_parse_from(["smpi-exec", "-n", "3", "dmatmul", "-n", "6"]).unwrap();
        assert_eq!(args.proc_count, Some(3));
        assert_eq!(args.command, ["dmatmul", "-n", "6"]);

        let args = Args::try_parse_from(["smpi-exec", "dmatmul", "--np", "2", "-q"]).unwrap();
        assert_eq!(args.proc_count, None);
        assert_eq!(args.command, ["dmatmul", "--np", "2", "-q"]);
    }

    #[test]
    fn binary_is_required() {
        assert!(Args::try_parse_from(["smpi-exec", "-n", "2"]).is_err());
    }
}
