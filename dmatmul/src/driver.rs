//! Process role driver.
//!
//! Every rank runs the same program; the rank decides the role. The root
//! allocates and initialises the full matrices, takes part in every
//! collective as source or sink and reports the result. Workers only ever
//! hold `B` and their own row-blocks.
use std::io::{self, Write};
use std::time::Duration;
use log::info;
use smpi::Communicator;
use crate::config::{Config, TimingMode};
use crate::distributed::{self, RootBuffers, ROOT};
use crate::{Matrix, Partition, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Root,
    Worker,
}

impl Role {
    pub fn of(comm: &Communicator) -> Role {
        if comm.is_root(ROOT) {
            Role::Root
        } else {
            Role::Worker
        }
    }
}

/// `A[i][j] = i + j`
pub fn init_a(n: usize) -> Result<Matrix> {
    Matrix::from_fn(n, n, |i, j| (i + j) as f64)
}

/// `B[i][j] = i - j`
pub fn init_b(n: usize) -> Result<Matrix> {
    Matrix::from_fn(n, n, |i, j| i as f64 - j as f64)
}

/// Result of a run as printed by the root.
#[derive(Debug)]
pub struct Report {
    pub product: Matrix,
    pub elapsed: Duration,
}

impl Report {
    /// Print the matrix (unless `print` is off) and the elapsed time.
    pub fn write<W: Write>(&self, mut w: W, print: bool) -> io::Result<()> {
        if print {
            writeln!(w, "Result Matrix C:")?;
            self.product.write_rows(&mut w)?;
        }
        writeln!(w, "Elapsed time: {:.6} seconds", self.elapsed.as_secs_f64())
    }
}

/// Run the distributed product for `config` on this rank.
///
/// Returns the report on the root and `None` on workers. The size is
/// validated against the group before any collective is entered, and every
/// rank validates the same values, so a bad size stops all of them.
pub fn run(comm: &Communicator, config: &Config) -> Result<Option<Report>> {
    let part = Partition::plan(config.size, comm.size() as usize)?;
    let role = Role::of(comm);
    info!(
        "rank {} of {} is {:?}, {} rows each",
        comm.id(),
        comm.size(),
        role,
        part.rows_per_proc()
    );

    let root = match role {
        Role::Root => Some(RootBuffers::new(init_a(part.n())?, init_b(part.n())?)?),
        Role::Worker => None,
    };
    let outcome = distributed::multiply(comm, &part, root)?;

    let elapsed = match config.timing {
        TimingMode::Compute => Some(outcome.compute),
        TimingMode::Total => Some(outcome.total),
        TimingMode::Max => comm
            .reduce(outcome.compute.as_secs_f64(), ROOT, f64::max)?
            .map(Duration::from_secs_f64),
    };

    Ok(outcome
        .product
        .zip(elapsed)
        .map(|(product, elapsed)| Report { product, elapsed }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_values() {
        let a = init_a(3).unwrap();
        let b = init_b(3).unwrap();
        assert_eq!(a.get(2, 1), Some(3.0));
        assert_eq!(b.get(2, 1), Some(1.0));
        assert_eq!(b.get(0, 2), Some(-2.0));
    }

    #[test]
    fn report_format() {
        let report = Report {
            product: Matrix::from_vec(1, 2, vec![14.0, -4.0]).unwrap(),
            elapsed: Duration::from_millis(1500),
        };
        let mut out = vec![];
        report.write(&mut out, true).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Result Matrix C:\n14.000000 -4.000000 \nElapsed time: 1.500000 seconds\n"
        );

        let mut out = vec![];
        report.write(&mut out, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Elapsed time: 1.500000 seconds\n");
    }

    #[test]
    fn roles_follow_rank() {
        let roles = smpi::run_local(3, |comm| Role::of(&comm));
        assert_eq!(roles, vec![Role::Root, Role::Worker, Role::Worker]);
    }
}
