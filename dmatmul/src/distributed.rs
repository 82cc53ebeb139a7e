//! Collective coordinator.
//!
//! Drives the four phases of a distributed product over a communicator:
//! broadcast `B`, scatter row-blocks of `A`, multiply locally, gather
//! row-blocks of `C` on the root. Every phase is a synchronous collective,
//! so no rank starts a phase before the whole group has finished the
//! previous one.
use std::time::{Duration, Instant};
use log::{debug, info};
use smpi::Communicator;
use crate::{kernel, Error, Matrix, Partition, Result};

/// Rank that owns the full matrices.
pub const ROOT: u64 = 0;

/// Full matrices held by the root for the whole run.
#[derive(Debug)]
pub struct RootBuffers {
    pub a: Matrix,
    pub b: Matrix,
    /// Receives the product
    pub c: Matrix,
}

impl RootBuffers {
    /// Allocate `C` for the given operands.
    pub fn new(a: Matrix, b: Matrix) -> Result<RootBuffers> {
        let c = Matrix::zeros(a.rows(), b.cols())?;
        Ok(RootBuffers { a, b, c })
    }

    fn check(&self, n: usize) -> Result<()> {
        for (name, m) in [("A", &self.a), ("B", &self.b), ("C", &self.c)] {
            if !m.is_square_of(n) {
                return Err(Error::Dimension(format!(
                    "{name} is {}x{}, expected {n}x{n}",
                    m.rows(),
                    m.cols()
                )));
            }
        }
        Ok(())
    }
}

/// What one rank ends up with after a distributed product.
#[derive(Debug)]
pub struct Outcome {
    /// The full product, on the root only
    pub product: Option<Matrix>,
    /// Time spent in the local multiply
    pub compute: Duration,
    /// Time from the broadcast to the end of the gather
    pub total: Duration,
}

/// Replicate `B` on every rank. The root passes its operand, the others
/// `None` and get a freshly received copy.
pub fn distribute_operand(
    comm: &Communicator,
    part: &Partition,
    b: Option<Matrix>,
) -> Result<Matrix> {
    let mut b = match b {
        Some(b) => b,
        None => Matrix::zeros(part.n(), part.n())?,
    };
    comm.broadcast(b.as_mut_slice(), ROOT)?;
    debug!("rank {}: received B ({} elements)", comm.id(), part.broadcast_count());
    Ok(b)
}

/// Hand every rank its row-block of `A`; `a` is only read on the root.
pub fn distribute_rows(
    comm: &Communicator,
    part: &Partition,
    a: Option<&Matrix>,
) -> Result<Matrix> {
    let mut block = Matrix::zeros(part.rows_per_proc(), part.n())?;
    comm.scatter(a.map(Matrix::as_slice), block.as_mut_slice(), ROOT)?;
    let rows = part.row_range(comm.id() as usize);
    debug!("rank {}: received rows {}..{} of A", comm.id(), rows.start, rows.end);
    Ok(block)
}

/// Multiply a row-block against the full operand and time the multiply.
pub fn compute_block(block: &Matrix, b: &Matrix) -> Result<(Matrix, Duration)> {
    let mut c = Matrix::zeros(block.rows(), b.cols())?;
    let start = Instant::now();
    kernel::multiply_into(block.view(), b.view(), &mut c.view_mut())?;
    Ok((c, start.elapsed()))
}

/// Assemble the result blocks in rank order into `c` on the root.
pub fn collect_rows(comm: &Communicator, block: &Matrix, c: Option<&mut Matrix>) -> Result<()> {
    comm.gather(block.as_slice(), c.map(Matrix::as_mut_slice), ROOT)?;
    Ok(())
}

/// Run a whole distributed product. The root passes its buffers, every
/// other rank `None`.
pub fn multiply(
    comm: &Communicator,
    part: &Partition,
    root: Option<RootBuffers>,
) -> Result<Outcome> {
    if part.procs() as u64 != comm.size() {
        return Err(Error::Config(format!(
            "partition for {} ranks used in a group of {}",
            part.procs(),
            comm.size()
        )));
    }
    if root.is_some() != comm.is_root(ROOT) {
        return Err(Error::Config(format!(
            "rank {} disagrees about holding the full matrices",
            comm.id()
        )));
    }
    if let Some(buffers) = &root {
        buffers.check(part.n())?;
    }
    let (a, b, mut c) = match root {
        Some(RootBuffers { a, b, c }) => (Some(a), Some(b), Some(c)),
        None => (None, None, None),
    };

    let start = Instant::now();
    let b = distribute_operand(comm, part, b)?;
    let block = distribute_rows(comm, part, a.as_ref())?;
    let (c_block, compute) = compute_block(&block, &b)?;
    info!(
        "rank {}: multiplied {} rows in {:.6} s",
        comm.id(),
        block.rows(),
        compute.as_secs_f64()
    );
    collect_rows(comm, &c_block, c.as_mut())?;
    let total = start.elapsed();

    Ok(Outcome {
        product: c,
        compute,
        total,
    })
}
