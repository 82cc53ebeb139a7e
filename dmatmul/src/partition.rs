//! Partition planner: which rows of the operand each rank owns.
use std::ops::Range;
use crate::{Error, Result};

/// Equal row-blocks of an `n x n` matrix over `procs` ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    n: usize,
    procs: usize,
    rows_per_proc: usize,
}

impl Partition {
    /// Plan the split, rejecting sizes that would leave rows over.
    pub fn plan(n: usize, procs: usize) -> Result<Partition> {
        if n == 0 {
            return Err(Error::Config("matrix size must be positive".to_string()));
        }
        if procs == 0 {
            return Err(Error::Config("process group is empty".to_string()));
        }
        if n % procs != 0 {
            return Err(Error::Config(format!(
                "matrix size {n} is not divisible by the process count {procs}"
            )));
        }
        if n.checked_mul(n).is_none() {
            return Err(Error::Config(format!("matrix size {n} is too large")));
        }
        Ok(Partition {
            n,
            procs,
            rows_per_proc: n / procs,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn procs(&self) -> usize {
        self.procs
    }

    pub fn rows_per_proc(&self) -> usize {
        self.rows_per_proc
    }

    /// Elements in the broadcast operand.
    pub fn broadcast_count(&self) -> usize {
        self.n * self.n
    }

    /// Elements in one scattered or gathered row-block.
    pub fn block_count(&self) -> usize {
        self.rows_per_proc * self.n
    }

    /// Rows of the full matrix owned by `rank`.
    pub fn row_range(&self, rank: usize) -> Range<usize> {
        let start = rank * self.rows_per_proc;
        start..start + self.rows_per_proc
    }
}
