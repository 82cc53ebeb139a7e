//! Dense matrix multiplication, sequential and distributed over an smpi
//! process group.
//!
//! The root rank owns the full operands. It broadcasts `B`, scatters the
//! rows of `A`, every rank multiplies its row-block against `B`, and the
//! root gathers the blocks of `C` back in rank order.

pub mod config;
pub mod distributed;
pub mod driver;
mod error;
pub mod kernel;
pub mod matrix;
pub mod partition;

pub use error::{Error, Result};
pub use matrix::{Matrix, MatrixView, MatrixViewMut};
pub use partition::Partition;
