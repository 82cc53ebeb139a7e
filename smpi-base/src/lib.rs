//! SMPI base data structures and traits.
use std::fmt;
use std::io;

mod buffer;
pub use buffer::{BufRead, BufWrite, Buffer, Element};
mod frame;
pub use frame::{Header, Tag};

#[derive(Debug)]
pub enum Error {
    /// Could not reach the requested process
    Unreachable(u64),

    /// Message transmission failed
    MessageTransmissionFailure(io::Error),

    /// The peer closed its end of the connection
    Disconnected(u64),

    /// Incoming message belongs to a different operation
    TagMismatch { expected: Tag, actual: Tag },

    /// Invalid type received in a message
    MessageTypeMismatch { expected: u64, actual: u64 },

    /// Invalid count of bytes received in a message (no partial receives allowed)
    MessageCountMismatch { expected: usize, actual: usize },

    /// A collective was called with a buffer of the wrong shape
    InvalidBuffer(String),

    /// Rank outside of the process group
    InvalidRank { rank: u64, size: u64 },

    /// Launch environment is missing or malformed
    Environment(String),

    /// Frame header could not be encoded or decoded
    SerializeError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unreachable(id) => write!(f, "process {id} is unreachable"),
            Error::MessageTransmissionFailure(err) => {
                write!(f, "message transmission failed: {err}")
            }
            Error::Disconnected(id) => write!(f, "process {id} disconnected"),
            Error::TagMismatch { expected, actual } => write!(
                f,
                "out of order message: expected tag {expected:#x}, got {actual:#x}"
            ),
            Error::MessageTypeMismatch { expected, actual } => write!(
                f,
                "message type mismatch: expected {expected:#x}, got {actual:#x}"
            ),
            Error::MessageCountMismatch { expected, actual } => write!(
                f,
                "message size mismatch: expected {expected} bytes, got {actual}"
            ),
            Error::InvalidBuffer(msg) => write!(f, "invalid buffer: {msg}"),
            Error::InvalidRank { rank, size } => {
                write!(f, "rank {rank} is outside of a group of size {size}")
            }
            Error::Environment(msg) => write!(f, "invalid launch environment: {msg}"),
            Error::SerializeError(msg) => write!(f, "frame encoding failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MessageTransmissionFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::MessageTransmissionFailure(err)
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Error {
        match *err {
            bincode::ErrorKind::Io(err) => Error::MessageTransmissionFailure(err),
            other => Error::SerializeError(other.to_string()),
        }
    }
}

/// Point to point provider implementation.
///
/// Messages between one pair of processes are delivered in the order they
/// were sent. Both calls block until the local buffer may be reused.
pub trait P2PProvider: Send {
    /// Return the ID of this process.
    fn id(&self) -> u64;

    /// Return number of members in the process group.
    fn size(&self) -> u64;

    /// Send `data` to `target`, labelled with `tag` and `type_id`.
    fn send(&self, target: u64, tag: Tag, type_id: u64, data: &[u8]) -> Result<()>;

    /// Receive the next message from `source` into `data`.
    ///
    /// The message must carry exactly `tag`, `type_id` and `data.len()` bytes.
    fn recv(&self, source: u64, tag: Tag, type_id: u64, data: &mut [u8]) -> Result<()>;
}
