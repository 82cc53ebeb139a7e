use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// Invalid options, e.g. a size the process count does not divide
    Config(String),

    /// A buffer could not be allocated
    Allocation { requested: usize },

    /// Operands or output of the kernel have incompatible shapes
    Dimension(String),

    /// A collective or point-to-point operation failed
    Comm(smpi::Error),

    /// Writing the result failed
    Output(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Output(_) => 1,
            Error::Config(_) => 2,
            Error::Allocation { .. } => 3,
            Error::Comm(_) => 4,
            Error::Dimension(_) => 5,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Allocation { requested } => {
                write!(f, "failed to allocate {requested} matrix elements")
            }
            Error::Dimension(msg) => write!(f, "dimension error: {msg}"),
            Error::Comm(err) => write!(f, "communication failed: {err}"),
            Error::Output(err) => write!(f, "failed to write result: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Comm(err) => Some(err),
            Error::Output(err) => Some(err),
            _ => None,
        }
    }
}

impl From<smpi::Error> for Error {
    fn from(err: smpi::Error) -> Error {
        Error::Comm(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Output(err)
    }
}
