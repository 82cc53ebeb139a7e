//! Message framing shared by the point-to-point providers.
use std::io::{Read, Write};
use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Message tag. Communicators pack their context ID and an operation
/// sequence number into it.
pub type Tag = u64;

/// Header sent in front of every payload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Rank of the sending process
    pub source: u64,
    pub tag: Tag,
    pub type_id: u64,
    /// Payload length in bytes
    pub len: u64,
}

impl Header {
    /// Check an incoming header against what the receiver posted.
    pub fn check(&self, tag: Tag, type_id: u64, len: usize) -> Result<()> {
        if self.tag != tag {
            return Err(Error::TagMismatch {
                expected: tag,
                actual: self.tag,
            });
        }
        if self.type_id != type_id {
            return Err(Error::MessageTypeMismatch {
                expected: type_id,
                actual: self.type_id,
            });
        }
        if self.len as usize != len {
            return Err(Error::MessageCountMismatch {
                expected: len,
                actual: self.len as usize,
            });
        }
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Header> {
        Ok(bincode::deserialize_from(reader)?)
    }
}
