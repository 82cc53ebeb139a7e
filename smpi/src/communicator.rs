//! Communicator with external application-level API.
use std::cell::Cell;
use smpi_base::{BufRead, BufWrite, Element, Error, P2PProvider, Result, Tag};

/// Set on tags of user point-to-point messages so they never collide with
/// collective sequence numbers.
const USER_TAG_BIT: u64 = 1 << 31;

pub struct Communicator {
    provider: Box<dyn P2PProvider>,
    /// Communicator identity, carried in the upper half of every tag
    context: u32,
    /// Collective operations issued so far; identical on every rank
    sequence: Cell<u32>,
}

impl Communicator {
    pub(crate) fn new(provider: Box<dyn P2PProvider>, context: u32) -> Communicator {
        Communicator {
            provider,
            context,
            sequence: Cell::new(0),
        }
    }

    /// Wrap a connected provider as the world communicator.
    pub fn with_provider(provider: Box<dyn P2PProvider>) -> Communicator {
        Communicator::new(provider, crate::WORLD_CONTEXT)
    }

    /// Return number of members in the process group.
    pub fn size(&self) -> u64 {
        self.provider.size()
    }

    /// Return the ID of this process.
    pub fn id(&self) -> u64 {
        self.provider.id()
    }

    /// Return the communicator identity.
    pub fn context(&self) -> u32 {
        self.context
    }

    pub fn is_root(&self, root: u64) -> bool {
        self.id() == root
    }

    /// Send a message to another process (blocking).
    pub fn send<T: Element>(&self, data: &[T], target: u64, tag: u32) -> Result<()> {
        self.check_rank(target)?;
        self.provider
            .send(target, self.user_tag(tag), T::TYPE_ID, data.bytes())
    }

    /// Receive a message from another process (blocking).
    ///
    /// The message must fill `data` exactly.
    pub fn recv<T: Element>(&self, data: &mut [T], source: u64, tag: u32) -> Result<()> {
        self.check_rank(source)?;
        self.provider
            .recv(source, self.user_tag(tag), T::TYPE_ID, data.bytes_mut())
    }

    pub(crate) fn provider(&self) -> &dyn P2PProvider {
        &*self.provider
    }

    /// Tag for the next collective operation.
    pub(crate) fn next_tag(&self) -> Tag {
        let seq = self.sequence.get();
        self.sequence.set((seq + 1) % USER_TAG_BIT as u32);
        ((self.context as u64) << 32) | seq as u64
    }

    fn user_tag(&self, tag: u32) -> Tag {
        ((self.context as u64) << 32) | USER_TAG_BIT | (tag as u64 & (USER_TAG_BIT - 1))
    }

    pub(crate) fn check_rank(&self, rank: u64) -> Result<()> {
        let size = self.size();
        if rank >= size {
            Err(Error::InvalidRank { rank, size })
        } else {
            Ok(())
        }
    }
}
