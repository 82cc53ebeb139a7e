//! Local provider implementation.
//!
//! Provides point-to-point communication between ranks that are threads of
//! the same process. Every ordered pair of ranks gets its own channel, which
//! keeps per-pair FIFO ordering.
use std::sync::mpsc::{channel, Receiver, Sender};
use smpi_base::{Error, Header, P2PProvider, Result, Tag};

struct Packet {
    header: Header,
    data: Vec<u8>,
}

pub struct ThreadP2P {
    id: u64,
    /// `senders[target]` delivers into the mailbox `target` keeps for us
    senders: Vec<Option<Sender<Packet>>>,
    /// `receivers[source]` is our mailbox for messages from `source`
    receivers: Vec<Option<Receiver<Packet>>>,
}

impl ThreadP2P {
    /// Provider for a group with only this process in it.
    pub fn single() -> ThreadP2P {
        ThreadP2P::group(1).remove(0)
    }

    /// Create the providers of a whole group, indexed by rank.
    pub fn group(size: usize) -> Vec<ThreadP2P> {
        let mut members: Vec<ThreadP2P> = (0..size)
            .map(|id| ThreadP2P {
                id: id as u64,
                senders: (0..size).map(|_| None).collect(),
                receivers: (0..size).map(|_| None).collect(),
            })
            .collect();
        for source in 0..size {
            for target in 0..size {
                if source == target {
                    continue;
                }
                let (tx, rx) = channel();
                members[source].senders[target] = Some(tx);
                members[target].receivers[source] = Some(rx);
            }
        }
        members
    }

    fn check_peer(&self, peer: u64) -> Result<usize> {
        let size = self.size();
        if peer >= size {
            return Err(Error::InvalidRank { rank: peer, size });
        }
        if peer == self.id {
            return Err(Error::Unreachable(peer));
        }
        Ok(peer as usize)
    }
}

impl P2PProvider for ThreadP2P {
    fn id(&self) -> u64 {
        self.id
    }

    fn size(&self) -> u64 {
        self.senders.len() as u64
    }

    fn send(&self, target: u64, tag: Tag, type_id: u64, data: &[u8]) -> Result<()> {
        let i = self.check_peer(target)?;
        let sender = self.senders[i].as_ref().ok_or(Error::Unreachable(target))?;
        let packet = Packet {
            header: Header {
                source: self.id,
                tag,
                type_id,
                len: data.len() as u64,
            },
            data: data.to_vec(),
        };
        sender
            .send(packet)
            .map_err(|_| Error::Disconnected(target))
    }

    fn recv(&self, source: u64, tag: Tag, type_id: u64, data: &mut [u8]) -> Result<()> {
        let i = self.check_peer(source)?;
        let receiver = self.receivers[i].as_ref().ok_or(Error::Unreachable(source))?;
        let packet = receiver.recv().map_err(|_| Error::Disconnected(source))?;
        packet.header.check(tag, type_id, data.len())?;
        data.copy_from_slice(&packet.data);
        Ok(())
    }
}
