//! Collective operations: barrier, broadcast, scatter, gather and reduce.
//!
//! All of them use flat (root talks to every rank) algorithms and are
//! synchronous: every one of them ends with a barrier, so no rank leaves a
//! collective before the whole group has completed it.
use log::debug;
use smpi_base::{BufRead, BufWrite, Element, Error, Result};
use crate::Communicator;

impl Communicator {
    /// Block until every rank of the group has entered the barrier.
    pub fn barrier(&self) -> Result<()> {
        let tag = self.next_tag();
        let size = self.size();
        if size == 1 {
            return Ok(());
        }
        let provider = self.provider();
        let mut token = [0u8];
        if self.id() == 0 {
            for rank in 1..size {
                provider.recv(rank, tag, u8::TYPE_ID, &mut token)?;
            }
            for rank in 1..size {
                provider.send(rank, tag, u8::TYPE_ID, &token)?;
            }
        } else {
            provider.send(0, tag, u8::TYPE_ID, &token)?;
            provider.recv(0, tag, u8::TYPE_ID, &mut token)?;
        }
        Ok(())
    }

    /// Copy `buf` from `root` into `buf` on every other rank.
    ///
    /// Every rank must pass a buffer of the same length.
    pub fn broadcast<T: Element>(&self, buf: &mut [T], root: u64) -> Result<()> {
        self.check_rank(root)?;
        let tag = self.next_tag();
        let provider = self.provider();
        if self.is_root(root) {
            for rank in (0..self.size()).filter(|&r| r != root) {
                provider.send(rank, tag, T::TYPE_ID, buf.bytes())?;
            }
        } else {
            provider.recv(root, tag, T::TYPE_ID, buf.bytes_mut())?;
        }
        debug!("rank {}: broadcast of {} elements done", self.id(), buf.len());
        self.barrier()
    }

    /// Split `send` on `root` into `size` chunks of `recv.len()` elements
    /// and deliver chunk `i` into `recv` on rank `i`, root included.
    ///
    /// `send` is only read on the root and may be `None` elsewhere.
    pub fn scatter<T: Element>(&self, send: Option<&[T]>, recv: &mut [T], root: u64) -> Result<()> {
        self.check_rank(root)?;
        let tag = self.next_tag();
        let provider = self.provider();
        let chunk = recv.len();
        if self.is_root(root) {
            let send = send.ok_or_else(|| missing_buffer("scatter send"))?;
            self.check_root_len(send.len(), chunk, "scatter send")?;
            for rank in 0..self.size() {
                let part = &send[rank as usize * chunk..(rank as usize + 1) * chunk];
                if rank == root {
                    recv.copy_from_slice(part);
                } else {
                    provider.send(rank, tag, T::TYPE_ID, part.bytes())?;
                }
            }
        } else {
            provider.recv(root, tag, T::TYPE_ID, recv.bytes_mut())?;
        }
        debug!("rank {}: scatter of {} elements done", self.id(), chunk);
        self.barrier()
    }

    /// Inverse of [`Communicator::scatter`]: `send` from rank `i` lands at
    /// offset `i * send.len()` of `recv` on `root`.
    ///
    /// `recv` is only written on the root and may be `None` elsewhere.
    pub fn gather<T: Element>(&self, send: &[T], recv: Option<&mut [T]>, root: u64) -> Result<()> {
        self.check_rank(root)?;
        let tag = self.next_tag();
        let provider = self.provider();
        let chunk = send.len();
        if self.is_root(root) {
            let recv = recv.ok_or_else(|| missing_buffer("gather receive"))?;
            self.check_root_len(recv.len(), chunk, "gather receive")?;
            for rank in 0..self.size() {
                let part = &mut recv[rank as usize * chunk..(rank as usize + 1) * chunk];
                if rank == root {
                    part.copy_from_slice(send);
                } else {
                    provider.recv(rank, tag, T::TYPE_ID, part.bytes_mut())?;
                }
            }
        } else {
            provider.send(root, tag, T::TYPE_ID, send.bytes())?;
        }
        debug!("rank {}: gather of {} elements done", self.id(), chunk);
        self.barrier()
    }

    /// Combine one value per rank with `op` on `root`.
    ///
    /// Returns `Some` on the root and `None` elsewhere.
    pub fn reduce<T, F>(&self, value: T, root: u64, op: F) -> Result<Option<T>>
    where
        T: Element,
        F: Fn(T, T) -> T,
    {
        if self.is_root(root) {
            let mut values = vec![T::default(); self.size() as usize];
            self.gather(&[value], Some(&mut values[..]), root)?;
            Ok(values.into_iter().reduce(op))
        } else {
            self.gather(&[value], None, root)?;
            Ok(None)
        }
    }

    /// Check the size of the full buffer a root passes to scatter or gather.
    fn check_root_len(&self, len: usize, chunk: usize, what: &str) -> Result<()> {
        let expected = chunk * self.size() as usize;
        if len != expected {
            return Err(Error::InvalidBuffer(format!(
                "{what} buffer holds {len} elements, expected {expected}"
            )));
        }
        Ok(())
    }
}

fn missing_buffer(what: &str) -> Error {
    Error::InvalidBuffer(format!("root has no {what} buffer"))
}

#[cfg(test)]
mod tests {
    use crate::run_local;
    use smpi_base::Error;

    #[test]
    fn broadcast_copies_root_buffer() {
        for root in 0..3 {
            let results = run_local(3, |comm| {
                let mut buf = if comm.is_root(root) {
                    vec![1.0f64, 2.0, 3.0]
                } else {
                    vec![0.0; 3]
                };
                comm.broadcast(&mut buf, root).unwrap();
                buf
            });
            for buf in results {
                assert_eq!(buf, vec![1.0, 2.0, 3.0]);
            }
        }
    }

    #[test]
    fn scatter_hands_out_chunks_by_rank() {
        let results = run_local(4, |comm| {
            let send: Vec<u64> = (0..8).collect();
            let mut recv = [0u64; 2];
            let send = comm.is_root(0).then_some(&send[..]);
            comm.scatter(send, &mut recv, 0).unwrap();
            recv
        });
        assert_eq!(results, vec![[0, 1], [2, 3], [4, 5], [6, 7]]);
    }

    #[test]
    fn gather_orders_chunks_by_rank() {
        let results = run_local(3, |comm| {
            let send = [comm.id() as i32 * 10, comm.id() as i32 * 10 + 1];
            if comm.is_root(1) {
                let mut recv = vec![0i32; 6];
                comm.gather(&send, Some(&mut recv[..]), 1).unwrap();
                Some(recv)
            } else {
                comm.gather(&send, None, 1).unwrap();
                None
            }
        });
        assert_eq!(results[1], Some(vec![0, 1, 10, 11, 20, 21]));
        assert!(results[0].is_none() && results[2].is_none());
    }

    #[test]
    fn reduce_finds_the_maximum() {
        let results = run_local(4, |comm| {
            let value = [0.5f64, 3.0, 1.0, 2.0][comm.id() as usize];
            comm.reduce(value, 0, f64::max).unwrap()
        });
        assert_eq!(results, vec![Some(3.0), None, None, None]);
    }

    #[test]
    fn single_rank_collectives_are_local() {
        let results = run_local(1, |comm| {
            let mut b = [4.0f64];
            comm.broadcast(&mut b, 0).unwrap();
            let mut part = [0.0f64; 2];
            comm.scatter(Some(&[1.0, 2.0][..]), &mut part, 0).unwrap();
            let mut all = [0.0f64; 2];
            comm.gather(&part, Some(&mut all[..]), 0).unwrap();
            comm.barrier().unwrap();
            (b[0], all)
        });
        assert_eq!(results[0], (4.0, [1.0, 2.0]));
    }

    #[test]
    fn mis_sized_scatter_fails_the_group() {
        let results = run_local(2, |comm| {
            let mut recv = [0.0f64; 2];
            if comm.is_root(0) {
                comm.scatter(Some(&[1.0, 2.0, 3.0][..]), &mut recv, 0)
            } else {
                comm.scatter(None, &mut recv, 0)
            }
        });
        assert!(matches!(results[0], Err(Error::InvalidBuffer(_))));
        // The root bailed out and dropped its channels.
        assert!(matches!(results[1], Err(Error::Disconnected(0))));
    }

    #[test]
    fn root_without_gather_buffer_is_rejected() {
        let results = run_local(1, |comm| comm.gather(&[1u8], None, 0));
        assert!(matches!(results[0], Err(Error::InvalidBuffer(_))));
    }

    #[test]
    fn collectives_out_of_order_are_detected() {
        let results = run_local(2, |comm| {
            if comm.is_root(0) {
                let mut buf = [1.0f64];
                comm.broadcast(&mut buf, 0)
            } else {
                comm.gather(&[1u8], None, 0)
            }
        });
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[test]
    fn empty_chunks_still_complete() {
        let results = run_local(3, |comm| {
            let mut recv: [f64; 0] = [];
            let send: Option<&[f64]> = comm.is_root(0).then_some(&[][..]);
            comm.scatter(send, &mut recv, 0)
        });
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn root_outside_the_group() {
        let results = run_local(2, |comm| {
            let mut buf = [0u8];
            comm.broadcast(&mut buf, 5)
        });
        for res in results {
            assert!(matches!(res, Err(Error::InvalidRank { rank: 5, size: 2 })));
        }
    }
}
