//! TCP provider implementation.
//!
//! Every pair of processes shares one stream. A process connects to every
//! lower rank and accepts a connection from every higher rank, so the mesh
//! comes up without a coordinator as long as all listeners are bound before
//! anybody gives up on connecting.
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use smpi_base::{Error, Header, P2PProvider, Result, Tag};
use smpi_runtime::Runtime;

/// How long to wait for the rest of the group to show up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Sent by the connecting side so the acceptor knows who is calling.
#[derive(Serialize, Deserialize, Debug)]
struct Hello {
    rank: u64,
    size: u64,
}

pub struct TcpP2P {
    id: u64,
    /// One stream per peer; `None` at our own index
    streams: Vec<Option<TcpStream>>,
}

impl TcpP2P {
    /// Bind this process' address from the runtime and join the mesh.
    pub fn connect(runtime: &Runtime) -> Result<TcpP2P> {
        let addr = runtime
            .address(runtime.id())
            .ok_or(Error::Unreachable(runtime.id()))?;
        let listener = TcpListener::bind(addr)?;
        TcpP2P::with_listener(runtime.id(), listener, runtime.conn_list())
    }

    /// Join the mesh using an already bound listener.
    pub fn with_listener(
        id: u64,
        listener: TcpListener,
        conn_list: &[SocketAddr],
    ) -> Result<TcpP2P> {
        let size = conn_list.len() as u64;
        if id >= size {
            return Err(Error::InvalidRank { rank: id, size });
        }
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        let mut streams: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();

        for peer in 0..id {
            let mut stream = stream_connect(conn_list[peer as usize], deadline)?;
            bincode::serialize_into(&mut stream, &Hello { rank: id, size })?;
            debug!("process {} connected to {}", id, peer);
            streams[peer as usize] = Some(stream);
        }

        listener.set_nonblocking(true)?;
        let mut pending = size - id - 1;
        while pending > 0 {
            match listener.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(false)?;
                    stream.set_nodelay(true)?;
                    let hello: Hello = bincode::deserialize_from(&stream)?;
                    if hello.size != size || hello.rank <= id || hello.rank >= size {
                        return Err(Error::Environment(format!(
                            "unexpected handshake from rank {} of {}",
                            hello.rank, hello.size
                        )));
                    }
                    let slot = &mut streams[hello.rank as usize];
                    if slot.is_some() {
                        return Err(Error::Environment(format!(
                            "rank {} connected twice",
                            hello.rank
                        )));
                    }
                    debug!("process {} accepted {}", id, hello.rank);
                    *slot = Some(stream);
                    pending -= 1;
                }
                Err(ref err) if err.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() > deadline {
                        return Err(Error::MessageTransmissionFailure(io::Error::new(
                            ErrorKind::TimedOut,
                            format!("{pending} higher ranks never connected"),
                        )));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
        info!("process {} has streams to all {} peers", id, size - 1);
        Ok(TcpP2P { id, streams })
    }

    fn stream(&self, peer: u64) -> Result<&TcpStream> {
        let size = self.size();
        if peer >= size {
            return Err(Error::InvalidRank { rank: peer, size });
        }
        self.streams[peer as usize]
            .as_ref()
            .ok_or(Error::Unreachable(peer))
    }
}

/// Attempt to connect to the stream until the deadline passes.
fn stream_connect(addr: SocketAddr, deadline: Instant) -> Result<TcpStream> {
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(err) if err.kind() == ErrorKind::ConnectionRefused && Instant::now() < deadline => {
                thread::sleep(RETRY_INTERVAL);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Map an early end of stream to the peer that went away.
fn eof_as_disconnect(err: Error, peer: u64) -> Error {
    match err {
        Error::MessageTransmissionFailure(ref io_err)
            if io_err.kind() == ErrorKind::UnexpectedEof =>
        {
            Error::Disconnected(peer)
        }
        other => other,
    }
}

impl P2PProvider for TcpP2P {
    fn id(&self) -> u64 {
        self.id
    }

    fn size(&self) -> u64 {
        self.streams.len() as u64
    }

    fn send(&self, target: u64, tag: Tag, type_id: u64, data: &[u8]) -> Result<()> {
        let mut stream = self.stream(target)?;
        let header = Header {
            source: self.id,
            tag,
            type_id,
            len: data.len() as u64,
        };
        header.write_to(&mut stream)?;
        stream.write_all(data)?;
        Ok(())
    }

    fn recv(&self, source: u64, tag: Tag, type_id: u64, data: &mut [u8]) -> Result<()> {
        let mut stream = self.stream(source)?;
        let header = Header::read_from(&mut stream).map_err(|err| eof_as_disconnect(err, source))?;
        header.check(tag, type_id, data.len())?;
        stream
            .read_exact(data)
            .map_err(|err| eof_as_disconnect(err.into(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bind every rank's listener up front so no ports are raced for.
    fn listeners(size: usize) -> (Vec<TcpListener>, Vec<SocketAddr>) {
        let listeners: Vec<TcpListener> = (0..size)
            .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
            .collect();
        let addrs = listeners.iter().map(|l| l.local_addr().unwrap()).collect();
        (listeners, addrs)
    }

    #[test]
    fn three_process_mesh_exchanges_messages() {
        let (listeners, addrs) = listeners(3);
        let handles: Vec<_> = listeners
            .into_iter()
            .enumerate()
            .map(|(id, listener)| {
                let addrs = addrs.clone();
                thread::spawn(move || {
                    let p = TcpP2P::with_listener(id as u64, listener, &addrs).unwrap();
                    let next = (p.id() + 1) % p.size();
                    let prev = (p.id() + p.size() - 1) % p.size();
                    p.send(next, 5, 1, &[p.id() as u8; 4]).unwrap();
                    let mut buf = [0u8; 4];
                    p.recv(prev, 5, 1, &mut buf).unwrap();
                    buf[0]
                })
            })
            .collect();
        let got: Vec<u8> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(got, vec![2, 0, 1]);
    }

    #[test]
    fn large_payload_arrives_intact() {
        let (mut listeners, addrs) = listeners(2);
        let l1 = listeners.pop().unwrap();
        let l0 = listeners.pop().unwrap();
        let addrs1 = addrs.clone();
        let payload: Vec<u8> = (0..1 << 20).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();
        let sender = thread::spawn(move || {
            let p = TcpP2P::with_listener(1, l1, &addrs1).unwrap();
            p.send(0, 9, 1, &payload).unwrap();
        });
        let p = TcpP2P::with_listener(0, l0, &addrs).unwrap();
        let mut buf = vec![0u8; expected.len()];
        p.recv(1, 9, 1, &mut buf).unwrap();
        sender.join().unwrap();
        assert_eq!(buf, expected);
    }

    #[test]
    fn closed_peer_is_a_disconnect() {
        let (mut listeners, addrs) = listeners(2);
        let l1 = listeners.pop().unwrap();
        let l0 = listeners.pop().unwrap();
        let addrs1 = addrs.clone();
        let peer = thread::spawn(move || {
            TcpP2P::with_listener(1, l1, &addrs1).unwrap();
        });
        let p = TcpP2P::with_listener(0, l0, &addrs).unwrap();
        peer.join().unwrap();
        let mut buf = [0u8; 1];
        assert!(matches!(p.recv(1, 0, 1, &mut buf), Err(Error::Disconnected(1))));
    }
}
