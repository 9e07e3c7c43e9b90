//! Collaborator interfaces: the byte transport under each connection and the
//! clock driving the server.
//!
//! The server never touches sockets. Whatever owns the socket copies received
//! bytes into the transport, and the server drains them from inside its tick.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Byte stream under one API connection.
pub trait Transport: Send {
    /// Remote address, used in log messages.
    fn peer(&self) -> String;

    /// Whether the remote side is still there.
    fn is_connected(&self) -> bool;

    /// Bytes that can be written right now without blocking.
    fn space(&self) -> usize;

    /// Queue one frame. Header and payload go out back to back.
    fn write(&mut self, header: &[u8], payload: &[u8]) -> bool;

    /// Close the stream. Further writes fail.
    fn close(&mut self);

    /// Next chunk of received bytes, if any.
    fn try_recv(&mut self) -> Option<Vec<u8>>;
}

/// Millisecond time source.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

/// Monotonic clock counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Default room reported by a fresh [`MemoryTransport`].
pub const MEMORY_TRANSPORT_SPACE: usize = 4096;

#[derive(Debug)]
struct MemoryState {
    inbound: VecDeque<Vec<u8>>,
    outbound: Vec<u8>,
    space: usize,
    connected: bool,
    closed: bool,
}

/// In-process transport. The server side is handed to
/// [`crate::Server::accept`]; the [`MemoryPeer`] plays the client.
#[derive(Debug)]
pub struct MemoryTransport {
    peer: String,
    state: Arc<Mutex<MemoryState>>,
}

/// Client end of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// Create a connected pair.
    pub fn pair(peer: impl Into<String>) -> (MemoryTransport, MemoryPeer) {
        let state = Arc::new(Mutex::new(MemoryState {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            space: MEMORY_TRANSPORT_SPACE,
            connected: true,
            closed: false,
        }));
        (
            MemoryTransport {
                peer: peer.into(),
                state: state.clone(),
            },
            MemoryPeer { state },
        )
    }
}

impl Transport for MemoryTransport {
    fn peer(&self) -> String {
        self.peer.clone()
    }

    fn is_connected(&self) -> bool {
        let state = self.state.lock();
        state.connected && !state.closed
    }

    fn space(&self) -> usize {
        self.state.lock().space
    }

    fn write(&mut self, header: &[u8], payload: &[u8]) -> bool {
        let mut state = self.state.lock();
        if state.closed || !state.connected {
            return false;
        }
        state.outbound.extend_from_slice(header);
        state.outbound.extend_from_slice(payload);
        true
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }

    fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.state.lock().inbound.pop_front()
    }
}

impl MemoryPeer {
    /// Deliver bytes to the server side.
    pub fn send(&self, data: &[u8]) {
        self.state.lock().inbound.push_back(data.to_vec());
    }

    /// Take everything the server has written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().outbound)
    }

    /// Set the room the server sees on its next write.
    pub fn set_space(&self, space: usize) {
        self.state.lock().space = space;
    }

    /// Drop the connection from the client side.
    pub fn disconnect(&self) {
        self.state.lock().connected = false;
    }

    /// Whether the server closed its end.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
