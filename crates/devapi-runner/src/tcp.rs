//! TCP transport.
//!
//! A tokio task accepts API clients and runs one I/O task per socket. Each
//! accepted socket is handed to the synchronous main loop as a
//! [`TcpTransport`]; bytes cross between the two sides over channels, so the
//! server's tick never touches the socket.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use devapi_server::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Bytes a transport may have queued for the socket before `space()` is 0.
pub const TX_BUFFER_BYTES: usize = 8192;
/// Chunks buffered from the socket towards the main loop.
const RX_CHANNEL_CAPACITY: usize = 256;
/// Frames buffered towards the socket.
const TX_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Transport
// ============================================================================

/// Main-loop side of one TCP client.
#[derive(Debug)]
pub struct TcpTransport {
    peer: SocketAddr,
    tx: Option<mpsc::Sender<Vec<u8>>>,
    rx: mpsc::Receiver<Vec<u8>>,
    connected: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
}

impl Transport for TcpTransport {
    fn peer(&self) -> String {
        self.peer.to_string()
    }

    fn is_connected(&self) -> bool {
        self.tx.is_some() && self.connected.load(Ordering::Acquire)
    }

    fn space(&self) -> usize {
        if self.tx.is_none() {
            return 0;
        }
        TX_BUFFER_BYTES.saturating_sub(self.pending.load(Ordering::Acquire))
    }

    fn write(&mut self, header: &[u8], payload: &[u8]) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        let mut frame = Vec::with_capacity(header.len() + payload.len());
        frame.extend_from_slice(header);
        frame.extend_from_slice(payload);
        let len = frame.len();

        match tx.try_send(frame) {
            Ok(()) => {
                self.pending.fetch_add(len, Ordering::AcqRel);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => false,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.connected.store(false, Ordering::Release);
                false
            }
        }
    }

    fn close(&mut self) {
        // The I/O task flushes what is queued, then drops the socket.
        self.tx = None;
    }

    fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Accept loop bridged to the synchronous main loop.
pub struct TcpServer {
    runtime: tokio::runtime::Handle,
    accepted: Receiver<TcpTransport>,
    local_addr: SocketAddr,
}

impl TcpServer {
    /// Bind `addr` and start accepting on `runtime`.
    pub fn start(runtime: tokio::runtime::Handle, addr: SocketAddr) -> io::Result<Self> {
        let listener = runtime.block_on(TcpListener::bind(addr))?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = crossbeam_channel::unbounded();

        let handle = runtime.clone();
        runtime.spawn(async move {
            if let Err(e) = run_listener(listener, tx, handle).await {
                warn!("API listener stopped: {}", e);
            }
        });

        Ok(TcpServer {
            runtime,
            accepted: rx,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn runtime(&self) -> &tokio::runtime::Handle {
        &self.runtime
    }

    /// Next accepted client, if any.
    pub fn try_accept(&self) -> Option<TcpTransport> {
        self.accepted.try_recv().ok()
    }
}

async fn run_listener(
    listener: TcpListener,
    accepted: Sender<TcpTransport>,
    runtime: tokio::runtime::Handle,
) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        stream.set_nodelay(true)?;
        debug!("TCP client {} connected", peer);

        let (tx_sender, tx_receiver) = mpsc::channel::<Vec<u8>>(TX_CHANNEL_CAPACITY);
        let (rx_sender, rx_receiver) = mpsc::channel::<Vec<u8>>(RX_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));
        let pending = Arc::new(AtomicUsize::new(0));

        let transport = TcpTransport {
            peer,
            tx: Some(tx_sender),
            rx: rx_receiver,
            connected: connected.clone(),
            pending: pending.clone(),
        };
        if accepted.send(transport).is_err() {
            // Main loop is gone.
            return Ok(());
        }

        runtime.spawn(async move {
            if let Err(e) = handle_connection(stream, tx_receiver, rx_sender, &pending).await {
                debug!("TCP client {} error: {}", peer, e);
            }
            connected.store(false, Ordering::Release);
            debug!("TCP client {} disconnected", peer);
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    mut tx_receiver: mpsc::Receiver<Vec<u8>>,
    rx_sender: mpsc::Sender<Vec<u8>>,
    pending: &AtomicUsize,
) -> io::Result<()> {
    let (mut reader, mut writer) = stream.split();
    let mut read_buf = [0u8; 1024];

    loop {
        tokio::select! {
            result = reader.read(&mut read_buf) => {
                let n = result?;
                if n == 0 {
                    return Ok(());
                }
                if rx_sender.send(read_buf[..n].to_vec()).await.is_err() {
                    return Ok(());
                }
            }

            frame = tx_receiver.recv() => {
                let Some(frame) = frame else {
                    // Transport closed by the server.
                    writer.shutdown().await?;
                    return Ok(());
                };
                writer.write_all(&frame).await?;
                writer.flush().await?;
                pending.fetch_sub(frame.len(), Ordering::AcqRel);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::time::{Duration, Instant};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> T {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(v) = poll() {
                return v;
            }
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_bytes_cross_both_ways() {
        let rt = runtime();
        let server = TcpServer::start(rt.handle().clone(), "127.0.0.1:0".parse().unwrap()).unwrap();
        let mut client = std::net::TcpStream::connect(server.local_addr()).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        let mut transport = wait_for(|| server.try_accept());
        assert!(transport.is_connected());
        assert_eq!(transport.space(), TX_BUFFER_BYTES);

        client.write_all(&[0x00, 0x00, 0x07]).unwrap();
        let received = wait_for(|| transport.try_recv());
        assert_eq!(received, vec![0x00, 0x00, 0x07]);

        assert!(transport.write(&[0x00, 0x00], &[0x08]));
        let mut buf = [0u8; 3];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x00, 0x00, 0x08]);
        wait_for(|| (transport.space() == TX_BUFFER_BYTES).then_some(()));
    }

    #[test]
    fn test_close_shuts_socket() {
        let rt = runtime();
        let server = TcpServer::start(rt.handle().clone(), "127.0.0.1:0".parse().unwrap()).unwrap();
        let mut client = std::net::TcpStream::connect(server.local_addr()).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        let mut transport = wait_for(|| server.try_accept());
        transport.close();
        assert!(!transport.is_connected());
        assert_eq!(transport.space(), 0);
        assert!(!transport.write(&[0], &[]));

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_client_hangup_is_seen() {
        let rt = runtime();
        let server = TcpServer::start(rt.handle().clone(), "127.0.0.1:0".parse().unwrap()).unwrap();
        let client = std::net::TcpStream::connect(server.local_addr()).unwrap();
        let transport = wait_for(|| server.try_accept());
        drop(client);
        wait_for(|| (!transport.is_connected()).then_some(()));
    }
}
