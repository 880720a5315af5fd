//! TCP frame receiver.
//!
//! # Purpose
//!
//! Accepts exporter connections, cuts the byte stream into frames, parses
//! each frame as an [`Envelope`] and hands the result to the owner through
//! an `mpsc` channel. Used by `sfmsock listen` and by the transport tests.
//!
//! # Threads
//!
//! - one accept thread, spawned by [`FrameListener::start`];
//! - one reader thread per connection.
//!
//! Readers stop when their peer closes or the receiving end of the channel
//! is dropped.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};

use crate::core::envelope::Envelope;
use crate::core::framing::{FrameDecoder, Framing};

const READ_CHUNK: usize = 64 * 1024;

/// What the listener saw, in arrival order per connection.
#[derive(Debug)]
pub enum ListenerEvent {
    Connected { peer: SocketAddr },
    Envelope { peer: SocketAddr, envelope: Envelope },
    /// Frame that did not parse as an envelope, or a framing violation
    Invalid { peer: SocketAddr, error: String },
    Disconnected { peer: SocketAddr },
}

/// Receiver runner. Spawns background threads.
pub struct FrameListener {
    listener: TcpListener,
    framing: Framing,
    event_tx: mpsc::Sender<ListenerEvent>,
}

impl FrameListener {
    /// Bind and start accepting. Returns the bound address (useful with
    /// port 0) and the event stream.
    pub fn start(
        addr: impl ToSocketAddrs,
        framing: Framing,
    ) -> io::Result<(SocketAddr, mpsc::Receiver<ListenerEvent>)> {
        let listener = TcpListener::bind(addr)?;
        let local = listener.local_addr()?;
        let (tx, rx) = mpsc::channel();

        let server = FrameListener {
            listener,
            framing,
            event_tx: tx,
        };

        info!("Listening on {} ({} framing)", local, framing);
        thread::spawn(move || {
            server.run();
        });

        Ok((local, rx))
    }

    fn run(self) {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let tx = self.event_tx.clone();
                    let framing = self.framing;
                    thread::spawn(move || Self::handle_connection(stream, framing, tx));
                }
                Err(e) => warn!("Accept failed: {}", e),
            }
        }
    }

    fn handle_connection(mut stream: TcpStream, framing: Framing, tx: mpsc::Sender<ListenerEvent>) {
        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => {
                warn!("Dropping connection without peer address: {}", e);
                return;
            }
        };
        info!("Client connected: {}", peer);
        if tx.send(ListenerEvent::Connected { peer }).is_err() {
            return;
        }

        let mut decoder = FrameDecoder::new(framing);
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Read from {} failed: {}", peer, e);
                    break;
                }
            };
            decoder.push(&buf[..n]);

            loop {
                let event = match decoder.next_frame() {
                    Ok(Some(frame)) => match Envelope::from_json(&frame) {
                        Ok(envelope) => ListenerEvent::Envelope { peer, envelope },
                        Err(e) => ListenerEvent::Invalid {
                            peer,
                            error: e.to_string(),
                        },
                    },
                    Ok(None) => break,
                    Err(e) => {
                        // Stream position is lost, nothing after this can be trusted.
                        let _ = tx.send(ListenerEvent::Invalid {
                            peer,
                            error: e.to_string(),
                        });
                        let _ = tx.send(ListenerEvent::Disconnected { peer });
                        return;
                    }
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
        }

        info!("Client disconnected: {}", peer);
        let _ = tx.send(ListenerEvent::Disconnected { peer });
    }
}
