//! Outbound stream session.
//!
//! # Lifecycle
//!
//! ```text
//! SessionSlot (empty) ──connect──▶ SessionSlot (active) ──close / drop──▶ empty
//!                                        │
//!                                 transmit × N
//! ```
//!
//! A [`SessionSlot`] holds at most one [`Session`]. Connecting while a session
//! is active is a logged no-op that hands back the existing session, so a
//! caller can never end up with two sockets to the receiver. Closing an empty
//! slot does nothing. Dropping a session shuts the socket down.
//!
//! Every connect is bounded by `connect_timeout`, every write syscall by
//! `send_timeout`.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::Endpoint;
use crate::entities::traits::Host;

use super::envelope::{Envelope, EnvelopeKind};
use super::error::{ConnectError, TransmitError};
use super::framing::Framing;
use super::serializer::GraphSerializer;

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default send timeout
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    /// Bound on each `write` syscall, not on the whole envelope: a large
    /// envelope drained slowly by the peer can take several multiples of
    /// this before `TransmitError::Timeout`. Zero means writes may block
    /// indefinitely.
    pub send_timeout: Duration,
    pub framing: Framing,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            framing: Framing::default(),
        }
    }
}

/// One open connection to a receiver.
#[derive(Debug)]
pub struct Session {
    stream: TcpStream,
    endpoint: Endpoint,
    peer: SocketAddr,
    options: SessionOptions,
    frames_sent: u64,
}

impl Session {
    fn open(endpoint: &Endpoint, options: &SessionOptions) -> Result<Self, ConnectError> {
        let addrs: Vec<SocketAddr> = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|source| ConnectError::Resolve {
                endpoint: endpoint.to_string(),
                source,
            })?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            debug!("Connecting to {} ({})", endpoint, addr);
            match TcpStream::connect_timeout(&addr, options.connect_timeout) {
                Ok(stream) => return Self::configure(stream, endpoint, addr, options),
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(ConnectError::Unreachable {
            endpoint: endpoint.to_string(),
            source: last_err
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")),
        })
    }

    fn configure(
        stream: TcpStream,
        endpoint: &Endpoint,
        peer: SocketAddr,
        options: &SessionOptions,
    ) -> Result<Self, ConnectError> {
        let send_timeout = (!options.send_timeout.is_zero()).then_some(options.send_timeout);
        stream
            .set_write_timeout(send_timeout)
            .and_then(|()| stream.set_nodelay(true))
            .map_err(|source| ConnectError::Socket {
                endpoint: endpoint.to_string(),
                source,
            })?;
        info!("Connected to {} ({}, {} framing)", endpoint, peer, options.framing);
        Ok(Self {
            stream,
            endpoint: endpoint.clone(),
            peer,
            options: *options,
            frames_sent: 0,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn framing(&self) -> Framing {
        self.options.framing
    }

    /// Envelopes written so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Snapshot `frame` from the host and send it.
    pub fn transmit<H: Host + ?Sized>(
        &mut self,
        kind: EnvelopeKind,
        frame: i32,
        host: &H,
        serializer: &GraphSerializer,
    ) -> Result<(), TransmitError> {
        let envelope = Envelope::capture(kind, frame, host, serializer)?;
        self.send(&envelope)
    }

    /// Encode, frame and write one envelope with a single `write_all`.
    pub fn send(&mut self, envelope: &Envelope) -> Result<(), TransmitError> {
        let payload = envelope.to_json()?;
        let framed = self.options.framing.encode(&payload)?;
        self.stream
            .write_all(&framed)
            .and_then(|()| self.stream.flush())
            .map_err(|e| TransmitError::from_io(e, &self.endpoint.to_string(), self.options.send_timeout))?;
        self.frames_sent += 1;
        debug!(
            "Sent {} frame {} ({} bytes) to {}",
            envelope.kind,
            envelope.current_frame,
            framed.len(),
            self.endpoint
        );
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            // Peer already gone
            debug!("Shutdown of {} failed: {}", self.endpoint, e);
        }
        info!("Disconnected from {} ({} frames sent)", self.endpoint, self.frames_sent);
    }
}

/// Holder of the one active session.
#[derive(Debug, Default)]
pub struct SessionSlot {
    active: Option<Session>,
    options: SessionOptions,
}

impl SessionSlot {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            active: None,
            options,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Options for the next connection. The active session keeps its own.
    pub fn set_options(&mut self, options: SessionOptions) {
        self.options = options;
    }

    /// Open a session, or return the one already active.
    ///
    /// When a session is active `endpoint` is ignored.
    pub fn connect(&mut self, endpoint: &Endpoint) -> Result<&mut Session, ConnectError> {
        let session = match self.active.take() {
            Some(existing) => {
                if existing.endpoint() != endpoint {
                    warn!(
                        "Already connected to {}, ignoring request for {}",
                        existing.endpoint(),
                        endpoint
                    );
                } else {
                    info!("Already connected to {}", existing.endpoint());
                }
                existing
            }
            None => Session::open(endpoint, &self.options)?,
        };
        Ok(self.active.insert(session))
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.active.as_mut()
    }

    /// Close the active session. Returns `false` if there was none.
    pub fn close(&mut self) -> bool {
        match self.active.take() {
            Some(session) => {
                drop(session);
                true
            }
            None => {
                debug!("Close requested with no active session");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExportError;
    use crate::core::export::{Exporter, Pacing, Toggle};
    use crate::core::test_support::{RecordingHost, TestScene, two_clip_scene};
    use crate::entities::attrs::{AttrValue, Attrs};
    use crate::entities::graph::Graph;
    use crate::server::{FrameListener, ListenerEvent};
    use std::net::TcpListener;
    use std::time::Instant;
    use std::sync::mpsc::Receiver;

    const WAIT: Duration = Duration::from_secs(5);

    fn listener(framing: Framing) -> (Endpoint, Receiver<ListenerEvent>) {
        let (addr, rx) = FrameListener::start("127.0.0.1:0", framing).expect("listener should start");
        (Endpoint::new("127.0.0.1", addr.port()), rx)
    }

    fn next_envelope(rx: &Receiver<ListenerEvent>) -> Envelope {
        loop {
            match rx.recv_timeout(WAIT).expect("event expected") {
                ListenerEvent::Envelope { envelope, .. } => return envelope,
                ListenerEvent::Invalid { error, .. } => panic!("invalid frame: {error}"),
                _ => continue,
            }
        }
    }

    #[test]
    fn test_transmit_reaches_receiver() {
        for framing in [Framing::LengthPrefixed, Framing::Delimited] {
            let (endpoint, rx) = listener(framing);
            let mut slot = SessionSlot::new(SessionOptions {
                framing,
                ..Default::default()
            });
            let host = RecordingHost::new(two_clip_scene());

            let session = slot.connect(&endpoint).unwrap();
            session
                .transmit(EnvelopeKind::FrameCommit, 30, &host, &GraphSerializer::default())
                .unwrap();
            assert_eq!(session.frames_sent(), 1);

            let envelope = next_envelope(&rx);
            assert_eq!(envelope.kind, EnvelopeKind::FrameCommit);
            assert_eq!(envelope.current_frame, 30);
            assert_eq!(envelope.film_clip.unwrap()["name"], "shot2");
        }
    }

    #[test]
    fn test_connect_is_idempotent() {
        let (endpoint, rx) = listener(Framing::LengthPrefixed);
        let mut slot = SessionSlot::default();

        let first = slot.connect(&endpoint).unwrap().peer();
        let second = slot.connect(&endpoint).unwrap().peer();
        assert_eq!(first, second);

        let connected = |ev: &ListenerEvent| matches!(ev, ListenerEvent::Connected { .. });
        assert!(connected(&rx.recv_timeout(WAIT).unwrap()));
        // No second socket shows up on the receiver.
        if let Ok(ev) = rx.recv_timeout(Duration::from_millis(300)) {
            assert!(!connected(&ev), "unexpected second connection");
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let (endpoint, rx) = listener(Framing::LengthPrefixed);
        let mut slot = SessionSlot::default();
        slot.connect(&endpoint).unwrap();
        assert!(slot.is_connected());

        assert!(slot.close());
        assert!(!slot.is_connected());
        assert!(!slot.close());

        let mut saw_disconnect = false;
        while let Ok(ev) = rx.recv_timeout(WAIT) {
            if matches!(ev, ListenerEvent::Disconnected { .. }) {
                saw_disconnect = true;
                break;
            }
        }
        assert!(saw_disconnect);
    }

    /// One clip over frames 0..240 whose root carries `bytes` of text.
    fn heavy_host(bytes: usize) -> RecordingHost {
        let mut graph = Graph::new();
        let root = graph.add(Attrs::new().with("payload", AttrValue::Str("x".repeat(bytes))));
        RecordingHost::new(TestScene {
            graph,
            clips: vec![(0.0, 10.0, root)],
        })
    }

    #[test]
    fn test_send_times_out_on_stalled_receiver() {
        // Accepts but never reads, so the socket buffers fill up
        let receiver = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = Endpoint::new("127.0.0.1", receiver.local_addr().unwrap().port());
        let host = heavy_host(64 * 1024 * 1024);
        let serializer = GraphSerializer::default();
        let mut slot = SessionSlot::new(SessionOptions {
            send_timeout: Duration::from_millis(200),
            ..Default::default()
        });

        let session = slot.connect(&endpoint).unwrap();
        let (_stalled, _) = receiver.accept().unwrap();
        let started = Instant::now();
        let err = session
            .transmit(EnvelopeKind::FrameData, 0, &host, &serializer)
            .unwrap_err();
        assert!(
            matches!(err, TransmitError::Timeout { timeout, .. } if timeout == Duration::from_millis(200)),
            "unexpected error {err:?}"
        );
        assert!(err.breaks_session());
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(session.frames_sent(), 0);
        assert!(slot.close());

        // The export loop drops the session on the same failure
        slot.connect(&endpoint).unwrap();
        let (_stalled_again, _) = receiver.accept().unwrap();
        let mut host = host;
        let err = Exporter {
            slot: &mut slot,
            host: &mut host,
            serializer: &serializer,
            pacing: Pacing::IMMEDIATE,
            hangup: Toggle::default(),
        }
        .export_range(0, 3)
        .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Transmit {
                frame: 0,
                sent: 0,
                source: TransmitError::Timeout { .. }
            }
        ));
        assert!(!slot.is_connected());
    }

    #[test]
    fn test_connect_refused_is_unreachable() {
        let port = {
            let probe = TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let mut slot = SessionSlot::new(SessionOptions {
            connect_timeout: Duration::from_millis(500),
            ..Default::default()
        });
        let err = slot.connect(&Endpoint::new("127.0.0.1", port)).unwrap_err();
        assert!(matches!(err, ConnectError::Unreachable { .. }));
        assert!(!slot.is_connected());
    }
}
