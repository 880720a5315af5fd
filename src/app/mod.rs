//! Application module - SockApp controller.
//!
//! The operations a user triggers from the exporter panel: connect,
//! disconnect, transmit, commit, export a range, live update, and setting the
//! range bounds from the playhead. Each operation updates [`Status`] and logs
//! it; failures never panic and never leave a half-open session behind.
//!
//! - `status` - status line values

mod status;

pub use status::Status;

use log::{error, info, warn};

use crate::config::{Endpoint, Settings};
use crate::core::envelope::EnvelopeKind;
use crate::core::export::{Exporter, Pacing, Toggle};
use crate::core::serializer::GraphSerializer;
use crate::core::session::SessionSlot;
use crate::entities::traits::Host;

/// Exporter controller.
///
/// Owns the host, the session slot and the serializer. One controller means
/// one receiver connection at most.
pub struct SockApp<H: Host> {
    host: H,
    slot: SessionSlot,
    serializer: GraphSerializer,
    pacing: Pacing,
    snapshot_on_connect: bool,
    start_frame: i32,
    end_frame: i32,
    live: Toggle,
    hangup: Toggle,
    status: Status,
}

impl<H: Host> SockApp<H> {
    pub fn new(host: H, settings: &Settings) -> Self {
        Self {
            host,
            slot: SessionSlot::new(settings.session_options()),
            serializer: settings.serializer(),
            pacing: settings.pacing(),
            snapshot_on_connect: settings.snapshot_on_connect,
            start_frame: 0,
            end_frame: 0,
            live: Toggle::default(),
            hangup: Toggle::default(),
            status: Status::NotConnected,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.slot.is_connected()
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = pacing;
    }

    pub fn set_snapshot_on_connect(&mut self, enabled: bool) {
        self.snapshot_on_connect = enabled;
    }

    /// Live update switch. Clear it from anywhere to stop [`live_update`](Self::live_update).
    pub fn live_toggle(&self) -> Toggle {
        self.live.clone()
    }

    /// Hangup switch. Raise it to drop the session at the next check.
    pub fn hangup_toggle(&self) -> Toggle {
        self.hangup.clone()
    }

    /// Export range as `(start, end)`.
    pub fn range(&self) -> (i32, i32) {
        (self.start_frame, self.end_frame)
    }

    pub fn set_range(&mut self, start: i32, end: i32) {
        self.start_frame = start;
        self.end_frame = end;
    }

    fn set_status(&mut self, status: Status) {
        if status.is_failure() {
            warn!("{}", status);
        } else {
            info!("{}", status);
        }
        self.status = status;
    }

    /// Connect to `endpoint` unless already connected.
    ///
    /// A new connection sends `framedata` for the playhead right away when
    /// `snapshot_on_connect` is set.
    pub fn connect(&mut self, endpoint: &Endpoint) -> &Status {
        if let Some(session) = self.slot.session() {
            if session.endpoint() != endpoint {
                warn!("Already connected to {}, ignoring request for {}", session.endpoint(), endpoint);
            }
            self.set_status(Status::AlreadyConnected);
            return &self.status;
        }

        self.hangup.set(false);
        match self.slot.connect(endpoint) {
            Ok(session) => {
                if self.snapshot_on_connect {
                    let frame = self.host.current_frame();
                    if let Err(e) = session.transmit(EnvelopeKind::FrameData, frame, &self.host, &self.serializer) {
                        error!("Initial snapshot of frame {} failed: {}", frame, e);
                        if e.breaks_session() {
                            self.slot.close();
                            self.set_status(Status::ConnectFailed(e.to_string()));
                            return &self.status;
                        }
                    }
                }
                self.set_status(Status::Connected);
            }
            Err(e) => {
                error!("{}", e);
                self.set_status(Status::ConnectFailed(e.to_string()));
            }
        }
        &self.status
    }

    pub fn disconnect(&mut self) -> &Status {
        self.live.set(false);
        let status = if self.slot.close() {
            Status::NotConnected
        } else {
            Status::AlreadyDisconnected
        };
        self.set_status(status);
        &self.status
    }

    /// Send `framedata` for the playhead frame.
    pub fn transmit(&mut self) -> &Status {
        self.send_current(EnvelopeKind::FrameData)
    }

    /// Send `framecommit` for the playhead frame.
    pub fn commit(&mut self) -> &Status {
        self.send_current(EnvelopeKind::FrameCommit)
    }

    fn send_current(&mut self, kind: EnvelopeKind) -> &Status {
        let frame = self.host.current_frame();
        let Some(session) = self.slot.session_mut() else {
            let status = match kind {
                EnvelopeKind::FrameData => Status::UnableToTransmit,
                EnvelopeKind::FrameCommit => Status::UnableToCommit,
            };
            self.set_status(status);
            return &self.status;
        };

        let result = session.transmit(kind, frame, &self.host, &self.serializer);
        let status = match result {
            Ok(()) => match kind {
                EnvelopeKind::FrameData => Status::Transmitting(frame),
                EnvelopeKind::FrameCommit => Status::Committing(frame),
            },
            Err(e) => {
                if e.breaks_session() {
                    self.slot.close();
                }
                Status::TransmitFailed(e.to_string())
            }
        };
        self.set_status(status);
        &self.status
    }

    /// Use the playhead as export start.
    pub fn set_start_frame(&mut self) -> &Status {
        self.start_frame = self.host.current_frame();
        self.set_status(Status::StartFrameSet(self.start_frame));
        &self.status
    }

    /// Use the playhead as export end.
    pub fn set_end_frame(&mut self) -> &Status {
        self.end_frame = self.host.current_frame();
        self.set_status(Status::EndFrameSet(self.end_frame));
        &self.status
    }

    /// Commit every frame of the export range.
    pub fn export(&mut self) -> &Status {
        if !self.slot.is_connected() {
            self.set_status(Status::UnableToExport);
            return &self.status;
        }
        self.set_status(Status::Exporting);

        let (start, end) = self.range();
        let result = Exporter {
            slot: &mut self.slot,
            host: &mut self.host,
            serializer: &self.serializer,
            pacing: self.pacing,
            hangup: self.hangup.clone(),
        }
        .export_range(start, end);

        let status = match result {
            Ok(report) => Status::ExportComplete(report.frames.len()),
            Err(e) => Status::ExportFailed(e.to_string()),
        };
        self.set_status(status);
        &self.status
    }

    /// Stream the playhead frame until the live toggle is cleared.
    ///
    /// Blocks the calling thread. Turns the toggle on first.
    pub fn live_update(&mut self) -> &Status {
        if !self.slot.is_connected() {
            self.set_status(Status::UnableToTransmit);
            return &self.status;
        }
        self.live.set(true);
        self.set_status(Status::LiveUpdate);

        let live = self.live.clone();
        let result = Exporter {
            slot: &mut self.slot,
            host: &mut self.host,
            serializer: &self.serializer,
            pacing: self.pacing,
            hangup: self.hangup.clone(),
        }
        .live_update(&live);
        self.live.set(false);

        let status = match result {
            Ok(sent) => Status::LiveUpdateStopped(sent),
            Err(e) => Status::TransmitFailed(e.to_string()),
        };
        self.set_status(status);
        &self.status
    }
}

impl<H: Host> Drop for SockApp<H> {
    fn drop(&mut self) {
        self.live.set(false);
        if self.slot.is_connected() {
            info!("Closing session on shutdown");
            self.slot.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::envelope::Envelope;
    use crate::core::framing::Framing;
    use crate::core::test_support::{RecordingHost, two_clip_scene};
    use crate::server::{FrameListener, ListenerEvent};
    use std::net::TcpListener;
    use std::sync::mpsc::Receiver;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn receiver() -> (Endpoint, Receiver<ListenerEvent>) {
        let (addr, rx) = FrameListener::start("127.0.0.1:0", Framing::LengthPrefixed).unwrap();
        (Endpoint::new("127.0.0.1", addr.port()), rx)
    }

    fn next_envelope(rx: &Receiver<ListenerEvent>) -> Envelope {
        loop {
            if let ListenerEvent::Envelope { envelope, .. } = rx.recv_timeout(WAIT).expect("envelope expected") {
                return envelope;
            }
        }
    }

    fn app() -> SockApp<RecordingHost> {
        let mut app = SockApp::new(RecordingHost::new(two_clip_scene()), &Settings::default());
        app.set_pacing(Pacing::IMMEDIATE);
        app
    }

    #[test]
    fn test_connect_sends_initial_snapshot() {
        let (endpoint, rx) = receiver();
        let mut app = app();
        app.host_mut().set_current_frame(3);

        assert_eq!(app.connect(&endpoint), &Status::Connected);
        let envelope = next_envelope(&rx);
        assert_eq!(envelope.kind, EnvelopeKind::FrameData);
        assert_eq!(envelope.current_frame, 3);

        assert_eq!(app.connect(&endpoint), &Status::AlreadyConnected);
        assert!(app.is_connected());

        // A different endpoint does not replace the session
        assert_eq!(app.connect(&Endpoint::new("127.0.0.1", 1)), &Status::AlreadyConnected);
        assert_eq!(app.transmit(), &Status::Transmitting(3));
        let envelope = next_envelope(&rx);
        assert_eq!(envelope.current_frame, 3);
    }

    #[test]
    fn test_operations_without_session() {
        let mut app = app();
        assert_eq!(app.transmit(), &Status::UnableToTransmit);
        assert_eq!(app.commit(), &Status::UnableToCommit);
        assert_eq!(app.export(), &Status::UnableToExport);
        assert_eq!(app.live_update(), &Status::UnableToTransmit);
        assert_eq!(app.disconnect(), &Status::AlreadyDisconnected);
        assert!(!app.status().is_failure());
    }

    #[test]
    fn test_connect_failure_reported() {
        let port = {
            let probe = TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let mut app = app();
        let status = app.connect(&Endpoint::new("127.0.0.1", port)).clone();
        assert!(matches!(status, Status::ConnectFailed(_)));
        assert!(status.is_failure());
        assert!(!app.is_connected());
    }

    #[test]
    fn test_transmit_commit_and_export() {
        let (endpoint, rx) = receiver();
        let mut app = app();
        app.set_snapshot_on_connect(false);
        app.connect(&endpoint);

        app.host_mut().set_current_frame(24);
        assert_eq!(app.transmit(), &Status::Transmitting(24));
        assert_eq!(app.commit(), &Status::Committing(24));
        let first = next_envelope(&rx);
        let second = next_envelope(&rx);
        assert_eq!((first.kind, first.current_frame), (EnvelopeKind::FrameData, 24));
        assert_eq!((second.kind, second.current_frame), (EnvelopeKind::FrameCommit, 24));

        app.host_mut().set_current_frame(2);
        app.set_start_frame();
        app.host_mut().set_current_frame(4);
        assert_eq!(app.set_end_frame(), &Status::EndFrameSet(4));
        assert_eq!(app.range(), (2, 4));

        assert_eq!(app.export(), &Status::ExportComplete(3));
        let frames: Vec<i32> = (0..3).map(|_| next_envelope(&rx).current_frame).collect();
        assert_eq!(frames, vec![2, 3, 4]);

        assert_eq!(app.disconnect(), &Status::NotConnected);
        assert_eq!(app.disconnect(), &Status::AlreadyDisconnected);
    }

    #[test]
    fn test_live_update_stops_on_toggle() {
        let (endpoint, rx) = receiver();
        let mut app = app();
        app.set_snapshot_on_connect(false);
        app.connect(&endpoint);

        let live = app.live_toggle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            live.set(false);
        });
        app.set_pacing(Pacing::from_secs(0.01, 0.0));
        let status = app.live_update().clone();
        stopper.join().unwrap();

        match status {
            Status::LiveUpdateStopped(n) => assert!(n >= 1),
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(next_envelope(&rx).kind, EnvelopeKind::FrameData);
    }
}
