//! Controller status line.

use std::fmt;

/// Outcome of the last controller operation, shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    NotConnected,
    Connected,
    AlreadyConnected,
    AlreadyDisconnected,
    ConnectFailed(String),
    Transmitting(i32),
    Committing(i32),
    UnableToTransmit,
    UnableToCommit,
    UnableToExport,
    TransmitFailed(String),
    Exporting,
    ExportComplete(usize),
    ExportFailed(String),
    LiveUpdate,
    LiveUpdateStopped(usize),
    StartFrameSet(i32),
    EndFrameSet(i32),
}

impl Status {
    /// Whether the last operation failed.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Status::ConnectFailed(_)
                | Status::UnableToTransmit
                | Status::UnableToCommit
                | Status::UnableToExport
                | Status::TransmitFailed(_)
                | Status::ExportFailed(_)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotConnected => write!(f, "Not connected."),
            Status::Connected => write!(f, "Connected."),
            Status::AlreadyConnected => write!(f, "Already connected."),
            Status::AlreadyDisconnected => write!(f, "Already disconnected."),
            Status::ConnectFailed(e) => write!(f, "Connection failed: {}", e),
            Status::Transmitting(frame) => write!(f, "Transmitting frame {}.", frame),
            Status::Committing(frame) => write!(f, "Committing frame {}.", frame),
            Status::UnableToTransmit => write!(f, "Unable to transmit."),
            Status::UnableToCommit => write!(f, "Unable to commit."),
            Status::UnableToExport => write!(f, "Unable to export."),
            Status::TransmitFailed(e) => write!(f, "Transmit failed: {}", e),
            Status::Exporting => write!(f, "Exporting..."),
            Status::ExportComplete(n) => write!(f, "Export complete ({} frames).", n),
            Status::ExportFailed(e) => write!(f, "Export failed: {}", e),
            Status::LiveUpdate => write!(f, "Live update running."),
            Status::LiveUpdateStopped(n) => write!(f, "Live update stopped ({} frames).", n),
            Status::StartFrameSet(frame) => write!(f, "Start frame set to {}.", frame),
            Status::EndFrameSet(frame) => write!(f, "End frame set to {}.", frame),
        }
    }
}
