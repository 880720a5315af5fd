//! Error types for serialization, transport and export

use std::io;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use super::framing::FrameError;

/// Graph serialization errors
#[derive(Debug, Error)]
pub enum SerializeError {
    /// An element attribute names a node that is not in the graph
    #[error("Malformed graph: attribute '{attribute}' of node {owner} references missing node {target}")]
    MalformedGraph {
        attribute: String,
        owner: Uuid,
        target: Uuid,
    },

    /// Element nesting went past the serializer's depth limit
    #[error("Graph too deep: attribute '{attribute}' of node {owner} exceeds max depth {max_depth}")]
    TooDeep {
        attribute: String,
        owner: Uuid,
        max_depth: usize,
    },
}

/// Connection establishment errors
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Host name did not resolve
    #[error("Cannot resolve {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// No resolved address accepted the connection in time
    #[error("Cannot reach {endpoint}: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Connected, but the socket could not be configured
    #[error("Socket setup failed for {endpoint}: {source}")]
    Socket {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

/// Envelope transmission errors
#[derive(Debug, Error)]
pub enum TransmitError {
    /// No active session
    #[error("Not connected")]
    NotConnected,

    /// Write did not complete within the send timeout
    #[error("Send to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    /// Write failed (peer gone, reset, ...)
    #[error("Send to {endpoint} failed: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Envelope could not be encoded
    #[error("Envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Payload could not be framed
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Scene graph could not be serialized
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl TransmitError {
    /// Whether the stream is unusable after this error.
    ///
    /// A failed or timed-out write may have put a partial frame on the wire,
    /// so the session has to be dropped. Encoding failures never touched it.
    pub fn breaks_session(&self) -> bool {
        matches!(self, TransmitError::Io { .. } | TransmitError::Timeout { .. })
    }

    pub(crate) fn from_io(source: io::Error, endpoint: &str, timeout: Duration) -> Self {
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransmitError::Timeout {
                endpoint: endpoint.to_string(),
                timeout,
            },
            _ => TransmitError::Io {
                endpoint: endpoint.to_string(),
                source,
            },
        }
    }
}

/// Export and live update errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Session went away (closed, hung up) before `frame` was sent
    #[error("Export aborted at frame {frame}: not connected ({sent} frames sent)")]
    Disconnected { frame: i32, sent: usize },

    /// Sending `frame` failed
    #[error("Export aborted at frame {frame} ({sent} frames sent): {source}")]
    Transmit {
        frame: i32,
        sent: usize,
        #[source]
        source: TransmitError,
    },
}

impl ExportError {
    /// Frames delivered before the abort.
    pub fn frames_sent(&self) -> usize {
        match self {
            ExportError::Disconnected { sent, .. } | ExportError::Transmit { sent, .. } => *sent,
        }
    }
}
