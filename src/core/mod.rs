//! Core modules - serializer, wire protocol, session, export loop
//!
//! These modules know nothing about where the scene comes from; they talk to
//! the authoring tool through `entities::Host`.

pub mod denylist;
pub mod envelope;
pub mod error;
pub mod export;
pub mod framing;
pub mod serializer;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use denylist::{DEFAULT_DENYLIST, Denylist};
pub use envelope::{Envelope, EnvelopeKind};
pub use error::{ConnectError, ExportError, SerializeError, TransmitError};
pub use export::{ExportReport, Exporter, Pacing, Toggle};
pub use framing::{FrameDecoder, FrameError, Framing};
pub use serializer::{Document, GraphSerializer};
pub use session::{Session, SessionOptions, SessionSlot};
