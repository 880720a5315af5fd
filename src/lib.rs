//! SFMSOCK - scene graph snapshot exporter library
//!
//! Serializes the film clip under the playhead into a JSON document and
//! streams it to a receiver over TCP, frame by frame.
//!
//! Re-exports all modules for use by the binary target.

// Core (serializer, wire protocol, session, export loop)
pub mod core;

// Scene graph model and host abstraction
pub mod entities;

// App modules
pub mod app;
pub mod cli;
pub mod config;
pub mod paths;
pub mod runner;
pub mod server;

// Re-export commonly used types from core
pub use crate::core::envelope::{Envelope, EnvelopeKind};
pub use crate::core::error::{ConnectError, ExportError, SerializeError, TransmitError};
pub use crate::core::export::{Exporter, Pacing, Toggle};
pub use crate::core::serializer::{Document, GraphSerializer};
pub use crate::core::session::{Session, SessionOptions, SessionSlot};

// Re-export entities
pub use entities::{AttrValue, Attrs, Graph, Host, Node, NodeRef};

pub use app::{SockApp, Status};
pub use config::{Endpoint, Settings};
