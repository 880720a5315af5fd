//! Receiving side of the frame protocol.
//!
//! # Purpose
//!
//! A small TCP receiver for local debugging: point the exporter at it and
//! watch envelopes arrive, without the real consumer running.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐       mpsc::channel         ┌──────────────────────┐
//! │  Listener threads       │  ──── ListenerEvent ─────▶  │  Owner thread        │
//! │  (accept + 1 per peer)  │                             │  (CLI print loop,    │
//! │                         │                             │   tests)             │
//! │  bytes → FrameDecoder   │  ──▶ Envelope { .. } ───▶   │                      │
//! │        → Envelope       │  ──▶ Invalid { .. } ────▶   │                      │
//! └─────────────────────────┘                             └──────────────────────┘
//! ```
//!
//! # Used by
//!
//! - `runner.rs` - `sfmsock listen`
//! - `core::session` / `core::export` tests - real loopback receiver

mod listener;

pub use listener::{FrameListener, ListenerEvent};
