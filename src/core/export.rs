//! Frame range export and live update.
//!
//! # Export loop
//!
//! For every frame `i` in `[start, end]`:
//!
//! ```text
//! set playhead i ─▶ process_events ─▶ settle (⅔ delay) ─▶ framecommit i ─▶ cool down (⅓ delay)
//! ```
//!
//! The delay grows with the scene: `frame_delay + dag_multiplier × N`, where
//! N is the number of animation sets on the clip under the playhead. Heavier
//! shots need more time before the host has finished evaluating them.
//!
//! The session is checked before the playhead moves and again after the
//! host had its turn (a hangup request may arrive during `process_events`).
//! If it is gone the loop stops and reports how far it got; frames already
//! committed stay committed.
//!
//! # Live update
//!
//! Streams `framedata` for whatever frame the playhead is on, for as long as
//! the live [`Toggle`] stays on. The toggle is checked once per iteration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info, trace, warn};

use crate::entities::keys::A_ANIMATION_SETS;
use crate::entities::traits::Host;

use super::envelope::EnvelopeKind;
use super::error::{ExportError, TransmitError};
use super::serializer::GraphSerializer;
use super::session::SessionSlot;

/// Default base delay per frame (seconds)
pub const DEFAULT_FRAME_DELAY: f64 = 0.45;
/// Default extra delay per animation set (seconds)
pub const DEFAULT_DAG_MULTIPLIER: f64 = 0.01;

/// Shared on/off flag.
///
/// Clones share state, so one side (UI thread, signal handler, test hook)
/// can flip it while the export loop polls it.
#[derive(Debug, Clone, Default)]
pub struct Toggle(Arc<AtomicBool>);

impl Toggle {
    pub fn new(on: bool) -> Self {
        Self(Arc::new(AtomicBool::new(on)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, on: bool) {
        self.0.store(on, Ordering::Release);
    }

    /// Read and clear.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Per-frame wait times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub frame_delay: Duration,
    pub dag_multiplier: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_secs(DEFAULT_FRAME_DELAY, DEFAULT_DAG_MULTIPLIER)
    }
}

impl Pacing {
    /// No waiting at all.
    pub const IMMEDIATE: Pacing = Pacing {
        frame_delay: Duration::ZERO,
        dag_multiplier: Duration::ZERO,
    };

    /// From seconds. Negative or non-finite values count as zero.
    pub fn from_secs(frame_delay: f64, dag_multiplier: f64) -> Self {
        Self {
            frame_delay: secs(frame_delay),
            dag_multiplier: secs(dag_multiplier),
        }
    }

    /// Total delay for a clip with `animation_sets` sets.
    pub fn delay_for(&self, animation_sets: usize) -> Duration {
        let sets = u32::try_from(animation_sets).unwrap_or(u32::MAX);
        self.frame_delay.saturating_add(self.dag_multiplier.saturating_mul(sets))
    }

    /// `(settle, cool_down)`: ⅔ before the send, ⅓ after.
    pub fn split(delay: Duration) -> (Duration, Duration) {
        let settle = delay.saturating_mul(2) / 3;
        (settle, delay - settle)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

/// Animation sets on the clip under `frame` (0 without a clip).
pub fn animation_sets<H: Host + ?Sized>(host: &H, frame: i32) -> usize {
    host.node_at_frame(frame)
        .and_then(|clip| clip.attrs().count(A_ANIMATION_SETS))
        .unwrap_or(0)
}

/// Frames committed by a finished export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub frames: Vec<i32>,
}

/// Everything the export loop needs, borrowed from its owner.
pub struct Exporter<'a, H: Host + ?Sized> {
    pub slot: &'a mut SessionSlot,
    pub host: &'a mut H,
    pub serializer: &'a GraphSerializer,
    pub pacing: Pacing,
    /// Raised from outside to drop the session mid-export
    pub hangup: Toggle,
}

impl<H: Host + ?Sized> Exporter<'_, H> {
    /// Commit every frame of `[start, end]`, in order.
    ///
    /// An empty range (`start > end`) sends nothing.
    pub fn export_range(&mut self, start: i32, end: i32) -> Result<ExportReport, ExportError> {
        if start > end {
            warn!("Empty export range {}..={}", start, end);
            return Ok(ExportReport::default());
        }
        info!("Exporting frames {}..={}", start, end);

        let mut report = ExportReport::default();
        for frame in start..=end {
            if !self.session_available() {
                return Err(self.disconnected(frame, report.frames.len()));
            }

            info!("Exporting frame {}", frame);
            self.host.set_current_frame(frame);
            self.host.process_events();

            if !self.session_available() {
                return Err(self.disconnected(frame, report.frames.len()));
            }

            let delay = self.pacing.delay_for(animation_sets(&*self.host, frame));
            let (settle, cool_down) = Pacing::split(delay);
            trace!("Frame {} delay {:?} (settle {:?})", frame, delay, settle);
            pause(settle);

            if let Err(source) = self.transmit(EnvelopeKind::FrameCommit, frame) {
                return Err(ExportError::Transmit {
                    frame,
                    sent: report.frames.len(),
                    source,
                });
            }
            report.frames.push(frame);

            pause(cool_down);
        }

        info!("Export complete ({} frames)", report.frames.len());
        Ok(report)
    }

    /// Stream the current frame while `enabled` is on. Returns frames sent.
    pub fn live_update(&mut self, enabled: &Toggle) -> Result<usize, ExportError> {
        let mut sent = 0;
        while enabled.get() {
            let frame = self.host.current_frame();
            if !self.session_available() {
                return Err(self.disconnected(frame, sent));
            }

            if let Err(source) = self.transmit(EnvelopeKind::FrameData, frame) {
                return Err(ExportError::Transmit { frame, sent, source });
            }
            sent += 1;

            self.host.process_events();
            pause(self.pacing.delay_for(animation_sets(&*self.host, frame)));
        }
        debug!("Live update stopped after {} frames", sent);
        Ok(sent)
    }

    fn session_available(&mut self) -> bool {
        if self.hangup.take() {
            info!("Hangup requested");
            self.slot.close();
        }
        self.slot.is_connected()
    }

    fn disconnected(&self, frame: i32, sent: usize) -> ExportError {
        warn!("Session unavailable, stopping at frame {}", frame);
        ExportError::Disconnected { frame, sent }
    }

    fn transmit(&mut self, kind: EnvelopeKind, frame: i32) -> Result<(), TransmitError> {
        let Some(session) = self.slot.session_mut() else {
            return Err(TransmitError::NotConnected);
        };
        let result = session.transmit(kind, frame, &*self.host, self.serializer);
        if let Err(e) = &result {
            warn!("Transmit of frame {} failed: {}", frame, e);
            if e.breaks_session() {
                self.slot.close();
            }
        }
        result
    }
}
