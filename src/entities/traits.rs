//! Abstract traits for dependency inversion.
//!
//! `Host` is what the export core needs from the authoring tool: a playhead,
//! a clock and a way to find the scene node under the playhead. The core
//! never knows which tool is on the other side; the CLI plugs in
//! [`SceneHost`](super::scene::SceneHost), tests plug in a recording fake.

use super::graph::NodeRef;

/// Authoring tool seen from the exporter.
///
/// Implementations are driven from a single thread. `process_events` is the
/// only point where the host may run its own work (redraws, evaluation)
/// between playhead changes.
pub trait Host {
    /// Session/project name (`project` in the envelope).
    fn project_name(&self) -> &str;

    /// Map the session is bound to (`map` in the envelope).
    fn map_name(&self) -> &str;

    /// Frames per second of the timeline.
    fn frame_rate(&self) -> f32;

    /// Current playhead position in frames.
    fn current_frame(&self) -> i32;

    /// Move the playhead.
    fn set_current_frame(&mut self, frame: i32);

    /// Film clip root under the given time, if any.
    fn node_at_time(&self, seconds: f64) -> Option<NodeRef<'_>>;

    /// Let the host drain pending work after a playhead change.
    fn process_events(&mut self);

    /// Film clip root under the given frame.
    ///
    /// Frames map to time as `frame / frame_rate`. A non-positive frame rate
    /// has no clock, so nothing resolves.
    fn node_at_frame(&self, frame: i32) -> Option<NodeRef<'_>> {
        let fps = self.frame_rate();
        if fps <= 0.0 || !fps.is_finite() {
            return None;
        }
        self.node_at_time(frame_to_seconds(frame, fps))
    }
}

/// Frame number to timeline seconds.
pub fn frame_to_seconds(frame: i32, fps: f32) -> f64 {
    f64::from(frame) / f64::from(fps)
}
