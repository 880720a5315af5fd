//! Scene description files and the host that plays them back.
//!
//! A scene file is a JSON snapshot of an authoring session: project and map
//! names, timeline frame rate, the node arena and a film track made of clips
//! placed in time. [`SceneHost`] implements [`Host`] on top of it so the
//! exporter can be driven without the authoring tool running.
//!
//! ```json
//! {
//!   "project": "heist",
//!   "map": "dm_lockdown",
//!   "frameRate": 24,
//!   "currentFrame": 0,
//!   "nodes": [ {"id": "...", "attributes": [ ... ]} ],
//!   "clips": [ {"start": 0.0, "duration": 2.5, "root": "..."} ]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{debug, trace};
use serde::Deserialize;
use uuid::Uuid;

use super::graph::{Graph, NodeRef};
use super::traits::Host;

fn default_frame_rate() -> f32 {
    24.0
}

/// Film clip placed on the track: `[start, start + duration)` in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilmClip {
    pub start: f64,
    pub duration: f64,
    /// Clip root node in the arena
    pub root: Uuid,
}

impl FilmClip {
    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.start && seconds < self.start + self.duration
    }
}

/// Parsed scene file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub project: String,
    #[serde(default)]
    pub map: String,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    #[serde(default)]
    pub current_frame: i32,
    #[serde(default)]
    pub nodes: Graph,
    #[serde(default)]
    pub clips: Vec<FilmClip>,
}

impl Scene {
    /// Load and validate a scene file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file: {}", path.display()))?;
        let scene = Self::from_json_str(&text)
            .with_context(|| format!("Invalid scene file: {}", path.display()))?;
        debug!(
            "Loaded scene '{}' ({} nodes, {} clips) from {}",
            scene.project,
            scene.nodes.len(),
            scene.clips.len(),
            path.display()
        );
        Ok(scene)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(text).context("Failed to parse scene JSON")?;
        scene.validate()?;
        Ok(scene)
    }

    fn validate(&self) -> Result<()> {
        for (i, clip) in self.clips.iter().enumerate() {
            if !self.nodes.contains(clip.root) {
                bail!("clip #{} references unknown root node {}", i, clip.root);
            }
            if clip.duration.is_nan() || clip.duration < 0.0 {
                bail!("clip #{} has invalid duration {}", i, clip.duration);
            }
        }
        Ok(())
    }

    /// First clip covering `seconds`.
    pub fn clip_at_time(&self, seconds: f64) -> Option<&FilmClip> {
        self.clips.iter().find(|clip| clip.contains(seconds))
    }
}

/// [`Host`] backed by a [`Scene`].
///
/// The playhead is plain state. `process_events` has nothing to evaluate and
/// only counts calls, which keeps CLI runs and tests observable.
#[derive(Debug, Clone)]
pub struct SceneHost {
    scene: Scene,
    frame: i32,
    events_processed: u64,
}

impl SceneHost {
    pub fn new(scene: Scene) -> Self {
        let frame = scene.current_frame;
        Self {
            scene,
            frame,
            events_processed: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }
}

impl Host for SceneHost {
    fn project_name(&self) -> &str {
        &self.scene.project
    }

    fn map_name(&self) -> &str {
        &self.scene.map
    }

    fn frame_rate(&self) -> f32 {
        self.scene.frame_rate
    }

    fn current_frame(&self) -> i32 {
        self.frame
    }

    fn set_current_frame(&mut self, frame: i32) {
        trace!("Playhead -> {}", frame);
        self.frame = frame;
    }

    fn node_at_time(&self, seconds: f64) -> Option<NodeRef<'_>> {
        let clip = self.scene.clip_at_time(seconds)?;
        self.scene.nodes.node_ref(clip.root)
    }

    fn process_events(&mut self) {
        self.events_processed += 1;
    }
}
