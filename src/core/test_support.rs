//! Shared test fixtures: a recording fake host and a small two-clip scene.

use std::cell::RefCell;

use uuid::Uuid;

use crate::entities::attrs::{AttrValue, Attrs};
use crate::entities::graph::{Graph, NodeRef};
use crate::entities::keys::{A_ANIMATION_SETS, A_NAME};
use crate::entities::traits::Host;

/// Host call, as seen by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    SetFrame(i32),
    ProcessEvents,
    Lookup(f64),
}

/// Clip roots placed in time: `[start, end)` seconds → root node.
pub struct TestScene {
    pub graph: Graph,
    pub clips: Vec<(f64, f64, Uuid)>,
}

/// Two clips at 24 fps: "shot1" covers frames 0..24, "shot2" frames 24..48.
/// shot2 carries three animation sets.
pub fn two_clip_scene() -> TestScene {
    let mut graph = Graph::new();
    let shot1 = graph.add(Attrs::new().with(A_NAME, AttrValue::Str("shot1".into())));
    let sets: Vec<Option<Uuid>> = (0..3)
        .map(|i| Some(graph.add(Attrs::new().with(A_NAME, AttrValue::Str(format!("set{i}"))))))
        .collect();
    let shot2 = graph.add(
        Attrs::new()
            .with(A_NAME, AttrValue::Str("shot2".into()))
            .with(A_ANIMATION_SETS, AttrValue::ElementArray(sets)),
    );
    TestScene {
        graph,
        clips: vec![(0.0, 1.0, shot1), (1.0, 2.0, shot2)],
    }
}

type EventHook = Box<dyn FnMut(u64)>;

/// Fake host that records every playhead move, event pump and lookup.
pub struct RecordingHost {
    scene: TestScene,
    frame: i32,
    events: u64,
    log: RefCell<Vec<HostCall>>,
    on_events: Option<EventHook>,
}

impl RecordingHost {
    pub fn new(scene: TestScene) -> Self {
        Self {
            scene,
            frame: 0,
            events: 0,
            log: RefCell::new(Vec::new()),
            on_events: None,
        }
    }

    /// Run `hook` with the running event count on every `process_events`.
    pub fn on_events(mut self, hook: impl FnMut(u64) + 'static) -> Self {
        self.on_events = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.log.borrow().clone()
    }

    pub fn frames_set(&self) -> Vec<i32> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                HostCall::SetFrame(f) => Some(*f),
                _ => None,
            })
            .collect()
    }
}

impl Host for RecordingHost {
    fn project_name(&self) -> &str {
        "test_project"
    }

    fn map_name(&self) -> &str {
        "test_map"
    }

    fn frame_rate(&self) -> f32 {
        24.0
    }

    fn current_frame(&self) -> i32 {
        self.frame
    }

    fn set_current_frame(&mut self, frame: i32) {
        self.log.borrow_mut().push(HostCall::SetFrame(frame));
        self.frame = frame;
    }

    fn node_at_time(&self, seconds: f64) -> Option<NodeRef<'_>> {
        self.log.borrow_mut().push(HostCall::Lookup(seconds));
        let (_, _, root) = self
            .scene
            .clips
            .iter()
            .find(|(start, end, _)| seconds >= *start && seconds < *end)?;
        self.scene.graph.node_ref(*root)
    }

    fn process_events(&mut self) {
        self.events += 1;
        self.log.borrow_mut().push(HostCall::ProcessEvents);
        if let Some(hook) = self.on_events.as_mut() {
            hook(self.events);
        }
    }
}
