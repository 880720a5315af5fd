//! Entities module - scene graph types and the host abstraction
//!
//! - `attrs` - typed, ordered attribute storage
//! - `graph` - node arena with id-based element references
//! - `scene` - scene description files and a file-backed host
//! - `traits` - `Host`, the authoring tool as seen by the exporter

pub mod attrs;
pub mod graph;
pub mod keys;
pub mod scene;
pub mod traits;

pub use attrs::{AttrKind, AttrValue, Attrs, Color, QAngle, Quaternion, Vector2, Vector3, Vector4};
pub use graph::{Graph, Node, NodeRef};
pub use scene::{FilmClip, Scene, SceneHost};
pub use traits::Host;
