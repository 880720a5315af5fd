//! Wire envelope: one scene snapshot plus session metadata.
//!
//! ```json
//! {"type":"framecommit","version":"1.1.0","project":"heist","map":"dm_lockdown",
//!  "from":"SFM SOCK","currentFrame":5,"frameRate":24.0,"filmClip":{...}}
//! ```
//!
//! `filmClip` is absent when no clip covers the frame.

use serde::{Deserialize, Serialize};

use crate::entities::traits::Host;

use super::error::SerializeError;
use super::serializer::{Document, GraphSerializer};

/// Sender tag written into every envelope
pub const SENDER: &str = "SFM SOCK";

/// Protocol version string (crate version)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Envelope type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// Preview of a frame; receivers may overwrite it
    FrameData,
    /// Final data for a frame; receivers keep it
    FrameCommit,
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvelopeKind::FrameData => f.write_str("framedata"),
            EnvelopeKind::FrameCommit => f.write_str("framecommit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub version: String,
    pub project: String,
    pub map: String,
    pub from: String,
    pub current_frame: i32,
    pub frame_rate: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_clip: Option<Document>,
}

impl Envelope {
    /// Snapshot `frame` from the host.
    ///
    /// The clip is looked up at `frame` as given; the playhead is not moved.
    pub fn capture<H: Host + ?Sized>(
        kind: EnvelopeKind,
        frame: i32,
        host: &H,
        serializer: &GraphSerializer,
    ) -> Result<Self, SerializeError> {
        let film_clip = match host.node_at_frame(frame) {
            Some(node) => Some(serializer.serialize(node, None)?),
            None => None,
        };
        Ok(Self {
            kind,
            version: PROTOCOL_VERSION.to_string(),
            project: host.project_name().to_string(),
            map: host.map_name().to_string(),
            from: SENDER.to_string(),
            current_frame: frame,
            frame_rate: host.frame_rate(),
            film_clip,
        })
    }

    /// Compact JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{RecordingHost, two_clip_scene};
    use serde_json::{Value, json};

    #[test]
    fn test_envelope_wire_names() {
        let host = RecordingHost::new(two_clip_scene());
        let env = Envelope::capture(EnvelopeKind::FrameCommit, 5, &host, &GraphSerializer::default()).unwrap();
        let json: Value = serde_json::from_slice(&env.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "framecommit");
        assert_eq!(json["version"], PROTOCOL_VERSION);
        assert_eq!(json["project"], "test_project");
        assert_eq!(json["map"], "test_map");
        assert_eq!(json["from"], "SFM SOCK");
        assert_eq!(json["currentFrame"], 5);
        assert_eq!(json["frameRate"], 24.0);
        assert_eq!(json["filmClip"], json!({"name": "shot1"}));

        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["type", "version", "project", "map", "from", "currentFrame", "frameRate", "filmClip"]
        );
    }

    #[test]
    fn test_envelope_without_clip() {
        let host = RecordingHost::new(two_clip_scene());
        let env = Envelope::capture(EnvelopeKind::FrameData, 1000, &host, &GraphSerializer::default()).unwrap();
        assert!(env.film_clip.is_none());

        let json: Value = serde_json::from_slice(&env.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "framedata");
        assert_eq!(json["version"], PROTOCOL_VERSION);
        assert_eq!(json["project"], "test_project");
        assert_eq!(json["map"], "test_map");
        assert_eq!(json["from"], SENDER);
        assert_eq!(json["currentFrame"], 1000);
        assert_eq!(json["frameRate"], 24.0);
        assert!(json.get("filmClip").is_none());
        assert_eq!(json.as_object().unwrap().len(), 7);

        let back = Envelope::from_json(&env.to_json().unwrap()).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn test_capture_does_not_move_playhead() {
        let host = RecordingHost::new(two_clip_scene());
        let before = host.current_frame();
        Envelope::capture(EnvelopeKind::FrameData, 30, &host, &GraphSerializer::default()).unwrap();
        assert_eq!(host.current_frame(), before);
    }
}
