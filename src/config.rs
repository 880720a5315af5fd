//! Settings file and receiver endpoint resolution.
//!
//! Settings live in `sfmsock.json` in the config dir (see `paths.rs`).
//! Every field is optional in the file; missing fields take defaults.
//!
//! Endpoint priority:
//! 1. explicit `host:port` (CLI `--server`)
//! 2. `SFMSOCK_TCP_IP` / `SFMSOCK_TCP_PORT`
//! 3. `host` / `port` from the settings file
//! 4. `localhost:9191`

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::denylist::Denylist;
use crate::core::export::{DEFAULT_DAG_MULTIPLIER, DEFAULT_FRAME_DELAY, Pacing};
use crate::core::framing::Framing;
use crate::core::serializer::{DEFAULT_MAX_DEPTH, GraphSerializer};
use crate::core::session::{DEFAULT_CONNECT_TIMEOUT, SessionOptions};
use crate::entities::keys::A_GLOBAL_FLEX_CONTROLLERS;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9191;
/// Receiver host override
pub const ENV_HOST: &str = "SFMSOCK_TCP_IP";
/// Receiver port override
pub const ENV_PORT: &str = "SFMSOCK_TCP_PORT";
pub const SETTINGS_FILE: &str = "sfmsock.json";
pub const LOG_FILE: &str = "sfmsock.log";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Receiver
    pub host: Option<String>,
    pub port: Option<u16>,
    pub legacy_framing: bool, // !START!/!END! instead of length prefix

    // Timeouts (seconds)
    pub connect_timeout: f64,
    pub send_timeout: f64, // 0 = block

    // Export pacing (seconds)
    pub frame_delay: f64,
    pub dag_multiplier: f64, // added per animation set on the current clip

    // Serializer
    pub denylist_add: Vec<String>,
    pub denylist_remove: Vec<String>,
    pub flex_controller_root: String,
    pub max_depth: usize, // element nesting limit

    // Send framedata for the playhead right after connecting
    pub snapshot_on_connect: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            legacy_framing: false,
            connect_timeout: 5.0,
            send_timeout: 5.0,
            frame_delay: DEFAULT_FRAME_DELAY,
            dag_multiplier: DEFAULT_DAG_MULTIPLIER,
            denylist_add: Vec::new(),
            denylist_remove: Vec::new(),
            flex_controller_root: A_GLOBAL_FLEX_CONTROLLERS.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            snapshot_on_connect: true,
        }
    }
}

impl Settings {
    /// Load from `path`. A missing file gives defaults; a broken one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    /// Like [`load`](Self::load), but falls back to defaults with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("{:#}, using defaults", e);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("Failed to encode settings")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write settings: {}", path.display()))
    }

    pub fn framing(&self) -> Framing {
        if self.legacy_framing {
            Framing::Delimited
        } else {
            Framing::LengthPrefixed
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::from_secs(self.frame_delay, self.dag_multiplier)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            // A zero connect timeout is rejected by the OS layer
            connect_timeout: Duration::try_from_secs_f64(self.connect_timeout)
                .ok()
                .filter(|d| !d.is_zero())
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            send_timeout: Duration::try_from_secs_f64(self.send_timeout).unwrap_or(Duration::ZERO),
            framing: self.framing(),
        }
    }

    /// Default denylist with this file's additions and removals applied.
    pub fn denylist(&self) -> Denylist {
        let mut list = Denylist::default();
        for name in &self.denylist_remove {
            list.remove(name);
        }
        list.extend(self.denylist_add.iter().cloned());
        list
    }

    pub fn serializer(&self) -> GraphSerializer {
        GraphSerializer::new(self.denylist())
            .with_flex_root(self.flex_controller_root.clone())
            .with_max_depth(self.max_depth)
    }
}

/// Receiver address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`, `host`, `:port` or `[v6]:port`.
    ///
    /// Missing or empty parts fall back to `localhost` / `9191`. So does a
    /// port that is not a number in `1..=65535`.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (host, port) = match text.strip_prefix('[') {
            Some(rest) => match rest.split_once(']') {
                Some((host, tail)) => (host, tail.strip_prefix(':')),
                None => (rest, None),
            },
            None => match text.rsplit_once(':') {
                Some((host, port)) if !host.contains(':') => (host, Some(port)),
                // Bare IPv6 without brackets: no port
                Some(_) => (text, None),
                None => (text, None),
            },
        };

        let host = if host.trim().is_empty() { DEFAULT_HOST } else { host.trim() };
        let port = port.and_then(parse_port).unwrap_or(DEFAULT_PORT);
        Self::new(host, port)
    }

    /// Resolve from the explicit string, `env` and `settings`, in that order.
    pub fn resolve(
        explicit: Option<&str>,
        settings: &Settings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        if let Some(text) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            return Self::parse(text);
        }

        let host = env(ENV_HOST)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .or_else(|| settings.host.clone().filter(|h| !h.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = env(ENV_PORT)
            .as_deref()
            .and_then(parse_port)
            .or(settings.port.filter(|p| *p != 0))
            .unwrap_or(DEFAULT_PORT);
        Self::new(host, port)
    }

    /// Resolve against the process environment.
    pub fn from_env_and_cli(explicit: Option<&str>, settings: &Settings) -> Self {
        Self::resolve(explicit, settings, |key| std::env::var(key).ok())
    }
}

fn parse_port(text: &str) -> Option<u16> {
    text.trim().parse::<u16>().ok().filter(|p| *p != 0)
}
