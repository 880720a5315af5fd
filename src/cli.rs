use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Build version with protocol info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Protocol: framedata/framecommit JSON envelopes\n",
    "Framing:  length-prefixed (default), !START!/!END! (--legacy-framing)\n",
    "Target:   ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Scene graph snapshot exporter
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Receiver address as HOST:PORT (default: SFMSOCK_TCP_IP/SFMSOCK_TCP_PORT, settings, localhost:9191)
    #[arg(short = 's', long = "server", value_name = "HOST:PORT")]
    pub server: Option<String>,

    /// Use !START!/!END! delimited framing instead of the length prefix
    #[arg(long = "legacy-framing")]
    pub legacy_framing: bool,

    /// Enable debug logging to file (default: sfmsock.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send the playhead frame as framedata
    Transmit {
        #[command(flatten)]
        scene: SceneArgs,
    },

    /// Send the playhead frame as framecommit
    Commit {
        #[command(flatten)]
        scene: SceneArgs,
    },

    /// Commit every frame from START to END (inclusive)
    Export {
        #[command(flatten)]
        scene: SceneArgs,

        /// First frame
        #[arg(long = "start", value_name = "N", allow_hyphen_values = true)]
        start: i32,

        /// Last frame
        #[arg(long = "end", value_name = "N", allow_hyphen_values = true)]
        end: i32,

        #[command(flatten)]
        pacing: PacingArgs,
    },

    /// Stream the playhead frame as framedata for a while
    Live {
        #[command(flatten)]
        scene: SceneArgs,

        /// How long to stream, in seconds
        #[arg(long = "seconds", value_name = "SECS", default_value_t = 10.0)]
        seconds: f64,

        #[command(flatten)]
        pacing: PacingArgs,
    },

    /// Receive envelopes and print them (debug receiver)
    Listen {
        /// Address to bind
        #[arg(long = "bind", value_name = "ADDR", default_value = "127.0.0.1")]
        bind: String,

        /// Port to bind (default: resolved receiver port)
        #[arg(short = 'p', long = "port", value_name = "PORT")]
        port: Option<u16>,

        /// Print full envelopes as JSON lines instead of a summary
        #[arg(long = "json")]
        json: bool,
    },
}

/// Scene input shared by the sending commands
#[derive(clap::Args, Debug)]
pub struct SceneArgs {
    /// Scene description file (JSON)
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,

    /// Playhead frame (default: scene's currentFrame)
    #[arg(long = "frame", value_name = "N", allow_hyphen_values = true)]
    pub frame: Option<i32>,
}

/// Pacing overrides (seconds)
#[derive(clap::Args, Debug)]
pub struct PacingArgs {
    /// Base delay per frame
    #[arg(long = "delay", value_name = "SECS")]
    pub frame_delay: Option<f64>,

    /// Extra delay per animation set on the current clip
    #[arg(long = "dag-multiplier", value_name = "SECS")]
    pub dag_multiplier: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_export() {
        let args = Args::try_parse_from([
            "sfmsock", "-vv", "--server", "render:7000", "export", "scene.json", "--start", "-2", "--end", "10",
            "--delay", "0.1",
        ])
        .unwrap();

        assert_eq!(args.verbosity, 2);
        assert_eq!(args.server.as_deref(), Some("render:7000"));
        match args.command {
            Command::Export { scene, start, end, pacing } => {
                assert_eq!(scene.scene, PathBuf::from("scene.json"));
                assert_eq!((start, end), (-2, 10));
                assert_eq!(pacing.frame_delay, Some(0.1));
                assert_eq!(pacing.dag_multiplier, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_listen_and_log_flag() {
        let args = Args::try_parse_from(["sfmsock", "--log", "--legacy-framing", "listen", "--json"]).unwrap();
        assert_eq!(args.log_file, Some(None));
        assert!(args.legacy_framing);
        assert!(matches!(args.command, Command::Listen { json: true, port: None, .. }));
    }
}
