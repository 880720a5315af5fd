//! Application runner - executes parsed CLI commands.

use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, info, trace};

use crate::app::{SockApp, Status};
use crate::cli::{Args, Command, PacingArgs, SceneArgs};
use crate::config::{Endpoint, SETTINGS_FILE, Settings};
use crate::core::export::Pacing;
use crate::entities::scene::{Scene, SceneHost};
use crate::entities::traits::Host;
use crate::paths::{self, PathConfig};
use crate::server::{FrameListener, ListenerEvent};

/// Run one CLI command.
///
/// # Returns
/// * `Ok(())` when the command succeeded
/// * `Err` with the final status (or load error) otherwise
pub fn run(args: Args) -> Result<()> {
    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    let settings_path = paths::config_file(SETTINGS_FILE, &path_config);
    let mut settings = Settings::load_or_default(&settings_path);
    if args.legacy_framing {
        settings.legacy_framing = true;
    }
    info!("Settings: {}", settings_path.display());
    trace!("Command-line args: {:?}", args);

    let endpoint = Endpoint::from_env_and_cli(args.server.as_deref(), &settings);

    match args.command {
        Command::Transmit { scene } => {
            let mut app = open_app(&scene, &settings)?;
            connect(&mut app, &endpoint)?;
            finish(app.transmit().clone())
        }
        Command::Commit { scene } => {
            let mut app = open_app(&scene, &settings)?;
            connect(&mut app, &endpoint)?;
            finish(app.commit().clone())
        }
        Command::Export { scene, start, end, pacing } => {
            let mut app = open_app(&scene, &settings)?;
            app.set_pacing(override_pacing(app.pacing(), &pacing));
            app.set_range(start, end);
            connect(&mut app, &endpoint)?;
            let status = app.export().clone();
            println!("{}", status);
            finish(status)
        }
        Command::Live { scene, seconds, pacing } => {
            let mut app = open_app(&scene, &settings)?;
            app.set_pacing(override_pacing(app.pacing(), &pacing));
            connect(&mut app, &endpoint)?;

            let live = app.live_toggle();
            let duration = Duration::try_from_secs_f64(seconds)
                .with_context(|| format!("Invalid duration: {}", seconds))?;
            thread::spawn(move || {
                thread::sleep(duration);
                live.set(false);
            });
            let status = app.live_update().clone();
            println!("{}", status);
            finish(status)
        }
        Command::Listen { bind, port, json } => {
            let port = port.unwrap_or(endpoint.port);
            listen(&bind, port, &settings, json)
        }
    }
}

fn open_app(args: &SceneArgs, settings: &Settings) -> Result<SockApp<SceneHost>> {
    let scene = Scene::load(&args.scene)?;
    let mut host = SceneHost::new(scene);
    if let Some(frame) = args.frame {
        host.set_current_frame(frame);
    }

    let mut app = SockApp::new(host, settings);
    // One-shot commands send exactly what was asked for
    app.set_snapshot_on_connect(false);
    Ok(app)
}

fn connect(app: &mut SockApp<SceneHost>, endpoint: &Endpoint) -> Result<()> {
    let status = app.connect(endpoint);
    if status.is_failure() {
        bail!("{}", status);
    }
    Ok(())
}

fn finish(status: Status) -> Result<()> {
    if status.is_failure() {
        bail!("{}", status);
    }
    debug!("{}", status);
    Ok(())
}

fn override_pacing(base: Pacing, args: &PacingArgs) -> Pacing {
    let given = Pacing::from_secs(
        args.frame_delay.unwrap_or_default(),
        args.dag_multiplier.unwrap_or_default(),
    );
    Pacing {
        frame_delay: args.frame_delay.map_or(base.frame_delay, |_| given.frame_delay),
        dag_multiplier: args.dag_multiplier.map_or(base.dag_multiplier, |_| given.dag_multiplier),
    }
}

fn listen(bind: &str, port: u16, settings: &Settings, json: bool) -> Result<()> {
    let (addr, events) = FrameListener::start((bind, port), settings.framing())
        .with_context(|| format!("Failed to listen on {}:{}", bind, port))?;
    println!("Listening on {} ({} framing), Ctrl+C to stop", addr, settings.framing());

    let stdout = std::io::stdout();
    for event in events {
        let mut out = stdout.lock();
        match event {
            ListenerEvent::Connected { peer } => writeln!(out, "+ {}", peer)?,
            ListenerEvent::Disconnected { peer } => writeln!(out, "- {}", peer)?,
            ListenerEvent::Invalid { peer, error } => writeln!(out, "! {}: {}", peer, error)?,
            ListenerEvent::Envelope { peer, envelope } => {
                if json {
                    writeln!(out, "{}", serde_json::to_string(&envelope)?)?;
                } else {
                    let clip = envelope
                        .film_clip
                        .as_ref()
                        .map(|doc| format!("{} attributes", doc.len()))
                        .unwrap_or_else(|| "no clip".to_string());
                    writeln!(
                        out,
                        "{} {} frame {} @ {} fps [{} / {}] {}",
                        peer,
                        envelope.kind,
                        envelope.current_frame,
                        envelope.frame_rate,
                        envelope.project,
                        envelope.map,
                        clip
                    )?;
                }
            }
        }
    }
    Ok(())
}
