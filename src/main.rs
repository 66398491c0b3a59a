mod audio;
mod config;
mod controller;
mod display;
mod driver;
mod error;
mod messages;
mod meter;
mod naming;
mod permission;
mod screen;
mod settings;
#[cfg(test)]
mod testing;

use audio::{CpalRecording, RodioPlayback};
use config::Config;
use controller::{Controller, Services};
use naming::TimestampNamer;
use permission::ConsentPermission;
use screen::Screen;

use anyhow::Result;
use std::path::Path;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so the status line on stdout stays intact
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting memodeck");

    let config = Config::load()?;
    config.validate()?;

    // Controller, timer and audio handles are !Send and live on one thread
    let local = tokio::task::LocalSet::new();

    local.run_until(async move { run_screen(config).await }).await
}

async fn run_screen(config: Config) -> Result<()> {
    let (event_tx, event_rx) = messages::channel();

    let permission = Rc::new(ConsentPermission::new(config.microphone_access));
    let services = Services {
        playback: Box::new(RodioPlayback::new(event_tx.clone())),
        recording: Box::new(CpalRecording::new(event_tx)),
        namer: Box::new(TimestampNamer::new(config.recordings_dir())),
        permission: permission.clone(),
    };

    let controller = Controller::new(services, config.audio_format(), config.meter());

    if let Some(locator) = config.startup_audio.as_deref() {
        if let Err(e) = controller.borrow_mut().load_audio(Path::new(locator)) {
            tracing::warn!("Could not load startup audio {}: {}", locator, e);
        }
    }

    tracing::info!("Recordings are saved in {:?}", config.recordings_dir());

    Screen::new(controller, permission, config, event_rx).run().await?;

    tracing::info!("memodeck shutdown complete");
    Ok(())
}
