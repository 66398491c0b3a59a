use crate::audio::{AudioFormat, PlaybackService, Player, Recorder, RecordingService};
use crate::display::Display;
use crate::driver::{PollingDriver, Tick, TickToken};
use crate::error::{LoadError, RecordError};
use crate::messages::AudioEvent;
use crate::meter::LevelMeter;
use crate::naming::{FileNamer, RecordingTarget};
use crate::permission::{self, GateDecision, PermissionProvider};
use std::cell::RefCell;
use std::path::Path;
use std::rc::{Rc, Weak};

/// Platform collaborators injected into the controller
pub struct Services {
    pub playback: Box<dyn PlaybackService>,
    pub recording: Box<dyn RecordingService>,
    pub namer: Box<dyn FileNamer>,
    pub permission: Rc<dyn PermissionProvider>,
}

/// Called after every refresh with the derived values and the meter window
pub type RefreshListener = Box<dyn FnMut(&Display, &LevelMeter)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrubState {
    pub should_resume_after_scrub: bool,
}

/// Result of the record gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Stopped,
    Started,
    StartFailed,
    Requested,
    SettingsPrompt,
}

/// Owns the player/recorder pair for one screen and drives its display.
///
/// Playback and recording are mutually exclusive: starting one stops the
/// other.
pub struct Controller {
    this: Weak<RefCell<Controller>>,
    services: Services,
    format: AudioFormat,
    player: Option<Box<dyn Player>>,
    recorder: Option<Box<dyn Recorder>>,
    target: Option<RecordingTarget>,
    scrub: ScrubState,
    meter: LevelMeter,
    driver: PollingDriver,
    display: Display,
    listeners: Vec<RefreshListener>,
    torn_down: bool,
}

impl Controller {
    /// Build a controller and prepare the audio session.
    ///
    /// A session that cannot be activated is logged and tolerated; loading
    /// audio will then fail until the output comes back.
    pub fn new(mut services: Services, format: AudioFormat, meter: LevelMeter) -> Rc<RefCell<Self>> {
        if let Err(e) = services.playback.activate() {
            tracing::warn!("Audio session unavailable, continuing without output: {}", e);
        }

        Rc::new_cyclic(|this| {
            RefCell::new(Self {
                this: this.clone(),
                services,
                format,
                player: None,
                recorder: None,
                target: None,
                scrub: ScrubState::default(),
                meter,
                driver: PollingDriver::new(),
                display: Display::default(),
                listeners: Vec::new(),
                torn_down: false,
            })
        })
    }

    pub fn on_refresh(&mut self, listener: RefreshListener) {
        self.listeners.push(listener);
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn meter(&self) -> &LevelMeter {
        &self.meter
    }

    pub fn is_playing(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.is_playing())
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.as_ref().is_some_and(|r| r.is_recording())
    }

    /// Bind a playable asset, replacing the current one.
    ///
    /// On failure the previous asset and transport state are untouched.
    pub fn load_audio(&mut self, locator: &Path) -> Result<(), LoadError> {
        let player = self.services.playback.open(locator)?;

        if self.is_recording() {
            // The pending take is abandoned rather than loaded over this asset
            self.stop_recording();
            self.target = None;
        }
        if let Some(mut previous) = self.player.take() {
            previous.pause();
        }
        self.driver.stop();
        self.scrub = ScrubState::default();
        self.player = Some(player);

        tracing::info!("Audio loaded from {:?}", locator);
        self.refresh();
        Ok(())
    }

    pub fn play(&mut self) {
        if self.torn_down || self.player.is_none() {
            tracing::debug!("Nothing to play");
            return;
        }
        if self.is_recording() {
            tracing::info!("Stopping recording to start playback");
            self.stop_recording();
        }
        if let Some(player) = self.player.as_mut() {
            player.play();
        }
        self.driver.start(self.this.clone());
        tracing::info!("Playback started");
        self.refresh();
    }

    pub fn pause(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
        if !self.is_recording() {
            self.driver.stop();
        }
        self.refresh();
    }

    pub fn toggle_playback(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead while the user drags the slider.
    ///
    /// Active playback is paused and remembered so `commit_scrub` can resume it.
    pub fn seek(&mut self, target_seconds: f64) {
        if self.player.is_none() {
            return;
        }
        if self.is_playing() {
            self.pause();
            self.scrub.should_resume_after_scrub = true;
        }
        if let Some(player) = self.player.as_mut() {
            let duration = player.duration().max(0.0);
            let position = if target_seconds.is_nan() {
                0.0
            } else {
                target_seconds.clamp(0.0, duration)
            };
            player.set_position(position);
        }
        self.refresh();
    }

    /// Finish a drag, resuming playback if the drag paused it
    pub fn commit_scrub(&mut self) {
        if !self.scrub.should_resume_after_scrub {
            return;
        }
        self.scrub.should_resume_after_scrub = false;
        self.play();
    }

    pub fn start_recording(&mut self) -> Result<(), RecordError> {
        if self.torn_down {
            return Err(RecordError::Unavailable("screen was torn down"));
        }
        if self.is_recording() {
            tracing::debug!("Already recording");
            return Ok(());
        }

        let path = self
            .services
            .namer
            .new_recording_path()
            .map_err(RecordError::Target)?;

        let mut recorder = self.services.recording.open(&path, self.format)?;
        if let Err(e) = recorder.record() {
            drop(recorder);
            discard_partial(&path);
            return Err(e);
        }

        if self.is_playing() {
            tracing::info!("Pausing playback to start recording");
            if let Some(player) = self.player.as_mut() {
                player.pause();
            }
            self.scrub = ScrubState::default();
        }

        tracing::info!("Recording to {:?}", path);
        self.recorder = Some(recorder);
        self.target = Some(RecordingTarget { path });
        self.driver.start(self.this.clone());
        self.refresh();
        Ok(())
    }

    /// Stop the active recorder. Completion arrives as `RecordingFinished`.
    pub fn stop_recording(&mut self) {
        let Some(recorder) = self.recorder.as_mut().filter(|r| r.is_recording()) else {
            return;
        };
        recorder.stop();
        self.driver.stop();
        tracing::info!("Recording stopped");
        self.refresh();
    }

    pub fn toggle_recording(&mut self) -> GateOutcome {
        if self.is_recording() {
            self.stop_recording();
            return GateOutcome::Stopped;
        }

        match permission::check(self.services.permission.as_ref()) {
            GateDecision::Proceed => match self.start_recording() {
                Ok(()) => GateOutcome::Started,
                Err(e) => {
                    tracing::error!("Failed to start recording: {}", e);
                    self.refresh();
                    GateOutcome::StartFailed
                }
            },
            GateDecision::Requested => GateOutcome::Requested,
            GateDecision::SettingsPrompt => GateOutcome::SettingsPrompt,
        }
    }

    pub fn reset_meter(&mut self) {
        self.meter.reset();
        self.refresh();
    }

    /// Apply a completion or failure notice from the audio backends
    pub fn handle_event(&mut self, event: AudioEvent) {
        if self.torn_down {
            return;
        }
        match event {
            AudioEvent::PlaybackFinished { success } => {
                if self.is_playing() {
                    tracing::debug!("Ignoring completion from a replaced player");
                    return;
                }
                if !success {
                    tracing::warn!("Playback finished unsuccessfully");
                }
                self.scrub = ScrubState::default();
                if !self.is_recording() {
                    self.driver.stop();
                }
            }
            AudioEvent::DecodeError(message) => {
                tracing::error!("Playback decode error: {}", message);
                if let Some(mut player) = self.player.take() {
                    player.pause();
                }
                self.scrub = ScrubState::default();
                if !self.is_recording() {
                    self.driver.stop();
                }
            }
            AudioEvent::RecordingFinished { success } => {
                self.recorder = None;
                if !self.is_playing() {
                    self.driver.stop();
                }
                match (success, self.target.take()) {
                    (true, Some(target)) if self.is_playing() => {
                        tracing::info!("Recording saved to {:?}, keeping current playback", target.path);
                    }
                    (true, Some(target)) => {
                        if let Err(e) = self.load_audio(&target.path) {
                            tracing::warn!("Recorded file {:?} could not be loaded: {}", target.path, e);
                        }
                    }
                    (false, Some(target)) => {
                        tracing::warn!("Recording failed, leaving {:?} on disk", target.path);
                    }
                    (_, None) => tracing::debug!("Recording finished with no pending target"),
                }
            }
            AudioEvent::EncodeError(message) => {
                tracing::error!("Recording encode error: {}", message);
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.stop();
                }
                if !self.is_playing() {
                    self.driver.stop();
                }
            }
        }
        self.refresh();
    }

    /// Stop the timer and any audio. Later calls are ignored.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.driver.stop();
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
        if let Some(recorder) = self.recorder.as_mut().filter(|r| r.is_recording()) {
            recorder.stop();
        }
        self.listeners.clear();
        self.torn_down = true;
        tracing::info!("Screen torn down");
    }

    fn refresh(&mut self) {
        self.display = Display::derive(self.player.as_deref(), self.recorder.as_deref());
        for listener in &mut self.listeners {
            listener(&self.display, &self.meter);
        }
    }
}

#[cfg(test)]
impl Controller {
    pub(crate) fn scrub_state(&self) -> ScrubState {
        self.scrub
    }

    pub(crate) fn transport(&self) -> crate::display::Transport {
        crate::display::Transport::observe(self.player.as_deref(), self.recorder.as_deref())
    }

    pub(crate) fn recording_target(&self) -> Option<&RecordingTarget> {
        self.target.as_ref()
    }

    pub(crate) fn has_audio(&self) -> bool {
        self.player.is_some()
    }

    pub(crate) fn is_polling(&self) -> bool {
        self.driver.is_running()
    }

    pub(crate) fn polling_token(&self) -> Option<TickToken> {
        self.driver.token()
    }
}

impl Tick for Controller {
    fn tick(&mut self, token: &TickToken) {
        if self.torn_down || !token.is_live() {
            return;
        }
        if let Some(recorder) = self.recorder.as_deref().filter(|r| r.is_recording()) {
            self.meter.add_value(recorder.current_level(0));
        }
        if let Some(player) = self.player.as_deref().filter(|p| p.is_playing()) {
            self.meter.add_value(player.current_level(0));
        }
        if !self.is_playing() && !self.is_recording() {
            // The player ran dry and its completion notice was already spent
            tracing::debug!("Transport went idle, stopping the poll");
            self.scrub = ScrubState::default();
            self.driver.stop();
        }
        self.refresh();
    }
}

fn discard_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed partial recording {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial recording {:?}: {}", path, e),
    }
}
