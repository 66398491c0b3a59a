//! Scripted audio services for unit tests.

use crate::audio::{AudioFormat, PlaybackService, Player, Recorder, RecordingService};
use crate::controller::{Controller, Services};
use crate::error::{LoadError, RecordError, SessionError};
use crate::meter::LevelMeter;
use crate::naming::FileNamer;
use crate::permission::{AccessCallback, PermissionProvider, PermissionStatus};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Run `future` on a fresh local set so `spawn_local` works
pub async fn local<F: Future>(future: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(future).await
}

/// Shared state behind the fake player and recorder
#[derive(Debug, Default)]
pub struct Deck {
    pub playing: bool,
    pub position: f64,
    pub duration: f64,
    pub player_level: f32,
    pub recording: bool,
    pub record_time: f64,
    pub recorder_level: f32,
    pub opened: Vec<PathBuf>,
    pub record_targets: Vec<PathBuf>,
    pub next_duration: f64,
    pub fail_activate: bool,
    pub fail_load: bool,
    pub fail_record: bool,
}

pub type SharedDeck = Rc<RefCell<Deck>>;

impl Deck {
    pub fn shared() -> SharedDeck {
        Rc::new(RefCell::new(Deck {
            next_duration: 60.0,
            player_level: -20.0,
            recorder_level: -10.0,
            ..Deck::default()
        }))
    }
}

pub struct FakePlayer {
    deck: SharedDeck,
}

impl FakePlayer {
    pub fn new(deck: &SharedDeck) -> Self {
        Self { deck: deck.clone() }
    }
}

impl Player for FakePlayer {
    fn play(&mut self) {
        self.deck.borrow_mut().playing = true;
    }

    fn pause(&mut self) {
        self.deck.borrow_mut().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.deck.borrow().playing
    }

    fn current_position(&self) -> f64 {
        self.deck.borrow().position
    }

    fn set_position(&mut self, seconds: f64) {
        self.deck.borrow_mut().position = seconds;
    }

    fn duration(&self) -> f64 {
        self.deck.borrow().duration
    }

    fn current_level(&self, _channel: usize) -> f32 {
        self.deck.borrow().player_level
    }
}

pub struct FakeRecorder {
    deck: SharedDeck,
}

impl FakeRecorder {
    pub fn new(deck: &SharedDeck) -> Self {
        Self { deck: deck.clone() }
    }
}

impl Recorder for FakeRecorder {
    fn record(&mut self) -> Result<(), RecordError> {
        let mut deck = self.deck.borrow_mut();
        if deck.fail_record {
            return Err(RecordError::Stream("device busy".to_string()));
        }
        deck.recording = true;
        deck.record_time = 0.0;
        Ok(())
    }

    fn stop(&mut self) {
        self.deck.borrow_mut().recording = false;
    }

    fn is_recording(&self) -> bool {
        self.deck.borrow().recording
    }

    fn current_time(&self) -> f64 {
        self.deck.borrow().record_time
    }

    fn current_level(&self, _channel: usize) -> f32 {
        self.deck.borrow().recorder_level
    }
}

pub struct FakePlayback {
    deck: SharedDeck,
}

impl PlaybackService for FakePlayback {
    fn activate(&mut self) -> Result<(), SessionError> {
        if self.deck.borrow().fail_activate {
            return Err(SessionError::Output("device in use".to_string()));
        }
        Ok(())
    }

    fn open(&mut self, locator: &Path) -> Result<Box<dyn Player>, LoadError> {
        let mut deck = self.deck.borrow_mut();
        if deck.fail_load {
            return Err(LoadError::Decode {
                path: locator.to_path_buf(),
                reason: "corrupt".to_string(),
            });
        }
        deck.opened.push(locator.to_path_buf());
        deck.playing = false;
        deck.position = 0.0;
        deck.duration = deck.next_duration;
        Ok(Box::new(FakePlayer::new(&self.deck)))
    }
}

pub struct FakeRecording {
    deck: SharedDeck,
}

impl RecordingService for FakeRecording {
    fn open(&mut self, target: &Path, _format: AudioFormat) -> Result<Box<dyn Recorder>, RecordError> {
        self.deck.borrow_mut().record_targets.push(target.to_path_buf());
        Ok(Box::new(FakeRecorder::new(&self.deck)))
    }
}

pub struct FakeNamer {
    dir: PathBuf,
    count: u32,
}

impl FileNamer for FakeNamer {
    fn new_recording_path(&mut self) -> std::io::Result<PathBuf> {
        self.count += 1;
        Ok(self.dir.join(format!("take-{}.wav", self.count)))
    }
}

pub struct FakePermission {
    pub status: Cell<PermissionStatus>,
    pub requests: Cell<u32>,
    pub pending: RefCell<Option<AccessCallback>>,
}

impl FakePermission {
    pub fn new(status: PermissionStatus) -> Self {
        Self {
            status: Cell::new(status),
            requests: Cell::new(0),
            pending: RefCell::new(None),
        }
    }

    pub fn answer(&self, granted: bool) {
        if let Some(callback) = self.pending.borrow_mut().take() {
            if granted {
                self.status.set(PermissionStatus::Granted);
            } else {
                self.status.set(PermissionStatus::Denied);
            }
            callback(granted);
        }
    }
}

impl PermissionProvider for FakePermission {
    fn current_status(&self) -> PermissionStatus {
        self.status.get()
    }

    fn request_access(&self, callback: AccessCallback) {
        self.requests.set(self.requests.get() + 1);
        *self.pending.borrow_mut() = Some(callback);
    }
}

pub fn services(deck: &SharedDeck, permission: Rc<FakePermission>) -> Services {
    Services {
        playback: Box::new(FakePlayback { deck: deck.clone() }),
        recording: Box::new(FakeRecording { deck: deck.clone() }),
        namer: Box::new(FakeNamer {
            dir: PathBuf::from("/tmp/memodeck-test"),
            count: 0,
        }),
        permission,
    }
}

/// Controller wired to fakes, with a small meter window
pub fn controller(
    deck: &SharedDeck,
    status: PermissionStatus,
) -> (Rc<RefCell<Controller>>, Rc<FakePermission>) {
    let permission = Rc::new(FakePermission::new(status));
    let controller = Controller::new(
        services(deck, permission.clone()),
        AudioFormat::default(),
        LevelMeter::new(16, -60.0),
    );
    (controller, permission)
}
