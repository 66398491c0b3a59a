use crate::config::Config;
use crate::controller::{Controller, GateOutcome};
use crate::display::{Display, Transport};
use crate::messages::EventReceiver;
use crate::meter::LevelMeter;
use crate::permission::ConsentPermission;
use crate::settings;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};

const SLIDER_WIDTH: usize = 24;
const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A user gesture read from the terminal
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TogglePlayback,
    ToggleRecording,
    Scrub(f64),
    Load(PathBuf),
    ClearMeter,
    Answer(bool),
    OpenSettings,
    Cancel,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    None,
    Permission,
    Settings,
}

/// Terminal stand-in for the recorder screen.
///
/// Owns the controller for its lifetime and tears it down on exit.
pub struct Screen {
    controller: Rc<RefCell<Controller>>,
    permission: Rc<ConsentPermission>,
    config: Config,
    events: EventReceiver,
    prompt: Prompt,
    settings_opened: bool,
}

impl Screen {
    pub fn new(
        controller: Rc<RefCell<Controller>>,
        permission: Rc<ConsentPermission>,
        config: Config,
        events: EventReceiver,
    ) -> Self {
        controller
            .borrow_mut()
            .on_refresh(Box::new(|display: &Display, meter: &LevelMeter| {
                draw(&render_status(display, meter))
            }));

        Self {
            controller,
            permission,
            config,
            events,
            prompt: Prompt::None,
            settings_opened: false,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        println!("p play/pause · r record · s <sec> scrub · o <file> open · c clear meter · q quit");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                Some(event) = self.events.recv() => {
                    tracing::debug!("Audio event: {:?}", event);
                    self.controller.borrow_mut().handle_event(event);
                }
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read input")? else {
                        break;
                    };
                    let Some(command) = parse_command(&line, self.prompt) else {
                        if !line.trim().is_empty() {
                            say(&format!("Unknown command: {}", line.trim()));
                        }
                        continue;
                    };
                    if command == Command::Quit {
                        break;
                    }
                    self.handle(command);
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.controller.borrow_mut().teardown();
        println!();
        Ok(())
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::TogglePlayback => self.controller.borrow_mut().toggle_playback(),
            Command::ToggleRecording => self.toggle_recording(),
            Command::Scrub(seconds) => {
                let mut controller = self.controller.borrow_mut();
                controller.seek(seconds);
                controller.commit_scrub();
            }
            Command::Load(path) => {
                if let Err(e) = self.controller.borrow_mut().load_audio(&path) {
                    tracing::warn!("Could not load {:?}: {}", path, e);
                    say(&format!("Could not load {}: {}", path.display(), e));
                }
            }
            Command::ClearMeter => self.controller.borrow_mut().reset_meter(),
            Command::Answer(granted) => self.answer_permission(granted),
            Command::OpenSettings => {
                self.prompt = Prompt::None;
                match Config::config_path() {
                    Ok(path) => {
                        settings::open(&self.config.settings_command, &path);
                        self.settings_opened = true;
                    }
                    Err(e) => tracing::warn!("No settings location: {}", e),
                }
            }
            Command::Cancel => self.prompt = Prompt::None,
            Command::Quit => {}
        }
    }

    fn toggle_recording(&mut self) {
        if self.settings_opened && !self.controller.borrow().is_recording() {
            match Config::load() {
                Ok(fresh) => {
                    self.permission.reload(fresh.microphone_access);
                    self.config.microphone_access = fresh.microphone_access;
                }
                Err(e) => tracing::warn!("Could not reread settings: {}", e),
            }
        }

        let outcome = self.controller.borrow_mut().toggle_recording();
        match outcome {
            GateOutcome::Requested => {
                self.prompt = Prompt::Permission;
                say("Allow microphone access? [y/n]");
            }
            GateOutcome::SettingsPrompt => {
                self.prompt = Prompt::Settings;
                say("Microphone access is off. [s] open settings · [c] cancel");
            }
            GateOutcome::StartFailed => say("Recording could not start, see log"),
            GateOutcome::Started | GateOutcome::Stopped => {}
        }
    }

    fn answer_permission(&mut self, granted: bool) {
        self.prompt = Prompt::None;
        if !self.permission.resolve(granted) {
            return;
        }
        self.config.microphone_access = Some(granted);
        if let Err(e) = self.config.save() {
            tracing::warn!("Could not store microphone consent: {}", e);
        }
        if granted {
            say("Microphone enabled, press r to record");
        }
    }
}

/// Interpret one input line in the context of the current prompt
fn parse_command(line: &str, prompt: Prompt) -> Option<Command> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match (prompt, head, rest.is_empty()) {
        (Prompt::Permission, "y" | "yes", true) => Some(Command::Answer(true)),
        (Prompt::Permission, "n" | "no", true) => Some(Command::Answer(false)),
        (Prompt::Settings, "s", true) => Some(Command::OpenSettings),
        (Prompt::Settings, "c", true) => Some(Command::Cancel),
        (_, "p", true) => Some(Command::TogglePlayback),
        (_, "r", true) => Some(Command::ToggleRecording),
        (_, "c", true) => Some(Command::ClearMeter),
        (_, "q", true) => Some(Command::Quit),
        (_, "s", false) => rest.parse().ok().map(Command::Scrub),
        (_, "o", false) => Some(Command::Load(PathBuf::from(rest))),
        _ => None,
    }
}

/// One status line: buttons, slider, labels and the level window
pub fn render_status(display: &Display, meter: &LevelMeter) -> String {
    let play = if display.play_selected { '⏸' } else { '▶' };
    let record = if display.record_selected { '■' } else { '●' };

    let filled = if display.slider_max > 0.0 {
        ((display.slider_value / display.slider_max) * SLIDER_WIDTH as f64).round() as usize
    } else {
        0
    }
    .min(SLIDER_WIDTH);
    let slider = format!("{}{}", "=".repeat(filled), "-".repeat(SLIDER_WIDTH - filled));

    let clock = match display.transport {
        Transport::Recording { .. } => display.recording_elapsed.as_str(),
        Transport::Idle | Transport::Playing { .. } => "--:--",
    };

    // Pad the meter so the line keeps its width while the window fills
    let bars: String = meter
        .values()
        .map(|v| BARS[(v * (BARS.len() - 1) as f32).round() as usize])
        .chain(std::iter::repeat_n(' ', meter.capacity() - meter.len()))
        .collect();

    format!(
        "{}{} {} [{}] {}  rec {}  {}",
        play, record, display.elapsed, slider, display.remaining, clock, bars
    )
}

fn draw(line: &str) {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r\x1b[2K{}", line);
    let _ = stdout.flush();
}

fn say(message: &str) {
    println!("\r\x1b[2K{}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_commands() {
        assert_eq!(parse_command("p", Prompt::None), Some(Command::TogglePlayback));
        assert_eq!(parse_command(" r ", Prompt::None), Some(Command::ToggleRecording));
        assert_eq!(parse_command("s 12.5", Prompt::None), Some(Command::Scrub(12.5)));
        assert_eq!(
            parse_command("o /tmp/piano file.wav", Prompt::None),
            Some(Command::Load(PathBuf::from("/tmp/piano file.wav")))
        );
        assert_eq!(parse_command("c", Prompt::None), Some(Command::ClearMeter));
        assert_eq!(parse_command("q", Prompt::None), Some(Command::Quit));
        assert_eq!(parse_command("s abc", Prompt::None), None);
        assert_eq!(parse_command("y", Prompt::None), None);
        assert_eq!(parse_command("", Prompt::None), None);
    }

    #[test]
    fn test_parse_in_prompts() {
        assert_eq!(parse_command("y", Prompt::Permission), Some(Command::Answer(true)));
        assert_eq!(parse_command("no", Prompt::Permission), Some(Command::Answer(false)));
        assert_eq!(parse_command("s", Prompt::Settings), Some(Command::OpenSettings));
        assert_eq!(parse_command("c", Prompt::Settings), Some(Command::Cancel));
        // scrubbing still works while a prompt is showing
        assert_eq!(parse_command("s 3", Prompt::Settings), Some(Command::Scrub(3.0)));
        assert_eq!(parse_command("s", Prompt::None), None);
    }

    #[test]
    fn test_render_status() {
        let mut meter = LevelMeter::new(4, -60.0);
        meter.add_value(-60.0);
        meter.add_value(0.0);

        let display = Display {
            transport: Transport::Playing {
                position: 30.0,
                duration: 60.0,
            },
            elapsed: "00:30".to_string(),
            remaining: "-00:30".to_string(),
            slider_max: 60.0,
            slider_value: 30.0,
            play_selected: true,
            record_selected: false,
            recording_elapsed: "00:00".to_string(),
        };

        let line = render_status(&display, &meter);
        let slider = format!("[{}{}]", "=".repeat(12), "-".repeat(12));
        assert_eq!(line, format!("⏸● 00:30 {} -00:30  rec --:--  ▁█  ", slider));
    }

    #[test]
    fn test_render_recording_clock() {
        let mut display = Display::default();
        display.transport = Transport::Recording { elapsed: 75.0 };
        display.record_selected = true;
        display.recording_elapsed = "01:15".to_string();

        let line = render_status(&display, &LevelMeter::new(2, -60.0));
        assert_eq!(line, "▶■ 00:00 [------------------------] -00:00  rec 01:15    ");
    }

    #[test]
    fn test_render_empty_screen() {
        let line = render_status(&Display::default(), &LevelMeter::default());
        assert!(line.starts_with("▶● 00:00 [------------------------] -00:00  rec --:--"));
        assert!(line.ends_with(&" ".repeat(LevelMeter::DEFAULT_CAPACITY)));
    }
}
