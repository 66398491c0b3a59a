use crate::audio::{Player, Recorder};

/// Transport state observed from the live player and recorder
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Transport {
    #[default]
    Idle,
    Playing { position: f64, duration: f64 },
    Recording { elapsed: f64 },
}

impl Transport {
    pub fn observe(player: Option<&dyn Player>, recorder: Option<&dyn Recorder>) -> Self {
        if let Some(recorder) = recorder.filter(|r| r.is_recording()) {
            return Transport::Recording {
                elapsed: recorder.current_time(),
            };
        }
        match player.filter(|p| p.is_playing()) {
            Some(player) => Transport::Playing {
                position: player.current_position(),
                duration: player.duration(),
            },
            None => Transport::Idle,
        }
    }
}

/// Everything the screen shows, re-derived on every refresh
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub transport: Transport,
    pub elapsed: String,
    pub remaining: String,
    pub slider_max: f64,
    pub slider_value: f64,
    pub play_selected: bool,
    pub record_selected: bool,
    pub recording_elapsed: String,
}

impl Display {
    pub fn derive(player: Option<&dyn Player>, recorder: Option<&dyn Recorder>) -> Self {
        let position = player.map(|p| p.current_position()).unwrap_or(0.0);
        let duration = player.map(|p| p.duration()).unwrap_or(0.0);
        let recording_time = recorder.map(|r| r.current_time()).unwrap_or(0.0);

        // Round the duration so both labels roll over on the same tick
        let remaining = duration.round() - position;

        Self {
            transport: Transport::observe(player, recorder),
            elapsed: format_interval(position),
            remaining: format!("-{}", format_interval(remaining)),
            slider_max: duration,
            slider_value: position,
            play_selected: player.is_some_and(|p| p.is_playing()),
            record_selected: recorder.is_some_and(|r| r.is_recording()),
            recording_elapsed: format_interval(recording_time),
        }
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::derive(None, None)
    }
}

/// `mm:ss`, truncating fractions. Negative or non-finite input shows `00:00`.
pub fn format_interval(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Deck, FakePlayer, FakeRecorder};

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0.0), "00:00");
        assert_eq!(format_interval(10.2), "00:10");
        assert_eq!(format_interval(59.999), "00:59");
        assert_eq!(format_interval(115.8), "01:55");
        assert_eq!(format_interval(3725.0), "62:05");
        assert_eq!(format_interval(-0.3), "00:00");
        assert_eq!(format_interval(f64::NAN), "00:00");
    }

    #[test]
    fn test_remaining_uses_rounded_duration() {
        let deck = Deck::shared();
        {
            let mut d = deck.borrow_mut();
            d.duration = 125.7;
            d.position = 10.2;
        }
        let player = FakePlayer::new(&deck);
        let display = Display::derive(Some(&player), None);

        // round(125.7) = 126, 126 - 10.2 = 115.8
        assert_eq!(display.elapsed, "00:10");
        assert_eq!(display.remaining, "-01:55");
        assert_eq!(display.slider_max, 125.7);
        assert_eq!(display.slider_value, 10.2);
        assert!(!display.play_selected);
        assert_eq!(display.transport, Transport::Idle);
    }

    #[test]
    fn test_position_past_rounded_duration() {
        let deck = Deck::shared();
        {
            let mut d = deck.borrow_mut();
            d.duration = 125.3;
            d.position = 125.3;
        }
        let player = FakePlayer::new(&deck);
        let display = Display::derive(Some(&player), None);
        assert_eq!(display.remaining, "-00:00");
    }

    #[test]
    fn test_nothing_loaded() {
        let display = Display::default();
        assert_eq!(display.elapsed, "00:00");
        assert_eq!(display.remaining, "-00:00");
        assert_eq!(display.slider_max, 0.0);
        assert!(!display.play_selected);
        assert!(!display.record_selected);
    }

    #[test]
    fn test_transport_observation() {
        let deck = Deck::shared();
        deck.borrow_mut().duration = 30.0;
        let player = FakePlayer::new(&deck);
        let recorder = FakeRecorder::new(&deck);

        deck.borrow_mut().playing = true;
        deck.borrow_mut().position = 4.0;
        assert_eq!(
            Transport::observe(Some(&player), Some(&recorder)),
            Transport::Playing {
                position: 4.0,
                duration: 30.0
            }
        );

        {
            let mut d = deck.borrow_mut();
            d.playing = false;
            d.recording = true;
            d.record_time = 2.5;
        }
        let display = Display::derive(Some(&player), Some(&recorder));
        assert_eq!(display.transport, Transport::Recording { elapsed: 2.5 });
        assert!(display.record_selected);
        assert_eq!(display.recording_elapsed, "00:02");
    }
}
