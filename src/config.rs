use crate::audio::AudioFormat;
use crate::meter::LevelMeter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub recordings_dir: Option<String>,

    #[serde(default)]
    pub startup_audio: Option<String>,

    #[serde(default = "default_meter_capacity")]
    pub meter_capacity: usize,

    #[serde(default = "default_meter_floor_db")]
    pub meter_floor_db: f32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Microphone consent: `null` until asked
    #[serde(default)]
    pub microphone_access: Option<bool>,

    #[serde(default = "default_settings_command")]
    pub settings_command: String,
}

fn default_meter_capacity() -> usize {
    LevelMeter::DEFAULT_CAPACITY
}

fn default_meter_floor_db() -> f32 {
    LevelMeter::DEFAULT_FLOOR_DB
}

fn default_sample_rate() -> u32 {
    AudioFormat::default().sample_rate
}

fn default_channels() -> u16 {
    AudioFormat::default().channels
}

fn default_settings_command() -> String {
    "xdg-open".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recordings_dir: None,
            startup_audio: None,
            meter_capacity: default_meter_capacity(),
            meter_floor_db: default_meter_floor_db(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            microphone_access: None,
            settings_command: default_settings_command(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/memodeck/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("memodeck").join("config.json"))
    }

    pub fn recordings_dir(&self) -> PathBuf {
        match &self.recordings_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("memodeck"),
        }
    }

    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    pub fn meter(&self) -> LevelMeter {
        LevelMeter::new(self.meter_capacity, self.meter_floor_db)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.meter_capacity == 0 {
            return Err(anyhow::anyhow!("meter_capacity must be greater than 0"));
        }

        if self.meter_floor_db.is_nan() || self.meter_floor_db >= 0.0 {
            return Err(anyhow::anyhow!("meter_floor_db must be negative"));
        }

        if !(8000..=192_000).contains(&self.sample_rate) {
            return Err(anyhow::anyhow!("sample_rate must be between 8000 and 192000"));
        }

        if !(1..=2).contains(&self.channels) {
            return Err(anyhow::anyhow!("channels must be 1 or 2"));
        }

        if self.settings_command.trim().is_empty() {
            return Err(anyhow::anyhow!("settings_command cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.audio_format(), AudioFormat::default());
        assert_eq!(config.meter().capacity(), 96);
        assert_eq!(config.microphone_access, None);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = Config::parse(r#"{ "microphone_access": false }"#).unwrap();
        assert_eq!(config.microphone_access, Some(false));
        assert_eq!(config.meter_capacity, 96);
        assert_eq!(config.meter_floor_db, -60.0);
        assert_eq!(config.settings_command, "xdg-open");
        assert!(config.recordings_dir().ends_with("memodeck"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.meter_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.meter_floor_db = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.meter_floor_db = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.channels = 6;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sample_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrips_through_json() {
        let mut config = Config::default();
        config.recordings_dir = Some("/srv/takes".to_string());
        config.microphone_access = Some(true);
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::parse(&json).unwrap();
        assert_eq!(parsed.recordings_dir(), PathBuf::from("/srv/takes"));
        assert_eq!(parsed.microphone_access, Some(true));
    }
}
