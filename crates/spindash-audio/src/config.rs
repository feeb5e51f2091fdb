//! Sound configuration.
//!
//! The recognised sound and music settings. Loaded from and saved to TOML;
//! a missing or unreadable file falls back to defaults.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::channel::DEFAULT_CHANNELS;
use crate::spatial::OutdoorSearch;

/// Smallest allowed channel count.
pub const MIN_CHANNELS: usize = 1;

/// Largest allowed channel count.
pub const MAX_CHANNELS: usize = 256;

/// Default volume: step 18 of the 31-step slider, as a percentage.
pub const DEFAULT_VOLUME: u8 = (18_u32 * 100 / 31) as u8;

/// Sound and music settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    // === Volume ===
    /// Sound effects volume (0-100)
    pub sound_volume: u8,
    /// Music volume (0-100)
    pub music_volume: u8,

    // === Mixer ===
    /// Number of mixer channels
    pub channels: usize,
    /// Swap left and right
    pub stereo_reverse: bool,
    /// Play sounds behind the listener through the surround path
    pub surround: bool,

    // === Behaviour ===
    /// Show closed captions
    pub closed_captioning: bool,
    /// Keep playing sounds when the window loses focus
    pub play_sound_if_unfocused: bool,
    /// Keep playing music when the window loses focus
    pub play_music_if_unfocused: bool,
    /// Load every sound at startup instead of on first use
    pub precache_sound: bool,

    // === Master switches ===
    /// Disable sound effects entirely
    pub sound_disabled: bool,
    /// Disable music entirely
    pub music_disabled: bool,

    // === Spatial ===
    /// Open-sky search grid for outdoor sounds
    pub outdoor_search: OutdoorSearch,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            sound_volume: DEFAULT_VOLUME,
            music_volume: DEFAULT_VOLUME,
            channels: DEFAULT_CHANNELS,
            stereo_reverse: false,
            surround: false,
            closed_captioning: false,
            play_sound_if_unfocused: false,
            play_music_if_unfocused: false,
            precache_sound: false,
            sound_disabled: false,
            music_disabled: false,
            outdoor_search: OutdoorSearch::default(),
        }
    }
}

impl SoundConfig {
    /// Loads configuration from `path`.
    ///
    /// Returns defaults if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Sound config not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut f| f.read_to_string(&mut contents)) {
            warn!("Failed to read sound config: {e}");
            return Self::default();
        }

        match Self::from_toml_str(&contents) {
            Ok(config) => {
                info!("Loaded sound config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse sound config: {e}");
                Self::default()
            },
        }
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(text)?;
        config.validate();
        Ok(config)
    }

    /// Saves configuration to `path`.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved sound config to {}", path.display());
        Ok(())
    }

    /// Clamps values to their valid ranges.
    pub fn validate(&mut self) {
        self.sound_volume = self.sound_volume.min(100);
        self.music_volume = self.music_volume.min(100);
        self.channels = self.channels.clamp(MIN_CHANNELS, MAX_CHANNELS);
        self.outdoor_search.step = self.outdoor_search.step.clamp(1, 1024);
        self.outdoor_search.radius = self.outdoor_search.radius.clamp(0, 8192);
    }

    /// Builder: sets the channel count.
    #[must_use]
    pub const fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Builder: enables closed captions.
    #[must_use]
    pub const fn with_captions(mut self, enabled: bool) -> Self {
        self.closed_captioning = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SoundConfig::default();
        assert_eq!(config.channels, DEFAULT_CHANNELS);
        assert_eq!(config.sound_volume, 58);
        assert_eq!(config.music_volume, 58);
        assert!(!config.closed_captioning);
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = SoundConfig {
            sound_volume: 250,
            channels: 0,
            ..SoundConfig::default()
        };
        config.validate();
        assert_eq!(config.sound_volume, 100);
        assert_eq!(config.channels, MIN_CHANNELS);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SoundConfig::from_toml_str("channels = 8\nsurround = true\n").expect("parse");
        assert_eq!(config.channels, 8);
        assert!(config.surround);
        assert_eq!(config.music_volume, SoundConfig::default().music_volume);
        assert_eq!(config.outdoor_search, OutdoorSearch::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("sound.toml");
        let config = SoundConfig::default().with_channels(12).with_captions(true);
        config.save_to(&path).expect("save");

        let loaded = SoundConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            SoundConfig::load_from(dir.path().join("absent.toml")),
            SoundConfig::default()
        );

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "channels = \"lots\"").expect("write");
        assert_eq!(SoundConfig::load_from(&bad), SoundConfig::default());
    }
}
