//! Driver configuration.
//!
//! Wraps the audio [`SoundConfig`] with the parameters of the scripted soak
//! run. Loaded from and saved to `spindash.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use spindash_audio::SoundConfig;
use spindash_common::TIC_RATE;

/// Configuration file name.
pub const CONFIG_FILE: &str = "spindash.toml";

/// Driver configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Run ===
    /// Tics to simulate
    pub tics: u32,
    /// Moving emitters around the player
    pub emitters: usize,
    /// Orbit radius of the emitters, in map units
    pub orbit_radius: i32,
    /// Tics between sound starts
    pub sound_interval: u32,
    /// Tics between jingles (0 disables them)
    pub jingle_interval: u32,
    /// Tic at which the game pauses for one second (0 disables it)
    pub pause_at: u32,

    // === Content ===
    /// Level background track
    pub level_music: String,
    /// Sound catalog file; the built-in catalog is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    // === Audio ===
    /// Sound settings
    pub sound: SoundConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tics: 60 * TIC_RATE,
            emitters: 12,
            orbit_radius: 768,
            sound_interval: 3,
            jingle_interval: 20 * TIC_RATE,
            pause_at: 30 * TIC_RATE,
            level_music: "gfz1".into(),
            catalog: None,
            sound: SoundConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut f| f.read_to_string(&mut contents)) {
            warn!("Failed to read config file: {e}");
            return Self::default();
        }

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.emitters = self.emitters.min(256);
        self.orbit_radius = self.orbit_radius.clamp(0, 8192);
        self.sound_interval = self.sound_interval.max(1);
        self.sound.validate();
    }
}
