//! Error types for the audio core.

use thiserror::Error;

use crate::ids::SoundId;

/// Top-level error type for audio operations.
///
/// None of these abort gameplay: the facade logs them and the sound or
/// music simply does not play.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No free channel and nothing of lower or equal priority to evict.
    #[error("no free or evictable channel for {sound}")]
    ResourceExhausted {
        /// Sound that was refused
        sound: SoundId,
    },

    /// A no-multiple or no-interrupt sound is already active.
    #[error("{sound} is already playing")]
    DuplicateSuppressed {
        /// Sound that was refused
        sound: SoundId,
    },

    /// Music track or sound data is absent.
    #[error("asset missing: {0}")]
    AssetMissing(String),

    /// A caller broke a structural rule (e.g. a second MASTER stack entry).
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),

    /// The platform backend failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration could not be parsed or written.
    #[error("config error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Whether this error is an expected, silent refusal rather than a fault.
    #[must_use]
    pub const fn is_silent_drop(&self) -> bool {
        matches!(
            self,
            Self::ResourceExhausted { .. } | Self::DuplicateSuppressed { .. }
        )
    }
}

/// Errors reported by the platform sound/music backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// No output device.
    #[error("audio device unavailable")]
    DeviceUnavailable,

    /// Sound or song data could not be loaded.
    #[error("failed to load '{name}': {message}")]
    LoadFailed {
        /// Asset name
        name: String,
        /// Backend message
        message: String,
    },

    /// Data loaded but playback could not start.
    #[error("failed to play '{name}'")]
    PlaybackFailed {
        /// Asset name
        name: String,
    },
}

/// Result type alias for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
