//! Platform backend interfaces.
//!
//! The backend opens devices, decodes and mixes. The audio core only ever
//! talks to it through these traits: start/stop/update voices, and load,
//! play, fade and seek a single song.

use spindash_common::{BackendError, SoundId};

use crate::sound_def::SoundDef;
use crate::spatial::{Separation, Spatialized, NORM_PITCH};
use crate::track::TrackName;

/// Opaque token for a playing voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle(u32);

impl VoiceHandle {
    /// Wraps a backend token.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the backend token.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque token for a music lump found by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MusicLump(u32);

impl MusicLump {
    /// Wraps a backend token.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the backend token.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Mix parameters of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceParams {
    /// Volume (0-255)
    pub volume: u8,
    /// Stereo position
    pub separation: Separation,
    /// Pitch
    pub pitch: u8,
}

impl VoiceParams {
    /// Centred, unpitched parameters at `volume`.
    #[must_use]
    pub const fn centered(volume: u8) -> Self {
        Self {
            volume,
            separation: Separation::CENTER,
            pitch: NORM_PITCH,
        }
    }
}

impl From<Spatialized> for VoiceParams {
    fn from(s: Spatialized) -> Self {
        Self {
            volume: s.volume,
            separation: s.separation,
            pitch: s.pitch,
        }
    }
}

/// Sound effect half of the backend.
pub trait SoundBackend {
    /// Makes a sound's data ready to play.
    fn load_sfx(&mut self, sound: SoundId, def: &SoundDef) -> Result<(), BackendError>;

    /// Starts a voice on mixer `channel`.
    fn start_sound(
        &mut self,
        sound: SoundId,
        params: VoiceParams,
        priority: i32,
        channel: usize,
    ) -> Result<VoiceHandle, BackendError>;

    /// Stops a voice immediately.
    fn stop_sound(&mut self, handle: VoiceHandle);

    /// Whether a voice is still producing output.
    fn is_playing(&self, handle: VoiceHandle) -> bool;

    /// Pushes new mix parameters to a live voice.
    fn update_params(&mut self, handle: VoiceHandle, params: VoiceParams);

    /// Sets the effects volume (0-100).
    fn set_sfx_volume(&mut self, volume: u8);

    /// Called once at the end of every tic.
    fn update(&mut self) {}
}

/// Music half of the backend. One song is loaded at a time.
pub trait MusicBackend {
    /// Finds a music lump by name.
    fn find_music(&self, name: &TrackName) -> Option<MusicLump>;

    /// Loads a song, replacing any loaded one.
    fn load_song(&mut self, name: &TrackName) -> Result<(), BackendError>;

    /// Unloads the current song.
    fn unload_song(&mut self);

    /// Starts the loaded song.
    fn play_song(&mut self, looping: bool) -> Result<(), BackendError>;

    /// Stops the song.
    fn stop_song(&mut self);

    /// Pauses the song.
    fn pause_song(&mut self);

    /// Resumes a paused song.
    fn resume_song(&mut self);

    /// Whether a song is playing (paused songs count).
    fn song_playing(&self) -> bool;

    /// Whether the song is paused.
    fn song_paused(&self) -> bool;

    /// Selects a sub-track. Returns false if unsupported.
    fn set_song_track(&mut self, _track: u16) -> bool {
        false
    }

    /// Seeks, in milliseconds. Returns false if unsupported.
    fn set_song_position(&mut self, position: u32) -> bool;

    /// Current position in milliseconds.
    fn song_position(&self) -> u32;

    /// Song length in milliseconds; 0 when unknown.
    fn song_length(&self) -> u32;

    /// Fades the internal volume to `target` (0-100) over `ms`.
    fn fade_song(&mut self, target: u8, ms: u32);

    /// Cancels any fade in progress.
    fn stop_fading(&mut self);

    /// Whether a fade is in progress.
    fn is_fading(&self) -> bool;

    /// Sets the user music volume (0-100).
    fn set_music_volume(&mut self, volume: u8);

    /// Sets the internal (fade) volume (0-100).
    fn set_internal_volume(&mut self, volume: u8);
}

/// A complete backend.
pub trait AudioBackend: SoundBackend + MusicBackend {}

impl<T: SoundBackend + MusicBackend> AudioBackend for T {}

/// A backend with no device: nothing plays and no music exists.
#[derive(Debug, Default)]
pub struct NullBackend;

impl SoundBackend for NullBackend {
    fn load_sfx(&mut self, _sound: SoundId, _def: &SoundDef) -> Result<(), BackendError> {
        Ok(())
    }

    fn start_sound(
        &mut self,
        _sound: SoundId,
        _params: VoiceParams,
        _priority: i32,
        _channel: usize,
    ) -> Result<VoiceHandle, BackendError> {
        Err(BackendError::DeviceUnavailable)
    }

    fn stop_sound(&mut self, _handle: VoiceHandle) {}

    fn is_playing(&self, _handle: VoiceHandle) -> bool {
        false
    }

    fn update_params(&mut self, _handle: VoiceHandle, _params: VoiceParams) {}

    fn set_sfx_volume(&mut self, _volume: u8) {}
}

impl MusicBackend for NullBackend {
    fn find_music(&self, _name: &TrackName) -> Option<MusicLump> {
        None
    }

    fn load_song(&mut self, _name: &TrackName) -> Result<(), BackendError> {
        Err(BackendError::DeviceUnavailable)
    }

    fn unload_song(&mut self) {}

    fn play_song(&mut self, _looping: bool) -> Result<(), BackendError> {
        Err(BackendError::DeviceUnavailable)
    }

    fn stop_song(&mut self) {}

    fn pause_song(&mut self) {}

    fn resume_song(&mut self) {}

    fn song_playing(&self) -> bool {
        false
    }

    fn song_paused(&self) -> bool {
        false
    }

    fn set_song_position(&mut self, _position: u32) -> bool {
        false
    }

    fn song_position(&self) -> u32 {
        0
    }

    fn song_length(&self) -> u32 {
        0
    }

    fn fade_song(&mut self, _target: u8, _ms: u32) {}

    fn stop_fading(&mut self) {}

    fn is_fading(&self) -> bool {
        false
    }

    fn set_music_volume(&mut self, _volume: u8) {}

    fn set_internal_volume(&mut self, _volume: u8) {}
}
