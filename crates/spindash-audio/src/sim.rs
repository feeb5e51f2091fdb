//! Deterministic in-memory backend.
//!
//! Voices run for a fixed number of tics, songs advance by one tic's worth
//! of milliseconds per [`SoundBackend::update`], and fades complete after
//! their duration. Every call is recorded so tests and the soak driver can
//! see exactly what the core asked for.

use ahash::{AHashMap, AHashSet};
use tracing::trace;

use spindash_common::{BackendError, SoundId, TIC_RATE};

use crate::backend::{MusicBackend, MusicLump, SoundBackend, VoiceHandle, VoiceParams};
use crate::sound_def::SoundDef;
use crate::track::{tics_to_music_position, TrackName};

/// How long a voice plays unless configured otherwise.
pub const DEFAULT_SOUND_TICS: u32 = TIC_RATE;

/// A call the core made on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// Sound data loaded
    LoadSfx(SoundId),
    /// Voice started
    StartSound {
        /// Voice handle
        handle: VoiceHandle,
        /// Sound
        sound: SoundId,
        /// Initial parameters
        params: VoiceParams,
        /// Mixer channel
        channel: usize,
    },
    /// Voice stopped by the core
    StopSound(VoiceHandle),
    /// Voice parameters updated
    UpdateParams(VoiceHandle, VoiceParams),
    /// Effects volume changed
    SfxVolume(u8),
    /// Song loaded
    LoadSong(TrackName),
    /// Song started
    PlaySong {
        /// Track
        name: TrackName,
        /// Loops at the end
        looping: bool,
    },
    /// Song stopped
    StopSong,
    /// Song paused
    PauseSong,
    /// Song resumed
    ResumeSong,
    /// Song position set
    SetPosition(u32),
    /// Sub-track selected
    SetTrack(u16),
    /// Fade started
    Fade {
        /// Target internal volume
        target: u8,
        /// Duration
        ms: u32,
    },
    /// Fade cancelled
    StopFading,
    /// User music volume changed
    MusicVolume(u8),
    /// Internal volume set directly
    InternalVolume(u8),
}

#[derive(Debug, Clone, Copy)]
struct SimVoice {
    params: VoiceParams,
    /// `None` loops until stopped.
    remaining: Option<u32>,
}

#[derive(Debug, Clone)]
struct SimSong {
    name: TrackName,
    length: u32,
    looping: bool,
    playing: bool,
    paused: bool,
    base: u32,
    tics: u32,
}

impl SimSong {
    fn position(&self) -> u32 {
        if !self.playing {
            return 0;
        }
        let raw = self.base + tics_to_music_position(self.tics);
        match (self.length, self.looping) {
            (0, _) => raw,
            (len, true) => raw % len,
            (len, false) => raw.min(len),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SimFade {
    from: u8,
    target: u8,
    total: u32,
    elapsed: u32,
}

/// A scripted backend that plays nothing but keeps perfect books.
#[derive(Debug)]
pub struct SimulatedBackend {
    next_handle: u32,
    voices: AHashMap<VoiceHandle, SimVoice>,
    sound_tics: AHashMap<SoundId, u32>,
    broken_sfx: AHashSet<SoundId>,
    library: Vec<(TrackName, u32, MusicLump)>,
    next_lump: u32,
    song: Option<SimSong>,
    fade: Option<SimFade>,
    internal_volume: u8,
    music_volume: u8,
    sfx_volume: u8,
    events: Vec<BackendEvent>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            voices: AHashMap::new(),
            sound_tics: AHashMap::new(),
            broken_sfx: AHashSet::new(),
            library: Vec::new(),
            next_lump: 0,
            song: None,
            fade: None,
            internal_volume: 100,
            music_volume: 100,
            sfx_volume: 100,
            events: Vec::new(),
        }
    }

    /// Adds a song to the library. A length of 0 means unknown.
    #[must_use]
    pub fn with_song(mut self, name: &str, length_ms: u32) -> Self {
        self.add_song(name, length_ms);
        self
    }

    /// Sets how many tics a sound plays for. 0 loops until stopped.
    #[must_use]
    pub fn with_sound_length(mut self, sound: SoundId, tics: u32) -> Self {
        self.sound_tics.insert(sound, tics);
        self
    }

    /// Adds or replaces a song in the library. Each call issues a new lump.
    pub fn add_song(&mut self, name: &str, length_ms: u32) {
        let name = TrackName::new(name);
        self.library.retain(|(n, ..)| *n != name);
        self.library.push((name, length_ms, MusicLump::new(self.next_lump)));
        self.next_lump += 1;
    }

    /// Removes a song from the library, as if its lump were deleted.
    pub fn remove_song(&mut self, name: &str) {
        let name = TrackName::new(name);
        self.library.retain(|(n, ..)| *n != name);
    }

    /// Makes loading a sound's data fail.
    pub fn break_sfx(&mut self, sound: SoundId) {
        self.broken_sfx.insert(sound);
    }

    /// Every call recorded so far.
    #[must_use]
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    /// Drains the event log.
    pub fn take_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of voices still playing.
    #[must_use]
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Current parameters of a voice.
    #[must_use]
    pub fn voice_params(&self, handle: VoiceHandle) -> Option<VoiceParams> {
        self.voices.get(&handle).map(|v| v.params)
    }

    /// Name of the loaded song.
    #[must_use]
    pub fn current_song(&self) -> Option<&TrackName> {
        self.song.as_ref().map(|s| &s.name)
    }

    /// Current internal (fade) volume.
    #[must_use]
    pub const fn internal_volume(&self) -> u8 {
        self.internal_volume
    }

    /// Current user music volume.
    #[must_use]
    pub const fn music_volume(&self) -> u8 {
        self.music_volume
    }

    /// Current effects volume.
    #[must_use]
    pub const fn sfx_volume(&self) -> u8 {
        self.sfx_volume
    }

    fn record(&mut self, event: BackendEvent) {
        trace!(?event, "backend call");
        self.events.push(event);
    }
}

impl SoundBackend for SimulatedBackend {
    fn load_sfx(&mut self, sound: SoundId, def: &SoundDef) -> Result<(), BackendError> {
        if self.broken_sfx.contains(&sound) {
            return Err(BackendError::LoadFailed {
                name: def.name.clone(),
                message: "no such lump".into(),
            });
        }
        self.record(BackendEvent::LoadSfx(sound));
        Ok(())
    }

    fn start_sound(
        &mut self,
        sound: SoundId,
        params: VoiceParams,
        _priority: i32,
        channel: usize,
    ) -> Result<VoiceHandle, BackendError> {
        let handle = VoiceHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        let remaining = match self.sound_tics.get(&sound).copied() {
            Some(0) => None,
            Some(tics) => Some(tics),
            None => Some(DEFAULT_SOUND_TICS),
        };
        self.voices.insert(handle, SimVoice { params, remaining });
        self.record(BackendEvent::StartSound {
            handle,
            sound,
            params,
            channel,
        });
        Ok(handle)
    }

    fn stop_sound(&mut self, handle: VoiceHandle) {
        if self.voices.remove(&handle).is_some() {
            self.record(BackendEvent::StopSound(handle));
        }
    }

    fn is_playing(&self, handle: VoiceHandle) -> bool {
        self.voices.contains_key(&handle)
    }

    fn update_params(&mut self, handle: VoiceHandle, params: VoiceParams) {
        if let Some(voice) = self.voices.get_mut(&handle) {
            voice.params = params;
            self.record(BackendEvent::UpdateParams(handle, params));
        }
    }

    fn set_sfx_volume(&mut self, volume: u8) {
        self.sfx_volume = volume;
        self.record(BackendEvent::SfxVolume(volume));
    }

    fn update(&mut self) {
        self.voices.retain(|_, voice| match voice.remaining.as_mut() {
            Some(left) => {
                *left = left.saturating_sub(1);
                *left > 0
            },
            None => true,
        });

        if let Some(song) = self.song.as_mut() {
            if song.playing && !song.paused {
                song.tics += 1;
                if !song.looping && song.length > 0 && song.position() >= song.length {
                    song.playing = false;
                }
            }
        }

        if let Some(mut fade) = self.fade {
            fade.elapsed += 1;
            if fade.elapsed >= fade.total {
                self.internal_volume = fade.target;
                self.fade = None;
            } else {
                let from = i64::from(fade.from);
                let to = i64::from(fade.target);
                let step = (to - from) * i64::from(fade.elapsed) / i64::from(fade.total);
                self.internal_volume = (from + step) as u8;
                self.fade = Some(fade);
            }
        }
    }
}

impl MusicBackend for SimulatedBackend {
    fn find_music(&self, name: &TrackName) -> Option<MusicLump> {
        self.library
            .iter()
            .find(|(n, ..)| n == name)
            .map(|&(_, _, lump)| lump)
    }

    fn load_song(&mut self, name: &TrackName) -> Result<(), BackendError> {
        let Some(&(_, length, _)) = self.library.iter().find(|(n, ..)| n == name) else {
            return Err(BackendError::LoadFailed {
                name: name.to_string(),
                message: "not in library".into(),
            });
        };
        self.song = Some(SimSong {
            name: name.clone(),
            length,
            looping: false,
            playing: false,
            paused: false,
            base: 0,
            tics: 0,
        });
        self.record(BackendEvent::LoadSong(name.clone()));
        Ok(())
    }

    fn unload_song(&mut self) {
        self.song = None;
    }

    fn play_song(&mut self, looping: bool) -> Result<(), BackendError> {
        let Some(song) = self.song.as_mut() else {
            return Err(BackendError::PlaybackFailed {
                name: String::new(),
            });
        };
        song.looping = looping;
        song.playing = true;
        song.paused = false;
        song.base = 0;
        song.tics = 0;
        let name = song.name.clone();
        self.record(BackendEvent::PlaySong { name, looping });
        Ok(())
    }

    fn stop_song(&mut self) {
        if let Some(song) = self.song.as_mut() {
            song.playing = false;
            song.paused = false;
        }
        self.fade = None;
        self.record(BackendEvent::StopSong);
    }

    fn pause_song(&mut self) {
        if let Some(song) = self.song.as_mut() {
            song.paused = true;
        }
        self.record(BackendEvent::PauseSong);
    }

    fn resume_song(&mut self) {
        if let Some(song) = self.song.as_mut() {
            song.paused = false;
        }
        self.record(BackendEvent::ResumeSong);
    }

    fn song_playing(&self) -> bool {
        self.song.as_ref().is_some_and(|s| s.playing)
    }

    fn song_paused(&self) -> bool {
        self.song.as_ref().is_some_and(|s| s.playing && s.paused)
    }

    fn set_song_track(&mut self, track: u16) -> bool {
        self.record(BackendEvent::SetTrack(track));
        true
    }

    fn set_song_position(&mut self, position: u32) -> bool {
        let Some(song) = self.song.as_mut().filter(|s| s.playing) else {
            return false;
        };
        song.base = position;
        song.tics = 0;
        self.record(BackendEvent::SetPosition(position));
        true
    }

    fn song_position(&self) -> u32 {
        self.song.as_ref().map_or(0, SimSong::position)
    }

    fn song_length(&self) -> u32 {
        self.song.as_ref().map_or(0, |s| s.length)
    }

    fn fade_song(&mut self, target: u8, ms: u32) {
        self.record(BackendEvent::Fade { target, ms });
        let total = (u64::from(ms) * u64::from(TIC_RATE)).div_ceil(1000) as u32;
        if total == 0 {
            self.internal_volume = target;
            self.fade = None;
            return;
        }
        self.fade = Some(SimFade {
            from: self.internal_volume,
            target,
            total,
            elapsed: 0,
        });
    }

    fn stop_fading(&mut self) {
        if self.fade.take().is_some() {
            self.record(BackendEvent::StopFading);
        }
    }

    fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    fn set_music_volume(&mut self, volume: u8) {
        self.music_volume = volume;
        self.record(BackendEvent::MusicVolume(volume));
    }

    fn set_internal_volume(&mut self, volume: u8) {
        self.internal_volume = volume;
        self.record(BackendEvent::InternalVolume(volume));
    }
}
