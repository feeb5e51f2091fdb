//! Music half of the engine facade.
//!
//! Track changes, fades, the change-behind-a-fade queue, jingles and the
//! retain/recall flow on top of [`MusicStack`](crate::music_stack::MusicStack).

use tracing::{debug, error, info, warn};

use spindash_common::{AudioError, AudioResult, BackendError};

use crate::backend::AudioBackend;
use crate::caption::MAX_CAPTION_TICS;
use crate::engine::AudioEngine;
use crate::music_stack::StackEntry;
use crate::track::{LevelMusic, MusicFlags, MusicStatus, TrackName, JINGLE_POST_FADE_MS, RESET_FADE_MS};
use crate::world::SoundWorld;

/// A track change waiting for a fade-out to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMusic {
    /// Track to play
    pub name: TrackName,
    /// Music flags
    pub flags: MusicFlags,
    /// Loops at the end
    pub looping: bool,
    /// Start position in milliseconds
    pub position: u32,
    /// Fade-in once started
    pub fade_in_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NowPlaying {
    name: TrackName,
}

/// What to do once the running fade completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeAction {
    Stop,
    PlayQueued,
}

#[derive(Debug)]
pub(crate) struct MusicState {
    now_playing: Option<NowPlaying>,
    level: LevelMusic,
    queue: Option<QueuedMusic>,
    pending: Option<FadeAction>,
    stack_fade_out: u32,
    stack_fade_in: u32,
    suppress_position: bool,
}

impl MusicState {
    pub(crate) fn new() -> Self {
        Self {
            now_playing: None,
            level: LevelMusic::default(),
            queue: None,
            pending: None,
            stack_fade_out: 0,
            stack_fade_in: JINGLE_POST_FADE_MS,
            suppress_position: false,
        }
    }
}

impl<B: AudioBackend> AudioEngine<B> {
    /// Changes the music.
    ///
    /// An empty `name` stops the music (after `prefade_ms`, if nonzero). With
    /// a `prefade_ms` the current song fades out first and the change is
    /// queued until the fade completes. Requesting the track already playing
    /// only restores its volume unless `flags` has `FORCE_RESET`.
    pub fn change_music_ex(
        &mut self,
        name: &str,
        flags: MusicFlags,
        looping: bool,
        position: u32,
        prefade_ms: u32,
        fade_in_ms: u32,
    ) {
        if self.music_disabled() {
            return;
        }
        let name = TrackName::new(name);

        if name.is_empty() {
            if prefade_ms > 0 {
                self.fade_out_stop_music(prefade_ms);
            } else {
                self.stop_music();
            }
            return;
        }

        if prefade_ms > 0 {
            debug!(track = %name, prefade_ms, "Queueing music behind fade");
            self.music.queue = Some(QueuedMusic {
                name,
                flags,
                looping,
                position,
                fade_in_ms,
            });
            self.backend.fade_song(0, prefade_ms);
            self.music.pending = Some(FadeAction::PlayQueued);
            return;
        }

        self.music.pending = None;
        self.music.queue = None;

        let same_track = self
            .music
            .now_playing
            .as_ref()
            .is_some_and(|np| np.name == name);

        if !same_track || flags.contains(MusicFlags::FORCE_RESET) {
            self.stop_music();
            if let Err(err) = self.play_track(&name, flags, looping, position, fade_in_ms) {
                warn!(track = %name, %err, "Music could not be played");
            }
        } else if fade_in_ms > 0 {
            self.backend.set_song_position(position);
            self.backend.fade_song(100, fade_in_ms);
        } else {
            self.backend.stop_fading();
            self.backend.fade_song(100, RESET_FADE_MS);
        }
    }

    fn play_track(
        &mut self,
        name: &TrackName,
        flags: MusicFlags,
        looping: bool,
        position: u32,
        fade_in_ms: u32,
    ) -> AudioResult<()> {
        self.backend.load_song(name).map_err(|e| match e {
            BackendError::LoadFailed { name, .. } => AudioError::AssetMissing(name),
            other => AudioError::Backend(other),
        })?;

        self.backend
            .set_internal_volume(if fade_in_ms > 0 { 0 } else { 100 });
        if let Err(err) = self.backend.play_song(looping) {
            self.backend.unload_song();
            return Err(err.into());
        }
        if fade_in_ms > 0 {
            self.backend.fade_song(100, fade_in_ms);
        }
        if position > 0 {
            self.backend.set_song_position(position);
        }
        self.backend.set_song_track(flags.track());

        if !self.is_focused() && !self.config.play_music_if_unfocused {
            self.backend.pause_song();
        }

        self.music.now_playing = Some(NowPlaying { name: name.clone() });

        if self.config.closed_captioning {
            if let Some(title) = self.catalog.music_title(name) {
                self.captions
                    .push_ambient(format!("\u{266a} {title}"), MAX_CAPTION_TICS);
            }
        }
        info!(track = %name, looping, position, "Now playing");
        Ok(())
    }

    /// Plays a track from the start.
    pub fn change_music(&mut self, name: &str, looping: bool) {
        self.change_music_ex(name, MusicFlags::empty(), looping, 0, 0, 0);
    }

    /// Stops and unloads the current song.
    pub fn stop_music(&mut self) {
        self.music.pending = None;
        self.music.queue = None;

        let Some(stopped) = self.music.now_playing.take() else {
            return;
        };
        if self.backend.song_paused() {
            self.backend.resume_song();
        }
        self.backend.stop_song();
        self.backend.unload_song();

        if self.config.closed_captioning {
            self.captions.fade_ambient();
        }
        debug!(track = %stopped.name, "Stopped music");
    }

    /// Fades the internal volume to `target` over `ms`.
    pub fn fade_music(&mut self, target: u8, ms: u32) {
        self.backend.fade_song(target.min(100), ms);
    }

    /// Fades out over `ms`, then stops.
    pub fn fade_out_stop_music(&mut self, ms: u32) {
        if ms == 0 {
            self.stop_music();
            return;
        }
        self.music.queue = None;
        self.backend.fade_song(0, ms);
        self.music.pending = Some(FadeAction::Stop);
    }

    /// Cancels the running fade and whatever was waiting on it.
    pub fn stop_fading_music(&mut self) {
        self.backend.stop_fading();
        self.music.pending = None;
        self.music.queue = None;
    }

    /// Seeks the current song. Returns whether the backend accepted it.
    pub fn set_music_position(&mut self, position: u32) -> bool {
        self.backend.set_song_position(position)
    }

    /// Position of the current song in milliseconds.
    #[must_use]
    pub fn music_position(&self) -> u32 {
        self.backend.song_position()
    }

    /// Length of the current song in milliseconds; 0 if unknown.
    #[must_use]
    pub fn music_length(&self) -> u32 {
        self.backend.song_length()
    }

    /// The track currently loaded.
    #[must_use]
    pub fn music_name(&self) -> Option<&TrackName> {
        self.music.now_playing.as_ref().map(|np| &np.name)
    }

    /// Whether a song is playing.
    #[must_use]
    pub fn music_playing(&self) -> bool {
        self.backend.song_playing()
    }

    /// Whether the song is paused.
    #[must_use]
    pub fn music_paused(&self) -> bool {
        self.backend.song_paused()
    }

    /// Whether the backend can find `name`.
    #[must_use]
    pub fn music_exists(&self, name: &str) -> bool {
        self.backend.find_music(&TrackName::new(name)).is_some()
    }

    /// The change waiting behind a fade, if any.
    #[must_use]
    pub fn queued_music(&self) -> Option<&QueuedMusic> {
        self.music.queue.as_ref()
    }

    /// The level's background track.
    #[must_use]
    pub fn level_music(&self) -> &LevelMusic {
        &self.music.level
    }

    /// Completes a pending fade action once the backend's fade is done.
    pub(crate) fn update_music(&mut self) {
        let Some(action) = self.music.pending else {
            return;
        };
        if self.backend.is_fading() {
            return;
        }
        self.music.pending = None;
        match action {
            FadeAction::Stop => self.stop_music(),
            FadeAction::PlayQueued => {
                if let Some(q) = self.music.queue.take() {
                    self.change_music_ex(q.name.as_str(), q.flags, q.looping, q.position, 0, q.fade_in_ms);
                }
            },
        }
    }

    /// The MASTER entry retained when the stack is empty.
    ///
    /// Always the level track. It resumes from the live position when the
    /// level track is what is playing. A change queued behind a fade marks
    /// it to restart from zero.
    fn synthesize_master(&self) -> StackEntry {
        let level = &self.music.level;
        let on_level_track = self.music.now_playing.as_ref().is_some_and(|np| np.name == level.name);
        let position = if on_level_track {
            self.backend.song_position()
        } else {
            level.position
        };
        let mut master = StackEntry::master(level, position, self.gametic);
        master.no_position = self.music.queue.is_some();
        let lump = self.backend.find_music(&level.name);
        master.with_lump(lump)
    }

    /// Retains a music state under `status`.
    ///
    /// Returns false for status `NONE` or a second MASTER entry.
    pub fn retain_music(
        &mut self,
        name: &str,
        flags: MusicFlags,
        looping: bool,
        position: u32,
        status: MusicStatus,
    ) -> bool {
        let name = TrackName::new(name);
        let lump = self.backend.find_music(&name);
        let entry = StackEntry::new(name, flags, looping, position, status).with_lump(lump);
        let master = self.synthesize_master();
        self.stack.retain(entry, self.gametic, master).is_ok()
    }

    /// Retains `name` under `status` and plays it from the start.
    pub fn play_jingle(&mut self, name: &str, flags: MusicFlags, looping: bool, status: MusicStatus) -> bool {
        if !self.retain_music(name, flags, looping, 0, status) {
            return false;
        }
        self.change_music_ex(name, flags, looping, 0, 0, 0);
        true
    }

    /// Restores retained music.
    ///
    /// Looks for the entry owned by `status` (any entry for `NONE`),
    /// pruning entries whose track is gone or whose status the world no
    /// longer accepts, and falls back to the level track. Returns whether
    /// a retained entry was found.
    pub fn recall_music<W: SoundWorld + ?Sized>(&mut self, world: &W, status: MusicStatus, from_first: bool) -> bool {
        if !self.stack.is_consistent() {
            error!("Music stack is corrupt, resetting to the level track");
            self.stack.reset();
        }
        let level = &self.music.level;
        let lump = self.backend.find_music(&level.name);
        self.stack
            .ensure_master(StackEntry::master(level, level.position, self.gametic).with_lump(lump));

        let backend = &self.backend;
        let found = self.stack.find(status, from_first, |e| {
            world.music_status_valid(e.status, &e.name) && backend.find_music(&e.name).is_some()
        });
        let recalled = found.is_some();

        let level = &self.music.level;
        let mut entry = found
            .or_else(|| self.stack.get(MusicStatus::MASTER).cloned())
            .unwrap_or_else(|| StackEntry::master(level, level.position, self.gametic).with_lump(lump));

        let level_lump = self.backend.find_music(&level.name);
        if entry.status.is_master() && (entry.name != level.name || entry.lump != level_lump) {
            debug!(old = %entry.name, new = %level.name, "Level track changed, dropping retained music");
            entry = StackEntry::master(level, level.position, self.gametic).with_lump(level_lump);
            self.stack.reset();
        }

        let playing = self.music_name().is_some_and(|n| *n == entry.name);
        if !playing {
            if self.music.stack_fade_out > 0 {
                let fade_out = self.music.stack_fade_out;
                self.change_music_ex(entry.name.as_str(), entry.flags, entry.looping, 0, fade_out, 0);
            } else {
                let fade_in = self.music.stack_fade_in;
                self.change_music_ex(entry.name.as_str(), entry.flags, entry.looping, 0, 0, fade_in);

                let position = if self.music.suppress_position {
                    0
                } else {
                    entry.resume_position(self.gametic, self.backend.song_length())
                };
                if position > 0 && self.backend.song_playing() {
                    self.backend.set_song_position(position);
                } else {
                    self.backend.stop_fading();
                    self.backend.set_internal_volume(100);
                }
            }
        }

        debug!(track = %entry.name, status = %entry.status, recalled, "Recalled music");
        self.music.stack_fade_out = 0;
        self.music.stack_fade_in = JINGLE_POST_FADE_MS;
        self.music.suppress_position = false;
        recalled
    }

    /// Makes the next recall fade the current song out over `ms` first.
    pub fn set_stack_fade_out(&mut self, ms: u32) {
        self.music.stack_fade_out = ms;
    }

    /// Sets the fade-in of the next recall.
    pub fn set_stack_fade_in(&mut self, ms: u32) {
        self.music.stack_fade_in = ms;
    }

    /// Makes the next recall start from the beginning.
    pub fn suppress_stack_position(&mut self) {
        self.music.suppress_position = true;
    }

    /// Enters a level: stops sounds, clears captions and retained music,
    /// and starts the level track.
    pub fn start_level(&mut self, level: LevelMusic) {
        info!(track = %level.name, "Starting level audio");
        self.stop_sounds();
        self.captions.clear_sounds();
        self.stack.reset();
        self.music.level = level;
        self.restart_level_music();
    }

    /// Changes the level's background track mid-level.
    ///
    /// Plays it now unless a jingle is active, in which case the next
    /// recall picks it up.
    pub fn change_level_music(&mut self, level: LevelMusic) {
        let jingle_active = self.stack.iter().any(|e| !e.status.is_master());
        self.music.level = level;
        if !jingle_active {
            self.restart_level_music();
        }
    }

    pub(crate) fn restart_level_music(&mut self) {
        if self.music.level.name.is_empty() {
            return;
        }
        let level = self.music.level.clone();
        self.change_music_ex(level.name.as_str(), level.flags, true, level.position, 0, 0);
    }

    /// Pauses the song and stack time accounting.
    pub fn pause_audio(&mut self) {
        self.paused = true;
        if self.backend.song_playing() && !self.backend.song_paused() {
            self.backend.pause_song();
        }
        self.stack.pause(self.gametic);
    }

    /// Undoes [`pause_audio`](Self::pause_audio).
    pub fn resume_audio(&mut self) {
        self.paused = false;
        let allowed = self.is_focused() || self.config.play_music_if_unfocused;
        if allowed && self.backend.song_paused() {
            self.backend.resume_song();
        }
        self.stack.resume(self.gametic);
    }

    /// Whether [`pause_audio`](Self::pause_audio) is in effect.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SoundConfig;
    use crate::sandbox::SandboxWorld;
    use crate::sim::{BackendEvent, SimulatedBackend};
    use crate::sound_def::{MusicDef, SoundCatalog};

    fn new_engine(config: SoundConfig) -> AudioEngine<SimulatedBackend> {
        let mut catalog = SoundCatalog::new();
        catalog.register_music(MusicDef {
            name: TrackName::new("gfz1"),
            title: "Greenflower Zone".into(),
        });
        let backend = SimulatedBackend::new()
            .with_song("gfz1", 120_000)
            .with_song("gfz2", 90_000)
            .with_song("boss1", 60_000)
            .with_song("invinc", 20_000)
            .with_song("1up", 4_000);
        AudioEngine::init(config, catalog, backend)
    }

    fn run(engine: &mut AudioEngine<SimulatedBackend>, world: &SandboxWorld, tics: u32) {
        for _ in 0..tics {
            engine.update_sounds(world);
        }
    }

    fn playing(engine: &AudioEngine<SimulatedBackend>) -> Option<&str> {
        engine.backend().current_song().map(TrackName::as_str)
    }

    fn plays(engine: &AudioEngine<SimulatedBackend>) -> usize {
        engine
            .backend()
            .events()
            .iter()
            .filter(|e| matches!(e, BackendEvent::PlaySong { .. }))
            .count()
    }

    #[test]
    fn test_start_level_plays_track() {
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        assert_eq!(playing(&engine), Some("gfz1"));
        assert!(engine.music_playing());
        assert_eq!(engine.music_name().map(TrackName::as_str), Some("gfz1"));
    }

    #[test]
    fn test_retain_then_recall_by_status() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));

        assert!(engine.retain_music("boss1", MusicFlags::empty(), true, 0, MusicStatus::INVINCIBILITY));
        assert!(engine.recall_music(&world, MusicStatus::INVINCIBILITY, true));
        assert_eq!(playing(&engine), Some("boss1"));
        assert_eq!(engine.music_stack().len(), 2);
    }

    #[test]
    fn test_jingle_then_level_resumes() {
        let mut world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        run(&mut engine, &world, 35);
        assert_eq!(engine.music_position(), 1000);

        assert!(engine.play_jingle("invinc", MusicFlags::empty(), false, MusicStatus::INVINCIBILITY));
        assert_eq!(playing(&engine), Some("invinc"));
        run(&mut engine, &world, 70);

        world.invalidate_status(MusicStatus::INVINCIBILITY);
        assert!(engine.recall_music(&world, MusicStatus::NONE, false));
        assert_eq!(playing(&engine), Some("gfz1"));
        assert_eq!(engine.music_position(), 3000);
        assert!(!engine.music_stack().contains(MusicStatus::INVINCIBILITY));
    }

    #[test]
    fn test_paused_time_is_not_counted() {
        let mut world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        run(&mut engine, &world, 35);
        engine.play_jingle("1up", MusicFlags::empty(), false, MusicStatus::ONE_UP);

        engine.pause_audio();
        assert!(engine.music_paused());
        run(&mut engine, &world, 100);
        engine.resume_audio();
        assert!(!engine.music_paused());
        run(&mut engine, &world, 35);

        world.invalidate_status(MusicStatus::ONE_UP);
        engine.recall_music(&world, MusicStatus::NONE, false);
        assert_eq!(engine.music_position(), 2000);
    }

    #[test]
    fn test_prefade_queues_change() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));

        engine.change_music_ex("boss1", MusicFlags::empty(), true, 0, 500, 0);
        assert_eq!(playing(&engine), Some("gfz1"));
        assert_eq!(engine.queued_music().map(|q| q.name.as_str()), Some("boss1"));

        run(&mut engine, &world, 20);
        assert_eq!(playing(&engine), Some("boss1"));
        assert!(engine.queued_music().is_none());
        assert_eq!(engine.backend().internal_volume(), 100);
    }

    #[test]
    fn test_queued_change_marks_master_unpositioned() {
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.change_music_ex("boss1", MusicFlags::empty(), true, 0, 500, 0);
        engine.retain_music("1up", MusicFlags::empty(), false, 0, MusicStatus::ONE_UP);

        let master = engine.music_stack().get(MusicStatus::MASTER).expect("master");
        assert_eq!(master.name.as_str(), "gfz1");
        assert!(master.no_position);
    }

    #[test]
    fn test_recall_master_keeps_stack_when_level_unchanged() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.change_music("boss1", true);
        run(&mut engine, &world, 35);

        assert!(engine.retain_music("invinc", MusicFlags::empty(), true, 0, MusicStatus::SHOES));
        let master = engine.music_stack().get(MusicStatus::MASTER).expect("master");
        assert_eq!(master.name.as_str(), "gfz1");
        assert_eq!(master.position, 0);

        assert!(engine.recall_music(&world, MusicStatus::MASTER, true));
        assert_eq!(playing(&engine), Some("gfz1"));
        assert_eq!(engine.music_stack().len(), 2);
        assert!(engine.music_stack().contains(MusicStatus::SHOES));
    }

    #[test]
    fn test_replaced_level_lump_refreshes_master() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        assert!(engine.play_jingle("invinc", MusicFlags::empty(), true, MusicStatus::INVINCIBILITY));

        engine.backend_mut().add_song("gfz1", 100_000);
        assert!(engine.recall_music(&world, MusicStatus::MASTER, true));
        assert_eq!(playing(&engine), Some("gfz1"));
        assert!(engine.music_stack().is_empty());
    }

    #[test]
    fn test_missing_track_falls_through() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.retain_music("boss1", MusicFlags::empty(), true, 0, MusicStatus::INVINCIBILITY);
        engine.retain_music("gone", MusicFlags::empty(), true, 0, MusicStatus::ALT_INVINCIBILITY);

        assert!(engine.recall_music(&world, MusicStatus::NONE, false));
        assert_eq!(playing(&engine), Some("boss1"));
        assert!(!engine.music_stack().contains(MusicStatus::ALT_INVINCIBILITY));
    }

    #[test]
    fn test_empty_stack_falls_back_to_level() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.change_music("boss1", true);

        assert!(!engine.recall_music(&world, MusicStatus::SHOES, true));
        assert_eq!(playing(&engine), Some("gfz1"));
    }

    #[test]
    fn test_level_change_refreshes_master() {
        let mut world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.play_jingle("invinc", MusicFlags::empty(), true, MusicStatus::INVINCIBILITY);

        engine.change_level_music(LevelMusic::new("gfz2"));
        assert_eq!(playing(&engine), Some("invinc"));

        world.invalidate_status(MusicStatus::INVINCIBILITY);
        engine.recall_music(&world, MusicStatus::NONE, false);
        assert_eq!(playing(&engine), Some("gfz2"));
        assert!(engine.music_stack().is_empty());
    }

    #[test]
    fn test_change_level_music_without_jingle() {
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.change_level_music(LevelMusic::new("gfz2"));
        assert_eq!(playing(&engine), Some("gfz2"));
        assert_eq!(engine.level_music().name.as_str(), "gfz2");
    }

    #[test]
    fn test_same_track_only_resets_volume() {
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.fade_music(20, 0);
        engine.change_music("gfz1", true);

        assert_eq!(plays(&engine), 1);
        assert!(engine
            .backend()
            .events()
            .contains(&BackendEvent::Fade { target: 100, ms: RESET_FADE_MS }));

        engine.change_music_ex("gfz1", MusicFlags::FORCE_RESET, true, 0, 0, 0);
        assert_eq!(plays(&engine), 2);
    }

    #[test]
    fn test_fade_in_on_start() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.change_music_ex("boss1", MusicFlags::empty(), true, 0, 0, 1000);
        assert_eq!(engine.backend().internal_volume(), 0);
        run(&mut engine, &world, 35);
        assert_eq!(engine.backend().internal_volume(), 100);
    }

    #[test]
    fn test_fade_out_then_stop() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.fade_out_stop_music(500);
        assert!(engine.music_playing());

        run(&mut engine, &world, 20);
        assert!(!engine.music_playing());
        assert!(engine.music_name().is_none());
    }

    #[test]
    fn test_empty_name_stops() {
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.change_music("", true);
        assert!(!engine.music_playing());
        assert!(playing(&engine).is_none());
    }

    #[test]
    fn test_stop_fading_cancels_queue() {
        let world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.change_music_ex("boss1", MusicFlags::empty(), true, 0, 500, 0);
        engine.stop_fading_music();
        run(&mut engine, &world, 20);
        assert_eq!(playing(&engine), Some("gfz1"));
    }

    #[test]
    fn test_missing_track_keeps_silence() {
        let mut engine = new_engine(SoundConfig::default());
        engine.change_music("nosuch", true);
        assert!(!engine.music_playing());
        assert!(engine.music_name().is_none());
        assert!(!engine.music_exists("nosuch"));
        assert!(engine.music_exists("GFZ1"));
    }

    #[test]
    fn test_retain_rejects_bad_status() {
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        assert!(!engine.retain_music("boss1", MusicFlags::empty(), true, 0, MusicStatus::NONE));
        assert!(engine.retain_music("boss1", MusicFlags::empty(), true, 0, MusicStatus::OTHER));
        assert!(!engine.retain_music("gfz2", MusicFlags::empty(), true, 0, MusicStatus::MASTER));
    }

    #[test]
    fn test_suppressed_position_restarts() {
        let mut world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        run(&mut engine, &world, 35);
        engine.play_jingle("1up", MusicFlags::empty(), false, MusicStatus::ONE_UP);
        run(&mut engine, &world, 35);

        world.invalidate_status(MusicStatus::ONE_UP);
        engine.suppress_stack_position();
        engine.recall_music(&world, MusicStatus::NONE, false);
        assert_eq!(engine.music_position(), 0);
        assert_eq!(engine.backend().internal_volume(), 100);
    }

    #[test]
    fn test_stack_fade_out_queues_recall() {
        let mut world = SandboxWorld::new();
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.play_jingle("1up", MusicFlags::empty(), false, MusicStatus::ONE_UP);

        world.invalidate_status(MusicStatus::ONE_UP);
        engine.set_stack_fade_out(500);
        engine.recall_music(&world, MusicStatus::NONE, false);
        assert_eq!(playing(&engine), Some("1up"));
        run(&mut engine, &world, 20);
        assert_eq!(playing(&engine), Some("gfz1"));
    }

    #[test]
    fn test_music_caption() {
        let mut engine = new_engine(SoundConfig::default().with_captions(true));
        engine.start_level(LevelMusic::new("gfz1"));
        let ambient = engine.captions().ambient().expect("ambient caption");
        assert_eq!(ambient.text(), "\u{266a} Greenflower Zone");

        engine.stop_music();
        let ambient = engine.captions().ambient().expect("still fading");
        assert!(ambient.lifespan <= 20);
    }

    #[test]
    fn test_focus_pauses_music() {
        let mut engine = new_engine(SoundConfig::default());
        engine.start_level(LevelMusic::new("gfz1"));
        engine.set_window_focus(false);
        assert!(engine.music_paused());
        engine.set_window_focus(true);
        assert!(!engine.music_paused());

        let mut engine = new_engine(SoundConfig {
            play_music_if_unfocused: true,
            ..SoundConfig::default()
        });
        engine.start_level(LevelMusic::new("gfz1"));
        engine.set_window_focus(false);
        assert!(!engine.music_paused());
    }

    #[test]
    fn test_music_disabled() {
        let mut engine = new_engine(SoundConfig {
            music_disabled: true,
            ..SoundConfig::default()
        });
        engine.start_level(LevelMusic::new("gfz1"));
        assert!(!engine.music_playing());

        let mut config = engine.config().clone();
        config.music_disabled = false;
        engine.apply_config(config);
        assert_eq!(playing(&engine), Some("gfz1"));
    }
}
