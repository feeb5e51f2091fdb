//! The audio engine facade.
//!
//! One [`AudioEngine`] owns the channel pool, caption queue, music stack and
//! backend for the lifetime of the process. Gameplay calls into it to start
//! and stop sounds and change music, and calls [`AudioEngine::update_sounds`]
//! exactly once per tic.
//!
//! Public entry points never fail: refused or broken requests are logged and
//! the sound simply does not play.
//!
//! The music half of the facade lives in [`crate::music_player`].

use ahash::AHashSet;
use tracing::{debug, error, info, trace, warn};

use spindash_common::{AudioError, AudioResult, BackendError, Fixed, OriginId, SoundId, Tic};

use crate::backend::{AudioBackend, VoiceParams};
use crate::caption::{CaptionQueue, MAX_CAPTION_TICS};
use crate::channel::{Channel, ChannelPool, ChannelRef};
use crate::config::{SoundConfig, MAX_CHANNELS, MIN_CHANNELS};
use crate::listener::MAX_LISTENERS;
use crate::music_player::MusicState;
use crate::music_stack::MusicStack;
use crate::sound_def::SoundCatalog;
use crate::spatial::{nearest_listener, spatialize, SpatialSettings, NORM_VOLUME};
use crate::world::SoundWorld;

/// The game's audio context.
pub struct AudioEngine<B: AudioBackend> {
    pub(crate) backend: B,
    pub(crate) config: SoundConfig,
    pub(crate) catalog: SoundCatalog,
    loaded: AHashSet<SoundId>,
    pub(crate) channels: ChannelPool,
    pub(crate) captions: CaptionQueue,
    pub(crate) stack: MusicStack,
    pub(crate) music: MusicState,
    spatial: SpatialSettings,
    pub(crate) gametic: Tic,
    focused: bool,
    pub(crate) paused: bool,
}

impl<B: AudioBackend> std::fmt::Debug for AudioEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("gametic", &self.gametic)
            .field("live_channels", &self.channels.live_count())
            .field("captions", &self.captions.len())
            .field("stack", &self.stack.len())
            .field("focused", &self.focused)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

fn spatial_settings(config: &SoundConfig) -> SpatialSettings {
    SpatialSettings {
        stereo_reverse: config.stereo_reverse,
        surround: config.surround,
        map_scale: Fixed::ONE,
        outdoor_search: config.outdoor_search,
    }
}

impl<B: AudioBackend> AudioEngine<B> {
    /// Brings up the engine on `backend`.
    pub fn init(config: SoundConfig, catalog: SoundCatalog, backend: B) -> Self {
        let mut config = config;
        config.validate();

        let mut engine = Self {
            backend,
            channels: ChannelPool::new(config.channels),
            captions: CaptionQueue::new(),
            stack: MusicStack::new(),
            music: MusicState::new(),
            spatial: spatial_settings(&config),
            loaded: AHashSet::new(),
            gametic: 0,
            focused: true,
            paused: false,
            catalog,
            config,
        };

        engine.backend.set_sfx_volume(engine.config.sound_volume);
        engine.backend.set_music_volume(engine.config.music_volume);

        if engine.config.precache_sound && !engine.config.sound_disabled {
            let loaded = engine.precache();
            debug!(loaded, "Precached sounds");
        }

        info!(
            channels = engine.channels.capacity(),
            sounds = engine.catalog.len().saturating_sub(1),
            "Audio engine initialized"
        );
        engine
    }

    /// Stops everything and hands the backend back.
    pub fn shutdown(mut self) -> B {
        self.stop_sounds();
        self.stop_music();
        self.captions.clear();
        self.stack.reset();
        info!(gametic = self.gametic, "Audio engine shut down");
        self.backend
    }

    /// The backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Current settings.
    #[must_use]
    pub const fn config(&self) -> &SoundConfig {
        &self.config
    }

    /// The sound catalog.
    #[must_use]
    pub const fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    /// The channel pool.
    #[must_use]
    pub const fn channels(&self) -> &ChannelPool {
        &self.channels
    }

    /// The caption queue.
    #[must_use]
    pub const fn captions(&self) -> &CaptionQueue {
        &self.captions
    }

    /// The music stack.
    #[must_use]
    pub const fn music_stack(&self) -> &MusicStack {
        &self.stack
    }

    /// Current spatialization settings.
    #[must_use]
    pub const fn spatial_settings(&self) -> &SpatialSettings {
        &self.spatial
    }

    /// Tics since init.
    #[must_use]
    pub const fn gametic(&self) -> Tic {
        self.gametic
    }

    /// Whether sound effects are off, by setting or by lost focus.
    #[must_use]
    pub const fn sound_disabled(&self) -> bool {
        self.config.sound_disabled || (!self.focused && !self.config.play_sound_if_unfocused)
    }

    /// Whether music is off.
    #[must_use]
    pub const fn music_disabled(&self) -> bool {
        self.config.music_disabled
    }

    /// Applies changed settings at runtime.
    pub fn apply_config(&mut self, config: SoundConfig) {
        let mut config = config;
        config.validate();
        let old = std::mem::replace(&mut self.config, config);

        if old.sound_volume != self.config.sound_volume {
            self.backend.set_sfx_volume(self.config.sound_volume);
        }
        if old.music_volume != self.config.music_volume {
            self.backend.set_music_volume(self.config.music_volume);
        }
        if old.channels != self.config.channels {
            self.resize_channels(self.config.channels);
        }
        self.spatial = spatial_settings(&self.config);

        if self.config.sound_disabled && !old.sound_disabled {
            self.stop_sounds();
        }
        if self.config.music_disabled && !old.music_disabled {
            self.stop_music();
        } else if !self.config.music_disabled && old.music_disabled {
            self.restart_level_music();
        }
        if !self.config.closed_captioning && old.closed_captioning {
            self.captions.clear();
        }
        debug!("Applied sound config");
    }

    /// Changes the number of mixer channels, stopping every sound.
    pub fn set_channels(&mut self, channels: usize) {
        self.config.channels = channels.clamp(MIN_CHANNELS, MAX_CHANNELS);
        self.resize_channels(self.config.channels);
    }

    fn resize_channels(&mut self, channels: usize) {
        info!(channels, "Resizing channel pool");
        self.channels.resize(&mut self.backend, channels);
    }

    /// Sets the effects volume (0-100).
    pub fn set_sfx_volume(&mut self, volume: u8) {
        self.config.sound_volume = volume.min(100);
        self.backend.set_sfx_volume(self.config.sound_volume);
    }

    /// Sets the music volume (0-100).
    pub fn set_music_volume(&mut self, volume: u8) {
        self.config.music_volume = volume.min(100);
        self.backend.set_music_volume(self.config.music_volume);
    }

    /// Loads every catalog sound. Returns how many are ready.
    pub fn precache(&mut self) -> usize {
        let ids: Vec<SoundId> = self.catalog.ids().collect();
        ids.into_iter()
            .filter(|&id| match self.ensure_loaded(id) {
                Ok(()) => true,
                Err(err) => {
                    warn!(sound = %id, %err, "Failed to precache sound");
                    false
                },
            })
            .count()
    }

    fn ensure_loaded(&mut self, sound: SoundId) -> AudioResult<()> {
        if self.loaded.contains(&sound) {
            return Ok(());
        }
        let def = self
            .catalog
            .get(sound)
            .ok_or_else(|| AudioError::AssetMissing(sound.to_string()))?;
        self.backend.load_sfx(sound, def).map_err(|e| match e {
            BackendError::LoadFailed { name, .. } => AudioError::AssetMissing(name),
            other => AudioError::Backend(other),
        })?;
        self.loaded.insert(sound);
        Ok(())
    }

    /// Starts `sound` at full volume. See [`start_sound_at_volume`].
    ///
    /// [`start_sound_at_volume`]: Self::start_sound_at_volume
    pub fn start_sound<W: SoundWorld + ?Sized>(
        &mut self,
        world: &W,
        origin: Option<OriginId>,
        sound: SoundId,
    ) -> Option<ChannelRef> {
        self.start_sound_at_volume(world, origin, sound, NORM_VOLUME)
    }

    /// Starts `sound` from `origin` (`None` for a global sound).
    ///
    /// Returns the channel it plays on, or `None` if it was refused,
    /// inaudible, or failed.
    pub fn start_sound_at_volume<W: SoundWorld + ?Sized>(
        &mut self,
        world: &W,
        origin: Option<OriginId>,
        sound: SoundId,
        volume: u8,
    ) -> Option<ChannelRef> {
        if self.sound_disabled() || sound.is_none() {
            return None;
        }
        match self.try_start_sound(world, origin, sound, volume) {
            Ok(channel) => channel,
            Err(err) => {
                log_dropped(sound, &err);
                None
            },
        }
    }

    fn try_start_sound<W: SoundWorld + ?Sized>(
        &mut self,
        world: &W,
        origin: Option<OriginId>,
        sound: SoundId,
        volume: u8,
    ) -> AudioResult<Option<ChannelRef>> {
        let emitter = match origin {
            Some(o) => match world.emitter(o) {
                Some(emitter) => Some(emitter),
                None => {
                    trace!(%sound, origin = %o, "origin gone before start");
                    return Ok(None);
                },
            },
            None => None,
        };

        let sound = self
            .catalog
            .resolve_skin_sound(sound, emitter.and_then(|e| e.skin));
        self.ensure_loaded(sound)?;
        let def = self
            .catalog
            .get(sound)
            .ok_or_else(|| AudioError::AssetMissing(sound.to_string()))?;

        let volume = def.scale_volume(volume);
        let mut listeners = world.listeners();
        listeners.truncate(MAX_LISTENERS);

        let params = match (origin, emitter) {
            (Some(o), Some(e)) if !listeners.iter().any(|l| l.is_avatar(o)) => {
                match nearest_listener(&listeners, e.position, self.spatial.map_scale) {
                    Some(nearest) => match spatialize(
                        &listeners[nearest],
                        e.position,
                        def.flags,
                        volume,
                        &self.spatial,
                        |x, y| world.is_open_sky(x, y),
                    ) {
                        Some(heard) => VoiceParams::from(heard),
                        None => {
                            trace!(%sound, "inaudible");
                            return Ok(None);
                        },
                    },
                    None => VoiceParams::centered(volume),
                }
            },
            _ => VoiceParams::centered(volume),
        };
        if params.volume == 0 {
            return Ok(None);
        }

        let index = self.channels.acquire(&mut self.backend, origin, sound, def)?;
        let handle = self.backend.start_sound(sound, params, def.priority, index)?;
        let channel = self
            .channels
            .bind(index, Channel::new(sound, def, origin, volume, handle))
            .ok_or(AudioError::InvariantViolation("acquired channel is out of range"))?;

        if self.config.closed_captioning {
            self.captions.push(sound, def, Some(channel), MAX_CAPTION_TICS);
        }
        trace!(%sound, index, volume = params.volume, "started sound");
        Ok(Some(channel))
    }

    /// Stops everything `origin` is playing.
    pub fn stop_sound(&mut self, origin: OriginId) {
        self.channels.stop_by_origin(&mut self.backend, origin);
    }

    /// Stops `sound` playing from `origin`.
    pub fn stop_sound_by_id(&mut self, origin: OriginId, sound: SoundId) {
        self.channels
            .stop_by_origin_and_sound(&mut self.backend, origin, sound);
    }

    /// Stops every instance of `sound`.
    pub fn stop_sound_by_num(&mut self, sound: SoundId) {
        self.channels.stop_by_sound(&mut self.backend, sound);
    }

    /// Stops every sound.
    pub fn stop_sounds(&mut self) {
        let stopped = self.channels.stop_all(&mut self.backend);
        if stopped > 0 {
            debug!(stopped, "Stopped all sounds");
        }
    }

    /// Whether `origin` (or the global source) is playing `sound`.
    #[must_use]
    pub fn sound_playing(&self, origin: Option<OriginId>, sound: SoundId) -> bool {
        self.channels.sound_playing(origin, sound)
    }

    /// Whether `origin` is playing anything.
    #[must_use]
    pub fn origin_playing(&self, origin: OriginId) -> bool {
        self.channels.origin_playing(origin)
    }

    /// Whether `sound` is playing anywhere.
    #[must_use]
    pub fn id_playing(&self, sound: SoundId) -> bool {
        self.channels.id_playing(sound)
    }

    /// Advances the audio state by one tic.
    ///
    /// Re-spatializes live channels (when sound is enabled), ages captions,
    /// completes pending music fades and lets the backend advance.
    pub fn update_sounds<W: SoundWorld + ?Sized>(&mut self, world: &W) {
        if !self.sound_disabled() {
            let mut listeners = world.listeners();
            listeners.truncate(MAX_LISTENERS);
            self.channels
                .refresh(&mut self.backend, world, &listeners, &self.spatial);
        }

        let stopped = world.game_stopped() || self.paused;
        let channels = &self.channels;
        let backend = &self.backend;
        self.captions.tick(stopped, |r| {
            channels.get(r).is_some_and(|c| backend.is_playing(c.handle))
        });

        self.update_music();
        self.backend.update();
        self.gametic = self.gametic.wrapping_add(1);
    }

    /// Reacts to the game window gaining or losing focus.
    pub fn set_window_focus(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;
        debug!(focused, "Window focus changed");

        if focused {
            if !self.config.play_music_if_unfocused && !self.paused && self.backend.song_paused() {
                self.backend.resume_song();
            }
            return;
        }

        if !self.config.play_music_if_unfocused && self.backend.song_playing() && !self.backend.song_paused() {
            self.backend.pause_song();
        }
        if !self.config.play_sound_if_unfocused {
            self.stop_sounds();
        }
    }

    /// Whether the game window has focus.
    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.focused
    }
}

fn log_dropped(sound: SoundId, err: &AudioError) {
    match err {
        AudioError::ResourceExhausted { .. } | AudioError::DuplicateSuppressed { .. } => {
            trace!(%sound, %err, "sound dropped");
        },
        AudioError::InvariantViolation(_) => error!(%sound, %err, "sound refused"),
        _ => warn!(%sound, %err, "sound not played"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::SandboxWorld;
    use crate::sim::{BackendEvent, SimulatedBackend};
    use crate::sound_def::{SoundDef, SoundFlags};
    use crate::spatial::Separation;
    use spindash_common::{Angle, MapPoint, SkinId};

    struct Fixture {
        engine: AudioEngine<SimulatedBackend>,
        world: SandboxWorld,
        avatar: OriginId,
        ring: SoundId,
        jump: SoundId,
        kjump: SoundId,
        rain: SoundId,
    }

    fn fixture(config: SoundConfig) -> Fixture {
        let mut catalog = SoundCatalog::new();
        let ring = catalog
            .register(SoundDef::new("ring", 10).with_caption("Ring"))
            .expect("ring");
        let jump = catalog
            .register(SoundDef::new("jump", 20).with_caption("Jump").with_skin_sound(0))
            .expect("jump");
        let kjump = catalog
            .register(SoundDef::new("kjump", 20).with_caption("Knuckles jump"))
            .expect("kjump");
        let rain = catalog
            .register(SoundDef::new("rain", 1).with_flags(SoundFlags::OUTSIDE))
            .expect("rain");
        catalog.register_skin("sonic", vec![]).expect("skin");
        catalog.register_skin("knuckles", vec![kjump]).expect("skin");

        let mut world = SandboxWorld::new();
        let avatar = world.spawn(MapPoint::from_units(0, 0, 0), Some(SkinId::new(0)));
        world.add_player(avatar);

        Fixture {
            engine: AudioEngine::init(config, catalog, SimulatedBackend::new()),
            world,
            avatar,
            ring,
            jump,
            kjump,
            rain,
        }
    }

    fn voice(f: &Fixture, channel: ChannelRef) -> VoiceParams {
        let handle = f.engine.channels().get(channel).map(|c| c.handle).expect("live");
        f.engine.backend().voice_params(handle).expect("voice")
    }

    #[test]
    fn test_init_pushes_volumes() {
        let f = fixture(SoundConfig::default());
        let events = f.engine.backend().events();
        assert!(events.contains(&BackendEvent::SfxVolume(SoundConfig::default().sound_volume)));
        assert!(events.contains(&BackendEvent::MusicVolume(SoundConfig::default().music_volume)));
        assert_eq!(f.engine.channels().capacity(), SoundConfig::default().channels);
    }

    #[test]
    fn test_precache_loads_everything() {
        let config = SoundConfig {
            precache_sound: true,
            ..SoundConfig::default()
        };
        let f = fixture(config);
        let loads = f
            .engine
            .backend()
            .events()
            .iter()
            .filter(|e| matches!(e, BackendEvent::LoadSfx(_)))
            .count();
        assert_eq!(loads, 4);
    }

    #[test]
    fn test_lazy_load_once() {
        let mut f = fixture(SoundConfig::default());
        f.engine.start_sound(&f.world, None, f.ring);
        f.engine.start_sound(&f.world, None, f.ring);
        let loads = f
            .engine
            .backend()
            .events()
            .iter()
            .filter(|e| matches!(e, BackendEvent::LoadSfx(_)))
            .count();
        assert_eq!(loads, 1);
    }

    #[test]
    fn test_missing_sound_data_is_silent() {
        let mut f = fixture(SoundConfig::default());
        f.engine.backend_mut().break_sfx(f.ring);
        assert!(f.engine.start_sound(&f.world, None, f.ring).is_none());
        assert!(f.engine.start_sound(&f.world, None, SoundId::new(999)).is_none());
        assert_eq!(f.engine.channels().live_count(), 0);
    }

    #[test]
    fn test_spatialized_start() {
        let mut f = fixture(SoundConfig::default());
        let spring = f.world.spawn(MapPoint::from_units(0, 500, 0), None);
        let ch = f
            .engine
            .start_sound(&f.world, Some(spring), f.ring)
            .expect("audible");
        let params = voice(&f, ch);
        assert!(params.volume < 255);
        assert_eq!(params.separation, Separation::Stereo(32));

        let far = f.world.spawn(MapPoint::from_units(9000, 0, 0), None);
        assert!(f.engine.start_sound(&f.world, Some(far), f.ring).is_none());
    }

    #[test]
    fn test_own_sounds_are_centered() {
        let mut f = fixture(SoundConfig::default());
        f.world.turn_to(f.avatar, Angle::ANGLE_90);
        let ch = f
            .engine
            .start_sound(&f.world, Some(f.avatar), f.ring)
            .expect("own sound");
        assert_eq!(voice(&f, ch), VoiceParams::centered(255));
    }

    #[test]
    fn test_skin_redirect_on_start() {
        let mut f = fixture(SoundConfig::default());
        let knuckles = f
            .world
            .spawn(MapPoint::from_units(10, 0, 0), Some(SkinId::new(1)));
        f.engine.start_sound(&f.world, Some(knuckles), f.jump);
        assert!(f.engine.sound_playing(Some(knuckles), f.kjump));
        assert!(!f.engine.id_playing(f.jump));

        f.engine.start_sound(&f.world, Some(f.avatar), f.jump);
        assert!(f.engine.sound_playing(Some(f.avatar), f.jump));
    }

    #[test]
    fn test_outdoor_sound_follows_sky() {
        let mut f = fixture(SoundConfig::default());
        let cloud = f.world.spawn(MapPoint::from_units(0, 0, 512), None);
        let muffled = f
            .engine
            .start_sound(&f.world, Some(cloud), f.rain)
            .expect("heard from the search edge");
        let muffled = voice(&f, muffled).volume;
        assert!(muffled < 255);

        f.engine.stop_sounds();
        f.world.open_sky_at(0, 0);
        let open = f
            .engine
            .start_sound(&f.world, Some(cloud), f.rain)
            .expect("under open sky");
        assert_eq!(voice(&f, open).volume, 255);
    }

    #[test]
    fn test_captions_follow_config() {
        let mut f = fixture(SoundConfig::default());
        f.engine.start_sound(&f.world, None, f.ring);
        assert!(f.engine.captions().is_empty());

        let mut f = fixture(SoundConfig::default().with_captions(true));
        f.engine.start_sound(&f.world, None, f.ring);
        f.engine.start_sound(&f.world, None, f.ring);
        assert_eq!(f.engine.captions().len(), 1);
    }

    #[test]
    fn test_stop_all_unbinds_captions_next_tick() {
        let mut f = fixture(SoundConfig::default().with_captions(true));
        let a = f.world.spawn(MapPoint::from_units(10, 0, 0), None);
        f.engine.start_sound(&f.world, Some(a), f.ring);
        f.engine.start_sound(&f.world, None, f.jump);
        assert_eq!(f.engine.captions().len(), 2);

        f.engine.stop_sounds();
        assert_eq!(f.engine.channels().live_count(), 0);
        f.engine.update_sounds(&f.world);
        assert!(f.engine.captions().iter().all(|c| c.channel.is_none()));
        assert!(f.engine.captions().iter().all(|c| c.is_fading() || c.lifespan <= 20));
    }

    #[test]
    fn test_stops_and_queries() {
        let mut f = fixture(SoundConfig::default());
        let a = f.world.spawn(MapPoint::from_units(10, 0, 0), None);
        f.engine.start_sound(&f.world, Some(a), f.ring);
        f.engine.start_sound(&f.world, Some(a), f.kjump);
        f.engine.start_sound(&f.world, None, f.ring);

        assert!(f.engine.origin_playing(a));
        f.engine.stop_sound_by_id(a, f.kjump);
        assert!(!f.engine.sound_playing(Some(a), f.kjump));
        f.engine.stop_sound_by_num(f.ring);
        assert!(!f.engine.id_playing(f.ring));
        f.engine.start_sound(&f.world, Some(a), f.ring);
        f.engine.stop_sound(a);
        assert!(!f.engine.origin_playing(a));
    }

    #[test]
    fn test_update_frees_finished_and_counts_tics() {
        let mut f = fixture(SoundConfig::default());
        f.engine.start_sound(&f.world, None, f.ring);
        for _ in 0..40 {
            f.engine.update_sounds(&f.world);
        }
        assert_eq!(f.engine.channels().live_count(), 0);
        assert_eq!(f.engine.gametic(), 40);
    }

    #[test]
    fn test_focus_loss_stops_sounds() {
        let mut f = fixture(SoundConfig::default());
        f.engine.start_sound(&f.world, None, f.ring);
        f.engine.set_window_focus(false);
        assert_eq!(f.engine.channels().live_count(), 0);
        assert!(f.engine.sound_disabled());
        assert!(f.engine.start_sound(&f.world, None, f.ring).is_none());

        f.engine.set_window_focus(true);
        assert!(f.engine.start_sound(&f.world, None, f.ring).is_some());

        let mut f = fixture(SoundConfig {
            play_sound_if_unfocused: true,
            ..SoundConfig::default()
        });
        f.engine.start_sound(&f.world, None, f.ring);
        f.engine.set_window_focus(false);
        assert_eq!(f.engine.channels().live_count(), 1);
    }

    #[test]
    fn test_apply_config() {
        let mut f = fixture(SoundConfig::default().with_captions(true));
        f.engine.start_sound(&f.world, None, f.ring);

        let mut config = f.engine.config().clone();
        config.channels = 4;
        config.sound_volume = 100;
        config.closed_captioning = false;
        config.stereo_reverse = true;
        f.engine.apply_config(config);

        assert_eq!(f.engine.channels().capacity(), 4);
        assert_eq!(f.engine.channels().live_count(), 0);
        assert_eq!(f.engine.backend().sfx_volume(), 100);
        assert!(f.engine.captions().is_empty());
        assert!(f.engine.spatial_settings().stereo_reverse);

        let mut config = f.engine.config().clone();
        config.sound_disabled = true;
        f.engine.apply_config(config);
        assert!(f.engine.start_sound(&f.world, None, f.ring).is_none());
    }

    #[test]
    fn test_destroyed_origin_before_start() {
        let mut f = fixture(SoundConfig::default());
        let gone = f.world.spawn(MapPoint::from_units(10, 0, 0), None);
        f.world.despawn(gone);
        assert!(f.engine.start_sound(&f.world, Some(gone), f.ring).is_none());
    }

    #[test]
    fn test_shutdown_returns_backend() {
        let mut f = fixture(SoundConfig::default());
        f.engine.start_sound(&f.world, None, f.ring);
        let backend = f.engine.shutdown();
        assert_eq!(backend.active_voices(), 0);
    }
}
