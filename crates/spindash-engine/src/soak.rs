//! Scripted soak run.
//!
//! Drives an [`AudioEngine`] over a [`SandboxWorld`] and the
//! [`SimulatedBackend`]: emitters orbit the player and fire sounds, a jingle
//! interrupts the level track and is recalled, and the game pauses once.

use anyhow::{Context, Result};
use tracing::{debug, info};

use spindash_audio::prelude::*;
use spindash_common::{Angle, AudioResult, Fixed, MapPoint, OriginId, SkinId, SoundId, TIC_RATE};

use crate::config::EngineConfig;

/// Jingle used by the run.
const JINGLE: &str = "invinc";

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoakReport {
    /// Tics simulated
    pub tics: u32,
    /// Sound start requests
    pub requested: usize,
    /// Requests that got a channel
    pub started: usize,
    /// Most channels live at once
    pub peak_channels: usize,
    /// Most captions shown at once
    pub peak_captions: usize,
    /// Jingles played
    pub jingles: usize,
    /// Recalls that found retained music
    pub recalls: usize,
}

/// The catalog used when no catalog file is configured.
pub fn builtin_catalog(level_music: &str) -> AudioResult<SoundCatalog> {
    let mut catalog = SoundCatalog::new();
    catalog.register(SoundDef::new("ring", 24).with_caption("Ring"))?;
    catalog.register(SoundDef::new("spring", 64).with_caption("Spring"))?;
    catalog.register(
        SoundDef::new("pop", 96)
            .with_flags(SoundFlags::NO_INTERRUPT)
            .with_caption("Pop"),
    )?;
    catalog.register(
        SoundDef::new("spin", 80)
            .with_flags(SoundFlags::TOTALLY_SINGLE)
            .with_caption("Spinning")
            .with_skin_sound(0),
    )?;
    catalog.register(SoundDef::new("bell", 127).singular().with_caption("Bell"))?;
    catalog.register(
        SoundDef::new("quake", 255)
            .with_flags(SoundFlags::X4_AWAY)
            .with_caption("Rumbling"),
    )?;
    catalog.register(
        SoundDef::new("rain", 2)
            .with_flags(SoundFlags::OUTSIDE | SoundFlags::NO_MULTIPLE)
            .with_volume(160),
    )?;
    let kspin = catalog.register(SoundDef::new("kspin", 80).with_caption("Gliding"))?;

    catalog.register_skin("sonic", Vec::new())?;
    catalog.register_skin("knuckles", vec![kspin])?;
    catalog.register_music(MusicDef {
        name: TrackName::new(level_music),
        title: "Level Theme".into(),
    });
    catalog.register_music(MusicDef {
        name: TrackName::new(JINGLE),
        title: "Invincibility".into(),
    });
    Ok(catalog)
}

fn orbit(center: MapPoint, radius: i32, angle: Angle) -> MapPoint {
    let r = Fixed::from_int(radius);
    MapPoint::new(
        center.x + r.fixed_mul(angle.cosine()),
        center.y + r.fixed_mul(angle.sine()),
        center.z,
    )
}

/// Runs the scripted scenario described by `config`.
pub fn run(config: &EngineConfig) -> Result<SoakReport> {
    let catalog = match &config.catalog {
        Some(path) => SoundCatalog::load_from(path)
            .with_context(|| format!("loading sound catalog {}", path.display()))?,
        None => builtin_catalog(&config.level_music).context("building sound catalog")?,
    };
    let sounds: Vec<SoundId> = catalog.ids().collect();

    let backend = SimulatedBackend::new()
        .with_song(&config.level_music, 150_000)
        .with_song(JINGLE, 20_000);
    let mut engine = AudioEngine::init(config.sound.clone(), catalog, backend);

    let mut world = SandboxWorld::new();
    let center = MapPoint::from_units(0, 0, 0);
    let avatar = world.spawn(center, Some(SkinId::new(0)));
    world.add_player(avatar);
    world.open_sky_at(512, 512);

    let emitters: Vec<OriginId> = (0..config.emitters)
        .map(|i| {
            let skin = (i % 3 == 0).then(|| SkinId::new(1));
            world.spawn(center, skin)
        })
        .collect();

    engine.start_level(LevelMusic::new(&config.level_music));

    let mut report = SoakReport::default();
    let spread = u32::MAX / config.emitters.max(1) as u32;
    let step = Angle::from_degrees(3);
    let mut paused_until = None;

    for tic in 0..config.tics {
        // Emitters drift outward and back so some leave clipping range.
        let swing = (tic % (4 * TIC_RATE)) as i32 * 8;
        for (i, &origin) in emitters.iter().enumerate() {
            let angle = Angle::from_raw(spread.wrapping_mul(i as u32))
                .wrapping_add(Angle::from_raw(step.raw().wrapping_mul(tic)));
            world.move_to(origin, orbit(center, config.orbit_radius + swing, angle));
        }

        if paused_until.is_none() && !sounds.is_empty() && tic % config.sound_interval == 0 {
            let n = (tic / config.sound_interval) as usize;
            let sound = sounds[n % sounds.len()];
            let origin = if n % 5 == 4 {
                Some(avatar)
            } else if emitters.is_empty() {
                None
            } else {
                Some(emitters[n % emitters.len()])
            };
            report.requested += 1;
            if engine.start_sound(&world, origin, sound).is_some() {
                report.started += 1;
            }
        }

        if config.jingle_interval > 0 && tic > 0 {
            let phase = tic % config.jingle_interval;
            if phase == 0 {
                world.validate_status(MusicStatus::INVINCIBILITY);
                if engine.play_jingle(JINGLE, MusicFlags::empty(), true, MusicStatus::INVINCIBILITY) {
                    report.jingles += 1;
                }
            } else if phase == config.jingle_interval / 2 {
                world.invalidate_status(MusicStatus::INVINCIBILITY);
                if engine.recall_music(&world, MusicStatus::NONE, false) {
                    report.recalls += 1;
                }
            }
        }

        if config.pause_at > 0 && tic == config.pause_at {
            info!(tic, "Pausing");
            world.set_stopped(true);
            engine.pause_audio();
            paused_until = Some(tic + TIC_RATE);
        } else if paused_until == Some(tic) {
            info!(tic, "Resuming");
            world.set_stopped(false);
            engine.resume_audio();
            paused_until = None;
        }

        engine.update_sounds(&world);

        report.peak_channels = report.peak_channels.max(engine.channels().live_count());
        report.peak_captions = report.peak_captions.max(engine.captions().len());
        report.tics += 1;
    }

    anyhow::ensure!(
        engine.music_stack().is_consistent(),
        "music stack is inconsistent after {} tics",
        report.tics
    );

    let backend = engine.shutdown();
    debug!(voices = backend.active_voices(), "Backend released");
    info!(
        tics = report.tics,
        requested = report.requested,
        started = report.started,
        peak_channels = report.peak_channels,
        peak_captions = report.peak_captions,
        jingles = report.jingles,
        recalls = report.recalls,
        "Soak run complete"
    );
    Ok(report)
}
