//! Fixed-point sound spatialization.
//!
//! Computes how loud a sound is and where it sits in the stereo field, from
//! the geometry of one listener and one source.
//!
//! # Overview
//!
//! - **Distance**: a fast octagonal approximation (`max + min/2` per axis
//!   pair), clipped so it cannot overflow, then divided by the map scale
//! - **Distance classes**: `X2_AWAY`/`X4_AWAY`/`X8_AWAY` sounds divide the
//!   distance down so they carry further
//! - **Outdoor sounds**: distance is measured to the nearest open-sky point
//!   on a coarse grid around the listener instead of to the emitter
//! - **Attenuation**: unattenuated within [`CLOSE_DIST`], linear falloff to
//!   silence at [`CLIPPING_DIST`]
//! - **Separation**: the sine of the source's bearing relative to the
//!   listener's facing, scaled to [`STEREO_SWING`]; optionally a rear cone
//!   maps to a dedicated surround value
//!
//! # Example
//!
//! ```
//! use spindash_audio::spatial::{spatialize, SpatialSettings, Separation};
//! use spindash_audio::{Listener, SoundFlags};
//! use spindash_common::{Angle, MapPoint};
//!
//! let listener = Listener::new(MapPoint::from_units(0, 0, 0), Angle::ZERO);
//! let ahead = MapPoint::from_units(100, 0, 0);
//!
//! let heard = spatialize(
//!     &listener,
//!     ahead,
//!     SoundFlags::empty(),
//!     255,
//!     &SpatialSettings::default(),
//!     |_, _| false,
//! )
//! .expect("audible");
//! assert_eq!(heard.volume, 255);
//! assert_eq!(heard.separation, Separation::CENTER);
//! ```

use serde::{Deserialize, Serialize};

use spindash_common::{Angle, Fixed, MapPoint};

use crate::listener::Listener;
use crate::sound_def::SoundFlags;

/// Beyond this distance nothing is heard.
pub const CLIPPING_DIST: Fixed = Fixed::from_int(1536);

/// Within this distance sounds play at full volume.
pub const CLOSE_DIST: Fixed = Fixed::from_int(160);

/// Maximum stereo offset from centre.
pub const STEREO_SWING: Fixed = Fixed::from_int(96);

/// Centred stereo separation.
pub const NORM_SEP: u8 = 128;

/// Unshifted pitch.
pub const NORM_PITCH: u8 = 128;

/// Full volume.
pub const NORM_VOLUME: u8 = 255;

/// Largest whole-unit distance before conversion back to fixed point.
const MAX_DISTANCE_UNITS: i32 = (1 << 15) - 1;

/// Start and end of the rear cone heard as surround.
pub const SURROUND_CONE: (Angle, Angle) = (Angle::from_degrees(105), Angle::from_degrees(255));

/// Stereo position of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separation {
    /// 0 is hard left, 255 hard right
    Stereo(u8),
    /// Behind the listener, played through the surround path
    Surround,
}

impl Separation {
    /// Dead centre.
    pub const CENTER: Self = Self::Stereo(NORM_SEP);

    /// Mirrors the stereo field. Surround is unaffected.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Stereo(sep) => Self::Stereo(!sep),
            Self::Surround => Self::Surround,
        }
    }
}

impl Default for Separation {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Grid used to find the nearest open sky for outdoor sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutdoorSearch {
    /// Half-width of the search box in map units
    pub radius: i32,
    /// Grid step in map units
    pub step: i32,
}

impl Default for OutdoorSearch {
    fn default() -> Self {
        Self {
            radius: 1024,
            step: 64,
        }
    }
}

/// Global spatialization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialSettings {
    /// Swap left and right
    pub stereo_reverse: bool,
    /// Map the rear cone to [`Separation::Surround`]
    pub surround: bool,
    /// Map scale; distances are divided by it
    pub map_scale: Fixed,
    /// Open-sky search grid
    pub outdoor_search: OutdoorSearch,
}

impl Default for SpatialSettings {
    fn default() -> Self {
        Self {
            stereo_reverse: false,
            surround: false,
            map_scale: Fixed::ONE,
            outdoor_search: OutdoorSearch::default(),
        }
    }
}

/// The result of spatializing an audible sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spatialized {
    /// Attenuated volume, never 0
    pub volume: u8,
    /// Stereo position
    pub separation: Separation,
    /// Pitch
    pub pitch: u8,
    /// Effective distance after distance-class scaling
    pub distance: Fixed,
}

/// Approximate distance between two points, divided by `map_scale`.
///
/// Uses `a + b - min(a, b) / 2` for XY, then again with Z. The whole-unit
/// distance is clipped to 32767 before it goes back to fixed point.
#[must_use]
pub fn approx_distance(a: MapPoint, b: MapPoint, map_scale: Fixed) -> Fixed {
    let adx = (a.x.to_int() - b.x.to_int()).abs();
    let ady = (a.y.to_int() - b.y.to_int()).abs();
    let adz = (a.z.to_int() - b.z.to_int()).abs();

    let planar = adx + ady - (adx.min(ady) >> 1);
    let dist = planar + adz - (planar.min(adz) >> 1);

    Fixed::from_int(dist.min(MAX_DISTANCE_UNITS)).fixed_div(map_scale)
}

/// Distance from `listener` to the nearest open-sky grid point.
///
/// Returns zero when the listener itself is under open sky and the search
/// radius when nothing in the box is.
#[must_use]
pub fn outdoor_distance(
    listener: MapPoint,
    search: OutdoorSearch,
    map_scale: Fixed,
    is_open_sky: impl Fn(Fixed, Fixed) -> bool,
) -> Fixed {
    if is_open_sky(listener.x, listener.y) {
        return Fixed::ZERO;
    }

    let step = search.step.max(1);
    let cells = search.radius / step;
    let here = MapPoint::new(listener.x, listener.y, Fixed::ZERO);
    let mut best = Fixed::from_int(search.radius);

    for gy in -cells..=cells {
        for gx in -cells..=cells {
            let x = listener.x + Fixed::from_int(gx * step);
            let y = listener.y + Fixed::from_int(gy * step);
            if is_open_sky(x, y) {
                let d = approx_distance(here, MapPoint::new(x, y, Fixed::ZERO), map_scale);
                best = best.min(d);
            }
        }
    }
    best
}

/// Linear falloff of `volume` at `distance`.
#[must_use]
pub fn attenuate(volume: u8, distance: Fixed) -> u8 {
    if distance < CLOSE_DIST {
        return volume;
    }
    if distance >= CLIPPING_DIST {
        return 0;
    }
    let remaining = i64::from((CLIPPING_DIST - distance).raw());
    let span = i64::from((CLIPPING_DIST - CLOSE_DIST).raw());
    (i64::from(volume) * remaining / span) as u8
}

/// Stereo separation of `source` as heard by `listener`.
#[must_use]
pub fn stereo_separation(listener: &Listener, source: MapPoint, surround: bool) -> Separation {
    let bearing = Angle::between(listener.position.xy(), source.xy());
    let relative = bearing.wrapping_sub(listener.angle);

    if surround && relative > SURROUND_CONE.0 && relative < SURROUND_CONE.1 {
        return Separation::Surround;
    }

    // Sources to the left (positive sine) pan toward 0.
    let swing = STEREO_SWING.fixed_mul(relative.sine()).to_int();
    Separation::Stereo((i32::from(NORM_SEP) - swing).clamp(0, 255) as u8)
}

/// Spatializes one sound for one listener.
///
/// Returns `None` when the sound is inaudible: beyond the clipping distance
/// after distance-class scaling, or attenuated to zero.
#[must_use]
pub fn spatialize(
    listener: &Listener,
    source: MapPoint,
    flags: SoundFlags,
    volume: u8,
    settings: &SpatialSettings,
    is_open_sky: impl Fn(Fixed, Fixed) -> bool,
) -> Option<Spatialized> {
    let mut distance = if flags.contains(SoundFlags::OUTSIDE) {
        outdoor_distance(
            listener.position,
            settings.outdoor_search,
            settings.map_scale,
            is_open_sky,
        )
    } else {
        approx_distance(listener.position, source, settings.map_scale)
    };

    if flags.contains(SoundFlags::X8_AWAY) {
        distance = distance.fixed_div(Fixed::from_int(8));
    } else if flags.contains(SoundFlags::X4_AWAY) {
        distance = distance.fixed_div(Fixed::from_int(4));
    } else if flags.contains(SoundFlags::X2_AWAY) {
        distance = distance.fixed_div(Fixed::from_int(2));
    }

    if distance > CLIPPING_DIST {
        return None;
    }

    let separation = if source.same_xy(listener.position) {
        Separation::CENTER
    } else {
        stereo_separation(listener, source, settings.surround)
    };
    let separation = if settings.stereo_reverse {
        separation.reversed()
    } else {
        separation
    };

    let volume = attenuate(volume, distance);
    if volume == 0 {
        return None;
    }

    Some(Spatialized {
        volume,
        separation,
        pitch: NORM_PITCH,
        distance,
    })
}

/// Index of the listener closest to `source`.
///
/// Ties go to the lowest index.
#[must_use]
pub fn nearest_listener(listeners: &[Listener], source: MapPoint, map_scale: Fixed) -> Option<usize> {
    let mut best: Option<(usize, Fixed)> = None;
    for (index, listener) in listeners.iter().enumerate() {
        let d = approx_distance(listener.position, source, map_scale);
        match best {
            Some((_, closest)) if d >= closest => {},
            _ => best = Some((index, d)),
        }
    }
    best.map(|(index, _)| index)
}
