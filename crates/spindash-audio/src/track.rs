//! Music track identity: names, flags, status tags and rates.

use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use spindash_common::TIC_RATE;

/// Maximum length of a music track name.
pub const TRACK_NAME_LEN: usize = 6;

/// Song position units per second (positions are in milliseconds).
pub const MUSIC_RATE: u32 = 1000;

/// Fade-in applied after a recalled track replaces a jingle.
pub const JINGLE_POST_FADE_MS: u32 = 1000;

/// Fade used to restore full volume when the same track is requested again.
pub const RESET_FADE_MS: u32 = 500;

/// Converts elapsed game tics into song position units.
#[must_use]
pub const fn tics_to_music_position(tics: u32) -> u32 {
    (tics as u64 * MUSIC_RATE as u64 / TIC_RATE as u64) as u32
}

/// A short music lump name (at most six characters, compared without case).
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TrackName(String);

impl TrackName {
    /// Creates a track name, truncating to six characters.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.chars().take(TRACK_NAME_LEN).collect())
    }

    /// The name as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty name (meaning "no music").
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for TrackName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for TrackName {}

impl Hash for TrackName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Debug for TrackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackName({:?})", self.0)
    }
}

impl fmt::Display for TrackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TrackName {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<TrackName> for String {
    fn from(name: TrackName) -> Self {
        name.0
    }
}

bitflags! {
    /// Flags passed along with a music change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MusicFlags: u16 {
        /// Reload the level's header track on the next level start.
        const RELOAD_RESET = 0x8000;
        /// Restart the track even if it is already playing.
        const FORCE_RESET = 0x4000;
        /// Sub-track index for multi-track formats.
        const TRACK_MASK = 0x0FFF;
    }
}

impl MusicFlags {
    /// Flags selecting a sub-track.
    #[must_use]
    pub const fn with_track(track: u16) -> Self {
        Self::from_bits_retain(track & Self::TRACK_MASK.bits())
    }

    /// The sub-track index.
    #[must_use]
    pub const fn track(self) -> u16 {
        self.bits() & Self::TRACK_MASK.bits()
    }
}

/// Identifies which subsystem owns a retained music stack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MusicStatus(u16);

impl MusicStatus {
    /// Null tag; never stored. Matches any entry on recall.
    pub const NONE: Self = Self(0);
    /// Generic owner.
    pub const OTHER: Self = Self(1);
    /// The level's background track. At most one entry carries it.
    pub const MASTER: Self = Self(2);
    /// Extra life jingle.
    pub const ONE_UP: Self = Self(3);
    /// Speed shoes.
    pub const SHOES: Self = Self(4);
    /// Invincibility.
    pub const INVINCIBILITY: Self = Self(5);
    /// Alternate invincibility theme.
    pub const ALT_INVINCIBILITY: Self = Self(6);
    /// Drowning countdown.
    pub const DROWN: Self = Self(7);
    /// Super form.
    pub const SUPER: Self = Self(8);
    /// Game over.
    pub const GAME_OVER: Self = Self(9);
    /// Timed bonus stage running out.
    pub const BONUS_TIMEOUT: Self = Self(10);
    /// Special stage running out.
    pub const SPECIAL_TIMEOUT: Self = Self(11);

    /// Creates a status tag from a raw value.
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw tag.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether this is the null tag.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    /// Whether this is the reserved level-track tag.
    #[must_use]
    pub const fn is_master(self) -> bool {
        self.0 == Self::MASTER.0
    }
}

impl fmt::Display for MusicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => f.write_str("none"),
            Self::MASTER => f.write_str("master"),
            Self(raw) => write!(f, "status#{raw}"),
        }
    }
}

/// The level's default background music.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelMusic {
    /// Track name
    pub name: TrackName,
    /// Music flags (sub-track, reset behaviour)
    pub flags: MusicFlags,
    /// Start position in milliseconds
    pub position: u32,
}

impl LevelMusic {
    /// Level music starting from the beginning.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: TrackName::new(name),
            flags: MusicFlags::empty(),
            position: 0,
        }
    }

    /// Sets the start position.
    #[must_use]
    pub const fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }

    /// Sets the flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: MusicFlags) -> Self {
        self.flags = flags;
        self
    }
}
