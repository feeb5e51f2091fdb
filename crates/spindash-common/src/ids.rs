//! ID types for emitters, sounds and skins.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generation-checked handle to a sound-emitting game object.
///
/// The audio core never owns game objects. It stores these handles and asks
/// the world to resolve them on every use; a handle whose generation no
/// longer matches resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginId {
    index: u32,
    generation: u32,
}

impl OriginId {
    /// Creates a handle from a registry slot and its generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Registry slot.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "origin#{}v{}", self.index, self.generation)
    }
}

/// Index of a sound definition in the sound catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(u16);

impl SoundId {
    /// The reserved "no sound" entry.
    pub const NONE: Self = Self(0);

    /// Creates a sound ID from a raw value.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether this is the reserved "no sound" entry.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sfx#{}", self.0)
    }
}

/// Index of a character skin with its own sound replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkinId(u8);

impl SkinId {
    /// Creates a skin ID from a raw value.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}
