//! Sound definitions and the catalog that indexes them.
//!
//! A catalog is usually loaded from a TOML file:
//!
//! ```toml
//! [[sound]]
//! name = "jump"
//! priority = 64
//! caption = "Jump"
//! skin_sound = 0
//!
//! [[sound]]
//! name = "rain"
//! priority = 1
//! flags = "OUTSIDE"
//!
//! [[skin]]
//! name = "knuckles"
//! sounds = ["kjump"]
//!
//! [[music]]
//! name = "gfz1"
//! title = "Greenflower Zone Act 1"
//! ```

use std::path::Path;

use ahash::AHashMap;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use spindash_common::{AudioError, AudioResult, SkinId, SoundId};

use crate::track::TrackName;

/// Default priority for sounds that do not set one.
pub const DEFAULT_PRIORITY: i32 = 64;

/// Name of the reserved "no sound" entry.
pub const NONE_SOUND_NAME: &str = "none";

bitflags! {
    /// Distance and multiplicity modifiers carried by a sound definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SoundFlags: u16 {
        /// At most one totally-single sound per emitting object.
        const TOTALLY_SINGLE = 1 << 0;
        /// Refuse to start while the same sound plays anywhere.
        const NO_MULTIPLE = 1 << 1;
        /// Distance is measured to the nearest open sky, not the emitter.
        const OUTSIDE = 1 << 2;
        /// Heard from four times as far away.
        const X4_AWAY = 1 << 3;
        /// Heard from eight times as far away.
        const X8_AWAY = 1 << 4;
        /// Refuse to restart while this origin is already playing it.
        const NO_INTERRUPT = 1 << 5;
        /// Heard from twice as far away.
        const X2_AWAY = 1 << 6;
    }
}

/// One entry of the sound catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundDef {
    /// Lump name without prefix
    pub name: String,
    /// Eviction priority; higher survives longer
    pub priority: i32,
    /// Volume scalar applied to every start (255 = unity)
    pub volume: u8,
    /// Distance and multiplicity modifiers
    pub flags: SoundFlags,
    /// Only one instance may play at a time, globally
    pub singular: bool,
    /// Closed caption text; empty for no caption
    pub caption: String,
    /// Slot in the emitter's skin table that replaces this sound
    pub skin_sound: Option<usize>,
}

impl Default for SoundDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            priority: DEFAULT_PRIORITY,
            volume: u8::MAX,
            flags: SoundFlags::empty(),
            singular: false,
            caption: String::new(),
            skin_sound: None,
        }
    }
}

impl SoundDef {
    /// Creates a definition with the given name and priority.
    #[must_use]
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            ..Self::default()
        }
    }

    /// Sets the modifier flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: SoundFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Marks the sound as globally singular.
    #[must_use]
    pub const fn singular(mut self) -> Self {
        self.singular = true;
        self
    }

    /// Sets the volume scalar.
    #[must_use]
    pub const fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    /// Sets the closed caption.
    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Redirects this sound through the emitter's skin table.
    #[must_use]
    pub const fn with_skin_sound(mut self, slot: usize) -> Self {
        self.skin_sound = Some(slot);
        self
    }

    /// Applies this definition's volume scalar to a requested volume.
    #[must_use]
    pub fn scale_volume(&self, volume: u8) -> u8 {
        (u16::from(volume) * u16::from(self.volume) / 255) as u8
    }
}

/// A character skin's replacement sounds, indexed by skin-sound slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skin {
    /// Skin name
    pub name: String,
    /// Replacement for each skin-sound slot
    pub sounds: Vec<SoundId>,
}

/// Music metadata used for captions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicDef {
    /// Track name
    pub name: TrackName,
    /// Display title
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "sound")]
    sounds: Vec<SoundDef>,
    #[serde(default, rename = "skin")]
    skins: Vec<SkinFile>,
    #[serde(default, rename = "music")]
    music: Vec<MusicDef>,
}

#[derive(Debug, Deserialize)]
struct SkinFile {
    name: String,
    #[serde(default)]
    sounds: Vec<String>,
}

/// The table of sound definitions, skins and music titles.
///
/// Entry 0 is always the reserved "none" sound.
#[derive(Debug, Clone)]
pub struct SoundCatalog {
    defs: Vec<SoundDef>,
    by_name: AHashMap<String, SoundId>,
    skins: Vec<Skin>,
    music: AHashMap<TrackName, String>,
}

impl Default for SoundCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundCatalog {
    /// Creates a catalog holding only the "none" sound.
    #[must_use]
    pub fn new() -> Self {
        let mut by_name = AHashMap::new();
        by_name.insert(NONE_SOUND_NAME.to_string(), SoundId::NONE);
        Self {
            defs: vec![SoundDef::new(NONE_SOUND_NAME, 0)],
            by_name,
            skins: Vec::new(),
            music: AHashMap::new(),
        }
    }

    /// Number of entries, including "none".
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the catalog holds nothing besides "none".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.len() <= 1
    }

    /// Adds a definition, replacing any existing one with the same name.
    pub fn register(&mut self, def: SoundDef) -> AudioResult<SoundId> {
        let key = def.name.to_ascii_lowercase();
        if let Some(&id) = self.by_name.get(&key) {
            if id.is_none() {
                return Err(AudioError::InvariantViolation(
                    "the none sound cannot be redefined",
                ));
            }
            self.defs[usize::from(id.raw())] = def;
            return Ok(id);
        }
        let raw = u16::try_from(self.defs.len())
            .map_err(|_| AudioError::Config("sound catalog is full".into()))?;
        let id = SoundId::new(raw);
        self.defs.push(def);
        self.by_name.insert(key, id);
        Ok(id)
    }

    /// Looks up a definition.
    #[must_use]
    pub fn get(&self, id: SoundId) -> Option<&SoundDef> {
        self.defs.get(usize::from(id.raw()))
    }

    /// Finds a sound by name, ignoring case.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SoundId> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Every playable sound id (excludes "none").
    pub fn ids(&self) -> impl Iterator<Item = SoundId> + '_ {
        (1..self.defs.len()).map(|i| SoundId::new(i as u16))
    }

    /// Adds a skin and returns its id.
    pub fn register_skin(&mut self, name: impl Into<String>, sounds: Vec<SoundId>) -> AudioResult<SkinId> {
        let raw = u8::try_from(self.skins.len())
            .map_err(|_| AudioError::Config("too many skins".into()))?;
        self.skins.push(Skin {
            name: name.into(),
            sounds,
        });
        Ok(SkinId::new(raw))
    }

    /// Looks up a skin.
    #[must_use]
    pub fn skin(&self, id: SkinId) -> Option<&Skin> {
        self.skins.get(usize::from(id.raw()))
    }

    /// Resolves the sound an emitter with `skin` actually plays for `sound`.
    ///
    /// Sounds without a skin slot, emitters without a skin, and skins that
    /// leave the slot unset all play the original sound.
    #[must_use]
    pub fn resolve_skin_sound(&self, sound: SoundId, skin: Option<SkinId>) -> SoundId {
        let slot = self.get(sound).and_then(|def| def.skin_sound);
        match (slot, skin.and_then(|s| self.skin(s))) {
            (Some(slot), Some(skin)) => skin
                .sounds
                .get(slot)
                .copied()
                .filter(|id| !id.is_none())
                .unwrap_or(sound),
            _ => sound,
        }
    }

    /// Records a music title.
    pub fn register_music(&mut self, def: MusicDef) {
        self.music.insert(def.name, def.title);
    }

    /// Display title of a track, if known.
    #[must_use]
    pub fn music_title(&self, name: &TrackName) -> Option<&str> {
        self.music.get(name).map(String::as_str)
    }

    /// Parses a catalog from TOML text.
    pub fn from_toml_str(text: &str) -> AudioResult<Self> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| AudioError::Config(e.to_string()))?;

        let mut catalog = Self::new();
        for def in file.sounds {
            catalog.register(def)?;
        }
        for skin in file.skins {
            let sounds = skin
                .sounds
                .iter()
                .map(|name| {
                    catalog.lookup(name).unwrap_or_else(|| {
                        warn!(skin = %skin.name, sound = %name, "unknown skin sound");
                        SoundId::NONE
                    })
                })
                .collect();
            catalog.register_skin(skin.name, sounds)?;
        }
        for def in file.music {
            catalog.register_music(def);
        }

        debug!(
            sounds = catalog.len() - 1,
            skins = catalog.skins.len(),
            music = catalog.music.len(),
            "Sound catalog loaded"
        );
        Ok(catalog)
    }

    /// Loads a catalog file.
    pub fn load_from(path: &Path) -> AudioResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        [[sound]]
        name = "jump"
        priority = 64
        caption = "Jump"
        skin_sound = 0

        [[sound]]
        name = "kjump"
        caption = "Jump"

        [[sound]]
        name = "rain"
        priority = 1
        flags = "OUTSIDE | X4_AWAY"

        [[skin]]
        name = "sonic"

        [[skin]]
        name = "knuckles"
        sounds = ["kjump"]

        [[music]]
        name = "gfz1"
        title = "Greenflower Zone Act 1"
    "#;

    #[test]
    fn test_none_is_reserved() {
        let mut catalog = SoundCatalog::new();
        assert_eq!(catalog.lookup("NONE"), Some(SoundId::NONE));
        assert!(catalog.is_empty());
        assert!(catalog.register(SoundDef::new("none", 10)).is_err());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut catalog = SoundCatalog::new();
        let a = catalog.register(SoundDef::new("ring", 10)).expect("register");
        let b = catalog.register(SoundDef::new("RING", 99)).expect("register");
        assert_eq!(a, b);
        assert_eq!(catalog.get(a).map(|d| d.priority), Some(99));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_from_toml() {
        let catalog = SoundCatalog::from_toml_str(CATALOG).expect("parse");
        let rain = catalog.lookup("rain").expect("rain");
        let def = catalog.get(rain).expect("def");
        assert_eq!(def.priority, 1);
        assert!(def.flags.contains(SoundFlags::OUTSIDE | SoundFlags::X4_AWAY));
        assert_eq!(def.volume, 255);
        assert_eq!(
            catalog.music_title(&TrackName::new("GFZ1")),
            Some("Greenflower Zone Act 1")
        );
    }

    #[test]
    fn test_skin_redirect() {
        let catalog = SoundCatalog::from_toml_str(CATALOG).expect("parse");
        let jump = catalog.lookup("jump").expect("jump");
        let kjump = catalog.lookup("kjump").expect("kjump");
        let rain = catalog.lookup("rain").expect("rain");

        // Skin 0 has no table entry for the slot.
        assert_eq!(catalog.resolve_skin_sound(jump, Some(SkinId::new(0))), jump);
        assert_eq!(catalog.resolve_skin_sound(jump, Some(SkinId::new(1))), kjump);
        assert_eq!(catalog.resolve_skin_sound(jump, None), jump);
        assert_eq!(catalog.resolve_skin_sound(rain, Some(SkinId::new(1))), rain);
    }

    #[test]
    fn test_scale_volume() {
        let def = SoundDef::new("quiet", 1).with_volume(128);
        assert_eq!(def.scale_volume(255), 128);
        assert_eq!(SoundDef::new("loud", 1).scale_volume(200), 200);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sounds.toml");
        std::fs::write(&path, CATALOG).expect("write");
        let catalog = SoundCatalog::load_from(&path).expect("load");
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_malformed_catalog() {
        assert!(SoundCatalog::from_toml_str("[[sound]]\npriority = \"high\"").is_err());
    }
}
