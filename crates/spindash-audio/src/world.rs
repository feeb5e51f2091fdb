//! The game-side collaborator the audio engine queries every tic.

use spindash_common::{Fixed, MapPoint, OriginId, SkinId};

use crate::listener::Listener;
use crate::track::{MusicStatus, TrackName};

/// A live sound-emitting object, resolved from an [`OriginId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emitter {
    /// Current position
    pub position: MapPoint,
    /// Skin used for sound redirection
    pub skin: Option<SkinId>,
}

/// Everything the audio engine needs to know about the running game.
pub trait SoundWorld {
    /// Listeners for this tic, one per local player (at most four).
    fn listeners(&self) -> Vec<Listener>;

    /// Resolves an origin. Destroyed or recycled objects resolve to `None`.
    fn emitter(&self, origin: OriginId) -> Option<Emitter>;

    /// Whether the sector at `(x, y)` has open sky overhead.
    fn is_open_sky(&self, _x: Fixed, _y: Fixed) -> bool {
        false
    }

    /// Whether a retained music stack entry may still play.
    fn music_status_valid(&self, _status: MusicStatus, _track: &TrackName) -> bool {
        true
    }

    /// Whether the game is paused or in a menu (ambient captions persist).
    fn game_stopped(&self) -> bool {
        false
    }
}
