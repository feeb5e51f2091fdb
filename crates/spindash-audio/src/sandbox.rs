//! An in-memory [`SoundWorld`] for tests and the soak driver.

use ahash::AHashSet;

use spindash_common::{Angle, Fixed, MapPoint, OriginId, SkinId};

use crate::listener::{listeners_from_views, Listener, PlayerView, Pose, MAX_LISTENERS};
use crate::track::{MusicStatus, TrackName};
use crate::world::{Emitter, SoundWorld};

/// Size of an open-sky cell in map units.
pub const SKY_CELL_UNITS: i32 = 64;

#[derive(Debug, Clone, Default)]
struct ObjectSlot {
    generation: u32,
    live: Option<SandboxObject>,
}

#[derive(Debug, Clone, Copy)]
struct SandboxObject {
    pose: Pose,
    skin: Option<SkinId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SandboxPlayer {
    avatar: Option<OriginId>,
    camera: Option<Pose>,
}

/// A generation-checked object registry with players, sky and music rules.
#[derive(Debug, Default)]
pub struct SandboxWorld {
    objects: Vec<ObjectSlot>,
    free: Vec<u32>,
    players: Vec<SandboxPlayer>,
    open_sky: AHashSet<(i32, i32)>,
    invalid_statuses: AHashSet<MusicStatus>,
    stopped: bool,
}

impl SandboxWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns an object and returns its handle.
    pub fn spawn(&mut self, position: MapPoint, skin: Option<SkinId>) -> OriginId {
        let live = Some(SandboxObject {
            pose: Pose::new(position, Angle::ZERO),
            skin,
        });
        if let Some(index) = self.free.pop() {
            let slot = &mut self.objects[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.live = live;
            return OriginId::new(index, slot.generation);
        }
        let index = self.objects.len() as u32;
        self.objects.push(ObjectSlot {
            generation: 0,
            live,
        });
        OriginId::new(index, 0)
    }

    /// Destroys an object. Its handle stops resolving.
    pub fn despawn(&mut self, origin: OriginId) -> bool {
        let Some(slot) = self.slot_mut(origin) else {
            return false;
        };
        slot.live = None;
        self.free.push(origin.index());
        true
    }

    /// Moves an object.
    pub fn move_to(&mut self, origin: OriginId, position: MapPoint) -> bool {
        self.object_mut(origin).map(|o| o.pose.position = position).is_some()
    }

    /// Turns an object.
    pub fn turn_to(&mut self, origin: OriginId, angle: Angle) -> bool {
        self.object_mut(origin).map(|o| o.pose.angle = angle).is_some()
    }

    /// Adds a local player controlling `avatar`. Returns the player index.
    pub fn add_player(&mut self, avatar: OriginId) -> Option<usize> {
        if self.players.len() >= MAX_LISTENERS {
            return None;
        }
        self.players.push(SandboxPlayer {
            avatar: Some(avatar),
            camera: None,
        });
        Some(self.players.len() - 1)
    }

    /// Sets or clears a player's chase camera.
    pub fn set_camera(&mut self, player: usize, camera: Option<Pose>) {
        if let Some(p) = self.players.get_mut(player) {
            p.camera = camera;
        }
    }

    /// Marks the sky cell containing `(x, y)` (map units) as open.
    pub fn open_sky_at(&mut self, x: i32, y: i32) {
        self.open_sky
            .insert((x.div_euclid(SKY_CELL_UNITS), y.div_euclid(SKY_CELL_UNITS)));
    }

    /// Makes retained music with `status` invalid (e.g. a power-up ran out).
    pub fn invalidate_status(&mut self, status: MusicStatus) {
        self.invalid_statuses.insert(status);
    }

    /// Makes retained music with `status` valid again.
    pub fn validate_status(&mut self, status: MusicStatus) {
        self.invalid_statuses.remove(&status);
    }

    /// Pauses or unpauses the game.
    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    /// Number of live objects.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.objects.iter().filter(|s| s.live.is_some()).count()
    }

    fn slot_mut(&mut self, origin: OriginId) -> Option<&mut ObjectSlot> {
        self.objects
            .get_mut(origin.index() as usize)
            .filter(|s| s.generation == origin.generation() && s.live.is_some())
    }

    fn object(&self, origin: OriginId) -> Option<&SandboxObject> {
        self.objects
            .get(origin.index() as usize)
            .filter(|s| s.generation == origin.generation())
            .and_then(|s| s.live.as_ref())
    }

    fn object_mut(&mut self, origin: OriginId) -> Option<&mut SandboxObject> {
        self.slot_mut(origin).and_then(|s| s.live.as_mut())
    }

    fn views(&self) -> Vec<PlayerView> {
        self.players
            .iter()
            .map(|p| PlayerView {
                avatar: p.avatar,
                avatar_pose: p.avatar.and_then(|a| self.object(a)).map(|o| o.pose),
                camera: p.camera,
                away_view: None,
            })
            .collect()
    }
}

impl SoundWorld for SandboxWorld {
    fn listeners(&self) -> Vec<Listener> {
        listeners_from_views(&self.views())
    }

    fn emitter(&self, origin: OriginId) -> Option<Emitter> {
        self.object(origin).map(|o| Emitter {
            position: o.pose.position,
            skin: o.skin,
        })
    }

    fn is_open_sky(&self, x: Fixed, y: Fixed) -> bool {
        self.open_sky.contains(&(
            x.to_int().div_euclid(SKY_CELL_UNITS),
            y.to_int().div_euclid(SKY_CELL_UNITS),
        ))
    }

    fn music_status_valid(&self, status: MusicStatus, _track: &TrackName) -> bool {
        !self.invalid_statuses.contains(&status)
    }

    fn game_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_handle_does_not_resolve() {
        let mut world = SandboxWorld::new();
        let first = world.spawn(MapPoint::from_units(1, 2, 3), None);
        assert!(world.emitter(first).is_some());
        assert!(world.despawn(first));
        assert!(world.emitter(first).is_none());

        let second = world.spawn(MapPoint::default(), None);
        assert_eq!(second.index(), first.index());
        assert!(world.emitter(first).is_none());
        assert!(world.emitter(second).is_some());
        assert!(!world.despawn(first));
    }

    #[test]
    fn test_listeners_follow_avatar() {
        let mut world = SandboxWorld::new();
        let avatar = world.spawn(MapPoint::from_units(10, 0, 0), None);
        world.add_player(avatar);
        world.move_to(avatar, MapPoint::from_units(40, 0, 0));
        let listeners = world.listeners();
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].position.x.to_int(), 40);
        assert!(listeners[0].is_avatar(avatar));

        world.despawn(avatar);
        assert!(world.listeners().is_empty());
    }

    #[test]
    fn test_open_sky_cells() {
        let mut world = SandboxWorld::new();
        world.open_sky_at(100, -10);
        assert!(world.is_open_sky(Fixed::from_int(64), Fixed::from_int(-64)));
        assert!(world.is_open_sky(Fixed::from_int(127), Fixed::from_int(-1)));
        assert!(!world.is_open_sky(Fixed::from_int(128), Fixed::from_int(-1)));
    }
}
