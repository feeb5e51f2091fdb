//! Listeners: where each local player hears from.

use spindash_common::{Angle, MapPoint, OriginId};

/// Maximum number of local (split-screen) listeners.
pub const MAX_LISTENERS: usize = 4;

/// A position and facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pose {
    /// Position in map space
    pub position: MapPoint,
    /// Facing angle
    pub angle: Angle,
}

impl Pose {
    /// Creates a pose.
    #[must_use]
    pub const fn new(position: MapPoint, angle: Angle) -> Self {
        Self { position, angle }
    }
}

/// One local player's ears for this tic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Listener {
    /// Position in map space
    pub position: MapPoint,
    /// Facing angle
    pub angle: Angle,
    /// The object whose own sounds are heard centred at full volume
    pub avatar: Option<OriginId>,
}

impl Listener {
    /// Creates a listener with no avatar.
    #[must_use]
    pub const fn new(position: MapPoint, angle: Angle) -> Self {
        Self {
            position,
            angle,
            avatar: None,
        }
    }

    /// Attaches the avatar object.
    #[must_use]
    pub const fn with_avatar(mut self, avatar: OriginId) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Whether `origin` is this listener's own avatar.
    #[must_use]
    pub fn is_avatar(&self, origin: OriginId) -> bool {
        self.avatar == Some(origin)
    }
}

/// What a local player is looking through this tic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerView {
    /// The player's avatar object
    pub avatar: Option<OriginId>,
    /// The avatar's pose, if it exists
    pub avatar_pose: Option<Pose>,
    /// The chase camera's pose, if the camera is active
    pub camera: Option<Pose>,
    /// A cutscene viewpoint that overrides both
    pub away_view: Option<(OriginId, Pose)>,
}

impl PlayerView {
    /// Derives the listener: away view first, then chase camera, then avatar.
    #[must_use]
    pub fn listener(&self) -> Option<Listener> {
        if let Some((origin, pose)) = self.away_view {
            return Some(Listener::new(pose.position, pose.angle).with_avatar(origin));
        }
        let pose = self.camera.or(self.avatar_pose)?;
        Some(Listener {
            position: pose.position,
            angle: pose.angle,
            avatar: self.avatar,
        })
    }
}

/// Builds the listener list from up to [`MAX_LISTENERS`] player views.
#[must_use]
pub fn listeners_from_views(views: &[PlayerView]) -> Vec<Listener> {
    views
        .iter()
        .take(MAX_LISTENERS)
        .filter_map(PlayerView::listener)
        .collect()
}
