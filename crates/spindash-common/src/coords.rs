//! Map coordinate types.

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed;

/// A point in map space, in fixed-point map units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MapPoint {
    /// X coordinate
    pub x: Fixed,
    /// Y coordinate
    pub y: Fixed,
    /// Height
    pub z: Fixed,
}

impl MapPoint {
    /// Creates a new map point.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Creates a map point from whole map units.
    #[must_use]
    pub const fn from_units(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: Fixed::from_int(x),
            y: Fixed::from_int(y),
            z: Fixed::from_int(z),
        }
    }

    /// The XY projection of this point.
    #[must_use]
    pub const fn xy(self) -> (Fixed, Fixed) {
        (self.x, self.y)
    }

    /// Whether two points share the same XY position (height ignored).
    #[must_use]
    pub fn same_xy(self, other: Self) -> bool {
        self.x == other.x && self.y == other.y
    }

    /// Returns this point moved by whole map units.
    #[must_use]
    pub fn offset_units(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + Fixed::from_int(dx),
            y: self.y + Fixed::from_int(dy),
            z: self.z + Fixed::from_int(dz),
        }
    }
}
