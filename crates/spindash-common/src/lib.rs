//! # Spindash Common
//!
//! Common types and utilities shared by the Spindash audio crates.
//!
//! This crate provides the foundational types the audio core is written in:
//! - Fixed-point scalars and binary angles (`Fixed`, `Angle`)
//! - Map coordinates (`MapPoint`)
//! - ID types (`OriginId`, `SoundId`, `SkinId`)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod fixed;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::fixed::*;
    pub use crate::ids::*;
}

pub use prelude::*;

/// Game tics per second.
pub const TIC_RATE: u32 = 35;

/// Game tic counter.
pub type Tic = u32;
