//! # Spindash Audio
//!
//! The game's audio core: everything that sits between gameplay and the
//! platform sound/music backend.
//!
//! - **Spatial math**: fixed-point distance, attenuation and stereo
//!   separation of a source relative to one of up to four local listeners
//! - **Channel pool**: a fixed set of mixer slots with a deterministic
//!   reuse/eviction ladder, refreshed once per tic
//! - **Caption queue**: a priority-sorted, de-duplicated list of closed
//!   captions for recently started sounds
//! - **Music stack**: retained music states that let jingles override the
//!   level track and later restore it at the right position
//! - **Audio engine**: the facade that drives all of the above each tic
//!
//! ## Architecture
//!
//! ```text
//! gameplay ──► AudioEngine ──► spatial ──► ChannelPool ──► SoundBackend
//!                  │                            │
//!                  ├──► CaptionQueue ◄──────────┘
//!                  └──► MusicStack ──────────────────────► MusicBackend
//! ```
//!
//! The engine never owns game objects. Emitters are referenced through
//! generation-checked [`OriginId`](spindash_common::OriginId) handles and
//! resolved through the [`SoundWorld`] trait on every use.
//!
//! Everything here is single-threaded and driven by the simulation tic. The
//! backend may mix on its own thread; that is its business.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod caption;
pub mod channel;
pub mod config;
pub mod engine;
pub mod listener;
pub mod music_player;
pub mod music_stack;
pub mod sandbox;
pub mod sim;
pub mod sound_def;
pub mod spatial;
pub mod track;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::caption::*;
    pub use crate::channel::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::listener::*;
    pub use crate::music_player::*;
    pub use crate::music_stack::*;
    pub use crate::sandbox::*;
    pub use crate::sim::*;
    pub use crate::sound_def::*;
    pub use crate::spatial::*;
    pub use crate::track::*;
    pub use crate::world::*;
}

pub use prelude::*;
