//! The mixer channel pool.
//!
//! A fixed number of slots, each holding at most one playing voice. Slots are
//! handed out by [`ChannelPool::acquire`], which walks a fixed ladder of
//! reuse rules before falling back to a free slot or priority eviction:
//!
//! 1. the same sound is playing and is `NO_MULTIPLE`: refuse
//! 2. the same sound is playing and is singular: stop it, reuse its slot
//! 3. the same origin is playing the same sound: stop and reuse, or refuse
//!    if the sound is `NO_INTERRUPT`
//! 4. the same origin is playing another `TOTALLY_SINGLE` sound and this one
//!    is too: stop and reuse
//! 5. the first free slot
//! 6. the lowest-priority occupant, if its priority is `<=` the request's
//!    (ties go to the lowest index)
//!
//! Rules 1-4 are checked against every live slot before any free slot is
//! considered, so a duplicate is always caught even when free slots exist.
//! When several slots match, the earliest rule wins, then the lowest index.
//!
//! Each slot carries a generation that changes on every bind, so a
//! [`ChannelRef`] held by a caption goes stale once its voice is gone.

use tracing::trace;

use spindash_common::{AudioError, AudioResult, OriginId, SoundId};

use crate::backend::{SoundBackend, VoiceHandle};
use crate::listener::Listener;
use crate::sound_def::{SoundDef, SoundFlags};
use crate::spatial::{nearest_listener, spatialize, SpatialSettings};
use crate::world::SoundWorld;

/// Default number of mixer channels.
pub const DEFAULT_CHANNELS: usize = 32;

/// Generation-checked reference to one occupancy of a channel slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    index: usize,
    generation: u32,
}

impl ChannelRef {
    /// Slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }

    /// Occupancy generation.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// A live voice bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// The sound playing (after skin redirection)
    pub sound: SoundId,
    /// Emitting object; `None` for global/UI sounds
    pub origin: Option<OriginId>,
    /// Requested volume before attenuation
    pub volume: u8,
    /// Backend voice
    pub handle: VoiceHandle,
    /// Eviction priority
    pub priority: i32,
    /// Distance and multiplicity flags
    pub flags: SoundFlags,
    /// Globally singular
    pub singular: bool,
}

impl Channel {
    /// Builds a channel for `sound` as described by `def`.
    #[must_use]
    pub fn new(sound: SoundId, def: &SoundDef, origin: Option<OriginId>, volume: u8, handle: VoiceHandle) -> Self {
        Self {
            sound,
            origin,
            volume,
            handle,
            priority: def.priority,
            flags: def.flags,
            singular: def.singular,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    channel: Option<Channel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conflict {
    Refuse,
    Replace,
}

/// Reuse rules in ladder order; the lowest rung found anywhere wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rung {
    NoMultiple,
    Singular,
    NoInterrupt,
    SameOrigin,
    TotallySingle,
}

impl Rung {
    const fn conflict(self) -> Conflict {
        match self {
            Self::NoMultiple | Self::NoInterrupt => Conflict::Refuse,
            Self::Singular | Self::SameOrigin | Self::TotallySingle => Conflict::Replace,
        }
    }
}

/// Fixed-size pool of mixer channels.
#[derive(Debug)]
pub struct ChannelPool {
    slots: Vec<Slot>,
    next_generation: u32,
}

impl Default for ChannelPool {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNELS)
    }
}

impl ChannelPool {
    /// Creates a pool with `capacity` empty slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            next_generation: 1,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.channel.is_some()).count()
    }

    /// The channel behind `channel`, if that occupancy is still live.
    #[must_use]
    pub fn get(&self, channel: ChannelRef) -> Option<&Channel> {
        self.slots
            .get(channel.index)
            .filter(|s| s.generation == channel.generation)
            .and_then(|s| s.channel.as_ref())
    }

    /// Live channels with their references.
    pub fn iter(&self) -> impl Iterator<Item = (ChannelRef, &Channel)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.channel.as_ref().map(|ch| {
                (
                    ChannelRef {
                        index,
                        generation: slot.generation,
                    },
                    ch,
                )
            })
        })
    }

    /// Picks a slot for `sound` from `origin`, stopping whatever it replaces.
    ///
    /// The returned slot is empty; bind the started voice with [`bind`].
    ///
    /// [`bind`]: Self::bind
    pub fn acquire<B: SoundBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        origin: Option<OriginId>,
        sound: SoundId,
        def: &SoundDef,
    ) -> AudioResult<usize> {
        let mut first_free = None;
        let mut decision: Option<(Rung, usize)> = None;

        for (index, slot) in self.slots.iter().enumerate() {
            let Some(ch) = slot.channel.as_ref() else {
                first_free = first_free.or(Some(index));
                continue;
            };
            if let Some(rung) = Self::conflict(ch, origin, sound, def) {
                if decision.map_or(true, |(best, _)| rung < best) {
                    decision = Some((rung, index));
                }
            }
        }

        match decision.map(|(rung, index)| (index, rung.conflict())) {
            Some((_, Conflict::Refuse)) => {
                trace!(%sound, "duplicate suppressed");
                return Err(AudioError::DuplicateSuppressed { sound });
            },
            Some((index, Conflict::Replace)) => {
                trace!(%sound, index, "reusing channel");
                self.stop_channel(backend, index);
                return Ok(index);
            },
            None => {},
        }

        if let Some(index) = first_free {
            return Ok(index);
        }

        // min_by_key keeps the first of equal minima
        let victim = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.channel.as_ref().map(|c| (i, c.priority)))
            .min_by_key(|&(_, priority)| priority);

        match victim {
            Some((index, lowest)) if lowest <= def.priority => {
                trace!(%sound, index, evicted_priority = lowest, "evicting channel");
                self.stop_channel(backend, index);
                Ok(index)
            },
            _ => {
                trace!(%sound, priority = def.priority, "no channel available");
                Err(AudioError::ResourceExhausted { sound })
            },
        }
    }

    fn conflict(ch: &Channel, origin: Option<OriginId>, sound: SoundId, def: &SoundDef) -> Option<Rung> {
        if ch.sound == sound {
            if def.flags.contains(SoundFlags::NO_MULTIPLE) {
                return Some(Rung::NoMultiple);
            }
            if def.singular {
                return Some(Rung::Singular);
            }
        }

        let origin = origin?;
        if ch.origin != Some(origin) {
            return None;
        }
        if ch.sound == sound {
            return Some(if def.flags.contains(SoundFlags::NO_INTERRUPT) {
                Rung::NoInterrupt
            } else {
                Rung::SameOrigin
            });
        }
        if ch.flags.contains(SoundFlags::TOTALLY_SINGLE) && def.flags.contains(SoundFlags::TOTALLY_SINGLE) {
            return Some(Rung::TotallySingle);
        }
        None
    }

    /// Puts a started voice into slot `index`.
    ///
    /// Any voice still in the slot is dropped from the books without being
    /// stopped; callers bind into slots returned by [`acquire`](Self::acquire).
    pub fn bind(&mut self, index: usize, channel: Channel) -> Option<ChannelRef> {
        let generation = self.next_generation;
        let slot = self.slots.get_mut(index)?;
        self.next_generation = self.next_generation.wrapping_add(1).max(1);
        slot.generation = generation;
        slot.channel = Some(channel);
        Some(ChannelRef { index, generation })
    }

    /// Stops and frees slot `index`. Returns whether it was occupied.
    pub fn stop_channel<B: SoundBackend + ?Sized>(&mut self, backend: &mut B, index: usize) -> bool {
        let Some(ch) = self.slots.get_mut(index).and_then(|s| s.channel.take()) else {
            return false;
        };
        if backend.is_playing(ch.handle) {
            backend.stop_sound(ch.handle);
        }
        true
    }

    /// Re-spatializes every live channel and frees finished ones.
    ///
    /// Channels without an origin are left alone. Channels whose origin no
    /// longer resolves, or that have become inaudible, are stopped. A
    /// listener's own avatar is heard at its requested volume, centred.
    pub fn refresh<B, W>(&mut self, backend: &mut B, world: &W, listeners: &[Listener], settings: &SpatialSettings)
    where
        B: SoundBackend + ?Sized,
        W: SoundWorld + ?Sized,
    {
        for index in 0..self.slots.len() {
            let Some(ch) = self.slots[index].channel else {
                continue;
            };

            if !backend.is_playing(ch.handle) {
                trace!(sound = %ch.sound, index, "channel finished");
                self.slots[index].channel = None;
                continue;
            }

            let Some(origin) = ch.origin else {
                continue;
            };
            if listeners.is_empty() || listeners.iter().any(|l| l.is_avatar(origin)) {
                continue;
            }

            let Some(emitter) = world.emitter(origin) else {
                trace!(sound = %ch.sound, %origin, "origin gone, stopping channel");
                self.stop_channel(backend, index);
                continue;
            };

            let Some(nearest) = nearest_listener(listeners, emitter.position, settings.map_scale) else {
                continue;
            };
            let heard = spatialize(
                &listeners[nearest],
                emitter.position,
                ch.flags,
                ch.volume,
                settings,
                |x, y| world.is_open_sky(x, y),
            );
            match heard {
                Some(params) => backend.update_params(ch.handle, params.into()),
                None => {
                    trace!(sound = %ch.sound, index, "out of range");
                    self.stop_channel(backend, index);
                },
            }
        }
    }

    /// Stops every channel playing from `origin`.
    pub fn stop_by_origin<B: SoundBackend + ?Sized>(&mut self, backend: &mut B, origin: OriginId) -> usize {
        self.stop_where(backend, |ch| ch.origin == Some(origin))
    }

    /// Stops `sound` playing from `origin`.
    pub fn stop_by_origin_and_sound<B: SoundBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        origin: OriginId,
        sound: SoundId,
    ) -> usize {
        self.stop_where(backend, |ch| ch.origin == Some(origin) && ch.sound == sound)
    }

    /// Stops every instance of `sound`.
    pub fn stop_by_sound<B: SoundBackend + ?Sized>(&mut self, backend: &mut B, sound: SoundId) -> usize {
        self.stop_where(backend, |ch| ch.sound == sound)
    }

    /// Stops everything.
    pub fn stop_all<B: SoundBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        self.stop_where(backend, |_| true)
    }

    fn stop_where<B: SoundBackend + ?Sized>(&mut self, backend: &mut B, pred: impl Fn(&Channel) -> bool) -> usize {
        let mut stopped = 0;
        for index in 0..self.slots.len() {
            if self.slots[index].channel.as_ref().is_some_and(&pred) && self.stop_channel(backend, index) {
                stopped += 1;
            }
        }
        stopped
    }

    /// Whether `origin` is playing `sound`.
    #[must_use]
    pub fn sound_playing(&self, origin: Option<OriginId>, sound: SoundId) -> bool {
        self.iter().any(|(_, ch)| ch.origin == origin && ch.sound == sound)
    }

    /// Whether `origin` is playing anything.
    #[must_use]
    pub fn origin_playing(&self, origin: OriginId) -> bool {
        self.iter().any(|(_, ch)| ch.origin == Some(origin))
    }

    /// Whether `sound` is playing anywhere.
    #[must_use]
    pub fn id_playing(&self, sound: SoundId) -> bool {
        self.iter().any(|(_, ch)| ch.sound == sound)
    }

    /// Stops everything and changes the number of slots.
    pub fn resize<B: SoundBackend + ?Sized>(&mut self, backend: &mut B, capacity: usize) {
        self.stop_all(backend);
        self.slots.resize_with(capacity, Slot::default);
    }
}
