//! Closed captions for recently started sounds.
//!
//! A fixed array of [`NUM_CAPTIONS`] slots, kept sorted by priority with no
//! two entries sharing a sound or caption text. Slot 0 may hold the ambient
//! caption (the "none" sound, used for the music title), which persists
//! while the game is stopped.

use spindash_common::{SoundId, TIC_RATE};

use crate::channel::ChannelRef;
use crate::sound_def::SoundDef;

/// Number of caption slots.
pub const NUM_CAPTIONS: usize = 8;

/// Default lifespan of a caption.
pub const MAX_CAPTION_TICS: u16 = 2 * TIC_RATE as u16;

/// Remaining lifespan once a caption's sound has stopped.
pub const CAPTION_FADE_TICS: u16 = 20;

/// Initial bob offset of a fresh caption.
pub const CAPTION_BOB: u8 = 2;

/// One on-screen caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionEntry {
    /// Sound being captioned; `NONE` for the ambient caption
    pub sound: SoundId,
    /// Channel playing it, until that voice stops
    pub channel: Option<ChannelRef>,
    /// Tics left on screen
    pub lifespan: u16,
    /// Bob offset, counts down to 0
    pub bob: u8,
    text: String,
    priority: i32,
}

impl CaptionEntry {
    /// Caption text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Priority of the captioned sound.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether this is the ambient (music) caption.
    #[must_use]
    pub const fn is_ambient(&self) -> bool {
        self.sound.is_none()
    }

    /// Whether the caption is in its fade-out window.
    #[must_use]
    pub const fn is_fading(&self) -> bool {
        self.lifespan < CAPTION_FADE_TICS
    }
}

/// The caption list.
#[derive(Debug, Clone)]
pub struct CaptionQueue {
    entries: [Option<CaptionEntry>; NUM_CAPTIONS],
}

impl Default for CaptionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: std::array::from_fn(|_| None),
        }
    }

    /// The slot array, in display order.
    #[must_use]
    pub fn entries(&self) -> &[Option<CaptionEntry>] {
        &self.entries
    }

    /// Occupied slots, in display order.
    pub fn iter(&self) -> impl Iterator<Item = &CaptionEntry> {
        self.entries.iter().flatten()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no caption is showing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// The ambient caption, if showing.
    #[must_use]
    pub fn ambient(&self) -> Option<&CaptionEntry> {
        self.entries[0].as_ref().filter(|e| e.is_ambient())
    }

    fn first_sound_slot(&self) -> usize {
        usize::from(self.ambient().is_some())
    }

    /// Captions a started sound. Returns the slot used.
    ///
    /// A caption with the same sound or text collapses into the new one.
    /// Otherwise the new caption goes to the first empty slot or slot of
    /// lower or equal priority, shifting later captions down and dropping
    /// the last. Sounds without caption text are ignored.
    pub fn push(&mut self, sound: SoundId, def: &SoundDef, channel: Option<ChannelRef>, lifespan: u16) -> Option<usize> {
        if sound.is_none() || def.caption.is_empty() {
            return None;
        }

        let start = self.first_sound_slot();
        let duplicate = (start..NUM_CAPTIONS).find(|&i| {
            self.entries[i]
                .as_ref()
                .is_some_and(|e| e.sound == sound || e.text == def.caption)
        });
        let open = (start..NUM_CAPTIONS).find(|&i| {
            self.entries[i]
                .as_ref()
                .map_or(true, |e| e.priority <= def.priority)
        });

        let set = match (duplicate, open) {
            (Some(d), Some(o)) => d.min(o),
            (Some(d), None) => d,
            (None, Some(o)) => o,
            (None, None) => return None,
        };

        // The duplicate (or the last slot) is overwritten by the shift.
        let end = duplicate.unwrap_or(NUM_CAPTIONS - 1);
        self.shift_down(set, end);

        self.entries[set] = Some(CaptionEntry {
            sound,
            channel,
            lifespan,
            bob: CAPTION_BOB,
            text: def.caption.clone(),
            priority: def.priority,
        });
        Some(set)
    }

    /// Moves slots `[from, to)` down by one, overwriting slot `to`.
    fn shift_down(&mut self, from: usize, to: usize) {
        for i in (from..to).rev() {
            self.entries[i + 1] = self.entries[i].take();
        }
    }

    /// Shows or refreshes the ambient caption in slot 0.
    pub fn push_ambient(&mut self, text: impl Into<String>, lifespan: u16) {
        let text = text.into();
        if let Some(entry) = self.entries[0].as_mut().filter(|e| e.is_ambient()) {
            entry.text = text;
            entry.lifespan = lifespan;
            entry.bob = CAPTION_BOB;
            return;
        }

        // Drop any sound caption with the same text first.
        if let Some(d) = self
            .entries
            .iter()
            .position(|e| e.as_ref().is_some_and(|e| e.text == text))
        {
            self.entries[d] = None;
            self.shift_down(0, d);
        } else {
            self.shift_down(0, NUM_CAPTIONS - 1);
        }
        self.entries[0] = Some(CaptionEntry {
            sound: SoundId::NONE,
            channel: None,
            lifespan,
            bob: CAPTION_BOB,
            text,
            priority: i32::MAX,
        });
    }

    /// Shortens the ambient caption to the fade window.
    pub fn fade_ambient(&mut self) {
        if let Some(entry) = self.entries[0].as_mut().filter(|e| e.is_ambient()) {
            entry.lifespan = entry.lifespan.min(CAPTION_FADE_TICS);
        }
    }

    /// Ages every caption by one tic.
    ///
    /// Expired captions are cleared. A caption whose channel has stopped is
    /// unbound and left to fade. The ambient caption does not age while the
    /// game is stopped.
    pub fn tick(&mut self, game_stopped: bool, is_playing: impl Fn(ChannelRef) -> bool) {
        for (index, slot) in self.entries.iter_mut().enumerate() {
            let Some(entry) = slot.as_mut() else {
                continue;
            };
            if index == 0 && entry.is_ambient() && game_stopped {
                continue;
            }

            entry.bob = entry.bob.saturating_sub(1);
            entry.lifespan = entry.lifespan.saturating_sub(1);
            if entry.lifespan == 0 {
                *slot = None;
                continue;
            }

            if entry.channel.is_some_and(|ch| !is_playing(ch)) {
                entry.channel = None;
                entry.lifespan = entry.lifespan.min(CAPTION_FADE_TICS);
            }
        }
    }

    /// Clears every caption except the ambient one.
    pub fn clear_sounds(&mut self) {
        let start = self.first_sound_slot();
        for slot in &mut self.entries[start..] {
            *slot = None;
        }
    }

    /// Clears everything.
    pub fn clear(&mut self) {
        self.entries = std::array::from_fn(|_| None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SoundBackend, VoiceParams};
    use crate::channel::{Channel, ChannelPool};
    use crate::sim::SimulatedBackend;
    use proptest::prelude::*;

    fn def(caption: &str, priority: i32) -> SoundDef {
        SoundDef::new(caption.to_lowercase(), priority).with_caption(caption)
    }

    fn texts(queue: &CaptionQueue) -> Vec<&str> {
        queue.iter().map(CaptionEntry::text).collect()
    }

    #[test]
    fn test_sorted_by_priority() {
        let mut queue = CaptionQueue::new();
        queue.push(SoundId::new(1), &def("Low", 10), None, 70);
        queue.push(SoundId::new(2), &def("High", 100), None, 70);
        queue.push(SoundId::new(3), &def("Mid", 50), None, 70);
        assert_eq!(texts(&queue), vec!["High", "Mid", "Low"]);
    }

    #[test]
    fn test_same_text_refreshes() {
        let mut queue = CaptionQueue::new();
        queue.push(SoundId::new(1), &def("Ring", 10), None, 70);
        queue.tick(false, |_| true);
        queue.tick(false, |_| true);
        let slot = queue.push(SoundId::new(2), &def("Ring", 10), None, 70);
        assert_eq!(slot, Some(0));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next().map(|e| e.lifespan), Some(70));
    }

    #[test]
    fn test_higher_priority_collapses_duplicate() {
        let mut queue = CaptionQueue::new();
        queue.push(SoundId::new(1), &def("A", 90), None, 70);
        queue.push(SoundId::new(2), &def("B", 80), None, 70);
        queue.push(SoundId::new(3), &def("C", 70), None, 70);
        // Same sound as B at a higher priority than B.
        let slot = queue.push(SoundId::new(2), &def("B", 85).with_caption("B!"), None, 70);
        assert_eq!(slot, Some(1));
        assert_eq!(texts(&queue), vec!["A", "B!", "C"]);
    }

    #[test]
    fn test_full_queue_drops_last() {
        let mut queue = CaptionQueue::new();
        for n in 0..NUM_CAPTIONS {
            let text = format!("S{n}");
            queue.push(SoundId::new(n as u16 + 1), &def(&text, 100 - n as i32), None, 70);
        }
        assert_eq!(queue.len(), NUM_CAPTIONS);

        // Lower than everything: nowhere to go.
        assert_eq!(queue.push(SoundId::new(50), &def("Quiet", 0), None, 70), None);

        assert_eq!(queue.push(SoundId::new(51), &def("Loud", 200), None, 70), Some(0));
        assert_eq!(queue.len(), NUM_CAPTIONS);
        assert!(!texts(&queue).contains(&"S7"));
    }

    #[test]
    fn test_uncaptioned_ignored() {
        let mut queue = CaptionQueue::new();
        assert_eq!(queue.push(SoundId::new(1), &SoundDef::new("x", 10), None, 70), None);
        assert_eq!(queue.push(SoundId::NONE, &def("None", 10), None, 70), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stopped_channel_fades() {
        let mut queue = CaptionQueue::new();
        let mut pool = ChannelPool::new(1);
        let mut backend = SimulatedBackend::new();
        let d = def("Beep", 10);
        let handle = backend
            .start_sound(SoundId::new(1), VoiceParams::centered(255), 10, 0)
            .expect("start");
        let ch = pool
            .bind(0, Channel::new(SoundId::new(1), &d, None, 255, handle))
            .expect("bind");
        queue.push(SoundId::new(1), &d, Some(ch), MAX_CAPTION_TICS);

        pool.stop_all(&mut backend);
        queue.tick(false, |r| pool.get(r).is_some());
        let entry = queue.iter().next().expect("still showing");
        assert!(entry.channel.is_none());
        assert_eq!(entry.lifespan, CAPTION_FADE_TICS);

        for _ in 0..CAPTION_FADE_TICS {
            queue.tick(false, |_| false);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ambient_persists_while_stopped() {
        let mut queue = CaptionQueue::new();
        queue.push(SoundId::new(1), &def("Ring", 10), None, 70);
        queue.push_ambient("\u{266a} Greenflower Zone", 5);
        assert_eq!(texts(&queue), vec!["\u{266a} Greenflower Zone", "Ring"]);

        for _ in 0..10 {
            queue.tick(true, |_| true);
        }
        assert!(queue.ambient().is_some());

        // Sound captions never take slot 0 from the ambient caption.
        queue.push(SoundId::new(2), &def("Boom", 1000), None, 70);
        assert!(queue.ambient().is_some());

        queue.clear_sounds();
        assert_eq!(queue.len(), 1);

        queue.fade_ambient();
        for _ in 0..5 {
            queue.tick(false, |_| true);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_bob_counts_down() {
        let mut queue = CaptionQueue::new();
        queue.push(SoundId::new(1), &def("Ring", 10), None, 70);
        queue.tick(false, |_| true);
        queue.tick(false, |_| true);
        queue.tick(false, |_| true);
        assert_eq!(queue.iter().next().map(|e| e.bob), Some(0));
    }

    proptest! {
        #[test]
        fn prop_no_duplicate_text(pushes in proptest::collection::vec((1u16..12, 0i32..5), 1..80)) {
            let mut queue = CaptionQueue::new();
            for (sound, priority) in pushes {
                let text = format!("cap{}", sound % 6);
                queue.push(SoundId::new(sound), &def(&text, priority), None, 70);
                let shown = texts(&queue);
                let mut unique = shown.clone();
                unique.sort_unstable();
                unique.dedup();
                prop_assert_eq!(shown.len(), unique.len());
                prop_assert!(shown.len() <= NUM_CAPTIONS);
            }
        }
    }
}
