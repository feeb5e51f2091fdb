//! Retained music states.
//!
//! The stack is an ordered list of [`StackEntry`]s, each owned by a status
//! tag. Jingles retain the track they interrupt, and recalling walks the
//! list to find what should play next. At most one entry carries
//! [`MusicStatus::MASTER`], the level's background track.
//!
//! Entries live in an arena with explicit prev/next links, so removal by tag
//! is O(1) once found and nothing is reallocated per push.

use tracing::{debug, error};

use spindash_common::{AudioError, AudioResult, Tic};

use crate::backend::MusicLump;
use crate::track::{tics_to_music_position, LevelMusic, MusicFlags, MusicStatus, TrackName};

/// One retained music state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    /// Track name
    pub name: TrackName,
    /// Music flags
    pub flags: MusicFlags,
    /// Loops at the end
    pub looping: bool,
    /// Position when retained, in milliseconds
    pub position: u32,
    /// Game tic when retained
    pub tic: Tic,
    /// Owner tag
    pub status: MusicStatus,
    /// Music lump at retain time
    pub lump: Option<MusicLump>,
    /// Restart from zero instead of resuming
    pub no_position: bool,
}

impl StackEntry {
    /// Creates an entry. The tic is stamped when it is retained.
    #[must_use]
    pub fn new(name: TrackName, flags: MusicFlags, looping: bool, position: u32, status: MusicStatus) -> Self {
        Self {
            name,
            flags,
            looping,
            position,
            tic: 0,
            status,
            lump: None,
            no_position: false,
        }
    }

    /// A MASTER entry for the level's background track.
    #[must_use]
    pub fn master(level: &LevelMusic, position: u32, tic: Tic) -> Self {
        Self {
            tic,
            ..Self::new(level.name.clone(), level.flags, true, position, MusicStatus::MASTER)
        }
    }

    /// Sets the lump.
    #[must_use]
    pub fn with_lump(mut self, lump: Option<MusicLump>) -> Self {
        self.lump = lump;
        self
    }

    /// Where playback should resume at tic `now`.
    ///
    /// Elapsed time is only added when `song_length` is known, since a
    /// looping song of unknown length cannot be seeked past its loop point.
    #[must_use]
    pub fn resume_position(&self, now: Tic, song_length: u32) -> u32 {
        if self.no_position {
            return 0;
        }
        if song_length == 0 {
            return self.position;
        }
        self.position
            .saturating_add(tics_to_music_position(now.saturating_sub(self.tic)))
    }
}

#[derive(Debug, Clone)]
struct Node {
    entry: StackEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

/// The retained music list.
#[derive(Debug, Default)]
pub struct MusicStack {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    pause_start: Option<Tic>,
}

impl MusicStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the stack is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries front to back.
    pub fn iter(&self) -> impl Iterator<Item = &StackEntry> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes.get(cursor?)?.as_ref()?;
            cursor = node.next;
            Some(&node.entry)
        })
    }

    /// The entry owned by `status`.
    #[must_use]
    pub fn get(&self, status: MusicStatus) -> Option<&StackEntry> {
        self.iter().find(|e| e.status == status)
    }

    /// Whether `status` owns an entry.
    #[must_use]
    pub fn contains(&self, status: MusicStatus) -> bool {
        self.get(status).is_some()
    }

    fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index).and_then(Option::as_mut)
    }

    fn push_back(&mut self, entry: StackEntry) {
        let node = Node {
            entry,
            prev: self.tail,
            next: None,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                index
            },
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            },
        };
        match self.tail.and_then(|t| self.node_mut(t)) {
            Some(tail) => tail.next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    fn unlink(&mut self, index: usize) -> Option<StackEntry> {
        let node = self.nodes.get_mut(index)?.take()?;
        match node.prev {
            Some(p) => {
                if let Some(prev) = self.node_mut(p) {
                    prev.next = node.next;
                }
            },
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => {
                if let Some(next) = self.node_mut(n) {
                    next.prev = node.prev;
                }
            },
            None => self.tail = node.prev,
        }
        self.free.push(index);
        self.len -= 1;
        Some(node.entry)
    }

    /// Removes every entry owned by `status`. Returns how many went.
    pub fn remove(&mut self, status: MusicStatus) -> usize {
        if status.is_none() {
            return 0;
        }
        let mut removed = 0;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let Some(node) = self.node(index) else {
                break;
            };
            cursor = node.next;
            if node.entry.status == status && self.unlink(index).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Drops every entry. Pause accounting is kept.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Pushes a MASTER entry if the stack is empty.
    pub fn ensure_master(&mut self, master: StackEntry) {
        if self.is_empty() {
            debug_assert!(master.status.is_master());
            self.push_back(master);
        }
    }

    /// Retains `entry` at tic `now`, replacing any entry with its status.
    ///
    /// An empty stack gets `master` first (unless `entry` is itself the
    /// MASTER entry). Status `NONE` and a second MASTER are refused.
    pub fn retain(&mut self, mut entry: StackEntry, now: Tic, master: StackEntry) -> AudioResult<()> {
        if entry.status.is_none() {
            error!(track = %entry.name, "music stack entry without a status");
            return Err(AudioError::InvariantViolation(
                "music stack entries need a nonzero status",
            ));
        }
        if entry.status.is_master() {
            if self.contains(MusicStatus::MASTER) {
                error!(track = %entry.name, "second MASTER music stack entry");
                return Err(AudioError::InvariantViolation(
                    "the music stack holds only one MASTER entry",
                ));
            }
        } else {
            self.remove(entry.status);
        }

        entry.tic = now;
        if self.is_empty() && !entry.status.is_master() {
            self.push_back(master);
        }
        debug!(track = %entry.name, status = %entry.status, position = entry.position, "retaining music");
        self.push_back(entry);
        Ok(())
    }

    /// Finds the entry to recall.
    ///
    /// Walks front to back when `from_first`, else back to front, for an
    /// entry owned by `status` (any entry when `status` is `NONE`).
    /// Candidates failing `keep` are unlinked as they are passed.
    pub fn find(&mut self, status: MusicStatus, from_first: bool, mut keep: impl FnMut(&StackEntry) -> bool) -> Option<StackEntry> {
        let mut cursor = if from_first { self.head } else { self.tail };
        while let Some(index) = cursor {
            let node = self.node(index)?;
            cursor = if from_first { node.next } else { node.prev };
            if !status.is_none() && node.entry.status != status {
                continue;
            }
            if keep(&node.entry) {
                return Some(node.entry.clone());
            }
            if let Some(pruned) = self.unlink(index) {
                debug!(track = %pruned.name, status = %pruned.status, "pruning retained music");
            }
        }
        None
    }

    /// Starts pause accounting, unless already paused.
    pub fn pause(&mut self, now: Tic) {
        if self.pause_start.is_none() {
            self.pause_start = Some(now);
        }
    }

    /// Ends pause accounting, shifting every entry's tic by the paused span.
    pub fn resume(&mut self, now: Tic) {
        let Some(start) = self.pause_start.take() else {
            return;
        };
        let paused = now.saturating_sub(start);
        for node in self.nodes.iter_mut().flatten() {
            node.entry.tic = node.entry.tic.saturating_add(paused);
        }
    }

    /// Whether pause accounting is running.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.pause_start.is_some()
    }

    /// Checks the links, the length and the single-MASTER rule.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut count = 0;
        let mut masters = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let Some(node) = self.node(index) else {
                return false;
            };
            if node.prev != prev || count > self.len {
                return false;
            }
            if node.entry.status.is_none() {
                return false;
            }
            if node.entry.status.is_master() {
                masters += 1;
            }
            count += 1;
            prev = Some(index);
            cursor = node.next;
        }
        self.tail == prev && count == self.len && masters <= 1
    }
}
