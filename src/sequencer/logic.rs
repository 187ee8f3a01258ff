use super::error::SequencerError;
use super::play_mode::PlayMode;
use crate::resolution::PrefetchSlot;
use crate::structs::PlaylistItem;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Playback position over a fixed playlist.
///
/// All navigation is a no-op on an empty playlist. In [`PlayMode::Random`] the visiting
/// order is a permutation of the playlist indices, generated whenever a playlist is
/// installed in random mode and whenever random mode is entered.
#[derive(Debug)]
pub struct Sequencer {
    items: Vec<PlaylistItem>,
    current: usize,
    position_set: bool,
    mode: PlayMode,
    permutation: Vec<usize>,
    rng: StdRng,
    prefetch_slot: Option<Arc<PrefetchSlot>>,
}

impl Sequencer {
    pub fn new(mode: PlayMode) -> Self {
        Self::with_rng(mode, StdRng::from_os_rng())
    }

    /// A sequencer whose random permutations are reproducible.
    pub fn with_seed(mode: PlayMode, seed: u64) -> Self {
        Self::with_rng(mode, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mode: PlayMode, rng: StdRng) -> Self {
        Self {
            items: Vec::new(),
            current: 0,
            position_set: false,
            mode,
            permutation: Vec::new(),
            rng,
            prefetch_slot: None,
        }
    }

    /// Shares the prefetch slot so that index changes invalidate mismatching prefetches.
    pub fn attach_prefetch_slot(&mut self, slot: Arc<PrefetchSlot>) {
        self.prefetch_slot = Some(slot);
    }

    pub fn set_playlist(&mut self, items: Vec<PlaylistItem>, reset_position: bool) {
        self.items = items;
        if let Some(slot) = &self.prefetch_slot {
            slot.clear();
        }
        if self.mode == PlayMode::Random {
            self.regenerate_permutation();
        } else {
            self.permutation.clear();
        }

        if self.items.is_empty() {
            self.current = 0;
            return;
        }
        if reset_position || !self.position_set {
            self.current = self.initial_index();
        } else {
            self.current = self.current.min(self.items.len() - 1);
        }
        self.position_set = true;
        debug!(
            len = self.items.len(),
            index = self.current,
            mode = %self.mode,
            "Playlist installed"
        );
    }

    fn initial_index(&self) -> usize {
        match self.mode {
            PlayMode::Reverse => self.items.len() - 1,
            PlayMode::Random => self.permutation.first().copied().unwrap_or(0),
            PlayMode::Sequential | PlayMode::Single => 0,
        }
    }

    fn regenerate_permutation(&mut self) {
        self.permutation = (0..self.items.len()).collect();
        self.permutation.shuffle(&mut self.rng);
    }

    /// Replaces the random visiting order, e.g. with one restored from a previous session.
    pub fn restore_permutation(&mut self, permutation: Vec<usize>) -> Result<(), SequencerError> {
        let len = self.items.len();
        let mut seen = vec![false; len];
        let is_bijection = permutation.len() == len
            && permutation
                .iter()
                .all(|&index| index < len && !std::mem::replace(&mut seen[index], true));
        if !is_bijection {
            return Err(SequencerError::InvalidPermutation {
                expected: len,
                actual: permutation.len(),
            });
        }
        self.permutation = permutation;
        Ok(())
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    fn step(&self, direction: Direction) -> Option<usize> {
        let len = self.items.len();
        if len == 0 {
            return None;
        }
        let i = self.current;
        let next = match (self.mode, direction) {
            (PlayMode::Single, _) => i,
            (PlayMode::Sequential, Direction::Forward) | (PlayMode::Reverse, Direction::Backward) => {
                (i + 1) % len
            }
            (PlayMode::Sequential, Direction::Backward) | (PlayMode::Reverse, Direction::Forward) => {
                (i + len - 1) % len
            }
            (PlayMode::Random, _) => self.step_in_permutation(direction),
        };
        Some(next)
    }

    fn step_in_permutation(&self, direction: Direction) -> usize {
        let len = self.permutation.len();
        let restart = self
            .permutation
            .first()
            .copied()
            .filter(|&first| first < self.items.len())
            .unwrap_or(0);
        match self.permutation.iter().position(|&index| index == self.current) {
            Some(position) if len == self.items.len() => {
                let target = match direction {
                    Direction::Forward => (position + 1) % len,
                    Direction::Backward => (position + len - 1) % len,
                };
                self.permutation[target]
            }
            _ => restart,
        }
    }

    /// The index [`Sequencer::advance`] would move to, without moving.
    pub fn peek_next(&self) -> Option<usize> {
        self.step(Direction::Forward)
    }

    /// The index [`Sequencer::retreat`] would move to, without moving.
    pub fn peek_previous(&self) -> Option<usize> {
        self.step(Direction::Backward)
    }

    pub fn advance(&mut self) -> Option<usize> {
        let next = self.step(Direction::Forward)?;
        self.move_to(next);
        Some(next)
    }

    pub fn retreat(&mut self) -> Option<usize> {
        let previous = self.step(Direction::Backward)?;
        self.move_to(previous);
        Some(previous)
    }

    /// Jumps to `index`. Out-of-range indices are ignored and return `false`.
    pub fn seek_to(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.move_to(index);
        true
    }

    fn move_to(&mut self, index: usize) {
        self.current = index;
        self.position_set = true;
        if let Some(slot) = &self.prefetch_slot {
            slot.retain_only(index);
        }
    }

    pub fn toggle_play_mode(&mut self) -> PlayMode {
        self.set_play_mode(self.mode.toggled());
        self.mode
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        if mode == PlayMode::Random {
            self.regenerate_permutation();
        }
        // The predicted next item depends on the mode.
        if let Some(slot) = &self.prefetch_slot {
            slot.retain_only(self.current);
        }
        debug!(mode = %mode, "Play mode changed");
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.current)
    }

    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.items.get(self.current)
    }

    pub fn item(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
