//! Generational slot storage.
//!
//! A [`SlotPool`] keeps three parallel vectors (elements, generations and
//! occupancy flags) that always have the same length. Spawning reuses the
//! first free slot or appends a new one at generation 0; despawning bumps the
//! slot's generation so every outstanding [`Handle`] for it stops validating.
//!
//! Despawned elements are not dropped: they stay in place until the slot is
//! handed out again, which lets callers read the previous contents back for
//! cleanup and lets `spawn` recycle buffers owned by the element.

use std::ops::{Index, IndexMut};

use tracing::{trace, warn};

use crate::handle::{Category, Handle};

// ---------------------------------------------------------------------------
// SlotPool
// ---------------------------------------------------------------------------

/// Typed, growable collection of generational slots for one [`Category`].
#[derive(Debug, Clone)]
pub struct SlotPool<T> {
    category: Category,
    elements: Vec<T>,
    generations: Vec<u32>,
    occupied: Vec<bool>,
}

impl<T> SlotPool<T> {
    /// Create an empty pool issuing handles of `category`.
    pub fn new(category: Category) -> Self {
        Self {
            category,
            elements: Vec::new(),
            generations: Vec::new(),
            occupied: Vec::new(),
        }
    }

    /// Create an empty pool with room for `capacity` slots before reallocating.
    pub fn with_capacity(category: Category, capacity: usize) -> Self {
        Self {
            category,
            elements: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            occupied: Vec::with_capacity(capacity),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Spawn `value` into the first free slot, or a new slot at generation 0.
    pub fn spawn_with(&mut self, value: T) -> Handle {
        match self.first_free() {
            Some(index) => {
                self.elements[index] = value;
                self.occupy(index)
            }
            None => self.push_slot(value),
        }
    }

    /// Spawn every value yielded by `values`, returning their handles in order.
    pub fn spawn_range<I>(&mut self, values: I) -> Vec<Handle>
    where
        I: IntoIterator<Item = T>,
    {
        values.into_iter().map(|v| self.spawn_with(v)).collect()
    }

    /// Despawn the slot named by `handle`.
    ///
    /// Returns `false` without touching the pool if the handle does not
    /// validate (wrong category, out of bounds, or stale generation).
    pub fn try_despawn(&mut self, handle: Handle) -> bool {
        if !self.is_valid(handle) {
            warn!(%handle, pool = %self.category, "despawn rejected: handle does not validate");
            return false;
        }
        self.release(handle.index() as usize);
        true
    }

    /// Despawn by raw index. Returns `false` if the index is out of bounds or
    /// the slot is already free.
    pub fn despawn_index(&mut self, index: usize) -> bool {
        if !self.is_valid_index(index) || !self.occupied[index] {
            return false;
        }
        self.release(index);
        true
    }

    /// A handle is valid when its category matches this pool, its index is in
    /// bounds, and its generation equals the slot's current generation.
    pub fn is_valid(&self, handle: Handle) -> bool {
        let index = handle.index() as usize;
        handle.category() == self.category
            && self.is_valid_index(index)
            && self.generations[index] == handle.generation()
    }

    /// Whether `index` addresses an existing slot (occupied or not).
    pub fn is_valid_index(&self, index: usize) -> bool {
        index < self.elements.len() && index < self.generations.len() && index < self.occupied.len()
    }

    /// Whether the slot at `index` currently holds a live element.
    pub fn is_occupied(&self, index: usize) -> bool {
        self.occupied.get(index).copied().unwrap_or(false)
    }

    /// The handle a fresh lookup of slot `index` would produce right now.
    pub fn current_handle(&self, index: usize) -> Option<Handle> {
        self.generations
            .get(index)
            .map(|&generation| Handle::new(self.category, index as u32, generation))
    }

    /// Current generation of slot `index`.
    pub fn generation(&self, index: usize) -> Option<u32> {
        self.generations.get(index).copied()
    }

    /// Element at `index`, occupied or not.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    /// Mutable element at `index`, occupied or not.
    ///
    /// The returned reference must not be held across a spawn or despawn on
    /// this pool.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.elements.get_mut(index)
    }

    /// Element named by `handle`, if the handle validates.
    pub fn get_by_handle(&self, handle: Handle) -> Option<&T> {
        if self.is_valid(handle) {
            self.elements.get(handle.index() as usize)
        } else {
            None
        }
    }

    /// Mutable element named by `handle`, if the handle validates.
    pub fn get_by_handle_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if self.is_valid(handle) {
            self.elements.get_mut(handle.index() as usize)
        } else {
            None
        }
    }

    /// Number of slots currently holding a live element.
    pub fn count_occupied(&self) -> usize {
        self.occupied.iter().filter(|&&o| o).count()
    }

    /// Total number of slots, occupied or free.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over occupied slot indices in ascending order.
    pub fn iter(&self) -> OccupiedIndices<'_> {
        OccupiedIndices::new(&self.occupied)
    }

    /// Current handles of every occupied slot, in index order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.iter()
            .map(move |index| Handle::new(self.category, index as u32, self.generations[index]))
    }

    /// Drop every slot. Handles issued before the clear may validate again
    /// once new slots are appended, so only clear pools nobody references.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.generations.clear();
        self.occupied.clear();
    }

    /// Check the parallel-length invariant.
    pub fn validate(&self) -> bool {
        self.elements.len() == self.generations.len() && self.elements.len() == self.occupied.len()
    }

    // -- internals ----------------------------------------------------------

    fn first_free(&self) -> Option<usize> {
        self.occupied.iter().position(|&o| !o)
    }

    fn occupy(&mut self, index: usize) -> Handle {
        self.occupied[index] = true;
        let handle = Handle::new(self.category, index as u32, self.generations[index]);
        trace!(%handle, "spawn (reused slot)");
        handle
    }

    fn push_slot(&mut self, value: T) -> Handle {
        let index = self.elements.len() as u32;
        self.elements.push(value);
        self.generations.push(0);
        self.occupied.push(true);
        let handle = Handle::new(self.category, index, 0);
        trace!(%handle, "spawn (new slot)");
        handle
    }

    fn release(&mut self, index: usize) {
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.occupied[index] = false;
        trace!(pool = %self.category, index, generation = self.generations[index], "despawn");
    }
}

impl<T: Default> SlotPool<T> {
    /// Spawn into the first free slot, leaving its previous contents in
    /// place, or append a slot holding `T::default()`.
    pub fn spawn(&mut self) -> Handle {
        match self.first_free() {
            Some(index) => self.occupy(index),
            None => self.push_slot(T::default()),
        }
    }
}

impl<T: Clone> SlotPool<T> {
    /// Despawn the slot named by `handle` and return a copy of the element it
    /// held, so callers can run cleanup. Returns `None` if the handle does not
    /// validate.
    pub fn despawn(&mut self, handle: Handle) -> Option<T> {
        if !self.is_valid(handle) {
            warn!(%handle, pool = %self.category, "despawn rejected: handle does not validate");
            return None;
        }
        let index = handle.index() as usize;
        let previous = self.elements[index].clone();
        self.release(index);
        Some(previous)
    }
}

impl<T> Index<usize> for SlotPool<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.elements[index]
    }
}

impl<T> IndexMut<usize> for SlotPool<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.elements[index]
    }
}

impl<'a, T> IntoIterator for &'a SlotPool<T> {
    type Item = usize;
    type IntoIter = OccupiedIndices<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// OccupiedIndices
// ---------------------------------------------------------------------------

/// Iterator over the occupied indices of a pool, ascending.
///
/// Walks the occupancy flags directly; nothing is collected. Call
/// [`reset`](Self::reset) to restart from the first slot.
#[derive(Debug, Clone)]
pub struct OccupiedIndices<'a> {
    occupied: &'a [bool],
    next: usize,
}

impl<'a> OccupiedIndices<'a> {
    fn new(occupied: &'a [bool]) -> Self {
        Self { occupied, next: 0 }
    }

    /// Rewind to the first slot.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

impl Iterator for OccupiedIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.next < self.occupied.len() {
            let index = self.next;
            self.next += 1;
            if self.occupied[index] {
                return Some(index);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.occupied.len().saturating_sub(self.next)))
    }
}

impl std::iter::FusedIterator for OccupiedIndices<'_> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
