// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Slot storage with stable indices.
//!
//! An [`EntityTable`] is a growable vector of slots. Removing an entity leaves
//! a tombstone in its slot instead of compacting the vector, so every index
//! handed out stays valid for the lifetime of the entity it names and can be
//! used to address flat per-entity stores.
//!
//! # Example
//!
//! ```
//! use woolz_core::arena::EntityTable;
//!
//! let mut table = EntityTable::new();
//! let a = table.push("a");
//! let b = table.push("b");
//! table.remove(a);
//!
//! assert_eq!(table.max_ent(), 2);
//! assert_eq!(table.num_ent(), 1);
//! assert_eq!(table.get(b), Some(&"b"));
//! ```

/// Vector of entity slots where deleted entries are tombstoned.
#[derive(Debug, Clone)]
pub struct EntityTable<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> EntityTable<T> {
    /// Creates a new, empty table.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Creates an empty table with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Appends an entity and returns its slot index.
    pub fn push(&mut self, value: T) -> usize {
        self.slots.push(Some(value));
        self.live += 1;
        self.slots.len() - 1
    }

    /// Appends a tombstone, reserving an index that holds no entity.
    pub fn push_tombstone(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Removes the entity at `index`, leaving a tombstone.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let taken = self.slots.get_mut(index).and_then(Option::take);
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Returns `true` if `index` names a live entity.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of slots ever allocated, live or not.
    #[inline]
    pub fn max_ent(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entities.
    #[inline]
    pub fn num_ent(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates live entities in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (i, v)))
    }

    /// Iterates live entities mutably in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|v| (i, v)))
    }

    /// Iterates all slots, including tombstones.
    pub fn slots(&self) -> impl Iterator<Item = Option<&T>> {
        self.slots.iter().map(Option::as_ref)
    }
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<Option<T>> for EntityTable<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        let slots: Vec<Option<T>> = iter.into_iter().collect();
        let live = slots.iter().filter(|s| s.is_some()).count();
        Self { slots, live }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_empty() {
        let table: EntityTable<u8> = EntityTable::new();
        assert_eq!(table.max_ent(), 0);
        assert_eq!(table.num_ent(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn removal_keeps_indices_stable() {
        let mut table = EntityTable::new();
        let a = table.push(10);
        let b = table.push(20);
        let c = table.push(30);

        assert_eq!(table.remove(b), Some(20));
        assert_eq!(table.remove(b), None);
        assert_eq!(table.get(a), Some(&10));
        assert_eq!(table.get(c), Some(&30));
        assert!(!table.contains(b));
        assert_eq!(table.max_ent(), 3);
        assert_eq!(table.num_ent(), 2);

        let live: Vec<usize> = table.iter().map(|(i, _)| i).collect();
        assert_eq!(live, vec![a, c]);
    }

    #[test]
    fn collect_counts_live_slots() {
        let table: EntityTable<i32> = vec![Some(1), None, Some(3)].into_iter().collect();
        assert_eq!(table.max_ent(), 3);
        assert_eq!(table.num_ent(), 2);
        assert_eq!(table.slots().filter(|s| s.is_none()).count(), 1);
    }
}
