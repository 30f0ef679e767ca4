//! Membership sets over a fixed universe of instance indices
//!
//! An [`IndexSet`] keeps a presence bitmap and threads the present indices
//! through `prev`/`next` arrays in insertion order. Insert, delete,
//! membership and stepping to the successor are O(1) and never allocate.

use serde::{Deserialize, Serialize};

const NONE: usize = usize::MAX;

/// Set of indices in `0..capacity` with insertion-ordered traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSet {
    present: Vec<bool>,
    next: Vec<usize>,
    prev: Vec<usize>,
    first: usize,
    last: usize,
    len: usize,
}

impl IndexSet {
    /// Create an empty set over `0..capacity`
    pub fn new(capacity: usize) -> Self {
        Self {
            present: vec![false; capacity],
            next: vec![NONE; capacity],
            prev: vec![NONE; capacity],
            first: NONE,
            last: NONE,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.present[index]
    }

    /// Append `index`; returns false if it was already present
    pub fn insert(&mut self, index: usize) -> bool {
        if self.present[index] {
            return false;
        }

        self.present[index] = true;
        self.next[index] = NONE;
        self.prev[index] = self.last;
        if self.last == NONE {
            self.first = index;
        } else {
            self.next[self.last] = index;
        }
        self.last = index;
        self.len += 1;
        true
    }

    /// Remove `index`; returns false if it was not present
    ///
    /// The removed index keeps its forward link, so a traversal standing on
    /// it can still step to what used to follow it.
    pub fn delete(&mut self, index: usize) -> bool {
        if !self.present[index] {
            return false;
        }

        let prev = self.prev[index];
        let next = self.next[index];
        if prev == NONE {
            self.first = next;
        } else {
            self.next[prev] = next;
        }
        if next == NONE {
            self.last = prev;
        } else {
            self.prev[next] = prev;
        }
        self.present[index] = false;
        self.len -= 1;
        true
    }

    /// First present index, in insertion order
    pub fn first(&self) -> Option<usize> {
        Self::wrap(self.first)
    }

    /// Successor of `after`, or the first index when `after` is `None`
    pub fn next(&self, after: Option<usize>) -> Option<usize> {
        match after {
            None => self.first(),
            Some(index) => Self::wrap(self.next[index]),
        }
    }

    /// Iterate over the present indices in insertion order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            set: self,
            cursor: self.first,
        }
    }

    fn wrap(index: usize) -> Option<usize> {
        if index == NONE {
            None
        } else {
            Some(index)
        }
    }
}

impl Default for IndexSet {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Iterator over an [`IndexSet`]
pub struct Iter<'a> {
    set: &'a IndexSet,
    cursor: usize,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = IndexSet::wrap(self.cursor)?;
        self.cursor = self.set.next[current];
        Some(current)
    }
}
