// src/model/species.rs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered table of species symbols with occupancy counts.
///
/// Species are numbered in the order they are first seen, not alphabetically;
/// that number is what per-atom `specie` arrays store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable {
    counts: IndexMap<String, usize>,
}

impl SpeciesTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `sym`, registering it (with a zero count) if it is new.
    pub fn add(&mut self, sym: &str) -> usize {
        if let Some(i) = self.counts.get_index_of(sym) {
            return i;
        }
        self.counts.insert_full(sym.to_string(), 0).0
    }

    /// Registers `sym` if needed and bumps its count.
    pub fn increment(&mut self, sym: &str) -> usize {
        let i = self.add(sym);
        if let Some((_, count)) = self.counts.get_index_mut(i) {
            *count += 1;
        }
        i
    }

    /// Drops one occupant of species `index`, if any are left.
    pub fn decrement(&mut self, index: usize) {
        if let Some((_, count)) = self.counts.get_index_mut(index) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn index_of(&self, sym: &str) -> Option<usize> {
        self.counts.get_index_of(sym)
    }

    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.counts.get_index(index).map(|(s, _)| s.as_str())
    }

    pub fn count(&self, index: usize) -> usize {
        self.counts.get_index(index).map_or(0, |(_, &c)| c)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(symbol, count)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(s, &c)| (s.as_str(), c))
    }

    /// Maps symbols to species ids, skipping symbols this table has never seen.
    pub fn indices_of<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<usize> {
        symbols
            .iter()
            .filter_map(|s| self.index_of(s.as_ref()))
            .collect()
    }
}
