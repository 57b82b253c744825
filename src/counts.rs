//! Sparse co-occurrence counts between a discrete variable's values and
//! mixture components.
//!
//! A [`MixtureCountStore`] is shared by every sampler iteration of a
//! training run and provides no locking: one writer at a time, enforced by
//! the `&mut self` receivers. Negative counts mean a caller decremented
//! something it never added and are treated as fatal.

use crate::assignment::Assignment;
use crate::models::mixture::MixtureFactor;
use std::collections::HashMap;

/// One non-zero entry of a sparse count table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountEntry {
    pub component: usize,
    pub count: u64,
}

/// Counts per mixture component for a single discrete value.
///
/// Only non-zero entries are stored, sorted by descending count, with an
/// index from component to position. Point queries and the mode are O(1);
/// an update costs as many swaps as positions the entry moves, which stays
/// small for the skewed distributions mixture samplers produce.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseCountTable {
    capacity: usize,
    entries: Vec<CountEntry>,
    positions: HashMap<usize, usize>,
    total: u64,
}

impl SparseCountTable {
    /// Creates an empty table over `capacity` components.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count_at(&self, component: usize) -> u64 {
        self.positions
            .get(&component)
            .map_or(0, |&pos| self.entries[pos].count)
    }

    /// Sum of all counts in the table.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of components with a non-zero count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Component with the highest count, if any.
    pub fn mode(&self) -> Option<usize> {
        self.entries.first().map(|entry| entry.component)
    }

    pub fn component_at_position(&self, position: usize) -> usize {
        self.entries[position].component
    }

    pub fn count_at_position(&self, position: usize) -> u64 {
        self.entries[position].count
    }

    /// Non-zero entries in descending count order.
    pub fn iter(&self) -> impl Iterator<Item = &CountEntry> {
        self.entries.iter()
    }

    /// Adds `delta` to the count of `component`.
    ///
    /// Panics if the component is out of range or the count would become
    /// negative.
    pub fn increment_at(&mut self, component: usize, delta: i64) {
        assert!(
            component < self.capacity,
            "component {} out of range for {} components",
            component,
            self.capacity
        );
        let updated = self.checked_count(component, delta);
        self.apply(component, updated);
    }

    /// Applies two increments as one operation.
    ///
    /// Both results are checked before anything changes, so moving an item
    /// between components never leaves the table in a transient negative
    /// state.
    pub fn increment_at_positions(&mut self, first: (usize, i64), second: (usize, i64)) {
        for (component, _) in [first, second] {
            assert!(
                component < self.capacity,
                "component {} out of range for {} components",
                component,
                self.capacity
            );
        }
        if first.0 == second.0 {
            self.increment_at(first.0, combined_delta(first.1, second.1));
            return;
        }
        let first_count = self.checked_count(first.0, first.1);
        let second_count = self.checked_count(second.0, second.1);
        self.apply(first.0, first_count);
        self.apply(second.0, second_count);
    }

    fn checked_count(&self, component: usize, delta: i64) -> u64 {
        checked_update("count", component, self.count_at(component), delta)
    }

    fn apply(&mut self, component: usize, updated: u64) {
        let position = match self.positions.get(&component) {
            Some(&pos) => pos,
            None => {
                if updated == 0 {
                    return;
                }
                self.entries.push(CountEntry {
                    component,
                    count: 0,
                });
                self.positions.insert(component, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let previous = self.entries[position].count;
        self.entries[position].count = updated;
        self.total = self.total - previous + updated;

        let position = if updated > previous {
            self.bubble_up(position)
        } else {
            self.bubble_down(position)
        };

        if updated == 0 {
            // Zero entries sink to the end of the table.
            debug_assert_eq!(position, self.entries.len() - 1);
            self.entries.pop();
            self.positions.remove(&component);
        }
    }

    fn bubble_up(&mut self, mut position: usize) -> usize {
        while position > 0 && self.entries[position - 1].count < self.entries[position].count {
            self.swap(position - 1, position);
            position -= 1;
        }
        position
    }

    fn bubble_down(&mut self, mut position: usize) -> usize {
        while position + 1 < self.entries.len()
            && self.entries[position + 1].count > self.entries[position].count
        {
            self.swap(position, position + 1);
            position += 1;
        }
        position
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.positions.insert(self.entries[a].component, a);
        self.positions.insert(self.entries[b].component, b);
    }

    /// Checks ordering, the position index and the cached total.
    pub fn is_consistent(&self) -> bool {
        let sorted = self.entries.windows(2).all(|w| w[0].count >= w[1].count);
        let indexed = self.positions.len() == self.entries.len()
            && self
                .entries
                .iter()
                .enumerate()
                .all(|(pos, entry)| self.positions.get(&entry.component) == Some(&pos));
        let positive = self.entries.iter().all(|entry| entry.count > 0);
        let summed = self.entries.iter().map(|entry| entry.count).sum::<u64>() == self.total;
        sorted && indexed && positive && summed
    }
}

/// Count tables for every value of a discrete variable plus per-component
/// totals across all values.
///
/// Dimensions are fixed at construction. `component_total(c)` always equals
/// the sum of `count_at(d, c)` over every `d`.
#[derive(Clone, Debug, PartialEq)]
pub struct MixtureCountStore {
    tables: Vec<SparseCountTable>,
    totals: Vec<u64>,
}

impl MixtureCountStore {
    pub fn new(discrete_size: usize, num_components: usize) -> Self {
        Self {
            tables: (0..discrete_size)
                .map(|_| SparseCountTable::new(num_components))
                .collect(),
            totals: vec![0; num_components],
        }
    }

    pub fn discrete_size(&self) -> usize {
        self.tables.len()
    }

    pub fn num_components(&self) -> usize {
        self.totals.len()
    }

    pub fn table(&self, discrete: usize) -> &SparseCountTable {
        &self.tables[discrete]
    }

    pub fn count_at(&self, discrete: usize, component: usize) -> u64 {
        self.tables[discrete].count_at(component)
    }

    pub fn component_total(&self, component: usize) -> u64 {
        self.totals[component]
    }

    pub fn component_totals(&self) -> &[u64] {
        &self.totals
    }

    /// Adds `delta` to `n(discrete, component)`.
    ///
    /// Panics if the component total or the count would become negative.
    pub fn increment(&mut self, discrete: usize, component: usize, delta: i64) {
        let total = self.checked_total(component, delta);
        self.tables[discrete].increment_at(component, delta);
        self.totals[component] = total;
        log::trace!(
            "counts[{}][{}] += {} (component total {})",
            discrete,
            component,
            delta,
            total
        );
    }

    /// Updates two components for the same discrete value as one operation,
    /// as when a sampler moves an item from one component to another.
    pub fn increment_at_positions(
        &mut self,
        discrete: usize,
        first: (usize, i64),
        second: (usize, i64),
    ) {
        let (first_total, second_total) = if first.0 == second.0 {
            let total = self.checked_total(first.0, combined_delta(first.1, second.1));
            (total, total)
        } else {
            (
                self.checked_total(first.0, first.1),
                self.checked_total(second.0, second.1),
            )
        };
        self.tables[discrete].increment_at_positions(first, second);
        self.totals[first.0] = first_total;
        self.totals[second.0] = second_total;
        log::trace!(
            "counts[{}]: [{}] += {}, [{}] += {}",
            discrete,
            first.0,
            first.1,
            second.0,
            second.1
        );
    }

    /// Records the mixture's current `(child, gate)` pair with weight `delta`.
    pub fn observe(&mut self, mixture: &MixtureFactor, values: &Assignment, delta: i64) {
        let discrete = values.value(mixture.child());
        let component = values.value(mixture.gate());
        self.increment(discrete, component, delta);
    }

    /// Sum of every table's total.
    pub fn counts_total(&self) -> u64 {
        self.tables.iter().map(|table| table.total()).sum()
    }

    /// Re-derives the component totals from the tables and compares.
    pub fn is_consistent(&self) -> bool {
        let derived_match = (0..self.totals.len()).all(|c| {
            self.tables.iter().map(|table| table.count_at(c)).sum::<u64>() == self.totals[c]
        });
        derived_match
            && self.tables.iter().all(|table| table.is_consistent())
            && self.counts_total() == self.totals.iter().sum::<u64>()
    }

    fn checked_total(&self, component: usize, delta: i64) -> u64 {
        checked_update("total", component, self.totals[component], delta)
    }
}

/// `current + delta`, panicking if the result overflows or is negative.
fn checked_update(what: &str, component: usize, current: u64, delta: i64) -> u64 {
    let updated = i64::try_from(current)
        .ok()
        .and_then(|current| current.checked_add(delta));
    let Some(updated) = updated else {
        panic!(
            "{} for component {} overflows ({} + {})",
            what, component, current, delta
        );
    };
    assert!(
        updated >= 0,
        "{} for component {} would become negative ({} + {})",
        what,
        component,
        current,
        delta
    );
    updated as u64
}

fn combined_delta(first: i64, second: i64) -> i64 {
    match first.checked_add(second) {
        Some(delta) => delta,
        None => panic!("combined delta overflows ({} + {})", first, second),
    }
}
