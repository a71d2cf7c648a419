//! A counting set: the compact representation a CSA configuration uses
//! in place of one counter value per currently-live repetition (spec
//! §3.3, §5.1).
//!
//! Grounded on `examples/original_source/src/csa.hh` /
//! `examples/original_source/csa.cc`'s `CountingSet`. A set stores an
//! `offset` plus a list of raw encodings; a member's displayed value is
//! always `offset - raw`, so advancing every member by one step (one
//! consumed byte) is a single `offset += 1` instead of a per-member
//! update. The list is kept sorted by *displayed* value ascending
//! (`front()` is the smallest, matching `min() = offset - list.front()`
//! / `max() = offset - list.back()` exactly as the header defines them).
//!
//! `merge` here is a plain ascending sorted-list union with
//! deduplication, rather than a line-for-line port of `csa.cc`'s
//! version: that routine's two-pointer loop never advances its `other`
//! iterator in the "insert" branch, which is a bug, not a documented
//! edge case (see DESIGN.md).

use std::collections::VecDeque;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountingSet {
    // sorted ascending by displayed value (offset - raw); front is
    // smallest.
    list: VecDeque<u64>,
    offset: u64,
}

impl CountingSet {
    /// The empty set — no live counts at all.
    pub fn empty() -> CountingSet {
        CountingSet { list: VecDeque::new(), offset: 1 }
    }

    /// A set holding exactly the value `1`, the state of a counter that
    /// was just reset on entering a fresh repetition.
    pub fn fresh() -> CountingSet {
        CountingSet { list: VecDeque::from([0]), offset: 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// The smallest value currently live.
    pub fn min(&self) -> u64 {
        self.offset - self.list.front().copied().expect("min on an empty counting set")
    }

    /// The largest value currently live.
    pub fn max(&self) -> u64 {
        self.offset - self.list.back().copied().expect("max on an empty counting set")
    }

    /// Every live value, ascending.
    pub fn to_vec(&self) -> Vec<u64> {
        self.list.iter().map(|&raw| self.offset - raw).collect()
    }

    /// Resets the set to hold exactly `{1}` — the origin state of a
    /// brand new iteration.
    pub fn rst_to_1(&mut self) {
        self.offset = 1;
        self.list.clear();
        self.list.push_back(0);
    }

    /// Adds the value `1` to the set, unless it is already the
    /// smallest member.
    pub fn insert_1(&mut self) {
        let val = self.offset - 1;
        match self.list.front() {
            Some(&front) if front == val => {}
            _ => self.list.push_front(val),
        }
    }

    /// Advances every value in the set by one (one byte consumed). Any
    /// value that would now exceed `max` is dropped — `max == -1` means
    /// unbounded, nothing is ever dropped.
    pub fn increment(&mut self, max: i64) {
        debug_assert!(!self.list.is_empty(), "increment on an empty counting set");
        self.offset += 1;
        if max != -1 {
            while let Some(&back) = self.list.back() {
                if (self.offset - back) as i64 > max {
                    self.list.pop_back();
                } else {
                    break;
                }
            }
        }
    }

    /// Splits the set into the subset admitted by `keep` and the rest,
    /// both still sharing this set's `offset` and preserving order.
    pub fn split<F: Fn(u64) -> bool>(&self, keep: F) -> (CountingSet, CountingSet) {
        let mut yes = VecDeque::new();
        let mut no = VecDeque::new();
        for &raw in &self.list {
            if keep(self.offset - raw) {
                yes.push_back(raw);
            } else {
                no.push_back(raw);
            }
        }
        (CountingSet { list: yes, offset: self.offset }, CountingSet { list: no, offset: self.offset })
    }

    /// Merges `other`'s live values into `self`, keeping the result
    /// sorted ascending and deduplicated by displayed value.
    pub fn merge(&mut self, other: CountingSet) {
        if other.list.is_empty() {
            return;
        }
        if self.list.is_empty() {
            *self = other;
            return;
        }
        let target = self.offset.max(other.offset);
        let a: Vec<u64> = self.list.iter().map(|&raw| self.offset - raw).collect();
        let b: Vec<u64> = other.list.iter().map(|&raw| other.offset - raw).collect();
        let mut merged = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() || j < b.len() {
            match (a.get(i), b.get(j)) {
                (Some(&x), Some(&y)) if x < y => {
                    merged.push(x);
                    i += 1;
                }
                (Some(&x), Some(&y)) if x > y => {
                    merged.push(y);
                    j += 1;
                }
                (Some(&x), Some(_)) => {
                    merged.push(x);
                    i += 1;
                    j += 1;
                }
                (Some(&x), None) => {
                    merged.push(x);
                    i += 1;
                }
                (None, Some(&y)) => {
                    merged.push(y);
                    j += 1;
                }
                (None, None) => unreachable!(),
            }
        }
        self.offset = target;
        self.list = merged.into_iter().map(|disp| target - disp).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_set_has_value_one() {
        let s = CountingSet::fresh();
        assert_eq!(s.to_vec(), vec![1]);
        assert_eq!(s.min(), 1);
        assert_eq!(s.max(), 1);
    }

    #[test]
    fn increment_advances_every_member() {
        let mut s = CountingSet::fresh();
        s.merge(CountingSet::fresh());
        s.increment(-1);
        s.increment(-1);
        assert_eq!(s.to_vec(), vec![3]);
    }

    #[test]
    fn increment_evicts_members_past_max() {
        let mut s = CountingSet::fresh();
        let mut other = CountingSet::fresh();
        other.insert_1();
        s.merge(other);
        // two distinct starts would require different offsets in practice;
        // exercise the cap directly instead.
        let mut capped = CountingSet::fresh();
        capped.increment(1); // 1 -> 2, exceeds max=1, evicted
        assert!(capped.is_empty());
    }

    #[test]
    fn merge_dedups_equal_values() {
        let mut a = CountingSet::fresh();
        let b = CountingSet::fresh();
        a.merge(b);
        assert_eq!(a.to_vec(), vec![1]);
    }

    #[test]
    fn merge_is_ascending_and_distinct() {
        let mut a = CountingSet::fresh();
        a.increment(-1); // {2}
        let b = CountingSet::fresh(); // {1}
        a.merge(b);
        assert_eq!(a.to_vec(), vec![1, 2]);
    }

    #[test]
    fn split_preserves_order() {
        let mut a = CountingSet::fresh(); // {1}
        a.increment(-1); // {2}
        let mut b = CountingSet::fresh(); // {1}
        b.merge(a);
        // b now holds {1, 2}
        let (yes, no) = b.split(|v| v >= 2);
        assert_eq!(yes.to_vec(), vec![2]);
        assert_eq!(no.to_vec(), vec![1]);
    }
}
