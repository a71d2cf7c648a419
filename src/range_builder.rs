//! Converts sets of Unicode rune ranges into a shared trie of byte
//! ranges (spec §4.2), so that character classes and `.` can be turned
//! into CA states one byte at a time instead of one rune at a time.
//!
//! Grounded on `examples/original_source/re2/range_builder.hh`. That
//! header hand-rolls the UTF-8-length-boundary splitting and per-byte
//! clipping that the `utf8-ranges` crate already does (the teacher,
//! `markmerz-regex-dfa`, depends on it in `nfa.rs` for exactly this
//! purpose via `Utf8Sequences`); we reuse it for the splitting and keep
//! our own version of the cache/trie on top, which is the part of
//! `range_builder.hh` that actually matters for CA construction (shared
//! suffixes, idempotent `prepare`).
use std::collections::HashMap;

use utf8_ranges::Utf8Sequences;

/// Identifies a node in the trie. `0` is the shared terminal.
pub type RangeId = u32;

/// The terminal node: "no more bytes to consume, the rune range ends
/// here".
pub const RANGE_SEQ_END: RangeId = 0;

/// One byte-range edge, plus the set of nodes reachable after it.
///
/// Mirrors `re2::range_builder::RangeState`: `next` can hold more than
/// one entry when several different continuations share this same
/// `(lo, hi)` edge (this happens at the point where two originally
/// distinct rune ranges start encoding the same leading bytes).
#[derive(Clone, Debug)]
pub struct RangeState {
    pub lo: u8,
    pub hi: u8,
    pub next: Vec<RangeId>,
}

/// Builds (and caches) the byte-range trie for one character class or
/// `.`. A single `RangeBuilder` is reused across the whole CA build;
/// `prepare` resets it only when asked to build a genuinely different
/// set of ranges.
pub struct RangeBuilder {
    ranges: Vec<RangeState>,
    root: Vec<RangeId>,
    // keyed by (lo, hi, next) -> node id, mirrors the C++ cache key
    // `lo | hi << 8 | next << 16`.
    cache: HashMap<(u8, u8, RangeId), RangeId>,
    prepared_key: Option<u64>,
}

impl RangeBuilder {
    pub fn new() -> RangeBuilder {
        RangeBuilder {
            ranges: vec![RangeState { lo: 0, hi: 0, next: vec![] }],
            root: Vec::new(),
            cache: HashMap::new(),
            prepared_key: None,
        }
    }

    pub fn ranges(&self) -> &[RangeState] {
        &self.ranges
    }

    pub fn root(&self) -> &[RangeId] {
        &self.root
    }

    /// Returns `true` (and leaves the builder untouched) if the last
    /// `prepare` call used the same `key` — the caller should reuse the
    /// already-built trie. Otherwise resets the builder and returns
    /// `false`, so the caller knows to call `add_rune_range` again.
    pub fn prepare(&mut self, key: u64) -> bool {
        if self.prepared_key == Some(key) {
            return true;
        }
        self.ranges.truncate(1);
        self.root.clear();
        self.cache.clear();
        self.prepared_key = Some(key);
        false
    }

    /// Adds the UTF-8 encodings of every rune in `lo..=hi` to the trie.
    pub fn add_rune_range(&mut self, lo: u32, hi: u32) {
        if lo > hi {
            return;
        }
        let lo_c = char::from_u32(lo).expect("rune range endpoints are valid scalar values");
        let hi_c = char::from_u32(hi).expect("rune range endpoints are valid scalar values");
        for seq in Utf8Sequences::new(lo_c, hi_c) {
            let bytes = seq.as_slice();
            let mut id = RANGE_SEQ_END;
            for r in bytes[1..].iter().rev() {
                id = self.cache_range(r.start, r.end, id);
            }
            let root_id = self.no_cache_range(bytes[0].start, bytes[0].end, id);
            self.add_to_root(root_id);
        }
    }

    fn no_cache_range(&mut self, lo: u8, hi: u8, next: RangeId) -> RangeId {
        self.ranges.push(RangeState { lo, hi, next: vec![next] });
        (self.ranges.len() - 1) as RangeId
    }

    fn cache_range(&mut self, lo: u8, hi: u8, next: RangeId) -> RangeId {
        let key = (lo, hi, next);
        if let Some(&id) = self.cache.get(&key) {
            return id;
        }
        let id = self.no_cache_range(lo, hi, next);
        self.cache.insert(key, id);
        id
    }

    fn ranges_eq(&self, a: RangeId, b: RangeId) -> bool {
        self.ranges[a as usize].lo == self.ranges[b as usize].lo
            && self.ranges[a as usize].hi == self.ranges[b as usize].hi
    }

    // Grafts `id`'s continuation onto `root`'s `next` list, merging
    // equal-suffix siblings instead of duplicating them.
    fn add_range_to_node(&mut self, root: RangeId, id: RangeId) {
        if id == RANGE_SEQ_END {
            if !self.ranges[root as usize].next.contains(&RANGE_SEQ_END) {
                self.ranges[root as usize].next.push(RANGE_SEQ_END);
            }
            return;
        }
        if let Some(&last) = self.ranges[root as usize].next.last() {
            if last != RANGE_SEQ_END && self.ranges_eq(last, id) {
                let next_of_id = self.ranges[id as usize].next[0];
                self.add_range_to_node(last, next_of_id);
                return;
            }
        }
        self.ranges[root as usize].next.push(id);
    }

    fn add_to_root(&mut self, id: RangeId) {
        if self.root.is_empty() {
            self.root.push(id);
            return;
        }
        let root = *self.root.last().unwrap();
        if self.ranges_eq(root, id) {
            let next = self.ranges[id as usize].next[0];
            self.ranges.pop(); // `id` was the node we just pushed
            self.add_range_to_node(root, next);
        } else {
            self.root.push(id);
        }
    }
}

impl Default for RangeBuilder {
    fn default() -> RangeBuilder {
        RangeBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_leaves(rb: &RangeBuilder) -> Vec<Vec<(u8, u8)>> {
        // depth-first enumeration of every root-to-leaf byte chain
        let mut out = Vec::new();
        for &r in rb.root() {
            walk(rb, r, &mut Vec::new(), &mut out);
        }
        out
    }

    fn walk(rb: &RangeBuilder, id: RangeId, path: &mut Vec<(u8, u8)>, out: &mut Vec<Vec<(u8, u8)>>) {
        let node = &rb.ranges()[id as usize];
        path.push((node.lo, node.hi));
        if node.next.contains(&RANGE_SEQ_END) {
            out.push(path.clone());
        }
        for &next in &node.next {
            if next != RANGE_SEQ_END {
                walk(rb, next, path, out);
            }
        }
        path.pop();
    }

    #[test]
    fn ascii_range_is_single_byte_chain() {
        let mut rb = RangeBuilder::new();
        rb.add_rune_range('a' as u32, 'z' as u32);
        let leaves = collect_leaves(&rb);
        assert_eq!(leaves, vec![vec![(b'a', b'z')]]);
    }

    #[test]
    fn two_byte_rune_produces_two_byte_chain() {
        let mut rb = RangeBuilder::new();
        // U+00E9 'é' encodes as 0xC3 0xA9
        rb.add_rune_range(0xE9, 0xE9);
        let leaves = collect_leaves(&rb);
        assert_eq!(leaves, vec![vec![(0xC3, 0xC3), (0xA9, 0xA9)]]);
    }

    #[test]
    fn prepare_is_idempotent_for_same_key() {
        let mut rb = RangeBuilder::new();
        assert!(!rb.prepare(42));
        rb.add_rune_range('a' as u32, 'z' as u32);
        let before = collect_leaves(&rb);
        assert!(rb.prepare(42));
        let after = collect_leaves(&rb);
        assert_eq!(before, after);
    }

    #[test]
    fn prepare_resets_for_new_key() {
        let mut rb = RangeBuilder::new();
        rb.prepare(1);
        rb.add_rune_range('a' as u32, 'z' as u32);
        assert!(!rb.prepare(2));
        assert!(rb.root().is_empty());
    }
}
