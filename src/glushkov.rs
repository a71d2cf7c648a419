//! Builds a [`Ca`] from a [`Re`] tree via a Glushkov/position
//! construction (spec §4.3).
//!
//! Grounded on `examples/original_source/src/glushkov2.cc`: the
//! `Fragment`/`FirstState` shape, the four `add_transition*` guard/op
//! decision tables, and `get_range_frag`'s reuse of a shared
//! [`RangeBuilder`] are all carried over close to verbatim. Two things
//! are authored fresh, since the original throws on them:
//! `^`/`$` handling (`strip_anchors`, spec's `WeirdAnchor` rule) and the
//! decision to key the range builder's cache by a per-call counter
//! instead of a regexp pointer (plain `Re` values have no stable
//! identity to cache on; see DESIGN.md).

use crate::ast::{Re, RuneRange};
use crate::ca::{Ca, CounterId, Guard, Operator, StateId};
use crate::error::{EngineError, Result};
use crate::range_builder::{RangeBuilder, RangeId, RANGE_SEQ_END};

#[derive(Clone, Copy, Debug)]
struct FirstState {
    state: StateId,
    lo: u8,
    hi: u8,
}

#[derive(Clone, Debug)]
struct Fragment {
    first: Vec<FirstState>,
    last: Vec<StateId>,
    nullable: bool,
}

impl Fragment {
    fn empty() -> Fragment {
        Fragment { first: Vec::new(), last: Vec::new(), nullable: true }
    }
}

/// Compiles `pattern` straight into a [`Ca`].
pub fn build(pattern: &str) -> Result<Ca> {
    let re = crate::ast::from_pattern(pattern)?;
    build_from_ast(&re)
}

/// Compiles an already-parsed [`Re`] into a [`Ca`]. Exposed separately
/// so tests (and `dot.rs` fixtures) can build from a hand-written AST
/// without going through the parser.
pub fn build_from_ast(re: &Re) -> Result<Ca> {
    let (clean, anchored_start, anchored_end) = strip_anchors(re)?;

    let mut builder = Builder::new();
    let frag = builder.compute_fragment(&clean, None)?;

    for first in &frag.first {
        builder.add_transition_init(first.state, first.lo, first.hi);
    }
    let counters = builder.ca.counters.clone();
    for &last in &frag.last {
        builder.ca.state_mut(last).set_final(&counters);
    }
    if frag.nullable {
        let start = builder.ca.start;
        builder.ca.state_mut(start).set_final(&counters);
    }

    let mut ca = builder.ca;
    ca.anchored_start = anchored_start;
    ca.anchored_end = anchored_end;
    Ok(ca)
}

/// Validates the `WeirdAnchor` rule and strips `BeginText`/`EndText`
/// nodes out of the tree, returning whether the whole pattern is
/// anchored at the start and/or the end.
///
/// `^`/`$` are legal only at the outermost edge of a concatenation.
/// `Alternate`, `Capture` and `Quest` are transparent to "outermost":
/// each branch of an alternation may anchor independently, but all
/// branches must agree (one anchored branch and one unanchored branch
/// can't be represented as a single automaton-wide anchor flag).
/// `Star`, `Plus` and `Repeat` are not transparent — an anchor inside a
/// repeated body would apply once per iteration, which has no
/// sensible meaning, so it is rejected outright.
fn strip_anchors(re: &Re) -> Result<(Re, bool, bool)> {
    walk(re, true, true)
}

fn walk(re: &Re, at_start: bool, at_end: bool) -> Result<(Re, bool, bool)> {
    match re {
        Re::BeginText => {
            if at_start {
                Ok((Re::Empty, true, false))
            } else {
                Err(EngineError::WeirdAnchor("^ is only legal at the start of the pattern".to_string()))
            }
        }
        Re::EndText => {
            if at_end {
                Ok((Re::Empty, false, true))
            } else {
                Err(EngineError::WeirdAnchor("$ is only legal at the end of the pattern".to_string()))
            }
        }
        Re::Concat(subs) => {
            let n = subs.len();
            let mut out = Vec::with_capacity(n);
            let mut begin = false;
            let mut end = false;
            for (i, sub) in subs.iter().enumerate() {
                let (new_sub, b, e) = walk(sub, at_start && i == 0, at_end && i == n - 1)?;
                begin |= b;
                end |= e;
                out.push(new_sub);
            }
            Ok((Re::Concat(out), begin, end))
        }
        Re::Alternate(subs) => {
            let mut out = Vec::with_capacity(subs.len());
            let mut begins = Vec::with_capacity(subs.len());
            let mut ends = Vec::with_capacity(subs.len());
            for sub in subs {
                let (new_sub, b, e) = walk(sub, at_start, at_end)?;
                out.push(new_sub);
                begins.push(b);
                ends.push(e);
            }
            if begins.iter().any(|&b| b) && !begins.iter().all(|&b| b) {
                return Err(EngineError::WeirdAnchor(
                    "^ must appear in every alternative or none".to_string(),
                ));
            }
            if ends.iter().any(|&e| e) && !ends.iter().all(|&e| e) {
                return Err(EngineError::WeirdAnchor(
                    "$ must appear in every alternative or none".to_string(),
                ));
            }
            let begin = begins.first().copied().unwrap_or(false);
            let end = ends.first().copied().unwrap_or(false);
            Ok((Re::Alternate(out), begin, end))
        }
        Re::Capture(sub) => {
            let (new_sub, b, e) = walk(sub, at_start, at_end)?;
            Ok((Re::Capture(Box::new(new_sub)), b, e))
        }
        Re::Quest(sub) => {
            let (new_sub, b, e) = walk(sub, at_start, at_end)?;
            Ok((Re::Quest(Box::new(new_sub)), b, e))
        }
        Re::Star(sub) => {
            let (new_sub, _, _) = walk(sub, false, false)?;
            Ok((Re::Star(Box::new(new_sub)), false, false))
        }
        Re::Plus(sub) => {
            let (new_sub, _, _) = walk(sub, false, false)?;
            Ok((Re::Plus(Box::new(new_sub)), false, false))
        }
        Re::Repeat(sub, min, max) => {
            let (new_sub, _, _) = walk(sub, false, false)?;
            Ok((Re::Repeat(Box::new(new_sub), *min, *max), false, false))
        }
        other => Ok((other.clone(), false, false)),
    }
}

struct Builder {
    ca: Ca,
    range_builder: RangeBuilder,
    range_key: u64,
}

impl Builder {
    fn new() -> Builder {
        Builder { ca: Ca::new(), range_builder: RangeBuilder::new(), range_key: 0 }
    }

    fn compute_fragment(&mut self, re: &Re, cnt: Option<CounterId>) -> Result<Fragment> {
        match re {
            Re::Empty => Ok(Fragment::empty()),
            Re::Literal(rune) => self.lit_frag(*rune, cnt),
            Re::LiteralString(runes) => self.lit_str_frag(runes, cnt),
            Re::CharClass(ranges) => Ok(self.char_class_frag(ranges, cnt)),
            Re::AnyChar => Ok(self.any_char_frag(cnt)),
            Re::AnyByte => Ok(self.any_byte_frag(cnt)),
            Re::Concat(subs) => self.concat_frag(subs, cnt),
            Re::Alternate(subs) => self.alter_frag(subs, cnt),
            Re::Star(sub) => self.star_frag(sub, cnt),
            Re::Plus(sub) => self.plus_frag(sub, cnt),
            Re::Quest(sub) => self.quest_frag(sub, cnt),
            Re::Repeat(sub, min, max) => self.repeat_frag(sub, *min, *max, cnt),
            Re::Capture(sub) => self.compute_fragment(sub, cnt),
            Re::BeginText | Re::EndText => Err(EngineError::InternalFailure(
                "anchor survived strip_anchors".to_string(),
            )),
        }
    }

    // -- the four guard/op decision tables (glushkov2.cc) --

    fn add_transition(&mut self, o_id: StateId, t_id: StateId, lo: u8, hi: u8) {
        let o_cnt = self.ca.state(o_id).cnt;
        let t_cnt = self.ca.state(t_id).cnt;
        let (guard, op) = match (o_cnt, t_cnt) {
            (None, None) => (Guard::True, Operator::Noop),
            (None, Some(_)) => (Guard::True, Operator::Rst),
            (Some(oc), None) => {
                if self.ca.counter(oc).min == 0 {
                    (Guard::True, Operator::Noop)
                } else {
                    (Guard::CanExit, Operator::Noop)
                }
            }
            (Some(oc), Some(tc)) if oc != tc => {
                if self.ca.counter(oc).min == 0 {
                    (Guard::True, Operator::Rst)
                } else {
                    (Guard::CanExit, Operator::Rst)
                }
            }
            (Some(_), Some(_)) => (Guard::True, Operator::Id),
        };
        self.push_transition(o_id, t_id, lo, hi, guard, op);
    }

    // Used for loop-back edges of a star that is not itself inside a
    // counter's scope: looping never has a "same counter" case to
    // preserve (any nested counter in the body must restart fresh each
    // outer iteration), so it always resets rather than ever using `Id`.
    fn add_transition_star(&mut self, o_id: StateId, t_id: StateId, lo: u8, hi: u8) {
        let o_cnt = self.ca.state(o_id).cnt;
        let t_cnt = self.ca.state(t_id).cnt;
        let (guard, op) = match (o_cnt, t_cnt) {
            (None, None) => (Guard::True, Operator::Noop),
            (None, Some(_)) => (Guard::True, Operator::Rst),
            (Some(oc), None) => {
                if self.ca.counter(oc).min == 0 {
                    (Guard::True, Operator::Noop)
                } else {
                    (Guard::CanExit, Operator::Noop)
                }
            }
            (Some(oc), Some(_)) => {
                if self.ca.counter(oc).min == 0 {
                    (Guard::True, Operator::Rst)
                } else {
                    (Guard::CanExit, Operator::Rst)
                }
            }
        };
        self.push_transition(o_id, t_id, lo, hi, guard, op);
    }

    // Loop-back edges inside a repeat's own body: the origin always owns
    // the counter being repeated.
    fn add_transition_repeat(&mut self, o_id: StateId, t_id: StateId, lo: u8, hi: u8) {
        let oc = self.ca.state(o_id).cnt.expect("repeat loop-back origin always owns a counter");
        let guard = if self.ca.counter(oc).max == -1 { Guard::True } else { Guard::CanIncr };
        self.push_transition(o_id, t_id, lo, hi, guard, Operator::Incr);
    }

    // Edges out of the automaton's global start state.
    fn add_transition_init(&mut self, t_id: StateId, lo: u8, hi: u8) {
        let (guard, op) = match self.ca.state(t_id).cnt {
            None => (Guard::True, Operator::Noop),
            Some(_) => (Guard::True, Operator::Rst),
        };
        let start = self.ca.start;
        self.push_transition(start, t_id, lo, hi, guard, op);
    }

    fn push_transition(&mut self, o_id: StateId, t_id: StateId, lo: u8, hi: u8, guard: Guard, op: Operator) {
        self.ca.state_mut(o_id).transitions.push(crate::ca::Transition { lo, hi, target: t_id, guard, op });
    }

    // -- fragment builders --

    fn byte_chain_frag(&mut self, bytes: &[u8], cnt: Option<CounterId>) -> Fragment {
        let mut frag = Fragment { first: Vec::new(), last: Vec::new(), nullable: false };
        let mut prev: Option<StateId> = None;
        let last_i = bytes.len() - 1;
        for (i, &b) in bytes.iter().enumerate() {
            let s = self.ca.add_state(cnt);
            if i == 0 {
                frag.first.push(FirstState { state: s, lo: b, hi: b });
            } else {
                self.add_transition(prev.unwrap(), s, b, b);
            }
            if i == last_i {
                frag.last.push(s);
            }
            prev = Some(s);
        }
        frag
    }

    fn lit_frag(&mut self, rune: u32, cnt: Option<CounterId>) -> Result<Fragment> {
        let ch = char::from_u32(rune)
            .ok_or_else(|| EngineError::InvalidUtf8(format!("U+{:06X}", rune)))?;
        let mut buf = [0u8; 4];
        let bytes = ch.encode_utf8(&mut buf).as_bytes().to_vec();
        Ok(self.byte_chain_frag(&bytes, cnt))
    }

    fn lit_str_frag(&mut self, runes: &[u32], cnt: Option<CounterId>) -> Result<Fragment> {
        let mut bytes = Vec::new();
        for &rune in runes {
            let ch = char::from_u32(rune)
                .ok_or_else(|| EngineError::InvalidUtf8(format!("U+{:06X}", rune)))?;
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
        Ok(self.byte_chain_frag(&bytes, cnt))
    }

    fn concat_frag(&mut self, subs: &[Re], cnt: Option<CounterId>) -> Result<Fragment> {
        let mut frag = Fragment { first: Vec::new(), last: Vec::new(), nullable: true };
        let mut start = true;
        for (i, sub) in subs.iter().enumerate() {
            let sub_frag = self.compute_fragment(sub, cnt)?;
            if i != 0 {
                for &prev in &frag.last {
                    for cur in &sub_frag.first {
                        self.add_transition(prev, cur.state, cur.lo, cur.hi);
                    }
                }
            }
            if start {
                frag.first.extend(sub_frag.first.iter().copied());
                if !sub_frag.nullable {
                    start = false;
                    frag.nullable = false;
                }
            }
            if sub_frag.nullable {
                frag.last.extend(sub_frag.last.iter().copied());
            } else {
                frag.last = sub_frag.last;
            }
        }
        Ok(frag)
    }

    fn alter_frag(&mut self, subs: &[Re], cnt: Option<CounterId>) -> Result<Fragment> {
        let mut frag = Fragment { first: Vec::new(), last: Vec::new(), nullable: false };
        for sub in subs {
            let sub_frag = self.compute_fragment(sub, cnt)?;
            frag.nullable |= sub_frag.nullable;
            frag.first.extend(sub_frag.first);
            frag.last.extend(sub_frag.last);
        }
        Ok(frag)
    }

    fn build_star_frag(&mut self, mut frag: Fragment, cnt: Option<CounterId>) -> Fragment {
        let firsts = frag.first.clone();
        if cnt.is_none() {
            for &prev in &frag.last {
                for cur in &firsts {
                    self.add_transition_star(prev, cur.state, cur.lo, cur.hi);
                }
            }
        } else {
            for &prev in &frag.last {
                for cur in &firsts {
                    self.add_transition(prev, cur.state, cur.lo, cur.hi);
                }
            }
        }
        frag.nullable = true;
        frag
    }

    fn star_frag(&mut self, sub: &Re, cnt: Option<CounterId>) -> Result<Fragment> {
        let frag = self.compute_fragment(sub, cnt)?;
        Ok(self.build_star_frag(frag, cnt))
    }

    fn plus_frag(&mut self, sub: &Re, cnt: Option<CounterId>) -> Result<Fragment> {
        let frag1 = self.compute_fragment(sub, cnt)?;
        if frag1.nullable {
            return Ok(self.build_star_frag(frag1, cnt));
        }
        let frag1_copy = self.compute_fragment(sub, cnt)?;
        let mut frag2 = self.build_star_frag(frag1_copy, cnt);
        for &f1_last in &frag1.last {
            for cur in &frag2.first.clone() {
                self.add_transition(f1_last, cur.state, cur.lo, cur.hi);
            }
        }
        frag2.last.extend(frag1.last.iter().copied());
        Ok(Fragment { first: frag1.first, last: frag2.last, nullable: false })
    }

    fn quest_frag(&mut self, sub: &Re, cnt: Option<CounterId>) -> Result<Fragment> {
        let mut frag = self.compute_fragment(sub, cnt)?;
        frag.nullable = true;
        Ok(frag)
    }

    fn any_byte_frag(&mut self, cnt: Option<CounterId>) -> Fragment {
        let s = self.ca.add_state(cnt);
        Fragment { first: vec![FirstState { state: s, lo: 0x00, hi: 0xFF }], last: vec![s], nullable: false }
    }

    fn any_char_frag(&mut self, cnt: Option<CounterId>) -> Fragment {
        self.range_key += 1;
        let key = self.range_key;
        self.range_builder.prepare(key);
        self.range_builder.add_rune_range(0, 0x10FFFF);
        self.get_range_frag(cnt)
    }

    fn char_class_frag(&mut self, ranges: &[RuneRange], cnt: Option<CounterId>) -> Fragment {
        self.range_key += 1;
        let key = self.range_key;
        self.range_builder.prepare(key);
        for r in ranges {
            self.range_builder.add_rune_range(r.lo, r.hi);
        }
        self.get_range_frag(cnt)
    }

    // Materializes the current range builder's trie into fresh CA
    // states. Node `0` of the trie is the shared terminal; `range_states`
    // uses the same "`0` means not yet allocated" sentinel the original
    // relies on, which only works because CA state `0` is the automaton's
    // global start state and therefore never produced by `add_state`.
    fn get_range_frag(&mut self, cnt: Option<CounterId>) -> Fragment {
        let ranges = self.range_builder.ranges().to_vec();
        let root = self.range_builder.root().to_vec();
        let mut range_states = vec![0 as StateId; ranges.len()];

        range_states[RANGE_SEQ_END as usize] = self.ca.add_state(cnt);
        let mut frag = Fragment { first: Vec::new(), last: vec![range_states[RANGE_SEQ_END as usize]], nullable: false };

        let mut stack: Vec<RangeId> = Vec::new();
        for &id in &root {
            let range = &ranges[id as usize];
            if range.hi < 0x80 {
                frag.first.push(FirstState { state: range_states[RANGE_SEQ_END as usize], lo: range.lo, hi: range.hi });
            } else {
                for &next in &range.next {
                    let mut s = range_states[next as usize];
                    if s == 0 {
                        s = self.ca.add_state(cnt);
                        range_states[next as usize] = s;
                        stack.push(next);
                    }
                    frag.first.push(FirstState { state: s, lo: range.lo, hi: range.hi });
                }
            }
        }

        while let Some(id) = stack.pop() {
            let range = ranges[id as usize].clone();
            for &next in &range.next {
                let mut s = range_states[next as usize];
                if s == 0 {
                    s = self.ca.add_state(cnt);
                    range_states[next as usize] = s;
                    stack.push(next);
                }
                self.add_transition(range_states[id as usize], s, range.lo, range.hi);
            }
        }

        frag
    }

    fn repeat_frag(&mut self, sub: &Re, min: i64, max: i64, cnt: Option<CounterId>) -> Result<Fragment> {
        if min == 0 && max == -1 {
            return self.star_frag(sub, cnt);
        }
        if cnt.is_some() {
            return Err(EngineError::NestedRepetition);
        }
        let new_cnt = self.ca.add_counter(min, max);
        let mut frag = self.compute_fragment(sub, Some(new_cnt))?;
        if frag.nullable {
            // a body that can match empty satisfies any minimum for free
            self.ca.counters[new_cnt as usize].min = 0;
        }
        let firsts = frag.first.clone();
        for &prev in &frag.last {
            for cur in &firsts {
                self.add_transition_repeat(prev, cur.state, cur.lo, cur.hi);
            }
        }
        if min == 0 {
            frag.nullable = true;
        }
        Ok(frag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca::Final;

    #[test]
    fn literal_builds_byte_chain() {
        let ca = build("ab").unwrap();
        // start -> 'a' -> 'b' (accepting)
        assert!(ca.state(ca.start).transitions.iter().any(|t| t.lo == b'a' && t.hi == b'a'));
    }

    #[test]
    fn star_is_nullable_from_start() {
        let ca = build("a*").unwrap();
        assert_eq!(ca.state(ca.start).is_final, Final::Always);
    }

    #[test]
    fn bounded_repeat_gets_a_counter() {
        let ca = build("a{2,4}").unwrap();
        assert_eq!(ca.counters.len(), 1);
        assert_eq!(ca.counters[0].min, 2);
        assert_eq!(ca.counters[0].max, 4);
    }

    #[test]
    fn unbounded_min_repeat_still_gets_a_counter() {
        let ca = build("a{2,}").unwrap();
        assert_eq!(ca.counters.len(), 1);
        assert_eq!(ca.counters[0].max, -1);
    }

    #[test]
    fn nested_repeat_is_rejected() {
        assert!(matches!(build("(a{2,3}){4,5}"), Err(EngineError::NestedRepetition)));
    }

    #[test]
    fn weird_anchor_in_the_middle_is_rejected() {
        assert!(matches!(build("a^b"), Err(EngineError::WeirdAnchor(_))));
    }

    #[test]
    fn anchor_inside_star_is_rejected() {
        assert!(matches!(build("(a^)*"), Err(EngineError::WeirdAnchor(_))));
    }

    #[test]
    fn anchored_pattern_sets_flags() {
        let ca = build("^abc$").unwrap();
        assert!(ca.anchored_start);
        assert!(ca.anchored_end);
    }

    #[test]
    fn inconsistent_alternation_anchoring_is_rejected() {
        assert!(matches!(build("^a|b"), Err(EngineError::WeirdAnchor(_))));
    }

    #[test]
    fn consistent_alternation_anchoring_is_accepted() {
        let ca = build("^a|^b").unwrap();
        assert!(ca.anchored_start);
    }
}
