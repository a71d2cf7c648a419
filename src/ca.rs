//! The Counting Automaton: a Glushkov/position automaton in which a
//! state may carry at most one counter (spec §3.2).
//!
//! Grounded on `examples/original_source/src/ca.hh`. Transitions carry
//! an explicit byte range (`lo..=hi`) rather than a byte class —
//! exactly how `examples/original_source/src/glushkov2.hh` packs its
//! `Symbol` (`lo << 8 | hi`). Byte-class reduction (spec §4.1) is a
//! separate, derived view computed on demand by [`Ca::compute_bytemap`]
//! once every transition in the automaton is known, the same way the
//! teacher's `nfa.rs` builds its char map only after the whole NFA
//! exists.

use crate::bytemap::{ByteMap, ByteMapBuilder};

pub type StateId = u32;
pub type CounterId = u32;

/// A counter's bounds. `min` may be `0`; `max == -1` means unbounded —
/// `{3,}` still gets a counter (it must count past the mandatory three
/// repetitions), it simply never blocks an increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Counter {
    pub min: i64,
    pub max: i64,
}

impl Counter {
    pub fn new(min: i64, max: i64) -> Counter {
        debug_assert!(min >= 0 && (max == -1 || max >= min));
        Counter { min, max }
    }

    pub fn can_incr(&self, value: i64) -> bool {
        self.max == -1 || value < self.max
    }

    pub fn can_exit(&self, value: i64) -> bool {
        value >= self.min
    }
}

/// The guard a transition carries, evaluated against the current value
/// of the source state's counter (if it has one).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    /// Always fires.
    True,
    /// Fires only if the source state's counter can still be
    /// incremented.
    CanIncr,
    /// Fires only if the source state's counter has reached its
    /// minimum.
    CanExit,
}

/// What a transition does to a counter as it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    /// Increment the source state's counter.
    Incr,
    /// Reset the target state's counter to `1` (entering a fresh
    /// iteration of some repetition).
    Rst,
    /// Leave the counter alone — source and target share the same live
    /// counter.
    Id,
    /// There is no counter in play at all.
    Noop,
}

/// One outgoing edge: on any byte in `lo..=hi`, move to `target`,
/// subject to `guard`, applying `op` along the way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub lo: u8,
    pub hi: u8,
    pub target: StateId,
    pub guard: Guard,
    pub op: Operator,
}

/// Whether (and how) a state accepts.
///
/// Mirrors `StateT::set_final` in `ca.hh`: a state with a counter whose
/// `min` is `0` accepts unconditionally, same as a state with no
/// counter at all — the `CanExit` check would always pass, so it is
/// skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Final {
    No,
    Always,
    IfCanExit,
}

#[derive(Clone, Debug)]
pub struct State {
    pub transitions: Vec<Transition>,
    /// The counter this state owns, if any. At most one per state.
    pub cnt: Option<CounterId>,
    pub is_final: Final,
}

impl State {
    pub fn new(cnt: Option<CounterId>) -> State {
        State { transitions: Vec::new(), cnt, is_final: Final::No }
    }

    /// Marks this state final, applying the `ca.hh` simplification:
    /// `CanExit` is only recorded when it can actually reject.
    pub fn set_final(&mut self, counters: &[Counter]) {
        self.is_final = match self.cnt {
            Some(c) if counters[c as usize].min != 0 => Final::IfCanExit,
            _ => Final::Always,
        };
    }
}

/// A complete counting automaton for one pattern.
pub struct Ca {
    pub states: Vec<State>,
    pub counters: Vec<Counter>,
    pub start: StateId,
    /// The pattern opened with `^`: a match may only start at the
    /// beginning of the input.
    pub anchored_start: bool,
    /// The pattern closed with `$`: a match may only end at the end of
    /// the input.
    pub anchored_end: bool,
}

impl Ca {
    pub fn new() -> Ca {
        Ca {
            states: vec![State::new(None)],
            counters: Vec::new(),
            start: 0,
            anchored_start: false,
            anchored_end: false,
        }
    }

    pub fn add_state(&mut self, cnt: Option<CounterId>) -> StateId {
        self.states.push(State::new(cnt));
        (self.states.len() - 1) as StateId
    }

    pub fn add_counter(&mut self, min: i64, max: i64) -> CounterId {
        self.counters.push(Counter::new(min, max));
        (self.counters.len() - 1) as CounterId
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id as usize]
    }

    pub fn state_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id as usize]
    }

    pub fn counter(&self, id: CounterId) -> &Counter {
        &self.counters[id as usize]
    }

    /// Builds the byte-class partition this automaton actually needs:
    /// every transition's `lo..=hi` boundary becomes a cut point, so two
    /// bytes end up in the same class exactly when no transition in the
    /// whole automaton tells them apart.
    pub fn compute_bytemap(&self) -> ByteMap {
        let mut builder = ByteMapBuilder::new();
        for state in &self.states {
            for t in &state.transitions {
                builder.cut(t.lo, t.hi);
            }
        }
        builder.build()
    }
}

impl Default for Ca {
    fn default() -> Ca {
        Ca::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_rule_skips_can_exit_when_min_is_zero() {
        let mut ca = Ca::new();
        let cnt = ca.add_counter(0, 3);
        let s = ca.add_state(Some(cnt));
        let counters = ca.counters.clone();
        ca.state_mut(s).set_final(&counters);
        assert_eq!(ca.state(s).is_final, Final::Always);
    }

    #[test]
    fn final_rule_uses_can_exit_when_min_nonzero() {
        let mut ca = Ca::new();
        let cnt = ca.add_counter(2, 3);
        let s = ca.add_state(Some(cnt));
        let counters = ca.counters.clone();
        ca.state_mut(s).set_final(&counters);
        assert_eq!(ca.state(s).is_final, Final::IfCanExit);
    }

    #[test]
    fn counter_bounds() {
        let c = Counter::new(2, 4);
        assert!(!c.can_exit(1));
        assert!(c.can_exit(2));
        assert!(c.can_incr(3));
        assert!(!c.can_incr(4));
    }

    #[test]
    fn unbounded_counter_can_always_incr() {
        let c = Counter::new(3, -1);
        assert!(c.can_incr(1_000_000));
    }

    #[test]
    fn bytemap_collapses_untouched_bytes() {
        let mut ca = Ca::new();
        let s = ca.add_state(None);
        ca.state_mut(ca.start).transitions.push(Transition {
            lo: b'a',
            hi: b'z',
            target: s,
            guard: Guard::True,
            op: Operator::Noop,
        });
        let bm = ca.compute_bytemap();
        assert_eq!(bm.class_of(b'0'), bm.class_of(b'1'));
        assert_ne!(bm.class_of(b'a'), bm.class_of(b'0'));
    }
}
