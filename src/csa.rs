//! The Counting Set Automaton: a lazily-determinized view over a
//! [`Ca`], where a whole set of live counter values is tracked as one
//! [`CountingSet`] instead of one determinized state per value (spec
//! §3.3-§3.5, §4.5-§4.6, §5).
//!
//! Grounded on `examples/original_source/csa.cc` (`GuardedTransBuilder`,
//! `Update`, `Config::step`). A [`CsaState`] — which CA states are live
//! with no counter (`normal`) and which are live owning a counter
//! (`counter`) — is interned once in a [`CsaStateCache`] and referenced
//! everywhere after by its stable index; the actual live values never
//! live inside the state itself. A [`Config`] is that index plus a
//! `Vec<CountingSet>` indexed by *slot*, one slot per entry of its
//! state's `counter` list. Stepping one byte class looks up (or
//! compiles, on first visit) an [`Update`] describing how to build the
//! next slot vector from the old one — a small program of [`Instr`]s —
//! so a configuration that recurs (the common case: the live positions
//! repeat far more often than the live counter values do) pays a table
//! lookup instead of re-deriving which CA transitions fire.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::bytemap::ByteMap;
use crate::ca::{Ca, Final, Guard, Operator, StateId};
use crate::counting_set::CountingSet;
use crate::error::{EngineError, Result as EngineResult};

/// A `CsaState` identifier, stable for the lifetime of the
/// [`CsaStateCache`] that produced it.
pub type CsaStateId = usize;

/// The *shape* of a configuration: which CA states are live with no
/// counter in play, and which are live owning a counter's current set
/// of values (spec §3.4). Two configurations that agree here behave
/// identically for every future byte regardless of what values their
/// counters actually hold, which is exactly what makes interning one
/// worthwhile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CsaState {
    pub normal: Vec<StateId>,
    pub counter: Vec<StateId>,
}

/// An address-stable cache of every distinct [`CsaState`] discovered so
/// far. Interning returns the same id for the same shape every time, so
/// a compiled [`Update`] can refer to its `next` state by that id
/// instead of re-deriving it.
#[derive(Debug, Default)]
pub struct CsaStateCache {
    states: Vec<CsaState>,
    index: HashMap<CsaState, CsaStateId>,
}

impl CsaStateCache {
    pub fn new() -> CsaStateCache {
        CsaStateCache { states: Vec::new(), index: HashMap::new() }
    }

    pub fn intern(&mut self, state: CsaState) -> CsaStateId {
        if let Some(&id) = self.index.get(&state) {
            return id;
        }
        let id = self.states.len();
        self.index.insert(state.clone(), id);
        self.states.push(state);
        id
    }

    pub fn get(&self, id: CsaStateId) -> &CsaState {
        &self.states[id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }
}

/// A runtime configuration: a cached [`CsaState`] plus the live
/// counting set for each of its slots. `slots[i]` is the live set for
/// `state.counter[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub state: CsaStateId,
    pub slots: Vec<CountingSet>,
}

/// Where an [`Instr`] reads its input counting set from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    /// The whole live set currently in old slot `0` (unconditional —
    /// the transition that reads it has guard `True`).
    Slot(usize),
    /// The subset admitted by guard site `0` of the transition being
    /// executed, evaluated fresh against the live configuration every
    /// step since which values pass `CanIncr`/`CanExit` is exactly the
    /// information no shape-level cache can precompute.
    Guard(usize),
}

/// One step of a compiled update program (spec §3.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Instr {
    /// Copy a live set into new slot `to`, unchanged — an `Id`
    /// transition, or a slot surviving a renumbering.
    Move { from: Source, to: usize },
    /// Copy a live set into new slot `to`, advancing every member by
    /// one and evicting anything past `max` — an `Incr` transition.
    Incr { from: Source, to: usize, max: i64 },
    /// Add the value `1` to whatever is already merged into new slot
    /// `to` — used when a fresh iteration starts into a slot some other
    /// instruction is also writing to, so the reset can't simply
    /// discard what's there.
    Insert1 { to: usize },
    /// Reset new slot `to` to hold exactly `{1}` — a `Rst` transition
    /// that is the *only* contributor to that slot this step.
    RstTo1 { to: usize },
}

/// The compiled result of stepping one [`CsaState`] on one byte class
/// (spec §3.5, §4.5).
#[derive(Clone, Debug, PartialEq, Eq)]
enum Update {
    /// The class leads nowhere; the configuration dies.
    Out,
    /// The class leads to a state with no counter slots at all — pure
    /// normal-state stepping, nothing to execute.
    Noop { next: CsaStateId },
    /// The target state's slot layout is unchanged from the source's —
    /// the program only ever mutates slots in place.
    KeepSets { next: CsaStateId, program: Vec<Instr> },
    /// The target state's slot layout differs from the source's, so
    /// the program moves live sets into their new positions before
    /// mutating them.
    NewSets { next: CsaStateId, program: Vec<Instr> },
}

/// Which of the five transition shapes spec §4.5 names a compiled
/// [`Update`] belongs to. `Small`/`Lazy` carry more than one `Update` —
/// one per combination of which guard sites turned out non-vacuous —
/// because unlike the source/target *shape*, whether a given guard
/// actually admits anything is a property of the live values, never the
/// configuration's static position set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    /// Source has no counter-owning positions at all.
    WithoutCntState,
    /// Source has no counter-owning positions, but the target does —
    /// this is the step that allocates a fresh counting set.
    EnteringCntState,
    /// Source has counter-owning positions, but every transition this
    /// class fires has guard `True` (the owning counter's `min` is `0`,
    /// or it is `max == -1` and unconditional) — no runtime guard
    /// evaluation is needed even though counters are in play.
    NoCondition,
    /// At most two guard sites are in play; all `2^g` combinations are
    /// compiled up front.
    Small,
    /// More than two guard sites are in play; combinations are compiled
    /// lazily, the first time each is actually observed.
    Lazy,
}

/// One compiled transition, cached per `(CsaState, byte class)`.
#[derive(Debug)]
enum Trans {
    Static { shape: Shape, update: Update },
    Small { sites: Vec<GuardSite>, table: Vec<Update> },
    Lazy { contribs: Vec<Contrib>, sites: Vec<GuardSite>, cache: HashMap<u32, Update> },
}

/// A runtime guard evaluation site: slot `slot`'s live set, split by
/// `guard`. Each site contributes one bit to a transition's bitmask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GuardSite {
    slot: usize,
    guard: Guard,
}

/// One CA transition's contribution to a compiled [`Update`], before
/// any particular guard-bitmask has narrowed which of them actually
/// fire.
#[derive(Clone, Copy, Debug)]
struct Contrib {
    target: StateId,
    op: Operator,
    /// `None` for an unconditional (guard `True`) contribution; `Some`
    /// for one gated on guard site index (bit position in the mask).
    guard_site: Option<usize>,
    source: Source,
}

/// Drives a [`Ca`] byte by byte via the compiled-transition cache
/// described above. Construction-time state (the [`CsaStateCache`] and
/// the per-class transition cache) lives here so repeated visits to the
/// same configuration reuse what was already compiled.
pub struct CsaEngine<'a> {
    ca: &'a Ca,
    bytemap: ByteMap,
    pub states: CsaStateCache,
    trans: HashMap<(CsaStateId, u8), Trans>,
}

impl<'a> CsaEngine<'a> {
    pub fn new(ca: &'a Ca) -> CsaEngine<'a> {
        CsaEngine { ca, bytemap: ca.compute_bytemap(), states: CsaStateCache::new(), trans: HashMap::new() }
    }

    /// The configuration before any input is consumed.
    pub fn initial(&mut self) -> Config {
        let state = self.states.intern(CsaState { normal: vec![self.ca.start], counter: Vec::new() });
        Config { state, slots: Vec::new() }
    }

    pub fn num_classes(&self) -> usize {
        self.bytemap.num_classes()
    }

    pub fn representative_byte(&self, class: u8) -> Option<u8> {
        self.bytemap.representative_byte(class)
    }

    pub fn is_accepting(&self, cfg: &Config) -> bool {
        is_accepting(self.ca, &self.states, cfg)
    }

    /// Consumes one byte, producing the next configuration, or `None`
    /// if no live thread survives.
    pub fn step(&mut self, cfg: &Config, byte: u8) -> EngineResult<Option<Config>> {
        let class = self.bytemap.class_of(byte);
        let key = (cfg.state, class);
        if !self.trans.contains_key(&key) {
            let compiled = compile(self.ca, &self.bytemap, &mut self.states, cfg.state, class)?;
            self.trans.insert(key, compiled);
        }
        match self.trans.get_mut(&key).expect("just compiled and inserted") {
            Trans::Static { update, .. } => execute(&self.states, update, cfg, &[]),
            Trans::Small { sites, table } => {
                let (admitted, mask) = evaluate_sites(self.ca, &self.states, cfg, sites);
                let update = table.get(mask as usize).ok_or_else(|| {
                    EngineError::InternalFailure(format!("small transition table missing mask {mask}"))
                })?;
                execute(&self.states, update, cfg, &admitted)
            }
            Trans::Lazy { contribs, sites, cache } => {
                let (admitted, mask) = evaluate_sites(self.ca, &self.states, cfg, sites);
                if !cache.contains_key(&mask) {
                    let cur_counter = self.states.get(cfg.state).counter.clone();
                    let update = build_update(self.ca, &mut self.states, &cur_counter, contribs, mask)?;
                    cache.insert(mask, update);
                }
                let update = cache.get(&mask).expect("just inserted");
                execute(&self.states, update, cfg, &admitted)
            }
        }
    }
}

/// Whether `cfg` accepts the input consumed so far.
pub fn is_accepting(ca: &Ca, states: &CsaStateCache, cfg: &Config) -> bool {
    let state = states.get(cfg.state);
    for &s in &state.normal {
        if ca.state(s).is_final == Final::Always {
            return true;
        }
    }
    for (slot, &owner) in state.counter.iter().enumerate() {
        match ca.state(owner).is_final {
            Final::Always => return true,
            Final::IfCanExit => {
                let counter = ca.counter(ca.state(owner).cnt.expect("counter state without a counter"));
                if cfg.slots[slot].max() as i64 >= counter.min {
                    return true;
                }
            }
            Final::No => {}
        }
    }
    false
}

/// Collects every CA transition that fires on `byte` from a
/// configuration's live positions, splitting them into unconditional
/// contributions and guard-gated ones (spec §4.5's lvalue table). Also
/// enforces the one builder invariant a well-formed `Ca` can never
/// violate: a single step can't need to both carry a value through
/// unchanged (`Id`) and increment it (`Incr`) into the very same target
/// state, since that would leave its slot ambiguous.
fn gather_contribs(
    ca: &Ca,
    normal: &[StateId],
    counter: &[StateId],
    byte: u8,
) -> EngineResult<(Vec<Contrib>, Vec<GuardSite>)> {
    let mut contribs = Vec::new();
    let mut sites: Vec<GuardSite> = Vec::new();

    for &s in normal {
        for t in &ca.state(s).transitions {
            if byte < t.lo || byte > t.hi {
                continue;
            }
            contribs.push(Contrib { target: t.target, op: t.op, guard_site: None, source: Source::Slot(0) });
        }
    }

    for (slot, &s) in counter.iter().enumerate() {
        for t in &ca.state(s).transitions {
            if byte < t.lo || byte > t.hi {
                continue;
            }
            match t.guard {
                Guard::True => {
                    contribs.push(Contrib {
                        target: t.target,
                        op: t.op,
                        guard_site: None,
                        source: Source::Slot(slot),
                    });
                }
                guard => {
                    let site_idx = match sites.iter().position(|g| g.slot == slot && g.guard == guard) {
                        Some(i) => i,
                        None => {
                            sites.push(GuardSite { slot, guard });
                            sites.len() - 1
                        }
                    };
                    contribs.push(Contrib {
                        target: t.target,
                        op: t.op,
                        guard_site: Some(site_idx),
                        source: Source::Guard(site_idx),
                    });
                }
            }
        }
    }

    let mut id_targets = BTreeSet::new();
    let mut incr_targets = BTreeSet::new();
    for c in &contribs {
        match c.op {
            Operator::Id => {
                id_targets.insert(c.target);
            }
            Operator::Incr => {
                incr_targets.insert(c.target);
            }
            Operator::Noop | Operator::Rst => {}
        }
    }
    if let Some(&conflict) = id_targets.intersection(&incr_targets).next() {
        return Err(EngineError::DoubleIncr(format!(
            "state {conflict} is reachable via both an unchanged (Id) and an incremented (Incr) path in the same step"
        )));
    }

    Ok((contribs, sites))
}

/// Builds the [`Update`] for one guard-satisfaction bitmask: which
/// contributions survive (unconditional ones always do; guarded ones
/// only when their bit is set), what the resulting [`CsaState`] is, and
/// the program that gets there from `cur_counter`'s slot layout.
fn build_update(
    ca: &Ca,
    states: &mut CsaStateCache,
    cur_counter: &[StateId],
    contribs: &[Contrib],
    mask: u32,
) -> EngineResult<Update> {
    let included = |c: &&Contrib| c.guard_site.map_or(true, |g| (mask >> g) & 1 == 1);

    let mut next_normal = BTreeSet::new();
    let mut next_counter = BTreeSet::new();
    for c in contribs.iter().filter(included) {
        match c.op {
            Operator::Noop => {
                next_normal.insert(c.target);
            }
            Operator::Rst | Operator::Id | Operator::Incr => {
                next_counter.insert(c.target);
            }
        }
    }

    if next_normal.is_empty() && next_counter.is_empty() {
        return Ok(Update::Out);
    }
    if next_counter.is_empty() {
        let next = states.intern(CsaState { normal: next_normal.into_iter().collect(), counter: Vec::new() });
        return Ok(Update::Noop { next });
    }

    let next_counter_vec: Vec<StateId> = next_counter.into_iter().collect();
    let slot_of = |target: StateId| {
        next_counter_vec
            .iter()
            .position(|&s| s == target)
            .expect("target was just inserted into next_counter")
    };

    let mut has_other_writer: BTreeSet<StateId> = BTreeSet::new();
    for c in contribs.iter().filter(included) {
        if matches!(c.op, Operator::Id | Operator::Incr) {
            has_other_writer.insert(c.target);
        }
    }

    let mut program = Vec::new();
    for c in contribs.iter().filter(included) {
        match c.op {
            Operator::Rst => {
                let to = slot_of(c.target);
                if has_other_writer.contains(&c.target) {
                    program.push(Instr::Insert1 { to });
                } else {
                    program.push(Instr::RstTo1 { to });
                }
            }
            Operator::Id => program.push(Instr::Move { from: c.source, to: slot_of(c.target) }),
            Operator::Incr => {
                let cnt_id = ca.state(c.target).cnt.expect("Incr target always owns a counter");
                let max = ca.counter(cnt_id).max;
                program.push(Instr::Incr { from: c.source, to: slot_of(c.target), max });
            }
            Operator::Noop => {}
        }
    }

    let next_state = CsaState { normal: next_normal.into_iter().collect(), counter: next_counter_vec };
    let keep = next_state.counter == cur_counter;
    let next = states.intern(next_state);
    Ok(if keep { Update::KeepSets { next, program } } else { Update::NewSets { next, program } })
}

fn compile(
    ca: &Ca,
    bytemap: &ByteMap,
    states: &mut CsaStateCache,
    state_id: CsaStateId,
    class: u8,
) -> EngineResult<Trans> {
    let byte = bytemap.representative_byte(class).expect("class always has a representative byte");
    let cur_normal = states.get(state_id).normal.clone();
    let cur_counter = states.get(state_id).counter.clone();
    let (contribs, sites) = gather_contribs(ca, &cur_normal, &cur_counter, byte)?;

    if sites.is_empty() {
        let update = build_update(ca, states, &cur_counter, &contribs, 0)?;
        let shape = if cur_counter.is_empty() {
            match &update {
                Update::KeepSets { .. } | Update::NewSets { .. } => Shape::EnteringCntState,
                Update::Noop { .. } | Update::Out => Shape::WithoutCntState,
            }
        } else {
            Shape::NoCondition
        };
        return Ok(Trans::Static { shape, update });
    }

    if sites.len() <= 2 {
        let mut table = Vec::with_capacity(1 << sites.len());
        for mask in 0..(1u32 << sites.len()) {
            table.push(build_update(ca, states, &cur_counter, &contribs, mask)?);
        }
        return Ok(Trans::Small { sites, table });
    }

    Ok(Trans::Lazy { contribs, sites, cache: HashMap::new() })
}

/// Evaluates every guard site against `cfg`'s live slots, returning the
/// admitted subset per site and the bitmask (bit `i` set iff site `i`'s
/// admitted subset is non-empty) used to pick or compile the matching
/// [`Update`].
fn evaluate_sites(ca: &Ca, states: &CsaStateCache, cfg: &Config, sites: &[GuardSite]) -> (Vec<CountingSet>, u32) {
    let state = states.get(cfg.state);
    let mut admitted = Vec::with_capacity(sites.len());
    let mut mask = 0u32;
    for (i, site) in sites.iter().enumerate() {
        let owner = state.counter[site.slot];
        let counter = ca.counter(ca.state(owner).cnt.expect("guard site slot always owns a counter"));
        let (yes, _) = match site.guard {
            Guard::CanIncr => cfg.slots[site.slot].split(|v| counter.can_incr(v as i64)),
            Guard::CanExit => cfg.slots[site.slot].split(|v| counter.can_exit(v as i64)),
            Guard::True => unreachable!("True guards never become a guard site"),
        };
        if !yes.is_empty() {
            mask |= 1 << i;
        }
        admitted.push(yes);
    }
    (admitted, mask)
}

fn resolve(source: Source, cfg: &Config, admitted: &[CountingSet]) -> EngineResult<CountingSet> {
    match source {
        Source::Slot(i) => cfg
            .slots
            .get(i)
            .cloned()
            .ok_or_else(|| EngineError::InternalFailure(format!("update program read out-of-range slot {i}"))),
        Source::Guard(i) => admitted.get(i).cloned().ok_or_else(|| {
            EngineError::InternalFailure(format!("update program read out-of-range guard site {i}"))
        }),
    }
}

fn execute(states: &CsaStateCache, update: &Update, cfg: &Config, admitted: &[CountingSet]) -> EngineResult<Option<Config>> {
    match update {
        Update::Out => Ok(None),
        Update::Noop { next } => Ok(Some(Config { state: *next, slots: Vec::new() })),
        Update::KeepSets { next, program } | Update::NewSets { next, program } => {
            let slot_count = states.get(*next).counter.len();
            let mut new_slots = vec![CountingSet::empty(); slot_count];
            for instr in program {
                match *instr {
                    Instr::Move { from, to } => {
                        let v = resolve(from, cfg, admitted)?;
                        new_slots[to].merge(v);
                    }
                    Instr::Incr { from, to, max } => {
                        let mut v = resolve(from, cfg, admitted)?;
                        v.increment(max);
                        if !v.is_empty() {
                            new_slots[to].merge(v);
                        }
                    }
                    Instr::Insert1 { to } => new_slots[to].insert_1(),
                    Instr::RstTo1 { to } => new_slots[to].rst_to_1(),
                }
            }
            Ok(Some(Config { state: *next, slots: new_slots }))
        }
    }
}

/// Folds a fresh start thread into a live configuration — used by
/// [`Matcher`] to implement unanchored search without restarting the
/// whole automaton at every candidate offset.
fn union_configs(engine: &mut CsaEngine, a: Config, b: Config) -> Config {
    let a_state = engine.states.get(a.state).clone();
    let b_state = engine.states.get(b.state).clone();

    let mut normal: BTreeSet<StateId> = a_state.normal.iter().copied().collect();
    normal.extend(b_state.normal.iter().copied());

    let mut owners: BTreeSet<StateId> = a_state.counter.iter().copied().collect();
    owners.extend(b_state.counter.iter().copied());
    let counter: Vec<StateId> = owners.into_iter().collect();

    let mut slots = vec![CountingSet::empty(); counter.len()];
    for (i, owner) in counter.iter().enumerate() {
        if let Some(pos) = a_state.counter.iter().position(|s| s == owner) {
            slots[i].merge(a.slots[pos].clone());
        }
        if let Some(pos) = b_state.counter.iter().position(|s| s == owner) {
            slots[i].merge(b.slots[pos].clone());
        }
    }

    let state = engine.states.intern(CsaState { normal: normal.into_iter().collect(), counter });
    Config { state, slots }
}

/// Runs a [`Ca`] over a byte string, implementing the unanchored search
/// as a single linear pass: instead of restarting the whole automaton
/// at every candidate start position (quadratic), a fresh start thread
/// is folded into the live configuration at each position and advances
/// alongside whatever already matched, the same trick
/// `examples/original_source/src/ca_cli.cc`'s driver relies on RE2 for.
pub struct Matcher<'a> {
    ca: &'a Ca,
    engine: RefCell<CsaEngine<'a>>,
}

impl<'a> Matcher<'a> {
    pub fn new(ca: &'a Ca) -> Matcher<'a> {
        Matcher { ca, engine: RefCell::new(CsaEngine::new(ca)) }
    }

    /// Whether the pattern matches anywhere in `haystack` (or, if the
    /// pattern is anchored, at the required position).
    pub fn is_match(&self, haystack: &[u8]) -> EngineResult<bool> {
        let mut engine = self.engine.borrow_mut();
        let mut cfg = Some(engine.initial());

        if let Some(c) = &cfg {
            if self.accepts_here(&engine, c, 0, haystack.len()) {
                return Ok(true);
            }
        }

        for (i, &b) in haystack.iter().enumerate() {
            if !self.ca.anchored_start && i > 0 {
                let fresh = engine.initial();
                cfg = Some(match cfg {
                    Some(c) => union_configs(&mut engine, c, fresh),
                    None => fresh,
                });
            }

            let stepped = match &cfg {
                Some(c) => engine.step(c, b)?,
                None => None,
            };
            cfg = stepped;

            if let Some(c) = &cfg {
                if self.accepts_here(&engine, c, i + 1, haystack.len()) {
                    return Ok(true);
                }
            } else if self.ca.anchored_start {
                return Ok(false);
            }
        }
        Ok(false)
    }

    fn accepts_here(&self, engine: &CsaEngine, cfg: &Config, pos: usize, len: usize) -> bool {
        engine.is_accepting(cfg) && (!self.ca.anchored_end || pos == len)
    }
}

/// One discovered configuration plus the byte-class edges out of it,
/// found breadth-first from the initial configuration until no new one
/// is reachable (spec §6.1's `debug csa`: "fully expand the CSA ...
/// until closure").
pub struct CsaGraph {
    pub cache: CsaStateCache,
    pub configs: Vec<Config>,
    pub accepting: Vec<bool>,
    /// `(from, class, to)`; `to` is `None` when the class leads to the
    /// dead configuration, which is never itself recorded as a node.
    pub edges: Vec<(usize, u8, Option<usize>)>,
}

/// Ceiling on the number of configurations [`expand`] will discover.
///
/// An unbounded counter (`{n,}`) never stops incrementing — `CanIncr` is
/// `Guard::True` once `max == -1` (spec §3.2), so every additional byte
/// produces a counting set holding a value one higher than the last, and
/// the literal closure is infinite. Real usage of `debug csa` is for
/// inspecting small bounded patterns, so expansion stops and logs a
/// warning rather than spinning forever once this many configurations
/// have been found.
const MAX_EXPANDED_STATES: usize = 10_000;

/// Breadth-first closure of the CSA reachable from `ca`'s initial
/// configuration, one edge per byte class.
pub fn expand(ca: &Ca) -> EngineResult<CsaGraph> {
    let mut engine = CsaEngine::new(ca);
    let initial = engine.initial();
    let mut configs = vec![initial.clone()];
    let mut accepting = vec![engine.is_accepting(&initial)];
    let mut edges = Vec::new();
    let mut queue = VecDeque::from([0usize]);
    let num_classes = engine.num_classes();

    while let Some(idx) = queue.pop_front() {
        if configs.len() >= MAX_EXPANDED_STATES {
            log::warn!(
                "csa expansion truncated at {MAX_EXPANDED_STATES} configurations (pattern likely has an unbounded counter)"
            );
            break;
        }
        let cur = configs[idx].clone();
        for class in 0..num_classes {
            let class = class as u8;
            let byte = match engine.representative_byte(class) {
                Some(b) => b,
                None => continue,
            };
            match engine.step(&cur, byte)? {
                None => edges.push((idx, class, None)),
                Some(next_cfg) => {
                    let next_idx = match configs.iter().position(|c| c == &next_cfg) {
                        Some(i) => i,
                        None => {
                            configs.push(next_cfg.clone());
                            accepting.push(engine.is_accepting(&next_cfg));
                            queue.push_back(configs.len() - 1);
                            configs.len() - 1
                        }
                    };
                    edges.push((idx, class, Some(next_idx)));
                }
            }
        }
    }

    Ok(CsaGraph { cache: engine.states, configs, accepting, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glushkov::build;

    fn matches(pattern: &str, haystack: &str) -> bool {
        let ca = build(pattern).unwrap();
        Matcher::new(&ca).is_match(haystack.as_bytes()).unwrap()
    }

    #[test]
    fn plain_literal() {
        assert!(matches("abc", "xxabcxx"));
        assert!(!matches("abc", "xxabxx"));
    }

    #[test]
    fn bounded_repeat_respects_both_bounds() {
        assert!(!matches("a{3,5}", "aa"));
        assert!(matches("a{3,5}", "aaa"));
        assert!(matches("a{3,5}", "aaaaa"));
        assert!(matches("a{3,5}", "aaaaaa")); // unanchored: aaaaa substring matches
    }

    #[test]
    fn anchored_bounded_repeat_rejects_overflow() {
        let ca = build("^a{3,5}$").unwrap();
        let m = Matcher::new(&ca);
        assert!(!m.is_match(b"aa").unwrap());
        assert!(m.is_match(b"aaa").unwrap());
        assert!(m.is_match(b"aaaaa").unwrap());
        assert!(!m.is_match(b"aaaaaa").unwrap());
    }

    #[test]
    fn grouped_repeat() {
        assert!(matches("(ab){2,4}", "ababab"));
        assert!(!matches("^(ab){2,4}$", "ab"));
    }

    #[test]
    fn dot_matches_newline() {
        assert!(matches("x.*y", "x\nabc\ny"));
    }

    #[test]
    fn char_class_with_counted_repeat() {
        assert!(matches("[0-9]{2,3}-[a-z]+", "42-days"));
        assert!(!matches("^[0-9]{2,3}-[a-z]+$", "4-days"));
    }

    #[test]
    fn large_bound_still_matches_linearly_in_principle() {
        let ca = build("a{1,100}b").unwrap();
        let m = Matcher::new(&ca);
        let mut s = "a".repeat(100);
        s.push('b');
        assert!(m.is_match(s.as_bytes()).unwrap());
        let mut too_many = "a".repeat(101);
        too_many.push('b');
        assert!(!Matcher::new(&build("^a{1,100}b$").unwrap()).is_match(too_many.as_bytes()).unwrap());
    }

    #[test]
    fn unbounded_repeat_has_no_upper_limit() {
        let ca = build("^a{2,}$").unwrap();
        let m = Matcher::new(&ca);
        assert!(!m.is_match(b"a").unwrap());
        assert!(m.is_match(b"aa").unwrap());
        assert!(m.is_match(&vec![b'a'; 500]).unwrap());
    }

    #[test]
    fn empty_haystack_matches_nullable_pattern() {
        assert!(matches("a*", ""));
        assert!(!matches("a+", ""));
    }

    #[test]
    fn expand_closure_is_finite_for_bounded_repeat() {
        // a{1,3}: the reachable counting-set configurations are exactly
        // "nothing seen yet", "{1}", "{1,2}", "{2,3}", "{3}" (dropping
        // values past max as they're incremented) — a small closed set,
        // not one state per prefix length.
        let ca = build("a{1,3}").unwrap();
        let graph = expand(&ca).unwrap();
        assert!(graph.configs.len() < 10);
        assert!(graph.accepting.iter().any(|&a| a));
    }

    #[test]
    fn expand_reaches_an_accepting_state_for_plain_literal() {
        let ca = build("abc").unwrap();
        let graph = expand(&ca).unwrap();
        assert!(graph.accepting.iter().any(|&a| a));
    }

    #[test]
    fn small_shape_is_used_for_a_loop_with_both_exit_and_incr_guards() {
        // a{2,4}a: after the second 'a', the third state has both a
        // CanIncr loop-back edge (continue the repeat) and a CanExit
        // exit edge (move on to the trailing literal 'a') on the same
        // byte — exactly two guard sites, the `Small` shape's case.
        assert!(matches("a{2,4}a", "aaa"));
        assert!(matches("a{2,4}a", "aaaaa"));
        assert!(!matches("^a{2,4}a$", "aaaaaa"));
    }

    #[test]
    fn repeated_configurations_reuse_the_compiled_transition() {
        // Not directly observable from outside, but a configuration
        // that recurs (e.g. stepping 'a' against a{2,100} well past the
        // point where the live set has stabilized in shape) must still
        // produce identical results every time.
        let ca = build("^a{2,100}$").unwrap();
        let m = Matcher::new(&ca);
        assert!(m.is_match(&vec![b'a'; 50]).unwrap());
        assert!(m.is_match(&vec![b'a'; 100]).unwrap());
        assert!(!m.is_match(&vec![b'a'; 101]).unwrap());
    }
}
