//! Graphviz DOT export for a [`Ca`], used by the `debug ca` CLI
//! subcommand.
//!
//! Grounded on `examples/original_source/src/ca.hh`'s `StateT::to_DOT`
//! / `CA::to_DOT`: one node per state labeled with its finality and
//! owning counter, one edge per transition labeled with its byte range,
//! guard and operator.
//!
//! [`to_dot_csa`] renders the other half: a [`crate::csa::CsaGraph`], the
//! breadth-first closure of the lazily-determinized CSA, the way
//! `examples/original_source/csa.cc`'s `CSA::Visualizer` renders the
//! states it discovered during a run — except here the run is a
//! deliberate until-closure expansion (spec §6.1) rather than a replay
//! of one specific match.

use std::fmt::Write as _;

use crate::ca::{Ca, Final, Guard, Operator};
use crate::csa::CsaGraph;

fn byte_label(b: u8) -> String {
    if b.is_ascii_graphic() && b != b'"' && b != b'\\' {
        (b as char).to_string()
    } else {
        format!("\\\\x{:02x}", b)
    }
}

fn range_label(lo: u8, hi: u8) -> String {
    if lo == hi {
        byte_label(lo)
    } else {
        format!("{}-{}", byte_label(lo), byte_label(hi))
    }
}

fn guard_label(guard: Guard) -> &'static str {
    match guard {
        Guard::True => "true",
        Guard::CanIncr => "can_incr",
        Guard::CanExit => "can_exit",
    }
}

fn op_label(op: Operator) -> &'static str {
    match op {
        Operator::Incr => "incr",
        Operator::Rst => "rst",
        Operator::Id => "id",
        Operator::Noop => "noop",
    }
}

fn final_label(f: Final) -> &'static str {
    match f {
        Final::No => "no",
        Final::Always => "always",
        Final::IfCanExit => "if_can_exit",
    }
}

/// Renders `ca` as a Graphviz DOT digraph.
pub fn to_dot(ca: &Ca) -> String {
    let mut out = String::new();
    out.push_str("digraph ca {\n");
    out.push_str("\trankdir=LR;\n");
    for (id, state) in ca.states.iter().enumerate() {
        let shape = if state.is_final == Final::No { "circle" } else { "doublecircle" };
        let cnt = match state.cnt {
            Some(c) => format!("{}", c),
            None => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "\t{id} [shape={shape}, label=\"{id}\\nF:{}|C:{cnt}\"]",
            final_label(state.is_final)
        );
        for t in &state.transitions {
            let _ = writeln!(
                out,
                "\t{id} -> {} [label=\"{}|G:{}|O:{}\"]",
                t.target,
                range_label(t.lo, t.hi),
                guard_label(t.guard),
                op_label(t.op)
            );
        }
    }
    out.push_str("}\n");
    out
}

/// Renders a breadth-first-expanded [`CsaGraph`] (spec §6.1's
/// `debug csa`) as a Graphviz DOT digraph. One node per distinct
/// configuration discovered; one edge per byte class that leads
/// somewhere other than the dead configuration (dead transitions are
/// omitted — they would just be a self-evident "everything else
/// rejects" edge to nowhere).
pub fn to_dot_csa(graph: &CsaGraph) -> String {
    let mut out = String::new();
    out.push_str("digraph csa {\n");
    out.push_str("\trankdir=LR;\n");
    for (idx, cfg) in graph.configs.iter().enumerate() {
        let shape = if graph.accepting[idx] { "doublecircle" } else { "circle" };
        let state = graph.cache.get(cfg.state);
        let normal = state
            .normal
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let counters = state
            .counter
            .iter()
            .zip(cfg.slots.iter())
            .map(|(owner, cset)| {
                let values = cset.to_vec().iter().map(|v| v.to_string()).collect::<Vec<_>>().join("/");
                format!("{owner}:{{{values}}}")
            })
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "\t{idx} [shape={shape}, label=\"N:[{normal}] {counters}\"]");
    }
    for &(from, class, to) in &graph.edges {
        if let Some(to) = to {
            let _ = writeln!(out, "\t{from} -> {to} [label=\"c{class}\"]");
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glushkov::build;

    #[test]
    fn dot_output_mentions_every_state() {
        let ca = build("a{1,3}b").unwrap();
        let dot = to_dot(&ca);
        assert!(dot.starts_with("digraph ca {"));
        assert_eq!(dot.matches("shape=").count(), ca.states.len());
    }

    #[test]
    fn byte_label_escapes_quotes() {
        assert_eq!(byte_label(b'"'), "\\x22");
        assert_eq!(byte_label(b'a'), "a");
    }

    #[test]
    fn csa_dot_output_mentions_every_discovered_state() {
        let ca = build("a{1,3}").unwrap();
        let graph = crate::csa::expand(&ca).unwrap();
        let dot = to_dot_csa(&graph);
        assert!(dot.starts_with("digraph csa {"));
        assert_eq!(dot.matches("shape=").count(), graph.configs.len());
    }

    #[test]
    fn csa_dot_has_at_least_one_accepting_doublecircle() {
        let ca = build("abc").unwrap();
        let graph = crate::csa::expand(&ca).unwrap();
        let dot = to_dot_csa(&graph);
        assert!(dot.contains("doublecircle"));
    }
}
