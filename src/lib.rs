//! A regex engine that matches bounded counted repetition
//! (`a{3,1000}`) in time independent of the repetition bound, by
//! lazily determinizing a Counting Automaton into a Counting Set
//! Automaton (spec §1-§3).
//!
//! `ast` and `glushkov` turn a pattern into a [`ca::Ca`]; `csa` runs it
//! against input without ever enumerating individual counter values.
//! `bytemap` and `range_builder` are construction-time helpers shared
//! by the CA builder; `dot` renders either automaton for inspection.

pub mod ast;
pub mod bytemap;
pub mod ca;
pub mod counting_set;
pub mod csa;
pub mod dot;
pub mod error;
pub mod glushkov;
pub mod range_builder;

pub use ca::Ca;
pub use csa::Matcher;
pub use error::{EngineError, Result};

/// Compiles `pattern` and returns a [`Matcher`]-ready [`Ca`]. Shorthand
/// for [`glushkov::build`], the entry point most callers want.
pub fn compile(pattern: &str) -> Result<Ca> {
    glushkov::build(pattern)
}
