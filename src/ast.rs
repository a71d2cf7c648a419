//! Translation from `regex-syntax`'s `Hir` into the engine's own `Re`
//! AST.
//!
//! The parser is treated as an external collaborator (spec §1): any
//! parser that can produce this `Re` shape would do. We pick
//! `regex-syntax` because the teacher (`markmerz-regex-dfa`) already
//! builds its automaton straight from it.

use regex_syntax::hir::{Class, Hir, HirKind, Look};

use crate::error::{EngineError, Result};

/// One inclusive rune range, `lo..=hi`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuneRange {
    pub lo: u32,
    pub hi: u32,
}

impl RuneRange {
    pub fn new(lo: u32, hi: u32) -> RuneRange {
        RuneRange { lo, hi }
    }
}

/// The input AST (spec §3.1). Built once per pattern by [`from_pattern`]
/// and consumed by the CA builder; never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Re {
    Empty,
    Literal(u32),
    LiteralString(Vec<u32>),
    CharClass(Vec<RuneRange>),
    AnyChar,
    AnyByte,
    Concat(Vec<Re>),
    Alternate(Vec<Re>),
    Star(Box<Re>),
    Plus(Box<Re>),
    Quest(Box<Re>),
    /// `max == -1` denotes unbounded.
    Repeat(Box<Re>, i64, i64),
    Capture(Box<Re>),
    BeginText,
    EndText,
}

/// Parses `pattern` and translates it into a [`Re`] tree.
///
/// `.` is configured to match any Unicode scalar value including
/// newline: the engine's `AnyChar` variant has no notion of
/// line-restricted matching, so the dot-matches-newline behavior the
/// parser would otherwise default to (excluding `\n`) would silently
/// narrow `AnyChar`'s meaning relative to spec §3.1. This resolves
/// testable-property scenario 6 (`x.*y` against `x\nabc\ny`) in favor of
/// "AnyChar covers `\n`".
pub fn from_pattern(pattern: &str) -> Result<Re> {
    let hir = regex_syntax::ParserBuilder::new()
        .dot_matches_new_line(true)
        .build()
        .parse(pattern)
        .map_err(|e| EngineError::FailedToParse(e.to_string()))?;
    from_hir(&hir)
}

fn from_hir(hir: &Hir) -> Result<Re> {
    match hir.kind() {
        HirKind::Empty => Ok(Re::Empty),
        HirKind::Literal(lit) => literal_to_re(&lit.0),
        HirKind::Class(Class::Unicode(class)) => {
            let ranges = class
                .ranges()
                .iter()
                .map(|r| RuneRange::new(r.start() as u32, r.end() as u32))
                .collect();
            Ok(Re::CharClass(ranges))
        }
        HirKind::Class(Class::Bytes(class)) => {
            let ranges: Vec<_> = class.ranges().iter().collect();
            if ranges.len() == 1 && ranges[0].start() == 0x00 && ranges[0].end() == 0xFF {
                Ok(Re::AnyByte)
            } else {
                let ranges = ranges
                    .iter()
                    .map(|r| RuneRange::new(r.start() as u32, r.end() as u32))
                    .collect();
                Ok(Re::CharClass(ranges))
            }
        }
        HirKind::Look(look) => match look {
            Look::Start | Look::StartLF | Look::StartCRLF => Ok(Re::BeginText),
            Look::End | Look::EndLF | Look::EndCRLF => Ok(Re::EndText),
            Look::WordAscii
            | Look::WordAsciiNegate
            | Look::WordUnicode
            | Look::WordUnicodeNegate => Err(EngineError::UnsupportedOperation(
                "word boundary".to_string(),
            )),
        },
        HirKind::Repetition(rep) => {
            let sub = from_hir(&rep.sub)?;
            match (rep.min, rep.max) {
                (0, None) => Ok(Re::Star(Box::new(sub))),
                (1, None) => Ok(Re::Plus(Box::new(sub))),
                (0, Some(1)) => Ok(Re::Quest(Box::new(sub))),
                (min, max) => {
                    let max = max.map(|m| m as i64).unwrap_or(-1);
                    Ok(Re::Repeat(Box::new(sub), min as i64, max))
                }
            }
        }
        HirKind::Capture(cap) => Ok(Re::Capture(Box::new(from_hir(&cap.sub)?))),
        HirKind::Concat(subs) => {
            let subs = subs.iter().map(from_hir).collect::<Result<Vec<_>>>()?;
            Ok(Re::Concat(subs))
        }
        HirKind::Alternation(subs) => {
            let subs = subs.iter().map(from_hir).collect::<Result<Vec<_>>>()?;
            Ok(Re::Alternate(subs))
        }
    }
}

fn literal_to_re(bytes: &[u8]) -> Result<Re> {
    let s = std::str::from_utf8(bytes)
        .map_err(|e| EngineError::InvalidUtf8(e.to_string()))?;
    let runes: Vec<u32> = s.chars().map(|c| c as u32).collect();
    match runes.len() {
        0 => Ok(Re::Empty),
        1 => Ok(Re::Literal(runes[0])),
        _ => Ok(Re::LiteralString(runes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal() {
        assert_eq!(from_pattern("a").unwrap(), Re::Literal('a' as u32));
    }

    #[test]
    fn literal_string() {
        assert_eq!(
            from_pattern("abc").unwrap(),
            Re::LiteralString(vec!['a' as u32, 'b' as u32, 'c' as u32])
        );
    }

    #[test]
    fn repeat_bounded() {
        match from_pattern("a{3,5}").unwrap() {
            Re::Repeat(sub, 3, 5) => assert_eq!(*sub, Re::Literal('a' as u32)),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn repeat_unbounded() {
        match from_pattern("a{3,}").unwrap() {
            Re::Repeat(_, 3, -1) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn star_plus_quest() {
        assert!(matches!(from_pattern("a*").unwrap(), Re::Star(_)));
        assert!(matches!(from_pattern("a+").unwrap(), Re::Plus(_)));
        assert!(matches!(from_pattern("a?").unwrap(), Re::Quest(_)));
    }

    #[test]
    fn anchors() {
        match from_pattern("^a$").unwrap() {
            Re::Concat(subs) => {
                assert_eq!(subs.len(), 3);
                assert_eq!(subs[0], Re::BeginText);
                assert_eq!(subs[2], Re::EndText);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn word_boundary_unsupported() {
        assert!(matches!(
            from_pattern(r"\ba"),
            Err(EngineError::UnsupportedOperation(_))
        ));
    }
}
