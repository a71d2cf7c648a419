//! End-to-end matching scenarios, compiled straight from patterns
//! through `glushkov::build` and driven by `csa::Matcher`.

use ca_csa::csa::Matcher;
use ca_csa::glushkov::build;

fn is_match(pattern: &str, haystack: &str) -> bool {
    let ca = build(pattern).expect("pattern should compile");
    Matcher::new(&ca).is_match(haystack.as_bytes()).expect("matcher should not fail")
}

#[test]
fn bounded_repeat_within_range() {
    assert!(is_match("^a{3,5}$", "aaa"));
    assert!(is_match("^a{3,5}$", "aaaa"));
    assert!(is_match("^a{3,5}$", "aaaaa"));
}

#[test]
fn bounded_repeat_outside_range() {
    assert!(!is_match("^a{3,5}$", "aa"));
    assert!(!is_match("^a{3,5}$", "aaaaaa"));
}

#[test]
fn anchored_start_only() {
    assert!(is_match("^a{3,5}", "aaaxxxxxx"));
    assert!(!is_match("^a{3,5}", "xxaaa"));
}

#[test]
fn grouped_counted_repeat() {
    assert!(is_match("^(ab){2,4}$", "abab"));
    assert!(is_match("^(ab){2,4}$", "abababab"));
    assert!(!is_match("^(ab){2,4}$", "ab"));
    assert!(!is_match("^(ab){2,4}$", "ababababab"));
}

#[test]
fn dot_matches_newline() {
    assert!(is_match("x.*y", "x\nabc\ny"));
}

#[test]
fn char_class_then_counted_repeat_then_plus() {
    assert!(is_match("^[0-9]{2,3}-[a-z]+$", "42-days"));
    assert!(is_match("^[0-9]{2,3}-[a-z]+$", "123-abcdef"));
    assert!(!is_match("^[0-9]{2,3}-[a-z]+$", "4-days"));
    assert!(!is_match("^[0-9]{2,3}-[a-z]+$", "1234-days"));
}

#[test]
fn large_bound_does_not_blow_up_and_still_matches() {
    let ca = build("^a{1,100}b$").expect("pattern should compile");
    let matcher = Matcher::new(&ca);
    let mut ok = "a".repeat(100);
    ok.push('b');
    assert!(matcher.is_match(ok.as_bytes()).unwrap());

    let mut too_many = "a".repeat(101);
    too_many.push('b');
    assert!(!matcher.is_match(too_many.as_bytes()).unwrap());
}

#[test]
fn unbounded_lower_bound_repeat() {
    let ca = build("^a{2,}$").expect("pattern should compile");
    let matcher = Matcher::new(&ca);
    assert!(!matcher.is_match(b"a").unwrap());
    assert!(matcher.is_match(b"aa").unwrap());
    assert!(matcher.is_match(&vec![b'a'; 2000]).unwrap());
}

#[test]
fn nested_counted_repetition_is_rejected() {
    let err = build("(a{2,3}){4,5}").unwrap_err();
    assert!(matches!(err, ca_csa::EngineError::NestedRepetition));
}

#[test]
fn anchor_inside_repeat_body_is_rejected() {
    assert!(build("(^a){2,3}").is_err());
}

#[test]
fn alternation_with_inconsistent_anchoring_is_rejected() {
    assert!(build("^a|b$").is_err());
}

#[test]
fn unanchored_search_finds_match_anywhere() {
    assert!(is_match("a{3,5}", "xxxaaaxxx"));
    assert!(is_match("a{3,5}", "aaa"));
    assert!(!is_match("a{3,5}", "xx"));
}

#[test]
fn star_and_plus_nullability() {
    assert!(is_match("^a*$", ""));
    assert!(!is_match("^a+$", ""));
    assert!(is_match("^a+$", "a"));
}
