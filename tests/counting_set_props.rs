//! Property checks for `CountingSet`'s core invariant: values stay
//! sorted ascending and duplicate-free no matter how sets are built up
//! through `increment`/`merge`/`insert_1`.

use ca_csa::counting_set::CountingSet;
use quickcheck_macros::quickcheck;

fn is_sorted_ascending_distinct(values: &[u64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

#[quickcheck]
fn increment_keeps_values_sorted_and_distinct(ops: Vec<u8>) -> bool {
    let mut set = CountingSet::fresh();
    for op in ops {
        match op % 3 {
            0 => set.increment(-1),
            1 => set.insert_1(),
            _ => {
                let mut other = CountingSet::fresh();
                other.increment(-1);
                set.merge(other);
            }
        }
    }
    is_sorted_ascending_distinct(&set.to_vec())
}

#[quickcheck]
fn increment_with_cap_never_exceeds_max(max: u8, steps: u8) -> bool {
    let max = (max % 20) as i64 + 1;
    let mut set = CountingSet::fresh();
    for _ in 0..steps {
        if set.is_empty() {
            break;
        }
        set.increment(max);
    }
    set.to_vec().iter().all(|&v| v as i64 <= max)
}

#[quickcheck]
fn merge_result_is_sorted_and_deduplicated(a_steps: u8, b_steps: u8) -> bool {
    let mut a = CountingSet::fresh();
    for _ in 0..(a_steps % 10) {
        a.increment(-1);
    }
    let mut b = CountingSet::fresh();
    for _ in 0..(b_steps % 10) {
        b.increment(-1);
    }
    a.merge(b);
    is_sorted_ascending_distinct(&a.to_vec())
}

#[test]
fn insert_1_is_idempotent_when_already_present() {
    let mut set = CountingSet::fresh();
    set.insert_1();
    assert_eq!(set.to_vec(), vec![1]);
}

#[test]
fn rst_to_1_discards_all_prior_values() {
    let mut set = CountingSet::fresh();
    set.increment(-1);
    set.increment(-1);
    set.rst_to_1();
    assert_eq!(set.to_vec(), vec![1]);
}

#[test]
fn split_partitions_every_member_exactly_once() {
    let mut set = CountingSet::fresh();
    for _ in 0..4 {
        set.increment(-1);
    }
    let (yes, no) = set.split(|v| v >= 3);
    assert_eq!(yes.len() + no.len(), set.len());
    for v in yes.to_vec() {
        assert!(v >= 3);
    }
    for v in no.to_vec() {
        assert!(v < 3);
    }
}
