//! End-to-end run: find a sorting bug at strength 3, then replay just the
//! failing case from its reproduction key.

use ncase_explore::{CaseRunner, FactoryExt, RunConfig, RunError, StopReason};
use ncase_factory::{Factory, Interleaving, Singleton, Synthesis, Variable};

const MAXIMUM_NUMBER_OF_DELTAS: usize = 4;

/// A shuffled sequence together with the sorted sequence it came from.
#[derive(Debug, Clone, PartialEq)]
struct SortCase {
    sorted: Vec<i32>,
    shuffled: Vec<i32>,
}

/// Sorted sequences are built from a least item and non-negative deltas,
/// so duplicates arise exactly where a delta is zero. The least item and
/// the deltas are arranged together, which shuffles the whole sequence.
fn sort_cases() -> Factory<SortCase> {
    let least = Variable::create(-3..7).unwrap();
    let delta = Variable::create(0..5).unwrap();

    let by_length = (0..=MAXIMUM_NUMBER_OF_DELTAS).map(|deltas| {
        let parts = std::iter::once(least.clone()).chain(std::iter::repeat(delta.clone()).take(deltas));
        Synthesis::create((Synthesis::create_with_permutation(parts),), |((parts, permutation),)| {
            let mut sorted = Vec::with_capacity(parts.len());
            let mut running = 0;
            for (index, part) in parts.into_iter().enumerate() {
                running = if index == 0 { part } else { running + part };
                sorted.push(running);
            }
            let shuffled = permutation.apply(&sorted).unwrap();
            SortCase { sorted, shuffled }
        })
    });
    let non_trivial = Interleaving::create(by_length).unwrap();
    let trivial = Singleton::create(SortCase {
        sorted: Vec::new(),
        shuffled: Vec::new(),
    });
    Interleaving::create(vec![trivial, non_trivial]).unwrap()
}

fn sort_that_works(items: &[i32]) -> Vec<i32> {
    let mut sorted: Vec<i32> = Vec::with_capacity(items.len());
    for &item in items {
        let at = sorted.partition_point(|&existing| existing <= item);
        sorted.insert(at, item);
    }
    sorted
}

/// Quicksort that loses copies of the pivot.
fn sort_with_bug(items: &[i32]) -> Vec<i32> {
    let Some((&pivot, rest)) = items.split_first() else {
        return Vec::new();
    };
    let below: Vec<i32> = rest.iter().copied().filter(|&x| x < pivot).collect();
    let above: Vec<i32> = rest.iter().copied().filter(|&x| x > pivot).collect();
    let mut sorted = sort_with_bug(&below);
    sorted.push(pivot);
    sorted.extend(sort_with_bug(&above));
    sorted
}

fn check_sort(sort: fn(&[i32]) -> Vec<i32>) -> impl Fn(SortCase) -> Result<(), String> {
    move |case| {
        let result = sort(&case.shuffled);
        if result == case.sorted {
            Ok(())
        } else {
            Err(format!("sorted {:?} into {:?}", case.shuffled, result))
        }
    }
}

#[test]
fn test_every_case_is_a_shuffle_of_a_sorted_sequence() {
    for case in sort_cases().create_enumerable(2) {
        assert!(case.sorted.windows(2).all(|w| w[0] <= w[1]), "{case:?}");
        let mut shuffled = case.shuffled.clone();
        shuffled.sort();
        assert_eq!(shuffled, case.sorted);
    }
}

#[test]
fn test_correct_sort_passes_at_strength_three() {
    let factory = sort_cases();
    let executed = factory
        .execute_for_all_cases(3, check_sort(sort_that_works))
        .unwrap();
    assert_eq!(executed, factory.create_enumerable(3).count());
    assert!(executed > 1);
}

#[test]
fn test_buggy_sort_fails_and_the_failure_reproduces() {
    let factory = sort_cases();
    let err = factory
        .execute_for_all_cases(3, check_sort(sort_with_bug))
        .unwrap_err();

    let RunError::ProcedureFailure {
        case_number,
        key,
        failure,
    } = err
    else {
        panic!("expected a procedure failure");
    };
    assert!(case_number >= 1);

    // The failing case has a duplicate, and replaying its key fails the same way.
    let case = factory.reproduce(&key.to_string()).unwrap();
    assert!(case.sorted.windows(2).any(|w| w[0] == w[1]), "{case:?}");

    let replayed = factory
        .execute_for_reproduced_case(check_sort(sort_with_bug), &key.to_string())
        .unwrap_err();
    match replayed {
        RunError::ProcedureFailure {
            case_number,
            key: replayed_key,
            failure: replayed_failure,
        } => {
            assert_eq!(case_number, 1);
            assert_eq!(replayed_key, key);
            assert_eq!(replayed_failure, failure);
        }
        other => panic!("unexpected error {other}"),
    }

    // The fixed sort passes on the same case.
    factory
        .execute_for_reproduced_case(check_sort(sort_that_works), &key.to_string())
        .unwrap();
}

#[test]
fn test_failing_assertion_is_reported_with_its_key() {
    let factory = sort_cases();
    let err = factory
        .execute_for_all_cases(2, |case: SortCase| {
            assert_eq!(sort_with_bug(&case.shuffled), case.sorted);
        })
        .unwrap_err();

    let RunError::ProcedurePanicked { key, message, .. } = err else {
        panic!("expected a caught panic");
    };
    assert!(message.contains("assertion"), "{message}");
    let case = factory.reproduce(&key.to_string()).unwrap();
    assert_ne!(sort_with_bug(&case.shuffled), case.sorted);
}

#[test]
fn test_parallel_run_finds_the_same_first_failure() {
    let factory = sort_cases();
    let sequential = factory
        .execute_for_all_cases(3, check_sort(sort_with_bug))
        .unwrap_err();
    let parallel = factory
        .execute_for_all_cases_in_parallel(3, check_sort(sort_with_bug))
        .unwrap_err();

    assert_eq!(sequential.case_number(), parallel.case_number());
    assert_eq!(sequential.reproduction_key(), parallel.reproduction_key());
}

#[test]
fn test_runner_honors_case_limit_from_json_config() {
    let config = RunConfig::from_json(r#"{"strength": 3, "max_cases": 25}"#).unwrap();
    let report = CaseRunner::new(config)
        .run_sequential(&sort_cases(), check_sort(sort_that_works))
        .unwrap();
    assert_eq!(report.cases_executed, 25);
    assert_eq!(report.stop_reason, StopReason::CaseLimitReached);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["cases_executed"], 25);
    assert_eq!(json["stop_reason"], "CaseLimitReached");
}
