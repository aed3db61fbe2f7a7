//! Concurrent dispatch properties

use eventwait::prelude::*;
use eventwait::ScriptedProvider;
use eventwait_test_utils::{armed_waiter, gated_config, numbered, number_of, ungated_config};
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;

fn concurrent_dispatch(config: WaiterConfig, k: u128) {
    let waiter = armed_waiter(config);

    let mut provider = ScriptedProvider::new(waiter.clone());
    for i in 0..k {
        provider = provider.then(Duration::from_millis(5), ElementId::from_u128(i), numbered(0));
    }
    let run = provider.spawn_concurrent();

    let expected = usize::try_from(k).unwrap();
    let outcome = waiter.wait_for_events(expected, Duration::from_millis(150));
    assert_eq!(run.join(), expected);

    assert_eq!(outcome.observed, expected, "lost or duplicated events");
    let sources: HashSet<_> = outcome.captured.iter().map(|e| e.source).collect();
    assert_eq!(sources.len(), expected);
    for (i, event) in outcome.captured.iter().enumerate() {
        assert_eq!(event.sequence, i);
    }
}

#[test]
fn eight_concurrent_providers_ungated() {
    concurrent_dispatch(ungated_config(), 8);
}

#[test]
fn eight_concurrent_providers_gated() {
    concurrent_dispatch(gated_config(Duration::from_secs(2)), 8);
}

#[test]
fn single_provider_gated() {
    concurrent_dispatch(gated_config(Duration::from_secs(2)), 1);
}

#[test]
fn arrival_times_are_monotonic() {
    let waiter = armed_waiter(ungated_config());
    let mut provider = ScriptedProvider::new(waiter.clone());
    for i in 0..6 {
        provider = provider.then(Duration::ZERO, ElementId::from_u128(i), numbered(0));
    }
    let run = provider.spawn_concurrent();

    let outcome = waiter.wait_for_events(6, Duration::from_millis(100));
    run.join();

    for pair in outcome.captured.windows(2) {
        assert!(pair[0].arrived_at <= pair[1].arrived_at);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn n_dispatched_n_captured_in_order(n in 0usize..24) {
        let waiter = armed_waiter(ungated_config());
        let source = ElementId::new();
        for i in 0..n {
            waiter.on_provider_event(source, numbered(i));
        }

        let outcome = waiter.wait_for_events(n, Duration::from_millis(5));

        prop_assert_eq!(outcome.observed, n);
        let order: Vec<_> = outcome.captured.iter().filter_map(|e| number_of(&e.payload)).collect();
        prop_assert_eq!(order, (0..n).collect::<Vec<_>>());
    }
}
