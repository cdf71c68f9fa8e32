//! Property tests for gesture classification over scripted presses

use accessory_core::test_utils::press_simulator::*;
use accessory_core::{GestureTiming, PressType};
use proptest::prelude::*;

const SINGLE_MS: u16 = 20;
const DOUBLE_MS: u16 = 150;
const LONG_MS: u16 = 1000;

fn with_doubles() -> GestureTiming {
    GestureTiming::new(SINGLE_MS, DOUBLE_MS, LONG_MS)
}

fn without_doubles() -> GestureTiming {
    GestureTiming::new(SINGLE_MS, 0, LONG_MS)
}

proptest! {
    #[test]
    fn short_press_never_triggers(hold in 1u64..SINGLE_MS as u64) {
        let observations = run_pattern(&PressPattern::single(hold), &with_doubles(), 1, 500);
        prop_assert!(observations.is_empty());
    }

    #[test]
    fn single_fires_on_release_without_doubles(hold in SINGLE_MS as u64..LONG_MS as u64) {
        let observations = run_pattern(&PressPattern::single(hold), &without_doubles(), 1, 100);
        prop_assert_eq!(triggers(&observations), vec![PressType::Single]);

        let fired = observations
            .iter()
            .find(|o| o.observed == Observed::Trigger(PressType::Single))
            .map(|o| o.at_ms);
        prop_assert_eq!(fired, Some(hold));
    }

    #[test]
    fn single_fires_when_window_expires(hold in SINGLE_MS as u64..LONG_MS as u64) {
        let observations = run_pattern(&PressPattern::single(hold), &with_doubles(), 1, 400);
        prop_assert_eq!(triggers(&observations), vec![PressType::Single]);

        let fired = observations.iter().find_map(|o| match o.observed {
            Observed::Trigger(_) => Some(o.at_ms),
            Observed::Primed => None,
        });
        prop_assert_eq!(fired, Some(hold + DOUBLE_MS as u64));
    }

    #[test]
    fn second_press_inside_window_is_double(
        hold in SINGLE_MS as u64 + 1..200,
        gap in 1u64..DOUBLE_MS as u64,
    ) {
        let pattern = PressPattern::double(hold, gap);
        let observations = run_pattern(&pattern, &with_doubles(), 1, 400);
        prop_assert_eq!(triggers(&observations), vec![PressType::Double]);
    }

    #[test]
    fn second_press_after_window_is_two_singles(
        hold in SINGLE_MS as u64 + 1..200,
        extra in 1u64..200,
    ) {
        let pattern = PressPattern::double(hold, DOUBLE_MS as u64 + extra);
        let observations = run_pattern(&pattern, &with_doubles(), 1, 400);
        prop_assert_eq!(
            triggers(&observations),
            vec![PressType::Single, PressType::Single]
        );
    }

    #[test]
    fn one_long_per_long_interval(hold in LONG_MS as u64..=2 * LONG_MS as u64) {
        let observations = run_pattern(&PressPattern::hold(hold), &with_doubles(), 1, 400);
        prop_assert_eq!(triggers(&observations), vec![PressType::Long]);
    }

    #[test]
    fn at_most_one_primed_per_press(hold in 1u64..3000) {
        let observations = run_pattern(&PressPattern::hold(hold), &with_doubles(), 1, 400);
        let primed = observations
            .iter()
            .filter(|o| o.observed == Observed::Primed)
            .count();
        prop_assert_eq!(primed, usize::from(hold > SINGLE_MS as u64));
    }

    #[test]
    fn primed_precedes_first_long(hold in LONG_MS as u64 + 1..4000) {
        let observations = run_pattern(&PressPattern::hold(hold), &with_doubles(), 1, 400);

        let primed: Vec<u64> = observations
            .iter()
            .filter(|o| o.observed == Observed::Primed)
            .map(|o| o.at_ms)
            .collect();
        let first_long = observations
            .iter()
            .find(|o| o.observed == Observed::Trigger(PressType::Long))
            .map(|o| o.at_ms);

        prop_assert_eq!(primed.len(), 1);
        prop_assert_eq!(first_long, Some(LONG_MS as u64));
        prop_assert!(primed[0] < LONG_MS as u64);
        prop_assert_eq!(primed[0], SINGLE_MS as u64);
    }

    #[test]
    fn coarse_polling_keeps_classification(hold in 100u64..800, poll in 1u64..20) {
        let observations = run_pattern(&PressPattern::single(hold), &without_doubles(), poll, 100);
        prop_assert_eq!(triggers(&observations), vec![PressType::Single]);
    }
}

#[test]
fn long_repeats_at_multiples_while_held() {
    let observations = run_pattern(&PressPattern::hold(3500), &with_doubles(), 1, 200);
    let longs: Vec<u64> = observations
        .iter()
        .filter(|o| o.observed == Observed::Trigger(PressType::Long))
        .map(|o| o.at_ms)
        .collect();
    assert_eq!(longs, vec![1000, 2000, 3000]);
}

#[test]
fn long_only_timing_suppresses_single() {
    let timing = GestureTiming::long_only(500);
    for hold in [10, 100, 499] {
        let observations = run_pattern(&PressPattern::single(hold), &timing, 1, 200);
        assert!(triggers(&observations).is_empty(), "hold {}", hold);
    }
    let observations = run_pattern(&PressPattern::hold(600), &timing, 1, 200);
    assert_eq!(triggers(&observations), vec![PressType::Long]);
}

#[test]
fn third_press_starts_new_cycle() {
    let pattern = PressPattern::new("Triple")
        .press(0, 50)
        .press(100, 50)
        .press(200, 50);
    let observations = run_pattern(&pattern, &with_doubles(), 1, 400);
    assert_eq!(
        triggers(&observations),
        vec![PressType::Double, PressType::Single]
    );
}
