use crate::invariants::assert_linear_in_quantity;
use crate::{RewardRule, DEFAULT_BASE_POINTS, DEFAULT_MULTIPLIER};

const TV: i64 = 3;
const PARTIALLY_WORKING: i64 = 2;
const UNKNOWN: i64 = 9_999;

fn rule() -> RewardRule {
    RewardRule::builtin()
}

#[test]
fn test_television_partially_working_scenario() {
    // round(200 * 0.7) = 140, 12 kg -> +50, two units
    assert_eq!(
        rule().compute_reward(Some(TV), Some(PARTIALLY_WORKING), 12.0, 2),
        380
    );
}

#[test]
fn test_unknown_everything_scenario() {
    // round(10 * 0.3) = 3, 0.3 kg -> +0
    assert_eq!(rule().compute_reward(Some(UNKNOWN), Some(UNKNOWN), 0.3, 1), 3);
}

#[test]
fn test_unknown_category_uses_default_base() {
    let with_default = RewardRule::new([(UNKNOWN, DEFAULT_BASE_POINTS)], [(1, 1.0), (2, 0.7)]);
    let r = RewardRule::new([], [(1, 1.0), (2, 0.7)]);
    for cond in [1, 2, UNKNOWN] {
        assert_eq!(
            r.compute_reward(Some(UNKNOWN), Some(cond), 7.0, 1),
            with_default.compute_reward(Some(UNKNOWN), Some(cond), 7.0, 1)
        );
    }
    assert_eq!(r.compute_reward(None, Some(1), 0.5, 1), u64::from(DEFAULT_BASE_POINTS));
}

#[test]
fn test_unknown_condition_uses_default_multiplier() {
    let r = rule();
    let explicit = RewardRule::new([(TV, 200)], [(UNKNOWN, DEFAULT_MULTIPLIER)]);
    assert_eq!(
        r.compute_reward(Some(TV), Some(UNKNOWN), 3.0, 1),
        explicit.compute_reward(Some(TV), Some(UNKNOWN), 3.0, 1)
    );
    // round(200 * 0.3) = 60, +10
    assert_eq!(r.compute_reward(Some(TV), None, 3.0, 1), 70);
}

#[test]
fn test_light_items_earn_no_weight_bonus() {
    let r = rule();
    assert_eq!(
        r.compute_reward(Some(1), Some(1), 0.5, 1),
        r.compute_reward(Some(1), Some(1), 1.0, 1)
    );
    assert_eq!(r.compute_reward(Some(1), Some(1), 1.0, 1), 150);
}

#[test]
fn test_ten_kilo_boundary() {
    let r = rule();
    let base = r.compute_reward(Some(2), Some(1), 0.1, 1);
    assert_eq!(r.compute_reward(Some(2), Some(1), 10.0, 1) - base, 25);
    assert_eq!(r.compute_reward(Some(2), Some(1), 10.01, 1) - base, 50);
}

#[test]
fn test_quantity_is_linear() {
    let r = rule();
    for weight in [0.2, 3.0, 8.0, 15.0, 42.0] {
        let single = r.compute_reward(Some(4), Some(3), weight, 1);
        let triple = r.compute_reward(Some(4), Some(3), weight, 3);
        assert_linear_in_quantity(single, triple, 3);
    }
}

#[test]
fn test_non_positive_quantity_counts_as_one() {
    let r = rule();
    let single = r.compute_reward(Some(5), Some(2), 6.0, 1);
    assert_eq!(r.compute_reward(Some(5), Some(2), 6.0, 0), single);
    assert_eq!(r.compute_reward(Some(5), Some(2), 6.0, -4), single);
}

#[test]
fn test_reward_is_deterministic() {
    let r = rule();
    let first = r.compute_reward(Some(6), Some(4), 21.0, 5);
    for _ in 0..10 {
        assert_eq!(r.compute_reward(Some(6), Some(4), 21.0, 5), first);
    }
    // round(40 * 0.3) = 12, +75, five units
    assert_eq!(first, 435);
}

#[test]
fn test_builtin_table_shape() {
    let r = rule();
    assert_eq!(r.category_count(), 6);
    assert_eq!(r.condition_count(), 4);
    assert_eq!(r.base_points(Some(TV)), 200);
    assert_eq!(r.multiplier(Some(PARTIALLY_WORKING)), 0.7);
}

#[test]
fn test_decimal_half_rounds_up_through_catalog() {
    // 45 * 0.7 = 31.5 -> 32, 0.5 kg -> +0
    let r = RewardRule::new([(7, 45)], [(PARTIALLY_WORKING, 0.7)]);
    assert_eq!(r.compute_reward(Some(7), Some(PARTIALLY_WORKING), 0.5, 1), 32);
    assert_eq!(r.compute_reward(Some(7), Some(PARTIALLY_WORKING), 0.5, 3), 96);
}
