//! # Reward
//!
//! Points credited to a donor when a donation reaches `completed`.
//!
//! ```text
//! after_state = round_half_up(base_points[category] * multiplier[condition])
//! ```
//!
//! The product is taken in thousandths of a point so that decimal halves
//! such as `45 * 0.7 = 31.5` round up instead of landing on the float just
//! below them.
//!
//! ```text
//! per_unit    = after_state + weight_bonus(weight_kg)
//! total       = per_unit * max(quantity, 1)
//! ```
//!
//! Unknown categories and conditions fall back to [`DEFAULT_BASE_POINTS`] and
//! [`DEFAULT_MULTIPLIER`]; they are never an error.

use std::collections::HashMap;

/// Base points for a category missing from the table.
pub const DEFAULT_BASE_POINTS: u32 = 10;

/// Condition multiplier for a condition missing from the table.
pub const DEFAULT_MULTIPLIER: f64 = 0.3;

/// Weight brackets as `(upper bound inclusive, bonus)`, ascending.
const WEIGHT_BRACKETS: [(f64, u64); 4] = [(1.0, 0), (5.0, 10), (10.0, 25), (20.0, 50)];

/// Bonus for anything heavier than the last bracket.
const HEAVY_BONUS: u64 = 75;

/// Static reward table, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardRule {
    base_points: HashMap<i64, u32>,
    multipliers: HashMap<i64, f64>,
}

impl RewardRule {
    pub fn new(
        base_points: impl IntoIterator<Item = (i64, u32)>,
        multipliers: impl IntoIterator<Item = (i64, f64)>,
    ) -> Self {
        Self {
            base_points: base_points.into_iter().collect(),
            multipliers: multipliers
                .into_iter()
                .filter(|(_, m)| *m > 0.0 && *m <= 1.0)
                .collect(),
        }
    }

    /// Catalogue shipped with the seed migration.
    ///
    /// | id | category            | base |   | id | condition              | mult |
    /// |----|---------------------|------|---|----|------------------------|------|
    /// | 1  | Computadoras        | 150  |   | 1  | Funcional              | 1.0  |
    /// | 2  | Celulares           | 80   |   | 2  | Parcialmente funcional | 0.7  |
    /// | 3  | Televisores         | 200  |   | 3  | No funcional           | 0.5  |
    /// | 4  | Electrodomesticos   | 120  |   | 4  | Para partes            | 0.3  |
    /// | 5  | Tablets             | 100  |   |    |                        |      |
    /// | 6  | Perifericos         | 40   |   |    |                        |      |
    pub fn builtin() -> Self {
        Self::new(
            [(1, 150), (2, 80), (3, 200), (4, 120), (5, 100), (6, 40)],
            [(1, 1.0), (2, 0.7), (3, 0.5), (4, 0.3)],
        )
    }

    pub fn base_points(&self, category_id: Option<i64>) -> u32 {
        category_id
            .and_then(|id| self.base_points.get(&id).copied())
            .unwrap_or(DEFAULT_BASE_POINTS)
    }

    pub fn multiplier(&self, condition_id: Option<i64>) -> f64 {
        condition_id
            .and_then(|id| self.multipliers.get(&id).copied())
            .unwrap_or(DEFAULT_MULTIPLIER)
    }

    /// Points awarded for a completed donation.
    pub fn compute_reward(
        &self,
        category_id: Option<i64>,
        condition_id: Option<i64>,
        weight_kg: f64,
        quantity: i64,
    ) -> u64 {
        let after_state = scaled_half_up(
            self.base_points(category_id),
            self.multiplier(condition_id),
        );
        let per_unit = after_state.saturating_add(weight_bonus(weight_kg));
        // quantity <= 0 counts as a single unit
        let units = u64::try_from(quantity.max(1)).unwrap_or(1);
        per_unit.saturating_mul(units)
    }

    pub fn category_count(&self) -> usize {
        self.base_points.len()
    }

    pub fn condition_count(&self) -> usize {
        self.multipliers.len()
    }
}

/// Step bonus by weight; each bracket includes its upper bound.
pub fn weight_bonus(weight_kg: f64) -> u64 {
    // NaN and non-positive weights never earn a bonus
    if !(weight_kg > 0.0) {
        return 0;
    }
    WEIGHT_BRACKETS
        .iter()
        .find(|(upper, _)| weight_kg <= *upper)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(HEAVY_BONUS)
}

/// Multipliers are resolved to this many parts per unit before multiplying.
const MULTIPLIER_SCALE: u64 = 1000;

/// `round_half_up(base * multiplier)` in integer arithmetic.
fn scaled_half_up(base: u32, multiplier: f64) -> u64 {
    if !(multiplier > 0.0) {
        return 0;
    }
    // multipliers are bounded to (0, 1], so this cast cannot truncate
    let parts = (multiplier * MULTIPLIER_SCALE as f64).round() as u64;
    (u64::from(base) * parts + MULTIPLIER_SCALE / 2) / MULTIPLIER_SCALE
}
