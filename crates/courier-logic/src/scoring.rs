//! End-of-match score calculation.
//!
//! The score starts from raw earnings and layers three bonuses on
//! top: a reputation multiplier for finishing with a pristine record,
//! a time bonus for winning with a comfortable margin, and a flat
//! goal bonus for hitting the income target at all.

use serde::{Deserialize, Serialize};

use crate::courier::HIGH_REPUTATION;

/// Reputation multiplier applied to base earnings.
pub const REPUTATION_MULTIPLIER: f64 = 1.05;

/// Fraction of remaining time that must be left for any time bonus.
pub const TIME_BONUS_FLOOR: f64 = 0.2;

/// Time bonus scale, as a fraction of base earnings.
pub const TIME_BONUS_RATE: f64 = 0.1;

/// Goal bonus, as a fraction of the income goal.
pub const GOAL_BONUS_RATE: f64 = 0.15;

/// Itemized final score. `total` is the sum of the other fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: u64,
    pub reputation_bonus: u64,
    pub time_bonus: u64,
    pub goal_bonus: u64,
    pub total: u64,
}

/// Compute the final score for a finished match.
///
/// - Base is raw earnings, multiplied by 1.05 (truncated) when the
///   courier ends at reputation 90 or above.
/// - If the goal was met with more than 20% of the match duration
///   remaining, a time bonus of `base * 0.1 * remaining_fraction`
///   is added.
/// - Meeting the goal at all adds a flat 15% of the goal.
pub fn final_score(
    earnings: u64,
    reputation: i32,
    elapsed: f64,
    duration: f64,
    goal: u64,
) -> ScoreBreakdown {
    let raw = earnings;
    let base = if reputation >= HIGH_REPUTATION {
        (raw as f64 * REPUTATION_MULTIPLIER) as u64
    } else {
        raw
    };
    let reputation_bonus = base - raw;

    let goal_met = earnings >= goal;

    let remaining_fraction = if duration > 0.0 {
        ((duration - elapsed) / duration).clamp(0.0, 1.0)
    } else {
        0.0
    };
    // Time bonus scales from the uplifted base, not raw earnings.
    let time_bonus = if goal_met && remaining_fraction > TIME_BONUS_FLOOR {
        (base as f64 * TIME_BONUS_RATE * remaining_fraction) as u64
    } else {
        0
    };

    let goal_bonus = if goal_met {
        (goal as f64 * GOAL_BONUS_RATE) as u64
    } else {
        0
    };

    ScoreBreakdown {
        base: raw,
        reputation_bonus,
        time_bonus,
        goal_bonus,
        total: raw + reputation_bonus + time_bonus + goal_bonus,
    }
}
