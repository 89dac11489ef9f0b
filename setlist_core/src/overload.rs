//! Progressive overload suggestions after a completed set.
//!
//! Rules, keyed on `reps_completed - target_reps`:
//! - short of target → keep the weight
//! - exactly on target or one over → +5
//! - two or more over → +10

use serde::{Deserialize, Serialize};

/// Weight added when the target is met or beaten by one rep
pub const SMALL_INCREMENT: f64 = 5.0;

/// Weight added when the target is beaten by two or more reps
pub const LARGE_INCREMENT: f64 = 10.0;

/// How well a set went relative to its target
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverloadCategory {
    Success,
    Good,
    Excellent,
    Maintain,
}

/// Suggested weight for the next set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OverloadSuggestion {
    pub suggested_weight: f64,
    pub category: OverloadCategory,
    pub message: String,
}

/// Suggest the next weight, or `None` if any input is missing or zero
pub fn advise(current_weight: f64, reps_completed: u32, target_reps: u32) -> Option<OverloadSuggestion> {
    if !(current_weight.is_finite() && current_weight > 0.0) || reps_completed == 0 || target_reps == 0 {
        return None;
    }

    let reps_exceeded = i64::from(reps_completed) - i64::from(target_reps);

    let (suggested_weight, category, message) = match reps_exceeded {
        n if n < 0 => (
            current_weight,
            OverloadCategory::Maintain,
            format!(
                "Stay at {} and aim for {} reps next set",
                format_weight(current_weight),
                target_reps
            ),
        ),
        0 => {
            let next = current_weight + SMALL_INCREMENT;
            (
                next,
                OverloadCategory::Success,
                format!("Target hit! Try {} next time", format_weight(next)),
            )
        }
        1 => {
            let next = current_weight + SMALL_INCREMENT;
            (
                next,
                OverloadCategory::Good,
                format!("One rep over target. Move up to {}", format_weight(next)),
            )
        }
        n => {
            let next = current_weight + LARGE_INCREMENT;
            (
                next,
                OverloadCategory::Excellent,
                format!("{} reps over target! Jump to {}", n, format_weight(next)),
            )
        }
    };

    tracing::debug!(
        "Overload advice for {} x {} (target {}): {:?} -> {}",
        current_weight,
        reps_completed,
        target_reps,
        category,
        suggested_weight
    );

    Some(OverloadSuggestion {
        suggested_weight,
        category,
        message,
    })
}

/// Render a weight without a trailing `.0` for whole numbers
pub fn format_weight(weight: f64) -> String {
    if weight.fract().abs() < f64::EPSILON {
        format!("{:.0}", weight)
    } else {
        format!("{:.1}", weight)
    }
}
