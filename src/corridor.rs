//! Goal corridor: a floor/ceiling band that converges on the goal value.
//!
//! The band starts around the mean of the first six days and decays toward
//! the target every following day. The floor decays toward the target at the
//! full weekly rate. The ceiling decays toward the target inflated by the
//! buffer fraction, at the weekly rate scaled by the secondary ratio. The
//! ideal line is the midpoint of the two.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::models::DailyAggregate;

pub const DEFAULT_WEEKLY_RATE: f64 = 0.0055;
pub const DEFAULT_BUFFER_FRACTION: f64 = 0.0075;
pub const DEFAULT_SECONDARY_RATIO: f64 = 0.6;

/// Number of leading days used to establish the start value.
/// Corridor series are undefined over this window.
pub const WARM_UP_DAYS: usize = 6;

/// Minimum history needed before any corridor value exists
pub const MIN_CORRIDOR_DAYS: usize = WARM_UP_DAYS + 1;

/// User goal settings driving the corridor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    /// Value the user is working toward
    pub target_value: f64,

    /// Per-step convergence rate toward the target
    pub weekly_rate: f64,

    /// Half-width of the initial band, as a fraction of the start value
    pub buffer_fraction: f64,

    /// Damping applied to the ceiling's convergence rate
    pub secondary_ratio: f64,
}

impl Default for GoalConfig {
    fn default() -> Self {
        GoalConfig {
            target_value: 0.0,
            weekly_rate: DEFAULT_WEEKLY_RATE,
            buffer_fraction: DEFAULT_BUFFER_FRACTION,
            secondary_ratio: DEFAULT_SECONDARY_RATIO,
        }
    }
}

impl GoalConfig {
    pub fn new(target_value: f64) -> Self {
        GoalConfig {
            target_value,
            ..GoalConfig::default()
        }
    }

    /// Replace unset rates with their defaults.
    ///
    /// `weekly_rate` and `buffer_fraction` are unset only when non-finite; zero
    /// is a legitimate choice for both. `secondary_ratio` treats zero as unset
    /// too.
    pub fn with_fallbacks(self) -> Self {
        fn finite_or(value: f64, default: f64) -> f64 {
            if value.is_finite() {
                value
            } else {
                default
            }
        }

        let secondary_ratio = if self.secondary_ratio == 0.0 {
            DEFAULT_SECONDARY_RATIO
        } else {
            finite_or(self.secondary_ratio, DEFAULT_SECONDARY_RATIO)
        };

        GoalConfig {
            target_value: self.target_value,
            weekly_rate: finite_or(self.weekly_rate, DEFAULT_WEEKLY_RATE),
            buffer_fraction: finite_or(self.buffer_fraction, DEFAULT_BUFFER_FRACTION),
            secondary_ratio,
        }
    }

    /// Reject settings the corridor recurrence cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("target_value", self.target_value),
            ("weekly_rate", self.weekly_rate),
            ("buffer_fraction", self.buffer_fraction),
            ("secondary_ratio", self.secondary_ratio),
        ];

        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::InvalidGoal {
                    field: field.to_string(),
                    reason: format!("{} is not a finite number", value),
                });
            }
        }

        for (field, value) in &fields[1..] {
            if *value < 0.0 {
                return Err(ConfigError::InvalidGoal {
                    field: field.to_string(),
                    reason: format!("must not be negative, got {}", value),
                });
            }
        }

        Ok(())
    }

    /// Target the ceiling converges toward
    pub fn adjusted_target(&self) -> f64 {
        self.target_value + self.target_value * self.buffer_fraction
    }
}

/// Floor, ceiling and ideal series aligned with the daily aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    pub floor: Vec<Option<f64>>,
    pub ceiling: Vec<Option<f64>>,
    pub ideal: Vec<Option<f64>>,
}

impl Corridor {
    pub fn is_empty(&self) -> bool {
        self.floor.is_empty()
    }

    pub fn len(&self) -> usize {
        self.floor.len()
    }

    /// Where a value sits relative to the band on a given day
    pub fn position(&self, index: usize, value: f64) -> Option<CorridorPosition> {
        let floor = self.floor.get(index).copied().flatten()?;
        let ceiling = self.ceiling.get(index).copied().flatten()?;

        Some(if value < floor {
            CorridorPosition::BelowFloor
        } else if value > ceiling {
            CorridorPosition::AboveCeiling
        } else {
            CorridorPosition::Within
        })
    }
}

/// Position of a value relative to the corridor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorridorPosition {
    BelowFloor,
    Within,
    AboveCeiling,
}

impl CorridorPosition {
    pub fn description(&self) -> &'static str {
        match self {
            CorridorPosition::BelowFloor => "below the floor",
            CorridorPosition::Within => "inside the corridor",
            CorridorPosition::AboveCeiling => "above the ceiling",
        }
    }
}

/// Corridor over daily aggregates; empty series with fewer than seven days
pub fn compute_corridor(aggregates: &[DailyAggregate], goal: &GoalConfig) -> Corridor {
    let values: Vec<f64> = aggregates.iter().map(DailyAggregate::value).collect();
    compute_corridor_values(&values, goal)
}

/// Corridor over a plain sequence of daily values
pub fn compute_corridor_values(values: &[f64], goal: &GoalConfig) -> Corridor {
    if values.len() < MIN_CORRIDOR_DAYS {
        debug!(days = values.len(), "Not enough days for a goal corridor");
        return Corridor::default();
    }

    let start_value = values[..WARM_UP_DAYS].iter().sum::<f64>() / WARM_UP_DAYS as f64;
    let adjusted_target = goal.adjusted_target();

    let mut floor = vec![None; WARM_UP_DAYS];
    let mut ceiling = vec![None; WARM_UP_DAYS];
    floor.reserve(values.len() - WARM_UP_DAYS);
    ceiling.reserve(values.len() - WARM_UP_DAYS);

    let mut previous_floor = start_value - start_value * goal.buffer_fraction * 0.5;
    let mut previous_ceiling = start_value + start_value * goal.buffer_fraction * 0.5;
    floor.push(Some(previous_floor));
    ceiling.push(Some(previous_ceiling));

    for _ in MIN_CORRIDOR_DAYS..values.len() {
        previous_floor -= (previous_floor - goal.target_value) * goal.weekly_rate;
        previous_ceiling -=
            (previous_ceiling - adjusted_target) * goal.weekly_rate * goal.secondary_ratio;
        floor.push(Some(previous_floor));
        ceiling.push(Some(previous_ceiling));
    }

    let ideal = floor
        .iter()
        .zip(&ceiling)
        .map(|(f, c)| match (f, c) {
            (Some(f), Some(c)) => Some((f + c) / 2.0),
            _ => None,
        })
        .collect();

    debug!(
        days = values.len(),
        start_value,
        target = goal.target_value,
        "Computed goal corridor"
    );

    Corridor {
        floor,
        ceiling,
        ideal,
    }
}
