//! Markov weather with smoothed transitions.
//!
//! A discrete condition set, a per-condition speed multiplier and
//! extra stamina drain, and a transition matrix sampled every 45-90
//! seconds. Condition changes interpolate linearly over a short
//! transition window so speed never jumps discontinuously.
//!
//! All randomness comes through an injected `Rng` and all timing
//! through an explicit `now` timestamp, so the system is fully
//! deterministic under test.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weather condition set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Clear,
    Clouds,
    RainLight,
    Rain,
    Storm,
    Fog,
    Wind,
    Heat,
    Cold,
}

impl Condition {
    pub const ALL: [Condition; 9] = [
        Condition::Clear,
        Condition::Clouds,
        Condition::RainLight,
        Condition::Rain,
        Condition::Storm,
        Condition::Fog,
        Condition::Wind,
        Condition::Heat,
        Condition::Cold,
    ];

    /// Parse the snake_case wire name used by the weather provider.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clear" => Some(Self::Clear),
            "clouds" => Some(Self::Clouds),
            "rain_light" => Some(Self::RainLight),
            "rain" => Some(Self::Rain),
            "storm" => Some(Self::Storm),
            "fog" => Some(Self::Fog),
            "wind" => Some(Self::Wind),
            "heat" => Some(Self::Heat),
            "cold" => Some(Self::Cold),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Clouds => "clouds",
            Self::RainLight => "rain_light",
            Self::Rain => "rain",
            Self::Storm => "storm",
            Self::Fog => "fog",
            Self::Wind => "wind",
            Self::Heat => "heat",
            Self::Cold => "cold",
        }
    }
}

/// Per-condition base speed multipliers and extra stamina drain.
/// Immutable once constructed; injected into the weather system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherTables {
    multipliers: HashMap<Condition, f64>,
    drains: HashMap<Condition, f64>,
}

impl Default for WeatherTables {
    fn default() -> Self {
        let multipliers = HashMap::from([
            (Condition::Clear, 1.00),
            (Condition::Clouds, 0.98),
            (Condition::RainLight, 0.90),
            (Condition::Rain, 0.85),
            (Condition::Storm, 0.75),
            (Condition::Fog, 0.88),
            (Condition::Wind, 0.92),
            (Condition::Heat, 0.90),
            (Condition::Cold, 0.92),
        ]);
        let drains = HashMap::from([
            (Condition::Clear, 0.0),
            (Condition::Clouds, 0.0),
            (Condition::RainLight, 0.05),
            (Condition::Rain, 0.1),
            (Condition::Storm, 0.3),
            (Condition::Fog, 0.0),
            (Condition::Wind, 0.1),
            (Condition::Heat, 0.2),
            (Condition::Cold, 0.05),
        ]);
        Self { multipliers, drains }
    }
}

impl WeatherTables {
    /// Base speed multiplier for a condition (1.0 if unlisted).
    pub fn speed_multiplier(&self, condition: Condition) -> f64 {
        self.multipliers.get(&condition).copied().unwrap_or(1.0)
    }

    /// Base extra stamina drain for a condition (0.0 if unlisted).
    pub fn stamina_drain(&self, condition: Condition) -> f64 {
        self.drains.get(&condition).copied().unwrap_or(0.0)
    }
}

/// Declared conditions, initial state, and the Markov transition
/// matrix. Rows are filtered to declared conditions and normalized to
/// sum 1.0 by [`WeatherConfig::normalized`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub conditions: Vec<Condition>,
    pub initial_condition: Condition,
    pub initial_intensity: f64,
    pub transitions: HashMap<Condition, Vec<(Condition, f64)>>,
}

impl Default for WeatherConfig {
    /// Hardcoded fallback used when the weather provider is
    /// unreachable or malformed.
    fn default() -> Self {
        use Condition::*;
        let transitions = HashMap::from([
            (Clear, vec![(Clear, 0.5), (Clouds, 0.3), (Wind, 0.2)]),
            (Clouds, vec![(Clear, 0.3), (Clouds, 0.4), (RainLight, 0.3)]),
            (RainLight, vec![(Clouds, 0.4), (RainLight, 0.4), (Rain, 0.2)]),
            (Rain, vec![(Clouds, 0.4), (Rain, 0.4), (Storm, 0.2)]),
            (Storm, vec![(Rain, 0.5), (Clouds, 0.3), (Storm, 0.2)]),
            (Fog, vec![(Fog, 0.5), (Clouds, 0.3), (Clear, 0.2)]),
            (Wind, vec![(Wind, 0.5), (Clouds, 0.3), (Clear, 0.2)]),
            (Heat, vec![(Heat, 0.5), (Clear, 0.3), (Clouds, 0.2)]),
            (Cold, vec![(Cold, 0.5), (Clear, 0.3), (Clouds, 0.2)]),
        ]);
        Self {
            conditions: Condition::ALL.to_vec(),
            initial_condition: Clear,
            initial_intensity: 0.5,
            transitions,
        }
    }
}

impl WeatherConfig {
    /// Drop transition entries referencing undeclared conditions and
    /// normalize each remaining row to sum 1.0. Rows that end up
    /// empty or zero-weight are removed (the sampler falls back to a
    /// uniform pick for them). Rows are sorted into declaration order
    /// so cumulative sampling is stable regardless of how the source
    /// map iterated.
    pub fn normalized(mut self) -> Self {
        let declared: Vec<Condition> = self.conditions.clone();
        self.transitions = self
            .transitions
            .into_iter()
            .filter(|(from, _)| declared.contains(from))
            .filter_map(|(from, row)| {
                let mut row: Vec<(Condition, f64)> = row
                    .into_iter()
                    .filter(|(to, _)| declared.contains(to))
                    .collect();
                row.sort_by_key(|(to, _)| {
                    Condition::ALL.iter().position(|c| c == to)
                });
                let total: f64 = row.iter().map(|(_, p)| p).sum();
                if total <= 0.0 {
                    return None;
                }
                let row = row.into_iter().map(|(to, p)| (to, p / total)).collect();
                Some((from, row))
            })
            .collect();
        self
    }
}

/// Length of the linear interpolation window after a change.
const TRANSITION_DURATION: f64 = 3.0;

/// Bounds for scheduling the next condition change.
const CHANGE_INTERVAL: (f64, f64) = (45.0, 90.0);

/// Markov weather state machine with smoothed transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSystem {
    tables: WeatherTables,
    config: WeatherConfig,
    condition: Condition,
    intensity: f64,
    next_change: f64,
    transitioning: bool,
    previous_condition: Condition,
    /// Effective multiplier at the moment the last change fired
    /// (interpolation origin).
    previous_multiplier: f64,
    previous_drain: f64,
    transition_started: f64,
}

impl WeatherSystem {
    pub fn new(
        tables: WeatherTables,
        config: WeatherConfig,
        now: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let config = config.normalized();
        let condition = config.initial_condition;
        let intensity = config.initial_intensity.clamp(0.0, 1.0);
        Self {
            tables,
            config,
            condition,
            intensity,
            next_change: now + rng.gen_range(CHANGE_INTERVAL.0..CHANGE_INTERVAL.1),
            transitioning: false,
            previous_condition: condition,
            previous_multiplier: 1.0,
            previous_drain: 0.0,
            transition_started: 0.0,
        }
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn previous_condition(&self) -> Condition {
        self.previous_condition
    }

    /// Seconds until the next scheduled change (never negative).
    pub fn time_until_change(&self, now: f64) -> f64 {
        (self.next_change - now).max(0.0)
    }

    /// Advance the state machine: finish any completed transition and
    /// fire a condition change when its timer elapses.
    pub fn advance(&mut self, now: f64, rng: &mut impl Rng) {
        if self.transitioning && self.transition_progress(now) >= 1.0 {
            self.transitioning = false;
        }
        if now >= self.next_change {
            self.change(now, rng);
        }
    }

    fn change(&mut self, now: f64, rng: &mut impl Rng) {
        // Snapshot the currently observable values as the
        // interpolation origin; this keeps the output continuous even
        // when a change fires mid-transition.
        self.previous_multiplier = self.speed_multiplier(now);
        self.previous_drain = self.extra_stamina_drain(now);
        self.previous_condition = self.condition;

        self.condition = self.sample_next(rng);
        self.intensity = rng.gen_range(0.2..1.0);
        self.transitioning = true;
        self.transition_started = now;
        self.next_change = now + rng.gen_range(CHANGE_INTERVAL.0..CHANGE_INTERVAL.1);
    }

    /// Sample the successor condition from the current row, or
    /// uniformly over the declared set when the row is missing.
    fn sample_next(&self, rng: &mut impl Rng) -> Condition {
        match self.config.transitions.get(&self.condition) {
            Some(row) if !row.is_empty() => {
                let roll: f64 = rng.gen_range(0.0..1.0);
                let mut cumulative = 0.0;
                for &(to, p) in row {
                    cumulative += p;
                    if roll < cumulative {
                        return to;
                    }
                }
                // Floating-point slack: fall through to the last entry.
                row[row.len() - 1].0
            }
            _ => {
                let pool: &[Condition] = if self.config.conditions.is_empty() {
                    &Condition::ALL
                } else {
                    &self.config.conditions
                };
                *pool.choose(rng).unwrap_or(&self.condition)
            }
        }
    }

    fn transition_progress(&self, now: f64) -> f64 {
        ((now - self.transition_started) / TRANSITION_DURATION).clamp(0.0, 1.0)
    }

    /// Steady-state effective multiplier for the current condition:
    /// intensity deepens the penalty of already-slow conditions.
    fn steady_multiplier(&self) -> f64 {
        let base = self.tables.speed_multiplier(self.condition);
        base * (1.0 - 0.5 * self.intensity * (1.0 - base))
    }

    fn steady_drain(&self) -> f64 {
        self.tables.stamina_drain(self.condition) * (1.0 + self.intensity)
    }

    /// Current speed multiplier, interpolated while transitioning.
    pub fn speed_multiplier(&self, now: f64) -> f64 {
        let target = self.steady_multiplier();
        if !self.transitioning {
            return target;
        }
        let t = self.transition_progress(now);
        self.previous_multiplier + (target - self.previous_multiplier) * t
    }

    /// Current extra stamina drain per move, interpolated while
    /// transitioning.
    pub fn extra_stamina_drain(&self, now: f64) -> f64 {
        let target = self.steady_drain();
        if !self.transitioning {
            return target;
        }
        let t = self.transition_progress(now);
        self.previous_drain + (target - self.previous_drain) * t
    }
}
