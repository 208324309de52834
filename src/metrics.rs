//! Derived metrics for forecast and execution records.
//!
//! Every function here is total: in-domain input always yields a value, and
//! anything undefined (zero planned hours, an empty history, a NaN) comes
//! back as `None` instead of a panic, an infinity or a silent zero.
//!
//! Complexity score:
//!
//! ```text
//! score = w_task * task_norm + w_hours * hours_norm + w_desc * desc_norm
//! ```
//!
//! with each component min-max scaled over the loaded population and the
//! weights summing to 1.0, so the score stays in [0, 1].

use crate::error::{DashboardError, Result};
use crate::types::{ComplexityLevel, IntervalCategory, PerformanceTier};
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that the weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityWeights {
    pub task: f64,
    pub hours: f64,
    pub description: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            task: 0.40,
            hours: 0.40,
            description: 0.20,
        }
    }
}

impl ComplexityWeights {
    pub fn validate(&self) -> Result<()> {
        let parts = [self.task, self.hours, self.description];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DashboardError::InvalidConfig(format!(
                "complexity weights must be non-negative, got {:?}",
                self
            )));
        }
        let total: f64 = parts.iter().sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(DashboardError::InvalidConfig(format!(
                "complexity weights must sum to 1.0, got {}",
                total
            )));
        }
        Ok(())
    }
}

/// Lower bounds of the Medium, High and Very High buckets. Each bound
/// belongs to the upper bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityThresholds {
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            medium: 0.25,
            high: 0.50,
            very_high: 0.75,
        }
    }
}

impl ComplexityThresholds {
    pub fn validate(&self) -> Result<()> {
        let ok = [self.medium, self.high, self.very_high]
            .iter()
            .all(|t| t.is_finite())
            && self.medium < self.high
            && self.high < self.very_high;
        if ok {
            Ok(())
        } else {
            Err(DashboardError::InvalidConfig(format!(
                "complexity thresholds must be finite and strictly ascending, got {:?}",
                self
            )))
        }
    }
}

/// Decision table for [`performance_tier`]. Completion bounds are fractions,
/// deviation bounds are absolute percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub excellent_completion: f64,
    pub excellent_max_deviation: f64,
    pub acceptable_completion: f64,
    pub acceptable_max_deviation: f64,
    pub at_risk_completion: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            excellent_completion: 0.95,
            excellent_max_deviation: 10.0,
            acceptable_completion: 0.80,
            acceptable_max_deviation: 25.0,
            at_risk_completion: 0.60,
        }
    }
}

impl TierThresholds {
    pub fn validate(&self) -> Result<()> {
        let completion_ok = (0.0..=1.0).contains(&self.at_risk_completion)
            && self.at_risk_completion <= self.acceptable_completion
            && self.acceptable_completion <= self.excellent_completion
            && self.excellent_completion <= 1.0;
        let deviation_ok = self.excellent_max_deviation >= 0.0
            && self.excellent_max_deviation <= self.acceptable_max_deviation;
        if completion_ok && deviation_ok {
            Ok(())
        } else {
            Err(DashboardError::InvalidConfig(format!(
                "tier thresholds are not ordered: {:?}",
                self
            )))
        }
    }
}

/// Ten years.
pub const MAX_GRACE_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub weights: ComplexityWeights,
    pub complexity_thresholds: ComplexityThresholds,
    pub tiers: TierThresholds,
    /// Scale labor hours with `ln(1 + h)` before normalising so a handful of
    /// shutdown PMs do not flatten everything else to zero.
    pub log_scale_hours: bool,
    /// Days after the due date that still count as on time.
    pub on_time_grace_days: i64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            weights: ComplexityWeights::default(),
            complexity_thresholds: ComplexityThresholds::default(),
            tiers: TierThresholds::default(),
            log_scale_hours: true,
            on_time_grace_days: 0,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.complexity_thresholds.validate()?;
        self.tiers.validate()?;
        if !(0..=MAX_GRACE_DAYS).contains(&self.on_time_grace_days) {
            return Err(DashboardError::InvalidConfig(format!(
                "on_time_grace_days must be within 0..={}",
                MAX_GRACE_DAYS
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Min-max scaler fitted once over a population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    min: f64,
    max: f64,
}

impl Normalizer {
    /// Fit over the finite values of `series`. An empty population fits a
    /// degenerate scaler that maps everything to 0.
    pub fn fit<I>(series: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let (min, max) = series
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if min.is_finite() && max.is_finite() {
            Self { min, max }
        } else {
            Self { min: 0.0, max: 0.0 }
        }
    }

    /// Scale `x` into [0, 1]. Zero variance maps to 0; values outside the
    /// fitted range are clamped.
    pub fn scale(&self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        let range = self.max - self.min;
        if range <= 0.0 {
            return Some(0.0);
        }
        Some(((x - self.min) / range).clamp(0.0, 1.0))
    }
}

/// Min-max scale `x` relative to the population `series`.
pub fn normalize(x: f64, series: &[f64]) -> Option<f64> {
    Normalizer::fit(series.iter().copied()).scale(x)
}

/// Labor-hours magnitude before normalisation.
pub fn hours_magnitude(hours: f64, log_scale: bool) -> Option<f64> {
    if !hours.is_finite() || hours < 0.0 {
        return None;
    }
    Some(if log_scale { hours.ln_1p() } else { hours })
}

/// Description length in characters, whitespace-trimmed.
pub fn description_length(description: &str) -> f64 {
    description.trim().chars().count() as f64
}

// ---------------------------------------------------------------------------
// Complexity
// ---------------------------------------------------------------------------

/// Weighted sum of the three normalised components. Missing or out-of-range
/// components make the score missing.
pub fn complexity_score(
    task_norm: Option<f64>,
    hours_norm: Option<f64>,
    desc_norm: Option<f64>,
    weights: &ComplexityWeights,
) -> Option<f64> {
    let in_unit = |v: Option<f64>| v.filter(|x| (0.0..=1.0).contains(x));
    let task = in_unit(task_norm)?;
    let hours = in_unit(hours_norm)?;
    let desc = in_unit(desc_norm)?;
    let score = weights.task * task + weights.hours * hours + weights.description * desc;
    Some(score.clamp(0.0, 1.0))
}

pub fn complexity_level(score: f64, thresholds: &ComplexityThresholds) -> Option<ComplexityLevel> {
    if score.is_nan() {
        return None;
    }
    let level = if score >= thresholds.very_high {
        ComplexityLevel::VeryHigh
    } else if score >= thresholds.high {
        ComplexityLevel::High
    } else if score >= thresholds.medium {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::Low
    };
    Some(level)
}

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

const DAYS_PER_WEEK: f64 = 7.0;
const DAYS_PER_MONTH: f64 = 30.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Bucket a frequency expressed in days.
pub fn interval_from_days(days: f64) -> IntervalCategory {
    if !days.is_finite() || days <= 0.0 {
        return IntervalCategory::Unknown;
    }
    match days {
        d if d <= 1.0 => IntervalCategory::Daily,
        d if d <= 7.0 => IntervalCategory::Weekly,
        d if d <= 14.0 => IntervalCategory::BiWeekly,
        d if d <= 31.0 => IntervalCategory::Monthly,
        d if d <= 92.0 => IntervalCategory::Quarterly,
        d if d <= 184.0 => IntervalCategory::SemiAnnual,
        d if d <= 366.0 => IntervalCategory::Annual,
        _ => IntervalCategory::MultiYear,
    }
}

/// Map a raw frequency to a category.
///
/// Understands category labels (`"Weekly"`, `"semi-annual"`), one-letter
/// codes (`D`, `W`, `M`, `Q`, `Y`), `"<n> <unit>"` pairs (`"2 WEEKS"`,
/// `"6 months"`, `"8 hrs"`) and bare day counts. Everything else is
/// `Unknown`.
pub fn interval_category(raw: &str) -> IntervalCategory {
    let text = raw.trim().to_ascii_lowercase();
    if text.is_empty() {
        return IntervalCategory::Unknown;
    }
    let compact: String = text.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if let Some(category) = keyword_category(&compact) {
        return category;
    }

    let mut tokens = text.split_whitespace();
    let (count_tok, unit_tok) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(a), None, None) => split_glued(a),
        (Some(a), Some(b), None) => (a.to_string(), b.to_string()),
        _ => return IntervalCategory::Unknown,
    };
    let Ok(count) = count_tok.parse::<f64>() else {
        return IntervalCategory::Unknown;
    };
    match unit_days(&unit_tok) {
        Some(per_unit) => interval_from_days(count * per_unit),
        None => IntervalCategory::Unknown,
    }
}

fn keyword_category(compact: &str) -> Option<IntervalCategory> {
    let category = match compact {
        "daily" | "d" | "everyday" => IntervalCategory::Daily,
        "weekly" | "w" => IntervalCategory::Weekly,
        "biweekly" | "fortnightly" => IntervalCategory::BiWeekly,
        "monthly" | "m" => IntervalCategory::Monthly,
        "quarterly" | "q" => IntervalCategory::Quarterly,
        "semiannual" | "semiannually" | "biannual" | "halfyearly" => IntervalCategory::SemiAnnual,
        "annual" | "annually" | "yearly" | "y" => IntervalCategory::Annual,
        "multiyear" => IntervalCategory::MultiYear,
        "unknown" | "other" => IntervalCategory::Unknown,
        _ => return None,
    };
    Some(category)
}

// "14d" / "3months" / "90" -> ("14", "d") / ("3", "months") / ("90", "days")
fn split_glued(token: &str) -> (String, String) {
    let idx = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    let (num, unit) = token.split_at(idx);
    let unit = if unit.is_empty() { "days" } else { unit };
    (num.to_string(), unit.to_string())
}

fn unit_days(unit: &str) -> Option<f64> {
    let days = match unit.trim_end_matches('.') {
        "h" | "hr" | "hrs" | "hour" | "hours" => 1.0 / 24.0,
        "d" | "day" | "days" => 1.0,
        "w" | "wk" | "wks" | "week" | "weeks" => DAYS_PER_WEEK,
        "m" | "mo" | "mon" | "month" | "months" => DAYS_PER_MONTH,
        "y" | "yr" | "yrs" | "year" | "years" => DAYS_PER_YEAR,
        _ => return None,
    };
    Some(days)
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Outcome of one historical occurrence of a PM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceOutcome {
    pub completed: bool,
    /// Only meaningful when `completed` is set.
    pub on_time: bool,
}

/// Fraction of scheduled occurrences that were completed. `None` when the
/// group has no history, so "never scheduled" differs from "never done".
pub fn completion_rate(instances: &[InstanceOutcome]) -> Option<f64> {
    let done = instances.iter().filter(|i| i.completed).count();
    rate(done as u32, instances.len() as u32)
}

/// Fraction of completed occurrences finished within the due window.
/// `None` when nothing was completed.
pub fn on_time_rate(instances: &[InstanceOutcome]) -> Option<f64> {
    let done = instances.iter().filter(|i| i.completed).count();
    let on_time = instances.iter().filter(|i| i.completed && i.on_time).count();
    rate(on_time as u32, done as u32)
}

/// Rate from pre-aggregated counts. A zero denominator or a numerator
/// larger than the denominator is out of domain and yields `None`.
pub fn rate(numerator: u32, denominator: u32) -> Option<f64> {
    if denominator == 0 || numerator > denominator {
        return None;
    }
    Some(numerator as f64 / denominator as f64)
}

/// Accept an externally computed rate only when it lies in [0, 1].
pub fn bounded_rate(value: Option<f64>) -> Option<f64> {
    value.filter(|v| (0.0..=1.0).contains(v))
}

/// Signed overrun percentage: positive means more hours than planned.
pub fn hour_deviation_pct(planned: Option<f64>, actual: Option<f64>) -> Option<f64> {
    let planned = planned.filter(|p| p.is_finite() && *p > 0.0)?;
    let actual = actual.filter(|a| a.is_finite() && *a >= 0.0)?;
    Some((actual - planned) / planned * 100.0)
}

/// Classify a grouping by completion and hour deviation.
///
/// Checks run top to bottom, first hit wins:
///
/// | tier       | completion                  | abs(deviation)                 |
/// |------------|-----------------------------|--------------------------------|
/// | No Data    | missing                     | any                            |
/// | Excellent  | >= excellent_completion     | <= excellent_max_deviation     |
/// | Acceptable | >= acceptable_completion    | <= acceptable_max_deviation    |
/// | At Risk    | >= at_risk_completion       | any                            |
/// | Failing    | otherwise                   | any                            |
///
/// A missing deviation passes the deviation column.
pub fn performance_tier(
    completion_rate: Option<f64>,
    hour_deviation_pct: Option<f64>,
    thresholds: &TierThresholds,
) -> PerformanceTier {
    let Some(completion) = completion_rate.filter(|c| c.is_finite()) else {
        return PerformanceTier::NoData;
    };
    let deviation = hour_deviation_pct.filter(|d| d.is_finite()).map(f64::abs);
    let deviation_within = |limit: f64| deviation.map_or(true, |d| d <= limit);

    if completion >= thresholds.excellent_completion
        && deviation_within(thresholds.excellent_max_deviation)
    {
        PerformanceTier::Excellent
    } else if completion >= thresholds.acceptable_completion
        && deviation_within(thresholds.acceptable_max_deviation)
    {
        PerformanceTier::Acceptable
    } else if completion >= thresholds.at_risk_completion {
        PerformanceTier::AtRisk
    } else {
        PerformanceTier::Failing
    }
}
