use crate::record::{Layer, RunRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerAggregate {
    pub runs: u64,
    pub passed: u64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Long-horizon aggregate over the full run history.
///
/// Recomputed from scratch on every request, so it is always consistent with
/// the history at the cost of O(history) per query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_runs: u64,
    /// Keyed by layer number (1..=3).
    pub layers: BTreeMap<u8, LayerAggregate>,
    /// Daily pass rate across all layers.
    pub pass_rate_trend: Vec<TrendPoint>,
    /// Daily share of failures caught by the automated layers (1 and 2)
    /// rather than human review. Days with no failures score 1.0.
    pub auto_catch_trend: Vec<TrendPoint>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

pub fn compute(history: &[RunRecord]) -> MetricsSnapshot {
    let mut snapshot = MetricsSnapshot {
        total_runs: history.len() as u64,
        ..Default::default()
    };

    for record in history {
        let agg = snapshot
            .layers
            .entry(record.layer.number())
            .or_default();
        agg.runs += 1;
        if record.passed {
            agg.passed += 1;
        }
    }
    for agg in snapshot.layers.values_mut() {
        agg.pass_rate = ratio(agg.passed, agg.runs);
    }

    #[derive(Default)]
    struct Day {
        runs: u64,
        passed: u64,
        failures: u64,
        auto_failures: u64,
    }

    let mut days: BTreeMap<NaiveDate, Day> = BTreeMap::new();
    for record in history {
        // Records without a timestamp never made it through the store; skip
        // them rather than guessing a date.
        let Some(ts) = record.timestamp else { continue };
        let day = days.entry(ts.date_naive()).or_default();
        day.runs += 1;
        if record.passed {
            day.passed += 1;
        } else {
            day.failures += 1;
            if matches!(record.layer, Layer::One | Layer::Two) {
                day.auto_failures += 1;
            }
        }
    }

    for (date, day) in days {
        snapshot.pass_rate_trend.push(TrendPoint {
            date,
            value: ratio(day.passed, day.runs),
        });
        snapshot.auto_catch_trend.push(TrendPoint {
            date,
            value: if day.failures == 0 {
                1.0
            } else {
                ratio(day.auto_failures, day.failures)
            },
        });
    }

    snapshot
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(layer: Layer, passed: bool, day: u32) -> RunRecord {
        let mut r = RunRecord::new(layer, passed, 1000);
        r.timestamp = Some(Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap());
        r
    }

    #[test]
    fn empty_history_is_empty_snapshot() {
        let snapshot = compute(&[]);
        assert_eq!(snapshot.total_runs, 0);
        assert!(snapshot.layers.is_empty());
        assert!(snapshot.pass_rate_trend.is_empty());
    }

    #[test]
    fn per_layer_pass_rates() {
        let history = vec![
            record(Layer::One, true, 1),
            record(Layer::One, false, 1),
            record(Layer::Two, true, 2),
        ];
        let snapshot = compute(&history);
        assert_eq!(snapshot.total_runs, 3);
        assert_eq!(snapshot.layers[&1].runs, 2);
        assert!((snapshot.layers[&1].pass_rate - 0.5).abs() < f64::EPSILON);
        assert!((snapshot.layers[&2].pass_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trend_is_daily_and_ordered() {
        let history = vec![
            record(Layer::One, true, 2),
            record(Layer::One, false, 1),
            record(Layer::One, true, 1),
        ];
        let snapshot = compute(&history);
        assert_eq!(snapshot.pass_rate_trend.len(), 2);
        assert!(snapshot.pass_rate_trend[0].date < snapshot.pass_rate_trend[1].date);
        // Aug 1: one pass, one fail.
        assert!((snapshot.pass_rate_trend[0].value - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn auto_catch_counts_automated_failures_only() {
        let history = vec![
            record(Layer::One, false, 1),
            record(Layer::Three, false, 1),
        ];
        let snapshot = compute(&history);
        assert!((snapshot.auto_catch_trend[0].value - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn auto_catch_is_one_when_nothing_failed() {
        let history = vec![record(Layer::One, true, 1)];
        let snapshot = compute(&history);
        assert!((snapshot.auto_catch_trend[0].value - 1.0).abs() < f64::EPSILON);
    }
}
