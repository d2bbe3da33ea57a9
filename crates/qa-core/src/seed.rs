use crate::error::Result;
use crate::record::{CodeRabbitFindings, Layer, QuinnFindings, RunMetadata, RunRecord};
use crate::store::MetricsStore;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// Number of days of history, ending today.
    pub days: u32,
    /// Pipeline runs generated per active day.
    pub runs_per_day: u32,
    pub skip_weekends: bool,
    /// Compute the summary without persisting anything.
    pub dry_run: bool,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            days: 30,
            runs_per_day: 3,
            skip_weekends: false,
            dry_run: false,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub generated: usize,
    /// Record counts keyed by layer number.
    pub per_layer: BTreeMap<u8, usize>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate synthetic gate history for demos and dashboard testing.
///
/// Pass rates trend upward over the window (teams improve), and layer-2
/// records carry CodeRabbit/Quinn sub-records so downstream consumers see
/// the full record shape. A dry run produces the identical summary while
/// leaving the store untouched.
pub fn seed(store: &MetricsStore, opts: &SeedOptions) -> Result<SeedSummary> {
    let mut rng = match opts.rng_seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let records = generate(&mut rng, opts);

    let mut per_layer: BTreeMap<u8, usize> = BTreeMap::new();
    for record in &records {
        *per_layer.entry(record.layer.number()).or_default() += 1;
    }
    let summary = SeedSummary {
        generated: records.len(),
        per_layer,
        first_date: records
            .first()
            .and_then(|r| r.timestamp)
            .map(|ts| ts.date_naive()),
        last_date: records
            .last()
            .and_then(|r| r.timestamp)
            .map(|ts| ts.date_naive()),
        dry_run: opts.dry_run,
    };

    if !opts.dry_run {
        store.append_many(records)?;
    }
    Ok(summary)
}

fn generate(rng: &mut StdRng, opts: &SeedOptions) -> Vec<RunRecord> {
    let today = Utc::now().date_naive();
    let mut records = Vec::new();

    for day_offset in (0..opts.days).rev() {
        let date = today - Duration::days(day_offset as i64);
        if opts.skip_weekends
            && matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
        {
            continue;
        }
        // Quality improves toward the present.
        let progress = 1.0 - day_offset as f64 / opts.days.max(1) as f64;
        let pass_rate = 0.6 + 0.35 * progress;

        for run in 0..opts.runs_per_day {
            let ts = timestamp(date, 9 + run * 3, rng);
            records.push(layer1_record(rng, ts, pass_rate));
            records.push(layer2_record(rng, ts + Duration::minutes(20), pass_rate));
            // Roughly one sign-off per day once automation is green.
            if run == 0 && rng.gen_bool(pass_rate) {
                records.push(layer3_record(rng, ts + Duration::hours(2)));
            }
        }
    }
    records
}

fn timestamp(date: NaiveDate, hour: u32, rng: &mut StdRng) -> DateTime<Utc> {
    let minute = rng.gen_range(0..60);
    date.and_hms_opt(hour.min(23), minute, 0)
        .unwrap_or_else(|| date.and_hms_opt(12, 0, 0).expect("valid fixed time"))
        .and_utc()
}

fn seeded_metadata(rng: &mut StdRng) -> RunMetadata {
    RunMetadata::new("seed").with("story", format!("SEED-{}", rng.gen_range(1..100)))
}

fn layer1_record(rng: &mut StdRng, ts: DateTime<Utc>, pass_rate: f64) -> RunRecord {
    let mut record = RunRecord::new(Layer::One, rng.gen_bool(pass_rate), rng.gen_range(800..15_000));
    record.timestamp = Some(ts);
    record.metadata = seeded_metadata(rng);
    record
}

fn layer2_record(rng: &mut StdRng, ts: DateTime<Utc>, pass_rate: f64) -> RunRecord {
    let critical = if rng.gen_bool(0.1) { 1 } else { 0 };
    let high = rng.gen_range(0..2);
    let medium = rng.gen_range(0..4);
    let low = rng.gen_range(0..6);
    let coderabbit = CodeRabbitFindings::new(critical, high, medium, low);

    let passed = critical + high == 0 && rng.gen_bool(pass_rate);
    let mut record = RunRecord::new(Layer::Two, passed, rng.gen_range(30_000..300_000));
    record.timestamp = Some(ts);
    record.findings_count = coderabbit.findings_count();
    record.coderabbit = Some(coderabbit);
    record.quinn = Some(QuinnFindings {
        findings_count: rng.gen_range(0..5),
        top_categories: vec!["testing".to_string(), "naming".to_string()],
    });
    record.metadata = seeded_metadata(rng);
    record
}

fn layer3_record(rng: &mut StdRng, ts: DateTime<Utc>) -> RunRecord {
    let mut record = RunRecord::new(Layer::Three, true, 0);
    record.timestamp = Some(ts);
    record.metadata = seeded_metadata(rng);
    record
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HistoryFilter;
    use tempfile::TempDir;

    fn opts(dry_run: bool) -> SeedOptions {
        SeedOptions {
            days: 10,
            runs_per_day: 2,
            dry_run,
            rng_seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn seed_persists_history() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());
        let summary = seed(&store, &opts(false)).unwrap();
        assert!(summary.generated > 0);
        assert_eq!(
            store.history(HistoryFilter::default()).count(),
            summary.generated
        );
        assert!(summary.per_layer[&1] >= 20);
        assert_eq!(summary.per_layer[&1], summary.per_layer[&2]);
    }

    #[test]
    fn dry_run_same_shape_no_disk() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());
        let dry = seed(&store, &opts(true)).unwrap();
        let real = seed(&store, &opts(false)).unwrap();
        assert_eq!(dry.generated, real.generated);
        assert_eq!(dry.per_layer, real.per_layer);
        assert!(dry.dry_run);
    }

    #[test]
    fn dry_run_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());
        seed(&store, &opts(true)).unwrap();
        assert!(!dir.path().join(".qa/metrics.json").exists());
        assert_eq!(store.history(HistoryFilter::default()).count(), 0);
    }

    #[test]
    fn skip_weekends_produces_no_weekend_records() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());
        let options = SeedOptions {
            days: 21,
            runs_per_day: 1,
            skip_weekends: true,
            dry_run: false,
            rng_seed: Some(7),
        };
        seed(&store, &options).unwrap();
        for record in store.history(HistoryFilter::default()) {
            let weekday = record.timestamp.unwrap().date_naive().weekday();
            assert!(!matches!(weekday, Weekday::Sat | Weekday::Sun));
        }
    }

    #[test]
    fn seeded_coderabbit_records_hold_the_invariant() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());
        seed(&store, &opts(false)).unwrap();
        for record in store.history(HistoryFilter::default().layer(Layer::Two)) {
            let cr = record.coderabbit.expect("layer-2 seed has coderabbit");
            assert_eq!(
                cr.findings_count(),
                cr.critical() + cr.high() + cr.medium() + cr.low()
            );
            assert_eq!(record.findings_count, cr.findings_count());
        }
    }

    #[test]
    fn timestamps_are_chronological_per_day() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());
        seed(&store, &opts(false)).unwrap();
        let dates: Vec<_> = store
            .history(HistoryFilter::default())
            .map(|r| r.timestamp.unwrap().date_naive())
            .collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted, "days emitted oldest first");
    }
}
