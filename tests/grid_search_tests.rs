//! End-to-end grid-search runs over synthetic collaborators
//!
//! Covers row-count accounting per grid point, empty-join handling,
//! partial-failure attribution, collaborator error propagation,
//! determinism, and append-only rerun semantics.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dendro_eval::grid::{GridSearchConfig, GridSearchDriver};
use dendro_eval::sources::{pca_column_names, ClimateSource, DayOfYear, FeatureSource};
use dendro_eval::store::ResultStore;
use dendro_eval::table::Table;
use dendro_eval::{Error, Result};

// =============================================================================
// Synthetic collaborators
// =============================================================================

/// Deterministic climate source: values depend only on the request
/// arguments, so identical runs see identical data.
struct SyntheticClimate {
    years: Vec<i32>,
    targets: Vec<DayOfYear>,
}

impl ClimateSource for SyntheticClimate {
    fn get_climate(
        &self,
        _stat: &str,
        day_window: usize,
        year_window: usize,
        _p_threshold: f64,
    ) -> Result<Table> {
        let mut rng = StdRng::seed_from_u64((year_window * 367 + day_window) as u64);
        let columns: Vec<String> = self.targets.iter().map(|d| d.column_name()).collect();
        let mut values = Vec::with_capacity(self.years.len() * self.targets.len());
        for &year in &self.years {
            for day in &self.targets {
                let base = (f64::from(year) * 0.013
                    + f64::from(day.month * 31 + day.day) * 0.07)
                    .sin();
                values.push(base + rng.gen_range(-0.05..0.05));
            }
        }
        Table::new(self.years.clone(), columns, values)
    }
}

/// Deterministic feature source with distinct per-component frequencies,
/// keeping every design matrix full-rank.
struct SyntheticFeatures {
    years: Vec<i32>,
}

impl FeatureSource for SyntheticFeatures {
    fn get_pca_features(&self, components: usize, year_window: usize) -> Result<Table> {
        let columns = pca_column_names(components);
        let mut values = Vec::with_capacity(self.years.len() * components);
        for &year in &self.years {
            for c in 1..=components {
                #[allow(clippy::cast_precision_loss)]
                let freq = 0.11 + c as f64 * 0.37;
                #[allow(clippy::cast_precision_loss)]
                let shift = year_window as f64 * 0.3;
                values.push((f64::from(year - 1900) * freq + shift).sin());
            }
        }
        Table::new(self.years.clone(), columns, values)
    }
}

struct FailingClimate;

impl ClimateSource for FailingClimate {
    fn get_climate(&self, _: &str, _: usize, _: usize, _: f64) -> Result<Table> {
        Err(Error::Collaborator(
            "no columns survived significance filtering".to_string(),
        ))
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn years(range: std::ops::RangeInclusive<i32>) -> Vec<i32> {
    range.collect()
}

fn targets(days: &[(u32, u32)]) -> Vec<DayOfYear> {
    days.iter()
        .map(|&(m, d)| DayOfYear::new(m, d).unwrap())
        .collect()
}

fn small_config() -> GridSearchConfig {
    GridSearchConfig {
        year_window_range: 1..3,
        component_range: 2..4,
        run_label: "TEST".to_string(),
        max_workers: 3,
        ..GridSearchConfig::default()
    }
}

// =============================================================================
// Row accounting
// =============================================================================

#[test]
fn test_one_row_per_grid_point_and_target() {
    init_tracing();
    let climate = SyntheticClimate {
        years: years(1950..=1980),
        targets: targets(&[(6, 1), (6, 15), (7, 1)]),
    };
    let features = SyntheticFeatures {
        years: years(1950..=1980),
    };
    let config = small_config();
    let mut store = ResultStore::open_in_memory(&config.table_name).unwrap();

    let report = GridSearchDriver::new(config)
        .run(&climate, &features, &mut store)
        .unwrap();

    // 2 windows x 2 component counts x 3 targets.
    assert_eq!(report.rows_written, 12);
    assert!(report.failures.is_empty());
    assert_eq!(store.count().unwrap(), 12);
    assert_eq!(store.count_for_label("TEST").unwrap(), 12);

    let rows = store.fetch_all().unwrap();
    assert!(rows.iter().all(|r| r.run_label == "TEST"));
    assert!(rows.iter().all(|r| r.stat == "Temperature"));
    assert!(rows.iter().all(|r| r.day_window == 1));
    // Coefficient vector length tracks the component count (plus intercept).
    assert!(rows
        .iter()
        .all(|r| r.details.coeffs.len() == r.components + 1));
    // Predictions cover every joined year.
    assert!(rows.iter().all(|r| r.details.predictions_test.len() == 31));
}

#[test]
fn test_full_year_of_targets_yields_365_rows() {
    const MONTH_LENGTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut all_days = Vec::new();
    for (m, &len) in MONTH_LENGTHS.iter().enumerate() {
        for d in 1..=len {
            all_days.push((m as u32 + 1, d));
        }
    }
    assert_eq!(all_days.len(), 365);

    let climate = SyntheticClimate {
        years: years(1950..=1980),
        targets: targets(&all_days),
    };
    let features = SyntheticFeatures {
        years: years(1950..=1980),
    };
    let config = GridSearchConfig {
        year_window_range: 5..6,
        component_range: 3..4,
        run_label: "FULL_YEAR".to_string(),
        ..GridSearchConfig::default()
    };
    let mut store = ResultStore::open_in_memory(&config.table_name).unwrap();

    let report = GridSearchDriver::new(config)
        .run(&climate, &features, &mut store)
        .unwrap();

    assert_eq!(report.rows_written, 365);
    assert!(report.failures.is_empty());
    assert_eq!(store.count().unwrap(), 365);
}

// =============================================================================
// Edge cases and failures
// =============================================================================

#[test]
fn test_empty_join_persists_zero_rows_without_error() {
    let climate = SyntheticClimate {
        years: years(1950..=1980),
        targets: targets(&[(6, 1)]),
    };
    // No overlap with the climate years.
    let features = SyntheticFeatures {
        years: years(1800..=1830),
    };
    let config = small_config();
    let mut store = ResultStore::open_in_memory(&config.table_name).unwrap();

    let report = GridSearchDriver::new(config)
        .run(&climate, &features, &mut store)
        .unwrap();

    assert_eq!(report.rows_written, 0);
    assert!(report.failures.is_empty());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_failing_targets_are_attributed_without_losing_successes() {
    init_tracing();
    // 5 rows, 2 components: a fold needs at least 3 training rows.
    // Windows 0 and 1 keep 4 rows per fold; windows 2 and 3 drop the
    // middle folds to 2 rows and fail with InsufficientData.
    let climate = SyntheticClimate {
        years: years(1950..=1954),
        targets: targets(&[(6, 1), (7, 1)]),
    };
    let features = SyntheticFeatures {
        years: years(1950..=1954),
    };
    let config = GridSearchConfig {
        year_window_range: 0..4,
        component_range: 2..3,
        run_label: "PARTIAL".to_string(),
        ..GridSearchConfig::default()
    };
    let mut store = ResultStore::open_in_memory(&config.table_name).unwrap();

    let report = GridSearchDriver::new(config)
        .run(&climate, &features, &mut store)
        .unwrap();

    // Successes: windows 0 and 1, two targets each.
    assert_eq!(report.rows_written, 4);
    assert_eq!(store.count().unwrap(), 4);

    // Failures: windows 2 and 3, two targets each, each attributed.
    assert_eq!(report.failures.len(), 4);
    for failure in &report.failures {
        assert!(failure.year_window == 2 || failure.year_window == 3);
        assert_eq!(failure.components, 2);
        assert!(failure.target == "06-01" || failure.target == "07-01");
        assert!(matches!(failure.error, Error::InsufficientData { .. }));
    }
}

/// Climate source whose table carries one column violating the
/// `"MM-DD"` naming contract.
struct MisnamedColumnClimate {
    years: Vec<i32>,
}

impl ClimateSource for MisnamedColumnClimate {
    fn get_climate(&self, _: &str, _: usize, _: usize, _: f64) -> Result<Table> {
        let columns = vec!["06-01".to_string(), "mean_temp".to_string()];
        let values: Vec<f64> = self
            .years
            .iter()
            .flat_map(|&y| {
                let x = f64::from(y) * 0.013;
                [x.sin(), x.cos()]
            })
            .collect();
        Table::new(self.years.clone(), columns, values)
    }
}

#[test]
fn test_malformed_target_column_fails_that_column_only() {
    let climate = MisnamedColumnClimate {
        years: years(1950..=1980),
    };
    let features = SyntheticFeatures {
        years: years(1950..=1980),
    };
    let config = GridSearchConfig {
        year_window_range: 1..2,
        component_range: 2..3,
        run_label: "MISNAMED".to_string(),
        ..GridSearchConfig::default()
    };
    let mut store = ResultStore::open_in_memory(&config.table_name).unwrap();

    let report = GridSearchDriver::new(config)
        .run(&climate, &features, &mut store)
        .unwrap();

    // The well-named target is evaluated and persisted.
    assert_eq!(report.rows_written, 1);
    assert_eq!(store.count().unwrap(), 1);

    // The misnamed one is a per-target collaborator failure.
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.year_window, 1);
    assert_eq!(failure.components, 2);
    assert_eq!(failure.target, "mean_temp");
    assert!(matches!(failure.error, Error::Collaborator(_)));
}

#[test]
fn test_collaborator_error_propagates_unmodified() {
    let features = SyntheticFeatures {
        years: years(1950..=1980),
    };
    let config = small_config();
    let mut store = ResultStore::open_in_memory(&config.table_name).unwrap();

    let r = GridSearchDriver::new(config).run(&FailingClimate, &features, &mut store);
    assert!(matches!(r, Err(Error::Collaborator(_))));
    assert_eq!(store.count().unwrap(), 0);
}

// =============================================================================
// Determinism and reruns
// =============================================================================

#[test]
fn test_identical_runs_persist_identical_rows() {
    let climate = SyntheticClimate {
        years: years(1950..=1980),
        targets: targets(&[(6, 1), (6, 15), (7, 1)]),
    };
    let features = SyntheticFeatures {
        years: years(1950..=1980),
    };

    let mut stores = Vec::new();
    for _ in 0..2 {
        let config = small_config();
        let mut store = ResultStore::open_in_memory(&config.table_name).unwrap();
        GridSearchDriver::new(config)
            .run(&climate, &features, &mut store)
            .unwrap();
        stores.push(store);
    }

    let first = stores[0].fetch_all().unwrap();
    let second = stores[1].fetch_all().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_rerunning_with_same_label_appends_duplicates() {
    let climate = SyntheticClimate {
        years: years(1950..=1980),
        targets: targets(&[(6, 1)]),
    };
    let features = SyntheticFeatures {
        years: years(1950..=1980),
    };
    let config = small_config();
    let mut store = ResultStore::open_in_memory(&config.table_name).unwrap();

    let driver = GridSearchDriver::new(config);
    driver.run(&climate, &features, &mut store).unwrap();
    driver.run(&climate, &features, &mut store).unwrap();

    // Append-only: no uniqueness constraint deduplicates reruns.
    assert_eq!(store.count().unwrap(), 8);
    assert_eq!(store.count_for_label("TEST").unwrap(), 8);
}
