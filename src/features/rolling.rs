//! Rolling-window features over per-athlete timelines
//!
//! Trailing row-count windows per athlete, not calendar windows: a gap
//! in the diary does not widen or narrow the window. Each requested
//! statistic adds one `roll{window}_{stat}_{col}` column per numeric
//! feature column.

use crate::data::normalize::DailyTable;
use crate::data::table::{is_missing, Table};
use crate::{PipelineError, Result, Stat};
use std::collections::HashSet;

/// Configuration for one rolling-feature run
#[derive(Debug, Clone)]
pub struct RollingConfig {
    pub id_col: String,
    pub date_col: String,
    pub window: usize,
    /// Non-missing observations required in a window to emit a value
    pub min_periods: usize,
    pub stats: Vec<Stat>,
    /// Columns never treated as features (ids, dates, provenance tags)
    pub exclude: HashSet<String>,
}

impl RollingConfig {
    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(PipelineError::InvalidConfig(
                "window must be >= 1".to_string(),
            ));
        }
        if self.min_periods == 0 {
            return Err(PipelineError::InvalidConfig(
                "min_periods must be >= 1".to_string(),
            ));
        }
        if self.min_periods > self.window {
            return Err(PipelineError::InvalidConfig(format!(
                "min_periods ({}) must be <= window ({})",
                self.min_periods, self.window
            )));
        }
        if self.stats.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "no statistics requested".to_string(),
            ));
        }
        Ok(())
    }
}

/// A feature column coerced to numeric, missing cells preserved.
struct NumericColumn {
    name: String,
    values: Vec<Option<f64>>,
}

/// Classify candidate columns: a column is a numeric feature iff every
/// non-missing cell parses as a float and at least one cell is present.
/// Anything else passes through the output untouched.
fn numeric_columns(daily: &DailyTable, cfg: &RollingConfig) -> Vec<NumericColumn> {
    let mut columns = Vec::new();
    'cols: for (idx, name) in daily.table.headers().iter().enumerate() {
        if name == &cfg.id_col || name == &cfg.date_col || cfg.exclude.contains(name) {
            continue;
        }
        let mut values = Vec::with_capacity(daily.len());
        let mut seen = false;
        for row in daily.table.rows() {
            let cell = &row[idx];
            if is_missing(cell) {
                values.push(None);
            } else if let Ok(v) = cell.trim().parse::<f64>() {
                values.push(Some(v));
                seen = true;
            } else {
                log::debug!("column {:?} is not numeric, skipping", name);
                continue 'cols;
            }
        }
        if seen {
            columns.push(NumericColumn {
                name: name.clone(),
                values,
            });
        }
    }
    columns
}

fn window_stat(values: &[Option<f64>], stat: Stat, min_periods: usize) -> Option<f64> {
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    if present.len() < min_periods {
        return None;
    }
    let n = present.len() as f64;
    match stat {
        Stat::Mean => Some(present.iter().sum::<f64>() / n),
        Stat::Max => present.iter().copied().reduce(f64::max),
        Stat::Std => {
            // Population std (ddof = 0): a single observation gives 0
            let mean = present.iter().sum::<f64>() / n;
            let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            Some(var.sqrt())
        }
    }
}

/// Append rolling statistics to a normalized daily table.
///
/// Row order and count are unchanged; every selected statistic adds one
/// column per numeric feature column, named `roll{window}_{stat}_{col}`.
/// Fails before any computation on malformed configuration or an empty
/// feature set.
pub fn build_rolling_features(daily: &DailyTable, cfg: &RollingConfig) -> Result<Table> {
    cfg.validate()?;

    let columns = numeric_columns(daily, cfg);
    if columns.is_empty() {
        return Err(PipelineError::InvalidConfig(
            "no numeric feature columns remain after exclusions".to_string(),
        ));
    }
    log::info!(
        "rolling window={} min_periods={} over {} feature columns",
        cfg.window,
        cfg.min_periods,
        columns.len()
    );

    let partitions = daily.partitions();
    let mut out = daily.table.clone();

    // Statistics in canonical order regardless of request order
    for stat in Stat::ALL.iter().copied().filter(|s| cfg.stats.contains(s)) {
        for column in &columns {
            let mut rolled: Vec<String> = Vec::with_capacity(daily.len());
            for &(start, end) in &partitions {
                for i in start..end {
                    let lo = (i + 1).saturating_sub(cfg.window).max(start);
                    let value = window_stat(&column.values[lo..=i], stat, cfg.min_periods);
                    rolled.push(value.map(|v| v.to_string()).unwrap_or_default());
                }
            }
            out.push_column(
                format!("roll{}_{}_{}", cfg.window, stat, column.name),
                rolled,
            );
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::{normalize, NormalizeOptions};

    fn daily(rows: &[(&str, &str, &str)]) -> DailyTable {
        let mut t = Table::new(vec![
            "player_id".to_string(),
            "date".to_string(),
            "load".to_string(),
        ]);
        for (id, date, load) in rows {
            t.push_row(vec![id.to_string(), date.to_string(), load.to_string()]);
        }
        normalize(t, &NormalizeOptions::new("player_id", "date"), "daily")
            .unwrap()
            .daily
    }

    fn config(window: usize, min_periods: usize, stats: &[Stat]) -> RollingConfig {
        RollingConfig {
            id_col: "player_id".to_string(),
            date_col: "date".to_string(),
            window,
            min_periods,
            stats: stats.to_vec(),
            exclude: HashSet::new(),
        }
    }

    fn seq_daily() -> DailyTable {
        daily(&[
            ("a", "2020-01-01", "1"),
            ("a", "2020-01-02", "2"),
            ("a", "2020-01-03", "3"),
            ("a", "2020-01-04", "4"),
            ("a", "2020-01-05", "5"),
            ("a", "2020-01-06", "6"),
            ("a", "2020-01-07", "7"),
        ])
    }

    fn column(table: &Table, name: &str) -> Vec<String> {
        let idx = table.column_index(name).unwrap();
        table.rows().iter().map(|r| r[idx].clone()).collect()
    }

    #[test]
    fn test_window_one_is_identity() {
        let d = seq_daily();
        let out = build_rolling_features(&d, &config(1, 1, &Stat::ALL)).unwrap();

        assert_eq!(out.len(), d.len());
        for (i, row) in out.rows().iter().enumerate() {
            let raw: f64 = row[out.column_index("load").unwrap()].parse().unwrap();
            let mean: f64 = column(&out, "roll1_mean_load")[i].parse().unwrap();
            let max: f64 = column(&out, "roll1_max_load")[i].parse().unwrap();
            let std: f64 = column(&out, "roll1_std_load")[i].parse().unwrap();
            assert_eq!(mean, raw);
            assert_eq!(max, raw);
            assert_eq!(std, 0.0);
        }
    }

    #[test]
    fn test_trailing_mean_min_periods_one() {
        let d = seq_daily();
        let out = build_rolling_features(&d, &config(3, 1, &[Stat::Mean])).unwrap();
        let means: Vec<f64> = column(&out, "roll3_mean_load")
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(means, vec![1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_min_periods_blanks_short_windows() {
        let d = seq_daily();
        let out = build_rolling_features(&d, &config(3, 3, &[Stat::Mean])).unwrap();
        let means = column(&out, "roll3_mean_load");
        assert_eq!(means[0], "");
        assert_eq!(means[1], "");
        assert_eq!(means[2], "2");
        assert_eq!(means[6], "6");
    }

    #[test]
    fn test_population_std() {
        let d = daily(&[
            ("a", "2020-01-01", "2"),
            ("a", "2020-01-02", "4"),
        ]);
        let out = build_rolling_features(&d, &config(2, 1, &[Stat::Std])).unwrap();
        let stds: Vec<f64> = column(&out, "roll2_std_load")
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();
        // Single-element window: 0; two elements 2,4: population std = 1
        assert_eq!(stds, vec![0.0, 1.0]);
    }

    #[test]
    fn test_windows_do_not_cross_athletes() {
        let d = daily(&[
            ("a", "2020-01-01", "10"),
            ("a", "2020-01-02", "10"),
            ("b", "2020-01-01", "2"),
        ]);
        let out = build_rolling_features(&d, &config(3, 1, &[Stat::Mean])).unwrap();
        let means = column(&out, "roll3_mean_load");
        // b's first row must not see a's history
        assert_eq!(means[2], "2");
    }

    #[test]
    fn test_date_gaps_do_not_widen_window() {
        // Rows 10 days apart still form a trailing row-count window
        let d = daily(&[
            ("a", "2020-01-01", "1"),
            ("a", "2020-01-11", "3"),
        ]);
        let out = build_rolling_features(&d, &config(2, 2, &[Stat::Mean])).unwrap();
        let means = column(&out, "roll2_mean_load");
        assert_eq!(means[1], "2");
    }

    #[test]
    fn test_missing_values_respect_min_periods() {
        let d = daily(&[
            ("a", "2020-01-01", ""),
            ("a", "2020-01-02", "4"),
            ("a", "2020-01-03", ""),
        ]);
        let out = build_rolling_features(&d, &config(2, 1, &[Stat::Mean])).unwrap();
        let means = column(&out, "roll2_mean_load");
        assert_eq!(means[0], ""); // no observations yet
        assert_eq!(means[1], "4");
        assert_eq!(means[2], "4"); // one non-missing value in window
    }

    #[test]
    fn test_non_numeric_columns_excluded() {
        let mut t = Table::new(vec![
            "player_id".to_string(),
            "date".to_string(),
            "load".to_string(),
            "venue".to_string(),
        ]);
        t.push_row(vec![
            "a".to_string(),
            "2020-01-01".to_string(),
            "1".to_string(),
            "home".to_string(),
        ]);
        let d = normalize(t, &NormalizeOptions::new("player_id", "date"), "daily")
            .unwrap()
            .daily;
        let out = build_rolling_features(&d, &config(2, 1, &[Stat::Mean])).unwrap();

        assert!(out.column_index("roll2_mean_load").is_some());
        assert!(out.column_index("roll2_mean_venue").is_none());
        // Passthrough column untouched
        assert_eq!(out.value(0, out.column_index("venue").unwrap()), "home");
    }

    #[test]
    fn test_empty_feature_set_is_fatal() {
        let d = daily(&[("a", "2020-01-01", "home")]); // "load" not numeric
        assert!(matches!(
            build_rolling_features(&d, &config(2, 1, &[Stat::Mean])),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bad_config_is_fatal() {
        let d = seq_daily();
        assert!(build_rolling_features(&d, &config(0, 1, &[Stat::Mean])).is_err());
        assert!(build_rolling_features(&d, &config(3, 0, &[Stat::Mean])).is_err());
        assert!(build_rolling_features(&d, &config(3, 1, &[])).is_err());
    }

    #[test]
    fn test_min_periods_above_window_is_fatal() {
        // A window can never hold more observations than rows, so this
        // would only ever emit all-missing columns
        let d = seq_daily();
        assert!(matches!(
            build_rolling_features(&d, &config(3, 5, &[Stat::Mean])),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_deterministic_output() {
        let d = seq_daily();
        let cfg = config(3, 1, &Stat::ALL);
        let a = build_rolling_features(&d, &cfg).unwrap();
        let b = build_rolling_features(&d, &cfg).unwrap();
        assert_eq!(a, b);
    }
}
