//! Survival labels (T, E) for daily observations
//!
//! For every (athlete, date) row: E=1 with T = days to the next episode
//! start, or E=0 with T = days to the athlete's censor date (their last
//! observed day) when no episode is reachable. Events past the censor
//! date are unobservable and never produce labels.

use crate::data::events::EventLog;
use crate::data::normalize::DailyTable;
use crate::data::table::Table;
use crate::labels::episodes::episode_starts;
use crate::Result;
use chrono::NaiveDate;

/// Configuration for one labelling run
#[derive(Debug, Clone)]
pub struct LabelConfig {
    /// Events within this many days of the previous one share an episode
    pub gap_days: i64,
    /// Count an event on the observation day itself as the next event
    pub include_same_day: bool,
}

/// First index with `episodes[i] >= d` (inclusive) or `> d` (exclusive).
fn next_episode(episodes: &[NaiveDate], d: NaiveDate, include_same_day: bool) -> Option<NaiveDate> {
    let idx = if include_same_day {
        episodes.partition_point(|&e| e < d)
    } else {
        episodes.partition_point(|&e| e <= d)
    };
    episodes.get(idx).copied()
}

/// Append `T` and `E` columns to a normalized, duplicate-free daily
/// table. All-or-nothing: any validation failure aborts with no output.
pub fn build_survival_labels(
    daily: &DailyTable,
    events: &EventLog,
    cfg: &LabelConfig,
) -> Result<Table> {
    daily.ensure_unique_keys("daily table")?;

    let by_entity = events.dates_by_entity();
    let mut t_col: Vec<String> = Vec::with_capacity(daily.len());
    let mut e_col: Vec<String> = Vec::with_capacity(daily.len());
    let mut n_events = 0usize;

    for (start, end) in daily.partitions() {
        let id = daily.ids[start].as_str();
        // Dates ascend within a partition, so the censor is the last row
        let censor = daily.dates[end - 1];

        let episodes: Vec<NaiveDate> = match by_entity.get(id) {
            Some(dates) => {
                let observed: Vec<NaiveDate> =
                    dates.iter().copied().filter(|d| *d <= censor).collect();
                episode_starts(&observed, cfg.gap_days)?
            }
            None => Vec::new(),
        };

        for i in start..end {
            let d = daily.dates[i];
            match next_episode(&episodes, d, cfg.include_same_day) {
                Some(episode) => {
                    t_col.push((episode - d).num_days().to_string());
                    e_col.push("1".to_string());
                    n_events += 1;
                }
                None => {
                    t_col.push((censor - d).num_days().to_string());
                    e_col.push("0".to_string());
                }
            }
        }
    }

    log::info!(
        "labelled {} rows, E=1 on {} of them",
        daily.len(),
        n_events
    );

    let mut out = daily.table.clone();
    out.push_column("T".to_string(), t_col);
    out.push_column("E".to_string(), e_col);
    Ok(out)
}
