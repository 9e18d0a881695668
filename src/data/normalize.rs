//! Daily time-series normalization
//!
//! Canonicalizes the (player_id, date) pair of any daily table: trims
//! ids, parses dates to calendar days, drops rows that fail to parse,
//! and stably sorts by (id, date) so each athlete's history is a
//! contiguous, date-ascending slice.

use crate::data::table::Table;
use crate::{PipelineError, Result};
use chrono::{NaiveDate, NaiveDateTime};

/// How many offending raw values to keep for error messages
const BAD_SAMPLE_LIMIT: usize = 5;

/// Columns and date convention for a daily table
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub id_col: String,
    pub date_col: String,
    /// Treat ambiguous numeric dates as day-first (e.g. 20.03.2020)
    pub dayfirst: bool,
}

impl NormalizeOptions {
    pub fn new(id_col: &str, date_col: &str) -> Self {
        NormalizeOptions {
            id_col: id_col.to_string(),
            date_col: date_col.to_string(),
            dayfirst: false,
        }
    }

    pub fn dayfirst(mut self, dayfirst: bool) -> Self {
        self.dayfirst = dayfirst;
        self
    }
}

/// A normalized daily table: the raw table (ids trimmed, dates
/// rewritten as `%Y-%m-%d`) plus parsed key vectors in row order.
#[derive(Debug, Clone)]
pub struct DailyTable {
    pub table: Table,
    pub ids: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub id_idx: usize,
    pub date_idx: usize,
}

/// Normalization result, including what was silently dropped so strict
/// callers can refuse the input instead.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub daily: DailyTable,
    /// Rows dropped for a blank or whitespace-only id
    pub dropped_ids: usize,
    /// Rows dropped for an unparsable date cell
    pub dropped_dates: usize,
    pub bad_dates: Vec<String>,
}

impl Normalized {
    /// Total rows dropped for any reason.
    pub fn dropped(&self) -> usize {
        self.dropped_ids + self.dropped_dates
    }
}

/// Parse one cell to a calendar day, time-of-day discarded.
///
/// ISO forms are tried first; purely numeric forms fall back to the
/// day-first or month-first convention.
pub fn parse_day(raw: &str, dayfirst: bool) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    let ambiguous: [&str; 3] = if dayfirst {
        ["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"]
    } else {
        ["%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"]
    };
    for fmt in ambiguous {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    None
}

/// Normalize a daily table: trim ids, parse dates, drop rows whose id
/// or date fails to parse, stable-sort by (id, date).
///
/// Dropped rows are reported, not fatal; the caller decides whether to
/// tolerate them (feature building) or abort (label building).
pub fn normalize(table: Table, opts: &NormalizeOptions, context: &str) -> Result<Normalized> {
    let id_idx = table.require_column(&opts.id_col, context)?;
    let date_idx = table.require_column(&opts.date_col, context)?;

    let mut kept = Table::new(table.headers().to_vec());
    let mut ids: Vec<String> = Vec::with_capacity(table.len());
    let mut dates: Vec<NaiveDate> = Vec::with_capacity(table.len());
    let mut dropped_ids = 0usize;
    let mut dropped_dates = 0usize;
    let mut bad_dates: Vec<String> = Vec::new();

    for row in table.rows() {
        let id = row[id_idx].trim();
        let date = parse_day(&row[date_idx], opts.dayfirst);
        match (id.is_empty(), date) {
            (false, Some(date)) => {
                let mut row = row.clone();
                row[id_idx] = id.to_string();
                row[date_idx] = date.format("%Y-%m-%d").to_string();
                kept.push_row(row);
                ids.push(id.to_string());
                dates.push(date);
            }
            _ => {
                if date.is_none() {
                    dropped_dates += 1;
                    if bad_dates.len() < BAD_SAMPLE_LIMIT {
                        bad_dates.push(row[date_idx].clone());
                    }
                } else {
                    dropped_ids += 1;
                }
            }
        }
    }

    // Stable sort keeps pre-dedup staging order for tied keys
    let mut order: Vec<usize> = (0..ids.len()).collect();
    order.sort_by(|&a, &b| ids[a].cmp(&ids[b]).then(dates[a].cmp(&dates[b])));

    kept.reorder_rows(&order);
    let ids = order.iter().map(|&i| ids[i].clone()).collect();
    let dates = order.iter().map(|&i| dates[i]).collect();

    Ok(Normalized {
        daily: DailyTable {
            table: kept,
            ids,
            dates,
            id_idx,
            date_idx,
        },
        dropped_ids,
        dropped_dates,
        bad_dates,
    })
}

/// Normalize and refuse any row whose date fails to parse
/// (`UnparsableDateError`). Blank-id rows are dropped as in the
/// lenient path.
pub fn normalize_strict(table: Table, opts: &NormalizeOptions, context: &str) -> Result<DailyTable> {
    let normalized = normalize(table, opts, context)?;
    if normalized.dropped_dates > 0 {
        return Err(PipelineError::UnparsableDate {
            table: context.to_string(),
            count: normalized.dropped_dates,
            sample: normalized.bad_dates,
        });
    }
    Ok(normalized.daily)
}

impl DailyTable {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Fail with `DuplicateKeyError` if any (id, date) key repeats.
    /// Duplicates mean an upstream aggregation step was skipped; this
    /// crate refuses to guess an aggregation rule.
    pub fn ensure_unique_keys(&self, context: &str) -> Result<()> {
        let mut count = 0usize;
        for i in 1..self.len() {
            if self.ids[i] == self.ids[i - 1] && self.dates[i] == self.dates[i - 1] {
                count += 1;
            }
        }
        if count > 0 {
            return Err(PipelineError::DuplicateKey {
                table: context.to_string(),
                count,
            });
        }
        Ok(())
    }

    /// Contiguous `[start, end)` row ranges, one per athlete.
    pub fn partitions(&self) -> Vec<(usize, usize)> {
        let mut parts = Vec::new();
        let n = self.len();
        let mut start = 0;
        for i in 1..n {
            if self.ids[i] != self.ids[i - 1] {
                parts.push((start, i));
                start = i;
            }
        }
        if n > 0 {
            parts.push((start, n));
        }
        parts
    }
}
