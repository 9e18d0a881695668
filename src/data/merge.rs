//! Daily merge of objective and wellness tables
//!
//! The objective table is long (player_id, date, session columns);
//! wellness questionnaires arrive wide, one date column plus one column
//! per athlete. Each wellness table is melted to long form and joined
//! onto the objective table on (player_id, date).

use crate::data::normalize::{parse_day, DailyTable};
use crate::data::table::{is_missing, Table};
use crate::{JoinKind, PipelineError, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// A melted wellness table: one numeric value per (player_id, date).
#[derive(Debug, Clone)]
pub struct WellnessTable {
    pub value_col: String,
    values: HashMap<(String, NaiveDate), f64>,
}

impl WellnessTable {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get(&self, id: &str, date: NaiveDate) -> Option<f64> {
        self.values.get(&(id.to_string(), date)).copied()
    }
}

/// Melt a wide wellness table (first column: day-first date; remaining
/// columns: athlete ids) to long (player_id, date, value).
///
/// Missing and non-numeric cells are dropped; a repeated
/// (player_id, date) key is fatal.
pub fn melt_wellness(table: &Table, value_col: &str, context: &str) -> Result<WellnessTable> {
    if table.column_count() < 2 {
        return Err(PipelineError::InvalidConfig(format!(
            "{}: wellness table needs a date column plus at least one athlete column",
            context
        )));
    }

    let mut values: HashMap<(String, NaiveDate), f64> = HashMap::new();
    let mut duplicates = 0usize;

    for row in table.rows() {
        // Wellness exports use day-first dates (e.g. 20.03.2020)
        let Some(date) = parse_day(&row[0], true) else {
            continue;
        };
        for (col, header) in table.headers().iter().enumerate().skip(1) {
            let id = header.trim();
            let cell = &row[col];
            if id.is_empty() || is_missing(cell) {
                continue;
            }
            let Ok(value) = cell.trim().parse::<f64>() else {
                continue;
            };
            if values.insert((id.to_string(), date), value).is_some() {
                duplicates += 1;
            }
        }
    }

    if duplicates > 0 {
        return Err(PipelineError::DuplicateKey {
            table: context.to_string(),
            count: duplicates,
        });
    }

    Ok(WellnessTable {
        value_col: value_col.to_string(),
        values,
    })
}

/// Join wellness values onto the normalized objective table.
///
/// Output column order: player_id, date, remaining objective columns,
/// then one column per wellness table; rows sorted by (player_id, date).
pub fn merge_daily(
    objective: &DailyTable,
    wellness: &[WellnessTable],
    how: JoinKind,
) -> Result<Table> {
    let mut headers = vec![
        objective.table.headers()[objective.id_idx].clone(),
        objective.table.headers()[objective.date_idx].clone(),
    ];
    let other_cols: Vec<usize> = (0..objective.table.column_count())
        .filter(|&c| c != objective.id_idx && c != objective.date_idx)
        .collect();
    for &c in &other_cols {
        headers.push(objective.table.headers()[c].clone());
    }
    for w in wellness {
        headers.push(w.value_col.clone());
    }

    // Key -> objective row; BTreeMap keeps (id, date) output order for
    // outer joins, matching the objective table's own sort.
    let mut keys: BTreeMap<(String, NaiveDate), Option<usize>> = BTreeMap::new();
    for i in 0..objective.len() {
        keys.insert((objective.ids[i].clone(), objective.dates[i]), Some(i));
    }
    if how == JoinKind::Outer {
        for w in wellness {
            for key in w.values.keys() {
                keys.entry(key.clone()).or_insert(None);
            }
        }
    }

    let mut out = Table::new(headers);
    for ((id, date), row_idx) in keys {
        let looked_up: Vec<Option<f64>> = wellness.iter().map(|w| w.get(&id, date)).collect();
        if how == JoinKind::Inner && looked_up.iter().any(Option::is_none) {
            continue;
        }

        let mut row = vec![id, date.format("%Y-%m-%d").to_string()];
        match row_idx {
            Some(i) => {
                for &c in &other_cols {
                    row.push(objective.table.value(i, c).to_string());
                }
            }
            None => row.extend(std::iter::repeat(String::new()).take(other_cols.len())),
        }
        for value in looked_up {
            row.push(value.map(|v| v.to_string()).unwrap_or_default());
        }
        out.push_row(row);
    }

    Ok(out)
}
