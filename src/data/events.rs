//! Adverse-event log normalization
//!
//! Injury and illness logs arrive with their own column names and date
//! conventions. This module renames them to canonical
//! (entity_id, date), parses, deduplicates and unions them into one
//! ascending event log.

use crate::data::normalize::parse_day;
use crate::data::table::Table;
use crate::{PipelineError, Result};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Column names and date convention shared by all event sources
#[derive(Debug, Clone)]
pub struct EventColumns {
    pub id_col: String,
    pub date_col: String,
    pub dayfirst: bool,
}

/// One adverse-event occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub entity_id: String,
    pub date: NaiveDate,
}

/// Canonical event table: unique (entity_id, date), ascending.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-entity sorted date lists, for episode compression.
    pub fn dates_by_entity(&self) -> HashMap<&str, Vec<NaiveDate>> {
        let mut map: HashMap<&str, Vec<NaiveDate>> = HashMap::new();
        for record in &self.records {
            map.entry(record.entity_id.as_str())
                .or_default()
                .push(record.date);
        }
        map
    }
}

/// Normalize and union one or more raw event tables.
///
/// Each `(label, table)` pair is validated against `columns`; rows with
/// an empty id or an unparsable date are dropped. The union is
/// deduplicated on (entity_id, date) and sorted ascending, so the same
/// event reported by two sources collapses to one record.
pub fn normalize_events(sources: &[(String, Table)], columns: &EventColumns) -> Result<EventLog> {
    if sources.is_empty() {
        return Err(PipelineError::InvalidConfig(
            "event source selection yields no event tables".to_string(),
        ));
    }

    let mut records: Vec<EventRecord> = Vec::new();
    for (label, table) in sources {
        let id_idx = table.require_column(&columns.id_col, label)?;
        let date_idx = table.require_column(&columns.date_col, label)?;

        let before = records.len();
        for row in table.rows() {
            let id = row[id_idx].trim();
            if id.is_empty() {
                continue;
            }
            if let Some(date) = parse_day(&row[date_idx], columns.dayfirst) {
                records.push(EventRecord {
                    entity_id: id.to_string(),
                    date,
                });
            }
        }
        log::debug!("{}: {} event rows kept", label, records.len() - before);
    }

    records.sort_by(|a, b| a.entity_id.cmp(&b.entity_id).then(a.date.cmp(&b.date)));
    records.dedup();

    Ok(EventLog { records })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event_table(rows: &[(&str, &str)]) -> Table {
        let mut t = Table::new(vec!["player_name".to_string(), "timestamp".to_string()]);
        for (id, date) in rows {
            t.push_row(vec![id.to_string(), date.to_string()]);
        }
        t
    }

    fn columns() -> EventColumns {
        EventColumns {
            id_col: "player_name".to_string(),
            date_col: "timestamp".to_string(),
            dayfirst: false,
        }
    }

    #[test]
    fn test_union_dedups_across_sources() {
        let injury = event_table(&[("a", "2020-01-05"), ("a", "2020-01-02")]);
        let illness = event_table(&[("a", "2020-01-05"), ("b", "2020-01-03")]);
        let log = normalize_events(
            &[
                ("injury".to_string(), injury),
                ("illness".to_string(), illness),
            ],
            &columns(),
        )
        .unwrap();

        let got: Vec<(&str, NaiveDate)> = log
            .records()
            .iter()
            .map(|r| (r.entity_id.as_str(), r.date))
            .collect();
        assert_eq!(
            got,
            vec![
                ("a", day(2020, 1, 2)),
                ("a", day(2020, 1, 5)),
                ("b", day(2020, 1, 3)),
            ]
        );
    }

    #[test]
    fn test_drops_unparsable_rows() {
        let injury = event_table(&[("a", "2020-01-05"), ("a", "???"), ("", "2020-01-06")]);
        let log =
            normalize_events(&[("injury".to_string(), injury)], &columns()).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_dayfirst_parsing() {
        let injury = event_table(&[("a", "20.03.2020")]);
        let mut cols = columns();
        cols.dayfirst = true;
        let log = normalize_events(&[("injury".to_string(), injury)], &cols).unwrap();
        assert_eq!(log.records()[0].date, day(2020, 3, 20));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let injury = event_table(&[("a", "2020-01-05")]);
        let cols = EventColumns {
            id_col: "athlete".to_string(),
            date_col: "timestamp".to_string(),
            dayfirst: false,
        };
        assert!(normalize_events(&[("injury".to_string(), injury)], &cols).is_err());
    }

    #[test]
    fn test_empty_selection_is_fatal() {
        assert!(matches!(
            normalize_events(&[], &columns()),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_dates_by_entity_sorted() {
        let injury = event_table(&[("a", "2020-01-05"), ("a", "2020-01-02"), ("b", "2020-01-01")]);
        let log =
            normalize_events(&[("injury".to_string(), injury)], &columns()).unwrap();
        let map = log.dates_by_entity();
        assert_eq!(map["a"], vec![day(2020, 1, 2), day(2020, 1, 5)]);
        assert_eq!(map["b"], vec![day(2020, 1, 1)]);
    }
}
