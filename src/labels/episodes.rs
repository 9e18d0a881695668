//! Episode compression of event dates
//!
//! Consecutive event days usually describe one ongoing injury or
//! illness, not new ones. Dates within `gap_days` of the immediately
//! preceding event date are folded into the same episode; only episode
//! start dates survive.

use crate::{PipelineError, Result};
use chrono::NaiveDate;

/// Reduce sorted, unique event dates to episode starts.
///
/// The first date is always kept; a later date is kept iff its gap to
/// the immediately preceding date in the input exceeds `gap_days`. The
/// comparison is always against the input predecessor, never against
/// the last kept start. `gap_days = 0` keeps every date.
pub fn episode_starts(dates: &[NaiveDate], gap_days: i64) -> Result<Vec<NaiveDate>> {
    if gap_days < 0 {
        return Err(PipelineError::InvalidConfig(
            "gap_days must be >= 0".to_string(),
        ));
    }
    if gap_days == 0 || dates.is_empty() {
        return Ok(dates.to_vec());
    }

    let mut starts = vec![dates[0]];
    for pair in dates.windows(2) {
        if (pair[1] - pair[0]).num_days() > gap_days {
            starts.push(pair[1]);
        }
    }
    Ok(starts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    #[test]
    fn test_gap_zero_is_identity() {
        let dates = vec![day(1), day(2), day(3), day(10)];
        assert_eq!(episode_starts(&dates, 0).unwrap(), dates);
    }

    #[test]
    fn test_merges_runs() {
        let dates = vec![day(1), day(2), day(3), day(10)];
        assert_eq!(episode_starts(&dates, 1).unwrap(), vec![day(1), day(10)]);
    }

    #[test]
    fn test_compares_against_immediate_predecessor() {
        // With gap_days=2: 1 kept; 3-1=2 merged; 5-3=2 merged; 6-5=1
        // merged even though 6-1 > 2 - the rule chains through the
        // unkept predecessors.
        let dates = vec![day(1), day(3), day(5), day(6), day(12)];
        assert_eq!(episode_starts(&dates, 2).unwrap(), vec![day(1), day(12)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(episode_starts(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_single_date() {
        assert_eq!(episode_starts(&[day(5)], 7).unwrap(), vec![day(5)]);
    }

    #[test]
    fn test_negative_gap_rejected() {
        assert!(episode_starts(&[day(1)], -1).is_err());
    }
}
