//! Athlete daily-load feature engineering and survival labelling
//!
//! Turns per-athlete daily monitoring CSVs into rolling-window features
//! and right-censored survival labels (T, E) for injury/illness
//! prediction. The model and web layers live elsewhere; this crate is
//! tabular in, tabular out.

pub mod data;
pub mod features;
pub mod labels;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rolling statistic selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Mean,
    Max,
    Std,
}

impl Stat {
    /// All supported statistics, in canonical output order
    pub const ALL: [Stat; 3] = [Stat::Mean, Stat::Max, Stat::Std];
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Mean => write!(f, "mean"),
            Stat::Max => write!(f, "max"),
            Stat::Std => write!(f, "std"),
        }
    }
}

impl std::str::FromStr for Stat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(Stat::Mean),
            "max" => Ok(Stat::Max),
            "std" => Ok(Stat::Std),
            other => Err(format!(
                "Unsupported statistic: {}. Use mean, max, or std.",
                other
            )),
        }
    }
}

/// Which raw event logs feed the survival endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Injury,
    Illness,
    Both,
}

impl EventSource {
    pub fn includes_injury(&self) -> bool {
        matches!(self, EventSource::Injury | EventSource::Both)
    }

    pub fn includes_illness(&self) -> bool {
        matches!(self, EventSource::Illness | EventSource::Both)
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Injury => write!(f, "injury"),
            EventSource::Illness => write!(f, "illness"),
            EventSource::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "injury" => Ok(EventSource::Injury),
            "illness" => Ok(EventSource::Illness),
            "both" => Ok(EventSource::Both),
            other => Err(format!(
                "Unknown event source: {}. Use injury, illness, or both.",
                other
            )),
        }
    }
}

/// Join behaviour for the daily merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Keep only days present in the objective table (default)
    Left,
    /// Keep days present in the objective table and every wellness table
    Inner,
    /// Keep the union of days across all tables
    Outer,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Left => write!(f, "left"),
            JoinKind::Inner => write!(f, "inner"),
            JoinKind::Outer => write!(f, "outer"),
        }
    }
}

impl std::str::FromStr for JoinKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(JoinKind::Left),
            "inner" => Ok(JoinKind::Inner),
            "outer" => Ok(JoinKind::Outer),
            other => Err(format!(
                "Unknown join kind: {}. Use left, inner, or outer.",
                other
            )),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{table}: required column {column:?} not found")]
    MissingColumn { table: String, column: String },

    #[error(
        "{table}: found {count} duplicate (player_id, date) keys - \
         aggregate to one row per day before this step"
    )]
    DuplicateKey { table: String, count: usize },

    #[error("{table}: {count} rows with unparsable dates (e.g. {sample:?})")]
    UnparsableDate {
        table: String,
        count: usize,
        sample: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeaturesConfig,
    pub labels: LabelsConfig,
}

/// Default input/output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub objective_csv: String,
    pub fatigue_csv: String,
    pub soreness_csv: String,
    pub sleep_quality_csv: String,
    pub stress_csv: String,
    pub injury_csv: String,
    pub illness_csv: String,
    pub processed_dir: String,
}

/// Defaults for the rolling-feature step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub id_col: String,
    pub date_col: String,
    pub window: usize,
    pub min_periods: usize,
    pub stats: Vec<Stat>,
    pub exclude: Vec<String>,
}

/// Defaults for the survival-label step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    pub event_source: EventSource,
    pub events_id_col: String,
    pub events_date_col: String,
    pub events_dayfirst: bool,
    pub gap_days: i64,
    pub include_same_day: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                objective_csv: "dataset/subjective/objective.csv".to_string(),
                fatigue_csv: "dataset/subjective/wellness/fatigue.csv".to_string(),
                soreness_csv: "dataset/subjective/wellness/soreness.csv".to_string(),
                sleep_quality_csv: "dataset/subjective/wellness/sleep_quality.csv".to_string(),
                stress_csv: "dataset/subjective/wellness/stress.csv".to_string(),
                injury_csv: "dataset/subjective/injury/injury.csv".to_string(),
                illness_csv: "dataset/subjective/illness/illness.csv".to_string(),
                processed_dir: "dataset/processed".to_string(),
            },
            features: FeaturesConfig {
                id_col: "player_id".to_string(),
                date_col: "date".to_string(),
                window: 7,
                min_periods: 1,
                stats: Stat::ALL.to_vec(),
                exclude: vec!["source_file".to_string()],
            },
            labels: LabelsConfig {
                event_source: EventSource::Injury,
                events_id_col: "player_name".to_string(),
                events_date_col: "timestamp".to_string(),
                events_dayfirst: false,
                gap_days: 0,
                include_same_day: false,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidConfig(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| PipelineError::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            PipelineError::InvalidConfig(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
