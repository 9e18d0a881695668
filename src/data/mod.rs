//! Data ingestion and normalization
//!
//! CSV-backed tables plus the normalizers that canonicalize daily and
//! event data before feature or label building.

pub mod events;
pub mod merge;
pub mod normalize;
pub mod table;

pub use events::{EventColumns, EventLog, EventRecord};
pub use normalize::{DailyTable, NormalizeOptions};
pub use table::Table;
