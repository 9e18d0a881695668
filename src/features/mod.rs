//! Feature engineering
//!
//! Rolling-window statistics over normalized daily tables.

pub mod rolling;

pub use rolling::{build_rolling_features, RollingConfig};
