//! Survival labelling
//!
//! Episode compression of event dates and (T, E) label construction.

pub mod episodes;
pub mod survival;

pub use episodes::episode_starts;
pub use survival::{build_survival_labels, LabelConfig};
