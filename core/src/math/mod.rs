pub mod stats;

pub use stats::{ConfidenceStats, StatsHelper};
