pub mod aggregator;
pub mod seed;
pub mod types;

pub use aggregator::AnalyticsAggregator;
pub use types::{AggregateSample, AnalyticsSnapshot};
