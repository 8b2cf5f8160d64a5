pub mod engine;
pub mod rules;
pub mod types;

pub use engine::{EngineConfigError, ScoringEngine};
pub use rules::{default_catalog, Predicate, RuleSpec, RuleTable, RuleTableError};
pub use types::{Prediction, RiskFactor};
