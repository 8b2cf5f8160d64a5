use crate::config::ScoringConfig;
use crate::features::FeatureVector;

use super::rules::{default_catalog, RuleTable, RuleTableError};
use super::types::{Prediction, RiskFactor};

/// The risk scoring engine. Evaluates every rule in the table against a
/// feature vector and squashes the summed weights into a probability.
///
/// Stateless after construction: the same features always give the same
/// prediction, so one engine can be shared across any number of tasks.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    table: RuleTable,
    bias: f64,
    threshold: f64,
    min_significance: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineConfigError {
    #[error(transparent)]
    Rules(#[from] RuleTableError),
    #[error("threshold must be strictly between 0 and 1, got {0}")]
    Threshold(f64),
    #[error("{name} must be finite and non-negative, got {value}")]
    Setting { name: &'static str, value: f64 },
}

impl ScoringEngine {
    /// Build the engine from configuration. Falls back to the built-in rule
    /// catalog when the config lists no rules. Any malformed input fails here,
    /// never at request time.
    pub fn new(config: &ScoringConfig) -> Result<Self, EngineConfigError> {
        if !(config.threshold > 0.0 && config.threshold < 1.0) {
            return Err(EngineConfigError::Threshold(config.threshold));
        }
        if !config.bias.is_finite() {
            return Err(EngineConfigError::Setting {
                name: "bias",
                value: config.bias,
            });
        }
        if !(config.min_significance.is_finite() && config.min_significance >= 0.0) {
            return Err(EngineConfigError::Setting {
                name: "min_significance",
                value: config.min_significance,
            });
        }

        let table = if config.rules.is_empty() {
            RuleTable::compile(&default_catalog())?
        } else {
            RuleTable::compile(&config.rules)?
        };

        Ok(Self {
            table,
            bias: config.bias,
            threshold: config.threshold,
            min_significance: config.min_significance,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn rule_count(&self) -> usize {
        self.table.len()
    }

    pub fn score(&self, features: &FeatureVector) -> Prediction {
        let mut raw = self.bias;
        let mut factors = Vec::new();

        for rule in self.table.rules() {
            if !rule.fires(features) {
                continue;
            }
            raw += rule.weight;
            if rule.weight.abs() > self.min_significance {
                factors.push(RiskFactor {
                    name: rule.name.clone(),
                    description: rule.describe(features),
                    contribution: rule.weight,
                });
            }
        }

        // Stable sort: equal magnitudes keep rule-table order.
        factors.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));

        let fraud_probability = sigmoid(raw);
        tracing::debug!(raw_score = raw, fraud_probability, fired = factors.len(), "Claim scored");

        Prediction {
            fraud_probability,
            is_fraudulent: fraud_probability >= self.threshold,
            risk_factors: factors,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    let p = 1.0 / (1.0 + (-x).exp());
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
