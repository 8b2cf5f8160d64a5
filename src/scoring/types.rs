use serde::{Deserialize, Serialize};

/// One fired rule, explained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub description: String,
    /// Signed weight this factor added to the raw score.
    pub contribution: f64,
}

/// Outcome of scoring one claim. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub fraud_probability: f64,
    pub is_fraudulent: bool,
    /// Sorted by descending absolute contribution, ties in rule-table order.
    pub risk_factors: Vec<RiskFactor>,
}

impl Prediction {
    pub fn has_factor(&self, name: &str) -> bool {
        self.risk_factors.iter().any(|f| f.name == name)
    }

    pub fn factor(&self, name: &str) -> Option<&RiskFactor> {
        self.risk_factors.iter().find(|f| f.name == name)
    }
}
