use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::claim::{Claim, FieldError};
use crate::scoring::{Prediction, RiskFactor};
use crate::store::{ClaimId, StoredClaim};

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
    /// Present when a claim was scored but could not be recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionBody>,
}

impl ErrorResponse {
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            fields: Vec::new(),
            prediction: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RiskFactorResponse {
    pub factor: String,
    pub description: String,
    pub contribution: f64,
    pub severity: &'static str,
}

impl From<&RiskFactor> for RiskFactorResponse {
    fn from(f: &RiskFactor) -> Self {
        Self {
            factor: f.name.clone(),
            description: f.description.clone(),
            contribution: f.contribution,
            severity: severity_label(f.contribution),
        }
    }
}

fn severity_label(contribution: f64) -> &'static str {
    let magnitude = contribution.abs();
    if magnitude >= 1.0 {
        "High"
    } else if magnitude >= 0.5 {
        "Medium"
    } else {
        "Low"
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionBody {
    pub fraud_probability: f64,
    pub is_fraudulent: bool,
    pub risk_factors: Vec<RiskFactorResponse>,
}

impl From<&Prediction> for PredictionBody {
    fn from(p: &Prediction) -> Self {
        Self {
            fraud_probability: p.fraud_probability,
            is_fraudulent: p.is_fraudulent,
            risk_factors: p.risk_factors.iter().map(RiskFactorResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub claim_id: ClaimId,
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub prediction: PredictionBody,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub claim_id: ClaimId,
    pub received_at: DateTime<Utc>,
    pub claim: Claim,
    pub prediction: PredictionBody,
}

impl From<StoredClaim> for ClaimResponse {
    fn from(stored: StoredClaim) -> Self {
        Self {
            claim_id: stored.id,
            received_at: stored.received_at,
            prediction: PredictionBody::from(&stored.prediction),
            claim: stored.claim,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub claims_stored: u64,
    pub aggregator_contention: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bands() {
        assert_eq!(severity_label(1.6), "High");
        assert_eq!(severity_label(-1.0), "High");
        assert_eq!(severity_label(0.7), "Medium");
        assert_eq!(severity_label(-0.4), "Low");
    }
}
