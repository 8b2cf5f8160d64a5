use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::claim::Claim;
use crate::scoring::Prediction;

/// Point-in-time read of the running fraud statistics.
///
/// Always `fraudulent_claims <= total_claims`, and `fraud_by_make` /
/// `fraud_by_type` each sum to `fraudulent_claims` while `claims_by_state`
/// sums to `total_claims`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_claims: u64,
    pub fraudulent_claims: u64,
    pub fraud_by_make: BTreeMap<String, u64>,
    pub fraud_by_type: BTreeMap<String, u64>,
    pub claims_by_state: BTreeMap<String, u64>,
    pub fraud_rate: f64,
    pub total_claim_amount: f64,
    pub average_claim_amount: f64,
}

/// The parts of one claim outcome the aggregator counts.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSample {
    pub is_fraudulent: bool,
    pub vehicle_make: String,
    pub incident_type: String,
    pub incident_state: String,
    pub total_claim_amount: f64,
}

impl AggregateSample {
    pub fn from_outcome(prediction: &Prediction, claim: &Claim) -> Self {
        Self {
            is_fraudulent: prediction.is_fraudulent,
            vehicle_make: claim.vehicle.make.clone(),
            incident_type: claim.incident.incident_type.clone(),
            incident_state: claim.incident.state.clone(),
            total_claim_amount: claim.amounts.total,
        }
    }
}
