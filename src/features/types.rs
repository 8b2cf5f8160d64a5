use serde::{Deserialize, Serialize};

/// Names of every feature the extractor produces. Rule tables refer to
/// features by these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    PolicyToIncidentDays,
    IncidentBeforeBind,
    ClaimAmountMismatch,
    HasMismatch,
    SeverityScore,
    WitnessDeficit,
    ClaimToPremiumRatio,
    TotalClaimAmount,
    BodilyInjuries,
    Witnesses,
    VehiclesInvolved,
    PoliceReportMissing,
    PropertyDamageReported,
    AuthoritiesNotContacted,
    OutOfStateIncident,
    VehicleAgeYears,
}

impl FeatureKey {
    pub const ALL: [Self; 16] = [
        Self::PolicyToIncidentDays,
        Self::IncidentBeforeBind,
        Self::ClaimAmountMismatch,
        Self::HasMismatch,
        Self::SeverityScore,
        Self::WitnessDeficit,
        Self::ClaimToPremiumRatio,
        Self::TotalClaimAmount,
        Self::BodilyInjuries,
        Self::Witnesses,
        Self::VehiclesInvolved,
        Self::PoliceReportMissing,
        Self::PropertyDamageReported,
        Self::AuthoritiesNotContacted,
        Self::OutOfStateIncident,
        Self::VehicleAgeYears,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyToIncidentDays => "policy_to_incident_days",
            Self::IncidentBeforeBind => "incident_before_bind",
            Self::ClaimAmountMismatch => "claim_amount_mismatch",
            Self::HasMismatch => "has_mismatch",
            Self::SeverityScore => "severity_score",
            Self::WitnessDeficit => "witness_deficit",
            Self::ClaimToPremiumRatio => "claim_to_premium_ratio",
            Self::TotalClaimAmount => "total_claim_amount",
            Self::BodilyInjuries => "bodily_injuries",
            Self::Witnesses => "witnesses",
            Self::VehiclesInvolved => "vehicles_involved",
            Self::PoliceReportMissing => "police_report_missing",
            Self::PropertyDamageReported => "property_damage_reported",
            Self::AuthoritiesNotContacted => "authorities_not_contacted",
            Self::OutOfStateIncident => "out_of_state_incident",
            Self::VehicleAgeYears => "vehicle_age_years",
        }
    }

    /// Boolean features; the rest are numeric.
    pub fn is_flag(&self) -> bool {
        matches!(
            self,
            Self::IncidentBeforeBind
                | Self::HasMismatch
                | Self::WitnessDeficit
                | Self::PoliceReportMissing
                | Self::PropertyDamageReported
                | Self::AuthoritiesNotContacted
                | Self::OutOfStateIncident
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// A single feature value: numeric or boolean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Flag(bool),
}

impl FeatureValue {
    /// Render for risk-factor descriptions. Whole numbers print without a
    /// fractional part, everything else with two decimals.
    pub fn render(&self) -> String {
        match self {
            Self::Flag(b) => (if *b { "yes" } else { "no" }).to_string(),
            Self::Number(n) if n.fract() == 0.0 => format!("{:.0}", n),
            Self::Number(n) => format!("{:.2}", n),
        }
    }
}

/// Features derived from one claim. Recomputed per request, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub policy_to_incident_days: i64,
    pub incident_before_bind: bool,
    pub claim_amount_mismatch: f64,
    pub has_mismatch: bool,
    pub severity_score: u8,
    pub witness_deficit: bool,
    /// Capped at the configured sentinel when the premium is zero.
    pub claim_to_premium_ratio: f64,
    pub total_claim_amount: f64,
    pub bodily_injuries: u32,
    pub witnesses: u32,
    pub vehicles_involved: u32,
    pub police_report_missing: bool,
    pub property_damage_reported: bool,
    pub authorities_not_contacted: bool,
    pub out_of_state_incident: bool,
    pub vehicle_age_years: u32,
}

impl FeatureVector {
    pub fn get(&self, key: FeatureKey) -> FeatureValue {
        use FeatureValue::{Flag, Number};
        match key {
            FeatureKey::PolicyToIncidentDays => Number(self.policy_to_incident_days as f64),
            FeatureKey::IncidentBeforeBind => Flag(self.incident_before_bind),
            FeatureKey::ClaimAmountMismatch => Number(self.claim_amount_mismatch),
            FeatureKey::HasMismatch => Flag(self.has_mismatch),
            FeatureKey::SeverityScore => Number(self.severity_score as f64),
            FeatureKey::WitnessDeficit => Flag(self.witness_deficit),
            FeatureKey::ClaimToPremiumRatio => Number(self.claim_to_premium_ratio),
            FeatureKey::TotalClaimAmount => Number(self.total_claim_amount),
            FeatureKey::BodilyInjuries => Number(self.bodily_injuries as f64),
            FeatureKey::Witnesses => Number(self.witnesses as f64),
            FeatureKey::VehiclesInvolved => Number(self.vehicles_involved as f64),
            FeatureKey::PoliceReportMissing => Flag(self.police_report_missing),
            FeatureKey::PropertyDamageReported => Flag(self.property_damage_reported),
            FeatureKey::AuthoritiesNotContacted => Flag(self.authorities_not_contacted),
            FeatureKey::OutOfStateIncident => Flag(self.out_of_state_incident),
            FeatureKey::VehicleAgeYears => Number(self.vehicle_age_years as f64),
        }
    }
}

/// A derivation had no defined value and no safe default.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("feature '{feature}' is not finite ({value})")]
    NonFinite { feature: &'static str, value: f64 },
}
