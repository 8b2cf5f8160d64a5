use chrono::Datelike;

use crate::claim::types::{Authorities, Claim, YesNoUnknown};
use crate::config::FeatureConfig;

use super::types::{FeatureError, FeatureVector};

/// Derives scoring features from validated claims.
///
/// Defaults applied instead of failing:
/// - `claim_to_premium_ratio` is capped at `premium_ratio_cap` (also used when the premium is 0).
/// - `vehicle_age_years` is floored at 0 for model years after the incident.
/// - a negative `policy_to_incident_days` is kept and flagged via `incident_before_bind`.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, claim: &Claim) -> Result<FeatureVector, FeatureError> {
        let amounts = &claim.amounts;
        let incident = &claim.incident;

        let policy_to_incident_days = (incident.date - claim.policy.bind_date).num_days();

        let claim_amount_mismatch =
            finite("claim_amount_mismatch", (amounts.total - amounts.components_sum()).abs())?;
        let has_mismatch = self.exceeds_tolerance(claim_amount_mismatch, amounts.total);

        let claim_to_premium_ratio = self.premium_ratio(amounts.total, claim.policy.annual_premium);

        let vehicle_age_years = (i64::from(incident.date.year()) - i64::from(claim.vehicle.year))
            .clamp(0, i64::from(u32::MAX)) as u32;

        Ok(FeatureVector {
            policy_to_incident_days,
            incident_before_bind: policy_to_incident_days < 0,
            claim_amount_mismatch,
            has_mismatch,
            severity_score: incident.severity.ordinal(),
            witness_deficit: incident.witnesses == 0 && incident.bodily_injuries > 0,
            claim_to_premium_ratio,
            total_claim_amount: finite("total_claim_amount", amounts.total)?,
            bodily_injuries: incident.bodily_injuries,
            witnesses: incident.witnesses,
            vehicles_involved: incident.vehicles_involved,
            police_report_missing: incident.police_report_available != YesNoUnknown::Yes,
            property_damage_reported: incident.property_damage == YesNoUnknown::Yes,
            authorities_not_contacted: incident.authorities_contacted == Authorities::None,
            out_of_state_incident: !incident.state.eq_ignore_ascii_case(&claim.policy.state),
            vehicle_age_years,
        })
    }

    /// A mismatch counts only when it is above both the absolute and the
    /// relative tolerance, so rounding on small or large claims is ignored.
    fn exceeds_tolerance(&self, mismatch: f64, total: f64) -> bool {
        mismatch > self.config.mismatch_abs_tolerance
            && mismatch > total * self.config.mismatch_rel_tolerance
    }

    fn premium_ratio(&self, total: f64, premium: f64) -> f64 {
        let cap = self.config.premium_ratio_cap;
        if premium <= 0.0 {
            return cap;
        }
        let ratio = total / premium;
        if ratio.is_finite() {
            ratio.min(cap)
        } else {
            cap
        }
    }
}

fn finite(feature: &'static str, value: f64) -> Result<f64, FeatureError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FeatureError::NonFinite { feature, value })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::claim::validate;
    use crate::claim::validator::tests::sample_payload;
    use crate::features::FeatureKey;
    use chrono::NaiveDate;

    pub(crate) fn sample_claim() -> Claim {
        validate(&sample_payload()).unwrap()
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeatureConfig::default())
    }

    #[test]
    fn test_baseline_features() {
        let f = extractor().extract(&sample_claim()).unwrap();
        assert_eq!(f.policy_to_incident_days, 100);
        assert!(!f.incident_before_bind);
        assert_eq!(f.claim_amount_mismatch, 0.0);
        assert!(!f.has_mismatch);
        assert_eq!(f.severity_score, 1);
        assert!(!f.witness_deficit);
        assert!((f.claim_to_premium_ratio - 71610.0 / 1406.91).abs() < 1e-9);
        assert!(!f.police_report_missing);
        assert!(!f.out_of_state_incident);
        assert_eq!(f.vehicle_age_years, 11);
    }

    #[test]
    fn test_amount_mismatch_detected() {
        let mut claim = sample_claim();
        claim.amounts.total = 50_000.0;
        claim.amounts.injury = 4_000.0;
        claim.amounts.property = 3_000.0;
        claim.amounts.vehicle = 3_000.0;
        let f = extractor().extract(&claim).unwrap();
        assert_eq!(f.claim_amount_mismatch, 40_000.0);
        assert!(f.has_mismatch);
    }

    #[test]
    fn test_rounding_differences_tolerated() {
        let mut claim = sample_claim();
        // $5 off on a $71k claim is under 1% of the total
        claim.amounts.total += 5.0;
        let f = extractor().extract(&claim).unwrap();
        assert!(!f.has_mismatch);

        // 50 cents off on a small claim is under the absolute tolerance
        claim.amounts.total = 20.5;
        claim.amounts.injury = 10.0;
        claim.amounts.property = 10.0;
        claim.amounts.vehicle = 0.0;
        let f = extractor().extract(&claim).unwrap();
        assert!(!f.has_mismatch);
    }

    #[test]
    fn test_incident_before_bind_is_flagged_not_error() {
        let mut claim = sample_claim();
        claim.incident.date = NaiveDate::from_ymd_opt(2014, 10, 10).unwrap();
        let f = extractor().extract(&claim).unwrap();
        assert_eq!(f.policy_to_incident_days, -7);
        assert!(f.incident_before_bind);
    }

    #[test]
    fn test_vehicle_age_floors_at_zero_for_any_model_year() {
        let mut claim = sample_claim();
        claim.vehicle.year = u32::MAX;
        let f = extractor().extract(&claim).unwrap();
        assert_eq!(f.vehicle_age_years, 0);

        claim.vehicle.year = 2004;
        let f = extractor().extract(&claim).unwrap();
        assert_eq!(f.vehicle_age_years, 11);
    }

    #[test]
    fn test_zero_premium_uses_cap() {
        let mut claim = sample_claim();
        claim.policy.annual_premium = 0.0;
        let f = extractor().extract(&claim).unwrap();
        assert_eq!(f.claim_to_premium_ratio, FeatureConfig::default().premium_ratio_cap);
    }

    #[test]
    fn test_witness_deficit() {
        let mut claim = sample_claim();
        claim.incident.witnesses = 0;
        claim.incident.bodily_injuries = 2;
        let f = extractor().extract(&claim).unwrap();
        assert!(f.witness_deficit);
        assert_eq!(f.get(FeatureKey::WitnessDeficit), crate::features::FeatureValue::Flag(true));
    }

    #[test]
    fn test_overflowing_amounts_fail() {
        let mut claim = sample_claim();
        claim.amounts.injury = f64::MAX;
        claim.amounts.property = f64::MAX;
        let err = extractor().extract(&claim).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::NonFinite { feature: "claim_amount_mismatch", .. }
        ));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let claim = sample_claim();
        assert_eq!(extractor().extract(&claim), extractor().extract(&claim));
    }
}
