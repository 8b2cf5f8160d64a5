use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::features::{FeatureKey, FeatureValue, FeatureVector};

/// Condition a rule checks against its feature.
///
/// In TOML: `when = "set"`, `when = { above = 50000 }`,
/// `when = { between = { min = 0, max = 30 } }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Set,
    Unset,
    Above(f64),
    AtLeast(f64),
    Below(f64),
    /// Inclusive on both ends.
    Between { min: f64, max: f64 },
}

impl Predicate {
    fn is_flag(&self) -> bool {
        matches!(self, Self::Set | Self::Unset)
    }

    fn matches(&self, value: FeatureValue) -> bool {
        match (self, value) {
            (Self::Set, FeatureValue::Flag(b)) => b,
            (Self::Unset, FeatureValue::Flag(b)) => !b,
            (Self::Above(t), FeatureValue::Number(n)) => n > *t,
            (Self::AtLeast(t), FeatureValue::Number(n)) => n >= *t,
            (Self::Below(t), FeatureValue::Number(n)) => n < *t,
            (Self::Between { min, max }, FeatureValue::Number(n)) => n >= *min && n <= *max,
            // Kind mismatches are rejected when the table is compiled.
            _ => false,
        }
    }

    fn bounds_are_valid(&self) -> bool {
        match self {
            Self::Set | Self::Unset => true,
            Self::Above(t) | Self::AtLeast(t) | Self::Below(t) => t.is_finite(),
            Self::Between { min, max } => min.is_finite() && max.is_finite() && min <= max,
        }
    }
}

/// A rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub feature: FeatureKey,
    pub when: Predicate,
    pub weight: f64,
    /// Human-readable explanation. `{feature_name}` placeholders are replaced
    /// with that feature's value.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleTableError {
    #[error("rule table is empty")]
    Empty,
    #[error("rule #{0} has a blank name")]
    BlankName(usize),
    #[error("duplicate rule name '{0}'")]
    DuplicateName(String),
    #[error("rule '{rule}' has a non-finite weight")]
    NonFiniteWeight { rule: String },
    #[error("rule '{rule}' has invalid bounds")]
    InvalidBounds { rule: String },
    #[error("rule '{rule}' applies a {predicate} predicate to {kind} feature '{feature}'")]
    PredicateMismatch {
        rule: String,
        feature: &'static str,
        predicate: &'static str,
        kind: &'static str,
    },
    #[error("rule '{rule}' description references unknown feature '{placeholder}'")]
    UnknownPlaceholder { rule: String, placeholder: String },
    #[error("rule '{rule}' description has an unclosed '{{'")]
    UnclosedPlaceholder { rule: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Value(FeatureKey),
}

/// A validated, ready-to-evaluate rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub feature: FeatureKey,
    pub predicate: Predicate,
    pub weight: f64,
    template: Vec<Segment>,
}

impl Rule {
    pub fn fires(&self, features: &FeatureVector) -> bool {
        self.predicate.matches(features.get(self.feature))
    }

    pub fn describe(&self, features: &FeatureVector) -> String {
        let mut out = String::new();
        for segment in &self.template {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Value(key) => out.push_str(&features.get(*key).render()),
            }
        }
        out
    }
}

/// Ordered rule table. Declaration order is the tie-break order for risk factors.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn compile(specs: &[RuleSpec]) -> Result<Self, RuleTableError> {
        if specs.is_empty() {
            return Err(RuleTableError::Empty);
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());

        for (idx, spec) in specs.iter().enumerate() {
            let name = spec.name.trim();
            if name.is_empty() {
                return Err(RuleTableError::BlankName(idx));
            }
            if !seen.insert(name.to_string()) {
                return Err(RuleTableError::DuplicateName(name.to_string()));
            }
            if !spec.weight.is_finite() {
                return Err(RuleTableError::NonFiniteWeight {
                    rule: name.to_string(),
                });
            }
            if !spec.when.bounds_are_valid() {
                return Err(RuleTableError::InvalidBounds {
                    rule: name.to_string(),
                });
            }
            if spec.when.is_flag() != spec.feature.is_flag() {
                let (predicate, kind) = if spec.when.is_flag() {
                    ("boolean", "numeric")
                } else {
                    ("numeric", "boolean")
                };
                return Err(RuleTableError::PredicateMismatch {
                    rule: name.to_string(),
                    feature: spec.feature.as_str(),
                    predicate,
                    kind,
                });
            }

            rules.push(Rule {
                name: name.to_string(),
                feature: spec.feature,
                predicate: spec.when,
                weight: spec.weight,
                template: parse_template(name, &spec.description)?,
            });
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_template(rule: &str, description: &str) -> Result<Vec<Segment>, RuleTableError> {
    let mut segments = Vec::new();
    let mut rest = description;

    while let Some(open) = rest.find('{') {
        if open > 0 {
            segments.push(Segment::Text(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| RuleTableError::UnclosedPlaceholder {
                rule: rule.to_string(),
            })?;
        let placeholder = after[..close].trim();
        let key = FeatureKey::from_name(placeholder).ok_or_else(|| {
            RuleTableError::UnknownPlaceholder {
                rule: rule.to_string(),
                placeholder: placeholder.to_string(),
            }
        })?;
        segments.push(Segment::Value(key));
        rest = &after[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    Ok(segments)
}

fn rule(
    name: &str,
    feature: FeatureKey,
    when: Predicate,
    weight: f64,
    description: &str,
) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        feature,
        when,
        weight,
        description: description.to_string(),
    }
}

/// Built-in rule catalog, used when the configuration supplies none.
pub fn default_catalog() -> Vec<RuleSpec> {
    use FeatureKey as F;
    use Predicate as P;

    vec![
        rule(
            "incident_before_bind",
            F::IncidentBeforeBind,
            P::Set,
            2.0,
            "incident date precedes policy bind date ({policy_to_incident_days} days)",
        ),
        rule(
            "short_policy_window",
            F::PolicyToIncidentDays,
            P::Between { min: 0.0, max: 30.0 },
            1.6,
            "new policy: incident occurred {policy_to_incident_days} days after bind date",
        ),
        rule(
            "claim_amount_mismatch",
            F::HasMismatch,
            P::Set,
            1.4,
            "claim components differ from the total by ${claim_amount_mismatch}",
        ),
        rule(
            "severe_incident",
            F::SeverityScore,
            P::AtLeast(2.0),
            1.2,
            "major damage or total loss reported",
        ),
        rule(
            "high_claim_amount",
            F::TotalClaimAmount,
            P::Above(50_000.0),
            0.9,
            "total claim amount ${total_claim_amount} is unusually high",
        ),
        rule(
            "witness_deficit",
            F::WitnessDeficit,
            P::Set,
            0.8,
            "{bodily_injuries} bodily injuries reported with no witnesses",
        ),
        rule(
            "high_claim_to_premium",
            F::ClaimToPremiumRatio,
            P::Above(40.0),
            0.7,
            "claim is {claim_to_premium_ratio}x the annual premium",
        ),
        rule(
            "authorities_not_contacted",
            F::AuthoritiesNotContacted,
            P::Set,
            0.6,
            "no authorities were contacted",
        ),
        rule(
            "no_police_report",
            F::PoliceReportMissing,
            P::Set,
            0.5,
            "no police report on file",
        ),
        rule(
            "multiple_injuries",
            F::BodilyInjuries,
            P::AtLeast(2.0),
            0.4,
            "multiple people reported injured ({bodily_injuries})",
        ),
        rule(
            "multi_vehicle",
            F::VehiclesInvolved,
            P::Above(2.0),
            0.3,
            "{vehicles_involved} vehicles involved",
        ),
        rule(
            "out_of_state_incident",
            F::OutOfStateIncident,
            P::Set,
            0.3,
            "incident occurred outside the policy state",
        ),
        rule(
            "property_damage",
            F::PropertyDamageReported,
            P::Set,
            0.2,
            "property damage reported",
        ),
        rule(
            "minor_incident",
            F::SeverityScore,
            P::Below(2.0),
            -0.8,
            "only minor or trivial damage reported",
        ),
        rule(
            "police_report_on_file",
            F::PoliceReportMissing,
            P::Unset,
            -0.4,
            "police report is on file",
        ),
    ]
}
