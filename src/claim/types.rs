use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Incident severity, ordered from least to most damaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncidentSeverity {
    #[serde(rename = "Trivial Damage")]
    Trivial,
    #[serde(rename = "Minor Damage")]
    Minor,
    #[serde(rename = "Major Damage")]
    Major,
    #[serde(rename = "Total Loss")]
    TotalLoss,
}

impl IncidentSeverity {
    pub const ALL: [Self; 4] = [Self::Trivial, Self::Minor, Self::Major, Self::TotalLoss];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trivial => "Trivial Damage",
            Self::Minor => "Minor Damage",
            Self::Major => "Major Damage",
            Self::TotalLoss => "Total Loss",
        }
    }

    /// Ordinal used as the `severity_score` feature.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Trivial => 0,
            Self::Minor => 1,
            Self::Major => 2,
            Self::TotalLoss => 3,
        }
    }
}

/// Tri-state answer used by the claim form (`YES`, `NO`, or `?` when unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNoUnknown {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
    #[serde(rename = "?")]
    Unknown,
}

impl YesNoUnknown {
    pub const ALL: [Self; 3] = [Self::Yes, Self::No, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Unknown => "?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InsuredSex {
    Male,
    Female,
}

impl InsuredSex {
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authorities {
    Police,
    Fire,
    Ambulance,
    Other,
    None,
}

impl Authorities {
    pub const ALL: [Self; 5] = [
        Self::Police,
        Self::Fire,
        Self::Ambulance,
        Self::Other,
        Self::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Police => "Police",
            Self::Fire => "Fire",
            Self::Ambulance => "Ambulance",
            Self::Other => "Other",
            Self::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub number: Option<String>,
    pub bind_date: NaiveDate,
    pub state: String,
    pub csl: String,
    pub deductible: f64,
    pub annual_premium: f64,
    pub umbrella_limit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuredInfo {
    pub sex: InsuredSex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentInfo {
    pub date: NaiveDate,
    pub incident_type: String,
    pub collision_type: String,
    pub severity: IncidentSeverity,
    pub authorities_contacted: Authorities,
    pub state: String,
    pub city: String,
    pub location: String,
    pub vehicles_involved: u32,
    pub bodily_injuries: u32,
    pub witnesses: u32,
    pub police_report_available: YesNoUnknown,
    pub property_damage: YesNoUnknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimAmounts {
    pub total: f64,
    pub injury: f64,
    pub property: f64,
    pub vehicle: f64,
}

impl ClaimAmounts {
    /// Sum of the itemised components.
    pub fn components_sum(&self) -> f64 {
        self.injury + self.property + self.vehicle
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub make: String,
    pub model: String,
    pub year: u32,
}

/// A validated insurance claim. Only the validator constructs these from
/// untrusted input; once built a claim is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub policy: PolicyInfo,
    pub insured: InsuredInfo,
    pub incident: IncidentInfo,
    pub amounts: ClaimAmounts,
    pub vehicle: VehicleInfo,
}

impl Claim {
    /// Short reference for log lines: the policy number when supplied.
    pub fn log_ref(&self) -> &str {
        self.policy.number.as_deref().unwrap_or("-")
    }
}
