use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

use super::types::*;

/// Model years accepted for `auto_year`.
const MIN_VEHICLE_YEAR: u32 = 1900;
const MAX_VEHICLE_YEAR: u32 = 9999;

/// One rejected field and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// A claim payload was rejected. Carries every offending field, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid claim: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    fn single(field: &str, reason: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.to_string(),
                reason: reason.into(),
            }],
        }
    }

    /// Names of the rejected fields, in the order they were checked.
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.field, e.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a loosely-typed claim payload into a [`Claim`].
///
/// Numbers may arrive as JSON numbers or numeric strings, dates as ISO
/// `YYYY-MM-DD` (or an RFC 3339 timestamp, truncated to its date). Unknown
/// fields are ignored. Either every field is valid or nothing is returned.
pub fn validate(payload: &Value) -> Result<Claim, ValidationError> {
    let Some(object) = payload.as_object() else {
        return Err(ValidationError::single(
            "$",
            "claim payload must be a JSON object",
        ));
    };

    let mut r = FieldReader::new(object);

    let policy_number = r.optional(&["policy_number"], coerce_text);
    let bind_date = r.required(&["policy_bind_date"], coerce_date);
    let policy_state = r.required(&["policy_state"], coerce_text);
    let csl = r.required(&["policy_csl"], coerce_text);
    let deductible = r.required(&["policy_deductable", "policy_deductible"], coerce_amount);
    let annual_premium = r.required(&["policy_annual_premium"], coerce_amount);
    let umbrella_limit = r.required(&["umbrella_limit"], coerce_amount);

    let sex = r.required(&["insured_sex"], |v| {
        coerce_choice(v, &InsuredSex::ALL, InsuredSex::as_str)
    });

    let incident_date = r.required(&["incident_date"], coerce_date);
    let incident_type = r.required(&["incident_type"], coerce_text);
    let collision_type = r.required(&["collision_type"], coerce_text);
    let severity = r.required(&["incident_severity"], |v| {
        coerce_choice(v, &IncidentSeverity::ALL, IncidentSeverity::as_str)
    });
    let authorities = r.required(&["authorities_contacted"], |v| {
        coerce_choice(v, &Authorities::ALL, Authorities::as_str)
    });
    let incident_state = r.required(&["incident_state"], coerce_text);
    let incident_city = r.required(&["incident_city"], coerce_text);
    let incident_location = r.required(&["incident_location"], coerce_text);
    let vehicles_involved = r
        .optional(&["number_of_vehicles_involved"], coerce_vehicle_count)
        .flatten_default(1);
    let bodily_injuries = r.required(&["bodily_injuries"], coerce_count);
    let witnesses = r.required(&["witnesses"], coerce_count);
    let police_report = r.required(&["police_report_available"], |v| {
        coerce_choice(v, &YesNoUnknown::ALL, YesNoUnknown::as_str)
    });
    let property_damage = r.required(&["property_damage"], |v| {
        coerce_choice(v, &YesNoUnknown::ALL, YesNoUnknown::as_str)
    });

    let total = r.required(&["total_claim_amount"], coerce_amount);
    let injury = r.required(&["injury_claim"], coerce_amount);
    let property = r.required(&["property_claim"], coerce_amount);
    let vehicle_amount = r.required(&["vehicle_claim"], coerce_amount);

    let make = r.required(&["auto_make"], coerce_text);
    let model = r.required(&["auto_model"], coerce_text);
    let year = r.required(&["auto_year"], coerce_vehicle_year);

    if !r.errors.is_empty() {
        return Err(ValidationError { errors: r.errors });
    }

    let claim = (|| {
        Some(Claim {
            policy: PolicyInfo {
                number: policy_number.flatten(),
                bind_date: bind_date?,
                state: policy_state?,
                csl: csl?,
                deductible: deductible?,
                annual_premium: annual_premium?,
                umbrella_limit: umbrella_limit?,
            },
            insured: InsuredInfo { sex: sex? },
            incident: IncidentInfo {
                date: incident_date?,
                incident_type: incident_type?,
                collision_type: collision_type?,
                severity: severity?,
                authorities_contacted: authorities?,
                state: incident_state?,
                city: incident_city?,
                location: incident_location?,
                vehicles_involved: vehicles_involved?,
                bodily_injuries: bodily_injuries?,
                witnesses: witnesses?,
                police_report_available: police_report?,
                property_damage: property_damage?,
            },
            amounts: ClaimAmounts {
                total: total?,
                injury: injury?,
                property: property?,
                vehicle: vehicle_amount?,
            },
            vehicle: VehicleInfo {
                make: make?,
                model: model?,
                year: year?,
            },
        })
    })();

    claim.ok_or_else(|| ValidationError::single("$", "claim could not be assembled"))
}

/// Reads fields off the payload, collecting every failure instead of stopping at the first.
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            errors: Vec::new(),
        }
    }

    /// First non-null value under any of `names`; the first name is canonical.
    fn lookup(&self, names: &[&str]) -> Option<&'a Value> {
        let object = self.object;
        names
            .iter()
            .filter_map(|name| object.get(*name))
            .find(|v| !v.is_null())
    }

    fn required<T>(
        &mut self,
        names: &[&str],
        coerce: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Option<T> {
        match self.lookup(names) {
            Some(value) => self.apply(names[0], value, coerce),
            None => {
                self.reject(names[0], "missing required field");
                None
            }
        }
    }

    /// `None` when absent, `Some(None)` when present but invalid.
    fn optional<T>(
        &mut self,
        names: &[&str],
        coerce: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Option<Option<T>> {
        let value = self.lookup(names)?;
        Some(self.apply(names[0], value, coerce))
    }

    fn apply<T>(
        &mut self,
        field: &str,
        value: &Value,
        coerce: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Option<T> {
        match coerce(value) {
            Ok(v) => Some(v),
            Err(reason) => {
                self.reject(field, reason);
                None
            }
        }
    }

    fn reject(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            reason: reason.into(),
        });
    }
}

trait FlattenDefault<T> {
    fn flatten_default(self, default: T) -> Option<T>;
}

impl<T> FlattenDefault<T> for Option<Option<T>> {
    /// Absent → `Some(default)`, invalid → `None`, valid → the value.
    fn flatten_default(self, default: T) -> Option<T> {
        match self {
            None => Some(default),
            Some(inner) => inner,
        }
    }
}

// ============================================================
// Per-field coercion
// ============================================================

pub fn coerce_date(value: &Value) -> Result<NaiveDate, String> {
    let Some(raw) = value.as_str() else {
        return Err("expected an ISO date string".to_string());
    };
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| format!("'{}' is not a valid YYYY-MM-DD date", raw))
}

/// Non-negative, finite number from a JSON number or numeric string.
pub fn coerce_amount(value: &Value) -> Result<f64, String> {
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| "number is out of range".to_string())?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s.trim()))?,
        _ => return Err("expected a number or numeric string".to_string()),
    };
    if !number.is_finite() {
        return Err("must be a finite number".to_string());
    }
    if number < 0.0 {
        return Err(format!("must be non-negative, got {}", number));
    }
    Ok(number)
}

/// Non-negative whole number.
pub fn coerce_count(value: &Value) -> Result<u32, String> {
    let number = coerce_amount(value)?;
    if number.fract() != 0.0 {
        return Err(format!("must be a whole number, got {}", number));
    }
    if number > u32::MAX as f64 {
        return Err("is too large".to_string());
    }
    Ok(number as u32)
}

fn coerce_vehicle_count(value: &Value) -> Result<u32, String> {
    let count = coerce_count(value)?;
    if count == 0 {
        return Err("at least one vehicle must be involved".to_string());
    }
    Ok(count)
}

fn coerce_vehicle_year(value: &Value) -> Result<u32, String> {
    let year = coerce_count(value)?;
    if !(MIN_VEHICLE_YEAR..=MAX_VEHICLE_YEAR).contains(&year) {
        return Err(format!(
            "must be between {} and {}, got {}",
            MIN_VEHICLE_YEAR, MAX_VEHICLE_YEAR, year
        ));
    }
    Ok(year)
}

/// Free text. Numbers are accepted and rendered as text; blank strings are not.
pub fn coerce_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::String(_) => Err("must not be blank".to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err("expected a string".to_string()),
    }
}

/// One of a fixed set of values, matched case-insensitively.
pub fn coerce_choice<T: Copy>(
    value: &Value,
    options: &[T],
    label: fn(&T) -> &'static str,
) -> Result<T, String> {
    let raw = coerce_text(value)?;
    options
        .iter()
        .find(|opt| label(opt).eq_ignore_ascii_case(&raw))
        .copied()
        .ok_or_else(|| {
            let allowed: Vec<&str> = options.iter().map(label).collect();
            format!("'{}' is not one of: {}", raw, allowed.join(", "))
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A complete, valid payload in the shape the claim form sends.
    pub(crate) fn sample_payload() -> Value {
        json!({
            "policy_number": "521585",
            "policy_bind_date": "2014-10-17",
            "policy_state": "OH",
            "policy_csl": "250/500",
            "policy_deductable": 1000,
            "policy_annual_premium": 1406.91,
            "umbrella_limit": 0,
            "insured_sex": "MALE",
            "incident_date": "2015-01-25",
            "incident_type": "Single Vehicle Collision",
            "collision_type": "Side Collision",
            "incident_severity": "Minor Damage",
            "authorities_contacted": "Police",
            "incident_state": "OH",
            "incident_city": "Columbus",
            "incident_location": "9935 4th Drive",
            "number_of_vehicles_involved": 1,
            "bodily_injuries": 1,
            "witnesses": 2,
            "police_report_available": "YES",
            "property_damage": "NO",
            "total_claim_amount": 71610,
            "injury_claim": 6510,
            "property_claim": 13020,
            "vehicle_claim": 52080,
            "auto_make": "Saab",
            "auto_model": "92x",
            "auto_year": 2004
        })
    }

    #[test]
    fn test_valid_payload() {
        let claim = validate(&sample_payload()).unwrap();
        assert_eq!(claim.policy.bind_date, NaiveDate::from_ymd_opt(2014, 10, 17).unwrap());
        assert_eq!(claim.policy.deductible, 1000.0);
        assert_eq!(claim.policy.number.as_deref(), Some("521585"));
        assert_eq!(claim.incident.severity, IncidentSeverity::Minor);
        assert_eq!(claim.incident.police_report_available, YesNoUnknown::Yes);
        assert_eq!(claim.amounts.total, 71610.0);
        assert_eq!(claim.vehicle.make, "Saab");
        assert_eq!(claim.vehicle.year, 2004);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut payload = sample_payload();
        payload["total_claim_amount"] = json!("71610.50");
        payload["witnesses"] = json!(" 3 ");
        payload["auto_year"] = json!("2010");
        let claim = validate(&payload).unwrap();
        assert_eq!(claim.amounts.total, 71610.5);
        assert_eq!(claim.incident.witnesses, 3);
        assert_eq!(claim.vehicle.year, 2010);
    }

    #[test]
    fn test_model_year_bounds() {
        let mut payload = sample_payload();
        payload["auto_year"] = json!(2147483648u64);
        let err = validate(&payload).unwrap_err();
        assert_eq!(err.fields(), vec!["auto_year"]);

        payload["auto_year"] = json!(10000);
        assert_eq!(validate(&payload).unwrap_err().fields(), vec!["auto_year"]);

        payload["auto_year"] = json!(1899);
        assert_eq!(validate(&payload).unwrap_err().fields(), vec!["auto_year"]);

        payload["auto_year"] = json!(9999);
        assert_eq!(validate(&payload).unwrap().vehicle.year, 9999);
    }

    #[test]
    fn test_malformed_bind_date_names_field() {
        let mut payload = sample_payload();
        payload["policy_bind_date"] = json!("17/10/2014x");
        let err = validate(&payload).unwrap_err();
        assert_eq!(err.fields(), vec!["policy_bind_date"]);
    }

    #[test]
    fn test_collects_every_offending_field() {
        let mut payload = sample_payload();
        payload["injury_claim"] = json!(-5);
        payload["incident_severity"] = json!("Catastrophic");
        payload.as_object_mut().unwrap().remove("auto_make");
        payload["witnesses"] = json!(1.5);
        let err = validate(&payload).unwrap_err();
        assert!(err.has_field("injury_claim"));
        assert!(err.has_field("incident_severity"));
        assert!(err.has_field("auto_make"));
        assert!(err.has_field("witnesses"));
        assert_eq!(err.errors.len(), 4);
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut payload = sample_payload();
        payload["incident_date"] = Value::Null;
        let err = validate(&payload).unwrap_err();
        assert_eq!(err.errors[0].field, "incident_date");
        assert_eq!(err.errors[0].reason, "missing required field");
    }

    #[test]
    fn test_unknown_fields_ignored_and_enums_case_insensitive() {
        let mut payload = sample_payload();
        payload["insured_hobbies"] = json!("chess");
        payload["_c39"] = json!(0);
        payload["police_report_available"] = json!("no");
        payload["insured_sex"] = json!("female");
        let claim = validate(&payload).unwrap();
        assert_eq!(claim.incident.police_report_available, YesNoUnknown::No);
        assert_eq!(claim.insured.sex, InsuredSex::Female);
    }

    #[test]
    fn test_deductible_alias_and_vehicle_default() {
        let mut payload = sample_payload();
        let obj = payload.as_object_mut().unwrap();
        obj.remove("policy_deductable");
        obj.remove("number_of_vehicles_involved");
        obj.insert("policy_deductible".to_string(), json!("500"));
        let claim = validate(&payload).unwrap();
        assert_eq!(claim.policy.deductible, 500.0);
        assert_eq!(claim.incident.vehicles_involved, 1);
    }

    #[test]
    fn test_non_object_payload() {
        let err = validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.fields(), vec!["$"]);
    }

    #[test]
    fn test_rfc3339_date_is_truncated() {
        let date = coerce_date(&json!("2015-01-25T13:45:00Z")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2015, 1, 25).unwrap());
    }

    #[test]
    fn test_amount_rejects_non_finite_and_garbage() {
        assert!(coerce_amount(&json!("NaN")).is_err());
        assert!(coerce_amount(&json!("inf")).is_err());
        assert!(coerce_amount(&json!("12abc")).is_err());
        assert!(coerce_amount(&json!(true)).is_err());
        assert_eq!(coerce_amount(&json!("0")).unwrap(), 0.0);
    }

    #[test]
    fn test_error_display_lists_fields() {
        let mut payload = sample_payload();
        payload["policy_bind_date"] = json!("nope");
        let err = validate(&payload).unwrap_err();
        assert!(err.to_string().starts_with("invalid claim: policy_bind_date ("));
    }
}
