use serde::Deserialize;
use std::io::Read;

use super::types::AggregateSample;

/// One row of a historical labelled claims export. Other columns are ignored.
#[derive(Debug, Deserialize)]
struct HistoricalClaim {
    auto_make: String,
    incident_type: String,
    incident_state: String,
    total_claim_amount: f64,
    fraud_reported: String,
}

/// Load labelled historical claims from a CSV file for seeding analytics.
pub fn load_csv(path: &str) -> eyre::Result<Vec<AggregateSample>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("Failed to open analytics seed CSV '{}': {}", path, e))?;
    let samples = read_samples(file)?;
    tracing::info!(path, samples = samples.len(), "Parsed historical claims");
    Ok(samples)
}

/// Parse samples from CSV. Rows that do not parse, or whose `fraud_reported`
/// is neither `Y` nor `N`, are skipped.
pub fn read_samples<R: Read>(reader: R) -> eyre::Result<Vec<AggregateSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for result in reader.deserialize::<HistoricalClaim>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable seed row");
                skipped += 1;
                continue;
            }
        };

        let is_fraudulent = match row.fraud_reported.as_str() {
            "Y" | "y" => true,
            "N" | "n" => false,
            _ => {
                skipped += 1;
                continue;
            }
        };

        if !row.total_claim_amount.is_finite() || row.total_claim_amount < 0.0 {
            skipped += 1;
            continue;
        }

        samples.push(AggregateSample {
            is_fraudulent,
            vehicle_make: row.auto_make,
            incident_type: row.incident_type,
            incident_state: row.incident_state,
            total_claim_amount: row.total_claim_amount,
        });
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped malformed historical claim rows");
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_labelled_rows_and_ignores_extra_columns() {
        let data = "\
months_as_customer,policy_number,incident_type,incident_state,total_claim_amount,auto_make,fraud_reported,_c39
328,521585,Single Vehicle Collision,SC,71610,Saab,Y,
228,342868,Vehicle Theft,VA,5070,Mercedes,N,
134,687698,Multi-vehicle Collision,NY,34650,Dodge,N,
";
        let samples = read_samples(data.as_bytes()).unwrap();
        assert_eq!(samples.len(), 3);
        assert!(samples[0].is_fraudulent);
        assert_eq!(samples[0].vehicle_make, "Saab");
        assert_eq!(samples[1].incident_type, "Vehicle Theft");
        assert_eq!(samples[2].total_claim_amount, 34650.0);
    }

    #[test]
    fn test_skips_unlabelled_and_malformed_rows() {
        let data = "\
incident_type,incident_state,total_claim_amount,auto_make,fraud_reported
Parked Car,OH,6500,Toyota,?
Parked Car,OH,not-a-number,Toyota,Y
Parked Car,OH,-10,Toyota,N
Parked Car,OH,4200,Toyota,N
";
        let samples = read_samples(data.as_bytes()).unwrap();
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].is_fraudulent);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_csv("/nonexistent/insurance_claims.csv").is_err());
    }
}
