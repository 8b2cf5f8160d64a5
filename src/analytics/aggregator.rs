use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::claim::Claim;
use crate::config::AnalyticsConfig;
use crate::scoring::Prediction;

use super::types::{AggregateSample, AnalyticsSnapshot};

#[derive(Debug, Default)]
struct Counters {
    total_claims: u64,
    fraudulent_claims: u64,
    total_claim_amount: f64,
    fraud_by_make: BTreeMap<String, u64>,
    fraud_by_type: BTreeMap<String, u64>,
    claims_by_state: BTreeMap<String, u64>,
}

impl Counters {
    fn apply(&mut self, sample: &AggregateSample) {
        self.total_claims += 1;
        self.total_claim_amount += sample.total_claim_amount;
        *self
            .claims_by_state
            .entry(sample.incident_state.clone())
            .or_default() += 1;

        if sample.is_fraudulent {
            self.fraudulent_claims += 1;
            *self
                .fraud_by_make
                .entry(sample.vehicle_make.clone())
                .or_default() += 1;
            *self
                .fraud_by_type
                .entry(sample.incident_type.clone())
                .or_default() += 1;
        }
    }

    fn snapshot(&self) -> AnalyticsSnapshot {
        let (fraud_rate, average_claim_amount) = if self.total_claims == 0 {
            (0.0, 0.0)
        } else {
            let n = self.total_claims as f64;
            (
                self.fraudulent_claims as f64 / n,
                self.total_claim_amount / n,
            )
        };

        AnalyticsSnapshot {
            total_claims: self.total_claims,
            fraudulent_claims: self.fraudulent_claims,
            fraud_by_make: self.fraud_by_make.clone(),
            fraud_by_type: self.fraud_by_type.clone(),
            claims_by_state: self.claims_by_state.clone(),
            fraud_rate,
            total_claim_amount: self.total_claim_amount,
            average_claim_amount,
        }
    }
}

/// Sole owner of the running fraud counters.
///
/// Every mutation takes the write lock for the duration of one sample's
/// increments, so readers see the state either before or after an update.
/// Callers must finish scoring before calling [`update`](Self::update).
pub struct AnalyticsAggregator {
    counters: RwLock<Counters>,
    lock_timeout: Duration,
    contention_events: AtomicU64,
}

impl AnalyticsAggregator {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            counters: RwLock::new(Counters::default()),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            contention_events: AtomicU64::new(0),
        }
    }

    /// Fold one scored claim into the counters.
    pub async fn update(&self, prediction: &Prediction, claim: &Claim) {
        let sample = AggregateSample::from_outcome(prediction, claim);
        self.write().await.apply(&sample);
    }

    /// Apply historical samples in a single critical section.
    pub async fn seed(&self, samples: &[AggregateSample]) {
        let mut counters = self.write().await;
        for sample in samples {
            counters.apply(sample);
        }
        tracing::info!(
            samples = samples.len(),
            total_claims = counters.total_claims,
            "Analytics seeded"
        );
    }

    pub async fn snapshot(&self) -> AnalyticsSnapshot {
        self.counters.read().await.snapshot()
    }

    /// How many times a writer gave up waiting and retried.
    pub fn contention_events(&self) -> u64 {
        self.contention_events.load(Ordering::Relaxed)
    }

    /// Acquire the write lock, retrying each time the wait exceeds the bound.
    async fn write(&self) -> RwLockWriteGuard<'_, Counters> {
        loop {
            match tokio::time::timeout(self.lock_timeout, self.counters.write()).await {
                Ok(guard) => return guard,
                Err(_) => {
                    let events = self.contention_events.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(
                        timeout_ms = self.lock_timeout.as_millis() as u64,
                        events,
                        "Analytics lock contended, retrying"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extractor::tests::sample_claim;
    use std::sync::Arc;

    fn aggregator() -> AnalyticsAggregator {
        AnalyticsAggregator::new(&AnalyticsConfig::default())
    }

    fn outcome(is_fraudulent: bool) -> Prediction {
        Prediction {
            fraud_probability: if is_fraudulent { 0.9 } else { 0.1 },
            is_fraudulent,
            risk_factors: vec![],
        }
    }

    fn sample(make: &str, fraud: bool) -> AggregateSample {
        AggregateSample {
            is_fraudulent: fraud,
            vehicle_make: make.to_string(),
            incident_type: "Parked Car".to_string(),
            incident_state: "NY".to_string(),
            total_claim_amount: 1000.0,
        }
    }

    fn assert_consistent(s: &AnalyticsSnapshot) {
        assert!(s.fraudulent_claims <= s.total_claims);
        assert_eq!(s.fraud_by_make.values().sum::<u64>(), s.fraudulent_claims);
        assert_eq!(s.fraud_by_type.values().sum::<u64>(), s.fraudulent_claims);
        assert_eq!(s.claims_by_state.values().sum::<u64>(), s.total_claims);
    }

    #[tokio::test]
    async fn test_starts_at_zero() {
        let snapshot = aggregator().snapshot().await;
        assert_eq!(snapshot, AnalyticsSnapshot::default());
    }

    #[tokio::test]
    async fn test_update_increments() {
        let agg = aggregator();
        let claim = sample_claim();
        agg.update(&outcome(true), &claim).await;
        agg.update(&outcome(false), &claim).await;

        let s = agg.snapshot().await;
        assert_eq!(s.total_claims, 2);
        assert_eq!(s.fraudulent_claims, 1);
        assert_eq!(s.fraud_by_make.get("Saab"), Some(&1));
        assert_eq!(s.fraud_by_type.get("Single Vehicle Collision"), Some(&1));
        assert_eq!(s.claims_by_state.get("OH"), Some(&2));
        assert_eq!(s.fraud_rate, 0.5);
        assert_eq!(s.average_claim_amount, 71610.0);
        assert_consistent(&s);
    }

    #[tokio::test]
    async fn test_seed_applies_all_samples() {
        let agg = aggregator();
        agg.seed(&[sample("Audi", true), sample("BMW", false), sample("Audi", true)])
            .await;
        let s = agg.snapshot().await;
        assert_eq!(s.total_claims, 3);
        assert_eq!(s.fraud_by_make.get("Audi"), Some(&2));
        assert!(!s.fraud_by_make.contains_key("BMW"));
        assert_consistent(&s);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_lose_nothing() {
        let agg = Arc::new(aggregator());
        let claim = Arc::new(sample_claim());

        let mut handles = Vec::new();
        for worker in 0..16 {
            let agg = agg.clone();
            let claim = claim.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    agg.update(&outcome((worker + i) % 3 == 0), &claim).await;
                }
            }));
        }

        // Readers run alongside writers and must never see a torn update.
        let reader = {
            let agg = agg.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    assert_consistent(&agg.snapshot().await);
                    tokio::task::yield_now().await;
                }
            })
        };

        for handle in handles {
            handle.await.unwrap();
        }
        reader.await.unwrap();

        let s = agg.snapshot().await;
        assert_eq!(s.total_claims, 800);
        let expected_fraud = (0..16u64)
            .flat_map(|w| (0..50u64).map(move |i| (w + i) % 3 == 0))
            .filter(|f| *f)
            .count() as u64;
        assert_eq!(s.fraudulent_claims, expected_fraud);
        assert_consistent(&s);
    }

    #[tokio::test]
    async fn test_contended_writer_retries_transparently() {
        let agg = Arc::new(AnalyticsAggregator::new(&AnalyticsConfig {
            lock_timeout_ms: 5,
            ..AnalyticsConfig::default()
        }));

        let held = agg.counters.read().await;
        let writer = {
            let agg = agg.clone();
            tokio::spawn(async move {
                agg.update(&outcome(true), &sample_claim()).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(40)).await;
        drop(held);
        writer.await.unwrap();

        assert!(agg.contention_events() >= 1);
        assert_eq!(agg.snapshot().await.fraudulent_claims, 1);
    }
}
