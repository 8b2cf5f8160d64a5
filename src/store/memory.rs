use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicU32, Ordering};

use crate::claim::Claim;
use crate::scoring::Prediction;

use super::{AppendReceipt, ClaimId, StoreError, StoredClaim};

/// In-process claims store. The map is sharded, so appends for different
/// ids only contend when they hash to the same shard.
#[derive(Default)]
pub struct MemoryClaimStore {
    records: DashMap<ClaimId, StoredClaim>,
    #[cfg(test)]
    injected_failures: AtomicU32,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, claim: &Claim, prediction: &Prediction) -> Result<AppendReceipt, StoreError> {
        #[cfg(test)]
        self.take_injected_failure()?;

        loop {
            let id = ClaimId::generate();
            // A v4 collision is astronomically unlikely; never overwrite if one happens.
            if let Entry::Vacant(slot) = self.records.entry(id) {
                let received_at = Utc::now();
                slot.insert(StoredClaim {
                    id,
                    claim: claim.clone(),
                    prediction: prediction.clone(),
                    received_at,
                });
                return Ok(AppendReceipt { id, received_at });
            }
        }
    }

    pub fn get(&self, id: ClaimId) -> Result<StoredClaim, StoreError> {
        self.records
            .get(&id)
            .map(|record| record.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Make the next `count` appends fail with [`StoreError::Unavailable`].
    #[cfg(test)]
    pub(crate) fn fail_next_appends(&self, count: u32) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn take_injected_failure(&self) -> Result<(), StoreError> {
        let took = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match took {
            Ok(_) => Err(StoreError::Unavailable("injected failure".to_string())),
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extractor::tests::sample_claim;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn prediction() -> Prediction {
        Prediction {
            fraud_probability: 0.25,
            is_fraudulent: false,
            risk_factors: vec![],
        }
    }

    #[test]
    fn test_append_then_get() {
        let store = MemoryClaimStore::new();
        let claim = sample_claim();
        let receipt = store.append(&claim, &prediction()).unwrap();
        let id = receipt.id;
        let stored = store.get(id).unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.received_at, receipt.received_at);
        assert_eq!(stored.claim, claim);
        assert_eq!(stored.prediction, prediction());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let store = MemoryClaimStore::new();
        let id = ClaimId::generate();
        assert!(matches!(store.get(id), Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn test_concurrent_appends_get_distinct_ids() {
        let store = Arc::new(MemoryClaimStore::new());
        let claim = sample_claim();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let claim = claim.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| store.append(&claim, &prediction()).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<ClaimId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(store.len(), 400);
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let store = MemoryClaimStore::new();
        store.fail_next_appends(1);
        assert!(store.append(&sample_claim(), &prediction()).is_err());
        assert!(store.append(&sample_claim(), &prediction()).is_ok());
        assert_eq!(store.len(), 1);
    }
}
