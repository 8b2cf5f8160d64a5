use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::analytics::{seed, AnalyticsAggregator, AnalyticsSnapshot};
use crate::claim::{self, Claim, ValidationError};
use crate::config::Config;
use crate::features::{FeatureError, FeatureExtractor};
use crate::scoring::{EngineConfigError, Prediction, ScoringEngine};
use crate::store::{AppendReceipt, ClaimId, ClaimStore, MemoryClaimStore, PgClaimStore, StoreError, StoredClaim};

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub claim_id: ClaimId,
    pub prediction: Prediction,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("claim could not be processed: {0}")]
    Feature(#[from] FeatureError),
    /// The claim was scored but could not be recorded. The prediction is kept
    /// so the caller can still see it.
    #[error("claim store unavailable: {source}")]
    Store {
        prediction: Prediction,
        #[source]
        source: StoreError,
    },
}

/// Runs a claim through validation, feature extraction, scoring, storage and
/// analytics, in that order. Nothing shared is touched until the prediction
/// is fully computed.
pub struct ClaimPipeline {
    extractor: FeatureExtractor,
    engine: ScoringEngine,
    store: ClaimStore,
    aggregator: AnalyticsAggregator,
    retry_backoff: Duration,
}

impl ClaimPipeline {
    pub fn new(config: &Config, store: ClaimStore) -> Result<Self, EngineConfigError> {
        let engine = ScoringEngine::new(&config.scoring)?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.features.clone()),
            engine,
            store,
            aggregator: AnalyticsAggregator::new(&config.analytics),
            retry_backoff: Duration::from_millis(config.store.retry_backoff_ms),
        })
    }

    /// Build the pipeline for the service: connect the configured store and
    /// seed analytics from history when a seed file is set.
    pub async fn init(config: &Config) -> eyre::Result<Self> {
        let store: ClaimStore = match &config.store.database_url {
            Some(url) => PgClaimStore::connect(url, config.store.max_connections)
                .await
                .map_err(|e| eyre::eyre!("Failed to open claims database: {}", e))?
                .into(),
            None => MemoryClaimStore::new().into(),
        };

        let pipeline = Self::new(config, store)?;
        tracing::info!(
            rules = pipeline.engine.rule_count(),
            threshold = pipeline.engine.threshold(),
            store = pipeline.store.backend(),
            "Scoring pipeline initialized"
        );

        if let Some(path) = &config.analytics.seed_csv_path {
            match seed::load_csv(path) {
                Ok(samples) => pipeline.aggregator.seed(&samples).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load analytics seed, starting from zero")
                }
            }
        }

        Ok(pipeline)
    }

    /// Score a raw claim payload and record the outcome.
    pub async fn submit(&self, payload: &Value) -> Result<Submission, SubmitError> {
        let span = tracing::info_span!("submit_claim", request_id = %Uuid::new_v4());
        self.submit_inner(payload).instrument(span).await
    }

    async fn submit_inner(&self, payload: &Value) -> Result<Submission, SubmitError> {
        let claim = claim::validate(payload).inspect_err(|e| {
            tracing::info!(fields = ?e.fields(), "Claim rejected by validation");
        })?;

        let features = self.extractor.extract(&claim).inspect_err(|e| {
            tracing::error!(policy = claim.log_ref(), error = %e, "Feature extraction failed");
        })?;

        let prediction = self.engine.score(&features);

        let AppendReceipt {
            id: claim_id,
            received_at,
        } = match self.append_with_retry(&claim, &prediction).await {
            Ok(receipt) => receipt,
            Err(source) => {
                tracing::error!(
                    policy = claim.log_ref(),
                    fraud_probability = prediction.fraud_probability,
                    error = %source,
                    "Claim could not be stored"
                );
                return Err(SubmitError::Store { prediction, source });
            }
        };

        self.aggregator.update(&prediction, &claim).await;

        if prediction.is_fraudulent {
            tracing::warn!(
                %claim_id,
                fraud_probability = prediction.fraud_probability,
                factors = ?prediction.risk_factors.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
                "FRAUD SUSPECTED"
            );
        } else {
            tracing::info!(
                %claim_id,
                fraud_probability = prediction.fraud_probability,
                "Claim scored"
            );
        }

        Ok(Submission {
            claim_id,
            prediction,
            received_at,
        })
    }

    /// One retry after a backoff; the second failure is returned.
    async fn append_with_retry(
        &self,
        claim: &Claim,
        prediction: &Prediction,
    ) -> Result<AppendReceipt, StoreError> {
        match self.store.append(claim, prediction).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backoff_ms = self.retry_backoff.as_millis() as u64,
                    "Claim append failed, retrying once"
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.store.append(claim, prediction).await
            }
        }
    }

    pub async fn get_claim(&self, id: ClaimId) -> Result<StoredClaim, StoreError> {
        self.store.get(id).await
    }

    pub async fn analytics(&self) -> AnalyticsSnapshot {
        self.aggregator.snapshot().await
    }

    pub async fn claims_stored(&self) -> Result<u64, StoreError> {
        self.store.len().await
    }

    pub fn aggregator_contention(&self) -> u64 {
        self.aggregator.contention_events()
    }
}
