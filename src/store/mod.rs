pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::claim::Claim;
use crate::scoring::Prediction;

pub use memory::MemoryClaimStore;
pub use postgres::PgClaimStore;

/// Identifier assigned to a claim when it is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(Uuid);

impl ClaimId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ClaimId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ClaimId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Where and when an append landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    pub id: ClaimId,
    pub received_at: DateTime<Utc>,
}

/// A claim and the prediction made for it, as recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredClaim {
    pub id: ClaimId,
    pub claim: Claim,
    pub prediction: Prediction,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("claim {0} not found")]
    NotFound(ClaimId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[cfg(test)]
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only record of submitted claims. Records are never updated or
/// deleted here.
pub enum ClaimStore {
    Memory(MemoryClaimStore),
    Postgres(PgClaimStore),
}

impl ClaimStore {
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Record a claim with its prediction under a freshly generated id.
    pub async fn append(
        &self,
        claim: &Claim,
        prediction: &Prediction,
    ) -> Result<AppendReceipt, StoreError> {
        match self {
            Self::Memory(store) => store.append(claim, prediction),
            Self::Postgres(store) => store.append(claim, prediction).await,
        }
    }

    pub async fn get(&self, id: ClaimId) -> Result<StoredClaim, StoreError> {
        match self {
            Self::Memory(store) => store.get(id),
            Self::Postgres(store) => store.get(id).await,
        }
    }

    pub async fn len(&self) -> Result<u64, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.len() as u64),
            Self::Postgres(store) => store.len().await,
        }
    }
}

impl From<MemoryClaimStore> for ClaimStore {
    fn from(store: MemoryClaimStore) -> Self {
        Self::Memory(store)
    }
}

impl From<PgClaimStore> for ClaimStore {
    fn from(store: PgClaimStore) -> Self {
        Self::Postgres(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_id_round_trips_through_text() {
        let id = ClaimId::generate();
        let parsed: ClaimId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<ClaimId>().is_err());
    }
}
