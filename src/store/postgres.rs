use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::claim::Claim;
use crate::scoring::Prediction;

use super::{AppendReceipt, ClaimId, StoreError, StoredClaim};

/// PostgreSQL-backed claims store. Claims and predictions are kept as JSONB,
/// with a few columns broken out for ad-hoc queries.
#[derive(Clone)]
pub struct PgClaimStore {
    pool: PgPool,
}

impl PgClaimStore {
    /// Connect and bring the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations complete");

        Ok(Self { pool })
    }

    pub async fn append(
        &self,
        claim: &Claim,
        prediction: &Prediction,
    ) -> Result<AppendReceipt, StoreError> {
        loop {
            let id = ClaimId::generate();
            let inserted: Option<(DateTime<Utc>,)> = sqlx::query_as(
                "INSERT INTO claims (id, policy_number, vehicle_make, fraud_probability, is_fraudulent, claim, prediction)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (id) DO NOTHING
                 RETURNING received_at",
            )
            .bind(id.as_uuid())
            .bind(claim.policy.number.as_deref())
            .bind(&claim.vehicle.make)
            .bind(prediction.fraud_probability)
            .bind(prediction.is_fraudulent)
            .bind(Json(claim))
            .bind(Json(prediction))
            .fetch_optional(&self.pool)
            .await?;

            if let Some((received_at,)) = inserted {
                return Ok(AppendReceipt { id, received_at });
            }
            tracing::warn!(%id, "Claim id collision, regenerating");
        }
    }

    pub async fn get(&self, id: ClaimId) -> Result<StoredClaim, StoreError> {
        let row: Option<(Uuid, Json<Claim>, Json<Prediction>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, claim, prediction, received_at FROM claims WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let (id, Json(claim), Json(prediction), received_at) =
            row.ok_or(StoreError::NotFound(id))?;

        Ok(StoredClaim {
            id: ClaimId::from(id),
            claim,
            prediction,
            received_at,
        })
    }

    pub async fn len(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM claims")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
