//! Quote repository
//!
//! Requests keep their details as JSONB; results keep the premium and
//! insurer as columns for reporting plus the full result as JSONB. Results
//! are written in rating order and read back in that order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{DomainPort, PortError, QuoteRequestId, QuoteResultId, UserId};
use domain_rating::{QuoteDetails, QuoteRequest, QuoteResult, QuoteStore};

use crate::error::DatabaseError;
use crate::repositories::proposals::locking_statuses;

#[derive(Debug, Clone)]
pub struct PgQuoteStore {
    pool: PgPool,
}

impl PgQuoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_request_row(
    tx: &mut Transaction<'_, Postgres>,
    request: &QuoteRequest,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO quote_requests
            (id, lineage_id, version, previous_version, is_current, requested_by, requested_at, details)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(*request.id.as_uuid())
    .bind(*request.lineage_id.as_uuid())
    .bind(request.version as i32)
    .bind(request.previous_version.map(|id| *id.as_uuid()))
    .bind(request.is_current)
    .bind(*request.requested_by.as_uuid())
    .bind(request.requested_at)
    .bind(Json(&request.details))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_results(
    tx: &mut Transaction<'_, Postgres>,
    request_id: QuoteRequestId,
    results: &[QuoteResult],
) -> Result<(), DatabaseError> {
    for (position, result) in results.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO quote_results (id, quote_request_id, position, insurer_id, premium, body)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*result.id.as_uuid())
        .bind(*request_id.as_uuid())
        .bind(position as i32)
        .bind(*result.insurer_id.as_uuid())
        .bind(result.premium.amount())
        .bind(Json(result))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

impl DomainPort for PgQuoteStore {}

#[async_trait]
impl QuoteStore for PgQuoteStore {
    #[instrument(skip_all, fields(quote_request_id = %request.id))]
    async fn insert_request(
        &self,
        request: &QuoteRequest,
        results: &[QuoteResult],
    ) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        insert_request_row(&mut tx, request).await?;
        insert_results(&mut tx, request.id, results).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip_all, fields(previous = %previous.id, successor = %successor.id))]
    async fn insert_version(
        &self,
        previous: &QuoteRequest,
        successor: &QuoteRequest,
        results: &[QuoteResult],
    ) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let retired = sqlx::query(
            "UPDATE quote_requests SET is_current = FALSE WHERE id = $1 AND is_current",
        )
        .bind(*previous.id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;
        if retired.rows_affected() == 0 {
            return Err(PortError::conflict(format!(
                "{} is no longer the current version",
                previous.id
            )));
        }

        insert_request_row(&mut tx, successor).await?;
        insert_results(&mut tx, successor.id, results).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip_all, fields(quote_request_id = %request.id))]
    async fn replace_request(
        &self,
        request: &QuoteRequest,
        results: &[QuoteResult],
    ) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        // Holds off status changes on the lineage's proposals until commit
        sqlx::query("SELECT id FROM proposals WHERE lineage_id = $1 FOR SHARE")
            .bind(*request.lineage_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

        let updated = sqlx::query(
            r#"
            UPDATE quote_requests
            SET details = $2
            WHERE id = $1
              AND is_current
              AND NOT EXISTS (
                  SELECT 1 FROM proposals
                  WHERE lineage_id = $3 AND status = ANY($4)
              )
            "#,
        )
        .bind(*request.id.as_uuid())
        .bind(Json(&request.details))
        .bind(*request.lineage_id.as_uuid())
        .bind(locking_statuses())
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;
        if updated.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM quote_requests WHERE id = $1)")
                    .bind(*request.id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(DatabaseError::from)?;
            if !exists {
                return Err(PortError::not_found("QuoteRequest", request.id));
            }
            return Err(PortError::conflict(format!(
                "{} is no longer editable in place",
                request.id
            )));
        }

        sqlx::query("DELETE FROM quote_results WHERE quote_request_id = $1")
            .bind(*request.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        insert_results(&mut tx, request.id, results).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn get_request(&self, id: QuoteRequestId) -> Result<QuoteRequest, PortError> {
        let row = sqlx::query_as::<_, QuoteRequestRow>(
            r#"
            SELECT id, lineage_id, version, previous_version, is_current,
                   requested_by, requested_at, details
            FROM quote_requests
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| DatabaseError::not_found("QuoteRequest", id))?;

        Ok(row.into_domain())
    }

    async fn results_for(&self, id: QuoteRequestId) -> Result<Vec<QuoteResult>, PortError> {
        let rows: Vec<Json<QuoteResult>> = sqlx::query_scalar(
            "SELECT body FROM quote_results WHERE quote_request_id = $1 ORDER BY position",
        )
        .bind(*id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(|Json(result)| result).collect())
    }

    async fn get_result(&self, id: QuoteResultId) -> Result<QuoteResult, PortError> {
        let row: Option<Json<QuoteResult>> =
            sqlx::query_scalar("SELECT body FROM quote_results WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from)?;

        row.map(|Json(result)| result)
            .ok_or_else(|| PortError::not_found("QuoteResult", id))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct QuoteRequestRow {
    pub id: Uuid,
    pub lineage_id: Uuid,
    pub version: i32,
    pub previous_version: Option<Uuid>,
    pub is_current: bool,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    pub details: Json<QuoteDetails>,
}

impl QuoteRequestRow {
    fn into_domain(self) -> QuoteRequest {
        QuoteRequest {
            id: QuoteRequestId::from_uuid(self.id),
            lineage_id: QuoteRequestId::from_uuid(self.lineage_id),
            version: self.version.max(1) as u32,
            previous_version: self.previous_version.map(QuoteRequestId::from_uuid),
            is_current: self.is_current,
            requested_by: UserId::from_uuid(self.requested_by),
            requested_at: self.requested_at,
            details: self.details.0,
        }
    }
}
