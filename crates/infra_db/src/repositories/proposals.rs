//! Proposal repository
//!
//! The offer copied from the quote result is immutable and kept as JSONB.
//! The lifecycle fields (status, job id, document, rejection reason) are
//! columns so the status compare-and-set is one conditional `UPDATE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, JobId, PortError, ProposalId, QuoteRequestId};
use domain_proposal::{
    DocumentRef, Proposal, ProposalPatch, ProposalStatus, ProposalStore, StatusUpdate,
};
use domain_rating::LineageLock;

use crate::error::DatabaseError;

const PROPOSAL_COLUMNS: &str = r#"
    id, status, job_id, document_location, document_generated_at,
    rejection_reason, offer, updated_at
"#;

#[derive(Debug, Clone)]
pub struct PgProposalStore {
    pool: PgPool,
}

impl PgProposalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: ProposalId) -> Result<Option<ProposalRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {} FROM proposals WHERE id = $1",
            PROPOSAL_COLUMNS
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

impl DomainPort for PgProposalStore {}

#[async_trait]
impl ProposalStore for PgProposalStore {
    #[instrument(skip_all, fields(proposal_id = %proposal.id))]
    async fn insert(&self, proposal: &Proposal) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO proposals
                (id, quote_request_id, lineage_id, quote_result_id, status, job_id,
                 document_location, document_generated_at, rejection_reason, offer,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(*proposal.id.as_uuid())
        .bind(*proposal.quote_request_id.as_uuid())
        .bind(*proposal.lineage_id.as_uuid())
        .bind(*proposal.quote_result_id.as_uuid())
        .bind(proposal.status.as_str())
        .bind(proposal.job_id.map(|id| *id.as_uuid()))
        .bind(proposal.document.as_ref().map(|d| d.location.clone()))
        .bind(proposal.document.as_ref().map(|d| d.generated_at))
        .bind(proposal.rejection_reason.as_deref())
        .bind(Json(proposal))
        .bind(proposal.created_at)
        .bind(proposal.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn get(&self, id: ProposalId) -> Result<Proposal, PortError> {
        let row = self
            .fetch(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Proposal", id))?;
        Ok(row.into_domain()?)
    }

    #[instrument(skip(self, expected, patch), fields(next = %next))]
    async fn compare_and_set_status(
        &self,
        id: ProposalId,
        expected: &[ProposalStatus],
        next: ProposalStatus,
        patch: ProposalPatch,
    ) -> Result<StatusUpdate, PortError> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();

        let updated = sqlx::query_as::<_, ProposalRow>(&format!(
            r#"
            UPDATE proposals SET
                status = $3,
                job_id = COALESCE($4, job_id),
                document_location = COALESCE($5, document_location),
                document_generated_at = COALESCE($6, document_generated_at),
                rejection_reason = CASE WHEN $8 THEN NULL ELSE COALESCE($7, rejection_reason) END,
                updated_at = now()
            WHERE id = $1 AND status = ANY($2)
            RETURNING {}
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(*id.as_uuid())
        .bind(&expected)
        .bind(next.as_str())
        .bind(patch.job_id.map(|job| *job.as_uuid()))
        .bind(patch.document.as_ref().map(|d| d.location.clone()))
        .bind(patch.document.as_ref().map(|d| d.generated_at))
        .bind(patch.rejection_reason)
        .bind(patch.clear_rejection_reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if let Some(row) = updated {
            return Ok(StatusUpdate::Applied(row.into_domain()?));
        }

        let current = self
            .fetch(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Proposal", id))?
            .status()?;
        debug!(%current, ?expected, "status compare-and-set lost");
        Ok(StatusUpdate::Rejected { current })
    }
}

#[async_trait]
impl LineageLock for PgProposalStore {
    async fn is_lineage_locked(&self, lineage_id: QuoteRequestId) -> Result<bool, PortError> {
        let locking = locking_statuses();

        let locked: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM proposals WHERE lineage_id = $1 AND status = ANY($2))",
        )
        .bind(*lineage_id.as_uuid())
        .bind(&locking)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(locked)
    }
}

/// Status strings of proposals that freeze their lineage
pub(crate) fn locking_statuses() -> Vec<String> {
    ProposalStatus::ALL
        .iter()
        .filter(|s| s.locks_lineage())
        .map(|s| s.as_str().to_string())
        .collect()
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProposalRow {
    pub id: Uuid,
    pub status: String,
    pub job_id: Option<Uuid>,
    pub document_location: Option<String>,
    pub document_generated_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub offer: Json<Proposal>,
    pub updated_at: DateTime<Utc>,
}

impl ProposalRow {
    fn status(&self) -> Result<ProposalStatus, DatabaseError> {
        self.status
            .parse()
            .map_err(|e| DatabaseError::corrupt("proposals", format!("{}: {}", self.id, e)))
    }

    /// The stored offer with the lifecycle columns laid over it
    fn into_domain(self) -> Result<Proposal, DatabaseError> {
        let status = self.status()?;
        let mut proposal = self.offer.0;
        proposal.id = ProposalId::from_uuid(self.id);
        proposal.status = status;
        proposal.job_id = self.job_id.map(JobId::from_uuid);
        proposal.document = match (self.document_location, self.document_generated_at) {
            (Some(location), Some(generated_at)) => Some(DocumentRef {
                location,
                generated_at,
            }),
            _ => None,
        };
        proposal.rejection_reason = self.rejection_reason;
        proposal.updated_at = self.updated_at;
        Ok(proposal)
    }
}
