//! Audit repository
//!
//! Emitting never fails the caller: a write error is logged and the entry
//! is still written to the tracing pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use core_kernel::{AuditEventId, DomainPort, PortError, UserId};
use domain_proposal::{Actor, AuditAction, AuditEntry, AuditLog, AuditSink, TracingAuditSink};

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, entry: &AuditEntry) -> Result<(), DatabaseError> {
        let actor_user_id = match entry.actor {
            Actor::User(user) => Some(*user.as_uuid()),
            Actor::System => None,
        };
        sqlx::query(
            r#"
            INSERT INTO audit_entries (id, actor_user_id, action, description, subject, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*entry.id.as_uuid())
        .bind(actor_user_id)
        .bind(entry.action.code())
        .bind(&entry.description)
        .bind(entry.subject.as_deref())
        .bind(entry.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl DomainPort for PgAuditLog {}

#[async_trait]
impl AuditSink for PgAuditLog {
    async fn emit(&self, entry: AuditEntry) {
        if let Err(e) = self.insert(&entry).await {
            error!(audit_id = %entry.id, action = %entry.action, error = %e, "audit entry not stored");
        }
        TracingAuditSink.emit(entry).await;
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, PortError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, actor_user_id, action, description, subject, occurred_at
            FROM audit_entries
            ORDER BY occurred_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit.min(i64::MAX as usize) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(PortError::from))
            .collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AuditRow {
    pub id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub action: String,
    pub description: String,
    pub subject: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_domain(self) -> Result<AuditEntry, DatabaseError> {
        let action = AuditAction::from_code(&self.action).ok_or_else(|| {
            DatabaseError::corrupt("audit_entries", format!("unknown action '{}'", self.action))
        })?;
        Ok(AuditEntry {
            id: AuditEventId::from_uuid(self.id),
            actor: self
                .actor_user_id
                .map(|id| Actor::User(UserId::from_uuid(id)))
                .unwrap_or(Actor::System),
            action,
            description: self.description,
            subject: self.subject,
            occurred_at: self.occurred_at,
        })
    }
}
