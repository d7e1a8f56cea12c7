//! Audit DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_proposal::{Actor, AuditEntry};

pub const DEFAULT_AUDIT_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AuditQuery {
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    /// User id, or `system` for background jobs
    pub actor: String,
    pub action: String,
    pub description: String,
    pub subject: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(entry: AuditEntry) -> Self {
        let actor = match entry.actor {
            Actor::User(user) => user.as_uuid().to_string(),
            Actor::System => "system".to_string(),
        };
        Self {
            id: *entry.id.as_uuid(),
            actor,
            action: entry.action.code().to_string(),
            description: entry.description,
            subject: entry.subject,
            occurred_at: entry.occurred_at,
        }
    }
}
