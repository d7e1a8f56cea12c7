//! Audit trail
//!
//! Every proposal transition and job outcome is recorded as an
//! [`AuditEntry`]. Emitting is fire-and-forget: a sink that cannot store an
//! entry logs the failure and the business operation carries on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use core_kernel::{AuditEventId, DomainPort, PortError, UserId};

/// Who performed an audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    User(UserId),
    /// Background jobs
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::User(id) => write!(f, "{}", id),
            Actor::System => f.write_str("system"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ProposalCreated,
    ProposalApproved,
    RejectionRequested,
    ProposalRejected,
    RejectionReverted,
    DocumentRequested,
    DocumentRequestReverted,
    DocumentGenerated,
    DocumentFailed,
    EmailSent,
    EmailFailed,
}

impl AuditAction {
    pub const ALL: [AuditAction; 11] = [
        AuditAction::ProposalCreated,
        AuditAction::ProposalApproved,
        AuditAction::RejectionRequested,
        AuditAction::ProposalRejected,
        AuditAction::RejectionReverted,
        AuditAction::DocumentRequested,
        AuditAction::DocumentRequestReverted,
        AuditAction::DocumentGenerated,
        AuditAction::DocumentFailed,
        AuditAction::EmailSent,
        AuditAction::EmailFailed,
    ];

    /// Parses a stored action code
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.code() == code)
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuditAction::ProposalCreated => "PROPOSAL_CREATED",
            AuditAction::ProposalApproved => "PROPOSAL_APPROVED",
            AuditAction::RejectionRequested => "REJECTION_REQUESTED",
            AuditAction::ProposalRejected => "PROPOSAL_REJECTED",
            AuditAction::RejectionReverted => "REJECTION_REVERTED",
            AuditAction::DocumentRequested => "DOCUMENT_REQUESTED",
            AuditAction::DocumentRequestReverted => "DOCUMENT_REQUEST_REVERTED",
            AuditAction::DocumentGenerated => "DOCUMENT_GENERATED",
            AuditAction::DocumentFailed => "DOCUMENT_FAILED",
            AuditAction::EmailSent => "EMAIL_SENT",
            AuditAction::EmailFailed => "EMAIL_FAILED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEventId,
    pub actor: Actor,
    pub action: AuditAction,
    pub description: String,
    /// Reference to the affected entity, e.g. `PRP-...`
    pub subject: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor: Actor, action: AuditAction, description: impl Into<String>) -> Self {
        Self {
            id: AuditEventId::new_v7(),
            actor,
            action,
            description: description.into(),
            subject: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn about(mut self, subject: impl ToString) -> Self {
        self.subject = Some(subject.to_string());
        self
    }
}

/// Destination for audit entries
#[async_trait]
pub trait AuditSink: DomainPort {
    async fn emit(&self, entry: AuditEntry);
}

/// Read access for auditors
#[async_trait]
pub trait AuditLog: DomainPort {
    /// Most recent entries first
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, PortError>;
}

/// Writes audit entries to the tracing pipeline only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl DomainPort for TracingAuditSink {}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, entry: AuditEntry) {
        info!(
            target: "audit",
            actor = %entry.actor,
            action = %entry.action,
            subject = entry.subject.as_deref().unwrap_or("-"),
            "{}",
            entry.description
        );
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Keeps every entry in memory
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryAuditSink {
        entries: Arc<RwLock<Vec<AuditEntry>>>,
    }

    impl InMemoryAuditSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn entries(&self) -> Vec<AuditEntry> {
            self.entries.read().await.clone()
        }

        pub async fn actions(&self) -> Vec<AuditAction> {
            self.entries.read().await.iter().map(|e| e.action).collect()
        }
    }

    impl DomainPort for InMemoryAuditSink {}

    #[async_trait]
    impl AuditSink for InMemoryAuditSink {
        async fn emit(&self, entry: AuditEntry) {
            self.entries.write().await.push(entry);
        }
    }

    #[async_trait]
    impl AuditLog for InMemoryAuditSink {
        async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, PortError> {
            let entries = self.entries.read().await;
            Ok(entries.iter().rev().take(limit).cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ProposalId;

    #[tokio::test]
    async fn test_in_memory_sink_returns_newest_first() {
        let sink = mock::InMemoryAuditSink::new();
        let proposal = ProposalId::new();
        sink.emit(AuditEntry::new(Actor::System, AuditAction::ProposalCreated, "created").about(proposal))
            .await;
        sink.emit(AuditEntry::new(Actor::System, AuditAction::ProposalApproved, "approved").about(proposal))
            .await;

        let recent = sink.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action, AuditAction::ProposalApproved);
        assert_eq!(recent[0].subject, Some(proposal.to_string()));
    }

    #[test]
    fn test_action_codes_parse_back() {
        for action in AuditAction::ALL {
            assert_eq!(AuditAction::from_code(action.code()), Some(action));
        }
        assert_eq!(AuditAction::from_code("POLICY_ISSUED"), None);
    }

    #[test]
    fn test_actor_display() {
        assert_eq!(Actor::System.to_string(), "system");
        let user = UserId::new();
        assert_eq!(Actor::User(user).to_string(), user.to_string());
    }
}
