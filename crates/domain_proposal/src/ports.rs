//! Proposal Domain Ports
//!
//! Collaborators the proposal lifecycle depends on but does not own:
//!
//! - [`ProposalStore`]: persistence with compare-and-set on the status
//! - [`JobRunner`]: at-least-once asynchronous execution of [`ProposalJob`]s
//! - [`DocumentRenderer`]: turns a proposal into a document
//! - [`NotificationSink`]: delivers an email, optionally with an attachment
//!
//! Audit ports live in [`crate::audit`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, JobId, PortError, ProposalId, UserId};

use crate::proposal::{Proposal, ProposalPatch, ProposalStatus};

/// Outcome of a status compare-and-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// The status matched and the change was stored
    Applied(Proposal),
    /// The status did not match; nothing was written
    Rejected { current: ProposalStatus },
}

#[async_trait]
pub trait ProposalStore: DomainPort {
    async fn insert(&self, proposal: &Proposal) -> Result<(), PortError>;

    async fn get(&self, id: ProposalId) -> Result<Proposal, PortError>;

    /// Sets `next` only if the stored status is one of `expected`
    ///
    /// The check and the write are a single atomic step, so of two
    /// concurrent callers expecting the same status at most one sees
    /// [`StatusUpdate::Applied`].
    async fn compare_and_set_status(
        &self,
        id: ProposalId,
        expected: &[ProposalStatus],
        next: ProposalStatus,
        patch: ProposalPatch,
    ) -> Result<StatusUpdate, PortError>;
}

/// Work executed outside the request that triggered it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum ProposalJob {
    /// Render the proposal document; with `notify_client` also email it
    GenerateDocument {
        proposal_id: ProposalId,
        notify_client: bool,
        requested_by: UserId,
    },
    SendRejectionEmail {
        proposal_id: ProposalId,
        requested_by: UserId,
    },
}

impl ProposalJob {
    pub fn name(&self) -> &'static str {
        match self {
            ProposalJob::GenerateDocument { .. } => "generate_document",
            ProposalJob::SendRejectionEmail { .. } => "send_rejection_email",
        }
    }

    pub fn proposal_id(&self) -> ProposalId {
        match self {
            ProposalJob::GenerateDocument { proposal_id, .. }
            | ProposalJob::SendRejectionEmail { proposal_id, .. } => *proposal_id,
        }
    }
}

/// A job with the correlation id recorded on the proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: JobId,
    pub job: ProposalJob,
}

impl QueuedJob {
    pub fn new(job: ProposalJob) -> Self {
        Self {
            id: JobId::new_v7(),
            job,
        }
    }
}

#[async_trait]
pub trait JobRunner: DomainPort {
    /// Accepts the job for later execution and returns its id
    async fn enqueue(&self, job: QueuedJob) -> Result<JobId, PortError>;
}

/// A rendered proposal document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Where the renderer stored the document
    pub location: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait DocumentRenderer: DomainPort {
    async fn render(&self, proposal: &Proposal) -> Result<RenderedDocument, PortError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body_html: String,
    pub attachment: Option<RenderedDocument>,
}

#[async_trait]
pub trait NotificationSink: DomainPort {
    async fn send(&self, notification: &Notification) -> Result<(), PortError>;
}

/// Mock implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::QuoteRequestId;
    use domain_rating::LineageLock;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{Mutex, RwLock};

    /// In-memory proposal store; the write lock makes each CAS atomic
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryProposalStore {
        proposals: Arc<RwLock<HashMap<ProposalId, Proposal>>>,
    }

    impl InMemoryProposalStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for InMemoryProposalStore {}

    #[async_trait]
    impl ProposalStore for InMemoryProposalStore {
        async fn insert(&self, proposal: &Proposal) -> Result<(), PortError> {
            let mut proposals = self.proposals.write().await;
            if proposals.contains_key(&proposal.id) {
                return Err(PortError::conflict(format!("{} already exists", proposal.id)));
            }
            proposals.insert(proposal.id, proposal.clone());
            Ok(())
        }

        async fn get(&self, id: ProposalId) -> Result<Proposal, PortError> {
            self.proposals
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Proposal", id))
        }

        async fn compare_and_set_status(
            &self,
            id: ProposalId,
            expected: &[ProposalStatus],
            next: ProposalStatus,
            patch: ProposalPatch,
        ) -> Result<StatusUpdate, PortError> {
            let mut proposals = self.proposals.write().await;
            let proposal = proposals
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Proposal", id))?;

            if !expected.contains(&proposal.status) {
                return Ok(StatusUpdate::Rejected {
                    current: proposal.status,
                });
            }

            proposal.status = next;
            if let Some(job_id) = patch.job_id {
                proposal.job_id = Some(job_id);
            }
            if let Some(document) = patch.document {
                proposal.document = Some(document);
            }
            if patch.clear_rejection_reason {
                proposal.rejection_reason = None;
            } else if let Some(reason) = patch.rejection_reason {
                proposal.rejection_reason = Some(reason);
            }
            proposal.updated_at = chrono::Utc::now();
            Ok(StatusUpdate::Applied(proposal.clone()))
        }
    }

    #[async_trait]
    impl LineageLock for InMemoryProposalStore {
        async fn is_lineage_locked(&self, lineage_id: QuoteRequestId) -> Result<bool, PortError> {
            Ok(self
                .proposals
                .read()
                .await
                .values()
                .any(|p| p.lineage_id == lineage_id && p.status.locks_lineage()))
        }
    }

    /// Records jobs instead of running them; can be told to refuse work
    #[derive(Debug, Default, Clone)]
    pub struct RecordingJobRunner {
        jobs: Arc<Mutex<Vec<QueuedJob>>>,
        unavailable: Arc<RwLock<bool>>,
    }

    impl RecordingJobRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn set_unavailable(&self, unavailable: bool) {
            *self.unavailable.write().await = unavailable;
        }

        pub async fn jobs(&self) -> Vec<QueuedJob> {
            self.jobs.lock().await.clone()
        }

        /// Removes and returns every recorded job
        pub async fn drain(&self) -> Vec<QueuedJob> {
            std::mem::take(&mut *self.jobs.lock().await)
        }
    }

    impl DomainPort for RecordingJobRunner {}

    #[async_trait]
    impl JobRunner for RecordingJobRunner {
        async fn enqueue(&self, job: QueuedJob) -> Result<JobId, PortError> {
            if *self.unavailable.read().await {
                return Err(PortError::unavailable("job runner"));
            }
            let id = job.id;
            self.jobs.lock().await.push(job);
            Ok(id)
        }
    }

    /// Fails the first `failures` calls with a transient error
    #[derive(Debug, Default)]
    struct FailureBudget {
        remaining: Mutex<u32>,
        calls: Mutex<u32>,
    }

    impl FailureBudget {
        fn new(failures: u32) -> Self {
            Self {
                remaining: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }

        async fn next(&self, service: &str) -> Result<(), PortError> {
            *self.calls.lock().await += 1;
            let mut remaining = self.remaining.lock().await;
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PortError::unavailable(service));
            }
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone)]
    pub struct StubDocumentRenderer {
        budget: Arc<FailureBudget>,
    }

    impl StubDocumentRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(failures: u32) -> Self {
            Self {
                budget: Arc::new(FailureBudget::new(failures)),
            }
        }

        pub async fn calls(&self) -> u32 {
            *self.budget.calls.lock().await
        }
    }

    impl DomainPort for StubDocumentRenderer {}

    #[async_trait]
    impl DocumentRenderer for StubDocumentRenderer {
        async fn render(&self, proposal: &Proposal) -> Result<RenderedDocument, PortError> {
            self.budget.next("document renderer").await?;
            let file_name = format!("proposta_{}.pdf", proposal.id.as_uuid());
            Ok(RenderedDocument {
                location: format!("memory://{}", file_name),
                file_name,
                content_type: "application/pdf".to_string(),
                bytes: proposal.id.to_string().into_bytes(),
            })
        }
    }

    #[derive(Debug, Default, Clone)]
    pub struct RecordingNotificationSink {
        budget: Arc<FailureBudget>,
        sent: Arc<Mutex<Vec<Notification>>>,
    }

    impl RecordingNotificationSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(failures: u32) -> Self {
            Self {
                budget: Arc::new(FailureBudget::new(failures)),
                sent: Arc::default(),
            }
        }

        pub async fn sent(&self) -> Vec<Notification> {
            self.sent.lock().await.clone()
        }
    }

    impl DomainPort for RecordingNotificationSink {}

    #[async_trait]
    impl NotificationSink for RecordingNotificationSink {
        async fn send(&self, notification: &Notification) -> Result<(), PortError> {
            self.budget.next("notification sink").await?;
            self.sent.lock().await.push(notification.clone());
            Ok(())
        }
    }
}
