//! Job execution
//!
//! [`ProposalJobHandler`] is the worker-side half of the lifecycle. Jobs may
//! be delivered more than once, so every handler first checks the proposal
//! is still in the status the job expects and does nothing otherwise.
//!
//! Collaborator calls are retried with exponential backoff on transient
//! errors. When retries run out:
//! - document generation leaves the proposal in PROCESSING for a manual retry
//! - the rejection email reverts the proposal to PENDING

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use core_kernel::{JobId, PortError, ProposalId, RetryPolicy};

use crate::audit::{Actor, AuditAction, AuditEntry, AuditSink};
use crate::error::ProposalError;
use crate::ports::{
    DocumentRenderer, JobRunner, Notification, NotificationSink, ProposalJob, ProposalStore,
    QueuedJob, RenderedDocument, StatusUpdate,
};
use crate::proposal::{DocumentRef, Proposal, ProposalOperation, ProposalPatch, ProposalStatus};
use crate::templates::{TemplateContext, TemplateKind, TemplateSet};

/// Runs `operation` until it succeeds, fails permanently or attempts run out
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    name: &str,
    mut operation: F,
) -> Result<T, PortError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub struct ProposalJobHandler {
    proposals: Arc<dyn ProposalStore>,
    renderer: Arc<dyn DocumentRenderer>,
    notifier: Arc<dyn NotificationSink>,
    audit: Arc<dyn AuditSink>,
    templates: TemplateSet,
    company_name: String,
    retry: RetryPolicy,
}

impl ProposalJobHandler {
    pub fn new(
        proposals: Arc<dyn ProposalStore>,
        renderer: Arc<dyn DocumentRenderer>,
        notifier: Arc<dyn NotificationSink>,
        audit: Arc<dyn AuditSink>,
        company_name: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            proposals,
            renderer,
            notifier,
            audit,
            templates: TemplateSet::default(),
            company_name: company_name.into(),
            retry,
        }
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub async fn handle(&self, queued: QueuedJob) -> Result<(), ProposalError> {
        debug!(job_id = %queued.id, job = queued.job.name(), "handling job");
        match queued.job {
            ProposalJob::GenerateDocument {
                proposal_id,
                notify_client,
                ..
            } => {
                self.generate_document(proposal_id, notify_client, queued.id)
                    .await
            }
            ProposalJob::SendRejectionEmail { proposal_id, .. } => {
                self.send_rejection(proposal_id, queued.id).await
            }
        }
    }

    async fn generate_document(
        &self,
        proposal_id: ProposalId,
        notify_client: bool,
        job_id: JobId,
    ) -> Result<(), ProposalError> {
        let proposal = self.proposals.get(proposal_id).await?;
        match proposal.status {
            ProposalStatus::Processing => {}
            ProposalStatus::Completed => {
                debug!(%proposal_id, %job_id, "document already generated; nothing to do");
                return Ok(());
            }
            other => {
                warn!(%proposal_id, %job_id, status = %other, "stale document job ignored");
                return Ok(());
            }
        }

        let document = match with_retry(&self.retry, "render document", || {
            self.renderer.render(&proposal)
        })
        .await
        {
            Ok(document) => document,
            Err(e) => {
                error!(
                    %proposal_id,
                    %job_id,
                    error = %e,
                    "document generation failed; proposal left in PROCESSING for manual retry"
                );
                self.audit(
                    AuditAction::DocumentFailed,
                    format!("Document generation failed: {}", e),
                    proposal_id,
                )
                .await;
                return Err(ProposalError::dependency("document generation", proposal_id, &e));
            }
        };

        let patch = ProposalPatch::document(DocumentRef {
            location: document.location.clone(),
            generated_at: Utc::now(),
        });
        let completed = match self
            .proposals
            .compare_and_set_status(
                proposal_id,
                ProposalOperation::CompleteDocument.allowed_from(),
                ProposalOperation::CompleteDocument.target(),
                patch,
            )
            .await?
        {
            StatusUpdate::Applied(proposal) => proposal,
            StatusUpdate::Rejected { current } => {
                warn!(%proposal_id, status = %current, "proposal changed while rendering; document discarded");
                return Ok(());
            }
        };

        info!(%proposal_id, location = %document.location, "proposal document generated");
        self.audit(
            AuditAction::DocumentGenerated,
            format!("Document generated at {}", document.location),
            proposal_id,
        )
        .await;

        if notify_client {
            self.send_approval(&completed, document).await;
        }
        Ok(())
    }

    /// Email failures after approval are recorded; the proposal stays COMPLETED
    async fn send_approval(&self, proposal: &Proposal, document: RenderedDocument) {
        let sent = match self
            .templates
            .get(TemplateKind::Approval)
            .render(&TemplateContext::for_proposal(proposal, &self.company_name))
        {
            Ok(email) => {
                let notification = Notification {
                    recipient: proposal.client_email.clone(),
                    subject: email.subject,
                    body_html: email.body_html,
                    attachment: Some(document),
                };
                with_retry(&self.retry, "send approval email", || {
                    self.notifier.send(&notification)
                })
                .await
                .map_err(|e| ProposalError::dependency("approval email", proposal.id, &e))
            }
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                info!(proposal_id = %proposal.id, "approval email sent");
                self.audit(
                    AuditAction::EmailSent,
                    format!("Approval email sent to {}", proposal.client_email),
                    proposal.id,
                )
                .await;
            }
            Err(e) => {
                error!(proposal_id = %proposal.id, error = %e, "approval email failed");
                self.audit(
                    AuditAction::EmailFailed,
                    e.to_string(),
                    proposal.id,
                )
                .await;
            }
        }
    }

    async fn send_rejection(
        &self,
        proposal_id: ProposalId,
        job_id: JobId,
    ) -> Result<(), ProposalError> {
        let proposal = self.proposals.get(proposal_id).await?;
        if proposal.status != ProposalStatus::Rejecting {
            debug!(%proposal_id, %job_id, status = %proposal.status, "rejection job has nothing to do");
            return Ok(());
        }

        let sent = match self
            .templates
            .get(TemplateKind::Rejection)
            .render(&TemplateContext::for_proposal(&proposal, &self.company_name))
        {
            Ok(email) => {
                let notification = Notification {
                    recipient: proposal.client_email.clone(),
                    subject: email.subject,
                    body_html: email.body_html,
                    attachment: None,
                };
                with_retry(&self.retry, "send rejection email", || {
                    self.notifier.send(&notification)
                })
                .await
                .map_err(|e| ProposalError::dependency("rejection email", proposal_id, &e))
            }
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                self.transition(
                    proposal_id,
                    ProposalOperation::ConfirmRejection,
                    ProposalPatch::default(),
                )
                .await?;
                info!(%proposal_id, "proposal rejected");
                self.audit(
                    AuditAction::ProposalRejected,
                    format!("Rejection email sent to {}", proposal.client_email),
                    proposal_id,
                )
                .await;
                Ok(())
            }
            Err(e) => {
                error!(%proposal_id, %job_id, error = %e, "rejection email failed; reverting to PENDING");
                self.transition(
                    proposal_id,
                    ProposalOperation::RevertRejection,
                    ProposalPatch::clear_rejection(),
                )
                .await?;
                self.audit(
                    AuditAction::RejectionReverted,
                    e.to_string(),
                    proposal_id,
                )
                .await;
                Err(e)
            }
        }
    }

    async fn transition(
        &self,
        id: ProposalId,
        operation: ProposalOperation,
        patch: ProposalPatch,
    ) -> Result<Proposal, ProposalError> {
        match self
            .proposals
            .compare_and_set_status(
                id,
                operation.allowed_from(),
                operation.target(),
                patch,
            )
            .await?
        {
            StatusUpdate::Applied(proposal) => Ok(proposal),
            StatusUpdate::Rejected { current } => {
                Err(ProposalError::InvalidTransition { operation, from: current })
            }
        }
    }

    async fn audit(&self, action: AuditAction, description: String, subject: ProposalId) {
        self.audit
            .emit(AuditEntry::new(Actor::System, action, description).about(subject))
            .await;
    }
}

/// In-process job runner backed by a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelJobRunner {
    sender: mpsc::Sender<QueuedJob>,
}

impl ChannelJobRunner {
    /// Creates the runner and the receiving end for [`spawn_worker`]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueuedJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl core_kernel::DomainPort for ChannelJobRunner {}

#[async_trait::async_trait]
impl JobRunner for ChannelJobRunner {
    async fn enqueue(&self, job: QueuedJob) -> Result<JobId, PortError> {
        let id = job.id;
        self.sender
            .send(job)
            .await
            .map_err(|_| PortError::unavailable("job worker"))?;
        Ok(id)
    }
}

/// Consumes jobs until every sender is dropped
pub fn spawn_worker(
    mut receiver: mpsc::Receiver<QueuedJob>,
    handler: Arc<ProposalJobHandler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("proposal job worker started");
        while let Some(job) = receiver.recv().await {
            let job_id = job.id;
            let name = job.job.name();
            let proposal_id = job.job.proposal_id();
            if let Err(e) = handler.handle(job).await {
                error!(%job_id, job = name, %proposal_id, error = %e, "job failed");
            }
        }
        info!("proposal job worker stopped");
    })
}
