//! Proposal application service
//!
//! Request-side half of the lifecycle: creates proposals and performs the
//! guarded transitions that hand work to the job runner. Each transition is
//! a compare-and-set in the store; when the follow-up job cannot be
//! enqueued the status is put back so the operation can be retried.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument};

use core_kernel::{ProposalId, QuoteResultId, UserId};
use domain_rating::QuoteStore;

use crate::audit::{Actor, AuditAction, AuditEntry, AuditSink};
use crate::error::ProposalError;
use crate::ports::{JobRunner, ProposalJob, ProposalStore, QueuedJob, StatusUpdate};
use crate::proposal::{Proposal, ProposalOperation, ProposalPatch, ProposalStatus};
use crate::terms::ProposalTerms;

pub struct ProposalService {
    proposals: Arc<dyn ProposalStore>,
    quotes: Arc<dyn QuoteStore>,
    jobs: Arc<dyn JobRunner>,
    audit: Arc<dyn AuditSink>,
    terms: ProposalTerms,
}

impl ProposalService {
    pub fn new(
        proposals: Arc<dyn ProposalStore>,
        quotes: Arc<dyn QuoteStore>,
        jobs: Arc<dyn JobRunner>,
        audit: Arc<dyn AuditSink>,
        terms: ProposalTerms,
    ) -> Self {
        Self {
            proposals,
            quotes,
            jobs,
            audit,
            terms,
        }
    }

    pub fn terms(&self) -> &ProposalTerms {
        &self.terms
    }

    /// Promotes a quote result into a pending proposal
    #[instrument(skip(self, client_email))]
    pub async fn create(
        &self,
        quote_result_id: QuoteResultId,
        client_email: String,
        actor: UserId,
    ) -> Result<Proposal, ProposalError> {
        let result = self.quotes.get_result(quote_result_id).await?;
        let request = self.quotes.get_request(result.quote_request_id).await?;
        let proposal = Proposal::from_quote(
            &request,
            &result,
            client_email,
            &self.terms,
            actor,
            Utc::now(),
        )?;
        self.proposals.insert(&proposal).await?;

        info!(proposal_id = %proposal.id, insurer = %proposal.insurer_name, "proposal created");
        self.audit(
            Actor::User(actor),
            AuditAction::ProposalCreated,
            format!("Proposal created from {} ({})", result.id, proposal.insurer_name),
            proposal.id,
        )
        .await;
        Ok(proposal)
    }

    pub async fn get(&self, id: ProposalId) -> Result<Proposal, ProposalError> {
        Ok(self.proposals.get(id).await?)
    }

    /// PENDING → APPROVED, then starts document generation with client email
    #[instrument(skip(self))]
    pub async fn approve(&self, id: ProposalId, actor: UserId) -> Result<Proposal, ProposalError> {
        let approved = self
            .apply(id, ProposalOperation::Approve, ProposalPatch::default())
            .await?;
        info!(proposal_id = %id, "proposal approved");
        self.audit(
            Actor::User(actor),
            AuditAction::ProposalApproved,
            "Proposal approved",
            id,
        )
        .await;

        self.start_document(approved, true, actor).await
    }

    /// PENDING → REJECTING and queues the rejection email
    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        id: ProposalId,
        reason: Option<String>,
        actor: UserId,
    ) -> Result<Proposal, ProposalError> {
        let job = QueuedJob::new(ProposalJob::SendRejectionEmail {
            proposal_id: id,
            requested_by: actor,
        });
        let patch = ProposalPatch {
            job_id: Some(job.id),
            rejection_reason: reason,
            ..Default::default()
        };
        let rejecting = self.apply(id, ProposalOperation::Reject, patch).await?;

        if let Err(e) = self.jobs.enqueue(job).await {
            error!(proposal_id = %id, error = %e, "rejection email could not be queued; reverting");
            self.apply(id, ProposalOperation::RevertRejection, ProposalPatch::clear_rejection())
                .await?;
            self.audit(
                Actor::User(actor),
                AuditAction::RejectionReverted,
                format!("Rejection reverted: email could not be queued ({})", e),
                id,
            )
            .await;
            return Err(ProposalError::dependency("queue rejection email", id, &e));
        }

        info!(proposal_id = %id, "proposal rejection requested");
        self.audit(
            Actor::User(actor),
            AuditAction::RejectionRequested,
            "Proposal rejection requested",
            id,
        )
        .await;
        Ok(rejecting)
    }

    /// Starts document generation without notifying the client
    #[instrument(skip(self))]
    pub async fn request_document(
        &self,
        id: ProposalId,
        actor: UserId,
    ) -> Result<Proposal, ProposalError> {
        let proposal = self.proposals.get(id).await?;
        self.start_document(proposal, false, actor).await
    }

    async fn start_document(
        &self,
        proposal: Proposal,
        notify_client: bool,
        actor: UserId,
    ) -> Result<Proposal, ProposalError> {
        let id = proposal.id;
        let restore = proposal.status;
        let job = QueuedJob::new(ProposalJob::GenerateDocument {
            proposal_id: id,
            notify_client,
            requested_by: actor,
        });

        let processing = self
            .apply_from(
                id,
                restore,
                ProposalOperation::RequestDocument,
                ProposalPatch::job(job.id),
            )
            .await?;

        if let Err(e) = self.jobs.enqueue(job).await {
            error!(proposal_id = %id, error = %e, "document job could not be queued; reverting");
            self.apply(
                id,
                ProposalOperation::RevertDocumentRequest(restore),
                ProposalPatch::default(),
            )
            .await?;
            self.audit(
                Actor::User(actor),
                AuditAction::DocumentRequestReverted,
                format!("Document request reverted to {}: {}", restore, e),
                id,
            )
            .await;
            return Err(ProposalError::dependency("queue document generation", id, &e));
        }

        info!(proposal_id = %id, job_id = ?processing.job_id, "document generation queued");
        self.audit(
            Actor::User(actor),
            AuditAction::DocumentRequested,
            "Document generation requested",
            id,
        )
        .await;
        Ok(processing)
    }

    /// Compare-and-set driven by the transition table
    async fn apply(
        &self,
        id: ProposalId,
        operation: ProposalOperation,
        patch: ProposalPatch,
    ) -> Result<Proposal, ProposalError> {
        let update = self
            .proposals
            .compare_and_set_status(id, operation.allowed_from(), operation.target(), patch)
            .await?;
        match update {
            StatusUpdate::Applied(proposal) => Ok(proposal),
            StatusUpdate::Rejected { current } => {
                Err(ProposalError::InvalidTransition { operation, from: current })
            }
        }
    }

    /// Like [`Self::apply`] but only from the single status the caller observed
    async fn apply_from(
        &self,
        id: ProposalId,
        from: ProposalStatus,
        operation: ProposalOperation,
        patch: ProposalPatch,
    ) -> Result<Proposal, ProposalError> {
        let next = operation.apply(from)?;
        match self
            .proposals
            .compare_and_set_status(id, &[from], next, patch)
            .await?
        {
            StatusUpdate::Applied(proposal) => Ok(proposal),
            StatusUpdate::Rejected { current } => {
                Err(ProposalError::InvalidTransition { operation, from: current })
            }
        }
    }

    async fn audit(
        &self,
        actor: Actor,
        action: AuditAction,
        description: impl Into<String>,
        subject: ProposalId,
    ) {
        self.audit
            .emit(AuditEntry::new(actor, action, description).about(subject))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::mock::InMemoryAuditSink;
    use crate::ports::mock::{InMemoryProposalStore, RecordingJobRunner};
    use core_kernel::Money;
    use domain_rating::ports::mock::InMemoryQuoteStore;
    use domain_rating::{
        ClientDetails, OfferedLimits, QuoteDetails, QuoteRequest, QuoteResult, RequestedLimits, RiskTier,
    };
    use rust_decimal_macros::dec;

    struct Harness {
        service: ProposalService,
        store: InMemoryProposalStore,
        jobs: RecordingJobRunner,
        audit: InMemoryAuditSink,
        result_id: QuoteResultId,
    }

    async fn harness() -> Harness {
        let quotes = InMemoryQuoteStore::new();
        let request = QuoteRequest::create(
            QuoteDetails {
                client: ClientDetails {
                    name: "Transportes Silva".to_string(),
                    document: "12.345.678/0001-90".to_string(),
                    address: None,
                    contact: None,
                },
                cargo_type: "Electronics".to_string(),
                cargo_value: Money::brl(dec!(50000)),
                monthly_revenue: Money::brl(dec!(200000)),
                origin: "Curitiba".to_string(),
                destination: "Manaus".to_string(),
                limits: RequestedLimits {
                    general: Money::brl(dec!(100000)),
                    container: None,
                    rj_operation: None,
                },
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap();
        let insurer = core_kernel::InsurerId::new();
        let result = QuoteResult {
            id: QuoteResult::id_for(request.id, insurer),
            quote_request_id: request.id,
            insurer_id: insurer,
            insurer_name: "Alpha".to_string(),
            rctr_c_rate: core_kernel::Rate::from_percentage(dec!(0.625)),
            rc_dc_rate: core_kernel::Rate::from_percentage(dec!(0.375)),
            limits: OfferedLimits {
                rctr_c: Money::brl(dec!(100000)),
                rc_dc: Money::brl(dec!(100000)),
                container: None,
                rj_operation: None,
            },
            rctr_c_franchise: "10% com mínimo de R$ 1.000,00".to_string(),
            rc_dc_franchise: "10% com mínimo de R$ 1.000,00".to_string(),
            premium: Money::brl(dec!(2000)),
            minimum_applied: false,
            risk_tier: RiskTier::High,
            high_risk_route: false,
            observations: String::new(),
        };
        quotes.insert_request(&request, &[result.clone()]).await.unwrap();

        let store = InMemoryProposalStore::new();
        let jobs = RecordingJobRunner::new();
        let audit = InMemoryAuditSink::new();
        let service = ProposalService::new(
            Arc::new(store.clone()),
            Arc::new(quotes),
            Arc::new(jobs.clone()),
            Arc::new(audit.clone()),
            ProposalTerms::default(),
        );
        Harness {
            service,
            store,
            jobs,
            audit,
            result_id: result.id,
        }
    }

    #[tokio::test]
    async fn test_approve_moves_to_processing_and_queues_document() {
        let h = harness().await;
        let proposal = h.service.create(h.result_id, "cliente@silva.com.br".into(), UserId::new()).await.unwrap();

        let approved = h.service.approve(proposal.id, UserId::new()).await.unwrap();
        assert_eq!(approved.status, ProposalStatus::Processing);

        let jobs = h.jobs.jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(approved.job_id, Some(jobs[0].id));
        assert!(matches!(
            jobs[0].job,
            ProposalJob::GenerateDocument { notify_client: true, .. }
        ));
        assert_eq!(
            h.audit.actions().await,
            vec![
                AuditAction::ProposalCreated,
                AuditAction::ProposalApproved,
                AuditAction::DocumentRequested
            ]
        );
    }

    #[tokio::test]
    async fn test_approve_twice_is_invalid() {
        let h = harness().await;
        let proposal = h.service.create(h.result_id, "a@b.com".into(), UserId::new()).await.unwrap();
        h.service.approve(proposal.id, UserId::new()).await.unwrap();

        let err = h.service.approve(proposal.id, UserId::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ProposalError::InvalidTransition {
                operation: ProposalOperation::Approve,
                from: ProposalStatus::Processing
            }
        ));
    }

    #[tokio::test]
    async fn test_reject_enqueue_failure_reverts_to_pending() {
        let h = harness().await;
        let proposal = h.service.create(h.result_id, "a@b.com".into(), UserId::new()).await.unwrap();
        h.jobs.set_unavailable(true).await;

        let err = h
            .service
            .reject(proposal.id, Some("Risco fora do apetite".into()), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProposalError::Dependency { .. }));
        let reverted = h.store.get(proposal.id).await.unwrap();
        assert_eq!(reverted.status, ProposalStatus::Pending);
        assert_eq!(reverted.rejection_reason, None);
    }

    #[tokio::test]
    async fn test_approve_enqueue_failure_leaves_approved() {
        let h = harness().await;
        let proposal = h.service.create(h.result_id, "a@b.com".into(), UserId::new()).await.unwrap();
        h.jobs.set_unavailable(true).await;

        assert!(h.service.approve(proposal.id, UserId::new()).await.is_err());
        assert_eq!(h.store.get(proposal.id).await.unwrap().status, ProposalStatus::Approved);

        // Retrying the document request succeeds once the runner is back
        h.jobs.set_unavailable(false).await;
        let processing = h.service.request_document(proposal.id, UserId::new()).await.unwrap();
        assert_eq!(processing.status, ProposalStatus::Processing);
    }

    #[tokio::test]
    async fn test_document_request_refused_while_processing() {
        let h = harness().await;
        let proposal = h.service.create(h.result_id, "a@b.com".into(), UserId::new()).await.unwrap();
        h.service.request_document(proposal.id, UserId::new()).await.unwrap();

        let err = h.service.request_document(proposal.id, UserId::new()).await.unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(h.jobs.jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_email() {
        let h = harness().await;
        let err = h.service.create(h.result_id, "nobody".into(), UserId::new()).await.unwrap_err();
        assert!(matches!(err, ProposalError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_from_unknown_result_is_not_found() {
        let h = harness().await;
        let err = h
            .service
            .create(QuoteResultId::new(), "a@b.com".into(), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProposalError::NotFound(_)));
    }
}
