//! Proposal Domain - Binding offers and their lifecycle
//!
//! This crate provides:
//! - The proposal aggregate and its status transition table
//! - Proposal terms (validity, payment frequency, duration)
//! - Email templates with `{{variable}}` placeholders
//! - Audit entries and sinks
//! - The request-side service (approve, reject, request document)
//! - The worker-side job handler with retry and rollback

pub mod error;
pub mod proposal;
pub mod terms;
pub mod templates;
pub mod audit;
pub mod ports;
pub mod service;
pub mod jobs;

pub use error::ProposalError;
pub use proposal::{DocumentRef, Proposal, ProposalOperation, ProposalPatch, ProposalStatus};
pub use terms::ProposalTerms;
pub use templates::{EmailTemplate, RenderedEmail, TemplateContext, TemplateKind, TemplateSet};
pub use audit::{Actor, AuditAction, AuditEntry, AuditLog, AuditSink, TracingAuditSink};
pub use ports::{
    DocumentRenderer, JobRunner, Notification, NotificationSink, ProposalJob, ProposalStore,
    QueuedJob, RenderedDocument, StatusUpdate,
};
pub use service::ProposalService;
pub use jobs::{spawn_worker, with_retry, ChannelJobRunner, ProposalJobHandler};
