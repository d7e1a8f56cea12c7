//! Server-side document renderer and notification sink
//!
//! The renderer writes a plain-text summary of the proposal to a directory;
//! the notification sink hands emails to the log. Both are swapped for real
//! integrations by implementing the same domain ports.

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, PortError};
use domain_proposal::{DocumentRenderer, Notification, NotificationSink, Proposal, RenderedDocument};

/// Writes `<id>.txt` documents under a base directory
#[derive(Debug, Clone)]
pub struct FileDocumentRenderer {
    base_dir: PathBuf,
}

impl FileDocumentRenderer {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

/// Text body of a proposal document
pub fn proposal_document(proposal: &Proposal) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "PROPOSTA {}", proposal.id);
    let _ = writeln!(text, "Seguradora: {}", proposal.insurer_name);
    let _ = writeln!(text, "Cliente: {}", proposal.client_name);
    let _ = writeln!(text);
    let _ = writeln!(
        text,
        "RCTR-C: taxa {}%, limite {}, franquia {}",
        proposal.rctr_c_rate.as_percentage(),
        proposal.rctr_c_limit,
        proposal.rctr_c_franchise
    );
    let _ = writeln!(
        text,
        "RC-DC: taxa {}%, limite {}, franquia {}",
        proposal.rc_dc_rate.as_percentage(),
        proposal.rc_dc_limit,
        proposal.rc_dc_franchise
    );
    let _ = writeln!(text, "Prêmio mensal: {}", proposal.premium);
    let _ = writeln!(text, "Pagamento: {}", proposal.payment_frequency);
    let _ = writeln!(text, "Vigência: {} meses", proposal.policy_duration_months);
    let _ = writeln!(text, "Válida até: {}", proposal.valid_until.format("%d/%m/%Y"));
    if !proposal.observations.is_empty() {
        let _ = writeln!(text);
        let _ = writeln!(text, "Observações: {}", proposal.observations);
    }
    text
}

impl DomainPort for FileDocumentRenderer {}

#[async_trait]
impl DocumentRenderer for FileDocumentRenderer {
    async fn render(&self, proposal: &Proposal) -> Result<RenderedDocument, PortError> {
        let file_name = format!("{}.txt", proposal.id);
        let path = self.base_dir.join(&file_name);
        let bytes = proposal_document(proposal).into_bytes();

        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| PortError::connection(format!("document directory: {}", e)))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PortError::connection(format!("write {}: {}", path.display(), e)))?;

        Ok(RenderedDocument {
            location: path.display().to_string(),
            file_name,
            content_type: "text/plain; charset=utf-8".to_string(),
            bytes,
        })
    }
}

/// Logs emails instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

impl DomainPort for LogNotificationSink {}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, notification: &Notification) -> Result<(), PortError> {
        info!(
            target: "mail",
            recipient = %notification.recipient,
            subject = %notification.subject,
            attachment = notification.attachment.as_ref().map(|a| a.file_name.as_str()).unwrap_or("-"),
            "email dispatched"
        );
        Ok(())
    }
}
