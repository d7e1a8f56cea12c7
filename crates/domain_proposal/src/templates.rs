//! Email templates
//!
//! Templates are rendered with Tera. HTML bodies are autoescaped, so client
//! supplied values such as names cannot inject markup; subjects are plain
//! text and rendered without escaping. A placeholder with no value in the
//! context is a [`ProposalError::Template`]; optional values such as
//! `reason` belong behind `{% if reason is defined %}` or a `default` filter.

use std::error::Error as _;

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

use domain_rating::premium::format_brazilian;

use crate::error::ProposalError;
use crate::proposal::Proposal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateKind {
    Approval,
    Rejection,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Approval => "APPROVAL",
            TemplateKind::Rejection => "REJECTION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub kind: TemplateKind,
    pub subject: String,
    pub body_html: String,
}

/// A template with its placeholders filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub body_html: String,
}

impl EmailTemplate {
    pub fn default_for(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Approval => Self {
                kind,
                subject: "Sua Proposta de Seguro foi Aprovada! - {{client_name}}".to_string(),
                body_html: concat!(
                    "<html><body>",
                    "<p>Prezado(a) {{client_name}},</p>",
                    "<p>Temos o prazer de informar que sua proposta de seguro, com base na cotação ",
                    "realizada em {{proposal_date}}, foi <strong>APROVADA</strong>!</p>",
                    "<p>O valor do prêmio total mensal é de <strong>{{total_premium}}</strong>.</p>",
                    "<p>O documento da sua proposta aprovada está anexado a este e-mail para sua referência.</p>",
                    "<p>Agradecemos a confiança em nossos serviços.</p>",
                    "<p>Atenciosamente,<br><strong>Equipe {{company_name}}</strong></p>",
                    "</body></html>",
                )
                .to_string(),
            },
            TemplateKind::Rejection => Self {
                kind,
                subject: "Atualização sobre sua Proposta de Seguro - {{client_name}}".to_string(),
                body_html: concat!(
                    "<html><body>",
                    "<p>Prezado(a) {{client_name}},</p>",
                    "<p>Gostaríamos de informar que sua proposta de seguro, com base na cotação ",
                    "realizada em {{proposal_date}}, foi analisada e, no momento, não poderemos ",
                    "prosseguir com a emissão da apólice nos termos solicitados.</p>",
                    "<p>Agradecemos o seu interesse em nossos serviços e permanecemos à disposição ",
                    "para futuras cotações.</p>",
                    "<p>Atenciosamente,<br>Equipe {{company_name}}</p>",
                    "</body></html>",
                )
                .to_string(),
            },
        }
    }

    pub fn render(&self, context: &TemplateContext) -> Result<RenderedEmail, ProposalError> {
        Ok(RenderedEmail {
            subject: render(&self.subject, context, false)?,
            body_html: render(&self.body_html, context, true)?,
        })
    }
}

/// The pair of templates used by the job handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    pub approval: EmailTemplate,
    pub rejection: EmailTemplate,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            approval: EmailTemplate::default_for(TemplateKind::Approval),
            rejection: EmailTemplate::default_for(TemplateKind::Rejection),
        }
    }
}

impl TemplateSet {
    pub fn get(&self, kind: TemplateKind) -> &EmailTemplate {
        match kind {
            TemplateKind::Approval => &self.approval,
            TemplateKind::Rejection => &self.rejection,
        }
    }
}

/// Values available to placeholders
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    context: Context,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        self.context.insert(key.into(), &value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(|value| value.as_str())
    }

    /// Standard variables for a proposal email
    pub fn for_proposal(proposal: &Proposal, company_name: &str) -> Self {
        let context = Self::new()
            .with("client_name", proposal.client_name.clone())
            .with("proposal_date", proposal.created_at.format("%d/%m/%Y").to_string())
            .with(
                "total_premium",
                format!(
                    "{} {}",
                    proposal.premium.currency().symbol(),
                    format_brazilian(proposal.premium.amount())
                ),
            )
            .with("company_name", company_name)
            .with("insurer_name", proposal.insurer_name.clone())
            .with("valid_until", proposal.valid_until.format("%d/%m/%Y").to_string());

        match &proposal.rejection_reason {
            Some(reason) => context.with("reason", reason.clone()),
            None => context,
        }
    }

    pub fn as_tera(&self) -> &Context {
        &self.context
    }
}

/// Renders one template string; `autoescape` is for HTML output
pub fn render(
    template: &str,
    context: &TemplateContext,
    autoescape: bool,
) -> Result<String, ProposalError> {
    Tera::one_off(template, context.as_tera(), autoescape)
        .map_err(|e| ProposalError::Template(template_error_chain(&e)))
}

/// Tera nests the useful message (e.g. the missing variable) in its sources
fn template_error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_known_placeholders() {
        let context = TemplateContext::new()
            .with("client_name", "Transportes Silva")
            .with("company_name", "SHAMAH SEGUROS");
        assert_eq!(
            render("Olá {{client_name}}, {{ company_name }}", &context, true).unwrap(),
            "Olá Transportes Silva, SHAMAH SEGUROS"
        );
    }

    #[test]
    fn test_missing_placeholder_is_an_error() {
        let error = render("Dear {{nobody}}!", &TemplateContext::new(), true).unwrap_err();
        assert!(matches!(error, ProposalError::Template(ref message) if message.contains("nobody")));
    }

    #[test]
    fn test_optional_values_use_default_filter() {
        let template = "Motivo: {{ reason | default(value=\"não informado\") }}";
        assert_eq!(
            render(template, &TemplateContext::new(), true).unwrap(),
            "Motivo: não informado"
        );
        let context = TemplateContext::new().with("reason", "limite excedido");
        assert_eq!(render(template, &context, true).unwrap(), "Motivo: limite excedido");
    }

    #[test]
    fn test_values_are_not_re_expanded() {
        let context = TemplateContext::new()
            .with("a", "{{b}}")
            .with("b", "boom");
        assert_eq!(render("{{a}}", &context, false).unwrap(), "{{b}}");
    }

    #[test]
    fn test_html_body_escapes_client_markup() {
        let context = TemplateContext::new()
            .with("client_name", "<script>alert(1)</script>")
            .with("proposal_date", "01/02/2025")
            .with("total_premium", "R$ 2.000,00")
            .with("company_name", "SHAMAH SEGUROS");

        let email = TemplateSet::default()
            .get(TemplateKind::Approval)
            .render(&context)
            .unwrap();

        assert!(!email.body_html.contains("<script>"));
        assert!(email.body_html.contains("&lt;script&gt;"));
        // Subjects are plain text and keep the value as typed
        assert!(email.subject.ends_with("<script>alert(1)</script>"));
    }

    #[test]
    fn test_default_templates_mention_client() {
        let context = TemplateContext::new()
            .with("client_name", "ACME")
            .with("proposal_date", "01/02/2025")
            .with("company_name", "SHAMAH SEGUROS");
        let email = TemplateSet::default()
            .get(TemplateKind::Rejection)
            .render(&context)
            .unwrap();
        assert!(email.subject.ends_with("ACME"));
        assert!(email.body_html.contains("Equipe SHAMAH SEGUROS"));
    }
}
