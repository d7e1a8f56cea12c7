//! HTTP API Tests
//!
//! Drives the router through `axum-test` with in-memory ports behind the
//! services, so every test runs without a database.
//!
//! # Test Organization
//!
//! - `health_tests` - liveness and readiness
//! - `auth_tests` - token handling and role checks
//! - `quote_tests` - rating, versioning and in-place edits
//! - `proposal_tests` - creation and lifecycle transitions
//! - `audit_tests` - audit trail access
//! - `sink_tests` - document renderer and notification sink

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable, UserId};
use domain_proposal::audit::mock::InMemoryAuditSink;
use domain_proposal::ports::mock::{InMemoryProposalStore, RecordingJobRunner};
use domain_proposal::{ProposalService, ProposalTerms};
use domain_rating::catalogue::mock::InMemoryCatalogue;
use domain_rating::ports::mock::InMemoryQuoteStore;
use domain_rating::RatingService;
use interface_api::auth::{create_token, Role};
use interface_api::config::ApiConfig;
use interface_api::dto::audit::AuditEntryResponse;
use interface_api::dto::proposals::ProposalResponse;
use interface_api::dto::quotes::QuoteResponse;
use interface_api::{create_router, AppState};
use test_utils::{CatalogueFixtures, QuoteFixtures};

const SECRET: &str = "api-test-secret";

struct StaticHealth(AdapterHealth);

#[async_trait]
impl HealthCheckable for StaticHealth {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "static".to_string(),
            status: self.0,
            latency_ms: 1,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

struct TestApp {
    server: TestServer,
    jobs: RecordingJobRunner,
    proposals: Arc<ProposalService>,
}

impl TestApp {
    fn with_health(health: AdapterHealth) -> Self {
        let scenario = CatalogueFixtures::scenario();
        let store = InMemoryProposalStore::new();
        let quotes = Arc::new(InMemoryQuoteStore::new().with_lineage_lock(Arc::new(store.clone())));
        let jobs = RecordingJobRunner::new();
        let audit = InMemoryAuditSink::new();

        let rating = RatingService::new(
            Arc::new(InMemoryCatalogue::new(scenario.snapshot)),
            quotes.clone(),
            Arc::new(store.clone()),
        );
        let proposals = Arc::new(ProposalService::new(
            Arc::new(store),
            quotes,
            Arc::new(jobs.clone()),
            Arc::new(audit.clone()),
            ProposalTerms::default(),
        ));
        let config = ApiConfig {
            jwt_secret: SECRET.to_string(),
            ..Default::default()
        };
        let state = AppState::new(
            Arc::new(rating),
            proposals.clone(),
            Arc::new(audit),
            Arc::new(StaticHealth(health)),
            config,
        );

        Self {
            server: TestServer::new(create_router(state)).unwrap(),
            jobs,
            proposals,
        }
    }

    fn new() -> Self {
        Self::with_health(AdapterHealth::Healthy)
    }
}

fn bearer(role: Role) -> HeaderValue {
    let token = create_token(UserId::new(), &[role], SECRET, 300).unwrap();
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn quote_body() -> Value {
    json!({
        "client_name": "Transportes Silva Ltda",
        "client_document": "12.345.678/0001-90",
        "cargo_type": "Electronics",
        "cargo_value": "50000",
        "monthly_revenue": "200000",
        "origin": "Rio de Janeiro",
        "destination": "Curitiba",
        "general_limit": "600000"
    })
}

async fn post_as(app: &TestApp, role: Role, path: &str, body: &Value) -> TestResponse {
    app.server
        .post(path)
        .add_header(AUTHORIZATION, bearer(role))
        .json(body)
        .await
}

async fn get_as(app: &TestApp, role: Role, path: &str) -> TestResponse {
    app.server.get(path).add_header(AUTHORIZATION, bearer(role)).await
}

async fn create_quote(app: &TestApp) -> QuoteResponse {
    let response = post_as(app, Role::Broker, "/api/v1/quotes", &quote_body()).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<QuoteResponse>()
}

async fn create_proposal(app: &TestApp) -> (QuoteResponse, ProposalResponse) {
    let quote = create_quote(app).await;
    let alpha = quote
        .offers
        .iter()
        .find(|o| o.insurer_name == "Alpha Seguros")
        .unwrap();
    let response = post_as(
        app,
        Role::Broker,
        "/api/v1/proposals",
        &json!({
            "quote_result_id": alpha.id,
            "client_email": QuoteFixtures::CLIENT_EMAIL,
        }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    (quote, response.json::<ProposalResponse>())
}

// ============================================================================
// Health Tests
// ============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new();
        let response = app.server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_reflects_store_health() {
        let ready = TestApp::new();
        assert_eq!(ready.server.get("/health/ready").await.status_code(), StatusCode::OK);

        let down = TestApp::with_health(AdapterHealth::Unhealthy);
        let response = down.server.get("/health/ready").await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.json::<Value>()["status"], "unavailable");
    }
}

// ============================================================================
// Auth Tests
// ============================================================================

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = TestApp::new();
        let response = app.server.post("/api/v1/quotes").json(&quote_body()).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_with_wrong_secret_is_unauthorized() {
        let app = TestApp::new();
        let token = create_token(UserId::new(), &[Role::Admin], "other", 300).unwrap();
        let response = app
            .server
            .post("/api/v1/quotes")
            .add_header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            )
            .json(&quote_body())
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auditor_cannot_request_quotes() {
        let app = TestApp::new();
        let response = post_as(&app, Role::Auditor, "/api/v1/quotes", &quote_body()).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_broker_cannot_approve() {
        let app = TestApp::new();
        let (_, proposal) = create_proposal(&app).await;

        let path = format!("/api/v1/proposals/{}/approve", proposal.id);
        let response = post_as(&app, Role::Broker, &path, &json!({})).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let current = get_as(&app, Role::Broker, &format!("/api/v1/proposals/{}", proposal.id)).await;
        assert_eq!(current.json::<ProposalResponse>().status, "PENDING");
    }
}

// ============================================================================
// Quote Tests
// ============================================================================

mod quote_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_quote_rates_every_active_insurer() {
        let app = TestApp::new();
        let quote = create_quote(&app).await;

        assert_eq!(quote.version, 1);
        assert!(quote.is_current);
        assert_eq!(quote.offers.len(), 2);

        let alpha = quote.offers.iter().find(|o| o.insurer_name == "Alpha Seguros").unwrap();
        assert_eq!(alpha.rctr_c_rate, dec!(0.625));
        assert_eq!(alpha.rc_dc_rate, dec!(0.375));
        assert_eq!(alpha.premium, dec!(2000.00));
        assert_eq!(alpha.risk_tier, "HIGH");
        assert!(alpha.high_risk_route);

        let beta = quote.offers.iter().find(|o| o.insurer_name == "Beta Seguros").unwrap();
        assert_eq!(beta.premium, dec!(1690.00));
        assert_eq!(beta.rctr_c_limit, dec!(400000));
    }

    #[tokio::test]
    async fn test_invalid_body_is_unprocessable() {
        let app = TestApp::new();
        let mut body = quote_body();
        body["monthly_revenue"] = json!("0");
        body["origin"] = json!("");

        let response = post_as(&app, Role::Broker, "/api/v1/quotes", &body).await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let error = response.json::<Value>();
        assert_eq!(error["error"], "validation_error");
        assert_eq!(error["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_merchandise_yields_no_offers() {
        let app = TestApp::new();
        let mut body = quote_body();
        body["cargo_type"] = json!("Livestock");

        let response = post_as(&app, Role::Broker, "/api/v1/quotes", &body).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert!(response.json::<QuoteResponse>().offers.is_empty());
    }

    #[tokio::test]
    async fn test_get_quote_and_unknown_quote() {
        let app = TestApp::new();
        let quote = create_quote(&app).await;

        let response = get_as(&app, Role::Auditor, &format!("/api/v1/quotes/{}", quote.id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<QuoteResponse>().offers.len(), 2);

        let missing = get_as(
            &app,
            Role::Broker,
            &format!("/api/v1/quotes/{}", uuid::Uuid::new_v4()),
        )
        .await;
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_new_version_links_to_predecessor() {
        let app = TestApp::new();
        let first = create_quote(&app).await;

        let mut body = quote_body();
        body["monthly_revenue"] = json!("600000");
        let path = format!("/api/v1/quotes/{}/versions", first.id);
        let response = post_as(&app, Role::Manager, &path, &body).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let second = response.json::<QuoteResponse>();
        assert_eq!(second.version, 2);
        assert_eq!(second.lineage_id, first.lineage_id);
        assert_eq!(second.previous_version, Some(first.id));

        let old = get_as(&app, Role::Broker, &format!("/api/v1/quotes/{}", first.id)).await;
        assert!(!old.json::<QuoteResponse>().is_current);

        let again = post_as(&app, Role::Manager, &path, &quote_body()).await;
        assert_eq!(again.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_edit_in_place_until_lineage_locked() {
        let app = TestApp::new();
        let (quote, proposal) = create_proposal(&app).await;
        let path = format!("/api/v1/quotes/{}", quote.id);

        let mut body = quote_body();
        body["destination"] = json!("Porto Alegre");
        let edited = app
            .server
            .put(&path)
            .add_header(AUTHORIZATION, bearer(Role::Broker))
            .json(&body)
            .await;
        assert_eq!(edited.status_code(), StatusCode::OK);
        assert_eq!(edited.json::<QuoteResponse>().destination, "Porto Alegre");

        let approve = format!("/api/v1/proposals/{}/approve", proposal.id);
        assert_eq!(
            post_as(&app, Role::Manager, &approve, &json!({})).await.status_code(),
            StatusCode::ACCEPTED
        );

        let locked = app
            .server
            .put(&path)
            .add_header(AUTHORIZATION, bearer(Role::Broker))
            .json(&quote_body())
            .await;
        assert_eq!(locked.status_code(), StatusCode::CONFLICT);
    }
}

// ============================================================================
// Proposal Tests
// ============================================================================

mod proposal_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_proposal_copies_offer() {
        let app = TestApp::new();
        let (quote, proposal) = create_proposal(&app).await;

        assert_eq!(proposal.status, "PENDING");
        assert_eq!(proposal.quote_request_id, quote.id);
        assert_eq!(proposal.insurer_name, "Alpha Seguros");
        assert_eq!(proposal.premium, dec!(2000.00));
        assert_eq!(proposal.payment_frequency, "Mensal");
        assert_eq!(proposal.policy_duration_months, 12);
        assert!(proposal.job_id.is_none());
    }

    #[tokio::test]
    async fn test_invalid_email_is_unprocessable() {
        let app = TestApp::new();
        let quote = create_quote(&app).await;
        let response = post_as(
            &app,
            Role::Broker,
            "/api/v1/proposals",
            &json!({ "quote_result_id": quote.offers[0].id, "client_email": "financeiro" }),
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_approve_queues_document_and_second_approve_conflicts() {
        let app = TestApp::new();
        let (_, proposal) = create_proposal(&app).await;
        let path = format!("/api/v1/proposals/{}/approve", proposal.id);

        let response = post_as(&app, Role::Manager, &path, &json!({})).await;
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        let approved = response.json::<ProposalResponse>();
        assert_eq!(approved.status, "PROCESSING");
        assert!(approved.job_id.is_some());
        assert_eq!(app.jobs.jobs().await.len(), 1);

        let again = post_as(&app, Role::Manager, &path, &json!({})).await;
        assert_eq!(again.status_code(), StatusCode::CONFLICT);
        assert!(again.json::<Value>()["message"]
            .as_str()
            .unwrap()
            .contains("cannot approve proposal in state PROCESSING"));
    }

    #[tokio::test]
    async fn test_reject_with_and_without_reason() {
        let app = TestApp::new();
        let (_, first) = create_proposal(&app).await;
        let response = post_as(
            &app,
            Role::Manager,
            &format!("/api/v1/proposals/{}/reject", first.id),
            &json!({ "reason": "Cliente desistiu" }),
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        let rejecting = response.json::<ProposalResponse>();
        assert_eq!(rejecting.status, "REJECTING");
        assert_eq!(rejecting.rejection_reason.as_deref(), Some("Cliente desistiu"));

        let (_, second) = create_proposal(&app).await;
        let response = app
            .server
            .post(&format!("/api/v1/proposals/{}/reject", second.id))
            .add_header(AUTHORIZATION, bearer(Role::Admin))
            .await;
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        assert!(response.json::<ProposalResponse>().rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_reject_reverts_when_queue_unavailable() {
        let app = TestApp::new();
        let (_, proposal) = create_proposal(&app).await;
        app.jobs.set_unavailable(true).await;

        let response = post_as(
            &app,
            Role::Manager,
            &format!("/api/v1/proposals/{}/reject", proposal.id),
            &json!({}),
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let current = get_as(&app, Role::Manager, &format!("/api/v1/proposals/{}", proposal.id)).await;
        assert_eq!(current.json::<ProposalResponse>().status, "PENDING");
    }

    #[tokio::test]
    async fn test_any_role_may_request_document() {
        let app = TestApp::new();
        let (_, proposal) = create_proposal(&app).await;

        let response = post_as(
            &app,
            Role::Auditor,
            &format!("/api/v1/proposals/{}/generate-pdf", proposal.id),
            &json!({}),
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        assert_eq!(response.json::<ProposalResponse>().status, "PROCESSING");
    }

    #[tokio::test]
    async fn test_unknown_proposal_is_not_found() {
        let app = TestApp::new();
        let response = get_as(
            &app,
            Role::Broker,
            &format!("/api/v1/proposals/{}", uuid::Uuid::new_v4()),
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Audit Tests
// ============================================================================

mod audit_tests {
    use super::*;

    #[tokio::test]
    async fn test_auditor_reads_recent_entries() {
        let app = TestApp::new();
        let (_, proposal) = create_proposal(&app).await;
        post_as(
            &app,
            Role::Manager,
            &format!("/api/v1/proposals/{}/approve", proposal.id),
            &json!({}),
        )
        .await;

        let response = get_as(&app, Role::Auditor, "/api/v1/audit?limit=2").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let entries = response.json::<Vec<AuditEntryResponse>>();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "DOCUMENT_REQUESTED");
        assert_eq!(entries[1].action, "PROPOSAL_APPROVED");
    }

    #[tokio::test]
    async fn test_audit_requires_auditor_role() {
        let app = TestApp::new();
        let response = get_as(&app, Role::Manager, "/api/v1/audit").await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_audit_limit_out_of_range() {
        let app = TestApp::new();
        let response = get_as(&app, Role::Auditor, "/api/v1/audit?limit=0").await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

// ============================================================================
// Sink Tests
// ============================================================================

mod sink_tests {
    use super::*;
    use domain_proposal::{DocumentRenderer, Notification, NotificationSink};
    use interface_api::sinks::{proposal_document, FileDocumentRenderer, LogNotificationSink};

    #[tokio::test]
    async fn test_file_renderer_writes_document() {
        let app = TestApp::new();
        let (_, created) = create_proposal(&app).await;
        let proposal = app
            .proposals
            .get(core_kernel::ProposalId::from_uuid(created.id))
            .await
            .unwrap();

        let dir = std::env::temp_dir().join(format!("cargo-quotes-{}", uuid::Uuid::new_v4()));
        let document = FileDocumentRenderer::new(&dir).render(&proposal).await.unwrap();

        let written = tokio::fs::read_to_string(&document.location).await.unwrap();
        assert_eq!(written.as_bytes(), document.bytes.as_slice());
        assert!(written.contains("Alpha Seguros"));
        assert!(written.contains("Pagamento: Mensal"));
        assert_eq!(written, proposal_document(&proposal));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_log_sink_accepts_email() {
        let notification = Notification {
            recipient: QuoteFixtures::CLIENT_EMAIL.to_string(),
            subject: "Proposta aprovada".to_string(),
            body_html: "<p>Olá</p>".to_string(),
            attachment: None,
        };
        assert!(LogNotificationSink.send(&notification).await.is_ok());
    }
}
