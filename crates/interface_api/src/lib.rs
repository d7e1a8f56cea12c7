//! HTTP API Layer
//!
//! This crate provides the REST API for the cargo quoting platform using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Quotes, proposals, audit trail and health checks
//! - **Middleware**: JWT authentication and request logging
//! - **Auth**: Roles and the access policy consulted by every handler
//! - **DTOs**: Request/Response data transfer objects with validation
//! - **Sinks**: Document renderer and notification sink used by the job worker
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::postgres(pool, config, jobs)?;
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod sinks;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_proposal::{AuditLog, JobRunner, ProposalService};
use domain_rating::RatingService;
use infra_db::{PgAuditLog, PgCatalogue, PgProposalStore, PgQuoteStore};

use crate::auth::AccessPolicy;
use crate::config::ApiConfig;
use crate::handlers::{audit, health, proposals, quotes};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub rating: Arc<RatingService>,
    pub proposals: Arc<ProposalService>,
    pub audit_log: Arc<dyn AuditLog>,
    /// Checked by `/health/ready`
    pub readiness: Arc<dyn HealthCheckable>,
    pub access: AccessPolicy,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        rating: Arc<RatingService>,
        proposals: Arc<ProposalService>,
        audit_log: Arc<dyn AuditLog>,
        readiness: Arc<dyn HealthCheckable>,
        config: ApiConfig,
    ) -> Self {
        Self {
            rating,
            proposals,
            audit_log,
            readiness,
            access: AccessPolicy,
            config,
        }
    }

    /// Wires the services to the PostgreSQL adapters
    pub fn postgres(
        pool: PgPool,
        config: ApiConfig,
        jobs: Arc<dyn JobRunner>,
    ) -> Result<Self, ::config::ConfigError> {
        let catalogue = Arc::new(PgCatalogue::new(pool.clone()));
        let quotes = Arc::new(PgQuoteStore::new(pool.clone()));
        let proposals = Arc::new(PgProposalStore::new(pool.clone()));
        let audit = Arc::new(PgAuditLog::new(pool));

        let rating = RatingService::new(catalogue.clone(), quotes.clone(), proposals.clone());
        let proposal_service = ProposalService::new(
            proposals,
            quotes,
            jobs,
            audit.clone(),
            config.proposal_terms()?,
        );

        Ok(Self::new(
            Arc::new(rating),
            Arc::new(proposal_service),
            audit,
            catalogue,
            config,
        ))
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Services, access policy and configuration
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let quote_routes = Router::new()
        .route("/", post(quotes::create_quote))
        .route("/:id", get(quotes::get_quote).put(quotes::edit_quote))
        .route("/:id/versions", post(quotes::create_version));

    let proposal_routes = Router::new()
        .route("/", post(proposals::create_proposal))
        .route("/:id", get(proposals::get_proposal))
        .route("/:id/approve", post(proposals::approve_proposal))
        .route("/:id/reject", post(proposals::reject_proposal))
        .route("/:id/generate-pdf", post(proposals::generate_document));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/quotes", quote_routes)
        .nest("/proposals", proposal_routes)
        .route("/audit", get(audit::list_audit_entries))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
