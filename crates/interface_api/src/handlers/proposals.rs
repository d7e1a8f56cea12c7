//! Proposal handlers
//!
//! Approve, reject and document requests return `202 Accepted`: the status
//! change is stored and the document or email work is queued.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ProposalId, QuoteResultId};

use crate::auth::{Claims, Permission};
use crate::dto::proposals::{CreateProposalRequest, ProposalResponse, RejectProposalRequest};
use crate::{error::ApiError, AppState};

/// Promotes a quote result into a pending proposal
pub async fn create_proposal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateProposalRequest>,
) -> Result<(StatusCode, Json<ProposalResponse>), ApiError> {
    let user = state.access.authorize(&claims, Permission::CreateProposal)?;
    request.validate()?;

    let proposal = state
        .proposals
        .create(
            QuoteResultId::from_uuid(request.quote_result_id),
            request.client_email,
            user,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(proposal.into())))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalResponse>, ApiError> {
    state.access.authorize(&claims, Permission::ViewProposal)?;
    let proposal = state.proposals.get(ProposalId::from_uuid(id)).await?;
    Ok(Json(proposal.into()))
}

pub async fn approve_proposal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ProposalResponse>), ApiError> {
    let user = state.access.authorize(&claims, Permission::DecideProposal)?;
    let proposal = state.proposals.approve(ProposalId::from_uuid(id), user).await?;
    Ok((StatusCode::ACCEPTED, Json(proposal.into())))
}

/// The body with a reason is optional
pub async fn reject_proposal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectProposalRequest>>,
) -> Result<(StatusCode, Json<ProposalResponse>), ApiError> {
    let user = state.access.authorize(&claims, Permission::DecideProposal)?;
    let request = body.map(|Json(b)| b).unwrap_or_default();
    request.validate()?;

    let reason = request.reason.filter(|r| !r.trim().is_empty());
    let proposal = state
        .proposals
        .reject(ProposalId::from_uuid(id), reason, user)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(proposal.into())))
}

/// Queues document generation without emailing the client
pub async fn generate_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ProposalResponse>), ApiError> {
    let user = state.access.authorize(&claims, Permission::RequestDocument)?;
    let proposal = state
        .proposals
        .request_document(ProposalId::from_uuid(id), user)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(proposal.into())))
}
