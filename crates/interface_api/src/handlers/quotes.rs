//! Quote handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::QuoteRequestId;

use crate::auth::{Claims, Permission};
use crate::dto::quotes::{QuoteRequestBody, QuoteResponse};
use crate::{error::ApiError, AppState};

/// Rates a new quote request against every active insurer
pub async fn create_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<QuoteRequestBody>,
) -> Result<(StatusCode, Json<QuoteResponse>), ApiError> {
    let user = state.access.authorize(&claims, Permission::RequestQuote)?;
    body.validate()?;

    let rated = state.rating.quote(body.into_details(), user).await?;
    Ok((StatusCode::CREATED, Json(rated.into())))
}

/// Creates the next version of a quote lineage
pub async fn create_version(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(body): Json<QuoteRequestBody>,
) -> Result<(StatusCode, Json<QuoteResponse>), ApiError> {
    let user = state.access.authorize(&claims, Permission::RequestQuote)?;
    body.validate()?;

    let rated = state
        .rating
        .new_version(QuoteRequestId::from_uuid(id), body.into_details(), user)
        .await?;
    Ok((StatusCode::CREATED, Json(rated.into())))
}

/// Edits the current version in place; 409 once the lineage is locked
pub async fn edit_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(body): Json<QuoteRequestBody>,
) -> Result<Json<QuoteResponse>, ApiError> {
    state.access.authorize(&claims, Permission::RequestQuote)?;
    body.validate()?;

    let rated = state
        .rating
        .edit(QuoteRequestId::from_uuid(id), body.into_details())
        .await?;
    Ok(Json(rated.into()))
}

pub async fn get_quote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuoteResponse>, ApiError> {
    state.access.authorize(&claims, Permission::ViewQuote)?;
    let rated = state.rating.get(QuoteRequestId::from_uuid(id)).await?;
    Ok(Json(rated.into()))
}
