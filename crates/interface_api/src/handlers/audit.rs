//! Audit trail handlers

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use validator::Validate;

use crate::auth::{Claims, Permission};
use crate::dto::audit::{AuditEntryResponse, AuditQuery};
use crate::{error::ApiError, AppState};

/// Most recent audit entries first
pub async fn list_audit_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntryResponse>>, ApiError> {
    state.access.authorize(&claims, Permission::ReadAudit)?;
    query.validate()?;

    let entries = state.audit_log.recent(query.limit()).await?;
    Ok(Json(entries.into_iter().map(AuditEntryResponse::from).collect()))
}
