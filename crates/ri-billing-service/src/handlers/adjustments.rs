//! Invoice adjustment handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use ri_billing_core::{CustomerId, InvoiceAdjustment};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Adjustment list response.
#[derive(Debug, Serialize)]
pub struct AdjustmentListResponse {
    /// The customer's adjustments, oldest first.
    pub adjustments: Vec<InvoiceAdjustment>,
}

/// List a customer's invoice adjustments.
pub async fn list_adjustments(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(customer_id): Path<String>,
) -> Result<Json<AdjustmentListResponse>, ApiError> {
    let customer: CustomerId = customer_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid customer ID".into()))?;

    let adjustments = state.store.list_adjustments(&customer)?;
    Ok(Json(AdjustmentListResponse { adjustments }))
}
