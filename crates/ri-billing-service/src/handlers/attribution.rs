//! Attribution task handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use ri_billing_core::CustomerId;
use ri_billing_engine::RunSummary;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Attribution task parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AttributionParams {
    /// Run as of this instant instead of now (replays and backfills).
    pub as_of: Option<DateTime<Utc>>,
}

/// Run attribution for one customer.
pub async fn run_attribution(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(customer_id): Path<String>,
    Query(params): Query<AttributionParams>,
) -> Result<Json<RunSummary>, ApiError> {
    let customer: CustomerId = customer_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid customer ID".into()))?;

    let engine = state
        .engine
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Analytics is not configured".into()))?;

    let now = params.as_of.unwrap_or_else(Utc::now);

    tracing::info!(
        service = %auth.service_name,
        customer_id = %customer,
        as_of = %now,
        "Attribution task received"
    );

    let summary = engine.run_customer(&customer, now).await?;
    Ok(Json(summary))
}
