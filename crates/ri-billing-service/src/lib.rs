//! RI-Billing HTTP task service.
//!
//! This crate exposes the attribution engine over HTTP:
//!
//! - Attribution task, invoked once per customer by the scheduler
//! - Invoice adjustment listing
//! - Analytics API client supplying hourly usage reports
//!
//! # Authentication
//!
//! Every `/v1` endpoint requires the service API key in the `X-API-Key` header.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for the router

pub mod analytics;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use analytics::{AnalyticsClient, AnalyticsError};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
