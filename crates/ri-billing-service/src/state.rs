//! Application state.

use std::sync::Arc;

use ri_billing_engine::AttributionEngine;
use ri_billing_store::Store;

use crate::analytics::AnalyticsClient;
use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Analytics client for usage reports (optional).
    pub analytics: Option<Arc<AnalyticsClient>>,

    /// Attribution engine, available once analytics is configured.
    pub engine: Option<Arc<AttributionEngine>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        // Create analytics client if configured
        let analytics = config
            .analytics_api_url
            .as_ref()
            .zip(config.analytics_api_key.as_ref())
            .and_then(|(url, key)| match AnalyticsClient::new(url, key) {
                Ok(client) => {
                    tracing::info!(analytics_url = %url, "Analytics integration enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create analytics client");
                    None
                }
            });

        let engine = analytics.as_ref().map(|client| {
            Arc::new(AttributionEngine::new(
                store.clone(),
                client.clone(),
                config.engine.clone(),
            ))
        });

        if engine.is_none() {
            tracing::warn!("Analytics not configured - attribution runs will be rejected");
        }

        Self {
            store,
            config,
            analytics,
            engine,
        }
    }

    /// Check if analytics is configured.
    #[must_use]
    pub fn has_analytics(&self) -> bool {
        self.analytics.is_some()
    }
}
