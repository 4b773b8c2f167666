//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use url::Url;

use crate::config::ApiConfig;
use crate::services::payment::{GatewayError, PaystackGateway};
use crate::services::{PaymentGateway, PgInventoryStore, PgOrderStore};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid base_url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the connection pool, configuration,
/// and the payment gateway client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Create a new application state with the Paystack gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` does not parse or the gateway client
    /// cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        // Fail at startup, not at first checkout, on a bad base URL.
        Url::parse(&config.base_url)?;

        let gateway = Arc::new(PaystackGateway::new(&config.gateway, &config.currency)?);
        Ok(Self::with_gateway(config, pool, gateway))
    }

    /// Create state with an explicit gateway implementation.
    #[must_use]
    pub fn with_gateway(config: ApiConfig, pool: PgPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                gateway,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.inner.gateway.as_ref()
    }

    /// Shared handle to the payment gateway, for services that outlive the
    /// request.
    #[must_use]
    pub fn gateway_handle(&self) -> Arc<dyn PaymentGateway> {
        Arc::clone(&self.inner.gateway)
    }

    /// Inventory store over this state's pool.
    #[must_use]
    pub fn inventory(&self) -> PgInventoryStore {
        PgInventoryStore::new(self.inner.pool.clone())
    }

    /// Order store over this state's pool.
    #[must_use]
    pub fn orders(&self) -> PgOrderStore {
        PgOrderStore::new(self.inner.pool.clone())
    }
}
