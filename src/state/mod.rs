//! Shared application state wiring the record store and provider client.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    config::AppConfig, dao::record_store::RecordStore, error::ServiceError,
    provider::MessagingProvider,
};

/// Cheaply cloneable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing the configuration, the provider client,
/// and the currently installed record store.
pub struct AppState {
    config: AppConfig,
    provider: Option<Arc<dyn MessagingProvider>>,
    record_store: RwLock<Option<Arc<dyn RecordStore>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned
    /// cheaply.
    ///
    /// The application starts in degraded mode until a record store is
    /// installed.
    pub fn new(config: AppConfig, provider: Option<Arc<dyn MessagingProvider>>) -> SharedState {
        Arc::new(Self {
            config,
            provider,
            record_store: RwLock::new(None),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current record store, if one is installed.
    pub async fn record_store(&self) -> Option<Arc<dyn RecordStore>> {
        let guard = self.record_store.read().await;
        guard.as_ref().cloned()
    }

    /// Record store handle, or a degraded-mode error when none is installed.
    pub async fn require_record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError> {
        self.record_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new record store implementation and leave degraded mode.
    pub async fn install_record_store(&self, store: Arc<dyn RecordStore>) {
        let mut guard = self.record_store.write().await;
        *guard = Some(store);
    }

    /// Remove the current record store and enter degraded mode.
    pub async fn clear_record_store(&self) {
        let mut guard = self.record_store.write().await;
        guard.take();
    }

    /// Provider client handle, when an API token was configured.
    pub fn provider(&self) -> Option<Arc<dyn MessagingProvider>> {
        self.provider.clone()
    }

    /// Provider client handle, or a configuration error when the API token is
    /// absent. Deployment problem, so this is allowed to propagate.
    pub fn require_provider(&self) -> Result<Arc<dyn MessagingProvider>, ServiceError> {
        self.provider.clone().ok_or_else(|| {
            ServiceError::Configuration("provider API token is not configured".into())
        })
    }

    /// WhatsApp account id outbound sends are attributed to.
    pub fn provider_account_id(&self) -> Result<String, ServiceError> {
        self.config
            .provider
            .as_ref()
            .map(|provider| provider.account_id.clone())
            .filter(|account_id| !account_id.is_empty())
            .ok_or_else(|| {
                ServiceError::Configuration("provider account id is not configured".into())
            })
    }
}
