use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::config::Config;
use crate::db::Store;
use crate::payments::PaymentGateway;
use crate::services::registration::RegistrationService;

/// Shared by every handler. Holds no per-request mutable state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            gateway,
            identity,
            config: Arc::new(config),
        }
    }

    pub fn registrations(&self) -> RegistrationService {
        RegistrationService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.gateway),
            Arc::clone(&self.config),
        )
    }
}
