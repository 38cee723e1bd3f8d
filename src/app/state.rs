//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::MatchRegistry;
use crate::verify::{gateway_from_config, VerificationGateway};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<dyn VerificationGateway>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Verification authority used by every match
        let gateway = gateway_from_config(&config);

        let match_registry = Arc::new(MatchRegistry::new());

        Self {
            config,
            gateway,
            match_registry,
        }
    }

    /// Start a new duel with the configured gateway
    pub fn create_match(&self) -> crate::game::MatchHandle {
        self.match_registry
            .spawn_match(Arc::clone(&self.gateway), self.config.verifier_timeout)
    }
}
