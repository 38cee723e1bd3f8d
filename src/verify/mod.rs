//! Hit verification against an external authority

pub mod gateway;
pub mod http;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, VerifierMode};

pub use gateway::{
    verify_or_miss, LocalGeometryGateway, UnavailableGateway, VerificationGateway,
    VerificationRequest, VerificationResult,
};
pub use http::HttpGateway;

/// Build the gateway selected by configuration
pub fn gateway_from_config(config: &Config) -> Arc<dyn VerificationGateway> {
    match &config.verifier_mode {
        VerifierMode::Http { url } => {
            info!(url = %url, signed = config.verifier_secret.is_some(), "Using HTTP verifier");
            Arc::new(HttpGateway::new(url.clone(), config.verifier_secret.clone()))
        }
        VerifierMode::Local => {
            info!("Using in-process geometry verifier");
            Arc::new(LocalGeometryGateway)
        }
        VerifierMode::Disabled => {
            warn!("No verifier configured, every shot will resolve as a miss");
            Arc::new(UnavailableGateway)
        }
    }
}
