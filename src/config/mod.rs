//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Which verification authority shots are checked against
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifierMode {
    /// Remote HTTP authority
    Http { url: String },
    /// In-process rectangle check (offline play)
    Local,
    /// Nothing configured; every shot resolves as a miss
    Disabled,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Public base URL used to build WebSocket links
    pub public_base_url: String,
    /// Allowed client origins for CORS (comma-separated, empty = any)
    pub client_origin: String,

    /// Verification authority selection
    pub verifier_mode: VerifierMode,
    /// Shared secret for signing verification requests
    pub verifier_secret: Option<String>,
    /// Give up on a verification call after this long (None = wait forever)
    pub verifier_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let verifier_timeout = match env::var("VERIFIER_TIMEOUT_MS") {
            Ok(ms) => Some(Duration::from_millis(
                ms.parse()
                    .map_err(|_| ConfigError::Invalid("VERIFIER_TIMEOUT_MS"))?,
            )),
            Err(_) => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_default(),

            verifier_mode: parse_verifier_mode(
                env::var("VERIFIER_MODE").ok().as_deref(),
                env::var("VERIFIER_URL").ok(),
            )?,
            verifier_secret: env::var("VERIFIER_SECRET").ok().filter(|s| !s.is_empty()),
            verifier_timeout,
        })
    }
}

/// Resolve VERIFIER_MODE / VERIFIER_URL into a mode.
/// Without an explicit mode, a URL means HTTP and no URL means disabled.
fn parse_verifier_mode(mode: Option<&str>, url: Option<String>) -> Result<VerifierMode, ConfigError> {
    match (mode, url) {
        (Some("local"), _) => Ok(VerifierMode::Local),
        (Some("disabled"), _) => Ok(VerifierMode::Disabled),
        (Some("http") | None, Some(url)) if !url.is_empty() => Ok(VerifierMode::Http { url }),
        (Some("http"), _) => Err(ConfigError::Missing("VERIFIER_URL")),
        (None, _) => Ok(VerifierMode::Disabled),
        (Some(_), _) => Err(ConfigError::Invalid("VERIFIER_MODE")),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_mode_defaults() {
        assert_eq!(parse_verifier_mode(None, None).unwrap(), VerifierMode::Disabled);
        assert_eq!(
            parse_verifier_mode(None, Some("http://verifier/check".into())).unwrap(),
            VerifierMode::Http { url: "http://verifier/check".into() }
        );
        assert_eq!(parse_verifier_mode(Some("local"), None).unwrap(), VerifierMode::Local);
    }

    #[test]
    fn test_verifier_mode_errors() {
        assert!(matches!(
            parse_verifier_mode(Some("http"), None),
            Err(ConfigError::Missing("VERIFIER_URL"))
        ));
        assert!(matches!(
            parse_verifier_mode(Some("chain"), None),
            Err(ConfigError::Invalid("VERIFIER_MODE"))
        ));
    }
}
