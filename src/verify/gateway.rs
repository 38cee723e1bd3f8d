//! Verification gateway contract and fault-absorbing dispatch

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::game::combat::Hitbox;
use crate::game::trajectory::{ImpactPoint, Point};

/// Impact point plus the defender hitbox it is checked against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub projectile_x: f32,
    pub projectile_y: f32,
    pub target: Hitbox,
}

impl VerificationRequest {
    pub fn new(impact: &ImpactPoint, target: Hitbox) -> Self {
        Self {
            projectile_x: impact.x,
            projectile_y: impact.y,
            target,
        }
    }
}

/// Authoritative hit/miss decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    pub hit: bool,
}

impl VerificationResult {
    pub fn miss() -> Self {
        Self { hit: false }
    }
}

/// Anything that can authoritatively decide whether a shot hit
pub trait VerificationGateway: Send + Sync {
    fn verify_hit(
        &self,
        request: VerificationRequest,
    ) -> BoxFuture<'_, Result<VerificationResult, GatewayError>>;
}

/// Ask the gateway, degrading every fault to a miss.
///
/// Errors, timeouts and panics inside the gateway future all resolve to
/// `hit = false` so the match never stalls waiting on verification.
pub async fn verify_or_miss(
    gateway: &dyn VerificationGateway,
    request: VerificationRequest,
    timeout: Option<Duration>,
) -> VerificationResult {
    let call = AssertUnwindSafe(gateway.verify_hit(request)).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(Err(GatewayError::Timeout(limit))),
        },
        None => call.await,
    };

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(error = %e, "Hit verification failed, treating shot as a miss");
            VerificationResult::miss()
        }
        Err(_) => {
            warn!("Hit verification panicked, treating shot as a miss");
            VerificationResult::miss()
        }
    }
}

/// In-process point-in-rectangle check, for offline play
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGeometryGateway;

impl VerificationGateway for LocalGeometryGateway {
    fn verify_hit(
        &self,
        request: VerificationRequest,
    ) -> BoxFuture<'_, Result<VerificationResult, GatewayError>> {
        let point = Point::new(request.projectile_x, request.projectile_y);
        let hit = request.target.contains(point);
        future::ready(Ok(VerificationResult { hit })).boxed()
    }
}

/// Stand-in when no verification authority is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGateway;

impl VerificationGateway for UnavailableGateway {
    fn verify_hit(
        &self,
        _request: VerificationRequest,
    ) -> BoxFuture<'_, Result<VerificationResult, GatewayError>> {
        future::ready(Err(GatewayError::NotInitialized)).boxed()
    }
}

/// Verification gateway errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Verification gateway not initialized")]
    NotInitialized,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Verifier error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse verifier response: {0}")]
    Parse(reqwest::Error),

    #[error("Failed to encode verification request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid signing key")]
    InvalidKey,

    #[error("Verification timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingGateway;

    impl VerificationGateway for PanickingGateway {
        fn verify_hit(
            &self,
            _request: VerificationRequest,
        ) -> BoxFuture<'_, Result<VerificationResult, GatewayError>> {
            future::lazy(|_| -> Result<VerificationResult, GatewayError> {
                panic!("authority exploded")
            })
            .boxed()
        }
    }

    struct NeverGateway;

    impl VerificationGateway for NeverGateway {
        fn verify_hit(
            &self,
            _request: VerificationRequest,
        ) -> BoxFuture<'_, Result<VerificationResult, GatewayError>> {
            future::pending().boxed()
        }
    }

    fn request_at(x: f32, y: f32) -> VerificationRequest {
        VerificationRequest {
            projectile_x: x,
            projectile_y: y,
            target: Hitbox::around(Point::new(650.0, 535.0)),
        }
    }

    #[tokio::test]
    async fn test_local_gateway_checks_rectangle() {
        let gateway = LocalGeometryGateway;
        let hit = tokio_test::assert_ok!(gateway.verify_hit(request_at(660.0, 520.0)).await);
        assert!(hit.hit);
        let miss = tokio_test::assert_ok!(gateway.verify_hit(request_at(660.0, 415.0)).await);
        assert!(!miss.hit);
    }

    #[tokio::test]
    async fn test_uninitialized_gateway_is_a_miss() {
        let gateway = UnavailableGateway;
        tokio_test::assert_err!(gateway.verify_hit(request_at(650.0, 535.0)).await);
        let result = verify_or_miss(&gateway, request_at(650.0, 535.0), None).await;
        assert_eq!(result, VerificationResult::miss());
    }

    #[tokio::test]
    async fn test_panic_is_a_miss() {
        let result = verify_or_miss(&PanickingGateway, request_at(650.0, 535.0), None).await;
        assert!(!result.hit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_miss() {
        let result = verify_or_miss(
            &NeverGateway,
            request_at(650.0, 535.0),
            Some(Duration::from_secs(5)),
        )
        .await;
        assert!(!result.hit);
    }
}
