//! HTTP client for the remote verification authority

use futures::future::{BoxFuture, FutureExt};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use super::gateway::{GatewayError, VerificationGateway, VerificationRequest, VerificationResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the request body
pub const SIGNATURE_HEADER: &str = "X-Duel-Signature";

/// Fixed-point scale used on the wire (two decimal places)
const FIXED_POINT_SCALE: f32 = 100.0;

/// Point-in-rectangle query in fixed-point integer coordinates.
/// The rectangle is given by its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPointQuery {
    pub px: i64,
    pub py: i64,
    pub rect_x: i64,
    pub rect_y: i64,
    pub rect_width: i64,
    pub rect_height: i64,
}

impl From<&VerificationRequest> for FixedPointQuery {
    fn from(request: &VerificationRequest) -> Self {
        let target = &request.target;
        Self {
            px: to_fixed(request.projectile_x),
            py: to_fixed(request.projectile_y),
            rect_x: to_fixed(target.left()),
            rect_y: to_fixed(target.top()),
            rect_width: to_fixed(target.width),
            rect_height: to_fixed(target.height),
        }
    }
}

fn to_fixed(value: f32) -> i64 {
    (value * FIXED_POINT_SCALE).trunc() as i64
}

/// Sign a request body with the shared secret
pub fn sign_body(body: &[u8], secret: &str) -> Result<String, GatewayError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| GatewayError::InvalidKey)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verification gateway backed by an HTTP authority
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl HttpGateway {
    pub fn new(url: String, secret: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            secret,
        }
    }

    async fn call(&self, request: VerificationRequest) -> Result<VerificationResult, GatewayError> {
        let query = FixedPointQuery::from(&request);
        let body = serde_json::to_vec(&query)?;

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");

        if let Some(secret) = &self.secret {
            builder = builder.header(SIGNATURE_HEADER, sign_body(&body, secret)?);
        }

        let response = builder.body(body).send().await.map_err(GatewayError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api { status: status.as_u16(), body });
        }

        let result: VerificationResult = response.json().await.map_err(GatewayError::Parse)?;
        debug!(?query, hit = result.hit, "Verifier answered");
        Ok(result)
    }
}

impl VerificationGateway for HttpGateway {
    fn verify_hit(
        &self,
        request: VerificationRequest,
    ) -> BoxFuture<'_, Result<VerificationResult, GatewayError>> {
        self.call(request).boxed()
    }
}
