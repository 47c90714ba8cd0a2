//! Client for the off-chain signature aggregator's `POST /aggregate-signatures` endpoint.

use std::convert::TryFrom;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::ids::Id;
use crate::models::warp::SignedWarpMessage;
use crate::utils::errors::AggregationError;
use crate::utils::warp_codec;

pub const DEFAULT_AGGREGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Share of the signing subnet's weight that must sign, as a whole percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QuorumPercentage(u8);

impl QuorumPercentage {
    pub const DEFAULT: QuorumPercentage = QuorumPercentage(66);

    pub fn new(value: u8) -> Result<Self, AggregationError> {
        if value > 100 {
            return Err(AggregationError::InvalidQuorumPercentage(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for QuorumPercentage {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for QuorumPercentage {
    type Error = AggregationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    /// Unsigned warp message bytes.
    pub message: Vec<u8>,
    /// Only set for acknowledgment messages, whose signers need the original registration.
    pub justification: Option<Vec<u8>>,
    pub signing_subnet_id: Id,
    pub quorum_percentage: QuorumPercentage,
}

impl AggregationRequest {
    pub fn new(message: Vec<u8>, signing_subnet_id: Id) -> Self {
        Self {
            message,
            justification: None,
            signing_subnet_id,
            quorum_percentage: QuorumPercentage::default(),
        }
    }

    pub fn with_justification(mut self, justification: Vec<u8>) -> Self {
        self.justification = Some(justification);
        self
    }

    pub fn with_quorum_percentage(mut self, quorum_percentage: QuorumPercentage) -> Self {
        self.quorum_percentage = quorum_percentage;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedSignature {
    pub signed_message: Vec<u8>,
}

impl AggregatedSignature {
    /// Decodes the bytes as a signed warp message. The aggregator returns them unchecked.
    pub fn parse(&self) -> Result<SignedWarpMessage, AggregationError> {
        warp_codec::parse_signed_warp_message(&self.signed_message)
            .map_err(|e| AggregationError::Malformed(format!("signed message: {}", e)))
    }
}

#[async_trait]
pub trait SignatureAggregator: Send + Sync {
    async fn aggregate(
        &self,
        request: &AggregationRequest,
    ) -> Result<AggregatedSignature, AggregationError>;
}

#[derive(Serialize)]
struct AggregateSignaturesBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    justification: Option<String>,
    #[serde(rename = "signing-subnet-id")]
    signing_subnet_id: String,
    #[serde(rename = "quorum-percentage")]
    quorum_percentage: u8,
}

impl From<&AggregationRequest> for AggregateSignaturesBody {
    fn from(request: &AggregationRequest) -> Self {
        Self {
            message: format!("0x{}", hex::encode(&request.message)),
            justification: request
                .justification
                .as_ref()
                .map(|j| format!("0x{}", hex::encode(j))),
            signing_subnet_id: request.signing_subnet_id.to_string(),
            quorum_percentage: request.quorum_percentage.get(),
        }
    }
}

#[derive(Deserialize)]
struct AggregateSignaturesResponse {
    #[serde(rename = "signed-message")]
    signed_message: Option<String>,
}

pub struct HttpSignatureAggregator {
    client: Client,
    url: String,
}

impl HttpSignatureAggregator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AggregationError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| AggregationError::ServiceUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/aggregate-signatures", base_url.trim_end_matches('/')),
        })
    }
}

fn is_unavailable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

#[async_trait]
impl SignatureAggregator for HttpSignatureAggregator {
    async fn aggregate(
        &self,
        request: &AggregationRequest,
    ) -> Result<AggregatedSignature, AggregationError> {
        let body = AggregateSignaturesBody::from(request);
        debug!(
            url = %self.url,
            message_len = request.message.len(),
            has_justification = request.justification.is_some(),
            quorum = request.quorum_percentage.get(),
            "requesting signature aggregation"
        );

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AggregationError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, body = %text, "signature aggregation failed");
            return Err(if is_unavailable(status) {
                AggregationError::ServiceUnavailable(format!("{}: {}", status, text))
            } else {
                AggregationError::QuorumNotMet(format!("{}: {}", status, text))
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| AggregationError::ServiceUnavailable(e.to_string()))?;
        let parsed: AggregateSignaturesResponse = serde_json::from_str(&text)
            .map_err(|e| AggregationError::Malformed(format!("response body: {}", e)))?;
        let signed_hex = parsed
            .signed_message
            .ok_or_else(|| AggregationError::Malformed("missing signed-message".to_string()))?;
        let signed_message = hex::decode(signed_hex.trim_start_matches("0x"))
            .map_err(|e| AggregationError::Malformed(format!("signed-message hex: {}", e)))?;

        debug!(
            signed_len = signed_message.len(),
            "signature aggregation succeeded"
        );
        Ok(AggregatedSignature { signed_message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_bounds() {
        assert_eq!(QuorumPercentage::default().get(), 66);
        assert!(QuorumPercentage::new(0).is_ok());
        assert!(QuorumPercentage::new(100).is_ok());
        assert_eq!(
            QuorumPercentage::try_from(101),
            Err(AggregationError::InvalidQuorumPercentage(101))
        );
    }

    #[test]
    fn test_body_omits_absent_justification() {
        let request = AggregationRequest::new(vec![1, 2], Id::ZERO);
        let json = serde_json::to_value(AggregateSignaturesBody::from(&request)).unwrap();

        assert_eq!(json["message"], "0x0102");
        assert_eq!(json["quorum-percentage"], 66);
        assert_eq!(
            json["signing-subnet-id"],
            "11111111111111111111111111111111LpoYY"
        );
        assert!(json.get("justification").is_none());
    }
}
