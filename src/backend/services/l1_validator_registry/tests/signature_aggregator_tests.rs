use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use l1_validator_registry::models::ids::{Id, ValidationId};
use l1_validator_registry::models::warp::{BitSetSignature, SignedWarpMessage};
use l1_validator_registry::services::signature_aggregator::{
    AggregationRequest, HttpSignatureAggregator, QuorumPercentage, SignatureAggregator,
};
use l1_validator_registry::utils::errors::AggregationError;
use l1_validator_registry::utils::warp_codec::{
    pack_l1_validator_registration, pack_signed_warp_message, parse_warp_message,
};

const SUBNET_ID: &str = "2W9boARgCWL25z6pMFNtkCfNA5v28VGg9PmBgUJfuKndEdhrvw";

fn acknowledgment() -> Vec<u8> {
    pack_l1_validator_registration(ValidationId([0x01; 32]), true, 1337, Id::ZERO)
}

fn signed(message: &[u8]) -> Vec<u8> {
    pack_signed_warp_message(&SignedWarpMessage {
        unsigned: parse_warp_message(message).unwrap(),
        signature: BitSetSignature {
            signers: vec![0b0000_0111],
            signature: [0x5c; 96],
        },
    })
}

fn aggregator(server: &MockServer) -> HttpSignatureAggregator {
    HttpSignatureAggregator::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn request(message: Vec<u8>) -> AggregationRequest {
    AggregationRequest::new(message, SUBNET_ID.parse().unwrap())
}

#[tokio::test]
async fn test_successful_aggregation_returns_signed_bytes() {
    let server = MockServer::start().await;
    let message = acknowledgment();
    let justification = vec![0xaa, 0xbb, 0xcc];
    let signed_message = signed(&message);

    Mock::given(method("POST"))
        .and(path("/aggregate-signatures"))
        .and(body_partial_json(json!({
            "message": format!("0x{}", hex::encode(&message)),
            "justification": "0xaabbcc",
            "signing-subnet-id": SUBNET_ID,
            "quorum-percentage": 67,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signed-message": hex::encode(&signed_message),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = request(message)
        .with_justification(justification)
        .with_quorum_percentage(QuorumPercentage::new(67).unwrap());
    let aggregated = aggregator(&server).aggregate(&request).await.unwrap();

    assert_eq!(aggregated.signed_message, signed_message);
    assert_eq!(aggregated.parse().unwrap().signature.signer_count(), 3);
}

#[tokio::test]
async fn test_prefixed_hex_response_is_accepted() {
    let server = MockServer::start().await;
    let message = acknowledgment();
    let signed_message = signed(&message);

    Mock::given(method("POST"))
        .and(path("/aggregate-signatures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signed-message": format!("0x{}", hex::encode(&signed_message)),
        })))
        .mount(&server)
        .await;

    let aggregated = aggregator(&server)
        .aggregate(&request(message))
        .await
        .unwrap();

    assert_eq!(aggregated.signed_message, signed_message);
}

#[tokio::test]
async fn test_unavailable_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = aggregator(&server).aggregate(&request(acknowledgment())).await;

    assert!(matches!(result, Err(AggregationError::ServiceUnavailable(_))));
}

#[tokio::test]
async fn test_unreachable_service() {
    let aggregator =
        HttpSignatureAggregator::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let result = aggregator.aggregate(&request(acknowledgment())).await;

    assert!(matches!(result, Err(AggregationError::ServiceUnavailable(_))));
}

#[tokio::test]
async fn test_rejected_request_is_quorum_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string("failed to collect a threshold of signatures"),
        )
        .mount(&server)
        .await;

    let result = aggregator(&server).aggregate(&request(acknowledgment())).await;

    match result {
        Err(AggregationError::QuorumNotMet(detail)) => {
            assert!(detail.contains("threshold of signatures"))
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_signed_message_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let result = aggregator(&server).aggregate(&request(acknowledgment())).await;

    assert!(matches!(result, Err(AggregationError::Malformed(_))));
}

#[tokio::test]
async fn test_invalid_hex_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "signed-message": "0xnothex" })),
        )
        .mount(&server)
        .await;

    let result = aggregator(&server).aggregate(&request(acknowledgment())).await;

    assert!(matches!(result, Err(AggregationError::Malformed(_))));
}

#[tokio::test]
async fn test_signed_message_bytes_are_returned_unchecked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/aggregate-signatures"))
        .and(body_partial_json(json!({
            "justification": "0xaabbcc",
            "quorum-percentage": 67,
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "signed-message": "deadbeef" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = request(acknowledgment())
        .with_justification(vec![0xaa, 0xbb, 0xcc])
        .with_quorum_percentage(QuorumPercentage::new(67).unwrap());
    let aggregated = aggregator(&server).aggregate(&request).await.unwrap();

    assert_eq!(aggregated.signed_message, vec![0xde, 0xad, 0xbe, 0xef]);
    assert!(matches!(aggregated.parse(), Err(AggregationError::Malformed(_))));
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let server = MockServer::start().await;
    let message = acknowledgment();
    Mock::given(method("POST"))
        .and(path("/aggregate-signatures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signed-message": hex::encode(signed(&message)),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let aggregator =
        HttpSignatureAggregator::new(&format!("{}/", server.uri()), Duration::from_secs(5))
            .unwrap();

    assert!(aggregator.aggregate(&request(message)).await.is_ok());
}
