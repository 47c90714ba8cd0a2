//! Minimal JSON-RPC 2.0 transport shared by the L1 and P-Chain clients.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, ClientBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::trace;

use crate::utils::errors::{ChainError, ParseError};

/// A built HTTP client bound to one endpoint. Cheap to share: `reqwest::Client` pools
/// connections internally and request IDs are atomic.
#[derive(Debug)]
pub struct JsonRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let client = ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one request and returns its `result` field.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        trace!(method, id, url = %self.url, "json-rpc request");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ChainError::HttpStatus(response.status().as_u16()));
        }

        let json: Value = response.json().await?;
        response_result(json)
    }
}

/// Splits a JSON-RPC response body into its `result` or its `error`.
fn response_result(mut json: Value) -> Result<Value, ChainError> {
    if let Some(error) = json.get("error") {
        return Err(ChainError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    match json.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(ChainError::InvalidResponse(
            "no result field in response".to_string(),
        )),
    }
}

/// Parses a `0x`-prefixed, big-endian hex quantity as a u64.
///
/// E.g., `0x01 == 1`
pub fn hex_to_u64_be(hex: &str) -> Result<u64, ChainError> {
    u64::from_str_radix(strip_prefix(hex)?, 16).map_err(|e| {
        ChainError::InvalidResponse(format!("failed to parse {} as u64: {}", hex, e))
    })
}

/// Parses a `0x`-prefixed hex string as bytes.
///
/// E.g., `0x0102 == vec![1, 2]`
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, ChainError> {
    hex::decode(strip_prefix(hex)?)
        .map_err(|e| ParseError::InvalidEncoding(format!("hex: {}", e)).into())
}

/// `0x`-prefixed lowercase hex.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Removes the `0x` prefix. Returns an error if the prefix is not present.
fn strip_prefix(hex: &str) -> Result<&str, ChainError> {
    hex.strip_prefix("0x").ok_or_else(|| {
        ChainError::InvalidResponse(format!("hex string {} did not start with 0x", hex))
    })
}

/// Reads `field` of `value` as a string.
pub(crate) fn str_field<'a>(value: &'a Value, field: &str) -> Result<&'a str, ChainError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ChainError::InvalidResponse(format!("missing string field {}", field)))
}
