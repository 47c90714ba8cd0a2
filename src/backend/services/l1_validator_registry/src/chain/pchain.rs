//! JSON-RPC client for the P-Chain platform API (`/ext/bc/P`).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chain::jsonrpc::{hex_to_bytes, str_field, JsonRpcClient};
use crate::chain::traits::PChain;
use crate::models::chain::{PChainTx, PChainTxStatus, PChainValidator};
use crate::models::ids::Id;
use crate::utils::crypto::CryptoUtils;
use crate::utils::errors::ChainError;

pub struct PChainRpcClient {
    rpc: JsonRpcClient,
}

#[derive(Deserialize)]
struct CurrentValidators {
    validators: Vec<PChainValidator>,
}

#[derive(Deserialize)]
struct TxStatusResponse {
    status: PChainTxStatus,
}

impl PChainRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, timeout)?,
        })
    }
}

fn decode<T: for<'de> Deserialize<'de>>(method: &str, value: Value) -> Result<T, ChainError> {
    serde_json::from_value(value)
        .map_err(|e| ChainError::InvalidResponse(format!("{}: {}", method, e)))
}

fn parse_id(method: &str, value: &str) -> Result<Id, ChainError> {
    value
        .parse()
        .map_err(|e| ChainError::InvalidResponse(format!("{}: bad id {}: {}", method, value, e)))
}

/// The warp message bytes of a JSON-encoded `platform.getTx` result, if present.
fn warp_message_of(result: &Value) -> Result<Option<Vec<u8>>, ChainError> {
    let unsigned_tx = result
        .get("tx")
        .and_then(|tx| tx.get("unsignedTx"))
        .ok_or_else(|| ChainError::InvalidResponse("platform.getTx: no unsignedTx".into()))?;

    match unsigned_tx.get("message").and_then(Value::as_str) {
        Some(message) => hex_to_bytes(message).map(Some),
        None => Ok(None),
    }
}

#[async_trait]
impl PChain for PChainRpcClient {
    async fn get_height(&self) -> Result<u64, ChainError> {
        let result = self.rpc.request("platform.getHeight", json!({})).await?;
        str_field(&result, "height")?.parse().map_err(|e| {
            ChainError::InvalidResponse(format!("platform.getHeight: bad height: {}", e))
        })
    }

    async fn get_current_validators(
        &self,
        subnet_id: Id,
    ) -> Result<Vec<PChainValidator>, ChainError> {
        let result = self
            .rpc
            .request(
                "platform.getCurrentValidators",
                json!({ "subnetID": subnet_id.to_string() }),
            )
            .await?;
        let validators: CurrentValidators = decode("platform.getCurrentValidators", result)?;
        Ok(validators.validators)
    }

    async fn get_tx(&self, tx_id: Id) -> Result<PChainTx, ChainError> {
        let result = self
            .rpc
            .request(
                "platform.getTx",
                json!({ "txID": tx_id.to_string(), "encoding": "json" }),
            )
            .await?;

        Ok(PChainTx {
            tx_id,
            warp_message: warp_message_of(&result)?,
        })
    }

    async fn get_tx_status(&self, tx_id: Id) -> Result<PChainTxStatus, ChainError> {
        let result = self
            .rpc
            .request("platform.getTxStatus", json!({ "txID": tx_id.to_string() }))
            .await?;
        let status: TxStatusResponse = decode("platform.getTxStatus", result)?;
        Ok(status.status)
    }

    async fn issue_tx(&self, signed_tx: &[u8]) -> Result<Id, ChainError> {
        let result = self
            .rpc
            .request(
                "platform.issueTx",
                json!({ "tx": CryptoUtils::checksummed_hex(signed_tx), "encoding": "hex" }),
            )
            .await?;
        parse_id("platform.issueTx", str_field(&result, "txID")?)
    }
}
