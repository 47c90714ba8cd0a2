//! JSON-RPC client for the L1: log queries, validator manager calls and receipts.
//!
//! Transactions go through `eth_sendTransaction`, so the node must manage the sender account.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::chain::jsonrpc::{bytes_to_hex, hex_to_bytes, hex_to_u64_be, str_field, JsonRpcClient};
use crate::chain::traits::{LogSource, ValidatorManager};
use crate::models::chain::{
    tx_hash_hex, EvmAddress, InitiateRegistration, Log, LogFilter, TransactionReceipt, TxHash,
    TxStatus, ValidatorRecord,
};
use crate::models::ids::ValidationId;
use crate::models::warp::AccessList;
use crate::utils::abi;
use crate::utils::errors::{ChainError, ParseError};

pub struct EvmRpcClient {
    rpc: JsonRpcClient,
    contract: EvmAddress,
    sender: Option<EvmAddress>,
}

impl EvmRpcClient {
    pub fn new(
        url: impl Into<String>,
        contract: EvmAddress,
        sender: Option<EvmAddress>,
        timeout: Duration,
    ) -> Result<Self, ChainError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, timeout)?,
            contract,
            sender,
        })
    }

    pub fn contract(&self) -> EvmAddress {
        self.contract
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let params = json!([
            {
                "to": address_hex(&self.contract),
                "data": bytes_to_hex(&data),
            },
            "latest"
        ]);
        let result = self.rpc.request("eth_call", params).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse("eth_call result was not a string".into()))?;
        hex_to_bytes(hex)
    }

    async fn send_transaction(
        &self,
        method: &'static str,
        data: Vec<u8>,
        access_list: Option<&AccessList>,
    ) -> Result<TxHash, ChainError> {
        let sender = self.sender.ok_or(ChainError::MissingSender(method))?;
        let mut tx = json!({
            "from": address_hex(&sender),
            "to": address_hex(&self.contract),
            "data": bytes_to_hex(&data),
        });
        if let Some(access_list) = access_list {
            tx["accessList"] = access_list_json(access_list);
        }

        let result = self.rpc.request("eth_sendTransaction", json!([tx])).await?;
        let hash = result.as_str().ok_or_else(|| {
            ChainError::InvalidResponse("eth_sendTransaction result was not a string".into())
        })?;
        let hash = parse_hash(hash)?;
        debug!(method, tx_hash = %tx_hash_hex(&hash), "transaction sent");
        Ok(hash)
    }
}

#[async_trait]
impl LogSource for EvmRpcClient {
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ChainError> {
        let params = json!([{
            "address": address_hex(&filter.address),
            "topics": [tx_hash_hex(&filter.topic)],
            "fromBlock": format!("0x{:x}", filter.from_block),
            "toBlock": format!("0x{:x}", filter.to_block),
        }]);

        self.rpc
            .request("eth_getLogs", params)
            .await?
            .as_array()
            .ok_or_else(|| ChainError::InvalidResponse("eth_getLogs result was not an array".into()))?
            .iter()
            .map(parse_log)
            .collect()
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let result = self.rpc.request("eth_blockNumber", json!([])).await?;
        let hex = result.as_str().ok_or_else(|| {
            ChainError::InvalidResponse("eth_blockNumber result was not a string".into())
        })?;
        hex_to_u64_be(hex)
    }
}

#[async_trait]
impl ValidatorManager for EvmRpcClient {
    async fn initiate_validator_registration(
        &self,
        registration: &InitiateRegistration,
    ) -> Result<TxHash, ChainError> {
        let data = abi::encode_initiate_validator_registration(
            registration.node_id.as_bytes(),
            &registration.bls_public_key,
            &registration.remaining_balance_owner,
            &registration.disable_owner,
            registration.weight,
        );
        self.send_transaction("initiateValidatorRegistration", data, None)
            .await
    }

    async fn complete_validator_registration(
        &self,
        message_index: u32,
        access_list: &AccessList,
    ) -> Result<TxHash, ChainError> {
        let data = abi::encode_complete_validator_registration(message_index);
        self.send_transaction("completeValidatorRegistration", data, Some(access_list))
            .await
    }

    async fn get_node_validation_id(&self, node_id: &[u8]) -> Result<ValidationId, ChainError> {
        let output = self.call(abi::encode_get_node_validation_id(node_id)).await?;
        Ok(abi::decode_validation_id(&output)?)
    }

    async fn get_validator(
        &self,
        validation_id: ValidationId,
    ) -> Result<ValidatorRecord, ChainError> {
        let output = self.call(abi::encode_get_validator(&validation_id)).await?;
        Ok(abi::decode_validator(&output)?)
    }

    async fn l1_total_weight(&self) -> Result<u64, ChainError> {
        let output = self.call(abi::encode_l1_total_weight()).await?;
        Ok(abi::decode_u64(&output)?)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        let result = self
            .rpc
            .request("eth_getTransactionReceipt", json!([tx_hash_hex(&tx_hash)]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        parse_receipt(&result).map(Some)
    }
}

fn address_hex(address: &EvmAddress) -> String {
    format!("{:#x}", address)
}

fn parse_address(hex: &str) -> Result<EvmAddress, ChainError> {
    let bytes = hex_to_bytes(hex)?;
    if bytes.len() != 20 {
        return Err(ParseError::InvalidLength {
            field: "address",
            expected: 20,
            actual: bytes.len(),
        }
        .into());
    }
    Ok(EvmAddress::from_slice(&bytes))
}

fn parse_hash(hex: &str) -> Result<TxHash, ChainError> {
    let bytes = hex_to_bytes(hex)?;
    if bytes.len() != 32 {
        return Err(ParseError::InvalidLength {
            field: "hash",
            expected: 32,
            actual: bytes.len(),
        }
        .into());
    }
    Ok(TxHash::from_slice(&bytes))
}

fn access_list_json(access_list: &AccessList) -> Value {
    Value::Array(
        access_list
            .iter()
            .map(|item| {
                json!({
                    "address": bytes_to_hex(&item.address),
                    "storageKeys": item
                        .storage_keys
                        .iter()
                        .map(|key| bytes_to_hex(key))
                        .collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}

fn parse_log(value: &Value) -> Result<Log, ChainError> {
    let topics = value
        .get("topics")
        .and_then(Value::as_array)
        .ok_or_else(|| ChainError::InvalidResponse("log without topics".into()))?
        .iter()
        .map(|topic| {
            topic
                .as_str()
                .ok_or_else(|| ChainError::InvalidResponse("topic was not a string".into()))
                .and_then(parse_hash)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Log {
        address: parse_address(str_field(value, "address")?)?,
        topics,
        data: hex_to_bytes(str_field(value, "data")?)?,
        block_number: hex_to_u64_be(str_field(value, "blockNumber")?)?,
    })
}

fn parse_receipt(value: &Value) -> Result<TransactionReceipt, ChainError> {
    let status = match str_field(value, "status")? {
        "0x1" => TxStatus::Success,
        _ => TxStatus::Reverted,
    };
    let logs = value
        .get("logs")
        .and_then(Value::as_array)
        .map(|logs| logs.iter().map(parse_log).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    Ok(TransactionReceipt {
        transaction_hash: parse_hash(str_field(value, "transactionHash")?)?,
        block_number: hex_to_u64_be(str_field(value, "blockNumber")?)?,
        status,
        logs,
    })
}
