//! Locates the `RegisterL1ValidatorMessage` that created a validation ID by scanning warp
//! precompile logs. Logs are not indexed by payload hash, so this is a linear scan-and-hash.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::chain::traits::LogSource;
use crate::models::chain::{BlockQuery, EvmAddress, Log, LogFilter, TxHash};
use crate::models::ids::ValidationId;
use crate::models::warp::WARP_PRECOMPILE_ADDRESS;
use crate::utils::abi;
use crate::utils::errors::{ParseError, ResolveError};
use crate::utils::retry::RetryPolicy;
use crate::utils::warp_codec;

pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(60);

pub struct JustificationResolver {
    logs: Arc<dyn LogSource>,
    precompile: EvmAddress,
    topic: TxHash,
    retry: RetryPolicy,
    scan_timeout: Duration,
    max_blocks_per_query: Option<u64>,
}

impl JustificationResolver {
    pub fn new(logs: Arc<dyn LogSource>) -> Self {
        Self {
            logs,
            precompile: EvmAddress::from(WARP_PRECOMPILE_ADDRESS),
            topic: abi::send_warp_message_topic(),
            retry: RetryPolicy::default(),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            max_blocks_per_query: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    /// Splits the scan into queries of at most `blocks` blocks. `None` issues a single query.
    pub fn with_max_blocks_per_query(mut self, blocks: Option<u64>) -> Self {
        self.max_blocks_per_query = blocks.filter(|b| *b > 0);
        self
    }

    /// Scans `from_block..=to` oldest to newest and returns the payload of the first log whose
    /// SHA-256 equals `validation_id`.
    pub async fn resolve(
        &self,
        validation_id: ValidationId,
        from_block: u64,
        to: BlockQuery,
    ) -> Result<Vec<u8>, ResolveError> {
        tokio::time::timeout(self.scan_timeout, self.scan(validation_id, from_block, to))
            .await
            .map_err(|_| ResolveError::ScanTimeout(self.scan_timeout))?
    }

    async fn scan(
        &self,
        validation_id: ValidationId,
        from_block: u64,
        to: BlockQuery,
    ) -> Result<Vec<u8>, ResolveError> {
        let to_block = match to {
            BlockQuery::Number(number) => number,
            BlockQuery::Latest => {
                self.retry
                    .run("eth_blockNumber", || self.logs.block_number())
                    .await?
            }
        };

        let chunk = self.max_blocks_per_query.unwrap_or(u64::MAX);
        let mut start = from_block;
        let mut scanned = 0usize;

        while start <= to_block {
            let end = start.saturating_add(chunk - 1).min(to_block);
            let filter = LogFilter {
                address: self.precompile,
                topic: self.topic,
                from_block: start,
                to_block: end,
            };
            let logs = self
                .retry
                .run("eth_getLogs", || self.logs.get_logs(&filter))
                .await?;
            debug!(from_block = start, to_block = end, logs = logs.len(), "scanned warp logs");
            scanned += logs.len();

            if let Some(justification) = find_justification(&validation_id, &logs) {
                info!(%validation_id, scanned, "found registration justification");
                return Ok(justification);
            }

            if end == to_block {
                break;
            }
            start = end + 1;
        }

        info!(%validation_id, scanned, from_block, to_block, "no registration justification in range");
        Err(ResolveError::NotFound(validation_id))
    }
}

/// Returns the payload of the first log, in slice order, that hashes to `validation_id`.
/// Logs that do not decode as warp messages are skipped.
pub fn find_justification(validation_id: &ValidationId, logs: &[Log]) -> Option<Vec<u8>> {
    logs.iter().find_map(|log| match justification_of(log) {
        Ok(payload) if ValidationId::of_payload(&payload) == *validation_id => Some(payload),
        Ok(_) => None,
        Err(e) => {
            debug!(block = log.block_number, error = %e, "skipping undecodable warp log");
            None
        }
    })
}

/// ABI-unwraps a `SendWarpMessage` log and returns the addressed-call payload it carries.
pub fn justification_of(log: &Log) -> Result<Vec<u8>, ParseError> {
    let message = abi::decode_log_bytes(&log.data)?;
    let addressed_call = warp_codec::extract_warp_payload(&message)?;
    Ok(warp_codec::extract_addressed_call_payload(addressed_call)?.to_vec())
}
