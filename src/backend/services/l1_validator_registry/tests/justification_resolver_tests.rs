use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_test::{assert_err, assert_ok};

use l1_validator_registry::chain::traits::LogSource;
use l1_validator_registry::models::chain::{BlockQuery, EvmAddress, Log, LogFilter};
use l1_validator_registry::models::ids::{Id, ValidationId};
use l1_validator_registry::models::warp::{
    AddressedCall, PChainOwner, RegisterL1ValidatorMessage, UnsignedWarpMessage,
    WARP_PRECOMPILE_ADDRESS,
};
use l1_validator_registry::services::JustificationResolver;
use l1_validator_registry::utils::abi;
use l1_validator_registry::utils::errors::{ChainError, ResolveError};
use l1_validator_registry::utils::RetryPolicy;

/// In-memory log source that answers range queries and records them.
struct FakeLogSource {
    logs: Vec<Log>,
    head: u64,
    queries: Mutex<Vec<(u64, u64)>>,
    failures_left: AtomicU32,
}

impl FakeLogSource {
    fn new(logs: Vec<Log>, head: u64) -> Self {
        Self {
            logs,
            head,
            queries: Mutex::new(Vec::new()),
            failures_left: AtomicU32::new(0),
        }
    }

    fn failing_first(self, failures: u32) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    fn queries(&self) -> Vec<(u64, u64)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for FakeLogSource {
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ChainError> {
        self.queries
            .lock()
            .unwrap()
            .push((filter.from_block, filter.to_block));

        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ChainError::Transport("connection reset".to_string()));
        }

        Ok(self
            .logs
            .iter()
            .filter(|log| {
                log.address == filter.address
                    && log.topics.first() == Some(&filter.topic)
                    && (filter.from_block..=filter.to_block).contains(&log.block_number)
            })
            .cloned()
            .collect())
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.head)
    }
}

fn registration(weight: u64) -> Vec<u8> {
    RegisterL1ValidatorMessage {
        subnet_id: Id([0x5a; 32]),
        node_id: vec![0xde; 20],
        bls_public_key: [0x8a; 48],
        registration_expiry: 1_735_689_600,
        remaining_balance_owner: PChainOwner::single([0x11; 20]),
        disable_owner: PChainOwner::single([0x22; 20]),
        weight,
    }
    .to_bytes()
}

fn warp_log(payload: &[u8], block_number: u64) -> Log {
    let message = UnsignedWarpMessage::new(
        1337,
        Id([0x42; 32]),
        AddressedCall::new(vec![0x0f; 20], payload.to_vec()),
    );
    Log {
        address: EvmAddress::from(WARP_PRECOMPILE_ADDRESS),
        topics: vec![abi::send_warp_message_topic()],
        data: abi::encode_log_bytes(&message.to_bytes()),
        block_number,
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        retry_count: 2,
        retry_delay: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn test_empty_log_set_is_not_found() {
    let source = Arc::new(FakeLogSource::new(Vec::new(), 100));
    let resolver = JustificationResolver::new(source);
    let target = ValidationId::of_payload(&registration(20));

    let result = resolver.resolve(target, 0, BlockQuery::Latest).await;

    assert!(matches!(result, Err(ResolveError::NotFound(id)) if id == target));
}

#[tokio::test]
async fn test_single_matching_log() {
    let payload = registration(20);
    let target = ValidationId::of_payload(&payload);
    let source = Arc::new(FakeLogSource::new(vec![warp_log(&payload, 7)], 100));
    let resolver = JustificationResolver::new(source);

    let justification = assert_ok!(resolver.resolve(target, 0, BlockQuery::Latest).await);

    assert_eq!(justification, payload);
    assert_eq!(ValidationId::of_payload(&justification), target);
}

#[tokio::test]
async fn test_match_among_many_logs() {
    let payload = registration(20);
    let target = ValidationId::of_payload(&payload);
    let mut logs: Vec<Log> = (1..=10).map(|w| warp_log(&registration(100 + w), w)).collect();
    logs.insert(6, warp_log(&payload, 6));
    let source = Arc::new(FakeLogSource::new(logs, 50));
    let resolver = JustificationResolver::new(source);

    let justification = assert_ok!(resolver.resolve(target, 0, BlockQuery::Latest).await);

    assert_eq!(ValidationId::of_payload(&justification), target);
}

#[tokio::test]
async fn test_no_match_among_many_logs() {
    let logs: Vec<Log> = (1..=10).map(|w| warp_log(&registration(100 + w), w)).collect();
    let source = Arc::new(FakeLogSource::new(logs, 50));
    let resolver = JustificationResolver::new(source);
    let target = ValidationId::of_payload(&registration(20));

    assert_err!(resolver.resolve(target, 0, BlockQuery::Latest).await);
}

#[tokio::test]
async fn test_logs_from_other_emitters_are_ignored() {
    let payload = registration(20);
    let target = ValidationId::of_payload(&payload);
    let mut foreign = warp_log(&payload, 3);
    foreign.address = EvmAddress::repeat_byte(0x99);
    let source = Arc::new(FakeLogSource::new(vec![foreign], 10));
    let resolver = JustificationResolver::new(source);

    assert!(matches!(
        resolver.resolve(target, 0, BlockQuery::Latest).await,
        Err(ResolveError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_chunked_scan_stops_at_first_match() {
    let payload = registration(20);
    let target = ValidationId::of_payload(&payload);
    let source = Arc::new(FakeLogSource::new(
        vec![warp_log(&registration(1), 3), warp_log(&payload, 25)],
        95,
    ));
    let resolver =
        JustificationResolver::new(source.clone()).with_max_blocks_per_query(Some(10));

    assert_ok!(resolver.resolve(target, 0, BlockQuery::Latest).await);

    assert_eq!(source.queries(), vec![(0, 9), (10, 19), (20, 29)]);
}

#[tokio::test]
async fn test_chunked_scan_covers_explicit_range() {
    let source = Arc::new(FakeLogSource::new(Vec::new(), 1_000));
    let resolver =
        JustificationResolver::new(source.clone()).with_max_blocks_per_query(Some(10));
    let target = ValidationId::of_payload(&registration(20));

    let result = resolver.resolve(target, 5, BlockQuery::Number(27)).await;

    assert!(matches!(result, Err(ResolveError::NotFound(_))));
    assert_eq!(source.queries(), vec![(5, 14), (15, 24), (25, 27)]);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let payload = registration(20);
    let target = ValidationId::of_payload(&payload);
    let source = Arc::new(FakeLogSource::new(vec![warp_log(&payload, 1)], 10).failing_first(2));
    let resolver = JustificationResolver::new(source.clone()).with_retry(fast_retry());

    assert_ok!(resolver.resolve(target, 0, BlockQuery::Latest).await);
    assert_eq!(source.queries().len(), 3);
}

#[tokio::test]
async fn test_persistent_failure_surfaces_chain_error() {
    let source = Arc::new(FakeLogSource::new(Vec::new(), 10).failing_first(10));
    let resolver = JustificationResolver::new(source).with_retry(fast_retry());
    let target = ValidationId::of_payload(&registration(20));

    assert!(matches!(
        resolver.resolve(target, 0, BlockQuery::Latest).await,
        Err(ResolveError::Chain(ChainError::Transport(_)))
    ));
}

#[tokio::test]
async fn test_empty_range_is_not_found() {
    let source = Arc::new(FakeLogSource::new(Vec::new(), 10));
    let resolver = JustificationResolver::new(source.clone());
    let target = ValidationId::of_payload(&registration(20));

    let result = resolver.resolve(target, 20, BlockQuery::Number(10)).await;

    assert!(matches!(result, Err(ResolveError::NotFound(_))));
    assert!(source.queries().is_empty());
}
