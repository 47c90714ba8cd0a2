//! Drives one validator through `initiate -> submit -> complete` across the L1 and the P-Chain.
//!
//! Every step is also callable on its own, so a caller holding an intermediate hash can resume a
//! registration whose session was lost.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};

use crate::chain::traits::{PChain, PChainWallet, ValidatorManager};
use crate::config::RegistrationSettings;
use crate::models::chain::{
    tx_hash_hex, BlockQuery, EvmAddress, InitiateRegistration, PChainTxStatus,
    RegisterL1ValidatorTx, TransactionReceipt, TxHash,
};
use crate::models::ids::{Id, NodeId, ValidationId};
use crate::models::registration::{
    PChainReadiness, RegistrationMessageData, RegistrationOutcome, RegistrationPhase,
    RegistrationSession, RegistrationStep, ValidatorRegistrationRequest, ValidatorStatusReport,
};
use crate::models::warp::{PChainOwner, BLS_PUBLIC_KEY_LEN, WARP_PRECOMPILE_ADDRESS};
use crate::services::justification_resolver::JustificationResolver;
use crate::services::signature_aggregator::{
    AggregatedSignature, AggregationRequest, SignatureAggregator,
};
use crate::utils::abi;
use crate::utils::errors::{ParseError, RegistrationError, RegistrationFailure};
use crate::utils::warp_codec;

/// `completeValidatorRegistration` reads the acknowledgment from the first warp predicate.
const COMPLETION_MESSAGE_INDEX: u32 = 0;

/// Identifiers learned while a step runs, kept even when the step later fails.
#[derive(Debug, Default)]
struct Progress {
    validation_id: Option<ValidationId>,
    p_chain_tx_id: Option<Id>,
    complete_tx_hash: Option<TxHash>,
}

impl Progress {
    fn record_into(&self, session: &mut RegistrationSession) {
        if self.validation_id.is_some() {
            session.validation_id = self.validation_id;
        }
        if self.p_chain_tx_id.is_some() {
            session.p_chain_tx_id = self.p_chain_tx_id;
        }
        if self.complete_tx_hash.is_some() {
            session.complete_tx_hash = self.complete_tx_hash;
        }
    }
}

/// Registration orchestrator. Cloning is cheap; clones share the chain clients.
#[derive(Clone)]
pub struct RegistrationService {
    settings: Arc<RegistrationSettings>,
    manager: Arc<dyn ValidatorManager>,
    p_chain: Arc<dyn PChain>,
    wallet: Option<Arc<dyn PChainWallet>>,
    aggregator: Arc<dyn SignatureAggregator>,
    resolver: Arc<JustificationResolver>,
}

impl RegistrationService {
    pub fn new(
        settings: RegistrationSettings,
        manager: Arc<dyn ValidatorManager>,
        p_chain: Arc<dyn PChain>,
        aggregator: Arc<dyn SignatureAggregator>,
        resolver: JustificationResolver,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            manager,
            p_chain,
            wallet: None,
            aggregator,
            resolver: Arc::new(resolver),
        }
    }

    /// Enables `submit`, which has to sign a P-Chain transaction.
    pub fn with_wallet(mut self, wallet: Arc<dyn PChainWallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn settings(&self) -> &RegistrationSettings {
        &self.settings
    }

    /// Calls `initiateValidatorRegistration` with single-address, threshold-1 owners. Returns as
    /// soon as the transaction is accepted by the node.
    pub async fn initiate(
        &self,
        node_id: NodeId,
        bls_public_key: [u8; BLS_PUBLIC_KEY_LEN],
        weight: u64,
        remaining_balance_owner: [u8; 20],
        deactivation_owner: [u8; 20],
    ) -> Result<TxHash, RegistrationError> {
        let registration = InitiateRegistration {
            node_id,
            bls_public_key,
            remaining_balance_owner: PChainOwner::single(remaining_balance_owner),
            disable_owner: PChainOwner::single(deactivation_owner),
            weight,
        };

        let tx_hash = self
            .manager
            .initiate_validator_registration(&registration)
            .await?;
        info!(%node_id, weight, tx_hash = %tx_hash_hex(&tx_hash), "registration initiated");
        Ok(tx_hash)
    }

    /// Takes the registration message emitted by `initiate_tx_hash`, has it signed by the
    /// subnet and registers the validator on the P-Chain. Returns once the P-Chain transaction
    /// is committed.
    pub async fn submit(
        &self,
        initiate_tx_hash: TxHash,
        balance: u64,
        bls_proof_of_possession: &[u8],
    ) -> Result<Id, RegistrationError> {
        self.submit_recording(
            &mut Progress::default(),
            initiate_tx_hash,
            balance,
            bls_proof_of_possession,
        )
        .await
    }

    /// Acknowledges a committed P-Chain registration on the L1 and returns the successful
    /// `completeValidatorRegistration` receipt.
    pub async fn complete(&self, p_chain_tx_id: Id) -> Result<TransactionReceipt, RegistrationError> {
        self.complete_recording(&mut Progress::default(), p_chain_tx_id)
            .await
    }

    /// Runs all three steps in order. The first failing step ends the attempt; the returned
    /// failure carries every identifier produced so far.
    pub async fn register_validator(
        &self,
        request: ValidatorRegistrationRequest,
    ) -> Result<RegistrationOutcome, RegistrationFailure> {
        let session = RegistrationSession::new(request.node_id, request.weight);
        let span = info_span!("registration", session = %session.id, node_id = %request.node_id);
        self.run_session(session, request).instrument(span).await
    }

    /// Runs [`register_validator`](Self::register_validator) on its own task.
    pub fn spawn_registration(
        &self,
        request: ValidatorRegistrationRequest,
    ) -> JoinHandle<Result<RegistrationOutcome, RegistrationFailure>> {
        let service = self.clone();
        tokio::spawn(async move { service.register_validator(request).await })
    }

    async fn run_session(
        &self,
        mut session: RegistrationSession,
        request: ValidatorRegistrationRequest,
    ) -> Result<RegistrationOutcome, RegistrationFailure> {
        info!("starting registration");

        let initiate_tx_hash = match self
            .initiate(
                request.node_id,
                request.bls_public_key,
                request.weight,
                request.remaining_balance_owner,
                request.deactivation_owner,
            )
            .await
        {
            Ok(tx_hash) => tx_hash,
            Err(e) => return Err(abandon(session, RegistrationStep::Initiate, e)),
        };
        session.initiate_tx_hash = Some(initiate_tx_hash);
        session.advance(RegistrationPhase::Initiated);

        let mut progress = Progress::default();
        let submitted = self
            .submit_recording(
                &mut progress,
                initiate_tx_hash,
                request.balance,
                &request.bls_proof_of_possession,
            )
            .await;
        progress.record_into(&mut session);
        let p_chain_tx_id = match submitted {
            Ok(tx_id) => tx_id,
            Err(e) => return Err(abandon(session, RegistrationStep::Submit, e)),
        };
        session.advance(RegistrationPhase::PChainConfirmed);

        let mut progress = Progress {
            validation_id: session.validation_id,
            ..Progress::default()
        };
        let completed = self.complete_recording(&mut progress, p_chain_tx_id).await;
        progress.record_into(&mut session);
        let receipt = match completed {
            Ok(receipt) => receipt,
            Err(e) => return Err(abandon(session, RegistrationStep::Complete, e)),
        };
        session.advance(RegistrationPhase::Registered);

        info!(
            validation_id = ?session.validation_id,
            complete_tx_hash = %tx_hash_hex(&receipt.transaction_hash),
            "validator registered"
        );
        Ok(RegistrationOutcome { session, receipt })
    }

    async fn submit_recording(
        &self,
        progress: &mut Progress,
        initiate_tx_hash: TxHash,
        balance: u64,
        bls_proof_of_possession: &[u8],
    ) -> Result<Id, RegistrationError> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or(RegistrationError::WalletUnavailable)?;

        let receipt = self.successful_receipt(initiate_tx_hash).await?;
        let message = registration_warp_message(&receipt)?;

        let payload = warp_codec::extract_addressed_call_payload(
            warp_codec::extract_warp_payload(&message)?,
        )?;
        let validation_id = ValidationId::of_payload(payload);
        progress.validation_id = Some(validation_id);
        info!(%validation_id, message_len = message.len(), "found registration warp message");

        let signed = self.aggregate(message, None).await?;

        let tx = RegisterL1ValidatorTx {
            balance,
            bls_proof_of_possession: bls_proof_of_possession.to_vec(),
            signed_warp_message: signed.signed_message,
        };
        let p_chain_tx_id = wallet.register_l1_validator(&tx).await?;
        progress.p_chain_tx_id = Some(p_chain_tx_id);
        info!(%p_chain_tx_id, balance, "RegisterL1ValidatorTx issued");

        self.wait_for_p_chain_commit(p_chain_tx_id).await?;
        Ok(p_chain_tx_id)
    }

    async fn complete_recording(
        &self,
        progress: &mut Progress,
        p_chain_tx_id: Id,
    ) -> Result<TransactionReceipt, RegistrationError> {
        let data = self.extract_registration_message(p_chain_tx_id).await?;

        let validation_id = self.retried_validation_id(&data.node_id).await?;
        if validation_id.is_zero() {
            return Err(RegistrationError::ValidationNotFound(format!(
                "0x{}",
                hex::encode(&data.node_id)
            )));
        }
        let derived = progress.validation_id.unwrap_or_else(|| data.validation_id());
        if derived != validation_id {
            warn!(
                contract = %validation_id,
                derived = %derived,
                "validation id from the contract differs from the registration payload"
            );
        }
        progress.validation_id = Some(validation_id);

        let acknowledgment = warp_codec::pack_l1_validator_registration(
            validation_id,
            true,
            self.settings.network_id,
            self.settings.p_chain_id,
        );
        let justification = self
            .resolver
            .resolve(validation_id, self.settings.scan_from_block, BlockQuery::Latest)
            .await?;

        let signed = self.aggregate(acknowledgment, Some(justification)).await?;
        let access_list = warp_codec::pack_into_access_list(&signed.signed_message);

        let tx_hash = self
            .manager
            .complete_validator_registration(COMPLETION_MESSAGE_INDEX, &access_list)
            .await?;
        progress.complete_tx_hash = Some(tx_hash);
        info!(%validation_id, tx_hash = %tx_hash_hex(&tx_hash), "completion sent");

        self.successful_receipt(tx_hash).await
    }

    /// Reads a `RegisterL1ValidatorTx` back from the P-Chain and decodes the registration
    /// message it carries.
    pub async fn extract_registration_message(
        &self,
        p_chain_tx_id: Id,
    ) -> Result<RegistrationMessageData, RegistrationError> {
        let tx = self
            .settings
            .retry
            .run("platform.getTx", || self.p_chain.get_tx(p_chain_tx_id))
            .await?;
        let message = tx.warp_message.ok_or_else(|| {
            ParseError::InvalidEncoding(format!(
                "P-Chain transaction {} carries no warp message",
                p_chain_tx_id
            ))
        })?;

        let unsigned = warp_codec::parse_carried_warp_message(&message)?;
        let payload = unsigned.addressed_call.payload;
        let parsed = warp_codec::unpack_register_l1_validator_payload(&payload)?;

        Ok(RegistrationMessageData {
            message: payload,
            subnet_id: parsed.subnet_id,
            node_id: parsed.node_id,
            bls_public_key: parsed.bls_public_key,
            registration_expiry: parsed.registration_expiry,
            weight: parsed.weight,
            network_id: unsigned.network_id,
        })
    }

    /// Reports the P-Chain height and how many validators it sees for the signing subnet.
    pub async fn check_p_chain_readiness(&self) -> Result<PChainReadiness, RegistrationError> {
        let retry = &self.settings.retry;
        let height = retry
            .run("platform.getHeight", || self.p_chain.get_height())
            .await?;
        let validators = retry
            .run("platform.getCurrentValidators", || {
                self.p_chain.get_current_validators(self.settings.subnet_id)
            })
            .await?;

        let readiness = PChainReadiness {
            height,
            validator_count: validators.len(),
        };
        if readiness.is_ready() {
            info!(height, validators = readiness.validator_count, "P-Chain ready");
        } else {
            warn!(
                height,
                subnet_id = %self.settings.subnet_id,
                "P-Chain sees no validators for the subnet; RegisterL1ValidatorTx will fail"
            );
        }
        Ok(readiness)
    }

    /// The contract's validation ID for `node_id`.
    pub async fn validation_id_of(&self, node_id: &NodeId) -> Result<ValidationId, RegistrationError> {
        let validation_id = self.retried_validation_id(node_id.as_bytes()).await?;
        if validation_id.is_zero() {
            return Err(RegistrationError::ValidationNotFound(node_id.to_string()));
        }
        Ok(validation_id)
    }

    /// The contract's record of `node_id`, together with the L1's total weight.
    pub async fn validator_status(
        &self,
        node_id: &NodeId,
    ) -> Result<ValidatorStatusReport, RegistrationError> {
        let validation_id = self.validation_id_of(node_id).await?;
        let retry = &self.settings.retry;
        let record = retry
            .run("getValidator", || self.manager.get_validator(validation_id))
            .await?;
        let l1_total_weight = retry
            .run("l1TotalWeight", || self.manager.l1_total_weight())
            .await?;

        Ok(ValidatorStatusReport {
            validation_id,
            record,
            l1_total_weight,
        })
    }

    async fn retried_validation_id(&self, node_id: &[u8]) -> Result<ValidationId, RegistrationError> {
        Ok(self
            .settings
            .retry
            .run("getNodeValidationID", || {
                self.manager.get_node_validation_id(node_id)
            })
            .await?)
    }

    async fn aggregate(
        &self,
        message: Vec<u8>,
        justification: Option<Vec<u8>>,
    ) -> Result<AggregatedSignature, RegistrationError> {
        let mut request = AggregationRequest::new(message, self.settings.subnet_id)
            .with_quorum_percentage(self.settings.quorum_percentage);
        if let Some(justification) = justification {
            request = request.with_justification(justification);
        }
        let aggregated = self.aggregator.aggregate(&request).await?;
        let signed = aggregated.parse()?;
        info!(
            signers = signed.signature.signer_count(),
            has_justification = request.justification.is_some(),
            "warp message signed"
        );
        Ok(aggregated)
    }

    /// Polls for the receipt of `tx_hash` and fails with `TxReverted` unless it succeeded.
    pub async fn successful_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, RegistrationError> {
        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.is_success() {
            error!(tx_hash = %tx_hash_hex(&tx_hash), block = receipt.block_number, "transaction reverted");
            return Err(RegistrationError::TxReverted(tx_hash_hex(&tx_hash)));
        }
        Ok(receipt)
    }

    pub async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, RegistrationError> {
        tokio::time::timeout(self.settings.receipt_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| RegistrationError::ReceiptTimeout(tx_hash_hex(&tx_hash)))?
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt, RegistrationError> {
        loop {
            let receipt = self
                .settings
                .retry
                .run("eth_getTransactionReceipt", || {
                    self.manager.transaction_receipt(tx_hash)
                })
                .await?;
            match receipt {
                Some(receipt) => return Ok(receipt),
                None => tokio::time::sleep(self.settings.receipt_poll_interval).await,
            }
        }
    }

    /// Polls `platform.getTxStatus` until the transaction is committed. A dropped transaction
    /// is reported as reverted.
    pub async fn wait_for_p_chain_commit(&self, tx_id: Id) -> Result<(), RegistrationError> {
        tokio::time::timeout(self.settings.p_chain_timeout, self.poll_p_chain_status(tx_id))
            .await
            .map_err(|_| RegistrationError::ReceiptTimeout(tx_id.to_string()))?
    }

    async fn poll_p_chain_status(&self, tx_id: Id) -> Result<(), RegistrationError> {
        loop {
            let status = self
                .settings
                .retry
                .run("platform.getTxStatus", || self.p_chain.get_tx_status(tx_id))
                .await?;
            match status {
                PChainTxStatus::Committed => return Ok(()),
                PChainTxStatus::Dropped => {
                    return Err(RegistrationError::TxReverted(tx_id.to_string()))
                }
                PChainTxStatus::Processing | PChainTxStatus::Unknown => {
                    tokio::time::sleep(self.settings.receipt_poll_interval).await
                }
            }
        }
    }
}

/// The raw unsigned warp message of the registration log in `receipt`.
fn registration_warp_message(receipt: &TransactionReceipt) -> Result<Vec<u8>, RegistrationError> {
    let precompile = EvmAddress::from(WARP_PRECOMPILE_ADDRESS);
    let topic = abi::send_warp_message_topic();

    let log = receipt
        .logs
        .iter()
        .find(|log| log.address == precompile && log.topics.first() == Some(&topic))
        .ok_or_else(|| {
            RegistrationError::JustificationMissing(tx_hash_hex(&receipt.transaction_hash))
        })?;

    Ok(abi::decode_log_bytes(&log.data)?)
}

fn abandon(
    mut session: RegistrationSession,
    step: RegistrationStep,
    source: RegistrationError,
) -> RegistrationFailure {
    session.advance(RegistrationPhase::Failed);
    error!(%step, error = %source, %session, "registration abandoned");
    RegistrationFailure {
        step,
        session,
        source,
    }
}
