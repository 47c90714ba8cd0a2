//! A [`PChainWallet`] that delegates transaction building and signing to an external signer and
//! issues the result through the platform API.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::chain::traits::{PChain, PChainWallet};
use crate::models::chain::RegisterL1ValidatorTx;
use crate::models::ids::Id;
use crate::utils::errors::ChainError;

/// Produces the serialized, signed bytes of a P-Chain transaction. Fee payment, UTXO selection
/// and key custody are the signer's business.
#[async_trait]
pub trait PChainTxSigner: Send + Sync {
    async fn sign_register_l1_validator(
        &self,
        tx: &RegisterL1ValidatorTx,
    ) -> Result<Vec<u8>, ChainError>;
}

pub struct SignerWallet {
    signer: Arc<dyn PChainTxSigner>,
    p_chain: Arc<dyn PChain>,
}

impl SignerWallet {
    pub fn new(signer: Arc<dyn PChainTxSigner>, p_chain: Arc<dyn PChain>) -> Self {
        Self { signer, p_chain }
    }
}

#[async_trait]
impl PChainWallet for SignerWallet {
    /// Issued once; a failed issue is not retried since the node may have accepted it.
    async fn register_l1_validator(&self, tx: &RegisterL1ValidatorTx) -> Result<Id, ChainError> {
        let signed_tx = self.signer.sign_register_l1_validator(tx).await?;
        let tx_id = self.p_chain.issue_tx(&signed_tx).await.map_err(|e| {
            warn!(error = %e, "platform.issueTx failed");
            e
        })?;
        info!(%tx_id, size = signed_tx.len(), "signed P-Chain transaction issued");
        Ok(tx_id)
    }
}
