use anyhow::Result;
use l1_validator_registry::chain::evm::EvmRpcClient;
use l1_validator_registry::chain::pchain::PChainRpcClient;
use l1_validator_registry::services::{
    HttpSignatureAggregator, JustificationResolver, RegistrationService,
};
use l1_validator_registry::RegistrarConfig;
use std::sync::Arc;

/// Clients and services wired from one configuration file.
pub struct RegistrarApi {
    pub service: RegistrationService,
    pub resolver: JustificationResolver,
}

impl RegistrarApi {
    pub fn connect(config: &RegistrarConfig) -> Result<Self> {
        let settings = config.settings()?;
        let evm = Arc::new(EvmRpcClient::new(
            config.endpoints.l1_rpc_url.clone(),
            config.validator_manager_address()?,
            config.sender_address()?,
            config.rpc_timeout(),
        )?);
        let p_chain = Arc::new(PChainRpcClient::new(
            config.endpoints.p_chain_url.clone(),
            config.rpc_timeout(),
        )?);
        let aggregator = Arc::new(HttpSignatureAggregator::new(
            &config.endpoints.aggregator_url,
            config.aggregation_timeout(),
        )?);

        let resolver = || {
            JustificationResolver::new(evm.clone())
                .with_retry(config.retry_policy())
                .with_scan_timeout(config.log_scan_timeout())
                .with_max_blocks_per_query(config.registration.max_blocks_per_query)
        };

        let service = RegistrationService::new(
            settings,
            evm.clone(),
            p_chain,
            aggregator,
            resolver(),
        );

        Ok(Self {
            service,
            resolver: resolver(),
        })
    }
}
