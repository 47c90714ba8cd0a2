use crate::api::RegistrarApi;
use anyhow::{anyhow, bail, Context, Result};
use l1_validator_registry::models::chain::{tx_hash_hex, BlockQuery};
use l1_validator_registry::models::ids::{Id, NodeId, ValidationId};
use l1_validator_registry::models::warp::{UnsignedWarpMessage, BLS_PUBLIC_KEY_LEN};
use l1_validator_registry::utils::warp_codec;

/// Decodes `0x`-prefixed or bare hex into exactly `N` bytes.
pub fn parse_hex_array<const N: usize>(field: &str, value: &str) -> Result<[u8; N]> {
    let bytes = parse_hex(field, value)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| anyhow!("{} must be {} bytes, got {}", field, N, len))
}

pub fn parse_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim_start_matches("0x")).with_context(|| format!("{} is not valid hex", field))
}

fn node_id_lines(node_id: &NodeId) -> [String; 2] {
    [node_id.to_string(), node_id.to_hex()]
}

/// Commands for L1 validator registration
pub struct RegistrarCommands;

impl RegistrarCommands {
    /// Print the raw bytes behind a `NodeID-...` string
    pub fn node_id(node_id: &NodeId) {
        for line in node_id_lines(node_id) {
            println!("{}", line);
        }
    }

    /// Describe an unsigned or signed warp message and the payload it carries
    pub fn decode_warp(bytes: &[u8]) -> Result<()> {
        let unsigned = match warp_codec::parse_warp_message(bytes) {
            Ok(unsigned) => unsigned,
            Err(unsigned_err) => {
                let signed = warp_codec::parse_signed_warp_message(bytes).map_err(|_| {
                    anyhow!("not a warp message: {}", unsigned_err)
                })?;
                println!(
                    "Signed by {} validators (bit set 0x{})",
                    signed.signature.signer_count(),
                    hex::encode(&signed.signature.signers)
                );
                signed.unsigned
            }
        };
        print_unsigned(&unsigned);
        Ok(())
    }

    pub async fn status(api: &RegistrarApi) -> Result<()> {
        let readiness = api.service.check_p_chain_readiness().await?;
        println!("P-Chain height: {}", readiness.height);
        println!("Subnet validators: {}", readiness.validator_count);
        if !readiness.is_ready() {
            println!("Warning: the P-Chain sees no validators for this subnet");
        }
        Ok(())
    }

    pub async fn validation_id(api: &RegistrarApi, node_id: &NodeId) -> Result<()> {
        let validation_id = api.service.validation_id_of(node_id).await?;
        println!("{}", validation_id);
        Ok(())
    }

    pub async fn validator(api: &RegistrarApi, node_id: &NodeId) -> Result<()> {
        let report = api.service.validator_status(node_id).await?;
        println!("Validation ID: {}", report.validation_id);
        println!("Status: {:?}", report.record.status);
        println!("Weight: {} (starting {})", report.record.weight, report.record.starting_weight);
        println!(
            "Nonces: sent {}, received {}",
            report.record.sent_nonce, report.record.received_nonce
        );
        println!("Start time: {}", report.record.start_time);
        if report.record.end_time != 0 {
            println!("End time: {}", report.record.end_time);
        }
        println!("L1 total weight: {}", report.l1_total_weight);
        Ok(())
    }

    /// Call `initiateValidatorRegistration` and wait for it to be mined
    pub async fn initiate(
        api: &RegistrarApi,
        node_id: NodeId,
        bls_public_key: [u8; BLS_PUBLIC_KEY_LEN],
        weight: u64,
        remaining_balance_owner: [u8; 20],
        deactivation_owner: [u8; 20],
    ) -> Result<()> {
        if weight == 0 {
            bail!("weight must be positive");
        }
        let tx_hash = api
            .service
            .initiate(
                node_id,
                bls_public_key,
                weight,
                remaining_balance_owner,
                deactivation_owner,
            )
            .await?;
        println!("Initiate transaction: {}", tx_hash_hex(&tx_hash));

        let receipt = api.service.successful_receipt(tx_hash).await?;
        println!("Mined in block {}", receipt.block_number);
        Ok(())
    }

    pub async fn resolve_justification(
        api: &RegistrarApi,
        validation_id: ValidationId,
        from_block: u64,
    ) -> Result<()> {
        let justification = api
            .resolver
            .resolve(validation_id, from_block, BlockQuery::Latest)
            .await?;
        println!("0x{}", hex::encode(justification));
        Ok(())
    }

    /// Acknowledge a committed P-Chain registration on the L1
    pub async fn complete(api: &RegistrarApi, p_chain_tx_id: Id) -> Result<()> {
        let receipt = api.service.complete(p_chain_tx_id).await?;
        println!(
            "Registration completed in transaction {} (block {})",
            tx_hash_hex(&receipt.transaction_hash),
            receipt.block_number
        );
        Ok(())
    }
}

fn print_unsigned(message: &UnsignedWarpMessage) {
    println!("Message ID: {}", message.id());
    println!("Network ID: {}", message.network_id);
    println!("Source chain: {}", message.source_chain_id);
    println!(
        "Source address: 0x{}",
        hex::encode(&message.addressed_call.source_address)
    );

    let payload = &message.addressed_call.payload;
    if let Ok(registration) = warp_codec::unpack_register_l1_validator_payload(payload) {
        println!("Payload: RegisterL1ValidatorMessage");
        println!("  Validation ID: {}", registration.validation_id());
        println!("  Subnet ID: {}", registration.subnet_id);
        println!("  Node ID: 0x{}", hex::encode(&registration.node_id));
        println!("  BLS public key: 0x{}", hex::encode(registration.bls_public_key));
        println!("  Expiry: {}", registration.registration_expiry);
        println!("  Weight: {}", registration.weight);
    } else if let Ok(ack) = warp_codec::unpack_l1_validator_registration_payload(payload) {
        println!("Payload: L1ValidatorRegistrationMessage");
        println!("  Validation ID: {}", ack.validation_id);
        println!("  Registered: {}", ack.registered);
    } else {
        println!("Payload: 0x{}", hex::encode(payload));
    }
}
