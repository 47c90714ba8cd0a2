use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use l1_validator_registry::models::ids::{Id, NodeId, ValidationId};
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;

use api::RegistrarApi;
use commands::{parse_hex, parse_hex_array, RegistrarCommands};

fn node_id_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("node-id")
        .short("n")
        .long("node-id")
        .value_name("NODE_ID")
        .help("Validator node ID (NodeID-...)")
        .takes_value(true)
        .required(true)
}

fn node_id_of(matches: &ArgMatches) -> Result<NodeId> {
    let value = matches.value_of("node-id").unwrap_or_default();
    value
        .parse()
        .with_context(|| format!("invalid node ID {}", value))
}

fn u64_of(matches: &ArgMatches, name: &str) -> Result<u64> {
    let value = matches.value_of(name).unwrap_or_default();
    value
        .parse()
        .with_context(|| format!("invalid {} {}", name, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = App::new("L1 Validator Registrar")
        .version("0.1")
        .about("Registers validators into an Avalanche L1 through its validator manager contract")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to <config dir>/l1-registrar/config.toml)")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("node-id")
                .about("Decode a NodeID into its raw bytes")
                .arg(node_id_arg()),
        )
        .subcommand(
            SubCommand::with_name("decode-warp")
                .about("Decode an unsigned or signed warp message")
                .arg(
                    Arg::with_name("message")
                        .short("m")
                        .long("message")
                        .value_name("HEX")
                        .help("Message bytes in hex")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("Show P-Chain height and the subnet's validator count"),
        )
        .subcommand(
            SubCommand::with_name("validation-id")
                .about("Look up a node's validation ID in the validator manager")
                .arg(node_id_arg()),
        )
        .subcommand(
            SubCommand::with_name("validator")
                .about("Show the validator manager's record for a node")
                .arg(node_id_arg()),
        )
        .subcommand(
            SubCommand::with_name("initiate")
                .about("Start a validator registration on the L1")
                .arg(node_id_arg())
                .arg(
                    Arg::with_name("bls-public-key")
                        .short("b")
                        .long("bls-public-key")
                        .value_name("HEX")
                        .help("48-byte BLS public key")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("weight")
                        .short("w")
                        .long("weight")
                        .value_name("WEIGHT")
                        .help("Validator weight")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("remaining-balance-owner")
                        .short("r")
                        .long("remaining-balance-owner")
                        .value_name("ADDRESS")
                        .help("P-Chain address receiving the leftover balance")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("deactivation-owner")
                        .short("d")
                        .long("deactivation-owner")
                        .value_name("ADDRESS")
                        .help("P-Chain address allowed to disable the validator")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("resolve-justification")
                .about("Find the registration message that hashes to a validation ID")
                .arg(
                    Arg::with_name("validation-id")
                        .short("v")
                        .long("validation-id")
                        .value_name("HEX")
                        .help("Validation ID")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("from-block")
                        .short("f")
                        .long("from-block")
                        .value_name("BLOCK")
                        .help("First block to scan (defaults to registration.scan_from_block)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("complete")
                .about("Acknowledge a committed P-Chain registration on the L1")
                .arg(
                    Arg::with_name("p-chain-tx")
                        .short("t")
                        .long("p-chain-tx")
                        .value_name("TX_ID")
                        .help("RegisterL1ValidatorTx ID")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .get_matches();

    // Offline commands
    match matches.subcommand() {
        ("node-id", Some(sub_matches)) => {
            RegistrarCommands::node_id(&node_id_of(sub_matches)?);
            return Ok(());
        }
        ("decode-warp", Some(sub_matches)) => {
            let bytes = parse_hex("message", sub_matches.value_of("message").unwrap_or_default())?;
            return RegistrarCommands::decode_warp(&bytes);
        }
        _ => {}
    }

    let config_path = matches
        .subcommand()
        .1
        .and_then(|sub_matches| sub_matches.value_of("config"))
        .or_else(|| matches.value_of("config"));
    let config = config::load(config_path.map(Path::new))?;
    let api = RegistrarApi::connect(&config)?;

    match matches.subcommand() {
        ("status", Some(_)) => RegistrarCommands::status(&api).await?,
        ("validation-id", Some(sub_matches)) => {
            RegistrarCommands::validation_id(&api, &node_id_of(sub_matches)?).await?
        }
        ("validator", Some(sub_matches)) => {
            RegistrarCommands::validator(&api, &node_id_of(sub_matches)?).await?
        }
        ("initiate", Some(sub_matches)) => {
            let value = |name: &str| sub_matches.value_of(name).unwrap_or_default();
            RegistrarCommands::initiate(
                &api,
                node_id_of(sub_matches)?,
                parse_hex_array("bls-public-key", value("bls-public-key"))?,
                u64_of(sub_matches, "weight")?,
                parse_hex_array("remaining-balance-owner", value("remaining-balance-owner"))?,
                parse_hex_array("deactivation-owner", value("deactivation-owner"))?,
            )
            .await?
        }
        ("resolve-justification", Some(sub_matches)) => {
            let validation_id: ValidationId = sub_matches
                .value_of("validation-id")
                .unwrap_or_default()
                .parse()
                .context("invalid validation ID")?;
            let from_block = if sub_matches.is_present("from-block") {
                u64_of(sub_matches, "from-block")?
            } else {
                config.registration.scan_from_block
            };
            RegistrarCommands::resolve_justification(&api, validation_id, from_block).await?
        }
        ("complete", Some(sub_matches)) => {
            let tx_id: Id = sub_matches
                .value_of("p-chain-tx")
                .unwrap_or_default()
                .parse()
                .context("invalid P-Chain transaction ID")?;
            RegistrarCommands::complete(&api, tx_id).await?
        }
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
        }
    }

    Ok(())
}
