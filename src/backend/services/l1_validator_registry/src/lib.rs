//! Registration of validators into an Avalanche L1's validator set.
//!
//! A registration is a handshake between the L1's validator manager contract and the P-Chain,
//! carried by warp messages signed by a quorum of the subnet's validators:
//!
//! 1. `initiate`: the contract emits a `RegisterL1ValidatorMessage`; its SHA-256 is the
//!    validation ID.
//! 2. `submit`: that message is signed and registered on the P-Chain.
//! 3. `complete`: the P-Chain's `L1ValidatorRegistrationMessage` acknowledgment is signed, with
//!    the original message as justification, and delivered back to the contract.
//!
//! [`services::RegistrationService`] sequences the steps; [`utils::warp_codec`] holds the
//! binary layouts.

pub mod chain;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{RegistrarConfig, RegistrationSettings};
pub use services::RegistrationService;
