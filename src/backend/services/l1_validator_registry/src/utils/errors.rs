use std::fmt;

use thiserror::Error;

use crate::models::ids::ValidationId;
use crate::models::registration::{RegistrationSession, RegistrationStep};

/// Malformed binary input. Never retried: either the caller handed us the wrong bytes or the
/// chain data is corrupt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("truncated {field}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("unknown codec id {0}")]
    UnknownCodec(u16),

    #[error("unknown type id {type_id} for {context}")]
    UnknownTypeId { context: &'static str, type_id: u32 },

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("invalid length for {field}: expected {expected}, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("checksum mismatch")]
    Checksum,

    #[error("invalid warp predicate: {0}")]
    InvalidPredicate(&'static str),

    #[error("ABI decoding failed: {0}")]
    Abi(String),
}

impl From<ethabi::Error> for ParseError {
    fn from(err: ethabi::Error) -> Self {
        ParseError::Abi(err.to_string())
    }
}

/// Failure talking to one of the chains.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no sender address configured for {0}")]
    MissingSender(&'static str),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ChainError {
    /// Errors worth retrying for idempotent reads.
    pub fn is_transient(&self) -> bool {
        match self {
            ChainError::Transport(_) | ChainError::Timeout => true,
            ChainError::HttpStatus(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChainError::Timeout
        } else if let Some(status) = err.status() {
            ChainError::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            ChainError::InvalidResponse(err.to_string())
        } else {
            ChainError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    /// The range was exhausted without a matching log. Legitimate absence: the registration was
    /// never initiated, or the queried node lacks the history.
    #[error("no justification log found for validation id {0}")]
    NotFound(ValidationId),

    #[error("justification scan timed out after {0:?}")]
    ScanTimeout(std::time::Duration),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("signature aggregator unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("signature quorum not met: {0}")]
    QuorumNotMet(String),

    #[error("malformed aggregator response: {0}")]
    Malformed(String),

    /// Raised before any request is sent.
    #[error("quorum percentage {0} outside 0..=100")]
    InvalidQuorumPercentage(u8),
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("transaction {0} reverted")]
    TxReverted(String),

    #[error("no registration warp message found in transaction {0}")]
    JustificationMissing(String),

    #[error("no validation id recorded for node {0}")]
    ValidationNotFound(String),

    #[error("timed out waiting for receipt of {0}")]
    ReceiptTimeout(String),

    #[error("no P-Chain wallet configured")]
    WalletUnavailable,

    #[error(transparent)]
    Justification(#[from] ResolveError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Top-level failure of `register_validator`: which phase broke, and the session as it stood so
/// the caller can resume from the last known hash.
#[derive(Error, Debug)]
pub struct RegistrationFailure {
    pub step: RegistrationStep,
    pub session: RegistrationSession,
    #[source]
    pub source: RegistrationError,
}

impl fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "registration of {} failed during {}: {}",
            self.session.node_id, self.step, self.source
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
