pub mod abi;
pub mod crypto;
pub mod errors;
pub mod retry;
pub mod warp_codec;

pub use errors::{
    AggregationError, ChainError, ConfigError, ParseError, RegistrationError,
    RegistrationFailure, ResolveError,
};
pub use retry::RetryPolicy;
