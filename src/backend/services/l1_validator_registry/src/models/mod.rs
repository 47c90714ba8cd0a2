pub mod chain;
pub mod ids;
pub mod registration;
pub mod warp;

pub use ids::{Id, NodeId, ValidationId};
pub use registration::{
    RegistrationOutcome, RegistrationPhase, RegistrationSession, RegistrationStep,
    ValidatorRegistrationRequest,
};
