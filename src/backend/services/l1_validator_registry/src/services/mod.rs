pub mod justification_resolver;
pub mod registration_service;
pub mod signature_aggregator;

pub use justification_resolver::JustificationResolver;
pub use registration_service::RegistrationService;
pub use signature_aggregator::{
    AggregatedSignature, AggregationRequest, HttpSignatureAggregator, QuorumPercentage,
    SignatureAggregator,
};
