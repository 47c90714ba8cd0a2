pub mod evm;
pub mod jsonrpc;
pub mod pchain;
pub mod traits;
pub mod wallet;

pub use evm::EvmRpcClient;
pub use pchain::PChainRpcClient;
pub use traits::{LogSource, PChain, PChainWallet, ValidatorManager};
pub use wallet::{PChainTxSigner, SignerWallet};
