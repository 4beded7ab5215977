//! mev-data crate
//!
//! Block, trace and event types, the chain provider contract with its Alloy
//! RPC implementation, and the SQLite store for inspected blocks.

pub mod blocks;
pub mod provider;
pub mod store;
pub mod types;

pub use provider::ChainProvider;
pub use store::{BlockRows, Store};
pub use types::{
    Arbitrage, Block, BlockHeader, CallKind, Classification, ClassifiedTrace, DecodedParams,
    Liquidation, MinerPayment, MinerPaymentKind, ParamValue, Protocol, PunkBid,
    PunkBidAcceptance, PunkSnipe, Receipt, Swap, Trace, Transfer, ETH_TOKEN_ADDRESS,
};
