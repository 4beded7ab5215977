//! mev-analysis crate
//!
//! Pure derivation of MEV events from classified traces: transfers, swaps,
//! arbitrage cycles, liquidations, punk snipes and miner payments.

pub mod arbitrages;
pub mod liquidations;
pub mod miner_payments;
pub mod punks;
pub mod swaps;
pub mod traces;
pub mod transfers;

#[cfg(test)]
mod test_utils;

pub use arbitrages::get_arbitrages;
pub use liquidations::get_liquidations;
pub use miner_payments::get_miner_payments;
pub use punks::{get_punk_bid_acceptances, get_punk_bids, get_punk_snipes};
pub use swaps::get_swaps;
pub use transfers::get_transfers;
