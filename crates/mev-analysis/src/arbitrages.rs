//! Same-account arbitrage detection over ordered swaps.
//!
//! ## Algorithm
//!
//! Swaps are grouped by transaction, then by account, keeping their trace
//! order. Each account's swaps are walked as a chain of token hops: a swap
//! extends the current path when its `token_in` is the previous swap's
//! `token_out`, and starts a new path otherwise. A path closes when a swap
//! returns to the path's starting token. A closed path of at least two swaps
//! is an arbitrage if it ends with more than it started with.
//!
//! Cycles funded by one account and closed by another (flash-loan contracts
//! paying out to a separate EOA) are not modeled.

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256};
use mev_data::{Arbitrage, Swap};

/// Arbitrages found in `swaps`, which must be ordered as
/// [`crate::swaps::get_swaps`] returns them.
pub fn get_arbitrages(swaps: &[Swap]) -> Vec<Arbitrage> {
    let mut by_transaction: BTreeMap<B256, Vec<&Swap>> = BTreeMap::new();
    for swap in swaps {
        by_transaction
            .entry(swap.transaction_hash)
            .or_default()
            .push(swap);
    }

    let mut arbitrages = Vec::new();
    for tx_swaps in by_transaction.values() {
        for account_swaps in group_by_account(tx_swaps) {
            arbitrages.extend(arbitrages_for_account(&account_swaps));
        }
    }

    if !arbitrages.is_empty() {
        tracing::debug!(arbitrages = arbitrages.len(), "arbitrages detected");
    }
    arbitrages
}

/// Per-account swap lists, in order of each account's first swap.
fn group_by_account<'a>(swaps: &[&'a Swap]) -> Vec<Vec<&'a Swap>> {
    let mut groups: Vec<(Address, Vec<&'a Swap>)> = Vec::new();
    for &swap in swaps {
        match groups
            .iter_mut()
            .find(|(account, _)| *account == swap.account_address)
        {
            Some((_, group)) => group.push(swap),
            None => groups.push((swap.account_address, vec![swap])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

fn arbitrages_for_account(swaps: &[&Swap]) -> Vec<Arbitrage> {
    let mut arbitrages = Vec::new();
    let mut path: Vec<&Swap> = Vec::new();

    for &swap in swaps {
        if let Some(previous) = path.last() {
            if previous.token_out_address != swap.token_in_address {
                path.clear();
            }
        }
        path.push(swap);

        let start = path[0];
        if path.len() >= 2 && swap.token_out_address == start.token_in_address {
            if let Some(arbitrage) = close_path(&path) {
                arbitrages.push(arbitrage);
            }
            path.clear();
        }
    }

    arbitrages
}

fn close_path(path: &[&Swap]) -> Option<Arbitrage> {
    let start = path.first()?;
    let end = path.last()?;

    let start_amount = start.amount_in;
    let end_amount = end.amount_out;
    if end_amount <= start_amount {
        return None;
    }

    Some(Arbitrage {
        block_number: start.block_number,
        transaction_hash: start.transaction_hash,
        account_address: start.account_address,
        profit_token_address: start.token_in_address,
        start_amount,
        end_amount,
        profit_amount: end_amount - start_amount,
        swaps: path.iter().map(|swap| (*swap).clone()).collect(),
    })
}
