//! Swap derivation.
//!
//! Pool `swap` calldata names the recipient but not the tokens, so each swap
//! is resolved from the transfers around it:
//!
//! - **in**: the last transfer into the pool before the swap call, or, for
//!   pools that pull payment through a callback, the last transfer into the
//!   pool inside the swap's own subtree
//! - **out**: the single transfer from the pool to the recipient inside the
//!   swap's subtree
//!
//! Swaps that cannot be resolved are dropped. When swap calls nest (a router
//! recognized as a pool wrapping a real pool call) only the innermost call
//! survives, so one economic swap yields exactly one [`Swap`].

use alloy::primitives::Address;
use mev_data::{Classification, ClassifiedTrace, Swap, Transfer};

use crate::traces::{is_child_of, live_traces, traces_by_transaction};
use crate::transfers::{filter_transfers, get_transfer, remove_child_transfers_of_transfers};

/// Swaps in `traces`, ordered by transaction hash then trace address.
///
/// The Arbitrage Detector depends on this order.
pub fn get_swaps(traces: &[ClassifiedTrace]) -> Vec<Swap> {
    traces_by_transaction(live_traces(traces))
        .values()
        .flat_map(|tx_traces| remove_enclosing_swaps(swaps_for_transaction(tx_traces)))
        .collect()
}

fn swaps_for_transaction(traces: &[&ClassifiedTrace]) -> Vec<Swap> {
    let mut swaps = Vec::new();
    let mut prior_transfers = Vec::new();

    for trace in traces {
        match trace.classification {
            Classification::Transfer => {
                if let Some(transfer) = get_transfer(trace) {
                    prior_transfers.push(transfer);
                }
            }
            Classification::Swap => {
                let child_transfers: Vec<Transfer> = traces
                    .iter()
                    .filter(|child| is_child_of(child.trace_address(), trace.trace_address()))
                    .filter_map(|child| get_transfer(child))
                    .collect();

                if let Some(swap) = parse_swap(
                    trace,
                    &remove_child_transfers_of_transfers(&prior_transfers),
                    &remove_child_transfers_of_transfers(&child_transfers),
                ) {
                    swaps.push(swap);
                }
            }
            _ => {}
        }
    }

    swaps
}

fn parse_swap(
    trace: &ClassifiedTrace,
    prior_transfers: &[Transfer],
    child_transfers: &[Transfer],
) -> Option<Swap> {
    let pool_address = trace.trace.to_address?;
    let recipient_address = recipient_address(trace)?;

    let transfer_in = filter_transfers(prior_transfers, Some(pool_address), None)
        .last()
        .copied()
        .or_else(|| {
            filter_transfers(child_transfers, Some(pool_address), None)
                .last()
                .copied()
        });
    let Some(transfer_in) = transfer_in else {
        tracing::trace!(
            transaction_hash = ?trace.transaction_hash(),
            trace_address = ?trace.trace_address(),
            "no transfer into pool"
        );
        return None;
    };

    let transfers_out =
        filter_transfers(child_transfers, Some(recipient_address), Some(pool_address));
    let [transfer_out] = transfers_out.as_slice() else {
        tracing::trace!(
            transaction_hash = ?trace.transaction_hash(),
            trace_address = ?trace.trace_address(),
            transfers_out = transfers_out.len(),
            "expected exactly one transfer out of pool"
        );
        return None;
    };

    Some(Swap {
        block_number: trace.block_number(),
        transaction_hash: trace.transaction_hash()?,
        trace_address: trace.trace_address().to_vec(),
        protocol: trace.protocol,
        abi_name: trace.abi_name.clone().unwrap_or_default(),
        pool_address,
        account_address: trace.trace.from_address,
        recipient_address,
        token_in_address: transfer_in.token_address,
        token_out_address: transfer_out.token_address,
        amount_in: transfer_in.amount,
        amount_out: transfer_out.amount,
    })
}

/// V2-style pairs name the recipient `to`, V3 pools `recipient`.
fn recipient_address(trace: &ClassifiedTrace) -> Option<Address> {
    trace
        .inputs
        .address("to")
        .or_else(|| trace.inputs.address("recipient"))
}

/// Keeps only swaps with no other swap nested beneath them.
fn remove_enclosing_swaps(swaps: Vec<Swap>) -> Vec<Swap> {
    let enclosing: Vec<bool> = swaps
        .iter()
        .map(|outer| {
            swaps
                .iter()
                .any(|inner| is_child_of(&inner.trace_address, &outer.trace_address))
        })
        .collect();

    swaps
        .into_iter()
        .zip(enclosing)
        .filter_map(|(swap, is_enclosing)| (!is_enclosing).then_some(swap))
        .collect()
}
