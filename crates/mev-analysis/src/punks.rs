//! CryptoPunks bid-snipe detection.
//!
//! A snipe is a bid accepted in the same transaction it was placed in, by an
//! account other than the bidder.

use mev_data::{
    Classification, ClassifiedTrace, PunkBid, PunkBidAcceptance, PunkSnipe,
};

use crate::traces::live_traces;

pub fn get_punk_bids(traces: &[ClassifiedTrace]) -> Vec<PunkBid> {
    live_traces(traces)
        .into_iter()
        .filter(|trace| trace.classification == Classification::PunkBid)
        .filter_map(|trace| {
            Some(PunkBid {
                block_number: trace.block_number(),
                transaction_hash: trace.transaction_hash()?,
                trace_address: trace.trace_address().to_vec(),
                bidder_address: trace.trace.from_address,
                punk_index: trace.inputs.uint("punkIndex")?,
                price: trace.trace.value,
            })
        })
        .collect()
}

pub fn get_punk_bid_acceptances(traces: &[ClassifiedTrace]) -> Vec<PunkBidAcceptance> {
    live_traces(traces)
        .into_iter()
        .filter(|trace| trace.classification == Classification::PunkAccept)
        .filter_map(|trace| {
            Some(PunkBidAcceptance {
                block_number: trace.block_number(),
                transaction_hash: trace.transaction_hash()?,
                trace_address: trace.trace_address().to_vec(),
                accepter_address: trace.trace.from_address,
                punk_index: trace.inputs.uint("punkIndex")?,
                min_price: trace.inputs.uint("minPrice")?,
            })
        })
        .collect()
}

/// Pairs bids with acceptances of the same punk in the same transaction.
///
/// Unpaired bids and acceptances are dropped.
pub fn get_punk_snipes(bids: &[PunkBid], acceptances: &[PunkBidAcceptance]) -> Vec<PunkSnipe> {
    let mut snipes = Vec::new();

    for acceptance in acceptances {
        for bid in bids {
            if bid.transaction_hash != acceptance.transaction_hash
                || bid.punk_index != acceptance.punk_index
                || bid.bidder_address == acceptance.accepter_address
            {
                continue;
            }
            snipes.push(PunkSnipe {
                block_number: acceptance.block_number,
                transaction_hash: acceptance.transaction_hash,
                trace_address: acceptance.trace_address.clone(),
                bid_trace_address: bid.trace_address.clone(),
                bidder_address: bid.bidder_address,
                accepter_address: acceptance.accepter_address,
                punk_index: acceptance.punk_index,
                min_acceptance_price: acceptance.min_price,
                acceptance_price: bid.price,
            });
        }
    }

    snipes.sort_by(|a, b| {
        (a.transaction_hash, &a.trace_address, &a.bid_trace_address).cmp(&(
            b.transaction_hash,
            &b.trace_address,
            &b.bid_trace_address,
        ))
    });
    snipes
}
