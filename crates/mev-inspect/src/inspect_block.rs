//! Single-block pipeline.
//!
//! Order of operations for one block:
//! 1. Fetch header, traces and receipts
//! 2. Classify traces
//! 3. Derive transfers, swaps, arbitrages, liquidations, punk snipes and
//!    miner payments
//! 4. Replace the block row (and classified traces, if enabled)
//! 5. Per kind, same order: delete the block's rows, write the fresh ones
//!
//! Nothing is written until every kind is derived, so a derivation error
//! leaves the stored block untouched. Writes are not atomic across kinds: a
//! failed write keeps earlier kinds and the block must be run again.

use std::fmt;

use eyre::{Context, Result};
use mev_analysis::{
    get_arbitrages, get_liquidations, get_miner_payments, get_punk_bid_acceptances,
    get_punk_bids, get_punk_snipes, get_swaps, get_transfers,
};
use mev_classify::TraceClassifier;
use mev_data::provider::create_from_block_number;
use mev_data::{
    Arbitrage, Block, BlockRows, ChainProvider, ClassifiedTrace, Liquidation, MinerPayment,
    PunkSnipe, Store, Swap, Transfer,
};

use crate::config::InspectorConfig;

/// Row counts written for one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InspectionSummary {
    pub block_number: u64,
    pub transactions: usize,
    pub traces: usize,
    pub transfers: usize,
    pub swaps: usize,
    pub arbitrages: usize,
    pub liquidations: usize,
    pub punk_snipes: usize,
    pub miner_payments: usize,
}

impl fmt::Display for InspectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {}: {} traces, {} transfers, {} swaps, {} arbitrages, {} liquidations, \
             {} punk snipes, {} miner payments",
            self.block_number,
            self.traces,
            self.transfers,
            self.swaps,
            self.arbitrages,
            self.liquidations,
            self.punk_snipes,
            self.miner_payments
        )
    }
}

/// Every event kind derived from one block.
#[derive(Clone, Debug, Default)]
pub struct DerivedEvents {
    pub transfers: Vec<Transfer>,
    pub swaps: Vec<Swap>,
    pub arbitrages: Vec<Arbitrage>,
    pub liquidations: Vec<Liquidation>,
    pub punk_snipes: Vec<PunkSnipe>,
    pub miner_payments: Vec<MinerPayment>,
}

/// Derive all event kinds of `block` in pipeline order.
///
/// # Errors
/// Returns error if miner payment accounting rejects a receipt.
pub fn derive_events(block: &Block, classified: &[ClassifiedTrace]) -> Result<DerivedEvents> {
    let transfers = get_transfers(classified);
    let swaps = get_swaps(classified);
    let arbitrages = get_arbitrages(&swaps);
    let liquidations = get_liquidations(classified);
    let punk_snipes = get_punk_snipes(
        &get_punk_bids(classified),
        &get_punk_bid_acceptances(classified),
    );
    let miner_payments = get_miner_payments(
        block.miner,
        block.base_fee_per_gas,
        classified,
        &block.receipts,
    )
    .wrap_err_with(|| format!("failed to derive miner payments for block {}", block.block_number))?;

    Ok(DerivedEvents {
        transfers,
        swaps,
        arbitrages,
        liquidations,
        punk_snipes,
        miner_payments,
    })
}

/// Run the full pipeline for one block and replace its stored rows.
///
/// Re-running a block produces the same stored rows.
///
/// # Errors
/// Returns error if a fetch fails or times out, derivation fails, or a
/// write fails.
#[tracing::instrument(skip(provider, store, classifier, config))]
pub async fn inspect_block<P>(
    provider: &P,
    store: &Store,
    classifier: &TraceClassifier,
    config: &InspectorConfig,
    block_number: u64,
) -> Result<InspectionSummary>
where
    P: ChainProvider + ?Sized,
{
    let block = create_from_block_number(provider, block_number, config.request_timeout()).await?;
    let classified = classifier.classify(&block.traces);

    let events = derive_events(&block, &classified)?;

    replace(store, block_number, std::slice::from_ref(&block))?;
    if config.write_classified_traces {
        replace(store, block_number, &classified)?;
    }
    replace(store, block_number, &events.transfers)?;
    replace(store, block_number, &events.swaps)?;
    replace(store, block_number, &events.arbitrages)?;
    replace(store, block_number, &events.liquidations)?;
    replace(store, block_number, &events.punk_snipes)?;
    replace(store, block_number, &events.miner_payments)?;

    let summary = InspectionSummary {
        block_number,
        transactions: block.transaction_count(),
        traces: classified.len(),
        transfers: events.transfers.len(),
        swaps: events.swaps.len(),
        arbitrages: events.arbitrages.len(),
        liquidations: events.liquidations.len(),
        punk_snipes: events.punk_snipes.len(),
        miner_payments: events.miner_payments.len(),
    };

    tracing::info!(
        block_number,
        traces = summary.traces,
        transfers = summary.transfers,
        swaps = summary.swaps,
        arbitrages = summary.arbitrages,
        liquidations = summary.liquidations,
        punk_snipes = summary.punk_snipes,
        miner_payments = summary.miner_payments,
        "block inspected"
    );

    Ok(summary)
}

fn replace<T: BlockRows>(store: &Store, block_number: u64, rows: &[T]) -> Result<()> {
    store
        .delete_for_block::<T>(block_number)
        .wrap_err_with(|| format!("failed to delete {} for block {}", T::TABLE, block_number))?;
    store
        .write_all(rows)
        .wrap_err_with(|| format!("failed to write {} for block {}", T::TABLE, block_number))?;
    Ok(())
}
