//! Call-tree helpers over flat trace lists.

use std::collections::BTreeMap;

use alloy::primitives::B256;
use mev_data::ClassifiedTrace;

/// Whether `child` lies strictly inside the subtree rooted at `parent`.
pub fn is_child_of(child: &[usize], parent: &[usize]) -> bool {
    child.len() > parent.len() && child.starts_with(parent)
}

/// Traces grouped by transaction, each group in call-tree order.
///
/// Traces without a transaction hash (block rewards) are skipped.
pub fn traces_by_transaction<'a>(
    traces: impl IntoIterator<Item = &'a ClassifiedTrace>,
) -> BTreeMap<B256, Vec<&'a ClassifiedTrace>> {
    let mut grouped: BTreeMap<B256, Vec<&'a ClassifiedTrace>> = BTreeMap::new();
    for trace in traces {
        if let Some(hash) = trace.transaction_hash() {
            grouped.entry(hash).or_default().push(trace);
        }
    }
    for group in grouped.values_mut() {
        group.sort_by(|a, b| a.trace_address().cmp(b.trace_address()));
    }
    grouped
}

/// Traces that actually executed, in input order.
///
/// Parity marks only the reverting frame with an error; its descendants are
/// rolled back with it, so every trace at or below an errored trace address
/// of the same transaction is dropped.
pub fn live_traces(traces: &[ClassifiedTrace]) -> Vec<&ClassifiedTrace> {
    let mut reverted: BTreeMap<Option<B256>, Vec<&[usize]>> = BTreeMap::new();
    for trace in traces.iter().filter(|trace| trace.trace.is_reverted()) {
        reverted
            .entry(trace.transaction_hash())
            .or_default()
            .push(trace.trace_address());
    }
    if reverted.is_empty() {
        return traces.iter().collect();
    }

    traces
        .iter()
        .filter(|trace| {
            let path = trace.trace_address();
            reverted
                .get(&trace.transaction_hash())
                .map_or(true, |roots| {
                    !roots
                        .iter()
                        .any(|root| path == *root || is_child_of(path, root))
                })
        })
        .collect()
}
