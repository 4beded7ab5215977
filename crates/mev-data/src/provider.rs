//! Chain provider contract consumed by the block pipeline.
//!
//! The pipeline only needs four read calls. [`crate::blocks::BlockFetcher`]
//! implements them over JSON-RPC; tests implement them over canned blocks.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use eyre::{eyre, Context, Result};

use crate::types::{Block, BlockHeader, Receipt, Trace};

/// Read access to chain data for one block height at a time.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Header of `block_number`, or `None` if the node does not have it.
    async fn get_block(&self, block_number: u64) -> Result<Option<BlockHeader>>;

    /// All call traces of `block_number` in discovery order.
    async fn get_traces(&self, block_number: u64) -> Result<Vec<Trace>>;

    /// All transaction receipts of `block_number`.
    async fn get_receipts(&self, block_number: u64) -> Result<Vec<Receipt>>;

    /// Current chain head.
    async fn get_latest_block_number(&self) -> Result<u64>;
}

/// Run one provider call, failing it if it outlives `request_timeout`.
pub async fn with_timeout<T, F>(request_timeout: Duration, what: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(request_timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(eyre!(
            "{} timed out after {}ms",
            what,
            request_timeout.as_millis()
        )),
    }
}

/// Fetch header, traces and receipts of one block.
///
/// The three calls run one after another so a block never holds more than one
/// request in flight. Each call is bounded by `request_timeout`.
#[tracing::instrument(skip(provider, request_timeout))]
pub async fn create_from_block_number<P>(
    provider: &P,
    block_number: u64,
    request_timeout: Duration,
) -> Result<Block>
where
    P: ChainProvider + ?Sized,
{
    let header = with_timeout(request_timeout, "eth_getBlockByNumber", provider.get_block(block_number))
        .await
        .wrap_err_with(|| format!("failed to fetch block {}", block_number))?
        .ok_or_else(|| eyre!("block {} not found", block_number))?;

    let traces = with_timeout(request_timeout, "trace_block", provider.get_traces(block_number))
        .await
        .wrap_err_with(|| format!("failed to fetch traces for block {}", block_number))?;

    let receipts = with_timeout(
        request_timeout,
        "eth_getBlockReceipts",
        provider.get_receipts(block_number),
    )
    .await
    .wrap_err_with(|| format!("failed to fetch receipts for block {}", block_number))?;

    tracing::debug!(
        block_number,
        traces = traces.len(),
        receipts = receipts.len(),
        "block fetched"
    );

    Ok(Block::from_parts(header, traces, receipts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_timeout_fails_slow_calls() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), "slow call", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        let err = result.expect_err("slow call should time out");
        assert!(err.to_string().contains("slow call timed out"));
    }

    #[tokio::test]
    async fn with_timeout_passes_fast_results_through() {
        let value = with_timeout(Duration::from_secs(1), "fast call", async { Ok(7_u64) })
            .await
            .expect("fast call should succeed");
        assert_eq!(value, 7);
    }
}
