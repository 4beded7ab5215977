//! Head-tailing listener.
//!
//! Each iteration compares the chain head with the persisted watermark and
//! inspects at most one block. The watermark only moves forward, and only
//! after a block is fully written, so a restart resumes where the last run
//! stopped. Any error ends the run.

use std::sync::atomic::{AtomicBool, Ordering};

use eyre::{Context, Result};
use mev_data::provider::with_timeout;
use mev_data::ChainProvider;

use crate::config::ListenerConfig;
use crate::inspector::Inspector;

/// What one listener iteration did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerStep {
    /// No watermark existed; it was set to this block and no block is
    /// settled past it yet.
    Initialized(u64),
    /// This block was inspected and became the watermark.
    Inspected(u64),
    /// The head is not far enough ahead of the watermark yet.
    Waiting { head: u64, watermark: u64 },
}

/// Next block to inspect, if `head` is more than `lag` blocks past `watermark`.
pub fn next_block_to_inspect(head: u64, watermark: u64, lag: u64) -> Option<u64> {
    (head.saturating_sub(watermark) > lag).then_some(watermark + 1)
}

/// One listener iteration.
///
/// # Errors
/// Returns error if the head cannot be read, the block fails to inspect, or
/// the watermark cannot be stored.
pub async fn inspect_next_block<P>(
    inspector: &Inspector<P>,
    config: &ListenerConfig,
    http: &reqwest::Client,
) -> Result<ListenerStep>
where
    P: ChainProvider + 'static,
{
    let head = with_timeout(
        inspector.config().request_timeout(),
        "eth_blockNumber",
        inspector.provider().get_latest_block_number(),
    )
    .await
    .wrap_err("failed to read chain head")?;

    let store = inspector.store();
    let (watermark, initialized) = match store.find_latest_block_update()? {
        Some(watermark) => (watermark, false),
        None => {
            let start = head.saturating_sub(1);
            store
                .update_latest_block(start)
                .wrap_err("failed to initialize watermark")?;
            tracing::info!(head, watermark = start, "initialized watermark");
            (start, true)
        }
    };

    let Some(block_number) = next_block_to_inspect(head, watermark, config.lag) else {
        return Ok(if initialized {
            ListenerStep::Initialized(watermark)
        } else {
            ListenerStep::Waiting { head, watermark }
        });
    };

    tracing::debug!(head, watermark, block_number, "inspecting next block");
    inspector.inspect_single_block(block_number).await?;
    store
        .update_latest_block(block_number)
        .wrap_err_with(|| format!("failed to advance watermark to {}", block_number))?;

    if let Some(url) = &config.healthcheck_url {
        ping_healthcheck(http.clone(), url.clone());
    }

    Ok(ListenerStep::Inspected(block_number))
}

/// Tail the chain until `shutdown` is set.
///
/// The flag is read once per iteration, so an in-flight block always
/// finishes before the listener returns.
///
/// # Errors
/// Returns the first iteration error; the watermark keeps the last
/// successfully inspected block.
#[tracing::instrument(skip_all, fields(lag = config.lag))]
pub async fn run_listener<P>(
    inspector: &Inspector<P>,
    config: &ListenerConfig,
    shutdown: &AtomicBool,
) -> Result<()>
where
    P: ChainProvider + 'static,
{
    let http = reqwest::Client::new();
    tracing::info!("listener started");

    while !shutdown.load(Ordering::SeqCst) {
        match inspect_next_block(inspector, config, &http).await? {
            ListenerStep::Waiting { head, watermark } => {
                tracing::trace!(head, watermark, "waiting for head to advance");
                tokio::time::sleep(config.poll_interval()).await;
            }
            ListenerStep::Initialized(_) | ListenerStep::Inspected(_) => {}
        }
    }

    tracing::info!("listener stopped");
    Ok(())
}

/// Fire-and-forget GET; failures are logged and never reach the loop.
fn ping_healthcheck(http: reqwest::Client, url: String) {
    tokio::spawn(async move {
        match http.get(&url).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(url = %url, status = %response.status(), "healthcheck rejected");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(url = %url, error = %err, "healthcheck failed"),
        }
    });
}
