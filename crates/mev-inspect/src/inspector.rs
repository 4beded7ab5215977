//! Shared inspection context and the batch driver.

use std::sync::Arc;

use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mev_classify::TraceClassifier;
use mev_data::{ChainProvider, Store};
use tokio::sync::Semaphore;

use crate::config::InspectorConfig;
use crate::inspect_block::{inspect_block, InspectionSummary};

/// Outcome of a batch: every block in the range is attempted exactly once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    /// Blocks inspected and written, ascending.
    pub succeeded: Vec<u64>,
    /// Blocks that failed, ascending, with the error chain.
    pub failed: Vec<(u64, String)>,
}

/// Provider, store and classifier shared by every block worker.
pub struct Inspector<P> {
    provider: Arc<P>,
    store: Arc<Store>,
    classifier: Arc<TraceClassifier>,
    config: InspectorConfig,
}

impl<P> Clone for Inspector<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            store: Arc::clone(&self.store),
            classifier: Arc::clone(&self.classifier),
            config: self.config.clone(),
        }
    }
}

impl<P: ChainProvider + 'static> Inspector<P> {
    pub fn new(
        provider: Arc<P>,
        store: Arc<Store>,
        classifier: Arc<TraceClassifier>,
        config: InspectorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            classifier,
            config,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub async fn inspect_single_block(&self, block_number: u64) -> Result<InspectionSummary> {
        inspect_block(
            self.provider.as_ref(),
            &self.store,
            &self.classifier,
            &self.config,
            block_number,
        )
        .await
    }

    /// Inspect blocks `after + 1 ..= before` with at most `max_concurrency`
    /// blocks in flight.
    ///
    /// - A failing block is logged and recorded; the rest of the range continues
    /// - Each block is fetched and written by one task end to end
    /// - `after >= before` is an empty range
    ///
    /// # Errors
    /// Returns error only if the progress bar template is invalid; block
    /// failures are reported in the [`BatchReport`].
    #[tracing::instrument(skip(self))]
    pub async fn inspect_many_blocks(&self, after: u64, before: u64) -> Result<BatchReport> {
        let block_numbers: Vec<u64> = (after.saturating_add(1)..=before).collect();
        let mut report = BatchReport {
            attempted: block_numbers.len(),
            ..BatchReport::default()
        };
        if block_numbers.is_empty() {
            tracing::info!(after, before, "empty block range");
            return Ok(report);
        }

        let progress = ProgressBar::new(block_numbers.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} blocks")
                .wrap_err("failed to create progress style")?,
        );

        let max_concurrency = self.config.max_concurrency.max(1);
        tracing::info!(
            after,
            before,
            blocks = block_numbers.len(),
            max_concurrency,
            "starting batch inspection"
        );

        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        let mut handles = Vec::with_capacity(block_numbers.len());
        for block_number in block_numbers {
            let semaphore = Arc::clone(&semaphore);
            let inspector = self.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                inspector.inspect_single_block(block_number).await
            });
            handles.push((block_number, handle));
        }

        for (block_number, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(eyre::eyre!("inspection task failed: {}", join_error)),
            };
            match outcome {
                Ok(_) => report.succeeded.push(block_number),
                Err(err) => {
                    tracing::error!(block_number, error = ?err, "failed to inspect block");
                    report.failed.push((block_number, format!("{:#}", err)));
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch inspection finished"
        );

        Ok(report)
    }
}
