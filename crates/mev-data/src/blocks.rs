//! Alloy RPC provider integration for fetching blocks, traces and receipts.
//!
//! Maps Alloy RPC types (parity `trace_block` output, receipts, headers) to
//! mev-data schema types.

use alloy::network::Ethereum;
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::eth::{BlockId, BlockNumberOrTag, TransactionReceipt};
use alloy::rpc::types::trace::parity::{
    Action, CallType, LocalizedTransactionTrace, TraceOutput,
};
use alloy::primitives::Bytes;
use async_trait::async_trait;
use eyre::{Context, Result};
use std::sync::Arc;

use crate::provider::ChainProvider;
use crate::types::{BlockHeader, CallKind, Receipt, Trace};

type ProviderType = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider<Ethereum>,
>;

/// Fetches blocks, parity traces and receipts from an Ethereum archive node.
///
/// The node must expose the `trace_` namespace (Erigon, Reth, Nethermind).
#[derive(Clone)]
pub struct BlockFetcher {
    /// Alloy FillProvider with gas, nonce, chain_id, blob_gas fillers
    provider: Arc<ProviderType>,
}

impl BlockFetcher {
    /// Creates a new BlockFetcher and tests RPC connectivity.
    ///
    /// Verifies connection via `eth_blockNumber` call and logs the RPC endpoint.
    ///
    /// # Errors
    /// Returns error if the URL is malformed or the connectivity test fails.
    ///
    /// # Example
    /// ```no_run
    /// # use mev_data::blocks::BlockFetcher;
    /// # async fn example() -> eyre::Result<()> {
    /// let fetcher = BlockFetcher::new("http://localhost:8545").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(skip_all, fields(rpc_url = %rpc_url))]
    pub async fn new(rpc_url: &str) -> Result<Self> {
        let provider =
            ProviderBuilder::new().on_http(rpc_url.parse().wrap_err("invalid RPC URL format")?);
        let provider = Arc::new(provider);

        let block_number = provider
            .get_block_number()
            .await
            .wrap_err("failed to test RPC connectivity with eth_blockNumber")?;

        tracing::info!(
            rpc_url = %rpc_url,
            latest_block = block_number,
            "RPC connection successful"
        );

        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainProvider for BlockFetcher {
    async fn get_block(&self, block_number: u64) -> Result<Option<BlockHeader>> {
        let block = self
            .provider
            .get_block(BlockId::Number(BlockNumberOrTag::Number(block_number)))
            .await
            .wrap_err_with(|| format!("failed to fetch block {}", block_number))?;

        let block = match block {
            Some(block) => block,
            None => {
                tracing::debug!(block_number, "block not found");
                return Ok(None);
            }
        };

        Ok(Some(BlockHeader {
            block_number: block.header.number,
            block_hash: block.header.hash,
            miner: block.header.beneficiary,
            base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from).unwrap_or(0),
            timestamp: block.header.timestamp,
        }))
    }

    async fn get_traces(&self, block_number: u64) -> Result<Vec<Trace>> {
        let traces: Vec<LocalizedTransactionTrace> = self
            .provider
            .raw_request(
                "trace_block".into(),
                (BlockNumberOrTag::Number(block_number),),
            )
            .await
            .wrap_err_with(|| format!("trace_block failed for block {}", block_number))?;

        Ok(traces
            .into_iter()
            .map(|trace| map_trace(block_number, trace))
            .collect())
    }

    async fn get_receipts(&self, block_number: u64) -> Result<Vec<Receipt>> {
        let receipts = self
            .provider
            .get_block_receipts(BlockId::Number(BlockNumberOrTag::Number(block_number)))
            .await
            .wrap_err_with(|| format!("failed to fetch receipts for block {}", block_number))?
            .unwrap_or_default();

        Ok(receipts
            .iter()
            .enumerate()
            .map(|(idx, receipt)| map_receipt(block_number, idx as u64, receipt))
            .collect())
    }

    async fn get_latest_block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .wrap_err("failed to fetch latest block number")
    }
}

fn map_call_type(call_type: &CallType) -> CallKind {
    match call_type {
        CallType::DelegateCall => CallKind::DelegateCall,
        CallType::StaticCall => CallKind::StaticCall,
        CallType::CallCode => CallKind::CallCode,
        _ => CallKind::Call,
    }
}

fn map_trace(block_number: u64, localized: LocalizedTransactionTrace) -> Trace {
    let trace = localized.trace;

    let (call_kind, from_address, to_address, input, value, gas) = match trace.action {
        Action::Call(call) => (
            map_call_type(&call.call_type),
            call.from,
            Some(call.to),
            call.input,
            call.value,
            call.gas,
        ),
        Action::Create(create) => (
            CallKind::Create,
            create.from,
            None,
            create.init,
            create.value,
            create.gas,
        ),
        Action::Selfdestruct(destruct) => (
            CallKind::SelfDestruct,
            destruct.address,
            Some(destruct.refund_address),
            Bytes::new(),
            destruct.balance,
            0,
        ),
        Action::Reward(reward) => (
            CallKind::Reward,
            reward.author,
            Some(reward.author),
            Bytes::new(),
            reward.value,
            0,
        ),
    };

    let (output, gas_used, to_address) = match trace.result {
        Some(TraceOutput::Call(out)) => (out.output, out.gas_used, to_address),
        Some(TraceOutput::Create(out)) => (out.code, out.gas_used, Some(out.address)),
        None => (Bytes::new(), 0, to_address),
    };

    Trace {
        block_number: localized.block_number.unwrap_or(block_number),
        transaction_hash: localized.transaction_hash,
        transaction_position: localized.transaction_position,
        trace_address: trace.trace_address,
        call_kind,
        from_address,
        to_address,
        input,
        output,
        value,
        gas,
        gas_used,
        subtraces: trace.subtraces,
        error: trace.error,
    }
}

fn map_receipt(block_number: u64, idx: u64, receipt: &TransactionReceipt) -> Receipt {
    Receipt {
        block_number: receipt.block_number.unwrap_or(block_number),
        transaction_hash: receipt.transaction_hash,
        transaction_index: receipt.transaction_index.unwrap_or(idx),
        from_address: receipt.from,
        to_address: receipt.to,
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        status: receipt.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_requires_valid_url() {
        let result = BlockFetcher::new("invalid://url").await;
        assert!(result.is_err(), "should reject invalid URL");
    }

    #[test]
    fn maps_parity_call_trace() {
        let json = serde_json::json!({
            "action": {
                "callType": "delegatecall",
                "from": "0x1111111111111111111111111111111111111111",
                "gas": "0x5208",
                "input": "0xa9059cbb",
                "to": "0x2222222222222222222222222222222222222222",
                "value": "0x0"
            },
            "blockHash": "0x0000000000000000000000000000000000000000000000000000000000000001",
            "blockNumber": 100,
            "result": { "gasUsed": "0x10", "output": "0x" },
            "subtraces": 0,
            "traceAddress": [0, 2],
            "transactionHash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "transactionPosition": 3,
            "type": "call"
        });
        let localized: LocalizedTransactionTrace =
            serde_json::from_value(json).expect("parity trace should deserialize");

        let trace = map_trace(100, localized);
        assert_eq!(trace.call_kind, CallKind::DelegateCall);
        assert_eq!(trace.trace_address, vec![0, 2]);
        assert_eq!(trace.gas, 0x5208);
        assert_eq!(trace.gas_used, 0x10);
        assert_eq!(trace.transaction_position, Some(3));
        assert_eq!(trace.selector(), Some([0xa9, 0x05, 0x9c, 0xbb]));
    }
}
