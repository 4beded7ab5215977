//! Shared test helpers and utilities.
//!
//! Provides an in-memory store, a simulated chain provider with in-flight
//! accounting, and block fixtures built from real ABI-encoded calldata.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use mev_classify::decoder::{erc20, uniswap_v2};
use mev_classify::{DeployedContracts, TraceClassifier};
use mev_data::{Block, BlockHeader, CallKind, ChainProvider, Receipt, Store, Trace};
use mev_inspect::{Inspector, InspectorConfig};

pub const MINER: Address = address!("95222290dd7278aa3ddd389cc1e1d165cc4bafe5");
pub const BOT: Address = address!("b07b07b07b07b07b07b07b07b07b07b07b07b07b");
pub const POOL_1: Address = address!("b4e16d0168e52d35cacd2c6185b44281ec28c9dc");
pub const POOL_2: Address = address!("397ff1542f962076d0bfe58ea045ffa2d347aca0");
pub const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
pub const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

pub const GWEI: u128 = 1_000_000_000;
pub const BASE_FEE: u128 = 20 * GWEI;

/// Creates an in-memory SQLite Store for tests.
///
/// # Panics
/// Panics if the in-memory database cannot be created (should never happen).
pub fn test_store() -> Store {
    Store::new(":memory:").expect("in-memory store should always open")
}

pub fn tx_hash(block_number: u64, index: u64) -> B256 {
    B256::from(U256::from(block_number * 1_000 + index + 1))
}

fn call(
    block_number: u64,
    tx_index: u64,
    trace_address: Vec<usize>,
    from: Address,
    to: Address,
    input: Vec<u8>,
) -> Trace {
    Trace {
        block_number,
        transaction_hash: Some(tx_hash(block_number, tx_index)),
        transaction_position: Some(tx_index),
        trace_address,
        call_kind: CallKind::Call,
        from_address: from,
        to_address: Some(to),
        input: Bytes::from(input),
        output: Bytes::new(),
        value: U256::ZERO,
        gas: 300_000,
        gas_used: 40_000,
        subtraces: 0,
        error: None,
    }
}

fn transfer_input(recipient: Address, amount: u64) -> Vec<u8> {
    erc20::ERC20::transferCall {
        recipient,
        amount: U256::from(amount),
    }
    .abi_encode()
}

fn pair_swap_input(to: Address) -> Vec<u8> {
    uniswap_v2::UniswapV2Pair::swapCall {
        amount0Out: U256::ZERO,
        amount1Out: U256::from(1),
        to,
        data: Bytes::new(),
    }
    .abi_encode()
}

fn receipt(block_number: u64, tx_index: u64, gas_used: u64) -> Receipt {
    Receipt {
        block_number,
        transaction_hash: tx_hash(block_number, tx_index),
        transaction_index: tx_index,
        from_address: BOT,
        to_address: Some(BOT),
        gas_used,
        effective_gas_price: BASE_FEE + 2 * GWEI,
        status: true,
    }
}

fn block_with(block_number: u64, traces: Vec<Trace>, receipts: Vec<Receipt>) -> Block {
    Block {
        block_number,
        block_hash: B256::from(U256::from(block_number)),
        miner: MINER,
        base_fee_per_gas: BASE_FEE,
        timestamp: 1_700_000_000 + block_number * 12,
        traces,
        receipts,
    }
}

/// Block with one WETH→USDC→WETH arbitrage (100 in, 110 out) and a
/// 1 gwei coinbase tip, in transaction 0.
pub fn arbitrage_block(block_number: u64) -> Block {
    let n = block_number;
    let mut tip = call(n, 0, vec![4], BOT, MINER, Vec::new());
    tip.value = U256::from(GWEI);

    let traces = vec![
        call(n, 0, vec![], BOT, BOT, vec![0xde, 0xad, 0xbe, 0xef]),
        call(n, 0, vec![0], BOT, WETH, transfer_input(POOL_1, 100)),
        call(n, 0, vec![1], BOT, POOL_1, pair_swap_input(BOT)),
        call(n, 0, vec![1, 0], POOL_1, USDC, transfer_input(BOT, 50)),
        call(n, 0, vec![2], BOT, USDC, transfer_input(POOL_2, 50)),
        call(n, 0, vec![3], BOT, POOL_2, pair_swap_input(BOT)),
        call(n, 0, vec![3, 0], POOL_2, WETH, transfer_input(BOT, 110)),
        tip,
    ];

    block_with(n, traces, vec![receipt(n, 0, 150_000)])
}

/// Block with a single plain ERC20 transfer.
pub fn transfer_block(block_number: u64) -> Block {
    let n = block_number;
    let traces = vec![call(n, 0, vec![], BOT, WETH, transfer_input(POOL_1, 7))];
    block_with(n, traces, vec![receipt(n, 0, 21_000)])
}

/// Block whose receipt reports zero gas used, which fails derivation.
pub fn malformed_block(block_number: u64) -> Block {
    let mut block = transfer_block(block_number);
    block.receipts[0].gas_used = 0;
    block
}

/// Simulated chain provider.
///
/// Every call sleeps for `delay` (or `slow_delay` for slow blocks) and is
/// counted while in flight, so tests can assert concurrency bounds.
#[derive(Default)]
pub struct MockProvider {
    blocks: Mutex<HashMap<u64, Block>>,
    failing: Mutex<HashSet<u64>>,
    slow: Mutex<HashSet<u64>>,
    head: AtomicU64,
    delay: Duration,
    slow_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    head_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn insert_block(&self, block: Block) {
        self.blocks
            .lock()
            .expect("blocks lock")
            .insert(block.block_number, block);
    }

    pub fn fail_block(&self, block_number: u64) {
        self.failing.lock().expect("failing lock").insert(block_number);
    }

    pub fn slow_block(&mut self, block_number: u64, delay: Duration) {
        self.slow.lock().expect("slow lock").insert(block_number);
        self.slow_delay = delay;
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    async fn simulate_request(&self, block_number: u64) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let is_slow = self.slow.lock().expect("slow lock").contains(&block_number);
        let delay = if is_slow { self.slow_delay } else { self.delay };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.lock().expect("failing lock").contains(&block_number) {
            return Err(eyre!("simulated RPC failure for block {}", block_number));
        }
        Ok(())
    }

    fn block(&self, block_number: u64) -> Option<Block> {
        self.blocks
            .lock()
            .expect("blocks lock")
            .get(&block_number)
            .cloned()
    }
}

#[async_trait]
impl ChainProvider for MockProvider {
    async fn get_block(&self, block_number: u64) -> Result<Option<BlockHeader>> {
        self.simulate_request(block_number).await?;
        Ok(self.block(block_number).map(|block| BlockHeader {
            block_number: block.block_number,
            block_hash: block.block_hash,
            miner: block.miner,
            base_fee_per_gas: block.base_fee_per_gas,
            timestamp: block.timestamp,
        }))
    }

    async fn get_traces(&self, block_number: u64) -> Result<Vec<Trace>> {
        self.simulate_request(block_number).await?;
        Ok(self
            .block(block_number)
            .map(|block| block.traces)
            .unwrap_or_default())
    }

    async fn get_receipts(&self, block_number: u64) -> Result<Vec<Receipt>> {
        self.simulate_request(block_number).await?;
        Ok(self
            .block(block_number)
            .map(|block| block.receipts)
            .unwrap_or_default())
    }

    async fn get_latest_block_number(&self) -> Result<u64> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head.load(Ordering::SeqCst))
    }
}

pub fn test_inspector(
    provider: Arc<MockProvider>,
    store: Arc<Store>,
    config: InspectorConfig,
) -> Inspector<MockProvider> {
    let classifier = TraceClassifier::with_defaults(Arc::new(DeployedContracts::new()));
    Inspector::new(provider, store, Arc::new(classifier), config)
}
