//! Trace and swap builders shared by unit tests.

use alloy::primitives::{address, Address, Bytes, B256, U256};
use mev_data::{
    CallKind, Classification, ClassifiedTrace, DecodedParams, Protocol, Swap, Trace,
};

pub const ALICE: Address = address!("a11ce00000000000000000000000000000000001");
pub const BOB: Address = address!("b0b0000000000000000000000000000000000002");
pub const POOL_1: Address = address!("9001000000000000000000000000000000000001");
pub const POOL_2: Address = address!("9002000000000000000000000000000000000002");
pub const TOKEN_A: Address = address!("aaaa000000000000000000000000000000000001");
pub const TOKEN_B: Address = address!("bbbb000000000000000000000000000000000002");
pub const TOKEN_C: Address = address!("cccc000000000000000000000000000000000003");

pub fn tx(n: u8) -> B256 {
    B256::repeat_byte(n)
}

pub fn trace(
    transaction_hash: B256,
    trace_address: Vec<usize>,
    from_address: Address,
    to_address: Address,
) -> Trace {
    Trace {
        block_number: 100,
        transaction_hash: Some(transaction_hash),
        transaction_position: Some(0),
        trace_address,
        call_kind: CallKind::Call,
        from_address,
        to_address: Some(to_address),
        input: Bytes::new(),
        output: Bytes::new(),
        value: U256::ZERO,
        gas: 100_000,
        gas_used: 21_000,
        subtraces: 0,
        error: None,
    }
}

pub fn classified(
    trace: Trace,
    classification: Classification,
    protocol: Option<Protocol>,
    function_name: &str,
    inputs: DecodedParams,
) -> ClassifiedTrace {
    ClassifiedTrace {
        trace,
        classification,
        protocol,
        abi_name: Some("test".to_string()),
        function_name: Some(function_name.to_string()),
        inputs,
    }
}

pub fn native_transfer(
    transaction_hash: B256,
    trace_address: Vec<usize>,
    from: Address,
    to: Address,
    value: U256,
) -> ClassifiedTrace {
    let mut trace = trace(transaction_hash, trace_address, from, to);
    trace.value = value;
    ClassifiedTrace::unknown(trace)
}

/// `token.transfer(to, amount)` called by `from`.
pub fn erc20_transfer(
    transaction_hash: B256,
    trace_address: Vec<usize>,
    token: Address,
    from: Address,
    to: Address,
    amount: U256,
) -> ClassifiedTrace {
    let mut inputs = DecodedParams::new();
    inputs.insert("recipient", to);
    inputs.insert("amount", amount);
    classified(
        trace(transaction_hash, trace_address, from, token),
        Classification::Transfer,
        None,
        "transfer",
        inputs,
    )
}

/// Pair-level `swap` on `pool` sending output to `recipient`.
pub fn pair_swap(
    transaction_hash: B256,
    trace_address: Vec<usize>,
    caller: Address,
    pool: Address,
    recipient: Address,
) -> ClassifiedTrace {
    let mut inputs = DecodedParams::new();
    inputs.insert("to", recipient);
    classified(
        trace(transaction_hash, trace_address, caller, pool),
        Classification::Swap,
        Some(Protocol::UniswapV2),
        "swap",
        inputs,
    )
}

pub fn swap(
    transaction_hash: B256,
    trace_address: Vec<usize>,
    account: Address,
    token_in: Address,
    token_out: Address,
    amount_in: u64,
    amount_out: u64,
) -> Swap {
    Swap {
        block_number: 100,
        transaction_hash,
        trace_address,
        protocol: Some(Protocol::UniswapV2),
        abi_name: "UniswapV2Pair".to_string(),
        pool_address: POOL_1,
        account_address: account,
        recipient_address: account,
        token_in_address: token_in,
        token_out_address: token_out,
        amount_in: U256::from(amount_in),
        amount_out: U256::from(amount_out),
    }
}
