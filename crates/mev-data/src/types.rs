//! Type definitions for block data, classified traces and derived MEV events.

use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::{address, Address, Bytes, B256, I256, U256};
use serde::{Deserialize, Serialize};

/// Sentinel token address used for native ETH transfers.
pub const ETH_TOKEN_ADDRESS: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// Kind of call-tree node reported by the tracer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Call,
    DelegateCall,
    StaticCall,
    CallCode,
    Create,
    SelfDestruct,
    Reward,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::DelegateCall => "delegate_call",
            Self::StaticCall => "static_call",
            Self::CallCode => "call_code",
            Self::Create => "create",
            Self::SelfDestruct => "self_destruct",
            Self::Reward => "reward",
        }
    }

    /// Whether this node executes code at `to` with calldata.
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            Self::Call | Self::DelegateCall | Self::StaticCall | Self::CallCode
        )
    }
}

/// One call-tree node of a transaction.
///
/// Traces for a block are kept as a flat list; the tree position lives in
/// `trace_address`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Block number.
    pub block_number: u64,
    /// Transaction hash (None for block rewards).
    pub transaction_hash: Option<B256>,
    /// Transaction index in block.
    pub transaction_position: Option<u64>,
    /// Path of this node in the transaction's call tree.
    pub trace_address: Vec<usize>,
    /// Node kind.
    pub call_kind: CallKind,
    /// Caller.
    pub from_address: Address,
    /// Callee (None for failed creates and rewards).
    pub to_address: Option<Address>,
    /// Calldata (or init code for creates).
    pub input: Bytes,
    /// Return data.
    pub output: Bytes,
    /// Wei sent with the call.
    pub value: U256,
    /// Gas provided to the call.
    pub gas: u64,
    /// Gas consumed by the call.
    pub gas_used: u64,
    /// Number of direct children.
    pub subtraces: usize,
    /// Revert reason, if the call failed.
    pub error: Option<String>,
}

impl Trace {
    /// First four bytes of calldata.
    pub fn selector(&self) -> Option<[u8; 4]> {
        let bytes = self.input.get(..4)?;
        let mut selector = [0u8; 4];
        selector.copy_from_slice(bytes);
        Some(selector)
    }

    pub fn is_reverted(&self) -> bool {
        self.error.is_some()
    }
}

/// Transaction receipt fields needed for fee accounting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Block number.
    pub block_number: u64,
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Transaction index in block.
    pub transaction_index: u64,
    /// Sender address.
    pub from_address: Address,
    /// Recipient address (None for contract creation).
    pub to_address: Option<Address>,
    /// Gas used.
    pub gas_used: u64,
    /// Effective gas price in Wei.
    pub effective_gas_price: u128,
    /// Execution status (true = success).
    pub status: bool,
}

/// Header fields of one block height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number.
    pub block_number: u64,
    /// Block hash.
    pub block_hash: B256,
    /// Miner/coinbase address.
    pub miner: Address,
    /// Base fee per gas in Wei (0 before London).
    pub base_fee_per_gas: u128,
    /// Timestamp in unix seconds.
    pub timestamp: u64,
}

/// Immutable snapshot of one block with its traces and receipts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block number.
    pub block_number: u64,
    /// Block hash.
    pub block_hash: B256,
    /// Miner/coinbase address.
    pub miner: Address,
    /// Base fee per gas in Wei.
    pub base_fee_per_gas: u128,
    /// Timestamp in unix seconds.
    pub timestamp: u64,
    /// All traces in discovery order.
    pub traces: Vec<Trace>,
    /// One receipt per transaction.
    pub receipts: Vec<Receipt>,
}

impl Block {
    pub fn from_parts(header: BlockHeader, traces: Vec<Trace>, receipts: Vec<Receipt>) -> Self {
        Self {
            block_number: header.block_number,
            block_hash: header.block_hash,
            miner: header.miner,
            base_fee_per_gas: header.base_fee_per_gas,
            timestamp: header.timestamp,
            traces,
            receipts,
        }
    }

    /// Number of distinct transactions touched by traces.
    pub fn transaction_count(&self) -> usize {
        let mut hashes: Vec<&B256> = self
            .traces
            .iter()
            .filter_map(|trace| trace.transaction_hash.as_ref())
            .collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes.len()
    }
}

/// Protocol a classified trace belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    UniswapV2,
    UniswapV3,
    Sushiswap,
    Aave,
    Compound,
    Cryptopunks,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UniswapV2 => "uniswap_v2",
            Self::UniswapV3 => "uniswap_v3",
            Self::Sushiswap => "sushiswap",
            Self::Aave => "aave",
            Self::Compound => "compound",
            Self::Cryptopunks => "cryptopunks",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action kind assigned by the classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Transfer,
    Swap,
    Liquidation,
    Seize,
    PunkBid,
    PunkAccept,
    Unknown,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Swap => "swap",
            Self::Liquidation => "liquidation",
            Self::Seize => "seize",
            Self::PunkBid => "punk_bid",
            Self::PunkAccept => "punk_accept",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decoded ABI argument.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    Bytes(Bytes),
}

impl From<Address> for ParamValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<U256> for ParamValue {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<I256> for ParamValue {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Bytes> for ParamValue {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

/// Decoded call arguments keyed by ABI parameter name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecodedParams(BTreeMap<String, ParamValue>);

impl DecodedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn address(&self, name: &str) -> Option<Address> {
        match self.0.get(name)? {
            ParamValue::Address(value) => Some(*value),
            _ => None,
        }
    }

    pub fn uint(&self, name: &str) -> Option<U256> {
        match self.0.get(name)? {
            ParamValue::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for DecodedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// A trace tagged with the protocol action it performs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTrace {
    /// The raw trace.
    pub trace: Trace,
    /// Action kind.
    pub classification: Classification,
    /// Protocol of the matched spec (None for plain ERC20 or unmatched traces).
    pub protocol: Option<Protocol>,
    /// ABI the matched spec belongs to.
    pub abi_name: Option<String>,
    /// Function name of the matched spec.
    pub function_name: Option<String>,
    /// Decoded arguments; empty when unmatched or undecodable.
    pub inputs: DecodedParams,
}

impl ClassifiedTrace {
    pub fn unknown(trace: Trace) -> Self {
        Self {
            trace,
            classification: Classification::Unknown,
            protocol: None,
            abi_name: None,
            function_name: None,
            inputs: DecodedParams::new(),
        }
    }

    pub fn block_number(&self) -> u64 {
        self.trace.block_number
    }

    pub fn transaction_hash(&self) -> Option<B256> {
        self.trace.transaction_hash
    }

    pub fn trace_address(&self) -> &[usize] {
        &self.trace.trace_address
    }
}

/// Value moved between two addresses by one call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub trace_address: Vec<usize>,
    pub from_address: Address,
    pub to_address: Address,
    pub amount: U256,
    /// Token contract, or [`ETH_TOKEN_ADDRESS`] for native transfers.
    pub token_address: Address,
}

/// One pool-level exchange of `token_in` for `token_out`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub trace_address: Vec<usize>,
    pub protocol: Option<Protocol>,
    pub abi_name: String,
    pub pool_address: Address,
    /// Caller of the pool.
    pub account_address: Address,
    /// Receiver of `token_out`.
    pub recipient_address: Address,
    pub token_in_address: Address,
    pub token_out_address: Address,
    pub amount_in: U256,
    pub amount_out: U256,
}

/// Closed, profitable token cycle executed by one account in one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arbitrage {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub account_address: Address,
    pub profit_token_address: Address,
    pub start_amount: U256,
    pub end_amount: U256,
    /// Always `end_amount - start_amount` and strictly positive.
    pub profit_amount: U256,
    /// Constituent swaps in trace order.
    pub swaps: Vec<Swap>,
}

/// A lending-protocol liquidation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidation {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub trace_address: Vec<usize>,
    pub protocol: Protocol,
    pub liquidator_address: Address,
    pub borrower_address: Address,
    pub collateral_token_address: Address,
    /// Known only when the protocol reveals it in the liquidation's subtree.
    pub collateral_amount: Option<U256>,
    pub debt_token_address: Address,
    pub debt_amount: U256,
}

/// A CryptoPunks bid placed via `enterBidForPunk`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunkBid {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub trace_address: Vec<usize>,
    pub bidder_address: Address,
    pub punk_index: U256,
    pub price: U256,
}

/// A CryptoPunks bid acceptance via `acceptBidForPunk`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunkBidAcceptance {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub trace_address: Vec<usize>,
    pub accepter_address: Address,
    pub punk_index: U256,
    pub min_price: U256,
}

/// A bid accepted in the same transaction by an account other than the bidder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunkSnipe {
    pub block_number: u64,
    pub transaction_hash: B256,
    /// Trace address of the accepting call.
    pub trace_address: Vec<usize>,
    /// Trace address of the matched bid.
    pub bid_trace_address: Vec<usize>,
    pub bidder_address: Address,
    pub accepter_address: Address,
    pub punk_index: U256,
    pub min_acceptance_price: U256,
    pub acceptance_price: U256,
}

/// How value reached the block miner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinerPaymentKind {
    /// Gas price above the base fee.
    PriorityFee,
    /// ETH sent to the coinbase from inside the transaction.
    DirectTransfer,
}

impl MinerPaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriorityFee => "priority_fee",
            Self::DirectTransfer => "direct_transfer",
        }
    }
}

/// One component of what a transaction paid the miner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerPayment {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub transaction_index: u64,
    pub recipient_address: Address,
    pub kind: MinerPaymentKind,
    pub amount: U256,
    pub transaction_from_address: Address,
    pub transaction_to_address: Option<Address>,
    pub gas_used: u64,
    pub gas_price: u128,
    pub base_fee_per_gas: u128,
    pub gas_price_with_coinbase_transfer: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_with_input(input: &'static [u8]) -> Trace {
        Trace {
            block_number: 1,
            transaction_hash: Some(B256::ZERO),
            transaction_position: Some(0),
            trace_address: vec![],
            call_kind: CallKind::Call,
            from_address: Address::ZERO,
            to_address: Some(Address::ZERO),
            input: Bytes::from_static(input),
            output: Bytes::new(),
            value: U256::ZERO,
            gas: 0,
            gas_used: 0,
            subtraces: 0,
            error: None,
        }
    }

    #[test]
    fn selector_requires_four_bytes() {
        assert_eq!(
            trace_with_input(&[0xa9, 0x05, 0x9c, 0xbb, 0x00]).selector(),
            Some([0xa9, 0x05, 0x9c, 0xbb])
        );
        assert_eq!(trace_with_input(&[0xa9, 0x05]).selector(), None);
    }

    #[test]
    fn decoded_params_typed_accessors() {
        let params: DecodedParams = [
            ("to", ParamValue::Address(ETH_TOKEN_ADDRESS)),
            ("amount", ParamValue::Uint(U256::from(7))),
        ]
        .into_iter()
        .collect();

        assert_eq!(params.address("to"), Some(ETH_TOKEN_ADDRESS));
        assert_eq!(params.uint("amount"), Some(U256::from(7)));
        assert_eq!(params.uint("to"), None);
        assert_eq!(params.address("missing"), None);
    }

    #[test]
    fn classification_serializes_snake_case() {
        let json = serde_json::to_string(&Classification::PunkAccept).expect("serializes");
        assert_eq!(json, "\"punk_accept\"");
        assert_eq!(Classification::PunkAccept.as_str(), "punk_accept");
    }
}
