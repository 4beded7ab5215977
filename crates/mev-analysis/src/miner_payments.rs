//! Miner payment accounting.
//!
//! Every transaction pays the miner in up to two ways:
//! - **priority fee**: `gas_used × max(gas_price − base_fee, 0)`
//! - **direct transfer**: ETH sent to the coinbase from inside the transaction
//!
//! The two never overlap. The base fee is burned, and direct transfers are
//! call-trace value, not gas.

use std::collections::HashMap;

use alloy::primitives::{Address, B256, U256};
use eyre::{bail, Result};
use mev_data::{
    ClassifiedTrace, MinerPayment, MinerPaymentKind, Receipt, ETH_TOKEN_ADDRESS,
};

use crate::transfers::get_transfers;

/// Miner payments for every receipt of a block.
///
/// # Arguments
/// * `miner` - Block coinbase
/// * `base_fee_per_gas` - Block base fee in Wei (0 before London)
/// * `traces` - Classified traces of the block
/// * `receipts` - One receipt per transaction
///
/// # Errors
/// Returns error if a receipt reports zero gas used. Such a receipt is
/// malformed and the block must not be written.
pub fn get_miner_payments(
    miner: Address,
    base_fee_per_gas: u128,
    traces: &[ClassifiedTrace],
    receipts: &[Receipt],
) -> Result<Vec<MinerPayment>> {
    let direct_transfers = direct_transfers_to(miner, traces);
    let mut payments = Vec::new();

    for receipt in receipts {
        if receipt.gas_used == 0 {
            bail!(
                "receipt for transaction {} in block {} reports zero gas used",
                receipt.transaction_hash,
                receipt.block_number
            );
        }

        let gas_used = U256::from(receipt.gas_used);
        let gas_price = receipt.effective_gas_price;
        let priority_fee =
            gas_used * U256::from(gas_price.saturating_sub(base_fee_per_gas));
        let direct = direct_transfers
            .get(&receipt.transaction_hash)
            .copied()
            .unwrap_or(U256::ZERO);
        let gas_price_with_coinbase_transfer =
            (direct + gas_used * U256::from(gas_price)) / gas_used;

        let payment = |kind: MinerPaymentKind, amount: U256| MinerPayment {
            block_number: receipt.block_number,
            transaction_hash: receipt.transaction_hash,
            transaction_index: receipt.transaction_index,
            recipient_address: miner,
            kind,
            amount,
            transaction_from_address: receipt.from_address,
            transaction_to_address: receipt.to_address,
            gas_used: receipt.gas_used,
            gas_price,
            base_fee_per_gas,
            gas_price_with_coinbase_transfer,
        };

        if !priority_fee.is_zero() {
            payments.push(payment(MinerPaymentKind::PriorityFee, priority_fee));
        }
        if !direct.is_zero() {
            payments.push(payment(MinerPaymentKind::DirectTransfer, direct));
        }
    }

    Ok(payments)
}

/// Sum of native transfers to `miner`, per transaction.
fn direct_transfers_to(miner: Address, traces: &[ClassifiedTrace]) -> HashMap<B256, U256> {
    let mut totals: HashMap<B256, U256> = HashMap::new();
    for transfer in get_transfers(traces) {
        if transfer.to_address == miner && transfer.token_address == ETH_TOKEN_ADDRESS {
            let total = totals.entry(transfer.transaction_hash).or_default();
            *total = total.saturating_add(transfer.amount);
        }
    }
    totals
}
