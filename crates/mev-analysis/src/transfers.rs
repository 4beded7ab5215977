//! Transfer derivation from call traces.
//!
//! Only call-trace transfers are modeled: native value moved by a plain call,
//! and ERC20 `transfer`/`transferFrom` calls. Transfers reported through
//! event logs alone are not seen.

use alloy::primitives::Address;
use mev_data::{CallKind, Classification, ClassifiedTrace, Transfer, ETH_TOKEN_ADDRESS};

use crate::traces::{is_child_of, live_traces};

/// Every transfer in `traces`, in input order.
///
/// Traces inside a reverted frame are skipped.
pub fn get_transfers(traces: &[ClassifiedTrace]) -> Vec<Transfer> {
    live_traces(traces)
        .into_iter()
        .filter_map(get_transfer)
        .collect()
}

/// The transfer a single trace performs, if any.
///
/// A trace that reverted itself moves nothing. Reverted ancestors are not
/// visible here; see [`get_transfers`].
pub fn get_transfer(trace: &ClassifiedTrace) -> Option<Transfer> {
    if trace.trace.is_reverted() {
        return None;
    }
    get_eth_transfer(trace).or_else(|| get_erc20_transfer(trace))
}

/// Native value sent by a plain call.
pub fn get_eth_transfer(trace: &ClassifiedTrace) -> Option<Transfer> {
    let raw = &trace.trace;
    if raw.call_kind != CallKind::Call || raw.value.is_zero() || raw.is_reverted() {
        return None;
    }

    Some(Transfer {
        block_number: raw.block_number,
        transaction_hash: raw.transaction_hash?,
        trace_address: raw.trace_address.clone(),
        from_address: raw.from_address,
        to_address: raw.to_address?,
        amount: raw.value,
        token_address: ETH_TOKEN_ADDRESS,
    })
}

fn get_erc20_transfer(trace: &ClassifiedTrace) -> Option<Transfer> {
    if trace.classification != Classification::Transfer {
        return None;
    }
    let raw = &trace.trace;

    let from_address = match trace.function_name.as_deref() {
        Some("transferFrom") => trace.inputs.address("sender")?,
        _ => raw.from_address,
    };

    Some(Transfer {
        block_number: raw.block_number,
        transaction_hash: raw.transaction_hash?,
        trace_address: raw.trace_address.clone(),
        from_address,
        to_address: trace.inputs.address("recipient")?,
        amount: trace.inputs.uint("amount")?,
        token_address: raw.to_address?,
    })
}

/// Transfers matching the given endpoints; `None` matches any address.
pub fn filter_transfers<'a>(
    transfers: &'a [Transfer],
    to_address: Option<Address>,
    from_address: Option<Address>,
) -> Vec<&'a Transfer> {
    transfers
        .iter()
        .filter(|t| to_address.map_or(true, |to| t.to_address == to))
        .filter(|t| from_address.map_or(true, |from| t.from_address == from))
        .collect()
}

/// Drops transfers made from inside another transfer's call.
///
/// Proxy tokens forward `transfer` to an implementation contract, which
/// would otherwise count the same movement twice.
pub fn remove_child_transfers_of_transfers(transfers: &[Transfer]) -> Vec<Transfer> {
    transfers
        .iter()
        .filter(|transfer| {
            !transfers.iter().any(|parent| {
                parent.transaction_hash == transfer.transaction_hash
                    && is_child_of(&transfer.trace_address, &parent.trace_address)
            })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use alloy::primitives::U256;
    use mev_data::DecodedParams;

    #[test]
    fn native_call_with_value_is_eth_transfer() {
        let traces = vec![native_transfer(tx(1), vec![0], ALICE, BOB, U256::from(5))];

        let transfers = get_transfers(&traces);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].token_address, ETH_TOKEN_ADDRESS);
        assert_eq!(transfers[0].amount, U256::from(5));
        assert_eq!(transfers[0].to_address, BOB);
    }

    #[test]
    fn zero_value_and_delegate_calls_are_not_transfers() {
        let zero = native_transfer(tx(1), vec![0], ALICE, BOB, U256::ZERO);
        let mut delegate = native_transfer(tx(1), vec![1], ALICE, BOB, U256::from(5));
        delegate.trace.call_kind = CallKind::DelegateCall;

        assert!(get_transfers(&[zero, delegate]).is_empty());
    }

    #[test]
    fn reverted_traces_are_excluded() {
        let mut reverted = erc20_transfer(tx(1), vec![0], TOKEN_A, ALICE, BOB, U256::from(9));
        reverted.trace.error = Some("Reverted".to_string());

        assert!(get_transfer(&reverted).is_none());
    }

    #[test]
    fn transfers_under_a_reverted_call_are_excluded() {
        let mut router = native_transfer(tx(1), vec![0], ALICE, POOL_1, U256::ZERO);
        router.trace.error = Some("Reverted".to_string());
        let traces = vec![
            router,
            erc20_transfer(tx(1), vec![0, 0], TOKEN_A, POOL_1, BOB, U256::from(9)),
            native_transfer(tx(1), vec![0, 1, 0], POOL_1, BOB, U256::from(2)),
            erc20_transfer(tx(1), vec![1], TOKEN_B, ALICE, BOB, U256::from(4)),
        ];

        let transfers = get_transfers(&traces);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].trace_address, vec![1]);
        assert_eq!(transfers[0].token_address, TOKEN_B);
    }

    #[test]
    fn erc20_transfer_uses_callee_as_token() {
        let trace = erc20_transfer(tx(1), vec![0], TOKEN_A, ALICE, BOB, U256::from(9));

        let transfer = get_transfer(&trace).expect("erc20 transfer should derive");
        assert_eq!(transfer.token_address, TOKEN_A);
        assert_eq!(transfer.from_address, ALICE);
        assert_eq!(transfer.to_address, BOB);
    }

    #[test]
    fn transfer_from_uses_decoded_sender() {
        let mut inputs = DecodedParams::new();
        inputs.insert("sender", BOB);
        inputs.insert("recipient", POOL_1);
        inputs.insert("amount", U256::from(3));
        let trace = classified(
            trace(tx(1), vec![0], ALICE, TOKEN_A),
            Classification::Transfer,
            None,
            "transferFrom",
            inputs,
        );

        let transfer = get_transfer(&trace).expect("transferFrom should derive");
        assert_eq!(transfer.from_address, BOB);
        assert_eq!(transfer.to_address, POOL_1);
    }

    #[test]
    fn nested_proxy_transfers_are_removed() {
        let outer = erc20_transfer(tx(1), vec![0], TOKEN_A, ALICE, BOB, U256::from(9));
        let inner = erc20_transfer(tx(1), vec![0, 0], TOKEN_B, TOKEN_A, BOB, U256::from(9));
        let sibling = erc20_transfer(tx(1), vec![1], TOKEN_A, BOB, ALICE, U256::from(1));
        let transfers = get_transfers(&[outer, inner, sibling]);

        let kept = remove_child_transfers_of_transfers(&transfers);
        let paths: Vec<Vec<usize>> = kept.iter().map(|t| t.trace_address.clone()).collect();
        assert_eq!(paths, vec![vec![0], vec![1]]);
    }

    #[test]
    fn filter_matches_both_endpoints() {
        let transfers = get_transfers(&[
            erc20_transfer(tx(1), vec![0], TOKEN_A, ALICE, POOL_1, U256::from(1)),
            erc20_transfer(tx(1), vec![1], TOKEN_B, POOL_1, ALICE, U256::from(2)),
            erc20_transfer(tx(1), vec![2], TOKEN_B, POOL_1, BOB, U256::from(3)),
        ]);

        assert_eq!(filter_transfers(&transfers, Some(POOL_1), None).len(), 1);
        let out = filter_transfers(&transfers, Some(ALICE), Some(POOL_1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount, U256::from(2));
    }
}
