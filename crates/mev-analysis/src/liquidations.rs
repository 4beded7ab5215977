//! Lending-protocol liquidation detection.

use mev_data::{
    Classification, ClassifiedTrace, Liquidation, Protocol, ETH_TOKEN_ADDRESS,
};

use crate::traces::{is_child_of, live_traces, traces_by_transaction};

/// Liquidations in `traces`, ordered by transaction hash then trace address.
///
/// A Compound `seize` nested under a `liquidateBorrow` supplies that
/// liquidation's collateral amount; a `seize` on its own is not reported.
pub fn get_liquidations(traces: &[ClassifiedTrace]) -> Vec<Liquidation> {
    let mut liquidations = Vec::new();

    for tx_traces in traces_by_transaction(live_traces(traces)).values() {
        for trace in tx_traces {
            if trace.classification != Classification::Liquidation {
                continue;
            }
            let liquidation = match trace.protocol {
                Some(Protocol::Aave) => parse_aave_liquidation(trace),
                Some(Protocol::Compound) => parse_compound_liquidation(trace, tx_traces),
                _ => None,
            };
            if let Some(liquidation) = liquidation {
                liquidations.push(liquidation);
            }
        }
    }

    liquidations
}

/// Aave does not expose the seized collateral in calldata.
fn parse_aave_liquidation(trace: &ClassifiedTrace) -> Option<Liquidation> {
    Some(Liquidation {
        block_number: trace.block_number(),
        transaction_hash: trace.transaction_hash()?,
        trace_address: trace.trace_address().to_vec(),
        protocol: Protocol::Aave,
        liquidator_address: trace.trace.from_address,
        borrower_address: trace.inputs.address("user")?,
        collateral_token_address: trace.inputs.address("collateralAsset")?,
        collateral_amount: None,
        debt_token_address: trace.inputs.address("debtAsset")?,
        debt_amount: trace.inputs.uint("debtToCover")?,
    })
}

/// The debt market is the called cToken; cETH repays with call value.
fn parse_compound_liquidation(
    trace: &ClassifiedTrace,
    tx_traces: &[&ClassifiedTrace],
) -> Option<Liquidation> {
    let market = trace.trace.to_address?;
    let collateral_token_address = trace.inputs.address("cTokenCollateral")?;

    let (debt_token_address, debt_amount) = match trace.inputs.uint("repayAmount") {
        Some(repay_amount) => (market, repay_amount),
        None => (ETH_TOKEN_ADDRESS, trace.trace.value),
    };

    let collateral_amount = tx_traces
        .iter()
        .filter(|child| {
            child.classification == Classification::Seize
                && is_child_of(child.trace_address(), trace.trace_address())
                && child.trace.to_address == Some(collateral_token_address)
        })
        .find_map(|child| child.inputs.uint("seizeTokens"));

    Some(Liquidation {
        block_number: trace.block_number(),
        transaction_hash: trace.transaction_hash()?,
        trace_address: trace.trace_address().to_vec(),
        protocol: Protocol::Compound,
        liquidator_address: trace.trace.from_address,
        borrower_address: trace.inputs.address("borrower")?,
        collateral_token_address,
        collateral_amount,
        debt_token_address,
        debt_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use alloy::primitives::{address, Address, U256};
    use mev_data::DecodedParams;

    const CDAI: Address = address!("5d3a536e4d6dbd6114cc1ead35777bab948e3643");
    const CETH: Address = address!("4ddc2d193948926d02f9b1fe9e1daa0718270ed5");
    const AAVE_POOL: Address = address!("7d2768de32b0b80b7a3454c06bdac94a69ddc7a9");

    fn aave_liquidation(path: Vec<usize>) -> ClassifiedTrace {
        let mut inputs = DecodedParams::new();
        inputs.insert("collateralAsset", TOKEN_A);
        inputs.insert("debtAsset", TOKEN_B);
        inputs.insert("user", BOB);
        inputs.insert("debtToCover", U256::from(500));
        inputs.insert("receiveAToken", false);
        classified(
            trace(tx(1), path, ALICE, AAVE_POOL),
            Classification::Liquidation,
            Some(Protocol::Aave),
            "liquidationCall",
            inputs,
        )
    }

    fn compound_liquidation(market: Address, repay: Option<u64>) -> ClassifiedTrace {
        let mut inputs = DecodedParams::new();
        inputs.insert("borrower", BOB);
        inputs.insert("cTokenCollateral", CETH);
        if let Some(repay) = repay {
            inputs.insert("repayAmount", U256::from(repay));
        }
        classified(
            trace(tx(1), vec![0], ALICE, market),
            Classification::Liquidation,
            Some(Protocol::Compound),
            "liquidateBorrow",
            inputs,
        )
    }

    fn seize(path: Vec<usize>, market: Address, tokens: u64) -> ClassifiedTrace {
        let mut inputs = DecodedParams::new();
        inputs.insert("liquidator", ALICE);
        inputs.insert("borrower", BOB);
        inputs.insert("seizeTokens", U256::from(tokens));
        classified(
            trace(tx(1), path, CDAI, market),
            Classification::Seize,
            Some(Protocol::Compound),
            "seize",
            inputs,
        )
    }

    #[test]
    fn aave_liquidation_has_no_collateral_amount() {
        let liquidations = get_liquidations(&[aave_liquidation(vec![0])]);

        assert_eq!(liquidations.len(), 1);
        let liquidation = &liquidations[0];
        assert_eq!(liquidation.protocol, Protocol::Aave);
        assert_eq!(liquidation.liquidator_address, ALICE);
        assert_eq!(liquidation.borrower_address, BOB);
        assert_eq!(liquidation.collateral_token_address, TOKEN_A);
        assert_eq!(liquidation.debt_token_address, TOKEN_B);
        assert_eq!(liquidation.debt_amount, U256::from(500));
        assert_eq!(liquidation.collateral_amount, None);
    }

    #[test]
    fn compound_collateral_comes_from_nested_seize() {
        let traces = vec![
            compound_liquidation(CDAI, Some(1_000)),
            seize(vec![0, 3], CETH, 42),
        ];

        let liquidations = get_liquidations(&traces);
        assert_eq!(liquidations.len(), 1);
        assert_eq!(liquidations[0].debt_token_address, CDAI);
        assert_eq!(liquidations[0].debt_amount, U256::from(1_000));
        assert_eq!(liquidations[0].collateral_amount, Some(U256::from(42)));
    }

    #[test]
    fn ceth_liquidation_repays_with_call_value() {
        let mut liquidation = compound_liquidation(CETH, None);
        liquidation.trace.value = U256::from(77);

        let liquidations = get_liquidations(&[liquidation]);
        assert_eq!(liquidations[0].debt_token_address, ETH_TOKEN_ADDRESS);
        assert_eq!(liquidations[0].debt_amount, U256::from(77));
        assert_eq!(liquidations[0].collateral_amount, None);
    }

    #[test]
    fn standalone_seize_is_not_reported() {
        assert!(get_liquidations(&[seize(vec![4], CETH, 42)]).is_empty());
    }

    #[test]
    fn reverted_liquidation_is_excluded() {
        let mut reverted = aave_liquidation(vec![0]);
        reverted.trace.error = Some("Reverted".to_string());
        assert!(get_liquidations(&[reverted]).is_empty());
    }

    #[test]
    fn missing_parameters_exclude_the_trace() {
        let mut broken = aave_liquidation(vec![0]);
        broken.inputs = DecodedParams::new();
        assert!(get_liquidations(&[broken]).is_empty());
    }
}
