//! Classifier spec registry.
//!
//! A spec pairs an address matcher and a four-byte selector with the decoder
//! and action kind to assign. The registry is scanned in order and the first
//! matching spec wins, so more specific specs (forks resolved through the
//! deployed-contract cache, known singletons) sit ahead of catch-all ones.

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use eyre::Result;
use mev_data::{Classification, DecodedParams, Protocol};

use crate::cache::DeployedContracts;
use crate::decoder::{self, addresses};

/// Which call destinations a spec applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMatcher {
    /// Selector alone decides.
    Any,
    /// Known singleton contracts.
    Exact(&'static [Address]),
    /// Contracts the deployed-contract cache attributes to a protocol.
    DeployedBy(Protocol),
}

impl AddressMatcher {
    pub fn matches(&self, to: Address, deployed: &DeployedContracts) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(known) => known.contains(&to),
            Self::DeployedBy(protocol) => deployed.protocol_of(&to) == Some(*protocol),
        }
    }
}

/// One recognizable protocol function.
#[derive(Clone, Copy, Debug)]
pub struct ClassifierSpec {
    /// Protocol tag; `None` for plain token standards.
    pub protocol: Option<Protocol>,
    pub abi_name: &'static str,
    pub function_name: &'static str,
    pub selector: [u8; 4],
    pub address: AddressMatcher,
    pub classification: Classification,
    /// Decodes full calldata into named arguments.
    pub decode: fn(&[u8]) -> Result<DecodedParams>,
}

impl ClassifierSpec {
    pub fn matches(&self, to: Address, selector: [u8; 4], deployed: &DeployedContracts) -> bool {
        self.selector == selector && self.address.matches(to, deployed)
    }
}

/// Mainnet registry in priority order.
pub fn default_specs() -> Vec<ClassifierSpec> {
    vec![
        ClassifierSpec {
            protocol: Some(Protocol::Sushiswap),
            abi_name: "UniswapV2Pair",
            function_name: "swap",
            selector: decoder::uniswap_v2::UniswapV2Pair::swapCall::SELECTOR,
            address: AddressMatcher::DeployedBy(Protocol::Sushiswap),
            classification: Classification::Swap,
            decode: decoder::decode_uniswap_v2_swap,
        },
        ClassifierSpec {
            protocol: Some(Protocol::UniswapV2),
            abi_name: "UniswapV2Pair",
            function_name: "swap",
            selector: decoder::uniswap_v2::UniswapV2Pair::swapCall::SELECTOR,
            address: AddressMatcher::Any,
            classification: Classification::Swap,
            decode: decoder::decode_uniswap_v2_swap,
        },
        ClassifierSpec {
            protocol: Some(Protocol::UniswapV3),
            abi_name: "UniswapV3Pool",
            function_name: "swap",
            selector: decoder::uniswap_v3::UniswapV3Pool::swapCall::SELECTOR,
            address: AddressMatcher::Any,
            classification: Classification::Swap,
            decode: decoder::decode_uniswap_v3_swap,
        },
        ClassifierSpec {
            protocol: Some(Protocol::Aave),
            abi_name: "LendingPool",
            function_name: "liquidationCall",
            selector: decoder::aave::LendingPool::liquidationCallCall::SELECTOR,
            address: AddressMatcher::Exact(addresses::AAVE_LENDING_POOLS),
            classification: Classification::Liquidation,
            decode: decoder::decode_aave_liquidation_call,
        },
        ClassifierSpec {
            protocol: Some(Protocol::Compound),
            abi_name: "CErc20",
            function_name: "liquidateBorrow",
            selector: decoder::compound::CErc20::liquidateBorrowCall::SELECTOR,
            address: AddressMatcher::Exact(addresses::COMPOUND_CTOKENS),
            classification: Classification::Liquidation,
            decode: decoder::decode_compound_liquidate_borrow,
        },
        ClassifierSpec {
            protocol: Some(Protocol::Compound),
            abi_name: "CEther",
            function_name: "liquidateBorrow",
            selector: decoder::compound::CEther::liquidateBorrowCall::SELECTOR,
            address: AddressMatcher::Exact(addresses::COMPOUND_CETH_MARKET),
            classification: Classification::Liquidation,
            decode: decoder::decode_compound_liquidate_borrow_eth,
        },
        ClassifierSpec {
            protocol: Some(Protocol::Compound),
            abi_name: "CErc20",
            function_name: "seize",
            selector: decoder::compound::CErc20::seizeCall::SELECTOR,
            address: AddressMatcher::Exact(addresses::COMPOUND_MARKETS),
            classification: Classification::Seize,
            decode: decoder::decode_compound_seize,
        },
        ClassifierSpec {
            protocol: Some(Protocol::Cryptopunks),
            abi_name: "CryptoPunksMarket",
            function_name: "enterBidForPunk",
            selector: decoder::cryptopunks::CryptoPunksMarket::enterBidForPunkCall::SELECTOR,
            address: AddressMatcher::Exact(addresses::CRYPTOPUNKS_MARKETS),
            classification: Classification::PunkBid,
            decode: decoder::decode_punk_bid,
        },
        ClassifierSpec {
            protocol: Some(Protocol::Cryptopunks),
            abi_name: "CryptoPunksMarket",
            function_name: "acceptBidForPunk",
            selector: decoder::cryptopunks::CryptoPunksMarket::acceptBidForPunkCall::SELECTOR,
            address: AddressMatcher::Exact(addresses::CRYPTOPUNKS_MARKETS),
            classification: Classification::PunkAccept,
            decode: decoder::decode_punk_accept_bid,
        },
        ClassifierSpec {
            protocol: None,
            abi_name: "ERC20",
            function_name: "transfer",
            selector: decoder::erc20::ERC20::transferCall::SELECTOR,
            address: AddressMatcher::Any,
            classification: Classification::Transfer,
            decode: decoder::decode_erc20_transfer,
        },
        ClassifierSpec {
            protocol: None,
            abi_name: "ERC20",
            function_name: "transferFrom",
            selector: decoder::erc20::ERC20::transferFromCall::SELECTOR,
            address: AddressMatcher::Any,
            classification: Classification::Transfer,
            decode: decoder::decode_erc20_transfer_from,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn forked_pairs_are_checked_before_catch_all_pairs() {
        let specs = default_specs();
        let sushi = specs
            .iter()
            .position(|spec| spec.protocol == Some(Protocol::Sushiswap))
            .expect("sushiswap spec should exist");
        let uniswap = specs
            .iter()
            .position(|spec| spec.protocol == Some(Protocol::UniswapV2))
            .expect("uniswap v2 spec should exist");
        assert!(sushi < uniswap);
        assert_eq!(specs[sushi].selector, specs[uniswap].selector);
    }

    #[test]
    fn exact_matcher_only_accepts_listed_contracts() {
        let deployed = DeployedContracts::new();
        let matcher = AddressMatcher::Exact(addresses::CRYPTOPUNKS_MARKETS);
        assert!(matcher.matches(addresses::CRYPTOPUNKS_MARKET, &deployed));
        assert!(!matcher.matches(address!("1111111111111111111111111111111111111111"), &deployed));
    }

    #[test]
    fn deployed_by_matcher_consults_cache() {
        let pool = address!("397ff1542f962076d0bfe58ea045ffa2d347aca0");
        let deployed = DeployedContracts::new();
        let matcher = AddressMatcher::DeployedBy(Protocol::Sushiswap);
        assert!(!matcher.matches(pool, &deployed));

        deployed.insert(pool, Protocol::Sushiswap);
        assert!(matcher.matches(pool, &deployed));
    }
}
