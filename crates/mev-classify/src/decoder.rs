//! Call decoders built from compile-time ABI definitions.
//!
//! Every recognized function is declared with `alloy::sol!` so its selector
//! is computed at compile time. Each `decode_*` function takes full calldata
//! (selector included) and projects the typed call into [`DecodedParams`]
//! keyed by the ABI argument names.

use alloy::sol_types::SolCall;
use eyre::{Context, Result};
use mev_data::DecodedParams;

/// Ethereum mainnet contract addresses.
pub mod addresses {
    use alloy::primitives::{address, Address};

    /// Aave V1 LendingPool
    pub const AAVE_V1_LENDING_POOL: Address = address!("398ec7346dcd622edc5ae82352f02be94c62d119");

    /// Aave V2 LendingPool
    pub const AAVE_V2_LENDING_POOL: Address = address!("7d2768de32b0b80b7a3454c06bdac94a69ddc7a9");

    /// Compound cETH (liquidated with native value)
    pub const COMPOUND_CETH: Address = address!("4ddc2d193948926d02f9b1fe9e1daa0718270ed5");

    /// Compound cDAI
    pub const COMPOUND_CDAI: Address = address!("5d3a536e4d6dbd6114cc1ead35777bab948e3643");

    /// Compound cUSDC
    pub const COMPOUND_CUSDC: Address = address!("39aa39c021dfcae8fac545936693ac917d5e7563");

    /// Compound cUSDT
    pub const COMPOUND_CUSDT: Address = address!("f650c3d88d12db855b8bf7d11be6c55a4e07dcc9");

    /// Compound cWBTC2
    pub const COMPOUND_CWBTC2: Address = address!("ccf4429db6322d5c611ee964527d42e5d685dd6a");

    /// CryptoPunks market
    pub const CRYPTOPUNKS_MARKET: Address = address!("b47e3cd837ddf8e4c57f05d70ab865de6e193bbb");

    pub const AAVE_LENDING_POOLS: &[Address] = &[AAVE_V1_LENDING_POOL, AAVE_V2_LENDING_POOL];

    pub const COMPOUND_CTOKENS: &[Address] = &[
        COMPOUND_CDAI,
        COMPOUND_CUSDC,
        COMPOUND_CUSDT,
        COMPOUND_CWBTC2,
    ];

    /// Every cToken, including cETH; `seize` is called on the collateral market.
    pub const COMPOUND_MARKETS: &[Address] = &[
        COMPOUND_CETH,
        COMPOUND_CDAI,
        COMPOUND_CUSDC,
        COMPOUND_CUSDT,
        COMPOUND_CWBTC2,
    ];

    pub const COMPOUND_CETH_MARKET: &[Address] = &[COMPOUND_CETH];

    pub const CRYPTOPUNKS_MARKETS: &[Address] = &[CRYPTOPUNKS_MARKET];
}

pub mod erc20 {
    use alloy::sol;

    sol! {
        interface ERC20 {
            function transfer(address recipient, uint256 amount) external returns (bool);
            function transferFrom(address sender, address recipient, uint256 amount) external returns (bool);
        }
    }
}

/// Pair-level swap shared by Uniswap V2 and its forks.
pub mod uniswap_v2 {
    use alloy::sol;

    sol! {
        interface UniswapV2Pair {
            function swap(uint256 amount0Out, uint256 amount1Out, address to, bytes data) external;
        }
    }
}

pub mod uniswap_v3 {
    use alloy::sol;

    sol! {
        interface UniswapV3Pool {
            function swap(
                address recipient,
                bool zeroForOne,
                int256 amountSpecified,
                uint160 sqrtPriceLimitX96,
                bytes data
            ) external returns (int256 amount0, int256 amount1);
        }
    }
}

pub mod aave {
    use alloy::sol;

    // V1 and V2 share the selector; argument names follow V2.
    sol! {
        interface LendingPool {
            function liquidationCall(
                address collateralAsset,
                address debtAsset,
                address user,
                uint256 debtToCover,
                bool receiveAToken
            ) external;
        }
    }
}

pub mod compound {
    use alloy::sol;

    sol! {
        interface CErc20 {
            function liquidateBorrow(address borrower, uint256 repayAmount, address cTokenCollateral) external returns (uint256);
            function seize(address liquidator, address borrower, uint256 seizeTokens) external returns (uint256);
        }
    }

    sol! {
        interface CEther {
            function liquidateBorrow(address borrower, address cTokenCollateral) external payable;
        }
    }
}

pub mod cryptopunks {
    use alloy::sol;

    sol! {
        interface CryptoPunksMarket {
            function enterBidForPunk(uint256 punkIndex) external payable;
            function acceptBidForPunk(uint256 punkIndex, uint256 minPrice) external;
        }
    }
}

fn decode_call<C: SolCall>(input: &[u8]) -> Result<C> {
    C::abi_decode(input, true).wrap_err_with(|| format!("failed to decode {}", C::SIGNATURE))
}

pub fn decode_erc20_transfer(input: &[u8]) -> Result<DecodedParams> {
    let call: erc20::ERC20::transferCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("recipient", call.recipient);
    params.insert("amount", call.amount);
    Ok(params)
}

pub fn decode_erc20_transfer_from(input: &[u8]) -> Result<DecodedParams> {
    let call: erc20::ERC20::transferFromCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("sender", call.sender);
    params.insert("recipient", call.recipient);
    params.insert("amount", call.amount);
    Ok(params)
}

pub fn decode_uniswap_v2_swap(input: &[u8]) -> Result<DecodedParams> {
    let call: uniswap_v2::UniswapV2Pair::swapCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("amount0Out", call.amount0Out);
    params.insert("amount1Out", call.amount1Out);
    params.insert("to", call.to);
    params.insert("data", call.data);
    Ok(params)
}

/// `sqrtPriceLimitX96` is not kept; nothing downstream reads it.
pub fn decode_uniswap_v3_swap(input: &[u8]) -> Result<DecodedParams> {
    let call: uniswap_v3::UniswapV3Pool::swapCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("recipient", call.recipient);
    params.insert("zeroForOne", call.zeroForOne);
    params.insert("amountSpecified", call.amountSpecified);
    params.insert("data", call.data);
    Ok(params)
}

pub fn decode_aave_liquidation_call(input: &[u8]) -> Result<DecodedParams> {
    let call: aave::LendingPool::liquidationCallCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("collateralAsset", call.collateralAsset);
    params.insert("debtAsset", call.debtAsset);
    params.insert("user", call.user);
    params.insert("debtToCover", call.debtToCover);
    params.insert("receiveAToken", call.receiveAToken);
    Ok(params)
}

pub fn decode_compound_liquidate_borrow(input: &[u8]) -> Result<DecodedParams> {
    let call: compound::CErc20::liquidateBorrowCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("borrower", call.borrower);
    params.insert("repayAmount", call.repayAmount);
    params.insert("cTokenCollateral", call.cTokenCollateral);
    Ok(params)
}

/// The repaid amount of a cETH liquidation is the call value, not an argument.
pub fn decode_compound_liquidate_borrow_eth(input: &[u8]) -> Result<DecodedParams> {
    let call: compound::CEther::liquidateBorrowCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("borrower", call.borrower);
    params.insert("cTokenCollateral", call.cTokenCollateral);
    Ok(params)
}

pub fn decode_compound_seize(input: &[u8]) -> Result<DecodedParams> {
    let call: compound::CErc20::seizeCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("liquidator", call.liquidator);
    params.insert("borrower", call.borrower);
    params.insert("seizeTokens", call.seizeTokens);
    Ok(params)
}

pub fn decode_punk_bid(input: &[u8]) -> Result<DecodedParams> {
    let call: cryptopunks::CryptoPunksMarket::enterBidForPunkCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("punkIndex", call.punkIndex);
    Ok(params)
}

pub fn decode_punk_accept_bid(input: &[u8]) -> Result<DecodedParams> {
    let call: cryptopunks::CryptoPunksMarket::acceptBidForPunkCall = decode_call(input)?;
    let mut params = DecodedParams::new();
    params.insert("punkIndex", call.punkIndex);
    params.insert("minPrice", call.minPrice);
    Ok(params)
}
