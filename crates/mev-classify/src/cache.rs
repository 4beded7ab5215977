//! Cache of factory-deployed contracts.
//!
//! Forked AMMs deploy pairs with identical bytecode and selectors, so the
//! pair address is the only thing telling a SushiSwap pool from a Uniswap
//! one. The cache maps those addresses to their protocol. It is shared by
//! every concurrent block worker and only read during classification.

use std::collections::HashMap;
use std::path::Path;

use alloy::primitives::Address;
use dashmap::DashMap;
use eyre::{Context, Result};
use mev_data::Protocol;

#[derive(Debug, Default)]
pub struct DeployedContracts {
    contracts: DashMap<Address, Protocol>,
}

impl DeployedContracts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object of `{"0xaddress": "protocol"}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: HashMap<Address, Protocol> =
            serde_json::from_str(json).wrap_err("invalid deployed contracts JSON")?;
        let cache = Self::new();
        for (address, protocol) in entries {
            cache.insert(address, protocol);
        }
        Ok(cache)
    }

    /// Loads a JSON file written in the [`Self::from_json_str`] format.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid mapping.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let cache = Self::from_json_str(&json)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            contracts = cache.len(),
            "loaded deployed contracts"
        );
        Ok(cache)
    }

    pub fn insert(&self, address: Address, protocol: Protocol) {
        self.contracts.insert(address, protocol);
    }

    pub fn protocol_of(&self, address: &Address) -> Option<Protocol> {
        self.contracts.get(address).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
