//! mev-classify crate
//!
//! Tags raw call traces with the protocol action they perform: a fixed-priority
//! spec registry, compile-time ABI decoders, and the factory-deployed address
//! cache used to tell forked pools apart.

pub mod cache;
pub mod decoder;
pub mod registry;
pub mod trace;

pub use cache::DeployedContracts;
pub use registry::{default_specs, AddressMatcher, ClassifierSpec};
pub use trace::TraceClassifier;
