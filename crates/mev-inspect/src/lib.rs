//! mev-inspect crate
//!
//! Block pipeline (fetch, classify, derive, replace stored rows) and the two
//! drivers built on it: a bounded-concurrency batch over a block range and a
//! listener that tails the chain head behind a settle lag.

pub mod config;
pub mod inspect_block;
pub mod inspector;
pub mod listener;

pub use config::{InspectorConfig, ListenerConfig};
pub use inspect_block::{derive_events, inspect_block, DerivedEvents, InspectionSummary};
pub use inspector::{BatchReport, Inspector};
pub use listener::{inspect_next_block, next_block_to_inspect, run_listener, ListenerStep};
