//! Trace classification pass.

use std::sync::Arc;

use mev_data::{ClassifiedTrace, Trace};

use crate::cache::DeployedContracts;
use crate::registry::{default_specs, ClassifierSpec};

/// Tags traces using a spec registry and the deployed-contract cache.
///
/// Classification is a pure function of trace content: the same trace always
/// yields the same result, and a trace that cannot be decoded is tagged
/// unknown instead of failing the pass.
pub struct TraceClassifier {
    specs: Vec<ClassifierSpec>,
    deployed: Arc<DeployedContracts>,
}

impl TraceClassifier {
    pub fn new(specs: Vec<ClassifierSpec>, deployed: Arc<DeployedContracts>) -> Self {
        Self { specs, deployed }
    }

    /// Classifier over the mainnet registry.
    pub fn with_defaults(deployed: Arc<DeployedContracts>) -> Self {
        Self::new(default_specs(), deployed)
    }

    pub fn specs(&self) -> &[ClassifierSpec] {
        &self.specs
    }

    /// Classify every trace of a block, preserving input order.
    pub fn classify(&self, traces: &[Trace]) -> Vec<ClassifiedTrace> {
        traces.iter().map(|trace| self.classify_trace(trace)).collect()
    }

    pub fn classify_trace(&self, trace: &Trace) -> ClassifiedTrace {
        let Some(spec) = self.find_spec(trace) else {
            return ClassifiedTrace::unknown(trace.clone());
        };

        match (spec.decode)(&trace.input) {
            Ok(inputs) => ClassifiedTrace {
                trace: trace.clone(),
                classification: spec.classification,
                protocol: spec.protocol,
                abi_name: Some(spec.abi_name.to_string()),
                function_name: Some(spec.function_name.to_string()),
                inputs,
            },
            Err(err) => {
                tracing::debug!(
                    transaction_hash = ?trace.transaction_hash,
                    trace_address = ?trace.trace_address,
                    function = spec.function_name,
                    error = %err,
                    "selector matched but calldata did not decode"
                );
                ClassifiedTrace::unknown(trace.clone())
            }
        }
    }

    fn find_spec(&self, trace: &Trace) -> Option<&ClassifierSpec> {
        if !trace.call_kind.is_call() {
            return None;
        }
        let to = trace.to_address?;
        let selector = trace.selector()?;

        self.specs
            .iter()
            .find(|spec| spec.matches(to, selector, &self.deployed))
    }
}
