//! The input set handed to the TEE for witness generation.

use std::collections::BTreeMap;

use docproof_crypto::FieldElement;
use serde::{Deserialize, Serialize};

use crate::encode::Signal;
use crate::variant::{CircuitVariant, Operation};

/// Named signals for one circuit, plus the public outputs the proof must
/// reproduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitInputs {
    pub circuit_id: String,
    pub operation: Operation,
    pub variant: CircuitVariant,
    pub signals: BTreeMap<String, Signal>,
    /// Public outputs computed locally (`commitment`, `nullifier`, ...).
    /// Never sent to the TEE.
    #[serde(skip)]
    pub expected: BTreeMap<String, FieldElement>,
}

impl CircuitInputs {
    pub fn new(variant: CircuitVariant) -> Self {
        Self {
            circuit_id: variant.circuit_id(),
            operation: variant.operation(),
            variant,
            signals: BTreeMap::new(),
            expected: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, signal: Signal) -> &mut Self {
        self.signals.insert(name.to_string(), signal);
        self
    }

    pub fn expect(&mut self, name: &str, value: FieldElement) -> &mut Self {
        self.expected.insert(name.to_string(), value);
        self
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    pub fn expected(&self, name: &str) -> Option<&FieldElement> {
        self.expected.get(name)
    }

    /// The witness-generator JSON: signal name to decimal string(s).
    pub fn signals_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.signals).unwrap_or(serde_json::Value::Null)
    }
}
