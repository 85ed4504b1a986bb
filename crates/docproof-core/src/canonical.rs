//! # Canonical Serialization
//!
//! `CanonicalBytes` is the only input accepted by [`crate::sha256_digest`].
//! Document content hashes, tree snapshots and relay metadata digests all
//! pass through it, so two records with equal normalized fields always hash
//! to the same value regardless of field order or whitespace in the source.
//!
//! Serialization is RFC 8785 (JCS) via `serde_jcs`: sorted keys, compact
//! separators. Floats are rejected because their JCS rendering is not stable
//! across producers; every numeric field in this pipeline is an integer.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// The inner buffer is private; [`CanonicalBytes::new`] is the sole
/// constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value contains a non-integer number,
    /// `SerializationFailed` if serde cannot render it.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(arr) => arr.iter().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted() {
        let cb = CanonicalBytes::new(&json!({"b": 1, "a": "x", "c": [3, 2]})).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"a":"x","b":1,"c":[3,2]}"#);
    }

    #[test]
    fn nested_floats_rejected() {
        let err = CanonicalBytes::new(&json!({"outer": {"inner": [1, 2.5]}})).unwrap_err();
        assert!(matches!(err, CanonicalizationError::FloatRejected(f) if f == 2.5));
    }

    #[test]
    fn field_order_does_not_matter() {
        #[derive(Serialize)]
        struct A {
            x: u32,
            y: &'static str,
        }
        #[derive(Serialize)]
        struct B {
            y: &'static str,
            x: u32,
        }
        let a = CanonicalBytes::new(&A { x: 7, y: "UTO" }).unwrap();
        let b = CanonicalBytes::new(&B { y: "UTO", x: 7 }).unwrap();
        assert_eq!(a, b);
    }
}
