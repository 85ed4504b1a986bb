//! # Poseidon Hashing and Byte Packing
//!
//! Poseidon (P128Pow5T3, width 3, rate 2) over the Pallas base field, with a
//! constant-length domain per arity. Byte strings enter the field by
//! packing 31 bytes per element, little-endian, which keeps every chunk
//! below the modulus.
//!
//! [`hash_bytes`] is the single entry point for hashing variable-length
//! data: it packs into a fixed 16-element frame and prefixes the byte
//! length, so inputs that differ only by trailing zero bytes still hash
//! apart.

use docproof_core::PackingOverflowError;
use halo2_gadgets::poseidon::primitives::{self as poseidon, ConstantLength, P128Pow5T3};

use crate::field::{FieldElement, Fp};

/// Bytes packed into each field element.
pub const BYTES_PER_ELEMENT: usize = 31;

/// Field elements in one packed frame.
pub const MAX_PACKED_ELEMENTS: usize = 16;

/// Longest byte string [`hash_bytes`] accepts.
pub const PACKING_CAPACITY_BYTES: usize = BYTES_PER_ELEMENT * MAX_PACKED_ELEMENTS;

/// Poseidon over a fixed number of field elements.
pub fn poseidon_hash<const L: usize>(inputs: [FieldElement; L]) -> FieldElement {
    let message: [Fp; L] = inputs.map(|f| f.0);
    FieldElement(poseidon::Hash::<_, P128Pow5T3, ConstantLength<L>, 3, 2>::init().hash(message))
}

/// Two-to-one compression used for Merkle tree nodes.
pub fn hash2(left: FieldElement, right: FieldElement) -> FieldElement {
    poseidon_hash([left, right])
}

/// Pack bytes into field elements, 31 bytes each, little-endian.
///
/// # Errors
///
/// [`PackingOverflowError`] if `bytes` is longer than
/// [`PACKING_CAPACITY_BYTES`].
pub fn pack_bytes(bytes: &[u8]) -> Result<Vec<FieldElement>, PackingOverflowError> {
    if bytes.len() > PACKING_CAPACITY_BYTES {
        return Err(PackingOverflowError {
            len: bytes.len(),
            capacity: PACKING_CAPACITY_BYTES,
        });
    }
    Ok(bytes
        .chunks(BYTES_PER_ELEMENT)
        .filter_map(FieldElement::from_le_bytes_31)
        .collect())
}

/// Hash an arbitrary byte string of at most [`PACKING_CAPACITY_BYTES`].
///
/// Pre-image: `[len, e_0, .., e_15]` with unused elements zero.
pub fn hash_bytes(bytes: &[u8]) -> Result<FieldElement, PackingOverflowError> {
    let packed = pack_bytes(bytes)?;
    let mut frame = [FieldElement::ZERO; MAX_PACKED_ELEMENTS + 1];
    frame[0] = FieldElement::from_u64(bytes.len() as u64);
    for (slot, e) in frame[1..].iter_mut().zip(packed) {
        *slot = e;
    }
    Ok(poseidon_hash(frame))
}
