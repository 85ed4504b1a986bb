//! # docproof-crypto — Cryptographic Primitives
//!
//! Building blocks shared by the parser, the circuit input generator and the
//! relay client:
//!
//! - **Poseidon** over the Pallas base field, with byte packing into
//!   31-byte field elements ([`poseidon`], [`field`]).
//! - **SHA-1/SHA-2** digests for data-group, eContent and certificate
//!   hashing ([`hash`]).
//! - **Sparse Merkle trees** for the CSCA, DSC, commitment and OFAC trees,
//!   with inclusion and (OFAC only) exclusion proofs ([`smt`]).
//! - **Commitments and nullifiers** binding a user secret to a document
//!   ([`commitment`]).
//! - **AES-256-GCM** payload encryption and **ECDH P-256** key agreement
//!   with the remote TEE ([`encrypt`]).
//!
//! ## Crate Policy
//!
//! - Depends only on `docproof-core` internally.
//! - No mocking of cryptographic operations in tests; every test runs the
//!   real hash, cipher or key agreement.
//! - Secret material (user secrets, shared keys) is zeroized on drop and
//!   never appears in `Debug` output.

pub mod commitment;
pub mod encrypt;
pub mod error;
pub mod field;
pub mod hash;
pub mod poseidon;
pub mod smt;

pub use commitment::{content_hash, generate_commitment, generate_nullifier, UserSecret};
pub use encrypt::{
    decrypt, derive_shared_key, encrypt, encrypt_with_nonce, EncryptedPayload, KeyAgreement,
    SharedKey, NONCE_SIZE,
};
pub use error::{CryptoError, TreeError};
pub use field::FieldElement;
pub use poseidon::{hash_bytes, pack_bytes, poseidon_hash, PACKING_CAPACITY_BYTES};
pub use smt::{
    build_tree, leaf_hash, verify_exclusion, verify_inclusion, ExclusionProof, LeafSource,
    MerkleLeaf, MerkleProof, MerkleTree, OfacEntry, TreeKind, TreeSnapshot,
};
