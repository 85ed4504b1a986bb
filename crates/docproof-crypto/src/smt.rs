//! # Sparse Merkle Trees
//!
//! Fixed-depth Poseidon Merkle trees for the four protocol trees:
//!
//! | kind | depth | leaves |
//! |---|---|---|
//! | CSCA | 12 | country signing certificates |
//! | DSC | 21 | document signer certificates bound to their CSCA |
//! | commitment | 33 | registered identity commitments |
//! | OFAC | 64 | sanctioned passport numbers and name/DOB pairs, sorted |
//!
//! ## Algorithm
//!
//! - Empty slot: `0`. Empty subtree of height `h`: `Z[h] = H(Z[h-1], Z[h-1])`.
//! - Leaf node: `Poseidon(key, value, 1)`.
//! - Internal node: `Poseidon(left, right)`.
//! - Leaves occupy consecutive indices from 0 in build order, so the tree is
//!   dense on the left and sparse (all `Z[h]`) on the right.
//!
//! The OFAC tree is built sorted by key and bracketed with sentinel keys
//! `0` and `p - 1`. A key is proven absent by two leaves at adjacent indices
//! whose keys bound it strictly.
//!
//! ## Security Invariant
//!
//! Trees are immutable after [`build_tree`]. A changed dataset means a full
//! rebuild; there is no in-place insert.

use std::collections::BTreeMap;
use std::str::FromStr;

use docproof_core::{CertificateRecord, NotFoundError, UnknownTreeError};
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::field::FieldElement;
use crate::hash::sha256;
use crate::poseidon::{hash2, hash_bytes, poseidon_hash};

// ---------------------------------------------------------------------------
// Tree kinds
// ---------------------------------------------------------------------------

/// The protocol trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeKind {
    Csca,
    Dsc,
    Commitment,
    Ofac,
}

impl TreeKind {
    pub const ALL: [TreeKind; 4] = [Self::Csca, Self::Dsc, Self::Commitment, Self::Ofac];

    pub fn depth(&self) -> u32 {
        match self {
            Self::Csca => 12,
            Self::Dsc => 21,
            Self::Commitment => 33,
            Self::Ofac => 64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csca => "csca",
            Self::Dsc => "dsc",
            Self::Commitment => "commitment",
            Self::Ofac => "ofac",
        }
    }

    /// Sorted trees support exclusion proofs.
    pub fn is_sorted(&self) -> bool {
        matches!(self, Self::Ofac)
    }

    /// Maximum number of leaves, `2^depth`, saturating at `u64::MAX`.
    pub fn capacity(&self) -> u64 {
        1u64.checked_shl(self.depth()).unwrap_or(u64::MAX)
    }

    fn leaf_tag(&self) -> FieldElement {
        FieldElement::from_u64(match self {
            Self::Csca => 1,
            Self::Dsc => 2,
            Self::Commitment => 3,
            Self::Ofac => 4,
        })
    }
}

impl std::fmt::Display for TreeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeKind {
    type Err = UnknownTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownTreeError { name: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Leaf pre-images
// ---------------------------------------------------------------------------

/// An OFAC sanctions-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OfacEntry {
    PassportNumber { number: String, nationality: String },
    NameAndDob { name: String, date_of_birth: String },
}

impl OfacEntry {
    /// Name entry in MRZ spelling: `SURNAME<<GIVEN<NAMES`.
    pub fn name_and_dob(surname: &str, given_names: &str, date_of_birth: &str) -> Self {
        let mrz_name = |s: &str| {
            s.split_whitespace()
                .map(str::to_ascii_uppercase)
                .collect::<Vec<_>>()
                .join("<")
        };
        Self::NameAndDob {
            name: format!("{}<<{}", mrz_name(surname), mrz_name(given_names)),
            date_of_birth: date_of_birth.to_string(),
        }
    }

    /// Normalized pre-image bytes.
    pub fn normalized(&self) -> String {
        match self {
            Self::PassportNumber {
                number,
                nationality,
            } => format!(
                "passport:{}:{}",
                number.trim_end_matches('<').to_ascii_uppercase(),
                nationality.to_ascii_uppercase()
            ),
            Self::NameAndDob {
                name,
                date_of_birth,
            } => format!("name_dob:{}:{}", name.to_ascii_uppercase(), date_of_birth),
        }
    }
}

/// Source record for a tree leaf.
#[derive(Debug, Clone, Copy)]
pub enum LeafSource<'a> {
    Csca(&'a CertificateRecord),
    Dsc {
        dsc: &'a CertificateRecord,
        csca: &'a CertificateRecord,
    },
    Commitment(FieldElement),
    Ofac(&'a OfacEntry),
}

impl LeafSource<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::Csca(_) => "csca",
            Self::Dsc { .. } => "dsc",
            Self::Commitment(_) => "commitment",
            Self::Ofac(_) => "ofac",
        }
    }
}

fn public_key_fe(cert: &CertificateRecord) -> Result<FieldElement, TreeError> {
    Ok(hash_bytes(&sha256(&cert.public_key_bytes))?)
}

/// Leaf key for `source` under `kind`'s pre-image convention.
///
/// - CSCA: `Poseidon(1, H(sha256(csca public key)))`
/// - DSC: `Poseidon(2, H(sha256(dsc public key)), csca leaf)`
/// - commitment: the commitment itself
/// - OFAC: `Poseidon(4, H(normalized entry))`
///
/// `H` is [`hash_bytes`].
pub fn leaf_hash(source: &LeafSource<'_>, kind: TreeKind) -> Result<FieldElement, TreeError> {
    match (source, kind) {
        (LeafSource::Csca(csca), TreeKind::Csca) => {
            Ok(poseidon_hash([kind.leaf_tag(), public_key_fe(csca)?]))
        }
        (LeafSource::Dsc { dsc, csca }, TreeKind::Dsc) => {
            let csca_leaf = leaf_hash(&LeafSource::Csca(csca), TreeKind::Csca)?;
            Ok(poseidon_hash([kind.leaf_tag(), public_key_fe(dsc)?, csca_leaf]))
        }
        (LeafSource::Commitment(c), TreeKind::Commitment) => Ok(*c),
        (LeafSource::Ofac(entry), TreeKind::Ofac) => Ok(poseidon_hash([
            kind.leaf_tag(),
            hash_bytes(entry.normalized().as_bytes())?,
        ])),
        _ => Err(TreeError::KindMismatch {
            source_kind: source.name().to_string(),
            tree: kind.as_str().to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A `(key, value)` leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerkleLeaf {
    pub key: FieldElement,
    pub value: FieldElement,
}

impl MerkleLeaf {
    pub fn new(key: FieldElement, value: FieldElement) -> Self {
        Self { key, value }
    }

    /// Set-membership leaf with value `1`.
    pub fn present(key: FieldElement) -> Self {
        Self::new(key, FieldElement::ONE)
    }

    pub fn node_hash(&self) -> FieldElement {
        poseidon_hash([self.key, self.value, FieldElement::ONE])
    }
}

/// Serializable leaf list from which a tree is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub kind: TreeKind,
    pub leaves: Vec<MerkleLeaf>,
}

impl TreeSnapshot {
    pub fn build(&self) -> Result<MerkleTree, TreeError> {
        build_tree(self.kind, self.leaves.iter().copied())
    }
}

/// An immutable, fully materialized Merkle tree.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    kind: TreeKind,
    leaves: Vec<MerkleLeaf>,
    index: BTreeMap<FieldElement, usize>,
    /// `levels[0]` are leaf node hashes, `levels[depth]` holds the root.
    levels: Vec<Vec<FieldElement>>,
    zeros: Vec<FieldElement>,
    root: FieldElement,
}

fn zero_hashes(depth: u32) -> Vec<FieldElement> {
    let mut zeros = Vec::with_capacity(depth as usize + 1);
    zeros.push(FieldElement::ZERO);
    for h in 0..depth as usize {
        zeros.push(hash2(zeros[h], zeros[h]));
    }
    zeros
}

/// Build a tree from leaves in canonical order.
///
/// The OFAC tree sorts its leaves and adds range sentinels; every other
/// kind keeps the given order as leaf indices.
///
/// # Errors
///
/// `DuplicateKey`, `CapacityExceeded`, or for OFAC `ReservedKey` when a
/// leaf uses a sentinel key.
pub fn build_tree(
    kind: TreeKind,
    leaves: impl IntoIterator<Item = MerkleLeaf>,
) -> Result<MerkleTree, TreeError> {
    let mut leaves: Vec<MerkleLeaf> = leaves.into_iter().collect();

    if kind.is_sorted() {
        let max = FieldElement::max_value();
        if let Some(l) = leaves
            .iter()
            .find(|l| l.key == FieldElement::ZERO || l.key == max)
        {
            return Err(TreeError::ReservedKey(l.key.to_hex()));
        }
        leaves.sort_by(|a, b| a.key.cmp(&b.key));
        leaves.insert(0, MerkleLeaf::new(FieldElement::ZERO, FieldElement::ZERO));
        leaves.push(MerkleLeaf::new(max, FieldElement::ZERO));
    }

    let capacity = kind.capacity();
    if leaves.len() as u64 > capacity {
        return Err(TreeError::CapacityExceeded {
            tree: kind.to_string(),
            capacity,
            got: leaves.len(),
        });
    }

    let mut index = BTreeMap::new();
    for (i, leaf) in leaves.iter().enumerate() {
        if index.insert(leaf.key, i).is_some() {
            return Err(TreeError::DuplicateKey {
                tree: kind.to_string(),
                key: leaf.key.to_hex(),
            });
        }
    }

    let depth = kind.depth() as usize;
    let zeros = zero_hashes(kind.depth());
    let mut levels = Vec::with_capacity(depth + 1);
    levels.push(leaves.iter().map(MerkleLeaf::node_hash).collect::<Vec<_>>());
    for h in 0..depth {
        let next: Vec<FieldElement> = levels[h]
            .chunks(2)
            .map(|pair| hash2(pair[0], pair.get(1).copied().unwrap_or(zeros[h])))
            .collect();
        levels.push(next);
    }
    let root = levels[depth].first().copied().unwrap_or(zeros[depth]);

    tracing::debug!(tree = %kind, leaves = leaves.len(), root = %root, "built merkle tree");

    Ok(MerkleTree {
        kind,
        leaves,
        index,
        levels,
        zeros,
        root,
    })
}

impl MerkleTree {
    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn root(&self) -> FieldElement {
        self.root
    }

    pub fn depth(&self) -> u32 {
        self.kind.depth()
    }

    /// Number of occupied leaves, sentinels included.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn contains(&self, key: &FieldElement) -> bool {
        self.index.contains_key(key)
    }

    pub fn leaf_index(&self, key: &FieldElement) -> Option<u64> {
        self.index.get(key).map(|i| *i as u64)
    }

    /// The leaves this tree was built from, without OFAC sentinels.
    pub fn snapshot(&self) -> TreeSnapshot {
        let leaves = if self.kind.is_sorted() {
            let inner = self.leaves.len().saturating_sub(2);
            self.leaves.iter().skip(1).take(inner).copied().collect()
        } else {
            self.leaves.clone()
        };
        TreeSnapshot {
            kind: self.kind,
            leaves,
        }
    }

    fn proof_at(&self, position: usize) -> MerkleProof {
        let mut siblings = Vec::with_capacity(self.depth() as usize);
        let mut idx = position;
        for h in 0..self.depth() as usize {
            let sibling = self.levels[h]
                .get(idx ^ 1)
                .copied()
                .unwrap_or(self.zeros[h]);
            siblings.push(sibling);
            idx >>= 1;
        }
        MerkleProof {
            tree: self.kind,
            leaf: self.leaves[position],
            leaf_index: position as u64,
            siblings,
            root: self.root,
        }
    }

    /// Inclusion proof for `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `key` was not inserted.
    pub fn prove_inclusion(&self, key: &FieldElement) -> Result<MerkleProof, TreeError> {
        let position = *self.index.get(key).ok_or_else(|| NotFoundError {
            tree: self.kind.to_string(),
            key: key.to_hex(),
        })?;
        Ok(self.proof_at(position))
    }

    /// Non-membership proof for `key` via its two bounding neighbours.
    ///
    /// # Errors
    ///
    /// `ExclusionUnsupported` for unsorted trees, `KeyPresent` if the key
    /// (or a sentinel) is in the tree.
    pub fn prove_exclusion(&self, key: &FieldElement) -> Result<ExclusionProof, TreeError> {
        if !self.kind.is_sorted() {
            return Err(TreeError::ExclusionUnsupported(self.kind.to_string()));
        }
        if self.contains(key) {
            return Err(TreeError::KeyPresent {
                tree: self.kind.to_string(),
                key: key.to_hex(),
            });
        }
        // Sentinels guarantee 1 <= high <= len - 1.
        let high = self.leaves.partition_point(|l| l.key < *key);
        if high == 0 || high >= self.leaves.len() {
            return Err(TreeError::ReservedKey(key.to_hex()));
        }
        Ok(ExclusionProof {
            key: *key,
            low: self.proof_at(high - 1),
            high: self.proof_at(high),
        })
    }
}

// ---------------------------------------------------------------------------
// Proofs
// ---------------------------------------------------------------------------

/// Inclusion proof: the leaf, its index and one sibling per level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub tree: TreeKind,
    pub leaf: MerkleLeaf,
    pub leaf_index: u64,
    /// Siblings from the leaf level upward.
    pub siblings: Vec<FieldElement>,
    pub root: FieldElement,
}

impl MerkleProof {
    /// Fold the path from the leaf to a root.
    pub fn compute_root(&self) -> FieldElement {
        let mut cur = self.leaf.node_hash();
        let mut idx = self.leaf_index;
        for sibling in &self.siblings {
            cur = if idx & 1 == 0 {
                hash2(cur, *sibling)
            } else {
                hash2(*sibling, cur)
            };
            idx >>= 1;
        }
        cur
    }

    /// Path direction bits, leaf level first (`1` = node is a right child).
    pub fn path_indices(&self) -> Vec<u8> {
        (0..self.siblings.len())
            .map(|h| ((self.leaf_index >> h) & 1) as u8)
            .collect()
    }
}

/// Verify an inclusion proof against its own root.
///
/// Returns `false` rather than erroring on malformed proofs.
pub fn verify_inclusion(proof: &MerkleProof) -> bool {
    proof.siblings.len() == proof.tree.depth() as usize
        && proof.leaf_index < proof.tree.capacity()
        && proof.compute_root() == proof.root
}

/// Non-membership proof for a sorted tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionProof {
    pub key: FieldElement,
    pub low: MerkleProof,
    pub high: MerkleProof,
}

impl ExclusionProof {
    pub fn root(&self) -> FieldElement {
        self.low.root
    }
}

/// Verify that `proof.key` lies strictly between two adjacent leaves of the
/// same sorted tree.
pub fn verify_exclusion(proof: &ExclusionProof) -> bool {
    proof.low.tree.is_sorted()
        && proof.low.tree == proof.high.tree
        && proof.low.root == proof.high.root
        && proof.high.leaf_index == proof.low.leaf_index + 1
        && proof.low.leaf.key < proof.key
        && proof.key < proof.high.leaf.key
        && verify_inclusion(&proof.low)
        && verify_inclusion(&proof.high)
}
