//! # DSC Inputs
//!
//! Inputs for the circuit that proves a DSC was issued by a CSCA present in
//! the CSCA tree. The output is the DSC tree leaf the register proof links
//! against.

use docproof_core::{CertificateRecord, PublicKeyParams};
use docproof_crypto::{leaf_hash, verify_inclusion, LeafSource, MerkleProof, MerkleTree, TreeError, TreeKind};
use docproof_document::verify_issued_by;

use crate::encode::{find_offset, sha_pad, Signal};
use crate::error::CircuitError;
use crate::inputs::CircuitInputs;
use crate::register::push_signer;
use crate::variant::{CircuitVariant, SignatureVariant};

/// Padded DSC TBS capacity.
pub const MAX_DSC_TBS_PADDED: usize = 1664;

/// Build DSC inputs for `dsc`, issued by `csca`, proven against
/// `csca_tree`.
///
/// # Errors
///
/// - [`CircuitError::Certificate`] if no supported algorithm verifies the
///   DSC signature under the CSCA key.
/// - [`CircuitError::Tree`] with `NotFound` if the CSCA is not in the tree.
pub fn generate_dsc_inputs(
    dsc: &CertificateRecord,
    csca: &CertificateRecord,
    csca_tree: &MerkleTree,
) -> Result<CircuitInputs, CircuitError> {
    if csca_tree.kind() != TreeKind::Csca {
        return Err(TreeError::KindMismatch {
            source_kind: "csca".into(),
            tree: csca_tree.kind().to_string(),
        }
        .into());
    }

    let algorithm = verify_issued_by(dsc, csca)?;
    let variant = CircuitVariant::for_dsc(csca, algorithm)?;
    let CircuitVariant::Dsc { signature } = variant else {
        return Err(CircuitError::MissingData(format!("a DSC circuit for {algorithm}")));
    };
    let mut inputs = CircuitInputs::new(variant);

    let (tbs, tbs_len) = sha_pad("raw_dsc", &dsc.tbs, algorithm.hash, MAX_DSC_TBS_PADDED)?;
    let key_offset = find_offset(&dsc.tbs, &dsc.public_key_bytes)
        .ok_or_else(|| CircuitError::MissingData("DSC public key inside its TBS".into()))?;
    inputs
        .set("raw_dsc", Signal::bytes(&tbs))
        .set("raw_dsc_padded_length", Signal::number(tbs_len as u64))
        .set("dsc_pubkey_offset", Signal::number(key_offset as u64))
        .set("dsc_pubkey_length", Signal::number(dsc.public_key_bytes.len() as u64));

    push_signer(&mut inputs, &signature, csca, &dsc.signature)?;
    if let (SignatureVariant::RsaPss { .. }, PublicKeyParams::Rsa { pss: Some(pss), .. }) =
        (signature, &dsc.public_key)
    {
        inputs.set("salt_length", Signal::number(u64::from(pss.salt_length)));
    }

    let csca_leaf = leaf_hash(&LeafSource::Csca(csca), TreeKind::Csca)?;
    let proof = csca_tree.prove_inclusion(&csca_leaf)?;
    push_inclusion(&mut inputs, "csca_tree", &proof)?;

    inputs
        .expect("dsc_tree_leaf", leaf_hash(&LeafSource::Dsc { dsc, csca }, TreeKind::Dsc)?)
        .expect("csca_tree_root", csca_tree.root());

    tracing::debug!(
        circuit = %inputs.circuit_id,
        dsc = %dsc.subject,
        csca = %csca.subject,
        "dsc inputs generated"
    );
    Ok(inputs)
}

/// Emit `<prefix>_leaf`, `_leaf_value`, `_siblings`, `_path` and `_root`
/// for a verified inclusion proof.
pub(crate) fn push_inclusion(
    inputs: &mut CircuitInputs,
    prefix: &str,
    proof: &MerkleProof,
) -> Result<(), CircuitError> {
    if !verify_inclusion(proof) {
        return Err(CircuitError::InvalidProof {
            tree: proof.tree.to_string(),
        });
    }
    inputs
        .set(&format!("{prefix}_leaf"), Signal::field(&proof.leaf.key))
        .set(&format!("{prefix}_leaf_value"), Signal::field(&proof.leaf.value))
        .set(&format!("{prefix}_siblings"), Signal::fields(&proof.siblings))
        .set(&format!("{prefix}_path"), Signal::bits(&proof.path_indices()))
        .set(&format!("{prefix}_root"), Signal::field(&proof.root));
    Ok(())
}
