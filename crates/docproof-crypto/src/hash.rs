//! SHA-1 / SHA-2 digests selected at runtime by [`HashAlgorithm`].

use docproof_core::HashAlgorithm;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        HashAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// Find which algorithm's digest of `data` occurs inside `container`.
///
/// Algorithms are tried longest digest first, so a SHA-512 match is not
/// shadowed by a coincidental shorter prefix.
pub fn find_embedded_digest(data: &[u8], container: &[u8]) -> Option<HashAlgorithm> {
    HashAlgorithm::ALL.into_iter().rev().find(|alg| {
        let d = digest(*alg, data);
        container.windows(d.len()).any(|w| w == d.as_slice())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(
            hex::encode(digest(HashAlgorithm::Sha1, b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest(HashAlgorithm::Sha384, b"").len(), 48);
    }

    #[test]
    fn embedded_digest_detection() {
        let data = b"dg1 bytes";
        let mut container = vec![0x30, 0x25, 0x02, 0x01, 0x01, 0x04, 0x30];
        container.extend(digest(HashAlgorithm::Sha384, data));
        assert_eq!(
            find_embedded_digest(data, &container),
            Some(HashAlgorithm::Sha384)
        );
        assert_eq!(find_embedded_digest(b"other", &container), None);
    }
}
