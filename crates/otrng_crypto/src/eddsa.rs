//! 114-byte ed448 signatures for profile bodies.
//!
//! Verification is the RFC 8032 Ed448 equation: decode `R` and `s` from the
//! signature, squeeze `k = SHAKE-256(dom4 ‖ R ‖ A ‖ msg)` wide, accept iff
//! `[s]G == R + [k]A`. Signing works from the raw secret scalar (the same
//! scalar the ring signature uses), with the nonce derived deterministically
//! from the scalar and the message, so there is no per-signature randomness
//! to get wrong.

use ed448_goldilocks::{EdwardsPoint, EdwardsScalar};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::ed448::{point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes, Keypair};
use crate::error::CryptoError;
use crate::shake::reduce_64;

/// ed448 signature length: `R` (57) followed by `s` (57, top byte zero).
pub const ED448_SIGNATURE_BYTES: usize = 114;

/// RFC 8032 dom4 prefix for Ed448, empty context.
const DOM4_PREFIX: &[u8] = b"SigEd448\x00\x00";

/// A detached signature over a profile body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdSignature([u8; ED448_SIGNATURE_BYTES]);

impl EdSignature {
    pub fn from_bytes(bytes: [u8; ED448_SIGNATURE_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ED448_SIGNATURE_BYTES] {
        &self.0
    }
}

fn squeeze_wide(inputs: &[&[u8]]) -> EdwardsScalar {
    let mut hasher = Shake256::default();
    hasher.update(DOM4_PREFIX);
    for input in inputs {
        hasher.update(input);
    }
    let mut out = [0u8; 64];
    hasher.finalize_xof().read(&mut out);
    reduce_64(&out)
}

/// Sign `message` with the long-term keypair.
pub fn sign(keypair: &Keypair, message: &[u8]) -> EdSignature {
    let secret_bytes = scalar_to_bytes(keypair.secret());
    let nonce = squeeze_wide(&[&secret_bytes, message]);

    let big_r = EdwardsPoint::GENERATOR * nonce;
    let r_bytes = point_to_bytes(&big_r);
    let a_bytes = keypair.public_bytes();

    let k = squeeze_wide(&[&r_bytes, &a_bytes, message]);
    let s = nonce + k * keypair.secret();

    let mut sig = [0u8; ED448_SIGNATURE_BYTES];
    sig[..57].copy_from_slice(&r_bytes);
    sig[57..113].copy_from_slice(&scalar_to_bytes(&s));
    EdSignature(sig)
}

/// Verify `signature` over `message` against `public`.
pub fn verify(
    public: &EdwardsPoint,
    message: &[u8],
    signature: &EdSignature,
) -> Result<(), CryptoError> {
    let bytes = signature.as_bytes();
    if bytes[113] != 0 {
        return Err(CryptoError::SignatureVerification);
    }

    let mut r_bytes = [0u8; 57];
    r_bytes.copy_from_slice(&bytes[..57]);
    let big_r = point_from_bytes(&r_bytes).map_err(|_| CryptoError::SignatureVerification)?;

    let mut s_bytes = [0u8; 56];
    s_bytes.copy_from_slice(&bytes[57..113]);
    let s = scalar_from_bytes(&s_bytes).map_err(|_| CryptoError::SignatureVerification)?;

    let a_bytes = point_to_bytes(public);
    let k = squeeze_wide(&[&r_bytes, &a_bytes, message]);

    if EdwardsPoint::GENERATOR * s == big_r + public * k {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SystemRandom;

    #[test]
    fn sign_verify_roundtrip() {
        let mut rng = SystemRandom;
        let pair = Keypair::generate(&mut rng);
        let sig = sign(&pair, b"profile body");
        assert!(verify(pair.public(), b"profile body", &sig).is_ok());
    }

    #[test]
    fn rejects_wrong_message() {
        let mut rng = SystemRandom;
        let pair = Keypair::generate(&mut rng);
        let sig = sign(&pair, b"profile body");
        assert!(verify(pair.public(), b"profile bodY", &sig).is_err());
    }

    #[test]
    fn rejects_wrong_key() {
        let mut rng = SystemRandom;
        let pair = Keypair::generate(&mut rng);
        let other = Keypair::generate(&mut rng);
        let sig = sign(&pair, b"profile body");
        assert!(verify(other.public(), b"profile body", &sig).is_err());
    }

    #[test]
    fn rejects_bit_flip_in_signature() {
        let mut rng = SystemRandom;
        let pair = Keypair::generate(&mut rng);
        let sig = sign(&pair, b"profile body");
        for idx in [0usize, 56, 57, 112] {
            let mut bytes = *sig.as_bytes();
            bytes[idx] ^= 0x01;
            let tampered = EdSignature::from_bytes(bytes);
            assert!(
                verify(pair.public(), b"profile body", &tampered).is_err(),
                "flip at byte {idx} must invalidate the signature"
            );
        }
    }

    #[test]
    fn signing_is_deterministic() {
        let mut rng = SystemRandom;
        let pair = Keypair::generate(&mut rng);
        assert_eq!(sign(&pair, b"m"), sign(&pair, b"m"));
    }
}
