//! Edwards448 keypairs and ECDH.
//!
//! Points travel as the 57-byte compressed encoding (little-endian y with
//! the sign bit in the top byte), scalars as 56 little-endian bytes. The
//! same keypair shape serves long-term identity keys, per-DAKE ephemerals
//! and shared prekeys; the secret scalar is wiped on drop.

use ed448_goldilocks::{AffinePoint, CompressedEdwardsY, EdwardsPoint, EdwardsScalar};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::random::{random_scalar, RandomSource};

/// Compressed ed448 point length.
pub const ED448_POINT_BYTES: usize = 57;

/// ed448 scalar length on the wire.
pub const ED448_SCALAR_BYTES: usize = 56;

/// ECDH shared-secret length (a compressed point).
pub const ED448_SHARED_BYTES: usize = 57;

/// Serialize a point to its 57-byte compressed form.
pub fn point_to_bytes(point: &EdwardsPoint) -> [u8; ED448_POINT_BYTES] {
    point.to_affine().compress().0
}

/// Decompress a 57-byte encoding. Rejects encodings that are not the
/// y-coordinate of a curve point.
pub fn point_from_bytes(bytes: &[u8; ED448_POINT_BYTES]) -> Result<EdwardsPoint, CryptoError> {
    let affine: Option<AffinePoint> = CompressedEdwardsY(*bytes).decompress().into();
    affine.map(|p| p.to_edwards()).ok_or(CryptoError::InvalidPoint)
}

/// Serialize a scalar to 56 little-endian bytes.
pub fn scalar_to_bytes(scalar: &EdwardsScalar) -> [u8; ED448_SCALAR_BYTES] {
    scalar.to_bytes()
}

/// Decode a canonical 56-byte little-endian scalar. Rejects values at or
/// above the group order.
pub fn scalar_from_bytes(bytes: &[u8; ED448_SCALAR_BYTES]) -> Result<EdwardsScalar, CryptoError> {
    let mut repr = ed448_goldilocks::EdwardsScalarBytes::default();
    repr[..ED448_SCALAR_BYTES].copy_from_slice(bytes);
    let scalar: Option<EdwardsScalar> = EdwardsScalar::from_canonical_bytes(&repr).into();
    scalar.ok_or(CryptoError::InvalidScalar)
}

/// An ed448 keypair. The secret scalar is zeroised when the pair is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Keypair {
    secret: EdwardsScalar,
    public: EdwardsPoint,
}

impl Keypair {
    /// Generate a fresh keypair from the supplied randomness source.
    pub fn generate(rng: &mut dyn RandomSource) -> Self {
        let secret = random_scalar(rng);
        Self::from_secret(secret)
    }

    pub fn from_secret(secret: EdwardsScalar) -> Self {
        let public = EdwardsPoint::GENERATOR * secret;
        Self { secret, public }
    }

    pub fn secret(&self) -> &EdwardsScalar {
        &self.secret
    }

    pub fn public(&self) -> &EdwardsPoint {
        &self.public
    }

    pub fn public_bytes(&self) -> [u8; ED448_POINT_BYTES] {
        point_to_bytes(&self.public)
    }
}

impl core::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never print the secret half.
        f.debug_struct("Keypair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish_non_exhaustive()
    }
}

/// `ECDH(secret, their_pub)`: the compressed product point.
///
/// Fails if the product is the identity (degenerate peer point).
pub fn shared_secret(
    secret: &EdwardsScalar,
    their_public: &EdwardsPoint,
) -> Result<[u8; ED448_SHARED_BYTES], CryptoError> {
    let shared = their_public * secret;
    if shared == EdwardsPoint::IDENTITY {
        return Err(CryptoError::InvalidPoint);
    }
    Ok(point_to_bytes(&shared))
}
