//! 3-of-3 ring signature over ed448.
//!
//! A Schnorr-style ring proof: the signer knows the discrete log of exactly
//! one of {A1, A2, A3} and produces σ = (c1, r1, c2, r2, c3, r3) without
//! revealing which. The challenge hash binds the base point, the group
//! order, the full ring, the three commitments, the caller's usage tag and
//! domain string, and the message, so a signature cannot be replayed into a
//! different transcript or protocol role.
//!
//! Signing: pick random `t` for the known index i and random `(c_j, r_j)`
//! for the two others; commit `T_i = [t]G`, `T_j = [r_j]G + [c_j]A_j`;
//! close the ring with `c_i = c − c_j − c_k (mod q)` and
//! `r_i = t − c_i·a_i (mod q)`.
//!
//! Verifying: recompute every `T_n = [r_n]G + [c_n]A_n` and accept iff
//! `c1 + c2 + c3 == H(...)`.

use ed448_goldilocks::{EdwardsPoint, EdwardsScalar};

use crate::ed448::{point_to_bytes, scalar_from_bytes, scalar_to_bytes, Keypair, ED448_SCALAR_BYTES};
use crate::error::CryptoError;
use crate::random::{random_scalar, RandomSource};
use crate::shake::hash_to_scalar;

/// Wire length of a ring signature: six 56-byte scalars.
pub const RING_SIG_BYTES: usize = 6 * ED448_SCALAR_BYTES;

/// The ed448 group order q, serialized like a scalar (56 little-endian
/// bytes plus a zero byte). Absorbed into the challenge hash.
const ORDER_BYTES: [u8; 57] = [
    0xf3, 0x44, 0x58, 0xab, 0x92, 0xc2, 0x78, 0x23, 0x55, 0x8f, 0xc5, 0x8d, 0x72, 0xc2, 0x6c,
    0x21, 0x90, 0x36, 0xd6, 0xae, 0x49, 0xdb, 0x4e, 0xc4, 0xe9, 0x23, 0xca, 0x7c, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x3f, 0x00,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSignature {
    pub c1: EdwardsScalar,
    pub r1: EdwardsScalar,
    pub c2: EdwardsScalar,
    pub r2: EdwardsScalar,
    pub c3: EdwardsScalar,
    pub r3: EdwardsScalar,
}

impl RingSignature {
    pub fn to_bytes(&self) -> [u8; RING_SIG_BYTES] {
        let mut out = [0u8; RING_SIG_BYTES];
        for (slot, scalar) in [self.c1, self.r1, self.c2, self.r2, self.c3, self.r3]
            .iter()
            .enumerate()
        {
            out[slot * ED448_SCALAR_BYTES..(slot + 1) * ED448_SCALAR_BYTES]
                .copy_from_slice(&scalar_to_bytes(scalar));
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; RING_SIG_BYTES]) -> Result<Self, CryptoError> {
        let mut scalars = [EdwardsScalar::ZERO; 6];
        for (slot, scalar) in scalars.iter_mut().enumerate() {
            let mut chunk = [0u8; ED448_SCALAR_BYTES];
            chunk.copy_from_slice(
                &bytes[slot * ED448_SCALAR_BYTES..(slot + 1) * ED448_SCALAR_BYTES],
            );
            *scalar = scalar_from_bytes(&chunk)?;
        }
        Ok(Self {
            c1: scalars[0],
            r1: scalars[1],
            c2: scalars[2],
            r2: scalars[3],
            c3: scalars[4],
            r3: scalars[5],
        })
    }
}

fn challenge(
    usage: u8,
    domain: &[u8],
    ring: &[EdwardsPoint; 3],
    commitments: &[EdwardsPoint; 3],
    message: &[u8],
) -> EdwardsScalar {
    let base = point_to_bytes(&EdwardsPoint::GENERATOR);
    let a1 = point_to_bytes(&ring[0]);
    let a2 = point_to_bytes(&ring[1]);
    let a3 = point_to_bytes(&ring[2]);
    let t1 = point_to_bytes(&commitments[0]);
    let t2 = point_to_bytes(&commitments[1]);
    let t3 = point_to_bytes(&commitments[2]);
    hash_to_scalar(
        domain,
        usage,
        &[&base, &ORDER_BYTES, &a1, &a2, &a3, &t1, &t2, &t3, message],
    )
}

/// Produce a ring signature over `message`.
///
/// `keypair.public()` must be one of the three ring members; the proof is
/// made at that position.
pub fn authenticate(
    rng: &mut dyn RandomSource,
    usage: u8,
    domain: &[u8],
    keypair: &Keypair,
    ring: &[EdwardsPoint; 3],
    message: &[u8],
) -> Result<RingSignature, CryptoError> {
    let index = ring
        .iter()
        .position(|member| member == keypair.public())
        .ok_or(CryptoError::SecretNotInRing)?;

    let t = random_scalar(rng);
    let mut c = [EdwardsScalar::ZERO; 3];
    let mut r = [EdwardsScalar::ZERO; 3];
    let mut commitments = [EdwardsPoint::IDENTITY; 3];

    for j in 0..3 {
        if j == index {
            commitments[j] = EdwardsPoint::GENERATOR * t;
        } else {
            c[j] = random_scalar(rng);
            r[j] = random_scalar(rng);
            commitments[j] = EdwardsPoint::GENERATOR * r[j] + ring[j] * c[j];
        }
    }

    let total = challenge(usage, domain, ring, &commitments, message);
    c[index] = total - c[(index + 1) % 3] - c[(index + 2) % 3];
    r[index] = t - c[index] * keypair.secret();

    Ok(RingSignature {
        c1: c[0],
        r1: r[0],
        c2: c[1],
        r2: r[1],
        c3: c[2],
        r3: r[2],
    })
}

/// Check σ against the ring and message. Constant shape regardless of which
/// ring member signed.
pub fn verify(
    usage: u8,
    domain: &[u8],
    signature: &RingSignature,
    ring: &[EdwardsPoint; 3],
    message: &[u8],
) -> bool {
    let c = [signature.c1, signature.c2, signature.c3];
    let r = [signature.r1, signature.r2, signature.r3];

    let mut commitments = [EdwardsPoint::IDENTITY; 3];
    for j in 0..3 {
        commitments[j] = EdwardsPoint::GENERATOR * r[j] + ring[j] * c[j];
    }

    let total = challenge(usage, domain, ring, &commitments, message);
    total == c[0] + c[1] + c[2]
}
