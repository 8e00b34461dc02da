//! Batch knowledge proofs for published prekey material.
//!
//! A compact Schnorr proof that the prover knows every private half of a
//! batch of public values, in 64 + one-scalar bytes regardless of batch
//! size. The challenge `c` fixes a scalar λ; the response folds all the
//! secrets as `v = r + Σ x_i·λ^(i+1)`. Verification reconstructs the
//! commitment `A = [v]G − Σ [λ^(i+1)]P_i` and recomputes `c`.
//!
//! The ECDH variant runs on ed448, the DH variant in the prime-order
//! subgroup of the 3072-bit MODP group (inverses via exponent negation
//! mod q).

use ed448_goldilocks::{EdwardsPoint, EdwardsScalar};
use num_bigint::BigUint;

use crate::dh;
use crate::ed448::{point_to_bytes, scalar_from_bytes, scalar_to_bytes, ED448_SCALAR_BYTES};
use crate::error::CryptoError;
use crate::random::{random_dh_exponent, random_scalar, RandomSource};
use crate::shake::{kdf, reduce_64, PREKEY_SERVER_DOMAIN};

/// Challenge length shared by both proof forms.
pub const PROOF_C_BYTES: usize = 64;

/// Serialized ECDH proof: challenge plus one scalar.
pub const ECDH_PROOF_BYTES: usize = PROOF_C_BYTES + ED448_SCALAR_BYTES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdhProof {
    pub c: [u8; PROOF_C_BYTES],
    pub v: EdwardsScalar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhProof {
    pub c: [u8; PROOF_C_BYTES],
    pub v: BigUint,
}

fn ecdh_challenge(
    usage: u8,
    commitment: &EdwardsPoint,
    publics: &[EdwardsPoint],
    message: &[u8],
) -> [u8; PROOF_C_BYTES] {
    let mut inputs: Vec<Vec<u8>> = Vec::with_capacity(publics.len() + 2);
    inputs.push(point_to_bytes(commitment).to_vec());
    for public in publics {
        inputs.push(point_to_bytes(public).to_vec());
    }
    inputs.push(message.to_vec());
    let borrowed: Vec<&[u8]> = inputs.iter().map(|v| v.as_slice()).collect();
    let mut c = [0u8; PROOF_C_BYTES];
    kdf(PREKEY_SERVER_DOMAIN, usage, &borrowed, &mut c);
    c
}

impl EcdhProof {
    /// Prove knowledge of every secret in the batch.
    pub fn generate(
        rng: &mut dyn RandomSource,
        secrets: &[&EdwardsScalar],
        publics: &[EdwardsPoint],
        message: &[u8],
        usage: u8,
    ) -> Result<Self, CryptoError> {
        if secrets.is_empty() || secrets.len() != publics.len() {
            return Err(CryptoError::EmptyProof);
        }

        let r = random_scalar(rng);
        let commitment = EdwardsPoint::GENERATOR * r;
        let c = ecdh_challenge(usage, &commitment, publics, message);

        let lambda = reduce_64(&c);
        let mut t = lambda;
        let mut v = r;
        for secret in secrets {
            v = v + *secret * t;
            t = t * lambda;
        }

        Ok(Self { c, v })
    }

    /// Check the proof against the batch of public values.
    pub fn verify(&self, publics: &[EdwardsPoint], message: &[u8], usage: u8) -> bool {
        if publics.is_empty() {
            return false;
        }

        let lambda = reduce_64(&self.c);
        let mut t = lambda;
        let mut folded = EdwardsPoint::IDENTITY;
        for public in publics {
            folded = folded + public * t;
            t = t * lambda;
        }

        let commitment = EdwardsPoint::GENERATOR * self.v - folded;
        ecdh_challenge(usage, &commitment, publics, message) == self.c
    }

    /// `c ‖ v` — exactly [`ECDH_PROOF_BYTES`] bytes.
    pub fn to_bytes(&self) -> [u8; ECDH_PROOF_BYTES] {
        let mut out = [0u8; ECDH_PROOF_BYTES];
        out[..PROOF_C_BYTES].copy_from_slice(&self.c);
        out[PROOF_C_BYTES..].copy_from_slice(&scalar_to_bytes(&self.v));
        out
    }

    /// Parse from a buffer; returns the proof and bytes consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), CryptoError> {
        if bytes.len() < ECDH_PROOF_BYTES {
            return Err(CryptoError::TruncatedInput);
        }
        let mut c = [0u8; PROOF_C_BYTES];
        c.copy_from_slice(&bytes[..PROOF_C_BYTES]);
        let mut scalar = [0u8; ED448_SCALAR_BYTES];
        scalar.copy_from_slice(&bytes[PROOF_C_BYTES..ECDH_PROOF_BYTES]);
        let v = scalar_from_bytes(&scalar)?;
        Ok((Self { c, v }, ECDH_PROOF_BYTES))
    }
}

fn mpi_prefixed(value: &BigUint) -> Vec<u8> {
    let magnitude = dh::mpi_bytes(value);
    let mut out = Vec::with_capacity(4 + magnitude.len());
    out.extend_from_slice(&(magnitude.len() as u32).to_be_bytes());
    out.extend_from_slice(&magnitude);
    out
}

fn dh_challenge(
    usage: u8,
    commitment: &BigUint,
    publics: &[&BigUint],
    message: &[u8],
) -> [u8; PROOF_C_BYTES] {
    let mut inputs: Vec<Vec<u8>> = Vec::with_capacity(publics.len() + 2);
    inputs.push(mpi_prefixed(commitment));
    for public in publics {
        inputs.push(mpi_prefixed(public));
    }
    inputs.push(message.to_vec());
    let borrowed: Vec<&[u8]> = inputs.iter().map(|v| v.as_slice()).collect();
    let mut c = [0u8; PROOF_C_BYTES];
    kdf(PREKEY_SERVER_DOMAIN, usage, &borrowed, &mut c);
    c
}

fn dh_lambda(c: &[u8; PROOF_C_BYTES]) -> BigUint {
    BigUint::from_bytes_be(c) % &*dh::SUBGROUP_ORDER
}

impl DhProof {
    pub fn generate(
        rng: &mut dyn RandomSource,
        secrets: &[&BigUint],
        publics: &[&BigUint],
        message: &[u8],
        usage: u8,
    ) -> Result<Self, CryptoError> {
        if secrets.is_empty() || secrets.len() != publics.len() {
            return Err(CryptoError::EmptyProof);
        }

        let q = &*dh::SUBGROUP_ORDER;
        let r = BigUint::from_bytes_be(&random_dh_exponent(rng)) % q;
        let commitment = dh::exponentiate(&r);
        let c = dh_challenge(usage, &commitment, publics, message);

        let lambda = dh_lambda(&c);
        let mut t = lambda.clone();
        let mut v = r;
        for secret in secrets {
            v = (v + (*secret % q) * &t) % q;
            t = (&t * &lambda) % q;
        }

        Ok(Self { c, v })
    }

    pub fn verify(&self, publics: &[&BigUint], message: &[u8], usage: u8) -> bool {
        if publics.is_empty() {
            return false;
        }

        let p = &*dh::MODULUS;
        let q = &*dh::SUBGROUP_ORDER;
        let lambda = dh_lambda(&self.c);

        // A = g^v * prod(P_i^(q - t_i)); P_i^q == 1 in the subgroup, so the
        // negated exponent is the inverse.
        let mut t = lambda.clone();
        let mut folded = BigUint::from(1u8);
        for public in publics {
            let neg = (q - &t % q) % q;
            folded = folded * public.modpow(&neg, p) % p;
            t = (&t * &lambda) % q;
        }
        let commitment = dh::exponentiate(&self.v) * folded % p;

        dh_challenge(usage, &commitment, publics, message) == self.c
    }

    /// `c ‖ MPI(v)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PROOF_C_BYTES + 4 + DH_MPI_MAX);
        out.extend_from_slice(&self.c);
        out.extend_from_slice(&mpi_prefixed(&self.v));
        out
    }

    /// Parse from a buffer; returns the proof and bytes consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), CryptoError> {
        if bytes.len() < PROOF_C_BYTES + 4 {
            return Err(CryptoError::TruncatedInput);
        }
        let mut c = [0u8; PROOF_C_BYTES];
        c.copy_from_slice(&bytes[..PROOF_C_BYTES]);
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&bytes[PROOF_C_BYTES..PROOF_C_BYTES + 4]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        let rest = &bytes[PROOF_C_BYTES + 4..];
        if len > DH_MPI_MAX || rest.len() < len {
            return Err(CryptoError::TruncatedInput);
        }
        let v = BigUint::from_bytes_be(&rest[..len]);
        Ok((Self { c, v }, PROOF_C_BYTES + 4 + len))
    }
}

/// Upper bound on a serialized DH MPI magnitude.
pub const DH_MPI_MAX: usize = dh::DH3072_MOD_BYTES;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed448::Keypair;
    use crate::random::SystemRandom;
    use crate::shake::usage;

    fn test_message() -> [u8; 64] {
        let mut m = [0u8; 64];
        m[0] = 0x01;
        m[1] = 0x02;
        m[2] = 0x03;
        m
    }

    #[test]
    fn ecdh_proof_generation_and_validation() {
        let mut rng = SystemRandom;
        let pairs: Vec<Keypair> = (0..3).map(|_| Keypair::generate(&mut rng)).collect();
        let secrets: Vec<&EdwardsScalar> = pairs.iter().map(|k| k.secret()).collect();
        let publics: Vec<EdwardsPoint> = pairs.iter().map(|k| *k.public()).collect();
        let m = test_message();
        let mut m2 = m;
        m2[0..3].copy_from_slice(&[0x03, 0x02, 0x01]);

        let proof = EcdhProof::generate(
            &mut rng,
            &secrets,
            &publics,
            &m,
            usage::PROOF_MESSAGE_ECDH,
        )
        .unwrap();

        assert!(proof.verify(&publics, &m, usage::PROOF_MESSAGE_ECDH));
        assert!(!proof.verify(&publics, &m, usage::PROOF_MESSAGE_DH));
        assert!(!proof.verify(&publics, &m2, usage::PROOF_MESSAGE_ECDH));

        let mut swapped = publics.clone();
        swapped[1] = *Keypair::generate(&mut rng).public();
        assert!(!proof.verify(&swapped, &m, usage::PROOF_MESSAGE_ECDH));
    }

    #[test]
    fn dh_proof_generation_and_validation() {
        let mut rng = SystemRandom;
        let pairs: Vec<crate::dh::DhKeypair> =
            (0..3).map(|_| crate::dh::DhKeypair::generate(&mut rng)).collect();
        let secrets: Vec<&BigUint> = pairs.iter().map(|k| k.secret()).collect();
        let publics: Vec<&BigUint> = pairs.iter().map(|k| k.public()).collect();
        let m = test_message();
        let mut m2 = m;
        m2[0..3].copy_from_slice(&[0x03, 0x02, 0x01]);

        let proof =
            DhProof::generate(&mut rng, &secrets, &publics, &m, usage::PROOF_MESSAGE_DH).unwrap();

        assert!(proof.verify(&publics, &m, usage::PROOF_MESSAGE_DH));
        assert!(!proof.verify(&publics, &m, usage::PROOF_MESSAGE_ECDH));
        assert!(!proof.verify(&publics, &m2, usage::PROOF_MESSAGE_DH));

        let outsider = crate::dh::DhKeypair::generate(&mut rng);
        let mut swapped: Vec<&BigUint> = publics.clone();
        swapped[1] = outsider.public();
        assert!(!proof.verify(&swapped, &m, usage::PROOF_MESSAGE_DH));
    }

    #[test]
    fn ecdh_proof_serialization() {
        // c = 0x42, 63 zeroes, 0x53; v is a fixed canonical scalar.
        let v_bytes: [u8; 56] = [
            0x4b, 0x40, 0xab, 0xd6, 0x50, 0x08, 0x1d, 0x77, 0x53, 0x8b, 0x10, 0x93, 0x79, 0x64,
            0x00, 0x41, 0x12, 0x64, 0xb1, 0x2d, 0x28, 0xf4, 0x5b, 0x6b, 0xfc, 0x47, 0x0e, 0xd3,
            0x27, 0xa6, 0x5e, 0x2f, 0x5f, 0x24, 0xe4, 0xc0, 0x5a, 0x3f, 0x9c, 0xf6, 0x1f, 0x50,
            0x55, 0x6e, 0x4c, 0xd0, 0xa0, 0xe6, 0xf6, 0xe1, 0xf4, 0xe1, 0x2a, 0x29, 0xc6, 0x20,
        ];
        let mut c = [0u8; 64];
        c[0] = 0x42;
        c[63] = 0x53;

        let proof = EcdhProof {
            c,
            v: scalar_from_bytes(&v_bytes).unwrap(),
        };

        let mut expected = [0u8; ECDH_PROOF_BYTES];
        expected[0] = 0x42;
        expected[63] = 0x53;
        expected[64..].copy_from_slice(&v_bytes);

        let written = proof.to_bytes();
        assert_eq!(written.len(), 120);
        assert_eq!(written, expected);
    }

    #[test]
    fn ecdh_proof_deserialization() {
        let mut data = [0u8; ECDH_PROOF_BYTES + 2];
        data[0] = 0x42;
        data[63] = 0x53;
        let v_bytes: [u8; 56] = {
            let mut b = [0u8; 56];
            b[0] = 0x4b;
            b[1] = 0x40;
            b
        };
        data[64..120].copy_from_slice(&v_bytes);
        data[120] = 0x00;
        data[121] = 0x01;

        let (proof, read) = EcdhProof::from_bytes(&data).unwrap();
        assert_eq!(read, 120);
        assert_eq!(proof.c[0], 0x42);
        assert_eq!(proof.c[63], 0x53);
        assert_eq!(proof.v, scalar_from_bytes(&v_bytes).unwrap());
    }

    #[test]
    fn dh_proof_serialization() {
        // v has big-endian magnitude 0x0142 followed by 77 zero bytes
        // inside an 80-byte field, so the MPI length is 79.
        let mut v_data = [0u8; 80];
        v_data[1] = 0x01;
        v_data[2] = 0x42;
        let mut c = [0u8; 64];
        c[0] = 0x42;
        c[63] = 0x53;

        let proof = DhProof {
            c,
            v: BigUint::from_bytes_be(&v_data),
        };

        let written = proof.to_bytes();
        assert_eq!(written.len(), 147);

        let mut expected = vec![0u8; 147];
        expected[0] = 0x42;
        expected[63] = 0x53;
        expected[64..68].copy_from_slice(&[0x00, 0x00, 0x00, 0x4f]);
        expected[68] = 0x01;
        expected[69] = 0x42;
        assert_eq!(written, expected);
    }

    #[test]
    fn dh_proof_deserialization() {
        let mut v_data = [0u8; 80];
        v_data[1] = 0x01;
        v_data[2] = 0x42;
        let proof = DhProof {
            c: {
                let mut c = [0u8; 64];
                c[0] = 0x42;
                c[63] = 0x53;
                c
            },
            v: BigUint::from_bytes_be(&v_data),
        };

        let mut data = proof.to_bytes();
        data.push(0x42); // trailing garbage must be left unread
        let (back, read) = DhProof::from_bytes(&data).unwrap();
        assert_eq!(read, 147);
        assert_eq!(back, proof);
    }

    #[test]
    fn dh_proof_with_fixed_randomness() {
        let mut fixed = crate::random::testing::FixedRandom::new(0x13);
        let pairs: Vec<crate::dh::DhKeypair> = (0..3)
            .map(|i| {
                let mut seed = [0u8; 80];
                seed[0] = 0x22 * (i as u8 + 1);
                seed[1] = 0x01;
                seed[2] = 0x42;
                crate::dh::DhKeypair::from_seed(seed)
            })
            .collect();
        let secrets: Vec<&BigUint> = pairs.iter().map(|k| k.secret()).collect();
        let publics: Vec<&BigUint> = pairs.iter().map(|k| k.public()).collect();
        let m = test_message();

        let proof =
            DhProof::generate(&mut fixed, &secrets, &publics, &m, usage::PROOF_MESSAGE_DH).unwrap();
        assert!(proof.verify(&publics, &m, usage::PROOF_MESSAGE_DH));
    }
}
