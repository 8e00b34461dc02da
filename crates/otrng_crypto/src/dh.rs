//! 3072-bit MODP Diffie-Hellman (RFC 3526 group 15, generator 2).
//!
//! Private exponents are 80 random bytes. Public keys travel as OTR MPIs
//! (minimal big-endian magnitude); received values must satisfy
//! `2 <= y <= p - 2`.
//!
//! `BigUint` buffers cannot be scrubbed in place, so the canonical 80-byte
//! exponent seed is the value held under `Zeroizing`; the derived integers
//! are reset on drop as a best effort.

use std::sync::LazyLock;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::random::{random_dh_exponent, RandomSource, DH_EXPONENT_BYTES};

/// Modulus size in bytes.
pub const DH3072_MOD_BYTES: usize = 384;

const MODULUS_HEX: &[u8] = b"\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33\
A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7\
ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864\
D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2\
08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A93AD2CAFFFFFFFFFFFFFFFF";

/// The group modulus p.
pub static MODULUS: LazyLock<BigUint> =
    LazyLock::new(|| BigUint::parse_bytes(MODULUS_HEX, 16).expect("modulus constant parses"));

/// Order of the prime-order subgroup: q = (p - 1) / 2.
pub static SUBGROUP_ORDER: LazyLock<BigUint> =
    LazyLock::new(|| (&*MODULUS - BigUint::one()) >> 1usize);

/// The generator g = 2.
pub fn generator() -> BigUint {
    BigUint::from(2u8)
}

/// `g^exponent mod p`.
pub fn exponentiate(exponent: &BigUint) -> BigUint {
    generator().modpow(exponent, &MODULUS)
}

/// Range check for a received public key: `2 <= y <= p - 2`.
pub fn valid_public_key(y: &BigUint) -> bool {
    let two = BigUint::from(2u8);
    *y >= two && *y <= &*MODULUS - two
}

/// A DH keypair over the 3072-bit group.
pub struct DhKeypair {
    seed: Zeroizing<[u8; DH_EXPONENT_BYTES]>,
    secret: BigUint,
    public: BigUint,
}

impl DhKeypair {
    /// Generate a keypair from 80 bytes of fresh randomness.
    pub fn generate(rng: &mut dyn RandomSource) -> Self {
        Self::from_seed(random_dh_exponent(rng))
    }

    /// Deterministic construction from an exponent seed.
    pub fn from_seed(seed: [u8; DH_EXPONENT_BYTES]) -> Self {
        let secret = BigUint::from_bytes_be(&seed);
        let public = exponentiate(&secret);
        Self {
            seed: Zeroizing::new(seed),
            secret,
            public,
        }
    }

    pub fn secret(&self) -> &BigUint {
        &self.secret
    }

    /// The canonical 80-byte exponent seed, for persistence layers.
    pub fn exponent_seed(&self) -> &[u8; DH_EXPONENT_BYTES] {
        &self.seed
    }

    pub fn public(&self) -> &BigUint {
        &self.public
    }

    /// `their_pub^secret mod p` after range-checking the peer value.
    pub fn shared_secret(&self, their_public: &BigUint) -> Result<BigUint, CryptoError> {
        if !valid_public_key(their_public) {
            return Err(CryptoError::DhPublicKeyRange);
        }
        Ok(their_public.modpow(&self.secret, &MODULUS))
    }
}

impl Drop for DhKeypair {
    fn drop(&mut self) {
        self.secret.set_zero();
        self.public.set_zero();
    }
}

impl core::fmt::Debug for DhKeypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DhKeypair")
            .field("public_bits", &self.public.bits())
            .finish_non_exhaustive()
    }
}

/// Minimal big-endian magnitude for the MPI codec. Zero encodes as a single
/// zero byte.
pub fn mpi_bytes(value: &BigUint) -> Vec<u8> {
    value.to_bytes_be()
}
