//! Domain-separated SHAKE-256 key derivation.
//!
//! Every hash in the prekey protocol is a single SHAKE-256 invocation that
//! first absorbs a fixed ASCII domain string, then a one-byte usage tag,
//! then the actual inputs in order. Two derivations with different usage
//! tags are independent even over identical inputs, which is what lets one
//! primitive serve as KDF, MAC and challenge hash.

use ed448_goldilocks::{EdwardsScalar, WideEdwardsScalarBytes};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

/// Domain string for the prekey-server protocol.
pub const PREKEY_SERVER_DOMAIN: &[u8] = b"OTR-Prekey-Server";

/// Domain string for fingerprints and other base-protocol hashes.
pub const OTRV4_DOMAIN: &[u8] = b"OTRv4";

/// Usage-tag registry. Tags are wire-protocol constants; the pairs 0x02-0x04
/// and 0x05-0x07 are the DAKE2 (verify) and DAKE3 (sign) transcript sides.
pub mod usage {
    pub const FINGERPRINT: u8 = 0x00;
    pub const SHARED_SECRET: u8 = 0x01;
    pub const DAKE2_CLIENT_PROFILE: u8 = 0x02;
    pub const DAKE2_COMPOSITE_IDENTITY: u8 = 0x03;
    pub const DAKE2_COMPOSITE_PHI: u8 = 0x04;
    pub const DAKE3_CLIENT_PROFILE: u8 = 0x05;
    pub const DAKE3_COMPOSITE_IDENTITY: u8 = 0x06;
    pub const DAKE3_COMPOSITE_PHI: u8 = 0x07;
    pub const PREKEY_MAC_KEY: u8 = 0x08;
    pub const PUBLICATION_MAC: u8 = 0x09;
    pub const STORAGE_INFO_MAC: u8 = 0x0A;
    pub const STORAGE_STATUS_MAC: u8 = 0x0B;
    pub const SUCCESS_MAC: u8 = 0x0C;
    pub const FAILURE_MAC: u8 = 0x0D;
    pub const PREKEY_MESSAGES_HASH: u8 = 0x0E;
    pub const CLIENT_PROFILE_HASH: u8 = 0x0F;
    pub const PREKEY_PROFILE_HASH: u8 = 0x10;
    pub const AUTH_RING_SIG: u8 = 0x11;
    pub const PROOF_CONTEXT: u8 = 0x12;
    pub const PROOF_MESSAGE_ECDH: u8 = 0x13;
    pub const PROOF_MESSAGE_DH: u8 = 0x14;
    pub const PROOF_SHARED_ECDH: u8 = 0x15;
}

/// `KDF(domain, usage, inputs...)` squeezed to `out.len()` bytes.
pub fn kdf(domain: &[u8], usage: u8, inputs: &[&[u8]], out: &mut [u8]) {
    let mut hasher = Shake256::default();
    hasher.update(domain);
    hasher.update(&[usage]);
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize_xof().read(out);
}

/// Convenience form returning an owned buffer.
pub fn kdf_vec(domain: &[u8], usage: u8, inputs: &[&[u8]], out_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; out_len];
    kdf(domain, usage, inputs, &mut out);
    out
}

/// Prekey-server KDF with the standard 64-byte output.
pub fn kdf64(usage: u8, inputs: &[&[u8]]) -> [u8; 64] {
    let mut out = [0u8; 64];
    kdf(PREKEY_SERVER_DOMAIN, usage, inputs, &mut out);
    out
}

/// Hash to an ed448 scalar: squeeze 64 bytes, interpret little-endian, and
/// reduce wide mod the group order.
pub fn hash_to_scalar(domain: &[u8], usage: u8, inputs: &[&[u8]]) -> EdwardsScalar {
    let mut squeezed = [0u8; 64];
    kdf(domain, usage, inputs, &mut squeezed);
    reduce_64(&squeezed)
}

/// Reduce a 64-byte little-endian value mod the ed448 group order.
pub fn reduce_64(bytes: &[u8; 64]) -> EdwardsScalar {
    let mut wide = WideEdwardsScalarBytes::default();
    wide[..64].copy_from_slice(bytes);
    EdwardsScalar::from_bytes_mod_order_wide(&wide)
}
