//! Long-term key fingerprints.

use ed448_goldilocks::EdwardsPoint;

use crate::ed448::point_to_bytes;
use crate::shake::{kdf, usage, OTRV4_DOMAIN};

/// Fingerprint length in bytes (112 hex characters displayed).
pub const FINGERPRINT_BYTES: usize = 56;

/// SHAKE-256 fingerprint of a long-term public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint([u8; FINGERPRINT_BYTES]);

impl Fingerprint {
    pub fn of(public: &EdwardsPoint) -> Self {
        let serialized = point_to_bytes(public);
        let mut out = [0u8; FINGERPRINT_BYTES];
        kdf(OTRV4_DOMAIN, usage::FINGERPRINT, &[&serialized], &mut out);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        &self.0
    }
}

impl core::fmt::Display for Fingerprint {
    /// Hex in groups of eight characters, the form shown to users for
    /// manual comparison.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let hex = hex::encode(self.0);
        for (i, chunk) in hex.as_bytes().chunks(8).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", core::str::from_utf8(chunk).expect("hex is ascii"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed448::Keypair;
    use crate::random::SystemRandom;

    #[test]
    fn distinct_keys_distinct_fingerprints() {
        let mut rng = SystemRandom;
        let a = Fingerprint::of(Keypair::generate(&mut rng).public());
        let b = Fingerprint::of(Keypair::generate(&mut rng).public());
        assert_ne!(a, b);
    }

    #[test]
    fn display_groups_hex() {
        let mut rng = SystemRandom;
        let fp = Fingerprint::of(Keypair::generate(&mut rng).public());
        let shown = fp.to_string();
        // 112 hex chars in 14 groups of 8, 13 separating spaces.
        assert_eq!(shown.len(), 112 + 13);
        assert_eq!(shown.split(' ').count(), 14);
    }
}
