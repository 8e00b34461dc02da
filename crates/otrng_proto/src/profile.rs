//! Client and prekey profiles.
//!
//! A client profile is a signed self-description of a user's long-term
//! identity: an ordered set of typed fields (u32 field count, then
//! `(u16 type, payload)` pairs) terminated by a 114-byte ed448 signature
//! over exactly the serialized field body. The prekey profile binds a
//! shared prekey to the same long-term key with a plain (untyped) layout.
//!
//! Profiles are *valid* when the signature verifies, the instance tag
//! matches the consumer's expectation, the versions string stays inside
//! {'3','4'} and the expiration lies in the future (plus a caller-chosen
//! grace window).

use chrono::Utc;
use ed448_goldilocks::EdwardsPoint;

use otrng_crypto::ed448::Keypair;
use otrng_crypto::eddsa::{self, EdSignature, ED448_SIGNATURE_BYTES};

use crate::error::ProtoError;
use crate::wire::{Decoder, Encoder};

/// Smallest valid instance tag.
pub const MIN_INSTANCE_TAG: u32 = 0x0000_0100;

/// Length of an OTRv3 transitional signature.
pub const TRANSITIONAL_SIG_BYTES: usize = 40;

// Typed-field tags.
const FIELD_INSTANCE_TAG: u16 = 0x0001;
const FIELD_PUBLIC_KEY: u16 = 0x0002;
const FIELD_FORGING_KEY: u16 = 0x0003;
const FIELD_VERSIONS: u16 = 0x0004;
const FIELD_EXPIRATION: u16 = 0x0005;
const FIELD_DSA_KEY: u16 = 0x0006;
const FIELD_TRANSITIONAL_SIGNATURE: u16 = 0x0007;

// Two-byte key-type prefixes carried in front of serialized points.
pub const ED448_PUBKEY_TYPE: u16 = 0x0010;
pub const ED448_SHARED_PREKEY_TYPE: u16 = 0x0011;
pub const ED448_FORGING_KEY_TYPE: u16 = 0x0012;

fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn versions_in_alphabet(versions: &str) -> bool {
    !versions.is_empty() && versions.chars().all(|c| c == '3' || c == '4')
}

// ── Client profile ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub instance_tag: u32,
    pub long_term_key: EdwardsPoint,
    pub forging_key: EdwardsPoint,
    pub versions: String,
    /// Unix seconds.
    pub expires: u64,
    /// Raw OTRv3 DSA key field payload (key type word plus four MPIs),
    /// carried opaquely for v3 bridging layers.
    pub legacy_dsa_key: Option<Vec<u8>>,
    pub transitional_signature: Option<[u8; TRANSITIONAL_SIG_BYTES]>,
    signature: EdSignature,
}

impl ClientProfile {
    /// Build and sign a profile with the owning long-term keypair.
    pub fn build(
        instance_tag: u32,
        versions: &str,
        keypair: &Keypair,
        forging_key: &EdwardsPoint,
        expires: u64,
    ) -> Result<Self, ProtoError> {
        if instance_tag < MIN_INSTANCE_TAG {
            return Err(ProtoError::ProfileValidation("instance tag below minimum"));
        }
        if !versions_in_alphabet(versions) {
            return Err(ProtoError::ProfileValidation(
                "versions must be a non-empty string over {3,4}",
            ));
        }

        let mut profile = Self {
            instance_tag,
            long_term_key: *keypair.public(),
            forging_key: *forging_key,
            versions: versions.to_string(),
            expires,
            legacy_dsa_key: None,
            transitional_signature: None,
            signature: EdSignature::from_bytes([0u8; ED448_SIGNATURE_BYTES]),
        };
        profile.signature = eddsa::sign(keypair, &profile.serialize_body());
        Ok(profile)
    }

    fn field_count(&self) -> u32 {
        5 + self.legacy_dsa_key.is_some() as u32 + self.transitional_signature.is_some() as u32
    }

    /// The signed portion: field count and every typed field.
    pub fn serialize_body(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_u32(self.field_count());

        enc.write_u16(FIELD_INSTANCE_TAG).write_u32(self.instance_tag);
        enc.write_u16(FIELD_PUBLIC_KEY)
            .write_u16(ED448_PUBKEY_TYPE)
            .write_point(&self.long_term_key);
        enc.write_u16(FIELD_FORGING_KEY)
            .write_u16(ED448_FORGING_KEY_TYPE)
            .write_point(&self.forging_key);
        enc.write_u16(FIELD_VERSIONS)
            .write_data(self.versions.as_bytes());
        enc.write_u16(FIELD_EXPIRATION).write_u64(self.expires);

        if let Some(dsa) = &self.legacy_dsa_key {
            enc.write_u16(FIELD_DSA_KEY).write_bytes(dsa);
        }
        if let Some(sig) = &self.transitional_signature {
            enc.write_u16(FIELD_TRANSITIONAL_SIGNATURE).write_bytes(sig);
        }

        enc.into_bytes()
    }

    /// Body plus the trailing signature.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.serialize_body();
        out.extend_from_slice(self.signature.as_bytes());
        out
    }

    pub fn deserialize(dec: &mut Decoder<'_>) -> Result<Self, ProtoError> {
        let field_count = dec.read_u32()?;
        if field_count < 5 || field_count > 7 {
            return Err(ProtoError::MalformedInput("client profile field count"));
        }

        let mut instance_tag = None;
        let mut long_term_key = None;
        let mut forging_key = None;
        let mut versions = None;
        let mut expires = None;
        let mut legacy_dsa_key = None;
        let mut transitional_signature = None;

        for _ in 0..field_count {
            match dec.read_u16()? {
                FIELD_INSTANCE_TAG => instance_tag = Some(dec.read_u32()?),
                FIELD_PUBLIC_KEY => {
                    if dec.read_u16()? != ED448_PUBKEY_TYPE {
                        return Err(ProtoError::MalformedInput("public key type"));
                    }
                    long_term_key = Some(dec.read_point()?);
                }
                FIELD_FORGING_KEY => {
                    if dec.read_u16()? != ED448_FORGING_KEY_TYPE {
                        return Err(ProtoError::MalformedInput("forging key type"));
                    }
                    forging_key = Some(dec.read_point()?);
                }
                FIELD_VERSIONS => {
                    let raw = dec.read_data()?;
                    let text = core::str::from_utf8(raw)
                        .map_err(|_| ProtoError::MalformedInput("versions not ascii"))?;
                    versions = Some(text.to_string());
                }
                FIELD_EXPIRATION => expires = Some(dec.read_u64()?),
                FIELD_DSA_KEY => {
                    // Key type word plus four MPIs, captured verbatim.
                    let start = dec.consumed();
                    dec.read_u16()?;
                    for _ in 0..4 {
                        dec.read_data()?;
                    }
                    legacy_dsa_key = Some(dec.slice_between(start, dec.consumed()).to_vec());
                }
                FIELD_TRANSITIONAL_SIGNATURE => {
                    let raw = dec.read_bytes(TRANSITIONAL_SIG_BYTES)?;
                    let mut fixed = [0u8; TRANSITIONAL_SIG_BYTES];
                    fixed.copy_from_slice(raw);
                    transitional_signature = Some(fixed);
                }
                _ => return Err(ProtoError::MalformedInput("unknown profile field")),
            }
        }

        let mut sig = [0u8; ED448_SIGNATURE_BYTES];
        sig.copy_from_slice(dec.read_bytes(ED448_SIGNATURE_BYTES)?);

        Ok(Self {
            instance_tag: instance_tag
                .ok_or(ProtoError::MalformedInput("missing instance tag field"))?,
            long_term_key: long_term_key
                .ok_or(ProtoError::MalformedInput("missing public key field"))?,
            forging_key: forging_key
                .ok_or(ProtoError::MalformedInput("missing forging key field"))?,
            versions: versions.ok_or(ProtoError::MalformedInput("missing versions field"))?,
            expires: expires.ok_or(ProtoError::MalformedInput("missing expiration field"))?,
            legacy_dsa_key,
            transitional_signature,
            signature: EdSignature::from_bytes(sig),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        Self::deserialize(&mut dec)
    }

    /// Check the trailing signature against the profile's own long-term key.
    pub fn verify_signature(&self) -> Result<(), ProtoError> {
        eddsa::verify(&self.long_term_key, &self.serialize_body(), &self.signature)
            .map_err(|_| ProtoError::ProfileValidation("signature does not verify"))
    }

    pub fn expired_at(&self, now: u64, extra_valid_time: u64) -> bool {
        now > self.expires.saturating_add(extra_valid_time)
    }

    /// Full §-validity at an explicit clock, for deterministic tests.
    pub fn validate_at(
        &self,
        expected_instance_tag: u32,
        extra_valid_time: u64,
        now: u64,
    ) -> Result<(), ProtoError> {
        self.verify_signature()?;
        if self.instance_tag < MIN_INSTANCE_TAG || self.instance_tag != expected_instance_tag {
            return Err(ProtoError::ProfileValidation("instance tag mismatch"));
        }
        if !versions_in_alphabet(&self.versions) {
            return Err(ProtoError::ProfileValidation("versions outside {3,4}"));
        }
        if self.expired_at(now, extra_valid_time) {
            return Err(ProtoError::ProfileValidation("profile expired"));
        }
        Ok(())
    }

    /// Full validity against the current clock.
    pub fn validate(
        &self,
        expected_instance_tag: u32,
        extra_valid_time: u64,
    ) -> Result<(), ProtoError> {
        self.validate_at(expected_instance_tag, extra_valid_time, now_unix())
    }
}

// ── Prekey profile ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PrekeyProfile {
    pub instance_tag: u32,
    /// Unix seconds.
    pub expires: u64,
    pub shared_prekey: EdwardsPoint,
    signature: EdSignature,
}

impl PrekeyProfile {
    /// Build and sign with the same long-term keypair that signs the client
    /// profile.
    pub fn build(
        instance_tag: u32,
        expires: u64,
        shared_prekey: &EdwardsPoint,
        keypair: &Keypair,
    ) -> Result<Self, ProtoError> {
        if instance_tag < MIN_INSTANCE_TAG {
            return Err(ProtoError::ProfileValidation("instance tag below minimum"));
        }

        let mut profile = Self {
            instance_tag,
            expires,
            shared_prekey: *shared_prekey,
            signature: EdSignature::from_bytes([0u8; ED448_SIGNATURE_BYTES]),
        };
        profile.signature = eddsa::sign(keypair, &profile.serialize_body());
        Ok(profile)
    }

    pub fn serialize_body(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_u32(self.instance_tag)
            .write_u64(self.expires)
            .write_u16(ED448_SHARED_PREKEY_TYPE)
            .write_point(&self.shared_prekey);
        enc.into_bytes()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.serialize_body();
        out.extend_from_slice(self.signature.as_bytes());
        out
    }

    pub fn deserialize(dec: &mut Decoder<'_>) -> Result<Self, ProtoError> {
        let instance_tag = dec.read_u32()?;
        let expires = dec.read_u64()?;
        if dec.read_u16()? != ED448_SHARED_PREKEY_TYPE {
            return Err(ProtoError::MalformedInput("shared prekey type"));
        }
        let shared_prekey = dec.read_point()?;
        let mut sig = [0u8; ED448_SIGNATURE_BYTES];
        sig.copy_from_slice(dec.read_bytes(ED448_SIGNATURE_BYTES)?);
        Ok(Self {
            instance_tag,
            expires,
            shared_prekey,
            signature: EdSignature::from_bytes(sig),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        Self::deserialize(&mut dec)
    }

    /// Verify against the owning long-term public key (the invariant is
    /// that it is the same key the client profile carries).
    pub fn verify_signature(&self, long_term_key: &EdwardsPoint) -> Result<(), ProtoError> {
        eddsa::verify(long_term_key, &self.serialize_body(), &self.signature)
            .map_err(|_| ProtoError::ProfileValidation("signature does not verify"))
    }

    pub fn validate_at(
        &self,
        expected_instance_tag: u32,
        long_term_key: &EdwardsPoint,
        extra_valid_time: u64,
        now: u64,
    ) -> Result<(), ProtoError> {
        self.verify_signature(long_term_key)?;
        if self.instance_tag != expected_instance_tag {
            return Err(ProtoError::ProfileValidation("instance tag mismatch"));
        }
        if now > self.expires.saturating_add(extra_valid_time) {
            return Err(ProtoError::ProfileValidation("profile expired"));
        }
        Ok(())
    }

    pub fn validate(
        &self,
        expected_instance_tag: u32,
        long_term_key: &EdwardsPoint,
        extra_valid_time: u64,
    ) -> Result<(), ProtoError> {
        self.validate_at(expected_instance_tag, long_term_key, extra_valid_time, now_unix())
    }
}
