//! Prekey-server message types.
//!
//! Every payload starts with the version-4 framing header. The client
//! serialises DAKE1/DAKE3 and the standalone retrieval query, and parses
//! DAKE2 and the authenticated server replies; the opposite directions are
//! implemented too so protocol tests can stand in for the server.

use ed448_goldilocks::EdwardsPoint;
use num_bigint::BigUint;

use otrng_crypto::rsig::RingSignature;

use crate::codec::{parse_header, PROTOCOL_VERSION};
use crate::error::ProtoError;
use crate::profile::{ClientProfile, ED448_PUBKEY_TYPE};
use crate::wire::{Decoder, Encoder};

/// Message type bytes.
pub mod msg_type {
    pub const FAILURE: u8 = 0x05;
    pub const SUCCESS: u8 = 0x06;
    pub const PUBLICATION: u8 = 0x08;
    pub const STORAGE_INFO_REQUEST: u8 = 0x09;
    pub const STORAGE_STATUS: u8 = 0x0B;
    pub const PREKEY_MESSAGE: u8 = 0x0F;
    pub const ENSEMBLE_QUERY_RETRIEVAL: u8 = 0x10;
    pub const DAKE1: u8 = 0x35;
    pub const DAKE2: u8 = 0x36;
    pub const DAKE3: u8 = 0x37;
}

/// MAC length on authenticated replies.
pub const MAC_BYTES: usize = 64;

fn write_header(enc: &mut Encoder, message_type: u8) {
    enc.write_u16(PROTOCOL_VERSION).write_u8(message_type);
}

fn expect_type(dec: &mut Decoder<'_>, expected: u8) -> Result<(), ProtoError> {
    let message_type = parse_header(dec)?;
    if message_type != expected {
        return Err(ProtoError::MalformedInput("unexpected message type"));
    }
    Ok(())
}

/// `data(server_identity) ‖ ED448-PUBKEY(server long-term)` — the server's
/// composite identity exactly as carried in DAKE2.
pub fn composite_identity(server_identity: &[u8], server_pub_key: &EdwardsPoint) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.write_data(server_identity)
        .write_u16(ED448_PUBKEY_TYPE)
        .write_point(server_pub_key);
    enc.into_bytes()
}

// ── DAKE1 ────────────────────────────────────────────────────────────────────

/// Client → server: instance tag, client profile, ephemeral `I`.
#[derive(Debug, Clone)]
pub struct Dake1 {
    pub client_instance_tag: u32,
    pub client_profile: ClientProfile,
    pub i: EdwardsPoint,
}

impl Dake1 {
    pub fn serialize(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        write_header(&mut enc, msg_type::DAKE1);
        enc.write_u32(self.client_instance_tag)
            .write_bytes(&self.client_profile.serialize())
            .write_point(&self.i);
        enc.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        expect_type(&mut dec, msg_type::DAKE1)?;
        let client_instance_tag = dec.read_u32()?;
        let client_profile = ClientProfile::deserialize(&mut dec)?;
        let i = dec.read_point()?;
        Ok(Self {
            client_instance_tag,
            client_profile,
            i,
        })
    }
}

// ── DAKE2 ────────────────────────────────────────────────────────────────────

/// Server → client: composite identity, ephemeral `S`, ring signature.
#[derive(Debug, Clone)]
pub struct Dake2 {
    pub client_instance_tag: u32,
    pub server_identity: Vec<u8>,
    pub server_pub_key: EdwardsPoint,
    /// Raw `data(server_identity) ‖ ED448-PUBKEY` bytes, kept verbatim for
    /// the transcript hash.
    pub composite_identity: Vec<u8>,
    pub s: EdwardsPoint,
    pub sigma: RingSignature,
}

impl Dake2 {
    pub fn new(
        client_instance_tag: u32,
        server_identity: &[u8],
        server_pub_key: EdwardsPoint,
        s: EdwardsPoint,
        sigma: RingSignature,
    ) -> Self {
        Self {
            client_instance_tag,
            server_identity: server_identity.to_vec(),
            composite_identity: composite_identity(server_identity, &server_pub_key),
            server_pub_key,
            s,
            sigma,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        write_header(&mut enc, msg_type::DAKE2);
        enc.write_u32(self.client_instance_tag)
            .write_bytes(&self.composite_identity)
            .write_point(&self.s)
            .write_ring_sig(&self.sigma);
        enc.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        expect_type(&mut dec, msg_type::DAKE2)?;
        let client_instance_tag = dec.read_u32()?;

        let composite_start = dec.consumed();
        let server_identity = dec.read_data()?.to_vec();
        if dec.read_u16()? != ED448_PUBKEY_TYPE {
            return Err(ProtoError::MalformedInput("server public key type"));
        }
        let server_pub_key = dec.read_point()?;
        let composite_identity = dec.slice_between(composite_start, dec.consumed()).to_vec();

        let s = dec.read_point()?;
        let sigma = dec.read_ring_sig()?;

        Ok(Self {
            client_instance_tag,
            server_identity,
            server_pub_key,
            composite_identity,
            s,
            sigma,
        })
    }
}

// ── DAKE3 ────────────────────────────────────────────────────────────────────

/// Client → server: ring signature plus the deferred inner message.
#[derive(Debug, Clone)]
pub struct Dake3 {
    pub client_instance_tag: u32,
    pub sigma: RingSignature,
    pub message: Vec<u8>,
}

impl Dake3 {
    pub fn serialize(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        write_header(&mut enc, msg_type::DAKE3);
        enc.write_u32(self.client_instance_tag)
            .write_ring_sig(&self.sigma)
            .write_data(&self.message);
        enc.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        expect_type(&mut dec, msg_type::DAKE3)?;
        let client_instance_tag = dec.read_u32()?;
        let sigma = dec.read_ring_sig()?;
        let message = dec.read_data()?.to_vec();
        Ok(Self {
            client_instance_tag,
            sigma,
            message,
        })
    }
}

// ── Prekey message ───────────────────────────────────────────────────────────

/// A one-time ECDH+DH public bundle, framed for publication.
#[derive(Debug, Clone)]
pub struct PrekeyMessage {
    pub id: u32,
    pub instance_tag: u32,
    pub y: EdwardsPoint,
    pub b: BigUint,
}

impl PrekeyMessage {
    pub fn serialize(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        write_header(&mut enc, msg_type::PREKEY_MESSAGE);
        enc.write_u32(self.id)
            .write_u32(self.instance_tag)
            .write_point(&self.y)
            .write_mpi(&self.b);
        enc.into_bytes()
    }

    pub fn deserialize(dec: &mut Decoder<'_>) -> Result<Self, ProtoError> {
        expect_type(dec, msg_type::PREKEY_MESSAGE)?;
        let id = dec.read_u32()?;
        let instance_tag = dec.read_u32()?;
        let y = dec.read_point()?;
        let b = dec.read_mpi()?;
        Ok(Self {
            id,
            instance_tag,
            y,
            b,
        })
    }
}

// ── Authenticated server replies ─────────────────────────────────────────────

/// Server → client storage-status reply.
#[derive(Debug, Clone)]
pub struct StorageStatus {
    pub client_instance_tag: u32,
    pub stored_prekeys: u32,
    pub mac: [u8; MAC_BYTES],
}

impl StorageStatus {
    pub fn serialize(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        write_header(&mut enc, msg_type::STORAGE_STATUS);
        enc.write_u32(self.client_instance_tag)
            .write_u32(self.stored_prekeys)
            .write_bytes(&self.mac);
        enc.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        expect_type(&mut dec, msg_type::STORAGE_STATUS)?;
        let client_instance_tag = dec.read_u32()?;
        let stored_prekeys = dec.read_u32()?;
        let mut mac = [0u8; MAC_BYTES];
        mac.copy_from_slice(dec.read_bytes(MAC_BYTES)?);
        Ok(Self {
            client_instance_tag,
            stored_prekeys,
            mac,
        })
    }
}

/// Server → client success notice.
#[derive(Debug, Clone)]
pub struct Success {
    pub client_instance_tag: u32,
    pub mac: [u8; MAC_BYTES],
}

impl Success {
    pub fn serialize(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        write_header(&mut enc, msg_type::SUCCESS);
        enc.write_u32(self.client_instance_tag)
            .write_bytes(&self.mac);
        enc.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        expect_type(&mut dec, msg_type::SUCCESS)?;
        let client_instance_tag = dec.read_u32()?;
        let mut mac = [0u8; MAC_BYTES];
        mac.copy_from_slice(dec.read_bytes(MAC_BYTES)?);
        Ok(Self {
            client_instance_tag,
            mac,
        })
    }
}

/// Server → client failure notice.
#[derive(Debug, Clone)]
pub struct Failure {
    pub client_instance_tag: u32,
    pub mac: [u8; MAC_BYTES],
}

impl Failure {
    pub fn serialize(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        write_header(&mut enc, msg_type::FAILURE);
        enc.write_u32(self.client_instance_tag)
            .write_bytes(&self.mac);
        enc.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        expect_type(&mut dec, msg_type::FAILURE)?;
        let client_instance_tag = dec.read_u32()?;
        let mut mac = [0u8; MAC_BYTES];
        mac.copy_from_slice(dec.read_bytes(MAC_BYTES)?);
        Ok(Self {
            client_instance_tag,
            mac,
        })
    }
}

// ── Ensemble query retrieval ─────────────────────────────────────────────────

/// Standalone retrieval query (no DAKE).
#[derive(Debug, Clone)]
pub struct EnsembleQueryRetrieval {
    pub instance_tag: u32,
    pub identity: String,
    pub versions: String,
}

impl EnsembleQueryRetrieval {
    pub fn serialize(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        write_header(&mut enc, msg_type::ENSEMBLE_QUERY_RETRIEVAL);
        enc.write_u32(self.instance_tag)
            .write_data(self.identity.as_bytes())
            .write_data(self.versions.as_bytes());
        enc.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProtoError> {
        let mut dec = Decoder::new(bytes);
        expect_type(&mut dec, msg_type::ENSEMBLE_QUERY_RETRIEVAL)?;
        let instance_tag = dec.read_u32()?;
        let identity = core::str::from_utf8(dec.read_data()?)
            .map_err(|_| ProtoError::MalformedInput("identity not utf-8"))?
            .to_string();
        let versions = core::str::from_utf8(dec.read_data()?)
            .map_err(|_| ProtoError::MalformedInput("versions not utf-8"))?
            .to_string();
        Ok(Self {
            instance_tag,
            identity,
            versions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otrng_crypto::ed448::Keypair;
    use otrng_crypto::random::SystemRandom;
    use otrng_crypto::rsig;
    use otrng_crypto::shake::{usage, PREKEY_SERVER_DOMAIN};

    fn keypair() -> Keypair {
        Keypair::generate(&mut SystemRandom)
    }

    fn sample_profile(tag: u32) -> (Keypair, ClientProfile) {
        let pair = keypair();
        let forging = keypair();
        let profile =
            ClientProfile::build(tag, "34", &pair, forging.public(), 1_600_000_000).unwrap();
        (pair, profile)
    }

    fn sample_sigma(signer: &Keypair) -> RingSignature {
        let ring = [*signer.public(), *keypair().public(), *keypair().public()];
        rsig::authenticate(
            &mut SystemRandom,
            usage::AUTH_RING_SIG,
            PREKEY_SERVER_DOMAIN,
            signer,
            &ring,
            b"m",
        )
        .unwrap()
    }

    #[test]
    fn dake1_roundtrip() {
        let (_, profile) = sample_profile(0x300);
        let eph = keypair();
        let msg = Dake1 {
            client_instance_tag: 0x300,
            client_profile: profile,
            i: *eph.public(),
        };

        let bytes = msg.serialize();
        assert_eq!(&bytes[..3], &[0x00, 0x04, 0x35]);

        let back = Dake1::deserialize(&bytes).unwrap();
        assert_eq!(back.client_instance_tag, 0x300);
        assert_eq!(back.i, *eph.public());
        assert!(back.client_profile.verify_signature().is_ok());
    }

    #[test]
    fn dake2_roundtrip_keeps_composite_identity_verbatim() {
        let server = keypair();
        let eph = keypair();
        let sigma = sample_sigma(&server);
        let msg = Dake2::new(0x300, b"prekey.example.org", *server.public(), *eph.public(), sigma);

        let bytes = msg.serialize();
        let back = Dake2::deserialize(&bytes).unwrap();
        assert_eq!(back.client_instance_tag, 0x300);
        assert_eq!(back.server_identity, b"prekey.example.org");
        assert_eq!(back.server_pub_key, *server.public());
        assert_eq!(back.s, *eph.public());
        assert_eq!(back.sigma, msg.sigma);
        assert_eq!(back.composite_identity, msg.composite_identity);
        // data(identity) + key type + point
        assert_eq!(back.composite_identity.len(), 4 + 18 + 2 + 57);
    }

    #[test]
    fn dake3_roundtrip() {
        let signer = keypair();
        let msg = Dake3 {
            client_instance_tag: 0x300,
            sigma: sample_sigma(&signer),
            message: vec![0xAA; 67],
        };
        let bytes = msg.serialize();
        let back = Dake3::deserialize(&bytes).unwrap();
        assert_eq!(back.client_instance_tag, 0x300);
        assert_eq!(back.sigma, msg.sigma);
        assert_eq!(back.message, msg.message);
    }

    #[test]
    fn truncated_dake2_rejected() {
        let server = keypair();
        let eph = keypair();
        let msg = Dake2::new(0x300, b"srv", *server.public(), *eph.public(), sample_sigma(&server));
        let bytes = msg.serialize();
        assert!(Dake2::deserialize(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn prekey_message_roundtrip() {
        let eph = keypair();
        let msg = PrekeyMessage {
            id: 7,
            instance_tag: 0x300,
            y: *eph.public(),
            b: BigUint::from(0x0142u32),
        };
        let bytes = msg.serialize();
        let mut dec = Decoder::new(&bytes);
        let back = PrekeyMessage::deserialize(&mut dec).unwrap();
        assert_eq!(dec.consumed(), bytes.len());
        assert_eq!(back.id, 7);
        assert_eq!(back.b, msg.b);
    }

    #[test]
    fn storage_status_roundtrip() {
        let msg = StorageStatus {
            client_instance_tag: 0x300,
            stored_prekeys: 7,
            mac: [0x5A; MAC_BYTES],
        };
        let bytes = msg.serialize();
        assert_eq!(bytes.len(), 3 + 4 + 4 + MAC_BYTES);
        let back = StorageStatus::deserialize(&bytes).unwrap();
        assert_eq!(back.stored_prekeys, 7);
        assert_eq!(back.mac, msg.mac);
    }

    #[test]
    fn retrieval_query_matches_reference_layout() {
        let msg = EnsembleQueryRetrieval {
            instance_tag: 0xDEAD_BEEF,
            identity: "alice@example".into(),
            versions: "34".into(),
        };
        let bytes = msg.serialize();

        let mut expected = vec![0x00, 0x04, 0x10, 0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00, 0x00, 0x0D];
        expected.extend_from_slice(b"alice@example");
        expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x02]);
        expected.extend_from_slice(b"34");
        assert_eq!(bytes, expected);

        let back = EnsembleQueryRetrieval::deserialize(&bytes).unwrap();
        assert_eq!(back.identity, "alice@example");
        assert_eq!(back.versions, "34");
    }
}
