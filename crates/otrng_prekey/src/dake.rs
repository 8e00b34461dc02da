//! DAKE transcript and inner-message construction.
//!
//! Both ring signatures in the exchange sign the same transcript shape:
//!
//! ```text
//! t = role ‖ KDF(u_a, client_profile, 64) ‖ KDF(u_b, composite_identity, 64)
//!       ‖ I ‖ S ‖ KDF(u_c, composite_phi, 64)
//! ```
//!
//! with role 0x00 / usages 0x02-0x04 on the server-authentication side
//! (DAKE2) and role 0x01 / usages 0x05-0x07 on the client-authentication
//! side (DAKE3). The composite phi binds the transcript to the endpoint
//! pair: `data(our_identity) ‖ data(server_identity)`.
//!
//! The inner messages carried inside DAKE3 and every server reply are
//! authenticated with `mac_k = KDF(0x08, SK, 64)`.

use ed448_goldilocks::EdwardsPoint;

use otrng_crypto::ed448::ED448_SHARED_BYTES;
use otrng_crypto::shake::{kdf64, usage};
use otrng_proto::codec::PROTOCOL_VERSION;
use otrng_proto::messages::{msg_type, PrekeyMessage, MAC_BYTES};
use otrng_proto::profile::{ClientProfile, PrekeyProfile};
use otrng_proto::wire::{Decoder, Encoder};
use otrng_proto::ProtoError;

/// Which half of the exchange the transcript authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptSide {
    /// DAKE2: the server proves itself to the client.
    ServerAuth,
    /// DAKE3: the client proves itself to the server.
    ClientAuth,
}

impl TranscriptSide {
    fn role_byte(self) -> u8 {
        match self {
            Self::ServerAuth => 0x00,
            Self::ClientAuth => 0x01,
        }
    }

    fn usages(self) -> (u8, u8, u8) {
        match self {
            Self::ServerAuth => (
                usage::DAKE2_CLIENT_PROFILE,
                usage::DAKE2_COMPOSITE_IDENTITY,
                usage::DAKE2_COMPOSITE_PHI,
            ),
            Self::ClientAuth => (
                usage::DAKE3_CLIENT_PROFILE,
                usage::DAKE3_COMPOSITE_IDENTITY,
                usage::DAKE3_COMPOSITE_PHI,
            ),
        }
    }
}

/// `data(our_identity) ‖ data(server_identity)`.
pub fn composite_phi(our_identity: &str, server_identity: &str) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.write_data(our_identity.as_bytes())
        .write_data(server_identity.as_bytes());
    enc.into_bytes()
}

/// The ring-signature transcript `t`.
pub fn transcript(
    side: TranscriptSide,
    client_profile: &[u8],
    composite_identity: &[u8],
    i: &EdwardsPoint,
    s: &EdwardsPoint,
    phi: &[u8],
) -> Vec<u8> {
    let (profile_usage, identity_usage, phi_usage) = side.usages();

    let mut enc = Encoder::with_capacity(1 + 3 * 64 + 2 * 57);
    enc.write_u8(side.role_byte());
    enc.write_bytes(&kdf64(profile_usage, &[client_profile]));
    enc.write_bytes(&kdf64(identity_usage, &[composite_identity]));
    enc.write_point(i);
    enc.write_point(s);
    enc.write_bytes(&kdf64(phi_usage, &[phi]));
    enc.into_bytes()
}

/// `SK = KDF(0x01, ECDH(i, S), 64)` and `mac_k = KDF(0x08, SK, 64)`.
pub fn derive_session_keys(ecdh_shared: &[u8; ED448_SHARED_BYTES]) -> ([u8; 64], [u8; 64]) {
    let shared_secret = kdf64(usage::SHARED_SECRET, &[ecdh_shared]);
    let mac_key = kdf64(usage::PREKEY_MAC_KEY, &[&shared_secret]);
    (shared_secret, mac_key)
}

// ── Storage information request ──────────────────────────────────────────────

/// The 67-byte storage-information request: header plus its MAC.
pub fn storage_info_request(mac_key: &[u8; 64]) -> Vec<u8> {
    let mut enc = Encoder::with_capacity(3 + MAC_BYTES);
    enc.write_u16(PROTOCOL_VERSION)
        .write_u8(msg_type::STORAGE_INFO_REQUEST);
    let mac = kdf64(
        usage::STORAGE_INFO_MAC,
        &[mac_key, &[msg_type::STORAGE_INFO_REQUEST]],
    );
    enc.write_bytes(&mac);
    enc.into_bytes()
}

/// Expected MAC for a storage-status reply.
pub fn storage_status_mac(mac_key: &[u8; 64], instance_tag: u32, stored_prekeys: u32) -> [u8; 64] {
    kdf64(
        usage::STORAGE_STATUS_MAC,
        &[
            mac_key,
            &[msg_type::STORAGE_STATUS],
            &instance_tag.to_be_bytes(),
            &stored_prekeys.to_be_bytes(),
        ],
    )
}

/// Expected MAC for a success notice: covers the five bytes after the
/// version word (message type plus instance tag).
pub fn success_mac(mac_key: &[u8; 64], instance_tag: u32) -> [u8; 64] {
    kdf64(
        usage::SUCCESS_MAC,
        &[mac_key, &[msg_type::SUCCESS], &instance_tag.to_be_bytes()],
    )
}

/// Expected MAC for a failure notice.
pub fn failure_mac(mac_key: &[u8; 64], instance_tag: u32) -> [u8; 64] {
    kdf64(
        usage::FAILURE_MAC,
        &[mac_key, &[msg_type::FAILURE], &instance_tag.to_be_bytes()],
    )
}

// ── Prekey publication ───────────────────────────────────────────────────────

/// A publication payload: up to 255 prekey messages and any combination of
/// the two profiles.
#[derive(Debug, Clone, Default)]
pub struct Publication {
    pub prekey_messages: Vec<PrekeyMessage>,
    pub client_profile: Option<ClientProfile>,
    pub prekey_profile: Option<PrekeyProfile>,
}

impl Publication {
    fn messages_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for message in &self.prekey_messages {
            out.extend_from_slice(&message.serialize());
        }
        out
    }

    /// The nested-hash MAC over the publication:
    /// `KDF(0x09, mac_k ‖ type ‖ N ‖ KDF(0x0E, messages, 64)
    ///      ‖ K ‖ [KDF(0x0F, client profile, 64)]
    ///      ‖ J ‖ [KDF(0x10, prekey profile, 64)], 64)`.
    pub fn mac(&self, mac_key: &[u8; 64]) -> [u8; 64] {
        let messages_hash = kdf64(usage::PREKEY_MESSAGES_HASH, &[&self.messages_bytes()]);
        let n = self.prekey_messages.len() as u8;

        let mut inputs: Vec<Vec<u8>> = Vec::with_capacity(8);
        inputs.push(mac_key.to_vec());
        inputs.push(vec![msg_type::PUBLICATION]);
        inputs.push(vec![n]);
        inputs.push(messages_hash.to_vec());

        match &self.client_profile {
            Some(profile) => {
                inputs.push(vec![1]);
                inputs.push(
                    kdf64(usage::CLIENT_PROFILE_HASH, &[&profile.serialize()]).to_vec(),
                );
            }
            None => inputs.push(vec![0]),
        }
        match &self.prekey_profile {
            Some(profile) => {
                inputs.push(vec![1]);
                inputs.push(
                    kdf64(usage::PREKEY_PROFILE_HASH, &[&profile.serialize()]).to_vec(),
                );
            }
            None => inputs.push(vec![0]),
        }

        let borrowed: Vec<&[u8]> = inputs.iter().map(|v| v.as_slice()).collect();
        kdf64(usage::PUBLICATION_MAC, &borrowed)
    }

    /// Serialize with the trailing MAC, ready for embedding in DAKE3.
    pub fn serialize(&self, mac_key: &[u8; 64]) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_u16(PROTOCOL_VERSION)
            .write_u8(msg_type::PUBLICATION)
            .write_u8(self.prekey_messages.len() as u8)
            .write_bytes(&self.messages_bytes());

        match &self.client_profile {
            Some(profile) => {
                enc.write_u8(1).write_bytes(&profile.serialize());
            }
            None => {
                enc.write_u8(0);
            }
        }
        match &self.prekey_profile {
            Some(profile) => {
                enc.write_u8(1).write_bytes(&profile.serialize());
            }
            None => {
                enc.write_u8(0);
            }
        }

        enc.write_bytes(&self.mac(mac_key));
        enc.into_bytes()
    }

    /// Parse a publication and its trailing MAC.
    pub fn deserialize(bytes: &[u8]) -> Result<(Self, [u8; MAC_BYTES]), ProtoError> {
        let mut dec = Decoder::new(bytes);
        let version = dec.read_u16()?;
        if version != PROTOCOL_VERSION {
            return Err(ProtoError::UnsupportedVersion(version));
        }
        if dec.read_u8()? != msg_type::PUBLICATION {
            return Err(ProtoError::MalformedInput("unexpected message type"));
        }

        let n = dec.read_u8()? as usize;
        let mut prekey_messages = Vec::with_capacity(n);
        for _ in 0..n {
            prekey_messages.push(PrekeyMessage::deserialize(&mut dec)?);
        }

        let client_profile = match dec.read_u8()? {
            0 => None,
            1 => Some(ClientProfile::deserialize(&mut dec)?),
            _ => return Err(ProtoError::MalformedInput("client profile flag")),
        };
        let prekey_profile = match dec.read_u8()? {
            0 => None,
            1 => Some(PrekeyProfile::deserialize(&mut dec)?),
            _ => return Err(ProtoError::MalformedInput("prekey profile flag")),
        };

        let mut mac = [0u8; MAC_BYTES];
        mac.copy_from_slice(dec.read_bytes(MAC_BYTES)?);

        Ok((
            Self {
                prekey_messages,
                client_profile,
                prekey_profile,
            },
            mac,
        ))
    }
}
