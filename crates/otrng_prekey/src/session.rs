//! The prekey-client session.
//!
//! A session talks to exactly one untrusted prekey server. Outbound
//! operations run a three-message DAKE first:
//!
//! ```text
//! Idle ──request──▶ AwaitingDake2 ──DAKE2 ok──▶ AwaitingServerReply ──reply──▶ Idle
//! ```
//!
//! The deferred operation (storage-status query or publication) rides
//! inside DAKE3, authenticated under `mac_k`. Inputs that do not match the
//! current state are discarded without a state change; cryptographic
//! failures abort the exchange and zeroise the session secrets.
//!
//! One session is single-threaded: callers serialise `receive` and the
//! outbound operations. Long-term material and profiles are borrowed and
//! must outlive the session.

use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroize;

use otrng_crypto::ed448::{shared_secret, Keypair};
use otrng_crypto::random::{RandomSource, SystemRandom};
use otrng_crypto::rsig;
use otrng_crypto::shake::{usage, PREKEY_SERVER_DOMAIN};
use otrng_proto::codec::{decode_message, encode_message, parse_header};
use otrng_proto::messages::{
    msg_type, Dake1, Dake2, Dake3, EnsembleQueryRetrieval, Failure, StorageStatus, Success,
};
use otrng_proto::profile::{ClientProfile, PrekeyProfile, MIN_INSTANCE_TAG};
use otrng_proto::wire::Decoder;

use crate::dake::{self, Publication, TranscriptSide};
use crate::error::PrekeyError;
use crate::events::{FailureKind, NullEvents, PrekeyEvents};
use crate::storage::{PrekeyStorage, StoredPrekey, MAX_PUBLISHED_PREKEY_MESSAGES};

/// Default number of prekey messages per full publication.
pub const DEFAULT_MAX_PUBLISHED_PREKEY_MESSAGES: usize = 100;

/// Default server-side stock level that triggers `low_prekey_messages`.
pub const DEFAULT_MINIMUM_STORED_PREKEY_MESSAGES: u32 = 20;

/// Default grace window accepted past profile expiry (two days).
pub const DEFAULT_PROFILES_EXTRA_VALID_TIME: u64 = 2 * 24 * 60 * 60;

/// Default client-profile lifetime (two weeks).
pub const DEFAULT_CLIENT_PROFILE_EXPIRY: u64 = 2 * 7 * 24 * 60 * 60;

/// `now + DEFAULT_CLIENT_PROFILE_EXPIRY`, for profile construction.
pub fn default_profile_expiry() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64 + DEFAULT_CLIENT_PROFILE_EXPIRY
}

/// Where the session stands in the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    AwaitingDake2,
    AwaitingServerReply,
}

/// The operation deferred until the DAKE completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterDake {
    None,
    StorageStatusRequest,
    PrekeyPublication { count: usize },
}

pub struct PrekeyClient<'a> {
    server_identity: String,
    our_identity: String,
    instance_tag: u32,
    keypair: &'a Keypair,
    client_profile: &'a ClientProfile,
    prekey_profile: Option<&'a PrekeyProfile>,

    ephemeral_ecdh: Option<Keypair>,
    shared_secret: [u8; 64],
    mac_key: [u8; 64],
    after_dake: AfterDake,
    state: State,
    storage: PrekeyStorage,

    max_published_prekey_messages: usize,
    minimum_stored_prekey_messages: u32,
    profiles_extra_valid_time: u64,

    rng: Box<dyn RandomSource>,
    events: Box<dyn PrekeyEvents>,
}

impl<'a> PrekeyClient<'a> {
    pub fn new(
        server_identity: &str,
        our_identity: &str,
        instance_tag: u32,
        keypair: &'a Keypair,
        client_profile: &'a ClientProfile,
        prekey_profile: Option<&'a PrekeyProfile>,
    ) -> Result<Self, PrekeyError> {
        if server_identity.is_empty() {
            return Err(PrekeyError::MissingMandatoryInput("server identity"));
        }
        if our_identity.is_empty() {
            return Err(PrekeyError::MissingMandatoryInput("our identity"));
        }
        if instance_tag < MIN_INSTANCE_TAG {
            return Err(PrekeyError::MissingMandatoryInput("instance tag"));
        }

        Ok(Self {
            server_identity: server_identity.to_string(),
            our_identity: our_identity.to_string(),
            instance_tag,
            keypair,
            client_profile,
            prekey_profile,
            ephemeral_ecdh: None,
            shared_secret: [0u8; 64],
            mac_key: [0u8; 64],
            after_dake: AfterDake::None,
            state: State::Idle,
            storage: PrekeyStorage::new(),
            max_published_prekey_messages: DEFAULT_MAX_PUBLISHED_PREKEY_MESSAGES,
            minimum_stored_prekey_messages: DEFAULT_MINIMUM_STORED_PREKEY_MESSAGES,
            profiles_extra_valid_time: DEFAULT_PROFILES_EXTRA_VALID_TIME,
            rng: Box::new(SystemRandom),
            events: Box::new(NullEvents),
        })
    }

    // ── Configuration ────────────────────────────────────────────────────

    pub fn set_events(&mut self, events: Box<dyn PrekeyEvents>) {
        self.events = events;
    }

    pub fn set_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.rng = rng;
    }

    pub fn set_minimum_stored_prekey_messages(&mut self, minimum: u32) {
        self.minimum_stored_prekey_messages = minimum;
    }

    pub fn set_max_published_prekey_messages(&mut self, maximum: usize) {
        self.max_published_prekey_messages = maximum;
    }

    /// Grace window applied when judging profile expiry.
    pub fn profiles_extra_valid_time(&self) -> u64 {
        self.profiles_extra_valid_time
    }

    pub fn set_profiles_extra_valid_time(&mut self, seconds: u64) {
        self.profiles_extra_valid_time = seconds;
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn server_identity(&self) -> &str {
        &self.server_identity
    }

    pub fn our_identity(&self) -> &str {
        &self.our_identity
    }

    pub fn instance_tag(&self) -> u32 {
        self.instance_tag
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stored_prekeys(&self) -> &PrekeyStorage {
        &self.storage
    }

    /// Hand a stored prekey over to the double-ratchet layer, removing it
    /// from the live set.
    pub fn take_stored_prekey(&mut self, id: u32) -> Option<StoredPrekey> {
        self.storage.remove(id)
    }

    // ── Outbound operations ──────────────────────────────────────────────

    /// Begin a DAKE whose inner message asks how many of our prekey
    /// messages the server still stores. Returns the armored DAKE1.
    pub fn request_storage_status(&mut self) -> Result<String, PrekeyError> {
        self.start_dake(AfterDake::StorageStatusRequest)
    }

    /// Begin a DAKE that publishes `count` fresh prekey messages together
    /// with our profiles.
    pub fn publish_prekeys(&mut self, count: usize) -> Result<String, PrekeyError> {
        if count > MAX_PUBLISHED_PREKEY_MESSAGES {
            return Err(PrekeyError::TooManyMessages(count));
        }
        self.start_dake(AfterDake::PrekeyPublication { count })
    }

    /// Publish the configured default batch size.
    pub fn publish_default_prekeys(&mut self) -> Result<String, PrekeyError> {
        self.publish_prekeys(self.max_published_prekey_messages)
    }

    /// Standalone retrieval query for a peer's prekey ensembles; no DAKE.
    pub fn retrieve_prekeys(&self, identity: &str, versions: &str) -> Result<String, PrekeyError> {
        if identity.is_empty() {
            return Err(PrekeyError::MissingMandatoryInput("peer identity"));
        }
        if versions.is_empty() {
            return Err(PrekeyError::MissingMandatoryInput("versions"));
        }
        let message = EnsembleQueryRetrieval {
            instance_tag: self.instance_tag,
            identity: identity.to_string(),
            versions: versions.to_string(),
        };
        Ok(encode_message(&message.serialize()))
    }

    fn start_dake(&mut self, after: AfterDake) -> Result<String, PrekeyError> {
        // A new request supersedes any exchange in flight.
        self.reset_to_idle();

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        if self
            .client_profile
            .expired_at(now, self.profiles_extra_valid_time)
        {
            warn!("client profile is past its expiry; the server may reject it");
        }

        let ephemeral = Keypair::generate(self.rng.as_mut());
        let message = Dake1 {
            client_instance_tag: self.instance_tag,
            client_profile: self.client_profile.clone(),
            i: *ephemeral.public(),
        };
        let encoded = encode_message(&message.serialize());

        self.ephemeral_ecdh = Some(ephemeral);
        self.after_dake = after;
        self.state = State::AwaitingDake2;
        Ok(encoded)
    }

    // ── Inbound ──────────────────────────────────────────────────────────

    /// Process one message delivered from `server`. Returns the armored
    /// reply to send back, if the protocol calls for one.
    pub fn receive(&mut self, server: &str, message: &str) -> Result<Option<String>, PrekeyError> {
        if server != self.server_identity {
            return Err(PrekeyError::WrongServer);
        }

        let decoded = decode_message(message)?;
        let mut dec = Decoder::new(&decoded);
        let message_type = parse_header(&mut dec)?;

        match message_type {
            msg_type::DAKE2 => self.receive_dake2(&decoded),
            msg_type::STORAGE_STATUS => self.receive_storage_status(&decoded),
            msg_type::SUCCESS => self.receive_success(&decoded),
            msg_type::FAILURE => self.receive_failure(&decoded),
            other => {
                debug!(message_type = other, "ignoring unrelated message type");
                Ok(None)
            }
        }
    }

    fn receive_dake2(&mut self, bytes: &[u8]) -> Result<Option<String>, PrekeyError> {
        if self.state != State::AwaitingDake2 {
            debug!("DAKE2 outside an active exchange, ignoring");
            return Ok(None);
        }

        let message = Dake2::deserialize(bytes)?;
        if message.client_instance_tag != self.instance_tag {
            debug!("DAKE2 instance tag mismatch, ignoring");
            return Ok(None);
        }

        let Some(ephemeral) = self.ephemeral_ecdh.as_ref() else {
            warn!("awaiting DAKE2 without an ephemeral key, aborting");
            self.reset_to_idle();
            return Ok(None);
        };

        // The server proves knowledge of its long-term key against the
        // transcript; the ring is {our long-term, server long-term, I}.
        let transcript = dake::transcript(
            TranscriptSide::ServerAuth,
            &self.client_profile.serialize(),
            &message.composite_identity,
            ephemeral.public(),
            &message.s,
            &dake::composite_phi(&self.our_identity, &self.server_identity),
        );
        let ring = [
            *self.keypair.public(),
            message.server_pub_key,
            *ephemeral.public(),
        ];
        if !rsig::verify(
            usage::AUTH_RING_SIG,
            PREKEY_SERVER_DOMAIN,
            &message.sigma,
            &ring,
            &transcript,
        ) {
            warn!("DAKE2 ring signature rejected, aborting exchange");
            self.reset_to_idle();
            self.events.failure(FailureKind::RingSignature);
            return Ok(None);
        }

        match self.send_dake3(&message) {
            Ok(reply) => Ok(Some(reply)),
            Err(error) => {
                self.reset_to_idle();
                Err(error)
            }
        }
    }

    fn send_dake3(&mut self, dake2: &Dake2) -> Result<String, PrekeyError> {
        let ephemeral = self
            .ephemeral_ecdh
            .take()
            .ok_or(PrekeyError::MissingMandatoryInput("ephemeral key"))?;

        let transcript = dake::transcript(
            TranscriptSide::ClientAuth,
            &self.client_profile.serialize(),
            &dake2.composite_identity,
            ephemeral.public(),
            &dake2.s,
            &dake::composite_phi(&self.our_identity, &self.server_identity),
        );
        let ring = [*self.keypair.public(), dake2.server_pub_key, dake2.s];
        let sigma = rsig::authenticate(
            self.rng.as_mut(),
            usage::AUTH_RING_SIG,
            PREKEY_SERVER_DOMAIN,
            self.keypair,
            &ring,
            &transcript,
        )?;

        let ecdh = shared_secret(ephemeral.secret(), &dake2.s)?;
        let (session_secret, mac_key) = dake::derive_session_keys(&ecdh);
        self.shared_secret = session_secret;
        self.mac_key = mac_key;

        let inner = match self.after_dake {
            AfterDake::StorageStatusRequest => dake::storage_info_request(&self.mac_key),
            AfterDake::PrekeyPublication { count } => {
                let messages = self.storage.build_prekey_messages(
                    count,
                    self.instance_tag,
                    self.rng.as_mut(),
                )?;
                let publication = Publication {
                    prekey_messages: messages,
                    client_profile: Some(self.client_profile.clone()),
                    prekey_profile: self.prekey_profile.cloned(),
                };
                publication.serialize(&self.mac_key)
            }
            AfterDake::None => {
                return Err(PrekeyError::MissingMandatoryInput("deferred operation"));
            }
        };

        let message = Dake3 {
            client_instance_tag: self.instance_tag,
            sigma,
            message: inner,
        };

        self.after_dake = AfterDake::None;
        self.state = State::AwaitingServerReply;
        // The ephemeral half is spent; it zeroises as it drops here.
        drop(ephemeral);

        Ok(encode_message(&message.serialize()))
    }

    fn receive_storage_status(&mut self, bytes: &[u8]) -> Result<Option<String>, PrekeyError> {
        if self.state != State::AwaitingServerReply {
            debug!("storage status outside an active exchange, ignoring");
            return Ok(None);
        }

        let message = StorageStatus::deserialize(bytes)?;
        if message.client_instance_tag != self.instance_tag {
            debug!("storage status instance tag mismatch, ignoring");
            return Ok(None);
        }

        let expected = dake::storage_status_mac(
            &self.mac_key,
            message.client_instance_tag,
            message.stored_prekeys,
        );
        if !bool::from(expected.ct_eq(&message.mac)) {
            warn!("storage status MAC mismatch, discarding");
            self.events.failure(FailureKind::InvalidMac);
            return Ok(None);
        }

        self.events.storage_status(message.stored_prekeys);
        if message.stored_prekeys < self.minimum_stored_prekey_messages {
            self.events.low_prekey_messages(message.stored_prekeys);
        }
        self.reset_to_idle();
        Ok(None)
    }

    fn receive_success(&mut self, bytes: &[u8]) -> Result<Option<String>, PrekeyError> {
        if self.state != State::AwaitingServerReply {
            debug!("success notice outside an active exchange, ignoring");
            return Ok(None);
        }

        let message = Success::deserialize(bytes)?;
        if message.client_instance_tag != self.instance_tag {
            debug!("success notice instance tag mismatch, ignoring");
            return Ok(None);
        }

        let expected = dake::success_mac(&self.mac_key, message.client_instance_tag);
        if !bool::from(expected.ct_eq(&message.mac)) {
            warn!("success notice MAC mismatch, discarding");
            self.events.failure(FailureKind::InvalidMac);
            return Ok(None);
        }

        self.events.success();
        self.reset_to_idle();
        Ok(None)
    }

    fn receive_failure(&mut self, bytes: &[u8]) -> Result<Option<String>, PrekeyError> {
        if self.state != State::AwaitingServerReply {
            debug!("failure notice outside an active exchange, ignoring");
            return Ok(None);
        }

        let message = Failure::deserialize(bytes)?;
        if message.client_instance_tag != self.instance_tag {
            debug!("failure notice instance tag mismatch, ignoring");
            return Ok(None);
        }

        let expected = dake::failure_mac(&self.mac_key, message.client_instance_tag);
        if !bool::from(expected.ct_eq(&message.mac)) {
            warn!("failure notice MAC mismatch, discarding");
            self.events.failure(FailureKind::InvalidMac);
            return Ok(None);
        }

        self.events.failure(FailureKind::ServerFailure);
        self.reset_to_idle();
        Ok(None)
    }

    // ── Teardown ─────────────────────────────────────────────────────────

    fn reset_to_idle(&mut self) {
        self.ephemeral_ecdh = None;
        self.shared_secret.zeroize();
        self.mac_key.zeroize();
        self.after_dake = AfterDake::None;
        self.state = State::Idle;
    }

    /// Zeroise every secret the session owns and return to idle.
    pub fn wipe(&mut self) {
        self.reset_to_idle();
        self.storage.wipe();
    }
}

impl Drop for PrekeyClient<'_> {
    fn drop(&mut self) {
        self.wipe();
    }
}
