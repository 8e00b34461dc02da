//! Stored prekeys.
//!
//! When a prekey message is built for publication, its ECDH and DH private
//! halves are stored here, keyed by the prekey id carried in the message.
//! An entry survives until the double-ratchet layer consumes it (removal by
//! id) or the client is torn down; private halves are zeroised either way.
//!
//! Ids are unique across the live set: fresh ids are drawn from the
//! session's randomness source and re-rolled on collision.

use otrng_crypto::dh::DhKeypair;
use otrng_crypto::ed448::Keypair;
use otrng_crypto::random::RandomSource;
use otrng_proto::messages::PrekeyMessage;

use crate::error::PrekeyError;

/// Hard per-publication limit.
pub const MAX_PUBLISHED_PREKEY_MESSAGES: usize = 255;

/// Private halves of one published prekey message.
#[derive(Debug)]
pub struct StoredPrekey {
    id: u32,
    instance_tag: u32,
    ecdh: Keypair,
    dh: DhKeypair,
}

impl StoredPrekey {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn instance_tag(&self) -> u32 {
        self.instance_tag
    }

    pub fn ecdh(&self) -> &Keypair {
        &self.ecdh
    }

    pub fn dh(&self) -> &DhKeypair {
        &self.dh
    }
}

/// Session-owned, ordered container of stored prekeys.
#[derive(Debug, Default)]
pub struct PrekeyStorage {
    entries: Vec<StoredPrekey>,
}

impl PrekeyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrowed handle, scoped to the storage.
    pub fn by_id(&self, id: u32) -> Option<&StoredPrekey> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Consume an entry (double-ratchet initialisation or explicit delete).
    pub fn remove(&mut self, id: u32) -> Option<StoredPrekey> {
        let at = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(at))
    }

    /// Snapshot of the live ids. Callers that expire entries collect ids
    /// first and then remove them one by one.
    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    fn fresh_id(&self, rng: &mut dyn RandomSource) -> u32 {
        loop {
            let mut bytes = [0u8; 4];
            rng.fill(&mut bytes);
            let id = u32::from_be_bytes(bytes);
            if id != 0 && self.by_id(id).is_none() {
                return id;
            }
        }
    }

    /// Build `n` publishable prekey messages, storing every private half.
    pub fn build_prekey_messages(
        &mut self,
        n: usize,
        instance_tag: u32,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<PrekeyMessage>, PrekeyError> {
        if n > MAX_PUBLISHED_PREKEY_MESSAGES {
            return Err(PrekeyError::TooManyMessages(n));
        }

        let mut messages = Vec::with_capacity(n);
        for _ in 0..n {
            let ecdh = Keypair::generate(rng);
            let dh = DhKeypair::generate(rng);
            let id = self.fresh_id(rng);

            messages.push(PrekeyMessage {
                id,
                instance_tag,
                y: *ecdh.public(),
                b: dh.public().clone(),
            });
            self.entries.push(StoredPrekey {
                id,
                instance_tag,
                ecdh,
                dh,
            });
        }
        Ok(messages)
    }

    /// Drop every entry; the key material zeroises as it goes.
    pub fn wipe(&mut self) {
        self.entries.clear();
    }
}
