//! Keystore
//!
//! Resolves spend conditions to signatures and shielded addresses to
//! spending keys. The builder only ever talks to the trait; wallets
//! bring their own storage and locking.

use std::collections::HashMap;

use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;

use sable_privacy::{PaymentAddress, SpendingKey};
use sable_transaction::{Script, TransparentAddress};

pub trait Keystore {
    /// True if this keystore can satisfy the spend condition.
    fn can_sign(&self, condition: &Script) -> bool;

    /// Produce the script signature for a condition against a digest.
    fn sign_transparent(&self, condition: &Script, digest: &[u8; 32]) -> Option<Script>;

    /// The spending key owning a shielded address, if held.
    fn spending_key_for(&self, address: &PaymentAddress) -> Option<SpendingKey>;
}

/// In-memory keystore for tests and tooling.
#[derive(Default)]
pub struct MemoryKeystore {
    transparent: HashMap<[u8; 20], SigningKey>,
    shielded: HashMap<PaymentAddress, SpendingKey>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and store a fresh transparent key.
    pub fn generate_transparent<R: RngCore>(&mut self, rng: &mut R) -> TransparentAddress {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        self.insert_signing_key(SigningKey::from_bytes(&seed))
    }

    pub fn insert_signing_key(&mut self, key: SigningKey) -> TransparentAddress {
        let address = TransparentAddress::from_public_key(key.verifying_key().as_bytes());
        self.transparent.insert(address.0, key);
        address
    }

    /// Store a shielded spending key, returning its default address.
    pub fn insert_spending_key(&mut self, key: SpendingKey) -> PaymentAddress {
        let address = key.default_address();
        self.shielded.insert(address, key);
        address
    }
}

impl Keystore for MemoryKeystore {
    fn can_sign(&self, condition: &Script) -> bool {
        condition
            .pay_to_key_hash()
            .is_some_and(|hash| self.transparent.contains_key(&hash))
    }

    fn sign_transparent(&self, condition: &Script, digest: &[u8; 32]) -> Option<Script> {
        let hash = condition.pay_to_key_hash()?;
        let key = self.transparent.get(&hash)?;

        let signature = key.sign(digest);
        let mut script_sig = Vec::with_capacity(64 + 32);
        script_sig.extend_from_slice(&signature.to_bytes());
        script_sig.extend_from_slice(key.verifying_key().as_bytes());
        Some(Script::from_bytes(script_sig))
    }

    fn spending_key_for(&self, address: &PaymentAddress) -> Option<SpendingKey> {
        self.shielded.get(address).cloned()
    }
}
