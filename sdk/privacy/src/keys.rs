//! Shielded Key Hierarchy
//!
//! ```text
//! SpendingKey (sk)
//!     ├─ ask  spend authorizing key
//!     ├─ nsk  nullifier deriving key
//!     └─ ovk  outgoing viewing key
//!             │
//! FullViewingKey (ak, nk, ovk)
//!     └─ ivk  incoming viewing key ──► pk_d (diversified transmission key)
//! ```
//!
//! All derivations are domain-separated BLAKE3 key derivations. The
//! incoming viewing key doubles as an X25519 secret so note encryption
//! needs no separate key agreement step.

use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::address::{Diversifier, PaymentAddress};
use crate::nullifier::NullifierKey;

const ASK_CONTEXT: &str = "sable-privacy ask v1";
const NSK_CONTEXT: &str = "sable-privacy nsk v1";
const OVK_CONTEXT: &str = "sable-privacy ovk v1";
const AK_CONTEXT: &str = "sable-privacy ak v1";
const NK_CONTEXT: &str = "sable-privacy nk v1";
const IVK_CONTEXT: &str = "sable-privacy ivk v1";

/// The root spending secret for a shielded account.
#[derive(Clone, PartialEq, Eq)]
pub struct SpendingKey([u8; 32]);

impl SpendingKey {
    /// Sample a fresh spending key.
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the expanded spending key.
    pub fn expand(&self) -> ExpandedSpendingKey {
        ExpandedSpendingKey {
            ask: blake3::derive_key(ASK_CONTEXT, &self.0),
            nsk: blake3::derive_key(NSK_CONTEXT, &self.0),
            ovk: OutgoingViewingKey(blake3::derive_key(OVK_CONTEXT, &self.0)),
        }
    }

    /// Derive the full viewing key.
    pub fn full_viewing_key(&self) -> FullViewingKey {
        self.expand().full_viewing_key()
    }

    /// The default payment address for this key (all-zero diversifier).
    pub fn default_address(&self) -> PaymentAddress {
        self.full_viewing_key().default_address()
    }
}

impl std::fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SpendingKey(..)")
    }
}

/// The expanded spending key: the three secrets a signer actually uses.
#[derive(Clone)]
pub struct ExpandedSpendingKey {
    /// Spend authorizing key; signs spend descriptions.
    pub ask: [u8; 32],
    /// Nullifier deriving key.
    pub nsk: [u8; 32],
    /// Outgoing viewing key; recovers outputs this account sent.
    pub ovk: OutgoingViewingKey,
}

impl ExpandedSpendingKey {
    pub fn full_viewing_key(&self) -> FullViewingKey {
        FullViewingKey {
            ak: blake3::derive_key(AK_CONTEXT, &self.ask),
            nk: blake3::derive_key(NK_CONTEXT, &self.nsk),
            ovk: self.ovk.clone(),
        }
    }
}

impl std::fmt::Debug for ExpandedSpendingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExpandedSpendingKey(..)")
    }
}

/// The full viewing key: detects incoming and outgoing payments but
/// cannot spend.
#[derive(Clone, PartialEq, Eq)]
pub struct FullViewingKey {
    pub ak: [u8; 32],
    pub nk: [u8; 32],
    pub ovk: OutgoingViewingKey,
}

impl FullViewingKey {
    /// The incoming viewing key. Doubles as an X25519 secret scalar for
    /// note decryption.
    pub fn ivk(&self) -> [u8; 32] {
        let mut seed = [0u8; 64];
        seed[..32].copy_from_slice(&self.ak);
        seed[32..].copy_from_slice(&self.nk);
        blake3::derive_key(IVK_CONTEXT, &seed)
    }

    /// The diversified transmission key receivers publish in addresses.
    pub fn pk_d(&self) -> [u8; 32] {
        let secret = StaticSecret::from(self.ivk());
        PublicKey::from(&secret).to_bytes()
    }

    /// The payment address for a given diversifier.
    pub fn address(&self, diversifier: Diversifier) -> PaymentAddress {
        PaymentAddress {
            diversifier,
            pk_d: self.pk_d(),
        }
    }

    /// The default payment address (all-zero diversifier).
    pub fn default_address(&self) -> PaymentAddress {
        self.address(Diversifier([0u8; crate::address::DIVERSIFIER_SIZE]))
    }

    /// The nullifier key used to derive nullifiers for received notes.
    pub fn nullifier_key(&self) -> NullifierKey {
        NullifierKey::from_nk(self.nk)
    }
}

impl std::fmt::Debug for FullViewingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FullViewingKey(ak: {}, ..)", hex::encode(&self.ak[..8]))
    }
}

/// Outgoing viewing key. Lets a sender (or their auditor) recover the
/// contents of outputs the account created.
#[derive(Clone, PartialEq, Eq)]
pub struct OutgoingViewingKey(pub [u8; 32]);

impl OutgoingViewingKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for OutgoingViewingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OutgoingViewingKey(..)")
    }
}
