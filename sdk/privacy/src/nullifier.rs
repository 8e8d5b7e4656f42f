//! Nullifiers
//!
//! ```text
//! nf = PRF_nk(commitment, position)
//! ```
//!
//! Publishing a nullifier marks a note as spent. Binding the tree
//! position keeps nullifiers unique even for identical notes.

use ark_bls12_381::Fr;
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

use crate::commitment::{Commitment, CommitmentScheme};

const DOMAIN_NULLIFIER: u64 = 0x4e554c4c; // "NULL"

/// A nullifier (32 bytes), the unique tag revealed for a spent note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    pub fn from_field(f: Fr) -> Self {
        Self(Commitment::from_field(f).0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Nullifier deriving key.
///
/// Held by the viewing side of an account; knowing `nk` is enough to
/// recognize spends but not to authorize them.
#[derive(Clone, PartialEq, Eq)]
pub struct NullifierKey([u8; 32]);

impl NullifierKey {
    pub fn from_nk(nk: [u8; 32]) -> Self {
        Self(nk)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the nullifier for a note commitment at a tree position.
    pub fn derive(
        &self,
        scheme: &CommitmentScheme,
        commitment: &Commitment,
        position: u64,
    ) -> Nullifier {
        let mut sponge = scheme.sponge();

        sponge.absorb(&Fr::from(DOMAIN_NULLIFIER));
        sponge.absorb(&Fr::from_le_bytes_mod_order(&self.0));
        sponge.absorb(&commitment.to_field());
        sponge.absorb(&Fr::from(position));

        let result: Fr = sponge.squeeze_field_elements(1)[0];
        Nullifier::from_field(result)
    }
}

impl std::fmt::Debug for NullifierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NullifierKey(..)")
    }
}
