//! Shielded Notes
//!
//! A note is a private coin: who may spend it (payment address), how
//! much it is worth, and a commitment trapdoor `rcm` that hides it on
//! chain. Notes never appear on chain directly; only their commitments
//! and, when spent, their nullifiers do.

use rand::RngCore;

use crate::address::{DIVERSIFIER_SIZE, Diversifier, PaymentAddress};
use crate::commitment::{Commitment, CommitmentScheme};
use crate::memo::{MEMO_SIZE, Memo};
use crate::nullifier::{Nullifier, NullifierKey};

/// A note value in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteValue(pub u64);

impl NoteValue {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Note plaintext encoding epoch, carried in the plaintext lead byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEncoding {
    /// Original encoding, lead byte `0x01`.
    V1,
    /// Post-upgrade encoding, lead byte `0x02`.
    V2,
}

impl NoteEncoding {
    pub fn lead_byte(&self) -> u8 {
        match self {
            NoteEncoding::V1 => 0x01,
            NoteEncoding::V2 => 0x02,
        }
    }

    pub fn from_lead_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(NoteEncoding::V1),
            0x02 => Some(NoteEncoding::V2),
            _ => None,
        }
    }
}

/// A shielded note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Address the note is spendable by.
    pub recipient: PaymentAddress,
    /// Value in the smallest unit.
    pub value: NoteValue,
    /// Commitment trapdoor.
    pub rcm: [u8; 32],
}

impl Note {
    pub fn new(recipient: PaymentAddress, value: NoteValue, rcm: [u8; 32]) -> Self {
        Self {
            recipient,
            value,
            rcm,
        }
    }

    /// Build a note with a freshly sampled trapdoor.
    pub fn random<R: RngCore>(recipient: PaymentAddress, value: NoteValue, rng: &mut R) -> Self {
        let mut rcm = [0u8; 32];
        rng.fill_bytes(&mut rcm);
        Self::new(recipient, value, rcm)
    }

    /// The note commitment, as it appears in the commitment tree.
    pub fn commitment(&self, scheme: &CommitmentScheme) -> Commitment {
        scheme.note_commitment(
            &self.recipient.diversifier,
            &self.recipient.pk_d,
            self.value.0,
            &self.rcm,
        )
    }

    /// The nullifier revealed when this note is spent from the given
    /// tree position.
    pub fn nullifier(
        &self,
        scheme: &CommitmentScheme,
        key: &NullifierKey,
        position: u64,
    ) -> Nullifier {
        key.derive(scheme, &self.commitment(scheme), position)
    }

    /// The plaintext transmitted to the recipient.
    pub fn to_plaintext(&self, encoding: NoteEncoding, memo: Memo) -> NotePlaintext {
        NotePlaintext {
            encoding,
            diversifier: self.recipient.diversifier,
            value: self.value,
            rcm: self.rcm,
            memo,
        }
    }
}

/// The decrypted contents of a note ciphertext.
///
/// Wire layout (564 bytes): lead byte, 11-byte diversifier, 8-byte LE
/// value, 32-byte rcm, 512-byte memo.
#[derive(Clone)]
pub struct NotePlaintext {
    pub encoding: NoteEncoding,
    pub diversifier: Diversifier,
    pub value: NoteValue,
    pub rcm: [u8; 32],
    pub memo: Memo,
}

impl NotePlaintext {
    pub const SIZE: usize = 1 + DIVERSIFIER_SIZE + 8 + 32 + MEMO_SIZE;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.push(self.encoding.lead_byte());
        buf.extend_from_slice(&self.diversifier.0);
        buf.extend_from_slice(&self.value.0.to_le_bytes());
        buf.extend_from_slice(&self.rcm);
        buf.extend_from_slice(self.memo.as_array());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        let encoding = NoteEncoding::from_lead_byte(bytes[0])?;

        let mut diversifier = [0u8; DIVERSIFIER_SIZE];
        diversifier.copy_from_slice(&bytes[1..1 + DIVERSIFIER_SIZE]);

        let mut value_bytes = [0u8; 8];
        value_bytes.copy_from_slice(&bytes[12..20]);

        let mut rcm = [0u8; 32];
        rcm.copy_from_slice(&bytes[20..52]);

        let memo = Memo::from_bytes(&bytes[52..]).ok()?;

        Some(Self {
            encoding,
            diversifier: Diversifier(diversifier),
            value: NoteValue(u64::from_le_bytes(value_bytes)),
            rcm,
            memo,
        })
    }

    /// Reconstruct the note given the transmission key recovered out of
    /// band (from the incoming viewing key or the out ciphertext).
    pub fn into_note(self, pk_d: [u8; 32]) -> Note {
        Note {
            recipient: PaymentAddress {
                diversifier: self.diversifier,
                pk_d,
            },
            value: self.value,
            rcm: self.rcm,
        }
    }
}

impl std::fmt::Debug for NotePlaintext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotePlaintext")
            .field("encoding", &self.encoding)
            .field("value", &self.value)
            .field("memo", &self.memo)
            .finish_non_exhaustive()
    }
}
