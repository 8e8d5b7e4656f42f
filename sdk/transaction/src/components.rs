//! Transaction Components
//!
//! The fixed byte widths here are a compatibility contract with the
//! consensus layer; changing any of them changes the wire format.

use serde::{Deserialize, Serialize};

use sable_privacy::{Commitment, ENC_CIPHERTEXT_SIZE, Nullifier, OUT_CIPHERTEXT_SIZE};

use crate::amount::Amount;
use crate::script::Script;

/// Groth16 proof size in bytes.
pub const GROTH_PROOF_SIZE: usize = 192;

/// Default sequence number for transparent inputs.
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// Reference to a transparent output being spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub index: u32,
}

/// Reference to a shielded note: the transaction that created it and
/// its output slot. The commitment tree position is tracked separately
/// by the witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteLocator {
    pub txid: [u8; 32],
    pub index: u32,
}

/// A transparent input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Script::empty(),
            sequence: SEQUENCE_FINAL,
        }
    }
}

/// A transparent output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Script,
}

/// A shielded spend description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendDescription {
    /// Value commitment.
    pub cv: [u8; 32],
    /// The tree root this spend proves membership under.
    pub anchor: [u8; 32],
    pub nullifier: Nullifier,
    /// Randomized spend verification key.
    pub rk: [u8; 32],
    pub zkproof: [u8; GROTH_PROOF_SIZE],
    pub spend_auth_sig: [u8; 64],
}

/// A shielded output description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescription {
    /// Value commitment.
    pub cv: [u8; 32],
    /// Note commitment.
    pub cmu: Commitment,
    /// Ephemeral key for note decryption.
    pub epk: [u8; 32],
    /// Note ciphertext for the recipient ([`ENC_CIPHERTEXT_SIZE`] bytes).
    pub enc_ciphertext: Vec<u8>,
    /// Recovery ciphertext for the sender ([`OUT_CIPHERTEXT_SIZE`] bytes).
    pub out_ciphertext: Vec<u8>,
    pub zkproof: [u8; GROTH_PROOF_SIZE],
}

impl OutputDescription {
    /// True if both ciphertexts have their mandated widths.
    pub fn well_formed(&self) -> bool {
        self.enc_ciphertext.len() == ENC_CIPHERTEXT_SIZE
            && self.out_ciphertext.len() == OUT_CIPHERTEXT_SIZE
    }
}
