//! Prover Integration
//!
//! Interface to the ZK proving backend. The builder hands it the
//! per-spend and per-output witness data and receives value
//! commitments, proofs, and the two signature kinds.
//!
//! ```text
//! per spend:   (ak, nsk, d, rcm, alpha, value, anchor, path)
//!                  ──► (cv, rk, zkproof)
//! per output:  (esk, address, rcm, value, memo)
//!                  ──► (cv, zkproof, epk, enc_ciphertext)
//! finally:     spend_auth_sig(ask, alpha, sighash)
//!              binding_sig(value_balance, sighash)
//! ```
//!
//! Byte widths are a compatibility contract with consensus and must
//! match [`sable_transaction::GROTH_PROOF_SIZE`] and friends exactly.

use sable_privacy::{Memo, MerklePath, NoteCiphertext, NoteEncoding, NotePlaintext, PaymentAddress};
use sable_transaction::{Amount, GROTH_PROOF_SIZE};

use crate::error::ProverError;

// ============================================================================
// Proof Types
// ============================================================================

/// Witness data for one spend proof.
#[derive(Debug)]
pub struct SpendProofInputs<'a> {
    /// Spend validating key.
    pub ak: [u8; 32],
    /// Nullifier deriving secret.
    pub nsk: [u8; 32],
    pub diversifier: [u8; 11],
    /// Note trapdoor.
    pub rcm: [u8; 32],
    /// Per-spend authorization randomizer.
    pub alpha: [u8; 32],
    pub value: u64,
    pub anchor: [u8; 32],
    pub witness: &'a MerklePath,
}

/// Result of one spend proof.
#[derive(Debug, Clone)]
pub struct SpendProof {
    /// Value commitment.
    pub cv: [u8; 32],
    /// Randomized spend verification key.
    pub rk: [u8; 32],
    pub zkproof: [u8; GROTH_PROOF_SIZE],
}

/// Witness data for one output proof.
#[derive(Debug)]
pub struct OutputProofInputs<'a> {
    /// Ephemeral secret; also used by the builder for the outgoing
    /// ciphertext.
    pub esk: [u8; 32],
    pub address: &'a PaymentAddress,
    pub rcm: [u8; 32],
    pub value: u64,
    pub encoding: NoteEncoding,
    pub memo: &'a Memo,
}

/// Result of one output proof.
#[derive(Debug, Clone)]
pub struct OutputProof {
    /// Value commitment.
    pub cv: [u8; 32],
    pub zkproof: [u8; GROTH_PROOF_SIZE],
    /// Ephemeral public key.
    pub epk: [u8; 32],
    /// Note ciphertext for the recipient.
    pub enc_ciphertext: Vec<u8>,
}

// ============================================================================
// Prover Trait
// ============================================================================

/// The external proving backend.
pub trait ShieldedProver {
    /// Prove one spend.
    fn spend_proof(&self, inputs: &SpendProofInputs<'_>) -> Result<SpendProof, ProverError>;

    /// Prove one output and encrypt its note for the recipient.
    fn output_proof(&self, inputs: &OutputProofInputs<'_>) -> Result<OutputProof, ProverError>;

    /// Authorization signature for one spend.
    fn spend_auth_sig(
        &self,
        ask: &[u8; 32],
        alpha: &[u8; 32],
        sighash: &[u8; 32],
    ) -> Result<[u8; 64], ProverError>;

    /// Binding signature over the net shielded value.
    fn binding_sig(
        &self,
        value_balance: Amount,
        sighash: &[u8; 32],
    ) -> Result<[u8; 64], ProverError>;
}

// ============================================================================
// Mock Prover
// ============================================================================

/// Deterministic stand-in prover for tests and tooling.
///
/// Commitments, keys, and proofs are keyed hashes of the same inputs a
/// real circuit would bind, so equal inputs give equal artifacts and
/// any input change is visible in the output.
#[derive(Default)]
pub struct MockProver;

impl MockProver {
    pub fn new() -> Self {
        Self
    }

    fn fill<const N: usize>(context: &str, feed: impl FnOnce(&mut blake3::Hasher)) -> [u8; N] {
        let mut hasher = blake3::Hasher::new_derive_key(context);
        feed(&mut hasher);
        let mut out = [0u8; N];
        hasher.finalize_xof().fill(&mut out);
        out
    }
}

impl ShieldedProver for MockProver {
    fn spend_proof(&self, inputs: &SpendProofInputs<'_>) -> Result<SpendProof, ProverError> {
        let cv = Self::fill("sable-mock-prover spend cv", |h| {
            h.update(&inputs.value.to_le_bytes());
            h.update(&inputs.rcm);
        });
        let rk = Self::fill("sable-mock-prover rk", |h| {
            h.update(&inputs.ak);
            h.update(&inputs.alpha);
        });
        let zkproof = Self::fill("sable-mock-prover spend proof", |h| {
            h.update(&inputs.ak);
            h.update(&inputs.nsk);
            h.update(&inputs.diversifier);
            h.update(&inputs.rcm);
            h.update(&inputs.value.to_le_bytes());
            h.update(&inputs.anchor);
            h.update(&inputs.witness.encode());
        });
        Ok(SpendProof { cv, rk, zkproof })
    }

    fn output_proof(&self, inputs: &OutputProofInputs<'_>) -> Result<OutputProof, ProverError> {
        let cv = Self::fill("sable-mock-prover output cv", |h| {
            h.update(&inputs.value.to_le_bytes());
            h.update(&inputs.rcm);
        });
        let zkproof = Self::fill("sable-mock-prover output proof", |h| {
            h.update(&inputs.esk);
            h.update(&inputs.address.pk_d);
            h.update(&inputs.rcm);
            h.update(&inputs.value.to_le_bytes());
        });

        let plaintext = NotePlaintext {
            encoding: inputs.encoding,
            diversifier: inputs.address.diversifier,
            value: sable_privacy::NoteValue(inputs.value),
            rcm: inputs.rcm,
            memo: inputs.memo.clone(),
        };
        let NoteCiphertext {
            epk,
            enc_ciphertext,
        } = sable_privacy::encrypt_note(&plaintext, &inputs.address.pk_d, &inputs.esk);

        Ok(OutputProof {
            cv,
            zkproof,
            epk,
            enc_ciphertext,
        })
    }

    fn spend_auth_sig(
        &self,
        ask: &[u8; 32],
        alpha: &[u8; 32],
        sighash: &[u8; 32],
    ) -> Result<[u8; 64], ProverError> {
        Ok(Self::fill("sable-mock-prover spend auth sig", |h| {
            h.update(ask);
            h.update(alpha);
            h.update(sighash);
        }))
    }

    fn binding_sig(
        &self,
        value_balance: Amount,
        sighash: &[u8; 32],
    ) -> Result<[u8; 64], ProverError> {
        Ok(Self::fill("sable-mock-prover binding sig", |h| {
            h.update(&value_balance.raw().to_le_bytes());
            h.update(sighash);
        }))
    }
}
