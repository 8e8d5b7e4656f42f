//! Staged Transaction Records
//!
//! Two flavors of shielded record: an intent holds everything except
//! key material, a keyed record is ready for proving. Intents exist so
//! an online device can describe a transaction it cannot sign.

use rand::RngCore;

use sable_privacy::{
    ExpandedSpendingKey, Memo, MerklePath, Note, NoteEncoding, OutgoingViewingKey, PaymentAddress,
};
use sable_transaction::{Amount, NoteLocator, OutPoint, Script};

/// A transparent input staged for spending.
#[derive(Debug, Clone)]
pub struct TransparentInput {
    pub outpoint: OutPoint,
    /// The spend condition of the output being consumed.
    pub spend_condition: Script,
    pub value: Amount,
    pub sequence: u32,
}

/// A shielded spend without its spending key.
#[derive(Debug, Clone)]
pub struct SpendIntent {
    /// The note being spent; its recipient is the sender of this
    /// transaction.
    pub note: Note,
    pub witness: MerklePath,
    pub encoding: NoteEncoding,
    /// Where the note was minted, when known.
    pub locator: Option<NoteLocator>,
}

impl SpendIntent {
    pub fn sender(&self) -> &PaymentAddress {
        &self.note.recipient
    }
}

/// A fully keyed shielded spend.
#[derive(Clone)]
pub struct ShieldedSpend {
    pub expsk: ExpandedSpendingKey,
    pub note: Note,
    /// Per-spend authorization randomizer.
    pub alpha: [u8; 32],
    /// Shared tree root; identical across every spend in one
    /// transaction.
    pub anchor: [u8; 32],
    pub witness: MerklePath,
}

impl ShieldedSpend {
    pub fn new<R: RngCore>(
        expsk: ExpandedSpendingKey,
        note: Note,
        anchor: [u8; 32],
        witness: MerklePath,
        rng: &mut R,
    ) -> Self {
        let mut alpha = [0u8; 32];
        rng.fill_bytes(&mut alpha);
        Self {
            expsk,
            note,
            alpha,
            anchor,
            witness,
        }
    }
}

impl std::fmt::Debug for ShieldedSpend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShieldedSpend")
            .field("note", &self.note)
            .field("anchor", &hex::encode(self.anchor))
            .finish_non_exhaustive()
    }
}

/// A shielded output without the sender's viewing key.
#[derive(Debug, Clone)]
pub struct OutputIntent {
    pub address: PaymentAddress,
    pub value: Amount,
    pub memo: Memo,
}

/// A fully keyed shielded output.
#[derive(Debug, Clone)]
pub struct ShieldedOutput {
    pub ovk: OutgoingViewingKey,
    pub note: Note,
    pub memo: Memo,
}
