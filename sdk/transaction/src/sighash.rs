//! Signature Digest
//!
//! One transaction-wide digest covers both the spend authorization and
//! binding signatures and the transparent script signatures. The digest
//! keys on the consensus branch identifier, so signatures made under
//! one ruleset never verify under another.
//!
//! Script signatures are excluded from the digest (they sign it), as
//! are the shielded authorization signatures; everything else binds.

use crate::transaction::Transaction;

const SIGHASH_CONTEXT: &str = "sable-transaction sighash v1";

/// Compute the signature digest for a transaction under a branch id.
pub fn signature_digest(tx: &Transaction, branch_id: u32) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(SIGHASH_CONTEXT);
    hasher.update(&branch_id.to_le_bytes());

    let header = [
        tx.version.to_le_bytes(),
        tx.version_group_id.to_le_bytes(),
        tx.lock_time.to_le_bytes(),
        tx.expiry_height.to_le_bytes(),
    ];
    hasher.update(&[tx.overwintered as u8]);
    for word in header {
        hasher.update(&word);
    }

    hasher.update(&(tx.vin.len() as u32).to_le_bytes());
    for txin in &tx.vin {
        hasher.update(&txin.prevout.txid);
        hasher.update(&txin.prevout.index.to_le_bytes());
        // empty placeholder where the script signature will go
        hasher.update(&0u32.to_le_bytes());
        hasher.update(&txin.sequence.to_le_bytes());
    }

    hasher.update(&(tx.vout.len() as u32).to_le_bytes());
    for txout in &tx.vout {
        hasher.update(&txout.value.raw().to_le_bytes());
        hasher.update(&(txout.script_pubkey.as_bytes().len() as u32).to_le_bytes());
        hasher.update(txout.script_pubkey.as_bytes());
    }

    hasher.update(&tx.value_balance.raw().to_le_bytes());

    hasher.update(&(tx.shielded_spends.len() as u32).to_le_bytes());
    for spend in &tx.shielded_spends {
        hasher.update(&spend.cv);
        hasher.update(&spend.anchor);
        hasher.update(spend.nullifier.as_bytes());
        hasher.update(&spend.rk);
        hasher.update(&spend.zkproof);
    }

    hasher.update(&(tx.shielded_outputs.len() as u32).to_le_bytes());
    for output in &tx.shielded_outputs {
        hasher.update(&output.cv);
        hasher.update(output.cmu.as_bytes());
        hasher.update(&output.epk);
        hasher.update(&output.enc_ciphertext);
        hasher.update(&output.out_ciphertext);
        hasher.update(&output.zkproof);
    }

    *hasher.finalize().as_bytes()
}
