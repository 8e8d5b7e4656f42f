//! The Transaction Structure
//!
//! Mixes a transparent input/output list with shielded spend and
//! output descriptions. Serialization is a hand-rolled little-endian
//! layout; the txid is a hash over the full serialization.

use crate::amount::Amount;
use crate::components::{OutputDescription, SpendDescription, TxIn, TxOut};
use crate::policy::TxFormat;

const TXID_CONTEXT: &str = "sable-transaction txid v1";

/// Header bit marking the post-overwinter serialization.
const OVERWINTER_FLAG: u32 = 1 << 31;

/// A complete (possibly unsigned) transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub overwintered: bool,
    pub version: u32,
    pub version_group_id: u32,
    pub vin: Vec<TxIn>,
    pub vout: Vec<TxOut>,
    pub lock_time: u32,
    pub expiry_height: u32,
    /// Net value leaving the shielded pool (positive) or entering it
    /// (negative).
    pub value_balance: Amount,
    pub shielded_spends: Vec<SpendDescription>,
    pub shielded_outputs: Vec<OutputDescription>,
    pub binding_sig: Option<[u8; 64]>,
}

impl Transaction {
    /// An empty transaction in the given format.
    pub fn new(format: TxFormat) -> Self {
        Self {
            overwintered: format.overwintered,
            version: format.version,
            version_group_id: format.version_group_id,
            vin: Vec::new(),
            vout: Vec::new(),
            lock_time: 0,
            expiry_height: 0,
            value_balance: Amount::ZERO,
            shielded_spends: Vec::new(),
            shielded_outputs: Vec::new(),
            binding_sig: None,
        }
    }

    pub fn has_shielded_components(&self) -> bool {
        !self.shielded_spends.is_empty() || !self.shielded_outputs.is_empty()
    }

    /// Serialize to the canonical byte layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        let header = if self.overwintered {
            self.version | OVERWINTER_FLAG
        } else {
            self.version
        };
        buf.extend_from_slice(&header.to_le_bytes());
        if self.overwintered {
            buf.extend_from_slice(&self.version_group_id.to_le_bytes());
        }

        buf.extend_from_slice(&(self.vin.len() as u32).to_le_bytes());
        for txin in &self.vin {
            buf.extend_from_slice(&txin.prevout.txid);
            buf.extend_from_slice(&txin.prevout.index.to_le_bytes());
            buf.extend_from_slice(&(txin.script_sig.as_bytes().len() as u32).to_le_bytes());
            buf.extend_from_slice(txin.script_sig.as_bytes());
            buf.extend_from_slice(&txin.sequence.to_le_bytes());
        }

        buf.extend_from_slice(&(self.vout.len() as u32).to_le_bytes());
        for txout in &self.vout {
            buf.extend_from_slice(&txout.value.raw().to_le_bytes());
            buf.extend_from_slice(&(txout.script_pubkey.as_bytes().len() as u32).to_le_bytes());
            buf.extend_from_slice(txout.script_pubkey.as_bytes());
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        if self.overwintered {
            buf.extend_from_slice(&self.expiry_height.to_le_bytes());
        }

        if self.supports_shielded() {
            buf.extend_from_slice(&self.value_balance.raw().to_le_bytes());

            buf.extend_from_slice(&(self.shielded_spends.len() as u32).to_le_bytes());
            for spend in &self.shielded_spends {
                buf.extend_from_slice(&spend.cv);
                buf.extend_from_slice(&spend.anchor);
                buf.extend_from_slice(spend.nullifier.as_bytes());
                buf.extend_from_slice(&spend.rk);
                buf.extend_from_slice(&spend.zkproof);
                buf.extend_from_slice(&spend.spend_auth_sig);
            }

            buf.extend_from_slice(&(self.shielded_outputs.len() as u32).to_le_bytes());
            for output in &self.shielded_outputs {
                buf.extend_from_slice(&output.cv);
                buf.extend_from_slice(output.cmu.as_bytes());
                buf.extend_from_slice(&output.epk);
                buf.extend_from_slice(&output.enc_ciphertext);
                buf.extend_from_slice(&output.out_ciphertext);
                buf.extend_from_slice(&output.zkproof);
            }

            if self.has_shielded_components() {
                buf.extend_from_slice(&self.binding_sig.unwrap_or([0u8; 64]));
            }
        }

        buf
    }

    /// The transaction identifier.
    pub fn txid(&self) -> [u8; 32] {
        *blake3::Hasher::new_derive_key(TXID_CONTEXT)
            .update(&self.encode())
            .finalize()
            .as_bytes()
    }

    fn supports_shielded(&self) -> bool {
        self.overwintered && self.version >= crate::policy::SHIELDED_TX_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{OutPoint, TxIn};
    use crate::policy::ActivationPolicy;
    use crate::script::{Script, TransparentAddress};

    fn shielded_format() -> TxFormat {
        ActivationPolicy::regtest().tx_format(100)
    }

    #[test]
    fn test_txid_changes_with_content() {
        let mut tx = Transaction::new(shielded_format());
        let id_empty = tx.txid();

        tx.vin.push(TxIn::new(OutPoint {
            txid: [1u8; 32],
            index: 0,
        }));
        assert_ne!(tx.txid(), id_empty);
    }

    #[test]
    fn test_pre_overwinter_layout_is_shorter() {
        let legacy = Transaction::new(ActivationPolicy::mainnet().tx_format(100));
        let shielded = Transaction::new(shielded_format());
        assert!(legacy.encode().len() < shielded.encode().len());
    }

    #[test]
    fn test_encode_deterministic() {
        let mut tx = Transaction::new(shielded_format());
        tx.vout.push(TxOut {
            value: Amount::from_raw(50_000).unwrap(),
            script_pubkey: TransparentAddress([2u8; 20]).script_pubkey(),
        });
        tx.vin.push(TxIn {
            prevout: OutPoint {
                txid: [3u8; 32],
                index: 1,
            },
            script_sig: Script::empty(),
            sequence: 7,
        });
        assert_eq!(tx.encode(), tx.encode());
    }
}
