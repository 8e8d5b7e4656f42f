//! Sable Transaction Model
//!
//! Ledger-level types shared by the builder and any consumer of raw
//! transactions: amounts, scripts and transparent addresses, the
//! transaction structure with its shielded descriptions, the network
//! upgrade schedule, and the transaction-wide signature digest.

pub mod amount;
pub mod components;
pub mod policy;
pub mod script;
pub mod sighash;
pub mod transaction;

pub use amount::{Amount, AmountError, COIN, DEFAULT_FEE, MAX_MONEY};
pub use components::{
    GROTH_PROOF_SIZE, NoteLocator, OutPoint, OutputDescription, SEQUENCE_FINAL, SpendDescription,
    TxIn, TxOut,
};
pub use policy::{
    ActivationPolicy, BRANCH_ID_BASE, BRANCH_ID_ENCODING_V2, BRANCH_ID_OVERWINTER,
    BRANCH_ID_SHIELDED, EXPIRY_HEIGHT_DELTA, OVERWINTER_TX_VERSION, OVERWINTER_VERSION_GROUP_ID,
    SHIELDED_TX_VERSION, SHIELDED_VERSION_GROUP_ID, TxFormat,
};
pub use script::{AddressParseError, Script, TransparentAddress};
pub use sighash::signature_digest;
pub use transaction::Transaction;
