//! Sable Privacy SDK
//!
//! Zcash-style note-based privacy primitives for shielded transactions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Shielded Transaction                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │   Encrypted Outputs   │ │
//! │  │  (spent)     │  │  (new notes) │  │   (for recipients)    │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              ZK Proof (per spend / per output)           │   │
//! │  │  • Valid nullifier derivation                            │   │
//! │  │  • Note commitment membership under an anchor            │   │
//! │  │  • Balance preservation: Σ inputs = Σ outputs            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod address;
pub mod commitment;
pub mod encryption;
pub mod keys;
pub mod memo;
pub mod merkle;
pub mod note;
pub mod nullifier;

pub use address::{AddressError, DIVERSIFIER_SIZE, Diversifier, PaymentAddress};
pub use commitment::{Commitment, CommitmentScheme};
pub use encryption::{
    ENC_CIPHERTEXT_SIZE, NOTE_PLAINTEXT_SIZE, NoteCiphertext, OUT_CIPHERTEXT_SIZE, decrypt_note,
    decrypt_note_with_esk, decrypt_outgoing, encrypt_note, encrypt_outgoing,
};
pub use keys::{ExpandedSpendingKey, FullViewingKey, OutgoingViewingKey, SpendingKey};
pub use memo::{MEMO_SIZE, Memo, MemoError};
pub use merkle::{MERKLE_PATH_SIZE, MerkleHasher, MerklePath, MerklePathError, MerkleTree, TREE_DEPTH};
pub use note::{Note, NoteEncoding, NotePlaintext, NoteValue};
pub use nullifier::{Nullifier, NullifierKey};
