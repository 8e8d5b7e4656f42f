//! Sable Transaction Builder
//!
//! Assembles one balanced transaction mixing transparent and shielded
//! funds, drives proof and signature generation against an external
//! prover, and speaks the air-gapped signing protocol.
//!
//! ```text
//! caller                         builder                        prover
//!   │  stage intents (no keys)     │                              │
//!   ├─────────────────────────────►│                              │
//!   │  attach keys / convert       │                              │
//!   ├─────────────────────────────►│                              │
//!   │  build()                     │  spend & output proofs       │
//!   ├─────────────────────────────►├─────────────────────────────►│
//!   │                              │  sighash, auth + binding sigs│
//!   │       BuildResult            │◄─────────────────────────────┤
//!   │◄─────────────────────────────┤                              │
//! ```
//!
//! The offline path serializes the staged (key-free) state into a
//! single transcribable command line instead of building; a
//! disconnected signer parses it back into an equivalent builder and
//! runs the online build there.

pub mod builder;
pub mod error;
pub mod keystore;
pub mod offline;
pub mod prover;
pub mod result;
pub mod staging;

pub use builder::TransactionBuilder;
pub use error::{BuildError, ProtocolError, ProverError};
pub use keystore::{Keystore, MemoryKeystore};
pub use offline::{OutputRecord, SignRequest, SpendRecord};
pub use prover::{
    MockProver, OutputProof, OutputProofInputs, ShieldedProver, SpendProof, SpendProofInputs,
};
pub use result::BuildResult;
pub use staging::{OutputIntent, ShieldedOutput, ShieldedSpend, SpendIntent, TransparentInput};
