//! Build Outcome
//!
//! A finished transaction or an error message, never both. The
//! accessors panic on the wrong variant so every call site has to
//! branch before touching the payload.

use sable_transaction::Transaction;

use crate::error::BuildError;

/// The outcome of [`crate::TransactionBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub enum BuildResult {
    Transaction(Transaction),
    Error(String),
}

impl BuildResult {
    pub(crate) fn from_error(err: BuildError) -> Self {
        BuildResult::Error(err.to_string())
    }

    /// True if the build produced a transaction.
    pub fn is_tx(&self) -> bool {
        matches!(self, BuildResult::Transaction(_))
    }

    /// The finished transaction.
    ///
    /// # Panics
    ///
    /// Panics if the build failed. Check [`Self::is_tx`] first.
    pub fn tx(&self) -> &Transaction {
        match self {
            BuildResult::Transaction(tx) => tx,
            BuildResult::Error(msg) => panic!("build failed, no transaction: {msg}"),
        }
    }

    /// Consume the result, taking the transaction.
    ///
    /// # Panics
    ///
    /// Panics if the build failed. Check [`Self::is_tx`] first.
    pub fn into_tx(self) -> Transaction {
        match self {
            BuildResult::Transaction(tx) => tx,
            BuildResult::Error(msg) => panic!("build failed, no transaction: {msg}"),
        }
    }

    /// The error message.
    ///
    /// # Panics
    ///
    /// Panics if the build succeeded.
    pub fn error(&self) -> &str {
        match self {
            BuildResult::Transaction(_) => panic!("build succeeded, no error to read"),
            BuildResult::Error(msg) => msg,
        }
    }
}
