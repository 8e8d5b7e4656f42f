//! Shielded Memos
//!
//! Every shielded output carries a fixed 512-byte memo field. The full
//! buffer is encrypted on-chain whether or not the sender supplied any
//! content, so memo presence is not observable.

use thiserror::Error;

/// Fixed memo field size in bytes.
pub const MEMO_SIZE: usize = 512;

/// Errors raised when constructing a memo from external input.
#[derive(Debug, Error)]
pub enum MemoError {
    #[error("memo exceeds {MEMO_SIZE} bytes (got {0})")]
    TooLong(usize),

    #[error("memo hex is invalid: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A fixed-size shielded memo.
///
/// Content is ASCII/UTF-8 text padded with NUL bytes; a memo whose first
/// byte is NUL is treated as empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Memo([u8; MEMO_SIZE]);

impl Memo {
    /// The empty memo (all zero bytes).
    pub fn empty() -> Self {
        Self([0u8; MEMO_SIZE])
    }

    /// Build a memo from raw content bytes, NUL-padding to the full width.
    pub fn from_bytes(content: &[u8]) -> Result<Self, MemoError> {
        if content.len() > MEMO_SIZE {
            return Err(MemoError::TooLong(content.len()));
        }
        let mut buf = [0u8; MEMO_SIZE];
        buf[..content.len()].copy_from_slice(content);
        Ok(Self(buf))
    }

    /// Build a memo from text.
    pub fn from_text(text: &str) -> Result<Self, MemoError> {
        Self::from_bytes(text.as_bytes())
    }

    /// Build a memo from hex-encoded content (the offline wire encoding).
    pub fn from_hex(s: &str) -> Result<Self, MemoError> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }

    /// True if the memo carries no content.
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Content bytes up to the first NUL (or the full buffer if none).
    pub fn content(&self) -> &[u8] {
        let len = self
            .0
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(MEMO_SIZE);
        &self.0[..len]
    }

    /// Hex encoding of the content (not the padding), as used by the
    /// offline signing protocol.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.content())
    }

    /// The full padded buffer, as encrypted into the note ciphertext.
    pub fn as_array(&self) -> &[u8; MEMO_SIZE] {
        &self.0
    }
}

impl Default for Memo {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Memo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "Memo(empty)")
        } else {
            write!(f, "Memo({} bytes)", self.content().len())
        }
    }
}
