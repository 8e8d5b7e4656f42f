//! Scripts and Transparent Addresses
//!
//! The transparent side keeps a conventional pay-to-key-hash shape: an
//! address is a 20-byte key hash, its spend condition a fixed script
//! pattern around that hash. Script execution is a consensus concern;
//! here we only build, recognize, and sign against the patterns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Human-readable prefix of transparent address strings.
const ADDRESS_PREFIX: &str = "st";

const OP_DUP: u8 = 0x76;
const OP_HASH: u8 = 0xa9;
const OP_EQVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const OP_TRUE: u8 = 0x51;

#[derive(Debug, Error)]
pub enum AddressParseError {
    #[error("missing '{ADDRESS_PREFIX}' prefix")]
    MissingPrefix,

    #[error("invalid base58: {0}")]
    InvalidBase58(#[from] bs58::decode::Error),

    #[error("payload length {0} is invalid")]
    InvalidLength(usize),

    #[error("checksum mismatch")]
    BadChecksum,
}

/// A raw script (spend condition or signature).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Script(pub Vec<u8>);

impl Script {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A condition anyone may satisfy without a key.
    pub fn anyone_can_spend() -> Self {
        Self(vec![OP_TRUE])
    }

    /// True if satisfying this condition requires no private key.
    pub fn is_self_authorizing(&self) -> bool {
        self.0 == [OP_TRUE]
    }

    /// The key hash this condition pays to, if it has the standard
    /// pay-to-key-hash shape.
    pub fn pay_to_key_hash(&self) -> Option<[u8; 20]> {
        if self.0.len() != 25
            || self.0[0] != OP_DUP
            || self.0[1] != OP_HASH
            || self.0[2] != 20
            || self.0[23] != OP_EQVERIFY
            || self.0[24] != OP_CHECKSIG
        {
            return None;
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&self.0[3..23]);
        Some(hash)
    }
}

/// A transparent pay-to-key-hash address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransparentAddress(pub [u8; 20]);

impl TransparentAddress {
    /// Derive an address from a signing public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest = blake3::hash(public_key);
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&digest.as_bytes()[..20]);
        Self(hash)
    }

    /// The spend condition paying to this address.
    pub fn script_pubkey(&self) -> Script {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(OP_DUP);
        bytes.push(OP_HASH);
        bytes.push(20);
        bytes.extend_from_slice(&self.0);
        bytes.push(OP_EQVERIFY);
        bytes.push(OP_CHECKSIG);
        Script(bytes)
    }

    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(20 + 4);
        payload.extend_from_slice(&self.0);
        payload.extend_from_slice(&checksum(&self.0));
        format!("{ADDRESS_PREFIX}{}", bs58::encode(payload).into_string())
    }

    pub fn parse(s: &str) -> Result<Self, AddressParseError> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or(AddressParseError::MissingPrefix)?;
        let payload = bs58::decode(body).into_vec()?;
        if payload.len() != 24 {
            return Err(AddressParseError::InvalidLength(payload.len()));
        }
        let (hash, check) = payload.split_at(20);
        if checksum(hash) != check {
            return Err(AddressParseError::BadChecksum);
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(hash);
        Ok(Self(bytes))
    }
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = blake3::hash(data);
    let mut check = [0u8; 4];
    check.copy_from_slice(&digest.as_bytes()[..4]);
    check
}

impl fmt::Display for TransparentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for TransparentAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let addr = TransparentAddress([9u8; 20]);
        let s = addr.encode();
        assert!(s.starts_with(ADDRESS_PREFIX));
        assert_eq!(TransparentAddress::parse(&s).unwrap(), addr);
    }

    #[test]
    fn test_corrupt_address_rejected() {
        let mut s = TransparentAddress([9u8; 20]).encode();
        let replacement = if s.ends_with('2') { '3' } else { '2' };
        s.pop();
        s.push(replacement);
        assert!(TransparentAddress::parse(&s).is_err());
    }

    #[test]
    fn test_script_pubkey_pattern() {
        let addr = TransparentAddress([7u8; 20]);
        let script = addr.script_pubkey();
        assert_eq!(script.pay_to_key_hash(), Some([7u8; 20]));
        assert!(!script.is_self_authorizing());
    }

    #[test]
    fn test_anyone_can_spend() {
        assert!(Script::anyone_can_spend().is_self_authorizing());
        assert!(!Script::empty().is_self_authorizing());
    }
}
