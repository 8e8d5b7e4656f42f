//! Shielded Payment Addresses
//!
//! A payment address is an 11-byte diversifier plus a 32-byte diversified
//! transmission key (`pk_d`). The string form is a `zs`-prefixed
//! base58check encoding of the 43-byte payload.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Diversifier size in bytes.
pub const DIVERSIFIER_SIZE: usize = 11;

/// Human-readable prefix of shielded address strings.
const ADDRESS_PREFIX: &str = "zs";

/// Address decoding errors.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("missing '{ADDRESS_PREFIX}' prefix")]
    MissingPrefix,

    #[error("invalid base58: {0}")]
    InvalidBase58(#[from] bs58::decode::Error),

    #[error("payload length {0} is invalid")]
    InvalidLength(usize),

    #[error("checksum mismatch")]
    BadChecksum,
}

/// An address diversifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Diversifier(pub [u8; DIVERSIFIER_SIZE]);

impl Diversifier {
    pub fn as_bytes(&self) -> &[u8; DIVERSIFIER_SIZE] {
        &self.0
    }
}

/// A shielded payment address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentAddress {
    /// Diversifier routing incoming payments to this address.
    pub diversifier: Diversifier,
    /// Diversified transmission key the sender encrypts to.
    pub pk_d: [u8; 32],
}

impl PaymentAddress {
    /// Encode to the canonical string form.
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(DIVERSIFIER_SIZE + 32 + 4);
        payload.extend_from_slice(&self.diversifier.0);
        payload.extend_from_slice(&self.pk_d);
        let check = checksum(&payload);
        payload.extend_from_slice(&check);
        format!("{ADDRESS_PREFIX}{}", bs58::encode(payload).into_string())
    }

    /// Parse the canonical string form.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or(AddressError::MissingPrefix)?;
        let payload = bs58::decode(body).into_vec()?;
        if payload.len() != DIVERSIFIER_SIZE + 32 + 4 {
            return Err(AddressError::InvalidLength(payload.len()));
        }
        let (data, check) = payload.split_at(DIVERSIFIER_SIZE + 32);
        if checksum(data) != check {
            return Err(AddressError::BadChecksum);
        }

        let mut diversifier = [0u8; DIVERSIFIER_SIZE];
        diversifier.copy_from_slice(&data[..DIVERSIFIER_SIZE]);
        let mut pk_d = [0u8; 32];
        pk_d.copy_from_slice(&data[DIVERSIFIER_SIZE..]);

        Ok(Self {
            diversifier: Diversifier(diversifier),
            pk_d,
        })
    }
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = blake3::hash(data);
    let mut check = [0u8; 4];
    check.copy_from_slice(&digest.as_bytes()[..4]);
    check
}

impl fmt::Display for PaymentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for PaymentAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
