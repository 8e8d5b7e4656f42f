//! Note Commitments
//!
//! Poseidon-based commitments over BLS12-381 Fr.
//!
//! ```text
//! cmu = Poseidon(DOMAIN_NOTE, d, pk_d, value, rcm)
//! ```
//!
//! The trapdoor `rcm` hides the note contents; the commitment is what
//! enters the global commitment tree.

use ark_bls12_381::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge},
};
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};

use crate::address::Diversifier;

/// Domain tags keeping the sponge uses disjoint.
const DOMAIN_NOTE: u64 = 0x6e6f7465; // "note"
const DOMAIN_TREE: u64 = 0x74726565; // "tree"

/// A note commitment (32 bytes, LE field element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    pub fn from_field(f: Fr) -> Self {
        let bytes = f.into_bigint().to_bytes_le();
        let mut arr = [0u8; 32];
        arr[..bytes.len()].copy_from_slice(&bytes);
        Self(arr)
    }

    pub fn to_field(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Commitment scheme using Poseidon hash.
///
/// Also provides the node hash for the commitment tree so the whole
/// structure stays inside one proving-friendly field.
#[derive(Clone)]
pub struct CommitmentScheme {
    config: PoseidonConfig<Fr>,
}

impl CommitmentScheme {
    pub fn new() -> Self {
        Self {
            config: poseidon_config(),
        }
    }

    /// Commit to a note.
    pub fn note_commitment(
        &self,
        diversifier: &Diversifier,
        pk_d: &[u8; 32],
        value: u64,
        rcm: &[u8; 32],
    ) -> Commitment {
        let mut sponge = PoseidonSponge::new(&self.config);

        sponge.absorb(&Fr::from(DOMAIN_NOTE));
        sponge.absorb(&Fr::from_le_bytes_mod_order(diversifier.as_bytes()));
        sponge.absorb(&Fr::from_le_bytes_mod_order(pk_d));
        sponge.absorb(&Fr::from(value));
        sponge.absorb(&Fr::from_le_bytes_mod_order(rcm));

        let result: Fr = sponge.squeeze_field_elements(1)[0];
        Commitment::from_field(result)
    }

    /// Hash an interior tree node. The level enters the sponge so
    /// subtrees at different depths never collide.
    pub fn merkle_hash(&self, level: usize, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut sponge = PoseidonSponge::new(&self.config);

        sponge.absorb(&Fr::from(DOMAIN_TREE));
        sponge.absorb(&Fr::from(level as u64));
        sponge.absorb(&Fr::from_le_bytes_mod_order(left));
        sponge.absorb(&Fr::from_le_bytes_mod_order(right));

        let result: Fr = sponge.squeeze_field_elements(1)[0];
        Commitment::from_field(result).0
    }

    pub(crate) fn sponge(&self) -> PoseidonSponge<Fr> {
        PoseidonSponge::new(&self.config)
    }
}

impl Default for CommitmentScheme {
    fn default() -> Self {
        Self::new()
    }
}

/// Poseidon configuration
///
/// Field: BLS12-381 Fr (255 bits)
/// Rate: 2, Capacity: 1
/// Security: 128 bits
fn poseidon_config() -> PoseidonConfig<Fr> {
    use ark_crypto_primitives::sponge::poseidon::find_poseidon_ark_and_mds;

    let prime_bits: u64 = 255;
    let rate: usize = 2;
    let capacity: usize = 1;
    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;
    let alpha: u64 = 5;
    let skip_matrices: u64 = 0;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        rate,
        full_rounds,
        partial_rounds,
        skip_matrices,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
}
