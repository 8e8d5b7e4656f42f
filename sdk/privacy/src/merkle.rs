//! Commitment Tree
//!
//! A fixed-depth Merkle tree over note commitments. Spend proofs show
//! membership of a commitment under an anchor (a published root)
//! without revealing which leaf.
//!
//! ```text
//!                    Root (anchor)
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               C0  C1 C2   C3  (Note Commitments)
//! ```

use std::collections::HashMap;

use thiserror::Error;

use crate::commitment::{Commitment, CommitmentScheme};

/// Tree depth (supports 2^32 notes)
pub const TREE_DEPTH: usize = 32;

/// Serialized witness size: depth byte, then per level a length byte
/// and a 32-byte sibling hash, then an 8-byte LE position.
pub const MERKLE_PATH_SIZE: usize = 1 + TREE_DEPTH * (1 + 32) + 8;

/// Witness decoding errors.
#[derive(Debug, Error)]
pub enum MerklePathError {
    #[error("witness is {0} bytes, expected {MERKLE_PATH_SIZE}")]
    BadLength(usize),

    #[error("witness depth byte is {0}, expected {TREE_DEPTH}")]
    BadDepth(u8),

    #[error("sibling hash at level {0} has length byte {1}, expected 32")]
    BadSiblingLength(usize, u8),
}

/// An authentication path proving inclusion of a note commitment.
///
/// Siblings are ordered leaf to root. The side each sibling sits on is
/// implied by the position bits, so the path needs no separate
/// direction vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root.
    pub siblings: Vec<[u8; 32]>,
    /// The leaf position.
    pub position: u64,
}

impl MerklePath {
    /// Compute the root this path commits `leaf` under.
    pub fn root(&self, scheme: &CommitmentScheme, leaf: &Commitment) -> [u8; 32] {
        let mut current = leaf.0;
        for (level, sibling) in self.siblings.iter().enumerate() {
            let is_right = (self.position >> level) & 1 == 1;
            current = if is_right {
                scheme.merkle_hash(level, sibling, &current)
            } else {
                scheme.merkle_hash(level, &current, sibling)
            };
        }
        current
    }

    /// Verify that this path proves inclusion of `leaf` under `anchor`.
    pub fn verify(&self, scheme: &CommitmentScheme, leaf: &Commitment, anchor: &[u8; 32]) -> bool {
        self.root(scheme, leaf) == *anchor
    }

    /// Serialize to the fixed witness layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MERKLE_PATH_SIZE);
        buf.push(TREE_DEPTH as u8);
        for sibling in &self.siblings {
            buf.push(32);
            buf.extend_from_slice(sibling);
        }
        buf.extend_from_slice(&self.position.to_le_bytes());
        buf
    }

    /// Parse the fixed witness layout.
    pub fn decode(bytes: &[u8]) -> Result<Self, MerklePathError> {
        if bytes.len() != MERKLE_PATH_SIZE {
            return Err(MerklePathError::BadLength(bytes.len()));
        }
        if bytes[0] != TREE_DEPTH as u8 {
            return Err(MerklePathError::BadDepth(bytes[0]));
        }

        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        let mut offset = 1;
        for level in 0..TREE_DEPTH {
            let len = bytes[offset];
            if len != 32 {
                return Err(MerklePathError::BadSiblingLength(level, len));
            }
            let mut sibling = [0u8; 32];
            sibling.copy_from_slice(&bytes[offset + 1..offset + 33]);
            siblings.push(sibling);
            offset += 33;
        }

        let mut position_bytes = [0u8; 8];
        position_bytes.copy_from_slice(&bytes[offset..]);

        Ok(Self {
            siblings,
            position: u64::from_le_bytes(position_bytes),
        })
    }
}

/// Merkle hash function with precomputed empty subtree roots.
pub struct MerkleHasher {
    scheme: CommitmentScheme,
    empty_roots: Vec<[u8; 32]>,
}

impl MerkleHasher {
    pub fn new(scheme: CommitmentScheme) -> Self {
        let mut empty_roots = Vec::with_capacity(TREE_DEPTH + 1);
        let mut node = [0u8; 32];
        empty_roots.push(node);
        for level in 0..TREE_DEPTH {
            node = scheme.merkle_hash(level, &node, &node);
            empty_roots.push(node);
        }
        Self {
            scheme,
            empty_roots,
        }
    }

    /// The root of an all-empty subtree of the given height.
    pub fn empty_root(&self, level: usize) -> &[u8; 32] {
        &self.empty_roots[level]
    }

    pub fn scheme(&self) -> &CommitmentScheme {
        &self.scheme
    }
}

/// Sparse commitment tree.
///
/// Only non-empty nodes are stored; untouched subtrees fall back to the
/// precomputed empty roots.
pub struct MerkleTree {
    /// Non-empty nodes: (level, index) -> hash
    nodes: HashMap<(usize, u64), [u8; 32]>,
    next_index: u64,
    hasher: MerkleHasher,
    root: [u8; 32],
}

impl MerkleTree {
    pub fn new(scheme: CommitmentScheme) -> Self {
        let hasher = MerkleHasher::new(scheme);
        let root = *hasher.empty_root(TREE_DEPTH);
        Self {
            nodes: HashMap::new(),
            next_index: 0,
            hasher,
            root,
        }
    }

    /// Current root (the anchor new transactions should reference).
    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    pub fn next_position(&self) -> u64 {
        self.next_index
    }

    /// Append a commitment and return its position.
    pub fn insert(&mut self, commitment: &Commitment) -> u64 {
        let position = self.next_index;
        self.nodes.insert((0, position), commitment.0);
        self.next_index += 1;

        let mut index = position;
        let mut hash = commitment.0;
        for level in 0..TREE_DEPTH {
            let is_right = index & 1 == 1;
            let sibling_index = if is_right { index - 1 } else { index + 1 };
            let sibling = self
                .nodes
                .get(&(level, sibling_index))
                .copied()
                .unwrap_or_else(|| *self.hasher.empty_root(level));

            hash = if is_right {
                self.hasher.scheme.merkle_hash(level, &sibling, &hash)
            } else {
                self.hasher.scheme.merkle_hash(level, &hash, &sibling)
            };
            index /= 2;
            self.nodes.insert((level + 1, index), hash);
        }

        self.root = hash;
        position
    }

    /// The authentication path for an occupied position.
    pub fn path(&self, position: u64) -> Option<MerklePath> {
        if position >= self.next_index {
            return None;
        }

        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        let mut index = position;
        for level in 0..TREE_DEPTH {
            let sibling_index = if index & 1 == 1 { index - 1 } else { index + 1 };
            let sibling = self
                .nodes
                .get(&(level, sibling_index))
                .copied()
                .unwrap_or_else(|| *self.hasher.empty_root(level));
            siblings.push(sibling);
            index /= 2;
        }

        Some(MerklePath { siblings, position })
    }

    /// The commitment stored at a position, if any.
    pub fn get(&self, position: u64) -> Option<Commitment> {
        self.nodes.get(&(0, position)).map(|h| Commitment(*h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tree() -> MerkleTree {
        MerkleTree::new(CommitmentScheme::new())
    }

    #[test]
    fn test_empty_tree() {
        let tree = new_tree();
        assert_eq!(tree.next_position(), 0);
        let hasher = MerkleHasher::new(CommitmentScheme::new());
        assert_eq!(tree.root(), *hasher.empty_root(TREE_DEPTH));
    }

    #[test]
    fn test_insert_and_path() {
        let mut tree = new_tree();
        let scheme = CommitmentScheme::new();

        let c1 = Commitment([1u8; 32]);
        let c2 = Commitment([2u8; 32]);

        assert_eq!(tree.insert(&c1), 0);
        assert_eq!(tree.insert(&c2), 1);

        let path1 = tree.path(0).unwrap();
        assert!(path1.verify(&scheme, &c1, &tree.root()));

        let path2 = tree.path(1).unwrap();
        assert!(path2.verify(&scheme, &c2, &tree.root()));
    }

    #[test]
    fn test_path_wrong_commitment() {
        let mut tree = new_tree();
        let scheme = CommitmentScheme::new();
        tree.insert(&Commitment([1u8; 32]));

        let path = tree.path(0).unwrap();
        assert!(!path.verify(&scheme, &Commitment([99u8; 32]), &tree.root()));
    }

    #[test]
    fn test_root_changes_per_insert() {
        let mut tree = new_tree();
        let root0 = tree.root();

        tree.insert(&Commitment([1u8; 32]));
        let root1 = tree.root();
        assert_ne!(root0, root1);

        tree.insert(&Commitment([2u8; 32]));
        assert_ne!(root1, tree.root());
    }

    #[test]
    fn test_witness_roundtrip() {
        let mut tree = new_tree();
        tree.insert(&Commitment([5u8; 32]));
        tree.insert(&Commitment([6u8; 32]));

        let path = tree.path(1).unwrap();
        let bytes = path.encode();
        assert_eq!(bytes.len(), MERKLE_PATH_SIZE);

        let back = MerklePath::decode(&bytes).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_witness_bad_depth_rejected() {
        let mut tree = new_tree();
        tree.insert(&Commitment([5u8; 32]));

        let mut bytes = tree.path(0).unwrap().encode();
        bytes[0] = 31;
        assert!(matches!(
            MerklePath::decode(&bytes),
            Err(MerklePathError::BadDepth(31))
        ));
    }

    #[test]
    fn test_path_out_of_range() {
        let tree = new_tree();
        assert!(tree.path(0).is_none());
    }
}
