//! Binary sha256 Merkle tree over envelope hashes.
//!
//! Leaves and inner nodes are hashed with distinct one byte prefixes. A level with an odd
//! number of nodes pairs its last node with itself.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

/// A sha256 digest.
pub type Hash = [u8; 32];

const LEAF_PREFIX: u8 = 0;
const NODE_PREFIX: u8 = 1;

fn leaf_hash(leaf: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            node_hash(left, right)
        })
        .collect()
}

/// Root of the tree built over `leaves`. The empty tree has the zero root.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    let mut level: Vec<Hash> = leaves.iter().map(leaf_hash).collect();
    if level.is_empty() {
        return [0; 32];
    }
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Proof that a leaf sits at `index` in a tree.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MerkleProof {
    /// Position of the leaf.
    pub index: u64,
    /// Sibling hashes from the leaf level up to just below the root.
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    /// Builds the proof for the leaf at `index`, or `None` if there is no such leaf.
    pub fn generate(leaves: &[Hash], index: usize) -> Option<Self> {
        if index >= leaves.len() {
            return None;
        }

        let mut level: Vec<Hash> = leaves.iter().map(leaf_hash).collect();
        let mut position = index;
        let mut siblings = Vec::new();
        while level.len() > 1 {
            let sibling = level.get(position ^ 1).unwrap_or(&level[position]);
            siblings.push(*sibling);
            level = next_level(&level);
            position /= 2;
        }

        Some(Self {
            index: index as u64,
            siblings,
        })
    }

    /// Returns `true` if `leaf` at `self.index` hashes up to `root`.
    pub fn verify(&self, leaf: &Hash, root: &Hash) -> bool {
        let mut position = self.index;
        let mut acc = leaf_hash(leaf);
        for sibling in &self.siblings {
            acc = if position % 2 == 0 {
                node_hash(&acc, sibling)
            } else {
                node_hash(sibling, &acc)
            };
            position /= 2;
        }
        position == 0 && &acc == root
    }
}
