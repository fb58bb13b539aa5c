//! Append-only Merkle accumulator over commitments.
//!
//! The tree is history-linear: leaves are never reordered or deleted, and the
//! root is a pure function of the insertion order. Nodes are cached per level
//! so an append touches O(log n) nodes and a membership proof is read off the
//! cached levels directly, instead of rebuilding the tree from all leaves.
//!
//! Pairing semantics match the in-circuit verifier: an unpaired (rightmost)
//! node propagates upward unchanged, and the proof encodes that level as the
//! canonical zero element, which the verifier skips. Proofs are padded with
//! zeros up to the fixed circuit depth.

use std::collections::HashMap;

use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::Field;

use crate::error::{Error, Result};
use crate::fr_to_bytes;
use crate::mimc::mimc_hash;

/// A Merkle membership proof for one leaf.
///
/// `path[0]` is the raw leaf value; `path[i]` for `1 <= i <= depth` is the
/// sibling at level `i - 1`, bottom-up, with zero marking "no sibling".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    pub root: Fr,
    pub leaf_index: u64,
    pub num_leaves: u64,
    pub path: Vec<Fr>,
}

/// Incremental append-only Merkle tree with MiMC node hashing.
///
/// Leaf hash is `H(leaf)`; internal nodes are `H(left, right)` without domain
/// separation.
#[derive(Clone, Debug)]
pub struct CommitmentTree {
    depth: usize,
    leaves: Vec<Fr>,
    levels: Vec<Vec<Fr>>,
    index_of: HashMap<[u8; 32], u64>,
}

impl CommitmentTree {
    /// Create an empty tree with capacity `2^depth` leaves.
    pub fn new(depth: usize) -> CommitmentTree {
        CommitmentTree {
            depth,
            leaves: Vec::new(),
            levels: vec![Vec::new()],
            index_of: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn num_leaves(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Current root. The empty tree has the zero root.
    pub fn root(&self) -> Fr {
        if self.leaves.is_empty() {
            return Fr::zero();
        }
        let top = self.levels.last().expect("levels never empty");
        top[0]
    }

    /// Append a leaf and return its immutable index.
    pub fn push(&mut self, leaf: Fr) -> Result<u64> {
        if self.leaves.len() >= 1usize << self.depth {
            return Err(Error::Internal("commitment tree is full".into()));
        }
        let index = self.leaves.len();
        self.leaves.push(leaf);
        self.index_of.entry(fr_to_bytes(&leaf)).or_insert(index as u64);
        self.levels[0].push(mimc_hash(&[leaf]));

        // Recompute the rightmost path: the only nodes an append can change.
        let mut k = 0;
        let mut idx = index;
        while self.levels[k].len() > 1 {
            let parent_idx = idx / 2;
            let parent = if idx % 2 == 1 {
                mimc_hash(&[self.levels[k][idx - 1], self.levels[k][idx]])
            } else if idx + 1 < self.levels[k].len() {
                mimc_hash(&[self.levels[k][idx], self.levels[k][idx + 1]])
            } else {
                // unpaired rightmost node propagates unchanged
                self.levels[k][idx]
            };
            if self.levels.len() == k + 1 {
                self.levels.push(Vec::new());
            }
            if parent_idx < self.levels[k + 1].len() {
                self.levels[k + 1][parent_idx] = parent;
            } else {
                self.levels[k + 1].push(parent);
            }
            idx = parent_idx;
            k += 1;
        }
        Ok(index as u64)
    }

    /// Locate a leaf by value (first occurrence).
    pub fn find(&self, leaf: &Fr) -> Option<u64> {
        self.index_of.get(&fr_to_bytes(leaf)).copied()
    }

    /// Membership proof for the leaf at `index`, padded to the tree depth.
    pub fn prove(&self, index: u64) -> Result<MerklePath> {
        let idx = index as usize;
        if idx >= self.leaves.len() {
            return Err(Error::MalformedInput(format!(
                "leaf index {index} out of range"
            )));
        }
        let mut path = Vec::with_capacity(self.depth + 1);
        path.push(self.leaves[idx]);
        for k in 0..self.depth {
            let sibling_idx = (idx >> k) ^ 1;
            let sibling = self
                .levels
                .get(k)
                .and_then(|level| level.get(sibling_idx))
                .copied()
                .unwrap_or_else(Fr::zero);
            path.push(sibling);
        }
        Ok(MerklePath {
            root: self.root(),
            leaf_index: index,
            num_leaves: self.num_leaves(),
            path,
        })
    }
}

/// Native mirror of the in-circuit path check, with the zero-skip rule.
///
/// Walks from `H(path[0])` upward, hashing with each non-zero sibling in the
/// order selected by the index bits, and compares against `root`.
pub fn verify_path(root: Fr, depth: usize, index: u64, path: &[Fr]) -> bool {
    if path.len() != depth + 1 {
        return false;
    }
    let mut sum = mimc_hash(&path[..1]);
    for (level, sibling) in path[1..].iter().enumerate() {
        if bool::from(sibling.is_zero()) {
            continue;
        }
        let node_is_right = (index >> level) & 1 == 1;
        sum = if node_is_right {
            mimc_hash(&[*sibling, sum])
        } else {
            mimc_hash(&[sum, *sibling])
        };
    }
    sum == root
}
