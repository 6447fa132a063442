// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Binary Merkle tree used by the state commitment chain.
//!
//! Leaves are used as-is. An odd row pads its last node with the default hash
//! of that depth, where `default[0] = keccak(bytes32(0))` and
//! `default[i] = keccak(default[i-1] || default[i-1])`.

use alloy_primitives::B256;

use crate::proofs::common::evm::keccak256_concat;
use crate::proofs::common::{keccak256, ProofError, ProofResult};

fn hash_pair(left: &B256, right: &B256) -> B256 {
    keccak256_concat([left.as_slice(), right.as_slice()])
}

/// Padding hashes for the first `depth` levels
pub fn default_hashes(depth: usize) -> Vec<B256> {
    let mut defaults = Vec::with_capacity(depth);
    if depth == 0 {
        return defaults;
    }
    defaults.push(keccak256([0u8; 32]));
    for i in 1..depth {
        let prev = defaults[i - 1];
        defaults.push(hash_pair(&prev, &prev));
    }
    defaults
}

fn tree_depth(leaves: usize) -> usize {
    let mut depth = 0;
    let mut size = leaves;
    while size > 1 {
        size = size.div_ceil(2);
        depth += 1;
    }
    depth
}

/// Root over `leaves`
pub fn merkle_root(leaves: &[B256]) -> ProofResult<B256> {
    if leaves.is_empty() {
        return Err(ProofError::invalid_proof("cannot build a merkle root of zero leaves"));
    }
    let defaults = default_hashes(tree_depth(leaves.len()));
    let mut row = leaves.to_vec();
    let mut depth = 0;
    while row.len() > 1 {
        row = row
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [last] => hash_pair(last, &defaults[depth]),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect();
        depth += 1;
    }
    Ok(row[0])
}

/// Sibling path for the leaf at `index`, bottom-up
pub fn merkle_siblings(leaves: &[B256], index: usize) -> ProofResult<Vec<B256>> {
    if index >= leaves.len() {
        return Err(ProofError::invalid_proof(format!(
            "leaf index {index} out of range for {} leaves",
            leaves.len()
        )));
    }
    let defaults = default_hashes(tree_depth(leaves.len()));
    let mut siblings = Vec::with_capacity(defaults.len());
    let mut row = leaves.to_vec();
    let mut position = index;
    let mut depth = 0;
    while row.len() > 1 {
        let sibling = position ^ 1;
        siblings.push(row.get(sibling).copied().unwrap_or(defaults[depth]));
        row = row
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [last] => hash_pair(last, &defaults[depth]),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect();
        position /= 2;
        depth += 1;
    }
    Ok(siblings)
}

/// Recompute the root from a leaf and its sibling path
pub fn root_from_siblings(leaf: B256, index: u64, siblings: &[B256]) -> B256 {
    let mut computed = leaf;
    let mut position = index;
    for sibling in siblings {
        computed = if position & 1 == 1 {
            hash_pair(sibling, &computed)
        } else {
            hash_pair(&computed, sibling)
        };
        position >>= 1;
    }
    computed
}
