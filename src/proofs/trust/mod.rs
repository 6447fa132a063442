// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Linkage from a remote block to a commitment the home chain already trusts.

pub mod merkle;
pub mod output_oracle;
pub mod state_batch;

use alloy_primitives::{Bytes, B256, U256};
use async_trait::async_trait;
use serde::Serialize;

use crate::client::RemoteChain;
use crate::proofs::common::{keccak256_concat, ProofError, ProofResult};

pub use output_oracle::OutputOracleSource;
pub use state_batch::StateBatchSource;

/// Preimage of a Bedrock output root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRootProof {
    pub version: B256,
    pub state_root: B256,
    pub message_passer_storage_root: B256,
    pub latest_blockhash: B256,
}

impl OutputRootProof {
    /// `keccak(version || stateRoot || messagePasserStorageRoot || latestBlockhash)`
    pub fn output_root(&self) -> B256 {
        keccak256_concat([
            self.version.as_slice(),
            self.state_root.as_slice(),
            self.message_passer_storage_root.as_slice(),
            self.latest_blockhash.as_slice(),
        ])
    }
}

/// Header of one appended state batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchHeader {
    pub batch_index: U256,
    pub batch_root: B256,
    pub batch_size: U256,
    pub prev_total_elements: U256,
    pub extra_data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOracleLinkage {
    pub output_index: U256,
    pub output_root_proof: OutputRootProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBatchLinkage {
    pub state_root: B256,
    pub header: BatchHeader,
    /// Position of `state_root` inside the batch
    pub index: U256,
    pub siblings: Vec<B256>,
}

/// Evidence tying one remote block to a finalized home-chain commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RootLinkage {
    OutputOracle(OutputOracleLinkage),
    StateBatch(StateBatchLinkage),
}

impl RootLinkage {
    /// Commitment the home-chain contract must hold for this linkage to verify
    pub fn commitment(&self) -> B256 {
        match self {
            RootLinkage::OutputOracle(l) => l.output_root_proof.output_root(),
            RootLinkage::StateBatch(l) => {
                let index = u64::try_from(l.index).unwrap_or(u64::MAX);
                merkle::root_from_siblings(l.state_root, index, &l.siblings)
            }
        }
    }

    /// State root of the remote block this linkage proves
    pub fn state_root(&self) -> B256 {
        match self {
            RootLinkage::OutputOracle(l) => l.output_root_proof.state_root,
            RootLinkage::StateBatch(l) => l.state_root,
        }
    }
}

/// Recompute the linkage commitment offline and compare it with the trusted one
pub fn verify_linkage(linkage: &RootLinkage, trusted: B256) -> ProofResult<()> {
    let computed = linkage.commitment();
    if computed != trusted {
        return Err(ProofError::invalid_proof(format!(
            "linkage commitment {computed} does not match trusted root {trusted}"
        )));
    }
    if let RootLinkage::StateBatch(l) = linkage {
        if l.header.batch_root != trusted {
            return Err(ProofError::invalid_proof("batch header root differs from trusted root"));
        }
    }
    Ok(())
}

/// A linkage together with the remote block it anchors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLinkage {
    /// Remote block whose state root is committed; every read is pinned to it
    pub block_number: u64,
    pub state_root: B256,
    pub linkage: RootLinkage,
}

/// Source of the most recent finalized linkage
#[async_trait]
pub trait LinkageSource: Send + Sync {
    async fn resolve(&self, remote: &dyn RemoteChain) -> ProofResult<ResolvedLinkage>;
}

/// Linkage source that always returns the same anchor (for testing and replay)
pub struct FixedLinkage {
    pub resolved: Option<ResolvedLinkage>,
}

impl FixedLinkage {
    pub fn new(resolved: ResolvedLinkage) -> Self {
        Self {
            resolved: Some(resolved),
        }
    }

    /// A source for a chain that has not finalized anything yet
    pub fn unresolved() -> Self {
        Self { resolved: None }
    }
}

#[async_trait]
impl LinkageSource for FixedLinkage {
    async fn resolve(&self, _remote: &dyn RemoteChain) -> ProofResult<ResolvedLinkage> {
        self.resolved
            .clone()
            .ok_or_else(|| ProofError::root_not_found("no finalized commitment"))
    }
}
