// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};

use super::merkle::{merkle_root, merkle_siblings};
use super::{BatchHeader, LinkageSource, ResolvedLinkage, RootLinkage, StateBatchLinkage};
use crate::client::{HomeChain, RemoteChain};
use crate::proofs::common::{ProofError, ProofResult, RpcContext};

sol! {
    interface IStateCommitmentChain {
        function getTotalBatches() external view returns (uint256 totalBatches);

        event StateBatchAppended(
            uint256 indexed batchIndex,
            bytes32 batchRoot,
            uint256 batchSize,
            uint256 prevTotalElements,
            bytes extraData
        );
    }
}

/// Remote block headers requested at once while rebuilding a batch
const MAX_CONCURRENT_BLOCKS: usize = 16;

/// Largest batch whose elements are fetched to rebuild its root
const MAX_BATCH_SIZE: u64 = 4096;

/// Resolves the latest batch appended to a state commitment chain
pub struct StateBatchSource {
    home: Arc<dyn HomeChain>,
    chain: Address,
    /// First home block searched for `StateBatchAppended` logs
    from_block: u64,
}

impl StateBatchSource {
    pub fn new(home: Arc<dyn HomeChain>, chain: Address) -> Self {
        Self {
            home,
            chain,
            from_block: 0,
        }
    }

    /// Start log searches at `block`, usually the chain's deployment block
    pub fn with_from_block(mut self, block: u64) -> Self {
        self.from_block = block;
        self
    }

    async fn total_batches(&self) -> ProofResult<U256> {
        let data = IStateCommitmentChain::getTotalBatchesCall {}.abi_encode();
        let ret = self
            .home
            .call(self.chain, data.into())
            .await
            .rpc_context("getTotalBatches call failed")?;
        let decoded = IStateCommitmentChain::getTotalBatchesCall::abi_decode_returns(&ret, true)
            .map_err(|e| ProofError::invalid_proof(format!("bad getTotalBatches return: {e}")))?;
        Ok(decoded.totalBatches)
    }

    /// Header of batch `index`, read back from its append event
    async fn batch_header(&self, index: U256) -> ProofResult<BatchHeader> {
        let topics = vec![
            Some(IStateCommitmentChain::StateBatchAppended::SIGNATURE_HASH),
            Some(B256::from(index)),
        ];
        let logs = self
            .home
            .logs(self.chain, topics, self.from_block)
            .await
            .rpc_context(format!("failed to fetch StateBatchAppended logs for batch {index}"))?;

        for log in logs {
            let event = match IStateCommitmentChain::StateBatchAppended::decode_raw_log(
                log.topics.iter().copied(),
                &log.data,
                true,
            ) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("skipping undecodable StateBatchAppended log: {e}");
                    continue;
                }
            };
            if event.batchIndex == index {
                return Ok(BatchHeader {
                    batch_index: event.batchIndex,
                    batch_root: event.batchRoot,
                    batch_size: event.batchSize,
                    prev_total_elements: event.prevTotalElements,
                    extra_data: event.extraData,
                });
            }
        }
        Err(ProofError::root_not_found(format!(
            "no StateBatchAppended event for batch {index}"
        )))
    }
}

fn to_u64(value: U256, what: &str) -> ProofResult<u64> {
    u64::try_from(value).map_err(|_| ProofError::invalid_proof(format!("{what} {value} out of range")))
}

#[async_trait]
impl LinkageSource for StateBatchSource {
    async fn resolve(&self, remote: &dyn RemoteChain) -> ProofResult<ResolvedLinkage> {
        // Step 1: Latest appended batch
        let total = self.total_batches().await?;
        if total.is_zero() {
            return Err(ProofError::root_not_found(format!(
                "state commitment chain {} has no batches yet",
                self.chain
            )));
        }
        let header = self.batch_header(total - U256::from(1)).await?;
        let size = to_u64(header.batch_size, "batch size")?;
        let prev = to_u64(header.prev_total_elements, "previous element count")?;
        if size == 0 {
            return Err(ProofError::invalid_proof("batch header declares zero elements"));
        }
        let block_number = prev.checked_add(size).ok_or_else(|| {
            ProofError::invalid_proof(format!(
                "batch of {size} elements after {prev} overflows the block range"
            ))
        })?;
        if size > MAX_BATCH_SIZE {
            return Err(ProofError::invalid_proof(format!(
                "batch of {size} elements exceeds {MAX_BATCH_SIZE}"
            )));
        }

        // Step 2: Element i of the chain is the state root of remote block i + 1
        let blocks: Vec<_> = stream::iter(prev + 1..=block_number)
            .map(|n| remote.block(n))
            .buffered(MAX_CONCURRENT_BLOCKS)
            .try_collect()
            .await
            .rpc_context("failed to fetch remote blocks of the batch")?;
        let leaves: Vec<B256> = blocks.iter().map(|b| b.state_root).collect();

        // Step 3: The batch must rebuild to the committed root
        let root = merkle_root(&leaves)?;
        if root != header.batch_root {
            return Err(ProofError::invalid_proof(format!(
                "batch {} root mismatch: committed {} vs rebuilt {root}",
                header.batch_index, header.batch_root
            )));
        }

        let index = (size - 1) as usize;
        let siblings = merkle_siblings(&leaves, index)?;
        let state_root = leaves[index];

        tracing::info!(
            batch = %header.batch_index,
            block_number,
            batch_root = %root,
            "resolved state batch linkage"
        );

        Ok(ResolvedLinkage {
            block_number,
            state_root,
            linkage: RootLinkage::StateBatch(StateBatchLinkage {
                state_root,
                header,
                index: U256::from(index),
                siblings,
            }),
        })
    }
}
