// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use alloy_primitives::{address, Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;

use super::{LinkageSource, OutputOracleLinkage, OutputRootProof, ResolvedLinkage, RootLinkage};
use crate::client::{HomeChain, RemoteChain};
use crate::proofs::common::{ProofError, ProofResult, RpcContext};

/// Predeploy whose storage root is part of every output root
pub const MESSAGE_PASSER: Address = address!("4200000000000000000000000000000000000016");

sol! {
    interface IL2OutputOracle {
        struct OutputProposal {
            bytes32 outputRoot;
            uint128 timestamp;
            uint128 l2BlockNumber;
        }

        function nextOutputIndex() external view returns (uint256);
        function getL2Output(uint256 l2OutputIndex) external view returns (OutputProposal memory);
    }
}

/// Resolves the latest output proposed to an `L2OutputOracle`
pub struct OutputOracleSource {
    home: Arc<dyn HomeChain>,
    oracle: Address,
}

impl OutputOracleSource {
    pub fn new(home: Arc<dyn HomeChain>, oracle: Address) -> Self {
        Self { home, oracle }
    }

    /// Number of outputs proposed so far
    async fn output_count(&self) -> ProofResult<U256> {
        let data = IL2OutputOracle::nextOutputIndexCall {}.abi_encode();
        let ret = self
            .home
            .call(self.oracle, data.into())
            .await
            .rpc_context("nextOutputIndex call failed")?;
        let decoded = IL2OutputOracle::nextOutputIndexCall::abi_decode_returns(&ret, true)
            .map_err(|e| ProofError::invalid_proof(format!("bad nextOutputIndex return: {e}")))?;
        Ok(decoded._0)
    }

    async fn output(&self, index: U256) -> ProofResult<IL2OutputOracle::OutputProposal> {
        let data = IL2OutputOracle::getL2OutputCall {
            l2OutputIndex: index,
        }
        .abi_encode();
        let ret = self
            .home
            .call(self.oracle, data.into())
            .await
            .rpc_context(format!("getL2Output({index}) call failed"))?;
        let decoded = IL2OutputOracle::getL2OutputCall::abi_decode_returns(&ret, true)
            .map_err(|e| ProofError::invalid_proof(format!("bad getL2Output return: {e}")))?;
        Ok(decoded._0)
    }
}

#[async_trait]
impl LinkageSource for OutputOracleSource {
    async fn resolve(&self, remote: &dyn RemoteChain) -> ProofResult<ResolvedLinkage> {
        // Step 1: Latest proposed output
        let count = self.output_count().await?;
        if count.is_zero() {
            return Err(ProofError::root_not_found(format!(
                "output oracle {} has no proposals yet",
                self.oracle
            )));
        }
        let index = count - U256::from(1);
        let proposal = self.output(index).await?;
        let block_number = u64::try_from(proposal.l2BlockNumber).map_err(|_| {
            ProofError::invalid_proof(format!(
                "output block number {} out of range",
                proposal.l2BlockNumber
            ))
        })?;

        // Step 2: Rebuild the output root preimage at that block
        let block = remote
            .block(block_number)
            .await
            .rpc_context(format!("failed to fetch remote block {block_number}"))?;
        let message_passer = remote
            .proof(MESSAGE_PASSER, &[], block_number)
            .await
            .rpc_context("failed to fetch message passer account proof")?;

        let output_root_proof = OutputRootProof {
            version: B256::ZERO,
            state_root: block.state_root,
            message_passer_storage_root: message_passer.storage_hash,
            latest_blockhash: block.hash,
        };

        // Step 3: The preimage must hash to what the oracle holds
        let computed = output_root_proof.output_root();
        if computed != proposal.outputRoot {
            return Err(ProofError::invalid_proof(format!(
                "output root mismatch at index {index}: oracle {} vs computed {computed}",
                proposal.outputRoot
            )));
        }

        tracing::info!(%index, block_number, output_root = %computed, "resolved output oracle linkage");

        Ok(ResolvedLinkage {
            block_number,
            state_root: block.state_root,
            linkage: RootLinkage::OutputOracle(OutputOracleLinkage {
                output_index: index,
                output_root_proof,
            }),
        })
    }
}
