// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolValue;
use serde::Serialize;

use crate::proofs::common::{ProofError, ProofResult};
use crate::proofs::trust::{OutputOracleLinkage, RootLinkage, StateBatchLinkage};
use crate::types::{StorageLayout, StorageSlot};

/// Inclusion witness for one storage slot, in the order the remote node returned it
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotWitness {
    pub slot: StorageSlot,
    pub witness: Vec<Bytes>,
}

/// Everything the home-chain verifier needs to accept one storage value
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProofInputObject {
    pub target: Address,
    pub layout: StorageLayout,
    /// Declared byte length of the value (32 for fixed words)
    pub length: usize,
    pub storage_proofs: Vec<SlotWitness>,
    pub linkage: RootLinkage,
    /// Account witness of `target` against the remote state root
    pub account_witness: Vec<Bytes>,
}

/// ABI shapes the verifier contracts decode
pub mod wire {
    use alloy_sol_types::sol;

    sol! {
        struct StorageProof {
            bytes32 key;
            bytes[] storageTrieWitness;
        }

        struct OutputRootProof {
            bytes32 version;
            bytes32 stateRoot;
            bytes32 messagePasserStorageRoot;
            bytes32 latestBlockhash;
        }

        struct OutputOracleLinkage {
            uint256 l2OutputIndex;
            OutputRootProof outputRootProof;
        }

        struct ChainBatchHeader {
            uint256 batchIndex;
            bytes32 batchRoot;
            uint256 batchSize;
            uint256 prevTotalElements;
            bytes extraData;
        }

        struct ChainInclusionProof {
            uint256 index;
            bytes32[] siblings;
        }

        struct StateBatchLinkage {
            bytes32 stateRoot;
            ChainBatchHeader stateRootBatchHeader;
            ChainInclusionProof stateRootProof;
        }

        struct BedrockProofInput {
            address target;
            uint8 layout;
            uint256 length;
            StorageProof[] storageProofs;
            OutputOracleLinkage linkage;
            bytes[] stateTrieWitness;
        }

        struct StateBatchProofInput {
            address target;
            uint8 layout;
            uint256 length;
            StorageProof[] storageProofs;
            StateBatchLinkage linkage;
            bytes[] stateTrieWitness;
        }
    }
}

impl From<&OutputOracleLinkage> for wire::OutputOracleLinkage {
    fn from(l: &OutputOracleLinkage) -> Self {
        let p = &l.output_root_proof;
        wire::OutputOracleLinkage {
            l2OutputIndex: l.output_index,
            outputRootProof: wire::OutputRootProof {
                version: p.version,
                stateRoot: p.state_root,
                messagePasserStorageRoot: p.message_passer_storage_root,
                latestBlockhash: p.latest_blockhash,
            },
        }
    }
}

impl From<&StateBatchLinkage> for wire::StateBatchLinkage {
    fn from(l: &StateBatchLinkage) -> Self {
        wire::StateBatchLinkage {
            stateRoot: l.state_root,
            stateRootBatchHeader: wire::ChainBatchHeader {
                batchIndex: l.header.batch_index,
                batchRoot: l.header.batch_root,
                batchSize: l.header.batch_size,
                prevTotalElements: l.header.prev_total_elements,
                extraData: l.header.extra_data.clone(),
            },
            stateRootProof: wire::ChainInclusionProof {
                index: l.index,
                siblings: l.siblings.clone(),
            },
        }
    }
}

impl ProofInputObject {
    fn wire_storage_proofs(&self) -> Vec<wire::StorageProof> {
        self.storage_proofs
            .iter()
            .map(|p| wire::StorageProof {
                key: p.slot.0,
                storageTrieWitness: p.witness.clone(),
            })
            .collect()
    }

    /// ABI encoding of this object as a single `ProofInput` tuple
    pub fn abi_encode(&self) -> Vec<u8> {
        match &self.linkage {
            RootLinkage::OutputOracle(l) => self.bedrock_input(l).abi_encode(),
            RootLinkage::StateBatch(l) => self.state_batch_input(l).abi_encode(),
        }
    }

    fn bedrock_input(&self, linkage: &OutputOracleLinkage) -> wire::BedrockProofInput {
        wire::BedrockProofInput {
            target: self.target,
            layout: self.layout.tag(),
            length: U256::from(self.length),
            storageProofs: self.wire_storage_proofs(),
            linkage: linkage.into(),
            stateTrieWitness: self.account_witness.clone(),
        }
    }

    fn state_batch_input(&self, linkage: &StateBatchLinkage) -> wire::StateBatchProofInput {
        wire::StateBatchProofInput {
            target: self.target,
            layout: self.layout.tag(),
            length: U256::from(self.length),
            storageProofs: self.wire_storage_proofs(),
            linkage: linkage.into(),
            stateTrieWitness: self.account_witness.clone(),
        }
    }
}

/// `abi.encode(bytes result, ProofInput[] proofs)`
///
/// All proofs of one response must use the same linkage scheme since the
/// verifier decodes a homogeneous array.
pub fn encode_response(result: &[u8], proofs: &[ProofInputObject]) -> ProofResult<Bytes> {
    let result = Bytes::copy_from_slice(result);
    let Some(first) = proofs.first() else {
        // an empty dynamic array encodes identically for either scheme
        let empty: Vec<wire::BedrockProofInput> = Vec::new();
        return Ok((result, empty).abi_encode_params().into());
    };

    let encoded = match &first.linkage {
        RootLinkage::OutputOracle(_) => {
            let inputs = proofs
                .iter()
                .map(|p| match &p.linkage {
                    RootLinkage::OutputOracle(l) => Ok(p.bedrock_input(l)),
                    RootLinkage::StateBatch(_) => Err(mixed_schemes()),
                })
                .collect::<ProofResult<Vec<_>>>()?;
            (result, inputs).abi_encode_params()
        }
        RootLinkage::StateBatch(_) => {
            let inputs = proofs
                .iter()
                .map(|p| match &p.linkage {
                    RootLinkage::StateBatch(l) => Ok(p.state_batch_input(l)),
                    RootLinkage::OutputOracle(_) => Err(mixed_schemes()),
                })
                .collect::<ProofResult<Vec<_>>>()?;
            (result, inputs).abi_encode_params()
        }
    };
    Ok(encoded.into())
}

fn mixed_schemes() -> ProofError {
    ProofError::invalid_proof("response mixes output-oracle and state-batch proofs")
}
