// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};

use crate::client::types::EthAccountProof;
use crate::client::RemoteChain;
use crate::proofs::common::{evm::word_to_u64, ProofError, ProofResult, RpcContext};
use crate::proofs::storage::bundle::{ProofInputObject, SlotWitness};
use crate::proofs::storage::layout::{
    concat_and_truncate, decode_length, decode_short, long_value_slots, ValueKind,
};
use crate::proofs::storage::slots::version_slot;
use crate::proofs::trust::{LinkageSource, ResolvedLinkage};
use crate::types::{StorageLayout, StorageSlot};

/// Builds storage proofs against the latest finalized remote block.
///
/// Holds read-only chain handles shared by every request; nothing is cached
/// between calls and nothing is retried.
#[derive(Clone)]
pub struct ProofAssembler {
    remote: Arc<dyn RemoteChain>,
    linkage: Arc<dyn LinkageSource>,
}

impl ProofAssembler {
    pub fn new(remote: Arc<dyn RemoteChain>, linkage: Arc<dyn LinkageSource>) -> Self {
        Self { remote, linkage }
    }

    /// Most recent remote block whose state root the home chain has finalized
    pub async fn resolve_anchor(&self) -> ProofResult<ResolvedLinkage> {
        self.linkage.resolve(self.remote.as_ref()).await
    }

    /// Current record version of `(context, node)` at the anchor block
    pub async fn record_version(
        &self,
        anchor: &ResolvedLinkage,
        target: Address,
        context: Address,
        node: B256,
    ) -> ProofResult<u64> {
        let slot = version_slot(context, node);
        let word = self.read_word(anchor, target, slot).await?;
        Ok(word_to_u64(&word))
    }

    /// Resolve the anchor, then prove the value at `slot`
    pub async fn build_proof(
        &self,
        target: Address,
        slot: StorageSlot,
        layout: StorageLayout,
    ) -> ProofResult<(Bytes, ProofInputObject)> {
        let anchor = self.resolve_anchor().await?;
        self.build_proof_at(&anchor, target, slot, layout).await
    }

    /// Prove the value at `slot` at an already resolved anchor
    ///
    /// # Returns
    /// The decoded value and the proof object the verifier replays
    pub async fn build_proof_at(
        &self,
        anchor: &ResolvedLinkage,
        target: Address,
        slot: StorageSlot,
        layout: StorageLayout,
    ) -> ProofResult<(Bytes, ProofInputObject)> {
        // Step 1: Head word at the anchor block
        let word = self.read_word(anchor, target, slot).await?;

        // Step 2: Work out which slots carry the value
        let (value, length, slots) = match layout {
            StorageLayout::Fixed => (None, 32, vec![slot]),
            StorageLayout::Dynamic => match decode_length(&word)? {
                (0, ValueKind::Short) => (Some(Vec::new()), 0, Vec::new()),
                (length, ValueKind::Short) => {
                    (Some(decode_short(&word, length)?), length, vec![slot])
                }
                (length, ValueKind::Long) => (None, length, long_value_slots(&slot, length)?),
            },
        };

        tracing::debug!(
            %target,
            %slot,
            ?layout,
            length,
            slots = slots.len(),
            block = anchor.block_number,
            "fetching storage witnesses"
        );

        // Step 3: One batched witness call for every slot, in order
        let response = self.fetch_witnesses(anchor, target, &slots).await?;

        // Step 4: Value from the witnessed words
        let value = match value {
            Some(v) => {
                check_head_word(&response, &word)?;
                v
            }
            None => {
                let words: Vec<B256> = response.storage_proof.iter().map(|p| p.word()).collect();
                match layout {
                    StorageLayout::Fixed => words[0].to_vec(),
                    StorageLayout::Dynamic => concat_and_truncate(&words, length)?,
                }
            }
        };

        // Step 5: Package
        let proof = ProofInputObject {
            target,
            layout,
            length,
            storage_proofs: response
                .storage_proof
                .into_iter()
                .map(|p| SlotWitness {
                    slot: StorageSlot(p.slot()),
                    witness: p.proof,
                })
                .collect(),
            linkage: anchor.linkage.clone(),
            account_witness: response.account_proof,
        };

        Ok((Bytes::from(value), proof))
    }

    async fn read_word(
        &self,
        anchor: &ResolvedLinkage,
        target: Address,
        slot: StorageSlot,
    ) -> ProofResult<B256> {
        self.remote
            .storage_at(target, slot, anchor.block_number)
            .await
            .rpc_context(format!(
                "failed to read slot {slot} of {target} at block {}",
                anchor.block_number
            ))
    }

    /// Witnesses for `slots`, checked for count, order and target
    async fn fetch_witnesses(
        &self,
        anchor: &ResolvedLinkage,
        target: Address,
        slots: &[StorageSlot],
    ) -> ProofResult<EthAccountProof> {
        let response = self
            .remote
            .proof(target, slots, anchor.block_number)
            .await
            .rpc_context(format!(
                "failed to fetch proof for {target} at block {}",
                anchor.block_number
            ))?;

        if response.storage_proof.len() != slots.len() {
            return Err(ProofError::ProofLengthMismatch {
                expected: slots.len(),
                actual: response.storage_proof.len(),
            });
        }
        if response.address != target {
            return Err(ProofError::invalid_proof(format!(
                "proof is for account {} instead of {target}",
                response.address
            )));
        }
        for (requested, returned) in slots.iter().zip(&response.storage_proof) {
            if requested.0 != returned.slot() {
                return Err(ProofError::invalid_proof(format!(
                    "storage proof order broken: requested {requested}, got {}",
                    returned.slot()
                )));
            }
        }
        Ok(response)
    }
}

/// A short value's witness must prove the same word that was read
fn check_head_word(response: &EthAccountProof, word: &B256) -> ProofResult<()> {
    match response.storage_proof.first() {
        Some(p) if p.word() != *word => Err(ProofError::invalid_proof(format!(
            "witnessed word {} differs from read word {word}",
            p.word()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, U256};
    use async_trait::async_trait;

    use super::*;
    use crate::client::types::EthBlock;
    use crate::client::{MemoryRemote, RecordingRemote};
    use crate::proofs::storage::layout::long_slot_count;
    use crate::proofs::trust::{FixedLinkage, OutputOracleLinkage, OutputRootProof, RootLinkage};

    const TARGET: Address = address!("c5b5a4a4b1e2e1c9d8f4e5f3b2d1a0a9b8c7d6e5");

    fn anchor() -> ResolvedLinkage {
        ResolvedLinkage {
            block_number: 42,
            state_root: B256::repeat_byte(0x11),
            linkage: RootLinkage::OutputOracle(OutputOracleLinkage {
                output_index: U256::from(1),
                output_root_proof: OutputRootProof {
                    version: B256::ZERO,
                    state_root: B256::repeat_byte(0x11),
                    message_passer_storage_root: B256::repeat_byte(0x22),
                    latest_blockhash: B256::repeat_byte(0x33),
                },
            }),
        }
    }

    fn assembler<R: RemoteChain + 'static>(remote: Arc<R>) -> ProofAssembler {
        ProofAssembler::new(remote, Arc::new(FixedLinkage::new(anchor())))
    }

    #[tokio::test]
    async fn short_value_has_one_storage_proof() {
        let remote = Arc::new(MemoryRemote::new());
        let slot = StorageSlot::from_index(5);
        remote.set_dynamic(TARGET, slot, b"bar");

        let (value, proof) = assembler(remote)
            .build_proof(TARGET, slot, StorageLayout::Dynamic)
            .await
            .unwrap();

        assert_eq!(&value[..], b"bar");
        assert_eq!(proof.length, 3);
        assert_eq!(proof.storage_proofs.len(), 1);
        assert_eq!(proof.storage_proofs[0].slot, slot);
        assert_eq!(proof.linkage, anchor().linkage);
        assert!(!proof.account_witness.is_empty());
    }

    #[tokio::test]
    async fn empty_value_has_no_storage_proofs() {
        let remote = Arc::new(RecordingRemote::new(MemoryRemote::new()));
        let slot = StorageSlot::from_index(9);

        let (value, proof) = assembler(remote.clone())
            .build_proof(TARGET, slot, StorageLayout::Dynamic)
            .await
            .unwrap();

        assert!(value.is_empty());
        assert_eq!(proof.length, 0);
        assert!(proof.storage_proofs.is_empty());
        // the account witness is still fetched
        assert_eq!(remote.take_proof_calls(), vec![Vec::<StorageSlot>::new()]);
        assert!(!proof.account_witness.is_empty());
    }

    #[tokio::test]
    async fn boundary_value_stays_short() {
        let remote = Arc::new(MemoryRemote::new());
        let slot = StorageSlot::from_index(3);
        let value = [0x61u8; 31];
        remote.set_dynamic(TARGET, slot, &value);

        let (got, proof) = assembler(remote)
            .build_proof(TARGET, slot, StorageLayout::Dynamic)
            .await
            .unwrap();
        assert_eq!(&got[..], &value[..]);
        assert_eq!(proof.storage_proofs.len(), 1);
    }

    #[tokio::test]
    async fn long_value_is_fetched_in_one_batch() {
        let remote = Arc::new(RecordingRemote::new(MemoryRemote::new()));
        let slot = StorageSlot::from_index(10);
        let profile = br#"{"name":"alice","avatar":"ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi","url":"https://alice.example"}"#;
        remote.inner().set_dynamic(TARGET, slot, profile);

        let (value, proof) = assembler(remote.clone())
            .build_proof(TARGET, slot, StorageLayout::Dynamic)
            .await
            .unwrap();

        assert_eq!(&value[..], &profile[..]);
        assert_eq!(proof.length, profile.len());
        let expected = long_value_slots(&slot, profile.len()).unwrap();
        assert_eq!(expected.len(), long_slot_count(profile.len()));
        assert_eq!(remote.take_proof_calls(), vec![expected.clone()]);
        let proved: Vec<StorageSlot> = proof.storage_proofs.iter().map(|p| p.slot).collect();
        assert_eq!(proved, expected);
    }

    #[tokio::test]
    async fn fixed_word_is_returned_whole() {
        let remote = Arc::new(MemoryRemote::new());
        let slot = StorageSlot::from_index(77);
        remote.set_word(TARGET, slot, B256::repeat_byte(0x42));

        let (value, proof) = assembler(remote)
            .build_proof(TARGET, slot, StorageLayout::Fixed)
            .await
            .unwrap();
        assert_eq!(&value[..], &[0x42u8; 32]);
        assert_eq!(proof.length, 32);
        assert_eq!(proof.layout, StorageLayout::Fixed);
        assert_eq!(proof.storage_proofs.len(), 1);
    }

    #[tokio::test]
    async fn unset_fixed_word_still_gets_a_proof() {
        let remote = Arc::new(MemoryRemote::new());
        let (value, proof) = assembler(remote)
            .build_proof(TARGET, StorageSlot::from_index(1), StorageLayout::Fixed)
            .await
            .unwrap();
        assert_eq!(&value[..], &[0u8; 32]);
        assert_eq!(proof.storage_proofs.len(), 1);
    }

    #[tokio::test]
    async fn record_version_reads_low_bytes() {
        let remote = Arc::new(MemoryRemote::new());
        let context = Address::repeat_byte(0x01);
        let node = B256::repeat_byte(0x02);
        remote.set_word(
            TARGET,
            version_slot(context, node),
            B256::from(U256::from(3)),
        );
        let asm = assembler(remote);
        let anchor = asm.resolve_anchor().await.unwrap();
        assert_eq!(asm.record_version(&anchor, TARGET, context, node).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn huge_length_word_is_rejected_before_fetching() {
        let remote = Arc::new(RecordingRemote::new(MemoryRemote::new()));
        let slot = StorageSlot::from_index(6);
        remote
            .inner()
            .set_word(TARGET, slot, B256::from(U256::from(u64::MAX)));

        let err = assembler(remote.clone())
            .build_proof(TARGET, slot, StorageLayout::Dynamic)
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::InvalidProof { .. }));
        assert!(remote.take_proof_calls().is_empty());
    }

    /// Drops the last storage witness of every multi-slot response
    struct TruncatingRemote(MemoryRemote);

    #[async_trait]
    impl RemoteChain for TruncatingRemote {
        async fn storage_at(
            &self,
            target: Address,
            slot: StorageSlot,
            block: u64,
        ) -> anyhow::Result<B256> {
            self.0.storage_at(target, slot, block).await
        }

        async fn proof(
            &self,
            target: Address,
            slots: &[StorageSlot],
            block: u64,
        ) -> anyhow::Result<EthAccountProof> {
            let mut proof = self.0.proof(target, slots, block).await?;
            if proof.storage_proof.len() > 1 {
                proof.storage_proof.pop();
            }
            Ok(proof)
        }

        async fn block(&self, number: u64) -> anyhow::Result<EthBlock> {
            self.0.block(number).await
        }
    }

    #[tokio::test]
    async fn truncated_response_is_a_length_mismatch() {
        let inner = MemoryRemote::new();
        let slot = StorageSlot::from_index(2);
        inner.set_dynamic(TARGET, slot, &[0x7a; 100]);

        let err = assembler(Arc::new(TruncatingRemote(inner)))
            .build_proof(TARGET, slot, StorageLayout::Dynamic)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProofError::ProofLengthMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn unresolved_linkage_is_fatal() {
        let remote: Arc<dyn RemoteChain> = Arc::new(MemoryRemote::new());
        let asm = ProofAssembler::new(remote, Arc::new(FixedLinkage::unresolved()));
        let err = asm
            .build_proof(TARGET, StorageSlot::from_index(0), StorageLayout::Dynamic)
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::RootNotFound { .. }));
    }
}
