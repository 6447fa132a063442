// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use super::chain::{HomeChain, RemoteChain};
use super::types::{EthAccountProof, EthBlock, EthLog, EthStorageProof};
use crate::proofs::common::evm::keccak256;
use crate::proofs::storage::layout::encode_dynamic;
use crate::types::StorageSlot;

/// In-memory remote chain with a single storage state shared by all blocks.
///
/// Witness nodes are placeholders (the hash of what they would prove); this
/// store is for exercising the assembly pipeline, not for on-chain replay.
#[derive(Default)]
pub struct MemoryRemote {
    storage: Mutex<HashMap<(Address, StorageSlot), B256>>,
    blocks: Mutex<HashMap<u64, EthBlock>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one raw word
    pub fn set_word(&self, target: Address, slot: StorageSlot, word: B256) {
        self.storage.lock().insert((target, slot), word);
    }

    /// Store a dynamic byte string the way the compiler lays it out
    pub fn set_dynamic(&self, target: Address, slot: StorageSlot, value: &[u8]) {
        let mut storage = self.storage.lock();
        for (slot, word) in encode_dynamic(&slot, value) {
            storage.insert((target, slot), word);
        }
    }

    pub fn insert_block(&self, number: u64, hash: B256, state_root: B256) {
        self.blocks.lock().insert(
            number,
            EthBlock {
                number: U256::from(number),
                hash,
                state_root,
            },
        );
    }

    fn word(&self, target: Address, slot: &StorageSlot) -> B256 {
        self.storage
            .lock()
            .get(&(target, *slot))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteChain for MemoryRemote {
    async fn storage_at(&self, target: Address, slot: StorageSlot, _block: u64) -> Result<B256> {
        Ok(self.word(target, &slot))
    }

    async fn proof(
        &self,
        target: Address,
        slots: &[StorageSlot],
        _block: u64,
    ) -> Result<EthAccountProof> {
        let storage_proof = slots
            .iter()
            .map(|slot| EthStorageProof {
                key: slot.as_u256(),
                value: U256::from_be_bytes(self.word(target, slot).0),
                proof: vec![Bytes::from(keccak256(slot.as_bytes()).to_vec())],
            })
            .collect();

        Ok(EthAccountProof {
            address: target,
            account_proof: vec![Bytes::from(keccak256(target.as_slice()).to_vec())],
            balance: U256::ZERO,
            code_hash: keccak256(b""),
            nonce: U256::from(1),
            storage_hash: keccak256([target.as_slice(), &b"storage"[..]].concat()),
            storage_proof,
        })
    }

    async fn block(&self, number: u64) -> Result<EthBlock> {
        self.blocks
            .lock()
            .get(&number)
            .cloned()
            .ok_or_else(|| anyhow!("block {number} not found"))
    }
}

/// Recording wrapper that tracks which reads and witness calls were issued
pub struct RecordingRemote<R: RemoteChain> {
    inner: R,
    reads: Mutex<Vec<StorageSlot>>,
    proof_calls: Mutex<Vec<Vec<StorageSlot>>>,
}

impl<R: RemoteChain> RecordingRemote<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            reads: Default::default(),
            proof_calls: Default::default(),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Slots read through `storage_at`, in call order
    pub fn take_reads(&self) -> Vec<StorageSlot> {
        std::mem::take(&mut *self.reads.lock())
    }

    /// Slot lists of every witness call, in call order
    pub fn take_proof_calls(&self) -> Vec<Vec<StorageSlot>> {
        std::mem::take(&mut *self.proof_calls.lock())
    }
}

#[async_trait]
impl<R: RemoteChain> RemoteChain for RecordingRemote<R> {
    async fn storage_at(&self, target: Address, slot: StorageSlot, block: u64) -> Result<B256> {
        self.reads.lock().push(slot);
        self.inner.storage_at(target, slot, block).await
    }

    async fn proof(
        &self,
        target: Address,
        slots: &[StorageSlot],
        block: u64,
    ) -> Result<EthAccountProof> {
        self.proof_calls.lock().push(slots.to_vec());
        self.inner.proof(target, slots, block).await
    }

    async fn block(&self, number: u64) -> Result<EthBlock> {
        self.inner.block(number).await
    }
}

/// In-memory home chain answering canned `eth_call`s and logs
#[derive(Default)]
pub struct MemoryHome {
    calls: Mutex<HashMap<(Address, Bytes), Bytes>>,
    logs: Mutex<Vec<EthLog>>,
}

impl MemoryHome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `eth_call(to, data)` with `ret`
    pub fn on_call(&self, to: Address, data: impl Into<Bytes>, ret: impl Into<Bytes>) {
        self.calls.lock().insert((to, data.into()), ret.into());
    }

    pub fn push_log(&self, log: EthLog) {
        self.logs.lock().push(log);
    }
}

#[async_trait]
impl HomeChain for MemoryHome {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.calls
            .lock()
            .get(&(to, data.clone()))
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted: no canned response for {data}"))
    }

    async fn logs(
        &self,
        address: Address,
        topics: Vec<Option<B256>>,
        from_block: u64,
    ) -> Result<Vec<EthLog>> {
        let logs = self.logs.lock();
        Ok(logs
            .iter()
            .filter(|log| log.address == address)
            .filter(|log| log.block_number.map_or(true, |n| n >= U256::from(from_block)))
            .filter(|log| {
                topics.iter().enumerate().all(|(i, topic)| match topic {
                    Some(t) => log.topics.get(i) == Some(t),
                    None => true,
                })
            })
            .cloned()
            .collect())
    }
}
