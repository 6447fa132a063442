// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use alloy_primitives::{Address, Bytes, B256};
use anyhow::Result;
use async_trait::async_trait;

use super::rpc::{block_tag, EthRpcClient};
use super::types::{EthAccountProof, EthBlock, EthLog};
use crate::types::StorageSlot;

/// Read access to the chain whose storage is being proven.
///
/// Every read is pinned to an explicit block number so that values and
/// witnesses come from the same state root.
#[async_trait]
pub trait RemoteChain: Send + Sync {
    /// Raw 32-byte word at `slot`
    async fn storage_at(&self, target: Address, slot: StorageSlot, block: u64) -> Result<B256>;

    /// Account witness plus one storage witness per slot, in request order
    async fn proof(
        &self,
        target: Address,
        slots: &[StorageSlot],
        block: u64,
    ) -> Result<EthAccountProof>;

    async fn block(&self, number: u64) -> Result<EthBlock>;
}

/// Read access to the chain that holds the finalized commitments
#[async_trait]
pub trait HomeChain: Send + Sync {
    /// `eth_call` against the latest state
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Logs of `address` matching `topics` from block `from_block` to the latest
    async fn logs(
        &self,
        address: Address,
        topics: Vec<Option<B256>>,
        from_block: u64,
    ) -> Result<Vec<EthLog>>;
}

#[async_trait]
impl RemoteChain for EthRpcClient {
    async fn storage_at(&self, target: Address, slot: StorageSlot, block: u64) -> Result<B256> {
        self.get_storage_at(target, slot.0, block).await
    }

    async fn proof(
        &self,
        target: Address,
        slots: &[StorageSlot],
        block: u64,
    ) -> Result<EthAccountProof> {
        let keys: Vec<B256> = slots.iter().map(|s| s.0).collect();
        self.get_proof(target, &keys, block).await
    }

    async fn block(&self, number: u64) -> Result<EthBlock> {
        self.get_block_by_number(number).await
    }
}

#[async_trait]
impl HomeChain for EthRpcClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        EthRpcClient::call(self, to, data).await
    }

    async fn logs(
        &self,
        address: Address,
        topics: Vec<Option<B256>>,
        from_block: u64,
    ) -> Result<Vec<EthLog>> {
        self.get_logs(address, topics, &block_tag(from_block), "latest").await
    }
}
