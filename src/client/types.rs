// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Response of `eth_getProof` (EIP-1186)
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EthAccountProof {
    pub address: Address,
    pub account_proof: Vec<Bytes>,
    pub balance: U256,
    pub code_hash: B256,
    pub nonce: U256,
    pub storage_hash: B256,
    pub storage_proof: Vec<EthStorageProof>,
}

/// One storage witness inside an `eth_getProof` response
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EthStorageProof {
    // some nodes return the key unpadded, so read it as a quantity
    pub key: U256,
    pub value: U256,
    pub proof: Vec<Bytes>,
}

impl EthStorageProof {
    pub fn slot(&self) -> B256 {
        B256::from(self.key)
    }

    pub fn word(&self) -> B256 {
        B256::from(self.value)
    }
}

/// Header fields of `eth_getBlockByNumber` used for root linkage
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EthBlock {
    pub number: U256,
    pub hash: B256,
    pub state_root: B256,
}

/// Log entry returned by `eth_getLogs`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EthLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U256>,
}
