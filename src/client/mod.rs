// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Access to the home and remote chains, over JSON-RPC or in memory.

pub mod chain;
pub mod memory;
pub mod rpc;
pub mod types;

pub use chain::{HomeChain, RemoteChain};
pub use memory::{MemoryHome, MemoryRemote, RecordingRemote};
pub use rpc::EthRpcClient;
