// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

pub mod error;
pub mod evm;

pub use error::{ProofError, ProofResult, RpcContext};
pub use evm::{keccak256, keccak256_concat, to_hex, word_to_u64};
