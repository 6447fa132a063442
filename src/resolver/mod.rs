// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Resolver call surface: decoding, dispatch and response encoding.

pub mod abi;
pub mod dispatcher;
pub mod encoder;
pub mod request;

use alloy_primitives::Bytes;
use serde::Serialize;

use crate::proofs::common::ProofResult;
use crate::proofs::storage::{encode_response, ProofInputObject};

pub use dispatcher::RequestDispatcher;
pub use encoder::{encode, Auxiliary, ResponseShape};
pub use request::ResolverRequest;

/// ABI-encoded result of one resolver call plus the proofs backing it
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GatewayResponse {
    pub result: Bytes,
    pub proofs: Vec<ProofInputObject>,
}

impl GatewayResponse {
    /// `data` payload handed back to the caller for on-chain replay
    pub fn encode(&self) -> ProofResult<Bytes> {
        encode_response(&self.result, &self.proofs)
    }
}
