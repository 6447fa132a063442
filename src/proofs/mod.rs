// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

pub mod common;
pub mod storage;
pub mod trust;

pub use common::{ProofError, ProofResult};
pub use storage::{derive_slot, encode_response, ProofAssembler, ProofInputObject, SlotWitness};
pub use trust::{
    verify_linkage, FixedLinkage, LinkageSource, OutputOracleSource, ResolvedLinkage, RootLinkage,
    StateBatchSource,
};
