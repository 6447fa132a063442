// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

pub mod client;
pub mod config;
pub mod gateway;
pub mod proofs;
pub mod resolver;
pub mod server;
pub mod telemetry;
pub mod types;

// Re-export main entry points
pub use gateway::{Gateway, Handler};
pub use proofs::{ProofAssembler, ProofError, ProofResult};
pub use resolver::{GatewayResponse, RequestDispatcher, ResolverRequest};
