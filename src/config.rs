// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Gateway configuration: which resolver addresses are served, and how.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::proofs::common::{ProofError, ProofResult};

/// Environment variable holding the configuration as inline JSON
pub const CONFIG_ENV: &str = "GATEWAY_CONFIG";

/// Home-chain contract holding the finalized remote commitments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitmentContract {
    /// Bedrock `L2OutputOracle`
    OutputOracle(Address),
    /// Legacy `StateCommitmentChain`
    StateCommitmentChain(Address),
}

/// Entry answered by a signing service, not by storage proofs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningEntry {
    pub handler_url: Url,
}

/// Entry answered with storage proofs against a remote chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofEntry {
    pub handler_url: Url,
    /// Home chain RPC
    pub l1_provider_url: Url,
    /// Remote chain RPC
    pub l2_provider_url: Url,
    pub l1_chain_id: u64,
    pub l2_chain_id: u64,
    /// Resolver contract on the remote chain whose storage is proven
    pub l2_resolver: Address,
    pub commitment: CommitmentContract,
    /// First home block searched for commitment logs
    #[serde(default)]
    pub logs_from_block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResolverEntry {
    Signing(SigningEntry),
    OptimismBedrock(ProofEntry),
}

/// Resolver address to entry, keyed by parsed address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayConfig {
    pub resolvers: BTreeMap<Address, ResolverEntry>,
}

impl GatewayConfig {
    /// Parse a JSON configuration object
    pub fn from_json(raw: &str) -> ProofResult<Self> {
        let entries: BTreeMap<String, ResolverEntry> = serde_json::from_str(raw)
            .map_err(|e| ProofError::config(format!("malformed gateway config: {e}")))?;

        let mut resolvers = BTreeMap::new();
        for (key, entry) in entries {
            let address = Address::from_str(key.trim()).map_err(|e| {
                ProofError::config(format!("config key {key:?} is not an address: {e}"))
            })?;
            if resolvers.insert(address, entry).is_some() {
                return Err(ProofError::config(format!(
                    "resolver {} configured more than once",
                    address.to_checksum(None)
                )));
            }
        }
        Ok(Self { resolvers })
    }

    /// Read the configuration from `path`
    pub fn from_file(path: &Path) -> ProofResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProofError::config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Read from `path` when given, otherwise from [`CONFIG_ENV`]
    pub fn load(path: Option<&Path>) -> ProofResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let raw = std::env::var(CONFIG_ENV).map_err(|_| {
                    ProofError::config(format!("no --config given and {CONFIG_ENV} is not set"))
                })?;
                Self::from_json(&raw)
            }
        }
    }
}
