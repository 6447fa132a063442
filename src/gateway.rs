// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Per-resolver dispatchers built from the gateway configuration.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;

use crate::client::{EthRpcClient, HomeChain, RemoteChain};
use crate::config::{CommitmentContract, GatewayConfig, ProofEntry, ResolverEntry};
use crate::proofs::common::{ProofError, ProofResult};
use crate::proofs::storage::ProofAssembler;
use crate::proofs::trust::{LinkageSource, OutputOracleSource, StateBatchSource};
use crate::resolver::{GatewayResponse, RequestDispatcher};

/// How requests for one configured resolver are answered
#[derive(Clone)]
pub enum Handler {
    /// Answered by a separate signing gateway
    Signing,
    Proof(RequestDispatcher),
}

/// All configured resolvers, shared read-only by every request
#[derive(Clone, Default)]
pub struct Gateway {
    handlers: HashMap<Address, Handler>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect the chain clients of every proof entry
    pub async fn from_config(config: &GatewayConfig) -> ProofResult<Self> {
        let mut gateway = Self::new();
        for (address, entry) in &config.resolvers {
            let handler = match entry {
                ResolverEntry::Signing(_) => Handler::Signing,
                ResolverEntry::OptimismBedrock(entry) => {
                    Handler::Proof(connect(entry).await.map_err(|e| {
                        ProofError::config(format!("resolver {address}: {e}"))
                    })?)
                }
            };
            tracing::info!(resolver = %address, kind = handler.kind(), "configured resolver");
            gateway.insert(*address, handler);
        }
        Ok(gateway)
    }

    pub fn insert(&mut self, resolver: Address, handler: Handler) {
        self.handlers.insert(resolver, handler);
    }

    /// Answer `calldata` sent to `sender`
    pub async fn handle(&self, sender: Address, calldata: &[u8]) -> ProofResult<GatewayResponse> {
        match self.handlers.get(&sender) {
            Some(Handler::Proof(dispatcher)) => dispatcher.handle(calldata).await,
            Some(Handler::Signing) => Err(ProofError::not_served(format!(
                "{sender} is answered by a signing gateway"
            ))),
            None => Err(ProofError::not_served(format!("unknown resolver {sender}"))),
        }
    }
}

impl Handler {
    fn kind(&self) -> &'static str {
        match self {
            Handler::Signing => "signing",
            Handler::Proof(_) => "proof",
        }
    }
}

async fn connect(entry: &ProofEntry) -> ProofResult<RequestDispatcher> {
    let home = EthRpcClient::new(entry.l1_provider_url.clone());
    let remote = EthRpcClient::new(entry.l2_provider_url.clone());

    check_chain_id(&home, entry.l1_chain_id, "home").await?;
    check_chain_id(&remote, entry.l2_chain_id, "remote").await?;

    let home: Arc<dyn HomeChain> = Arc::new(home);
    let remote: Arc<dyn RemoteChain> = Arc::new(remote);
    let linkage: Arc<dyn LinkageSource> = match entry.commitment {
        CommitmentContract::OutputOracle(oracle) => {
            Arc::new(OutputOracleSource::new(home, oracle))
        }
        CommitmentContract::StateCommitmentChain(chain) => {
            Arc::new(StateBatchSource::new(home, chain).with_from_block(entry.logs_from_block))
        }
    };

    Ok(RequestDispatcher::new(
        ProofAssembler::new(remote, linkage),
        entry.l2_resolver,
    ))
}

async fn check_chain_id(client: &EthRpcClient, expected: u64, side: &str) -> ProofResult<()> {
    let actual = client.chain_id().await.map_err(|e| {
        ProofError::config(format!("{side} chain at {} unreachable: {e:#}", client.url()))
    })?;
    if actual != expected {
        return Err(ProofError::config(format!(
            "{side} chain at {} reports chain id {actual}, expected {expected}",
            client.url()
        )));
    }
    Ok(())
}
