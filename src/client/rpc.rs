// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::time::Duration;
use url::Url;

use crate::client::types::{EthAccountProof, EthBlock, EthLog};

/// Request timeout of the RPC client
const DEFAULT_REQ_TIMEOUT: Duration = Duration::from_secs(30);

/// Hex quantity for a block number, as the JSON-RPC API expects it
pub fn block_tag(number: u64) -> String {
    format!("0x{number:x}")
}

/// A simple Ethereum JSON-RPC client
#[derive(Clone, Debug)]
pub struct EthRpcClient {
    http_client: reqwest::Client,
    url: Url,
}

impl EthRpcClient {
    /// Creates a new client that sends requests to `url`
    pub fn new(url: Url) -> Self {
        Self {
            http_client: reqwest::Client::default(),
            url,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the chain id reported by the node
    pub async fn chain_id(&self) -> Result<u64> {
        let r = self.request::<U256>("eth_chainId", json!([])).await?;
        tracing::debug!("received eth_chainId response: {r}");
        u64::try_from(r).context("chain id does not fit into u64")
    }

    /// Read one storage word at an exact block
    pub async fn get_storage_at(&self, address: Address, slot: B256, block: u64) -> Result<B256> {
        let r = self
            .request::<U256>(
                "eth_getStorageAt",
                json!([address, slot, block_tag(block)]),
            )
            .await?;
        tracing::debug!(%address, %slot, block, "received eth_getStorageAt response: {r:#x}");
        Ok(B256::from(r))
    }

    /// Fetch account and storage witnesses for `keys` in one call
    pub async fn get_proof(
        &self,
        address: Address,
        keys: &[B256],
        block: u64,
    ) -> Result<EthAccountProof> {
        let r = self
            .request::<EthAccountProof>("eth_getProof", json!([address, keys, block_tag(block)]))
            .await?;
        tracing::debug!(
            %address,
            block,
            requested = keys.len(),
            returned = r.storage_proof.len(),
            "received eth_getProof response"
        );
        Ok(r)
    }

    /// Get block header fields by number
    pub async fn get_block_by_number(&self, number: u64) -> Result<EthBlock> {
        let r = self
            .request::<Option<EthBlock>>("eth_getBlockByNumber", json!([block_tag(number), false]))
            .await?;
        r.with_context(|| format!("block {number} not found"))
    }

    /// Execute a read-only call against the latest state
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let r = self
            .request::<Bytes>("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        tracing::debug!(%to, "received eth_call response: {r}");
        Ok(r)
    }

    /// Get logs with filter
    pub async fn get_logs(
        &self,
        address: Address,
        topics: Vec<Option<B256>>,
        from_block: &str,
        to_block: &str,
    ) -> Result<Vec<EthLog>> {
        let filter = json!({
            "fromBlock": from_block,
            "toBlock": to_block,
            "address": address,
            "topics": topics
        });
        let r = self.request::<Vec<EthLog>>("eth_getLogs", json!([filter])).await?;
        tracing::debug!("received {} logs from eth_getLogs", r.len());
        Ok(r)
    }

    /// Make a generic RPC request
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        tracing::debug!("{} request: {}", method, request_body);

        let response = self
            .http_client
            .post(self.url.as_str())
            .json(&request_body)
            .timeout(DEFAULT_REQ_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("{method} request to {} failed", self.url))?;
        let response_body = response.text().await?;
        tracing::debug!("{} raw response: {}", method, response_body);

        // Parse the JSON-RPC response
        let value: Value = serde_json::from_str(&response_body)
            .with_context(|| format!("{method} response is not JSON"))?;

        if let Some(error) = value.get("error") {
            let error_msg = error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            anyhow::bail!("{} RPC error: {}", method, error_msg);
        } else if let Some(result) = value.get("result") {
            let data: T = serde_json::from_value(result.clone())
                .with_context(|| format!("unexpected {method} result shape"))?;
            Ok(data)
        } else {
            anyhow::bail!("{} response has neither result nor error", method);
        }
    }
}
