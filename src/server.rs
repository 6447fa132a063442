// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! HTTP front of the gateway: `GET /{sender}/{calldata}`.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::gateway::Gateway;
use crate::proofs::common::{to_hex, ProofError, ProofResult};

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/:sender/:calldata", get(handle_lookup))
        .with_state(gateway)
}

/// Serve until the process is stopped
pub async fn serve(gateway: Arc<Gateway>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, router(gateway)).await?;
    Ok(())
}

async fn handle_lookup(
    State(gateway): State<Arc<Gateway>>,
    Path((sender, calldata)): Path<(String, String)>,
) -> Response {
    match lookup(&gateway, &sender, &calldata).await {
        Ok(data) => (StatusCode::OK, Json(json!({ "data": to_hex(&data) }))).into_response(),
        Err(e) => {
            let status = status_for(&e);
            tracing::warn!(%sender, status = status.as_u16(), "request rejected: {e}");
            (status, Json(json!({ "message": e.to_string() }))).into_response()
        }
    }
}

async fn lookup(gateway: &Gateway, sender: &str, calldata: &str) -> ProofResult<Bytes> {
    let sender = Address::from_str(sender)
        .map_err(|e| ProofError::decode(format!("invalid sender {sender:?}: {e}")))?;
    let calldata = Bytes::from_str(strip_json_suffix(calldata))
        .map_err(|e| ProofError::decode(format!("calldata is not hex: {e}")))?;
    gateway.handle(sender, &calldata).await?.encode()
}

/// Clients may append `.json` to the calldata segment
pub fn strip_json_suffix(calldata: &str) -> &str {
    calldata.strip_suffix(".json").unwrap_or(calldata)
}

/// 404 for anything not served here, 400 for every other failure
pub fn status_for(err: &ProofError) -> StatusCode {
    if err.is_unsupported() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_REQUEST
    }
}
