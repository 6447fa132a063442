// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use alloy_primitives::{Address, Bytes, U256};
use futures::future::try_join;

use super::encoder::{encode, Auxiliary, ResponseShape};
use super::request::{content_type_bits, ResolverRequest};
use super::GatewayResponse;
use crate::proofs::common::{ProofError, ProofResult};
use crate::proofs::storage::{derive_slot, legacy_address_slot, ProofAssembler, ProofInputObject};
use crate::proofs::trust::ResolvedLinkage;
use crate::types::{FieldKind, RecordKey, StorageLayout};

/// Routes decoded resolver calls to slot derivation, proof assembly and
/// response encoding for one remote resolver contract.
#[derive(Clone)]
pub struct RequestDispatcher {
    assembler: ProofAssembler,
    /// Resolver contract on the remote chain whose storage is proven
    resolver: Address,
}

impl RequestDispatcher {
    pub fn new(assembler: ProofAssembler, resolver: Address) -> Self {
        Self {
            assembler,
            resolver,
        }
    }

    /// Answer one raw resolver call
    pub async fn handle(&self, calldata: &[u8]) -> ProofResult<GatewayResponse> {
        let request = ResolverRequest::decode(calldata)?;
        tracing::debug!(signature = request.signature(), "decoded resolver request");
        self.handle_request(&request).await
    }

    /// Answer an already decoded request
    pub async fn handle_request(&self, request: &ResolverRequest) -> ProofResult<GatewayResponse> {
        // Step 1: Pin every read of this request to one finalized block
        let anchor = self.assembler.resolve_anchor().await?;

        // Step 2: Current record version
        let version = match request.context_node() {
            Some((context, node)) => {
                self.assembler
                    .record_version(&anchor, self.resolver, context, node)
                    .await?
            }
            None => 0,
        };

        // Step 3: Prove and encode per call shape
        let response = match request {
            ResolverRequest::LegacyAddr { node } => {
                let slot = legacy_address_slot(*node);
                let (raw, proof) = self
                    .assembler
                    .build_proof_at(&anchor, self.resolver, slot, StorageLayout::Fixed)
                    .await?;
                GatewayResponse {
                    result: encode(ResponseShape::AddressWord, &raw, None)?,
                    proofs: vec![proof],
                }
            }
            ResolverRequest::PubKey { .. } => {
                let x_key = require_key(request, version)?;
                self.pubkey(&anchor, &x_key).await?
            }
            ResolverRequest::Abi { content_types, .. } => {
                let key = require_key(request, version)?;
                self.abi(&anchor, &key, *content_types).await?
            }
            _ => {
                let key = require_key(request, version)?;
                let (raw, proof) = self.prove_key(&anchor, &key).await?;
                GatewayResponse {
                    result: encode(request.shape(), &raw, None)?,
                    proofs: vec![proof],
                }
            }
        };

        tracing::info!(
            signature = request.signature(),
            resolver = %self.resolver,
            block = anchor.block_number,
            version,
            proofs = response.proofs.len(),
            "served resolver request"
        );
        Ok(response)
    }

    async fn prove_key(
        &self,
        anchor: &ResolvedLinkage,
        key: &RecordKey,
    ) -> ProofResult<(Bytes, ProofInputObject)> {
        let slot = derive_slot(key);
        tracing::debug!(field = %key.field, version = key.version, %slot, "derived record slot");
        self.assembler
            .build_proof_at(anchor, self.resolver, slot, key.field.layout())
            .await
    }

    /// X and Y sit in adjacent slots and are proven concurrently
    async fn pubkey(
        &self,
        anchor: &ResolvedLinkage,
        x_key: &RecordKey,
    ) -> ProofResult<GatewayResponse> {
        let y_key = x_key.with_field(FieldKind::PubKeyY);
        let ((x, x_proof), (y, y_proof)) =
            try_join(self.prove_key(anchor, x_key), self.prove_key(anchor, &y_key)).await?;
        Ok(GatewayResponse {
            result: encode(ResponseShape::PubKey, &x, Some(&Auxiliary::PubKeyY(y)))?,
            proofs: vec![x_proof, y_proof],
        })
    }

    /// First requested content type, lowest bit first, that holds a value
    async fn abi(
        &self,
        anchor: &ResolvedLinkage,
        lowest: &RecordKey,
        content_types: U256,
    ) -> ProofResult<GatewayResponse> {
        let mut fallback = None;
        for content_type in content_type_bits(content_types) {
            let key = RecordKey::abi(lowest.context, lowest.node, lowest.version, content_type);
            let (raw, proof) = self.prove_key(anchor, &key).await?;
            if !raw.is_empty() {
                let aux = Auxiliary::ContentType(content_type);
                return Ok(GatewayResponse {
                    result: encode(ResponseShape::Abi, &raw, Some(&aux))?,
                    proofs: vec![proof],
                });
            }
            if fallback.is_none() {
                fallback = Some((content_type, proof));
            }
        }

        // no requested type is set: prove the emptiness of the lowest one
        let (content_type, proof) = fallback
            .ok_or_else(|| ProofError::decode("ABI content type mask is empty"))?;
        let aux = Auxiliary::ContentType(content_type);
        Ok(GatewayResponse {
            result: encode(ResponseShape::Abi, &[], Some(&aux))?,
            proofs: vec![proof],
        })
    }
}

fn require_key(request: &ResolverRequest, version: u64) -> ProofResult<RecordKey> {
    request.record_key(version).ok_or_else(|| {
        ProofError::decode(format!("{} carries no record key", request.signature()))
    })
}
