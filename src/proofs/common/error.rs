// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Main error type for request decoding, proof assembly and gateway setup
#[derive(Error, Debug)]
pub enum ProofError {
    /// Calldata does not match any known call shape
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Selector is recognized but not served, or not known at all
    #[error("Unsupported signature: {signature}")]
    UnsupportedSignature { signature: String },

    /// The request targets a resolver this gateway does not serve proofs for
    #[error("Resolver not served: {reason}")]
    NotServed { reason: String },

    /// The home chain has not finalized any remote commitment yet
    #[error("Root not found: {reason}")]
    RootNotFound { reason: String },

    /// The remote node returned a different number of storage witnesses than requested
    #[error("invalid proof response: expected {expected} storage proofs, got {actual}")]
    ProofLengthMismatch { expected: usize, actual: usize },

    /// RPC communication errors, propagated verbatim
    #[error("RPC error: {message}")]
    Rpc {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Invalid proof structure or data
    #[error("Invalid proof: {reason}")]
    InvalidProof { reason: String },

    /// Malformed or missing configuration
    #[error("Config error: {message}")]
    Config { message: String },
}

impl ProofError {
    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an unsupported-signature error
    pub fn unsupported(signature: impl Into<String>) -> Self {
        Self::UnsupportedSignature {
            signature: signature.into(),
        }
    }

    pub fn not_served(reason: impl Into<String>) -> Self {
        Self::NotServed {
            reason: reason.into(),
        }
    }

    pub fn root_not_found(reason: impl Into<String>) -> Self {
        Self::RootNotFound {
            reason: reason.into(),
        }
    }

    /// Create an RPC error
    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc {
            message: message.into(),
            source: None,
        }
    }

    /// Create an RPC error with source; the source message is kept in the display text
    pub fn rpc_with_source(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Rpc {
            message: format!("{}: {:#}", message.into(), source),
            source: Some(source),
        }
    }

    /// Create an invalid proof error
    pub fn invalid_proof(reason: impl Into<String>) -> Self {
        Self::InvalidProof {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Errors that mean "not supported here" rather than "request failed"
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSignature { .. } | Self::NotServed { .. }
        )
    }
}

/// Result type alias using ProofError
pub type ProofResult<T> = Result<T, ProofError>;

/// Wrap transport failures into [`ProofError::Rpc`]
pub trait RpcContext<T> {
    fn rpc_context(self, message: impl Into<String>) -> ProofResult<T>;
}

impl<T> RpcContext<T> for anyhow::Result<T> {
    fn rpc_context(self, message: impl Into<String>) -> ProofResult<T> {
        self.map_err(|e| ProofError::rpc_with_source(message, e))
    }
}
