// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::{SolCall, SolInterface};

use super::abi::{
    ILegacyResolver,
    IRemoteResolver::{self, IRemoteResolverCalls},
    IUnservedResolver,
};
use super::encoder::ResponseShape;
use crate::proofs::common::{to_hex, ProofError, ProofResult};
use crate::types::{FieldKind, RecordKey, COIN_TYPE_ETH};

/// Resolver functions that are recognized but never proven
const UNSERVED: [([u8; 4], &str); 6] = [
    (
        IUnservedResolver::resolveCall::SELECTOR,
        IUnservedResolver::resolveCall::SIGNATURE,
    ),
    (
        IUnservedResolver::supportsInterfaceCall::SELECTOR,
        IUnservedResolver::supportsInterfaceCall::SIGNATURE,
    ),
    (
        IUnservedResolver::multicallCall::SELECTOR,
        IUnservedResolver::multicallCall::SIGNATURE,
    ),
    (
        IUnservedResolver::setTextCall::SELECTOR,
        IUnservedResolver::setTextCall::SIGNATURE,
    ),
    (
        IUnservedResolver::setAddr_0Call::SELECTOR,
        IUnservedResolver::setAddr_0Call::SIGNATURE,
    ),
    (
        IUnservedResolver::setAddr_1Call::SELECTOR,
        IUnservedResolver::setAddr_1Call::SIGNATURE,
    ),
];

/// One decoded resolver call, carrying exactly the arguments its function takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverRequest {
    Text {
        context: Address,
        node: B256,
        key: String,
    },
    /// `addr(bytes,bytes32)`: the chain-native address
    Addr {
        context: Address,
        node: B256,
    },
    /// `addr(bytes,bytes32,uint256)`: raw address bytes for any coin type
    AddrCoin {
        context: Address,
        node: B256,
        coin_type: U256,
    },
    Abi {
        context: Address,
        node: B256,
        content_types: U256,
    },
    ContentHash {
        context: Address,
        node: B256,
    },
    Name {
        context: Address,
        node: B256,
    },
    PubKey {
        context: Address,
        node: B256,
    },
    DnsRecord {
        context: Address,
        node: B256,
        name: B256,
        resource: u16,
    },
    HasDnsRecords {
        context: Address,
        node: B256,
        name: B256,
    },
    ZoneHash {
        context: Address,
        node: B256,
    },
    InterfaceImplementer {
        context: Address,
        node: B256,
        interface_id: FixedBytes<4>,
    },
    /// `addr(bytes32)` against the flat legacy mapping
    LegacyAddr { node: B256 },
}

impl ResolverRequest {
    /// Decode raw calldata into a typed request
    ///
    /// Unknown selectors and selectors the gateway deliberately does not serve
    /// are `UnsupportedSignature`; anything that fails to parse is `Decode`.
    pub fn decode(calldata: &[u8]) -> ProofResult<Self> {
        let Some(selector) = calldata.get(..4) else {
            return Err(ProofError::decode(format!(
                "calldata too short for a selector: {}",
                to_hex(calldata)
            )));
        };
        let selector: [u8; 4] = [selector[0], selector[1], selector[2], selector[3]];

        if selector == ILegacyResolver::addrCall::SELECTOR {
            let call = ILegacyResolver::addrCall::abi_decode(calldata, true)
                .map_err(|e| ProofError::decode(format!("addr(bytes32): {e}")))?;
            return Ok(ResolverRequest::LegacyAddr { node: call.node });
        }
        if let Some((_, signature)) = UNSERVED.iter().find(|(s, _)| *s == selector) {
            return Err(ProofError::unsupported(*signature));
        }
        if !IRemoteResolverCalls::valid_selector(selector) {
            return Err(ProofError::unsupported(to_hex(selector)));
        }

        let call = IRemoteResolverCalls::abi_decode(calldata, true)
            .map_err(|e| ProofError::decode(format!("malformed arguments: {e}")))?;

        let request = match call {
            IRemoteResolverCalls::text(c) => ResolverRequest::Text {
                context: context_address(&c.context)?,
                node: c.node,
                key: c.key,
            },
            IRemoteResolverCalls::addr_0(c) => ResolverRequest::Addr {
                context: context_address(&c.context)?,
                node: c.node,
            },
            IRemoteResolverCalls::addr_1(c) => ResolverRequest::AddrCoin {
                context: context_address(&c.context)?,
                node: c.node,
                coin_type: c.coin_type,
            },
            IRemoteResolverCalls::ABI(c) => {
                if c.content_types.is_zero() {
                    return Err(ProofError::decode("ABI content type mask is empty"));
                }
                ResolverRequest::Abi {
                    context: context_address(&c.context)?,
                    node: c.node,
                    content_types: c.content_types,
                }
            }
            IRemoteResolverCalls::contenthash(c) => ResolverRequest::ContentHash {
                context: context_address(&c.context)?,
                node: c.node,
            },
            IRemoteResolverCalls::name(c) => ResolverRequest::Name {
                context: context_address(&c.context)?,
                node: c.node,
            },
            IRemoteResolverCalls::pubkey(c) => ResolverRequest::PubKey {
                context: context_address(&c.context)?,
                node: c.node,
            },
            IRemoteResolverCalls::dnsRecord(c) => ResolverRequest::DnsRecord {
                context: context_address(&c.context)?,
                node: c.node,
                name: c.name,
                resource: c.resource,
            },
            IRemoteResolverCalls::hasDNSRecords(c) => ResolverRequest::HasDnsRecords {
                context: context_address(&c.context)?,
                node: c.node,
                name: c.name,
            },
            IRemoteResolverCalls::zonehash(c) => ResolverRequest::ZoneHash {
                context: context_address(&c.context)?,
                node: c.node,
            },
            IRemoteResolverCalls::interfaceImplementer(c) => {
                ResolverRequest::InterfaceImplementer {
                    context: context_address(&c.context)?,
                    node: c.node,
                    interface_id: c.interface_id,
                }
            }
        };
        Ok(request)
    }

    /// Canonical signature of the function this request came from
    pub fn signature(&self) -> &'static str {
        match self {
            ResolverRequest::Text { .. } => IRemoteResolver::textCall::SIGNATURE,
            ResolverRequest::Addr { .. } => IRemoteResolver::addr_0Call::SIGNATURE,
            ResolverRequest::AddrCoin { .. } => IRemoteResolver::addr_1Call::SIGNATURE,
            ResolverRequest::Abi { .. } => IRemoteResolver::ABICall::SIGNATURE,
            ResolverRequest::ContentHash { .. } => IRemoteResolver::contenthashCall::SIGNATURE,
            ResolverRequest::Name { .. } => IRemoteResolver::nameCall::SIGNATURE,
            ResolverRequest::PubKey { .. } => IRemoteResolver::pubkeyCall::SIGNATURE,
            ResolverRequest::DnsRecord { .. } => IRemoteResolver::dnsRecordCall::SIGNATURE,
            ResolverRequest::HasDnsRecords { .. } => IRemoteResolver::hasDNSRecordsCall::SIGNATURE,
            ResolverRequest::ZoneHash { .. } => IRemoteResolver::zonehashCall::SIGNATURE,
            ResolverRequest::InterfaceImplementer { .. } => {
                IRemoteResolver::interfaceImplementerCall::SIGNATURE
            }
            ResolverRequest::LegacyAddr { .. } => ILegacyResolver::addrCall::SIGNATURE,
        }
    }

    /// ABI return type of the originating function
    pub fn shape(&self) -> ResponseShape {
        match self {
            ResolverRequest::Text { .. } | ResolverRequest::Name { .. } => ResponseShape::String,
            ResolverRequest::Addr { .. } => ResponseShape::Address,
            ResolverRequest::AddrCoin { .. }
            | ResolverRequest::ContentHash { .. }
            | ResolverRequest::DnsRecord { .. }
            | ResolverRequest::ZoneHash { .. } => ResponseShape::Bytes,
            ResolverRequest::Abi { .. } => ResponseShape::Abi,
            ResolverRequest::PubKey { .. } => ResponseShape::PubKey,
            ResolverRequest::HasDnsRecords { .. } => ResponseShape::Bool,
            ResolverRequest::InterfaceImplementer { .. } | ResolverRequest::LegacyAddr { .. } => {
                ResponseShape::AddressWord
            }
        }
    }

    /// `(context, node)` of versioned requests; `None` for the legacy mapping
    pub fn context_node(&self) -> Option<(Address, B256)> {
        match self {
            ResolverRequest::Text { context, node, .. }
            | ResolverRequest::Addr { context, node }
            | ResolverRequest::AddrCoin { context, node, .. }
            | ResolverRequest::Abi { context, node, .. }
            | ResolverRequest::ContentHash { context, node }
            | ResolverRequest::Name { context, node }
            | ResolverRequest::PubKey { context, node }
            | ResolverRequest::DnsRecord { context, node, .. }
            | ResolverRequest::HasDnsRecords { context, node, .. }
            | ResolverRequest::ZoneHash { context, node }
            | ResolverRequest::InterfaceImplementer { context, node, .. } => {
                Some((*context, *node))
            }
            ResolverRequest::LegacyAddr { .. } => None,
        }
    }

    /// Record key read for this request at `version`
    ///
    /// For `pubkey` this is the X coordinate; for `ABI` it is the lowest
    /// requested content type.
    pub fn record_key(&self, version: u64) -> Option<RecordKey> {
        let key = match self.clone() {
            ResolverRequest::Text { context, node, key } => {
                RecordKey::text(context, node, version, key)
            }
            ResolverRequest::Addr { context, node } => {
                RecordKey::address(context, node, version, U256::from(COIN_TYPE_ETH))
            }
            ResolverRequest::AddrCoin {
                context,
                node,
                coin_type,
            } => RecordKey::address(context, node, version, coin_type),
            ResolverRequest::Abi {
                context,
                node,
                content_types,
            } => {
                let lowest = content_type_bits(content_types).next()?;
                RecordKey::abi(context, node, version, lowest)
            }
            ResolverRequest::ContentHash { context, node } => {
                RecordKey::plain(context, node, version, FieldKind::ContentHash)
            }
            ResolverRequest::Name { context, node } => {
                RecordKey::plain(context, node, version, FieldKind::Name)
            }
            ResolverRequest::PubKey { context, node } => {
                RecordKey::plain(context, node, version, FieldKind::PubKeyX)
            }
            ResolverRequest::DnsRecord {
                context,
                node,
                name,
                resource,
            } => RecordKey::dns_record(context, node, version, name, resource),
            ResolverRequest::HasDnsRecords {
                context,
                node,
                name,
            } => RecordKey::dns_name_entries(context, node, version, name),
            ResolverRequest::ZoneHash { context, node } => {
                RecordKey::plain(context, node, version, FieldKind::ZoneHash)
            }
            ResolverRequest::InterfaceImplementer {
                context,
                node,
                interface_id,
            } => RecordKey::interface(context, node, version, interface_id),
            ResolverRequest::LegacyAddr { .. } => return None,
        };
        Some(key)
    }
}

/// Single-bit content types set in `mask`, lowest first
pub fn content_type_bits(mask: U256) -> impl Iterator<Item = U256> {
    (0..256usize)
        .filter(move |bit| mask.bit(*bit))
        .map(|bit| U256::from(1) << bit)
}

fn context_address(context: &Bytes) -> ProofResult<Address> {
    if context.len() != 20 {
        return Err(ProofError::decode(format!(
            "context must be a 20-byte address, got {} bytes",
            context.len()
        )));
    }
    Ok(Address::from_slice(context))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256, fixed_bytes};

    use super::*;

    const CONTEXT: Address = address!("8d25687829d6b85d9e0020b8c89e3ca24de20a89");
    const NODE: B256 = b256!("787192fc5378cc32aa956ddfdedbf26b24e8d78e40109add0eea2c1a012c3dec");

    fn ctx() -> Bytes {
        Bytes::copy_from_slice(CONTEXT.as_slice())
    }

    #[test]
    fn decodes_text() {
        let data = IRemoteResolver::textCall {
            context: ctx(),
            node: NODE,
            key: "com.twitter".into(),
        }
        .abi_encode();
        let request = ResolverRequest::decode(&data).unwrap();
        assert_eq!(
            request,
            ResolverRequest::Text {
                context: CONTEXT,
                node: NODE,
                key: "com.twitter".into()
            }
        );
        assert_eq!(request.signature(), "text(bytes,bytes32,string)");
        assert_eq!(request.shape(), ResponseShape::String);
        assert_eq!(
            request.record_key(2),
            Some(RecordKey::text(CONTEXT, NODE, 2, "com.twitter"))
        );
    }

    #[test]
    fn both_addr_overloads_are_distinguished() {
        let plain = IRemoteResolver::addr_0Call {
            context: ctx(),
            node: NODE,
        }
        .abi_encode();
        let with_coin = IRemoteResolver::addr_1Call {
            context: ctx(),
            node: NODE,
            coin_type: U256::from(0),
        }
        .abi_encode();

        let plain = ResolverRequest::decode(&plain).unwrap();
        assert_eq!(plain.shape(), ResponseShape::Address);
        assert_eq!(
            plain.record_key(0),
            Some(RecordKey::address(CONTEXT, NODE, 0, U256::from(60)))
        );

        let with_coin = ResolverRequest::decode(&with_coin).unwrap();
        assert_eq!(with_coin.shape(), ResponseShape::Bytes);
        assert_eq!(
            with_coin.record_key(0),
            Some(RecordKey::address(CONTEXT, NODE, 0, U256::ZERO))
        );
    }

    #[test]
    fn legacy_addr_has_no_context() {
        let data = ILegacyResolver::addrCall { node: NODE }.abi_encode();
        let request = ResolverRequest::decode(&data).unwrap();
        assert_eq!(request, ResolverRequest::LegacyAddr { node: NODE });
        assert_eq!(request.context_node(), None);
        assert_eq!(request.record_key(0), None);
    }

    #[test]
    fn decodes_dns_and_interface_arguments() {
        let name = B256::repeat_byte(0x50);
        let data = IRemoteResolver::dnsRecordCall {
            context: ctx(),
            node: NODE,
            name,
            resource: 16,
        }
        .abi_encode();
        assert_eq!(
            ResolverRequest::decode(&data).unwrap().record_key(1),
            Some(RecordKey::dns_record(CONTEXT, NODE, 1, name, 16))
        );

        let data = IRemoteResolver::interfaceImplementerCall {
            context: ctx(),
            node: NODE,
            interface_id: fixed_bytes!("3b3b57de"),
        }
        .abi_encode();
        let request = ResolverRequest::decode(&data).unwrap();
        assert_eq!(request.shape(), ResponseShape::AddressWord);
    }

    #[test]
    fn unknown_selector_is_unsupported() {
        let err = ResolverRequest::decode(&[0xde, 0xad, 0xbe, 0xef, 0, 0]).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn unserved_functions_are_unsupported() {
        let data = IUnservedResolver::resolveCall {
            name: Bytes::from_static(b"\x05alice\x03eth\x00"),
            data: Bytes::new(),
        }
        .abi_encode();
        let err = ResolverRequest::decode(&data).unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("resolve(bytes,bytes)"));
    }

    #[test]
    fn short_calldata_is_a_decode_error() {
        let err = ResolverRequest::decode(&[0x59, 0xd1]).unwrap_err();
        assert!(matches!(err, ProofError::Decode { .. }));
    }

    #[test]
    fn truncated_arguments_are_a_decode_error() {
        let data = IRemoteResolver::textCall {
            context: ctx(),
            node: NODE,
            key: "url".into(),
        }
        .abi_encode();
        let err = ResolverRequest::decode(&data[..40]).unwrap_err();
        assert!(matches!(err, ProofError::Decode { .. }));
    }

    #[test]
    fn context_must_be_an_address() {
        let data = IRemoteResolver::contenthashCall {
            context: Bytes::from_static(&[1, 2, 3]),
            node: NODE,
        }
        .abi_encode();
        let err = ResolverRequest::decode(&data).unwrap_err();
        assert!(matches!(err, ProofError::Decode { .. }));
    }

    #[test]
    fn empty_abi_mask_is_rejected() {
        let data = IRemoteResolver::ABICall {
            context: ctx(),
            node: NODE,
            content_types: U256::ZERO,
        }
        .abi_encode();
        assert!(matches!(
            ResolverRequest::decode(&data),
            Err(ProofError::Decode { .. })
        ));
    }

    #[test]
    fn content_type_bits_ascend() {
        let bits: Vec<U256> = content_type_bits(U256::from(0b1010_0101)).collect();
        assert_eq!(
            bits,
            vec![U256::from(1), U256::from(4), U256::from(32), U256::from(128)]
        );
    }
}
