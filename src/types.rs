// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, FixedBytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Record kinds stored by the remote resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Address,
    Abi,
    ContentHash,
    Name,
    PubKeyX,
    PubKeyY,
    DnsRecord,
    HasDnsRecords,
    ZoneHash,
    InterfaceImplementer,
}

/// How a value occupies storage: one raw word, or a dynamic byte string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageLayout {
    Fixed = 0,
    Dynamic = 1,
}

impl StorageLayout {
    /// Tag written into the proof object
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Base slot of `recordVersions[context][node]`
pub const RECORD_VERSIONS_SLOT: u64 = 0;

/// Base slot of the flat `addresses[node]` mapping served to legacy `addr(bytes32)`
pub const LEGACY_ADDRESSES_SLOT: u64 = 11;

/// Coin type of the chain-native address (SLIP-44 60)
pub const COIN_TYPE_ETH: u64 = 60;

impl FieldKind {
    pub const ALL: [FieldKind; 11] = [
        FieldKind::Text,
        FieldKind::Address,
        FieldKind::Abi,
        FieldKind::ContentHash,
        FieldKind::Name,
        FieldKind::PubKeyX,
        FieldKind::PubKeyY,
        FieldKind::DnsRecord,
        FieldKind::HasDnsRecords,
        FieldKind::ZoneHash,
        FieldKind::InterfaceImplementer,
    ];

    /// Index of the versioned mapping backing this field
    pub fn base_slot(self) -> u64 {
        match self {
            FieldKind::Abi => 1,
            FieldKind::Address => 2,
            FieldKind::ContentHash => 3,
            FieldKind::ZoneHash => 4,
            FieldKind::DnsRecord => 5,
            FieldKind::HasDnsRecords => 6,
            FieldKind::InterfaceImplementer => 7,
            FieldKind::Name => 8,
            FieldKind::PubKeyX | FieldKind::PubKeyY => 9,
            FieldKind::Text => 10,
        }
    }

    /// Number of mapping keys applied below the node
    pub fn arity(self) -> usize {
        match self {
            FieldKind::Text
            | FieldKind::Address
            | FieldKind::Abi
            | FieldKind::HasDnsRecords
            | FieldKind::InterfaceImplementer => 1,
            FieldKind::DnsRecord => 2,
            FieldKind::ContentHash
            | FieldKind::Name
            | FieldKind::PubKeyX
            | FieldKind::PubKeyY
            | FieldKind::ZoneHash => 0,
        }
    }

    pub fn layout(self) -> StorageLayout {
        match self {
            FieldKind::PubKeyX
            | FieldKind::PubKeyY
            | FieldKind::HasDnsRecords
            | FieldKind::InterfaceImplementer => StorageLayout::Fixed,
            _ => StorageLayout::Dynamic,
        }
    }

    /// Whether `sub_key` is the right shape for this field
    pub fn accepts(self, sub_key: Option<&SubKey>) -> bool {
        matches!(
            (self, sub_key),
            (FieldKind::Text, Some(SubKey::String(_)))
                | (FieldKind::Address, Some(SubKey::Integer(_)))
                | (FieldKind::Abi, Some(SubKey::Integer(_)))
                | (FieldKind::HasDnsRecords, Some(SubKey::Hash(_)))
                | (FieldKind::InterfaceImplementer, Some(SubKey::Interface(_)))
                | (FieldKind::DnsRecord, Some(SubKey::DnsEntry { .. }))
                | (FieldKind::ContentHash, None)
                | (FieldKind::Name, None)
                | (FieldKind::PubKeyX, None)
                | (FieldKind::PubKeyY, None)
                | (FieldKind::ZoneHash, None)
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Text => "text",
            FieldKind::Address => "addr",
            FieldKind::Abi => "abi",
            FieldKind::ContentHash => "contenthash",
            FieldKind::Name => "name",
            FieldKind::PubKeyX => "pubkey-x",
            FieldKind::PubKeyY => "pubkey-y",
            FieldKind::DnsRecord => "dns-record",
            FieldKind::HasDnsRecords => "has-dns-records",
            FieldKind::ZoneHash => "zonehash",
            FieldKind::InterfaceImplementer => "interface",
        };
        f.write_str(s)
    }
}

impl FromStr for FieldKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKind::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("unknown record field '{s}'"))
    }
}

/// Mapping key(s) below the node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubKey {
    /// Text record key, packed as raw UTF-8
    String(String),
    /// Coin type or ABI content type, packed as a 32-byte word
    Integer(U256),
    /// DNS name hash
    Hash(B256),
    /// ERC-165 interface id, left-aligned in a 32-byte word
    Interface(FixedBytes<4>),
    /// DNS name hash followed by the resource type
    DnsEntry { name: B256, resource: u16 },
}

impl SubKey {
    /// Packed mapping keys, outermost first
    pub fn packed(&self) -> Vec<Vec<u8>> {
        match self {
            SubKey::String(s) => vec![s.as_bytes().to_vec()],
            SubKey::Integer(n) => vec![n.to_be_bytes::<32>().to_vec()],
            SubKey::Hash(h) => vec![h.to_vec()],
            SubKey::Interface(id) => {
                let mut word = [0u8; 32];
                word[..4].copy_from_slice(id.as_slice());
                vec![word.to_vec()]
            }
            SubKey::DnsEntry { name, resource } => {
                let resource = U256::from(*resource);
                vec![name.to_vec(), resource.to_be_bytes::<32>().to_vec()]
            }
        }
    }

    /// Parse a command-line sub-key in the shape `field` expects
    pub fn parse_for(field: FieldKind, s: &str) -> anyhow::Result<SubKey> {
        use anyhow::Context;

        let key = match field {
            FieldKind::Text => SubKey::String(s.to_string()),
            FieldKind::Address | FieldKind::Abi => {
                SubKey::Integer(U256::from_str(s).context("sub-key must be an integer")?)
            }
            FieldKind::HasDnsRecords => {
                SubKey::Hash(B256::from_str(s).context("sub-key must be a 32-byte hash")?)
            }
            FieldKind::InterfaceImplementer => SubKey::Interface(
                FixedBytes::<4>::from_str(s).context("sub-key must be a 4-byte interface id")?,
            ),
            FieldKind::DnsRecord => {
                let (name, resource) = s
                    .split_once(':')
                    .context("dns sub-key must look like <namehash>:<resource>")?;
                SubKey::DnsEntry {
                    name: B256::from_str(name).context("invalid dns name hash")?,
                    resource: resource.parse().context("invalid dns resource type")?,
                }
            }
            _ => anyhow::bail!("field {field} takes no sub-key"),
        };
        Ok(key)
    }
}

/// Full coordinates of one stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub context: Address,
    pub node: B256,
    pub field: FieldKind,
    pub sub_key: Option<SubKey>,
    pub version: u64,
}

impl RecordKey {
    pub fn new(
        context: Address,
        node: B256,
        field: FieldKind,
        sub_key: Option<SubKey>,
        version: u64,
    ) -> Self {
        Self {
            context,
            node,
            field,
            sub_key,
            version,
        }
    }

    pub fn text(context: Address, node: B256, version: u64, key: impl Into<String>) -> Self {
        Self::new(
            context,
            node,
            FieldKind::Text,
            Some(SubKey::String(key.into())),
            version,
        )
    }

    pub fn address(context: Address, node: B256, version: u64, coin_type: U256) -> Self {
        Self::new(
            context,
            node,
            FieldKind::Address,
            Some(SubKey::Integer(coin_type)),
            version,
        )
    }

    pub fn abi(context: Address, node: B256, version: u64, content_type: U256) -> Self {
        Self::new(
            context,
            node,
            FieldKind::Abi,
            Some(SubKey::Integer(content_type)),
            version,
        )
    }

    pub fn plain(context: Address, node: B256, version: u64, field: FieldKind) -> Self {
        Self::new(context, node, field, None, version)
    }

    pub fn dns_record(
        context: Address,
        node: B256,
        version: u64,
        name: B256,
        resource: u16,
    ) -> Self {
        Self::new(
            context,
            node,
            FieldKind::DnsRecord,
            Some(SubKey::DnsEntry { name, resource }),
            version,
        )
    }

    pub fn dns_name_entries(context: Address, node: B256, version: u64, name: B256) -> Self {
        Self::new(
            context,
            node,
            FieldKind::HasDnsRecords,
            Some(SubKey::Hash(name)),
            version,
        )
    }

    pub fn interface(
        context: Address,
        node: B256,
        version: u64,
        interface_id: FixedBytes<4>,
    ) -> Self {
        Self::new(
            context,
            node,
            FieldKind::InterfaceImplementer,
            Some(SubKey::Interface(interface_id)),
            version,
        )
    }

    /// Same record coordinates, different field (used for the pubkey pair)
    pub fn with_field(&self, field: FieldKind) -> Self {
        Self {
            field,
            ..self.clone()
        }
    }
}

/// Derived 32-byte storage location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageSlot(pub B256);

impl StorageSlot {
    pub fn from_index(index: u64) -> Self {
        Self(B256::from(U256::from(index)))
    }

    pub fn as_u256(&self) -> U256 {
        U256::from_be_bytes(self.0 .0)
    }

    /// Slot `n` positions after this one, wrapping like the EVM does
    pub fn offset(&self, n: u64) -> Self {
        Self(B256::from(self.as_u256().wrapping_add(U256::from(n))))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl From<B256> for StorageSlot {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<StorageSlot> for B256 {
    fn from(value: StorageSlot) -> Self {
        value.0
    }
}

impl fmt::Display for StorageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_kind_round_trips_through_its_name() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.to_string().parse::<FieldKind>().unwrap(), kind);
        }
        assert!("unknown".parse::<FieldKind>().is_err());
    }

    #[test]
    fn arity_matches_packed_sub_keys() {
        let samples = [
            (FieldKind::Text, Some(SubKey::String("url".into()))),
            (FieldKind::Address, Some(SubKey::Integer(U256::from(60)))),
            (
                FieldKind::DnsRecord,
                Some(SubKey::DnsEntry {
                    name: B256::repeat_byte(1),
                    resource: 1,
                }),
            ),
            (FieldKind::ContentHash, None),
        ];
        for (field, sub_key) in samples {
            assert!(field.accepts(sub_key.as_ref()));
            let packed = sub_key.map(|k| k.packed().len()).unwrap_or(0);
            assert_eq!(packed, field.arity());
        }
        assert!(!FieldKind::Text.accepts(None));
        assert!(!FieldKind::Name.accepts(Some(&SubKey::String("x".into()))));
    }

    #[test]
    fn interface_id_is_left_aligned() {
        let key = SubKey::Interface(FixedBytes::from([0xde, 0xad, 0xbe, 0xef]));
        let packed = key.packed();
        assert_eq!(&packed[0][..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(packed[0][4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn slot_offset_wraps() {
        let max = StorageSlot(B256::repeat_byte(0xff));
        assert_eq!(max.offset(1), StorageSlot(B256::ZERO));
        assert_eq!(StorageSlot::from_index(9).offset(1), StorageSlot::from_index(10));
    }

    #[test]
    fn parses_cli_sub_keys() {
        let dns = SubKey::parse_for(
            FieldKind::DnsRecord,
            "0x0101010101010101010101010101010101010101010101010101010101010101:16",
        )
        .unwrap();
        assert_eq!(
            dns,
            SubKey::DnsEntry {
                name: B256::repeat_byte(1),
                resource: 16
            }
        );
        assert!(SubKey::parse_for(FieldKind::Name, "x").is_err());
        assert!(SubKey::parse_for(FieldKind::Abi, "abc").is_err());
    }
}
