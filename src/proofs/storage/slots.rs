// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Storage slot derivation for the versioned resolver layout.
//!
//! Every record lives in `mapping(uint64 version => mapping(bytes context =>
//! mapping(bytes32 node => ...)))` rooted at the field's base slot. Each level
//! is `keccak(packedKey || parentSlot)`.

use alloy_primitives::{Address, B256};

use crate::proofs::common::evm::keccak256_concat;
use crate::types::{
    FieldKind, RecordKey, StorageSlot, LEGACY_ADDRESSES_SLOT, RECORD_VERSIONS_SLOT,
};

/// Compute a Solidity mapping slot using keccak( packedKey || slot(32) )
pub fn compute_mapping_slot(key: &[u8], slot: &StorageSlot) -> StorageSlot {
    StorageSlot(keccak256_concat([key, slot.as_bytes().as_slice()]))
}

/// Slot of `recordVersions[context][node]`
pub fn version_slot(context: Address, node: B256) -> StorageSlot {
    let base = StorageSlot::from_index(RECORD_VERSIONS_SLOT);
    let context_slot = compute_mapping_slot(context.as_slice(), &base);
    compute_mapping_slot(node.as_slice(), &context_slot)
}

/// Slot of the legacy flat `addresses[node]` mapping; the node is the key as-is
pub fn legacy_address_slot(node: B256) -> StorageSlot {
    compute_mapping_slot(
        node.as_slice(),
        &StorageSlot::from_index(LEGACY_ADDRESSES_SLOT),
    )
}

/// Slot holding the value addressed by `key`
pub fn derive_slot(key: &RecordKey) -> StorageSlot {
    // The Y coordinate sits right after X in the same struct
    if key.field == FieldKind::PubKeyY {
        return derive_slot(&key.with_field(FieldKind::PubKeyX)).offset(1);
    }

    let base = StorageSlot::from_index(key.field.base_slot());
    let version_slot = compute_mapping_slot(
        StorageSlot::from_index(key.version).as_bytes(),
        &base,
    );
    let context_slot = compute_mapping_slot(key.context.as_slice(), &version_slot);
    let node_slot = compute_mapping_slot(key.node.as_slice(), &context_slot);

    let Some(sub_key) = &key.sub_key else {
        return node_slot;
    };
    sub_key
        .packed()
        .iter()
        .fold(node_slot, |slot, packed| compute_mapping_slot(packed, &slot))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use alloy_primitives::{FixedBytes, U256};

    use super::*;
    use crate::types::SubKey;

    fn context() -> Address {
        Address::from_str("0x8d25687829d6b85d9e0020b8c89e3ca24de20a89").unwrap()
    }

    // namehash("alice.eth")
    fn node() -> B256 {
        B256::from_str("0x787192fc5378cc32aa956ddfdedbf26b24e8d78e40109add0eea2c1a012c3dec")
            .unwrap()
    }

    fn slot(hex: &str) -> StorageSlot {
        StorageSlot(B256::from_str(hex).unwrap())
    }

    #[test]
    fn version_slot_matches_vector() {
        assert_eq!(
            version_slot(context(), node()),
            slot("0x26cf836fd5b76e1b0cabace45cc3a6391e780b1ae64cf7aa6e65efc806b30453")
        );
    }

    #[test]
    fn text_slot_matches_vector() {
        let key = RecordKey::text(context(), node(), 0, "com.twitter");
        assert_eq!(
            derive_slot(&key),
            slot("0x73d75e2695e7a0b81e9c7ed2d00193d03595f937db1624655a8ddede419d9bd6")
        );
    }

    #[test]
    fn addr_slot_matches_vector() {
        let key = RecordKey::address(context(), node(), 1, U256::from(60));
        assert_eq!(
            derive_slot(&key),
            slot("0x2c7a0e118ba14f9ed86f80efcbfbe24d68bc3c5ddaaf06e592aa5ff9b8aa2ae6")
        );
    }

    #[test]
    fn contenthash_slot_has_no_sub_key() {
        let key = RecordKey::plain(context(), node(), 0, FieldKind::ContentHash);
        assert_eq!(
            derive_slot(&key),
            slot("0x3eb8e0dd2bcf01d56f53d9d33ea180c4c23beb61af64170201103c02104dee2c")
        );
    }

    #[test]
    fn dns_record_applies_name_then_resource() {
        let name =
            B256::from_str("0x507dd50c1f1e2dbe33ca63e3ced943963de5b87e521fc86de8242616ea28ed05")
                .unwrap();
        let key = RecordKey::dns_record(context(), node(), 0, name, 1);
        assert_eq!(
            derive_slot(&key),
            slot("0xf929ac41f6cce5c434a6d3bdc007f58683bd43766675692969ec4de09a99cf6a")
        );
    }

    #[test]
    fn interface_slot_matches_vector() {
        let key = RecordKey::interface(
            context(),
            node(),
            0,
            FixedBytes::from([0x3b, 0x3b, 0x57, 0xde]),
        );
        assert_eq!(
            derive_slot(&key),
            slot("0x252e259f397f31fced996ddaa8daeb6bbe822d45035f75ce6852dc0251b58ba0")
        );
    }

    #[test]
    fn pubkey_y_is_x_plus_one() {
        let x = RecordKey::plain(context(), node(), 2, FieldKind::PubKeyX);
        let y = x.with_field(FieldKind::PubKeyY);
        assert_eq!(
            derive_slot(&x),
            slot("0xcd39df6045bf89430b0610d209f3348cb8c67cdd86bacfbeb1af08bb2ba64f68")
        );
        assert_eq!(derive_slot(&y), derive_slot(&x).offset(1));
        assert_eq!(
            derive_slot(&y),
            slot("0xcd39df6045bf89430b0610d209f3348cb8c67cdd86bacfbeb1af08bb2ba64f69")
        );
    }

    #[test]
    fn legacy_slot_uses_node_directly() {
        assert_eq!(
            legacy_address_slot(node()),
            slot("0x47c6eae546ee3a44460407c6a451f4185c53ad2f9675fbc791858473d30c7637")
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let key = RecordKey::text(context(), node(), 3, "avatar");
        assert_eq!(derive_slot(&key), derive_slot(&key.clone()));
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for version in 0..3u64 {
            for ctx in [context(), Address::ZERO] {
                keys.push(RecordKey::text(ctx, node(), version, "url"));
                keys.push(RecordKey::text(ctx, node(), version, "avatar"));
                keys.push(RecordKey::address(ctx, node(), version, U256::from(60)));
                keys.push(RecordKey::address(ctx, node(), version, U256::from(0)));
                keys.push(RecordKey::abi(ctx, node(), version, U256::from(1)));
                keys.push(RecordKey::dns_name_entries(ctx, node(), version, B256::ZERO));
                keys.push(RecordKey::dns_record(ctx, node(), version, B256::ZERO, 1));
                keys.push(RecordKey::interface(ctx, node(), version, FixedBytes::ZERO));
                for field in [
                    FieldKind::ContentHash,
                    FieldKind::Name,
                    FieldKind::PubKeyX,
                    FieldKind::PubKeyY,
                    FieldKind::ZoneHash,
                ] {
                    keys.push(RecordKey::plain(ctx, node(), version, field));
                }
            }
        }
        for key in &keys {
            assert!(seen.insert(derive_slot(key)), "collision for {key:?}");
        }
        assert_eq!(seen.len(), keys.len());
    }

    #[test]
    fn swapping_version_changes_slot() {
        let a = RecordKey::new(
            context(),
            node(),
            FieldKind::Text,
            Some(SubKey::String("url".into())),
            0,
        );
        let b = RecordKey { version: 1, ..a.clone() };
        assert_ne!(derive_slot(&a), derive_slot(&b));
    }
}
