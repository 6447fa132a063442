// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Encoding rules for dynamic `bytes`/`string` values in contract storage.
//!
//! Short values (at most 31 bytes) live in the slot itself with `length * 2` in
//! the last byte. Long values store `length * 2 + 1` in the slot and their
//! payload in consecutive slots starting at `keccak(slot)`.

use alloy_primitives::{B256, U256};

use crate::proofs::common::{evm::keccak256, ProofError, ProofResult};
use crate::types::StorageSlot;

/// Largest value that still fits inline in its slot
pub const MAX_SHORT_LENGTH: usize = 31;

/// Largest long value the gateway will fetch (2048 payload slots)
pub const MAX_LONG_LENGTH: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Short,
    Long,
}

/// Length and encoding kind of a dynamic value from its head slot word
pub fn decode_length(word: &B256) -> ProofResult<(usize, ValueKind)> {
    let last = word[31];
    if last & 1 == 0 {
        return Ok(((last / 2) as usize, ValueKind::Short));
    }

    let raw = U256::from_be_bytes(word.0);
    let length = (raw - U256::from(1)) / U256::from(2);
    if length > U256::from(MAX_LONG_LENGTH) {
        return Err(ProofError::invalid_proof(format!(
            "long storage value of {length} bytes exceeds {MAX_LONG_LENGTH}"
        )));
    }
    let length = length.to::<usize>();
    if length <= MAX_SHORT_LENGTH {
        return Err(ProofError::invalid_proof(format!(
            "long storage value with length {length}"
        )));
    }
    Ok((length, ValueKind::Long))
}

/// Inline payload of a short value, left-aligned in its word
pub fn decode_short(word: &B256, length: usize) -> ProofResult<Vec<u8>> {
    if length > MAX_SHORT_LENGTH {
        return Err(ProofError::invalid_proof(format!(
            "short storage value with length {length}"
        )));
    }
    Ok(word[..length].to_vec())
}

/// Number of chained slots fetched for a long value of `length` bytes
pub fn long_slot_count(length: usize) -> usize {
    length.saturating_mul(2).saturating_add(1).div_ceil(64)
}

/// First payload slot of a long value stored at `slot`
pub fn data_start(slot: &StorageSlot) -> StorageSlot {
    StorageSlot(keccak256(slot.as_bytes()))
}

/// Ordered payload slots of a long value stored at `slot`
pub fn long_value_slots(slot: &StorageSlot, length: usize) -> ProofResult<Vec<StorageSlot>> {
    if length > MAX_LONG_LENGTH {
        return Err(ProofError::invalid_proof(format!(
            "long storage value of {length} bytes exceeds {MAX_LONG_LENGTH}"
        )));
    }
    let start = data_start(slot);
    Ok((0..long_slot_count(length) as u64)
        .map(|i| start.offset(i))
        .collect())
}

/// Concatenate payload words in slot order and cut at `length`
pub fn concat_and_truncate(words: &[B256], length: usize) -> ProofResult<Vec<u8>> {
    let mut out = Vec::with_capacity(words.len() * 32);
    for word in words {
        out.extend_from_slice(word.as_slice());
    }
    if out.len() < length {
        return Err(ProofError::invalid_proof(format!(
            "payload of {} bytes is shorter than declared length {length}",
            out.len()
        )));
    }
    out.truncate(length);
    Ok(out)
}

/// Storage writes that put `value` at `slot`, head slot first
pub fn encode_dynamic(slot: &StorageSlot, value: &[u8]) -> Vec<(StorageSlot, B256)> {
    if value.len() <= MAX_SHORT_LENGTH {
        let mut word = [0u8; 32];
        word[..value.len()].copy_from_slice(value);
        word[31] = (value.len() * 2) as u8;
        return vec![(*slot, B256::from(word))];
    }

    let head = B256::from(U256::from(value.len() * 2 + 1));
    let start = data_start(slot);
    let mut writes = vec![(*slot, head)];
    for (i, chunk) in value.chunks(32).enumerate() {
        let mut word = [0u8; 32];
        word[..chunk.len()].copy_from_slice(chunk);
        writes.push((start.offset(i as u64), B256::from(word)));
    }
    writes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_of(value: &[u8]) -> B256 {
        encode_dynamic(&StorageSlot::from_index(1), value)[0].1
    }

    #[test]
    fn empty_word_is_empty_short() {
        let (length, kind) = decode_length(&B256::ZERO).unwrap();
        assert_eq!((length, kind), (0, ValueKind::Short));
        assert!(decode_short(&B256::ZERO, 0).unwrap().is_empty());
    }

    #[test]
    fn short_values_decode_in_place() {
        for len in 0..=MAX_SHORT_LENGTH {
            let value: Vec<u8> = (0..len as u8).map(|b| b.wrapping_mul(7) | 1).collect();
            let word = head_of(&value);
            let (length, kind) = decode_length(&word).unwrap();
            assert_eq!(kind, ValueKind::Short);
            assert_eq!(length, len);
            assert_eq!(decode_short(&word, length).unwrap(), value);
        }
    }

    #[test]
    fn bar_is_three_byte_short() {
        let word = head_of(b"bar");
        assert_eq!(word[31], 6);
        assert_eq!(decode_length(&word).unwrap(), (3, ValueKind::Short));
        assert_eq!(decode_short(&word, 3).unwrap(), b"bar");
    }

    #[test]
    fn thirty_one_bytes_is_still_short() {
        let value = [0x61u8; 31];
        let word = head_of(&value);
        assert_eq!(word[31], 62);
        assert_eq!(decode_length(&word).unwrap(), (31, ValueKind::Short));
        assert_eq!(decode_short(&word, 31).unwrap(), value);
    }

    #[test]
    fn long_length_comes_from_whole_word() {
        let word = head_of(&[1u8; 300]);
        assert_eq!(decode_length(&word).unwrap(), (300, ValueKind::Long));
    }

    #[test]
    fn slot_count_follows_hex_length_rule() {
        assert_eq!(long_slot_count(32), 2);
        assert_eq!(long_slot_count(33), 2);
        assert_eq!(long_slot_count(63), 2);
        assert_eq!(long_slot_count(64), 3);
        assert_eq!(long_slot_count(65), 3);
        assert_eq!(long_slot_count(100), 4);
    }

    #[test]
    fn long_values_reassemble_from_chained_slots() {
        let slot = StorageSlot::from_index(42);
        let profile = br#"{"name":"alice","avatar":"ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi","links":["https://example.org"]}"#;
        assert!(profile.len() > MAX_SHORT_LENGTH);

        let writes = encode_dynamic(&slot, profile);
        let (length, kind) = decode_length(&writes[0].1).unwrap();
        assert_eq!(kind, ValueKind::Long);
        assert_eq!(length, profile.len());

        let slots = long_value_slots(&slot, length).unwrap();
        assert_eq!(slots.len(), (profile.len() * 2 + 1).div_ceil(64));
        assert_eq!(slots[0], data_start(&slot));

        let words: Vec<B256> = slots
            .iter()
            .map(|s| {
                writes
                    .iter()
                    .find(|(w, _)| w == s)
                    .map(|(_, v)| *v)
                    .unwrap_or(B256::ZERO)
            })
            .collect();
        assert_eq!(concat_and_truncate(&words, length).unwrap(), profile.to_vec());
    }

    #[test]
    fn oversized_long_length_is_rejected() {
        for word in [
            B256::from(U256::from(u64::MAX)),
            B256::repeat_byte(0xff),
            B256::from(U256::from(MAX_LONG_LENGTH * 2 + 3)),
        ] {
            assert!(matches!(
                decode_length(&word),
                Err(ProofError::InvalidProof { .. })
            ));
        }
        let at_cap = B256::from(U256::from(MAX_LONG_LENGTH * 2 + 1));
        assert_eq!(
            decode_length(&at_cap).unwrap(),
            (MAX_LONG_LENGTH, ValueKind::Long)
        );
    }

    #[test]
    fn slot_list_is_bounded() {
        let slot = StorageSlot::from_index(1);
        assert!(long_value_slots(&slot, usize::MAX).is_err());
        assert_eq!(long_slot_count(usize::MAX), usize::MAX.div_ceil(64));
        assert_eq!(
            long_value_slots(&slot, MAX_LONG_LENGTH).unwrap().len(),
            long_slot_count(MAX_LONG_LENGTH)
        );
    }

    #[test]
    fn odd_word_below_32_is_rejected() {
        // length 5 with the long flag set cannot be produced by the compiler
        let word = B256::from(U256::from(11));
        assert!(matches!(
            decode_length(&word),
            Err(ProofError::InvalidProof { .. })
        ));
    }

    #[test]
    fn truncation_needs_enough_words() {
        assert!(concat_and_truncate(&[B256::ZERO], 33).is_err());
        assert_eq!(concat_and_truncate(&[B256::repeat_byte(9); 2], 40).unwrap().len(), 40);
    }
}
