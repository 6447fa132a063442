// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use alloy_primitives::B256;
use sha3::{Digest, Keccak256};

/// General Keccak256 hash function
pub fn keccak256(bytes: impl AsRef<[u8]>) -> B256 {
    let mut h = Keccak256::new();
    h.update(bytes.as_ref());
    let out = h.finalize();
    B256::from_slice(&out)
}

/// Keccak256 over the concatenation of several byte strings
pub fn keccak256_concat<I, T>(parts: I) -> B256
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut h = Keccak256::new();
    for part in parts {
        h.update(part.as_ref());
    }
    B256::from_slice(&h.finalize())
}

/// Lower 8 bytes of a storage word as an integer (a packed `uint64`)
pub fn word_to_u64(word: &B256) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    u64::from_be_bytes(buf)
}

/// Format bytes as 0x-prefixed hex
pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}
