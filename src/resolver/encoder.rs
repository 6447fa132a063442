// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

//! Raw storage bytes back into the ABI return value each resolver function promises.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;

use crate::proofs::common::{to_hex, ProofError, ProofResult};

/// ABI return type of a resolver function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `string` from UTF-8 storage bytes (`text`, `name`)
    String,
    /// `bytes` passed through (`addr` with coin type, `contenthash`, `dnsRecord`, `zonehash`)
    Bytes,
    /// `address` from a 20-byte dynamic value; empty means the zero address
    Address,
    /// `address` held in the low 20 bytes of a fixed word
    AddressWord,
    /// `(uint256 contentType, bytes data)`
    Abi,
    /// `(bytes32 x, bytes32 y)`
    PubKey,
    /// `bool` set when the fixed word is non-zero
    Bool,
}

/// Extra input some shapes need besides the primary raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auxiliary {
    /// Content type the ABI value was found under
    ContentType(U256),
    /// Raw Y word of a public key
    PubKeyY(Bytes),
}

/// Encode `raw` as the return data of a function returning `shape`
pub fn encode(shape: ResponseShape, raw: &[u8], aux: Option<&Auxiliary>) -> ProofResult<Bytes> {
    let encoded = match shape {
        ResponseShape::String => {
            let s = String::from_utf8(raw.to_vec())
                .map_err(|e| ProofError::decode(format!("stored string is not UTF-8: {e}")))?;
            s.abi_encode()
        }
        ResponseShape::Bytes => Bytes::copy_from_slice(raw).abi_encode(),
        ResponseShape::Address => dynamic_address(raw)?.abi_encode(),
        ResponseShape::AddressWord => word_address(raw)?.abi_encode(),
        ResponseShape::Bool => (!word(raw)?.is_zero()).abi_encode(),
        ResponseShape::Abi => {
            let Some(Auxiliary::ContentType(content_type)) = aux else {
                return Err(ProofError::decode("ABI response needs its content type"));
            };
            // nothing stored under any requested type
            let content_type = if raw.is_empty() {
                U256::ZERO
            } else {
                *content_type
            };
            (content_type, Bytes::copy_from_slice(raw)).abi_encode_params()
        }
        ResponseShape::PubKey => {
            let Some(Auxiliary::PubKeyY(y)) = aux else {
                return Err(ProofError::decode("pubkey response needs the Y coordinate"));
            };
            (word(raw)?, word(y)?).abi_encode_params()
        }
    };
    Ok(encoded.into())
}

fn word(raw: &[u8]) -> ProofResult<B256> {
    B256::try_from(raw).map_err(|_| {
        ProofError::decode(format!(
            "expected a 32-byte word, got {} bytes",
            raw.len()
        ))
    })
}

fn dynamic_address(raw: &[u8]) -> ProofResult<Address> {
    match raw.len() {
        0 => Ok(Address::ZERO),
        20 => Ok(Address::from_slice(raw)),
        n => Err(ProofError::decode(format!(
            "stored address has {n} bytes: {}",
            to_hex(raw)
        ))),
    }
}

fn word_address(raw: &[u8]) -> ProofResult<Address> {
    let word = word(raw)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(ProofError::decode(format!(
            "word {word} does not hold an address"
        )));
    }
    Ok(Address::from_word(word))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;

    #[test]
    fn text_is_an_abi_string() {
        let data = encode(ResponseShape::String, b"@alice", None).unwrap();
        assert_eq!(String::abi_decode(&data, true).unwrap(), "@alice");
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let err = encode(ResponseShape::String, &[0xff, 0xfe], None).unwrap_err();
        assert!(matches!(err, ProofError::Decode { .. }));
    }

    #[test]
    fn empty_address_is_zero() {
        let data = encode(ResponseShape::Address, &[], None).unwrap();
        assert_eq!(Address::abi_decode(&data, true).unwrap(), Address::ZERO);
    }

    #[test]
    fn address_bytes_are_decoded() {
        let a = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
        let data = encode(ResponseShape::Address, a.as_slice(), None).unwrap();
        assert_eq!(Address::abi_decode(&data, true).unwrap(), a);
    }

    #[test]
    fn odd_sized_address_is_not_truncated() {
        let err = encode(ResponseShape::Address, &[1u8; 21], None).unwrap_err();
        assert!(matches!(err, ProofError::Decode { .. }));
    }

    #[test]
    fn word_address_rejects_dirty_high_bytes() {
        let a = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
        let data = encode(ResponseShape::AddressWord, a.into_word().as_slice(), None).unwrap();
        assert_eq!(Address::abi_decode(&data, true).unwrap(), a);

        let err = encode(ResponseShape::AddressWord, &[0xffu8; 32], None).unwrap_err();
        assert!(matches!(err, ProofError::Decode { .. }));
    }

    #[test]
    fn abi_content_type_zeroed_when_empty() {
        let aux = Auxiliary::ContentType(U256::from(4));
        let data = encode(ResponseShape::Abi, &[], Some(&aux)).unwrap();
        let (content_type, blob) = <(U256, Bytes)>::abi_decode_params(&data, true).unwrap();
        assert_eq!(content_type, U256::ZERO);
        assert!(blob.is_empty());

        let data = encode(ResponseShape::Abi, b"[]", Some(&aux)).unwrap();
        let (content_type, blob) = <(U256, Bytes)>::abi_decode_params(&data, true).unwrap();
        assert_eq!(content_type, U256::from(4));
        assert_eq!(&blob[..], b"[]");
    }

    #[test]
    fn pubkey_pairs_both_words() {
        let aux = Auxiliary::PubKeyY(Bytes::from(vec![2u8; 32]));
        let data = encode(ResponseShape::PubKey, &[1u8; 32], Some(&aux)).unwrap();
        let (x, y) = <(B256, B256)>::abi_decode_params(&data, true).unwrap();
        assert_eq!(x, B256::repeat_byte(1));
        assert_eq!(y, B256::repeat_byte(2));
    }

    #[test]
    fn bool_from_counter_word() {
        let mut count = [0u8; 32];
        count[31] = 2;
        let data = encode(ResponseShape::Bool, &count, None).unwrap();
        assert!(bool::abi_decode(&data, true).unwrap());
        let data = encode(ResponseShape::Bool, &[0u8; 32], None).unwrap();
        assert!(!bool::abi_decode(&data, true).unwrap());
    }

    #[test]
    fn missing_auxiliary_is_an_error() {
        assert!(encode(ResponseShape::PubKey, &[0u8; 32], None).is_err());
        assert!(encode(ResponseShape::Abi, b"x", None).is_err());
    }
}
