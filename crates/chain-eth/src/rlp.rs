//! Generic RLP items.
//!
//! Transactions are encoded through `alloy_rlp` derives in
//! [`crate::transaction`]; this module covers the untyped side: building
//! arbitrary items and decoding raw bytes back into a tree, which is what
//! signed-transaction decoding and sender recovery are built on.

use alloy_rlp::{Encodable, Header};

use crate::error::EthError;

/// A decoded RLP value: either a byte string or a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// Integer item with leading zero bytes stripped (zero is the empty string).
    pub fn uint(value: u128) -> Self {
        let be = value.to_be_bytes();
        let start = be.iter().position(|&b| b != 0).unwrap_or(be.len());
        RlpItem::Bytes(be[start..].to_vec())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        Encodable::encode(self, &mut out);
        out
    }

    /// Decodes exactly one item; trailing bytes are an error.
    pub fn decode(bytes: &[u8]) -> Result<Self, EthError> {
        let mut buf = bytes;
        let item = decode_item(&mut buf)?;
        if !buf.is_empty() {
            return Err(EthError::EncodingError(format!(
                "{} trailing bytes after RLP item",
                buf.len()
            )));
        }
        Ok(item)
    }

    pub fn as_bytes(&self) -> Result<&[u8], EthError> {
        match self {
            RlpItem::Bytes(b) => Ok(b),
            RlpItem::List(_) => Err(EthError::EncodingError("expected string, got list".into())),
        }
    }

    pub fn as_list(&self) -> Result<&[RlpItem], EthError> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::Bytes(_) => Err(EthError::EncodingError("expected list, got string".into())),
        }
    }

    /// Reads a canonical big-endian integer of at most 16 bytes.
    pub fn as_u128(&self) -> Result<u128, EthError> {
        let bytes = self.as_bytes()?;
        if bytes.len() > 16 {
            return Err(EthError::EncodingError(format!(
                "integer of {} bytes does not fit in u128",
                bytes.len()
            )));
        }
        if bytes.first() == Some(&0) {
            return Err(EthError::EncodingError("integer has leading zero".into()));
        }
        Ok(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b)))
    }

    fn payload_length(&self) -> usize {
        match self {
            RlpItem::Bytes(b) => b.as_slice().length(),
            RlpItem::List(items) => items.iter().map(Encodable::length).sum(),
        }
    }
}

impl Encodable for RlpItem {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match self {
            // Byte strings already follow the single-byte / short / long rules.
            RlpItem::Bytes(b) => b.as_slice().encode(out),
            RlpItem::List(items) => {
                Header {
                    list: true,
                    payload_length: self.payload_length(),
                }
                .encode(out);
                for item in items {
                    Encodable::encode(item, out);
                }
            }
        }
    }

    fn length(&self) -> usize {
        match self {
            RlpItem::Bytes(_) => self.payload_length(),
            RlpItem::List(_) => {
                let payload_length = self.payload_length();
                Header {
                    list: true,
                    payload_length,
                }
                .length()
                    + payload_length
            }
        }
    }
}

fn decode_item(buf: &mut &[u8]) -> Result<RlpItem, EthError> {
    let header = Header::decode(buf).map_err(|e| EthError::EncodingError(e.to_string()))?;

    if buf.len() < header.payload_length {
        return Err(EthError::EncodingError(format!(
            "payload of {} bytes exceeds remaining {}",
            header.payload_length,
            buf.len()
        )));
    }

    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;

    if !header.list {
        return Ok(RlpItem::Bytes(payload.to_vec()));
    }

    let mut inner = payload;
    let mut items = Vec::new();
    while !inner.is_empty() {
        items.push(decode_item(&mut inner)?);
    }
    Ok(RlpItem::List(items))
}
