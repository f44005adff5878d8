//! The decoded ASN.1 tree and typed accessors over it.

use super::decoder::decode_embedded;
use super::{parse_generalized_time, parse_utc_time, tags, DecodeOptions, Encoder, Tag};
use crate::oid::Oid;
use chrono::{DateTime, Utc};
use pemview_types::Asn1Error;
use std::fmt::Write;

/// One decoded TLV element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub tag: Tag,
    /// Absolute offset of the identifier octet in the decoded buffer.
    pub offset: usize,
    /// Identifier and length octets exactly as they appeared in the input.
    pub header: Vec<u8>,
    pub value: NodeValue,
}

/// Payload of a node: raw bytes for primitives, children for constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Leaf(Vec<u8>),
    Composite(Vec<Node>),
}

impl Node {
    /// Children of a constructed node.
    pub fn children(&self) -> Result<&[Node], Asn1Error> {
        match &self.value {
            NodeValue::Composite(children) => Ok(children),
            NodeValue::Leaf(_) => Err(self.unexpected("constructed value")),
        }
    }

    /// The `index`th child of a constructed node.
    pub fn child(&self, index: usize) -> Result<&Node, Asn1Error> {
        self.children()?
            .get(index)
            .ok_or(Asn1Error::MissingElement { index })
    }

    /// Content octets of a primitive node.
    pub fn bytes(&self) -> Result<&[u8], Asn1Error> {
        match &self.value {
            NodeValue::Leaf(bytes) => Ok(bytes),
            NodeValue::Composite(_) => Err(self.unexpected("primitive value")),
        }
    }

    /// Content length in the input.
    pub fn content_len(&self) -> usize {
        match &self.value {
            NodeValue::Leaf(bytes) => bytes.len(),
            NodeValue::Composite(children) => children.iter().map(Node::encoded_len).sum(),
        }
    }

    /// Length of the original encoding, header included.
    pub fn encoded_len(&self) -> usize {
        self.header.len() + self.content_len()
    }

    /// Require universal tag `number`.
    pub fn expect(&self, number: u32, expected: &'static str) -> Result<&Self, Asn1Error> {
        if self.tag.is_universal(number) {
            Ok(self)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> Asn1Error {
        Asn1Error::UnexpectedTag {
            expected,
            found: self.tag.to_string(),
        }
    }

    /// Content octets of an INTEGER, two's complement big-endian.
    pub fn integer_bytes(&self) -> Result<&[u8], Asn1Error> {
        let bytes = self.expect(tags::INTEGER, "INTEGER")?.bytes()?;
        if bytes.is_empty() {
            return Err(Asn1Error::InvalidValue("empty integer"));
        }
        Ok(bytes)
    }

    /// A non-negative INTEGER that fits in 64 bits.
    pub fn integer_u64(&self) -> Result<u64, Asn1Error> {
        let bytes = self.integer_bytes()?;
        if bytes[0] & 0x80 != 0 {
            return Err(Asn1Error::InvalidValue("negative integer"));
        }
        let significant: &[u8] = match bytes {
            [0, rest @ ..] => rest,
            _ => bytes,
        };
        if significant.len() > 8 {
            return Err(Asn1Error::InvalidValue("integer too large"));
        }
        Ok(significant
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    /// An OBJECT IDENTIFIER.
    pub fn oid(&self) -> Result<Oid, Asn1Error> {
        Oid::from_der_value(self.expect(tags::OID, "OBJECT IDENTIFIER")?.bytes()?)
    }

    /// A BOOLEAN. Any non-zero octet is true.
    pub fn boolean(&self) -> Result<bool, Asn1Error> {
        match self.expect(tags::BOOLEAN, "BOOLEAN")?.bytes()? {
            [b] => Ok(*b != 0),
            _ => Err(Asn1Error::InvalidValue("boolean must be one octet")),
        }
    }

    /// A BIT STRING as `(unused_bits, data)`.
    pub fn bit_string(&self) -> Result<(u8, &[u8]), Asn1Error> {
        match self.expect(tags::BIT_STRING, "BIT STRING")?.bytes()? {
            [] => Err(Asn1Error::InvalidValue("empty bit string")),
            [unused, ..] if *unused > 7 => {
                Err(Asn1Error::InvalidValue("bit string unused bits out of range"))
            }
            [unused, data @ ..] => Ok((*unused, data)),
        }
    }

    /// Content octets of an OCTET STRING.
    pub fn octet_string(&self) -> Result<&[u8], Asn1Error> {
        self.expect(tags::OCTET_STRING, "OCTET STRING")?.bytes()
    }

    /// Text of any string type, decoded according to its tag.
    pub fn string_value(&self) -> Result<String, Asn1Error> {
        let bytes = self.bytes()?;
        if self.tag.class != super::TagClass::Universal {
            return Ok(String::from_utf8_lossy(bytes).into_owned());
        }
        let text = match self.tag.number {
            // Latin-1: each octet is the code point
            tags::T61_STRING => bytes.iter().map(|&b| b as char).collect(),
            tags::BMP_STRING => {
                if bytes.len() % 2 != 0 {
                    return Err(Asn1Error::InvalidValue("BMPString has odd length"));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            tags::UNIVERSAL_STRING => {
                if bytes.len() % 4 != 0 {
                    return Err(Asn1Error::InvalidValue("UniversalString length not a multiple of 4"));
                }
                bytes
                    .chunks_exact(4)
                    .map(|c| {
                        char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                            .unwrap_or(char::REPLACEMENT_CHARACTER)
                    })
                    .collect()
            }
            _ => String::from_utf8_lossy(bytes).into_owned(),
        };
        Ok(text)
    }

    /// A UTCTime or GeneralizedTime.
    pub fn time(&self) -> Result<DateTime<Utc>, Asn1Error> {
        let bytes = self.bytes()?;
        if self.tag.is_universal(tags::UTC_TIME) {
            parse_utc_time(bytes)
        } else if self.tag.is_universal(tags::GENERALIZED_TIME) {
            parse_generalized_time(bytes)
        } else {
            Err(self.unexpected("UTCTime or GeneralizedTime"))
        }
    }

    /// Decode the DER value wrapped in a BIT STRING with no unused bits.
    pub fn decode_bit_string_contents(&self, options: DecodeOptions) -> Result<Node, Asn1Error> {
        let (unused, data) = self.bit_string()?;
        if unused != 0 {
            return Err(Asn1Error::InvalidValue("encapsulating bit string has unused bits"));
        }
        decode_embedded(data, self.offset + self.header.len() + 1, options)
    }

    /// Decode the DER value wrapped in an OCTET STRING.
    pub fn decode_octet_string_contents(&self, options: DecodeOptions) -> Result<Node, Asn1Error> {
        let data = self.octet_string()?;
        decode_embedded(data, self.offset + self.header.len(), options)
    }

    /// The exact bytes this node was decoded from.
    pub fn encoded(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.append_encoded(&mut out);
        out
    }

    fn append_encoded(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header);
        match &self.value {
            NodeValue::Leaf(bytes) => out.extend_from_slice(bytes),
            NodeValue::Composite(children) => {
                for child in children {
                    child.append_encoded(out);
                }
            }
        }
    }

    /// Canonical DER re-encoding, with minimal lengths throughout.
    pub fn to_der(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_node(self);
        enc.finish()
    }

    /// An indented listing of the tree, one line per element.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        let kind = if self.tag.constructed { "cons" } else { "prim" };
        let tag = self.tag.to_string();
        let _ = write!(
            out,
            "{:>5}:d={:<2} hl={} l={:>4} {}: {:indent$}{}",
            self.offset,
            depth,
            self.header.len(),
            self.content_len(),
            kind,
            "",
            tag,
            indent = depth,
        );
        if let Some(summary) = self.summary() {
            let pad = 18usize.saturating_sub(tag.len() + depth);
            let _ = write!(out, "{:pad$}:{}", "", summary);
        }
        out.push('\n');
        if let NodeValue::Composite(children) = &self.value {
            for child in children {
                child.dump_into(out, depth + 1);
            }
        }
    }

    /// Short rendering of a primitive value for [`Node::dump`].
    fn summary(&self) -> Option<String> {
        let NodeValue::Leaf(bytes) = &self.value else {
            return None;
        };
        if self.tag.class != super::TagClass::Universal {
            return Some(hex_upper(bytes));
        }
        let text = match self.tag.number {
            tags::BOOLEAN => self.boolean().map(|b| b.to_string()).ok()?,
            tags::INTEGER | tags::ENUMERATED => hex_upper(bytes),
            tags::OID => self.oid().map(|o| o.name()).ok()?,
            tags::NULL | tags::SEQUENCE | tags::SET => return None,
            tags::BIT_STRING | tags::OCTET_STRING => {
                if bytes.len() > 32 {
                    format!("[{} bytes]", bytes.len())
                } else {
                    hex_upper(bytes)
                }
            }
            tags::UTC_TIME | tags::GENERALIZED_TIME => String::from_utf8_lossy(bytes).into_owned(),
            _ => self.string_value().ok()?,
        };
        Some(text)
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "{b:02X}");
        s
    })
}
