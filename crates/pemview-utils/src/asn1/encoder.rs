//! ASN.1 DER encoder.

use super::{tags, Node, NodeValue, Tag};
use crate::oid::Oid;
use chrono::{DateTime, Datelike, Utc};

/// A builder for constructing DER-encoded ASN.1 data.
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Consume the encoder and return the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Write a TLV with the given tag and value, using a minimal length.
    pub fn write_tlv(&mut self, tag: Tag, value: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(&tag.to_bytes());
        self.write_length(value.len());
        self.buf.extend_from_slice(value);
        self
    }

    /// Write a DER length encoding.
    fn write_length(&mut self, length: usize) {
        if length < 0x80 {
            self.buf.push(length as u8);
            return;
        }
        let bytes = length.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        self.buf.push(0x80 | (bytes.len() - skip) as u8);
        self.buf.extend_from_slice(&bytes[skip..]);
    }

    /// Re-encode a decoded node canonically.
    pub fn write_node(&mut self, node: &Node) -> &mut Self {
        match &node.value {
            NodeValue::Leaf(bytes) => self.write_tlv(node.tag, bytes),
            NodeValue::Composite(children) => {
                let mut inner = Encoder::new();
                for child in children {
                    inner.write_node(child);
                }
                self.write_tlv(node.tag, &inner.finish())
            }
        }
    }

    /// Write an INTEGER from unsigned big-endian magnitude bytes.
    pub fn write_integer(&mut self, value: &[u8]) -> &mut Self {
        let tag = Tag::universal(tags::INTEGER, false);
        // Add leading zero if high bit is set (to keep it positive)
        if !value.is_empty() && (value[0] & 0x80) != 0 {
            let mut padded = vec![0x00];
            padded.extend_from_slice(value);
            self.write_tlv(tag, &padded)
        } else {
            self.write_tlv(tag, value)
        }
    }

    /// Write a small non-negative INTEGER.
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count().min(7);
        self.write_integer(&bytes[skip..])
    }

    /// Write an OCTET STRING.
    pub fn write_octet_string(&mut self, value: &[u8]) -> &mut Self {
        self.write_tlv(Tag::universal(tags::OCTET_STRING, false), value)
    }

    /// Write a BIT STRING with the given unused_bits count.
    pub fn write_bit_string(&mut self, unused_bits: u8, value: &[u8]) -> &mut Self {
        let mut content = vec![unused_bits];
        content.extend_from_slice(value);
        self.write_tlv(Tag::universal(tags::BIT_STRING, false), &content)
    }

    /// Write an OBJECT IDENTIFIER.
    pub fn write_oid(&mut self, oid: &Oid) -> &mut Self {
        self.write_tlv(Tag::universal(tags::OID, false), &oid.to_der_value())
    }

    /// Write a NULL.
    pub fn write_null(&mut self) -> &mut Self {
        self.write_tlv(Tag::universal(tags::NULL, false), &[])
    }

    /// Write a SEQUENCE wrapping the given contents.
    pub fn write_sequence(&mut self, contents: &[u8]) -> &mut Self {
        self.write_tlv(Tag::universal(tags::SEQUENCE, true), contents)
    }

    /// Write a SET wrapping the given contents.
    pub fn write_set(&mut self, contents: &[u8]) -> &mut Self {
        self.write_tlv(Tag::universal(tags::SET, true), contents)
    }

    /// Write raw bytes directly (already DER-encoded).
    pub fn write_raw(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Write a UTF8String.
    pub fn write_utf8_string(&mut self, s: &str) -> &mut Self {
        self.write_tlv(Tag::universal(tags::UTF8_STRING, false), s.as_bytes())
    }

    /// Write a PrintableString.
    pub fn write_printable_string(&mut self, s: &str) -> &mut Self {
        self.write_tlv(Tag::universal(tags::PRINTABLE_STRING, false), s.as_bytes())
    }

    /// Write an IA5String.
    pub fn write_ia5_string(&mut self, s: &str) -> &mut Self {
        self.write_tlv(Tag::universal(tags::IA5_STRING, false), s.as_bytes())
    }

    /// Write a BMPString (UTF-16BE).
    pub fn write_bmp_string(&mut self, s: &str) -> &mut Self {
        let bytes: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        self.write_tlv(Tag::universal(tags::BMP_STRING, false), &bytes)
    }

    /// Write a BOOLEAN.
    pub fn write_boolean(&mut self, val: bool) -> &mut Self {
        self.write_tlv(
            Tag::universal(tags::BOOLEAN, false),
            &[if val { 0xFF } else { 0x00 }],
        )
    }

    /// Write a context-specific tagged value.
    pub fn write_context_specific(
        &mut self,
        tag_num: u32,
        constructed: bool,
        content: &[u8],
    ) -> &mut Self {
        self.write_tlv(Tag::context(tag_num, constructed), content)
    }

    /// Write a UTCTime, `YYMMDDHHMMSSZ`.
    pub fn write_utc_time(&mut self, time: &DateTime<Utc>) -> &mut Self {
        let s = time.format("%y%m%d%H%M%SZ").to_string();
        self.write_tlv(Tag::universal(tags::UTC_TIME, false), s.as_bytes())
    }

    /// Write a GeneralizedTime, `YYYYMMDDHHMMSSZ`.
    pub fn write_generalized_time(&mut self, time: &DateTime<Utc>) -> &mut Self {
        let s = time.format("%Y%m%d%H%M%SZ").to_string();
        self.write_tlv(Tag::universal(tags::GENERALIZED_TIME, false), s.as_bytes())
    }

    /// Write a Time (UTCTime for 1950 to 2049, GeneralizedTime otherwise).
    pub fn write_time(&mut self, time: &DateTime<Utc>) -> &mut Self {
        if (1950..2050).contains(&time.year()) {
            self.write_utc_time(time)
        } else {
            self.write_generalized_time(time)
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::{decode, DecodeOptions};
    use chrono::TimeZone;

    #[test]
    fn test_write_utf8_string() {
        let mut enc = Encoder::new();
        enc.write_utf8_string("Hello");
        let der = enc.finish();
        assert_eq!(der, &[0x0C, 5, b'H', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn test_write_printable_string() {
        let mut enc = Encoder::new();
        enc.write_printable_string("CN");
        let der = enc.finish();
        assert_eq!(der, &[0x13, 2, b'C', b'N']);
    }

    #[test]
    fn test_long_lengths() {
        let mut enc = Encoder::new();
        enc.write_octet_string(&[0u8; 0x100]);
        let der = enc.finish();
        assert_eq!(&der[..4], &[0x04, 0x82, 0x01, 0x00]);
        assert_eq!(der.len(), 4 + 0x100);
    }

    #[test]
    fn test_write_integers() {
        let mut enc = Encoder::new();
        enc.write_integer(&[0x80]).write_u64(0).write_u64(65537);
        let der = enc.finish();
        assert_eq!(
            der,
            &[0x02, 2, 0x00, 0x80, 0x02, 1, 0x00, 0x02, 3, 0x01, 0x00, 0x01]
        );
    }

    #[test]
    fn test_write_utc_time() {
        let time = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let mut enc = Encoder::new();
        enc.write_time(&time);
        let der = enc.finish();
        let expected = b"250115120000Z";
        assert_eq!(der[0], 0x17); // UTCTime tag
        assert_eq!(der[1], expected.len() as u8);
        assert_eq!(&der[2..], expected);
    }

    #[test]
    fn test_write_generalized_time() {
        let time = Utc.with_ymd_and_hms(2050, 6, 20, 0, 0, 0).unwrap();
        let mut enc = Encoder::new();
        enc.write_time(&time);
        let der = enc.finish();
        let expected = b"20500620000000Z";
        assert_eq!(der[0], 0x18); // GeneralizedTime tag
        assert_eq!(&der[2..], expected);
    }

    #[test]
    fn test_write_context_specific() {
        let mut enc = Encoder::new();
        // Explicit [0] wrapping an INTEGER 2 (version v3)
        let mut inner = Encoder::new();
        inner.write_integer(&[0x02]);
        let inner_der = inner.finish();
        enc.write_context_specific(0, true, &inner_der);
        let der = enc.finish();
        assert_eq!(der, &[0xA0, 3, 0x02, 1, 0x02]);
    }

    #[test]
    fn test_write_boolean() {
        let mut enc = Encoder::new();
        enc.write_boolean(true);
        enc.write_boolean(false);
        let der = enc.finish();
        assert_eq!(der, &[0x01, 1, 0xFF, 0x01, 1, 0x00]);
    }

    #[test]
    fn test_write_time_roundtrip() {
        let time = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let mut enc = Encoder::new();
        enc.write_utc_time(&time);
        let der = enc.finish();
        let (node, _) = decode(&der, 0, DecodeOptions::strict()).unwrap();
        assert_eq!(node.time().unwrap(), time);
    }

    #[test]
    fn test_write_node_canonicalizes_length() {
        // SEQUENCE { OCTET STRING 0xAA } with a long-form inner length
        let data = [0x30, 0x04, 0x04, 0x81, 0x01, 0xAA];
        let (node, _) = decode(&data, 0, DecodeOptions::tolerant()).unwrap();
        let mut enc = Encoder::new();
        enc.write_node(&node);
        assert_eq!(enc.finish(), vec![0x30, 0x03, 0x04, 0x01, 0xAA]);
    }
}
