//! ASN.1 DER decoder producing an owned [`Node`] tree.

use super::{Node, NodeValue, Tag};
use pemview_types::Asn1Error;
use tracing::{trace, warn};

/// Default limit on constructed nesting. Real certificates nest around ten
/// levels deep.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Decoder behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Accept non-minimal length octets and trailing data after the
    /// outermost element. Lengths that run past the buffer are never accepted.
    pub tolerant: bool,
    /// Maximum depth of constructed nodes.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            tolerant: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecodeOptions {
    /// Strict DER.
    pub fn strict() -> Self {
        Self::default()
    }

    /// DER with the irregularities seen in real-world certificates tolerated.
    pub fn tolerant() -> Self {
        Self {
            tolerant: true,
            ..Self::default()
        }
    }
}

/// Decode the element starting at `offset` in `data`.
///
/// Returns the node and the number of bytes it occupies.
pub fn decode(
    data: &[u8],
    offset: usize,
    options: DecodeOptions,
) -> Result<(Node, usize), Asn1Error> {
    let rest = data.get(offset..).ok_or(Asn1Error::Truncated {
        offset,
        need: 1,
        available: 0,
    })?;
    let mut dec = Decoder::nested(rest, offset, 0, options);
    let node = dec.read_node()?;
    Ok((node, dec.position()))
}

/// Decode a buffer holding exactly one element.
///
/// Trailing bytes are rejected in strict mode and ignored in tolerant mode.
pub fn decode_all(data: &[u8], options: DecodeOptions) -> Result<Node, Asn1Error> {
    decode_embedded(data, 0, options)
}

/// [`decode_all`] over a slice that starts at absolute offset `base`.
pub(crate) fn decode_embedded(
    data: &[u8],
    base: usize,
    options: DecodeOptions,
) -> Result<Node, Asn1Error> {
    let mut dec = Decoder::nested(data, base, 0, options);
    let node = dec.read_node()?;
    if !dec.is_empty() {
        let offset = base + dec.position();
        let count = data.len() - dec.position();
        if !options.tolerant {
            return Err(Asn1Error::TrailingData { offset, count });
        }
        warn!(offset, count, "ignoring trailing data after DER element");
    }
    Ok(node)
}

/// A recursive ASN.1 DER decoder over a borrowed buffer.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]`, used in nodes and error reports.
    base: usize,
    depth: usize,
    options: DecodeOptions,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder over the given data.
    pub fn new(data: &'a [u8], options: DecodeOptions) -> Self {
        Self::nested(data, 0, 0, options)
    }

    fn nested(data: &'a [u8], base: usize, depth: usize, options: DecodeOptions) -> Self {
        Self {
            data,
            pos: 0,
            base,
            depth,
            options,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Decode the next element, recursing into constructed values.
    pub fn read_node(&mut self) -> Result<Node, Asn1Error> {
        let start = self.pos;
        let offset = self.base + start;

        let (tag, tag_len) =
            Tag::from_bytes(&self.data[self.pos..]).map_err(|e| relocate(e, offset))?;
        if tag_len != tag.to_bytes().len() {
            if !self.options.tolerant {
                return Err(Asn1Error::UnsupportedEncoding {
                    offset,
                    reason: "non-minimal tag encoding",
                });
            }
            warn!(offset, %tag, "accepting non-minimal tag encoding");
        }
        self.pos += tag_len;

        let length = self.read_length()?;
        let available = self.data.len() - self.pos;
        if length > available {
            return Err(Asn1Error::Truncated {
                offset: self.base + self.pos,
                need: length,
                available,
            });
        }

        let header = self.data[start..self.pos].to_vec();
        let content_base = self.base + self.pos;
        let content = &self.data[self.pos..self.pos + length];
        self.pos += length;

        let value = if tag.constructed {
            if self.depth >= self.options.max_depth {
                return Err(Asn1Error::NestingTooDeep {
                    offset,
                    limit: self.options.max_depth,
                });
            }
            let mut inner = Decoder::nested(content, content_base, self.depth + 1, self.options);
            let mut children = Vec::new();
            while !inner.is_empty() {
                children.push(inner.read_node()?);
            }
            NodeValue::Composite(children)
        } else {
            NodeValue::Leaf(content.to_vec())
        };

        trace!(offset, depth = self.depth, %tag, length, "decoded node");
        Ok(Node {
            tag,
            offset,
            header,
            value,
        })
    }

    /// Parse a DER length.
    fn read_length(&mut self) -> Result<usize, Asn1Error> {
        let offset = self.base + self.pos;
        let first = *self.data.get(self.pos).ok_or(Asn1Error::Truncated {
            offset,
            need: 1,
            available: 0,
        })?;
        self.pos += 1;

        match first {
            0x00..=0x7F => Ok(first as usize),
            0x80 => Err(Asn1Error::UnsupportedEncoding {
                offset,
                reason: "indefinite length",
            }),
            0xFF => Err(Asn1Error::UnsupportedEncoding {
                offset,
                reason: "reserved length octet",
            }),
            _ => {
                let num_bytes = (first & 0x7F) as usize;
                let available = self.data.len() - self.pos;
                if num_bytes > available {
                    return Err(Asn1Error::Truncated {
                        offset: offset + 1,
                        need: num_bytes,
                        available,
                    });
                }
                let octets = &self.data[self.pos..self.pos + num_bytes];
                self.pos += num_bytes;

                let significant = octets.iter().skip_while(|&&b| b == 0).count();
                if significant > std::mem::size_of::<usize>() {
                    return Err(Asn1Error::UnsupportedEncoding {
                        offset,
                        reason: "length too large",
                    });
                }
                let length = octets
                    .iter()
                    .skip(num_bytes - significant)
                    .fold(0usize, |acc, &b| (acc << 8) | b as usize);

                if octets[0] == 0 || length < 0x80 {
                    if !self.options.tolerant {
                        return Err(Asn1Error::UnsupportedEncoding {
                            offset,
                            reason: "non-minimal length encoding",
                        });
                    }
                    warn!(offset, length, "accepting non-minimal length encoding");
                }
                Ok(length)
            }
        }
    }
}

/// Shift an error raised against a sub-slice to an absolute offset.
fn relocate(e: Asn1Error, by: usize) -> Asn1Error {
    match e {
        Asn1Error::Truncated {
            offset,
            need,
            available,
        } => Asn1Error::Truncated {
            offset: offset + by,
            need,
            available,
        },
        Asn1Error::UnsupportedEncoding { offset, reason } => Asn1Error::UnsupportedEncoding {
            offset: offset + by,
            reason,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::tags;
    use proptest::prelude::*;

    #[test]
    fn test_decode_sequence_of_integers() {
        // SEQUENCE { INTEGER 42, INTEGER 1 }
        let data = [0x30, 0x06, 0x02, 0x01, 0x2A, 0x02, 0x01, 0x01];
        let (node, consumed) = decode(&data, 0, DecodeOptions::strict()).unwrap();
        assert_eq!(consumed, data.len());
        assert!(node.tag.is_universal(tags::SEQUENCE));
        let children = node.children().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].bytes().unwrap(), &[0x2A]);
        assert_eq!(children[1].offset, 5);
    }

    #[test]
    fn test_decode_at_offset() {
        let data = [0xFF, 0xFF, 0x04, 0x02, 0xAA, 0xBB];
        let (node, consumed) = decode(&data, 2, DecodeOptions::strict()).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(node.offset, 2);
        assert_eq!(node.bytes().unwrap(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_long_form_length() {
        let mut data = vec![0x04, 0x81, 0x80];
        data.extend(std::iter::repeat(0x11).take(0x80));
        let (node, consumed) = decode(&data, 0, DecodeOptions::strict()).unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(node.header, vec![0x04, 0x81, 0x80]);
        assert_eq!(node.bytes().unwrap().len(), 0x80);
    }

    #[test]
    fn test_indefinite_length_rejected() {
        let data = [0x30, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00];
        for options in [DecodeOptions::strict(), DecodeOptions::tolerant()] {
            let err = decode(&data, 0, options).unwrap_err();
            assert_eq!(
                err,
                Asn1Error::UnsupportedEncoding {
                    offset: 1,
                    reason: "indefinite length"
                }
            );
        }
    }

    #[test]
    fn test_non_minimal_length_strict_vs_tolerant() {
        // OCTET STRING, length 2 encoded in long form
        let data = [0x04, 0x81, 0x02, 0xAA, 0xBB];
        let err = decode(&data, 0, DecodeOptions::strict()).unwrap_err();
        assert!(matches!(err, Asn1Error::UnsupportedEncoding { .. }));

        let (node, consumed) = decode(&data, 0, DecodeOptions::tolerant()).unwrap();
        assert_eq!(consumed, 5);
        assert_eq!(node.bytes().unwrap(), &[0xAA, 0xBB]);
        // The original span survives, including the odd header
        assert_eq!(node.encoded(), data.to_vec());
    }

    #[test]
    fn test_non_minimal_tag_strict_vs_tolerant() {
        // [1] 33 with a leading 0x80 continuation octet
        let padded = [0x9F, 0x80, 0x21, 0x00];
        // UNIVERSAL 5 written in high-tag form
        let low_in_high_form = [0x1F, 0x05, 0x00];

        for (data, number) in [(&padded[..], 33), (&low_in_high_form[..], 5)] {
            let err = decode(data, 0, DecodeOptions::strict()).unwrap_err();
            assert_eq!(
                err,
                Asn1Error::UnsupportedEncoding {
                    offset: 0,
                    reason: "non-minimal tag encoding"
                }
            );

            let (node, consumed) = decode(data, 0, DecodeOptions::tolerant()).unwrap();
            assert_eq!(consumed, data.len());
            assert_eq!(node.tag.number, number);
            assert_eq!(node.encoded(), data.to_vec());
        }
    }

    #[test]
    fn test_minimal_high_tag_accepted_strict() {
        // [1] 31 is the smallest number that needs the high-tag form
        let (node, _) = decode(&[0x9F, 0x1F, 0x00], 0, DecodeOptions::strict()).unwrap();
        assert_eq!(node.tag.number, 31);

        // Nested: the offending child is reported at its own offset
        let data = [0x30, 0x03, 0x1F, 0x05, 0x00];
        let err = decode(&data, 0, DecodeOptions::strict()).unwrap_err();
        assert!(matches!(err, Asn1Error::UnsupportedEncoding { offset: 2, .. }));
    }

    #[test]
    fn test_leading_zero_length_octet_tolerated() {
        let data = [0x04, 0x82, 0x00, 0x01, 0x7F];
        assert!(decode(&data, 0, DecodeOptions::strict()).is_err());
        let (node, _) = decode(&data, 0, DecodeOptions::tolerant()).unwrap();
        assert_eq!(node.bytes().unwrap(), &[0x7F]);
    }

    #[test]
    fn test_truncated_is_always_fatal() {
        // Declares 5 content bytes, only 2 present
        let data = [0x04, 0x05, 0x01, 0x02];
        for options in [DecodeOptions::strict(), DecodeOptions::tolerant()] {
            let err = decode(&data, 0, options).unwrap_err();
            assert_eq!(
                err,
                Asn1Error::Truncated {
                    offset: 2,
                    need: 5,
                    available: 2
                }
            );
        }
    }

    #[test]
    fn test_child_cannot_escape_parent() {
        // SEQUENCE of length 3 whose child claims 4 bytes; the outer buffer
        // does have enough bytes but the parent does not.
        let data = [0x30, 0x03, 0x04, 0x04, 0x01, 0x02, 0x03];
        let err = decode(&data, 0, DecodeOptions::tolerant()).unwrap_err();
        assert!(matches!(err, Asn1Error::Truncated { offset: 4, .. }));
    }

    #[test]
    fn test_length_octets_truncated() {
        let data = [0x04, 0x84, 0x00];
        let err = decode(&data, 0, DecodeOptions::tolerant()).unwrap_err();
        assert!(matches!(err, Asn1Error::Truncated { offset: 2, need: 4, .. }));
    }

    #[test]
    fn test_nesting_limit() {
        // 10 nested SEQUENCEs
        let mut data = vec![0x05, 0x00];
        for _ in 0..10 {
            let mut outer = vec![0x30, data.len() as u8];
            outer.extend(data);
            data = outer;
        }
        let options = DecodeOptions {
            tolerant: false,
            max_depth: 5,
        };
        let err = decode(&data, 0, options).unwrap_err();
        assert!(matches!(err, Asn1Error::NestingTooDeep { limit: 5, .. }));
        assert!(decode(&data, 0, DecodeOptions::strict()).is_ok());
    }

    #[test]
    fn test_decode_all_trailing_data() {
        let data = [0x05, 0x00, 0xDE, 0xAD];
        let err = decode_all(&data, DecodeOptions::strict()).unwrap_err();
        assert_eq!(err, Asn1Error::TrailingData { offset: 2, count: 2 });
        let node = decode_all(&data, DecodeOptions::tolerant()).unwrap();
        assert!(node.tag.is_universal(tags::NULL));
    }

    #[test]
    fn test_empty_input() {
        let err = decode(&[], 0, DecodeOptions::strict()).unwrap_err();
        assert!(matches!(err, Asn1Error::Truncated { offset: 0, .. }));
        assert!(decode(&[0x05, 0x00], 5, DecodeOptions::strict()).is_err());
    }

    fn leaf_strategy() -> impl Strategy<Value = (u8, Vec<u8>)> {
        (
            prop::sample::select(vec![0x02u8, 0x04, 0x06, 0x0C, 0x13, 0x16, 0x17, 0x80]),
            prop::collection::vec(any::<u8>(), 0..300),
        )
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let _ = decode(&data, 0, DecodeOptions::strict());
            let _ = decode(&data, 0, DecodeOptions::tolerant());
        }

        #[test]
        fn prop_leaf_span_round_trips((tag, content) in leaf_strategy()) {
            let mut enc = crate::asn1::Encoder::new();
            enc.write_tlv(Tag::from_bytes(&[tag]).unwrap().0, &content);
            let der = enc.finish();

            let (node, consumed) = decode(&der, 0, DecodeOptions::strict()).unwrap();
            prop_assert_eq!(consumed, der.len());
            prop_assert_eq!(node.bytes().unwrap(), content.as_slice());
            prop_assert_eq!(node.encoded(), der.clone());
            prop_assert_eq!(node.to_der(), der);
        }
    }
}
