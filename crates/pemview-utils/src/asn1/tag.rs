//! ASN.1 identifier octet parsing and encoding.

use super::{tags, Tag, TagClass};
use pemview_types::Asn1Error;

impl Tag {
    /// A universal tag.
    pub const fn universal(number: u32, constructed: bool) -> Self {
        Tag {
            class: TagClass::Universal,
            constructed,
            number,
        }
    }

    /// A context-specific tag, `[number]`.
    pub const fn context(number: u32, constructed: bool) -> Self {
        Tag {
            class: TagClass::ContextSpecific,
            constructed,
            number,
        }
    }

    /// Parse a tag from the first bytes of `input`.
    /// Returns the tag and number of bytes consumed. Error offsets are
    /// relative to `input`.
    pub fn from_bytes(input: &[u8]) -> Result<(Self, usize), Asn1Error> {
        let first = *input.first().ok_or(Asn1Error::Truncated {
            offset: 0,
            need: 1,
            available: 0,
        })?;

        let class = match first >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        };
        let constructed = (first & 0x20) != 0;

        let low_bits = first & 0x1F;
        if low_bits < 0x1F {
            return Ok((
                Tag {
                    class,
                    constructed,
                    number: low_bits as u32,
                },
                1,
            ));
        }

        // High-tag-number form: base-128 digits, high bit set on all but the last
        let mut number: u32 = 0;
        let mut i = 1;
        loop {
            let byte = *input.get(i).ok_or(Asn1Error::Truncated {
                offset: i,
                need: 1,
                available: 0,
            })?;
            if number > (u32::MAX >> 7) {
                return Err(Asn1Error::UnsupportedEncoding {
                    offset: 0,
                    reason: "tag number too large",
                });
            }
            number = (number << 7) | (byte & 0x7F) as u32;
            i += 1;
            if (byte & 0x80) == 0 {
                break;
            }
        }
        Ok((
            Tag {
                class,
                constructed,
                number,
            },
            i,
        ))
    }

    /// Encode this tag to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let class_bits = match self.class {
            TagClass::Universal => 0x00,
            TagClass::Application => 0x40,
            TagClass::ContextSpecific => 0x80,
            TagClass::Private => 0xC0,
        };
        let constructed_bit = if self.constructed { 0x20 } else { 0x00 };

        if self.number < 0x1F {
            vec![class_bits | constructed_bit | (self.number as u8)]
        } else {
            let mut result = vec![class_bits | constructed_bit | 0x1F];
            let mut num = self.number;
            let mut bytes = Vec::new();
            while num > 0 {
                bytes.push((num & 0x7F) as u8);
                num >>= 7;
            }
            bytes.reverse();
            let last = bytes.len() - 1;
            for (i, b) in bytes.iter().enumerate() {
                if i < last {
                    result.push(b | 0x80);
                } else {
                    result.push(*b);
                }
            }
            result
        }
    }

    /// Returns true if this is the universal tag `number`.
    pub fn is_universal(&self, number: u32) -> bool {
        self.class == TagClass::Universal && self.number == number
    }

    /// Returns true if this is the context-specific tag `[number]`.
    pub fn is_context(&self, number: u32) -> bool {
        self.class == TagClass::ContextSpecific && self.number == number
    }

    /// Name of a universal type, if this is a universal tag we know.
    pub fn universal_name(&self) -> Option<&'static str> {
        if self.class != TagClass::Universal {
            return None;
        }
        let name = match self.number {
            tags::BOOLEAN => "BOOLEAN",
            tags::INTEGER => "INTEGER",
            tags::BIT_STRING => "BIT STRING",
            tags::OCTET_STRING => "OCTET STRING",
            tags::NULL => "NULL",
            tags::OID => "OBJECT",
            tags::ENUMERATED => "ENUMERATED",
            tags::UTF8_STRING => "UTF8STRING",
            tags::SEQUENCE => "SEQUENCE",
            tags::SET => "SET",
            tags::NUMERIC_STRING => "NUMERICSTRING",
            tags::PRINTABLE_STRING => "PRINTABLESTRING",
            tags::T61_STRING => "T61STRING",
            tags::IA5_STRING => "IA5STRING",
            tags::UTC_TIME => "UTCTIME",
            tags::GENERALIZED_TIME => "GENERALIZEDTIME",
            tags::VISIBLE_STRING => "VISIBLESTRING",
            tags::UNIVERSAL_STRING => "UNIVERSALSTRING",
            tags::BMP_STRING => "BMPSTRING",
            _ => return None,
        };
        Some(name)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = self.universal_name() {
            return f.write_str(name);
        }
        match self.class {
            TagClass::Universal => write!(f, "UNIVERSAL {}", self.number),
            TagClass::Application => write!(f, "[APPLICATION {}]", self.number),
            TagClass::ContextSpecific => write!(f, "[{}]", self.number),
            TagClass::Private => write!(f, "[PRIVATE {}]", self.number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_tag() {
        let (tag, len) = Tag::from_bytes(&[0x30]).unwrap();
        assert_eq!(tag.class, TagClass::Universal);
        assert!(tag.constructed);
        assert_eq!(tag.number, tags::SEQUENCE);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_parse_context_tag() {
        let (tag, len) = Tag::from_bytes(&[0xA3]).unwrap();
        assert!(tag.is_context(3));
        assert!(tag.constructed);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_parse_high_tag_number() {
        // [APPLICATION 201] primitive: 0x5F 0x81 0x49
        let (tag, len) = Tag::from_bytes(&[0x5F, 0x81, 0x49]).unwrap();
        assert_eq!(tag.class, TagClass::Application);
        assert!(!tag.constructed);
        assert_eq!(tag.number, 201);
        assert_eq!(len, 3);
        assert_eq!(tag.to_bytes(), vec![0x5F, 0x81, 0x49]);
    }

    #[test]
    fn test_truncated_high_tag_number() {
        let err = Tag::from_bytes(&[0x1F, 0x81]).unwrap_err();
        assert!(matches!(err, Asn1Error::Truncated { offset: 2, .. }));
    }

    #[test]
    fn test_roundtrip() {
        let tag = Tag::context(3, true);
        let bytes = tag.to_bytes();
        let (parsed, _) = Tag::from_bytes(&bytes).unwrap();
        assert_eq!(tag, parsed);
    }

    #[test]
    fn test_display() {
        assert_eq!(Tag::universal(tags::SEQUENCE, true).to_string(), "SEQUENCE");
        assert_eq!(Tag::context(0, true).to_string(), "[0]");
        assert_eq!(Tag::universal(99, false).to_string(), "UNIVERSAL 99");
    }
}
