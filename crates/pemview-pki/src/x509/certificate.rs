//! Core X.509 types and parsing from the DER tree.

use chrono::{DateTime, Utc};
use pemview_types::{Asn1Error, CertError};
use pemview_utils::asn1::{decode_all, tags, DecodeOptions, Node};
use pemview_utils::oid::{dn_label, known, oid_name, Oid};
use serde::Serialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Core type definitions
// ---------------------------------------------------------------------------

/// An X.509 certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// DER-encoded certificate data.
    pub raw: Vec<u8>,
    /// Certificate version, 1 to 3.
    pub version: u8,
    /// Serial number content octets.
    pub serial_number: Vec<u8>,
    /// Signature algorithm from inside the TBS certificate.
    pub signature_algorithm: Oid,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    pub validity: Validity,
    /// Subject public key info.
    pub public_key: SubjectPublicKeyInfo,
    /// Extensions, in certificate order.
    pub extensions: Vec<X509Extension>,
    /// Outer signatureAlgorithm field.
    pub outer_signature_algorithm: Oid,
    /// Signature value bytes, without the unused-bits octet.
    pub signature_value: Vec<u8>,
}

/// A distinguished name (DN).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    pub entries: Vec<(String, String)>,
}

/// The validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Where a point in time falls relative to a validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidityStatus {
    NotYetValid,
    Expired,
    Valid,
}

/// Subject public key info.
#[derive(Debug, Clone)]
pub struct SubjectPublicKeyInfo {
    pub algorithm: Oid,
    pub details: KeyDetails,
}

/// Algorithm-specific facts about a public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDetails {
    Rsa { bits: usize, exponent: RsaExponent },
    /// Named curve, or `None` for explicit parameters.
    Ec { curve: Option<String> },
    Unknown,
}

/// An RSA public exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsaExponent {
    Small(u64),
    /// Magnitude bytes of an exponent wider than 64 bits.
    Large(Vec<u8>),
}

/// An X.509 extension.
#[derive(Debug, Clone)]
pub struct X509Extension {
    pub oid: Oid,
    pub critical: bool,
    /// The OCTET STRING wrapping the extension's DER value.
    pub value: Node,
}

// ---------------------------------------------------------------------------
// Distinguished Name helpers
// ---------------------------------------------------------------------------

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl DistinguishedName {
    /// Get the value for a given attribute label (e.g., "CN").
    pub fn get(&self, attr: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == attr)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a Name: `SEQUENCE OF SET OF SEQUENCE { type OID, value ANY }`.
/// Multi-valued RDNs are flattened in encounter order.
pub(crate) fn parse_name(node: &Node) -> Result<DistinguishedName, Asn1Error> {
    let mut entries = Vec::new();
    for rdn in node.expect(tags::SEQUENCE, "Name")?.children()? {
        for atv in rdn.expect(tags::SET, "RelativeDistinguishedName")?.children()? {
            let oid = atv.child(0)?.oid()?.to_dot_string();
            let label = dn_label(&oid).map_or(oid, str::to_string);
            let value = atv.child(1)?.string_value()?;
            entries.push((label, value));
        }
    }
    Ok(DistinguishedName { entries })
}

// ---------------------------------------------------------------------------
// Validity
// ---------------------------------------------------------------------------

impl Validity {
    /// Classify `now` against the window. Both ends are inclusive.
    pub fn status(&self, now: DateTime<Utc>) -> ValidityStatus {
        if now < self.not_before {
            ValidityStatus::NotYetValid
        } else if now > self.not_after {
            ValidityStatus::Expired
        } else {
            ValidityStatus::Valid
        }
    }
}

impl std::fmt::Display for ValidityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValidityStatus::NotYetValid => "NOT YET VALID",
            ValidityStatus::Expired => "EXPIRED",
            ValidityStatus::Valid => "VALID",
        })
    }
}

fn parse_validity(node: &Node) -> Result<Validity, Asn1Error> {
    let node = node.expect(tags::SEQUENCE, "Validity")?;
    Ok(Validity {
        not_before: node.child(0)?.time()?,
        not_after: node.child(1)?.time()?,
    })
}

// ---------------------------------------------------------------------------
// SubjectPublicKeyInfo
// ---------------------------------------------------------------------------

/// Bit length of an RSA modulus given its INTEGER content octets.
pub(crate) fn rsa_key_bits(modulus: &[u8]) -> usize {
    let significant = match modulus {
        [0, rest @ ..] => rest,
        _ => modulus,
    };
    match significant.first() {
        Some(first) => significant.len() * 8 - first.leading_zeros() as usize,
        None => 0,
    }
}

impl RsaExponent {
    fn from_integer(bytes: &[u8]) -> Self {
        let magnitude: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
        if magnitude.len() <= 8 {
            RsaExponent::Small(magnitude.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
        } else {
            RsaExponent::Large(magnitude)
        }
    }
}

impl std::fmt::Display for RsaExponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RsaExponent::Small(e) => write!(f, "{e} (0x{e:x})"),
            RsaExponent::Large(bytes) => {
                f.write_str("0x")?;
                bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
        }
    }
}

fn parse_subject_public_key_info(
    node: &Node,
    options: DecodeOptions,
) -> Result<SubjectPublicKeyInfo, Asn1Error> {
    let node = node.expect(tags::SEQUENCE, "SubjectPublicKeyInfo")?;
    let alg = node.child(0)?.expect(tags::SEQUENCE, "AlgorithmIdentifier")?;
    let algorithm = alg.child(0)?.oid()?;
    let parameters = alg.children()?.get(1);
    let key_node = node.child(1)?;
    key_node.bit_string()?;

    let details = match algorithm.to_dot_string().as_str() {
        known::RSA_ENCRYPTION => {
            // RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }
            let rsa = key_node.decode_bit_string_contents(options)?;
            let rsa = rsa.expect(tags::SEQUENCE, "RSAPublicKey")?;
            KeyDetails::Rsa {
                bits: rsa_key_bits(rsa.child(0)?.integer_bytes()?),
                exponent: RsaExponent::from_integer(rsa.child(1)?.integer_bytes()?),
            }
        }
        known::EC_PUBLIC_KEY => KeyDetails::Ec {
            curve: match parameters {
                Some(p) if p.tag.is_universal(tags::OID) => Some(p.oid()?.name()),
                _ => None,
            },
        },
        _ => KeyDetails::Unknown,
    };

    Ok(SubjectPublicKeyInfo { algorithm, details })
}

// ---------------------------------------------------------------------------
// AlgorithmIdentifier / Extensions
// ---------------------------------------------------------------------------

fn parse_algorithm_oid(node: &Node) -> Result<Oid, Asn1Error> {
    node.expect(tags::SEQUENCE, "AlgorithmIdentifier")?
        .child(0)?
        .oid()
}

/// Parse `Extensions ::= SEQUENCE OF Extension`.
fn parse_extensions(node: &Node) -> Result<Vec<X509Extension>, Asn1Error> {
    let mut extensions = Vec::new();
    for ext in node.expect(tags::SEQUENCE, "Extensions")?.children()? {
        // Extension ::= SEQUENCE { extnID OID, critical BOOLEAN DEFAULT FALSE, extnValue OCTET STRING }
        let fields = ext.expect(tags::SEQUENCE, "Extension")?.children()?;
        let oid = ext.child(0)?.oid()?;
        let mut idx = 1;
        let mut critical = false;
        if let Some(flag) = fields.get(idx).filter(|n| n.tag.is_universal(tags::BOOLEAN)) {
            critical = flag.boolean()?;
            idx += 1;
        }
        let value = ext.child(idx)?.expect(tags::OCTET_STRING, "OCTET STRING")?;
        extensions.push(X509Extension {
            oid,
            critical,
            value: value.clone(),
        });
    }
    Ok(extensions)
}

impl X509Extension {
    /// Registry name of the extension, or its dotted OID.
    pub fn name(&self) -> String {
        self.oid.name()
    }

    /// Decode the DER value carried by the extension.
    pub fn inner(&self, options: DecodeOptions) -> Result<Node, Asn1Error> {
        self.value.decode_octet_string_contents(options)
    }
}

// ---------------------------------------------------------------------------
// Certificate implementation
// ---------------------------------------------------------------------------

impl Certificate {
    /// Parse a certificate from DER-encoded bytes.
    pub fn from_der(data: &[u8], options: DecodeOptions) -> Result<Self, CertError> {
        let root = decode_all(data, options)?;
        debug!(bytes = data.len(), "decoded certificate DER");

        let field = |name: &'static str| move |e: Asn1Error| CertError::malformed(name, e);

        // Certificate ::= SEQUENCE { tbsCertificate, signatureAlgorithm, signatureValue }
        let outer = root
            .expect(tags::SEQUENCE, "Certificate")
            .and_then(Node::children)
            .map_err(field("certificate"))?;
        let tbs = outer
            .first()
            .ok_or(Asn1Error::MissingElement { index: 0 })
            .and_then(|n| n.expect(tags::SEQUENCE, "TBSCertificate"))
            .and_then(Node::children)
            .map_err(field("tbsCertificate"))?;

        let mut i = 0;
        let mut next = |name: &'static str| {
            let node = tbs
                .get(i)
                .ok_or_else(|| CertError::malformed(name, Asn1Error::MissingElement { index: i }));
            i += 1;
            node
        };

        // version [0] EXPLICIT INTEGER DEFAULT v1
        let version = match tbs.first() {
            Some(v) if v.tag.is_context(0) => {
                next("version")?;
                let raw = v.child(0).and_then(Node::integer_u64).map_err(field("version"))?;
                raw.checked_add(1)
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| CertError::malformed("version", "version number out of range"))?
            }
            _ => 1,
        };

        let serial_number = next("serialNumber")?
            .integer_bytes()
            .map_err(field("serialNumber"))?
            .to_vec();
        let signature_algorithm =
            parse_algorithm_oid(next("signature")?).map_err(field("signature"))?;
        let issuer = parse_name(next("issuer")?).map_err(field("issuer"))?;
        let validity = parse_validity(next("validity")?).map_err(field("validity"))?;
        let subject = parse_name(next("subject")?).map_err(field("subject"))?;
        let public_key = parse_subject_public_key_info(next("subjectPublicKeyInfo")?, options)
            .map_err(field("subjectPublicKeyInfo"))?;

        // issuerUniqueID [1] and subjectUniqueID [2] are skipped; extensions are [3]
        let mut extensions = Vec::new();
        for node in tbs.iter().skip(i) {
            if node.tag.is_context(3) {
                extensions = node
                    .child(0)
                    .and_then(parse_extensions)
                    .map_err(field("extensions"))?;
            }
        }

        let outer_signature_algorithm = outer
            .get(1)
            .ok_or(Asn1Error::MissingElement { index: 1 })
            .and_then(parse_algorithm_oid)
            .map_err(field("signatureAlgorithm"))?;
        let (_, signature) = outer
            .get(2)
            .ok_or(Asn1Error::MissingElement { index: 2 })
            .and_then(Node::bit_string)
            .map_err(field("signatureValue"))?;

        debug!(
            version,
            extensions = extensions.len(),
            algorithm = %oid_name(&signature_algorithm.to_dot_string()),
            "parsed certificate"
        );

        Ok(Certificate {
            // Excludes any trailing bytes skipped in tolerant mode
            raw: data.get(..root.encoded_len()).unwrap_or(data).to_vec(),
            version,
            serial_number,
            signature_algorithm,
            issuer,
            subject,
            validity,
            public_key,
            extensions,
            outer_signature_algorithm,
            signature_value: signature.to_vec(),
        })
    }

    /// Parse the first certificate in PEM text.
    pub fn from_pem(pem: &str, options: DecodeOptions) -> Result<Self, CertError> {
        let der = pemview_utils::pem::unwrap_certificate(pem)?;
        Self::from_der(&der, options)
    }

    /// Find an extension by dotted OID.
    pub fn extension(&self, oid: &str) -> Option<&X509Extension> {
        self.extensions.iter().find(|e| e.oid.to_dot_string() == oid)
    }
}
