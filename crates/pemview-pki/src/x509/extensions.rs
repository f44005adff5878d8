//! Per-extension interpreters, dispatched by OID.

use pemview_types::ExtensionError;
use pemview_utils::asn1::{tags, DecodeOptions, Node, TagClass};
use pemview_utils::oid::known;
use serde::Serialize;

use super::certificate::X509Extension;
use crate::fingerprint::hex_colon;

/// Interpreted content of one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExtensionValue {
    SubjectAltName(Vec<GeneralName>),
    BasicConstraints { ca: bool, path_len: Option<u64> },
    /// Names of the asserted key usage bits.
    KeyUsage(Vec<&'static str>),
    ExtendedKeyUsage(Vec<String>),
    SubjectKeyIdentifier(String),
    /// The keyIdentifier, if the extension carries one.
    AuthorityKeyIdentifier(Option<String>),
    CertificatePolicies(Vec<String>),
    AuthorityInfoAccess(Vec<AccessDescription>),
    CrlDistributionPoints(Vec<GeneralName>),
    /// No interpreter for this OID.
    Other { critical: bool },
}

/// A GeneralName, reduced to the forms the report shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GeneralName {
    Email(String),
    Dns(String),
    Uri(String),
    /// Dotted IPv4, or `[IPv6]` for a 16-byte address.
    Ip(String),
    /// Any other choice, by its context tag number.
    Other(u32),
}

/// One AuthorityInfoAccess entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDescription {
    pub method: String,
    pub location: GeneralName,
}

type ExtensionDecoder = fn(&Node) -> Result<ExtensionValue, ExtensionError>;

/// Interpreters by dotted OID. Anything not listed reports criticality only.
const DECODERS: &[(&str, ExtensionDecoder)] = &[
    (known::SUBJECT_ALT_NAME, decode_subject_alt_name),
    (known::BASIC_CONSTRAINTS, decode_basic_constraints),
    (known::KEY_USAGE, decode_key_usage),
    (known::EXT_KEY_USAGE, decode_extended_key_usage),
    (known::SUBJECT_KEY_IDENTIFIER, decode_subject_key_identifier),
    (known::AUTHORITY_KEY_IDENTIFIER, decode_authority_key_identifier),
    (known::CERTIFICATE_POLICIES, decode_certificate_policies),
    (known::AUTHORITY_INFO_ACCESS, decode_authority_info_access),
    (known::CRL_DISTRIBUTION_POINTS, decode_crl_distribution_points),
];

/// Key usage bit names, most significant bit first.
const KEY_USAGE_NAMES: [&str; 9] = [
    "digitalSignature",
    "nonRepudiation",
    "keyEncipherment",
    "dataEncipherment",
    "keyAgreement",
    "keyCertSign",
    "cRLSign",
    "encipherOnly",
    "decipherOnly",
];

/// Interpret one extension. Failures stay scoped to this extension.
pub(crate) fn interpret(
    ext: &X509Extension,
    options: DecodeOptions,
) -> Result<ExtensionValue, ExtensionError> {
    let oid = ext.oid.to_dot_string();
    match DECODERS.iter().find(|(dotted, _)| *dotted == oid) {
        Some((_, decoder)) => decoder(&ext.inner(options)?),
        None => Ok(ExtensionValue::Other {
            critical: ext.critical,
        }),
    }
}

impl ExtensionValue {
    /// Body lines for the text report, without indentation.
    pub fn lines(&self) -> Vec<String> {
        match self {
            ExtensionValue::SubjectAltName(names) | ExtensionValue::CrlDistributionPoints(names) => {
                names.iter().map(GeneralName::to_string).collect()
            }
            ExtensionValue::BasicConstraints { ca, path_len } => {
                let mut lines = vec![format!("CA: {}", if *ca { "TRUE" } else { "FALSE" })];
                if let Some(len) = path_len {
                    lines.push(format!("Path Length: {len}"));
                }
                lines
            }
            ExtensionValue::KeyUsage(names) if names.is_empty() => vec!["none".to_string()],
            ExtensionValue::KeyUsage(names) => vec![names.join(", ")],
            ExtensionValue::ExtendedKeyUsage(usages) => vec![usages.join(", ")],
            ExtensionValue::SubjectKeyIdentifier(hex) => vec![hex.clone()],
            ExtensionValue::AuthorityKeyIdentifier(Some(hex)) => vec![format!("keyid: {hex}")],
            ExtensionValue::AuthorityKeyIdentifier(None) => vec!["(present)".to_string()],
            ExtensionValue::CertificatePolicies(policies) => policies.clone(),
            ExtensionValue::AuthorityInfoAccess(entries) => entries
                .iter()
                .map(|e| match &e.location {
                    GeneralName::Uri(uri) => format!("{}: {uri}", e.method),
                    other => format!("{}: {other}", e.method),
                })
                .collect(),
            ExtensionValue::Other { critical } => {
                vec![format!("Critical: {}", if *critical { "Yes" } else { "No" })]
            }
        }
    }
}

impl std::fmt::Display for GeneralName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneralName::Email(v) => write!(f, "email: {v}"),
            GeneralName::Dns(v) => write!(f, "DNS: {v}"),
            GeneralName::Uri(v) => write!(f, "URI: {v}"),
            GeneralName::Ip(v) => write!(f, "IP: {v}"),
            GeneralName::Other(tag) => write!(f, "other: [{tag}]"),
        }
    }
}

// ---------------------------------------------------------------------------
// Extension parsing functions
// ---------------------------------------------------------------------------

/// Parse a GeneralName from a context-tagged node.
/// GeneralName ::= CHOICE {
///   otherName       [0], rfc822Name [1] IA5String, dNSName [2] IA5String,
///   x400Address     [3], directoryName [4] EXPLICIT Name,
///   ediPartyName    [5], uniformResourceIdentifier [6] IA5String,
///   iPAddress       [7] OCTET STRING, registeredID [8] OID
/// }
fn parse_general_name(node: &Node) -> Result<GeneralName, ExtensionError> {
    if node.tag.class != TagClass::ContextSpecific {
        return Ok(GeneralName::Other(node.tag.number));
    }
    let name = match node.tag.number {
        1 => GeneralName::Email(node.string_value()?),
        2 => GeneralName::Dns(node.string_value()?),
        6 => GeneralName::Uri(node.string_value()?),
        7 => match node.bytes()? {
            [a, b, c, d] => GeneralName::Ip(format!("{a}.{b}.{c}.{d}")),
            bytes if bytes.len() == 16 => GeneralName::Ip("[IPv6]".to_string()),
            bytes => {
                return Err(ExtensionError::Invalid(format!(
                    "iPAddress of {} bytes",
                    bytes.len()
                )))
            }
        },
        n => GeneralName::Other(n),
    };
    Ok(name)
}

/// SubjectAltName ::= SEQUENCE OF GeneralName
fn decode_subject_alt_name(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    let names = inner
        .expect(tags::SEQUENCE, "GeneralNames")?
        .children()?
        .iter()
        .map(parse_general_name)
        .collect::<Result<_, _>>()?;
    Ok(ExtensionValue::SubjectAltName(names))
}

/// BasicConstraints ::= SEQUENCE { cA BOOLEAN DEFAULT FALSE, pathLenConstraint INTEGER OPTIONAL }
fn decode_basic_constraints(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    let mut ca = false;
    let mut path_len = None;
    for field in inner.expect(tags::SEQUENCE, "BasicConstraints")?.children()? {
        if field.tag.is_universal(tags::BOOLEAN) {
            ca = field.boolean()?;
        } else if field.tag.is_universal(tags::INTEGER) {
            path_len = Some(field.integer_u64()?);
        }
    }
    Ok(ExtensionValue::BasicConstraints { ca, path_len })
}

/// KeyUsage ::= BIT STRING, bit 0 (digitalSignature) is the MSB of the first byte.
fn decode_key_usage(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    let (_, bits) = inner.bit_string()?;
    let b1 = bits.first().copied().unwrap_or(0) as u16;
    let b2 = bits.get(1).copied().unwrap_or(0) as u16;
    let mask = (b1 << 8) | b2;
    let names = KEY_USAGE_NAMES
        .iter()
        .enumerate()
        .filter(|(k, _)| mask & (0x8000 >> k) != 0)
        .map(|(_, name)| *name)
        .collect();
    Ok(ExtensionValue::KeyUsage(names))
}

/// ExtKeyUsageSyntax ::= SEQUENCE OF KeyPurposeId
fn decode_extended_key_usage(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    let usages = inner
        .expect(tags::SEQUENCE, "ExtKeyUsageSyntax")?
        .children()?
        .iter()
        .map(|n| n.oid().map(|oid| oid.name()))
        .collect::<Result<_, _>>()?;
    Ok(ExtensionValue::ExtendedKeyUsage(usages))
}

/// SubjectKeyIdentifier ::= OCTET STRING
fn decode_subject_key_identifier(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    Ok(ExtensionValue::SubjectKeyIdentifier(hex_colon(
        inner.octet_string()?,
    )))
}

/// AuthorityKeyIdentifier ::= SEQUENCE { keyIdentifier [0] OPTIONAL, ... }
fn decode_authority_key_identifier(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    let mut key_id = None;
    for field in inner.expect(tags::SEQUENCE, "AuthorityKeyIdentifier")?.children()? {
        if field.tag.is_context(0) {
            key_id = Some(hex_colon(field.bytes()?));
        }
    }
    Ok(ExtensionValue::AuthorityKeyIdentifier(key_id))
}

/// CertificatePolicies ::= SEQUENCE OF PolicyInformation { policyIdentifier, qualifiers OPTIONAL }
fn decode_certificate_policies(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    let policies = inner
        .expect(tags::SEQUENCE, "CertificatePolicies")?
        .children()?
        .iter()
        .map(|policy| policy.child(0).and_then(Node::oid).map(|oid| oid.name()))
        .collect::<Result<_, _>>()?;
    Ok(ExtensionValue::CertificatePolicies(policies))
}

/// AuthorityInfoAccessSyntax ::= SEQUENCE OF AccessDescription { accessMethod OID, accessLocation GeneralName }
fn decode_authority_info_access(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    let mut entries = Vec::new();
    for desc in inner.expect(tags::SEQUENCE, "AuthorityInfoAccessSyntax")?.children()? {
        let oid = desc.child(0)?.oid()?;
        let method = match oid.to_dot_string().as_str() {
            known::AD_OCSP => "OCSP".to_string(),
            known::AD_CA_ISSUERS => "CA Issuers".to_string(),
            _ => oid.name(),
        };
        entries.push(AccessDescription {
            method,
            location: parse_general_name(desc.child(1)?)?,
        });
    }
    Ok(ExtensionValue::AuthorityInfoAccess(entries))
}

/// CRLDistributionPoints ::= SEQUENCE OF DistributionPoint
/// DistributionPoint ::= SEQUENCE { distributionPoint [0] DistributionPointName OPTIONAL, ... }
/// DistributionPointName ::= CHOICE { fullName [0] GeneralNames, nameRelativeToCRLIssuer [1] }
fn decode_crl_distribution_points(inner: &Node) -> Result<ExtensionValue, ExtensionError> {
    let mut names = Vec::new();
    for point in inner.expect(tags::SEQUENCE, "CRLDistributionPoints")?.children()? {
        let Some(dp) = point
            .expect(tags::SEQUENCE, "DistributionPoint")?
            .children()?
            .iter()
            .find(|n| n.tag.is_context(0))
        else {
            continue;
        };
        let dp_name = dp.child(0)?;
        if dp_name.tag.is_context(0) {
            for name in dp_name.children()? {
                names.push(parse_general_name(name)?);
            }
        } else {
            names.push(GeneralName::Other(dp_name.tag.number));
        }
    }
    Ok(ExtensionValue::CrlDistributionPoints(names))
}
