//! The certificate report: a structured form and its fixed-layout text rendering.

use chrono::{DateTime, Utc};
use pemview_utils::asn1::DecodeOptions;
use serde::{Serialize, Serializer};
use tracing::warn;

use super::certificate::{Certificate, KeyDetails, ValidityStatus};
use super::extensions::{interpret, ExtensionValue};
use crate::fingerprint::{compute_fingerprint, hex_colon, DigestAlgorithm};

const SEPARATOR_WIDTH: usize = 70;
const SIGNATURE_BYTES_PER_LINE: usize = 24;

/// Inputs to report assembly.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// The instant validity status is judged against.
    pub now: DateTime<Utc>,
    pub der: DecodeOptions,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            der: DecodeOptions::tolerant(),
        }
    }
}

/// Everything the report shows, already interpreted.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub version: u8,
    pub serial_number: String,
    pub signature_algorithm: String,
    pub issuer: String,
    pub subject: String,
    pub validity: ValidityReport,
    pub public_key: PublicKeyReport,
    pub extensions: Vec<ExtensionReport>,
    pub fingerprints: Fingerprints,
    #[serde(serialize_with = "serialize_hex")]
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidityReport {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub status: ValidityStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicKeyReport {
    pub algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exponent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
}

/// One extension with either its interpretation or the reason it failed.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionReport {
    pub oid: String,
    pub name: String,
    pub critical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ExtensionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Fingerprints {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex_colon(bytes))
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl Report {
    /// Interpret every field of `cert`.
    pub fn new(cert: &Certificate, options: &ReportOptions) -> Self {
        let spki = &cert.public_key;
        let mut public_key = PublicKeyReport {
            algorithm: spki.algorithm.name(),
            key_size: None,
            exponent: None,
            curve: None,
        };
        match &spki.details {
            KeyDetails::Rsa { bits, exponent } => {
                public_key.key_size = Some(*bits);
                public_key.exponent = Some(exponent.to_string());
            }
            KeyDetails::Ec { curve } => {
                public_key.curve = Some(
                    curve
                        .clone()
                        .unwrap_or_else(|| "(unnamed/explicit)".to_string()),
                );
            }
            KeyDetails::Unknown => {}
        }

        let extensions = cert
            .extensions
            .iter()
            .map(|ext| {
                let (value, error) = match interpret(ext, options.der) {
                    Ok(value) => (Some(value), None),
                    Err(e) => {
                        warn!(oid = %ext.oid, error = %e, "failed to decode extension");
                        (None, Some(e.to_string()))
                    }
                };
                ExtensionReport {
                    oid: ext.oid.to_dot_string(),
                    name: ext.name(),
                    critical: ext.critical,
                    value,
                    error,
                }
            })
            .collect();

        Report {
            version: cert.version,
            serial_number: hex_colon(&cert.serial_number),
            signature_algorithm: cert.signature_algorithm.name(),
            issuer: cert.issuer.to_string(),
            subject: cert.subject.to_string(),
            validity: ValidityReport {
                not_before: cert.validity.not_before,
                not_after: cert.validity.not_after,
                status: cert.validity.status(options.now),
            },
            public_key,
            extensions,
            fingerprints: Fingerprints {
                md5: compute_fingerprint(DigestAlgorithm::Md5, &cert.raw),
                sha1: compute_fingerprint(DigestAlgorithm::Sha1, &cert.raw),
                sha256: compute_fingerprint(DigestAlgorithm::Sha256, &cert.raw),
            },
            signature: cert.signature_value.clone(),
        }
    }

    /// The fixed-layout text report.
    pub fn to_text(&self) -> String {
        let sep = "=".repeat(SEPARATOR_WIDTH);
        let mut out = format!("{sep}\nCERTIFICATE INFORMATION\n{sep}\n\n");

        out.push_str(&format!(
            "Version:          {} (0x{:x})\n",
            self.version,
            self.version.saturating_sub(1)
        ));
        out.push_str(&format!("Serial Number:    {}\n", self.serial_number));
        out.push_str(&format!("Signature Alg:    {}\n\n", self.signature_algorithm));
        out.push_str(&format!("Issuer:           {}\n", self.issuer));
        out.push_str(&format!("Subject:          {}\n\n", self.subject));

        out.push_str("Validity:\n");
        out.push_str(&format!(
            "  Not Before:     {}\n",
            format_time(&self.validity.not_before)
        ));
        out.push_str(&format!(
            "  Not After:      {}\n",
            format_time(&self.validity.not_after)
        ));
        out.push_str(&format!("  Status:         {}\n\n", self.validity.status));

        out.push_str("Public Key:\n");
        out.push_str(&format!("  Algorithm:      {}\n", self.public_key.algorithm));
        if let Some(bits) = self.public_key.key_size {
            out.push_str(&format!("  Key Size:       {bits} bit\n"));
        }
        if let Some(exponent) = &self.public_key.exponent {
            out.push_str(&format!("  Exponent:       {exponent}\n"));
        }
        if let Some(curve) = &self.public_key.curve {
            out.push_str(&format!("  Curve:          {curve}\n"));
        }
        out.push('\n');

        out.push_str("X.509v3 Extensions:\n");
        if self.extensions.is_empty() {
            out.push_str("    None\n");
        }
        for ext in &self.extensions {
            let crit = if ext.critical { " (critical)" } else { "" };
            out.push_str(&format!("    {}{crit}:\n", ext.name));
            if let Some(error) = &ext.error {
                out.push_str(&format!("      (parse error: {error})\n"));
            }
            for line in ext.value.iter().flat_map(ExtensionValue::lines) {
                out.push_str(&format!("      {line}\n"));
            }
        }
        out.push('\n');

        out.push_str("Fingerprints:\n");
        out.push_str(&format!("  MD5:    {}\n", self.fingerprints.md5));
        out.push_str(&format!("  SHA1:   {}\n", self.fingerprints.sha1));
        out.push_str(&format!("  SHA256: {}\n\n", self.fingerprints.sha256));

        out.push_str(&format!("Signature ({} bytes):\n", self.signature.len()));
        for chunk in self.signature.chunks(SIGNATURE_BYTES_PER_LINE) {
            out.push_str(&format!("  {}\n", hex_colon(chunk)));
        }
        out.push_str(&format!("\n{sep}\n"));
        out
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Certificate {
    /// Produce the human-readable report for this certificate.
    pub fn to_text(&self, options: &ReportOptions) -> String {
        Report::new(self, options).to_text()
    }
}
