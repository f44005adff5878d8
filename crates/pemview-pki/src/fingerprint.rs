//! Certificate fingerprints over the raw DER encoding.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::str::FromStr;

/// Digest algorithms offered for fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Upper-case label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }

    /// Raw digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5 => Md5::digest(data).to_vec(),
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(format!("unsupported digest: {other}")),
        }
    }
}

/// Colon-separated uppercase hex fingerprint of `der`.
pub fn compute_fingerprint(algorithm: DigestAlgorithm, der: &[u8]) -> String {
    hex_colon(&algorithm.digest(der))
}

/// Render bytes as `AB:CD:EF`.
pub fn hex_colon(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, b) in data.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        let _ = write!(out, "{b:02X}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            compute_fingerprint(DigestAlgorithm::Md5, b"abc"),
            "90:01:50:98:3C:D2:4F:B0:D6:96:3F:7D:28:E1:7F:72"
        );
        assert_eq!(
            compute_fingerprint(DigestAlgorithm::Sha1, b"abc"),
            "A9:99:3E:36:47:06:81:6A:BA:3E:25:71:78:50:C2:6C:9C:D0:D8:9D"
        );
        assert_eq!(
            compute_fingerprint(DigestAlgorithm::Sha256, b"abc"),
            "BA:78:16:BF:8F:01:CF:EA:41:41:40:DE:5D:AE:22:23:\
             B0:03:61:A3:96:17:7A:9C:B4:10:FF:61:F2:00:15:AD"
        );
    }

    #[test]
    fn test_hex_colon() {
        assert_eq!(hex_colon(&[]), "");
        assert_eq!(hex_colon(&[0x0A]), "0A");
        assert_eq!(hex_colon(&[0xDE, 0xAD, 0x01]), "DE:AD:01");
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("SHA256".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha256));
        assert_eq!("sha-1".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha1));
        assert!("sm3".parse::<DigestAlgorithm>().is_err());
        assert_eq!(DigestAlgorithm::Md5.to_string(), "MD5");
    }
}
