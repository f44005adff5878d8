//! Fingerprint command implementation.

use pemview_pki::fingerprint::{compute_fingerprint, DigestAlgorithm};
use pemview_pki::x509::Certificate;
use pemview_utils::asn1::DecodeOptions;

use crate::input::read_text;

pub fn run(file: &str, digest: &str) -> Result<(), Box<dyn std::error::Error>> {
    let algorithm: DigestAlgorithm = digest.parse()?;
    let pem = read_text(file)?;
    println!("{}", fingerprint_line(&pem, algorithm)?);
    Ok(())
}

/// Digest of the certificate's own DER span, so anything after it is ignored.
fn fingerprint_line(pem: &str, algorithm: DigestAlgorithm) -> Result<String, String> {
    let cert =
        Certificate::from_pem(pem, DecodeOptions::tolerant()).map_err(|e| e.user_message())?;
    Ok(format!(
        "{algorithm} Fingerprint={}",
        compute_fingerprint(algorithm, &cert.raw)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pemview_utils::pem;

    const RSA_2048: &str = include_str!("../../pemview-pki/tests/data/rsa2048.pem");
    const RSA_2048_SHA1: &str =
        "SHA1 Fingerprint=92:F5:97:44:D2:06:CF:11:15:9A:81:30:F4:30:C2:B3:DD:97:3E:9C";

    #[test]
    fn test_fingerprint_line() {
        assert_eq!(
            fingerprint_line(RSA_2048, DigestAlgorithm::Sha1).unwrap(),
            RSA_2048_SHA1
        );
        assert_eq!(
            fingerprint_line(RSA_2048, DigestAlgorithm::Md5).unwrap(),
            "MD5 Fingerprint=D5:55:1F:CC:72:36:84:7A:7F:7F:96:D2:34:0A:91:11"
        );
    }

    #[test]
    fn test_fingerprint_ignores_trailing_bytes() {
        let mut der = pem::unwrap_certificate(RSA_2048).unwrap();
        der.extend([0x00, 0x00]);
        let padded = pem::encode("CERTIFICATE", &der);
        assert_eq!(
            fingerprint_line(&padded, DigestAlgorithm::Sha1).unwrap(),
            RSA_2048_SHA1
        );
    }

    #[test]
    fn test_fingerprint_rejects_non_certificate() {
        // Valid base64 of "hello", which is no DER certificate
        let input = "-----BEGIN CERTIFICATE-----\naGVsbG8=\n-----END CERTIFICATE-----\n";
        assert!(fingerprint_line(input, DigestAlgorithm::Sha256).is_err());

        // A well-formed NULL frames fine but is no certificate either
        let input = "-----BEGIN CERTIFICATE-----\nBQA=\n-----END CERTIFICATE-----\n";
        let err = fingerprint_line(input, DigestAlgorithm::Sha256).unwrap_err();
        assert!(err.starts_with("Error decoding certificate: "), "{err}");
    }

    #[test]
    fn test_fingerprint_not_pem() {
        assert_eq!(
            fingerprint_line("garbage", DigestAlgorithm::Sha256).unwrap_err(),
            "Input does not appear to be a PEM certificate"
        );
    }

    #[test]
    fn test_run_unsupported_digest() {
        assert!(run("-", "sm3").is_err());
    }
}
