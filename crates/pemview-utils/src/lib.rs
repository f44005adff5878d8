#![forbid(unsafe_code)]
#![doc = "Utility functions for pemview: ASN.1 DER trees, PEM, OID."]

#[cfg(feature = "asn1")]
pub mod asn1;

#[cfg(feature = "pem")]
pub mod pem;

#[cfg(feature = "oid")]
pub mod oid;
