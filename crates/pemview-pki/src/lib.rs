#![forbid(unsafe_code)]
#![doc = "X.509 certificate decoding and reporting for pemview."]

pub mod fingerprint;

#[cfg(feature = "x509")]
pub mod x509;

#[cfg(feature = "x509")]
pub mod script;
