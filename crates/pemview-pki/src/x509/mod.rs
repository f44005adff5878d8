//! X.509 certificate model, field interpreters and the text report.

mod certificate;
mod extensions;
mod text;

pub use certificate::{
    Certificate, DistinguishedName, KeyDetails, RsaExponent, SubjectPublicKeyInfo, Validity,
    ValidityStatus, X509Extension,
};
pub use extensions::{AccessDescription, ExtensionValue, GeneralName};
pub use text::{
    ExtensionReport, Fingerprints, PublicKeyReport, Report, ReportOptions, ValidityReport,
};
