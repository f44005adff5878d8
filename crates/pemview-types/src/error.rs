/// ASN.1 DER framing and value errors.
///
/// Offsets are relative to the start of the buffer handed to the decoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Asn1Error {
    // Framing errors
    #[error("truncated input at offset {offset}: need {need} bytes, {available} available")]
    Truncated {
        offset: usize,
        need: usize,
        available: usize,
    },
    #[error("unsupported encoding at offset {offset}: {reason}")]
    UnsupportedEncoding { offset: usize, reason: &'static str },
    #[error("nesting deeper than {limit} levels at offset {offset}")]
    NestingTooDeep { offset: usize, limit: usize },
    #[error("{count} trailing bytes at offset {offset}")]
    TrailingData { offset: usize, count: usize },

    // Value errors
    #[error("expected {expected}, found {found}")]
    UnexpectedTag { expected: &'static str, found: String },
    #[error("missing element at index {index}")]
    MissingElement { index: usize },
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
}

/// PEM armor errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PemError {
    #[error("no BEGIN CERTIFICATE marker found")]
    MissingHeader,
    #[error("invalid base64 in PEM body: {0}")]
    InvalidBase64(String),
}

/// Errors that abort a whole certificate decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertError {
    #[error("Input does not appear to be a PEM certificate")]
    Format,
    #[error("invalid base64 in PEM body: {0}")]
    Decode(String),
    #[error("{0}")]
    Asn1(#[from] Asn1Error),
    #[error("malformed certificate field {field}: {reason}")]
    Malformed { field: &'static str, reason: String },
}

impl CertError {
    /// Build a `Malformed` error for `field` from any displayable cause.
    pub fn malformed(field: &'static str, reason: impl std::fmt::Display) -> Self {
        CertError::Malformed {
            field,
            reason: reason.to_string(),
        }
    }

    /// The message shown to a user when the decode is aborted.
    pub fn user_message(&self) -> String {
        match self {
            CertError::Format => self.to_string(),
            CertError::Asn1(e) => format!("Failed to parse certificate ASN.1: {e}"),
            CertError::Decode(_) | CertError::Malformed { .. } => {
                format!("Error decoding certificate: {self}")
            }
        }
    }
}

impl From<PemError> for CertError {
    fn from(e: PemError) -> Self {
        match e {
            PemError::MissingHeader => CertError::Format,
            PemError::InvalidBase64(reason) => CertError::Decode(reason),
        }
    }
}

/// Failure to interpret a single extension. Never aborts a report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtensionError {
    #[error("{0}")]
    Asn1(#[from] Asn1Error),
    #[error("{0}")]
    Invalid(String),
}
