//! Host boundary: one input string in, replacement text or an error message out.

use tracing::debug;

use crate::x509::{Certificate, Report, ReportOptions};

/// What the host should do with the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Replace the input with this report.
    ReplaceText(String),
    /// Leave the input untouched and show this message.
    PostError(String),
}

/// Decode the certificate in `input` and produce its text report.
pub fn run(input: &str, options: &ReportOptions) -> Outcome {
    match Certificate::from_pem(input.trim(), options.der) {
        Ok(cert) => Outcome::ReplaceText(Report::new(&cert, options).to_text()),
        Err(e) => {
            debug!(error = %e, "certificate decode aborted");
            Outcome::PostError(e.user_message())
        }
    }
}
