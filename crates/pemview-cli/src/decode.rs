//! Certificate report command implementation.

use chrono::{DateTime, Utc};
use pemview_pki::script::{self, Outcome};
use pemview_pki::x509::{Certificate, Report, ReportOptions};
use pemview_utils::asn1::DecodeOptions;

use crate::input::read_text;

pub fn run(
    file: &str,
    json: bool,
    at: Option<&str>,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pem = read_text(file)?;
    let options = report_options(at, strict)?;
    print!("{}", render(&pem, json, &options)?);
    Ok(())
}

fn report_options(at: Option<&str>, strict: bool) -> Result<ReportOptions, String> {
    let mut options = ReportOptions::default();
    if strict {
        options.der = DecodeOptions::strict();
    }
    if let Some(at) = at {
        options.now = DateTime::parse_from_rfc3339(at)
            .map_err(|e| format!("invalid --at time '{at}': {e}"))?
            .with_timezone(&Utc);
    }
    Ok(options)
}

fn render(pem: &str, json: bool, options: &ReportOptions) -> Result<String, Box<dyn std::error::Error>> {
    if json {
        let cert = Certificate::from_pem(pem.trim(), options.der).map_err(|e| e.user_message())?;
        let mut out = Report::new(&cert, options).to_json()?;
        out.push('\n');
        return Ok(out);
    }
    match script::run(pem, options) {
        Outcome::ReplaceText(text) => Ok(text),
        Outcome::PostError(msg) => Err(msg.into()),
    }
}
