//! DER tree dump command implementation.

use pemview_utils::asn1::{decode_all, DecodeOptions};
use pemview_utils::pem::unwrap_certificate;
use tracing::debug;

use crate::input::read_bytes;

const PEM_MARKER: &[u8] = b"-----BEGIN";

pub fn run(file: &str, strict: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_bytes(file)?;
    print!("{}", dump(&data, strict)?);
    Ok(())
}

/// Dump PEM or raw DER input.
fn dump(data: &[u8], strict: bool) -> Result<String, Box<dyn std::error::Error>> {
    let der = if data.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER) {
        unwrap_certificate(&String::from_utf8_lossy(data))?
    } else {
        data.to_vec()
    };
    debug!(bytes = der.len(), "dumping DER tree");
    let options = if strict {
        DecodeOptions::strict()
    } else {
        DecodeOptions::tolerant()
    };
    let root = decode_all(&der, options)?;
    Ok(root.dump())
}
