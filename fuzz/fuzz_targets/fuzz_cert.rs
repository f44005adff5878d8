#![no_main]
use libfuzzer_sys::fuzz_target;
use pemview_pki::x509::{Certificate, Report, ReportOptions};

fuzz_target!(|data: &[u8]| {
    let options = ReportOptions::default();
    if let Ok(cert) = Certificate::from_der(data, options.der) {
        let report = Report::new(&cert, &options);
        let _ = report.to_text();
        let _ = report.to_json();
    }
});
