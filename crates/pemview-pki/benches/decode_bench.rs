//! Certificate decoding benchmarks.
//!
//! Run with: cargo bench -p pemview-pki

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pemview_pki::x509::{Certificate, Report, ReportOptions};
use pemview_utils::asn1::{decode_all, DecodeOptions};

const CERTS: [(&str, &str); 3] = [
    ("rsa2048", include_str!("../tests/data/rsa2048.pem")),
    ("ec_p256", include_str!("../tests/data/ec_p256.pem")),
    ("ec_p384_full", include_str!("../tests/data/ec_p384_full.pem")),
];

fn bench_der_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("der_tree");

    for (name, pem) in CERTS {
        let der = pemview_utils::pem::unwrap_certificate(pem).unwrap();
        group.bench_with_input(BenchmarkId::new("decode_all", name), &der, |bench, der| {
            bench.iter(|| decode_all(der, DecodeOptions::strict()));
        });
    }

    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");
    let options = ReportOptions::default();

    for (name, pem) in CERTS {
        group.bench_with_input(BenchmarkId::new("from_pem", name), pem, |bench, pem| {
            bench.iter(|| Certificate::from_pem(pem, options.der));
        });

        let cert = Certificate::from_pem(pem, options.der).unwrap();
        group.bench_with_input(BenchmarkId::new("to_text", name), &cert, |bench, cert| {
            bench.iter(|| Report::new(cert, &options).to_text());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_der_tree, bench_report);
criterion_main!(benches);
