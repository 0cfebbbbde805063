//! Performance benchmarks for the gatekeeper hot paths.
//!
//! - Path resolution (accepted and rejected requests)
//! - Token generation at several lengths
//! - Credential hashing per algorithm

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use gatekeeper::{CredentialHasher, DigestEncoding, HashAlgorithm, PathGuard, TokenGenerator};

/// Benchmark path resolution.
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let guard = PathGuard::from_path("/app/data").unwrap();

    group.bench_function("accepted", |b| {
        b.iter(|| guard.resolve(black_box("report.csv")))
    });

    group.bench_function("rejected_traversal", |b| {
        b.iter(|| guard.resolve(black_box("../../etc/passwd")))
    });

    group.finish();
}

/// Benchmark token generation from the OS random source.
fn bench_tokens(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokens");
    let generator = TokenGenerator::default();

    for len in [16usize, 32, 256] {
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_function(format!("generate_{}B", len), |b| {
            b.iter(|| generator.generate(black_box(len)))
        });
    }

    group.finish();
}

/// Benchmark credential hashing.
fn bench_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash");
    let secret = "correct horse battery staple";

    for algorithm in [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ] {
        let hasher = CredentialHasher::new(algorithm, DigestEncoding::Base64);
        group.bench_function(algorithm.name(), |b| {
            b.iter(|| hasher.hash(black_box(secret)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_tokens, bench_hash);
criterion_main!(benches);
