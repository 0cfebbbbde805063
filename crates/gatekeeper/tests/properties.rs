//! Behavioural properties of the gatekeeper components.
//!
//! These tests exercise the public API only:
//! - Traversal screening across many roots and names
//! - Ancestor boundary of every successful resolution
//! - Token length, uniqueness and encoding
//! - Digest determinism
//! - Concurrent use from threads and async tasks

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use gatekeeper::path_guard::normalize;
use gatekeeper::{
    generate_token, hash_credential, resolve_path, Gatekeeper, GatekeeperError, TokenGenerator,
    Violation,
};

const ROOTS: &[&str] = &["/app/data", "/", "/srv/files/", "/var//lib/./gatekeeper"];

// =============================================================================
// Path resolution
// =============================================================================

#[test]
fn test_traversal_rejected_for_every_root() {
    let hostile = [
        "..",
        "../",
        "../../etc/passwd",
        "sub/../../../etc/passwd",
        "..\\..\\windows\\system32",
        "/etc/passwd",
        "a/b",
        "a\\b",
        "....",
        "x..y",
        "/",
        "\\",
    ];

    for root in ROOTS {
        for name in hostile {
            let err = resolve_path(root, name).unwrap_err();
            assert_eq!(
                err,
                GatekeeperError::SecurityViolation(Violation::PathTraversal),
                "root {:?}, name {:?}",
                root,
                name
            );
        }
    }
}

#[test]
fn test_plain_names_stay_under_root() {
    let names = [
        "report.csv",
        ".",
        ".hidden",
        "file with spaces.txt",
        "ünïcødé.md",
        "a.b.c",
        "C:evil",
    ];

    for root in ROOTS {
        let normalized_root = normalize(Path::new(root));
        for name in names {
            // "C:evil" is a drive-relative path on Windows, a plain name elsewhere.
            if cfg!(windows) && name.contains(':') {
                continue;
            }
            let resolved = resolve_path(root, name).unwrap();
            assert!(
                resolved.as_path().starts_with(&normalized_root),
                "{} escaped {}",
                resolved,
                root
            );
            let depth = resolved.as_path().components().count();
            let root_depth = normalized_root.components().count();
            assert!(depth == root_depth || depth == root_depth + 1);
        }
    }
}

#[test]
fn test_scenarios() {
    assert_eq!(
        resolve_path("/app/data", "report.csv").unwrap().as_path(),
        Path::new("/app/data/report.csv")
    );
    assert!(resolve_path("/app/data", "../../etc/passwd")
        .unwrap_err()
        .is_security_violation());
    assert!(resolve_path("/app/data", "sub/../../../etc/passwd")
        .unwrap_err()
        .is_security_violation());
}

#[test]
fn test_empty_name_is_not_a_security_event() {
    let err = resolve_path("/app/data", "").unwrap_err();
    assert!(matches!(err, GatekeeperError::InvalidInput(_)));
    assert!(!err.is_security_violation());
    assert!(!err.is_fatal());
}

// =============================================================================
// Tokens
// =============================================================================

#[test]
fn test_thousand_tokens_are_unique() {
    let tokens: HashSet<String> = (0..1000)
        .map(|_| generate_token(32).unwrap().into_string())
        .collect();
    assert_eq!(tokens.len(), 1000);
}

#[test]
fn test_token_lengths_decode_exactly() {
    for n in [1usize, 16, 32, 64] {
        let token = generate_token(n).unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(token.as_str()).unwrap();
        assert_eq!(decoded.len(), n);
    }
}

#[test]
fn test_invalid_token_lengths() {
    let generator = TokenGenerator::default();
    assert!(matches!(
        generator.generate(0usize),
        Err(GatekeeperError::InvalidInput(_))
    ));
    assert!(matches!(
        generator.generate(-1i64),
        Err(GatekeeperError::InvalidInput(_))
    ));
    assert!(matches!(
        generator.generate(1025usize),
        Err(GatekeeperError::InvalidInput(_))
    ));
}

// =============================================================================
// Credential hashing
// =============================================================================

#[test]
fn test_hash_properties() {
    assert_eq!(
        hash_credential("password123").unwrap(),
        hash_credential("password123").unwrap()
    );
    assert_ne!(
        hash_credential("password123").unwrap(),
        hash_credential("password124").unwrap()
    );
    assert!(matches!(
        hash_credential(""),
        Err(GatekeeperError::InvalidInput(_))
    ));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_shared_gatekeeper_across_threads() {
    let gatekeeper = Arc::new(Gatekeeper::with_root("/app/data").unwrap());
    let expected = gatekeeper.hash("shared-secret").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let gatekeeper = Arc::clone(&gatekeeper);
            std::thread::spawn(move || {
                let mut tokens = Vec::new();
                for j in 0..100 {
                    let name = format!("file-{}-{}.txt", i, j);
                    let resolved = gatekeeper.resolve(&name).unwrap();
                    assert!(resolved.as_path().starts_with("/app/data"));
                    assert!(gatekeeper.resolve("../x").is_err());
                    tokens.push(gatekeeper.generate_default().unwrap().into_string());
                }
                let digest = gatekeeper.hash("shared-secret").unwrap();
                (tokens, digest)
            })
        })
        .collect();

    let mut all_tokens = HashSet::new();
    for handle in handles {
        let (tokens, digest) = handle.join().unwrap();
        assert_eq!(digest, expected);
        all_tokens.extend(tokens);
    }
    assert_eq!(all_tokens.len(), 800);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_gatekeeper_across_tasks() {
    let gatekeeper = Arc::new(Gatekeeper::with_root("/srv/files").unwrap());

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let gatekeeper = Arc::clone(&gatekeeper);
        tasks.push(tokio::spawn(async move {
            let token = gatekeeper.generate(32).unwrap();
            let digest = gatekeeper.hash("task-secret").unwrap();
            (token.into_string(), digest.into_string())
        }));
    }

    let mut tokens = HashSet::new();
    let mut digests = HashSet::new();
    for task in tasks {
        let (token, digest) = task.await.unwrap();
        tokens.insert(token);
        digests.insert(digest);
    }

    assert_eq!(tokens.len(), 16);
    assert_eq!(digests.len(), 1);
}
