//! Confinement of caller-supplied file names to a single allowed directory.
//!
//! Every request is checked twice: the raw name is screened for traversal
//! sequences before anything else happens, and the joined, normalized result
//! is checked against the root on a component boundary. Neither check touches
//! the filesystem; [`PathGuard::resolve_existing`] adds an opt-in third check
//! that canonicalizes on disk to catch symlinks leading out of the root.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{GatekeeperError, Result, Violation};

/// Separators rejected on every platform, in addition to the native ones.
const SEPARATORS: &[char] = &['/', '\\'];

/// An absolute, normalized directory that resolution must never escape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllowedRoot(PathBuf);

impl AllowedRoot {
    /// Creates an allowed root from an absolute path.
    ///
    /// The path is lexically normalized. Empty or relative paths are
    /// configuration errors.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(GatekeeperError::InvalidConfiguration(
                "allowed root must not be empty".to_string(),
            ));
        }
        if !path.is_absolute() {
            return Err(GatekeeperError::InvalidConfiguration(format!(
                "allowed root must be an absolute path, got {}",
                path.display()
            )));
        }
        Ok(Self(normalize(path)))
    }

    /// Creates an allowed root and resolves it against the filesystem.
    ///
    /// Symlinks in the root itself are followed once, at construction. The
    /// directory must exist.
    pub fn canonicalize<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = Self::new(path)?;
        let canonical = fs::canonicalize(&root.0).map_err(|e| {
            GatekeeperError::InvalidConfiguration(format!(
                "cannot canonicalize allowed root {}: {}",
                root.0.display(),
                e
            ))
        })?;
        Ok(Self(canonical))
    }

    /// Returns the root as a path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Whether `candidate` is the root or lies below it.
    ///
    /// The comparison is per component, so `/app/data-evil` is not inside
    /// `/app/data`.
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.0)
    }
}

impl fmt::Display for AllowedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for AllowedRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// A path proven to lie within an allowed root.
///
/// Only [`PathGuard`] can construct one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    path: PathBuf,
    root: PathBuf,
}

impl ResolvedPath {
    /// Returns the full resolved path.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Consumes the value, returning the full path.
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }

    /// Returns the portion of the path below the root.
    ///
    /// Empty when the request resolved to the root itself.
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.root).unwrap_or(Path::new(""))
    }

    /// Whether the request resolved to the root directory itself.
    pub fn is_root(&self) -> bool {
        self.path == self.root
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Resolves requested file names against a fixed [`AllowedRoot`].
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: AllowedRoot,
}

impl PathGuard {
    /// Creates a guard for the given root.
    pub fn new(root: AllowedRoot) -> Self {
        Self { root }
    }

    /// Creates a guard from a raw path, validating it as an [`AllowedRoot`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        AllowedRoot::new(path).map(Self::new)
    }

    /// Returns the root this guard confines to.
    pub fn root(&self) -> &AllowedRoot {
        &self.root
    }

    /// Resolves `requested` as a single segment under the root.
    ///
    /// This is a pure path computation. Opening the file is left to the
    /// caller, after a successful resolve.
    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath> {
        if let Err(err) = screen_name(requested) {
            self.report(requested, &err);
            return Err(err);
        }

        let candidate = normalize(&self.root.as_path().join(requested));
        let resolved = self.confine(candidate).inspect_err(|err| {
            self.report(requested, err);
        })?;

        debug!(
            requested = %requested.escape_debug(),
            resolved = %resolved,
            "Resolved path request"
        );
        Ok(resolved)
    }

    /// Resolves `requested` and then verifies the result on disk.
    ///
    /// Both the root and the resolved path are canonicalized, following any
    /// symlinks, and the canonical path must still lie under the canonical
    /// root. The returned path is the canonical one. The target must exist.
    pub fn resolve_existing(&self, requested: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve(requested)?;

        let canonical_root = fs::canonicalize(self.root.as_path())
            .map_err(|e| GatekeeperError::io(self.root.as_path(), e))?;
        let canonical = fs::canonicalize(resolved.as_path())
            .map_err(|e| GatekeeperError::io(resolved.as_path(), e))?;

        if !canonical.starts_with(&canonical_root) {
            let err = GatekeeperError::SecurityViolation(Violation::SymlinkEscape);
            warn!(
                requested = %requested.escape_debug(),
                target = %canonical.display(),
                root = %canonical_root.display(),
                violation = %Violation::SymlinkEscape,
                "Rejected path request"
            );
            return Err(err);
        }

        Ok(ResolvedPath {
            path: canonical,
            root: canonical_root,
        })
    }

    /// Accepts `candidate` only if it lies within the root.
    fn confine(&self, candidate: PathBuf) -> Result<ResolvedPath> {
        if !self.root.contains(&candidate) {
            return Err(GatekeeperError::SecurityViolation(
                Violation::OutsideAllowedDirectory,
            ));
        }
        Ok(ResolvedPath {
            path: candidate,
            root: self.root.as_path().to_path_buf(),
        })
    }

    fn report(&self, requested: &str, err: &GatekeeperError) {
        match err {
            GatekeeperError::SecurityViolation(violation) => warn!(
                requested = %requested.escape_debug(),
                root = %self.root,
                violation = %violation,
                "Rejected path request"
            ),
            other => debug!(error = %other, "Invalid path request"),
        }
    }
}

/// Resolves `requested` under `root` in one call.
///
/// Equivalent to building a [`PathGuard`] and calling
/// [`resolve`](PathGuard::resolve). An unusable root is reported as
/// [`GatekeeperError::InvalidConfiguration`].
pub fn resolve_path<P: AsRef<Path>>(root: P, requested: &str) -> Result<ResolvedPath> {
    PathGuard::from_path(root)?.resolve(requested)
}

/// Screens a raw requested name before any path arithmetic.
fn screen_name(requested: &str) -> Result<()> {
    if requested.is_empty() {
        return Err(GatekeeperError::InvalidInput(
            "requested name must not be empty".to_string(),
        ));
    }

    if requested.contains("..")
        || requested.contains(SEPARATORS)
        || requested.chars().any(std::path::is_separator)
    {
        return Err(GatekeeperError::SecurityViolation(Violation::PathTraversal));
    }

    if requested.contains('\0') {
        return Err(GatekeeperError::SecurityViolation(Violation::NulByte));
    }

    // Exactly one plain component; rejects drive prefixes on Windows.
    let mut components = Path::new(requested).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_) | Component::CurDir), None) => Ok(()),
        _ => Err(GatekeeperError::SecurityViolation(Violation::PathTraversal)),
    }
}

/// Lexically normalizes a path: drops `.`, resolves `..` and collapses
/// repeated separators. Never climbs above the filesystem root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guard(root: &str) -> PathGuard {
        PathGuard::from_path(root).unwrap()
    }

    fn violation(result: Result<ResolvedPath>) -> Option<Violation> {
        result.err().and_then(|e| e.violation())
    }

    #[test]
    fn test_resolve_simple_name() {
        let resolved = guard("/app/data").resolve("report.csv").unwrap();
        assert_eq!(resolved.as_path(), Path::new("/app/data/report.csv"));
        assert_eq!(resolved.relative(), Path::new("report.csv"));
        assert!(!resolved.is_root());
    }

    #[test]
    fn test_resolve_free_function() {
        let resolved = resolve_path("/app/data", "report.csv").unwrap();
        assert_eq!(resolved.to_string(), "/app/data/report.csv");
    }

    #[test]
    fn test_parent_traversal_rejected() {
        let result = guard("/app/data").resolve("../../etc/passwd");
        assert_eq!(violation(result), Some(Violation::PathTraversal));
    }

    #[test]
    fn test_mixed_traversal_rejected() {
        let result = guard("/app/data").resolve("sub/../../../etc/passwd");
        assert_eq!(violation(result), Some(Violation::PathTraversal));
    }

    #[test]
    fn test_bare_parent_rejected() {
        assert_eq!(
            violation(guard("/app/data").resolve("..")),
            Some(Violation::PathTraversal)
        );
    }

    #[test]
    fn test_separator_rejected() {
        let g = guard("/app/data");
        assert_eq!(
            violation(g.resolve("folder/file.txt")),
            Some(Violation::PathTraversal)
        );
        assert_eq!(
            violation(g.resolve("folder\\file.txt")),
            Some(Violation::PathTraversal)
        );
        assert_eq!(
            violation(g.resolve("/etc/passwd")),
            Some(Violation::PathTraversal)
        );
    }

    #[test]
    fn test_double_dot_inside_name_rejected() {
        // Any `..` is refused, even where it would form a legal file name.
        assert_eq!(
            violation(guard("/app/data").resolve("report..csv")),
            Some(Violation::PathTraversal)
        );
    }

    #[test]
    fn test_nul_byte_rejected() {
        assert_eq!(
            violation(guard("/app/data").resolve("report.csv\0.png")),
            Some(Violation::NulByte)
        );
    }

    #[test]
    fn test_empty_name_is_invalid_input() {
        let err = guard("/app/data").resolve("").unwrap_err();
        assert!(matches!(err, GatekeeperError::InvalidInput(_)));
        assert!(!err.is_security_violation());
    }

    #[test]
    fn test_current_dir_resolves_to_root() {
        let resolved = guard("/app/data").resolve(".").unwrap();
        assert_eq!(resolved.as_path(), Path::new("/app/data"));
        assert!(resolved.is_root());
        assert_eq!(resolved.relative(), Path::new(""));
    }

    #[test]
    fn test_hidden_file_allowed() {
        let resolved = guard("/app/data").resolve(".env").unwrap();
        assert_eq!(resolved.as_path(), Path::new("/app/data/.env"));
    }

    #[test]
    fn test_sibling_prefix_is_outside() {
        let g = guard("/app/data");
        let result = g.confine(PathBuf::from("/app/data-evil/secret.txt"));
        assert_eq!(violation(result), Some(Violation::OutsideAllowedDirectory));
    }

    #[test]
    fn test_confine_accepts_descendant_and_root() {
        let g = guard("/app/data");
        assert!(g.confine(PathBuf::from("/app/data/a/b")).is_ok());
        assert!(g.confine(PathBuf::from("/app/data")).is_ok());
        assert!(g.confine(PathBuf::from("/app")).is_err());
    }

    #[test]
    fn test_root_is_normalized() {
        let g = guard("/app//data/./sub/../");
        assert_eq!(g.root().as_path(), Path::new("/app/data"));
        let resolved = g.resolve("x.txt").unwrap();
        assert_eq!(resolved.as_path(), Path::new("/app/data/x.txt"));
    }

    #[test]
    fn test_filesystem_root_as_allowed_root() {
        let resolved = guard("/").resolve("etc").unwrap();
        assert_eq!(resolved.as_path(), Path::new("/etc"));
    }

    #[test]
    fn test_empty_root_is_configuration_error() {
        let err = AllowedRoot::new("").unwrap_err();
        assert!(matches!(err, GatekeeperError::InvalidConfiguration(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_relative_root_is_configuration_error() {
        let err = PathGuard::from_path("data/files").unwrap_err();
        assert!(matches!(err, GatekeeperError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_resolve_path_with_bad_root() {
        let err = resolve_path("", "report.csv").unwrap_err();
        assert!(matches!(err, GatekeeperError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/./b//c/")), PathBuf::from("/a/b/c"));
        assert_eq!(normalize(Path::new("/../../etc")), PathBuf::from("/etc"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_allowed_root_contains_boundary() {
        let root = AllowedRoot::new("/app/data").unwrap();
        assert!(root.contains(Path::new("/app/data")));
        assert!(root.contains(Path::new("/app/data/file")));
        assert!(!root.contains(Path::new("/app/data-evil")));
        assert!(!root.contains(Path::new("/app/dat")));
    }

    #[test]
    fn test_resolve_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("report.csv"), "a,b\n").unwrap();

        let g = PathGuard::new(AllowedRoot::canonicalize(temp_dir.path()).unwrap());
        let resolved = g.resolve_existing("report.csv").unwrap();

        assert_eq!(
            resolved.as_path(),
            fs::canonicalize(temp_dir.path().join("report.csv")).unwrap()
        );
        assert_eq!(resolved.relative(), Path::new("report.csv"));
    }

    #[test]
    fn test_resolve_existing_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let g = PathGuard::from_path(temp_dir.path()).unwrap();

        let err = g.resolve_existing("missing.txt").unwrap_err();
        assert!(matches!(err, GatekeeperError::Io { .. }));
        assert!(!err.is_security_violation());
    }

    #[test]
    fn test_resolve_existing_still_screens_names() {
        let temp_dir = TempDir::new().unwrap();
        let g = PathGuard::from_path(temp_dir.path()).unwrap();
        assert_eq!(
            violation(g.resolve_existing("../etc")),
            Some(Violation::PathTraversal)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_existing_rejects_escaping_symlink() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        let outside = temp_dir.path().join("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.txt"), "secret").unwrap();
        symlink(outside.join("secret.txt"), root.join("link.txt")).unwrap();

        let g = PathGuard::from_path(&root).unwrap();

        // The lexical check cannot see through the link.
        assert!(g.resolve("link.txt").is_ok());

        assert_eq!(
            violation(g.resolve_existing("link.txt")),
            Some(Violation::SymlinkEscape)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_existing_allows_internal_symlink() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("target.txt"), "ok").unwrap();
        symlink(
            temp_dir.path().join("target.txt"),
            temp_dir.path().join("alias.txt"),
        )
        .unwrap();

        let g = PathGuard::from_path(temp_dir.path()).unwrap();
        let resolved = g.resolve_existing("alias.txt").unwrap();
        assert_eq!(resolved.relative(), Path::new("target.txt"));
    }
}
