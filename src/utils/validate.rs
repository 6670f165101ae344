//! Input validation for URLs, sandboxed paths, commands and identifiers.
//!
//! This module provides validation functions to prevent SSRF, path traversal
//! and command injection through tool arguments.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::{Host, Url};

/// Validation error types
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL targets a local or private address: {0}")]
    DangerousUrl(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path escapes the sandbox root: {0}")]
    PathTraversal(String),

    #[error("Command not allowed: {0}")]
    CommandNotAllowed(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Validate a URL to prevent injection and SSRF attacks
///
/// Only `http` and `https` are accepted. Unless `allow_private_hosts` is set,
/// loopback, private, link-local and unspecified addresses are refused. Host
/// names are not resolved, so a public name pointing at a private address
/// still passes.
pub fn validate_url(url: &str, allow_private_hosts: bool) -> Result<Url, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::InvalidUrl("empty URL".to_string()));
    }

    if url.contains('\0') || url.contains('\n') || url.contains('\r') {
        return Err(ValidationError::InvalidUrl(
            "contains control characters".to_string(),
        ));
    }

    let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ValidationError::InvalidUrl(format!(
                "invalid scheme: {}",
                scheme
            )))
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| ValidationError::InvalidUrl("missing host".to_string()))?;

    if !allow_private_hosts && is_private_host(&host) {
        return Err(ValidationError::DangerousUrl(host.to_string()));
    }

    Ok(parsed)
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            // "localhost." is the same name in fully-qualified form
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_ipv4(ip),
        Host::Ipv6(ip) => is_private_ipv6(ip),
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    // Covers both ::ffff:a.b.c.d and the IPv4-compatible ::a.b.c.d form
    if let Some(v4) = ip.to_ipv4() {
        return is_private_ipv4(&v4);
    }
    let first = ip.segments()[0];
    (first & 0xfe00) == 0xfc00 // unique local
        || (first & 0xffc0) == 0xfe80 // link local
}

/// Resolve `path` inside `root`, refusing anything that lands outside it.
///
/// Relative paths are joined onto the root; absolute paths must already lie
/// under it. `..` components are folded lexically and symlinks on the
/// deepest existing ancestor are resolved, so a link pointing out of the
/// sandbox is caught too. The target itself does not need to exist.
pub fn resolve_in_root(root: &Path, path: &str) -> Result<PathBuf, ValidationError> {
    let path = path.trim();

    if path.is_empty() {
        return Err(ValidationError::InvalidPath("empty path".to_string()));
    }

    if path.contains('\0') {
        return Err(ValidationError::InvalidPath("contains null byte".to_string()));
    }

    let root = root.canonicalize().map_err(|e| {
        ValidationError::InvalidPath(format!("sandbox root {}: {}", root.display(), e))
    })?;

    let requested = Path::new(path);
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };

    let normalized = normalize_lexically(&joined);
    if !normalized.starts_with(&root) {
        return Err(ValidationError::PathTraversal(path.to_string()));
    }

    // Walk up to the deepest entry that exists (dangling symlinks included)
    let mut existing = normalized.as_path();
    let mut missing = Vec::new();
    while existing.symlink_metadata().is_err() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|e| ValidationError::InvalidPath(format!("{}: {}", path, e)))?;
    if !resolved.starts_with(&root) {
        return Err(ValidationError::PathTraversal(path.to_string()));
    }

    for name in missing.iter().rev() {
        resolved.push(name);
    }

    Ok(resolved)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Check that a command is a bare program name on the allowlist
pub fn validate_command(command: &str, allowlist: &[String]) -> Result<(), ValidationError> {
    let command = command.trim();

    if command.is_empty()
        || command.contains('/')
        || command.contains('\\')
        || command.contains('\0')
    {
        return Err(ValidationError::CommandNotAllowed(command.to_string()));
    }

    if !allowlist.iter().any(|allowed| allowed == command) {
        return Err(ValidationError::CommandNotAllowed(command.to_string()));
    }

    Ok(())
}

/// Check that `name` is usable as an identifier in generated code
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://example.com/api", false).is_ok());
        assert!(validate_url("http://93.184.216.34/", false).is_ok());
        assert!(validate_url("http://[::5db8:d822]/", false).is_ok());
        assert!(validate_url("http://localhost.example.com/", false).is_ok());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("", false).is_err());
        assert!(validate_url("ftp://example.com", false).is_err());
        assert!(validate_url("javascript:alert(1)", false).is_err());
        assert!(validate_url("file:///etc/passwd", false).is_err());
    }

    #[test]
    fn test_validate_url_private_hosts() {
        for url in [
            "http://localhost:8000",
            "http://127.0.0.1:8000",
            "http://10.0.0.4/",
            "http://192.168.1.1/",
            "http://172.20.0.1/",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]:8080/",
            "http://0.0.0.0/",
            "http://localhost./secret",
            "http://[::127.0.0.1]:8080/",
            "http://[::ffff:10.0.0.1]/",
        ] {
            assert!(validate_url(url, false).is_err(), "{} should be refused", url);
            assert!(validate_url(url, true).is_ok(), "{} should be allowed", url);
        }
    }

    #[test]
    fn test_resolve_in_root() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/a.txt"), "a").unwrap();
        let root = dir.path().canonicalize().unwrap();

        assert_eq!(
            resolve_in_root(dir.path(), "sub/a.txt").unwrap(),
            root.join("sub/a.txt")
        );
        assert_eq!(
            resolve_in_root(dir.path(), "./sub/../sub/a.txt").unwrap(),
            root.join("sub/a.txt")
        );
        assert_eq!(
            resolve_in_root(dir.path(), "sub/new/file.txt").unwrap(),
            root.join("sub/new/file.txt")
        );
        assert_eq!(resolve_in_root(dir.path(), ".").unwrap(), root);
    }

    #[test]
    fn test_resolve_in_root_traversal() {
        let dir = tempdir().unwrap();

        assert!(matches!(
            resolve_in_root(dir.path(), "../etc/passwd"),
            Err(ValidationError::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_in_root(dir.path(), "/etc/passwd"),
            Err(ValidationError::PathTraversal(_))
        ));
        assert!(resolve_in_root(dir.path(), "").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_in_root_symlink_escape() {
        let outside = tempdir().unwrap();
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        assert!(matches!(
            resolve_in_root(dir.path(), "link/secret.txt"),
            Err(ValidationError::PathTraversal(_))
        ));
    }

    #[test]
    fn test_validate_command() {
        let allowlist = vec!["echo".to_string(), "ls".to_string()];
        assert!(validate_command("echo", &allowlist).is_ok());
        assert!(validate_command("rm", &allowlist).is_err());
        assert!(validate_command("/bin/echo", &allowlist).is_err());
        assert!(validate_command("echo", &[]).is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("user_id").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("Point3D").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("3d").is_err());
        assert!(validate_identifier("drop table").is_err());
    }
}
