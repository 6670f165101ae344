//! Utility modules shared by the built-in tools.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and a user agent
//! - [`read_body_limited`]: read a response body up to a byte cap
//! - [`validate_url`]: http/https only, private hosts refused by default
//! - [`resolve_in_root`]: confine a path to a sandbox directory
//! - [`validate_command`]: allowlist check for `execute_command`
//! - [`validate_identifier`]: identifier check for generated code
//!
//! # Sandboxed paths
//!
//! ```rust,no_run
//! use jellyfish_mcp::utils::resolve_in_root;
//! use std::path::Path;
//!
//! let root = Path::new("/srv/workspace");
//! assert!(resolve_in_root(root, "notes/today.md").is_ok());
//! assert!(resolve_in_root(root, "../etc/passwd").is_err());
//! ```

mod http;
mod validate;

pub use http::{read_body_limited, HttpClient};
pub use validate::{
    resolve_in_root, validate_command, validate_identifier, validate_url, ValidationError,
};
