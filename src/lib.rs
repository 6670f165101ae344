//! # Jellyfish MCP
//!
//! A Model Context Protocol (MCP) server exposing a catalogue of small,
//! independent tools (text transforms, arithmetic, sandboxed file access,
//! HTTP fetches, system information and code templates) to AI agents.
//!
//! ## Architecture
//!
//! - [`models`]: parameter specs, invocation requests/results and [`ToolError`]
//! - [`mcp`]: the [`ToolRegistry`] dispatcher and the pmcp server adapter
//! - [`tools`]: the built-in tool catalogue
//! - [`utils`]: HTTP client and input validation
//! - [`config`]: configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use jellyfish_mcp::config::ToolsConfig;
//! use jellyfish_mcp::tools::builtin_registry;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let registry = builtin_registry(&ToolsConfig::default())?;
//! let reversed = registry.invoke("reverse_text", json!({"text": "hello"})).await?;
//! assert_eq!(reversed, json!("olleh"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod utils;

// Re-export commonly used types
pub use mcp::{ToolDefinition, ToolRegistry};
pub use models::{InvocationRequest, InvocationResult, ToolError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
