//! Built-in tool catalogue.
//!
//! Tools are grouped by category, and each category module exposes a
//! `definitions` function returning its [`ToolDefinition`]s:
//!
//! - [`text`]: echo, reverse, case changes, split/join, regex, hashing
//! - [`math`]: `calculate`, a sandboxed arithmetic evaluator
//! - [`file`]: read/write/list inside a configured root directory
//! - [`http`]: GET, arbitrary requests and HTML text extraction
//! - [`system`]: system info, clock and allowlisted command execution
//! - [`codegen`]: struct, function and test templates
//!
//! Tools named in `tools.disabled` are skipped.

pub mod codegen;
pub mod file;
pub mod http;
pub mod math;
pub mod system;
pub mod text;

use anyhow::{Context, Result};

use crate::config::ToolsConfig;
use crate::mcp::{ToolDefinition, ToolRegistry};

/// Every built-in tool, in registration order
pub fn all_definitions(config: &ToolsConfig) -> Result<Vec<ToolDefinition>> {
    let mut tools = text::definitions();
    tools.extend(math::definitions());
    tools.extend(file::definitions(&config.files));
    tools.extend(http::definitions(&config.http).context("failed to build HTTP client")?);
    tools.extend(system::definitions(&config.command, &config.files));
    tools.extend(codegen::definitions());
    Ok(tools)
}

/// Build the registry of built-in tools, minus the disabled ones
pub fn builtin_registry(config: &ToolsConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    let tools = all_definitions(config)?;

    for name in &config.disabled {
        if !tools.iter().any(|t| &t.name == name) {
            tracing::warn!(tool = %name, "Disabled tool does not exist");
        }
    }

    for tool in tools {
        if config.disabled.contains(&tool.name) {
            tracing::debug!(tool = %tool.name, "Skipping disabled tool");
            continue;
        }
        registry.register(tool)?;
    }

    tracing::info!("Registered {} tools", registry.len());
    Ok(registry)
}
