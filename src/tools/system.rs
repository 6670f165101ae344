//! System information, clock and allowlisted command execution.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::{CommandToolsConfig, FileToolsConfig};
use crate::mcp::{handler_fn, ToolDefinition, ToolHandler};
use crate::models::{ParamSpec, ParamType, ToolArgs};
use crate::utils::validate_command;

/// Cap on captured stdout / stderr per stream
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

pub fn definitions(command: &CommandToolsConfig, files: &FileToolsConfig) -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "system_info",
            "Report operating system, architecture, CPU count and host name",
            handler_fn(|_| Ok(system_info())),
        ),
        ToolDefinition::new(
            "current_time",
            "Current date and time, optionally formatted with a strftime pattern",
            handler_fn(|args| current_time(args.opt_str("format"), args.bool("utc")?)),
        )
        .param(
            ParamSpec::optional("format", ParamType::String)
                .describe("strftime pattern, e.g. '%Y-%m-%d %H:%M'"),
        )
        .param(
            ParamSpec::optional("utc", ParamType::Boolean)
                .with_default(false)
                .describe("Use UTC instead of local time"),
        ),
        ToolDefinition::new(
            "execute_command",
            "Run an allowlisted program directly (no shell) inside the workspace root",
            Arc::new(ExecuteCommandHandler {
                allowlist: command.allowlist.clone(),
                timeout: Duration::from_secs(command.timeout_secs),
                working_dir: files.root.clone(),
            }),
        )
        .param(
            ParamSpec::required("command", ParamType::String)
                .describe("Program name; must be on the server allowlist"),
        )
        .param(
            ParamSpec::optional("args", ParamType::Array)
                .with_default(json!([]))
                .describe("Arguments passed verbatim"),
        ),
    ]
}

pub fn system_info() -> Value {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .ok();

    json!({
        "os": std::env::consts::OS,
        "family": std::env::consts::FAMILY,
        "arch": std::env::consts::ARCH,
        "cpu_count": cpus,
        "hostname": hostname(),
        "server_version": crate::VERSION,
    })
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

pub fn current_time(format: Option<&str>, utc: bool) -> Result<Value> {
    if utc {
        describe_time(Utc::now(), format, "UTC")
    } else {
        describe_time(Local::now(), format, "local")
    }
}

fn describe_time<Tz>(now: DateTime<Tz>, format: Option<&str>, zone: &str) -> Result<Value>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let formatted = match format {
        Some(pattern) => Some(format_time(&now, pattern)?),
        None => None,
    };

    Ok(json!({
        "iso8601": now.to_rfc3339(),
        "unix_timestamp": now.timestamp(),
        "timezone": zone,
        "formatted": formatted,
    }))
}

/// Format with a strftime pattern, rejecting invalid specifiers up front
fn format_time<Tz>(time: &DateTime<Tz>, pattern: &str) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        bail!("invalid format pattern '{}'", pattern);
    }

    let mut out = String::new();
    write!(out, "{}", time.format_with_items(items.into_iter()))
        .map_err(|_| anyhow!("cannot format time with pattern '{}'", pattern))?;
    Ok(out)
}

/// Handler for running allowlisted programs
#[derive(Debug)]
pub struct ExecuteCommandHandler {
    pub allowlist: Vec<String>,
    pub timeout: Duration,
    pub working_dir: PathBuf,
}

#[async_trait::async_trait]
impl ToolHandler for ExecuteCommandHandler {
    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        if self.allowlist.is_empty() {
            bail!("command execution is disabled (tools.command.allowlist is empty)");
        }

        let command = args.str("command")?.trim();
        validate_command(command, &self.allowlist)?;
        let argv = args.string_list("args")?;

        tracing::info!(command, args = ?argv, "Executing command");

        let mut child = tokio::process::Command::new(command)
            .args(&argv)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start '{}'", command))?;

        let stdout = child.stdout.take().context("child stdout was not captured")?;
        let stderr = child.stderr.take().context("child stderr was not captured")?;

        // The child is killed on drop, so a timeout also stops it
        let run = async {
            tokio::try_join!(read_capped(stdout), read_capped(stderr), child.wait())
        };
        let ((stdout, stdout_truncated), (stderr, stderr_truncated), status) =
            tokio::time::timeout(self.timeout, run)
                .await
                .map_err(|_| anyhow!("'{}' timed out after {:?}", command, self.timeout))?
                .with_context(|| format!("failed to run '{}'", command))?;

        Ok(json!({
            "command": command,
            "args": argv,
            "exit_code": status.code(),
            "success": status.success(),
            "stdout": String::from_utf8_lossy(&stdout),
            "stderr": String::from_utf8_lossy(&stderr),
            "truncated": stdout_truncated || stderr_truncated,
        }))
    }
}

/// Keep the first `MAX_OUTPUT_BYTES` of a stream and discard the rest.
///
/// The remainder is still drained so the child never blocks on a full pipe.
async fn read_capped<R>(mut reader: R) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader)
        .take(MAX_OUTPUT_BYTES as u64 + 1)
        .read_to_end(&mut buf)
        .await?;

    if buf.len() <= MAX_OUTPUT_BYTES {
        return Ok((buf, false));
    }

    buf.truncate(MAX_OUTPUT_BYTES);
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((buf, true))
}
