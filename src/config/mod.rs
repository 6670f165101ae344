//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables prefixed with `JELLYFISH_` using `__` between
//! nested keys (e.g. `JELLYFISH_TOOLS__HTTP__TIMEOUT_SECS=10`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! name = "jellyfish-mcp"
//! host = "127.0.0.1"
//! port = 3000
//!
//! [tools]
//! disabled = ["execute_command"]
//!
//! [tools.files]
//! root = "."
//! allow_write = false
//! max_read_bytes = 1048576
//!
//! [tools.http]
//! timeout_secs = 30
//! max_response_bytes = 1048576
//! allow_private_hosts = false
//!
//! [tools.command]
//! allowlist = ["ls", "git"]
//! timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "jellyfish-mcp.toml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "JELLYFISH";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// MCP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MCP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name advertised to MCP clients
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Host to bind in HTTP mode
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind in HTTP mode
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_server_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Built-in tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Tool names that are not registered
    #[serde(default)]
    pub disabled: Vec<String>,

    #[serde(default)]
    pub files: FileToolsConfig,

    #[serde(default)]
    pub http: HttpToolsConfig,

    #[serde(default)]
    pub command: CommandToolsConfig,
}

/// File tool sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileToolsConfig {
    /// Directory all file tools are confined to
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Whether `write_file` may modify anything
    #[serde(default)]
    pub allow_write: bool,

    /// Upper bound on bytes returned by `read_file`
    #[serde(default = "default_max_bytes")]
    pub max_read_bytes: usize,
}

impl Default for FileToolsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            allow_write: false,
            max_read_bytes: default_max_bytes(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_bytes() -> usize {
    1024 * 1024
}

/// HTTP tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpToolsConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Response bodies are cut at this many bytes
    #[serde(default = "default_max_bytes")]
    pub max_response_bytes: usize,

    /// Allow requests to loopback and private network addresses
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for HttpToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_response_bytes: default_max_bytes(),
            allow_private_hosts: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// `execute_command` settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandToolsConfig {
    /// Program names that may be executed; empty disables the tool
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Kill the process after this many seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CommandToolsConfig {
    fn default() -> Self {
        Self {
            allowlist: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Load configuration from an optional file plus `JELLYFISH_*` environment variables
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("tools.disabled")
                .with_list_parse_key("tools.command.allowlist"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Find a config file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
        .filter(|path| path.is_file())
}

/// Default location for `init-config`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}
