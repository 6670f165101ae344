use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use jellyfish_mcp::config::{default_config_path, find_config_file, load_config, Config, LogFormat};
use jellyfish_mcp::mcp::McpServer;
use jellyfish_mcp::models::InvocationRequest;
use jellyfish_mcp::tools::builtin_registry;
use jellyfish_mcp::ToolRegistry;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Jellyfish MCP - text, file, HTTP, system and code-template tools for AI agents
#[derive(Parser, Debug)]
#[command(name = "jellyfish-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing text, file, HTTP, system and code-template tools", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error log output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (stdio by default)
    Serve {
        /// Serve streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode (default: from config)
        #[arg(long, short)]
        port: Option<u16>,

        /// Host to bind to for HTTP mode (default: from config)
        #[arg(long)]
        host: Option<String>,
    },

    /// List registered tools
    #[command(alias = "ls")]
    List,

    /// Invoke one tool locally and print the result
    Call {
        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(long, short, default_value = "{}")]
        args: String,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Destination (default: user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("Jellyfish MCP - Environment Variables");
    println!();
    println!("Any config key can be overridden with JELLYFISH_<SECTION>__<KEY>:");
    println!("  JELLYFISH_SERVER__NAME                     Server name advertised to clients");
    println!("  JELLYFISH_SERVER__HOST                     Host for HTTP mode (default: 127.0.0.1)");
    println!("  JELLYFISH_SERVER__PORT                     Port for HTTP mode (default: 3000)");
    println!("  JELLYFISH_TOOLS__DISABLED                  Comma-separated tools to leave out");
    println!("  JELLYFISH_TOOLS__FILES__ROOT               Sandbox root for file tools (default: .)");
    println!("  JELLYFISH_TOOLS__FILES__ALLOW_WRITE        Enable write_file (default: false)");
    println!("  JELLYFISH_TOOLS__FILES__MAX_READ_BYTES     read_file cap (default: 1048576)");
    println!("  JELLYFISH_TOOLS__HTTP__TIMEOUT_SECS        HTTP timeout (default: 30)");
    println!("  JELLYFISH_TOOLS__HTTP__MAX_RESPONSE_BYTES  Response body cap (default: 1048576)");
    println!("  JELLYFISH_TOOLS__HTTP__ALLOW_PRIVATE_HOSTS Allow loopback/private URLs (default: false)");
    println!("  JELLYFISH_TOOLS__COMMAND__ALLOWLIST        Comma-separated programs for execute_command");
    println!("  JELLYFISH_TOOLS__COMMAND__TIMEOUT_SECS     Command timeout (default: 30)");
    println!("  JELLYFISH_LOGGING__LEVEL                   Log level (default: info)");
    println!("  JELLYFISH_LOGGING__FORMAT                  text or json (default: text)");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging filter (overrides the level above)");
    std::process::exit(0);
}

/// Initialize tracing on stderr so stdout stays free for the stdio transport
fn init_tracing(level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("jellyfish_mcp={}", level)),
    );
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
    }

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref())
        .with_context(|| match &config_path {
            Some(path) => format!("cannot load config from {}", path.display()),
            None => "cannot load config from environment".to_string(),
        })?;

    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };
    init_tracing(&log_level, config.logging.format);

    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        Some(Commands::Serve { http, port, host }) => {
            let registry = builtin_registry(&config.tools)?;
            let server = McpServer::new(&config.server, registry)?;

            if http {
                let addr = format!(
                    "{}:{}",
                    host.unwrap_or_else(|| config.server.host.clone()),
                    port.unwrap_or(config.server.port)
                );
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                tokio::select! {
                    result = handle => {
                        result.map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received Ctrl-C, shutting down");
                    }
                }
            } else {
                server.run().await?;
            }
        }

        Some(Commands::List) => {
            let registry = builtin_registry(&config.tools)?;
            print_tools(&registry, cli.output.resolve())?;
        }

        Some(Commands::Call { tool, args }) => {
            let arguments: serde_json::Value =
                serde_json::from_str(&args).context("--args must be valid JSON")?;
            let registry = builtin_registry(&config.tools)?;

            let result = registry
                .dispatch(InvocationRequest::new(tool, arguments))
                .await;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if !result.is_success() {
                std::process::exit(1);
            }
        }

        Some(Commands::InitConfig { path, force }) => {
            let path = path.unwrap_or_else(default_config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }

        Some(Commands::Completions { shell }) => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        }

        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

fn print_tools(registry: &ToolRegistry, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            let tools: Vec<_> = registry.list_definitions().collect();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        OutputFormat::Plain => {
            for tool in registry.list_definitions() {
                println!("{} - {}", tool.name, tool.description);
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Tool", "Parameters", "Description"]);

            for tool in registry.list_definitions() {
                let params = tool
                    .parameters
                    .iter()
                    .map(|p| {
                        if p.required {
                            format!("{}: {}", p.name, p.param_type)
                        } else {
                            format!("[{}: {}]", p.name, p.param_type)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");

                table.add_row(vec![
                    Cell::new(&tool.name).add_attribute(Attribute::Bold),
                    Cell::new(params),
                    Cell::new(&tool.description),
                ]);
            }
            println!("{table}");
            println!("{} tools", registry.len());
        }
    }
    Ok(())
}
