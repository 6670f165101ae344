//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! Every tool in the [`ToolRegistry`] is exposed through pmcp, which handles
//! JSON-RPC over stdio and streamable HTTP. Calls are routed back through
//! [`ToolRegistry::invoke`] so argument validation and error wrapping apply
//! to every transport.

use crate::config::ServerConfig;
use crate::mcp::tools::ToolRegistry;
use crate::models::ToolError;
use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::StreamableHttpServer, Error, RequestHandlerExtra, Server,
    ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// The MCP server exposing the tool registry
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
    tools: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new MCP server over the given registry
    pub fn new(config: &ServerConfig, tools: ToolRegistry) -> Result<Self, pmcp::Error> {
        let tools = Arc::new(tools);
        let server = Self::build_server_impl(config, &tools)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
            tools,
        })
    }

    /// Get the tool registry
    pub fn tools(&self) -> Arc<ToolRegistry> {
        self.tools.clone()
    }

    /// Build the MCP server with tool handlers (internal implementation)
    fn build_server_impl(
        config: &ServerConfig,
        tools: &Arc<ToolRegistry>,
    ) -> Result<Server, pmcp::Error> {
        let mut builder = Server::builder()
            .name(config.name.clone())
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.list_definitions() {
            let tool_handler = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema(),
                registry: tools.clone(),
            };
            builder = builder.tool(tool_handler.name.clone(), tool_handler);
        }

        builder.build()
    }

    /// Run the server in stdio mode (for Claude Desktop and other MCP clients)
    pub async fn run(self) -> Result<(), pmcp::Error> {
        tracing::info!("Starting MCP server in stdio mode");

        // run_stdio() takes ownership of the Server
        let server = Arc::try_unwrap(self.server)
            .map_err(|_| Error::internal("Cannot unwrap Arc - multiple references exist"))?
            .into_inner();

        tracing::info!(tools = self.tools.len(), "MCP server initialized");

        server.run_stdio().await
    }

    /// Run the server in streamable HTTP mode
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        tracing::info!("Starting MCP server in HTTP mode on {}", addr);

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))?;

        let http_server = StreamableHttpServer::new(socket_addr, self.server.clone());

        http_server.start().await
    }
}

/// Map a registry error onto the protocol error the client sees
pub fn to_protocol_error(err: ToolError) -> Error {
    let message = format!("[{}] {}", err.kind().as_str(), err);
    match err {
        ToolError::NotFound(_) | ToolError::InvalidArgument { .. } => {
            Error::invalid_params(message)
        }
        ToolError::Handler { .. } | ToolError::DuplicateName(_) => Error::internal(&message),
    }
}

/// Wrapper for adapting a registry entry to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    registry: Arc<ToolRegistry>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        self.registry
            .invoke(&self.name, args)
            .await
            .map_err(to_protocol_error)
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_carries_kind() {
        let err = to_protocol_error(ToolError::NotFound("nope".into()));
        assert!(err.to_string().contains("[not_found]"));
    }

    #[test]
    fn test_server_builds_from_registry() {
        let registry =
            crate::tools::builtin_registry(&crate::config::ToolsConfig::default()).unwrap();
        let count = registry.len();
        let server = McpServer::new(&ServerConfig::default(), registry).unwrap();
        assert_eq!(server.tools().len(), count);
    }
}
