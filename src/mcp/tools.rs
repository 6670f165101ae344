//! Tool registry and dispatcher for MCP tools.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{
    json_type_name, InvocationRequest, InvocationResult, ParamSpec, ToolArgs, ToolError,
};

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + fmt::Debug {
    /// Execute the tool with arguments that already passed validation
    async fn execute(&self, args: ToolArgs) -> anyhow::Result<Value>;
}

/// Adapter that turns a synchronous closure into a [`ToolHandler`]
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(&ToolArgs) -> anyhow::Result<Value> + Send + Sync,
{
    async fn execute(&self, args: ToolArgs) -> anyhow::Result<Value> {
        (self.f)(&args)
    }
}

/// Wrap a closure as a shared tool handler
pub fn handler_fn<F>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(&ToolArgs) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnHandler { f })
}

/// An MCP tool that can be called by the client
#[derive(Clone, Serialize)]
pub struct ToolDefinition {
    /// Tool name (e.g., "reverse_text")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Declared input parameters, in order
    pub parameters: Vec<ParamSpec>,

    /// Handler function to execute the tool
    #[serde(skip)]
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler,
        }
    }

    /// Append a parameter spec
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// JSON Schema for input parameters
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.to_schema()))
            .collect();
        let required: Vec<Value> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| Value::from(p.name.clone()))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check supplied arguments against the parameter specs.
    ///
    /// `null` counts as absent. Defaults fill absent optional parameters and
    /// unknown arguments are dropped.
    pub fn validate(&self, arguments: Value) -> Result<ToolArgs, ToolError> {
        let mut supplied = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::invalid_argument(
                    "arguments",
                    format!("expected an object, got {}", json_type_name(&other)),
                ))
            }
        };

        let mut validated = Map::new();
        for spec in &self.parameters {
            match supplied.remove(&spec.name) {
                None | Some(Value::Null) => {
                    if let Some(default) = &spec.default {
                        validated.insert(spec.name.clone(), default.clone());
                    } else if spec.required {
                        return Err(ToolError::invalid_argument(
                            &spec.name,
                            "missing required argument",
                        ));
                    }
                }
                Some(value) => {
                    let coerced = spec.param_type.coerce(&value).ok_or_else(|| {
                        ToolError::invalid_argument(
                            &spec.name,
                            format!("expected {}, got {}", spec.param_type, json_type_name(&value)),
                        )
                    })?;
                    validated.insert(spec.name.clone(), coerced);
                }
            }
        }

        if !supplied.is_empty() {
            tracing::debug!(
                tool = %self.name,
                ignored = ?supplied.keys().collect::<Vec<_>>(),
                "Ignoring undeclared arguments"
            );
        }

        Ok(ToolArgs::new(validated))
    }
}

/// Registry for all MCP tools
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting duplicate names
    pub fn register(&mut self, tool: ToolDefinition) -> Result<(), ToolError> {
        if self.index.contains_key(&tool.name) {
            return Err(ToolError::DuplicateName(tool.name));
        }
        tracing::trace!(tool = %tool.name, "Registered tool");
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool definitions in registration order.
    ///
    /// Each call starts a fresh pass over the registry.
    pub fn list_definitions(&self) -> impl Iterator<Item = &ToolDefinition> + Clone + '_ {
        self.tools.iter()
    }

    /// Execute a tool by name.
    ///
    /// Handler errors and panics come back as [`ToolError::Handler`].
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let args = tool.validate(arguments)?;

        tracing::debug!(tool = name, "Invoking tool");

        match AssertUnwindSafe(tool.handler.execute(args))
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(tool = name, "Tool failed: {:#}", e);
                Err(ToolError::Handler {
                    tool: name.to_string(),
                    message: format!("{:#}", e),
                })
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(tool = name, "Tool panicked: {}", message);
                Err(ToolError::Handler {
                    tool: name.to_string(),
                    message: format!("handler panicked: {}", message),
                })
            }
        }
    }

    /// Execute a request and fold the outcome into an [`InvocationResult`]
    pub async fn dispatch(&self, request: InvocationRequest) -> InvocationResult {
        self.invoke(&request.tool, request.arguments).await.into()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
