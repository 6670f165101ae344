//! Core data models for tool schemas and invocations.

mod invocation;
mod param;

pub use invocation::{ErrorDescriptor, ErrorKind, InvocationRequest, InvocationResult, ToolError};
pub use param::{json_type_name, ParamSpec, ParamType, ToolArgs};
