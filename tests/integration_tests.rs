//! Integration tests for Jellyfish MCP
//!
//! These tests drive the built-in registry the same way the MCP server does:
//! by tool name with raw JSON arguments.

use jellyfish_mcp::config::{FileToolsConfig, ServerConfig, ToolsConfig};
use jellyfish_mcp::mcp::{handler_fn, McpServer, ToolDefinition, ToolRegistry};
use jellyfish_mcp::models::{ErrorKind, InvocationRequest, InvocationResult, ParamSpec, ParamType};
use jellyfish_mcp::tools::builtin_registry;
use jellyfish_mcp::ToolError;
use serde_json::{json, Value};

fn registry() -> ToolRegistry {
    builtin_registry(&ToolsConfig::default()).expect("built-in registry")
}

/// Test that the server can be created from the built-in registry
#[tokio::test]
async fn test_server_initialization() {
    let server = McpServer::new(&ServerConfig::default(), registry());
    assert!(server.is_ok());
}

/// Test that unknown names are rejected no matter what arguments come along
#[tokio::test]
async fn test_unregistered_names_are_not_found() {
    let registry = registry();
    let argument_shapes = [
        Value::Null,
        json!({}),
        json!({"text": "hello"}),
        json!([1, 2, 3]),
        json!("not an object"),
    ];

    for name in ["", "reverse", "REVERSE_TEXT", "reverse_text ", "no_such_tool"] {
        for args in &argument_shapes {
            let err = registry.invoke(name, args.clone()).await.unwrap_err();
            assert_eq!(
                err.kind(),
                ErrorKind::NotFound,
                "{:?} with {} should be not found",
                name,
                args
            );
        }
    }
}

fn sample_value(param_type: ParamType) -> Value {
    match param_type {
        ParamType::String => json!("x"),
        ParamType::Integer => json!(1),
        ParamType::Number => json!(1.5),
        ParamType::Boolean => json!(true),
        ParamType::Array => json!([]),
        ParamType::Object => json!({}),
    }
}

/// A value no coercion rule accepts for `param_type`
fn wrong_value(param_type: ParamType) -> Value {
    match param_type {
        ParamType::String => json!(42),
        ParamType::Integer | ParamType::Number => json!("not a number"),
        ParamType::Boolean => json!("maybe"),
        ParamType::Array | ParamType::Object => json!("x"),
    }
}

/// Test that every tool rejects a missing or wrongly-typed required argument
#[tokio::test]
async fn test_required_arguments_validated_for_every_tool() {
    let registry = registry();
    let mut checked = 0;

    for tool in registry.list_definitions() {
        if !tool.parameters.iter().any(|p| p.required) {
            continue;
        }
        checked += 1;

        let err = registry.invoke(&tool.name, json!({})).await.unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::InvalidArgument,
            "{} should reject missing arguments, got {}",
            tool.name,
            err
        );

        for target in tool.parameters.iter().filter(|p| p.required) {
            let mut args = serde_json::Map::new();
            for param in tool.parameters.iter().filter(|p| p.required) {
                let value = if param.name == target.name {
                    wrong_value(param.param_type)
                } else {
                    sample_value(param.param_type)
                };
                args.insert(param.name.clone(), value);
            }

            let err = registry
                .invoke(&tool.name, Value::Object(args))
                .await
                .unwrap_err();
            match err {
                ToolError::InvalidArgument { param, .. } => assert_eq!(
                    param, target.name,
                    "{} blamed the wrong parameter",
                    tool.name
                ),
                other => panic!("{}.{} should be invalid, got {}", tool.name, target.name, other),
            }
        }
    }

    assert!(checked > 10, "only {} tools declare required params", checked);
}

/// Test that a wrongly-typed required argument is rejected before the handler runs
#[tokio::test]
async fn test_malformed_required_argument() {
    let registry = registry();

    let err = registry
        .invoke("reverse_text", json!({"text": 42}))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ToolError::invalid_argument("text", "expected string, got integer")
    );

    let err = registry
        .invoke("join_text", json!({"parts": "a,b"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_reverse_text() {
    let registry = registry();

    let reversed = registry
        .invoke("reverse_text", json!({"text": "hello"}))
        .await
        .unwrap();
    assert_eq!(reversed, "olleh");

    let empty = registry
        .invoke("reverse_text", json!({"text": ""}))
        .await
        .unwrap();
    assert_eq!(empty, "");

    let twice = registry
        .invoke("reverse_text", json!({"text": reversed}))
        .await
        .unwrap();
    assert_eq!(twice, "hello");
}

#[tokio::test]
async fn test_word_count() {
    let counts = registry()
        .invoke("word_count", json!({"text": "the quick brown fox"}))
        .await
        .unwrap();
    assert_eq!(counts["word_count"], 4);
    assert_eq!(counts["character_count"], 19);
}

#[tokio::test]
async fn test_uppercase_is_idempotent() {
    let registry = registry();

    let once = registry
        .invoke("uppercase", json!({"text": "AbC1"}))
        .await
        .unwrap();
    assert_eq!(once, "ABC1");

    let twice = registry
        .invoke("uppercase", json!({"text": once}))
        .await
        .unwrap();
    assert_eq!(twice, once);
}

#[tokio::test]
async fn test_split_join_round_trip() {
    let registry = registry();

    let parts = registry
        .invoke("split_text", json!({"text": "a,b,,c", "delimiter": ","}))
        .await
        .unwrap();
    assert_eq!(parts, json!(["a", "b", "", "c"]));

    let joined = registry
        .invoke("join_text", json!({"parts": parts, "delimiter": ","}))
        .await
        .unwrap();
    assert_eq!(joined, "a,b,,c");
}

#[tokio::test]
async fn test_calculate_through_registry() {
    let registry = registry();

    let value = registry
        .invoke("calculate", json!({"expression": "2 * (3 + 4)"}))
        .await
        .unwrap();
    assert_eq!(value["result"], 14.0);

    let err = registry
        .invoke("calculate", json!({"expression": "__import__('os')"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerError);
}

/// Test that failing and panicking handlers are contained and the registry keeps serving
#[tokio::test]
async fn test_handler_failures_are_contained() {
    let mut registry = registry();
    registry
        .register(
            ToolDefinition::new(
                "open_missing_file",
                "Always fails like a missing file",
                handler_fn(|_| {
                    let content = std::fs::read_to_string("/definitely/not/here.txt")?;
                    Ok(Value::from(content))
                }),
            )
            .param(ParamSpec::optional("path", ParamType::String)),
        )
        .unwrap();
    registry
        .register(ToolDefinition::new(
            "explode",
            "Always panics",
            handler_fn(|_| -> anyhow::Result<Value> { panic!("boom") }),
        ))
        .unwrap();

    for name in ["open_missing_file", "explode"] {
        let result = registry
            .dispatch(InvocationRequest::new(name, json!({})))
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::HandlerError), "{}", name);
    }

    // Still responsive after both failures
    let result = registry
        .dispatch(InvocationRequest::new("reverse_text", json!({"text": "ok"})))
        .await;
    assert_eq!(result, InvocationResult::Success { value: json!("ko") });
}

#[tokio::test]
async fn test_dispatch_serialization() {
    let request: InvocationRequest =
        serde_json::from_str(r#"{"tool": "echo", "arguments": {"text": "hi"}}"#).unwrap();
    let result = registry().dispatch(request).await;

    let wire = serde_json::to_value(&result).unwrap();
    assert_eq!(wire["status"], "error");
    assert_eq!(wire["error"]["kind"], "not_found");
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let mut registry = registry();
    let before = registry.len();

    let err = registry
        .register(ToolDefinition::new(
            "reverse_text",
            "Shadow",
            handler_fn(|_| Ok(Value::Null)),
        ))
        .unwrap_err();
    assert_eq!(err, ToolError::DuplicateName("reverse_text".to_string()));
    assert_eq!(registry.len(), before);

    let value = registry
        .invoke("reverse_text", json!({"text": "ab"}))
        .await
        .unwrap();
    assert_eq!(value, "ba");
}

#[tokio::test]
async fn test_disabled_tools_are_not_found() {
    let config = ToolsConfig {
        disabled: vec!["execute_command".to_string()],
        ..ToolsConfig::default()
    };
    let registry = builtin_registry(&config).unwrap();

    let err = registry
        .invoke("execute_command", json!({"command": "ls"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_file_tools_stay_inside_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "jellyfish").unwrap();

    let config = ToolsConfig {
        files: FileToolsConfig {
            root: dir.path().to_path_buf(),
            ..FileToolsConfig::default()
        },
        ..ToolsConfig::default()
    };
    let registry = builtin_registry(&config).unwrap();

    let value = registry
        .invoke("read_file", json!({"path": "notes.txt"}))
        .await
        .unwrap();
    assert_eq!(value["content"], "jellyfish");

    let err = registry
        .invoke("read_file", json!({"path": "../../etc/passwd"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerError);

    // Writes are disabled unless configured
    let err = registry
        .invoke("write_file", json!({"path": "new.txt", "content": "x"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerError);
    assert!(!dir.path().join("new.txt").exists());
}

#[tokio::test]
async fn test_execute_command_requires_allowlist() {
    let err = registry()
        .invoke("execute_command", json!({"command": "ls"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerError);
}
