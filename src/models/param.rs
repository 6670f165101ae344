//! Parameter schemas and validated tool arguments.

use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Primitive type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// JSON Schema name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Coerce a supplied value into this type.
    ///
    /// Returns `None` when the value cannot be represented. Integers accept
    /// whole floats and numeric strings, numbers accept numeric strings and
    /// booleans accept `"true"` / `"false"`. Strings, arrays and objects are
    /// never converted from other types.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match self {
            ParamType::String => value.as_str().map(|s| Value::String(s.to_string())),
            ParamType::Integer => match value {
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Some(Value::from(i))
                    } else {
                        n.as_f64()
                            .filter(|f| {
                                f.is_finite()
                                    && f.fract() == 0.0
                                    && *f >= i64::MIN as f64
                                    && *f < i64::MAX as f64
                            })
                            .map(|f| Value::from(f as i64))
                    }
                }
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                _ => None,
            },
            ParamType::Number => match value {
                Value::Number(_) => Some(value.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number),
                _ => None,
            },
            ParamType::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(Value::Bool(true)),
                    "false" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            ParamType::Array => value.is_array().then(|| value.clone()),
            ParamType::Object => value.is_object().then(|| value.clone()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the JSON type of a value, for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declared input parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,

    /// Expected primitive type
    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Whether the caller must supply the parameter
    pub required: bool,

    /// Value used when an optional parameter is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParamSpec {
    /// A parameter that must be supplied
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            default: None,
            description: String::new(),
        }
    }

    /// A parameter that may be omitted
    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    /// Set the default value; this also makes the parameter optional
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self.required = false;
        self
    }

    /// Set the description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// JSON Schema fragment for this parameter
    pub fn to_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::from(self.param_type.as_str()));
        if !self.description.is_empty() {
            schema.insert(
                "description".to_string(),
                Value::from(self.description.clone()),
            );
        }
        if let Some(default) = &self.default {
            schema.insert("default".to_string(), default.clone());
        }
        Value::Object(schema)
    }
}

/// Arguments that passed validation against a tool's parameter specs.
///
/// Required parameters are guaranteed present with their declared type, so
/// the typed getters only fail when a handler asks for something it never
/// declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        self.opt_str(name)
            .ok_or_else(|| anyhow!("missing string argument '{}'", name))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn opt_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.opt_bool(name)
            .ok_or_else(|| anyhow!("missing boolean argument '{}'", name))
    }

    pub fn opt_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn array(&self, name: &str) -> Result<&Vec<Value>> {
        self.opt_array(name)
            .ok_or_else(|| anyhow!("missing array argument '{}'", name))
    }

    pub fn opt_array(&self, name: &str) -> Option<&Vec<Value>> {
        self.get(name).and_then(Value::as_array)
    }

    pub fn opt_object(&self, name: &str) -> Option<&Map<String, Value>> {
        self.get(name).and_then(Value::as_object)
    }

    /// Array argument whose items must all be strings
    pub fn string_list(&self, name: &str) -> Result<Vec<String>> {
        match self.opt_array(name) {
            None => Ok(Vec::new()),
            Some(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        anyhow!(
                            "'{}' item {} must be a string, got {}",
                            name,
                            i,
                            json_type_name(item)
                        )
                    })
                })
                .collect(),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_coercion() {
        assert_eq!(ParamType::Integer.coerce(&json!(5)), Some(json!(5)));
        assert_eq!(ParamType::Integer.coerce(&json!(5.0)), Some(json!(5)));
        assert_eq!(ParamType::Integer.coerce(&json!("42")), Some(json!(42)));
        assert_eq!(ParamType::Integer.coerce(&json!(5.5)), None);
        assert_eq!(ParamType::Integer.coerce(&json!("abc")), None);
        assert_eq!(ParamType::Integer.coerce(&json!(true)), None);

        // i64::MAX rounds up to 2^63 as a float, which does not fit
        assert_eq!(ParamType::Integer.coerce(&json!(2f64.powi(63))), None);
        assert_eq!(
            ParamType::Integer.coerce(&json!(-(2f64.powi(63)))),
            Some(json!(i64::MIN))
        );
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(ParamType::Number.coerce(&json!(1.5)), Some(json!(1.5)));
        assert_eq!(ParamType::Number.coerce(&json!("2.25")), Some(json!(2.25)));
        assert_eq!(ParamType::Number.coerce(&json!("NaN")), None);
        assert_eq!(ParamType::Number.coerce(&json!([])), None);
    }

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(ParamType::Boolean.coerce(&json!(false)), Some(json!(false)));
        assert_eq!(ParamType::Boolean.coerce(&json!("TRUE")), Some(json!(true)));
        assert_eq!(ParamType::Boolean.coerce(&json!("yes")), None);
        assert_eq!(ParamType::Boolean.coerce(&json!(1)), None);
    }

    #[test]
    fn test_string_is_not_coerced() {
        assert_eq!(ParamType::String.coerce(&json!("hi")), Some(json!("hi")));
        assert_eq!(ParamType::String.coerce(&json!(12)), None);
        assert_eq!(ParamType::String.coerce(&Value::Null), None);
    }

    #[test]
    fn test_param_schema() {
        let spec = ParamSpec::optional("delimiter", ParamType::String)
            .with_default(",")
            .describe("Separator");
        assert!(!spec.required);
        assert_eq!(
            spec.to_schema(),
            json!({"type": "string", "description": "Separator", "default": ","})
        );
    }

    #[test]
    fn test_string_list() {
        let mut map = Map::new();
        map.insert("parts".to_string(), json!(["a", "b"]));
        map.insert("mixed".to_string(), json!(["a", 1]));
        let args = ToolArgs::new(map);

        assert_eq!(args.string_list("parts").unwrap(), vec!["a", "b"]);
        assert!(args.string_list("mixed").is_err());
        assert!(args.string_list("absent").unwrap().is_empty());
    }
}
