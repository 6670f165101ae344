//! Code template generation for Rust, Python and TypeScript.

use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

use crate::mcp::{handler_fn, ToolDefinition};
use crate::models::{ParamSpec, ParamType};
use crate::utils::validate_identifier;

/// Target language of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Python,
    TypeScript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::TypeScript => "typescript",
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rust" | "rs" => Ok(Language::Rust),
            "python" | "py" => Ok(Language::Python),
            "typescript" | "ts" => Ok(Language::TypeScript),
            other => Err(anyhow!(
                "unsupported language '{}' (use rust, python or typescript)",
                other
            )),
        }
    }
}

/// One `name:type` entry from a field or parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct TypedName {
    pub name: String,
    pub ty: Option<String>,
}

/// Parse `"id: u64, name: String"`; types are optional
pub fn parse_typed_names(spec: &str) -> Result<Vec<TypedName>> {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, ty) = match entry.split_once(':') {
                Some((name, ty)) => (name.trim(), Some(ty.trim())),
                None => (entry, None),
            };
            validate_identifier(name)?;
            if ty.is_some_and(|t| t.is_empty() || t.contains(['\n', ';', '{', '}'])) {
                bail!("invalid type for '{}'", name);
            }
            Ok(TypedName {
                name: name.to_string(),
                ty: ty.map(str::to_string),
            })
        })
        .collect()
}

fn language_param() -> ParamSpec {
    ParamSpec::optional("language", ParamType::String)
        .with_default("rust")
        .describe("rust, python or typescript")
}

fn template(language: Language, code: String) -> Value {
    json!({ "language": language.as_str(), "code": code })
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "generate_struct",
            "Generate a data type (Rust struct, Python dataclass or TypeScript interface)",
            handler_fn(|args| {
                let language: Language = args.str("language")?.parse()?;
                let fields = parse_typed_names(args.str("fields")?)?;
                let code = generate_struct(language, args.str("name")?, &fields)?;
                Ok(template(language, code))
            }),
        )
        .param(ParamSpec::required("name", ParamType::String).describe("Type name"))
        .param(
            ParamSpec::optional("fields", ParamType::String)
                .with_default("")
                .describe("Comma-separated 'name:type' pairs"),
        )
        .param(language_param()),
        ToolDefinition::new(
            "generate_function",
            "Generate a function stub",
            handler_fn(|args| {
                let language: Language = args.str("language")?.parse()?;
                let params = parse_typed_names(args.str("params")?)?;
                let code = generate_function(
                    language,
                    args.str("name")?,
                    &params,
                    args.opt_str("returns"),
                )?;
                Ok(template(language, code))
            }),
        )
        .param(ParamSpec::required("name", ParamType::String).describe("Function name"))
        .param(
            ParamSpec::optional("params", ParamType::String)
                .with_default("")
                .describe("Comma-separated 'name:type' pairs"),
        )
        .param(ParamSpec::optional("returns", ParamType::String).describe("Return type"))
        .param(language_param()),
        ToolDefinition::new(
            "generate_test",
            "Generate a unit test skeleton",
            handler_fn(|args| {
                let language: Language = args.str("language")?.parse()?;
                let code = generate_test(language, args.str("name")?)?;
                Ok(template(language, code))
            }),
        )
        .param(ParamSpec::required("name", ParamType::String).describe("Test name"))
        .param(language_param()),
    ]
}

pub fn generate_struct(language: Language, name: &str, fields: &[TypedName]) -> Result<String> {
    validate_identifier(name)?;
    let mut code = String::new();

    match language {
        Language::Rust => {
            writeln!(code, "#[derive(Debug, Clone, PartialEq)]")?;
            writeln!(code, "pub struct {} {{", name)?;
            for field in fields {
                let ty = field
                    .ty
                    .as_deref()
                    .ok_or_else(|| anyhow!("field '{}' needs a type for rust", field.name))?;
                writeln!(code, "    pub {}: {},", field.name, ty)?;
            }
            writeln!(code, "}}")?;
        }
        Language::Python => {
            writeln!(code, "from dataclasses import dataclass")?;
            writeln!(code)?;
            writeln!(code)?;
            writeln!(code, "@dataclass")?;
            writeln!(code, "class {}:", name)?;
            if fields.is_empty() {
                writeln!(code, "    pass")?;
            }
            for field in fields {
                match &field.ty {
                    Some(ty) => writeln!(code, "    {}: {}", field.name, ty)?,
                    None => writeln!(code, "    {}: object", field.name)?,
                }
            }
        }
        Language::TypeScript => {
            writeln!(code, "export interface {} {{", name)?;
            for field in fields {
                let ty = field.ty.as_deref().unwrap_or("unknown");
                writeln!(code, "  {}: {};", field.name, ty)?;
            }
            writeln!(code, "}}")?;
        }
    }

    Ok(code)
}

pub fn generate_function(
    language: Language,
    name: &str,
    params: &[TypedName],
    returns: Option<&str>,
) -> Result<String> {
    validate_identifier(name)?;
    let mut code = String::new();

    match language {
        Language::Rust => {
            let params = params
                .iter()
                .map(|p| {
                    p.ty.as_deref()
                        .map(|ty| format!("{}: {}", p.name, ty))
                        .ok_or_else(|| anyhow!("parameter '{}' needs a type for rust", p.name))
                })
                .collect::<Result<Vec<_>>>()?;
            let ret = returns.map(|r| format!(" -> {}", r)).unwrap_or_default();
            writeln!(code, "pub fn {}({}){} {{", name, params.join(", "), ret)?;
            writeln!(code, "    todo!()")?;
            writeln!(code, "}}")?;
        }
        Language::Python => {
            let params: Vec<String> = params
                .iter()
                .map(|p| match &p.ty {
                    Some(ty) => format!("{}: {}", p.name, ty),
                    None => p.name.clone(),
                })
                .collect();
            let ret = returns.map(|r| format!(" -> {}", r)).unwrap_or_default();
            writeln!(code, "def {}({}){}:", name, params.join(", "), ret)?;
            writeln!(code, "    raise NotImplementedError")?;
        }
        Language::TypeScript => {
            let params: Vec<String> = params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty.as_deref().unwrap_or("unknown")))
                .collect();
            let ret = returns.unwrap_or("void");
            writeln!(code, "export function {}({}): {} {{", name, params.join(", "), ret)?;
            writeln!(code, "  throw new Error(\"not implemented\");")?;
            writeln!(code, "}}")?;
        }
    }

    Ok(code)
}

pub fn generate_test(language: Language, name: &str) -> Result<String> {
    validate_identifier(name)?;
    let mut code = String::new();

    match language {
        Language::Rust => {
            writeln!(code, "#[cfg(test)]")?;
            writeln!(code, "mod tests {{")?;
            writeln!(code, "    use super::*;")?;
            writeln!(code)?;
            writeln!(code, "    #[test]")?;
            writeln!(code, "    fn {}() {{", name)?;
            writeln!(code, "        todo!()")?;
            writeln!(code, "    }}")?;
            writeln!(code, "}}")?;
        }
        Language::Python => {
            let name = name.strip_prefix("test_").unwrap_or(name);
            writeln!(code, "def test_{}():", name)?;
            writeln!(code, "    raise NotImplementedError")?;
        }
        Language::TypeScript => {
            writeln!(code, "describe(\"{}\", () => {{", name)?;
            writeln!(code, "  it(\"works\", () => {{")?;
            writeln!(code, "    throw new Error(\"not implemented\");")?;
            writeln!(code, "  }});")?;
            writeln!(code, "}});")?;
        }
    }

    Ok(code)
}
