//! Text transformation tools.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde_json::{json, Value};
use sha2::{Digest, Sha256, Sha512};

use crate::mcp::{handler_fn, ToolDefinition};
use crate::models::{ParamSpec, ParamType};

/// Upper bound on matches reported by `regex_match`
const MAX_REGEX_MATCHES: usize = 1000;

fn text_param(description: &str) -> ParamSpec {
    ParamSpec::required("text", ParamType::String).describe(description)
}

fn delimiter_param() -> ParamSpec {
    ParamSpec::optional("delimiter", ParamType::String)
        .with_default(",")
        .describe("Separator between segments")
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "echo_tool",
            "Echo the input text",
            handler_fn(|args| Ok(Value::from(args.str("text")?))),
        )
        .param(text_param("Text to echo")),
        ToolDefinition::new(
            "reverse_text",
            "Reverse the input text",
            handler_fn(|args| Ok(Value::from(reverse_text(args.str("text")?)))),
        )
        .param(text_param("Text to reverse")),
        ToolDefinition::new(
            "word_count",
            "Count words and characters in the input text",
            handler_fn(|args| Ok(word_count(args.str("text")?))),
        )
        .param(text_param("Text to count")),
        ToolDefinition::new(
            "uppercase",
            "Convert text to uppercase",
            handler_fn(|args| Ok(Value::from(args.str("text")?.to_uppercase()))),
        )
        .param(text_param("Text to convert")),
        ToolDefinition::new(
            "lowercase",
            "Convert text to lowercase",
            handler_fn(|args| Ok(Value::from(args.str("text")?.to_lowercase()))),
        )
        .param(text_param("Text to convert")),
        ToolDefinition::new(
            "title_case",
            "Capitalize the first letter of every word and lowercase the rest",
            handler_fn(|args| Ok(Value::from(title_case(args.str("text")?)))),
        )
        .param(text_param("Text to convert")),
        ToolDefinition::new(
            "trim_text",
            "Remove leading and trailing whitespace",
            handler_fn(|args| Ok(Value::from(args.str("text")?.trim()))),
        )
        .param(text_param("Text to trim")),
        ToolDefinition::new(
            "split_text",
            "Split text on a delimiter, keeping empty segments",
            handler_fn(|args| {
                let parts = split_text(args.str("text")?, args.str("delimiter")?)?;
                Ok(json!(parts))
            }),
        )
        .param(text_param("Text to split"))
        .param(delimiter_param()),
        ToolDefinition::new(
            "join_text",
            "Join a list of strings with a delimiter",
            handler_fn(|args| {
                let parts = args.string_list("parts")?;
                Ok(Value::from(parts.join(args.str("delimiter")?)))
            }),
        )
        .param(
            ParamSpec::required("parts", ParamType::Array).describe("Strings to join, in order"),
        )
        .param(delimiter_param()),
        ToolDefinition::new(
            "replace_text",
            "Replace occurrences of a substring",
            handler_fn(|args| {
                let result = replace_text(
                    args.str("text")?,
                    args.str("find")?,
                    args.str("replace")?,
                    args.opt_i64("count"),
                )?;
                Ok(Value::from(result))
            }),
        )
        .param(text_param("Text to edit"))
        .param(ParamSpec::required("find", ParamType::String).describe("Substring to look for"))
        .param(ParamSpec::required("replace", ParamType::String).describe("Replacement"))
        .param(
            ParamSpec::optional("count", ParamType::Integer)
                .describe("Replace at most this many occurrences (default: all)"),
        ),
        ToolDefinition::new(
            "count_occurrences",
            "Count non-overlapping occurrences of a substring",
            handler_fn(|args| {
                let count = count_occurrences(
                    args.str("text")?,
                    args.str("pattern")?,
                    args.bool("case_sensitive")?,
                )?;
                Ok(json!({ "count": count }))
            }),
        )
        .param(text_param("Text to search"))
        .param(ParamSpec::required("pattern", ParamType::String).describe("Substring to count"))
        .param(ParamSpec::optional("case_sensitive", ParamType::Boolean).with_default(true)),
        ToolDefinition::new(
            "text_similarity",
            "Compare two strings with edit-distance and Jaro-Winkler metrics",
            handler_fn(|args| Ok(text_similarity(args.str("a")?, args.str("b")?))),
        )
        .param(ParamSpec::required("a", ParamType::String))
        .param(ParamSpec::required("b", ParamType::String)),
        ToolDefinition::new(
            "regex_match",
            "Find all matches of a regular expression, with capture groups",
            handler_fn(|args| regex_match(args.str("text")?, args.str("pattern")?)),
        )
        .param(text_param("Text to search"))
        .param(ParamSpec::required("pattern", ParamType::String).describe("Regular expression")),
        ToolDefinition::new(
            "regex_replace",
            "Replace every match of a regular expression; $1 / ${name} refer to groups",
            handler_fn(|args| {
                let re = compile(args.str("pattern")?)?;
                let replaced = re.replace_all(args.str("text")?, args.str("replacement")?);
                Ok(Value::from(replaced.into_owned()))
            }),
        )
        .param(text_param("Text to edit"))
        .param(ParamSpec::required("pattern", ParamType::String).describe("Regular expression"))
        .param(ParamSpec::required("replacement", ParamType::String)),
        ToolDefinition::new(
            "url_encode",
            "Percent-encode text for use in a URL",
            handler_fn(|args| Ok(Value::from(urlencoding::encode(args.str("text")?).into_owned()))),
        )
        .param(text_param("Text to encode")),
        ToolDefinition::new(
            "url_decode",
            "Decode percent-encoded text",
            handler_fn(|args| {
                let decoded = urlencoding::decode(args.str("text")?)
                    .context("decoded bytes are not valid UTF-8")?;
                Ok(Value::from(decoded.into_owned()))
            }),
        )
        .param(text_param("Text to decode")),
        ToolDefinition::new(
            "hash_text",
            "Hash text and return the hex digest (md5, sha256 or sha512)",
            handler_fn(|args| {
                let algorithm = args.str("algorithm")?;
                let digest = hash_text(args.str("text")?, algorithm)?;
                Ok(json!({ "algorithm": algorithm.to_lowercase(), "digest": digest }))
            }),
        )
        .param(text_param("Text to hash"))
        .param(ParamSpec::optional("algorithm", ParamType::String).with_default("sha256")),
    ]
}

/// Reverse by Unicode scalar value
pub fn reverse_text(text: &str) -> String {
    text.chars().rev().collect()
}

pub fn word_count(text: &str) -> Value {
    json!({
        "word_count": text.split_whitespace().count(),
        "character_count": text.chars().count(),
        "character_count_no_spaces": text.chars().filter(|&c| c != ' ').count(),
    })
}

pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = c.is_whitespace();
        }
    }
    out
}

pub fn split_text<'a>(text: &'a str, delimiter: &str) -> Result<Vec<&'a str>> {
    if delimiter.is_empty() {
        bail!("delimiter must not be empty");
    }
    Ok(text.split(delimiter).collect())
}

pub fn replace_text(text: &str, find: &str, replace: &str, count: Option<i64>) -> Result<String> {
    if find.is_empty() {
        bail!("'find' must not be empty");
    }
    match count {
        None => Ok(text.replace(find, replace)),
        Some(n) if n < 0 => bail!("count must not be negative"),
        Some(n) => Ok(text.replacen(find, replace, n as usize)),
    }
}

pub fn count_occurrences(text: &str, pattern: &str, case_sensitive: bool) -> Result<usize> {
    if pattern.is_empty() {
        bail!("pattern must not be empty");
    }
    if case_sensitive {
        Ok(text.matches(pattern).count())
    } else {
        Ok(text.to_lowercase().matches(&pattern.to_lowercase()).count())
    }
}

pub fn text_similarity(a: &str, b: &str) -> Value {
    json!({
        "levenshtein_distance": strsim::levenshtein(a, b),
        "normalized_levenshtein": strsim::normalized_levenshtein(a, b),
        "jaro_winkler": strsim::jaro_winkler(a, b),
        "exact_match": a == b,
    })
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("invalid regular expression '{}'", pattern))
}

pub fn regex_match(text: &str, pattern: &str) -> Result<Value> {
    let re = compile(pattern)?;
    let matches: Vec<Value> = re
        .captures_iter(text)
        .take(MAX_REGEX_MATCHES)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let groups: Vec<Value> = caps
                .iter()
                .skip(1)
                .map(|g| g.map_or(Value::Null, |m| Value::from(m.as_str())))
                .collect();
            Some(json!({
                "match": whole.as_str(),
                "start": whole.start(),
                "end": whole.end(),
                "groups": groups,
            }))
        })
        .collect();

    Ok(json!({ "count": matches.len(), "matches": matches }))
}

pub fn hash_text(text: &str, algorithm: &str) -> Result<String> {
    let bytes = text.as_bytes();
    match algorithm.to_lowercase().as_str() {
        "md5" => Ok(format!("{:x}", md5::compute(bytes))),
        "sha256" => Ok(format!("{:x}", Sha256::digest(bytes))),
        "sha512" => Ok(format!("{:x}", Sha512::digest(bytes))),
        other => bail!("unsupported hash algorithm '{}' (use md5, sha256 or sha512)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_text() {
        assert_eq!(reverse_text("hello"), "olleh");
        assert_eq!(reverse_text(""), "");
        assert_eq!(reverse_text("añb"), "bña");
        assert_eq!(reverse_text(&reverse_text("round trip")), "round trip");
    }

    #[test]
    fn test_word_count() {
        let counts = word_count("the quick brown fox");
        assert_eq!(counts["word_count"], 4);
        assert_eq!(counts["character_count"], 19);
        assert_eq!(counts["character_count_no_spaces"], 16);

        let empty = word_count("   ");
        assert_eq!(empty["word_count"], 0);
        assert_eq!(empty["character_count"], 3);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hello wORLD"), "Hello World");
        assert_eq!(title_case("  two  spaces"), "  Two  Spaces");
        assert_eq!(title_case("x1y"), "X1y");
    }

    #[test]
    fn test_split_keeps_empty_segments() {
        assert_eq!(split_text("a,b,,c", ",").unwrap(), vec!["a", "b", "", "c"]);
        assert_eq!(split_text("", ",").unwrap(), vec![""]);
        assert!(split_text("abc", "").is_err());
    }

    #[test]
    fn test_replace_text() {
        assert_eq!(replace_text("a-a-a", "a", "b", None).unwrap(), "b-b-b");
        assert_eq!(replace_text("a-a-a", "a", "b", Some(2)).unwrap(), "b-b-a");
        assert!(replace_text("a", "a", "b", Some(-1)).is_err());
        assert!(replace_text("a", "", "b", None).is_err());
    }

    #[test]
    fn test_count_occurrences() {
        assert_eq!(count_occurrences("Abc abc ABC", "abc", true).unwrap(), 1);
        assert_eq!(count_occurrences("Abc abc ABC", "abc", false).unwrap(), 3);
        assert_eq!(count_occurrences("aaaa", "aa", true).unwrap(), 2);
    }

    #[test]
    fn test_text_similarity() {
        let result = text_similarity("kitten", "sitting");
        assert_eq!(result["levenshtein_distance"], 3);
        assert_eq!(result["exact_match"], false);
        assert_eq!(text_similarity("same", "same")["jaro_winkler"], 1.0);
    }

    #[test]
    fn test_regex_match() {
        let result = regex_match("a1 b22 c", r"([a-z])(\d+)").unwrap();
        assert_eq!(result["count"], 2);
        assert_eq!(result["matches"][1]["match"], "b22");
        assert_eq!(result["matches"][1]["groups"], json!(["b", "22"]));
        assert!(regex_match("x", "(unclosed").is_err());
    }

    #[test]
    fn test_hash_text() {
        assert_eq!(
            hash_text("hello", "md5").unwrap(),
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(
            hash_text("hello", "SHA256").unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(hash_text("hello", "crc32").is_err());
    }
}
