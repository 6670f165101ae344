//! HTTP tools: fetch URLs and extract page text.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};

use crate::config::HttpToolsConfig;
use crate::mcp::{ToolDefinition, ToolHandler};
use crate::models::{ParamSpec, ParamType, ToolArgs};
use crate::utils::{read_body_limited, validate_url, HttpClient};

/// Client and limits shared by the HTTP tools
#[derive(Debug)]
pub struct HttpFetcher {
    client: HttpClient,
    max_response_bytes: usize,
    allow_private_hosts: bool,
}

impl HttpFetcher {
    pub fn new(config: &HttpToolsConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: HttpClient::new(
                Duration::from_secs(config.timeout_secs),
                config.allow_private_hosts,
            )?,
            max_response_bytes: config.max_response_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: Option<&Map<String, Value>>,
        body: Option<&str>,
    ) -> Result<Response> {
        let url = validate_url(url, self.allow_private_hosts)?;

        let mut request = self
            .client
            .client()
            .request(method.clone(), url.clone())
            .headers(header_map(headers)?);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        tracing::debug!(%method, %url, "Sending HTTP request");

        request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))
    }

    /// Turn a response into `{status, url, headers, body, truncated}`
    async fn describe(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let final_url = response.url().to_string();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), Value::from(v)))
            })
            .collect();

        let (body, truncated) = read_body_limited(response, self.max_response_bytes)
            .await
            .context("failed to read response body")?;

        Ok(json!({
            "status": status.as_u16(),
            "ok": status.is_success(),
            "url": final_url,
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
            "truncated": truncated,
        }))
    }
}

fn header_map(headers: Option<&Map<String, Value>>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers.into_iter().flatten() {
        let value = value
            .as_str()
            .ok_or_else(|| anyhow!("header '{}' must be a string", name))?;
        map.insert(
            HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name '{}'", name))?,
            HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header '{}'", name))?,
        );
    }
    Ok(map)
}

fn url_param() -> ParamSpec {
    ParamSpec::required("url", ParamType::String).describe("http or https URL")
}

fn headers_param() -> ParamSpec {
    ParamSpec::optional("headers", ParamType::Object).describe("Extra request headers")
}

pub fn definitions(config: &HttpToolsConfig) -> reqwest::Result<Vec<ToolDefinition>> {
    let fetcher = Arc::new(HttpFetcher::new(config)?);

    Ok(vec![
        ToolDefinition::new(
            "http_get",
            "Fetch a URL with GET and return status, headers and body",
            Arc::new(HttpGetHandler {
                fetcher: fetcher.clone(),
            }),
        )
        .param(url_param())
        .param(headers_param()),
        ToolDefinition::new(
            "http_request",
            "Send an HTTP request with any method, headers and body",
            Arc::new(HttpRequestHandler {
                fetcher: fetcher.clone(),
            }),
        )
        .param(url_param())
        .param(
            ParamSpec::optional("method", ParamType::String)
                .with_default("GET")
                .describe("HTTP method"),
        )
        .param(headers_param())
        .param(ParamSpec::optional("body", ParamType::String).describe("Request body")),
        ToolDefinition::new(
            "fetch_page_text",
            "Fetch an HTML page and return its visible text",
            Arc::new(FetchPageTextHandler { fetcher }),
        )
        .param(url_param())
        .param(
            ParamSpec::optional("selector", ParamType::String)
                .with_default("body")
                .describe("CSS selector limiting which elements are extracted"),
        ),
    ])
}

/// Handler for GET requests
#[derive(Debug)]
pub struct HttpGetHandler {
    pub fetcher: Arc<HttpFetcher>,
}

#[async_trait::async_trait]
impl ToolHandler for HttpGetHandler {
    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let response = self
            .fetcher
            .send(Method::GET, args.str("url")?, args.opt_object("headers"), None)
            .await?;
        self.fetcher.describe(response).await
    }
}

/// Handler for arbitrary-method requests
#[derive(Debug)]
pub struct HttpRequestHandler {
    pub fetcher: Arc<HttpFetcher>,
}

#[async_trait::async_trait]
impl ToolHandler for HttpRequestHandler {
    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let method_name = args.str("method")?.to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .with_context(|| format!("invalid HTTP method '{}'", method_name))?;

        let response = self
            .fetcher
            .send(
                method,
                args.str("url")?,
                args.opt_object("headers"),
                args.opt_str("body"),
            )
            .await?;
        self.fetcher.describe(response).await
    }
}

/// Handler for extracting page text
#[derive(Debug)]
pub struct FetchPageTextHandler {
    pub fetcher: Arc<HttpFetcher>,
}

#[async_trait::async_trait]
impl ToolHandler for FetchPageTextHandler {
    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let url = args.str("url")?;
        let selector = args.str("selector")?;

        let response = self.fetcher.send(Method::GET, url, None, None).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned HTTP {}", url, status));
        }

        let (body, truncated) = read_body_limited(response, self.fetcher.max_response_bytes)
            .await
            .context("failed to read response body")?;
        let html = String::from_utf8_lossy(&body);
        let (title, text) = extract_text(&html, selector)?;

        Ok(json!({
            "url": url,
            "title": title,
            "text": text,
            "truncated": truncated,
        }))
    }
}

/// Visible text of the elements matching `selector`, plus the page title.
///
/// Text inside `script`, `style` and `noscript` is skipped and runs of
/// whitespace collapse to one space.
pub fn extract_text(html: &str, selector: &str) -> Result<(Option<String>, String)> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(selector).map_err(|e| anyhow!("invalid CSS selector: {}", e))?;

    let title = Selector::parse("title").ok().and_then(|title_selector| {
        document
            .select(&title_selector)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
    });

    let mut pieces = Vec::new();
    for element in document.select(&selector) {
        for node in element.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript"))
            });
            if !hidden {
                pieces.push(text.to_string());
            }
        }
    }

    Ok((title, collapse_whitespace(&pieces.join(" "))))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::ToolRegistry;
    use crate::models::ToolError;

    fn registry(allow_private_hosts: bool) -> ToolRegistry {
        let config = HttpToolsConfig {
            timeout_secs: 5,
            max_response_bytes: 64,
            allow_private_hosts,
        };
        let mut registry = ToolRegistry::new();
        for tool in definitions(&config).unwrap() {
            registry.register(tool).unwrap();
        }
        registry
    }

    #[test]
    fn test_extract_text() {
        let html = r#"<html><head><title> Demo  Page </title><style>p{}</style></head>
            <body><h1>Hello</h1><script>var x = 1;</script><p>brave
            new <b>world</b></p></body></html>"#;

        let (title, text) = extract_text(html, "body").unwrap();
        assert_eq!(title.as_deref(), Some("Demo Page"));
        assert_eq!(text, "Hello brave new world");

        let (_, heading) = extract_text(html, "h1").unwrap();
        assert_eq!(heading, "Hello");
        assert!(extract_text(html, "<<").is_err());
    }

    #[tokio::test]
    async fn test_http_get() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/greeting")
            .match_header("x-token", "abc")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("hello there")
            .create_async()
            .await;

        let value = registry(true)
            .invoke(
                "http_get",
                json!({"url": format!("{}/greeting", server.url()), "headers": {"x-token": "abc"}}),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(value["status"], 200);
        assert_eq!(value["body"], "hello there");
        assert_eq!(value["headers"]["content-type"], "text/plain");
        assert_eq!(value["truncated"], false);
    }

    #[tokio::test]
    async fn test_http_request_truncates_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .match_body("payload")
            .with_status(201)
            .with_body("y".repeat(200))
            .create_async()
            .await;

        let value = registry(true)
            .invoke(
                "http_request",
                json!({
                    "url": format!("{}/upload", server.url()),
                    "method": "post",
                    "body": "payload"
                }),
            )
            .await
            .unwrap();

        assert_eq!(value["status"], 201);
        assert_eq!(value["body"].as_str().unwrap().len(), 64);
        assert_eq!(value["truncated"], true);
    }

    #[tokio::test]
    async fn test_private_hosts_refused_by_default() {
        let err = registry(false)
            .invoke("http_get", json!({"url": "http://127.0.0.1:9/"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Handler { .. }));
    }

    #[tokio::test]
    async fn test_fetch_page_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_body("<html><body><p>Plain words</p></body></html>")
            .create_async()
            .await;

        let value = registry(true)
            .invoke("fetch_page_text", json!({"url": server.url()}))
            .await
            .unwrap();
        assert_eq!(value["text"], "Plain words");
    }
}
