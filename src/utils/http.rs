//! HTTP client utilities.

use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::utils::validate_url;

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 10;

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with the given request timeout.
    ///
    /// Every redirect target goes through [`validate_url`], so a public URL
    /// cannot bounce the request onto a private host.
    pub fn new(timeout: Duration, allow_private_hosts: bool) -> reqwest::Result<Self> {
        Self::with_user_agent(
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            timeout,
            allow_private_hosts,
        )
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(
        user_agent: &str,
        timeout: Duration,
        allow_private_hosts: bool,
    ) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(redirect_policy(allow_private_hosts))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn redirect_policy(allow_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
        }
        match validate_url(attempt.url().as_str(), allow_private_hosts) {
            Ok(_) => attempt.follow(),
            Err(e) => {
                tracing::warn!(url = %attempt.url(), "Refusing redirect: {}", e);
                attempt.error(e)
            }
        }
    })
}

/// Read a response body, stopping after `max_bytes`.
///
/// Returns the bytes read and whether the body was cut short.
pub async fn read_body_limited(
    mut response: Response,
    max_bytes: usize,
) -> reqwest::Result<(Vec<u8>, bool)> {
    let mut body = Vec::new();

    while let Some(chunk) = response.chunk().await? {
        let remaining = max_bytes - body.len();
        if chunk.len() > remaining {
            body.extend_from_slice(&chunk[..remaining]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }

    Ok((body, false))
}
