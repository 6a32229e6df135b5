//! HTTP client for the MCP tool server.

use std::sync::Arc;

use progear_mcp_server::middleware::REQUEST_ID_HEADER;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;
use url::Url;

/// Errors from a tool call.
#[derive(Debug, Error)]
pub enum McpClientError {
    /// The tool server could not be reached or sent an unreadable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid tool URL: {0}")]
    Url(#[from] url::ParseError),

    /// The tool answered with an error status.
    #[error("{tool} returned {status}: {message}")]
    Tool {
        tool: String,
        status: StatusCode,
        message: String,
    },
}

/// One tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Tool name, e.g. `get_orders`.
    pub tool: &'static str,
    /// Path segment after the tool name (product or customer id).
    pub path_arg: Option<String>,
    /// Query parameters.
    pub query: Vec<(&'static str, String)>,
    /// JSON body; present means `POST`.
    pub body: Option<Value>,
}

impl ToolCall {
    #[must_use]
    pub const fn get(tool: &'static str) -> Self {
        Self {
            tool,
            path_arg: None,
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, arg: impl Into<String>) -> Self {
        self.path_arg = Some(arg.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// Turn the call into a `POST` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn post<T: Serialize>(tool: &'static str, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: Some(serde_json::to_value(body)?),
            ..Self::get(tool)
        })
    }
}

/// Client for `/mcp/tools/*`.
#[derive(Clone)]
pub struct McpClient {
    inner: Arc<McpClientInner>,
}

struct McpClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl McpClient {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            inner: Arc::new(McpClientInner {
                client: reqwest::Client::new(),
                base_url,
            }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Full URL of a call, with path segments and query encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn url_for(&self, call: &ToolCall) -> Result<Url, McpClientError> {
        let mut url = self.inner.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                McpClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?;
            segments.pop_if_empty().extend(["mcp", "tools", call.tool]);
            if let Some(arg) = &call.path_arg {
                segments.push(arg);
            }
        }
        if !call.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(call.query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Invoke a tool with the agent's bearer token.
    ///
    /// # Errors
    ///
    /// Returns `McpClientError::Tool` for non-success statuses, carrying the
    /// tool's `error` message, and `McpClientError::Http` for transport
    /// failures.
    #[instrument(skip(self, call, token), fields(tool = call.tool))]
    pub async fn call(
        &self,
        call: &ToolCall,
        token: &str,
        request_id: Option<&str>,
    ) -> Result<Value, McpClientError> {
        let url = self.url_for(call)?;

        let mut request = match &call.body {
            Some(body) => self.inner.client.post(url).json(body),
            None => self.inner.client.get(url),
        }
        .bearer_auth(token);
        if let Some(id) = request_id {
            request = request.header(REQUEST_ID_HEADER, id);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.to_string());
        tracing::warn!(status = status.as_u16(), error = %message, "Tool call failed");

        Err(McpClientError::Tool {
            tool: call.tool.to_string(),
            status,
            message,
        })
    }
}
