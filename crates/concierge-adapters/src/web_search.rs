//! Web search adapter -- DuckDuckGo search rendered as plain text.
//!
//! Queries the DuckDuckGo HTML endpoint (no API key required) and renders
//! the parsed hits -- title, URL, snippet -- as a numbered text block for
//! the calling agent.  The public operation never fails; engine trouble
//! is reported as a sentence naming the query.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::error::{AdapterError, Result};
use crate::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolContext, ToolDefinition,
};

/// DuckDuckGo HTML search endpoint.
const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Maximum number of hits rendered into the reply.
const MAX_HITS: usize = 5;

/// Realistic browser User-Agent to avoid being blocked.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Web search service adapter.
pub struct WebSearchAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// HTTP client for search requests.  No request timeout is set; the
    /// client library default applies.
    client: reqwest::Client,
    /// Search endpoint URL.
    endpoint: String,
}

impl WebSearchAdapter {
    /// Create a new web search adapter against the default endpoint.
    pub fn new(id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            id: id.into(),
            connected: false,
            client,
            endpoint: DUCKDUCKGO_HTML_URL.to_string(),
        }
    }

    /// Point the adapter at a different search endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Search the web for a free-text query.
    ///
    /// Total over all inputs: any engine failure collapses to a sentence
    /// naming the query.
    pub async fn search_web(&self, ctx: &ToolContext, query: &str) -> String {
        match self.run_search(query).await {
            Ok(rendered) => {
                info!(
                    invocation = %ctx.invocation_id(),
                    query,
                    results = %rendered,
                    "web search succeeded"
                );
                rendered
            }
            Err(e) => {
                error!(
                    invocation = %ctx.invocation_id(),
                    query,
                    error = %e,
                    "web search failed"
                );
                format!("An error occurred while searching the web for '{query}'.")
            }
        }
    }

    /// Run one search round trip, propagating typed errors.
    async fn run_search(&self, query: &str) -> Result<String> {
        // POST with form data is more reliable than GET for DDG.
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| AdapterError::ExecutionFailed {
                tool_name: "search_web".into(),
                reason: format!("search request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::UpstreamStatus {
                tool_name: "search_web".into(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| AdapterError::ExecutionFailed {
                tool_name: "search_web".into(),
                reason: format!("failed to read search response: {e}"),
            })?;

        let hits = parse_result_page(&html, MAX_HITS);
        debug!(query, count = hits.len(), "search results parsed");
        Ok(render_hits(query, &hits))
    }
}

// ---------------------------------------------------------------------------
// Result page parsing
// ---------------------------------------------------------------------------

/// Marker DuckDuckGo wraps result titles in.
const TITLE_MARKER: &str = "class=\"result__a\"";

/// Marker DuckDuckGo wraps result snippets in.
const SNIPPET_MARKER: &str = "class=\"result__snippet\"";

/// One parsed search result.
#[derive(Debug, PartialEq)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

/// Extract up to `max_hits` results from a DuckDuckGo HTML page.
///
/// Scans forward from each title marker; the hit's snippet is the first
/// snippet marker found before the following title, so a missing snippet
/// never shifts later pairings.
fn parse_result_page(html: &str, max_hits: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    let mut cursor = 0;

    while hits.len() < max_hits {
        let Some(rel) = html[cursor..].find(TITLE_MARKER) else {
            break;
        };
        let title_pos = cursor + rel;
        let after_title = title_pos + TITLE_MARKER.len();

        let url = href_before(&html[..title_pos])
            .map(untrack_url)
            .unwrap_or_default();
        let title = strip_tags(&text_after_tag(&html[after_title..], "</a>"));

        let next_title = html[after_title..]
            .find(TITLE_MARKER)
            .map(|p| after_title + p)
            .unwrap_or(html.len());
        let snippet = match html[after_title..next_title].find(SNIPPET_MARKER) {
            Some(p) => {
                let snippet_start = after_title + p + SNIPPET_MARKER.len();
                strip_tags(&text_after_tag(&html[snippet_start..], "</"))
                    .trim()
                    .to_string()
            }
            None => String::new(),
        };

        if !title.is_empty() || !url.is_empty() {
            hits.push(SearchHit {
                title,
                url,
                snippet,
            });
        }
        cursor = after_title;
    }

    hits
}

/// Find the value of the last `href="..."` attribute before a position.
fn href_before(prefix: &str) -> Option<String> {
    let start = prefix.rfind("href=\"")? + "href=\"".len();
    let rest = &prefix[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Text between the end of the current tag and `end_marker`.
fn text_after_tag(html: &str, end_marker: &str) -> String {
    let Some(open_end) = html.find('>') else {
        return String::new();
    };
    let content = &html[open_end + 1..];
    let end = content.find(end_marker).unwrap_or(content.len());
    content[..end].to_string()
}

/// DuckDuckGo wraps result links in a redirect; recover the target URL.
fn untrack_url(link: String) -> String {
    if link.contains("duckduckgo.com/l/") {
        if let Some(query_start) = link.find('?') {
            for (key, value) in url::form_urlencoded::parse(link[query_start + 1..].as_bytes()) {
                if key == "uddg" {
                    return value.into_owned();
                }
            }
        }
    }
    if let Some(rest) = link.strip_prefix("//") {
        return format!("https://{rest}");
    }
    link
}

/// Remove HTML tags and decode the handful of entities DDG emits.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if in_tag => {}
            _ => out.push(ch),
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Render parsed hits as the plain-text block handed back to the agent.
fn render_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No search results found for '{query}'.");
    }

    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{}. {}\n", i + 1, hit.title));
        if !hit.url.is_empty() {
            out.push_str(&format!("   {}\n", hit.url));
        }
        if !hit.snippet.is_empty() {
            out.push_str(&format!("   {}\n", hit.snippet));
        }
    }
    out.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Adapter trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for WebSearchAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Information
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, endpoint = %self.endpoint, "web search adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "web search adapter disconnected");
        self.connected = false;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if !self.connected {
            return Ok(HealthStatus::Unhealthy);
        }
        match self.client.head(&self.endpoint).send().await {
            Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
                Ok(HealthStatus::Healthy)
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "search health check non-success");
                Ok(HealthStatus::Degraded)
            }
            Err(e) => {
                warn!(error = %e, "search health check failed");
                Ok(HealthStatus::Unhealthy)
            }
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "search_web".into(),
            description: "Search the web with DuckDuckGo and return titles, URLs, and snippets \
                          as plain text"
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }),
        }]
    }

    async fn execute_tool(&self, ctx: &ToolContext, name: &str, params: Value) -> Result<Value> {
        if !self.connected {
            return Err(AdapterError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("adapter `{}` is not connected", self.id),
            });
        }
        match name {
            "search_web" => {
                let query = params.get("query").and_then(|v| v.as_str()).ok_or_else(|| {
                    AdapterError::InvalidParams {
                        tool_name: "search_web".into(),
                        reason: "missing required string field `query`".into(),
                    }
                })?;
                Ok(Value::String(self.search_web(ctx, query).await))
            }
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
