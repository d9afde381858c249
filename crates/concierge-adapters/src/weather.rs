//! Weather adapter -- current conditions for a city as one line of text.
//!
//! Queries the wttr.in plain-text endpoint with `format=3` ("City:
//! <sky> <temperature>").  The public operation always hands the calling
//! agent a sentence: failures are reported in English, never as errors.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::{AdapterError, Result};
use crate::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolContext, ToolDefinition,
};

/// Default weather-as-text endpoint.
const WEATHER_ENDPOINT: &str = "https://wttr.in";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Browser User-Agent sent with every request; wttr.in shapes its output
/// by client.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Weather lookup service adapter.
pub struct WeatherAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// HTTP client for endpoint requests.
    client: reqwest::Client,
    /// Weather endpoint base URL.
    endpoint: String,
}

impl WeatherAdapter {
    /// Create a new weather adapter against the default endpoint.
    pub fn new(id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            id: id.into(),
            connected: false,
            client,
            endpoint: WEATHER_ENDPOINT.to_string(),
        }
    }

    /// Point the adapter at a different weather endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Look up the current weather for a city.
    ///
    /// Total over all inputs: upstream rejections and transport failures
    /// each collapse to their own sentence for the calling agent.
    pub async fn get_weather(&self, ctx: &ToolContext, city: &str) -> String {
        match self.fetch_weather(city).await {
            Ok(report) => {
                info!(
                    invocation = %ctx.invocation_id(),
                    city,
                    report = %report,
                    "weather lookup succeeded"
                );
                report
            }
            Err(AdapterError::UpstreamStatus { status, .. }) => {
                error!(
                    invocation = %ctx.invocation_id(),
                    city,
                    status,
                    "weather endpoint rejected the lookup"
                );
                format!("Could not retrieve weather for {city}.")
            }
            Err(e) => {
                error!(
                    invocation = %ctx.invocation_id(),
                    city,
                    error = %e,
                    "weather lookup failed"
                );
                format!("An error occurred while retrieving weather for {city}.")
            }
        }
    }

    /// Fetch and trim the one-line report, propagating typed errors.
    async fn fetch_weather(&self, city: &str) -> Result<String> {
        let url = weather_url(&self.endpoint, city)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout {
                    seconds: REQUEST_TIMEOUT_SECS,
                    reason: format!("weather request for `{city}` timed out"),
                }
            } else {
                AdapterError::ExecutionFailed {
                    tool_name: "get_weather".into(),
                    reason: format!("weather request failed: {e}"),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::UpstreamStatus {
                tool_name: "get_weather".into(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::ExecutionFailed {
                tool_name: "get_weather".into(),
                reason: format!("failed to read weather response: {e}"),
            })?;

        Ok(body.trim().to_string())
    }
}

/// Build the one-line-format request URL for a city.
///
/// The city becomes a single percent-escaped path segment; callers may
/// pass anything, including spaces and non-ASCII names.
fn weather_url(endpoint: &str, city: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(endpoint)
        .map_err(|e| AdapterError::Config(format!("invalid weather endpoint `{endpoint}`: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| AdapterError::Config(format!("weather endpoint `{endpoint}` cannot take a path")))?
        .pop_if_empty()
        .push(city);
    url.set_query(Some("format=3"));
    Ok(url)
}

// ---------------------------------------------------------------------------
// Adapter trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for WeatherAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Information
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, endpoint = %self.endpoint, "weather adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "weather adapter disconnected");
        self.connected = false;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if !self.connected {
            return Ok(HealthStatus::Unhealthy);
        }
        Ok(HealthStatus::Healthy)
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "get_weather".into(),
            description: "Get the current weather for a city as a single line of text".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name, e.g. London or Tokyo"
                    }
                },
                "required": ["city"]
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
            "get_weather" => {
                let city = params.get("city").and_then(|v| v.as_str()).ok_or_else(|| {
                    AdapterError::InvalidParams {
                        tool_name: "get_weather".into(),
                        reason: "missing required string field `city`".into(),
                    }
                })?;
                Ok(Value::String(self.get_weather(ctx, city).await))
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
