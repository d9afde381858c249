//! Core adapter trait and supporting types.
//!
//! Every service adapter (weather, web search, email) implements the
//! [`Adapter`] trait, giving the hosting agent runtime a uniform surface
//! for discovering and invoking tools.  The host supplies a
//! [`ToolContext`] with each invocation; adapters treat it as opaque
//! apart from tagging their log output with its id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// The category of service an adapter provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// Messaging services (email, chat).
    Messaging,
    /// Information lookup (weather, web search).
    Information,
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Messaging => write!(f, "messaging"),
            Self::Information => write!(f, "information"),
        }
    }
}

/// The health status of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The adapter is fully operational.
    Healthy,
    /// The adapter is working but with reduced capability or elevated latency.
    Degraded,
    /// The adapter is not functional.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// A tool exposed by an adapter that the agent can invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Machine-readable tool name (e.g. `get_weather`, `send_email`).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub parameters: serde_json::Value,
}

/// Authentication requirements for an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequirement {
    /// The credential provider name (e.g. `smtp`).
    pub provider: String,
    /// The scopes or permissions required.
    pub scopes: Vec<String>,
}

/// Opaque per-invocation context supplied by the hosting runtime.
///
/// Adapters receive a reference with every [`Adapter::execute_tool`] call.
/// The only field they may observe is the invocation id, and only to
/// correlate log lines; adapter behavior must never depend on the context
/// contents.
#[derive(Debug, Clone)]
pub struct ToolContext {
    invocation_id: Uuid,
}

impl ToolContext {
    /// Create a context for a fresh invocation.
    pub fn new() -> Self {
        Self {
            invocation_id: Uuid::now_v7(),
        }
    }

    /// The unique id of this invocation.
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// The universal adapter interface.
///
/// Every service adapter must implement this trait.  The agent runtime
/// discovers available tools via [`Adapter::tools`] and executes them via
/// [`Adapter::execute_tool`].  Service failures never surface as `Err`
/// from `execute_tool`; the adapters report them as plain-English strings.
/// An `Err` from `execute_tool` always means the call itself was malformed
/// (unknown tool, missing parameter, adapter not connected).
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Return the unique identifier for this adapter instance.
    fn id(&self) -> &str;

    /// Return the category of service this adapter provides.
    fn adapter_type(&self) -> AdapterType;

    /// Establish a connection to the backing service.
    async fn connect(&mut self) -> Result<()>;

    /// Gracefully disconnect from the backing service.
    async fn disconnect(&mut self) -> Result<()>;

    /// Check whether the adapter is healthy and operational.
    async fn health_check(&self) -> Result<HealthStatus>;

    /// Return the list of tools this adapter exposes.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Execute a named tool with the given JSON parameters.
    ///
    /// Returns the adapter's reply as a JSON string value.
    async fn execute_tool(
        &self,
        ctx: &ToolContext,
        name: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value>;

    /// Return the authentication requirements for this adapter, if any.
    fn required_auth(&self) -> Option<AuthRequirement>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_display() {
        assert_eq!(AdapterType::Messaging.to_string(), "messaging");
        assert_eq!(AdapterType::Information.to_string(), "information");
    }

    #[test]
    fn health_status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(HealthStatus::Degraded.to_string(), "degraded");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
    }

    #[test]
    fn tool_context_ids_are_unique() {
        let a = ToolContext::new();
        let b = ToolContext::new();
        assert_ne!(a.invocation_id(), b.invocation_id());
    }

    #[test]
    fn tool_definition_roundtrips_through_json() {
        let def = ToolDefinition {
            name: "get_weather".into(),
            description: "Get the current weather".into(),
            parameters: serde_json::json!({"type": "object"}),
        };
        let encoded = serde_json::to_string(&def).unwrap();
        let decoded: ToolDefinition = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.name, "get_weather");
        assert_eq!(decoded.parameters["type"], "object");
    }
}
