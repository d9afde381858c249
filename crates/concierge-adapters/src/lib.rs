//! Assistant service adapters for Concierge -- weather lookup, web
//! search, and email dispatch.
//!
//! Each adapter implements the [`Adapter`] trait defined in [`traits`],
//! turning an external-service call into a plain-English string for the
//! calling agent.  Service failures never surface as errors at the tool
//! boundary; they are logged and reported as text.

pub mod email;
pub mod error;
pub mod traits;
pub mod weather;
pub mod web_search;

pub use email::{EmailAdapter, SmtpConfig};
pub use error::{AdapterError, Result};
pub use traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolContext, ToolDefinition,
};
pub use weather::WeatherAdapter;
pub use web_search::WebSearchAdapter;
