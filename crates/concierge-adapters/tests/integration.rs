//! Integration tests driving the adapters against mocked HTTP services.
//!
//! wiremock stands in for the weather endpoint and the search engine so
//! the full tool path (parameter extraction, HTTP round trip, formatting)
//! runs without real network access.

use concierge_adapters::{
    Adapter, EmailAdapter, SmtpConfig, ToolContext, WeatherAdapter, WebSearchAdapter,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_weather_returns_trimmed_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/London"))
        .and(query_param("format", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("London: +20°C\n"))
        .mount(&server)
        .await;

    let adapter = WeatherAdapter::new("weather").with_endpoint(server.uri());
    let ctx = ToolContext::new();
    let report = adapter.get_weather(&ctx, "London").await;
    assert_eq!(report, "London: +20°C");
}

#[tokio::test]
async fn get_weather_upstream_rejection_names_the_city() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Nowhere"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = WeatherAdapter::new("weather").with_endpoint(server.uri());
    let ctx = ToolContext::new();
    let report = adapter.get_weather(&ctx, "Nowhere").await;
    assert!(report.contains("Nowhere"), "got: {report}");
    assert!(report.contains("Could not retrieve"), "got: {report}");
}

#[tokio::test]
async fn get_weather_tool_call_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Tokyo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Tokyo: 🌦 +22°C"))
        .mount(&server)
        .await;

    let mut adapter = WeatherAdapter::new("weather").with_endpoint(server.uri());
    adapter.connect().await.unwrap();
    let ctx = ToolContext::new();
    let result = adapter
        .execute_tool(&ctx, "get_weather", json!({"city": "Tokyo"}))
        .await
        .unwrap();
    assert_eq!(result, Value::String("Tokyo: 🌦 +22°C".into()));
}

// ---------------------------------------------------------------------------
// Web search
// ---------------------------------------------------------------------------

const RESULT_PAGE: &str = r#"
<div class="result">
    <a rel="nofollow" href="https://example.com" class="result__a">Example Domain</a>
    <span class="result__snippet">An illustrative example site.</span>
</div>
<div class="result">
    <a rel="nofollow" href="https://other.com" class="result__a">Other Site</a>
    <span class="result__snippet">Another result.</span>
</div>
"#;

#[tokio::test]
async fn search_web_renders_parsed_hits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_PAGE))
        .mount(&server)
        .await;

    let adapter =
        WebSearchAdapter::new("search").with_endpoint(format!("{}/html/", server.uri()));
    let ctx = ToolContext::new();
    let reply = adapter.search_web(&ctx, "example").await;
    assert!(reply.contains("1. Example Domain"), "got: {reply}");
    assert!(reply.contains("https://example.com"), "got: {reply}");
    assert!(reply.contains("An illustrative example site."), "got: {reply}");
    assert!(reply.contains("2. Other Site"), "got: {reply}");
}

#[tokio::test]
async fn search_web_failure_names_the_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let adapter =
        WebSearchAdapter::new("search").with_endpoint(format!("{}/html/", server.uri()));
    let ctx = ToolContext::new();
    let reply = adapter.search_web(&ctx, "doomed query").await;
    assert_eq!(
        reply,
        "An error occurred while searching the web for 'doomed query'."
    );
}

#[tokio::test]
async fn search_web_empty_page_reports_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let adapter =
        WebSearchAdapter::new("search").with_endpoint(format!("{}/html/", server.uri()));
    let ctx = ToolContext::new();
    let reply = adapter.search_web(&ctx, "nothing here").await;
    assert!(reply.contains("nothing here"), "got: {reply}");
}

#[tokio::test]
async fn search_web_tool_call_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_PAGE))
        .mount(&server)
        .await;

    let mut adapter =
        WebSearchAdapter::new("search").with_endpoint(format!("{}/html/", server.uri()));
    adapter.connect().await.unwrap();
    let ctx = ToolContext::new();
    let result = adapter
        .execute_tool(&ctx, "search_web", json!({"query": "example"}))
        .await
        .unwrap();
    let text = result.as_str().unwrap();
    assert!(text.contains("Example Domain"));
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_email_tool_call_never_fails_on_dead_relay() {
    // Nothing listens on port 1; the SMTP connection is refused and the
    // tool still answers with a sentence.
    let config = SmtpConfig {
        host: "127.0.0.1".into(),
        port: 1,
        username: "agent@example.com".into(),
        password: "secret".into(),
    };
    let mut adapter = EmailAdapter::new("email", config);
    adapter.connect().await.unwrap();
    let ctx = ToolContext::new();
    let result = adapter
        .execute_tool(
            &ctx,
            "send_email",
            json!({"to": "a@b.com", "subject": "Hi", "message": "Body", "cc": "c@d.com"}),
        )
        .await
        .unwrap();
    let text = result.as_str().unwrap();
    assert!(
        text.starts_with("An error occurred while sending email:"),
        "got: {text}"
    );
}
