//! Email adapter -- send mail through an authenticated implicit-TLS SMTP
//! session.
//!
//! The SMTP conversation is spoken directly over a rustls socket: EHLO,
//! AUTH LOGIN, MAIL FROM, one RCPT TO per recipient, DATA, payload, QUIT.
//! The account identity comes from injected [`SmtpConfig`], never from
//! source.  AUTH-phase rejections, protocol rejections, and transport
//! failures are distinct error variants so the public operation can word
//! each outcome for the calling agent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rustls::ClientConfig;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{AdapterError, Result};
use crate::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolContext, ToolDefinition,
};

/// Default SMTP submission host.
const DEFAULT_SMTP_HOST: &str = "smtp.stackmail.com";

/// Default SMTP implicit-TLS port.
const DEFAULT_SMTP_PORT: u16 = 465;

/// Connection and read timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Domain announced in EHLO.
const EHLO_DOMAIN: &str = "concierge.local";

type SmtpReader = BufReader<ReadHalf<TlsStream<TcpStream>>>;
type SmtpWriter = WriteHalf<TlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// SMTP account configuration, injected by the embedding application.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP implicit-TLS port.
    pub port: u16,
    /// Account username, also used as the From address.
    pub username: String,
    /// Account password or app-specific password.
    pub password: String,
}

impl SmtpConfig {
    /// Read the SMTP account from the environment.
    ///
    /// `SMTP_USERNAME` and `SMTP_PASSWORD` are required; `SMTP_HOST` and
    /// `SMTP_PORT` fall back to the Stackmail submission defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("SMTP_HOST")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        let port = match lookup("SMTP_PORT").filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                AdapterError::Config(format!("SMTP_PORT is not a valid port number: `{raw}`"))
            })?,
            None => DEFAULT_SMTP_PORT,
        };
        let username = lookup("SMTP_USERNAME")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AdapterError::Config("SMTP_USERNAME is not set".into()))?;
        let password = lookup("SMTP_PASSWORD")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AdapterError::Config("SMTP_PASSWORD is not set".into()))?;

        Ok(Self {
            host,
            port,
            username,
            password,
        })
    }
}

// ---------------------------------------------------------------------------
// SMTP command builders (pure functions, testable)
// ---------------------------------------------------------------------------

/// Build an SMTP EHLO command.
pub fn ehlo_command(domain: &str) -> String {
    format!("EHLO {domain}\r\n")
}

/// Build an SMTP AUTH LOGIN command.
pub fn auth_login_command() -> String {
    "AUTH LOGIN\r\n".to_string()
}

/// Encode one AUTH LOGIN credential line.
pub fn auth_credential_line(value: &str) -> String {
    use base64::Engine;
    format!("{}\r\n", base64::engine::general_purpose::STANDARD.encode(value))
}

/// Build an SMTP MAIL FROM command.
pub fn mail_from_command(from: &str) -> String {
    format!("MAIL FROM:<{from}>\r\n")
}

/// Build an SMTP RCPT TO command.
pub fn rcpt_to_command(recipient: &str) -> String {
    format!("RCPT TO:<{recipient}>\r\n")
}

/// Build an SMTP DATA command.
pub fn data_command() -> String {
    "DATA\r\n".to_string()
}

/// Build an SMTP QUIT command.
pub fn quit_command() -> String {
    "QUIT\r\n".to_string()
}

/// The SMTP envelope recipients: To plus Cc when present.
pub fn envelope_recipients<'a>(to: &'a str, cc: Option<&'a str>) -> Vec<&'a str> {
    let mut recipients = vec![to];
    if let Some(cc) = cc {
        recipients.push(cc);
    }
    recipients
}

/// Assemble the multipart message transmitted after DATA.
///
/// One `text/plain; charset=UTF-8` part inside a `multipart/mixed`
/// envelope, with `From`/`To`/`Subject`/`Date` and an optional `Cc`
/// header.  The caller appends the SMTP terminating dot.
pub fn mime_message(
    from: &str,
    to: &str,
    cc: Option<&str>,
    subject: &str,
    body: &str,
    boundary: &str,
    date: &str,
) -> String {
    let mut msg = String::new();
    msg.push_str(&format!("From: {from}\r\n"));
    msg.push_str(&format!("To: {to}\r\n"));
    if let Some(cc) = cc {
        msg.push_str(&format!("Cc: {cc}\r\n"));
    }
    msg.push_str(&format!("Subject: {subject}\r\n"));
    msg.push_str(&format!("Date: {date}\r\n"));
    msg.push_str("MIME-Version: 1.0\r\n");
    msg.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n"
    ));
    msg.push_str("\r\n");
    msg.push_str(&format!("--{boundary}\r\n"));
    msg.push_str("Content-Type: text/plain; charset=UTF-8\r\n");
    msg.push_str("Content-Transfer-Encoding: 8bit\r\n");
    msg.push_str("\r\n");
    msg.push_str(body);
    msg.push_str("\r\n");
    msg.push_str(&format!("--{boundary}--\r\n"));
    msg
}

// ---------------------------------------------------------------------------
// TLS connection and reply plumbing
// ---------------------------------------------------------------------------

/// Build a rustls `ClientConfig` using Mozilla's bundled root certificates.
fn tls_client_config() -> Arc<ClientConfig> {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
}

/// Establish a TLS connection to the given host and port.
async fn connect_tls(host: &str, port: u16) -> Result<TlsStream<TcpStream>> {
    let connector = TlsConnector::from(tls_client_config());
    let server_name = rustls::pki_types::ServerName::try_from(host.to_owned()).map_err(|e| {
        AdapterError::ExecutionFailed {
            tool_name: "send_email".into(),
            reason: format!("invalid server name '{host}': {e}"),
        }
    })?;

    let addr = format!("{host}:{port}");

    let tcp_stream = tokio::time::timeout(
        Duration::from_secs(CONNECT_TIMEOUT_SECS),
        TcpStream::connect(&addr),
    )
    .await
    .map_err(|_| AdapterError::Timeout {
        seconds: CONNECT_TIMEOUT_SECS,
        reason: format!("TCP connection to {addr} timed out"),
    })?
    .map_err(|e| AdapterError::ExecutionFailed {
        tool_name: "send_email".into(),
        reason: format!("TCP connection to {addr} failed: {e}"),
    })?;

    let tls_stream = tokio::time::timeout(
        Duration::from_secs(CONNECT_TIMEOUT_SECS),
        connector.connect(server_name, tcp_stream),
    )
    .await
    .map_err(|_| AdapterError::Timeout {
        seconds: CONNECT_TIMEOUT_SECS,
        reason: format!("TLS handshake with {host} timed out"),
    })?
    .map_err(|e| AdapterError::ExecutionFailed {
        tool_name: "send_email".into(),
        reason: format!("TLS handshake with {host} failed: {e}"),
    })?;

    Ok(tls_stream)
}

/// One SMTP server reply: status code plus every line of the response.
#[derive(Debug)]
struct SmtpReply {
    status: u16,
    lines: Vec<String>,
}

impl SmtpReply {
    fn detail(&self) -> String {
        self.lines.join("; ")
    }
}

/// Read an SMTP reply (one or more lines) until the final status line.
async fn read_reply(reader: &mut SmtpReader) -> Result<SmtpReply> {
    let mut lines = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(CONNECT_TIMEOUT_SECS);

    loop {
        let mut line = String::new();
        match tokio::time::timeout_at(deadline, reader.read_line(&mut line)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => {
                let trimmed = line.trim().to_string();
                debug!(smtp_line = %trimmed, "SMTP reply line");
                lines.push(trimmed.clone());
                // "NNN-text" continues the reply, "NNN text" ends it.
                match trimmed.as_bytes().get(3) {
                    Some(b'-') => {}
                    _ => break,
                }
            }
            Ok(Err(e)) => {
                return Err(AdapterError::ExecutionFailed {
                    tool_name: "send_email".into(),
                    reason: format!("SMTP read error: {e}"),
                });
            }
            Err(_) => {
                return Err(AdapterError::Timeout {
                    seconds: CONNECT_TIMEOUT_SECS,
                    reason: "SMTP reply timed out".into(),
                });
            }
        }
    }

    let status = lines
        .first()
        .and_then(|l| l.get(..3))
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    Ok(SmtpReply { status, lines })
}

/// Write a command and read the reply without judging its status.
async fn exchange_unchecked(
    writer: &mut SmtpWriter,
    reader: &mut SmtpReader,
    command: &str,
) -> Result<SmtpReply> {
    writer
        .write_all(command.as_bytes())
        .await
        .map_err(|e| AdapterError::ExecutionFailed {
            tool_name: "send_email".into(),
            reason: format!("SMTP write error: {e}"),
        })?;
    read_reply(reader).await
}

/// Write a command and require the reply's status class (2 for 2xx, 3 for
/// 3xx).  Anything else is a protocol error.
async fn exchange(
    writer: &mut SmtpWriter,
    reader: &mut SmtpReader,
    command: &str,
    expected_class: u16,
) -> Result<SmtpReply> {
    let reply = exchange_unchecked(writer, reader, command).await?;
    if reply.status / 100 != expected_class {
        return Err(AdapterError::Protocol {
            status: reply.status,
            reason: reply.detail(),
        });
    }
    Ok(reply)
}

/// Check an AUTH-phase reply; any rejection there is an authentication
/// failure, not a generic protocol error.
fn expect_auth_status(reply: &SmtpReply, expected_class: u16) -> Result<()> {
    if reply.status / 100 != expected_class {
        return Err(AdapterError::AuthenticationFailed {
            reason: reply.detail(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Email adapter
// ---------------------------------------------------------------------------

/// Email dispatch service adapter.
pub struct EmailAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// Injected SMTP account.
    config: SmtpConfig,
}

impl EmailAdapter {
    /// Create an email adapter with an injected SMTP account.
    pub fn new(id: impl Into<String>, config: SmtpConfig) -> Self {
        Self {
            id: id.into(),
            connected: false,
            config,
        }
    }

    /// Create an email adapter configured from `SMTP_*` environment
    /// variables.
    pub fn from_env(id: impl Into<String>) -> Result<Self> {
        Ok(Self::new(id, SmtpConfig::from_env()?))
    }

    /// Send an email, reporting the outcome as a sentence.
    ///
    /// Total over all inputs: authentication, protocol, and transport
    /// failures each collapse to their own message for the calling agent.
    pub async fn send_email(
        &self,
        ctx: &ToolContext,
        to: &str,
        subject: &str,
        message: &str,
        cc: Option<&str>,
    ) -> String {
        let outcome = self.send_single_email(to, subject, message, cc).await;
        match &outcome {
            Ok(()) => info!(invocation = %ctx.invocation_id(), to, "email sent"),
            Err(e) => error!(
                invocation = %ctx.invocation_id(),
                to,
                error = %e,
                "email send failed"
            ),
        }
        describe_send_outcome(to, outcome)
    }

    /// Transmit one message over a fresh SMTP session.
    ///
    /// Propagates typed errors so [`EmailAdapter::send_email`] can word
    /// each category.  The session is quit and shut down whether or not
    /// the conversation succeeded.
    async fn send_single_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        cc: Option<&str>,
    ) -> Result<()> {
        let tls_stream = connect_tls(&self.config.host, self.config.port).await?;
        let (read_half, mut write_half) = tokio::io::split(tls_stream);
        let mut reader = BufReader::new(read_half);

        let outcome = self
            .smtp_conversation(&mut reader, &mut write_half, recipient, subject, body, cc)
            .await;

        // Teardown happens regardless of the conversation outcome.
        let _ = write_half.write_all(quit_command().as_bytes()).await;
        let _ = write_half.shutdown().await;

        match &outcome {
            Ok(()) => info!(recipient, "email transmitted"),
            Err(e) => error!(recipient, error = %e, "email transmission failed"),
        }
        outcome
    }

    /// Walk the SMTP dialogue from greeting to accepted payload.
    async fn smtp_conversation(
        &self,
        reader: &mut SmtpReader,
        writer: &mut SmtpWriter,
        recipient: &str,
        subject: &str,
        body: &str,
        cc: Option<&str>,
    ) -> Result<()> {
        let greeting = read_reply(reader).await?;
        if greeting.status / 100 != 2 {
            return Err(AdapterError::Protocol {
                status: greeting.status,
                reason: format!("server rejected connection: {}", greeting.detail()),
            });
        }

        exchange(writer, reader, &ehlo_command(EHLO_DOMAIN), 2).await?;

        // AUTH LOGIN: the server prompts for username and password in turn.
        let auth = exchange_unchecked(writer, reader, &auth_login_command()).await?;
        expect_auth_status(&auth, 3)?;
        let user = exchange_unchecked(
            writer,
            reader,
            &auth_credential_line(&self.config.username),
        )
        .await?;
        expect_auth_status(&user, 3)?;
        let pass = exchange_unchecked(
            writer,
            reader,
            &auth_credential_line(&self.config.password),
        )
        .await?;
        expect_auth_status(&pass, 2)?;

        exchange(writer, reader, &mail_from_command(&self.config.username), 2).await?;
        for rcpt in envelope_recipients(recipient, cc) {
            exchange(writer, reader, &rcpt_to_command(rcpt), 2).await?;
        }
        exchange(writer, reader, &data_command(), 3).await?;

        let boundary = format!("=_concierge_{}", Uuid::now_v7().simple());
        let date = Utc::now().to_rfc2822();
        let payload = mime_message(
            &self.config.username,
            recipient,
            cc,
            subject,
            body,
            &boundary,
            &date,
        );
        exchange(writer, reader, &format!("{payload}.\r\n"), 2).await?;

        Ok(())
    }
}

/// Word a send outcome for the calling agent.
fn describe_send_outcome(to: &str, outcome: Result<()>) -> String {
    match outcome {
        Ok(()) => format!("Email sent successfully to {to}"),
        Err(AdapterError::AuthenticationFailed { .. }) => {
            "Email sending failed: Authentication error. Please check your SMTP credentials."
                .to_string()
        }
        Err(AdapterError::Protocol { reason, .. }) => {
            format!("Email sending failed: SMTP error - {reason}")
        }
        Err(e) => format!("An error occurred while sending email: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Adapter trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for EmailAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn connect(&mut self) -> Result<()> {
        info!(
            id = %self.id,
            host = %self.config.host,
            port = self.config.port,
            "email adapter connected"
        );
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "email adapter disconnected");
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
            name: "send_email".into(),
            description: "Send a plain-text email through the configured SMTP account".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "to": {
                        "type": "string",
                        "description": "Recipient email address"
                    },
                    "subject": {
                        "type": "string",
                        "description": "Email subject line"
                    },
                    "message": {
                        "type": "string",
                        "description": "Email body content"
                    },
                    "cc": {
                        "type": "string",
                        "description": "Optional CC email address"
                    }
                },
                "required": ["to", "subject", "message"]
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
            "send_email" => {
                let to = params.get("to").and_then(|v| v.as_str()).ok_or_else(|| {
                    AdapterError::InvalidParams {
                        tool_name: "send_email".into(),
                        reason: "missing required string field `to`".into(),
                    }
                })?;
                let subject = params
                    .get("subject")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| AdapterError::InvalidParams {
                        tool_name: "send_email".into(),
                        reason: "missing required string field `subject`".into(),
                    })?;
                let message = params
                    .get("message")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| AdapterError::InvalidParams {
                        tool_name: "send_email".into(),
                        reason: "missing required string field `message`".into(),
                    })?;
                let cc = params.get("cc").and_then(|v| v.as_str());

                Ok(Value::String(
                    self.send_email(ctx, to, subject, message, cc).await,
                ))
            }
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "smtp".into(),
            scopes: vec![],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
