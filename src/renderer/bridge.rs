//! Host invocation bridge and the renderer that talks through it.
//!
//! A bridge call is a command name plus a JSON argument object; the answer is
//! a JSON value or an error string. [`BridgeRenderer`] sends
//! [`MD_TO_HTML`] with a single `text` field and expects a JSON string back.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{RenderError, TextRenderer};

/// Host command that converts markdown to HTML.
pub const MD_TO_HTML: &str = "md_to_html";

/// Arguments of the [`MD_TO_HTML`] command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdToHtmlArgs {
    /// Raw message text.
    pub text: String,
}

/// Errors raised while invoking a host command.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The host answered with an error.
    #[error("Host rejected command ({status}): {message}")]
    Rejected {
        /// HTTP-like status code (404 unknown command, 400 bad args, 500 failure).
        status: u16,
        /// Error message from the host.
        message: String,
    },

    /// Payload could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The bridge endpoint is malformed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<BridgeError> for RenderError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Rejected { message, .. } => RenderError::Rejected(message),
            BridgeError::Json(e) => RenderError::InvalidResponse(e.to_string()),
            other => RenderError::Unavailable(other.to_string()),
        }
    }
}

/// Inter-process invocation of named host commands.
#[async_trait]
pub trait InvokeBridge: Send + Sync + fmt::Debug {
    /// Invoke `command` with the JSON argument object `args`.
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, BridgeError>;
}

/// A [`TextRenderer`] that asks the host to run [`MD_TO_HTML`].
#[derive(Debug, Clone)]
pub struct BridgeRenderer<B> {
    bridge: B,
}

impl<B: InvokeBridge> BridgeRenderer<B> {
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }
}

#[async_trait]
impl<B: InvokeBridge> TextRenderer for BridgeRenderer<B> {
    async fn convert_markdown_to_html(&self, text: &str) -> Result<String, RenderError> {
        let args = serde_json::to_value(MdToHtmlArgs {
            text: text.to_owned(),
        })
        .map_err(|e| RenderError::InvalidResponse(e.to_string()))?;

        debug!(name: "bridge.invoke", command = MD_TO_HTML, bytes = text.len(), "Invoking host command");

        let value = self.bridge.invoke(MD_TO_HTML, args).await.map_err(|e| {
            warn!(name: "bridge.invoke.failed", command = MD_TO_HTML, error = %e, "Host command failed");
            RenderError::from(e)
        })?;

        match value {
            Value::String(html) => Ok(html),
            other => Err(RenderError::InvalidResponse(format!(
                "expected an HTML string, got {other}"
            ))),
        }
    }
}

/// Error body returned by the HTTP bridge endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeErrorBody {
    pub error: String,
}

/// Invocation bridge over HTTP: `POST {base}/ipc/{command}`.
#[derive(Debug, Clone)]
pub struct HttpBridge {
    client: reqwest::Client,
    base: Url,
}

impl HttpBridge {
    /// Create a bridge targeting the server at `base` (e.g. `http://127.0.0.1:1420`).
    pub fn new(base: &str) -> Result<Self, BridgeError> {
        Self::with_client(base, reqwest::Client::new())
    }

    pub fn with_client(base: &str, client: reqwest::Client) -> Result<Self, BridgeError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    /// Endpoint URL for `command`.
    pub fn endpoint(&self, command: &str) -> Result<Url, BridgeError> {
        Ok(self.base.join("ipc/")?.join(command)?)
    }
}

#[async_trait]
impl InvokeBridge for HttpBridge {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, BridgeError> {
        let response = self
            .client
            .post(self.endpoint(command)?)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        let message = serde_json::from_slice::<BridgeErrorBody>(&body)
            .map_or_else(|_| String::from_utf8_lossy(&body).into_owned(), |b| b.error);

        Err(BridgeError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
