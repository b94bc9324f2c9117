//! Host command dispatch.
//!
//! The host side of the invocation bridge: named commands taking a JSON
//! argument object and answering with a JSON value or an error string.
//! [`CommandHost`] also implements [`InvokeBridge`] so the same commands can
//! be reached in-process.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::renderer::bridge::{BridgeError, InvokeBridge, MD_TO_HTML, MdToHtmlArgs};
use crate::renderer::MarkdownRenderer;

/// Errors returned by host commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    /// HTTP-style status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::UnknownCommand(_) => 404,
            Self::InvalidArgs(_) => 400,
            Self::Failed(_) => 500,
        }
    }
}

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, CommandError>> + Send + Sync>;

/// Registry of host commands.
#[derive(Clone, Default)]
pub struct CommandHost {
    handlers: BTreeMap<String, Handler>,
}

impl fmt::Debug for CommandHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHost")
            .field("commands", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CommandHost {
    /// An empty host with no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// A host exposing `md_to_html` backed by `markdown`.
    pub fn with_markdown(markdown: MarkdownRenderer) -> Self {
        Self::new().command(MD_TO_HTML, move |args: MdToHtmlArgs| async move {
            Ok::<_, String>(markdown.render(&args.text))
        })
    }

    /// Register a typed command. Arguments are deserialized from the JSON
    /// object; the output is serialized back to JSON.
    #[must_use]
    pub fn command<A, R, E, F, Fut>(mut self, name: &str, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: Handler = Arc::new(move |raw: Value| {
            let handler = Arc::clone(&handler);
            async move {
                let args: A = serde_json::from_value(raw)?;
                let output = handler(args)
                    .await
                    .map_err(|e| CommandError::Failed(e.to_string()))?;
                serde_json::to_value(output).map_err(|e| CommandError::Failed(e.to_string()))
            }
            .boxed()
        });
        self.handlers.insert(name.to_string(), erased);
        self
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Run `name` with `args`.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<Value, CommandError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        debug!(name: "host.command", command = %name, "Dispatching host command");
        let result = handler(args).await;
        if let Err(e) = &result {
            warn!(name: "host.command.failed", command = %name, error = %e, "Host command failed");
        }
        result
    }
}

#[async_trait]
impl InvokeBridge for CommandHost {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, BridgeError> {
        self.dispatch(command, args)
            .await
            .map_err(|e| BridgeError::Rejected {
                status: e.status(),
                message: e.to_string(),
            })
    }
}
