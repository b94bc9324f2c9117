//! Markdown-to-HTML rendering capability.
//!
//! The [`TextRenderer`] trait is the only thing a [`MessageElement`] needs
//! from the host: one request carrying the raw message text, one response
//! carrying HTML. The element treats that HTML as trusted and injects it
//! verbatim.
//!
//! # Implementations
//!
//! - [`BridgeRenderer`]: calls the host's `md_to_html` command through an
//!   [`InvokeBridge`] (in-process or over HTTP)
//! - [`MarkdownRenderer`]: converts in-process with `pulldown-cmark`
//! - [`FnRenderer`]: wraps an async closure, mostly useful in tests
//!
//! [`MessageElement`]: crate::element::MessageElement

pub mod bridge;
pub mod markdown;

pub use bridge::{BridgeError, BridgeRenderer, HttpBridge, InvokeBridge};
pub use markdown::MarkdownRenderer;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

/// Failure of a single render request.
///
/// The element never interprets these; they surface unchanged from
/// [`MessageElement::show`](crate::element::MessageElement::show).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The host could not be reached.
    #[error("Text renderer unavailable: {0}")]
    Unavailable(String),

    /// The host received the request and refused it.
    #[error("Text renderer rejected the request: {0}")]
    Rejected(String),

    /// The host answered with something other than an HTML string.
    #[error("Invalid renderer response: {0}")]
    InvalidResponse(String),

    /// The markdown itself could not be converted.
    #[error("Markdown conversion failed: {0}")]
    Conversion(String),
}

/// Asynchronous markdown-to-HTML conversion provided by the host.
#[async_trait]
pub trait TextRenderer: Send + Sync + fmt::Debug {
    /// Convert `text` to an HTML fragment.
    async fn convert_markdown_to_html(&self, text: &str) -> Result<String, RenderError>;
}

type RenderFn = dyn Fn(String) -> BoxFuture<'static, Result<String, RenderError>> + Send + Sync;

/// A [`TextRenderer`] backed by an async function.
#[derive(Clone)]
pub struct FnRenderer {
    func: Arc<RenderFn>,
}

impl FnRenderer {
    /// Wrap `func`, which receives an owned copy of the message text.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, RenderError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |text| func(text).boxed()),
        }
    }
}

impl fmt::Debug for FnRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRenderer").finish_non_exhaustive()
    }
}

#[async_trait]
impl TextRenderer for FnRenderer {
    async fn convert_markdown_to_html(&self, text: &str) -> Result<String, RenderError> {
        (self.func)(text.to_owned()).await
    }
}
