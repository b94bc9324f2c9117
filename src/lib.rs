//! Chat message web component.
//!
//! Renders chat messages for a desktop application's web view. The core is
//! the `<chat-message>` element: a bubble that shows a loading indicator,
//! then the HTML the host produces from the message's markdown.
//!
//! # Architecture
//!
//! - **Element**: [`element::MessageElement`] and its one-time registration
//! - **Renderer**: the async [`renderer::TextRenderer`] capability, reached
//!   through the host's invocation bridge
//! - **Host**: [`host::CommandHost`], the host commands behind the bridge
//! - **Server**: Axum dev server for the static build and the bridge over HTTP
//!
//! # Modules
//!
//! - [`config`]: build and dev server configuration
//! - [`element`]: the message element and its registry
//! - [`host`]: host command dispatch (`md_to_html`)
//! - [`renderer`]: text renderer trait and implementations
//! - [`server`]: HTTP surface
//! - [`telemetry`]: logging setup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod element;
pub mod host;
pub mod renderer;
pub mod server;
pub mod telemetry;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::element::{ElementRegistry, RegistryError, register_message_element};
use crate::host::CommandHost;
use crate::renderer::{BridgeRenderer, MarkdownRenderer};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Host commands reachable through `/ipc`.
    pub host: Arc<CommandHost>,
    /// Custom element definitions.
    pub registry: Arc<ElementRegistry>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the host, the bridge renderer and the element registry.
    ///
    /// Elements created from this state render through the same
    /// `md_to_html` command the web view invokes.
    pub fn new(config: Arc<AppConfig>) -> Result<Self, RegistryError> {
        let host = CommandHost::with_markdown(MarkdownRenderer::default());
        let registry = ElementRegistry::new();
        register_message_element(&registry, Arc::new(BridgeRenderer::new(host.clone())))?;

        Ok(Self {
            host: Arc::new(host),
            registry: Arc::new(registry),
            config,
        })
    }
}
