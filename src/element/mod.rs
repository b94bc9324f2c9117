//! The `<chat-message>` element.
//!
//! A [`MessageElement`] is a handle to one chat bubble: a small attribute
//! map, an HTML content string and a [`VisualState`]. Clones share the same
//! underlying node, the way two references to one DOM node do.
//!
//! # Lifecycle
//!
//! ```text
//! unrendered ──show_loading()──▶ loading ──show()──▶ rendered
//!      └─────────────show()─────────────────────────▶ rendered
//! rendered ──show_loading()──▶ loading,  rendered ──show()──▶ rendered
//! ```
//!
//! State, attributes and content are always written together under one lock,
//! after any awaiting is over, so an observer never sees a half-applied
//! transition.

pub mod registry;

pub use registry::{ElementRegistry, RegistryError, register_message_element};

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::renderer::{RenderError, TextRenderer};

/// Tag name the element is registered under.
pub const TAG_NAME: &str = "chat-message";

/// Class applied in every non-initial state.
pub const BASE_CLASS: &str = "markdown-body message";

/// Style that right-aligns the local user's bubbles.
pub const LOCAL_USER_STYLE: &str = "align-self: end;";

/// Placeholder content while a message is loading.
pub const LOADER_MARKUP: &str = "<div class=\"loader\"></div>";

/// Visual state of a [`MessageElement`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualState {
    /// Freshly constructed, nothing shown yet.
    #[default]
    Unrendered,
    /// Showing [`LOADER_MARKUP`].
    Loading,
    /// Showing renderer output.
    Rendered,
}

#[derive(Debug, Default)]
struct ElementNode {
    state: VisualState,
    attributes: BTreeMap<String, String>,
    inner_html: String,
}

/// One chat message bubble.
#[derive(Debug, Clone)]
pub struct MessageElement {
    id: Uuid,
    node: Arc<RwLock<ElementNode>>,
    renderer: Arc<dyn TextRenderer>,
}

impl MessageElement {
    /// Create an unrendered element that renders through `renderer`.
    pub fn new(renderer: Arc<dyn TextRenderer>) -> Self {
        let id = Uuid::new_v4();
        let mut node = ElementNode::default();
        node.attributes.insert("id".to_string(), id.simple().to_string());

        Self {
            id,
            node: Arc::new(RwLock::new(node)),
            renderer,
        }
    }

    /// Stable identity of this element.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether `other` is a handle to the same element.
    pub fn same_element(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Replace the content with the loading indicator.
    ///
    /// Purely local; completes without waiting on anything.
    pub async fn show_loading(&self) -> &Self {
        {
            let mut node = self.write();
            node.attributes
                .insert("class".to_string(), BASE_CLASS.to_string());
            node.inner_html = LOADER_MARKUP.to_string();
            node.state = VisualState::Loading;
        }

        debug!(name: "message.loading", element = %self.id, "Message loading");
        self
    }

    /// Render `message` through the text renderer and display the result.
    ///
    /// The element keeps whatever it was showing until the renderer answers.
    /// The alignment style is reconciled on every call: set when
    /// `is_local_user` is true, removed otherwise. If the renderer fails,
    /// the error is returned and nothing about the element changes.
    pub async fn show(&self, message: &str, is_local_user: bool) -> Result<&Self, RenderError> {
        let markup = match self.renderer.convert_markdown_to_html(message).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(
                    name: "message.render.failed",
                    element = %self.id,
                    error = %e,
                    "Message render failed, keeping previous content"
                );
                return Err(e);
            }
        };

        {
            let mut node = self.write();
            node.attributes
                .insert("class".to_string(), BASE_CLASS.to_string());
            if is_local_user {
                node.attributes
                    .insert("style".to_string(), LOCAL_USER_STYLE.to_string());
            } else {
                node.attributes.remove("style");
            }
            node.inner_html = markup;
            node.state = VisualState::Rendered;
        }

        debug!(
            name: "message.rendered",
            element = %self.id,
            local_user = is_local_user,
            "Message rendered"
        );
        Ok(self)
    }

    pub fn state(&self) -> VisualState {
        self.read().state
    }

    /// Current content markup.
    pub fn inner_html(&self) -> String {
        self.read().inner_html.clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.read().attributes.get(name).cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.write().attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.write().attributes.remove(name)
    }

    pub fn class_name(&self) -> Option<String> {
        self.attribute("class")
    }

    pub fn style(&self) -> Option<String> {
        self.attribute("style")
    }

    /// Whether the bubble currently carries the local-user alignment.
    pub fn is_local_user(&self) -> bool {
        self.read().attributes.get("style").map(String::as_str) == Some(LOCAL_USER_STYLE)
    }

    /// Serialize the element, attributes escaped, content verbatim.
    pub fn outer_html(&self) -> String {
        let node = self.read();
        let mut out = String::with_capacity(node.inner_html.len() + 64);

        let _ = write!(out, "<{TAG_NAME}");
        for (name, value) in &node.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape_attribute(value));
        }
        out.push('>');
        out.push_str(&node.inner_html);
        let _ = write!(out, "</{TAG_NAME}>");
        out
    }

    fn read(&self) -> RwLockReadGuard<'_, ElementNode> {
        self.node.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ElementNode> {
        self.node.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}
