//! Custom element registry.
//!
//! Tag names are defined once, at start-up, through an explicit call. A second
//! definition of the same tag is an error, never a silent replacement.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::{MessageElement, TAG_NAME};
use crate::renderer::TextRenderer;

/// Names the HTML standard reserves even though they contain a hyphen.
const RESERVED_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid custom element name: {0:?}")]
    InvalidName(String),

    #[error("Element already defined: {0}")]
    AlreadyDefined(String),

    #[error("No element defined for tag: {0}")]
    Undefined(String),
}

type ElementFactory = Arc<dyn Fn() -> MessageElement + Send + Sync>;

/// Maps tag names to element constructors.
#[derive(Default)]
pub struct ElementRegistry {
    definitions: RwLock<BTreeMap<String, ElementFactory>>,
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `tag`. Fails if the name is invalid or already taken.
    pub fn define<F>(&self, tag: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> MessageElement + Send + Sync + 'static,
    {
        if !is_valid_custom_element_name(tag) {
            return Err(RegistryError::InvalidName(tag.to_string()));
        }

        let mut definitions = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if definitions.contains_key(tag) {
            return Err(RegistryError::AlreadyDefined(tag.to_string()));
        }
        definitions.insert(tag.to_string(), Arc::new(factory));

        info!(name: "element.defined", tag = %tag, "Custom element defined");
        Ok(())
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tag)
    }

    /// Construct a new element for `tag`.
    pub fn create(&self, tag: &str) -> Result<MessageElement, RegistryError> {
        // Clone the factory out so it runs without the lock held.
        let factory = self
            .definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .cloned()
            .ok_or_else(|| RegistryError::Undefined(tag.to_string()))?;
        Ok(factory())
    }

    pub fn tags(&self) -> Vec<String> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

/// Define `<chat-message>` on `registry`, rendering through `renderer`.
///
/// Meant to be called once while the application starts.
pub fn register_message_element(
    registry: &ElementRegistry,
    renderer: Arc<dyn TextRenderer>,
) -> Result<(), RegistryError> {
    registry.define(TAG_NAME, move || {
        MessageElement::new(Arc::clone(&renderer))
    })
}

/// Simplified valid-custom-element-name check (ASCII only).
fn is_valid_custom_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_lower = chars.next().is_some_and(|c| c.is_ascii_lowercase());

    starts_lower
        && name.contains('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
        && !RESERVED_NAMES.contains(&name)
}
