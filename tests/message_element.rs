use async_trait::async_trait;
use chat_message_wc::element::{
    ElementRegistry, LOADER_MARKUP, LOCAL_USER_STYLE, MessageElement, VisualState,
    register_message_element,
};
use chat_message_wc::renderer::{RenderError, TextRenderer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Maps a few known inputs, wraps everything else in a paragraph, fails on "fail".
#[derive(Debug)]
struct TableRenderer;

#[async_trait]
impl TextRenderer for TableRenderer {
    async fn convert_markdown_to_html(&self, text: &str) -> Result<String, RenderError> {
        match text {
            "**hi**" => Ok("<strong>hi</strong>".to_string()),
            "bye" => Ok("<p>bye</p>".to_string()),
            "fail" => Err(RenderError::Conversion("cannot convert".to_string())),
            other => Ok(format!("[{other}]")),
        }
    }
}

/// Holds each gated request until its sender fires.
#[derive(Debug, Default)]
struct GatedRenderer {
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

impl GatedRenderer {
    fn gate(&self, text: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(text.to_string(), rx);
        tx
    }
}

#[async_trait]
impl TextRenderer for GatedRenderer {
    async fn convert_markdown_to_html(&self, text: &str) -> Result<String, RenderError> {
        let gate = self.gates.lock().unwrap().remove(text);
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| RenderError::Unavailable("gate dropped".to_string()))?;
        }
        Ok(format!("<p>{text}</p>"))
    }
}

fn element() -> MessageElement {
    MessageElement::new(Arc::new(TableRenderer))
}

#[tokio::test]
async fn test_content_equals_renderer_output_exactly() {
    let el = element();
    for input in ["", "plain", "<script>alert('x')</script>", "a & b < c > \"d\""] {
        el.show(input, false).await.unwrap();
        let expected = TableRenderer.convert_markdown_to_html(input).await.unwrap();
        assert_eq!(el.inner_html(), expected, "input {input:?}");
    }
}

#[tokio::test]
async fn test_show_loading_from_any_state() {
    let el = element();
    el.show_loading().await;
    assert_eq!(el.inner_html(), LOADER_MARKUP);

    el.show_loading().await;
    assert_eq!(el.inner_html(), LOADER_MARKUP);

    el.show("bye", true).await.unwrap();
    el.show_loading().await;
    assert_eq!(el.inner_html(), LOADER_MARKUP);
    assert_eq!(el.state(), VisualState::Loading);
}

#[tokio::test]
async fn test_alignment_follows_author_flag() {
    let mine = element();
    mine.show("bye", true).await.unwrap();
    assert_eq!(mine.style().as_deref(), Some(LOCAL_USER_STYLE));

    let theirs = element();
    theirs.show("bye", false).await.unwrap();
    assert_eq!(theirs.style(), None);
}

#[tokio::test]
async fn test_rejected_render_keeps_previous_content() {
    let el = element();
    el.show("**hi**", true).await.unwrap();
    let before = (el.inner_html(), el.style(), el.state());

    let err = el.show("fail", false).await.unwrap_err();

    assert_eq!(err, RenderError::Conversion("cannot convert".to_string()));
    assert_eq!((el.inner_html(), el.style(), el.state()), before);
}

#[tokio::test]
async fn test_load_then_show_then_reuse() {
    let el = element();
    assert_eq!(el.state(), VisualState::Unrendered);

    el.show_loading().await;
    assert_eq!(el.inner_html(), LOADER_MARKUP);

    el.show("**hi**", true).await.unwrap();
    assert_eq!(el.inner_html(), "<strong>hi</strong>");
    assert_eq!(el.style().as_deref(), Some(LOCAL_USER_STYLE));
    assert_eq!(el.state(), VisualState::Rendered);

    el.show("bye", false).await.unwrap();
    assert_eq!(el.inner_html(), "<p>bye</p>");
    assert!(!el.is_local_user());
    assert_eq!(el.state(), VisualState::Rendered);
}

#[tokio::test]
async fn test_pending_show_leaves_loader_visible() {
    let renderer = Arc::new(GatedRenderer::default());
    let release = renderer.gate("slow");
    let el = MessageElement::new(renderer);
    el.show_loading().await;

    let task = tokio::spawn({
        let el = el.clone();
        async move { el.show("slow", true).await.map(|_| ()) }
    });
    tokio::task::yield_now().await;

    assert_eq!(el.state(), VisualState::Loading);
    assert_eq!(el.inner_html(), LOADER_MARKUP);
    assert_eq!(el.style(), None);

    release.send(()).unwrap();
    task.await.unwrap().unwrap();

    assert_eq!(el.state(), VisualState::Rendered);
    assert_eq!(el.inner_html(), "<p>slow</p>");
    assert_eq!(el.style().as_deref(), Some(LOCAL_USER_STYLE));
}

#[tokio::test]
async fn test_concurrent_shows_last_completion_wins() {
    let renderer = Arc::new(GatedRenderer::default());
    let first_gate = renderer.gate("first");
    let second_gate = renderer.gate("second");
    let el = MessageElement::new(renderer);

    let first = tokio::spawn({
        let el = el.clone();
        async move { el.show("first", false).await.map(|_| ()) }
    });
    let second = tokio::spawn({
        let el = el.clone();
        async move { el.show("second", true).await.map(|_| ()) }
    });

    second_gate.send(()).unwrap();
    second.await.unwrap().unwrap();
    assert_eq!(el.inner_html(), "<p>second</p>");
    assert!(el.is_local_user());

    first_gate.send(()).unwrap();
    first.await.unwrap().unwrap();
    assert_eq!(el.inner_html(), "<p>first</p>");
    assert!(!el.is_local_user());
}

#[tokio::test]
async fn test_registered_elements_are_independent() {
    let registry = ElementRegistry::new();
    register_message_element(&registry, Arc::new(TableRenderer)).unwrap();

    let a = registry.create("chat-message").unwrap();
    let b = registry.create("chat-message").unwrap();
    a.show("**hi**", true).await.unwrap();
    b.show_loading().await;

    assert_eq!(a.inner_html(), "<strong>hi</strong>");
    assert_eq!(b.inner_html(), LOADER_MARKUP);
    assert_eq!(b.style(), None);
}
