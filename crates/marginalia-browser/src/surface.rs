//! Browser implementation of the annotated document.
//!
//! Core offsets count chars; the DOM counts UTF-16 code units. Conversion
//! happens here and nowhere else.

use gloo_timers::callback::Timeout;
use marginalia_core::platform::{HIGHLIGHT_CLASS, HIGHLIGHT_ID_ATTR, HIGHLIGHT_TAG, PULSE_CLASS};
use marginalia_core::{
    AnnotationId, DocumentSurface, HighlightMark, PlatformError, RawRange, TextFragment,
};
use wasm_bindgen::JsCast;

/// `NodeFilter.SHOW_TEXT`.
pub(crate) const SHOW_TEXT: u32 = 0x4;

/// Char offset corresponding to a UTF-16 offset into `text`.
///
/// An offset inside a surrogate pair rounds up to the end of that char.
pub fn utf16_to_char_offset(text: &str, utf16_offset: usize) -> usize {
    let mut seen = 0;
    for (index, ch) in text.chars().enumerate() {
        if seen >= utf16_offset {
            return index;
        }
        seen += ch.len_utf16();
    }
    text.chars().count()
}

/// UTF-16 offset of the `char_offset`th char of `text`, clamped to its end.
pub fn char_to_utf16_offset(text: &str, char_offset: usize) -> usize {
    text.chars().take(char_offset).map(char::len_utf16).sum()
}

/// Text nodes under `root` in document order.
pub(crate) fn text_nodes(root: &web_sys::Node) -> Result<Vec<web_sys::Node>, PlatformError> {
    let document = root
        .owner_document()
        .or_else(|| web_sys::window().and_then(|w| w.document()))
        .ok_or("no document")?;
    let walker = document
        .create_tree_walker_with_what_to_show(root, SHOW_TEXT)
        .map_err(|e| format!("create_tree_walker failed: {:?}", e))?;

    let mut nodes = Vec::new();
    while let Ok(Some(node)) = walker.next_node() {
        nodes.push(node);
    }
    Ok(nodes)
}

/// Id of the innermost highlight containing `target`, if any.
///
/// Highlight clicks are resolved from the event target rather than bound per
/// span, so marks cloned by a later extraction stay clickable.
pub fn highlight_at(target: &web_sys::Element) -> Option<AnnotationId> {
    let selector = format!("{HIGHLIGHT_TAG}.{HIGHLIGHT_CLASS}[{HIGHLIGHT_ID_ATTR}]");
    let mark = target.closest(&selector).ok().flatten()?;
    let id = mark.get_attribute(HIGHLIGHT_ID_ATTR)?;
    Some(AnnotationId::from(id.as_str()))
}

/// The `#doc` container and the highlight spans inside it.
pub struct BrowserSurface {
    container: web_sys::Element,
    pulse_millis: u32,
}

impl BrowserSurface {
    pub fn new(container: web_sys::Element, pulse_millis: u32) -> Self {
        Self {
            container,
            pulse_millis,
        }
    }

    pub fn container(&self) -> &web_sys::Element {
        &self.container
    }

    fn document(&self) -> Result<web_sys::Document, PlatformError> {
        self.container
            .owner_document()
            .ok_or_else(|| PlatformError::from("container has no document"))
    }
}

impl DocumentSurface for BrowserSurface {
    type Node = web_sys::Node;

    fn text_fragments(&self) -> Vec<TextFragment<web_sys::Node>> {
        match text_nodes(&self.container) {
            Ok(nodes) => nodes
                .into_iter()
                .map(|node| {
                    let text = node.text_content().unwrap_or_default();
                    TextFragment::new(node, text)
                })
                .collect(),
            Err(err) => {
                tracing::warn!(target: "marginalia::surface", error = %err, "could not walk document text");
                Vec::new()
            }
        }
    }

    fn highlight_spans(&self) -> Vec<(AnnotationId, web_sys::Node)> {
        let selector = format!("{HIGHLIGHT_TAG}.{HIGHLIGHT_CLASS}[{HIGHLIGHT_ID_ATTR}]");
        let Ok(list) = self.container.query_selector_all(&selector) else {
            return Vec::new();
        };

        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| {
                let id = node
                    .dyn_ref::<web_sys::Element>()?
                    .get_attribute(HIGHLIGHT_ID_ATTR)?;
                Some((AnnotationId::from(id.as_str()), node))
            })
            .collect()
    }

    fn span_title(&self, span: &web_sys::Node) -> Option<String> {
        span.dyn_ref::<web_sys::Element>()?.get_attribute("title")
    }

    fn wrap_range(
        &mut self,
        range: &RawRange<web_sys::Node>,
        mark: &HighlightMark,
    ) -> Result<web_sys::Node, PlatformError> {
        let document = self.document()?;

        let start_text = range.start.node.text_content().unwrap_or_default();
        let end_text = range.end.node.text_content().unwrap_or_default();
        let start = char_to_utf16_offset(&start_text, range.start.offset);
        let end = char_to_utf16_offset(&end_text, range.end.offset);

        let dom_range = document
            .create_range()
            .map_err(|e| format!("create_range failed: {:?}", e))?;
        dom_range
            .set_start(&range.start.node, start as u32)
            .map_err(|e| format!("set_start failed: {:?}", e))?;
        dom_range
            .set_end(&range.end.node, end as u32)
            .map_err(|e| format!("set_end failed: {:?}", e))?;

        let element = document
            .create_element(HIGHLIGHT_TAG)
            .map_err(|e| format!("create_element failed: {:?}", e))?;
        element.set_class_name(HIGHLIGHT_CLASS);
        element
            .set_attribute(HIGHLIGHT_ID_ATTR, mark.id.as_str())
            .map_err(|e| format!("set_attribute failed: {:?}", e))?;
        element
            .set_attribute("style", &mark.style())
            .map_err(|e| format!("set_attribute failed: {:?}", e))?;
        if !mark.title.is_empty() {
            element
                .set_attribute("title", &mark.title)
                .map_err(|e| format!("set_attribute failed: {:?}", e))?;
        }

        let contents = dom_range
            .extract_contents()
            .map_err(|e| format!("extract_contents failed: {:?}", e))?;
        element
            .append_child(&contents)
            .map_err(|e| format!("append_child failed: {:?}", e))?;
        dom_range
            .insert_node(&element)
            .map_err(|e| format!("insert_node failed: {:?}", e))?;

        tracing::trace!(
            target: "marginalia::surface",
            id = %mark.id,
            start_utf16 = start,
            end_utf16 = end,
            "wrapped highlight"
        );
        Ok(element.into())
    }

    fn unwrap_span(&mut self, span: &web_sys::Node) -> Result<(), PlatformError> {
        let parent = span.parent_node().ok_or("highlight span is detached")?;
        while let Some(child) = span.first_child() {
            parent
                .insert_before(&child, Some(span))
                .map_err(|e| format!("insert_before failed: {:?}", e))?;
        }
        parent
            .remove_child(span)
            .map_err(|e| format!("remove_child failed: {:?}", e))?;
        Ok(())
    }

    fn reveal(&mut self, span: &web_sys::Node) {
        let Some(element) = span.dyn_ref::<web_sys::Element>() else {
            return;
        };

        let options = web_sys::ScrollIntoViewOptions::new();
        options.set_behavior(web_sys::ScrollBehavior::Smooth);
        options.set_block(web_sys::ScrollLogicalPosition::Center);
        options.set_inline(web_sys::ScrollLogicalPosition::Nearest);
        element.scroll_into_view_with_scroll_into_view_options(&options);

        let classes = element.class_list();
        let _ = classes.add_1(PULSE_CLASS);
        Timeout::new(self.pulse_millis, move || {
            let _ = classes.remove_1(PULSE_CLASS);
        })
        .forget();
    }

    fn clear_selection(&mut self) {
        if let Some(selection) = web_sys::window().and_then(|w| w.get_selection().ok().flatten()) {
            let _ = selection.remove_all_ranges();
        }
    }
}
