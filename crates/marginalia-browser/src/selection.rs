//! Reading the live DOM selection into a [`RawSelection`].

use marginalia_core::{RawPosition, RawRange, RawSelection};

use crate::surface::{text_nodes, utf16_to_char_offset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

/// Snapshot of `window.getSelection()` relative to `container`.
pub fn read_selection(container: &web_sys::Element) -> RawSelection<web_sys::Node> {
    let Some(selection) = web_sys::window().and_then(|w| w.get_selection().ok().flatten()) else {
        return RawSelection::Empty;
    };
    if selection.range_count() == 0 {
        return RawSelection::Empty;
    }
    if selection.is_collapsed() {
        return RawSelection::Collapsed;
    }

    let in_bounds = |node: Option<web_sys::Node>| node.is_some_and(|n| container.contains(Some(&n)));
    if !in_bounds(selection.anchor_node()) || !in_bounds(selection.focus_node()) {
        return RawSelection::OutOfBounds;
    }

    let Ok(range) = selection.get_range_at(0) else {
        return RawSelection::Empty;
    };
    let (Ok(start_node), Ok(start_offset), Ok(end_node), Ok(end_offset)) = (
        range.start_container(),
        range.start_offset(),
        range.end_container(),
        range.end_offset(),
    ) else {
        return RawSelection::Empty;
    };

    let start = resolve_boundary(container, &start_node, start_offset, Edge::Start);
    let end = resolve_boundary(container, &end_node, end_offset, Edge::End);
    match (start, end) {
        (Some(start), Some(end)) => RawSelection::Range(RawRange::new(start, end)),
        // Nothing but non-text content is selected.
        _ => RawSelection::Collapsed,
    }
}

/// Turn a DOM boundary point into a text position.
///
/// Text boundaries convert their UTF-16 offset. Element boundaries
/// `(element, child index)` resolve to the first text at or after the point
/// for a start, and the last text at or before it for an end.
fn resolve_boundary(
    container: &web_sys::Element,
    node: &web_sys::Node,
    offset: u32,
    edge: Edge,
) -> Option<RawPosition<web_sys::Node>> {
    if node.node_type() == web_sys::Node::TEXT_NODE {
        let text = node.text_content().unwrap_or_default();
        let chars = utf16_to_char_offset(&text, offset as usize);
        return Some(RawPosition::new(node.clone(), chars));
    }

    let document = node.owner_document()?;
    let point = document.create_range().ok()?;
    point.set_start(node, offset).ok()?;
    point.collapse_with_to_start(true);

    let texts = text_nodes(container).ok()?;
    let resolved = match edge {
        Edge::Start => texts
            .into_iter()
            .find(|t| point.compare_point(t, 0).is_ok_and(|c| c >= 0))
            .map(|t| RawPosition::new(t, 0)),
        Edge::End => texts
            .into_iter()
            .rev()
            .find(|t| {
                let len = t.text_content().map_or(0, |s| s.encode_utf16().count());
                point.compare_point(t, len as u32).is_ok_and(|c| c <= 0)
            })
            .map(|t| {
                let len = t.text_content().map_or(0, |s| s.chars().count());
                RawPosition::new(t, len)
            }),
    };

    tracing::trace!(
        target: "marginalia::selection",
        node_name = %node.node_name(),
        offset,
        ?edge,
        resolved = resolved.is_some(),
        "resolved element boundary"
    );
    resolved
}
