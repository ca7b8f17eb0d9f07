//! WASM browser tests for marginalia-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use marginalia_browser::{
    Annotation, AnnotationId, AnnotatorConfig, BrowserController, BrowserSurface, DocumentSurface,
    DomList, HostElements, ListEntry, ListView, RawSelection, RenderOutcome, UiEvent, events,
    highlight_at, list_click, read_selection, remove_highlights,
};
use tokio::sync::mpsc;
use wasm_bindgen::JsCast;

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

/// A fresh container attached to the body.
fn container(html: &str) -> web_sys::Element {
    let doc = document();
    let el = doc.create_element("div").unwrap();
    el.set_inner_html(html);
    doc.body().unwrap().append_child(&el).unwrap();
    el
}

fn surface(container: &web_sys::Element) -> BrowserSurface {
    BrowserSurface::new(container.clone(), 1600)
}

fn annotation(id: &str, start: usize, end: usize, anchor: &str) -> Annotation {
    Annotation {
        id: id.into(),
        start,
        end,
        anchor: anchor.to_string(),
        color: None,
        content: Some("a note".to_string()),
        comments: Vec::new(),
        user: "ann".to_string(),
        can_delete: true,
    }
}

fn select(start: (&web_sys::Node, u32), end: (&web_sys::Node, u32)) {
    let selection = web_sys::window().unwrap().get_selection().unwrap().unwrap();
    selection.remove_all_ranges().unwrap();
    let range = document().create_range().unwrap();
    range.set_start(start.0, start.1).unwrap();
    range.set_end(end.0, end.1).unwrap();
    selection.add_range(&range).unwrap();
}

// === Surface tests ===

#[wasm_bindgen_test]
fn test_text_fragments_in_document_order() {
    let el = container("<p>Hello <b>big</b> world</p>");
    let texts: Vec<String> = surface(&el)
        .text_fragments()
        .into_iter()
        .map(|f| f.text)
        .collect();
    assert_eq!(texts, vec!["Hello ", "big", " world"]);
    el.remove();
}

#[wasm_bindgen_test]
fn test_render_and_remove_highlight() {
    let el = container("<p>Hello   world</p>");
    let mut controller = BrowserController::new(surface(&el), AnnotatorConfig::new("1"));

    let outcome = controller.show_annotation(&annotation("5", 6, 11, "world"));
    assert_eq!(outcome, RenderOutcome::Rendered);

    let mark = el.query_selector("mark.ann[data-id='5']").unwrap().unwrap();
    assert_eq!(mark.text_content().unwrap(), "world");
    assert_eq!(mark.get_attribute("title").as_deref(), Some("a note"));
    assert_eq!(controller.surface().highlight_spans().len(), 1);

    // A second render is a no-op.
    let again = controller.show_annotation(&annotation("5", 6, 11, "world"));
    assert_eq!(again, RenderOutcome::AlreadyRendered);
    assert_eq!(el.query_selector_all("mark").unwrap().length(), 1);

    let removed = remove_highlights(controller.surface_mut(), &"5".into());
    assert_eq!(removed, 1);
    assert!(el.query_selector("mark").unwrap().is_none());
    assert_eq!(el.text_content().unwrap(), "Hello   world");
    el.remove();
}

#[wasm_bindgen_test]
fn test_highlight_spanning_elements() {
    let el = container("<p>one <em>two</em></p><p>three</p>");
    let mut controller = BrowserController::new(surface(&el), AnnotatorConfig::new("1"));

    // Adjacent blocks contribute no whitespace: the text is "one twothree".
    let outcome = controller.render_annotation(&annotation("9", 4, 12, "twothree"));
    assert_eq!(outcome, RenderOutcome::Rendered);

    let marks: String = controller
        .surface()
        .spans_for(&"9".into())
        .iter()
        .filter_map(|span| span.text_content())
        .collect();
    assert_eq!(marks, "twothree");
    el.remove();
}

#[wasm_bindgen_test]
fn test_emoji_offsets_count_chars() {
    let el = container("<p>a😀b cd</p>");
    let mut controller = BrowserController::new(surface(&el), AnnotatorConfig::new("1"));

    let outcome = controller.render_annotation(&annotation("3", 1, 3, "😀b"));
    assert_eq!(outcome, RenderOutcome::Rendered);

    let mark = el.query_selector("mark").unwrap().unwrap();
    assert_eq!(mark.text_content().unwrap(), "😀b");
    el.remove();
}

#[wasm_bindgen_test]
fn test_overlapping_highlights_stay_clickable() {
    let el = container("<p>one two three four five</p>");
    let mut controller = BrowserController::new(surface(&el), AnnotatorConfig::new("1"));

    // B overlaps the start of A and C its end, so extraction clones A's mark.
    let ticket = controller.begin_load();
    let summary = controller.finish_load(
        ticket,
        vec![
            annotation("a", 8, 18, "three four"),
            annotation("b", 4, 13, "two three"),
            annotation("c", 14, 23, "four five"),
        ],
    );
    assert_eq!(summary.rendered, 3);
    assert_eq!(el.text_content().unwrap(), "one two three four five");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _listeners = events::attach(&document(), &el, &HostElements::default(), false, &tx);

    for id in ["a", "b", "c"] {
        let id = AnnotationId::from(id);
        let spans = controller.surface().spans_for(&id);
        assert_eq!(spans.len(), 1, "{id}");
        let mark: web_sys::HtmlElement = spans[0].clone().dyn_into().unwrap();
        assert_eq!(highlight_at(&mark), Some(id.clone()));

        mark.click();
        assert_eq!(rx.try_recv().ok(), Some(UiEvent::OpenDetail(id)));
    }
    assert!(rx.try_recv().is_err());
    el.remove();
}

#[wasm_bindgen_test]
fn test_click_outside_highlight_opens_nothing() {
    let el = container("<p>Hello <b>bold</b> world</p>");
    let mut controller = BrowserController::new(surface(&el), AnnotatorConfig::new("1"));
    controller.render_annotation(&annotation("2", 0, 5, "Hello"));

    let bold = el.query_selector("b").unwrap().unwrap();
    assert_eq!(highlight_at(&bold), None);
    let mark = el.query_selector("mark").unwrap().unwrap();
    assert_eq!(highlight_at(&mark), Some("2".into()));
    el.remove();
}

// === List tests ===

#[wasm_bindgen_test]
fn test_list_prepends_newest_first() {
    let el = container("");
    let mut list = DomList::new(el.clone());

    let mut first = annotation("1", 0, 3, "one");
    first.can_delete = false;
    list.prepend(&ListEntry::from_annotation(&first, 64)).unwrap();
    list.prepend(&ListEntry::from_annotation(&annotation("2", 4, 7, "two"), 64))
        .unwrap();

    let top = el.first_element_child().unwrap();
    assert_eq!(top.get_attribute("data-id").as_deref(), Some("2"));
    assert!(top.query_selector(".ann-del").unwrap().is_some());
    assert!(list.contains(&"1".into()));

    let snapshot = list.snapshot(&"1".into()).unwrap();
    assert_eq!(snapshot.note.as_deref(), Some("a note"));
    assert!(!snapshot.can_delete);

    assert!(list.remove(&"2".into()));
    assert!(!list.remove(&"2".into()));
    assert_eq!(el.child_element_count(), 1);
    el.remove();
}

#[wasm_bindgen_test]
fn test_list_item_click_reveals_and_opens_detail() {
    let el = container("");
    let mut list = DomList::new(el.clone());
    list.prepend(&ListEntry::from_annotation(&annotation("4", 0, 3, "one"), 64))
        .unwrap();

    let note = el.query_selector(".ann-note").unwrap().unwrap();
    assert_eq!(
        list_click(&note),
        vec![UiEvent::Reveal("4".into()), UiEvent::OpenDetail("4".into())]
    );

    let link = el.query_selector(".ann-del").unwrap().unwrap();
    assert_eq!(list_click(&link), vec![UiEvent::Delete("4".into())]);

    assert!(list_click(&el).is_empty());
    el.remove();
}

// === Selection tests ===

#[wasm_bindgen_test]
fn test_read_selection_in_text() {
    let el = container("<p>a😀b cd</p>");
    let text = el.first_child().unwrap().first_child().unwrap();
    // UTF-16 1..4 covers the emoji and "b".
    select((&text, 1), (&text, 4));

    let RawSelection::Range(range) = read_selection(&el) else {
        panic!("expected a range");
    };
    assert_eq!(range.start.node, text);
    assert_eq!(range.start.offset, 1);
    assert_eq!(range.end.offset, 3);
    el.remove();
}

#[wasm_bindgen_test]
fn test_read_selection_element_boundaries() {
    let el = container("<p>one <b>two</b></p>");
    let p: web_sys::Node = el.first_child().unwrap();
    select((&p, 0), (&p, 2));

    let RawSelection::Range(range) = read_selection(&el) else {
        panic!("expected a range");
    };
    assert_eq!(range.start.node.text_content().unwrap(), "one ");
    assert_eq!(range.start.offset, 0);
    assert_eq!(range.end.node.text_content().unwrap(), "two");
    assert_eq!(range.end.offset, 3);
    el.remove();
}

#[wasm_bindgen_test]
fn test_read_selection_outside_container() {
    let el = container("<p>inside</p>");
    let outside = container("<p>outside</p>");
    let text = outside.first_child().unwrap().first_child().unwrap();
    select((&text, 0), (&text, 3));

    assert!(matches!(read_selection(&el), RawSelection::OutOfBounds));

    let inner = el.first_child().unwrap().first_child().unwrap();
    select((&inner, 2), (&inner, 2));
    assert!(matches!(read_selection(&el), RawSelection::Collapsed));

    el.remove();
    outside.remove();
}
