//! DOM-backed sidebar list, detail popup and create popover.
//!
//! Markup mirrors what the page stylesheet expects: list items are
//! `.item[data-id][data-can-delete]` with an `.ann-note` line and `.muted`
//! comment lines, and popups toggle a `hidden` class.

use marginalia_core::{
    AnnotationId, CreatePopover, DetailContent, DetailView, HostElements, ListEntry,
    ListEntrySnapshot, ListView, PlatformError,
};
use wasm_bindgen::JsCast;

/// Class toggled to show and hide popups.
pub const HIDDEN_CLASS: &str = "hidden";
/// Class of the delete link in a list item.
pub const DELETE_LINK_CLASS: &str = "ann-del";
pub const ITEM_CLASS: &str = "item";

fn js_err(what: &str) -> impl Fn(wasm_bindgen::JsValue) -> PlatformError + '_ {
    move |e| PlatformError(format!("{what} failed: {e:?}"))
}

fn element(
    document: &web_sys::Document,
    tag: &str,
    class: Option<&str>,
    text: Option<&str>,
) -> Result<web_sys::Element, PlatformError> {
    let el = document.create_element(tag).map_err(js_err("create_element"))?;
    if let Some(class) = class {
        el.set_class_name(class);
    }
    if text.is_some() {
        el.set_text_content(text);
    }
    Ok(el)
}

fn append(parent: &web_sys::Element, child: &web_sys::Node) -> Result<(), PlatformError> {
    parent.append_child(child).map_err(js_err("append_child"))?;
    Ok(())
}

/// The `#ann-list` sidebar.
pub struct DomList {
    container: web_sys::Element,
}

impl DomList {
    pub fn new(container: web_sys::Element) -> Self {
        Self { container }
    }

    /// Look the list up on the page; it is optional.
    pub fn find(document: &web_sys::Document, elements: &HostElements) -> Option<Self> {
        document.get_element_by_id(&elements.list_id).map(Self::new)
    }

    pub fn container(&self) -> &web_sys::Element {
        &self.container
    }

    fn item(&self, id: &AnnotationId) -> Option<web_sys::Element> {
        let items = self
            .container
            .query_selector_all(&format!(".{ITEM_CLASS}[data-id]"))
            .ok()?;
        (0..items.length())
            .filter_map(|i| items.get(i))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .find(|item| item.get_attribute("data-id").as_deref() == Some(id.as_str()))
    }

    fn build_item(&self, entry: &ListEntry) -> Result<web_sys::Element, PlatformError> {
        let document = self
            .container
            .owner_document()
            .ok_or("list has no document")?;

        let item = element(&document, "div", Some(ITEM_CLASS), None)?;
        item.set_attribute("data-id", entry.id.as_str())
            .map_err(js_err("set_attribute"))?;
        item.set_attribute("data-can-delete", if entry.can_delete { "1" } else { "0" })
            .map_err(js_err("set_attribute"))?;

        let header = element(&document, "div", None, None)?;
        append(&header, &element(&document, "strong", None, Some(&entry.author))?.into())?;
        append(&header, &document.create_text_node(" — "))?;
        append(&header, &element(&document, "em", None, Some(&entry.anchor_label))?.into())?;
        if entry.can_delete {
            let link = element(&document, "a", Some(DELETE_LINK_CLASS), Some("🗑 Delete"))?;
            link.set_attribute("href", "#").map_err(js_err("set_attribute"))?;
            link.set_attribute("data-id", entry.id.as_str())
                .map_err(js_err("set_attribute"))?;
            link.set_attribute("style", "margin-left:8px;")
                .map_err(js_err("set_attribute"))?;
            append(&header, &link)?;
        }
        append(&item, &header)?;

        if let Some(note) = entry.note.as_deref() {
            append(&item, &element(&document, "div", Some("ann-note"), Some(note))?.into())?;
        }
        for line in &entry.comment_lines {
            append(&item, &element(&document, "div", Some("muted"), Some(line))?.into())?;
        }
        Ok(item)
    }
}

impl ListView for DomList {
    fn contains(&self, id: &AnnotationId) -> bool {
        self.item(id).is_some()
    }

    fn prepend(&mut self, entry: &ListEntry) -> Result<(), PlatformError> {
        let item = self.build_item(entry)?;
        self.container
            .insert_before(&item, self.container.first_child().as_ref())
            .map_err(js_err("insert_before"))?;
        Ok(())
    }

    fn remove(&mut self, id: &AnnotationId) -> bool {
        match self.item(id) {
            Some(item) => {
                item.remove();
                true
            }
            None => false,
        }
    }

    fn snapshot(&self, id: &AnnotationId) -> Option<ListEntrySnapshot> {
        let item = self.item(id)?;
        let note = item
            .query_selector(":scope > .ann-note")
            .ok()
            .flatten()
            .and_then(|n| n.text_content());
        let comment_lines = item
            .query_selector_all(".muted")
            .map(|list| {
                (0..list.length())
                    .filter_map(|i| list.get(i))
                    .filter_map(|n| n.text_content())
                    .collect()
            })
            .unwrap_or_default();

        Some(ListEntrySnapshot {
            note,
            comment_lines,
            can_delete: item.get_attribute("data-can-delete").as_deref() == Some("1"),
        })
    }
}

/// The read-only `#ann-view` popup.
pub struct DomDetail {
    popup: web_sys::Element,
    content: web_sys::Element,
    delete: Option<web_sys::HtmlElement>,
}

impl DomDetail {
    /// Needs both the popup and its content area.
    pub fn find(document: &web_sys::Document, elements: &HostElements) -> Option<Self> {
        let popup = document.get_element_by_id(&elements.view_id)?;
        let content = document.get_element_by_id(&elements.view_content_id)?;
        let delete = document
            .get_element_by_id(&elements.view_delete_id)
            .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok());
        Some(Self {
            popup,
            content,
            delete,
        })
    }
}

impl DetailView for DomDetail {
    fn show(&mut self, content: &DetailContent) {
        self.content.set_text_content(Some(&content.text));
        let _ = self.popup.set_attribute("data-id", content.id.as_str());
        if let Some(delete) = &self.delete {
            let display = if content.can_delete { "" } else { "none" };
            let _ = delete.style().set_property("display", display);
        }
        let _ = self.popup.class_list().remove_1(HIDDEN_CLASS);
    }

    fn hide(&mut self) {
        let _ = self.popup.class_list().add_1(HIDDEN_CLASS);
    }

    fn shown_id(&self) -> Option<AnnotationId> {
        if self.popup.class_list().contains(HIDDEN_CLASS) {
            return None;
        }
        self.popup
            .get_attribute("data-id")
            .map(|id| AnnotationId::from(id.as_str()))
    }
}

/// The `#ann-pop` create popover plus the `#annotate-btn` affordance.
pub struct DomPopover {
    popup: web_sys::Element,
    note: Option<web_sys::Element>,
    button: Option<web_sys::HtmlButtonElement>,
}

impl DomPopover {
    pub fn find(document: &web_sys::Document, elements: &HostElements) -> Option<Self> {
        let popup = document.get_element_by_id(&elements.popover_id)?;
        Some(Self {
            popup,
            note: document.get_element_by_id(&elements.note_input_id),
            button: document
                .get_element_by_id(&elements.annotate_button_id)
                .and_then(|el| el.dyn_into::<web_sys::HtmlButtonElement>().ok()),
        })
    }

    fn set_note(&self, value: &str) {
        let Some(note) = &self.note else { return };
        if let Some(area) = note.dyn_ref::<web_sys::HtmlTextAreaElement>() {
            area.set_value(value);
        } else if let Some(input) = note.dyn_ref::<web_sys::HtmlInputElement>() {
            input.set_value(value);
        }
    }
}

impl CreatePopover for DomPopover {
    fn open(&mut self) {
        let _ = self.popup.class_list().remove_1(HIDDEN_CLASS);
        self.set_note("");
    }

    fn close(&mut self) {
        let _ = self.popup.class_list().add_1(HIDDEN_CLASS);
    }

    fn note(&self) -> String {
        let Some(note) = &self.note else {
            return String::new();
        };
        if let Some(area) = note.dyn_ref::<web_sys::HtmlTextAreaElement>() {
            area.value()
        } else if let Some(input) = note.dyn_ref::<web_sys::HtmlInputElement>() {
            input.value()
        } else {
            String::new()
        }
    }

    fn set_affordance_enabled(&mut self, enabled: bool) {
        if let Some(button) = &self.button {
            button.set_disabled(!enabled);
        }
    }
}
