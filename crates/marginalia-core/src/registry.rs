//! The set of annotation ids currently drawn, plus change observers.
//!
//! One registry per document view. An id goes in only after its highlight
//! span is confirmed in the document and comes out only after every span
//! for it is gone.

use std::collections::HashSet;
use std::fmt;

use crate::types::AnnotationId;

/// A change to what the list shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A list entry was inserted.
    Listed(AnnotationId),
    /// An annotation was torn down after a delete.
    Removed(AnnotationId),
}

type Listener = Box<dyn Fn(&RegistryEvent)>;

/// Known-ids set with fire-and-forget change notifications.
#[derive(Default)]
pub struct Registry {
    known: HashSet<AnnotationId>,
    listeners: Vec<Listener>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, id: &AnnotationId) -> bool {
        self.known.contains(id)
    }

    /// Record `id` as rendered. Returns false if it already was.
    pub fn add(&mut self, id: AnnotationId) -> bool {
        self.known.insert(id)
    }

    /// Forget `id`. Returns false if it was not known.
    pub fn remove(&mut self, id: &AnnotationId) -> bool {
        self.known.remove(id)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Subscribe to change notifications (counters, filters, ...).
    pub fn on_changed(&mut self, listener: impl Fn(&RegistryEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Tell every listener about `event`.
    pub fn notify(&self, event: RegistryEvent) {
        tracing::trace!(target: "marginalia::registry", ?event, "registry changed");
        for listener in &self.listeners {
            listener(&event);
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("known", &self.known)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_add_remove() {
        let mut reg = Registry::new();
        let id = AnnotationId::from("1");
        assert!(!reg.has(&id));
        assert!(reg.add(id.clone()));
        assert!(!reg.add(id.clone()));
        assert!(reg.has(&id));
        assert_eq!(reg.len(), 1);
        assert!(reg.remove(&id));
        assert!(!reg.remove(&id));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_listeners_see_every_event() {
        let mut reg = Registry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        reg.on_changed(move |event| sink.borrow_mut().push(event.clone()));

        reg.notify(RegistryEvent::Listed("1".into()));
        reg.notify(RegistryEvent::Removed("1".into()));

        assert_eq!(
            *seen.borrow(),
            vec![
                RegistryEvent::Listed("1".into()),
                RegistryEvent::Removed("1".into())
            ]
        );
    }
}
