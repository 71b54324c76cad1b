use crate::element::Element;
use crate::registry::Registry;
use std::rc::Rc;
use tracing::trace;

/// Forwards newly inserted control markers to the [`Registry`].
///
/// There is no ambient observation of the tree: the host calls
/// [`element_inserted`](StructureWatcher::element_inserted) for every
/// subtree it inserts. Elements that already carry their behavior are left
/// to the registry's idempotency rule.
#[derive(Debug, Clone)]
pub struct StructureWatcher {
    registry: Rc<Registry>,
    marker: String,
}

impl StructureWatcher {
    pub fn new(registry: Rc<Registry>, marker: impl Into<String>) -> Self {
        Self {
            registry,
            marker: marker.into(),
        }
    }

    /// Report an insertion. Every node of the inserted subtree carrying the
    /// control marker is handed to [`Registry::attach`]; returns how many.
    pub fn element_inserted(&self, el: &Element) -> usize {
        let mut forwarded = 0;
        for node in el.subtree() {
            if node.attribute(&self.marker).is_none() {
                continue;
            }
            trace!(marker = self.marker.as_str(), "control inserted");
            // Unknown controls are logged by the registry and skipped.
            let _ = self.registry.attach(&node);
            forwarded += 1;
        }
        forwarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::options::RuntimeOptions;

    #[test]
    fn forwards_marked_nodes_only() {
        let registry = Rc::new(Registry::new(&RuntimeOptions::default()));
        registry.start(&Element::new("body"));
        registry.document_loaded();
        registry.define("lamp", Behavior::builder("lamp").value("on", "0").build());
        let watcher = StructureWatcher::new(Rc::clone(&registry), "u-is");

        let lamp = Element::new("div").with_attribute("u-is", "lamp");
        let tree = Element::new("section")
            .with_child(Element::new("p"))
            .with_child(lamp.clone());

        assert_eq!(watcher.element_inserted(&tree), 1);
        assert!(lamp.behavior().is_some());
        assert_eq!(registry.widgets(), vec![lamp.clone()]);

        // a second report changes nothing
        assert_eq!(watcher.element_inserted(&lamp), 1);
        assert_eq!(registry.widgets().len(), 1);
    }

    #[test]
    fn insertions_before_load_are_queued() {
        let registry = Rc::new(Registry::new(&RuntimeOptions::default()));
        registry.start(&Element::new("body"));
        let watcher = StructureWatcher::new(Rc::clone(&registry), "u-is");

        watcher.element_inserted(&Element::new("div").with_attribute("u-is", "lamp"));
        assert_eq!(registry.pending().len(), 1);
    }
}
