//! A small single-threaded element tree for behaviors to attach to.
//!
//! [`Element`] is a cheap, reference-counted handle; clones refer to the same
//! node and compare equal. Besides markup structure (tag, attributes,
//! children, text) every element carries the live state a widget needs:
//! string properties, installed methods, event listeners and the behavior it
//! is attached to.
//!
//! Nothing here observes the tree. Hosts report insertions explicitly, see
//! [`StructureWatcher`](crate::StructureWatcher).

use crate::behavior::{Behavior, Handler, Method};
use crate::template::Props;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Element(String),
    Text,
}

struct Node {
    id: ElementId,
    kind: Kind,
    parent: RefCell<Weak<Node>>,
    children: RefCell<Vec<Element>>,
    attributes: RefCell<IndexMap<String, String>>,
    text: RefCell<String>,
    properties: RefCell<IndexMap<String, String>>,
    methods: RefCell<IndexMap<String, Method>>,
    listeners: RefCell<IndexMap<String, Vec<Handler>>>,
    behavior: RefCell<Option<Rc<Behavior>>>,
    params: RefCell<Props>,
    data: RefCell<Props>,
}

/// Handle to a node of the tree.
#[derive(Clone)]
pub struct Element(Rc<Node>);

/// Non-owning handle, for callbacks that must not keep a widget alive.
#[derive(Clone)]
pub struct WeakElement(Weak<Node>);

impl WeakElement {
    pub fn upgrade(&self) -> Option<Element> {
        self.0.upgrade().map(Element)
    }
}

/// An event travelling from its target up through the ancestors.
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    target: Element,
}

impl Event {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The element the event was dispatched on.
    pub fn target(&self) -> &Element {
        &self.target
    }
}

impl Element {
    fn from_kind(kind: Kind, text: String) -> Self {
        Element(Rc::new(Node {
            id: ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(IndexMap::new()),
            text: RefCell::new(text),
            properties: RefCell::new(IndexMap::new()),
            methods: RefCell::new(IndexMap::new()),
            listeners: RefCell::new(IndexMap::new()),
            behavior: RefCell::new(None),
            params: RefCell::new(Props::new()),
            data: RefCell::new(Props::new()),
        }))
    }

    /// Create an element node. Tag names are stored lower-case.
    pub fn new(tag: &str) -> Self {
        Self::from_kind(Kind::Element(tag.to_lowercase()), String::new())
    }

    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_kind(Kind::Text, content.into())
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(self, child: Element) -> Self {
        self.append_child(&child);
        self
    }

    /// Builder-style text child append.
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.append_child(&Element::text(content));
        self
    }

    pub fn id(&self) -> ElementId {
        self.0.id
    }

    pub fn downgrade(&self) -> WeakElement {
        WeakElement(Rc::downgrade(&self.0))
    }

    /// Tag name, or `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            Kind::Element(tag) => Some(tag),
            Kind::Text => None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.0.kind == Kind::Text
    }

    // -- structure --------------------------------------------------------

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.borrow().upgrade().map(Element)
    }

    pub fn children(&self) -> Vec<Element> {
        self.0.children.borrow().clone()
    }

    /// Append `child`, detaching it from its current parent first.
    pub fn append_child(&self, child: &Element) {
        child.remove();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Detach from the parent, if any.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent.0.children.borrow_mut().retain(|c| c != self);
        }
        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// Whether `ancestor` is a strict ancestor of this node.
    pub fn is_inside(&self, ancestor: &Element) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if &node == ancestor {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants(&self, out: &mut Vec<Element>) {
        for child in self.0.children.borrow().iter() {
            out.push(child.clone());
            child.collect_descendants(out);
        }
    }

    /// `self` followed by its descendants.
    pub fn subtree(&self) -> Vec<Element> {
        let mut out = vec![self.clone()];
        self.collect_descendants(&mut out);
        out
    }

    /// First node in the subtree whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<Element> {
        self.subtree()
            .into_iter()
            .find(|el| el.attribute("id").as_deref() == Some(id))
    }

    /// Descendants carrying attribute `name`, optionally with the given value.
    pub fn query_attribute(&self, name: &str, value: Option<&str>) -> Vec<Element> {
        self.descendants()
            .into_iter()
            .filter(|el| match (el.attribute(name), value) {
                (Some(actual), Some(wanted)) => actual == wanted,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }

    /// First descendant with the given class.
    pub fn query_class(&self, class: &str) -> Option<Element> {
        self.descendants().into_iter().find(|el| el.has_class(class))
    }

    /// Copy structure, attributes and text. Live widget state (properties,
    /// methods, listeners, behavior) is not cloned.
    pub fn deep_clone(&self) -> Element {
        let copy = Element::from_kind(self.0.kind.clone(), self.0.text.borrow().clone());
        *copy.0.attributes.borrow_mut() = self.0.attributes.borrow().clone();
        for child in self.0.children.borrow().iter() {
            copy.append_child(&child.deep_clone());
        }
        copy
    }

    // -- attributes and text ----------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(&name.to_lowercase()).cloned()
    }

    /// Attribute names are case-insensitive and stored lower-case.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        self.0
            .attributes
            .borrow_mut()
            .insert(name.to_lowercase(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) {
        self.0
            .attributes
            .borrow_mut()
            .shift_remove(&name.to_lowercase());
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.0
            .attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|list| list.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Add or remove a class name.
    pub fn toggle_class(&self, class: &str, on: bool) {
        let current = self.attribute("class").unwrap_or_default();
        let mut classes: Vec<&str> = current
            .split_whitespace()
            .filter(|c| *c != class)
            .collect();
        if on {
            classes.push(class);
        }
        self.set_attribute("class", classes.join(" "));
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.0.text.borrow().clone();
        }
        self.descendants()
            .iter()
            .filter(|el| el.is_text())
            .map(|el| el.0.text.borrow().clone())
            .collect()
    }

    /// Replace the text of a text node, or the children of an element with a
    /// single text node.
    pub fn set_text_content(&self, content: impl Into<String>) {
        if self.is_text() {
            *self.0.text.borrow_mut() = content.into();
            return;
        }
        for child in self.children() {
            child.remove();
        }
        self.append_child(&Element::text(content));
    }

    // -- widget state -----------------------------------------------------

    pub fn property(&self, name: &str) -> Option<String> {
        self.0.properties.borrow().get(name).cloned()
    }

    pub fn set_property(&self, name: &str, value: impl Into<String>) {
        self.0
            .properties
            .borrow_mut()
            .insert(name.to_string(), value.into());
    }

    pub fn clear_property(&self, name: &str) {
        self.0.properties.borrow_mut().shift_remove(name);
    }

    /// A property counts as unset when it is missing or empty.
    pub fn is_property_unset(&self, name: &str) -> bool {
        self.0
            .properties
            .borrow()
            .get(name)
            .map_or(true, String::is_empty)
    }

    /// Props the element was instantiated from, if it came from a template.
    pub fn params(&self) -> Props {
        self.0.params.borrow().clone()
    }

    pub(crate) fn set_params(&self, props: &Props) {
        *self.0.params.borrow_mut() = props.clone();
    }

    /// Values a widget has received, keyed by name, in arrival order.
    pub fn data(&self) -> Props {
        self.0.data.borrow().clone()
    }

    pub fn set_data(&self, key: &str, value: impl Into<String>) {
        self.0.data.borrow_mut().insert(key.to_string(), value.into());
    }

    pub fn clear_data(&self) {
        self.0.data.borrow_mut().clear();
    }

    pub fn set_method(&self, name: &str, method: Method) {
        self.0
            .methods
            .borrow_mut()
            .insert(name.to_string(), method);
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.0.methods.borrow().contains_key(name)
    }

    /// Call an installed method. Returns `None` when the method is missing
    /// or returned nothing.
    pub fn call(&self, name: &str, args: &[&str]) -> Option<String> {
        let method = self.0.methods.borrow().get(name).cloned()?;
        method(self, args)
    }

    pub fn add_listener(&self, event: &str, handler: Handler) {
        self.0
            .listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.0.listeners.borrow().get(event).map_or(0, Vec::len)
    }

    /// Deliver an event to this node and then to each ancestor in turn.
    pub fn dispatch_event(&self, kind: &str) {
        let event = Event {
            kind: kind.to_string(),
            target: self.clone(),
        };
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let handlers = node.0.listeners.borrow().get(kind).cloned();
            for handler in handlers.into_iter().flatten() {
                handler(&node, &event);
            }
            current = node.parent();
        }
    }

    /// The behavior attached to this element, if any.
    pub fn behavior(&self) -> Option<Rc<Behavior>> {
        self.0.behavior.borrow().clone()
    }

    pub(crate) fn set_behavior(&self, behavior: Rc<Behavior>) {
        *self.0.behavior.borrow_mut() = Some(behavior);
    }

    /// Nearest node, starting with `self`, that has a behavior attached.
    pub fn closest_widget(&self) -> Option<Element> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.behavior().is_some() {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            Kind::Element(tag) => f
                .debug_struct("Element")
                .field("id", &self.0.id)
                .field("tag", tag)
                .field("attributes", &*self.0.attributes.borrow())
                .finish(),
            Kind::Text => f
                .debug_tuple("Text")
                .field(&*self.0.text.borrow())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn append_sets_parent_and_moves_nodes() {
        let a = Element::new("div");
        let b = Element::new("div");
        let child = Element::new("span");

        a.append_child(&child);
        assert_eq!(child.parent(), Some(a.clone()));
        b.append_child(&child);
        assert!(a.children().is_empty());
        assert_eq!(b.children(), vec![child.clone()]);
        assert!(child.is_inside(&b));
        assert!(!child.is_inside(&a));
    }

    #[test]
    fn attribute_names_ignore_case() {
        let el = Element::new("DIV").with_attribute("U-Is", "timer");
        assert_eq!(el.tag(), Some("div"));
        assert_eq!(el.attribute("u-is").as_deref(), Some("timer"));
        assert_eq!(el.attributes(), vec![("u-is".into(), "timer".into())]);
    }

    #[test]
    fn text_content_round_trip() {
        let el = Element::new("p")
            .with_text("a")
            .with_child(Element::new("b").with_text("b"));
        assert_eq!(el.text_content(), "ab");
        el.set_text_content("c");
        assert_eq!(el.text_content(), "c");
        assert_eq!(el.children().len(), 1);
    }

    #[test]
    fn deep_clone_copies_markup_only() {
        let el = Element::new("div")
            .with_attribute("class", "card")
            .with_child(Element::new("span").with_text("x"));
        el.set_property("value", "1");
        el.set_data("id", "/card/c1");

        let copy = el.deep_clone();
        assert_ne!(copy, el);
        assert_ne!(copy.id(), el.id());
        assert_eq!(copy.attribute("class").as_deref(), Some("card"));
        assert_eq!(copy.text_content(), "x");
        assert_eq!(copy.property("value"), None);
        assert!(copy.data().is_empty());
        assert!(copy.parent().is_none());
    }

    #[test]
    fn queries() {
        let root = Element::new("div")
            .with_child(Element::new("span").with_attribute("u-text", "a"))
            .with_child(
                Element::new("div")
                    .with_attribute("id", "inner")
                    .with_attribute("class", "x current")
                    .with_child(Element::new("span").with_attribute("u-text", "b")),
            );
        assert_eq!(root.query_attribute("u-text", None).len(), 2);
        assert_eq!(root.query_attribute("u-text", Some("b")).len(), 1);
        assert!(root.find_by_id("inner").is_some());
        assert!(root.query_class("current").is_some());
        assert!(root.query_class("missing").is_none());
    }

    #[test]
    fn toggle_class_adds_and_removes() {
        let el = Element::new("span").with_attribute("class", "dot");
        el.toggle_class("active", true);
        assert!(el.has_class("active"));
        assert!(el.has_class("dot"));
        el.toggle_class("active", false);
        assert!(!el.has_class("active"));
    }

    #[test]
    fn events_bubble_to_ancestors() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let outer = Element::new("div").with_attribute("id", "outer");
        let inner = Element::new("button").with_attribute("id", "inner");
        outer.append_child(&inner);

        let s = Rc::clone(&seen);
        outer.add_listener(
            "click",
            Rc::new(move |owner: &Element, event: &Event| {
                s.borrow_mut().push(format!(
                    "{}<-{}",
                    owner.attribute("id").unwrap(),
                    event.target().attribute("id").unwrap()
                ));
            }),
        );
        inner.dispatch_event("click");
        inner.dispatch_event("change");
        assert_eq!(*seen.borrow(), vec!["outer<-inner"]);
    }

    #[test]
    fn unset_properties() {
        let el = Element::new("div");
        assert!(el.is_property_unset("x"));
        el.set_property("x", "");
        assert!(el.is_property_unset("x"));
        el.set_property("x", "1");
        assert!(!el.is_property_unset("x"));
        el.clear_property("x");
        assert_eq!(el.property("x"), None);
    }

    #[test]
    fn methods_are_called_with_their_element() {
        let el = Element::new("div").with_attribute("id", "me");
        el.set_method(
            "whoami",
            Rc::new(|el: &Element, args: &[&str]| {
                Some(format!("{}:{}", el.attribute("id")?, args.join(",")))
            }),
        );
        assert_eq!(el.call("whoami", &["a", "b"]).as_deref(), Some("me:a,b"));
        assert_eq!(el.call("missing", &[]), None);
    }

    #[test]
    fn weak_handles_do_not_keep_nodes_alive() {
        let el = Element::new("div");
        let weak = el.downgrade();
        assert!(weak.upgrade().is_some());
        drop(el);
        assert!(weak.upgrade().is_none());
    }
}
