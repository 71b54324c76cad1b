//! The behavior registry and its attachment lifecycle.
//!
//! The registry moves through three states:
//!
//! ```text
//! Prep --start()--> Init --document_loaded()--> Loaded
//! ```
//!
//! [`start`](Registry::start) locates (or creates) the template container
//! and collects the templates in it. Until the host reports that the document
//! has loaded, elements handed to [`attach`](Registry::attach) are queued;
//! the queue is flushed once, in discovery order, on entry to `Loaded`.
//! From then on attachment is immediate.

use crate::behavior::{event_name, Behavior, Member};
use crate::element::Element;
use crate::error::{RegistryError, Result};
use crate::markup::parse_fragment;
use crate::options::RuntimeOptions;
use crate::template::{Props, TemplateRepository};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Method called when a widget goes live.
pub const CONNECTED_HOOK: &str = "connected";
/// Fallback for [`CONNECTED_HOOK`].
pub const INIT_HOOK: &str = "init";
/// Method called on teardown.
pub const TERM_HOOK: &str = "term";

/// Lifecycle of a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Before [`Registry::start`].
    #[default]
    Prep,
    /// Template container established, waiting for the document.
    Init,
    /// Attachment is immediate.
    Loaded,
}

/// Maps control-type names to behaviors and attaches them to elements.
pub struct Registry {
    control_attribute: String,
    behavior_attribute: String,
    container_id: String,
    state: Cell<LifecycleState>,
    behaviors: RefCell<IndexMap<String, Rc<Behavior>>>,
    templates: RefCell<TemplateRepository>,
    container: RefCell<Option<Element>>,
    pending: RefCell<Vec<Element>>,
    widgets: RefCell<Vec<Element>>,
}

impl Registry {
    pub fn new(options: &RuntimeOptions) -> Self {
        Self {
            control_attribute: options.control_attribute.clone(),
            behavior_attribute: options.behavior_attribute.clone(),
            container_id: options.template_container_id.clone(),
            state: Cell::new(LifecycleState::Prep),
            behaviors: RefCell::new(IndexMap::new()),
            templates: RefCell::new(TemplateRepository::new(&options.template_attribute)),
            container: RefCell::new(None),
            pending: RefCell::new(Vec::new()),
            widgets: RefCell::new(Vec::new()),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Register `behavior` under `name`. Names are case-insensitive; a later
    /// definition replaces an earlier one.
    pub fn define(&self, name: &str, behavior: Rc<Behavior>) {
        let name = name.to_lowercase();
        let replaced = self
            .behaviors
            .borrow_mut()
            .insert(name.clone(), behavior)
            .is_some();
        debug!(name = name.as_str(), replaced, "behavior defined");
    }

    pub fn behavior(&self, name: &str) -> Option<Rc<Behavior>> {
        self.behaviors.borrow().get(&name.to_lowercase()).cloned()
    }

    /// Enter `Init`: find the template container under `document` by id,
    /// creating it when missing, and load the templates it holds.
    ///
    /// Calling this again returns the existing container.
    pub fn start(&self, document: &Element) -> Element {
        if let Some(container) = self.container() {
            return container;
        }
        let container = document.find_by_id(&self.container_id).unwrap_or_else(|| {
            let created = Element::new("div").with_attribute("id", &self.container_id);
            document.append_child(&created);
            created
        });
        self.templates.borrow_mut().load(&container);
        *self.container.borrow_mut() = Some(container.clone());
        self.state.set(LifecycleState::Init);
        debug!(templates = self.templates.borrow().len(), "registry started");
        container
    }

    /// Enter `Loaded` and attach everything queued so far, in order.
    ///
    /// Returns `false` when the registry was not in `Init`.
    pub fn document_loaded(&self) -> bool {
        match self.state.get() {
            LifecycleState::Init => {}
            LifecycleState::Prep => {
                warn!("document loaded before the registry was started");
                return false;
            }
            LifecycleState::Loaded => return false,
        }
        self.state.set(LifecycleState::Loaded);
        let queued = std::mem::take(&mut *self.pending.borrow_mut());
        debug!(count = queued.len(), "flushing queued attachments");
        for el in queued {
            // Failures are already logged by attach_now.
            let _ = self.attach_now(&el);
        }
        true
    }

    /// Attach `el` now if the registry is loaded, otherwise queue it.
    pub fn attach(&self, el: &Element) -> Result<(), RegistryError> {
        if self.state.get() == LifecycleState::Loaded {
            self.attach_now(el).map(|_| ())
        } else {
            self.pending.borrow_mut().push(el.clone());
            Ok(())
        }
    }

    /// Elements waiting for the `Loaded` transition.
    pub fn pending(&self) -> Vec<Element> {
        self.pending.borrow().clone()
    }

    fn attach_now(&self, el: &Element) -> Result<bool, RegistryError> {
        let Some(name) = el.attribute(&self.control_attribute) else {
            warn!(
                marker = self.control_attribute.as_str(),
                "element without a control marker cannot be attached"
            );
            return Err(RegistryError::MissingMarker(self.control_attribute.clone()));
        };
        match self.behavior(&name) {
            Some(behavior) => Ok(self.load_behavior(el, &behavior)),
            None => {
                warn!(name = name.as_str(), "no behavior registered for control");
                Err(RegistryError::UnknownBehavior(name))
            }
        }
    }

    /// Merge `behavior` onto `el`.
    ///
    /// Attribute values pre-seed unset properties, then each member is
    /// applied: handlers become listeners, values fill unset properties,
    /// methods are installed over whatever was there. Elements outside the
    /// template container are connected and tracked as widgets.
    ///
    /// Attaching the behavior an element already carries does nothing and
    /// returns `false`.
    pub fn load_behavior(&self, el: &Element, behavior: &Rc<Behavior>) -> bool {
        if el
            .behavior()
            .is_some_and(|current| Rc::ptr_eq(&current, behavior))
        {
            return false;
        }

        for (name, value) in el.attributes() {
            if el.is_property_unset(&name) {
                el.set_property(&name, value);
            }
        }

        for (name, member) in behavior.members() {
            match member {
                Member::Handler(handler) => match event_name(name) {
                    Some(event) => el.add_listener(event, Rc::clone(handler)),
                    None => warn!(
                        behavior = behavior.name(),
                        member = name,
                        "handler member does not follow the on_<event> convention"
                    ),
                },
                Member::Value(default) => {
                    if el.is_property_unset(name) {
                        el.set_property(name, default.clone());
                    }
                }
                Member::Method(method) => el.set_method(name, Rc::clone(method)),
            }
        }
        el.set_behavior(Rc::clone(behavior));

        let is_master = self
            .container()
            .is_some_and(|container| el.is_inside(&container));
        if !is_master {
            if el.has_method(CONNECTED_HOOK) {
                el.call(CONNECTED_HOOK, &[]);
            } else if el.has_method(INIT_HOOK) {
                el.call(INIT_HOOK, &[]);
            }
            self.widgets.borrow_mut().push(el.clone());
        }
        debug!(behavior = behavior.name(), live = !is_master, "behavior attached");
        true
    }

    /// Secondary attachment: every node in `root`'s subtree carrying the
    /// behavior marker gets the named behavior, whatever the lifecycle state.
    /// Returns how many elements were newly attached.
    pub fn attach_all(&self, root: &Element) -> usize {
        let mut attached = 0;
        for el in root.subtree() {
            let Some(name) = el.attribute(&self.behavior_attribute) else {
                continue;
            };
            match self.behavior(&name) {
                Some(behavior) => {
                    if self.load_behavior(&el, &behavior) {
                        attached += 1;
                    }
                }
                None => warn!(name = name.as_str(), "no behavior registered for marker"),
            }
        }
        attached
    }

    /// Clone template `name`, fill its placeholders from `props`, append the
    /// clone under `root` and return it.
    pub fn insert_template(
        &self,
        root: &Element,
        name: &str,
        props: &Props,
    ) -> Result<Element, RegistryError> {
        if self.container().is_none() {
            warn!(name, "template requested before the registry was started");
            return Err(RegistryError::NotStarted);
        }
        let Some(clone) = self.templates.borrow().instantiate(name, props) else {
            warn!(name, "unknown template");
            return Err(RegistryError::UnknownTemplate(name.to_string()));
        };
        clone.set_params(props);
        root.append_child(&clone);
        self.attach_all(&clone);
        Ok(clone)
    }

    /// Append markup to the template container and refresh the templates.
    /// Returns the number of templates found in the container.
    pub fn load_markup(&self, markup: &str) -> Result<usize> {
        let container = self.container().ok_or(RegistryError::NotStarted)?;
        for node in parse_fragment(markup)? {
            container.append_child(&node);
        }
        let found = self.templates.borrow_mut().load(&container);
        Ok(found)
    }

    /// Tear down every tracked widget: call its `term` hook, clear the
    /// properties its attributes seeded, and forget it.
    pub fn unload(&self) {
        let widgets = std::mem::take(&mut *self.widgets.borrow_mut());
        self.pending.borrow_mut().clear();
        for widget in &widgets {
            if widget.has_method(TERM_HOOK) {
                widget.call(TERM_HOOK, &[]);
            }
            for (name, _) in widget.attributes() {
                widget.clear_property(&name);
            }
        }
        debug!(count = widgets.len(), "widgets unloaded");
    }

    /// Live widgets, in attachment order.
    pub fn widgets(&self) -> Vec<Element> {
        self.widgets.borrow().clone()
    }

    pub fn container(&self) -> Option<Element> {
        self.container.borrow().clone()
    }

    pub fn template_names(&self) -> Vec<String> {
        self.templates
            .borrow()
            .names()
            .map(str::to_string)
            .collect()
    }

    pub fn template(&self, name: &str) -> Option<Element> {
        self.templates.borrow().get(name).cloned()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("state", &self.state.get())
            .field("behaviors", &self.behaviors.borrow().keys().collect::<Vec<_>>())
            .field("pending", &self.pending.borrow().len())
            .field("widgets", &self.widgets.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tracing_test::traced_test;

    fn counting(name: &str, hook: &str, counter: &Rc<Cell<u32>>) -> Rc<Behavior> {
        let c = Rc::clone(counter);
        Behavior::builder(name)
            .method(hook, move |_, _| {
                c.set(c.get() + 1);
                None
            })
            .build()
    }

    fn started() -> (Registry, Element) {
        let registry = Registry::new(&RuntimeOptions::default());
        let document = Element::new("body");
        registry.start(&document);
        (registry, document)
    }

    #[test]
    fn start_creates_the_template_container() {
        let registry = Registry::new(&RuntimeOptions::default());
        assert_eq!(registry.state(), LifecycleState::Prep);
        let document = Element::new("body");
        let container = registry.start(&document);
        assert_eq!(container.attribute("id").as_deref(), Some("u-templates"));
        assert_eq!(container.parent(), Some(document.clone()));
        assert_eq!(registry.state(), LifecycleState::Init);
        assert_eq!(registry.start(&document), container);
    }

    #[test]
    fn start_reuses_an_existing_container() {
        let registry = Registry::new(&RuntimeOptions::default());
        let container = Element::new("div")
            .with_attribute("id", "u-templates")
            .with_child(Element::new("div").with_attribute("u-control", "card"));
        let document = Element::new("body").with_child(container.clone());
        assert_eq!(registry.start(&document), container);
        assert_eq!(registry.template_names(), vec!["card"]);
    }

    #[test]
    fn attachments_wait_for_the_document() {
        let (registry, document) = started();
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = Rc::clone(&order);
        registry.define(
            "Lamp",
            Behavior::builder("lamp")
                .method(CONNECTED_HOOK, move |el, _| {
                    o.borrow_mut().push(el.attribute("id")?);
                    None
                })
                .build(),
        );

        for id in ["a", "b"] {
            let el = Element::new("div")
                .with_attribute("u-is", "lamp")
                .with_attribute("id", id);
            document.append_child(&el);
            registry.attach(&el).unwrap();
        }
        assert!(order.borrow().is_empty());
        assert_eq!(registry.pending().len(), 2);

        assert!(registry.document_loaded());
        assert!(!registry.document_loaded());
        assert_eq!(*order.borrow(), vec!["a", "b"]);
        assert!(registry.pending().is_empty());

        let late = Element::new("div")
            .with_attribute("u-is", "LAMP")
            .with_attribute("id", "c");
        registry.attach(&late).unwrap();
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
        assert_eq!(registry.widgets().len(), 3);
    }

    #[test]
    fn unknown_control_type_is_reported() {
        let (registry, _) = started();
        registry.document_loaded();
        let el = Element::new("div").with_attribute("u-is", "nope");
        assert_eq!(
            registry.attach(&el),
            Err(RegistryError::UnknownBehavior("nope".into()))
        );
        assert!(el.behavior().is_none());
    }

    #[test]
    #[traced_test]
    fn unmarked_element_is_logged_and_skipped() {
        let (registry, document) = started();
        let connects = Rc::new(Cell::new(0));
        registry.define("lamp", counting("lamp", CONNECTED_HOOK, &connects));
        let unmarked = Element::new("div");
        let lamp = Element::new("div").with_attribute("u-is", "lamp");
        document.append_child(&unmarked);
        document.append_child(&lamp);
        registry.attach(&unmarked).unwrap();
        registry.attach(&lamp).unwrap();

        assert!(registry.document_loaded());
        assert!(logs_contain("element without a control marker"));
        assert_eq!(connects.get(), 1);
        assert_eq!(registry.widgets(), vec![lamp]);
        assert_eq!(
            registry.attach(&unmarked),
            Err(RegistryError::MissingMarker("u-is".into()))
        );
    }

    #[test]
    fn load_behavior_is_idempotent() {
        let registry = Registry::new(&RuntimeOptions::default());
        let connects = Rc::new(Cell::new(0));
        let b = counting("b", CONNECTED_HOOK, &connects);
        let el = Element::new("div");

        assert!(registry.load_behavior(&el, &b));
        assert!(!registry.load_behavior(&el, &b));
        assert_eq!(connects.get(), 1);
        assert_eq!(registry.widgets().len(), 1);
    }

    #[test]
    fn init_hook_is_the_fallback() {
        let registry = Registry::new(&RuntimeOptions::default());
        let inits = Rc::new(Cell::new(0));
        registry.load_behavior(&Element::new("div"), &counting("b", INIT_HOOK, &inits));
        assert_eq!(inits.get(), 1);
    }

    #[test]
    fn later_behavior_overwrites_methods_but_not_properties() {
        let registry = Registry::new(&RuntimeOptions::default());
        let b1 = Behavior::builder("b1")
            .value("label", "first")
            .method("name", |_, _| Some("b1".into()))
            .build();
        let b2 = Behavior::builder("b2")
            .value("label", "second")
            .value("extra", "x")
            .method("name", |_, _| Some("b2".into()))
            .build();
        let el = Element::new("div");

        registry.load_behavior(&el, &b1);
        registry.load_behavior(&el, &b2);
        assert_eq!(el.call("name", &[]).as_deref(), Some("b2"));
        assert_eq!(el.property("label").as_deref(), Some("first"));
        assert_eq!(el.property("extra").as_deref(), Some("x"));
        assert!(Rc::ptr_eq(&el.behavior().unwrap(), &b2));
    }

    #[test]
    fn attributes_win_over_defaults() {
        let registry = Registry::new(&RuntimeOptions::default());
        let b = Behavior::builder("b")
            .value("microid", "/fallback")
            .value("color", "red")
            .build();
        let el = Element::new("div").with_attribute("microid", "/timer/t1");
        registry.load_behavior(&el, &b);
        assert_eq!(el.property("microid").as_deref(), Some("/timer/t1"));
        assert_eq!(el.property("color").as_deref(), Some("red"));
    }

    #[test]
    fn handlers_become_listeners() {
        let registry = Registry::new(&RuntimeOptions::default());
        let clicks = Rc::new(Cell::new(0));
        let c = Rc::clone(&clicks);
        let b = Behavior::builder("b")
            .on("click", move |_, _| c.set(c.get() + 1))
            .value("online", "yes")
            .build();
        let el = Element::new("div");
        let child = Element::new("button");
        el.append_child(&child);

        registry.load_behavior(&el, &b);
        assert_eq!(el.listener_count("click"), 1);
        assert_eq!(el.property("online").as_deref(), Some("yes"));
        assert_eq!(el.listener_count("line"), 0);

        child.dispatch_event("click");
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn template_masters_are_not_connected() {
        let (registry, _) = started();
        let connects = Rc::new(Cell::new(0));
        let b = counting("b", CONNECTED_HOOK, &connects);
        let master = Element::new("div");
        registry.container().unwrap().append_child(&master);

        assert!(registry.load_behavior(&master, &b));
        assert_eq!(connects.get(), 0);
        assert!(registry.widgets().is_empty());
    }

    #[test]
    fn insert_template_fills_and_attaches_markers() {
        let (registry, document) = started();
        registry
            .load_markup(
                r#"<div u-control="card" u-is="card" microid="${id}">
                     <span>${title}</span>
                     <i u-behavior="blink"></i>
                   </div>"#,
            )
            .unwrap();
        let blinks = Rc::new(Cell::new(0));
        registry.define("blink", counting("blink", CONNECTED_HOOK, &blinks));

        let props: Props = [("title", "Hi"), ("id", "/card/c1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let card = registry.insert_template(&document, "Card", &props).unwrap();

        assert_eq!(card.parent(), Some(document.clone()));
        assert_eq!(card.text_content(), "Hi");
        assert_eq!(card.attribute("microid").as_deref(), Some("/card/c1"));
        assert_eq!(card.params(), props);
        assert_eq!(blinks.get(), 1);
        assert!(card.behavior().is_none());
    }

    #[test]
    fn insert_template_errors() {
        let registry = Registry::new(&RuntimeOptions::default());
        let root = Element::new("div");
        assert_eq!(
            registry.insert_template(&root, "card", &Props::new()),
            Err(RegistryError::NotStarted)
        );
        registry.start(&Element::new("body"));
        assert_eq!(
            registry.insert_template(&root, "card", &Props::new()),
            Err(RegistryError::UnknownTemplate("card".into()))
        );
        assert!(root.children().is_empty());
    }

    #[test]
    fn load_markup_reports_parse_errors() {
        let (registry, _) = started();
        assert!(matches!(
            registry.load_markup("<div>"),
            Err(Error::Markup(_))
        ));
        let fresh = Registry::new(&RuntimeOptions::default());
        assert!(matches!(
            fresh.load_markup("<div></div>"),
            Err(Error::Registry(RegistryError::NotStarted))
        ));
    }

    #[test]
    fn unload_terminates_and_clears() {
        let registry = Registry::new(&RuntimeOptions::default());
        let terms = Rc::new(Cell::new(0));
        let b = counting("b", TERM_HOOK, &terms);
        let el = Element::new("div").with_attribute("microid", "/x");
        registry.load_behavior(&el, &b);
        assert_eq!(el.property("microid").as_deref(), Some("/x"));

        registry.unload();
        assert_eq!(terms.get(), 1);
        assert_eq!(el.property("microid"), None);
        assert!(registry.widgets().is_empty());
    }
}
