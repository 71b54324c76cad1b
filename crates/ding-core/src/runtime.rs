use crate::behavior::Behavior;
use crate::dispatch::{Dispatchers, Transport, TransportError};
use crate::element::Element;
use crate::error::{RegistryError, Result};
use crate::hub::Hub;
use crate::options::RuntimeOptions;
use crate::registry::{LifecycleState, Registry};
use crate::template::Props;
use crate::watcher::StructureWatcher;
use std::rc::Rc;
use tracing::debug;

/// What a behavior needs at run time: the hub and the action dispatchers.
///
/// Behaviors capture a `Context` when they are built. It deliberately holds
/// no reference to the [`Registry`], which owns the behaviors.
#[derive(Debug, Clone)]
pub struct Context {
    hub: Rc<Hub>,
    dispatchers: Rc<Dispatchers>,
}

impl Context {
    pub fn new(hub: Rc<Hub>, dispatchers: Rc<Dispatchers>) -> Self {
        Self { hub, dispatchers }
    }

    pub fn hub(&self) -> &Rc<Hub> {
        &self.hub
    }

    pub fn dispatchers(&self) -> &Rc<Dispatchers> {
        &self.dispatchers
    }

    /// Queue an action on behalf of `widget`.
    pub fn dispatch_action(&self, widget: &Element, prop: Option<&str>, value: Option<&str>) -> bool {
        self.dispatchers.dispatch(widget, prop, value)
    }
}

/// An assembled runtime: hub, registry, watcher and dispatchers.
///
/// Built explicitly and torn down explicitly with
/// [`shutdown`](Runtime::shutdown). Dispatch work is spawned with
/// [`tokio::task::spawn_local`], so hosts drive the runtime from inside a
/// [`tokio::task::LocalSet`].
///
/// # Example
///
/// ```
/// use ding_core::testing::RecordingTransport;
/// use ding_core::{Element, Runtime, RuntimeOptions};
/// use std::rc::Rc;
///
/// let runtime = Runtime::new(RuntimeOptions::default(), Rc::new(RecordingTransport::new()));
/// let document = Element::new("body");
/// runtime.start(&document);
/// runtime.load_markup(r#"<div u-control="lamp" u-is="lamp"></div>"#).unwrap();
/// runtime.document_loaded();
/// assert_eq!(runtime.registry().template_names(), vec!["lamp"]);
/// runtime.shutdown();
/// ```
#[derive(Debug)]
pub struct Runtime {
    options: RuntimeOptions,
    context: Context,
    registry: Rc<Registry>,
    watcher: StructureWatcher,
}

impl Runtime {
    pub fn new(options: RuntimeOptions, transport: Rc<dyn Transport>) -> Self {
        let hub = Rc::new(Hub::new());
        let dispatchers = Rc::new(Dispatchers::new(&options, transport));
        let registry = Rc::new(Registry::new(&options));
        let watcher = StructureWatcher::new(Rc::clone(&registry), &options.control_attribute);
        Self {
            options,
            context: Context::new(hub, dispatchers),
            registry,
            watcher,
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// A handle for building behaviors.
    pub fn context(&self) -> Context {
        self.context.clone()
    }

    pub fn hub(&self) -> &Rc<Hub> {
        &self.context.hub
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    pub fn watcher(&self) -> &StructureWatcher {
        &self.watcher
    }

    pub fn define(&self, name: &str, behavior: Rc<Behavior>) {
        self.registry.define(name, behavior);
    }

    /// See [`Registry::start`].
    pub fn start(&self, document: &Element) -> Element {
        self.registry.start(document)
    }

    /// See [`Registry::document_loaded`].
    pub fn document_loaded(&self) -> bool {
        self.registry.document_loaded()
    }

    pub fn state(&self) -> LifecycleState {
        self.registry.state()
    }

    /// Report an inserted subtree. See [`StructureWatcher::element_inserted`].
    pub fn element_inserted(&self, el: &Element) -> usize {
        self.watcher.element_inserted(el)
    }

    pub fn load_markup(&self, markup: &str) -> Result<usize> {
        self.registry.load_markup(markup)
    }

    /// Instantiate template `name` under `root` and report the insertion,
    /// which attaches the clone's control behavior.
    pub fn insert_widget(
        &self,
        root: &Element,
        name: &str,
        props: &Props,
    ) -> Result<Element, RegistryError> {
        let widget = self.registry.insert_template(root, name, props)?;
        self.watcher.element_inserted(&widget);
        Ok(widget)
    }

    /// Install the hook fired whenever a widget's action queue drains.
    pub fn on_idle(&self, hook: impl Fn() + 'static) {
        self.context.dispatchers.on_idle(hook);
    }

    /// Install the hook fired when an action fails to send.
    pub fn on_error(&self, hook: impl Fn(&str, &TransportError) + 'static) {
        self.context.dispatchers.on_error(hook);
    }

    /// Terminate every widget, drop pending actions and all subscriptions.
    pub fn shutdown(&self) {
        self.registry.unload();
        self.context.dispatchers.clear();
        self.context.hub.clear();
        debug!("runtime shut down");
    }
}
