//! Outbound actions: per-widget debounced queues.
//!
//! A widget turns user input into action URLs with
//! [`ActionDispatcher::dispatch_action`]. Actions are queued in order and
//! drained one request at a time after the debounce window; while a request
//! is in flight nothing else from the same widget is sent. When the queue
//! runs dry the idle hook fires so the host can refresh at once instead of
//! waiting for its next poll.

use crate::debounce::Debouncer;
use crate::element::{Element, ElementId};
use crate::options::RuntimeOptions;
pub use futures::future::LocalBoxFuture;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Property holding a widget's id in the state tree.
pub const WIDGET_ID_PROPERTY: &str = "microid";

/// Token in a multi-action identifier replaced by the encoded value.
pub const VALUE_TOKEN: &str = "${v}";

/// Errors reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The endpoint answered, but not successfully.
    #[error("request {url} failed with status {status}")]
    Status { url: String, status: u16 },
    /// The request could not be completed.
    #[error("request {url} failed: {reason}")]
    Failed { url: String, reason: String },
}

/// Sends action URLs to the state-mutation endpoint.
pub trait Transport {
    fn send(&self, url: &str) -> LocalBoxFuture<'static, Result<(), TransportError>>;
}

/// Called when a dispatcher's queue drains completely.
pub type IdleHook = Rc<dyn Fn()>;
/// Called with the failed URL when a send fails.
pub type ErrorHook = Rc<dyn Fn(&str, &TransportError)>;

#[derive(Default)]
struct Hooks {
    idle: RefCell<Option<IdleHook>>,
    error: RefCell<Option<ErrorHook>>,
}

impl Hooks {
    fn idle(&self) {
        let hook = self.idle.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn error(&self, url: &str, err: &TransportError) {
        let hook = self.error.borrow().clone();
        if let Some(hook) = hook {
            hook(url, err);
        }
    }
}

/// Percent-encode `value` the way a browser's `encodeURI` does: reserved and
/// unreserved URI characters pass through, everything else is UTF-8 encoded.
pub fn encode_uri(value: &str) -> String {
    const KEEP: &[u8] = b";,/?:@&=+$-_.!~*'()#";
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || KEEP.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Build the action URLs for one `dispatch_action` call.
///
/// A plain property yields `<prefix><widget_id>?<prop>=<value>`. An action
/// identifier containing `/` is a comma-separated list of actions, each
/// becoming `<prefix>/<action>` with `${v}` replaced by the value.
pub fn build_actions(prefix: &str, widget_id: &str, prop: &str, value: &str) -> Vec<String> {
    let value = encode_uri(value);
    if prop.contains('/') {
        prop.split(',')
            .map(|action| action.trim().trim_start_matches('/'))
            .filter(|action| !action.is_empty())
            .map(|action| format!("{prefix}/{}", action.replace(VALUE_TOKEN, &value)))
            .collect()
    } else {
        vec![format!("{prefix}{widget_id}?{prop}={value}")]
    }
}

struct Inner {
    widget_id: String,
    prefix: String,
    queue: RefCell<VecDeque<String>>,
    in_flight: Cell<bool>,
    debouncer: Debouncer,
    transport: Rc<dyn Transport>,
    hooks: Rc<Hooks>,
}

// Resets the in-flight flag even if the send future is dropped.
struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        InFlight(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// The outbound queue of one widget. Clones share the queue.
#[derive(Clone)]
pub struct ActionDispatcher {
    inner: Rc<Inner>,
}

impl ActionDispatcher {
    pub fn new(
        widget_id: impl Into<String>,
        options: &RuntimeOptions,
        transport: Rc<dyn Transport>,
    ) -> Self {
        Self::with_hooks(widget_id.into(), options, transport, Rc::default())
    }

    fn with_hooks(
        widget_id: String,
        options: &RuntimeOptions,
        transport: Rc<dyn Transport>,
        hooks: Rc<Hooks>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                widget_id,
                prefix: options.endpoint_prefix.clone(),
                queue: RefCell::new(VecDeque::new()),
                in_flight: Cell::new(false),
                debouncer: Debouncer::new(options.debounce),
                transport,
                hooks,
            }),
        }
    }

    pub fn widget_id(&self) -> &str {
        &self.inner.widget_id
    }

    /// Queue the actions for `prop = value` and schedule a drain. Either
    /// argument missing means there is nothing to send.
    pub fn dispatch_action(&self, prop: Option<&str>, value: Option<&str>) -> bool {
        let (Some(prop), Some(value)) = (prop, value) else {
            return false;
        };
        let actions = build_actions(&self.inner.prefix, &self.inner.widget_id, prop, value);
        debug!(widget = self.inner.widget_id.as_str(), count = actions.len(), "actions queued");
        self.inner.queue.borrow_mut().extend(actions);
        self.schedule();
        true
    }

    /// Actions not yet sent, in order.
    pub fn pending(&self) -> Vec<String> {
        self.inner.queue.borrow().iter().cloned().collect()
    }

    pub fn is_sending(&self) -> bool {
        self.inner.in_flight.get()
    }

    /// Install the hook fired when the queue runs dry.
    pub fn on_idle(&self, hook: impl Fn() + 'static) {
        *self.inner.hooks.idle.borrow_mut() = Some(Rc::new(hook));
    }

    /// Install the hook fired when a send fails.
    pub fn on_error(&self, hook: impl Fn(&str, &TransportError) + 'static) {
        *self.inner.hooks.error.borrow_mut() = Some(Rc::new(hook));
    }

    /// Send the head of the queue.
    ///
    /// Returns the URL sent, or `None` when the queue is empty or a request
    /// is already in flight. A failed action is dropped from the queue.
    pub async fn send_next(&self) -> Result<Option<String>, TransportError> {
        if self.inner.in_flight.get() {
            return Ok(None);
        }
        let Some(url) = self.inner.queue.borrow_mut().pop_front() else {
            return Ok(None);
        };
        let _guard = InFlight::enter(&self.inner.in_flight);
        debug!(url = url.as_str(), "sending action");
        self.inner.transport.send(&url).await?;
        Ok(Some(url))
    }

    /// Stop any scheduled drain and forget queued actions.
    pub fn cancel(&self) {
        self.inner.debouncer.cancel();
        self.inner.queue.borrow_mut().clear();
    }

    fn schedule(&self) {
        let this = self.clone();
        self.inner.debouncer.call(async move { this.drain().await });
    }

    async fn drain(self) {
        let before = self.inner.queue.borrow().front().cloned();
        match self.send_next().await {
            // busy or empty: a running send chains the rest
            Ok(None) => {}
            Ok(Some(_)) => {
                if self.inner.queue.borrow().is_empty() {
                    self.inner.hooks.idle();
                } else {
                    self.schedule();
                }
            }
            Err(err) => {
                let url = before.unwrap_or_default();
                warn!(url = url.as_str(), error = %err, "action failed");
                self.inner.hooks.error(&url, &err);
            }
        }
    }
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("widget_id", &self.inner.widget_id)
            .field("queue", &self.inner.queue.borrow())
            .field("in_flight", &self.inner.in_flight.get())
            .finish()
    }
}

/// Creates and keeps one [`ActionDispatcher`] per widget element.
///
/// Dispatchers made here share the idle and error hooks.
pub struct Dispatchers {
    options: RuntimeOptions,
    transport: Rc<dyn Transport>,
    hooks: Rc<Hooks>,
    by_widget: RefCell<HashMap<ElementId, ActionDispatcher>>,
}

impl Dispatchers {
    pub fn new(options: &RuntimeOptions, transport: Rc<dyn Transport>) -> Self {
        Self {
            options: options.clone(),
            transport,
            hooks: Rc::default(),
            by_widget: RefCell::new(HashMap::new()),
        }
    }

    /// The dispatcher of `widget`, created on first use from the widget's
    /// `microid` property.
    pub fn for_widget(&self, widget: &Element) -> ActionDispatcher {
        self.by_widget
            .borrow_mut()
            .entry(widget.id())
            .or_insert_with(|| {
                let widget_id = widget
                    .property(WIDGET_ID_PROPERTY)
                    .or_else(|| widget.attribute(WIDGET_ID_PROPERTY))
                    .unwrap_or_default();
                ActionDispatcher::with_hooks(
                    widget_id,
                    &self.options,
                    Rc::clone(&self.transport),
                    Rc::clone(&self.hooks),
                )
            })
            .clone()
    }

    /// Shorthand for `for_widget(widget).dispatch_action(prop, value)`.
    pub fn dispatch(&self, widget: &Element, prop: Option<&str>, value: Option<&str>) -> bool {
        self.for_widget(widget).dispatch_action(prop, value)
    }

    /// Drop the dispatcher of `widget`, cancelling anything not yet sent.
    pub fn remove(&self, widget: &Element) {
        if let Some(dispatcher) = self.by_widget.borrow_mut().remove(&widget.id()) {
            dispatcher.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.by_widget.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_widget.borrow().is_empty()
    }

    pub fn clear(&self) {
        let all = std::mem::take(&mut *self.by_widget.borrow_mut());
        for dispatcher in all.values() {
            dispatcher.cancel();
        }
    }

    pub fn on_idle(&self, hook: impl Fn() + 'static) {
        *self.hooks.idle.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn on_error(&self, hook: impl Fn(&str, &TransportError) + 'static) {
        *self.hooks.error.borrow_mut() = Some(Rc::new(hook));
    }
}

impl fmt::Debug for Dispatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatchers")
            .field("widgets", &self.by_widget.borrow().len())
            .finish()
    }
}
