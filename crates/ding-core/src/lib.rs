//! Core runtime for the **ding** widget-binding framework.
//!
//! `ding-core` joins two pieces: a path-addressed publish/subscribe
//! [`Hub`] holding the application state, and a [`Registry`] that turns
//! inert markup into live widgets by attaching named [`Behavior`]s to
//! elements. Widgets subscribe to slices of the state tree with wildcard
//! patterns and send user input back out through per-widget
//! [`ActionDispatcher`] queues.
//!
//! # Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Pattern`] | Subscription glob compiled to an anchored, case-insensitive matcher |
//! | [`PathStore`] | Hierarchical store of scalars keyed by `/`-separated paths |
//! | [`Hub`] | Store plus ordered fan-out to matching subscriptions, with replay |
//! | [`Element`] | Single-threaded element tree the behaviors attach to |
//! | [`TemplateRepository`] | Named markup fragments with `${name}` placeholders |
//! | [`Behavior`] | Immutable bundle of defaults, methods and event handlers |
//! | [`Registry`] | Lifecycle-gated attachment of behaviors to elements |
//! | [`StructureWatcher`] | Forwards inserted control markers to the registry |
//! | [`ActionDispatcher`] | Debounced, strictly sequential outbound queue per widget |
//! | [`Runtime`] | Owns all of the above; built and shut down explicitly |
//!
//! # Flow
//!
//! 1. **publish** -- State enters through [`Hub::publish_value`] or
//!    [`Hub::publish_object`]; the store is updated, then matching
//!    subscriptions are called in subscription order.
//! 2. **attach** -- The host reports inserted elements; once the document has
//!    loaded, elements carrying a control marker get their behavior, which
//!    typically subscribes to its own slice of the state.
//! 3. **dispatch** -- User input becomes action URLs, queued per widget and
//!    sent one at a time through a [`Transport`]. The endpoint's reply comes
//!    back as a fresh publish.

pub mod behavior;
pub mod debounce;
pub mod dispatch;
pub mod element;
pub mod error;
pub mod hub;
pub mod markup;
pub mod options;
pub mod pattern;
pub mod registry;
pub mod runtime;
pub mod store;
pub mod template;
pub mod testing;
pub mod watcher;

pub use behavior::{event_name, Behavior, BehaviorBuilder, Handler, Member, Method};
pub use debounce::Debouncer;
pub use dispatch::{
    build_actions, encode_uri, ActionDispatcher, Dispatchers, LocalBoxFuture, Transport,
    TransportError, WIDGET_ID_PROPERTY,
};
pub use element::{Element, ElementId, Event, WeakElement};
pub use error::{Error, RegistryError, Result};
pub use hub::{Callback, Hub, SubscriptionId};
pub use markup::{parse_fragment, render, MarkupError};
pub use options::RuntimeOptions;
pub use pattern::{full_path, Pattern, PatternError};
pub use registry::{LifecycleState, Registry, CONNECTED_HOOK, INIT_HOOK, TERM_HOOK};
pub use runtime::{Context, Runtime};
pub use store::{Branch, PathStore, StoreNode};
pub use template::{fill, set_placeholders, Props, TemplateRepository};
pub use watcher::StructureWatcher;
