//! Behaviors: named capability bundles that turn an element into a widget.
//!
//! A [`Behavior`] maps member names to one of three things:
//!
//! * a default value, copied onto the element only when the property is unset;
//! * a method, always installed (overwriting an earlier one);
//! * an event handler, stored under `on_<event>` and registered as a listener.
//!
//! Behaviors are immutable once built. Composition happens at build time
//! through [`BehaviorBuilder::inherit`]: the parent's members are applied
//! first and the child's members overlay them.
//!
//! # Example
//!
//! ```
//! use ding_core::behavior::Behavior;
//!
//! let base = Behavior::builder("base")
//!     .value("label", "off")
//!     .method("describe", |el, _| el.property("label"))
//!     .build();
//!
//! let lamp = Behavior::builder("lamp")
//!     .inherit(&base)
//!     .value("label", "lamp")
//!     .on("click", |el, _event| el.set_property("label", "on"))
//!     .build();
//!
//! assert!(lamp.method("describe").is_some());
//! assert!(lamp.member("on_click").is_some());
//! ```

use crate::element::{Element, Event};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A behavior method: receives the element it is installed on and string
/// arguments, and may return a value.
pub type Method = Rc<dyn Fn(&Element, &[&str]) -> Option<String>>;

/// An event handler, called with the element that owns the listener.
pub type Handler = Rc<dyn Fn(&Element, &Event)>;

/// Prefix that marks handler members (`on_click`).
pub const HANDLER_PREFIX: &str = "on_";

/// One member of a behavior.
#[derive(Clone)]
pub enum Member {
    Value(String),
    Method(Method),
    Handler(Handler),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Member::Method(_) => f.write_str("Method(..)"),
            Member::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// An immutable, named capability bundle.
pub struct Behavior {
    name: String,
    members: IndexMap<String, Member>,
}

impl Behavior {
    /// Start building a behavior with the given name.
    pub fn builder(name: impl Into<String>) -> BehaviorBuilder {
        BehaviorBuilder {
            name: name.into(),
            parent: None,
            members: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Members in application order: inherited ones first.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }

    /// Fetch a method member, e.g. to call a parent implementation from an
    /// overriding one.
    pub fn method(&self, name: &str) -> Option<Method> {
        match self.members.get(name) {
            Some(Member::Method(method)) => Some(Rc::clone(method)),
            _ => None,
        }
    }

    /// Fetch a handler member by event name (`"click"`).
    pub fn handler(&self, event: &str) -> Option<Handler> {
        match self.members.get(&format!("{HANDLER_PREFIX}{event}")) {
            Some(Member::Handler(handler)) => Some(Rc::clone(handler)),
            _ => None,
        }
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("name", &self.name)
            .field("members", &self.members)
            .finish()
    }
}

/// Builder for [`Behavior`].
pub struct BehaviorBuilder {
    name: String,
    parent: Option<Rc<Behavior>>,
    members: IndexMap<String, Member>,
}

impl BehaviorBuilder {
    /// Start from `parent`'s members. The members declared on this builder
    /// win over the parent's regardless of call order.
    pub fn inherit(mut self, parent: &Rc<Behavior>) -> Self {
        self.parent = Some(Rc::clone(parent));
        self
    }

    /// Declare a default property value.
    pub fn value(mut self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.members
            .insert(name.into(), Member::Value(default.into()));
        self
    }

    /// Declare a method.
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Element, &[&str]) -> Option<String> + 'static,
    ) -> Self {
        self.members
            .insert(name.into(), Member::Method(Rc::new(method)));
        self
    }

    /// Declare a handler for `event`; it is stored as `on_<event>`.
    pub fn on(mut self, event: &str, handler: impl Fn(&Element, &Event) + 'static) -> Self {
        self.members.insert(
            format!("{HANDLER_PREFIX}{event}"),
            Member::Handler(Rc::new(handler)),
        );
        self
    }

    /// Insert a prepared member under an explicit name.
    pub fn member(mut self, name: impl Into<String>, member: Member) -> Self {
        self.members.insert(name.into(), member);
        self
    }

    pub fn build(self) -> Rc<Behavior> {
        let mut members = match &self.parent {
            Some(parent) => parent.members.clone(),
            None => IndexMap::new(),
        };
        for (name, member) in self.members {
            members.insert(name, member);
        }
        Rc::new(Behavior {
            name: self.name,
            members,
        })
    }
}

/// The event a handler member listens to, if `name` follows the handler
/// naming convention (`on_click`, or the older `onclick`).
pub fn event_name(name: &str) -> Option<&str> {
    name.strip_prefix(HANDLER_PREFIX)
        .or_else(|| name.strip_prefix("on"))
        .filter(|event| !event.is_empty())
}
