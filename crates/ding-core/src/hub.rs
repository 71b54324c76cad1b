//! The subscription hub: a path store plus wildcard publish/subscribe.
//!
//! Values enter the hub through [`Hub::publish_value`] or
//! [`Hub::publish_object`]. Each publish first updates the [`PathStore`] and
//! then notifies every subscription whose [`Pattern`] accepts the full path,
//! in ascending [`SubscriptionId`] order.
//!
//! The hub is single-threaded and re-entrant: callbacks may publish,
//! subscribe or unsubscribe. Each publish works on a snapshot of the
//! subscriptions taken when it starts:
//!
//! * subscriptions added during the pass are not notified by it;
//! * a subscription removed during the pass is skipped if its turn has not
//!   come yet; a callback that removes itself finishes normally and is never
//!   called again.

use crate::pattern::{full_path, Pattern, PatternError};
use crate::store::{join_segment, PathStore};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Callback invoked with `(path, key, value)` for every matching notification.
///
/// Container boundaries are reported with `key` and `value` set to `None`.
pub type Callback = Rc<dyn Fn(&str, Option<&str>, Option<&str>)>;

/// Handle returned by [`Hub::subscribe`]. Ids are unique and increase
/// monotonically; their order is the notification order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Subscription {
    id: SubscriptionId,
    pattern: Pattern,
    callback: Callback,
}

/// Path store plus subscription table.
#[derive(Default)]
pub struct Hub {
    registrations: RefCell<BTreeMap<SubscriptionId, Rc<Subscription>>>,
    next_id: Cell<u64>,
    store: RefCell<PathStore>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every full path matching `pattern`.
    ///
    /// With `replay` set, the callback is invoked synchronously for every
    /// value already in the store that matches, before this returns.
    pub fn subscribe(
        &self,
        pattern: &str,
        callback: impl Fn(&str, Option<&str>, Option<&str>) + 'static,
        replay: bool,
    ) -> Result<SubscriptionId, PatternError> {
        let pattern = Pattern::compile(pattern)?;
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let subscription = Rc::new(Subscription {
            id,
            pattern,
            callback: Rc::new(callback),
        });
        debug!(%id, pattern = subscription.pattern.as_str(), replay, "subscribe");
        self.registrations
            .borrow_mut()
            .insert(id, Rc::clone(&subscription));

        if replay {
            self.replay_into(&subscription);
        }
        Ok(id)
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registrations.borrow_mut().remove(&id).is_some();
        debug!(%id, removed, "unsubscribe");
        removed
    }

    /// Push the current store contents to one existing subscription.
    ///
    /// Returns `false` when the id is not registered.
    pub fn replay(&self, id: SubscriptionId) -> bool {
        let subscription = self.registrations.borrow().get(&id).cloned();
        match subscription {
            Some(subscription) => {
                self.replay_into(&subscription);
                true
            }
            None => false,
        }
    }

    /// Store `value` under `path?key` and notify matching subscriptions.
    ///
    /// Nothing is stored when `key` is absent or empty; the notification is
    /// still delivered so observers can see container boundaries.
    pub fn publish_value(&self, path: &str, key: Option<&str>, value: Option<&str>) {
        let full = full_path(path, key);
        if full.is_empty() {
            return;
        }
        if let Some(key) = key.filter(|key| !key.is_empty()) {
            self.store
                .borrow_mut()
                .set(path, key, value.unwrap_or_default());
        }

        let full = full.to_lowercase();
        let snapshot: Vec<Rc<Subscription>> =
            self.registrations.borrow().values().cloned().collect();
        let mut delivered = 0usize;
        for subscription in snapshot {
            if !self.is_registered(subscription.id) {
                continue;
            }
            if subscription.pattern.matches(&full) {
                (subscription.callback)(path, key, value);
                delivered += 1;
            }
        }
        debug!(path = full.as_str(), delivered, "publish");
    }

    /// Publish every node of a JSON tree.
    ///
    /// Objects are reported as `(path, None, None)` and then descended into;
    /// array elements become `[n]` segments; leaves are stringified and
    /// published with their lower-cased key.
    pub fn publish_object(&self, tree: &Value) {
        walk_json("", "", tree, &mut |path, key, value| {
            let key = key.map(str::to_lowercase);
            self.publish_value(path, key.as_deref(), value);
        });
    }

    /// Read the scalar at `path`, treating the last segment as the key.
    pub fn read(&self, path: &str) -> Option<String> {
        self.store.borrow().read(path).map(str::to_string)
    }

    /// Write a scalar at `path` without notifying anyone.
    pub fn write(&self, path: &str, value: impl Into<String>) {
        self.store.borrow_mut().write(path, value);
    }

    /// Run `f` against the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&PathStore) -> R) -> R {
        f(&self.store.borrow())
    }

    /// Drop every registration. Stored values are kept.
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.registrations.borrow_mut());
        debug!(count = dropped.len(), "hub cleared");
    }

    pub fn subscription_count(&self) -> usize {
        self.registrations.borrow().len()
    }

    pub fn is_registered(&self, id: SubscriptionId) -> bool {
        self.registrations.borrow().contains_key(&id)
    }

    fn replay_into(&self, subscription: &Subscription) {
        // Collect first so callbacks are free to write into the store.
        let mut matches = Vec::new();
        self.store.borrow().walk(|path, key, value| {
            let full = full_path(path, key);
            if !full.is_empty() && subscription.pattern.matches(&full) {
                matches.push((
                    path.to_string(),
                    key.map(str::to_lowercase),
                    value.map(str::to_string),
                ));
            }
        });
        debug!(id = %subscription.id, count = matches.len(), "replay");
        for (path, key, value) in matches {
            (subscription.callback)(&path, key.as_deref(), value.as_deref());
        }
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("subscriptions", &self.subscription_count())
            .field("next_id", &self.next_id.get())
            .finish()
    }
}

fn walk_json(
    path: &str,
    key: &str,
    value: &Value,
    visit: &mut dyn FnMut(&str, Option<&str>, Option<&str>),
) {
    let here = join_segment(path, key);
    match value {
        Value::Array(items) => {
            for (n, item) in items.iter().enumerate() {
                walk_json(&here, &format!("[{n}]"), item, visit);
            }
        }
        Value::Object(map) => {
            visit(&here, None, None);
            for (name, child) in map {
                walk_json(&here, name, child, visit);
            }
        }
        Value::String(text) => visit(path, Some(key), Some(text)),
        Value::Null => visit(path, Some(key), Some("")),
        other => visit(path, Some(key), Some(&other.to_string())),
    }
}
