//! The generic widget every other control builds on.
//!
//! On connect it subscribes to `<microid>?*` and replays the current state.
//! Each notification goes through the element's `new_data` method, so
//! derived behaviors can override it and still call this one. The default
//! `new_data` keeps marked descendants in step with the data:
//!
//! | Marker | Elements | Effect |
//! |--------|----------|--------|
//! | `u-active="key"` | `span`, `div` | `value`/`title` attributes and the `active` class |
//! | `u-text="key"` | `h2`, `h4`, `span`, `button` | text content |
//! | `u-value="key"` | `input`, `select` | `value` property |
//! | `u-action="${key}"` | `button` | the action itself |
//!
//! Every non-empty value is also collected in the element's
//! [`data`](Element::data) map, seeded with `id = microid` on connect. When
//! the widget has an `img`, the collected data becomes its `title`.
//!
//! `change` events dispatch `u-value = value` of their target, `click`
//! events on a target with `u-action` dispatch that action.

use crate::convert::to_bool;
use ding_core::{Behavior, Context, Element, ElementId, Event, SubscriptionId, WIDGET_ID_PROPERTY};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::warn;

pub const NAME: &str = "generic";

/// Method receiving `(path, key, value)` notifications.
pub const NEW_DATA: &str = "new_data";

type Subscriptions = Rc<RefCell<HashMap<ElementId, SubscriptionId>>>;

/// Build the generic behavior.
pub fn generic(ctx: &Context) -> Rc<Behavior> {
    let subscriptions = Subscriptions::default();
    let on_connect = {
        let ctx = ctx.clone();
        let subscriptions = Rc::clone(&subscriptions);
        move |el: &Element, _: &[&str]| {
            connect(&ctx, &subscriptions, el);
            None
        }
    };
    let on_term = {
        let ctx = ctx.clone();
        move |el: &Element, _: &[&str]| {
            let id = subscriptions.borrow_mut().remove(&el.id());
            if let Some(id) = id {
                ctx.hub().unsubscribe(id);
            }
            ctx.dispatchers().remove(el);
            None
        }
    };
    let change_ctx = ctx.clone();
    let click_ctx = ctx.clone();

    Behavior::builder(NAME)
        .value(WIDGET_ID_PROPERTY, "")
        .method(ding_core::CONNECTED_HOOK, on_connect)
        .method(ding_core::TERM_HOOK, on_term)
        .method(NEW_DATA, |el, args| {
            let arg = |n: usize| args.get(n).copied().unwrap_or_default();
            new_data(el, arg(1), arg(2));
            None
        })
        .on("change", move |el, event| on_change(&change_ctx, el, event))
        .on("click", move |el, event| on_click(&click_ctx, el, event))
        .build()
}

fn connect(ctx: &Context, subscriptions: &Subscriptions, el: &Element) {
    let Some(microid) = el
        .property(WIDGET_ID_PROPERTY)
        .filter(|id| !id.is_empty())
    else {
        warn!("widget without a microid is not subscribed");
        return;
    };
    el.clear_data();
    el.set_data("id", microid.as_str());
    let weak = el.downgrade();
    let subscribed = ctx.hub().subscribe(
        &format!("{microid}?*"),
        move |path, key, value| {
            if let Some(el) = weak.upgrade() {
                el.call(
                    NEW_DATA,
                    &[path, key.unwrap_or_default(), value.unwrap_or_default()],
                );
            }
        },
        false,
    );
    match subscribed {
        Ok(id) => {
            subscriptions.borrow_mut().insert(el.id(), id);
            ctx.hub().replay(id);
        }
        Err(err) => warn!(microid = microid.as_str(), error = %err, "widget subscription failed"),
    }
}

/// Update the marked descendants of `widget` for `key = value`.
pub fn new_data(widget: &Element, key: &str, value: &str) {
    if key.is_empty() {
        return;
    }
    if !value.is_empty() {
        widget.set_data(key, value);
        if let Some(icon) = widget.descendants().into_iter().find(|el| el.tag() == Some("img")) {
            icon.set_attribute("title", data_title(widget));
        }
    }
    for el in marked(widget, &["span", "div"], "u-active", key) {
        let on = to_bool(value);
        el.set_attribute("value", if on { "1" } else { "0" });
        el.set_attribute("title", if on { "active" } else { "not active" });
        el.toggle_class("active", on);
    }
    for el in marked(widget, &["h2", "h4", "span", "button"], "u-text", key) {
        if el.text_content() != value {
            el.set_text_content(value);
        }
    }
    for el in marked(widget, &["input", "select"], "u-value", key) {
        if el.property("value").as_deref() != Some(value) {
            el.set_property("value", value);
        }
    }
    let placeholder = format!("${{{key}}}");
    for el in marked(widget, &["button"], "u-action", &placeholder) {
        el.set_attribute("u-action", value);
    }
}

// Pretty JSON of the collected data without the enclosing braces.
fn data_title(widget: &Element) -> String {
    let data: Map<String, Value> = widget
        .data()
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    serde_json::to_string_pretty(&Value::Object(data))
        .unwrap_or_default()
        .replacen("{\n", "", 1)
        .replacen("\n}", "", 1)
}

fn marked(widget: &Element, tags: &[&str], attribute: &str, key: &str) -> Vec<Element> {
    widget
        .query_attribute(attribute, Some(key))
        .into_iter()
        .filter(|el| el.tag().is_some_and(|tag| tags.contains(&tag)))
        .collect()
}

fn on_change(ctx: &Context, widget: &Element, event: &Event) {
    let src = event.target();
    ctx.dispatch_action(
        widget,
        src.attribute("u-value").as_deref(),
        src.property("value").as_deref(),
    );
}

/// Click handling shared by derived widgets.
pub fn on_click(ctx: &Context, widget: &Element, event: &Event) {
    let src = event.target();
    let Some(action) = src.attribute("u-action").filter(|a| !a.is_empty()) else {
        return;
    };
    let value = src
        .property("value")
        .or_else(|| src.attribute("value"))
        .unwrap_or_default();
    ctx.dispatch_action(widget, Some(&action), Some(&value));
}

#[cfg(test)]
mod tests {
    use crate::fixture::{loaded, props};
    use std::time::Duration;
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    const CARD: &str = r#"
        <div u-control="card" u-is="generic" microid="${id}">
          <h4 u-text="name"></h4>
          <span u-active="on" class="dot"></span>
          <input u-value="level">
          <button u-action="${next}" value="go">Go</button>
        </div>"#;

    #[test]
    fn data_updates_marked_children() {
        let (runtime, document, _) = loaded(CARD);
        let card = runtime
            .insert_widget(&document, "card", &props(&[("id", "/card/c1")]))
            .unwrap();
        let hub = runtime.hub();
        hub.publish_value("/card/c1", Some("name"), Some("Kitchen"));
        hub.publish_value("/card/c1", Some("on"), Some("true"));
        hub.publish_value("/card/c1", Some("level"), Some("7"));
        hub.publish_value("/card/c1", Some("next"), Some("/lamp/l1?toggle=1"));

        let h4 = card.query_attribute("u-text", Some("name")).remove(0);
        assert_eq!(h4.text_content(), "Kitchen");
        let dot = card.query_class("dot").unwrap();
        assert!(dot.has_class("active"));
        assert_eq!(dot.attribute("value").as_deref(), Some("1"));
        assert_eq!(dot.attribute("title").as_deref(), Some("active"));
        let input = card.query_attribute("u-value", Some("level")).remove(0);
        assert_eq!(input.property("value").as_deref(), Some("7"));
        let button = card.query_attribute("value", Some("go")).remove(0);
        assert_eq!(
            button.attribute("u-action").as_deref(),
            Some("/lamp/l1?toggle=1")
        );

        hub.publish_value("/card/c1", Some("on"), Some("0"));
        assert!(!dot.has_class("active"));
        assert_eq!(dot.attribute("title").as_deref(), Some("not active"));
    }

    #[test]
    fn received_values_are_collected() {
        let (runtime, document, _) = loaded(
            r#"<div u-control="icon" u-is="generic" microid="${id}"><img src="i.svg"></div>"#,
        );
        let widget = runtime
            .insert_widget(&document, "icon", &props(&[("id", "/dht/d1")]))
            .unwrap();
        assert_eq!(widget.data(), props(&[("id", "/dht/d1")]));

        let hub = runtime.hub();
        hub.publish_value("/dht/d1", Some("temperature"), Some("21.5"));
        hub.publish_value("/dht/d1", Some("humidity"), Some(""));
        assert_eq!(
            widget.data(),
            props(&[("id", "/dht/d1"), ("temperature", "21.5")])
        );
        let img = widget.children().remove(0);
        assert_eq!(
            img.attribute("title").as_deref(),
            Some("  \"id\": \"/dht/d1\",\n  \"temperature\": \"21.5\"")
        );
    }

    #[test]
    fn connect_replays_stored_state() {
        let (runtime, document, _) = loaded(CARD);
        runtime
            .hub()
            .publish_value("/card/c1", Some("name"), Some("Porch"));
        let card = runtime
            .insert_widget(&document, "card", &props(&[("id", "/card/c1")]))
            .unwrap();
        let h4 = card.query_attribute("u-text", Some("name")).remove(0);
        assert_eq!(h4.text_content(), "Porch");
    }

    #[test]
    fn term_unsubscribes() {
        let (runtime, document, _) = loaded(CARD);
        runtime
            .insert_widget(&document, "card", &props(&[("id", "/card/c1")]))
            .unwrap();
        assert_eq!(runtime.hub().subscription_count(), 1);
        runtime.shutdown();
        assert_eq!(runtime.hub().subscription_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn input_events_dispatch_actions() {
        LocalSet::new()
            .run_until(async {
                let (runtime, document, transport) = loaded(CARD);
                let params = props(&[("id", "/card/c1"), ("next", "/scene/s1?run=${v}")]);
                let card = runtime.insert_widget(&document, "card", &params).unwrap();

                let input = card.query_attribute("u-value", Some("level")).remove(0);
                input.set_property("value", "50 %");
                input.dispatch_event("change");

                let button = card.query_attribute("value", Some("go")).remove(0);
                button.dispatch_event("click");

                sleep(Duration::from_millis(200)).await;
                assert_eq!(
                    transport.sent(),
                    vec!["/$board/card/c1?level=50%20%25", "/$board/scene/s1?run=go"]
                );
            })
            .await;
    }
}
