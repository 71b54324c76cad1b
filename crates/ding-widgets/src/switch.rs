//! On/off switch: clicks on the `.u-switch` part send `toggle=1`.

use ding_core::{Behavior, Context};
use std::rc::Rc;

pub const NAME: &str = "switch";

/// Class marking the clickable part of the widget.
pub const SWITCH_CLASS: &str = "u-switch";

/// Clicks anywhere else get `base`'s click handling.
pub fn switch(ctx: &Context, base: &Rc<Behavior>) -> Rc<Behavior> {
    let ctx = ctx.clone();
    let fallback = base.handler("click");
    Behavior::builder(NAME)
        .inherit(base)
        .on("click", move |el, event| {
            let src = event.target();
            let on_switch = el
                .query_class(SWITCH_CLASS)
                .is_some_and(|knob| *src == knob || src.is_inside(&knob));
            if on_switch {
                ctx.dispatch_action(el, Some("toggle"), Some("1"));
            } else if let Some(fallback) = &fallback {
                fallback(el, event);
            }
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{loaded, props};
    use std::time::Duration;
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    const SWITCH: &str = r#"
        <div u-control="switch" u-is="switch" microid="${id}">
          <div class="u-switch"><span class="knob"></span></div>
          <button u-action="/scene/all?off=1" value="x">All off</button>
        </div>"#;

    #[tokio::test(start_paused = true)]
    async fn knob_toggles_and_other_clicks_fall_back() {
        LocalSet::new()
            .run_until(async {
                let (runtime, document, transport) = loaded(SWITCH);
                let widget = runtime
                    .insert_widget(&document, "switch", &props(&[("id", "/switch/s1")]))
                    .unwrap();

                widget.query_class("knob").unwrap().dispatch_event("click");
                sleep(Duration::from_millis(100)).await;
                widget
                    .query_attribute("u-action", None)
                    .remove(0)
                    .dispatch_event("click");
                sleep(Duration::from_millis(100)).await;

                assert_eq!(
                    transport.sent(),
                    vec!["/$board/switch/s1?toggle=1", "/$board/scene/all?off=1"]
                );
            })
            .await;
    }
}
