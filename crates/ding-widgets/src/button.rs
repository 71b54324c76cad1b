//! Momentary push button: `value=1` while pressed, `value=0` on release.

use ding_core::{Behavior, Context};
use std::rc::Rc;

pub const NAME: &str = "button";

/// Class marking the pressable part of the widget.
pub const BUTTON_CLASS: &str = "u-button";

pub fn button(ctx: &Context, base: &Rc<Behavior>) -> Rc<Behavior> {
    let down = ctx.clone();
    let up = ctx.clone();
    Behavior::builder(NAME)
        .inherit(base)
        .on("pointerdown", move |el, event| {
            let src = event.target();
            if src.has_class(BUTTON_CLASS) {
                src.toggle_class("active", true);
                down.dispatch_action(el, Some("value"), Some("1"));
            }
        })
        .on("pointerup", move |el, event| {
            let src = event.target();
            if src.has_class(BUTTON_CLASS) {
                src.toggle_class("active", false);
                up.dispatch_action(el, Some("value"), Some("0"));
            }
        })
        .build()
}
