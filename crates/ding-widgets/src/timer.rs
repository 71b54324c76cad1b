//! Pulse timer: waits, pulses, and repeats over a cycle.
//!
//! Extends [`generic`](crate::generic) with four durations read through
//! [`to_seconds`]: `waittime`, `pulsetime`, `cycletime` and the current
//! `time`. The cycle is never shorter than wait plus pulse. When the widget
//! has a `.u-bar` with `.pulse` and `.current` children, they are positioned
//! as percentages of the cycle.

use crate::convert::to_seconds;
use crate::generic::NEW_DATA;
use ding_core::{Behavior, Element};
use std::rc::Rc;

pub const NAME: &str = "timer";

/// The durations a timer widget tracks, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timing {
    pub wait: f64,
    pub pulse: f64,
    pub cycle: f64,
    pub time: f64,
}

impl Timing {
    const PROPERTIES: [&'static str; 4] = ["_wt", "_pt", "_ct", "_time"];

    /// Read the timing stored on `el`.
    pub fn of(el: &Element) -> Self {
        let [wait, pulse, cycle, time] = Self::PROPERTIES.map(|name| {
            el.property(name)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0)
        });
        Self {
            wait,
            pulse,
            cycle,
            time,
        }
    }

    fn store(&self, el: &Element) {
        let values = [self.wait, self.pulse, self.cycle, self.time];
        for (name, value) in Self::PROPERTIES.iter().zip(values) {
            el.set_property(name, value.to_string());
        }
    }

    /// Apply one notification.
    pub fn update(&mut self, key: &str, value: &str) {
        match key {
            "waittime" => self.wait = to_seconds(value),
            "pulsetime" => self.pulse = to_seconds(value),
            "cycletime" => self.cycle = to_seconds(value),
            "time" => self.time = to_seconds(value),
            _ => {}
        }
        self.cycle = self.cycle.max(self.wait + self.pulse);
    }

    fn percent(&self, seconds: f64) -> i64 {
        (seconds * 100.0 / self.cycle).floor() as i64
    }
}

/// Build the timer behavior on top of `base`, which must provide
/// `new_data`.
pub fn timer(base: &Rc<Behavior>) -> Rc<Behavior> {
    let base_new_data = base.method(NEW_DATA);
    Behavior::builder(NAME)
        .inherit(base)
        .method(NEW_DATA, move |el, args| {
            if let Some(base_new_data) = &base_new_data {
                base_new_data(el, args);
            }
            let arg = |n: usize| args.get(n).copied().unwrap_or_default();
            let mut timing = Timing::of(el);
            timing.update(arg(1), arg(2));
            timing.store(el);
            layout_bar(el, &timing);
            None
        })
        .build()
}

fn layout_bar(el: &Element, timing: &Timing) {
    if timing.cycle <= 0.0 {
        return;
    }
    let Some(bar) = el.query_class("u-bar") else {
        return;
    };
    if let Some(pulse) = bar.query_class("pulse") {
        pulse.set_attribute(
            "style",
            format!(
                "left:{}%;width:{}%",
                timing.percent(timing.wait),
                timing.percent(timing.pulse)
            ),
        );
    }
    if let Some(current) = bar.query_class("current") {
        current.set_attribute("style", format!("width:{}%", timing.percent(timing.time)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{loaded, props};
    use ding_core::testing::Recorder;
    use serde_json::json;

    const TIMER: &str = r#"
        <div u-control="timer" u-is="timer" microid="${id}">
          <h4 u-text="id"></h4>
          <input u-value="waittime">
          <div class="u-bar"><div class="pulse"></div><div class="current"></div></div>
        </div>"#;

    #[test]
    fn cycle_covers_wait_and_pulse() {
        let mut timing = Timing::default();
        timing.update("cycletime", "5s");
        timing.update("waittime", "1m");
        assert_eq!(timing.cycle, 60.0);
        timing.update("pulsetime", "30s");
        assert_eq!(timing.cycle, 90.0);
        timing.update("cycletime", "2m");
        assert_eq!(timing.cycle, 120.0);
    }

    #[test]
    fn published_object_drives_the_timer() {
        let (runtime, document, _) = loaded(TIMER);
        let widget = runtime
            .insert_widget(&document, "timer", &props(&[("id", "/t1")]))
            .unwrap();
        let rec = Recorder::new();
        runtime.hub().subscribe("/t1?*", rec.callback(), false).unwrap();

        runtime
            .hub()
            .publish_object(&json!({"t1": {"id": "t1", "waittime": "5s", "pulsetime": "2s"}}));

        assert_eq!(
            rec.calls(),
            vec!["/t1?id=t1", "/t1?waittime=5s", "/t1?pulsetime=2s"]
        );
        let timing = Timing::of(&widget);
        assert_eq!(timing.wait, 5.0);
        assert_eq!(timing.pulse, 2.0);
        assert_eq!(timing.cycle, 7.0);

        let pulse = widget.query_class("pulse").unwrap();
        assert_eq!(pulse.attribute("style").as_deref(), Some("left:71%;width:28%"));
        let current = widget.query_class("current").unwrap();
        assert_eq!(current.attribute("style").as_deref(), Some("width:0%"));

        // the inherited generic updates still run
        assert_eq!(widget.query_attribute("u-text", Some("id"))[0].text_content(), "t1");
        let input = widget.query_attribute("u-value", Some("waittime")).remove(0);
        assert_eq!(input.property("value").as_deref(), Some("5s"));
    }

    #[test]
    fn current_time_moves_the_bar() {
        let (runtime, document, _) = loaded(TIMER);
        let widget = runtime
            .insert_widget(&document, "timer", &props(&[("id", "/t2")]))
            .unwrap();
        let hub = runtime.hub();
        hub.publish_value("/t2", Some("cycletime"), Some("10s"));
        hub.publish_value("/t2", Some("time"), Some("4s"));
        let current = widget.query_class("current").unwrap();
        assert_eq!(current.attribute("style").as_deref(), Some("width:40%"));
    }
}
