//! Ready-made widget behaviors for the **ding** runtime.
//!
//! Each behavior is built against a [`Context`](ding_core::Context) and
//! registered with [`Runtime::define`](ding_core::Runtime::define), or all
//! at once with [`register_all`].
//!
//! # Widgets
//!
//! | Module | Control name | Description |
//! |--------|--------------|-------------|
//! | [`generic`] | `generic` | Data-bound text, values, activity dots and actions |
//! | [`timer`] | `timer` | Wait / pulse / cycle timer with a progress bar |
//! | [`button`] | `button` | Momentary push button |
//! | [`switch`] | `switch` | On/off toggle |
//!
//! # Utilities
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`convert`] | [`to_seconds`] and [`to_bool`] for hub values |

pub mod button;
pub mod convert;
pub mod generic;
pub mod switch;
pub mod timer;

pub use convert::{to_bool, to_seconds};
pub use timer::Timing;

use ding_core::Runtime;
use tracing::debug;

/// Define every widget of this crate on `runtime`.
pub fn register_all(runtime: &Runtime) {
    let ctx = runtime.context();
    let base = generic::generic(&ctx);
    runtime.define(timer::NAME, timer::timer(&base));
    runtime.define(button::NAME, button::button(&ctx, &base));
    runtime.define(switch::NAME, switch::switch(&ctx, &base));
    runtime.define(generic::NAME, base);
    debug!("widget behaviors registered");
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::register_all;
    use ding_core::testing::RecordingTransport;
    use ding_core::{Element, Props, Runtime, RuntimeOptions};
    use std::rc::Rc;

    /// A loaded runtime with every widget defined and `markup` as templates.
    pub fn loaded(markup: &str) -> (Runtime, Element, RecordingTransport) {
        let transport = RecordingTransport::new();
        let runtime = Runtime::new(RuntimeOptions::default(), Rc::new(transport.clone()));
        register_all(&runtime);
        let document = Element::new("body");
        runtime.start(&document);
        runtime.load_markup(markup).unwrap();
        runtime.document_loaded();
        (runtime, document, transport)
    }

    pub fn props(pairs: &[(&str, &str)]) -> Props {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}
