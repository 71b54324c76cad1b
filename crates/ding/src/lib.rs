//! **ding** -- a reactive widget-binding runtime.
//!
//! This is the umbrella crate that re-exports everything you need from a
//! single dependency:
//!
//! ```toml
//! [dependencies]
//! ding = "0.1"
//! ```
//!
//! # Re-exports
//!
//! * All public items from [`ding_core`] are available at the crate root
//!   ([`Hub`], [`Registry`], [`Runtime`], [`Behavior`], [`Element`], etc.).
//! * The [`widgets`] module re-exports everything from [`ding_widgets`]
//!   (generic, timer, button and switch behaviors).
//! * [`logging`] installs a `tracing` subscriber.
//! * [`serde_json`] and [`tokio`] are re-exported so hosts can publish JSON
//!   and run a `LocalSet` without depending on them directly.
//!
//! # Quick start
//!
//! ```
//! use ding::prelude::*;
//! use std::rc::Rc;
//!
//! let runtime = Runtime::new(RuntimeOptions::default(), Rc::new(RecordingTransport::new()));
//! register_all(&runtime);
//!
//! let document = Element::new("body");
//! runtime.start(&document);
//! runtime
//!     .load_markup(r#"<div u-control="timer" u-is="timer" microid="${id}"></div>"#)
//!     .unwrap();
//! runtime.document_loaded();
//!
//! let props: Props = [("id".to_string(), "/t1".to_string())].into();
//! let timer = runtime.insert_widget(&document, "timer", &props).unwrap();
//! runtime
//!     .hub()
//!     .publish_object(&ding::serde_json::json!({"t1": {"waittime": "5s", "pulsetime": "2s"}}));
//! assert_eq!(Timing::of(&timer).cycle, 7.0);
//! runtime.shutdown();
//! ```

pub mod logging;

pub use ding_core::*;
pub mod widgets {
    pub use ding_widgets::*;
}

/// The types most hosts need.
pub mod prelude {
    pub use ding_core::testing::RecordingTransport;
    pub use ding_core::{
        Behavior, Context, Element, Hub, Props, Registry, Runtime, RuntimeOptions, Transport,
        TransportError,
    };
    pub use ding_widgets::{register_all, Timing};
}

// Re-export dependencies for use in demos and downstream crates
pub use serde_json;
pub use tokio;
