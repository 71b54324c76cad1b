//! Test helpers: a recorder for hub callbacks and a scriptable transport.
//!
//! Both types are cheap handles; clones share their recordings, so a clone
//! can be moved into a callback or a dispatcher while the test keeps the
//! original for assertions.
//!
//! # Example
//!
//! ```
//! use ding_core::testing::Recorder;
//! use ding_core::Hub;
//!
//! let hub = Hub::new();
//! let rec = Recorder::new();
//! hub.subscribe("/lamp?*", rec.callback(), false).unwrap();
//! hub.publish_value("/lamp", Some("on"), Some("1"));
//! assert_eq!(rec.calls(), vec!["/lamp?on=1"]);
//! ```

use crate::dispatch::{Transport, TransportError};
use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Records hub notifications as `path?key=value` strings.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hub callback appending to this recorder.
    pub fn callback(&self) -> impl Fn(&str, Option<&str>, Option<&str>) + Clone + 'static {
        let calls = Rc::clone(&self.calls);
        move |path: &str, key: Option<&str>, value: Option<&str>| {
            calls.borrow_mut().push(format_call(path, key, value));
        }
    }

    /// Like [`callback`](Recorder::callback), prefixing entries with `tag:`.
    pub fn tagged(&self, tag: &str) -> impl Fn(&str, Option<&str>, Option<&str>) + Clone + 'static {
        let calls = Rc::clone(&self.calls);
        let tag = tag.to_string();
        move |path: &str, key: Option<&str>, value: Option<&str>| {
            calls
                .borrow_mut()
                .push(format!("{tag}:{}", format_call(path, key, value)));
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

fn format_call(path: &str, key: Option<&str>, value: Option<&str>) -> String {
    let mut out = path.to_string();
    if let Some(key) = key {
        out.push('?');
        out.push_str(key);
    }
    if let Some(value) = value {
        out.push('=');
        out.push_str(value);
    }
    out
}

#[derive(Default)]
struct TransportState {
    sent: RefCell<Vec<String>>,
    delay: Cell<Duration>,
    failures: Cell<usize>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

/// A [`Transport`] that records every URL it is asked to send.
///
/// Sends take [`with_delay`](RecordingTransport::with_delay) to complete
/// (immediately by default) and succeed unless failures were scripted with
/// [`fail_next`](RecordingTransport::fail_next).
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Rc<TransportState>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.delay.set(delay);
        self
    }

    /// Make the next `count` sends fail.
    pub fn fail_next(&self, count: usize) {
        self.state.failures.set(count);
    }

    /// URLs in the order their sends started, failed ones included.
    pub fn sent(&self) -> Vec<String> {
        self.state.sent.borrow().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.state.in_flight.get()
    }

    /// Highest number of sends that were ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.get()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, url: &str) -> LocalBoxFuture<'static, Result<(), TransportError>> {
        let state = Rc::clone(&self.state);
        let url = url.to_string();
        async move {
            state.sent.borrow_mut().push(url.clone());
            let running = state.in_flight.get() + 1;
            state.in_flight.set(running);
            state.max_in_flight.set(state.max_in_flight.get().max(running));

            let delay = state.delay.get();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            state.in_flight.set(state.in_flight.get() - 1);

            let failures = state.failures.get();
            if failures > 0 {
                state.failures.set(failures - 1);
                return Err(TransportError::Failed {
                    url,
                    reason: "scripted failure".into(),
                });
            }
            Ok(())
        }
        .boxed_local()
    }
}
