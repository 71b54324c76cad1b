//! A headless dashboard: one timer and one switch driven by published JSON.
//!
//! The "endpoint" is an in-process channel. Each action URL is applied back
//! to the hub, the way a device answers with fresh state.
//!
//! Run with `RUST_LOG=ding_core=debug cargo run --example dashboard` to see
//! the hub and dispatch traffic.

use ding::prelude::*;
use ding::serde_json::json;
use ding::{render, LocalBoxFuture};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

const TEMPLATES: &str = r#"
<div u-control="timer" u-is="timer" microid="${id}" class="card">
  <h4 u-text="name">${title}</h4>
  <input u-value="waittime">
  <input u-value="pulsetime">
  <div class="u-bar"><div class="pulse"></div><div class="current"></div></div>
</div>
<div u-control="switch" u-is="switch" microid="${id}" class="card">
  <h4>${title}</h4>
  <div class="u-switch"><span u-active="value" class="dot"></span></div>
</div>
"#;

struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl Transport for ChannelTransport {
    fn send(&self, url: &str) -> LocalBoxFuture<'static, Result<(), TransportError>> {
        let sent = self.tx.send(url.to_string()).map_err(|_| TransportError::Failed {
            url: url.to_string(),
            reason: "endpoint closed".into(),
        });
        Box::pin(async move { sent })
    }
}

/// Apply `/$board/<path>?<key>=<value>` to the hub.
fn apply(hub: &Hub, url: &str) {
    let Some((path, query)) = url.trim_start_matches("/$board").split_once('?') else {
        return;
    };
    let Some((key, value)) = query.split_once('=') else {
        return;
    };
    if key == "toggle" {
        let on = hub
            .read(&format!("{path}/value"))
            .is_some_and(|v| ding::widgets::to_bool(&v));
        hub.publish_value(path, Some("value"), Some(if on { "0" } else { "1" }));
    } else {
        hub.publish_value(path, Some(key), Some(value));
    }
}

fn props(pairs: &[(&str, &str)]) -> Props {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ding::Error> {
    if let Err(err) = ding::logging::init("info") {
        eprintln!("logging disabled: {err}");
    }

    LocalSet::new()
        .run_until(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let runtime = Runtime::new(RuntimeOptions::default(), Rc::new(ChannelTransport { tx }));
            register_all(&runtime);
            runtime.on_idle(|| tracing::info!("action queue drained"));

            let document = Element::new("body");
            runtime.start(&document);
            runtime.load_markup(TEMPLATES)?;
            runtime.document_loaded();

            let timer = runtime.insert_widget(
                &document,
                "timer",
                &props(&[("id", "/timer/t1"), ("title", "Garden pump")]),
            )?;
            let switch = runtime.insert_widget(
                &document,
                "switch",
                &props(&[("id", "/switch/s1"), ("title", "Porch light")]),
            )?;

            runtime.hub().publish_object(&json!({
                "timer": {"t1": {"name": "Garden pump", "waittime": "5s", "pulsetime": "2s", "time": "3s"}},
                "switch": {"s1": {"value": "0"}}
            }));
            println!("{}", render(&timer));
            println!("timing: {:?}", Timing::of(&timer));

            if let Some(knob) = switch.query_class("dot") {
                knob.dispatch_event("click");
            }
            while let Ok(Some(url)) =
                tokio::time::timeout(Duration::from_millis(200), rx.recv()).await
            {
                println!("-> {url}");
                apply(runtime.hub(), &url);
            }
            println!("{}", render(&switch));

            runtime.shutdown();
            Ok::<(), ding::Error>(())
        })
        .await
}
