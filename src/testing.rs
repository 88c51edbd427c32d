//! A capturing subscriber for asserting on emitted records.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use sea_orm::ConnectionTrait;
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::connection::TracedConnection;
use crate::filter::FrameFilter;
use crate::logger::QueryLogger;

#[derive(Debug, Clone)]
pub(crate) struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Capture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Filters that exclude the logging path itself, so frames in this file count
/// as the application.
pub(crate) fn attribution_filters() -> Vec<FrameFilter> {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut filters: Vec<FrameFilter> = ["tracer.rs", "handle.rs", "resolver.rs", "connection.rs"]
        .iter()
        .map(|file| FrameFilter::path_prefix(src.join(file)))
        .collect();
    filters.push(FrameFilter::package("backtrace"));
    filters.push(FrameFilter::RustStd);
    filters
}

/// Run `trace` on `logger` and return the `file:line` of the call.
#[inline(never)]
pub(crate) fn trace_from_here(logger: &dyn QueryLogger) -> String {
    let line = line!() + 1;
    logger.trace(Instant::now(), Box::new(|| ("SELECT 1".to_string(), 1)), None);
    format!("{}:{}", file!(), line)
}

/// Run one statement through `db` and return the `file:line` of the call.
pub(crate) async fn execute_from_here(db: &TracedConnection) -> String {
    let line = line!() + 1;
    let _ = db.execute_unprepared("UPDATE carts SET open = false").await;
    format!("{}:{}", file!(), line)
}
