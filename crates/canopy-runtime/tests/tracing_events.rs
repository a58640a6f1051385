#![forbid(unsafe_code)]

//! Structured log events emitted by a session.
//!
//! Run:
//!   cargo test -p canopy-runtime --test tracing_events

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use canopy_core::{FieldRef, Row};
use canopy_runtime::{DataPush, Session, Viewport};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
    fields: HashMap<String, String>,
    span: Option<String>,
}

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Default)]
struct Captured {
    events: Vec<CapturedEvent>,
    spans: Vec<CapturedSpan>,
    span_index: HashMap<u64, usize>,
}

struct Capture(Arc<Mutex<Captured>>);

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let mut captured = self.0.lock().unwrap();
        let idx = captured.spans.len();
        captured.spans.push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
        captured.span_index.insert(id.into_u64(), idx);
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        values.record(&mut visitor);
        let mut captured = self.0.lock().unwrap();
        let idx = captured.span_index.get(&id.into_u64()).copied();
        if let Some(idx) = idx {
            captured.spans[idx].fields.extend(visitor.0);
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let span = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span| span.name().to_string());
        self.0.lock().unwrap().events.push(CapturedEvent {
            level: *event.metadata().level(),
            message: fields.get("message").cloned().unwrap_or_default(),
            fields,
            span,
        });
    }
}

fn capture(f: impl FnOnce()) -> Captured {
    let shared = Arc::new(Mutex::new(Captured::default()));
    let subscriber = tracing_subscriber::registry().with(Capture(shared.clone()));
    tracing::subscriber::with_default(subscriber, f);
    let mut guard = shared.lock().unwrap();
    std::mem::take(&mut *guard)
}

fn push() -> DataPush {
    let rows = [
        json!({"dims": ["FR", "Paris"], "metric": [10]}),
        json!({"dims": ["US", "NYC"], "metric": [20]}),
    ]
    .iter()
    .map(Row::from_json)
    .collect();
    DataPush::new(
        vec![FieldRef::new("country", "Country"), FieldRef::new("city", "City")],
        Some(FieldRef::new("sales", "Sales")),
        rows,
    )
}

fn find<'a>(captured: &'a Captured, message: &str) -> &'a CapturedEvent {
    captured
        .events
        .iter()
        .find(|e| e.message == message)
        .unwrap_or_else(|| panic!("no `{message}` event in {:?}", captured.events))
}

#[test]
fn ready_push_logs_inside_push_span() {
    let captured = capture(|| {
        let mut session = Session::default();
        assert!(session.push_data(&push(), Some(Viewport::FALLBACK)).is_ready());
    });

    let build = find(&captured, "hierarchy.build");
    assert_eq!(build.level, tracing::Level::DEBUG);
    assert_eq!(build.fields["rows"], "2");
    assert_eq!(build.span.as_deref(), Some("session.push"));

    let ready = find(&captured, "session.ready");
    assert_eq!(ready.fields["nodes"], "5");
    assert_eq!(ready.fields["root_value"], "30");

    let materialize = find(&captured, "tree.materialize");
    assert_eq!(materialize.fields["visible"], "5");

    let span = captured
        .spans
        .iter()
        .find(|s| s.name == "session.push")
        .unwrap();
    assert_eq!(span.fields["rows"], "2");
    assert!(span.fields.contains_key("duration_us"));
}

#[test]
fn precondition_failure_logs_warning() {
    let captured = capture(|| {
        let mut session = Session::default();
        let mut push = push();
        push.rows.clear();
        session.push_data(&push, Some(Viewport::FALLBACK));
    });
    let warn = find(&captured, "session.cannot_render");
    assert_eq!(warn.level, tracing::Level::WARN);
    assert_eq!(warn.fields["reason"], "empty_rows");
    assert_eq!(warn.fields["detail"], "no data rows");
}

#[test]
fn toggle_logs_action_and_node() {
    let captured = capture(|| {
        let mut session = Session::default();
        session.push_data(&push(), Some(Viewport::FALLBACK));
        let fr = session.find_path(&["FR"]).unwrap();
        session.toggle(fr);
    });
    let toggle = find(&captured, "tree.toggle");
    assert_eq!(toggle.fields["action"], "collapse");
    assert_eq!(toggle.fields["label"], "FR");
    assert_eq!(toggle.fields["visible"], "4");
    assert!(toggle.fields["node"].starts_with('n'));
}
