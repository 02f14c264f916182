//! Custom tracing layer for audit logging

use super::{AuditRecord, AuditSink};
use crate::LOG_SOURCE;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Fields recorded on a span, kept in the span's extensions
#[derive(Debug, Default, Clone)]
struct SpanFields(Map<String, Value>);

/// Flattens span context and event fields into [`AuditRecord`]s
pub struct AuditLayer {
    sink: AuditSink,
    max_level: Level,
}

impl AuditLayer {
    /// Audit INFO and above
    pub fn new(sink: AuditSink) -> Self {
        Self {
            sink,
            max_level: Level::INFO,
        }
    }

    /// Include events up to and including `level` in verbosity
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }
}

impl<S> Layer<S> for AuditLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = SpanFields::default();
        attrs.record(&mut FieldVisitor(&mut fields.0));

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut extensions = span.extensions_mut();
            if let Some(fields) = extensions.get_mut::<SpanFields>() {
                values.record(&mut FieldVisitor(&mut fields.0));
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();

        // ERROR < WARN < INFO < DEBUG < TRACE in verbosity
        if *metadata.level() > self.max_level {
            return;
        }

        let mut context = Map::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    for (key, value) in &fields.0 {
                        context.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        event.record(&mut FieldVisitor(&mut context));

        let name = match context.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => metadata.name().to_string(),
        };

        self.sink.write(AuditRecord {
            timestamp: Utc::now(),
            level: metadata.level().to_string(),
            event: name,
            target: metadata.target().to_string(),
            context,
            source: LOG_SOURCE.to_string(),
        });
    }
}

/// Field visitor for extracting span/event fields
struct FieldVisitor<'a>(&'a mut Map<String, Value>);

impl<'a> tracing::field::Visit for FieldVisitor<'a> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), json!(format!("{:?}", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::OperationScope;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[test]
    fn test_events_inherit_scope_fields() {
        let sink = AuditSink::memory();
        let subscriber = Registry::default().with(AuditLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            OperationScope::new("l2g_test", 42, "apply").run(|| {
                tracing::info!(taxonomy = "pa_cor", slug = "azul", "term.created");
            });
        });

        let records = sink.records();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.event, "term.created");
        assert_eq!(record.level, "INFO");
        assert_eq!(record.source, "local2global");
        assert_eq!(record.field_str("corr_id"), Some("l2g_test"));
        assert_eq!(record.field("parent_id"), Some(&json!(42)));
        assert_eq!(record.field_str("operation"), Some("apply"));
        assert_eq!(record.field_str("taxonomy"), Some("pa_cor"));
        assert!(record.field("message").is_none());
    }

    #[test]
    fn test_level_filter() {
        let sink = AuditSink::memory();
        let subscriber = Registry::default().with(AuditLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("variation.process.start");
            tracing::warn!(raw = "Roxo", "variation.slug_map_missing");
        });

        assert_eq!(sink.events(), vec!["variation.slug_map_missing"]);
    }

    #[test]
    fn test_nested_spans_override_outer_fields() {
        let sink = AuditSink::memory();
        let subscriber = Registry::default()
            .with(AuditLayer::new(sink.clone()).with_max_level(Level::DEBUG));

        tracing::subscriber::with_default(subscriber, || {
            let outer = tracing::info_span!("outer", step = "plan", corr_id = "l2g_a");
            let _outer = outer.enter();
            let inner = tracing::info_span!("inner", step = "remap");
            let _inner = inner.enter();
            tracing::debug!("variation.process.start");
        });

        let records = sink.records();
        assert_eq!(records[0].field_str("step"), Some("remap"));
        assert_eq!(records[0].field_str("corr_id"), Some("l2g_a"));
    }
}
