mod common;

use common::{camiseta, cor_mapping, service, PARENT};
use l2g_core::audit::{AuditLayer, AuditSink};
use l2g_core::AttributeMapping;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

fn capture<T>(f: impl FnOnce() -> T) -> (T, AuditSink) {
    let sink = AuditSink::memory();
    let subscriber = Registry::default().with(AuditLayer::new(sink.clone()));
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, sink)
}

#[test]
fn test_every_apply_record_carries_corr_id() {
    let service = service(camiseta());

    let (report, sink) = capture(|| service.apply(PARENT, &[cor_mapping()]).unwrap());

    let records = sink.records();
    assert!(!records.is_empty());
    for record in &records {
        assert_eq!(
            record.field_str("corr_id"),
            Some(report.corr_id.as_str()),
            "{} lacks the run's corr_id",
            record.event
        );
        assert_eq!(record.field_str("operation"), Some("apply"));
        assert_eq!(record.source, "local2global");
    }

    let events = sink.events();
    for expected in [
        "map.request_received",
        "attribute.created",
        "term.created",
        "apply.attribute_replaced",
        "variation.process.start",
        "variation.update.direct_meta",
        "variation.skip.no_strategy",
        "variation.update.summary",
        "apply.completed",
    ] {
        assert!(events.iter().any(|e| e == expected), "missing {}", expected);
    }
}

#[test]
fn test_validation_failure_is_audited() {
    let service = service(camiseta());
    let mapping = AttributeMapping::new("Cor", "").create_attribute(true);

    let (err, sink) = capture(|| service.apply(PARENT, &[mapping]).unwrap_err());

    let failure = sink
        .records()
        .into_iter()
        .find(|r| r.event == "map.validation_failed")
        .unwrap();
    assert_eq!(failure.level, "WARN");
    assert_eq!(failure.field_str("corr_id"), Some(err.corr_id.as_str()));
    assert_eq!(failure.field_str("code"), Some("l2g_validation"));
}

#[test]
fn test_finalization_failure_is_an_error_record() {
    let store = camiseta();
    store.inject_failure(l2g_storage::StoreOp::GetChild, "variation failure");
    let service = service(store);

    let (_, sink) = capture(|| service.apply(PARENT, &[cor_mapping()]).unwrap_err());

    let failure = sink
        .records()
        .into_iter()
        .find(|r| r.event == "apply.failed")
        .unwrap();
    assert_eq!(failure.level, "ERROR");
    assert_eq!(failure.field("status"), Some(&serde_json::json!(500)));
}

#[test]
fn test_dropped_write_logs_persistence_failure() {
    let service = service(camiseta());
    service.store().drop_next_meta_write();

    let (_, sink) = capture(|| service.apply(PARENT, &[cor_mapping()]).unwrap());

    let events = sink.events();
    assert!(events.iter().any(|e| e == "variation.persistence_failure"));
    assert!(events.iter().any(|e| e == "variation.persistence_verified"));
}
