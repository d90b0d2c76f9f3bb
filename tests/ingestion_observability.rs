use std::sync::{Arc, Mutex};

use tabular_ingest::ingestion::{
    CompositeObserver, DelimitedTextLoader, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    LogObserver, SourceFormat, TabularDocument,
};
use tabular_ingest::IngestionError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<(SourceFormat, IngestionStats)>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push((ctx.format, stats));
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

#[test]
fn observer_receives_failure_and_alert_on_missing_file() {
    let obs = Arc::new(RecordingObserver::default());
    let mut doc = DelimitedTextLoader::new("tests/fixtures/does_not_exist.csv")
        .with_observer(obs.clone(), IngestionSeverity::Critical);

    assert!(!doc.load());

    let failures = obs.failures.lock().unwrap().clone();
    let alerts = obs.alerts.lock().unwrap().clone();
    assert_eq!(failures, vec![IngestionSeverity::Critical]);
    assert_eq!(alerts, vec![IngestionSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_non_critical_error() {
    let obs = Arc::new(RecordingObserver::default());
    let mut doc = DelimitedTextLoader::new("tests/fixtures/people.csv")
        .with_encoding("not-an-encoding")
        .with_observer(obs.clone(), IngestionSeverity::Critical);

    assert!(!doc.load());

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures, vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_success_with_parsed_shape() {
    let obs = Arc::new(RecordingObserver::default());
    let mut doc =
        DelimitedTextLoader::new("tests/fixtures/duplicates.csv").with_observer(obs.clone(), IngestionSeverity::Error);

    assert!(doc.load());

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(
        successes,
        vec![(SourceFormat::Delimited, IngestionStats { rows: 2, columns: 2 })]
    );
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn composite_observer_fans_out() {
    let a = Arc::new(RecordingObserver::default());
    let b = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn IngestionObserver>> = vec![a.clone(), b.clone(), Arc::new(LogObserver)];
    let composite = Arc::new(CompositeObserver::new(observers));

    let mut doc = DelimitedTextLoader::new("tests/fixtures/does_not_exist.csv")
        .with_observer(composite, IngestionSeverity::Error);
    assert!(!doc.load());

    assert_eq!(a.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Critical]);
    assert_eq!(b.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Critical]);
}

#[test]
fn severity_classification() {
    let not_found = IngestionError::NotFound {
        path: "x.csv".into(),
    };
    assert_eq!(IngestionSeverity::for_error(&not_found), IngestionSeverity::Critical);

    let contract = IngestionError::ContractViolation {
        message: "ragged".to_string(),
    };
    assert_eq!(IngestionSeverity::for_error(&contract), IngestionSeverity::Error);
    assert!(IngestionSeverity::Critical > IngestionSeverity::Warning);
}
