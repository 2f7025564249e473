//! Scheduling behaviour of the polling controller.

mod common;

use std::time::Duration;

use common::*;
use tokio::time::Instant;
use weather_core::{
    Backoff, Controller, ObjectKey, Reconciler, ReportSpec, ReportState, ReportStore, Units,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESYNC: Duration = Duration::from_secs(60);

#[tokio::test]
async fn failed_attempt_backs_off_then_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(GEOCODING_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_location(&server, "Berlin", 52.52, 13.4).await;
    mount_current(&server, berlin_current()).await;

    let (store, key) = store_with_report("berlin", "Berlin").await;
    let mut controller = Controller::new(
        Reconciler::new(client_for(&server), store),
        Backoff::default(),
        RESYNC,
    );

    let start = Instant::now();
    let attempts = controller.process_due(start).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].1.is_err());
    assert_eq!(controller.failures(&key), 1);
    assert_eq!(controller.next_run(&key), Some(start + Duration::from_secs(5)));

    // Still backing off.
    let attempts = controller
        .process_due(start + Duration::from_secs(1))
        .await
        .unwrap();
    assert!(attempts.is_empty());

    let later = start + Duration::from_secs(6);
    let attempts = controller.process_due(later).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].1.as_ref().unwrap().state, ReportState::Success);
    assert_eq!(controller.failures(&key), 0);
    assert_eq!(controller.next_run(&key), Some(later + RESYNC));
}

#[tokio::test]
async fn repeated_failures_grow_the_backoff() {
    let server = MockServer::start().await;
    mount_no_location(&server, "Atlantis").await;

    let (store, key) = store_with_report("atlantis", "Atlantis").await;
    let mut controller = Controller::new(
        Reconciler::new(client_for(&server), store),
        Backoff::default(),
        RESYNC,
    );

    let mut now = Instant::now();
    for expected in [5, 10, 20] {
        controller.process_due(now).await.unwrap();
        let next = controller.next_run(&key).unwrap();
        assert_eq!(next - now, Duration::from_secs(expected));
        now = next;
    }
    assert_eq!(controller.failures(&key), 3);

    let stored = controller.reconciler().store().get(&key).await.unwrap();
    assert_eq!(stored.status.state, ReportState::Failed);
}

#[tokio::test]
async fn deleted_reports_are_forgotten() {
    let server = MockServer::start().await;
    mount_no_location(&server, "Atlantis").await;

    let (store, key) = store_with_report("atlantis", "Atlantis").await;
    let mut controller = Controller::new(
        Reconciler::new(client_for(&server), store),
        Backoff::default(),
        RESYNC,
    );

    let now = Instant::now();
    controller.process_due(now).await.unwrap();
    assert_eq!(controller.failures(&key), 1);

    controller.reconciler().store().delete(&key).await.unwrap();
    let attempts = controller.process_due(now).await.unwrap();
    assert!(attempts.is_empty());
    assert_eq!(controller.next_run(&key), None);
}

#[tokio::test]
async fn run_once_reconciles_every_report() {
    let server = MockServer::start().await;
    mount_location(&server, "Berlin", 52.52, 13.4).await;
    mount_no_location(&server, "Atlantis").await;
    mount_current(&server, berlin_current()).await;

    let (store, berlin) = store_with_report("berlin", "Berlin").await;
    let atlantis = ObjectKey::new("default", "atlantis");
    store
        .apply(
            atlantis.clone(),
            ReportSpec {
                location: "Atlantis".into(),
                units: Units::Standard,
            },
        )
        .await
        .unwrap();

    let controller = Controller::new(
        Reconciler::new(client_for(&server), store),
        Backoff::default(),
        RESYNC,
    );

    let attempts = controller.run_once().await.unwrap();
    assert_eq!(attempts.len(), 2);

    // Keys come back sorted.
    assert_eq!(attempts[0].0, atlantis);
    assert!(attempts[0].1.is_err());
    assert_eq!(attempts[1].0, berlin);
    assert!(attempts[1].1.is_ok());
}

#[tokio::test]
async fn run_stops_on_shutdown() {
    let server = MockServer::start().await;
    mount_location(&server, "Berlin", 52.52, 13.4).await;
    mount_current(&server, berlin_current()).await;

    let (store, key) = store_with_report("berlin", "Berlin").await;
    let mut controller = Controller::new(
        Reconciler::new(client_for(&server), store),
        Backoff::default(),
        RESYNC,
    );

    tokio::time::timeout(
        Duration::from_secs(10),
        controller.run(tokio::time::sleep(Duration::from_millis(300))),
    )
    .await
    .expect("controller should stop on shutdown");

    let stored = controller.reconciler().store().get(&key).await.unwrap();
    assert_eq!(stored.status.state, ReportState::Success);
}

#[tokio::test]
async fn oversized_intervals_do_not_overflow() {
    let server = MockServer::start().await;
    mount_location(&server, "Berlin", 52.52, 13.4).await;
    mount_no_location(&server, "Atlantis").await;
    mount_current(&server, berlin_current()).await;

    let huge = Duration::from_secs(i64::MAX as u64);
    let (store, berlin) = store_with_report("berlin", "Berlin").await;
    let atlantis = ObjectKey::new("default", "atlantis");
    store
        .apply(
            atlantis.clone(),
            ReportSpec {
                location: "Atlantis".into(),
                units: Units::Standard,
            },
        )
        .await
        .unwrap();

    let mut controller = Controller::new(
        Reconciler::new(client_for(&server), store),
        Backoff::new(huge, huge),
        huge,
    );

    tokio::time::timeout(
        Duration::from_secs(10),
        controller.run(tokio::time::sleep(Duration::from_millis(300))),
    )
    .await
    .expect("controller should stop on shutdown");

    let now = Instant::now();
    assert!(controller.next_run(&berlin).unwrap() > now);
    assert!(controller.next_run(&atlantis).unwrap() > now);
    assert_eq!(controller.failures(&atlantis), 1);
}
