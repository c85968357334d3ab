//! Event ordering tests for the reconciler behind a dispatcher.
//!
//! Properties verified:
//! - Every ordering of install, config-changed and database-available ends
//!   Active with nothing left pending
//! - The final configuration reflects the latest facts and options
//! - Lifecycle noise (start, slurmdbd-joined) does not change the outcome
//! - Failed restarts mixed into any ordering are recovered on the next
//!   successful dispatch

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use itertools::Itertools;
use proptest::prelude::*;
use serde_json::json;
use slurmdbd_core::Options;
use slurmdbd_events::{Dispatcher, InMemoryKeyValueStore, RelationData, UnitEvent};
use slurmdbd_reconciler::{
    ObservedState, Reconciler, ReconcilerBuilder, RecordingServiceManager, SharedOptions, Status,
    StoreStatusReporter,
};

struct Unit {
    dispatcher: Dispatcher<Reconciler>,
    service: Arc<RecordingServiceManager>,
    status: StoreStatusReporter,
}

fn unit() -> Unit {
    let store = InMemoryKeyValueStore::new_arc();
    let service = Arc::new(RecordingServiceManager::new("slurmdbd-0", 6819));

    let mut options = Options::new();
    options.insert("debug_level".to_string(), json!("verbose"));

    let reconciler = ReconcilerBuilder::new()
        .with_store(store.clone())
        .with_service(service.clone())
        .with_options(Arc::new(SharedOptions::new(options)))
        .build()
        .expect("reconciler should build");

    Unit {
        dispatcher: Dispatcher::new(reconciler, store.clone()),
        service,
        status: StoreStatusReporter::new(store),
    }
}

fn db_payload(host: &str) -> RelationData {
    RelationData::from([
        ("user".to_string(), json!("slurm")),
        ("password".to_string(), json!("secret")),
        ("host".to_string(), json!(host)),
        ("port".to_string(), json!("3306")),
        ("database".to_string(), json!("slurm_acct_db")),
    ])
}

async fn assert_active_with_host(unit: &Unit, host: &str) {
    let reconciler = unit.dispatcher.handler();
    assert_eq!(reconciler.observed_state().await.unwrap(), ObservedState::Active);
    assert_eq!(unit.status.last_status().await.unwrap(), Some(Status::active()));
    assert!(unit.dispatcher.pending().await.unwrap().is_empty());

    let config = unit.service.current_config().await.expect("a config was rendered");
    assert_eq!(config.get("host"), Some(&json!(host)));
    assert_eq!(config.get("database"), Some(&json!("slurm_acct_db")));
    assert_eq!(config.get("port"), Some(&json!(3306)));
    assert_eq!(config.get("debug_level"), Some(&json!("verbose")));
    assert_eq!(config.get("slurmdbd_hostname"), Some(&json!("slurmdbd-0")));
}

#[tokio::test]
async fn test_every_ordering_reaches_active() {
    let events = vec![
        UnitEvent::install(),
        UnitEvent::config_changed(),
        UnitEvent::database_available(db_payload("10.0.0.5")),
    ];

    for ordering in events.into_iter().permutations(3) {
        let names: Vec<&str> = ordering.iter().map(UnitEvent::event_type).collect();
        let unit = unit();

        for event in ordering {
            unit.dispatcher.dispatch(event).await.unwrap();
        }

        assert!(
            unit.dispatcher.pending().await.unwrap().is_empty(),
            "events left pending for ordering {names:?}"
        );
        assert_active_with_host(&unit, "10.0.0.5").await;
    }
}

#[tokio::test]
async fn test_config_changed_after_install_waits_for_database() {
    let unit = unit();
    unit.dispatcher.dispatch(UnitEvent::install()).await.unwrap();
    let report = unit
        .dispatcher
        .dispatch(UnitEvent::config_changed())
        .await
        .unwrap();

    assert_eq!(report.deferred.len(), 1);
    assert_eq!(
        unit.status.last_status().await.unwrap(),
        Some(Status::blocked("needs database relation"))
    );
    assert!(unit.service.renders().await.is_empty());

    // the deferred config-changed is redelivered and renders again
    let report = unit
        .dispatcher
        .dispatch(UnitEvent::database_available(db_payload("10.0.0.5")))
        .await
        .unwrap();
    assert_eq!(report.handled.len(), 2);
    assert_eq!(unit.service.renders().await.len(), 2);
}

#[tokio::test]
async fn test_repeated_reconcile_renders_identical_config() {
    let unit = unit();
    unit.dispatcher.dispatch(UnitEvent::install()).await.unwrap();
    unit.dispatcher
        .dispatch(UnitEvent::database_available(db_payload("10.0.0.5")))
        .await
        .unwrap();
    unit.dispatcher.dispatch(UnitEvent::config_changed()).await.unwrap();
    unit.dispatcher.dispatch(UnitEvent::config_changed()).await.unwrap();

    let renders = unit.service.renders().await;
    assert_eq!(renders.len(), 3);
    assert!(renders.iter().all_equal());
}

#[tokio::test]
async fn test_restart_failure_is_retried_on_next_dispatch() {
    let unit = unit();
    unit.dispatcher.dispatch(UnitEvent::install()).await.unwrap();

    unit.service.set_fail_restart(true);
    let result = unit
        .dispatcher
        .dispatch(UnitEvent::database_available(db_payload("10.0.0.5")))
        .await;
    assert!(result.is_err());
    assert_eq!(unit.dispatcher.pending().await.unwrap().len(), 1);

    unit.service.set_fail_restart(false);
    unit.dispatcher.dispatch(UnitEvent::start()).await.unwrap();

    assert_active_with_host(&unit, "10.0.0.5").await;
}

#[tokio::test]
async fn test_retried_database_event_does_not_override_newer_one() {
    let unit = unit();
    unit.dispatcher.dispatch(UnitEvent::install()).await.unwrap();

    unit.service.set_fail_restart(true);
    let result = unit
        .dispatcher
        .dispatch(UnitEvent::database_available(db_payload("10.0.0.5")))
        .await;
    assert!(result.is_err());

    unit.service.set_fail_restart(false);
    unit.dispatcher
        .dispatch(UnitEvent::database_available(db_payload("10.0.0.6")))
        .await
        .unwrap();

    let stored = unit
        .dispatcher
        .handler()
        .facts()
        .get_database_facts()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.hostname, "10.0.0.6");
    assert_eq!(unit.service.renders().await.len(), 1);
    assert_active_with_host(&unit, "10.0.0.6").await;
}

#[tokio::test]
async fn test_early_config_changes_render_once() {
    let unit = unit();
    unit.dispatcher.dispatch(UnitEvent::install()).await.unwrap();
    for _ in 0..4 {
        unit.dispatcher.dispatch(UnitEvent::config_changed()).await.unwrap();
    }

    unit.dispatcher
        .dispatch(UnitEvent::database_available(db_payload("10.0.0.5")))
        .await
        .unwrap();

    // one render for the database event, one for the collapsed config change
    assert_eq!(unit.service.renders().await.len(), 2);
    assert_active_with_host(&unit, "10.0.0.5").await;
}

// ==========================================================================
// PROPERTY: ordering independence with noise
// ==========================================================================

#[derive(Debug, Clone)]
enum Step {
    Install,
    ConfigChanged,
    Database(u8),
    Start,
    Joined,
    /// Make every restart in the next dispatch fail.
    FailNextRestart,
}

impl Step {
    fn event(&self) -> Option<UnitEvent> {
        match self {
            Self::Install => Some(UnitEvent::install()),
            Self::ConfigChanged => Some(UnitEvent::config_changed()),
            Self::Database(n) => Some(UnitEvent::database_available(db_payload(&host(*n)))),
            Self::Start => Some(UnitEvent::start()),
            Self::Joined => Some(UnitEvent::slurmdbd_joined()),
            Self::FailNextRestart => None,
        }
    }
}

fn host(n: u8) -> String {
    format!("10.0.0.{n}")
}

fn steps() -> impl Strategy<Value = Vec<Step>> {
    (
        prop::collection::vec(1u8..=254, 1..4),
        1usize..3,
        0usize..3,
        0usize..2,
        0usize..3,
    )
        .prop_flat_map(|(hosts, configs, starts, joins, failures)| {
            let mut steps = vec![Step::Install];
            steps.extend(hosts.into_iter().map(Step::Database));
            steps.extend(std::iter::repeat_n(Step::ConfigChanged, configs));
            steps.extend(std::iter::repeat_n(Step::Start, starts));
            steps.extend(std::iter::repeat_n(Step::Joined, joins));
            steps.extend(std::iter::repeat_n(Step::FailNextRestart, failures));
            Just(steps).prop_shuffle()
        })
}

proptest! {
    #[test]
    fn prop_any_ordering_converges_on_latest_facts(steps in steps()) {
        let expected_host = steps
            .iter()
            .filter_map(|step| match step {
                Step::Database(n) => Some(host(*n)),
                _ => None,
            })
            .last()
            .expect("at least one database step");

        let rt = tokio::runtime::Runtime::new().expect("runtime creation should succeed");
        rt.block_on(async {
            let unit = unit();
            for step in &steps {
                match step.event() {
                    Some(event) => {
                        // a failed restart keeps its event pending for the next dispatch
                        let _ = unit.dispatcher.dispatch(event).await;
                        unit.service.set_fail_restart(false);
                    }
                    None => unit.service.set_fail_restart(true),
                }
            }

            unit.service.set_fail_restart(false);
            unit.dispatcher.dispatch(UnitEvent::start()).await.unwrap();
            assert_active_with_host(&unit, &expected_host).await;
        });
    }
}
