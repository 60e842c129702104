//! Integration tests for the out-of-process background entry point.

mod common;

use chrono::Duration;

use carenudge_core::{
    run_background_task, BackgroundRunOutcome, BackgroundTask, Clock, DeliveryRecord,
    EngineConfig, StateStore, TaskDescriptor,
};
use common::TestBed;

#[tokio::test]
async fn unlock_check_shows_a_nudge_inside_a_window() {
    // 09:00 local falls inside the morning window.
    let bed = TestBed::new();
    let descriptor = TaskDescriptor::new(BackgroundTask::DeviceUnlockCheck, bed.clock.now_utc());

    let outcome = run_background_task(
        &descriptor,
        bed.deps(StateStore::open_in_memory().unwrap()),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    match outcome {
        BackgroundRunOutcome::NudgeShown { template_id } => {
            assert_eq!(template_id, "tpl-calm-01");
        }
        other => panic!("expected NudgeShown, got {other:?}"),
    }
    assert_eq!(bed.transport.shown.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unlock_check_outside_all_windows_does_nothing() {
    let bed = TestBed::at(22, 30);
    let descriptor = TaskDescriptor::new(BackgroundTask::DeviceUnlockCheck, bed.clock.now_utc());

    let outcome = run_background_task(
        &descriptor,
        bed.deps(StateStore::open_in_memory().unwrap()),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, BackgroundRunOutcome::NothingDue { .. }));
    assert!(bed.transport.shown.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cleanup_prunes_old_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("carenudge.db");
    let bed = TestBed::new();
    {
        let store = StateStore::open_at(&path).unwrap();
        store
            .record_delivery(&DeliveryRecord {
                notification_id: 1001,
                template_id: "tpl-calm-01".to_string(),
                delivered_at: bed.clock.now_utc() - Duration::days(45),
                response: None,
            })
            .unwrap();
        store
            .record_delivery(&DeliveryRecord {
                notification_id: 1002,
                template_id: "tpl-calm-01".to_string(),
                delivered_at: bed.clock.now_utc() - Duration::days(2),
                response: None,
            })
            .unwrap();
    }

    let descriptor = TaskDescriptor::new(BackgroundTask::DailyCleanup, bed.clock.now_utc());
    let outcome = run_background_task(
        &descriptor,
        bed.deps(StateStore::open_at(&path).unwrap()),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    match outcome {
        BackgroundRunOutcome::Pruned { removed } => assert_eq!(removed, 1),
        other => panic!("expected Pruned, got {other:?}"),
    }
    let store = StateStore::open_at(&path).unwrap();
    assert!(store.delivery(1001).unwrap().is_none());
    assert!(store.delivery(1002).unwrap().is_some());
}
