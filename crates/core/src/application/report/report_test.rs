//! Orchestrator tests over the in-memory ports

use super::*;
use crate::domain::{OpenInterval, StoreStatus, WindowResult};
use crate::port::id_provider::mocks::SequentialIdProvider;
use crate::port::observation_source::mocks::InMemoryStoreData;
use crate::port::report_repository::mocks::InMemoryReportRepository;
use crate::port::report_sink::mocks::MemorySink;
use crate::port::time_provider::mocks::ManualTimeProvider;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

struct Fixture {
    data: Arc<InMemoryStoreData>,
    sink: Arc<MemorySink>,
    service: ReportService,
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 25, 18, 0, 0).unwrap()
}

fn fixture_with(sink: MemorySink, config: ReportConfig) -> Fixture {
    let data = Arc::new(InMemoryStoreData::new());
    let sink = Arc::new(sink);
    let service = ReportService::new(
        Arc::new(InMemoryReportRepository::new()),
        data.clone(),
        data.clone(),
        sink.clone(),
        Arc::new(SequentialIdProvider::new("r")),
        Arc::new(ManualTimeProvider::new(1_000)),
        config,
    );
    Fixture {
        data,
        sink,
        service,
    }
}

fn fixture() -> Fixture {
    fixture_with(MemorySink::new(), ReportConfig::default())
}

async fn wait_terminal(service: &ReportService, id: &str) -> ReportStatus {
    for _ in 0..500 {
        let status = service.poll(id).await.unwrap();
        if status != ReportStatus::Running {
            return status;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("report {} never left Running", id);
}

/// Store `a` active for the two hours before the anchor
fn seed_active_store(data: &InMemoryStoreData) {
    data.add_observation("a", base() - Duration::hours(2), StoreStatus::Active);
    data.add_observation("a", base(), StoreStatus::Active);
}

#[tokio::test]
async fn test_trigger_returns_running_then_completes() {
    let f = fixture();
    seed_active_store(&f.data);
    f.data.set_read_delay(std::time::Duration::from_millis(100));

    let id = tokio_test::assert_ok!(f.service.trigger().await);
    assert_eq!(id, "r-1");
    assert_eq!(f.service.poll(&id).await.unwrap(), ReportStatus::Running);

    let status = wait_terminal(&f.service, &id).await;
    assert_eq!(
        status,
        ReportStatus::Complete {
            file: "memory://report_r-1.csv".to_string(),
            store_faults: 0,
        }
    );

    let job = f.service.get(&id).await.unwrap();
    assert_eq!(job.anchor_time, Some(base()));
    assert_eq!(job.rows.len(), 1);
    let row = &job.rows[0];
    assert_eq!(row.uptime_last_hour, 60.0);
    assert_eq!(row.downtime_last_hour, 0.0);
    assert_eq!(row.uptime_last_day, 2.0);
    assert_eq!(row.uptime_last_week, 2.0);
    assert_eq!(f.sink.rows(&id).unwrap(), job.rows);
}

#[tokio::test]
async fn test_poll_complete_is_idempotent() {
    let f = fixture();
    seed_active_store(&f.data);

    let id = f.service.trigger().await.unwrap();
    let first = wait_terminal(&f.service, &id).await;
    for _ in 0..5 {
        assert_eq!(f.service.poll(&id).await.unwrap(), first);
    }
    assert_eq!(f.sink.write_count(), 1);
}

#[tokio::test]
async fn test_poll_unknown_id_is_not_found() {
    let f = fixture();
    let err = f.service.poll("nope").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_store_list_failure_fails_job() {
    let f = fixture();
    seed_active_store(&f.data);
    f.data.fail_store_list();

    let id = f.service.trigger().await.unwrap();
    match wait_terminal(&f.service, &id).await {
        ReportStatus::Failed { error } => assert!(error.contains("store list")),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert!(f.service.get(&id).await.unwrap().rows.is_empty());
    assert_eq!(f.sink.write_count(), 0);
}

#[tokio::test]
async fn test_sink_failure_fails_job() {
    let f = fixture_with(MemorySink::new_failing(), ReportConfig::default());
    seed_active_store(&f.data);

    let id = f.service.trigger().await.unwrap();
    match wait_terminal(&f.service, &id).await {
        ReportStatus::Failed { error } => assert!(error.contains("cannot write report artifact")),
        other => panic!("expected Failed, got {:?}", other),
    }
    let job = f.service.get(&id).await.unwrap();
    assert!(job.rows.is_empty());
    assert!(job.artifact.is_none());
}

#[tokio::test]
async fn test_store_fault_yields_zero_row() {
    let f = fixture();
    seed_active_store(&f.data);
    f.data.add_observation("c", base(), StoreStatus::Inactive);
    f.data.add_observation("b", base(), StoreStatus::Active);
    f.data.fail_reads_for("b");

    let id = f.service.trigger().await.unwrap();
    let status = wait_terminal(&f.service, &id).await;
    assert!(matches!(status, ReportStatus::Complete { store_faults: 1, .. }));

    let job = f.service.get(&id).await.unwrap();
    let ids: Vec<&str> = job.rows.iter().map(|r| r.store_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(job.rows[1], WindowResult::zero("b"));
    assert_eq!(job.store_faults.len(), 1);
    assert_eq!(job.store_faults[0].store_id, "b");
}

#[tokio::test]
async fn test_malformed_schedule_is_store_fault() {
    let f = fixture();
    seed_active_store(&f.data);
    f.data.add_observation("z", base(), StoreStatus::Active);
    f.data.add_interval(
        "z",
        OpenInterval::new(
            9,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        ),
    );

    let id = f.service.trigger().await.unwrap();
    wait_terminal(&f.service, &id).await;

    let job = f.service.get(&id).await.unwrap();
    assert_eq!(job.state, crate::domain::ReportState::Complete);
    assert_eq!(job.rows.len(), 2);
    assert_eq!(job.store_faults[0].store_id, "z");
    assert!(job.rows[0].uptime_last_hour > 0.0);
}

#[tokio::test]
async fn test_back_to_back_jobs_are_independent() {
    let f = fixture_with(
        MemorySink::new(),
        ReportConfig {
            workers: 1,
            ..ReportConfig::default()
        },
    );
    seed_active_store(&f.data);

    let first = f.service.trigger().await.unwrap();
    let second = f.service.trigger().await.unwrap();
    assert_ne!(first, second);

    assert!(matches!(
        wait_terminal(&f.service, &first).await,
        ReportStatus::Complete { .. }
    ));
    assert!(matches!(
        wait_terminal(&f.service, &second).await,
        ReportStatus::Complete { .. }
    ));
}

#[tokio::test]
async fn test_anchor_is_per_job() {
    let f = fixture();
    seed_active_store(&f.data);

    let first = f.service.trigger().await.unwrap();
    wait_terminal(&f.service, &first).await;

    // superset: one more sample, thirty minutes later
    let later = base() + Duration::minutes(30);
    f.data.add_observation("a", later, StoreStatus::Inactive);

    let second = f.service.trigger().await.unwrap();
    wait_terminal(&f.service, &second).await;

    let first_job = f.service.get(&first).await.unwrap();
    let second_job = f.service.get(&second).await.unwrap();
    assert_eq!(first_job.anchor_time, Some(base()));
    assert_eq!(second_job.anchor_time, Some(later));
    assert_eq!(first_job.rows[0].downtime_last_hour, 0.0);
    // the new sample sits exactly at the anchor: nothing after it counts
    assert_eq!(second_job.rows[0].uptime_last_hour, 60.0);
}

#[tokio::test]
async fn test_no_observations_gives_zero_rows() {
    let f = fixture();
    f.data.set_timezone("quiet", "Asia/Beirut");

    let id = f.service.trigger().await.unwrap();
    wait_terminal(&f.service, &id).await;

    let job = f.service.get(&id).await.unwrap();
    assert_eq!(job.anchor_time, None);
    assert_eq!(job.rows, vec![WindowResult::zero("quiet")]);
}
