use super::fake::{config, FakePortal, MemoryStore};
use crate::driver::BrowserDriver;
use crate::{AutomationError, BatchError, BatchRunner, RowStatus};
use std::sync::Arc;

const WORKLIST: &str = "ID,Ação,Mod1,Status\n\
    1,delegar,Agent A,\n\
    2,delegar,Agent A,\n\
    3,mudar class,Preventiva,\n";

fn statuses(store: &MemoryStore) -> Vec<RowStatus> {
    store
        .saved()
        .expect("worklist was persisted")
        .rows()
        .iter()
        .map(|r| r.status.clone())
        .collect()
}

async fn connected(portal: &Arc<FakePortal>) -> Result<Arc<dyn BrowserDriver>, AutomationError> {
    Ok(portal.clone() as Arc<dyn BrowserDriver>)
}

#[tokio::test(start_paused = true)]
async fn test_failing_row_is_isolated() {
    let config = config();
    let mut portal = FakePortal::new(&config);
    portal.broken_records.insert("2".to_string());
    let portal = Arc::new(portal);
    let store = MemoryStore::from_csv(WORKLIST);

    let report = BatchRunner::new(&config, &store)
        .run_with(connected(&portal))
        .await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(
        statuses(&store),
        vec![RowStatus::Completed, RowStatus::Failed, RowStatus::Completed]
    );
    assert_eq!((report.completed, report.failed), (2, 1));
    assert_eq!(report.processed(), 3);
    assert_eq!(store.saves(), 1);
    assert_eq!(portal.quits(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rerun_skips_completed_rows() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let store = MemoryStore::from_csv(
        "ID,Ação,Mod1,Status\n\
         1,delegar,Agent A,Concluída\n\
         2,delegar,Agent A,Concluída (valor já correto)\n\
         3,delegar,Agent A,Falha\n",
    );

    let report = BatchRunner::new(&config, &store)
        .run_with(connected(&portal))
        .await;

    assert_eq!(report.eligible, 1);
    assert_eq!(report.skipped(), 2);
    assert_eq!(
        statuses(&store),
        vec![
            RowStatus::Completed,
            RowStatus::CompletedNoChange,
            RowStatus::Completed
        ]
    );
    let records: Vec<String> = portal
        .navigations()
        .into_iter()
        .filter(|url| url.contains("/records/"))
        .collect();
    assert_eq!(records, vec!["https://portal.test/records/3".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_blank_ids_are_never_processed() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let store = MemoryStore::from_csv("ID,Ação,Mod1\n ,delegar,Agent A\n5,delegar,Agent A\n");

    let report = BatchRunner::new(&config, &store)
        .run_with(connected(&portal))
        .await;

    assert_eq!(report.eligible, 1);
    assert_eq!(
        statuses(&store),
        vec![RowStatus::Pending, RowStatus::Completed]
    );
}

#[tokio::test(start_paused = true)]
async fn test_first_row_failure_is_still_persisted() {
    let config = config();
    let mut portal = FakePortal::new(&config);
    portal.broken_records.insert("1".to_string());
    let portal = Arc::new(portal);
    let store = MemoryStore::from_csv("ID,Ação,Mod1\n1,delegar,Agent A\n");

    let report = BatchRunner::new(&config, &store)
        .run_with(connected(&portal))
        .await;

    assert_eq!(statuses(&store), vec![RowStatus::Failed]);
    assert!(report.persisted);
    assert!(report.session_closed);
    assert_eq!(portal.quits(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_authentication_failure_leaves_worklist_unchanged() {
    let config = config();
    let mut portal = FakePortal::new(&config);
    portal.reject_login = true;
    let portal = Arc::new(portal);
    let store = MemoryStore::from_csv(WORKLIST);

    let report = BatchRunner::new(&config, &store)
        .run_with(connected(&portal))
        .await;

    assert!(matches!(report.fatal, Some(BatchError::Authentication { .. })));
    assert_eq!((report.eligible, report.processed()), (3, 0));
    assert_eq!(store.saved().as_ref(), Some(store.initial()));
    assert_eq!(store.saves(), 1);
    assert_eq!(portal.quits(), 1);
    assert!(!portal.navigations().iter().any(|u| u.contains("/records/")));
}

#[tokio::test(start_paused = true)]
async fn test_browser_that_never_starts_still_flushes_worklist() {
    let config = config();
    let store = MemoryStore::from_csv(WORKLIST);

    let report = BatchRunner::new(&config, &store)
        .run_with(async {
            Err(AutomationError::PlatformError(
                "connection refused".to_string(),
            ))
        })
        .await;

    assert!(matches!(report.fatal, Some(BatchError::Session(_))));
    assert!(!report.session_closed);
    assert_eq!(store.saved().as_ref(), Some(store.initial()));
}

#[tokio::test(start_paused = true)]
async fn test_panic_mid_batch_still_persists_and_closes() {
    let config = config();
    let mut portal = FakePortal::new(&config);
    portal.panicking_records.insert("2".to_string());
    let portal = Arc::new(portal);
    let store = MemoryStore::from_csv(WORKLIST);

    let report = BatchRunner::new(&config, &store)
        .run_with(connected(&portal))
        .await;

    match &report.fatal {
        Some(BatchError::Aborted(msg)) => assert!(msg.contains("record 2")),
        other => panic!("expected Aborted, got {other:?}"),
    }
    assert_eq!(report.completed, 1);
    assert_eq!(
        statuses(&store),
        vec![RowStatus::Completed, RowStatus::Pending, RowStatus::Pending]
    );
    assert_eq!(portal.quits(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_is_reported_after_cleanup() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let mut store = MemoryStore::from_csv(WORKLIST);
    store.fail_saves = true;

    let report = BatchRunner::new(&config, &store)
        .run_with(connected(&portal))
        .await;

    assert!(report.fatal.is_none());
    assert!(matches!(report.persistence, Some(BatchError::Persistence { .. })));
    assert!(!report.is_success());
    assert_eq!(portal.quits(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_action_marks_row_failed() {
    let config = config();
    let portal = Arc::new(FakePortal::new(&config));
    let store = MemoryStore::from_csv("ID,Ação,Mod1\n1,cancelar,\n2,delegar,Agent A\n");

    let report = BatchRunner::new(&config, &store)
        .run_with(connected(&portal))
        .await;

    assert_eq!(
        statuses(&store),
        vec![RowStatus::Failed, RowStatus::Completed]
    );
    assert_eq!((report.completed, report.failed), (1, 1));
}
