//! Runs a worklist end to end: load, log in, process pending rows, persist.

use crate::config::Config;
use crate::driver::{BrowserDriver, WebDriverClient};
use crate::errors::{ActionExecutionError, AutomationError, BatchError};
use crate::executor::ActionExecutor;
use crate::interaction::Interactor;
use crate::session::{Session, SessionController};
use crate::worklist::{RowStatus, Worklist, WorklistRow, WorklistStore};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// What happened to one row.
#[derive(Debug)]
pub enum RowOutcome {
    Completed(RowStatus),
    Failed(ActionExecutionError),
}

impl RowOutcome {
    /// Status to record for the row.
    pub fn status(&self) -> RowStatus {
        match self {
            RowOutcome::Completed(status) => status.clone(),
            RowOutcome::Failed(_) => RowStatus::Failed,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub total_rows: usize,
    pub eligible: usize,
    pub completed: usize,
    pub failed: usize,
    /// Error that ended the run before all eligible rows were tried
    pub fatal: Option<BatchError>,
    /// Error writing the worklist back
    pub persistence: Option<BatchError>,
    pub persisted: bool,
    pub session_closed: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.fatal.is_none() && self.persistence.is_none()
    }

    /// Rows actually attempted; lower than `eligible` when the run stopped early.
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn skipped(&self) -> usize {
        self.total_rows - self.eligible
    }
}

#[derive(Debug, Default)]
struct Tally {
    completed: usize,
    failed: usize,
}

pub struct BatchRunner<'a> {
    config: &'a Config,
    store: &'a dyn WorklistStore,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a Config, store: &'a dyn WorklistStore) -> Self {
        Self { config, store }
    }

    /// Run against a fresh WebDriver session.
    pub async fn run(&self) -> RunReport {
        let options = self.config.webdriver.clone();
        self.run_with(async move {
            let client = WebDriverClient::connect(&options).await?;
            Ok(Arc::new(client) as Arc<dyn BrowserDriver>)
        })
        .await
    }

    /// Run with a browser produced by `connect`.
    ///
    /// The worklist is written back and the browser released exactly once on
    /// every path that got as far as loading the worklist.
    #[instrument(skip_all, fields(worklist = %self.store.describe()))]
    pub async fn run_with<F>(&self, connect: F) -> RunReport
    where
        F: Future<Output = Result<Arc<dyn BrowserDriver>, AutomationError>>,
    {
        let mut report = RunReport::default();

        let mut worklist = match self.store.load() {
            Ok(worklist) => worklist,
            Err(e) => {
                error!("❌ {}", e);
                report.fatal = Some(e);
                return report;
            }
        };
        let pending = worklist.pending_indices();
        report.total_rows = worklist.len();
        report.eligible = pending.len();
        info!("📊 Rows to process: {}", pending.len());

        let driver = match connect.await {
            Ok(driver) => Some(driver),
            Err(e) => {
                report.fatal = Some(BatchError::Session(e));
                None
            }
        };

        if let Some(driver) = &driver {
            let mut tally = Tally::default();
            let processed = AssertUnwindSafe(self.process(
                driver.clone(),
                &mut worklist,
                &pending,
                &mut tally,
            ))
            .catch_unwind()
            .await;
            // Rows finished before an abort still count.
            report.completed = tally.completed;
            report.failed = tally.failed;
            match processed {
                Ok(Ok(())) => {}
                Ok(Err(e)) => report.fatal = Some(e),
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    report.fatal = Some(BatchError::Aborted(message));
                }
            }
        }

        if let Some(e) = &report.fatal {
            error!("❌ Run aborted: {}", e);
        }
        self.finish(&worklist, driver, &mut report).await;
        report
    }

    /// Persist, then release the browser. Both are attempted regardless.
    async fn finish(
        &self,
        worklist: &Worklist,
        driver: Option<Arc<dyn BrowserDriver>>,
        report: &mut RunReport,
    ) {
        match self.store.save(worklist) {
            Ok(()) => report.persisted = true,
            Err(e) => {
                error!("❌ {}", e);
                report.persistence = Some(e);
            }
        }
        if let Some(driver) = driver {
            match driver.quit().await {
                Ok(()) => report.session_closed = true,
                Err(e) => warn!("Browser session did not close cleanly: {}", e),
            }
        }
        info!(
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped(),
            "📁 Worklist {} {} and browser {}",
            self.store.describe(),
            if report.persisted { "updated" } else { "NOT updated" },
            if report.session_closed { "closed" } else { "not closed" }
        );
    }

    async fn process(
        &self,
        driver: Arc<dyn BrowserDriver>,
        worklist: &mut Worklist,
        pending: &[usize],
        tally: &mut Tally,
    ) -> Result<(), BatchError> {
        let selectors = &self.config.selectors;
        let interactor = Interactor::new(
            driver,
            self.config.timeouts,
            selectors.loading_indicator.as_str(),
            selectors.dropdown_search.as_str(),
        );
        let session = SessionController::new(&interactor, selectors)
            .login(&self.config.login)
            .await?;
        let executor = ActionExecutor::new(&interactor, self.config);

        for (n, &index) in pending.iter().enumerate() {
            let row = &worklist.rows()[index];
            info!(
                "➡️ [{}/{}] Processing ID {} | Action: {}",
                n + 1,
                pending.len(),
                row.id,
                row.action
            );
            let outcome = process_row(&executor, &session, row).await;
            match &outcome {
                RowOutcome::Completed(_) => {
                    tally.completed += 1;
                    info!("✅ ID {} done", row.id);
                }
                RowOutcome::Failed(e) => {
                    tally.failed += 1;
                    warn!("❌ Failed to process ID {}: {}", row.id, e);
                }
            }
            worklist.set_status(index, outcome.status());
        }
        Ok(())
    }
}

/// One row, with its failure kept as a value.
pub async fn process_row(
    executor: &ActionExecutor<'_>,
    session: &Session,
    row: &WorklistRow,
) -> RowOutcome {
    match executor.apply_action(session, row).await {
        Ok(status) => RowOutcome::Completed(status),
        Err(e) => RowOutcome::Failed(e),
    }
}
