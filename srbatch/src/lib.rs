//! Bulk editing of service-request records through a browser session
//!
//! A worklist names records, the action to apply to each and the values to
//! use. Pending rows are applied one at a time against a single logged-in
//! session; each row's outcome is written back so reruns pick up where the
//! last run stopped.

pub mod action;
pub mod config;
pub mod driver;
pub mod errors;
pub mod executor;
pub mod interaction;
pub mod locator;
pub mod mapping;
pub mod orchestrator;
pub mod selector;
pub mod session;
#[cfg(test)]
mod tests;
pub mod worklist;

pub use action::{Action, ActionKind, ActionSpec, ActionSpecs, FieldSpec};
pub use config::{Config, LoginCredentials, PortalSelectors, Timeouts};
pub use driver::{BrowserDriver, ElementRef, ScriptArg, WebDriverClient, WebDriverOptions};
pub use errors::{ActionExecutionError, ActionFailure, AutomationError, BatchError};
pub use executor::ActionExecutor;
pub use interaction::Interactor;
pub use locator::{Locator, WaitCondition};
pub use mapping::MappingTable;
pub use orchestrator::{BatchRunner, RowOutcome, RunReport};
pub use selector::Selector;
pub use session::{Session, SessionController};
pub use worklist::{CsvWorklistStore, RowStatus, Worklist, WorklistRow, WorklistStore};
