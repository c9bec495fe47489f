use thiserror::Error;

/// Failures reported by the browser driver and the waiting layer on top of it.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Element is detached from DOM: {0}")]
    ElementDetached(String),

    #[error("Element is not visible: {0}")]
    ElementNotVisible(String),

    #[error("Element is obscured by another element: {0}")]
    ElementObscured(String),

    #[error("No dialog is open: {0}")]
    NoAlert(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),
}

impl AutomationError {
    /// Errors that mean "not there yet" while polling.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AutomationError::ElementNotFound(_)
                | AutomationError::ElementDetached(_)
                | AutomationError::ElementNotVisible(_)
                | AutomationError::NoAlert(_)
        )
    }
}

/// A single row's mutation failed. Recovered at the row boundary.
#[derive(Error, Debug)]
#[error("record {record_id}: {source}")]
pub struct ActionExecutionError {
    pub record_id: String,
    #[source]
    pub source: ActionFailure,
}

impl ActionExecutionError {
    pub fn new(record_id: impl Into<String>, source: impl Into<ActionFailure>) -> Self {
        Self {
            record_id: record_id.into(),
            source: source.into(),
        }
    }
}

/// Cause of an [`ActionExecutionError`].
#[derive(Error, Debug)]
pub enum ActionFailure {
    #[error("unsupported action '{0}'")]
    UnsupportedAction(String),

    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: AutomationError,
    },
}

impl From<AutomationError> for ActionFailure {
    fn from(source: AutomationError) -> Self {
        ActionFailure::Step {
            step: "interaction",
            source,
        }
    }
}

/// Run-level failures. Every variant terminates the run; row failures stay
/// [`ActionExecutionError`] values inside the run.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed at {step}: {source}")]
    Authentication {
        step: &'static str,
        #[source]
        source: AutomationError,
    },

    #[error("Failed to persist worklist {path}: {message}")]
    Persistence { path: String, message: String },

    #[error("Browser session error: {0}")]
    Session(#[source] AutomationError),

    #[error("Run aborted: {0}")]
    Aborted(String),
}

impl BatchError {
    pub fn auth(step: &'static str) -> impl FnOnce(AutomationError) -> BatchError {
        move |source| BatchError::Authentication { step, source }
    }
}
