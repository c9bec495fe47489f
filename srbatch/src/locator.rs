use tracing::{debug, instrument};

use crate::driver::{BrowserDriver, ElementRef};
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(15);

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What a wait is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// Attached to the DOM
    Present,
    /// Attached and displayed
    Visible,
    /// Displayed and enabled
    Clickable,
}

/// A selector bound to a driver, with timeout-bounded waits.
#[derive(Clone)]
pub struct Locator {
    driver: Arc<dyn BrowserDriver>,
    selector: Selector,
    timeout: Duration, // Default timeout for this locator instance
    root: Option<ElementRef>,
}

impl Locator {
    /// Create a new locator with the given selector
    pub fn new(driver: Arc<dyn BrowserDriver>, selector: impl Into<Selector>) -> Self {
        Self {
            driver,
            selector: selector.into(),
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            root: None,
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    /// This timeout is used if no specific timeout is passed to wait methods.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scope the search to descendants of `element`
    pub fn within(mut self, element: ElementRef) -> Self {
        self.root = Some(element);
        self
    }

    /// Current matches, without waiting.
    pub async fn all(&self) -> Result<Vec<ElementRef>, AutomationError> {
        self.driver
            .find_elements(&self.selector, self.root.as_ref())
            .await
    }

    /// First element satisfying `condition` right now, if any.
    async fn probe(
        &self,
        condition: WaitCondition,
    ) -> Result<Option<ElementRef>, AutomationError> {
        for element in self.all().await? {
            if self.satisfies(&element, condition).await? {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn satisfies(
        &self,
        element: &ElementRef,
        condition: WaitCondition,
    ) -> Result<bool, AutomationError> {
        Ok(match condition {
            WaitCondition::Present => true,
            WaitCondition::Visible => self.driver.is_displayed(element).await?,
            WaitCondition::Clickable => {
                self.driver.is_displayed(element).await? && self.driver.is_enabled(element).await?
            }
        })
    }

    /// Poll until an element satisfies `condition`, up to the timeout.
    /// If no timeout is provided, uses the locator's default timeout.
    #[instrument(level = "debug", skip(self, timeout), fields(selector = %self.selector))]
    pub async fn wait_for(
        &self,
        condition: WaitCondition,
        timeout: Option<Duration>,
    ) -> Result<ElementRef, AutomationError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + effective_timeout;
        debug!("Waiting up to {:?} for {:?}", effective_timeout, condition);

        let mut last_error = None;
        loop {
            match self.probe(condition).await {
                Ok(Some(element)) => return Ok(element),
                Ok(None) => {}
                // The page is still changing under us; try again next tick.
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                let detail = last_error
                    .map(|e| format!(" Last error: {e}"))
                    .unwrap_or_default();
                return Err(AutomationError::Timeout(format!(
                    "Timed out after {effective_timeout:?} waiting for {condition:?} element {}.{detail}",
                    self.selector
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn wait_present(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ElementRef, AutomationError> {
        self.wait_for(WaitCondition::Present, timeout).await
    }

    pub async fn wait_visible(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ElementRef, AutomationError> {
        self.wait_for(WaitCondition::Visible, timeout).await
    }

    pub async fn wait_clickable(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ElementRef, AutomationError> {
        self.wait_for(WaitCondition::Clickable, timeout).await
    }

    /// Wait until no matching element is displayed.
    pub async fn wait_hidden(&self, timeout: Option<Duration>) -> Result<(), AutomationError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + effective_timeout;
        loop {
            match self.probe(WaitCondition::Visible).await {
                Ok(None) => return Ok(()),
                // Detached mid-check means it is going away.
                Err(e) if e.is_transient() => return Ok(()),
                Err(e) => return Err(e),
                Ok(Some(_)) => {}
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::Timeout(format!(
                    "Timed out after {effective_timeout:?} waiting for element {} to disappear",
                    self.selector
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
