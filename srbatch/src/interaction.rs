//! Interaction primitives that hold up against a slow, overlay-heavy UI.

use crate::config::Timeouts;
use crate::driver::{keys, BrowserDriver, ElementRef, ScriptArg};
use crate::errors::AutomationError;
use crate::locator::Locator;
use crate::selector::Selector;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Pause after confirming a dropdown choice, while the widget re-renders.
const DROPDOWN_SETTLE: Duration = Duration::from_secs(1);

const SCROLL_INTO_VIEW: &str = "arguments[0].scrollIntoView({block:'center'});";
const SCRIPT_CLICK: &str = "arguments[0].click();";

/// Driver handle plus the pacing every interaction shares.
#[derive(Clone)]
pub struct Interactor {
    driver: Arc<dyn BrowserDriver>,
    timeouts: Timeouts,
    loading_indicator: Selector,
    dropdown_search: Selector,
}

impl Interactor {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        timeouts: Timeouts,
        loading_indicator: impl Into<Selector>,
        dropdown_search: impl Into<Selector>,
    ) -> Self {
        Self {
            driver,
            timeouts,
            loading_indicator: loading_indicator.into(),
            dropdown_search: dropdown_search.into(),
        }
    }

    pub fn driver(&self) -> &Arc<dyn BrowserDriver> {
        &self.driver
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Locator bound to this driver with the short timeout as default.
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.driver.clone(), selector).set_default_timeout(self.timeouts.short)
    }

    /// Wait for the loading overlay to come and go.
    ///
    /// An overlay that never shows up within `appear` counts as already
    /// stable. Only an overlay that stays up past `disappear` is an error.
    #[instrument(level = "debug", skip(self))]
    pub async fn wait_for_stabilized(
        &self,
        appear: Duration,
        disappear: Duration,
    ) -> Result<(), AutomationError> {
        let spinner = self.locator(self.loading_indicator.clone());
        match spinner.wait_visible(Some(appear)).await {
            Ok(_) => {
                debug!("Loading indicator visible, waiting for it to clear");
                spinner.wait_hidden(Some(disappear)).await
            }
            Err(AutomationError::Timeout(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Click via script after centering the element. Not blocked by overlays.
    pub async fn robust_click(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.driver
            .execute_script(SCROLL_INTO_VIEW, vec![ScriptArg::Element(element.clone())])
            .await?;
        tokio::time::sleep(self.timeouts.settle).await;
        self.driver
            .execute_script(SCRIPT_CLICK, vec![ScriptArg::Element(element.clone())])
            .await?;
        Ok(())
    }

    /// Click through the browser's pointer input, producing a trusted event.
    pub async fn natural_click(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.driver.click(element).await
    }

    /// Pick `query` in a type-ahead dropdown: open, type, confirm the top match.
    ///
    /// An empty query leaves the field alone. When nothing matches the widget
    /// stays open and the save that follows fails.
    #[instrument(level = "debug", skip(self, opener), fields(opener = %opener))]
    pub async fn select_from_type_ahead(
        &self,
        opener: &Selector,
        query: &str,
    ) -> Result<(), AutomationError> {
        if query.is_empty() {
            debug!("Empty query, keeping current value");
            return Ok(());
        }
        let button = self.locator(opener.clone()).wait_clickable(None).await?;
        self.robust_click(&button).await?;

        let search = self
            .locator(self.dropdown_search.clone())
            .wait_visible(None)
            .await?;
        self.driver.clear(&search).await?;
        self.driver.send_keys(&search, query).await?;
        tokio::time::sleep(self.timeouts.settle).await;
        self.driver.send_keys(&search, keys::ENTER).await?;
        tokio::time::sleep(DROPDOWN_SETTLE).await;
        Ok(())
    }

    /// Replace the contents of a plain input. Empty `value` is a no-op.
    #[instrument(level = "debug", skip(self, field), fields(field = %field))]
    pub async fn fill_text_field(
        &self,
        field: &Selector,
        value: &str,
    ) -> Result<(), AutomationError> {
        if value.is_empty() {
            return Ok(());
        }
        let input = self.locator(field.clone()).wait_clickable(None).await?;
        self.driver.clear(&input).await?;
        self.driver.send_keys(&input, value).await?;
        // Date pickers commit on blur.
        self.driver.send_keys(&input, keys::TAB).await?;
        tokio::time::sleep(self.timeouts.settle).await;
        Ok(())
    }

    /// Wait for a native dialog and accept it, returning its text.
    pub async fn accept_dialog(&self, timeout: Duration) -> Result<String, AutomationError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.driver.alert_text().await {
                Ok(text) => {
                    self.driver.accept_alert().await?;
                    debug!("Accepted dialog: {}", text);
                    return Ok(text);
                }
                Err(AutomationError::NoAlert(_)) => {}
                Err(e) => return Err(e),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AutomationError::Timeout(format!(
                    "No confirmation dialog appeared within {timeout:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }
}
