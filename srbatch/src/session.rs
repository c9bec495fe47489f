//! Login and operating-context selection.

use crate::config::{LoginCredentials, PortalSelectors};
use crate::driver::BrowserDriver;
use crate::errors::BatchError;
use crate::interaction::Interactor;
use crate::selector::{xpath_literal, Selector};
use std::sync::Arc;
use tracing::{info, instrument};

/// A browser that is logged in and bound to one operating context.
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn BrowserDriver>,
    context: String,
}

impl Session {
    pub fn driver(&self) -> &Arc<dyn BrowserDriver> {
        &self.driver
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Drives the login form and the context picker.
pub struct SessionController<'a> {
    interactor: &'a Interactor,
    selectors: &'a PortalSelectors,
}

impl<'a> SessionController<'a> {
    pub fn new(interactor: &'a Interactor, selectors: &'a PortalSelectors) -> Self {
        Self {
            interactor,
            selectors,
        }
    }

    /// Log in and select the configured context.
    ///
    /// Any step that does not reach its expected element in time is an
    /// [`BatchError::Authentication`] naming that step.
    #[instrument(skip(self, credentials), fields(url = %credentials.url, context = %credentials.context))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Session, BatchError> {
        info!("🔐 Starting login...");
        let driver = self.interactor.driver();
        let timeouts = self.interactor.timeouts();

        driver
            .navigate(&credentials.url)
            .await
            .map_err(BatchError::auth("open login page"))?;

        let identity = self
            .interactor
            .locator(self.selectors.identity_field.as_str())
            .wait_present(Some(timeouts.short))
            .await
            .map_err(BatchError::auth("identity field"))?;
        driver
            .send_keys(&identity, &credentials.identity)
            .await
            .map_err(BatchError::auth("identity field"))?;

        let secret = self
            .interactor
            .locator(self.selectors.secret_field.as_str())
            .wait_present(Some(timeouts.short))
            .await
            .map_err(BatchError::auth("secret field"))?;
        driver
            .send_keys(&secret, &credentials.secret)
            .await
            .map_err(BatchError::auth("secret field"))?;

        self.submit().await.map_err(BatchError::auth("submit credentials"))?;

        // The context page can take a while to load after the credential post.
        let toggle = self
            .interactor
            .locator(self.selectors.context_toggle.as_str())
            .wait_clickable(Some(timeouts.long))
            .await
            .map_err(BatchError::auth("context selector"))?;
        self.interactor
            .robust_click(&toggle)
            .await
            .map_err(BatchError::auth("context selector"))?;

        let option = self
            .interactor
            .locator(self.context_option(&credentials.context))
            .wait_clickable(Some(timeouts.short))
            .await
            .map_err(BatchError::auth("context option"))?;
        self.interactor
            .robust_click(&option)
            .await
            .map_err(BatchError::auth("context option"))?;

        self.submit().await.map_err(BatchError::auth("submit context"))?;

        self.interactor
            .locator(self.selectors.logged_in_landmark.as_str())
            .wait_present(Some(timeouts.long))
            .await
            .map_err(BatchError::auth("post-login landmark"))?;

        info!("✅ Logged in, context '{}'", credentials.context);
        Ok(Session {
            driver: driver.clone(),
            context: credentials.context.clone(),
        })
    }

    async fn submit(&self) -> Result<(), crate::AutomationError> {
        let submit = self
            .interactor
            .locator(self.selectors.submit.as_str())
            .wait_present(None)
            .await?;
        self.interactor.natural_click(&submit).await
    }

    /// Exact visible-text match on the context name.
    fn context_option(&self, context: &str) -> Selector {
        Selector::XPath(format!(
            "//{}[normalize-space()={}]",
            self.selectors.context_option_tag.trim(),
            xpath_literal(context.trim())
        ))
    }
}
