//! The browser seam: everything the automation layers need from a live browser.

use crate::{AutomationError, Selector};
use serde_json::Value;

pub mod webdriver;

pub use webdriver::{WebDriverClient, WebDriverOptions};

/// Reference to an element inside the current page.
///
/// Only meaningful to the driver that produced it; a navigation invalidates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "element({})", self.0)
    }
}

/// The common trait a browser backend must implement.
///
/// Calls are single-shot: no method waits for anything. Waiting lives in
/// [`crate::Locator`] and [`crate::interaction`].
#[async_trait::async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load `url` in the current tab.
    async fn navigate(&self, url: &str) -> Result<(), AutomationError>;

    /// All elements currently matching `selector`, optionally scoped to `within`.
    async fn find_elements(
        &self,
        selector: &Selector,
        within: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>, AutomationError>;

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, AutomationError>;

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool, AutomationError>;

    /// Run `script` in the page. `args` may contain element references.
    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>)
        -> Result<Value, AutomationError>;

    /// Click through the normal pointer input path (trusted event).
    async fn click(&self, element: &ElementRef) -> Result<(), AutomationError>;

    async fn clear(&self, element: &ElementRef) -> Result<(), AutomationError>;

    /// Type `text`; may include [`keys`] codepoints.
    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError>;

    /// Text of the open native dialog, `NoAlert` if none.
    async fn alert_text(&self) -> Result<String, AutomationError>;

    async fn accept_alert(&self) -> Result<(), AutomationError>;

    /// End the browser session. Calling it twice is harmless.
    async fn quit(&self) -> Result<(), AutomationError>;
}

/// Argument passed into [`BrowserDriver::execute_script`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    Element(ElementRef),
    Value(Value),
}

/// WebDriver special key codepoints.
pub mod keys {
    pub const ENTER: &str = "\u{E007}";
    pub const TAB: &str = "\u{E004}";
}
