use super::{BrowserDriver, ElementRef, ScriptArg};
use crate::{AutomationError, Selector};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key under which W3C WebDriver serializes element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Options used when opening a new browser session.
#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    /// Base url of a running WebDriver server (chromedriver, selenium, ...)
    pub server_url: String,
    pub headless: bool,
    /// "width,height"
    pub window_size: String,
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9515".to_string(),
            headless: false,
            window_size: "1920,1080".to_string(),
        }
    }
}

impl WebDriverOptions {
    fn capabilities(&self) -> Value {
        let mut args = vec![format!("--window-size={}", self.window_size)];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

/// Lightweight W3C WebDriver client bound to one browser session
#[derive(Debug)]
pub struct WebDriverClient {
    base_url: String,
    session_id: String,
    client: reqwest::Client,
    closed: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

impl WebDriverClient {
    /// Open a new browser session on the WebDriver server.
    pub async fn connect(options: &WebDriverOptions) -> Result<Self, AutomationError> {
        let base_url = options.server_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AutomationError::PlatformError(format!("HTTP client: {e}")))?;

        let value = send(
            client
                .post(format!("{base_url}/session"))
                .json(&options.capabilities()),
        )
        .await?;
        let session: NewSession = serde_json::from_value(value).map_err(|e| {
            AutomationError::PlatformError(format!("Failed to parse new session response: {e}"))
        })?;

        info!(session_id = %session.session_id, "Opened browser session");
        Ok(Self {
            base_url,
            session_id: session.session_id,
            client,
            closed: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    async fn get(&self, path: &str) -> Result<Value, AutomationError> {
        send(self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, AutomationError> {
        send(self.client.post(self.url(path)).json(&body)).await
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<Value, AutomationError> {
    let response = request
        .send()
        .await
        .map_err(|e| AutomationError::PlatformError(format!("WebDriver request failed: {e}")))?;
    let status = response.status();
    let body: WireResponse = response.json().await.map_err(|e| {
        AutomationError::PlatformError(format!("Failed to parse WebDriver response: {e}"))
    })?;

    if status.is_success() {
        return Ok(body.value);
    }
    match serde_json::from_value::<WireError>(body.value) {
        Ok(err) => Err(map_wire_error(&err.error, err.message)),
        Err(_) => Err(AutomationError::PlatformError(format!(
            "WebDriver returned HTTP {status}"
        ))),
    }
}

/// Map a W3C error code onto our error type.
fn map_wire_error(code: &str, message: String) -> AutomationError {
    match code {
        "no such element" => AutomationError::ElementNotFound(message),
        "stale element reference" | "detached shadow root" => {
            AutomationError::ElementDetached(message)
        }
        "element not interactable" => AutomationError::ElementNotVisible(message),
        "element click intercepted" => AutomationError::ElementObscured(message),
        "no such alert" => AutomationError::NoAlert(message),
        "invalid selector" => AutomationError::InvalidSelector(message),
        "invalid argument" => AutomationError::InvalidArgument(message),
        "timeout" | "script timeout" => AutomationError::Timeout(message),
        other => AutomationError::PlatformError(format!("{other}: {message}")),
    }
}

fn element_from_value(value: &Value) -> Option<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementRef::new)
}

fn bool_value(value: Value, what: &str) -> Result<bool, AutomationError> {
    value
        .as_bool()
        .ok_or_else(|| AutomationError::PlatformError(format!("Expected boolean for {what}")))
}

#[async_trait::async_trait]
impl BrowserDriver for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        debug!("Navigating to {}", url);
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn find_elements(
        &self,
        selector: &Selector,
        within: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>, AutomationError> {
        let (using, value) = selector.to_webdriver()?;
        let path = match within {
            Some(root) => format!("/element/{}/elements", root.id()),
            None => "/elements".to_string(),
        };
        let found = self
            .post(&path, json!({ "using": using, "value": value }))
            .await?;
        let elements = found
            .as_array()
            .map(|items| items.iter().filter_map(element_from_value).collect())
            .unwrap_or_default();
        Ok(elements)
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, AutomationError> {
        let value = self
            .get(&format!("/element/{}/displayed", element.id()))
            .await?;
        bool_value(value, "displayed")
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool, AutomationError> {
        let value = self
            .get(&format!("/element/{}/enabled", element.id()))
            .await?;
        bool_value(value, "enabled")
    }

    async fn execute_script(
        &self,
        script: &str,
        args: Vec<ScriptArg>,
    ) -> Result<Value, AutomationError> {
        let args: Vec<Value> = args
            .into_iter()
            .map(|arg| match arg {
                ScriptArg::Element(el) => json!({ ELEMENT_KEY: el.id() }),
                ScriptArg::Value(v) => v,
            })
            .collect();
        self.post("/execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.post(&format!("/element/{}/click", element.id()), json!({}))
            .await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.post(&format!("/element/{}/clear", element.id()), json!({}))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError> {
        self.post(
            &format!("/element/{}/value", element.id()),
            json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn alert_text(&self) -> Result<String, AutomationError> {
        let value = self.get("/alert/text").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn accept_alert(&self) -> Result<(), AutomationError> {
        self.post("/alert/accept", json!({})).await?;
        Ok(())
    }

    async fn quit(&self) -> Result<(), AutomationError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        match send(self.client.delete(self.url(""))).await {
            Ok(_) => {
                info!(session_id = %self.session_id, "Closed browser session");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to close browser session cleanly: {}", e);
                Err(e)
            }
        }
    }
}
