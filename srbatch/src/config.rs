//! Run configuration, read once from a JSON document at startup.

use crate::action::{ActionSpecs, SpecOverride};
use crate::driver::WebDriverOptions;
use crate::errors::BatchError;
use crate::mapping::MappingTable;
use crate::selector::Selector;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_RECORD_URL_TEMPLATE: &str =
    "https://www.wtool.eng.br/sistemonWeb/solicitacao/verSolicitacao/{id}";

/// Bounds for every wait in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Page and element readiness
    pub short: Duration,
    /// Network-bound confirmations
    pub long: Duration,
    /// Pause that lets layout settle around clicks and typing
    pub settle: Duration,
    /// How long to look for a loading overlay before assuming none is coming
    pub spinner_probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(15),
            long: Duration::from_secs(40),
            settle: Duration::from_millis(300),
            spinner_probe: Duration::from_secs(3),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct LoginCredentials {
    pub url: String,
    pub identity: String,
    pub secret: String,
    /// Operating context (contract) picked right after login
    pub context: String,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("url", &self.url)
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .field("context", &self.context)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    pub worklist_path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_record_url_template")]
    pub record_url_template: String,
}

fn default_delimiter() -> char {
    ','
}

fn default_record_url_template() -> String {
    DEFAULT_RECORD_URL_TEMPLATE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct GeneralConfig {
    short_timeout_seconds: u64,
    long_timeout_seconds: u64,
    settle_millis: u64,
    spinner_probe_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            short_timeout_seconds: 15,
            long_timeout_seconds: 40,
            settle_millis: 300,
            spinner_probe_seconds: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct BrowserConfig {
    webdriver_url: String,
    headless: bool,
    window_size: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        let defaults = WebDriverOptions::default();
        Self {
            webdriver_url: defaults.server_url,
            headless: defaults.headless,
            window_size: defaults.window_size,
        }
    }
}

/// Where things are on the portal's pages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalSelectors {
    pub identity_field: String,
    pub secret_field: String,
    pub submit: String,
    pub context_toggle: String,
    /// Element kind holding the context names in the context list
    pub context_option_tag: String,
    pub logged_in_landmark: String,
    pub edit_button: String,
    pub edit_surface: String,
    /// Resolved inside the edit surface
    pub save_button: String,
    pub success_indicator: String,
    pub loading_indicator: String,
    /// Search box of whichever type-ahead dropdown is open
    pub dropdown_search: String,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            identity_field: "name:email".into(),
            secret_field: "name:senha".into(),
            submit: "input[type='submit']".into(),
            context_toggle: "button.dropdown-toggle".into(),
            context_option_tag: "span".into(),
            logged_in_landmark: "#informacoesUsuario".into(),
            edit_button: "button:Editar/Delegar".into(),
            edit_surface: "#editarSolicitacao".into(),
            save_button: ".//button[normalize-space()='Salvar']".into(),
            success_indicator: "//div[contains(.,'sucesso')]".into(),
            loading_indicator: "div.spinner-overlay".into(),
            dropdown_search: "//div[contains(@class,'open')]//input".into(),
        }
    }
}

impl PortalSelectors {
    fn validate(&self) -> Result<(), BatchError> {
        let fields = [
            ("identity_field", &self.identity_field),
            ("secret_field", &self.secret_field),
            ("submit", &self.submit),
            ("context_toggle", &self.context_toggle),
            ("logged_in_landmark", &self.logged_in_landmark),
            ("edit_button", &self.edit_button),
            ("edit_surface", &self.edit_surface),
            ("save_button", &self.save_button),
            ("success_indicator", &self.success_indicator),
            ("loading_indicator", &self.loading_indicator),
            ("dropdown_search", &self.dropdown_search),
        ];
        for (name, raw) in fields {
            if let Selector::Invalid(reason) = Selector::from(raw.as_str()) {
                return Err(BatchError::Configuration(format!(
                    "PORTAL_SELECTORS.{name}: {reason}"
                )));
            }
        }
        if self.context_option_tag.trim().is_empty() {
            return Err(BatchError::Configuration(
                "PORTAL_SELECTORS.context_option_tag must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The document as written on disk.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(rename = "LOGIN_CREDENTIALS")]
    login: LoginCredentials,
    #[serde(rename = "SCRIPT_CONFIG")]
    script: ScriptConfig,
    #[serde(rename = "VALUE_MAPPINGS", default)]
    value_mappings: Value,
    #[serde(rename = "GENERAL_CONFIG", default)]
    general: GeneralConfig,
    #[serde(rename = "BROWSER_CONFIG", default)]
    browser: BrowserConfig,
    #[serde(rename = "PORTAL_SELECTORS", default)]
    selectors: PortalSelectors,
    #[serde(rename = "ACTION_SPECS", default)]
    action_specs: HashMap<String, SpecOverride>,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub login: LoginCredentials,
    pub script: ScriptConfig,
    pub mappings: MappingTable,
    pub timeouts: Timeouts,
    pub webdriver: WebDriverOptions,
    pub selectors: PortalSelectors,
    pub actions: ActionSpecs,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BatchError::Configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_json_str(&text)?;
        info!("✅ Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, BatchError> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| BatchError::Configuration(format!("Invalid configuration: {e}")))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, BatchError> {
        let login = raw.login;
        for (name, value) in [
            ("url", &login.url),
            ("identity", &login.identity),
            ("secret", &login.secret),
            ("context", &login.context),
        ] {
            if value.trim().is_empty() {
                return Err(BatchError::Configuration(format!(
                    "LOGIN_CREDENTIALS.{name} is required"
                )));
            }
        }

        if raw.script.worklist_path.as_os_str().is_empty() {
            return Err(BatchError::Configuration(
                "SCRIPT_CONFIG.worklist_path is required".to_string(),
            ));
        }
        if !raw.script.delimiter.is_ascii() {
            return Err(BatchError::Configuration(
                "SCRIPT_CONFIG.delimiter must be a single ASCII character".to_string(),
            ));
        }
        if !raw.script.record_url_template.contains("{id}") {
            return Err(BatchError::Configuration(
                "SCRIPT_CONFIG.record_url_template must contain {id}".to_string(),
            ));
        }

        let general = raw.general;
        if general.short_timeout_seconds == 0 || general.long_timeout_seconds == 0 {
            return Err(BatchError::Configuration(
                "GENERAL_CONFIG timeouts must be greater than zero".to_string(),
            ));
        }
        let timeouts = Timeouts {
            short: Duration::from_secs(general.short_timeout_seconds),
            long: Duration::from_secs(general.long_timeout_seconds),
            settle: Duration::from_millis(general.settle_millis),
            spinner_probe: Duration::from_secs(general.spinner_probe_seconds),
        };

        raw.selectors.validate()?;
        let actions = ActionSpecs::with_overrides(raw.action_specs)?;

        Ok(Self {
            login,
            script: raw.script,
            mappings: MappingTable::from_json(&raw.value_mappings)?,
            timeouts,
            webdriver: WebDriverOptions {
                server_url: raw.browser.webdriver_url,
                headless: raw.browser.headless,
                window_size: raw.browser.window_size,
            },
            selectors: raw.selectors,
            actions,
        })
    }

    /// Detail-view url for a record.
    pub fn record_url(&self, record_id: &str) -> String {
        self.script.record_url_template.replace("{id}", record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "LOGIN_CREDENTIALS": {
            "url": "https://portal.example/login",
            "identity": "ops@example.com",
            "secret": "hunter2",
            "context": "Contrato A"
        },
        "SCRIPT_CONFIG": { "worklist_path": "worklist.csv" }
    }"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_json_str(MINIMAL).unwrap();
        assert_eq!(config.timeouts.short, Duration::from_secs(15));
        assert_eq!(config.timeouts.long, Duration::from_secs(40));
        assert_eq!(config.script.delimiter, ',');
        assert_eq!(config.webdriver.server_url, "http://localhost:9515");
        assert!(config.mappings.is_empty());
        assert_eq!(
            config.record_url("1234"),
            "https://www.wtool.eng.br/sistemonWeb/solicitacao/verSolicitacao/1234"
        );
    }

    #[test]
    fn test_general_config_and_mappings() {
        let text = MINIMAL.trim_end().trim_end_matches('}').to_string()
            + r#",
            "GENERAL_CONFIG": { "short_timeout_seconds": 5, "long_timeout_seconds": 20 },
            "VALUE_MAPPINGS": { "AGENTE": { "joao": "João Silva" } }
        }"#;
        let config = Config::from_json_str(&text).unwrap();
        assert_eq!(config.timeouts.short, Duration::from_secs(5));
        assert_eq!(config.timeouts.long, Duration::from_secs(20));
        assert_eq!(config.mappings.resolve(Some("JOAO"), "AGENTE"), "João Silva");
    }

    #[test]
    fn test_missing_required_sections_are_configuration_errors() {
        let err = Config::from_json_str(r#"{ "SCRIPT_CONFIG": { "worklist_path": "w.csv" } }"#)
            .unwrap_err();
        assert!(matches!(err, BatchError::Configuration(_)));

        let blank_secret = MINIMAL.replace("hunter2", " ");
        let err = Config::from_json_str(&blank_secret).unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let text = MINIMAL.trim_end().trim_end_matches('}').to_string()
            + r#", "GENERAL_CONFIG": { "short_timeout_seconds": 0 } }"#;
        assert!(Config::from_json_str(&text).is_err());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let config = Config::from_json_str(MINIMAL).unwrap();
        let debug = format!("{:?}", config.login);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
