/// Represents ways to locate an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select with a CSS selector
    Css(String),
    /// Select using an XPath expression
    XPath(String),
    /// Select by DOM id
    Id(String),
    /// Select by the `name` attribute (form fields)
    Name(String),
    /// Select any element whose normalized visible text equals the value
    Text(String),
    /// Select a button whose text contains the value
    ButtonText(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();
        match s {
            "" => Selector::Invalid("Empty selector".to_string()),
            _ if s.starts_with("css:") => Selector::Css(s[4..].trim().to_string()),
            _ if s.starts_with("xpath:") => Selector::XPath(s[6..].trim().to_string()),
            _ if s.starts_with("id:") => Selector::Id(s[3..].trim().to_string()),
            _ if s.starts_with("name:") => Selector::Name(s[5..].trim().to_string()),
            _ if s.starts_with("text:") => Selector::Text(s[5..].trim().to_string()),
            _ if s.starts_with("button:") => Selector::ButtonText(s[7..].trim().to_string()),
            _ if s.starts_with('/') || s.starts_with("(") || s.starts_with("./") => {
                Selector::XPath(s.to_string())
            }
            // a bare `#foo` is an id, `#foo .bar` is still css
            _ if s.starts_with('#') && !s.contains([' ', '.', '[', '>', ':']) => {
                Selector::Id(s[1..].to_string())
            }
            _ => Selector::Css(s.to_string()),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

impl Selector {
    /// W3C WebDriver `(using, value)` pair for this selector.
    pub fn to_webdriver(&self) -> Result<(&'static str, String), crate::AutomationError> {
        Ok(match self {
            Selector::Css(css) => ("css selector", css.clone()),
            Selector::XPath(xpath) => ("xpath", xpath.clone()),
            Selector::Id(id) => ("css selector", format!("[id={}]", css_string(id))),
            Selector::Name(name) => ("css selector", format!("[name={}]", css_string(name))),
            Selector::Text(text) => (
                "xpath",
                format!("//*[normalize-space()={}]", xpath_literal(text)),
            ),
            Selector::ButtonText(text) => (
                "xpath",
                format!("//button[contains(., {})]", xpath_literal(text)),
            ),
            Selector::Invalid(reason) => {
                return Err(crate::AutomationError::InvalidSelector(reason.clone()))
            }
        })
    }
}

/// Quote a string for use inside an XPath expression.
///
/// XPath 1.0 has no escape sequences, so a value containing both quote kinds
/// has to be assembled with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
