//! The five command variants and their declarative validation rules.
//!
//! Validation runs before any driver call; a failure never touches the
//! browser. See [`Command::validate`].

use serde::{Deserialize, Serialize};

/// Fields common to every command, present on the wire alongside the
/// method-specific fields (flattened, not nested).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandHeader {
    pub id: String,
    pub session_id: String,
    #[serde(rename = "timeout")]
    pub timeout_ms: u32,
}

pub const MIN_TIMEOUT_MS: u32 = 1_000;
pub const MAX_TIMEOUT_MS: u32 = 300_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "dom_content_loaded",
            WaitUntil::NetworkIdle => "network_idle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractType {
    Text,
    Html,
    Attribute,
    Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    Load,
    DomContentLoaded,
    NetworkIdle,
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitCondition {
    /// Whether this condition requires `selector` to be set.
    pub fn requires_selector(self) -> bool {
        matches!(
            self,
            WaitCondition::Visible
                | WaitCondition::Hidden
                | WaitCondition::Attached
                | WaitCondition::Detached
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WaitCondition::Load => "load",
            WaitCondition::DomContentLoaded => "dom_content_loaded",
            WaitCondition::NetworkIdle => "network_idle",
            WaitCondition::Visible => "visible",
            WaitCondition::Hidden => "hidden",
            WaitCondition::Attached => "attached",
            WaitCondition::Detached => "detached",
        }
    }
}

impl From<WaitUntil> for WaitCondition {
    fn from(value: WaitUntil) -> Self {
        match value {
            WaitUntil::Load => WaitCondition::Load,
            WaitUntil::DomContentLoaded => WaitCondition::DomContentLoaded,
            WaitUntil::NetworkIdle => WaitCondition::NetworkIdle,
        }
    }
}

fn default_wait_until() -> WaitUntil {
    WaitUntil::Load
}

fn default_button() -> MouseButton {
    MouseButton::Left
}

fn default_click_count() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateCommand {
    #[serde(flatten)]
    pub header: CommandHeader,
    pub url: String,
    #[serde(default = "default_wait_until")]
    pub wait_until: WaitUntil,
    #[serde(default)]
    pub referer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickCommand {
    #[serde(flatten)]
    pub header: CommandHeader,
    pub selector: String,
    #[serde(default = "default_button")]
    pub button: MouseButton,
    #[serde(default = "default_click_count")]
    pub click_count: u32,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillCommand {
    #[serde(flatten)]
    pub header: CommandHeader,
    pub selector: String,
    pub text: String,
    #[serde(default)]
    pub clear_first: bool,
    #[serde(default)]
    pub press_enter: bool,
    #[serde(default)]
    pub validate_input: bool,
    #[serde(default)]
    pub typing_delay_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractCommand {
    #[serde(flatten)]
    pub header: CommandHeader,
    pub selector: String,
    pub extract_type: ExtractType,
    #[serde(default)]
    pub attribute_name: Option<String>,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default = "default_true")]
    pub trim_whitespace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitCommand {
    #[serde(flatten)]
    pub header: CommandHeader,
    pub condition: WaitCondition,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub custom_js: Option<String>,
    #[serde(default)]
    pub attribute_value: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Command {
    Navigate(NavigateCommand),
    Click(ClickCommand),
    Fill(FillCommand),
    Extract(ExtractCommand),
    Wait(WaitCommand),
}

impl Command {
    pub fn header(&self) -> &CommandHeader {
        match self {
            Command::Navigate(c) => &c.header,
            Command::Click(c) => &c.header,
            Command::Fill(c) => &c.header,
            Command::Extract(c) => &c.header,
            Command::Wait(c) => &c.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut CommandHeader {
        match self {
            Command::Navigate(c) => &mut c.header,
            Command::Click(c) => &mut c.header,
            Command::Fill(c) => &mut c.header,
            Command::Extract(c) => &mut c.header,
            Command::Wait(c) => &mut c.header,
        }
    }

    /// Declarative field validation. Does not touch the browser. Returns
    /// the first violation found; callers needing every violation at once
    /// should call [`Command::validate_all`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_all().into_iter().next().map_or(Ok(()), Err)
    }

    pub fn validate_all(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let header = self.header();

        if header.id.is_empty() {
            errors.push(ValidationError::new("id", "must not be empty"));
        }
        if header.session_id.is_empty() {
            errors.push(ValidationError::new("session_id", "must not be empty"));
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&header.timeout_ms) {
            errors.push(ValidationError::new(
                "timeout",
                format!("must be within [{MIN_TIMEOUT_MS}, {MAX_TIMEOUT_MS}]"),
            ));
        }

        match self {
            Command::Navigate(c) => validate_navigate(c, &mut errors),
            Command::Click(c) => validate_click(c, &mut errors),
            Command::Fill(c) => validate_fill(c, &mut errors),
            Command::Extract(c) => validate_extract(c, &mut errors),
            Command::Wait(c) => validate_wait(c, &mut errors),
        }

        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn validate_navigate(c: &NavigateCommand, errors: &mut Vec<ValidationError>) {
    match url::Url::parse(&c.url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
        Ok(_) => errors.push(ValidationError::new("url", "scheme must be http or https")),
        Err(_) => errors.push(ValidationError::new("url", "must be a valid URL")),
    }
}

fn validate_click(c: &ClickCommand, errors: &mut Vec<ValidationError>) {
    if c.selector.is_empty() {
        errors.push(ValidationError::new("selector", "must not be empty"));
    }
    if !(1..=10).contains(&c.click_count) {
        errors.push(ValidationError::new("click_count", "must be within [1, 10]"));
    }
    if let Some(pos) = c.position {
        if !(0.0..=1.0).contains(&pos.x) || !(0.0..=1.0).contains(&pos.y) {
            errors.push(ValidationError::new("position", "x and y must be within [0.0, 1.0]"));
        }
    }
}

fn validate_fill(c: &FillCommand, errors: &mut Vec<ValidationError>) {
    if c.selector.is_empty() {
        errors.push(ValidationError::new("selector", "must not be empty"));
    }
    if c.typing_delay_ms > 1_000 {
        errors.push(ValidationError::new("typing_delay_ms", "must be within [0, 1000]"));
    }
}

fn validate_extract(c: &ExtractCommand, errors: &mut Vec<ValidationError>) {
    if c.selector.is_empty() {
        errors.push(ValidationError::new("selector", "must not be empty"));
    }
    match c.extract_type {
        ExtractType::Attribute if c.attribute_name.is_none() => {
            errors.push(ValidationError::new("attribute_name", "required when extract_type is attribute"));
        }
        ExtractType::Property if c.property_name.is_none() => {
            errors.push(ValidationError::new("property_name", "required when extract_type is property"));
        }
        _ => {}
    }
}

fn validate_wait(c: &WaitCommand, errors: &mut Vec<ValidationError>) {
    if c.condition.requires_selector() && c.selector.is_none() {
        errors.push(ValidationError::new("selector", "required for this condition"));
    }
    if !(50..=5_000).contains(&c.poll_interval_ms) {
        errors.push(ValidationError::new("poll_interval_ms", "must be within [50, 5000]"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> CommandHeader {
        CommandHeader { id: "a".into(), session_id: "s".into(), timeout_ms: 30_000 }
    }

    #[test]
    fn timeout_boundaries() {
        let mut c = NavigateCommand {
            header: header(),
            url: "https://example.test/".into(),
            wait_until: WaitUntil::Load,
            referer: None,
        };
        c.header.timeout_ms = MIN_TIMEOUT_MS;
        assert!(Command::Navigate(c.clone()).validate().is_ok());
        c.header.timeout_ms = MAX_TIMEOUT_MS;
        assert!(Command::Navigate(c.clone()).validate().is_ok());
        c.header.timeout_ms = MIN_TIMEOUT_MS - 1;
        assert!(Command::Navigate(c.clone()).validate().is_err());
        c.header.timeout_ms = MAX_TIMEOUT_MS + 1;
        assert!(Command::Navigate(c).validate().is_err());
    }

    #[test]
    fn navigate_rejects_non_http_scheme() {
        let c = NavigateCommand {
            header: header(),
            url: "file:///etc/passwd".into(),
            wait_until: WaitUntil::Load,
            referer: None,
        };
        assert!(Command::Navigate(c).validate().is_err());
    }

    #[test]
    fn click_count_boundaries() {
        let base = ClickCommand {
            header: header(),
            selector: "#a".into(),
            button: MouseButton::Left,
            click_count: 1,
            position: None,
            force: false,
        };
        let mut c = base.clone();
        c.click_count = 1;
        assert!(Command::Click(c.clone()).validate().is_ok());
        c.click_count = 10;
        assert!(Command::Click(c.clone()).validate().is_ok());
        c.click_count = 0;
        assert!(Command::Click(c.clone()).validate().is_err());
        c.click_count = 11;
        assert!(Command::Click(c).validate().is_err());
    }

    #[test]
    fn click_position_boundaries() {
        let mut c = ClickCommand {
            header: header(),
            selector: "#a".into(),
            button: MouseButton::Left,
            click_count: 1,
            position: Some(Position { x: 0.0, y: 1.0 }),
            force: false,
        };
        assert!(Command::Click(c.clone()).validate().is_ok());
        c.position = Some(Position { x: -0.01, y: 0.5 });
        assert!(Command::Click(c.clone()).validate().is_err());
        c.position = Some(Position { x: 0.5, y: 1.01 });
        assert!(Command::Click(c).validate().is_err());
    }

    #[test]
    fn extract_requires_attribute_name() {
        let c = ExtractCommand {
            header: header(),
            selector: "#a".into(),
            extract_type: ExtractType::Attribute,
            attribute_name: None,
            property_name: None,
            multiple: false,
            trim_whitespace: true,
        };
        assert!(Command::Extract(c).validate().is_err());
    }

    #[test]
    fn wait_requires_selector_for_visibility_conditions() {
        let c = WaitCommand {
            header: header(),
            condition: WaitCondition::Visible,
            selector: None,
            text_content: None,
            custom_js: None,
            attribute_value: None,
            poll_interval_ms: 100,
        };
        assert!(Command::Wait(c).validate().is_err());
    }

    #[test]
    fn wait_load_condition_does_not_require_selector() {
        let c = WaitCommand {
            header: header(),
            condition: WaitCondition::Load,
            selector: None,
            text_content: None,
            custom_js: None,
            attribute_value: None,
            poll_interval_ms: 100,
        };
        assert!(Command::Wait(c).validate().is_ok());
    }

    #[test]
    fn wire_tag_is_method_field() {
        let c = Command::Navigate(NavigateCommand {
            header: header(),
            url: "https://example.test/".into(),
            wait_until: WaitUntil::Load,
            referer: None,
        });
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["method"], "navigate");
        assert_eq!(v["timeout"], 30_000);
    }

    #[test]
    fn deserializes_bare_navigate_frame() {
        let raw = serde_json::json!({
            "id": "a", "method": "navigate", "session_id": "S", "timeout": 30000,
            "url": "https://example.test/", "wait_until": "load",
        });
        let c: Command = serde_json::from_value(raw).unwrap();
        assert!(matches!(c, Command::Navigate(_)));
    }
}
