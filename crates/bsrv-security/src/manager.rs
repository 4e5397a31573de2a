//! Coordinates C2 (sanitizer) and C3 (domain policy) against a parsed
//! command, honoring the configured kill-switches.

use bsrv_protocol::Command;

use crate::domain::DomainPolicy;
use crate::sanitizer::{self, SanitizeError};

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub enable_input_sanitization: bool,
    pub max_selector_length: usize,
    pub max_text_input_length: usize,
    pub max_url_length: usize,
    pub allow_custom_js: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_input_sanitization: true,
            max_selector_length: 1_000,
            max_text_input_length: 10_000,
            max_url_length: 2_048,
            allow_custom_js: true,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SecurityViolation {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
    #[error("custom_js is not permitted by configuration")]
    CustomJsNotAllowed,
    #[error("navigation target is not permitted by domain policy")]
    DomainDenied,
}

pub struct SecurityManager {
    config: SecurityConfig,
    domain_policy: DomainPolicy,
}

impl SecurityManager {
    pub fn new(config: SecurityConfig, domain_policy: DomainPolicy) -> Self {
        Self { config, domain_policy }
    }

    /// Runs C2 (unless disabled) and C3 against a parsed command's
    /// user-controlled fields. Sanitization failures and domain-policy
    /// failures both surface as `SecurityViolation`; the caller maps
    /// that to `INVALID_PARAMS`/`security`.
    pub fn validate_command(&self, command: &Command) -> Result<(), SecurityViolation> {
        match command {
            Command::Navigate(c) => {
                if self.config.enable_input_sanitization {
                    sanitizer::sanitize_url(&c.url, self.config.max_url_length)?;
                }
                if let Ok(parsed) = url::Url::parse(&c.url) {
                    if let Some(host) = parsed.host_str() {
                        if !self.domain_policy.is_allowed(host) {
                            return Err(SecurityViolation::DomainDenied);
                        }
                    }
                }
                Ok(())
            }
            Command::Click(c) => self.sanitize_selector(&c.selector),
            Command::Fill(c) => {
                self.sanitize_selector(&c.selector)?;
                if self.config.enable_input_sanitization {
                    sanitizer::sanitize_text(&c.text, self.config.max_text_input_length)?;
                }
                Ok(())
            }
            Command::Extract(c) => self.sanitize_selector(&c.selector),
            Command::Wait(c) => {
                if let Some(selector) = &c.selector {
                    self.sanitize_selector(selector)?;
                }
                if let Some(text) = &c.text_content {
                    if self.config.enable_input_sanitization {
                        sanitizer::sanitize_text(text, self.config.max_text_input_length)?;
                    }
                }
                if let Some(js) = &c.custom_js {
                    if !self.config.allow_custom_js && !js.is_empty() {
                        return Err(SecurityViolation::CustomJsNotAllowed);
                    }
                    if self.config.enable_input_sanitization {
                        sanitizer::sanitize_javascript(js)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn sanitize_selector(&self, selector: &str) -> Result<(), SecurityViolation> {
        if self.config.enable_input_sanitization {
            sanitizer::sanitize_selector(selector, self.config.max_selector_length)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsrv_protocol::{CommandHeader, NavigateCommand, WaitCommand, WaitCondition, WaitUntil};

    fn header() -> CommandHeader {
        CommandHeader { id: "a".into(), session_id: "s".into(), timeout_ms: 30_000 }
    }

    #[test]
    fn blocked_domain_is_rejected() {
        let manager = SecurityManager::new(
            SecurityConfig::default(),
            DomainPolicy::new(vec![], vec!["evil.test".into()]),
        );
        let cmd = Command::Navigate(NavigateCommand {
            header: header(),
            url: "https://evil.test/".into(),
            wait_until: WaitUntil::Load,
            referer: None,
        });
        assert!(matches!(manager.validate_command(&cmd), Err(SecurityViolation::DomainDenied)));
    }

    #[test]
    fn custom_js_rejected_when_disallowed() {
        let mut config = SecurityConfig::default();
        config.allow_custom_js = false;
        let manager = SecurityManager::new(config, DomainPolicy::default());
        let cmd = Command::Wait(WaitCommand {
            header: header(),
            condition: WaitCondition::Load,
            selector: None,
            text_content: None,
            custom_js: Some("true".into()),
            attribute_value: None,
            poll_interval_ms: 100,
        });
        assert!(matches!(
            manager.validate_command(&cmd),
            Err(SecurityViolation::CustomJsNotAllowed)
        ));
    }

    #[test]
    fn disabling_sanitization_still_runs_domain_policy() {
        let mut config = SecurityConfig::default();
        config.enable_input_sanitization = false;
        let manager = SecurityManager::new(
            config,
            DomainPolicy::new(vec![], vec!["evil.test".into()]),
        );
        let cmd = Command::Navigate(NavigateCommand {
            header: header(),
            url: "https://evil.test/".into(),
            wait_until: WaitUntil::Load,
            referer: None,
        });
        assert!(manager.validate_command(&cmd).is_err());
    }
}
