//! C2 — rejects dangerous selectors, text, URLs, and scripts before dispatch.
//!
//! Mirrors the reference implementation's pattern blacklists and the
//! bracket/quote-balance check used to reject malformed selectors.

use regex_lite::Regex;
use std::sync::LazyLock;

pub const MAX_CUSTOM_JS_LENGTH: usize = 5_000;

const DANGEROUS_JS_FUNCTIONS: &[&str] =
    &["eval", "Function", "setTimeout", "setInterval", "XMLHttpRequest", "fetch", "import", "require"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("{field} exceeds maximum length of {max}")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} matches a disallowed pattern: {pattern}")]
    DisallowedPattern { field: &'static str, pattern: String },
    #[error("selector has unbalanced brackets or quotes")]
    UnbalancedSelector,
    #[error("url scheme {scheme:?} is not allowed")]
    DisallowedScheme { scheme: String },
    #[error("url could not be parsed")]
    InvalidUrl,
    #[error("custom_js references disallowed function {function}")]
    DisallowedFunction { function: &'static str },
}

static JS_INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<script[^>]*>",
        r"(?i)</script>",
        r"(?i)javascript:",
        r"(?i)vbscript:",
        r"(?i)data:text/html",
        r"(?i)on\w+\s*=",
        r"(?i)<iframe[^>]*>",
        r"(?i)<object[^>]*>",
        r"(?i)<embed[^>]*>",
        r"(?i)<svg[^>]*onload",
        r"(?i)eval\s*\(",
        r"(?i)expression\s*\(",
        r"(?i)document\s*\.\s*(write|cookie)",
        r"(?i)window\s*\.\s*location",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern compiles"))
    .collect()
});

static CSS_INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)expression\s*\(",
        r"(?i)@import",
        r"(?i)javascript:",
        r"(?i)behavior\s*:",
        r"(?i)-moz-binding",
        r"(?i)url\s*\(\s*['\x22]?\s*(javascript|data):",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern compiles"))
    .collect()
});

fn check_patterns(value: &str, patterns: &[Regex], field: &'static str) -> Result<(), SanitizeError> {
    for pattern in patterns {
        if pattern.is_match(value) {
            return Err(SanitizeError::DisallowedPattern { field, pattern: pattern.as_str().to_string() });
        }
    }
    Ok(())
}

/// Bracket/quote balance check: selectors must close every `(`/`[` they
/// open, and quotes must not straddle bracket boundaries.
pub fn is_balanced_selector(selector: &str) -> bool {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = selector.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' => stack.push(c),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }

    quote.is_none() && stack.is_empty()
}

pub fn sanitize_selector(selector: &str, max_len: usize) -> Result<(), SanitizeError> {
    if selector.len() > max_len {
        return Err(SanitizeError::TooLong { field: "selector", max: max_len });
    }
    check_patterns(selector, &JS_INJECTION_PATTERNS, "selector")?;
    check_patterns(selector, &CSS_INJECTION_PATTERNS, "selector")?;
    if !is_balanced_selector(selector) {
        return Err(SanitizeError::UnbalancedSelector);
    }
    Ok(())
}

pub fn sanitize_text(text: &str, max_len: usize) -> Result<(), SanitizeError> {
    if text.len() > max_len {
        return Err(SanitizeError::TooLong { field: "text", max: max_len });
    }
    check_patterns(text, &JS_INJECTION_PATTERNS, "text")
}

pub fn sanitize_url(url: &str, max_len: usize) -> Result<(), SanitizeError> {
    if url.len() > max_len {
        return Err(SanitizeError::TooLong { field: "url", max: max_len });
    }
    check_patterns(url, &JS_INJECTION_PATTERNS, "url")?;
    let parsed = url::Url::parse(url).map_err(|_| SanitizeError::InvalidUrl)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(SanitizeError::DisallowedScheme { scheme: parsed.scheme().to_string() });
    }
    Ok(())
}

pub fn sanitize_javascript(js: &str) -> Result<(), SanitizeError> {
    if js.len() > MAX_CUSTOM_JS_LENGTH {
        return Err(SanitizeError::TooLong { field: "custom_js", max: MAX_CUSTOM_JS_LENGTH });
    }
    for function in DANGEROUS_JS_FUNCTIONS {
        let pattern = format!(r"\b{}\s*\(", regex_lite::escape(function));
        let re = Regex::new(&pattern).expect("dynamic pattern compiles");
        if re.is_match(js) {
            return Err(SanitizeError::DisallowedFunction { function });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_selector_accepts_normal_css() {
        assert!(is_balanced_selector("div.class > a[href='x']"));
    }

    #[test]
    fn balanced_selector_rejects_unclosed_bracket() {
        assert!(!is_balanced_selector("a[href='x'"));
    }

    #[test]
    fn balanced_selector_ignores_brackets_inside_quotes() {
        assert!(is_balanced_selector("a[data-x=\"(unbalanced\"]"));
    }

    #[test]
    fn sanitize_selector_rejects_script_tag() {
        assert!(sanitize_selector("<script>alert(1)</script>", 1000).is_err());
    }

    #[test]
    fn sanitize_selector_rejects_oversized() {
        let long = "a".repeat(1001);
        assert_eq!(
            sanitize_selector(&long, 1000),
            Err(SanitizeError::TooLong { field: "selector", max: 1000 })
        );
    }

    #[test]
    fn sanitize_url_rejects_javascript_scheme() {
        assert!(sanitize_url("javascript:alert(1)", 2048).is_err());
    }

    #[test]
    fn sanitize_url_accepts_https() {
        assert!(sanitize_url("https://example.test/path", 2048).is_ok());
    }

    #[test]
    fn sanitize_javascript_rejects_eval() {
        assert!(sanitize_javascript("eval('1')").is_err());
    }

    #[test]
    fn sanitize_javascript_accepts_benign_expression() {
        assert!(sanitize_javascript("document.querySelector('#a').textContent.length > 0").is_ok());
    }
}
