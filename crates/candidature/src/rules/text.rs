//! Text rule.
//!
//! Stores one string under `value["text"]`. Email, phone, and URL variants are
//! the same rule with a [`TextFormat`] pattern on top; URLs without a scheme
//! are canonicalized to `https://`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{AssignContext, FieldRule};
use crate::input::FormInput;
use crate::model::Response;
use crate::validation::{ErrorCode, ErrorSet, ValidationContext};
use crate::value;

pub const TEXT_KEY: &str = "text";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[0-9][0-9 .\-()]{5,}$").expect("phone pattern compiles")
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}(:[0-9]+)?(/\S*)?$")
        .expect("url pattern compiles")
});

/// Whether a string looks like an email address.
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Email,
    Phone,
    Url,
}

impl TextFormat {
    fn matches(&self, s: &str) -> bool {
        match self {
            TextFormat::Plain => true,
            TextFormat::Email => is_valid_email(s),
            TextFormat::Phone => PHONE_RE.is_match(s),
            TextFormat::Url => URL_RE.is_match(s),
        }
    }

    fn description(&self) -> &'static str {
        match self {
            TextFormat::Plain => "text",
            TextFormat::Email => "email address",
            TextFormat::Phone => "phone number",
            TextFormat::Url => "URL",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextRule {
    pub max_length: usize,
    pub format: TextFormat,
}

impl TextRule {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            format: TextFormat::Plain,
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }
}

/// Prepend `https://` to a URL without a scheme.
pub fn canonicalize_url(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

impl FieldRule for TextRule {
    fn name(&self) -> &'static str {
        "text"
    }

    fn assign(&self, response: &mut Response, input: &FormInput, _cx: &AssignContext<'_>) {
        let Some(raw) = input.get(TEXT_KEY).and_then(|v| v.as_scalar()) else {
            return;
        };
        match value::presence(raw) {
            Some(v) => {
                response.value.insert(TEXT_KEY.to_string(), v);
            }
            None => {
                response.value.remove(TEXT_KEY);
            }
        }
    }

    fn normalize(&self, response: &mut Response) {
        if self.format == TextFormat::Plain {
            return;
        }
        if let Some(Value::String(s)) = response.value.get_mut(TEXT_KEY) {
            if s.trim().is_empty() {
                return;
            }
            *s = match self.format {
                TextFormat::Url => canonicalize_url(s),
                _ => s.trim().to_string(),
            };
        }
    }

    fn validate(&self, response: &Response, _cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        match response.value.get(TEXT_KEY) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => {
                if s.chars().count() > self.max_length {
                    errors.add(
                        TEXT_KEY,
                        ErrorCode::TooLong,
                        format!("text is too long (maximum is {} characters)", self.max_length),
                    );
                }
                if !s.trim().is_empty() && !self.format.matches(s) {
                    errors.add(
                        TEXT_KEY,
                        ErrorCode::Format,
                        format!("text is not a valid {}", self.format.description()),
                    );
                }
            }
            Some(_) => errors.add(TEXT_KEY, ErrorCode::InvalidType, "text must be a string"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::memory::MemBlobStore;
    use crate::catalog::CatalogEntry;
    use crate::config::EngineConfig;
    use crate::variants::VariantKind;
    use serde_json::json;
    use uuid::Uuid;

    fn response() -> Response {
        Response::new(Uuid::new_v4(), &CatalogEntry::new("a", VariantKind::Text))
    }

    fn check(rule: &TextRule, text: Value) -> ErrorSet {
        let mut r = response();
        r.value.insert(TEXT_KEY.into(), text);
        rule.normalize(&mut r);
        let config = EngineConfig::default();
        let mut errors = ErrorSet::new();
        rule.validate(&r, &ValidationContext::new(&config), &mut errors);
        errors
    }

    #[test]
    fn assign_stores_and_clears_text() {
        let store = MemBlobStore::new("s").unwrap();
        let cx = AssignContext::new(&store);
        let rule = TextRule::new(100);
        let mut r = response();

        rule.assign(&mut r, &FormInput::new().with("text", "Bonjour"), &cx);
        assert_eq!(r.value.get("text"), Some(&json!("Bonjour")));

        rule.assign(&mut r, &FormInput::new().with("text", "  "), &cx);
        assert!(r.value.get("text").is_none());

        rule.assign(&mut r, &FormInput::new().with("other", "x"), &cx);
        assert!(r.value.is_empty());
    }

    #[test]
    fn length_limit_counts_characters() {
        let rule = TextRule::new(5);
        assert!(check(&rule, json!("éééée")).is_empty());
        assert_eq!(check(&rule, json!("éééééé")).codes("text"), vec![ErrorCode::TooLong]);
    }

    #[test]
    fn non_string_is_a_type_error() {
        let rule = TextRule::new(100);
        assert_eq!(check(&rule, json!(42)).codes("text"), vec![ErrorCode::InvalidType]);
        assert_eq!(
            check(&rule, json!({"a": 1})).codes("text"),
            vec![ErrorCode::InvalidType]
        );
    }

    #[test]
    fn email_format() {
        let rule = TextRule::new(100).with_format(TextFormat::Email);
        assert!(check(&rule, json!("alice@example.fr")).is_empty());
        assert!(check(&rule, json!(" alice@example.fr ")).is_empty());
        assert_eq!(check(&rule, json!("alice@")).codes("text"), vec![ErrorCode::Format]);
    }

    #[test]
    fn phone_format_and_length() {
        let rule = TextRule::new(20).with_format(TextFormat::Phone);
        assert!(check(&rule, json!("01 23 45 67 89")).is_empty());
        assert!(check(&rule, json!("+33 1 23 45 67 89")).is_empty());
        assert_eq!(check(&rule, json!("call me")).codes("text"), vec![ErrorCode::Format]);
        assert!(check(&rule, json!("+33 1 23 45 67 89 00 00")).has("text", ErrorCode::TooLong));
    }

    #[test]
    fn url_is_canonicalized() {
        let rule = TextRule::new(100).with_format(TextFormat::Url);
        let mut r = response();
        r.value.insert(TEXT_KEY.into(), json!("example.fr/marches"));
        rule.normalize(&mut r);
        assert_eq!(r.value.get(TEXT_KEY), Some(&json!("https://example.fr/marches")));

        assert!(check(&rule, json!("http://example.fr")).is_empty());
        assert!(check(&rule, json!("example.fr")).is_empty());
        assert_eq!(check(&rule, json!("not a url")).codes("text"), vec![ErrorCode::Format]);
    }

    #[test]
    fn canonicalize_keeps_existing_scheme() {
        assert_eq!(canonicalize_url("ftp://x.fr"), "ftp://x.fr");
        assert_eq!(canonicalize_url(" x.fr "), "https://x.fr");
    }
}
