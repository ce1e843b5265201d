//! Placeholder substitution for notification templates.
//!
//! Templates reference fields of the reference object as `{{ name }}`.
//! Every matched token is replaced by literal string replacement of the
//! exact matched text, so identical tokens are substituted together and
//! tokens that differ only in inner whitespace are handled separately.
//! Unknown fields render as empty text; malformed braces are left as is.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ReferenceObject;

/// `{{`, optional whitespace, a word identifier, optional whitespace, `}}`.
pub const PLACEHOLDER_PATTERN: &str = r"(\{\{\s*)(\w+)(\s*\}\})";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid placeholder regex"));

/// Renders notification templates against a reference object.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Substitute every `{{ field }}` token in `template` with the
    /// matching field of `source`.
    ///
    /// Tokens are collected from the original template first and then
    /// applied one by one to the working text.
    pub fn render(&self, template: &str, source: &dyn ReferenceObject) -> String {
        let mut rendered = template.to_string();

        for caps in PLACEHOLDER_RE.captures_iter(template) {
            let token = &caps[0];
            let field = &caps[2];
            let value = source.field(field).unwrap_or_default();
            rendered = rendered.replace(token, &value);
        }

        rendered
    }

    /// Distinct field names referenced by `template`, in first-seen order.
    pub fn placeholders(&self, template: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in PLACEHOLDER_RE.captures_iter(template) {
            let name = &caps[2];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}
