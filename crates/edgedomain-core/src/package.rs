//! Function packaging
//!
//! Renders the viewer-request handler from an embedded template. Every
//! placeholder sits inside a single-quoted JavaScript string, so values are
//! escaped as string content and substituted in one pass over the template;
//! a value that happens to contain a placeholder token is never expanded
//! again. Rendering is deterministic and distinct settings give distinct
//! sources.

use crate::handler::HandlerSettings;

/// File name of the handler inside the package
pub const HANDLER_FILE_NAME: &str = "handler.js";

/// `<module>.<export>` invoked by the edge runtime
pub const HANDLER_ENTRY_POINT: &str = "handler.main";

const HANDLER_TEMPLATE: &str = include_str!("../templates/handler.js");

/// A rendered handler ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionPackage {
    source: String,
}

impl FunctionPackage {
    /// Render the embedded handler template with `settings`
    pub fn render(settings: &HandlerSettings) -> Self {
        Self::from_template(HANDLER_TEMPLATE, settings)
    }

    /// Render an arbitrary template with `settings`
    pub fn from_template(template: &str, settings: &HandlerSettings) -> Self {
        let values = [
            ("[REDIRECT_ENABLED]", bool_literal(settings.redirect_enabled)),
            ("[REDIRECT_FROM]", escape_js(&settings.redirect_from)),
            ("[REDIRECT_TO]", escape_js(&settings.redirect_to)),
            ("[BASIC_AUTH_ENABLED]", bool_literal(settings.basic_auth_enabled)),
            ("[BASIC_AUTH_USERNAME]", escape_js(&settings.basic_auth_username)),
            ("[BASIC_AUTH_PASSWORD]", escape_js(&settings.basic_auth_password)),
        ];
        Self {
            source: substitute(template, &values),
        }
    }

    pub fn file_name(&self) -> &str {
        HANDLER_FILE_NAME
    }

    pub fn entry_point(&self) -> &str {
        HANDLER_ENTRY_POINT
    }

    /// Rendered handler source
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Code bytes uploaded as the function body
    pub fn code(&self) -> Vec<u8> {
        self.source.as_bytes().to_vec()
    }
}

fn bool_literal(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Escape `value` for use inside a single-quoted JavaScript string
fn escape_js(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Replace every token in one left-to-right pass
fn substitute(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('[') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match values.iter().find(|(token, _)| rest.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &rest[token.len()..];
            }
            None => {
                out.push('[');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
