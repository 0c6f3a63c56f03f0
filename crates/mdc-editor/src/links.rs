//! Link target policy
//!
//! External `http(s)` links without an explicit `rel` open in a new tab
//! with a safe `rel` inside the editor. That default exists only in the
//! editor model: on the way back out an external link drops `target` and
//! the default `rel`. Relative links keep whatever the author wrote.

use mdc_ast::Attrs;
use serde_json::Value;
use url::Url;

pub const DEFAULT_TARGET: &str = "_blank";
pub const DEFAULT_REL: &str = "noopener noreferrer nofollow";

/// Absolute `http` or `https` URL
pub fn is_external(href: &str) -> bool {
    Url::parse(href).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Link attributes as the editor sees them
pub fn editor_attrs(mut attrs: Attrs) -> Attrs {
    let external = attrs
        .get("href")
        .and_then(Value::as_str)
        .is_some_and(is_external);
    if external && !attrs.contains_key("rel") {
        attrs.insert("target".to_string(), Value::String(DEFAULT_TARGET.to_string()));
        attrs.insert("rel".to_string(), Value::String(DEFAULT_REL.to_string()));
    }
    attrs
}

/// Link attributes as they are written back to markup
pub fn markup_attrs(mut attrs: Attrs) -> Attrs {
    let external = attrs
        .get("href")
        .and_then(Value::as_str)
        .is_some_and(is_external);
    if external {
        attrs.remove("target");
        if attrs.get("rel").and_then(Value::as_str) == Some(DEFAULT_REL) {
            attrs.remove("rel");
        }
    }
    attrs.retain(|_, v| !v.is_null());
    attrs
}
