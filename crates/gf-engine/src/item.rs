//! Access to content items as they arrive from the UI.
//!
//! Items are JSON objects, normally `NormalizedItem`s, but pairs may name
//! any key, so the engine reads them loosely: `null` and missing keys are
//! the same thing, and role fields are only used when truthy.

use gf_core::normalize::MAX_GENRES;
use gf_core::transform::stringify;
use serde_json::Value;

/// Separator between the parts of a meta line and between its genres.
pub const META_SEPARATOR: &str = " • ";

/// Field `name` of `item`; `null` counts as missing.
pub fn field<'a>(item: &'a Value, name: &str) -> Option<&'a Value> {
    item.get(name).filter(|v| !v.is_null())
}

/// `false`, `0`, `""` and `null` are not worth writing.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy_text(item: &Value, name: &str) -> Option<String> {
    field(item, name).filter(|v| is_truthy(v)).map(stringify)
}

pub fn brand(item: &Value) -> &str {
    field(item, "brand").and_then(Value::as_str).unwrap_or("")
}

pub fn title(item: &Value) -> Option<String> {
    truthy_text(item, "title")
}

pub fn image_url(item: &Value) -> Option<String> {
    truthy_text(item, "imageUrl")
}

/// `year • genre • genre • runtime • advisory`, skipping absent parts.
pub fn meta_line(item: &Value) -> String {
    let genres = match field(item, "genres") {
        Some(Value::Array(list)) => list
            .iter()
            .take(MAX_GENRES)
            .map(stringify)
            .collect::<Vec<_>>()
            .join(META_SEPARATOR),
        _ => String::new(),
    };

    let mut parts = Vec::with_capacity(4);
    parts.extend(truthy_text(item, "year"));
    if !genres.is_empty() {
        parts.push(genres);
    }
    parts.extend(truthy_text(item, "runtimeDisplay"));
    parts.extend(truthy_text(item, "advisory"));
    parts.join(META_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn full_meta_line() {
        let item = json!({
            "year": 1999,
            "genres": ["Drama", "Thriller", "Mystery"],
            "runtimeDisplay": "1h 30m",
            "advisory": "TV-14"
        });
        assert_eq!(meta_line(&item), "1999 • Drama • Thriller • 1h 30m • TV-14");
    }

    #[test]
    fn sparse_meta_line_skips_falsy_parts() {
        let item = json!({ "year": 0, "genres": [], "runtimeDisplay": "", "advisory": "PG" });
        assert_eq!(meta_line(&item), "PG");
        assert_eq!(meta_line(&json!({})), "");
    }

    #[test]
    fn null_fields_are_missing() {
        let item = json!({ "title": null, "brand": "tcm", "imageUrl": "" });
        assert_eq!(field(&item, "title"), None);
        assert_eq!(title(&item), None);
        assert_eq!(image_url(&item), None);
        assert_eq!(brand(&item), "tcm");
        assert_eq!(brand(&json!({ "brand": 7 })), "");
    }
}
