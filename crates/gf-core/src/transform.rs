//! Value transforms: turn a raw field value into the string written to a layer.
//!
//! Steps run in a fixed order: array join → stringify → fallback (only when
//! empty) → uppercase → truncate. Every input produces a string; there is
//! no error path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Appended when `truncate` cuts a value.
pub const TRUNCATION_MARKER: &str = "...";

/// Separator used for arrays when the transform names none.
pub const DEFAULT_JOIN: &str = ", ";

/// Formatting rules attached to a field→layer pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Written when the value stringifies to "".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Separator for array values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    /// Maximum length in characters; `0` disables truncation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub uppercase: bool,
}

impl Transform {
    pub fn is_identity(&self) -> bool {
        self == &Transform::default()
    }
}

/// Apply `transform` to `value`. `None` stands for a missing field.
#[must_use]
pub fn apply_transform(value: Option<&Value>, transform: Option<&Transform>) -> String {
    let mut result = match value {
        Some(Value::Array(items)) => {
            let sep = transform
                .and_then(|t| t.join.as_deref())
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_JOIN);
            items.iter().map(stringify).collect::<Vec<_>>().join(sep)
        }
        Some(other) => stringify(other),
        None => String::new(),
    };

    let Some(t) = transform else {
        return result;
    };

    if result.is_empty()
        && let Some(fallback) = &t.fallback
    {
        result = fallback.clone();
    }

    if t.uppercase {
        result = result.to_uppercase();
    }

    if let Some(limit) = t.truncate.filter(|n| *n > 0)
        && result.chars().count() > limit
    {
        result = result.chars().take(limit).collect::<String>() + TRUNCATION_MARKER;
    }

    result
}

/// Scalar stringification. Integral floats print without a fraction
/// (`1990.0` → `"1990"`), the way the upstream feed's consumers expect.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            (None, None, Some(f)) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
                format!("{f:.0}")
            }
            _ => n.to_string(),
        },
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t() -> Transform {
        Transform::default()
    }

    #[test]
    fn missing_transform_only_stringifies() {
        assert_eq!(apply_transform(Some(&json!("Dune")), None), "Dune");
        assert_eq!(apply_transform(Some(&json!(1984)), None), "1984");
        assert_eq!(apply_transform(Some(&json!(2.5)), None), "2.5");
        assert_eq!(apply_transform(Some(&json!(1990.0)), None), "1990");
        assert_eq!(apply_transform(Some(&json!(true)), None), "true");
        assert_eq!(apply_transform(Some(&json!(null)), None), "");
        assert_eq!(apply_transform(None, None), "");
    }

    #[test]
    fn arrays_join_with_default_or_custom_separator() {
        let genres = json!(["Drama", "Noir"]);
        assert_eq!(apply_transform(Some(&genres), None), "Drama, Noir");
        let custom = Transform {
            join: Some(" • ".into()),
            ..t()
        };
        assert_eq!(apply_transform(Some(&genres), Some(&custom)), "Drama • Noir");
        assert_eq!(
            apply_transform(Some(&json!(["a", null, 3])), None),
            "a, , 3"
        );
    }

    #[test]
    fn empty_inputs_never_fail() {
        let every = Transform {
            fallback: Some("TBA".into()),
            join: Some("/".into()),
            truncate: Some(2),
            uppercase: true,
        };
        for value in [json!([]), json!(null), json!(""), json!({}), json!([[]])] {
            let _ = apply_transform(Some(&value), Some(&every));
            let _ = apply_transform(Some(&value), None);
        }
        assert_eq!(apply_transform(Some(&json!([])), None), "");
        assert_eq!(apply_transform(None, Some(&every)), "TB...");
    }

    #[test]
    fn truncation_appends_marker() {
        let cut = Transform {
            truncate: Some(5),
            ..t()
        };
        let out = apply_transform(Some(&json!("abcdefgh")), Some(&cut));
        assert_eq!(out, "abcde...");
        assert!(out.chars().count() > 5);
        assert_eq!(apply_transform(Some(&json!("abcde")), Some(&cut)), "abcde");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let cut = Transform {
            truncate: Some(3),
            ..t()
        };
        assert_eq!(apply_transform(Some(&json!("Amélie")), Some(&cut)), "Amé...");
    }

    #[test]
    fn zero_truncate_is_ignored() {
        let zero = Transform {
            truncate: Some(0),
            ..t()
        };
        assert_eq!(apply_transform(Some(&json!("abc")), Some(&zero)), "abc");
    }

    #[test]
    fn fallback_only_replaces_empty() {
        let fb = Transform {
            fallback: Some("y".into()),
            ..t()
        };
        assert_eq!(apply_transform(Some(&json!("x")), Some(&fb)), "x");
        assert_eq!(apply_transform(Some(&json!("")), Some(&fb)), "y");
        assert_eq!(apply_transform(Some(&json!([])), Some(&fb)), "y");
        assert_eq!(apply_transform(None, Some(&fb)), "y");
    }

    #[test]
    fn uppercase_runs_before_truncate() {
        let both = Transform {
            truncate: Some(3),
            uppercase: true,
            fallback: Some("none".into()),
            ..t()
        };
        assert_eq!(apply_transform(Some(&json!("casablanca")), Some(&both)), "CAS...");
        assert_eq!(apply_transform(None, Some(&both)), "NON...");
    }

    #[test]
    fn deserializes_partial_transform() {
        let parsed: Transform = serde_json::from_str(r#"{"truncate": 12}"#).unwrap();
        assert_eq!(parsed.truncate, Some(12));
        assert!(!parsed.uppercase);
        assert!(Transform::default().is_identity());
    }
}
