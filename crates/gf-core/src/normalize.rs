//! Content normalization: raw feed hits → `NormalizedItem`.
//!
//! Upstream fields are populated inconsistently across brands, so every
//! canonical field is resolved through an ordered fallback chain. The first
//! non-empty candidate wins; when none exists the field is left empty.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use winnow::ascii::multispace0;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

/// Keyed image variants consulted, in order, after the featured image.
pub const IMAGE_VARIANT_PRIORITY: [&str; 5] = ["original", "3x2", "16x9", "2x3", "1x1"];

/// Genres kept per item.
pub const MAX_GENRES: usize = 2;

// ─── Raw feed records ────────────────────────────────────────────────────
//
// Every field decodes on its own: a value of the wrong type reads as absent
// and list entries of the wrong type are skipped, so one bad field never
// costs the whole hit.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitTitle {
    #[serde(default, deserialize_with = "lenient")]
    pub short: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub full: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageCut {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedImage {
    #[serde(default, deserialize_with = "lenient")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub cuts: Option<Vec<ImageCut>>,
}

/// Runtime as the feed sends it: seconds, either numeric or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRuntime {
    Seconds(f64),
    Text(String),
}

/// One record of `featureScroll.hits`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<HitTitle>,
    #[serde(default, deserialize_with = "lenient")]
    pub release_year: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub runtime: Option<RawRuntime>,
    #[serde(default, deserialize_with = "lenient")]
    pub runtime_display: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub runtime_formatted: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub genres: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub content_advisories: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mpaa_rating_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub featured_image: Option<FeaturedImage>,
    #[serde(default, deserialize_with = "lenient")]
    pub images: Option<HashMap<String, Value>>,
}

fn lenient<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(serde_json::from_value(Value::deserialize(de)?).unwrap_or_default())
}

fn lenient_list<'de, D, T>(de: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(values) = Value::deserialize(de)? else {
        return Ok(None);
    };
    Ok(Some(
        values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
    ))
}

// ─── Canonical item ──────────────────────────────────────────────────────

/// A hit reshaped into the fields the population engine understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(default)]
    pub genres: SmallVec<[String; MAX_GENRES]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub brand: String,
}

/// Field names, in declaration order, as pairs refer to them.
pub const ITEM_FIELDS: [&str; 8] = [
    "id",
    "title",
    "year",
    "genres",
    "advisory",
    "runtimeDisplay",
    "imageUrl",
    "brand",
];

impl NormalizedItem {
    /// Look a field up by its wire name. Absent optionals yield `None`.
    pub fn field(&self, name: &str) -> Option<Value> {
        let text = |s: &String| Value::String(s.clone());
        match name {
            "id" => Some(text(&self.id)),
            "title" => Some(text(&self.title)),
            "year" => self.year.map(Value::from),
            "genres" => Some(Value::Array(self.genres.iter().map(text).collect())),
            "advisory" => self.advisory.as_ref().map(text),
            "runtimeDisplay" => self.runtime_display.as_ref().map(text),
            "imageUrl" => self.image_url.as_ref().map(text),
            "brand" => Some(text(&self.brand)),
            _ => None,
        }
    }
}

/// A field offered to the mapping table, with its JS-style type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Describe every field of `item` for a field picker.
pub fn field_catalog(item: &NormalizedItem) -> Vec<FieldInfo> {
    ITEM_FIELDS
        .iter()
        .map(|name| {
            let kind = match item.field(name) {
                None | Some(Value::Null) => "undefined",
                Some(Value::Array(_)) => "array",
                Some(Value::Number(_)) => "number",
                Some(Value::Bool(_)) => "boolean",
                Some(Value::Object(_)) => "object",
                Some(Value::String(_)) => "string",
            };
            FieldInfo {
                path: (*name).to_string(),
                kind: kind.to_string(),
            }
        })
        .collect()
}

// ─── Normalization ───────────────────────────────────────────────────────

fn non_empty(s: Option<&String>) -> Option<String> {
    s.filter(|v| !v.is_empty()).cloned()
}

/// Normalize one hit. Never fails; missing data degrades field by field.
#[must_use]
pub fn normalize(hit: &Hit, brand: &str) -> NormalizedItem {
    let title = hit
        .title
        .as_ref()
        .and_then(|t| non_empty(t.short.as_ref()).or_else(|| non_empty(t.full.as_ref())))
        .unwrap_or_default();

    let advisory = hit
        .content_advisories
        .as_ref()
        .and_then(|list| non_empty(list.first()))
        .or_else(|| non_empty(hit.rating_code.as_ref()))
        .or_else(|| non_empty(hit.mpaa_rating_code.as_ref()));

    let runtime_display = non_empty(hit.runtime_formatted.as_ref())
        .or_else(|| non_empty(hit.runtime_display.as_ref()))
        .or_else(|| hit.runtime.as_ref().and_then(format_runtime));

    NormalizedItem {
        id: hit.id.clone(),
        title,
        year: hit.release_year,
        genres: hit
            .genres
            .iter()
            .flatten()
            .take(MAX_GENRES)
            .cloned()
            .collect(),
        advisory,
        runtime_display,
        image_url: resolve_image_url(hit),
        brand: brand.to_string(),
    }
}

pub fn normalize_all(hits: &[Hit], brand: &str) -> Vec<NormalizedItem> {
    hits.iter().map(|h| normalize(h, brand)).collect()
}

/// Featured image, then its first cut, then keyed variants by priority.
pub fn resolve_image_url(hit: &Hit) -> Option<String> {
    let featured = hit.featured_image.as_ref();
    featured
        .and_then(|f| non_empty(f.image_url.as_ref()))
        .or_else(|| {
            featured
                .and_then(|f| f.cuts.as_ref())
                .and_then(|cuts| cuts.first())
                .and_then(|cut| non_empty(cut.url.as_ref()))
        })
        .or_else(|| {
            let images = hit.images.as_ref()?;
            IMAGE_VARIANT_PRIORITY
                .iter()
                .find_map(|key| {
                    images
                        .get(*key)
                        .and_then(Value::as_str)
                        .filter(|url| !url.is_empty())
                })
                .map(str::to_string)
        })
}

/// `"{h}h {m}m"`, or `"{m}m"` under an hour. Negative or unparseable ⇒ `None`.
pub fn format_runtime(raw: &RawRuntime) -> Option<String> {
    let seconds = match raw {
        RawRuntime::Seconds(s) if s.is_finite() => *s,
        RawRuntime::Seconds(_) => return None,
        RawRuntime::Text(text) => parse_leading_integer(text)? as f64,
    };
    if seconds < 0.0 {
        return None;
    }
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds % 3600.0) / 60.0).floor();
    if hours > 0.0 {
        Some(format!("{hours:.0}h {minutes:.0}m"))
    } else {
        Some(format!("{minutes:.0}m"))
    }
}

/// Leading base-10 integer of `text`: whitespace, optional sign, digits,
/// then anything (`" 90s"` → 90).
pub fn parse_leading_integer(text: &str) -> Option<i64> {
    let mut input = text;
    leading_integer.parse_next(&mut input).ok()
}

fn leading_integer(input: &mut &str) -> ModalResult<i64> {
    multispace0.parse_next(input)?;
    let negative = if input.starts_with('-') || input.starts_with('+') {
        let neg = input.starts_with('-');
        *input = &input[1..];
        neg
    } else {
        false
    };
    let digits: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let value = digits
        .parse::<i64>()
        .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))?;
    Ok(if negative { -value } else { value })
}

// ─── Browse helpers ──────────────────────────────────────────────────────

/// Flatten a JSON record into dot-notation keys. Arrays stay whole;
/// nulls are dropped.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(value, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => flatten_object(map, prefix, out),
        Value::Array(_) => {
            let key = if prefix.is_empty() { "[]" } else { prefix };
            out.push((key.to_string(), value.clone()));
        }
        scalar => out.push((prefix.to_string(), scalar.clone())),
    }
}

fn flatten_object(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        flatten_into(v, &key, out);
    }
}

/// Heuristic used when listing raw hits: http(s) links that look like images.
pub fn looks_like_image_url(value: &Value) -> bool {
    let Value::String(s) = value else {
        return false;
    };
    let v = s.to_lowercase();
    v.starts_with("http")
        && ([".jpg", ".jpeg", ".png", ".webp"]
            .iter()
            .any(|ext| v.ends_with(ext))
            || v.contains("/images/")
            || v.contains("image"))
}
