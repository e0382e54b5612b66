//! Messages exchanged with the UI surface, tagged by `type`.
//!
//! Payload fields decode leniently: a field of the wrong shape falls back
//! to its empty value so the request is rejected with its own warning
//! instead of failing as a whole.

use crate::resolver::LayerInfo;
use gf_core::mapping::{FieldToLayer, Mapping};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request from the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiMessage {
    /// Fill the first selected layer with the first item.
    #[serde(rename = "populate")]
    Populate {
        #[serde(default, deserialize_with = "lenient")]
        items: Vec<Value>,
    },
    SaveMapping {
        #[serde(default, deserialize_with = "lenient")]
        brand: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        mapping: Option<Mapping>,
    },
    LoadMapping {
        #[serde(default, deserialize_with = "lenient")]
        brand: Option<String>,
    },
    MultiPopulate {
        #[serde(default, deserialize_with = "lenient")]
        items: Vec<Value>,
        #[serde(default, deserialize_with = "lenient")]
        mapping: Option<Mapping>,
        #[serde(default, deserialize_with = "lenient")]
        offset: Option<i64>,
        #[serde(default, deserialize_with = "lenient")]
        count: Option<i64>,
    },
    IntrospectSelection,
    ApplyMapping {
        #[serde(default, deserialize_with = "lenient")]
        brand: Option<String>,
        #[serde(default, deserialize_with = "lenient_list")]
        pairs: Vec<FieldToLayer>,
        #[serde(default, deserialize_with = "lenient")]
        items: Vec<Value>,
        #[serde(default, deserialize_with = "lenient")]
        offset: Option<i64>,
        #[serde(default, deserialize_with = "lenient")]
        count: Option<i64>,
    },
}

fn lenient<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(de)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("ignoring malformed field: {e}");
        T::default()
    }))
}

/// Keeps the elements that decode; anything but an array is empty.
fn lenient_list<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(values) = Value::deserialize(de)? else {
        return Ok(Vec::new());
    };
    Ok(values
        .into_iter()
        .filter_map(|v| {
            serde_json::from_value(v)
                .inspect_err(|e| log::warn!("ignoring malformed entry: {e}"))
                .ok()
        })
        .collect())
}

impl UiMessage {
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Invalid UI message: {e}"))
    }
}

/// An event posted back to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginEvent {
    MappingSaved {
        brand: String,
    },
    MappingLoaded {
        brand: String,
        mapping: Mapping,
    },
    #[serde(rename_all = "camelCase")]
    MultiPopulateComplete {
        success_count: usize,
        fail_count: usize,
    },
    SelectionIntrospected {
        layers: Vec<LayerInfo>,
    },
    ApplyMappingComplete {
        success: usize,
        failed: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_core::id::LayerId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_apply_mapping() {
        let msg = UiMessage::from_json(
            r#"{
                "type": "APPLY_MAPPING",
                "brand": "tcm",
                "pairs": [{ "layerId": "1:2", "kind": "text", "field": "title",
                            "transform": { "uppercase": true } }],
                "items": [{ "title": "A" }],
                "offset": 1
            }"#,
        )
        .unwrap();
        let UiMessage::ApplyMapping {
            pairs,
            items,
            offset,
            count,
            ..
        } = msg
        else {
            panic!("wrong variant: {msg:?}");
        };
        assert_eq!(pairs[0].layer_id, LayerId::intern("1:2"));
        assert!(pairs[0].transform.as_ref().unwrap().uppercase);
        assert_eq!(items.len(), 1);
        assert_eq!((offset, count), (Some(1), None));
    }

    #[test]
    fn parses_legacy_and_unit_messages() {
        assert_eq!(
            UiMessage::from_json(r#"{ "type": "populate" }"#).unwrap(),
            UiMessage::Populate { items: vec![] }
        );
        assert_eq!(
            UiMessage::from_json(r#"{ "type": "INTROSPECT_SELECTION" }"#).unwrap(),
            UiMessage::IntrospectSelection
        );
        assert_eq!(
            UiMessage::from_json(r#"{ "type": "LOAD_MAPPING" }"#).unwrap(),
            UiMessage::LoadMapping { brand: None }
        );
        assert!(UiMessage::from_json(r#"{ "type": "RESIZE" }"#).is_err());
        assert!(UiMessage::from_json(r#"{ "items": [] }"#).is_err());
        assert!(UiMessage::from_json("not json").is_err());
    }

    #[test]
    fn malformed_payload_fields_fall_back_to_empty() {
        assert_eq!(
            UiMessage::from_json(
                r#"{ "type": "APPLY_MAPPING", "brand": 7, "pairs": null, "items": {}, "offset": "2" }"#
            )
            .unwrap(),
            UiMessage::ApplyMapping {
                brand: None,
                pairs: vec![],
                items: vec![],
                offset: None,
                count: None,
            }
        );
        assert_eq!(
            UiMessage::from_json(r#"{ "type": "SAVE_MAPPING", "brand": "tcm", "mapping": "Title" }"#)
                .unwrap(),
            UiMessage::SaveMapping {
                brand: Some("tcm".into()),
                mapping: None,
            }
        );
    }

    #[test]
    fn undecodable_pairs_are_dropped_individually() {
        let msg = UiMessage::from_json(
            r#"{
                "type": "APPLY_MAPPING",
                "pairs": [
                    { "layerId": "1:2", "kind": "video", "field": "title" },
                    { "layerId": "1:3", "kind": "text", "field": "title" },
                    null
                ]
            }"#,
        )
        .unwrap();
        let UiMessage::ApplyMapping { pairs, .. } = msg else {
            panic!("wrong variant: {msg:?}");
        };
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].layer_id, LayerId::intern("1:3"));
    }

    #[test]
    fn event_wire_shapes() {
        assert_eq!(
            serde_json::to_value(PluginEvent::MultiPopulateComplete {
                success_count: 3,
                fail_count: 1
            })
            .unwrap(),
            json!({ "type": "MULTI_POPULATE_COMPLETE", "successCount": 3, "failCount": 1 })
        );
        assert_eq!(
            serde_json::to_value(PluginEvent::ApplyMappingComplete {
                success: 2,
                failed: 0
            })
            .unwrap(),
            json!({ "type": "APPLY_MAPPING_COMPLETE", "success": 2, "failed": 0 })
        );
        assert_eq!(
            serde_json::to_value(PluginEvent::MappingLoaded {
                brand: "dc".into(),
                mapping: Mapping::default()
            })
            .unwrap(),
            json!({
                "type": "MAPPING_LOADED",
                "brand": "dc",
                "mapping": { "titleNode": "Title", "metaNode": "Meta", "posterNode": "Poster" }
            })
        );
    }
}
