//! Mapping types: how content fields land on layers.
//!
//! Two flavours exist. `Mapping` is the legacy name-based form (three
//! layer names looked up inside each card). `FieldToLayer` pairs address
//! layers by id and carry a per-pair `Transform`.

use crate::id::LayerId;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use std::ops::Range;

// ─── Name-based mapping ──────────────────────────────────────────────────

/// Layer names searched for inside each card. Names missing from the
/// wire keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mapping {
    pub title_node: String,
    pub meta_node: String,
    pub poster_node: String,
}

impl Default for Mapping {
    fn default() -> Self {
        Self {
            title_node: "Title".into(),
            meta_node: "Meta".into(),
            poster_node: "Poster".into(),
        }
    }
}

impl Mapping {
    /// All three names are blank; nothing could ever match.
    pub fn is_blank(&self) -> bool {
        [&self.title_node, &self.meta_node, &self.poster_node]
            .iter()
            .all(|n| n.trim().is_empty())
    }
}

// ─── Identifier-based pairs ──────────────────────────────────────────────

/// What a pair writes: characters or an image fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairKind {
    Text,
    Image,
}

impl PairKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairKind::Text => "text",
            PairKind::Image => "image",
        }
    }
}

/// One field → layer assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldToLayer {
    pub layer_id: LayerId,
    pub kind: PairKind,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

/// A row of the mapping table as the user edits it; any column may be unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRow {
    #[serde(default)]
    pub field_path: Option<String>,
    #[serde(default)]
    pub layer_id: Option<LayerId>,
    #[serde(default)]
    pub kind: Option<PairKind>,
    #[serde(default)]
    pub join: Option<String>,
    #[serde(default)]
    pub truncate: Option<usize>,
    #[serde(default)]
    pub uppercase: Option<bool>,
    #[serde(default)]
    pub fallback: Option<String>,
}

/// Keep complete rows (field, layer and kind set) and turn them into pairs.
pub fn rows_to_pairs(rows: &[MappingRow]) -> Vec<FieldToLayer> {
    rows.iter()
        .filter_map(|row| {
            let field = row.field_path.as_ref().filter(|f| !f.is_empty())?;
            let transform = Transform {
                fallback: row.fallback.clone(),
                join: row.join.clone(),
                truncate: row.truncate,
                uppercase: row.uppercase.unwrap_or(false),
            };
            Some(FieldToLayer {
                layer_id: row.layer_id?,
                kind: row.kind?,
                field: field.clone(),
                transform: (!transform.is_identity()).then_some(transform),
            })
        })
        .collect()
}

// ─── Item window ─────────────────────────────────────────────────────────

/// The `[offset, offset + count)` slice of items a run covers.
///
/// `count == 0` means "through the end": there is no use for a run that
/// populates zero items, so zero doubles as "unbounded".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub count: usize,
}

impl Window {
    pub fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }

    /// Window from wire values: negative offsets clamp to 0, missing or
    /// non-positive counts mean "to the end".
    pub fn from_wire(offset: Option<i64>, count: Option<i64>) -> Self {
        Self {
            offset: offset.unwrap_or(0).max(0) as usize,
            count: count.unwrap_or(0).max(0) as usize,
        }
    }

    /// Index range into a list of `len` items. Always within bounds.
    pub fn range(&self, len: usize) -> Range<usize> {
        let start = self.offset.min(len);
        let end = if self.count == 0 {
            len
        } else {
            start.saturating_add(self.count).min(len)
        };
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range(items.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_mapping_uses_conventional_names() {
        let m = Mapping::default();
        assert_eq!(m.title_node, "Title");
        assert_eq!(m.meta_node, "Meta");
        assert_eq!(m.poster_node, "Poster");
        assert!(!m.is_blank());
    }

    #[test]
    fn mapping_wire_shape() {
        let m: Mapping = serde_json::from_str(
            r#"{"titleNode":"Name","metaNode":"Info","posterNode":"Art"}"#,
        )
        .unwrap();
        assert_eq!(m.poster_node, "Art");
        let back = serde_json::to_string(&m).unwrap();
        assert!(back.contains("\"posterNode\":\"Art\""));
    }

    #[test]
    fn partial_mapping_keeps_default_names() {
        let m: Mapping = serde_json::from_str(r#"{"titleNode":"Name"}"#).unwrap();
        assert_eq!(m.title_node, "Name");
        assert_eq!(m.meta_node, "Meta");
        assert_eq!(m.poster_node, "Poster");
    }

    #[test]
    fn pair_wire_shape() {
        let pair: FieldToLayer = serde_json::from_str(
            r#"{"layerId":"4:2","kind":"image","field":"imageUrl"}"#,
        )
        .unwrap();
        assert_eq!(pair.layer_id, LayerId::intern("4:2"));
        assert_eq!(pair.kind, PairKind::Image);
        assert!(pair.transform.is_none());
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let rows = vec![
            MappingRow {
                field_path: Some("title".into()),
                layer_id: Some(LayerId::intern("1:1")),
                kind: Some(PairKind::Text),
                truncate: Some(20),
                ..Default::default()
            },
            MappingRow {
                field_path: Some("imageUrl".into()),
                kind: Some(PairKind::Image),
                ..Default::default()
            },
            MappingRow {
                field_path: Some("genres".into()),
                layer_id: Some(LayerId::intern("1:3")),
                kind: Some(PairKind::Text),
                ..Default::default()
            },
        ];
        let pairs = rows_to_pairs(&rows);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].transform.as_ref().unwrap().truncate, Some(20));
        assert_eq!(pairs[1].field, "genres");
        assert!(pairs[1].transform.is_none());
    }

    #[test]
    fn window_selects_middle_item() {
        let items = ["A", "B", "C"];
        assert_eq!(Window::new(1, 1).slice(&items), &["B"]);
    }

    #[test]
    fn zero_count_runs_to_end() {
        let items = ["A", "B", "C"];
        assert_eq!(Window::new(1, 0).slice(&items), &["B", "C"]);
        assert_eq!(Window::default().slice(&items), &items);
    }

    #[test]
    fn window_clamps_to_bounds() {
        let items = ["A", "B", "C"];
        assert!(Window::new(5, 2).slice(&items).is_empty());
        assert_eq!(Window::new(2, 10).slice(&items), &["C"]);
        assert_eq!(Window::new(0, usize::MAX).range(3), 0..3);
        assert_eq!(Window::from_wire(Some(-4), Some(-1)), Window::new(0, 0));
    }
}
