//! JSON snapshots of a design document.
//!
//! A snapshot is a nested layer tree plus the selection. The CLI reads a
//! snapshot, lets the engine edit the document, and writes it back.

use crate::id::LayerId;
use crate::model::*;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

fn default_page() -> String {
    "Page 1".into()
}

fn default_size() -> f32 {
    100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default = "default_page")]
    pub page: String,
    #[serde(default)]
    pub selection: Vec<LayerId>,
    #[serde(default)]
    pub layers: Vec<LayerSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSnapshot {
    /// Generated when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LayerId>,
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_size")]
    pub width: f32,
    #[serde(default = "default_size")]
    pub height: f32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fills: Vec<Paint>,
    /// Text layers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<String>,
    /// Text layers only; a single default-font run is assumed when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<FontRun>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayerSnapshot>,
}

impl Document {
    /// Build a document from a snapshot.
    ///
    /// # Errors
    /// - a nested `PAGE` layer
    /// - two layers sharing an id
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Result<Self, String> {
        let mut doc = Document::new(&snapshot.page);
        let root = doc.root;
        for layer in &snapshot.layers {
            insert_recursive(&mut doc, root, layer)?;
        }
        doc.select(&snapshot.selection);
        Ok(doc)
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        let snapshot: DocumentSnapshot =
            serde_json::from_str(text).map_err(|e| format!("Invalid document snapshot: {e}"))?;
        Self::from_snapshot(&snapshot)
    }

    #[must_use]
    pub fn to_snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            page: self.graph[self.root].name.clone(),
            selection: self.selection.clone(),
            layers: self
                .children(self.root)
                .into_iter()
                .map(|idx| snapshot_recursive(self, idx))
                .collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, String> {
        serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| format!("Failed to encode document: {e}"))
    }
}

fn insert_recursive(
    doc: &mut Document,
    parent: NodeIndex,
    snap: &LayerSnapshot,
) -> Result<(), String> {
    if snap.layer_type == LayerType::Page {
        return Err(format!("Layer \"{}\" cannot be a nested page", snap.name));
    }
    let id = snap.id.unwrap_or_else(|| LayerId::generate("snap"));
    if doc.id_index.contains_key(&id) {
        return Err(format!("Duplicate layer id \"{id}\""));
    }

    let kind = match snap.layer_type {
        LayerType::Text => {
            let characters = snap.characters.clone().unwrap_or_default();
            if snap.runs.is_empty() {
                LayerKind::Text(TextContent::new(&characters, FontName::default()))
            } else {
                LayerKind::Text(TextContent {
                    characters,
                    runs: snap.runs.iter().cloned().collect(),
                })
            }
        }
        other => LayerKind::empty(other),
    };

    let layer = Layer {
        id,
        name: snap.name.clone(),
        kind,
        x: snap.x,
        y: snap.y,
        width: snap.width,
        height: snap.height,
        locked: snap.locked,
        fills: snap.fills.iter().cloned().collect::<SmallVec<_>>(),
    };
    let idx = doc.add_layer(parent, layer);
    for child in &snap.children {
        insert_recursive(doc, idx, child)?;
    }
    Ok(())
}

fn snapshot_recursive(doc: &Document, idx: NodeIndex) -> LayerSnapshot {
    let layer = &doc.graph[idx];
    let (characters, runs) = match &layer.kind {
        LayerKind::Text(text) => (Some(text.characters.clone()), text.runs.to_vec()),
        _ => (None, Vec::new()),
    };
    LayerSnapshot {
        id: Some(layer.id),
        name: layer.name.clone(),
        layer_type: layer.layer_type(),
        x: layer.x,
        y: layer.y,
        width: layer.width,
        height: layer.height,
        locked: layer.locked,
        fills: layer.fills.to_vec(),
        characters,
        runs,
        children: doc
            .children(idx)
            .into_iter()
            .map(|c| snapshot_recursive(doc, c))
            .collect(),
    }
}
