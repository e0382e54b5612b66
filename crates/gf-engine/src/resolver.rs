//! Node resolution: find the layers a mapping writes to and classify them.

use crate::host::DocumentHost;
use gf_core::id::LayerId;
use gf_core::mapping::{Mapping, PairKind};
use gf_core::model::LayerType;
use serde::{Deserialize, Serialize};

/// Separator of the ancestor path shown for a layer.
pub const PATH_SEPARATOR: &str = " > ";

// ─── Layer info ──────────────────────────────────────────────────────────

/// Point-in-time description of a layer, rebuilt on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub text_capable: bool,
    pub image_fill_capable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl LayerInfo {
    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    /// Whether a pair of `kind` can write to this layer.
    pub fn accepts(&self, kind: PairKind) -> bool {
        match kind {
            PairKind::Text => self.text_capable,
            PairKind::Image => self.image_fill_capable,
        }
    }

    /// The kind a pair targeting this layer most likely wants.
    pub fn preferred_kind(&self) -> Option<PairKind> {
        if self.text_capable {
            Some(PairKind::Text)
        } else if self.image_fill_capable {
            Some(PairKind::Image)
        } else {
            None
        }
    }
}

/// Describe one layer. `None` when it does not exist.
pub fn describe(host: &dyn DocumentHost, id: LayerId) -> Option<LayerInfo> {
    let layer = host.layer(id)?;
    let text_capable = layer.layer_type == LayerType::Text;
    Some(LayerInfo {
        id,
        name: layer.name,
        layer_type: layer.layer_type,
        path: Some(layer_path(host, id)),
        text_capable,
        // Text layers technically carry fills, but never take image fills.
        image_fill_capable: layer.has_fills && !text_capable,
        locked: layer.locked,
    })
}

/// `"Card > Poster"` style ancestor path; the page is not included.
pub fn layer_path(host: &dyn DocumentHost, id: LayerId) -> String {
    host.ancestor_names(id).join(PATH_SEPARATOR)
}

/// Layers offered for mapping from the current selection.
///
/// A single container lists its direct children; otherwise each selected
/// layer is listed.
pub fn introspect_selection(host: &dyn DocumentHost) -> Vec<LayerInfo> {
    let selection = host.selection();
    let ids = match selection.as_slice() {
        [] => return Vec::new(),
        [single]
            if host
                .layer(*single)
                .is_some_and(|l| l.layer_type.is_introspect_container()) =>
        {
            host.children(*single)
        }
        many => many.to_vec(),
    };
    ids.into_iter().filter_map(|id| describe(host, id)).collect()
}

// ─── Write resolution ────────────────────────────────────────────────────

/// Outcome of resolving a pair's target right before writing.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Missing,
    Locked(LayerInfo),
    Ready(LayerInfo),
}

pub fn resolve_for_write(host: &dyn DocumentHost, id: LayerId) -> Resolution {
    match describe(host, id) {
        None => Resolution::Missing,
        Some(info) if info.is_locked() => Resolution::Locked(info),
        Some(info) => Resolution::Ready(info),
    }
}

// ─── Name-based lookup ───────────────────────────────────────────────────

/// The three role slots of a card. Each is independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappedNodes {
    pub title: Option<LayerId>,
    pub meta: Option<LayerId>,
    pub poster: Option<LayerId>,
}

/// Find the role layers inside `card` by exact name; first match wins.
pub fn find_mapped_nodes(host: &dyn DocumentHost, card: LayerId, mapping: &Mapping) -> MappedNodes {
    let find = |name: &str| {
        if name.is_empty() {
            None
        } else {
            host.find_descendant_by_name(card, name)
        }
    };
    MappedNodes {
        title: find(&mapping.title_node),
        meta: find(&mapping.meta_node),
        poster: find(&mapping.poster_node),
    }
}
