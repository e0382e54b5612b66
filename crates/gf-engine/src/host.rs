//! The capability surface the engine drives.
//!
//! A design tool embeds the engine by implementing these traits. All of
//! them run on one thread: async methods are suspension points (font
//! loading, storage, network), never parallel work.

use crate::messages::PluginEvent;
use crate::store::StoreError;
use async_trait::async_trait;
use gf_core::id::LayerId;
use gf_core::model::{FontName, FontSelection, ImageHash, LayerType, Paint};
use serde_json::Value;
use thiserror::Error;

/// Failure reported by a host primitive.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("layer {0} not found")]
    NotFound(LayerId),

    #[error("layer {0} is not a text layer")]
    NotText(LayerId),

    #[error("layer {0} has no fill surface")]
    NoFills(LayerId),

    #[error("font \"{font}\" must be loaded before editing layer {layer}")]
    FontNotLoaded { layer: LayerId, font: FontName },

    #[error("font \"{0}\" is not available")]
    FontUnavailable(FontName),

    #[error("image could not be decoded: {0}")]
    ImageDecode(String),

    #[error("image fetch failed: {0}")]
    Fetch(String),
}

/// What the host reports about one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    pub id: LayerId,
    pub name: String,
    pub layer_type: LayerType,
    /// Position relative to the parent.
    pub x: f32,
    pub y: f32,
    /// `None` when the layer type has no lock attribute.
    pub locked: Option<bool>,
    /// The layer exposes a fill list.
    pub has_fills: bool,
}

/// Read and edit access to the open document.
#[async_trait(?Send)]
pub trait DocumentHost {
    /// Current selection, in selection order.
    fn selection(&self) -> Vec<LayerId>;

    fn layer(&self, id: LayerId) -> Option<LayerSummary>;

    /// Direct children in document order. Empty for leaves.
    fn children(&self, id: LayerId) -> Vec<LayerId>;

    /// First descendant (the layer itself excluded) named exactly `name`.
    fn find_descendant_by_name(&self, id: LayerId, name: &str) -> Option<LayerId>;

    /// Names from the outermost ancestor down to the layer; the page is
    /// not included.
    fn ancestor_names(&self, id: LayerId) -> Vec<String>;

    fn font_selection(&self, id: LayerId) -> Result<FontSelection, HostError>;

    async fn load_font(&mut self, font: &FontName) -> Result<(), HostError>;

    /// Replace a text layer's characters. The font must be loaded.
    fn set_characters(&mut self, id: LayerId, characters: &str) -> Result<(), HostError>;

    /// Register encoded image bytes with the document.
    fn create_image(&mut self, bytes: Vec<u8>) -> Result<ImageHash, HostError>;

    fn set_fills(&mut self, id: LayerId, fills: Vec<Paint>) -> Result<(), HostError>;
}

/// The UI surface: transient notifications and structured events.
pub trait UiChannel {
    fn notify(&mut self, message: &str);

    fn post(&mut self, event: PluginEvent);
}

/// Persistent per-user key/value storage.
#[async_trait(?Send)]
pub trait ClientStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Fetches encoded image bytes for a URL.
#[async_trait(?Send)]
pub trait ImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HostError>;
}
