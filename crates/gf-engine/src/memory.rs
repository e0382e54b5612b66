//! In-memory implementations of the host traits.
//!
//! `MemoryHost` edits a `gf_core::Document` and enforces the same
//! preconditions a real design tool does: characters can only change once
//! the font is loaded, and image bytes must decode. The CLI runs the engine
//! against these, and so do the tests.

use crate::host::{
    ClientStorage, DocumentHost, HostError, ImageFetcher, LayerSummary, UiChannel,
};
use crate::messages::PluginEvent;
use crate::store::StoreError;
use async_trait::async_trait;
use gf_core::id::LayerId;
use gf_core::model::{Document, FontName, FontSelection, ImageHash, LayerKind, LayerType, Paint};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

// ─── Document host ───────────────────────────────────────────────────────

/// A single write the host applied, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostWrite {
    Characters { layer: LayerId, characters: String },
    Fills { layer: LayerId, fills: Vec<Paint> },
}

impl HostWrite {
    pub fn layer(&self) -> LayerId {
        match self {
            HostWrite::Characters { layer, .. } | HostWrite::Fills { layer, .. } => *layer,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    pub doc: Document,
    loaded_fonts: HashSet<FontName>,
    missing_fonts: HashSet<FontName>,
    writes: Vec<HostWrite>,
}

impl MemoryHost {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            ..Default::default()
        }
    }

    /// Make `load_font` fail for `font`.
    #[must_use]
    pub fn without_font(mut self, font: FontName) -> Self {
        self.missing_fonts.insert(font);
        self
    }

    pub fn is_font_loaded(&self, font: &FontName) -> bool {
        self.loaded_fonts.contains(font)
    }

    /// Every write applied so far.
    pub fn writes(&self) -> &[HostWrite] {
        &self.writes
    }

    pub fn characters(&self, id: LayerId) -> Option<&str> {
        self.doc
            .get(id)?
            .text_content()
            .map(|t| t.characters.as_str())
    }

    pub fn fills(&self, id: LayerId) -> Option<&[Paint]> {
        self.doc.get(id).map(|l| l.fills.as_slice())
    }
}

#[async_trait(?Send)]
impl DocumentHost for MemoryHost {
    fn selection(&self) -> Vec<LayerId> {
        self.doc.selection.clone()
    }

    fn layer(&self, id: LayerId) -> Option<LayerSummary> {
        let layer = self.doc.get(id)?;
        let layer_type = layer.layer_type();
        Some(LayerSummary {
            id,
            name: layer.name.clone(),
            layer_type,
            x: layer.x,
            y: layer.y,
            locked: (layer_type != LayerType::Page).then_some(layer.locked),
            has_fills: layer_type.has_fill_surface(),
        })
    }

    fn children(&self, id: LayerId) -> Vec<LayerId> {
        self.doc.child_ids(id)
    }

    fn find_descendant_by_name(&self, id: LayerId, name: &str) -> Option<LayerId> {
        self.doc.find_descendant_by_name(id, name)
    }

    fn ancestor_names(&self, id: LayerId) -> Vec<String> {
        self.doc.path_names(id)
    }

    fn font_selection(&self, id: LayerId) -> Result<FontSelection, HostError> {
        let layer = self.doc.get(id).ok_or(HostError::NotFound(id))?;
        layer
            .text_content()
            .map(|t| t.font_selection())
            .ok_or(HostError::NotText(id))
    }

    async fn load_font(&mut self, font: &FontName) -> Result<(), HostError> {
        if self.missing_fonts.contains(font) {
            return Err(HostError::FontUnavailable(font.clone()));
        }
        if self.loaded_fonts.insert(font.clone()) {
            log::debug!("loaded font {font}");
        }
        Ok(())
    }

    fn set_characters(&mut self, id: LayerId, characters: &str) -> Result<(), HostError> {
        let layer = self.doc.get_mut(id).ok_or(HostError::NotFound(id))?;
        let LayerKind::Text(text) = &mut layer.kind else {
            return Err(HostError::NotText(id));
        };
        // New characters take the leading run's font, so that one must be loaded.
        if let Some(run) = text.runs.first()
            && !self.loaded_fonts.contains(&run.font)
        {
            return Err(HostError::FontNotLoaded {
                layer: id,
                font: run.font.clone(),
            });
        }
        text.set_characters(characters);
        self.writes.push(HostWrite::Characters {
            layer: id,
            characters: characters.to_string(),
        });
        Ok(())
    }

    fn create_image(&mut self, bytes: Vec<u8>) -> Result<ImageHash, HostError> {
        let format = sniff_image_format(&bytes)
            .ok_or_else(|| HostError::ImageDecode(format!("{} bytes, unknown format", bytes.len())))?;
        let hash = self.doc.add_image(bytes);
        log::debug!("registered {format} image {hash}");
        Ok(hash)
    }

    fn set_fills(&mut self, id: LayerId, fills: Vec<Paint>) -> Result<(), HostError> {
        let layer = self.doc.get_mut(id).ok_or(HostError::NotFound(id))?;
        if !layer.layer_type().has_fill_surface() {
            return Err(HostError::NoFills(id));
        }
        layer.fills = fills.iter().cloned().collect();
        self.writes.push(HostWrite::Fills { layer: id, fills });
        Ok(())
    }
}

/// Recognize the image containers hosts accept by their signature.
pub fn sniff_image_format(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

// ─── Image sources ───────────────────────────────────────────────────────

/// Serves images from a fixed URL → bytes table; unknown URLs fail like a 404.
#[derive(Debug, Clone, Default)]
pub struct MemoryImages {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImages {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait(?Send)]
impl ImageFetcher for MemoryImages {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HostError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| HostError::Fetch(format!("HTTP 404 for {url}")))
    }
}

// ─── UI channel ──────────────────────────────────────────────────────────

/// Records notifications and events instead of showing them.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    pub notifications: Vec<String>,
    pub events: Vec<PluginEvent>,
}

impl UiChannel for RecordingChannel {
    fn notify(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }

    fn post(&mut self, event: PluginEvent) {
        self.events.push(event);
    }
}

// ─── Storage ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl ClientStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Storage persisted as one MessagePack file holding every key.
///
/// The whole table is rewritten on each `set`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl FileStorage {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => rmp_serde::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let bytes = rmp_serde::to_vec(&self.entries)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl ClientStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}
