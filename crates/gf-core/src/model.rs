//! In-memory design document: a tree of layers rooted at a page.
//!
//! This is the document the in-memory host edits. Layers are stored in a
//! `StableDiGraph` with parent → child edges, so indices stay valid while
//! layers are added. Child order is insertion order, which is also the
//! order name lookups walk.

use crate::id::LayerId;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

// ─── Colors & Paint ──────────────────────────────────────────────────────

/// RGB color, each channel in `[0.0, 1.0]`. Serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RGB` or `#RRGGBB` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let channel = |hi: u8, lo: u8| Some((hex_val(hi)? << 4 | hex_val(lo)?) as f32 / 255.0);

        match bytes.len() {
            3 => Some(Self::rgb(
                (hex_val(bytes[0])? * 17) as f32 / 255.0,
                (hex_val(bytes[1])? * 17) as f32 / 255.0,
                (hex_val(bytes[2])? * 17) as f32 / 255.0,
            )),
            6 => Some(Self::rgb(
                channel(bytes[0], bytes[1])?,
                channel(bytes[2], bytes[3])?,
                channel(bytes[4], bytes[5])?,
            )),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02X}{:02X}{:02X}", byte(self.r), byte(self.g), byte(self.b))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color `{s}`")))
    }
}

/// Content hash of an image registered with the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHash(pub String);

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleMode {
    #[default]
    Fill,
    Fit,
    Crop,
    Tile,
}

fn full_opacity() -> f32 {
    1.0
}

/// One entry of a layer's fill list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Paint {
    Solid {
        color: Color,
        #[serde(default = "full_opacity")]
        opacity: f32,
    },
    Image {
        #[serde(rename = "imageHash")]
        image_hash: ImageHash,
        #[serde(default, rename = "scaleMode")]
        scale_mode: ScaleMode,
    },
}

// ─── Fonts ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: &str, style: &str) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl Default for FontName {
    fn default() -> Self {
        Self::new("Inter", "Regular")
    }
}

impl fmt::Display for FontName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// A character range `[start, end)` set in one font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRun {
    pub start: usize,
    pub end: usize,
    pub font: FontName,
}

/// What a text layer reports as its font.
///
/// Text with several fonts reports `Mixed`; the only font a writer can
/// safely load up front is the one of the leading run.
#[derive(Debug, Clone, PartialEq)]
pub enum FontSelection {
    Uniform(FontName),
    Mixed { leading: Option<FontName> },
}

/// Characters plus the font runs covering them.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub characters: String,
    pub runs: SmallVec<[FontRun; 1]>,
}

impl TextContent {
    pub fn new(characters: &str, font: FontName) -> Self {
        let end = characters.chars().count();
        let mut runs = SmallVec::new();
        runs.push(FontRun { start: 0, end, font });
        Self {
            characters: characters.into(),
            runs,
        }
    }

    pub fn font_selection(&self) -> FontSelection {
        let leading = self.runs.first().map(|r| r.font.clone());
        match &leading {
            Some(first) if self.runs.iter().all(|r| &r.font == first) => {
                FontSelection::Uniform(first.clone())
            }
            _ => FontSelection::Mixed { leading },
        }
    }

    /// Replace the characters.
    ///
    /// Runs are clipped to the new length; characters past the last
    /// surviving run take the leading run's font. Interior runs keep their
    /// font metadata as-is.
    pub fn set_characters(&mut self, characters: &str) {
        let len = characters.chars().count();
        let leading = self
            .runs
            .first()
            .map(|r| r.font.clone())
            .unwrap_or_default();

        self.runs.retain(|r| r.start < len);
        for run in &mut self.runs {
            run.end = run.end.min(len);
        }
        let covered = self.runs.last().map(|r| r.end).unwrap_or(0);
        if covered < len {
            match self.runs.last_mut() {
                Some(last) if last.font == leading => last.end = len,
                _ => self.runs.push(FontRun {
                    start: covered,
                    end: len,
                    font: leading.clone(),
                }),
            }
        }
        if self.runs.is_empty() {
            self.runs.push(FontRun {
                start: 0,
                end: 0,
                font: leading,
            });
        }
        self.characters = characters.into();
    }
}

// ─── Layers ──────────────────────────────────────────────────────────────

/// Structural type of a layer as the host reports it (`"FRAME"`, `"TEXT"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerType {
    Page,
    Frame,
    Group,
    Component,
    Instance,
    Text,
    Rectangle,
    Ellipse,
    Vector,
}

impl LayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Page => "PAGE",
            LayerType::Frame => "FRAME",
            LayerType::Group => "GROUP",
            LayerType::Component => "COMPONENT",
            LayerType::Instance => "INSTANCE",
            LayerType::Text => "TEXT",
            LayerType::Rectangle => "RECTANGLE",
            LayerType::Ellipse => "ELLIPSE",
            LayerType::Vector => "VECTOR",
        }
    }

    /// Containers whose children are treated as cards.
    pub fn is_card_container(&self) -> bool {
        matches!(
            self,
            LayerType::Frame | LayerType::Group | LayerType::Component
        )
    }

    /// Containers whose children are listed on introspection.
    /// Instances are listed but never split into cards.
    pub fn is_introspect_container(&self) -> bool {
        self.is_card_container() || matches!(self, LayerType::Instance)
    }

    /// Whether layers of this type expose a fill list.
    pub fn has_fill_surface(&self) -> bool {
        !matches!(self, LayerType::Page | LayerType::Group)
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Page,
    Frame,
    Group,
    Component,
    Instance,
    Text(TextContent),
    Rectangle,
    Ellipse,
    Vector,
}

impl LayerKind {
    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerKind::Page => LayerType::Page,
            LayerKind::Frame => LayerType::Frame,
            LayerKind::Group => LayerType::Group,
            LayerKind::Component => LayerType::Component,
            LayerKind::Instance => LayerType::Instance,
            LayerKind::Text(_) => LayerType::Text,
            LayerKind::Rectangle => LayerType::Rectangle,
            LayerKind::Ellipse => LayerType::Ellipse,
            LayerKind::Vector => LayerType::Vector,
        }
    }

    /// Build an empty kind for a type; text starts with no characters in
    /// the default font.
    pub fn empty(layer_type: LayerType) -> Self {
        match layer_type {
            LayerType::Page => LayerKind::Page,
            LayerType::Frame => LayerKind::Frame,
            LayerType::Group => LayerKind::Group,
            LayerType::Component => LayerKind::Component,
            LayerType::Instance => LayerKind::Instance,
            LayerType::Text => LayerKind::Text(TextContent::new("", FontName::default())),
            LayerType::Rectangle => LayerKind::Rectangle,
            LayerType::Ellipse => LayerKind::Ellipse,
            LayerType::Vector => LayerKind::Vector,
        }
    }
}

/// A single layer in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    /// Display name; the legacy name-based mapping matches against it.
    pub name: String,
    pub kind: LayerKind,
    /// Position relative to the parent.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub locked: bool,
    pub fills: SmallVec<[Paint; 1]>,
}

impl Layer {
    pub fn new(id: LayerId, name: &str, kind: LayerKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            locked: false,
            fills: SmallVec::new(),
        }
    }

    pub fn text(id: LayerId, name: &str, characters: &str, font: FontName) -> Self {
        Self::new(id, name, LayerKind::Text(TextContent::new(characters, font)))
    }

    #[must_use]
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    #[must_use]
    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn layer_type(&self) -> LayerType {
        self.kind.layer_type()
    }

    pub fn text_content(&self) -> Option<&TextContent> {
        match &self.kind {
            LayerKind::Text(t) => Some(t),
            _ => None,
        }
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// A design document page: the layer tree, the current selection, and the
/// images registered by fills.
#[derive(Debug, Clone)]
pub struct Document {
    pub graph: StableDiGraph<Layer, ()>,
    /// The page layer.
    pub root: NodeIndex,
    /// Index from `LayerId` → `NodeIndex` for fast lookup.
    pub id_index: HashMap<LayerId, NodeIndex>,
    /// Selected layers, in the order they were selected.
    pub selection: Vec<LayerId>,
    pub images: HashMap<ImageHash, Vec<u8>>,
}

impl Document {
    #[must_use]
    pub fn new(page_name: &str) -> Self {
        let mut graph = StableDiGraph::new();
        let page = Layer::new(LayerId::generate("page"), page_name, LayerKind::Page);
        let page_id = page.id;
        let root = graph.add_node(page);

        let mut id_index = HashMap::new();
        id_index.insert(page_id, root);

        Self {
            graph,
            root,
            id_index,
            selection: Vec::new(),
            images: HashMap::new(),
        }
    }

    /// Add a layer as the last child of `parent`.
    pub fn add_layer(&mut self, parent: NodeIndex, layer: Layer) -> NodeIndex {
        let id = layer.id;
        let idx = self.graph.add_node(layer);
        self.graph.add_edge(parent, idx, ());
        self.id_index.insert(id, idx);
        idx
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn index_of(&self, id: LayerId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Children in insertion order.
    ///
    /// Sorted by `NodeIndex` since petgraph iterates adjacency lists
    /// newest-first.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    pub fn child_ids(&self, id: LayerId) -> Vec<LayerId> {
        match self.index_of(id) {
            Some(idx) => self
                .children(idx)
                .into_iter()
                .map(|c| self.graph[c].id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// First descendant of `id` (depth-first, document order, the layer
    /// itself excluded) whose name equals `name` exactly.
    pub fn find_descendant_by_name(&self, id: LayerId, name: &str) -> Option<LayerId> {
        let start = self.index_of(id)?;
        let mut stack: Vec<NodeIndex> = self.children(start).into_iter().rev().collect();
        while let Some(idx) = stack.pop() {
            let layer = &self.graph[idx];
            if layer.name == name {
                return Some(layer.id);
            }
            stack.extend(self.children(idx).into_iter().rev());
        }
        None
    }

    /// Names from the outermost ancestor down to the layer itself.
    /// The page is not included.
    pub fn path_names(&self, id: LayerId) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = self.index_of(id);
        while let Some(idx) = current {
            let layer = &self.graph[idx];
            if matches!(layer.kind, LayerKind::Page) {
                break;
            }
            names.push(layer.name.clone());
            current = self.parent(idx);
        }
        names.reverse();
        names
    }

    /// Replace the selection. Ids that are not in the document are dropped.
    pub fn select(&mut self, ids: &[LayerId]) {
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| {
                let known = self.id_index.contains_key(id);
                if !known {
                    log::warn!("ignoring unknown layer {id} in selection");
                }
                known
            })
            .collect();
    }

    /// Register image bytes and return their hash. Identical bytes share a hash.
    pub fn add_image(&mut self, bytes: Vec<u8>) -> ImageHash {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        bytes.hash(&mut hasher);
        let hash = ImageHash(format!("{:016x}", hasher.finish()));
        self.images.entry(hash.clone()).or_insert(bytes);
        hash
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("Page 1")
    }
}
