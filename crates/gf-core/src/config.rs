//! Engine configuration.
//!
//! Everything that differs between deployments (brand colors, endpoints,
//! storage namespace, timeouts) lives here and is handed to the engine at
//! construction. Loadable from JSON; every field has a default.

use crate::layout::ROW_TOLERANCE;
use crate::model::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default upstream GraphQL proxy.
pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://figma-plugin-poc.vercel.app/api/graphql";

/// Default image proxy.
pub const DEFAULT_IMAGE_PROXY: &str = "https://figma-plugin-poc.vercel.app/api/image-proxy";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Placeholder fill per brand. Keys are matched case-insensitively.
    pub brand_colors: BTreeMap<String, Color>,

    /// Placeholder fill for brands missing from `brand_colors`.
    pub placeholder_color: Color,

    /// Opacity of the placeholder drawn after a failed image load.
    /// A card with no image URL at all gets a full-opacity placeholder, so
    /// the two cases stay distinguishable on the canvas.
    pub placeholder_failure_opacity: f32,

    /// Prefix of persisted keys: `{namespace}:mappings:{brand}`.
    pub storage_namespace: String,

    /// Allow the name-based (`Title`/`Meta`/`Poster`) population path.
    pub legacy_name_lookup: bool,

    /// Vertical distance within which two cards share a row.
    pub row_tolerance: f32,

    pub graphql_endpoint: String,

    /// Images are fetched as `{image_proxy}?url=...`; direct when unset.
    pub image_proxy: Option<String>,

    pub query_timeout_secs: u64,

    pub page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let brand_colors = [
            ("DC", Color::rgb(0.0, 0.47, 0.95)),
            ("TCM", Color::rgb(0.85, 0.65, 0.13)),
            ("HBO", Color::rgb(0.53, 0.25, 0.85)),
            ("MAX", Color::rgb(0.0, 0.4, 1.0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            brand_colors,
            placeholder_color: Color::rgb(0.2, 0.2, 0.2),
            placeholder_failure_opacity: 0.3,
            storage_namespace: "gridfill".into(),
            legacy_name_lookup: true,
            row_tolerance: ROW_TOLERANCE,
            graphql_endpoint: DEFAULT_GRAPHQL_ENDPOINT.into(),
            image_proxy: Some(DEFAULT_IMAGE_PROXY.into()),
            query_timeout_secs: 12,
            page_size: 24,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config; omitted fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Invalid config: {e}"))
    }

    /// Placeholder color for `brand`, falling back to the neutral default.
    pub fn brand_color(&self, brand: &str) -> Color {
        self.brand_colors
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(brand))
            .map(|(_, color)| *color)
            .unwrap_or(self.placeholder_color)
    }
}
