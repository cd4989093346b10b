use std::collections::BTreeMap;

use chrono::NaiveDate;
use foundation::geo::LatLon;
use serde::{Deserialize, Serialize};

pub mod policy;
pub mod presets;

pub use policy::*;

/// One addressable raster imagery source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Catalog key; also what the shareable URL carries.
    pub id: String,
    /// Opaque provider layer id, substituted for `{layer}`.
    pub tile_template_id: String,
    /// Resolution/grid tag, substituted for `{scheme}`.
    pub tile_scheme: String,
    pub url_template: String,
    #[serde(default)]
    pub time_aware: bool,
    /// Date used for non-time-aware layers.
    #[serde(default)]
    pub fixed_date: Option<NaiveDate>,
    pub max_zoom: u8,
    #[serde(default)]
    pub attribution: String,
}

/// Camera a world opens on when the URL carries none.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeView {
    pub center: LatLon,
    pub zoom: u8,
}

/// How the compare overlay is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverlayRule {
    /// The user picks the overlay independently of the base.
    Selectable { default: String },
    /// The overlay is always the first entry that is not the base.
    Complement,
}

/// Name of the query parameter that carries the base layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseParam {
    Left,
    Base,
}

impl BaseParam {
    pub fn as_str(self) -> &'static str {
        match self {
            BaseParam::Left => "left",
            BaseParam::Base => "base",
        }
    }
}

/// Per-world shape of the shareable query string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlDialect {
    pub base_param: BaseParam,
    /// Emit `right` while comparing.
    pub emit_overlay: bool,
    pub emit_date: bool,
}

/// Serialized form of a catalog, as loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogData {
    pub world: String,
    pub home: HomeView,
    pub goto_zoom: u8,
    pub cap_policy: ZoomCapPolicy,
    pub overlay: OverlayRule,
    pub url: UrlDialect,
    pub layers: Vec<LayerDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnknownLayer(String),
    Invalid(String),
    Parse(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::UnknownLayer(key) => write!(f, "unknown layer: {key:?}"),
            CatalogError::Invalid(msg) => write!(f, "invalid catalog: {msg}"),
            CatalogError::Parse(msg) => write!(f, "catalog parse error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Validated, immutable registry of one world's imagery layers.
///
/// Entries keep declaration order; the first one is the default base layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCatalog {
    data: CatalogData,
    index: BTreeMap<String, usize>,
}

impl LayerCatalog {
    pub fn new(data: CatalogData) -> Result<Self, CatalogError> {
        if data.layers.is_empty() {
            return Err(CatalogError::Invalid(format!(
                "world {:?} has no layers",
                data.world
            )));
        }

        let mut index = BTreeMap::new();
        for (i, layer) in data.layers.iter().enumerate() {
            if layer.id.trim().is_empty() {
                return Err(CatalogError::Invalid(format!("layer #{i} has an empty id")));
            }
            if layer.max_zoom < 1 {
                return Err(CatalogError::Invalid(format!(
                    "layer {:?} has maxZoom < 1",
                    layer.id
                )));
            }
            if index.insert(layer.id.clone(), i).is_some() {
                return Err(CatalogError::Invalid(format!(
                    "duplicate layer id {:?}",
                    layer.id
                )));
            }
        }

        if let OverlayRule::Selectable { default } = &data.overlay {
            if !index.contains_key(default) {
                return Err(CatalogError::Invalid(format!(
                    "default overlay {default:?} is not a catalog layer"
                )));
            }
        }

        Ok(Self { data, index })
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let data: CatalogData =
            serde_json::from_str(raw).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(data)
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(&self.data).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn resolve(&self, key: &str) -> Result<&LayerDescriptor, CatalogError> {
        self.index
            .get(key)
            .map(|&i| &self.data.layers[i])
            .ok_or_else(|| CatalogError::UnknownLayer(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn first(&self) -> &LayerDescriptor {
        &self.data.layers[0]
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.data.layers
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.layers.iter().map(|l| l.id.as_str())
    }

    pub fn world(&self) -> &str {
        &self.data.world
    }

    pub fn home(&self) -> HomeView {
        self.data.home
    }

    pub fn goto_zoom(&self) -> u8 {
        self.data.goto_zoom
    }

    pub fn cap_policy(&self) -> &ZoomCapPolicy {
        &self.data.cap_policy
    }

    pub fn overlay_rule(&self) -> &OverlayRule {
        &self.data.overlay
    }

    pub fn url_dialect(&self) -> UrlDialect {
        self.data.url
    }

    pub fn has_time_aware_layers(&self) -> bool {
        self.data.layers.iter().any(|l| l.time_aware)
    }

    /// Overlay to pair with `base` when nothing else was chosen. A catalog
    /// with a single layer pairs it with itself.
    pub fn default_overlay_for<'a>(&'a self, base: &'a str) -> &'a str {
        if let OverlayRule::Selectable { default } = &self.data.overlay {
            return default;
        }
        self.keys().find(|k| *k != base).unwrap_or(base)
    }
}
