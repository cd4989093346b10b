use catalog::{LayerCatalog, RenderMode};
use chrono::NaiveDate;
use foundation::geo::LatLon;
use serde::{Deserialize, Serialize};

/// Overlay opacity used until the user moves the slider.
pub const DEFAULT_OPACITY_PERCENT: u8 = 60;

/// Everything needed to reproduce a view.
///
/// The overlay key and opacity are kept while compare mode is off so that
/// re-enabling it restores the previous blend; they are simply not rendered
/// or serialized in the meantime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub center: LatLon,
    pub zoom: u8,
    pub base_layer: String,
    pub overlay_layer: String,
    pub compare_active: bool,
    pub opacity_percent: u8,
    pub date: NaiveDate,
}

impl ViewState {
    /// A fresh session on `catalog`'s home view, dated `today`.
    pub fn initial(catalog: &LayerCatalog, today: NaiveDate) -> Self {
        let home = catalog.home();
        let base = catalog.first().id.clone();
        let overlay = catalog.default_overlay_for(&base).to_string();
        Self {
            center: home.center,
            zoom: home.zoom,
            base_layer: base,
            overlay_layer: overlay,
            compare_active: false,
            opacity_percent: DEFAULT_OPACITY_PERCENT,
            date: today,
        }
    }

    pub fn mode(&self) -> RenderMode {
        if self.compare_active {
            RenderMode::Compare
        } else {
            RenderMode::Single
        }
    }

    /// Keys of the layers this view renders, bottom to top.
    pub fn active_keys(&self) -> Vec<&str> {
        if self.compare_active {
            vec![self.base_layer.as_str(), self.overlay_layer.as_str()]
        } else {
            vec![self.base_layer.as_str()]
        }
    }
}
