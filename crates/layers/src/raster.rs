use catalog::LayerDescriptor;

use crate::tile::TileSource;

/// Everything a map surface needs to attach one tile layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub key: String,
    pub source: TileSource,
    pub max_zoom: u8,
    /// 0.0 (transparent) to 1.0 (opaque).
    pub opacity: f32,
    pub attribution: String,
}

impl RasterLayer {
    pub fn new(layer: &LayerDescriptor, source: TileSource) -> Self {
        Self {
            key: layer.id.clone(),
            source,
            max_zoom: layer.max_zoom,
            opacity: 1.0,
            attribution: layer.attribution.clone(),
        }
    }

    pub fn with_opacity_percent(mut self, percent: u8) -> Self {
        self.opacity = opacity_from_percent(percent);
        self
    }
}

pub fn opacity_from_percent(percent: u8) -> f32 {
    f32::from(percent.min(100)) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileUrlBuilder;
    use catalog::presets::{self, MARS_MOLA};
    use chrono::NaiveDate;
    use foundation::date::FixedClock;
    use std::sync::Arc;

    #[test]
    fn carries_descriptor_limits() {
        let cat = presets::mars();
        let mola = cat.resolve(MARS_MOLA).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tiles = TileUrlBuilder::new(Arc::new(FixedClock(today)));

        let layer = RasterLayer::new(mola, tiles.source(mola, today)).with_opacity_percent(60);
        assert_eq!(layer.key, MARS_MOLA);
        assert_eq!(layer.max_zoom, 7);
        assert!((layer.opacity - 0.6).abs() < 1e-6);
    }

    #[test]
    fn opacity_percent_saturates() {
        assert_eq!(opacity_from_percent(0), 0.0);
        assert_eq!(opacity_from_percent(100), 1.0);
        assert_eq!(opacity_from_percent(250), 1.0);
    }
}
