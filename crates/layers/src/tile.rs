use std::sync::Arc;

use catalog::LayerDescriptor;
use chrono::NaiveDate;
use foundation::date::{Clock, clamp_to_today, format_date};

/// Tile address. `y` is the row and `x` the column, as in both WMTS
/// (`TileRow`/`TileCol`) and XYZ templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// A layer's URL template with the layer id, scheme and date already bound.
///
/// Only the tile placeholders remain; the map surface fills those per tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    template: String,
    date: NaiveDate,
}

impl TileSource {
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Date the imagery is actually requested for.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn url(&self, coord: TileCoord) -> String {
        let z = coord.z.to_string();
        let row = coord.y.to_string();
        let col = coord.x.to_string();
        self.template
            .replace("{TileMatrix}", &z)
            .replace("{TileRow}", &row)
            .replace("{TileCol}", &col)
            .replace("{z}", &z)
            .replace("{y}", &row)
            .replace("{x}", &col)
    }
}

/// Maps `(layer, date, tile)` to an imagery URL.
#[derive(Debug, Clone)]
pub struct TileUrlBuilder {
    clock: Arc<dyn Clock>,
}

impl TileUrlBuilder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Time-aware layers never ask for a day that has not happened yet;
    /// fixed layers ignore the requested date.
    pub fn effective_date(&self, layer: &LayerDescriptor, requested: NaiveDate) -> NaiveDate {
        let today = self.clock.today();
        if layer.time_aware {
            clamp_to_today(requested, today)
        } else {
            layer.fixed_date.unwrap_or(today)
        }
    }

    pub fn source(&self, layer: &LayerDescriptor, requested: NaiveDate) -> TileSource {
        let date = self.effective_date(layer, requested);
        let template = layer
            .url_template
            .replace("{layer}", &layer.tile_template_id)
            .replace("{scheme}", &layer.tile_scheme)
            .replace("{date}", &format_date(date));
        TileSource { template, date }
    }

    pub fn build_url(
        &self,
        layer: &LayerDescriptor,
        requested: NaiveDate,
        coord: TileCoord,
    ) -> String {
        self.source(layer, requested).url(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::presets::{self, BLUE_MARBLE, MARS_CTX, MARS_MOLA, VIIRS_TRUE_COLOR};
    use foundation::date::FixedClock;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn builder(today: NaiveDate) -> TileUrlBuilder {
        TileUrlBuilder::new(Arc::new(FixedClock(today)))
    }

    #[test]
    fn tomorrow_is_clamped_to_today() {
        let cat = presets::earth();
        let viirs = cat.resolve(VIIRS_TRUE_COLOR).unwrap();
        let today = d(2024, 3, 10);
        let url = builder(today).build_url(viirs, d(2024, 3, 11), TileCoord::new(3, 5, 2));
        assert_eq!(
            url,
            "https://gibs.earthdata.nasa.gov/wmts/epsg4326/best/VIIRS_SNPP_CorrectedReflectance_TrueColor/default/2024-03-10/250m/3/2/5.jpg"
        );
    }

    #[test]
    fn past_dates_pass_through() {
        let cat = presets::earth();
        let viirs = cat.resolve(VIIRS_TRUE_COLOR).unwrap();
        let src = builder(d(2024, 3, 10)).source(viirs, d(2023, 12, 31));
        assert_eq!(src.date(), d(2023, 12, 31));
        assert!(src.template().contains("/2023-12-31/"));
    }

    #[test]
    fn fixed_layers_ignore_requested_date() {
        let cat = presets::earth();
        let bm = cat.resolve(BLUE_MARBLE).unwrap();
        let url = builder(d(2024, 3, 10)).build_url(bm, d(2020, 1, 1), TileCoord::new(0, 0, 0));
        assert!(url.contains("/BlueMarble_NextGeneration/default/2004-01-01/500m/0/0/0.jpg"));
    }

    #[test]
    fn fixed_layer_without_date_uses_today() {
        let cat = presets::mars();
        let mola = cat.resolve(MARS_MOLA).unwrap();
        let b = builder(d(2024, 3, 10));
        assert_eq!(b.effective_date(mola, d(2001, 1, 1)), d(2024, 3, 10));
    }

    #[test]
    fn xyz_templates_substitute_zoom_row_col() {
        let cat = presets::mars();
        let ctx = cat.resolve(MARS_CTX).unwrap();
        let url =
            builder(d(2024, 3, 10)).build_url(ctx, d(2024, 3, 10), TileCoord::new(9, 100, 42));
        assert_eq!(
            url,
            "https://astro.arcgis.com/arcgis/rest/services/OnMars/CTX1/MapServer/tile/9/42/100?blankTile=false"
        );
    }
}
