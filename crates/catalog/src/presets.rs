//! Built-in catalogs.

use chrono::NaiveDate;
use foundation::geo::LatLon;

use crate::{
    BaseParam, CatalogData, CompareCap, HomeView, LayerCatalog, LayerDescriptor, OverlayRule,
    UrlDialect, ZoomCapPolicy,
};

const GIBS_WMTS: &str = "https://gibs.earthdata.nasa.gov/wmts/epsg4326/best/{layer}/default/{date}/{scheme}/{TileMatrix}/{TileRow}/{TileCol}.jpg";
const TREK_WMTS: &str = "https://trek.nasa.gov/tiles/Mars/EQ/{layer}/1.0.0/default/{scheme}/{TileMatrix}/{TileRow}/{TileCol}.jpg";
const ARCGIS_XYZ: &str =
    "https://astro.arcgis.com/arcgis/rest/services/{layer}/MapServer/tile/{z}/{y}/{x}?blankTile=false";

pub const BLUE_MARBLE: &str = "Blue Marble (500m)";
pub const VIIRS_TRUE_COLOR: &str = "VIIRS SNPP True Color (NRT)";
pub const MODIS_TERRA_TRUE_COLOR: &str = "MODIS Terra True Color (Daily)";
pub const MARS_CTX: &str = "CTX";
pub const MARS_MOLA: &str = "MOLA";

/// Earth imagery from NASA GIBS (EPSG:4326).
pub fn earth() -> LayerCatalog {
    let gibs = |id: &str, provider: &str, scheme: &str, time_aware: bool, max_zoom: u8| {
        LayerDescriptor {
            id: id.to_string(),
            tile_template_id: provider.to_string(),
            tile_scheme: scheme.to_string(),
            url_template: GIBS_WMTS.to_string(),
            time_aware,
            fixed_date: None,
            max_zoom,
            attribution: "Imagery © NASA GIBS".to_string(),
        }
    };

    let mut blue_marble = gibs(BLUE_MARBLE, "BlueMarble_NextGeneration", "500m", false, 7);
    blue_marble.fixed_date = NaiveDate::from_ymd_opt(2004, 1, 1);

    let data = CatalogData {
        world: "earth".to_string(),
        home: HomeView {
            center: LatLon::new(0.0, 0.0),
            zoom: 2,
        },
        goto_zoom: 5,
        cap_policy: ZoomCapPolicy {
            compare: CompareCap::MaxOfActive,
            fallback: 8,
        },
        overlay: OverlayRule::Selectable {
            default: MODIS_TERRA_TRUE_COLOR.to_string(),
        },
        url: UrlDialect {
            base_param: BaseParam::Left,
            emit_overlay: true,
            emit_date: true,
        },
        layers: vec![
            blue_marble,
            gibs(
                VIIRS_TRUE_COLOR,
                "VIIRS_SNPP_CorrectedReflectance_TrueColor",
                "250m",
                true,
                8,
            ),
            gibs(
                MODIS_TERRA_TRUE_COLOR,
                "MODIS_Terra_CorrectedReflectance_TrueColor",
                "250m",
                true,
                8,
            ),
        ],
    };
    LayerCatalog::new(data).expect("earth preset is valid")
}

/// Mars global mosaics. CTX resolves far deeper than MOLA, so blending the
/// two is capped at MOLA's native zoom.
pub fn mars() -> LayerCatalog {
    let data = CatalogData {
        world: "mars".to_string(),
        home: HomeView {
            center: LatLon::new(0.0, 180.0),
            zoom: 2,
        },
        goto_zoom: 6,
        cap_policy: ZoomCapPolicy {
            compare: CompareCap::Fixed { zoom: 7 },
            fallback: 12,
        },
        overlay: OverlayRule::Complement,
        url: UrlDialect {
            base_param: BaseParam::Base,
            emit_overlay: false,
            emit_date: false,
        },
        layers: vec![
            LayerDescriptor {
                id: MARS_CTX.to_string(),
                tile_template_id: "OnMars/CTX1".to_string(),
                tile_scheme: "xyz".to_string(),
                url_template: ARCGIS_XYZ.to_string(),
                time_aware: false,
                fixed_date: None,
                max_zoom: 12,
                attribution: "CTX © Esri/USGS/NASA".to_string(),
            },
            LayerDescriptor {
                id: MARS_MOLA.to_string(),
                tile_template_id: "Mars_MGS_MOLA_ClrShade_merge_global_463m".to_string(),
                tile_scheme: "default028mm".to_string(),
                url_template: TREK_WMTS.to_string(),
                time_aware: false,
                fixed_date: None,
                max_zoom: 7,
                attribution: "MOLA Shaded Relief © NASA/JPL/USGS (Trek)".to_string(),
            },
        ],
    };
    LayerCatalog::new(data).expect("mars preset is valid")
}

/// Look up a built-in catalog by world key.
pub fn by_world(world: &str) -> Option<LayerCatalog> {
    match world.to_ascii_lowercase().as_str() {
        "earth" => Some(earth()),
        "mars" => Some(mars()),
        _ => None,
    }
}
