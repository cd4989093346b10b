//! Query-string form of a [`ViewState`].
//!
//! Encoding is canonical: fixed key order, coordinates at 5 decimals,
//! `compare` always present, and `right`/`alpha` only while comparing.
//! Decoding never fails as a whole; each bad parameter is reported and the
//! field falls back to its default.

use std::fmt;

use catalog::{BaseParam, LayerCatalog, OverlayRule, UrlDialect};
use chrono::NaiveDate;
use foundation::date::{format_date, parse_date};
use foundation::geo::LatLon;
use url::form_urlencoded;

use crate::state::ViewState;

pub const PARAM_LAT: &str = "lat";
pub const PARAM_LON: &str = "lon";
pub const PARAM_ZOOM: &str = "z";
pub const PARAM_OVERLAY: &str = "right";
pub const PARAM_DATE: &str = "date";
pub const PARAM_COMPARE: &str = "compare";
pub const PARAM_ALPHA: &str = "alpha";

/// Center and zoom taken from a URL.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub center: LatLon,
    pub zoom: u8,
}

/// A query parameter that could not be honored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlStateError {
    Malformed { param: &'static str, value: String },
    UnknownLayer { param: &'static str, value: String },
}

impl fmt::Display for UrlStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlStateError::Malformed { param, value } => {
                write!(f, "malformed url parameter {param}={value:?}; using default")
            }
            UrlStateError::UnknownLayer { param, value } => {
                write!(f, "url parameter {param} names unknown layer {value:?}; using default")
            }
        }
    }
}

impl std::error::Error for UrlStateError {}

/// A decoded query string: only what the URL actually said.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UrlState {
    pub base_layer: Option<String>,
    pub overlay_layer: Option<String>,
    pub date: Option<NaiveDate>,
    pub compare: bool,
    pub opacity_percent: Option<u8>,
    /// Present only when `lat`, `lon` and `z` were all valid.
    pub camera: Option<Camera>,
    pub issues: Vec<UrlStateError>,
}

impl UrlState {
    pub fn base_or_default<'a>(&'a self, catalog: &'a LayerCatalog) -> &'a str {
        self.base_layer.as_deref().unwrap_or(&catalog.first().id)
    }

    /// Overlay to use for `base`, given the overlay the session already had.
    pub fn overlay_or_default(&self, catalog: &LayerCatalog, base: &str, previous: &str) -> String {
        if let Some(overlay) = &self.overlay_layer {
            return overlay.clone();
        }
        match catalog.overlay_rule() {
            OverlayRule::Complement => catalog.default_overlay_for(base).to_string(),
            OverlayRule::Selectable { .. } if catalog.contains(previous) => previous.to_string(),
            OverlayRule::Selectable { .. } => catalog.default_overlay_for(base).to_string(),
        }
    }

    /// Fold this URL over `previous`, field by field.
    ///
    /// This is the pure view of the result; a live session applies the same
    /// fields in stages so that zoom caps are in force before the camera.
    pub fn resolve(
        &self,
        previous: &ViewState,
        catalog: &LayerCatalog,
        today: NaiveDate,
    ) -> ViewState {
        let base = self.base_or_default(catalog).to_string();
        let overlay = self.overlay_or_default(catalog, &base, &previous.overlay_layer);
        let opacity_percent = match (self.compare, self.opacity_percent) {
            (true, Some(alpha)) => alpha,
            _ => previous.opacity_percent,
        };
        let (center, zoom) = match self.camera {
            Some(cam) => (cam.center, cam.zoom),
            None => (previous.center, previous.zoom),
        };
        ViewState {
            center,
            zoom,
            base_layer: base,
            overlay_layer: overlay,
            compare_active: self.compare,
            opacity_percent,
            date: self.date.unwrap_or(today),
        }
    }
}

pub fn encode(view: &ViewState, dialect: UrlDialect) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair(PARAM_LAT, &format!("{:.5}", view.center.lat));
    query.append_pair(PARAM_LON, &format!("{:.5}", view.center.lon));
    query.append_pair(PARAM_ZOOM, &view.zoom.to_string());
    query.append_pair(dialect.base_param.as_str(), &view.base_layer);
    if view.compare_active && dialect.emit_overlay {
        query.append_pair(PARAM_OVERLAY, &view.overlay_layer);
    }
    if dialect.emit_date {
        query.append_pair(PARAM_DATE, &format_date(view.date));
    }
    query.append_pair(PARAM_COMPARE, if view.compare_active { "1" } else { "0" });
    if view.compare_active {
        query.append_pair(PARAM_ALPHA, &view.opacity_percent.to_string());
    }
    query.finish()
}

pub fn decode(query: &str, catalog: &LayerCatalog) -> UrlState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.as_str())
    };

    let mut out = UrlState::default();
    let issues = &mut out.issues;

    let preferred = catalog.url_dialect().base_param;
    let other = match preferred {
        BaseParam::Left => BaseParam::Base,
        BaseParam::Base => BaseParam::Left,
    };
    out.base_layer = [preferred, other]
        .into_iter()
        .find_map(|p| get(p.as_str()).map(|v| (p.as_str(), v)))
        .and_then(|(param, value)| known_layer(catalog, param, value, issues));
    out.overlay_layer =
        get(PARAM_OVERLAY).and_then(|v| known_layer(catalog, PARAM_OVERLAY, v, issues));

    out.date = get(PARAM_DATE).and_then(|v| parsed(PARAM_DATE, v, parse_date, issues));

    out.compare = match get(PARAM_COMPARE) {
        None | Some("0") => false,
        Some("1") => true,
        Some(v) => {
            issues.push(malformed(PARAM_COMPARE, v));
            false
        }
    };

    out.opacity_percent = get(PARAM_ALPHA).and_then(|v| {
        parsed(PARAM_ALPHA, v, |s| s.trim().parse::<u8>().ok().filter(|a| *a <= 100), issues)
    });

    let lat = get(PARAM_LAT).and_then(|v| parsed(PARAM_LAT, v, |s| coordinate(s, 90.0), issues));
    let lon = get(PARAM_LON).and_then(|v| parsed(PARAM_LON, v, |s| coordinate(s, 180.0), issues));
    let zoom = get(PARAM_ZOOM)
        .and_then(|v| parsed(PARAM_ZOOM, v, |s| s.trim().parse::<u8>().ok(), issues));
    if let (Some(lat), Some(lon), Some(zoom)) = (lat, lon, zoom) {
        out.camera = Some(Camera {
            center: LatLon::new(lat, lon),
            zoom,
        });
    }

    out
}

fn malformed(param: &'static str, value: &str) -> UrlStateError {
    UrlStateError::Malformed {
        param,
        value: value.to_string(),
    }
}

fn parsed<T>(
    param: &'static str,
    value: &str,
    parse: impl FnOnce(&str) -> Option<T>,
    issues: &mut Vec<UrlStateError>,
) -> Option<T> {
    let out = parse(value);
    if out.is_none() {
        issues.push(malformed(param, value));
    }
    out
}

fn known_layer(
    catalog: &LayerCatalog,
    param: &'static str,
    value: &str,
    issues: &mut Vec<UrlStateError>,
) -> Option<String> {
    if catalog.contains(value) {
        return Some(value.to_string());
    }
    issues.push(UrlStateError::UnknownLayer {
        param,
        value: value.to_string(),
    });
    None
}

fn coordinate(raw: &str, limit: f64) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::presets::{
        self, BLUE_MARBLE, MARS_CTX, MARS_MOLA, MODIS_TERRA_TRUE_COLOR, VIIRS_TRUE_COLOR,
    };
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2024, 6, 15)
    }

    fn earth_view() -> ViewState {
        ViewState {
            center: LatLon::new(25.3, 51.5),
            zoom: 4,
            base_layer: VIIRS_TRUE_COLOR.to_string(),
            overlay_layer: BLUE_MARBLE.to_string(),
            compare_active: true,
            opacity_percent: 35,
            date: d(2024, 5, 1),
        }
    }

    #[test]
    fn encodes_in_canonical_order() {
        let cat = presets::earth();
        let view = earth_view();
        assert_eq!(
            encode(&view, cat.url_dialect()),
            "lat=25.30000&lon=51.50000&z=4&left=VIIRS+SNPP+True+Color+%28NRT%29\
             &right=Blue+Marble+%28500m%29&date=2024-05-01&compare=1&alpha=35"
        );
    }

    #[test]
    fn single_mode_omits_overlay_and_alpha() {
        let cat = presets::earth();
        let mut view = earth_view();
        view.compare_active = false;
        let q = encode(&view, cat.url_dialect());
        assert!(q.ends_with("&date=2024-05-01&compare=0"));
        assert!(!q.contains("right="));
        assert!(!q.contains("alpha="));
    }

    #[test]
    fn mars_dialect_uses_base_and_no_date() {
        let cat = presets::mars();
        let mut view = ViewState::initial(&cat, today());
        view.compare_active = true;
        assert_eq!(
            encode(&view, cat.url_dialect()),
            "lat=0.00000&lon=180.00000&z=2&base=CTX&compare=1&alpha=60"
        );
    }

    #[test]
    fn round_trip_reproduces_emitted_fields() {
        let cat = presets::earth();
        let previous = ViewState::initial(&cat, today());
        let mut views = vec![earth_view()];
        let mut single = earth_view();
        single.compare_active = false;
        views.push(single);
        let mut south_west = earth_view();
        south_west.center = LatLon::new(-89.12345, -179.99999);
        south_west.zoom = 0;
        south_west.opacity_percent = 0;
        views.push(south_west);

        for view in views {
            let back =
                decode(&encode(&view, cat.url_dialect()), &cat).resolve(&previous, &cat, today());
            assert_eq!(back.center, view.center);
            assert_eq!(back.zoom, view.zoom);
            assert_eq!(back.base_layer, view.base_layer);
            assert_eq!(back.compare_active, view.compare_active);
            assert_eq!(back.date, view.date);
            if view.compare_active {
                assert_eq!(back.overlay_layer, view.overlay_layer);
                assert_eq!(back.opacity_percent, view.opacity_percent);
            }
        }
    }

    #[test]
    fn encoding_is_stable_after_one_round_trip() {
        let cat = presets::earth();
        let mut view = earth_view();
        view.center = LatLon::new(12.3456789, -98.7654321);
        let once = encode(&view, cat.url_dialect());
        let again = encode(
            &decode(&once, &cat).resolve(&view, &cat, today()),
            cat.url_dialect(),
        );
        assert_eq!(once, again);
    }

    #[test]
    fn omitted_fields_fall_back() {
        let cat = presets::earth();
        let mut previous = ViewState::initial(&cat, d(2020, 1, 1));
        previous.center = LatLon::new(5.0, 6.0);
        previous.zoom = 3;
        previous.base_layer = VIIRS_TRUE_COLOR.to_string();

        let state = decode("", &cat);
        assert!(state.issues.is_empty());
        let view = state.resolve(&previous, &cat, today());
        assert_eq!(view.base_layer, BLUE_MARBLE);
        assert_eq!(view.overlay_layer, MODIS_TERRA_TRUE_COLOR);
        assert!(!view.compare_active);
        assert_eq!(view.center, LatLon::new(5.0, 6.0));
        assert_eq!(view.zoom, 3);
        assert_eq!(view.date, today());
    }

    #[test]
    fn malformed_parameters_are_reported_not_fatal() {
        let cat = presets::earth();
        let state = decode(
            "?lat=abc&lon=10&z=3&left=Nope&date=2024-13-40&compare=yes&alpha=140",
            &cat,
        );
        assert_eq!(state.base_layer, None);
        assert_eq!(state.date, None);
        assert!(!state.compare);
        assert_eq!(state.opacity_percent, None);
        assert_eq!(state.camera, None);
        assert_eq!(
            state.issues,
            vec![
                UrlStateError::UnknownLayer {
                    param: "left",
                    value: "Nope".to_string()
                },
                malformed(PARAM_DATE, "2024-13-40"),
                malformed(PARAM_COMPARE, "yes"),
                malformed(PARAM_ALPHA, "140"),
                malformed(PARAM_LAT, "abc"),
            ]
        );
    }

    #[test]
    fn camera_needs_all_three_parameters() {
        let cat = presets::earth();
        assert_eq!(decode("lat=1&lon=2", &cat).camera, None);
        assert_eq!(
            decode("lat=1&lon=2&z=5", &cat).camera,
            Some(Camera {
                center: LatLon::new(1.0, 2.0),
                zoom: 5
            })
        );
        assert!(!decode("lat=95&lon=2&z=5", &cat).issues.is_empty());
    }

    #[test]
    fn either_base_parameter_name_is_accepted() {
        let earth = presets::earth();
        let state = decode(&format!("base={}", "VIIRS+SNPP+True+Color+%28NRT%29"), &earth);
        assert_eq!(state.base_layer.as_deref(), Some(VIIRS_TRUE_COLOR));

        let mars = presets::mars();
        let state = decode("left=MOLA&compare=1", &mars);
        assert_eq!(state.base_layer.as_deref(), Some(MARS_MOLA));
        let view = state.resolve(&ViewState::initial(&mars, today()), &mars, today());
        assert_eq!(view.overlay_layer, MARS_CTX);
    }

    #[test]
    fn alpha_is_ignored_outside_compare() {
        let cat = presets::earth();
        let previous = ViewState::initial(&cat, today());
        let view = decode("compare=0&alpha=10", &cat).resolve(&previous, &cat, today());
        assert_eq!(view.opacity_percent, previous.opacity_percent);
    }
}
