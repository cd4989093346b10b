use std::fmt;
use std::sync::Arc;

use catalog::{CatalogError, LayerCatalog, OverlayRule, RenderMode};
use chrono::NaiveDate;
use foundation::date::{Clock, format_date};
use foundation::geo::{GotoError, LatLon, parse_lat_lon};
use layers::{LayerHandle, MapSurface, RenderedLayerSet, TileCoord, TileUrlBuilder};
use runtime::{EventBus, EventKind};
use tracing::{debug, info, warn};
use viewstate::{UrlStateError, ViewState, decode, encode};

use crate::compare::CompareController;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Catalog(CatalogError),
    Goto(GotoError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Catalog(err) => write!(f, "{err}"),
            SessionError::Goto(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Catalog(err) => Some(err),
            SessionError::Goto(err) => Some(err),
        }
    }
}

impl From<CatalogError> for SessionError {
    fn from(err: CatalogError) -> Self {
        SessionError::Catalog(err)
    }
}

impl From<GotoError> for SessionError {
    fn from(err: GotoError) -> Self {
        SessionError::Goto(err)
    }
}

/// One explorer page: the view state, the map it drives, and the address
/// bar it mirrors into.
///
/// All mutations go through here. Each one finishes rebuilding the attached
/// layers before the URL is rewritten, and a rejected mutation leaves the
/// view, the map and the URL exactly as they were.
#[derive(Debug)]
pub struct Session<M: MapSurface> {
    catalog: Arc<LayerCatalog>,
    clock: Arc<dyn Clock>,
    map: M,
    view: ViewState,
    compare: CompareController,
    address: Option<String>,
    events: EventBus,
    initialized: bool,
}

impl<M: MapSurface> Session<M> {
    pub fn new(catalog: Arc<LayerCatalog>, clock: Arc<dyn Clock>, mut map: M) -> Self {
        let view = ViewState::initial(&catalog, clock.today());
        map.set_view(view.center, view.zoom);
        let compare = CompareController::new(
            Arc::clone(&catalog),
            TileUrlBuilder::new(Arc::clone(&clock)),
        );
        Self {
            catalog,
            clock,
            map,
            view,
            compare,
            address: None,
            events: EventBus::new(),
            initialized: false,
        }
    }

    /// Apply an incoming query string and start writing the URL.
    ///
    /// Fields are applied in a fixed order: layers and date, then compare
    /// mode, then opacity, then the camera, so the camera lands under the
    /// zoom cap of the final layer set. Parameters that could not be used
    /// are returned; none of them abort startup.
    pub fn start(&mut self, query: &str) -> Result<Vec<UrlStateError>, SessionError> {
        let url = decode(query, &self.catalog);
        for issue in &url.issues {
            warn!("{issue}");
        }

        let base = url.base_or_default(&self.catalog).to_string();
        self.view.overlay_layer =
            url.overlay_or_default(&self.catalog, &base, &self.view.overlay_layer);
        self.view.base_layer = base;
        self.view.date = url.date.unwrap_or_else(|| self.clock.today());
        self.view.compare_active = url.compare;
        self.render()?;

        if url.compare {
            if let Some(alpha) = url.opacity_percent {
                self.compare.set_opacity(&mut self.map, &mut self.view, alpha);
            }
        }

        if let Some(camera) = url.camera {
            self.move_camera(camera.center, camera.zoom);
        } else {
            self.move_camera(self.view.center, self.view.zoom);
        }

        self.initialized = true;
        info!("session started on {} ({:?})", self.catalog.world(), self.compare.mode());
        self.write_url();
        Ok(url.issues)
    }

    /// Switch the base layer. Under a complementary overlay rule the overlay
    /// follows.
    pub fn set_base_layer(&mut self, key: &str) -> Result<(), SessionError> {
        let overlay = match self.catalog.overlay_rule() {
            OverlayRule::Complement => Some(self.catalog.default_overlay_for(key).to_string()),
            OverlayRule::Selectable { .. } => None,
        };
        self.transition(|view| {
            view.base_layer = key.to_string();
            if let Some(overlay) = overlay {
                view.overlay_layer = overlay;
            }
        })
    }

    pub fn set_overlay_layer(&mut self, key: &str) -> Result<(), SessionError> {
        self.transition(|view| view.overlay_layer = key.to_string())
    }

    /// Show imagery for `date`. Frames and manual edits both land here.
    pub fn set_date(&mut self, date: NaiveDate) -> Result<(), SessionError> {
        self.transition(|view| view.date = date)?;
        self.events.emit(EventKind::Frame, format_date(date));
        Ok(())
    }

    pub fn set_compare(&mut self, active: bool) -> Result<(), SessionError> {
        if self.view.compare_active == active && self.compare.rendered().is_some() {
            return Ok(());
        }
        self.transition(|view| view.compare_active = active)?;
        self.events.emit(EventKind::Mode, format!("{:?}", self.view.mode()));
        Ok(())
    }

    pub fn toggle_compare(&mut self) -> Result<(), SessionError> {
        self.set_compare(!self.view.compare_active)
    }

    pub fn set_opacity(&mut self, percent: u8) {
        self.compare.set_opacity(&mut self.map, &mut self.view, percent);
        self.write_url();
    }

    /// The host reports that the user panned or zoomed.
    pub fn on_view_changed(&mut self, center: LatLon, zoom: u8) {
        self.move_camera(center, zoom);
        self.write_url();
    }

    /// Fly to typed coordinates. Bad input changes nothing.
    pub fn goto(&mut self, text: &str) -> Result<LatLon, SessionError> {
        let target = parse_lat_lon(text)?;
        self.move_camera(target, self.catalog.goto_zoom());
        self.write_url();
        Ok(target)
    }

    /// Warm the tile cache for `date` at the current zoom.
    pub fn prefetch_frame(&mut self, date: NaiveDate) {
        let coord = TileCoord::new(self.view.zoom, 0, 0);
        for key in self.view.active_keys() {
            match self.catalog.resolve(key) {
                Ok(layer) => {
                    let url = self.compare.tiles().build_url(layer, date, coord);
                    self.map.prefetch(&url);
                }
                Err(err) => debug!("skip prefetch: {err}"),
            }
        }
    }

    /// Canonical query string for the current view.
    pub fn query(&self) -> String {
        encode(&self.view, self.catalog.url_dialect())
    }

    pub fn share_url(&self, path: &str) -> String {
        format!("{path}?{}", self.query())
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn catalog(&self) -> &LayerCatalog {
        &self.catalog
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn rendered(&self) -> Option<&RenderedLayerSet> {
        self.compare.rendered()
    }

    pub fn mode(&self) -> RenderMode {
        self.view.mode()
    }

    pub fn active_handles(&self) -> Vec<LayerHandle> {
        self.compare.active_handles()
    }

    pub fn effective_cap(&self) -> u8 {
        self.compare.effective_cap()
    }

    /// Last query written to the address bar.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    fn transition(&mut self, edit: impl FnOnce(&mut ViewState)) -> Result<(), SessionError> {
        let previous = self.view.clone();
        edit(&mut self.view);
        if let Err(err) = self.render() {
            warn!("rejected view change: {err}");
            self.view = previous;
            return Err(err.into());
        }
        self.write_url();
        Ok(())
    }

    fn render(&mut self) -> Result<(), CatalogError> {
        self.compare.render(&mut self.map, &mut self.view)?;
        let keys = self
            .compare
            .rendered()
            .map(|r| r.keys().join(" + "))
            .unwrap_or_default();
        self.events.emit(
            EventKind::Layers,
            format!(
                "{keys} @ {} (cap {})",
                format_date(self.view.date),
                self.compare.effective_cap()
            ),
        );
        Ok(())
    }

    fn move_camera(&mut self, center: LatLon, zoom: u8) {
        let center = center.normalized();
        let zoom = zoom.min(self.compare.effective_cap());
        self.view.center = center;
        self.view.zoom = zoom;
        if self.map.center() != center || self.map.zoom() != zoom {
            self.map.set_view(center, zoom);
        }
        self.events.emit(
            EventKind::Camera,
            format!("{:.5},{:.5} z{zoom}", center.lat, center.lon),
        );
    }

    fn write_url(&mut self) {
        if !self.initialized {
            return;
        }
        let query = self.query();
        debug!("url {query}");
        self.events.emit(EventKind::Url, query.clone());
        self.address = Some(query);
    }
}
