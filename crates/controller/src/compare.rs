use std::sync::Arc;

use catalog::{CatalogError, LayerCatalog, LayerDescriptor, RenderMode};
use chrono::NaiveDate;
use layers::{
    LayerHandle, LiveLayer, MapSurface, RasterLayer, RenderedLayerSet, TileUrlBuilder,
    opacity_from_percent,
};
use tracing::debug;
use viewstate::ViewState;

/// Owns the layers attached to a map and the zoom cap they imply.
///
/// Every rebuild resolves all requested keys before touching the map, so an
/// unknown key leaves the previous generation attached and the view as it
/// was.
#[derive(Debug)]
pub struct CompareController {
    catalog: Arc<LayerCatalog>,
    tiles: TileUrlBuilder,
    rendered: Option<RenderedLayerSet>,
    cap: u8,
}

impl CompareController {
    pub fn new(catalog: Arc<LayerCatalog>, tiles: TileUrlBuilder) -> Self {
        let cap = catalog.cap_policy().fallback.max(1);
        Self {
            catalog,
            tiles,
            rendered: None,
            cap,
        }
    }

    /// Make the map show exactly what `view` describes.
    ///
    /// Covers all four transitions: single apply, compare rebuild, and the
    /// two mode switches. Tears down the previous set in full first. May
    /// lower `view.zoom` to the new cap.
    pub fn render<M: MapSurface>(
        &mut self,
        map: &mut M,
        view: &mut ViewState,
    ) -> Result<(), CatalogError> {
        let catalog = Arc::clone(&self.catalog);
        let base = catalog.resolve(&view.base_layer)?;
        let overlay = if view.compare_active {
            Some(catalog.resolve(&view.overlay_layer)?)
        } else {
            None
        };

        self.teardown(map);

        let bottom = self.attach(map, base, view.date, None);
        let next = match overlay {
            None => RenderedLayerSet::Single { layer: bottom },
            Some(overlay) => {
                let top = self.attach(map, overlay, view.date, Some(view.opacity_percent));
                RenderedLayerSet::Compare {
                    bottom,
                    top,
                    opacity_percent: view.opacity_percent,
                }
            }
        };
        debug!("rendered {:?} {:?}", next.mode(), next.keys());
        let rendered = self.rendered.insert(next);
        let mode = rendered.mode();
        let active: Vec<&LayerDescriptor> = rendered
            .keys()
            .into_iter()
            .filter_map(|key| catalog.resolve(key).ok())
            .collect();
        let cap = catalog.cap_policy().effective_cap(mode, &active);
        self.apply_cap(map, view, cap);
        Ok(())
    }

    pub fn enable<M: MapSurface>(
        &mut self,
        map: &mut M,
        view: &mut ViewState,
    ) -> Result<(), CatalogError> {
        self.switch(map, view, true)
    }

    pub fn disable<M: MapSurface>(
        &mut self,
        map: &mut M,
        view: &mut ViewState,
    ) -> Result<(), CatalogError> {
        self.switch(map, view, false)
    }

    fn switch<M: MapSurface>(
        &mut self,
        map: &mut M,
        view: &mut ViewState,
        compare: bool,
    ) -> Result<(), CatalogError> {
        let previous = view.compare_active;
        view.compare_active = compare;
        self.render(map, view).inspect_err(|_| view.compare_active = previous)
    }

    /// Update the live top layer in place. Outside compare mode only the
    /// stored value changes.
    pub fn set_opacity<M: MapSurface>(&mut self, map: &mut M, view: &mut ViewState, percent: u8) {
        let percent = percent.min(100);
        view.opacity_percent = percent;
        if let Some(RenderedLayerSet::Compare {
            top,
            opacity_percent,
            ..
        }) = &mut self.rendered
        {
            map.set_opacity(top.handle, opacity_from_percent(percent));
            *opacity_percent = percent;
        }
    }

    /// Maximum zoom currently allowed on the map.
    pub fn effective_cap(&self) -> u8 {
        self.cap
    }

    pub fn mode(&self) -> Option<RenderMode> {
        self.rendered.as_ref().map(RenderedLayerSet::mode)
    }

    pub fn rendered(&self) -> Option<&RenderedLayerSet> {
        self.rendered.as_ref()
    }

    pub fn active_handles(&self) -> Vec<LayerHandle> {
        self.rendered
            .as_ref()
            .map(RenderedLayerSet::handles)
            .unwrap_or_default()
    }

    pub fn tiles(&self) -> &TileUrlBuilder {
        &self.tiles
    }

    fn teardown<M: MapSurface>(&mut self, map: &mut M) {
        if let Some(previous) = self.rendered.take() {
            for handle in previous.handles() {
                map.detach(handle);
            }
        }
    }

    fn attach<M: MapSurface>(
        &self,
        map: &mut M,
        layer: &LayerDescriptor,
        date: NaiveDate,
        opacity_percent: Option<u8>,
    ) -> LiveLayer {
        let source = self.tiles.source(layer, date);
        let effective = source.date();
        let mut raster = RasterLayer::new(layer, source);
        if let Some(percent) = opacity_percent {
            raster = raster.with_opacity_percent(percent);
        }
        LiveLayer {
            handle: map.attach(raster),
            key: layer.id.clone(),
            max_zoom: layer.max_zoom,
            date: effective,
        }
    }

    fn apply_cap<M: MapSurface>(&mut self, map: &mut M, view: &mut ViewState, cap: u8) {
        self.cap = cap;
        map.set_max_zoom(cap);
        if view.zoom > cap {
            debug!("zoom {} above cap {cap}; clamping", view.zoom);
            view.zoom = cap;
            map.set_view(view.center, cap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::presets::{self, BLUE_MARBLE, MARS_CTX, MARS_MOLA, MODIS_TERRA_TRUE_COLOR};
    use foundation::date::FixedClock;
    use layers::HeadlessMap;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn setup(catalog: LayerCatalog) -> (CompareController, HeadlessMap, ViewState) {
        let view = ViewState::initial(&catalog, today());
        let map = HeadlessMap::new(view.center, view.zoom);
        let tiles = TileUrlBuilder::new(Arc::new(FixedClock(today())));
        (CompareController::new(Arc::new(catalog), tiles), map, view)
    }

    fn snapshot(map: &HeadlessMap) -> Vec<(String, NaiveDate, u32)> {
        map.attached()
            .map(|(_, l)| (l.key.clone(), l.source.date(), (l.opacity * 100.0).round() as u32))
            .collect()
    }

    #[test]
    fn enable_builds_bottom_and_top_with_opacity() {
        let (mut ctl, mut map, mut view) = setup(presets::earth());
        ctl.render(&mut map, &mut view).unwrap();
        ctl.enable(&mut map, &mut view).unwrap();

        assert_eq!(ctl.mode(), Some(RenderMode::Compare));
        assert_eq!(
            snapshot(&map),
            vec![
                (BLUE_MARBLE.to_string(), NaiveDate::from_ymd_opt(2004, 1, 1).unwrap(), 100),
                (MODIS_TERRA_TRUE_COLOR.to_string(), today(), 60),
            ]
        );
    }

    #[test]
    fn enable_then_disable_restores_single_render() {
        let (mut ctl, mut map, mut view) = setup(presets::earth());
        ctl.render(&mut map, &mut view).unwrap();
        let before = snapshot(&map);

        ctl.enable(&mut map, &mut view).unwrap();
        ctl.disable(&mut map, &mut view).unwrap();

        assert_eq!(snapshot(&map), before);
        assert_eq!(map.attached_count(), 1);
        assert_eq!(ctl.effective_cap(), 7);
        assert!(!view.compare_active);
    }

    #[test]
    fn compare_cap_pulls_zoom_down_immediately() {
        let (mut ctl, mut map, mut view) = setup(presets::mars());
        view.zoom = 12;
        ctl.render(&mut map, &mut view).unwrap();
        map.set_view(view.center, 12);
        assert_eq!(ctl.effective_cap(), 12);

        ctl.enable(&mut map, &mut view).unwrap();
        assert_eq!(ctl.effective_cap(), 7);
        assert_eq!(view.zoom, 7);
        assert_eq!(map.zoom(), 7);
        assert_eq!(map.max_zoom(), 7);

        ctl.disable(&mut map, &mut view).unwrap();
        assert_eq!(ctl.effective_cap(), 12);
        assert_eq!(view.zoom, 7);
    }

    #[test]
    fn unknown_key_leaves_render_untouched() {
        let (mut ctl, mut map, mut view) = setup(presets::mars());
        ctl.render(&mut map, &mut view).unwrap();
        let handles = ctl.active_handles();

        view.overlay_layer = "HiRISE".to_string();
        let err = ctl.enable(&mut map, &mut view).unwrap_err();
        assert_eq!(err, CatalogError::UnknownLayer("HiRISE".to_string()));
        assert!(!view.compare_active);
        assert_eq!(ctl.active_handles(), handles);
        assert_eq!(map.attach_count(), 1);
    }

    #[test]
    fn rebuild_detaches_previous_generation() {
        let (mut ctl, mut map, mut view) = setup(presets::mars());
        view.compare_active = true;
        ctl.render(&mut map, &mut view).unwrap();
        view.base_layer = MARS_MOLA.to_string();
        view.overlay_layer = MARS_CTX.to_string();
        ctl.render(&mut map, &mut view).unwrap();

        assert_eq!(map.attached_count(), 2);
        assert_eq!(map.attach_count(), 4);
        assert_eq!(ctl.rendered().map(|r| r.keys()), Some(vec![MARS_MOLA, MARS_CTX]));
    }

    #[test]
    fn opacity_updates_top_layer_in_place() {
        let (mut ctl, mut map, mut view) = setup(presets::earth());
        ctl.set_opacity(&mut map, &mut view, 30);
        assert_eq!(view.opacity_percent, 30);

        ctl.enable(&mut map, &mut view).unwrap();
        let attached = map.attach_count();
        ctl.set_opacity(&mut map, &mut view, 180);

        assert_eq!(view.opacity_percent, 100);
        assert_eq!(map.attach_count(), attached);
        let top = ctl.active_handles()[1];
        assert_eq!(map.layer(top).map(|l| l.opacity), Some(1.0));
    }
}
