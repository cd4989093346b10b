use std::collections::BTreeMap;

use foundation::geo::LatLon;
use tokio::sync::watch;
use tracing::debug;

use crate::layer::LayerHandle;
use crate::map::{MapSurface, PendingTiles};
use crate::raster::RasterLayer;

/// Zoom a map starts out allowing before any layer sets its own cap.
const DEFAULT_MAX_ZOOM: u8 = 18;

/// In-memory map surface with no rendering.
///
/// Used by command-line tools and tests. Each attached layer starts with a
/// configurable number of pending tiles that the owner completes explicitly.
#[derive(Debug)]
pub struct HeadlessMap {
    next_handle: u64,
    layers: BTreeMap<LayerHandle, RasterLayer>,
    center: LatLon,
    zoom: u8,
    max_zoom: u8,
    tiles_per_layer: usize,
    pending: watch::Sender<PendingTiles>,
    prefetched: Vec<String>,
    attach_count: usize,
}

impl HeadlessMap {
    pub fn new(center: LatLon, zoom: u8) -> Self {
        let (pending, _) = watch::channel(PendingTiles::new());
        Self {
            next_handle: 1,
            layers: BTreeMap::new(),
            center,
            zoom,
            max_zoom: DEFAULT_MAX_ZOOM,
            tiles_per_layer: 0,
            pending,
            prefetched: Vec::new(),
            attach_count: 0,
        }
    }

    /// Newly attached layers report `n` pending tiles until completed.
    pub fn with_pending_tiles(mut self, n: usize) -> Self {
        self.tiles_per_layer = n;
        self
    }

    pub fn layer(&self, handle: LayerHandle) -> Option<&RasterLayer> {
        self.layers.get(&handle)
    }

    /// Attached layers in attach order (bottom to top).
    pub fn attached(&self) -> impl Iterator<Item = (LayerHandle, &RasterLayer)> {
        self.layers.iter().map(|(h, l)| (*h, l))
    }

    pub fn attached_count(&self) -> usize {
        self.layers.len()
    }

    /// Total layers ever attached.
    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn prefetched(&self) -> &[String] {
        &self.prefetched
    }

    pub fn pending_for(&self, handle: LayerHandle) -> usize {
        self.pending.borrow().get(&handle).copied().unwrap_or(0)
    }

    /// Mark every tile of `handle` as loaded (or errored).
    pub fn finish_tiles(&mut self, handle: LayerHandle) {
        self.pending.send_modify(|p| {
            if let Some(n) = p.get_mut(&handle) {
                *n = 0;
            }
        });
    }

    pub fn finish_all_tiles(&mut self) {
        self.pending.send_modify(|p| p.values_mut().for_each(|n| *n = 0));
    }
}

impl MapSurface for HeadlessMap {
    fn attach(&mut self, layer: RasterLayer) -> LayerHandle {
        let handle = LayerHandle(self.next_handle);
        self.next_handle += 1;
        self.attach_count += 1;
        debug!("attach {handle:?} {} ({})", layer.key, layer.source.date());
        self.layers.insert(handle, layer);
        let tiles = self.tiles_per_layer;
        self.pending.send_modify(|p| {
            p.insert(handle, tiles);
        });
        handle
    }

    fn detach(&mut self, handle: LayerHandle) {
        if self.layers.remove(&handle).is_some() {
            debug!("detach {handle:?}");
        }
        self.pending.send_modify(|p| {
            p.remove(&handle);
        });
    }

    fn set_opacity(&mut self, handle: LayerHandle, opacity: f32) {
        if let Some(layer) = self.layers.get_mut(&handle) {
            layer.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    fn tile_activity(&self) -> watch::Receiver<PendingTiles> {
        self.pending.subscribe()
    }

    fn center(&self) -> LatLon {
        self.center
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn set_view(&mut self, center: LatLon, zoom: u8) {
        self.center = center;
        self.zoom = zoom.min(self.max_zoom);
    }

    fn set_max_zoom(&mut self, zoom: u8) {
        self.max_zoom = zoom;
        self.zoom = self.zoom.min(zoom);
    }

    fn prefetch(&mut self, url: &str) {
        self.prefetched.push(url.to_string());
    }
}
