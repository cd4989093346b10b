use std::collections::BTreeMap;

use foundation::geo::LatLon;
use tokio::sync::watch;

use crate::layer::LayerHandle;
use crate::raster::RasterLayer;

/// Outstanding tile requests per attached layer. Layers that are absent
/// have nothing pending.
pub type PendingTiles = BTreeMap<LayerHandle, usize>;

/// The external map-rendering library, seen through the narrow interface the
/// view controller needs.
///
/// Tile fetching and drawing stay behind this trait. The "view changed"
/// signal travels the other way: the host forwards it to the session.
pub trait MapSurface {
    fn attach(&mut self, layer: RasterLayer) -> LayerHandle;

    /// Detaching an unknown handle is a no-op.
    fn detach(&mut self, handle: LayerHandle);

    fn set_opacity(&mut self, handle: LayerHandle, opacity: f32);

    /// Subscribe to pending-tile counts; the sender publishes on every change.
    fn tile_activity(&self) -> watch::Receiver<PendingTiles>;

    fn center(&self) -> LatLon;

    fn zoom(&self) -> u8;

    fn set_view(&mut self, center: LatLon, zoom: u8);

    fn set_max_zoom(&mut self, zoom: u8);

    /// Fire-and-forget warm-up request for one tile URL.
    fn prefetch(&mut self, url: &str);
}

/// True when none of `handles` has tiles outstanding.
pub fn all_settled(pending: &PendingTiles, handles: &[LayerHandle]) -> bool {
    handles
        .iter()
        .all(|h| pending.get(h).copied().unwrap_or(0) == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_layers_count_as_settled() {
        let mut pending = PendingTiles::new();
        pending.insert(LayerHandle(1), 0);
        pending.insert(LayerHandle(2), 3);
        assert!(all_settled(&pending, &[LayerHandle(1), LayerHandle(9)]));
        assert!(!all_settled(&pending, &[LayerHandle(1), LayerHandle(2)]));
        assert!(all_settled(&pending, &[]));
    }
}
