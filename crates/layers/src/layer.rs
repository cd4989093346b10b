use catalog::RenderMode;
use chrono::NaiveDate;

/// Identifies a tile layer attached to a map surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerHandle(pub u64);

/// A layer that is currently attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveLayer {
    pub handle: LayerHandle,
    pub key: String,
    pub max_zoom: u8,
    /// Effective imagery date after clamping.
    pub date: NaiveDate,
}

/// One generation of attached layers.
///
/// A new set is only ever built after the previous one has been detached in
/// full, so the map never holds layers from two generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedLayerSet {
    Single {
        layer: LiveLayer,
    },
    Compare {
        bottom: LiveLayer,
        top: LiveLayer,
        opacity_percent: u8,
    },
}

impl RenderedLayerSet {
    pub fn mode(&self) -> RenderMode {
        match self {
            RenderedLayerSet::Single { .. } => RenderMode::Single,
            RenderedLayerSet::Compare { .. } => RenderMode::Compare,
        }
    }

    /// Bottom-to-top.
    pub fn layers(&self) -> Vec<&LiveLayer> {
        match self {
            RenderedLayerSet::Single { layer } => vec![layer],
            RenderedLayerSet::Compare { bottom, top, .. } => vec![bottom, top],
        }
    }

    pub fn handles(&self) -> Vec<LayerHandle> {
        self.layers().into_iter().map(|l| l.handle).collect()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.layers().into_iter().map(|l| l.key.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(handle: u64, key: &str) -> LiveLayer {
        LiveLayer {
            handle: LayerHandle(handle),
            key: key.to_string(),
            max_zoom: 8,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn compare_set_lists_bottom_then_top() {
        let set = RenderedLayerSet::Compare {
            bottom: live(3, "base"),
            top: live(4, "overlay"),
            opacity_percent: 60,
        };
        assert_eq!(set.mode(), RenderMode::Compare);
        assert_eq!(set.handles(), vec![LayerHandle(3), LayerHandle(4)]);
        assert_eq!(set.keys(), vec!["base", "overlay"]);
    }

    #[test]
    fn single_set_has_one_layer() {
        let set = RenderedLayerSet::Single { layer: live(1, "base") };
        assert_eq!(set.mode(), RenderMode::Single);
        assert_eq!(set.handles(), vec![LayerHandle(1)]);
    }
}
