use serde::{Deserialize, Serialize};

use crate::LayerDescriptor;

/// Which rendering arrangement is live on the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderMode {
    Single,
    Compare,
}

/// Cap rule applied while two layers are blended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum CompareCap {
    /// Deepest native zoom of either layer; the shallower one upsamples.
    MaxOfActive,
    /// Shallowest native zoom, so neither layer is ever upsampled.
    MinOfActive,
    /// Conservative fixed cap for layers whose resolutions differ sharply.
    Fixed { zoom: u8 },
}

/// Data-driven effective max zoom for a catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomCapPolicy {
    pub compare: CompareCap,
    /// Cap used while no layer is attached.
    pub fallback: u8,
}

impl Default for ZoomCapPolicy {
    fn default() -> Self {
        Self {
            compare: CompareCap::MaxOfActive,
            fallback: 8,
        }
    }
}

impl ZoomCapPolicy {
    /// Maximum permissible zoom for `mode` given the layers currently active.
    ///
    /// Never returns less than 1.
    pub fn effective_cap(&self, mode: RenderMode, active: &[&LayerDescriptor]) -> u8 {
        let zooms = active.iter().map(|l| l.max_zoom);
        let cap = match mode {
            RenderMode::Single => zooms.max(),
            RenderMode::Compare => match self.compare {
                CompareCap::MaxOfActive => zooms.max(),
                CompareCap::MinOfActive => zooms.min(),
                CompareCap::Fixed { zoom } => Some(zoom),
            },
        };
        cap.unwrap_or(self.fallback).max(1)
    }
}
