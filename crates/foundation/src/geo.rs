use std::fmt;

use serde::{Deserialize, Serialize};

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Clamp latitude to the poles and wrap longitude into [-180, 180].
    pub fn normalized(self) -> Self {
        let lat = self.lat.clamp(-90.0, 90.0);
        let lon = if (-180.0..=180.0).contains(&self.lon) {
            self.lon
        } else {
            (self.lon + 180.0).rem_euclid(360.0) - 180.0
        };
        Self { lat, lon }
    }
}

/// Rejected "go to" input. The message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoError {
    pub input: String,
}

impl fmt::Display for GotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Enter as \"lat,lon\" within valid ranges")
    }
}

impl std::error::Error for GotoError {}

/// Parse "lat,lon", "lat lon" or "lat, lon" into a valid position.
pub fn parse_lat_lon(text: &str) -> Result<LatLon, GotoError> {
    let reject = || GotoError {
        input: text.to_string(),
    };

    let parts: Vec<&str> = text
        .split([',', ' '])
        .filter(|p| !p.is_empty())
        .collect();
    let [lat, lon] = parts.as_slice() else {
        return Err(reject());
    };

    let lat: f64 = lat.parse().map_err(|_| reject())?;
    let lon: f64 = lon.parse().map_err(|_| reject())?;
    let pos = LatLon::new(lat, lon);
    if !pos.is_valid() {
        return Err(reject());
    }
    Ok(pos)
}
