use serde::{Deserialize, Serialize};

pub const TITLE_MAX_CHARS: usize = 80;
pub const DESC_MAX_CHARS: usize = 500;
pub const DEFAULT_TITLE: &str = "Label";
pub const DEFAULT_WORLD: &str = "earth";

/// A stored label. `ts` is seconds since the Unix epoch, assigned by the
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    pub ts: i64,
}

/// A label as submitted, before the store caps and timestamps it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewLabel {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

impl NewLabel {
    pub fn new(lat: f64, lng: f64, title: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            title: Some(title.into()),
            desc: None,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn into_record(self, ts: i64) -> LabelRecord {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        LabelRecord {
            lat: finite_or_zero(self.lat),
            lng: finite_or_zero(self.lng),
            title: truncate_chars(&title, TITLE_MAX_CHARS),
            desc: truncate_chars(self.desc.as_deref().unwrap_or(""), DESC_MAX_CHARS),
            ts,
        }
    }
}

/// Body of an append request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendRequest {
    #[serde(default)]
    pub world: String,
    #[serde(flatten)]
    pub label: NewLabel,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendResponse {
    pub ok: bool,
    /// Labels stored for the world after the append.
    pub count: usize,
}

/// Reduce a world key to `[a-z0-9_-]`; empty results mean Earth.
pub fn sanitize_world(raw: &str) -> String {
    let safe: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if safe.is_empty() {
        DEFAULT_WORLD.to_string()
    } else {
        safe
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
