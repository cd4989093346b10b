use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::LabelError;
use crate::record::{LabelRecord, sanitize_world};

/// Pretty-printed JSON array, as offered for download.
pub fn snapshot_json(labels: &[LabelRecord]) -> Result<String, LabelError> {
    Ok(serde_json::to_string_pretty(labels)?)
}

/// `<world>-labels-<YYYY-MM-DD>.json`
pub fn snapshot_file_name(world: &str, date: NaiveDate) -> String {
    format!("{}-labels-{}.json", sanitize_world(world), date.format("%Y-%m-%d"))
}

/// Write a snapshot into `dir` and return its path.
pub async fn write_snapshot(
    dir: &Path,
    world: &str,
    date: NaiveDate,
    labels: &[LabelRecord],
) -> Result<PathBuf, LabelError> {
    let path = dir.join(snapshot_file_name(world, date));
    tokio::fs::write(&path, snapshot_json(labels)?).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NewLabel;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn file_name_uses_world_and_day() {
        assert_eq!(snapshot_file_name("Mars", date()), "mars-labels-2024-06-15.json");
    }

    #[test]
    fn snapshot_is_pretty_and_parses_back() {
        let labels = vec![NewLabel::new(1.5, -2.0, "Olympus").into_record(7)];
        let json = snapshot_json(&labels).unwrap();
        assert!(json.starts_with("[\n  {"));
        let back: Vec<LabelRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, labels);
    }

    #[test]
    fn empty_snapshot_is_an_empty_array() {
        assert_eq!(snapshot_json(&[]).unwrap(), "[]");
    }

    #[tokio::test]
    async fn writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(dir.path(), "earth", date(), &[]).await.unwrap();
        assert_eq!(path, dir.path().join("earth-labels-2024-06-15.json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[]");
    }
}
