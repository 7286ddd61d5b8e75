use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Failed to read edit specification {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read edit specification from stdin: {0}")]
    Stdin(#[source] std::io::Error),
    #[error("Invalid edit specification: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Edit specification has an empty edit_name")]
    MissingName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutRequest {
    pub video_id: String,
    pub video_start_time: String,
    pub video_end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSpecification {
    pub edit_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(rename = "video_series_sequential", default)]
    pub cuts: Vec<CutRequest>,
}

impl EditSpecification {
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        let spec: Self = serde_json::from_str(json)?;
        spec.check()
    }

    pub fn from_file(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, SpecError> {
        let mut content = String::new();
        reader.read_to_string(&mut content).map_err(SpecError::Stdin)?;
        Self::from_json(&content)
    }

    fn check(self) -> Result<Self, SpecError> {
        if self.edit_name.trim().is_empty() {
            return Err(SpecError::MissingName);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "edit_name": "demo",
        "project_id": "612afec9-bcb2-47ca-807b-756d6e83b4b7",
        "resolution": "1080p",
        "video_series_sequential": [
            {"video_id": "abc", "video_start_time": "00:00:10", "video_end_time": "00:00:20"},
            {"video_id": "def", "video_start_time": "00:00:15.5", "video_end_time": "00:00:25"}
        ]
    }"#;

    #[test]
    fn parses_cut_list_in_order() {
        let spec = EditSpecification::from_json(SAMPLE).unwrap();
        assert_eq!(spec.edit_name, "demo");
        assert_eq!(spec.resolution.as_deref(), Some("1080p"));
        let ids: Vec<_> = spec.cuts.iter().map(|c| c.video_id.as_str()).collect();
        assert_eq!(ids, ["abc", "def"]);
        assert_eq!(spec.cuts[1].video_start_time, "00:00:15.5");
    }

    #[test]
    fn pass_through_fields_are_optional() {
        let spec = EditSpecification::from_json(r#"{"edit_name": "x", "video_series_sequential": []}"#).unwrap();
        assert!(spec.project_id.is_none());
        assert!(spec.cuts.is_empty());
    }

    #[test]
    fn reads_from_file_and_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let from_file = EditSpecification::from_file(&path).unwrap();
        let from_reader = EditSpecification::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(from_file, from_reader);
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(matches!(
            EditSpecification::from_json(r#"{"edit_name": "  ", "video_series_sequential": []}"#),
            Err(SpecError::MissingName)
        ));
        assert!(matches!(
            EditSpecification::from_json(r#"{"edit_name": "x", "video_series_sequential": [{"video_id": "a"}]}"#),
            Err(SpecError::Json(_))
        ));
        assert!(matches!(
            EditSpecification::from_file(Path::new("/definitely/not/here.json")),
            Err(SpecError::Read { .. })
        ));
    }
}
