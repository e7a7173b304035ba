//! Project files: segment lists persisted as JSON next to the media file

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::model::Segment;
use crate::error::{SeamcutError, SeamcutResult};
use crate::segments::SegmentStore;

/// Current project file format version
pub const PROJECT_VERSION: u32 = 1;

/// One segment as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSegment {
    pub start: Option<f64>,
    pub end: Option<f64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// On-disk project document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: u32,
    #[serde(default)]
    pub media_file_name: Option<String>,
    pub cut_segments: Vec<ProjectSegment>,
}

impl ProjectFile {
    /// Capture the segments of a store
    pub fn from_store(store: &SegmentStore, media_file_name: Option<String>) -> Self {
        Self {
            version: PROJECT_VERSION,
            media_file_name,
            cut_segments: store
                .segments()
                .iter()
                .map(|s| ProjectSegment {
                    start: s.start,
                    end: s.end,
                    name: s.name.clone(),
                    tags: s.tags.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a segment store; fresh ids and colors are assigned by position
    pub fn into_store(self, duration: Option<f64>) -> SeamcutResult<SegmentStore> {
        let segments = self
            .cut_segments
            .into_iter()
            .enumerate()
            .map(|(i, s)| Segment {
                name: s.name,
                tags: s.tags,
                ..Segment::new(s.start, s.end, i as u32)
            })
            .collect();
        SegmentStore::from_segments(segments, duration)
    }

    /// Parse a project document
    pub fn parse(content: &str) -> SeamcutResult<Self> {
        let project: ProjectFile = serde_json::from_str(content)?;
        if project.version > PROJECT_VERSION {
            return Err(SeamcutError::Config {
                message: format!(
                    "project file version {} is newer than supported version {}",
                    project.version, PROJECT_VERSION
                ),
            });
        }
        Ok(project)
    }

    /// Load a project file from disk
    pub async fn load(path: &Path) -> SeamcutResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let project = Self::parse(&content)?;
        info!(
            "Loaded {} segment(s) from project {}",
            project.cut_segments.len(),
            path.display()
        );
        Ok(project)
    }

    /// Write the project file to disk
    pub async fn save(&self, path: &Path) -> SeamcutResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        info!("Saved project to {}", path.display());
        Ok(())
    }
}
