//! Episode binding
//!
//! Pairs each template segment with the episode upload recorded for that
//! segment type. The caller has already resolved upload IDs to local paths
//! and checked ownership.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::schema::{Segment, SegmentType, Template};

/// An uploaded episode file tagged with the segment it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeAudioFile {
    #[serde(default)]
    pub segment_type: Option<SegmentType>,
    pub file_path: PathBuf,
}

impl EpisodeAudioFile {
    pub fn new(segment_type: SegmentType, file_path: impl Into<PathBuf>) -> Self {
        Self {
            segment_type: Some(segment_type),
            file_path: file_path.into(),
        }
    }
}

/// A template segment with the audio file it will be built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSegment {
    pub segment: Segment,
    pub audio_path: PathBuf,
}

impl ResolvedSegment {
    pub fn new(segment: Segment, audio_path: impl Into<PathBuf>) -> Self {
        Self {
            segment,
            audio_path: audio_path.into(),
        }
    }
}

/// Bind template segments to episode files, in template order
///
/// Each segment takes the first file whose segment type matches. Segments
/// with no matching upload are left out; the same file may serve several
/// segments of the same type.
pub fn bind_segments(template: &Template, files: &[EpisodeAudioFile]) -> Vec<ResolvedSegment> {
    template
        .segments
        .iter()
        .filter_map(|segment| {
            let file = files
                .iter()
                .find(|file| file.segment_type == Some(segment.segment_type));
            if file.is_none() {
                debug!(segment_type = %segment.segment_type, "no episode audio for segment");
            }
            file.map(|file| ResolvedSegment::new(*segment, file.file_path.clone()))
        })
        .collect()
}
