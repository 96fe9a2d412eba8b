//! Template schema
//!
//! Typed form of the template structure stored with each podcast template.
//! Parsing and `validate()` together reject malformed templates before any
//! audio is touched.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{PodmixError, Result};

/// Role of a segment in the episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Intro,
    Content,
    Outro,
    Transition,
}

impl SegmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentType::Intro => "intro",
            SegmentType::Content => "content",
            SegmentType::Outro => "outro",
            SegmentType::Transition => "transition",
        }
    }
}

impl std::fmt::Display for SegmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seconds cut from the head and tail of the segment's clip
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentTiming {
    #[serde(deserialize_with = "seconds")]
    pub start_offset: f64,
    #[serde(deserialize_with = "seconds")]
    pub end_offset: f64,
}

/// Fade lengths applied to the trimmed clip, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentFade {
    #[serde(deserialize_with = "seconds")]
    pub fade_in: f64,
    #[serde(deserialize_with = "seconds")]
    pub fade_out: f64,
}

/// One block of spoken audio in the template
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    #[serde(default)]
    pub timing: SegmentTiming,
    #[serde(default)]
    pub fade: SegmentFade,
}

impl Segment {
    pub fn new(segment_type: SegmentType) -> Self {
        Self {
            segment_type,
            timing: SegmentTiming::default(),
            fade: SegmentFade::default(),
        }
    }

    pub fn with_timing(mut self, start_offset: f64, end_offset: f64) -> Self {
        self.timing = SegmentTiming {
            start_offset,
            end_offset,
        };
        self
    }

    pub fn with_fade(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade = SegmentFade { fade_in, fade_out };
        self
    }
}

/// Background track uploaded by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTrackSpec {
    #[serde(alias = "source_path")]
    pub file_path: PathBuf,
    /// Timeline position where the bed starts, in seconds
    #[serde(default, deserialize_with = "seconds")]
    pub start_point: f64,
    /// Unset fades fall back to the assembly config defaults
    #[serde(default, deserialize_with = "optional_seconds")]
    pub fade_in: Option<f64>,
    #[serde(default, deserialize_with = "optional_seconds")]
    pub fade_out: Option<f64>,
    /// Repeat the track when it is shorter than the program
    #[serde(rename = "loop", default = "default_loop")]
    pub looped: bool,
}

impl MusicTrackSpec {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            start_point: 0.0,
            fade_in: None,
            fade_out: None,
            looped: true,
        }
    }
}

/// Music configuration, tagged by `type`
///
/// Only uploaded tracks are mixed; any other kind is accepted and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MusicTrack {
    Upload(MusicTrackSpec),
    None,
    #[serde(other)]
    Other,
}

impl MusicTrack {
    /// The uploaded track, if this is one
    pub fn upload(&self) -> Option<&MusicTrackSpec> {
        match self {
            MusicTrack::Upload(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Segment order, timing and music for episodes built from a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub music_track: Option<MusicTrack>,
}

impl Template {
    /// Parse a template structure from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| PodmixError::InvalidTemplate {
            reason: e.to_string(),
        })?;
        Self::from_document(value)
    }

    /// Parse a bare template structure
    pub fn from_value(value: Value) -> Result<Self> {
        let template: Template =
            serde_json::from_value(value).map_err(|e| PodmixError::InvalidTemplate {
                reason: e.to_string(),
            })?;
        template.validate()?;
        Ok(template)
    }

    /// Parse a template from a JSON document
    ///
    /// Accepts the bare structure or a stored template that wraps it under
    /// `content` or `structure`.
    pub fn from_document(value: Value) -> Result<Self> {
        let structure = match value {
            Value::Object(mut map) if !map.contains_key("segments") => map
                .remove("content")
                .or_else(|| map.remove("structure"))
                .unwrap_or(Value::Object(map)),
            other => other,
        };

        Self::from_value(structure)
    }

    /// Check every numeric field is a finite, non-negative number of seconds
    pub fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(PodmixError::InvalidTemplate {
                reason: "template has no segments".to_string(),
            });
        }

        for (index, segment) in self.segments.iter().enumerate() {
            let fields = [
                ("timing.start_offset", segment.timing.start_offset),
                ("timing.end_offset", segment.timing.end_offset),
                ("fade.fade_in", segment.fade.fade_in),
                ("fade.fade_out", segment.fade.fade_out),
            ];
            for (name, secs) in fields {
                check_seconds(&format!("segments[{index}].{name}"), secs)?;
            }
        }

        if let Some(spec) = self.music_track.as_ref().and_then(MusicTrack::upload) {
            if spec.file_path.as_os_str().is_empty() {
                return Err(PodmixError::InvalidTemplate {
                    reason: "music_track.file_path is empty".to_string(),
                });
            }
            check_seconds("music_track.start_point", spec.start_point)?;
            for (name, secs) in [("fade_in", spec.fade_in), ("fade_out", spec.fade_out)] {
                if let Some(secs) = secs {
                    check_seconds(&format!("music_track.{name}"), secs)?;
                }
            }
        }

        Ok(())
    }

    /// The uploaded music track, if the template has one
    pub fn music_upload(&self) -> Option<&MusicTrackSpec> {
        self.music_track.as_ref().and_then(MusicTrack::upload)
    }
}

fn check_seconds(field: &str, secs: f64) -> Result<()> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(())
    } else {
        Err(PodmixError::InvalidTemplate {
            reason: format!("{field} must be a non-negative number of seconds, got {secs}"),
        })
    }
}

fn default_loop() -> bool {
    true
}

/// Seconds arrive as numbers or numeric strings from the web form
#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(f64),
    Text(String),
}

impl Seconds {
    fn into_secs<E: serde::de::Error>(self) -> std::result::Result<f64, E> {
        match self {
            Seconds::Number(secs) => Ok(secs),
            Seconds::Text(text) if text.trim().is_empty() => Ok(0.0),
            Seconds::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("'{text}' is not a number of seconds"))),
        }
    }
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    match Option::<Seconds>::deserialize(deserializer)? {
        Some(value) => value.into_secs(),
        None => Ok(0.0),
    }
}

fn optional_seconds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
    Option::<Seconds>::deserialize(deserializer)?
        .map(Seconds::into_secs)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_full_template() {
        let template = Template::from_document(json!({
            "segments": [
                {"type": "intro", "timing": {"start_offset": 0.5, "end_offset": 0}, "fade": {"fade_in": 1, "fade_out": 1}},
                {"type": "content"},
                {"type": "outro", "fade": {"fade_out": "2.5"}}
            ],
            "music_track": {"type": "upload", "file_path": "/uploads/bed.mp3", "start_point": 0}
        }))
        .unwrap();

        assert_eq!(template.segments.len(), 3);
        assert_eq!(
            template.segments[0],
            Segment::new(SegmentType::Intro).with_timing(0.5, 0.0).with_fade(1.0, 1.0)
        );
        assert_eq!(template.segments[1], Segment::new(SegmentType::Content));
        assert_eq!(template.segments[2].fade.fade_out, 2.5);

        let music = template.music_upload().unwrap();
        assert_eq!(music.file_path, PathBuf::from("/uploads/bed.mp3"));
        assert!(music.looped);
        assert_eq!(music.fade_in, None);
    }

    #[test]
    fn test_parse_wrapped_under_content() {
        let template = Template::from_document(json!({
            "name": "Weekly show",
            "content": {"segments": [{"type": "content"}]}
        }))
        .unwrap();
        assert_eq!(template.segments.len(), 1);
        assert!(template.music_track.is_none());
    }

    #[test]
    fn test_non_upload_music_is_ignored() {
        let template = Template::from_json_str(
            r#"{"segments": [{"type": "intro"}], "music_track": {"type": "library", "track_id": 7}}"#,
        )
        .unwrap();
        assert_eq!(template.music_track, Some(MusicTrack::Other));
        assert!(template.music_upload().is_none());

        let template =
            Template::from_json_str(r#"{"segments": [{"type": "intro"}], "music_track": {"type": "none"}}"#)
                .unwrap();
        assert_eq!(template.music_track, Some(MusicTrack::None));
    }

    #[test]
    fn test_source_path_alias_and_loop_flag() {
        let template = Template::from_document(json!({
            "segments": [{"type": "content"}],
            "music_track": {"type": "upload", "source_path": "bed.wav", "loop": false, "fade_in": 0}
        }))
        .unwrap();
        let music = template.music_upload().unwrap();
        assert_eq!(music.file_path, PathBuf::from("bed.wav"));
        assert!(!music.looped);
        assert_eq!(music.fade_in, Some(0.0));
    }

    #[test]
    fn test_rejects_unknown_segment_type() {
        let err = Template::from_document(json!({"segments": [{"type": "ad_break"}]})).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TEMPLATE");
    }

    #[test]
    fn test_rejects_negative_offset() {
        let err = Template::from_document(json!({
            "segments": [{"type": "intro", "timing": {"start_offset": -1}}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("segments[0].timing.start_offset"));
    }

    #[test]
    fn test_rejects_garbage_seconds() {
        let result = Template::from_document(json!({
            "segments": [{"type": "intro", "fade": {"fade_in": "soon"}}]
        }));
        assert!(matches!(result, Err(PodmixError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_rejects_upload_without_path() {
        let result = Template::from_document(json!({
            "segments": [{"type": "intro"}],
            "music_track": {"type": "upload", "start_point": 0}
        }));
        assert!(matches!(result, Err(PodmixError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_rejects_empty_template() {
        let result = Template::from_document(json!({"segments": []}));
        assert!(matches!(result, Err(PodmixError::InvalidTemplate { .. })));
    }
}
