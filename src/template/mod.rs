//! Template Module
//!
//! Typed template structures and the binding of episode uploads to
//! template segments.

mod binding;
mod schema;

pub use binding::{bind_segments, EpisodeAudioFile, ResolvedSegment};
pub use schema::{
    MusicTrack, MusicTrackSpec, Segment, SegmentFade, SegmentTiming, SegmentType, Template,
};
