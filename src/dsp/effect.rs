//! Transform trait definition
//!
//! Base trait for every buffer-to-buffer processing stage.

use crate::engine::AudioBuffer;
use crate::error::Result;

/// A processing stage that produces a new buffer from an input buffer
///
/// Transforms never modify their input. Stages that can reject a buffer
/// (a trim longer than the clip, for instance) report it through `Result`.
pub trait Transform: Send + Sync {
    /// Produce the transformed buffer
    fn apply(&self, input: &AudioBuffer) -> Result<AudioBuffer>;

    /// Get the transform type identifier
    fn transform_type(&self) -> &'static str;

    /// Whether applying this transform would return its input unchanged
    fn is_identity(&self) -> bool {
        false
    }
}
