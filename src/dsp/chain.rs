//! Transform chain
//!
//! Transforms run in insertion order (index 0 first). Each stage receives
//! the previous stage's output; the first error stops the chain.

use tracing::trace;

use super::{AudioBuffer, Transform};
use crate::error::Result;

/// Ordered list of transforms applied as one unit
#[derive(Default)]
pub struct TransformChain {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformChain {
    /// Create a new empty chain
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Append a transform to the end of the chain
    pub fn add(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Number of transforms in the chain
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Type identifiers of the transforms, in order
    pub fn transform_types(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.transform_type()).collect()
    }

    /// Run every transform in order and return the final buffer
    ///
    /// Identity stages are skipped. An empty chain returns a copy of the
    /// input.
    pub fn apply(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        let mut current = input.clone();
        for transform in &self.transforms {
            if transform.is_identity() {
                continue;
            }
            trace!(stage = transform.transform_type(), samples = current.len(), "applying transform");
            current = transform.apply(&current)?;
        }
        Ok(current)
    }
}
