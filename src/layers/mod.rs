//! Layer Model Module
//!
//! Positioned clips and the mixer that composites them:
//! - `Layer`: a buffer (or file) placed on the timeline with gain and fades
//! - `LayerMixer`: additive overlay of any number of layers

mod layer;
mod mixer;

pub use layer::{Layer, LayerSource};
pub use mixer::{LayerMixer, Mixdown};
