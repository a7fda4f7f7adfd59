//! Geometric measurements used by glyph placement

pub mod dimensions;

// Re-export commonly used items
pub use dimensions::{CellDimensions, GlyphDimensions};
