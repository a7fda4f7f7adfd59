//! Glyph patcher
//!
//! Adds icon and symbol glyphs from donor fonts to a font source, scaling and
//! aligning them to the font's cell, and repairs the binary tables of the
//! compiled result.
pub mod binary;
pub mod core;
pub mod font_source;
pub mod geometry;
pub mod logging;
pub mod patch;
pub mod placement;
