//! Font source access
//!
//! The patcher never touches a font format directly. It works through the
//! [`FontEngine`] and [`GlyphHandle`] traits, which expose codepoint lookup,
//! glyph copy/paste, affine transforms, metric fields and feature data.
//! [`ufo::UfoFont`] implements them on top of `norad` and `kurbo`.

pub mod essential;
pub mod features;
pub mod metrics;
pub mod monospace;
pub mod outline;
pub mod ufo;

#[cfg(test)]
pub(crate) mod fixtures;
#[cfg(test)]
mod tests;

use crate::core::errors::PatchResult;
use kurbo::{Affine, Rect};
use regex::Regex;

pub use essential::EssentialSet;
pub use metrics::{MetricSource, MetricsNormalizer, NormalizedMetrics, VerticalMetrics};
pub use monospace::{Panose, PanoseMonospace};
pub use ufo::{UfoDonorLoader, UfoFont};

/// A single glyph owned by a font engine
pub trait GlyphHandle: Clone {
    fn name(&self) -> &str;

    /// Outline bounds, `None` for glyphs without any outline
    fn bounds(&self) -> Option<Rect>;

    fn advance(&self) -> f64;

    /// Set the advance width, leaving the outline where it is
    fn set_advance(&mut self, advance: f64);

    fn transform(&mut self, affine: Affine);

    fn round_coordinates(&mut self);

    fn translate(&mut self, dx: f64, dy: f64) {
        if dx != 0.0 || dy != 0.0 {
            self.transform(Affine::translate((dx, dy)));
        }
    }

    fn left_side_bearing(&self) -> f64 {
        self.bounds().map(|rect| rect.x0).unwrap_or(0.0)
    }

    fn right_side_bearing(&self) -> f64 {
        self.bounds()
            .map(|rect| self.advance() - rect.x1)
            .unwrap_or_else(|| self.advance())
    }

    /// Pull negative side bearings back to zero
    fn remove_negative_bearings(&mut self) {
        let lsb = self.left_side_bearing();
        if lsb < 0.0 {
            self.translate(-lsb, 0.0);
            self.set_advance(self.advance() - lsb);
        }
        let rsb = self.right_side_bearing();
        if rsb < 0.0 {
            self.set_advance(self.advance() - rsb);
        }
    }
}

/// Operations the patcher needs from a font
///
/// Codepoint lookups resolve both primary and alternate encodings of a
/// glyph, so `glyph(cp)` finds a glyph through any codepoint it carries.
pub trait FontEngine {
    type Glyph: GlyphHandle;

    fn units_per_em(&self) -> f64;

    /// Rescale the whole font to a new em size
    fn set_units_per_em(&mut self, units_per_em: f64);

    /// Typographic ascent above the baseline
    fn ascent(&self) -> f64;

    /// Typographic descent below the baseline, as a positive number
    fn descent(&self) -> f64;

    fn cap_height(&self) -> Option<f64>;

    fn vertical_metrics(&self) -> VerticalMetrics;

    fn set_vertical_metrics(&mut self, metrics: &VerticalMetrics);

    fn panose(&self) -> Panose;

    fn set_panose(&mut self, panose: Panose);

    /// All encoded codepoints, sorted
    fn codepoints(&self) -> Vec<u32>;

    fn contains(&self, codepoint: u32) -> bool {
        self.glyph(codepoint).is_some()
    }

    fn glyph(&self, codepoint: u32) -> Option<&Self::Glyph>;

    fn glyph_mut(&mut self, codepoint: u32) -> Option<&mut Self::Glyph>;

    /// Visit every glyph in the font, encoded or not
    fn for_each_glyph_mut(&mut self, visit: &mut dyn FnMut(&mut Self::Glyph));

    /// A self-contained copy of the glyph at `codepoint` with references
    /// decomposed into outlines
    fn copy_glyph(&self, codepoint: u32) -> Option<Self::Glyph>;

    /// Paste a copied glyph into the slot of `codepoint`, replacing any glyph
    /// already encoded there
    fn paste_glyph(&mut self, codepoint: u32, glyph: &Self::Glyph);

    /// Create an empty glyph encoded at `codepoint`
    fn create_glyph(&mut self, codepoint: u32);

    /// The glyph's main codepoint
    fn primary_codepoint(&self, codepoint: u32) -> Option<u32>;

    /// Additional codepoints of the glyph encoded at `codepoint`
    fn alternate_codepoints(&self, codepoint: u32) -> Vec<u32>;

    /// Leave `codepoint` encoding nothing but its own glyph, returning the
    /// encodings that were removed
    ///
    /// If `codepoint` is the glyph's main codepoint its aliases are dropped.
    /// If it is only an alias, just that alias is removed and the slot is
    /// left empty.
    fn clear_alternates(&mut self, codepoint: u32) -> Vec<u32>;

    /// Codepoints of the glyphs the glyph at `codepoint` references
    fn references(&self, codepoint: u32) -> Vec<u32>;

    /// Codepoints of glyphs linked to `codepoint` by a substitution or
    /// ligature rule, in either direction
    fn substitution_partners(&self, codepoint: u32) -> Vec<u32>;

    /// Remove every substitution rule mentioning the glyph at `codepoint`,
    /// returning how many rules went away
    fn remove_substitutions(&mut self, codepoint: u32) -> usize;

    /// Remove a named lookup and the statements referencing it
    fn remove_lookup(&mut self, name: &str) -> PatchResult<()>;

    /// Regenerate hinting for glyphs whose names match any pattern,
    /// returning how many glyphs were touched
    fn rehint(&mut self, patterns: &[Regex]) -> usize;
}

/// Opens donor fonts by file name
pub trait DonorLoader<E: FontEngine> {
    fn load(&mut self, file_name: &str) -> PatchResult<E>;
}

/// Encode a codepoint the way messages print it
pub fn format_codepoint(codepoint: u32) -> String {
    format!("U+{codepoint:04X}")
}
