//! Per-glyph placement attributes
//!
//! Each patch range carries a default attribute and per-codepoint
//! overrides. Lookups fall back to the default.

use crate::placement::stretch::Stretch;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Center,
    /// Keep the glyph's own vertical position
    None,
}

/// Optional per-glyph parameters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphParams {
    /// Fraction of the cell width the glyph may extend into its neighbours
    pub overlap: Option<f64>,
    /// Upper bound of the width to height ratio after scaling
    pub xy_ratio: Option<f64>,
    /// Overrides the run-wide careful setting for this glyph
    pub careful: Option<bool>,
    /// Rescale the glyph already in the font instead of copying a donor
    pub dont_copy: bool,
    /// Fraction of the cell height kept free
    pub y_padding: Option<f64>,
}

impl GlyphParams {
    /// Overlap as a real value, zero counts as absent
    pub fn effective_overlap(&self) -> Option<f64> {
        self.overlap.filter(|overlap| *overlap != 0.0)
    }

    pub fn effective_y_padding(&self) -> Option<f64> {
        self.y_padding.filter(|padding| *padding != 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphAttribute {
    pub align: HAlign,
    pub valign: VAlign,
    pub stretch: Stretch,
    pub params: GlyphParams,
}

impl GlyphAttribute {
    pub fn new(align: HAlign, valign: VAlign, stretch: &str) -> Self {
        Self {
            align,
            valign,
            stretch: Stretch::parse(stretch),
            params: GlyphParams::default(),
        }
    }

    /// Centered both ways
    pub fn centered(stretch: &str) -> Self {
        Self::new(HAlign::Center, VAlign::Center, stretch)
    }

    pub fn overlap(mut self, overlap: f64) -> Self {
        self.params.overlap = Some(overlap);
        self
    }

    pub fn xy_ratio(mut self, ratio: f64) -> Self {
        self.params.xy_ratio = Some(ratio);
        self
    }

    pub fn careful(mut self, careful: bool) -> Self {
        self.params.careful = Some(careful);
        self
    }

    pub fn y_padding(mut self, padding: f64) -> Self {
        self.params.y_padding = Some(padding);
        self
    }

    pub fn dont_copy(mut self, dont_copy: bool) -> Self {
        self.params.dont_copy = dont_copy;
        self
    }
}

/// Default attribute plus per-codepoint overrides
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeTable {
    default: GlyphAttribute,
    overrides: BTreeMap<u32, GlyphAttribute>,
}

impl AttributeTable {
    pub fn new(default: GlyphAttribute) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with(mut self, codepoint: u32, attribute: GlyphAttribute) -> Self {
        self.overrides.insert(codepoint, attribute);
        self
    }

    /// Apply one attribute to a whole codepoint range
    pub fn with_range(
        mut self,
        codepoints: std::ops::RangeInclusive<u32>,
        attribute: GlyphAttribute,
    ) -> Self {
        for codepoint in codepoints {
            self.overrides.insert(codepoint, attribute);
        }
        self
    }

    pub fn default_attribute(&self) -> &GlyphAttribute {
        &self.default
    }

    pub fn resolve(&self, codepoint: u32) -> &GlyphAttribute {
        self.overrides.get(&codepoint).unwrap_or(&self.default)
    }

    pub fn overrides(&self) -> impl Iterator<Item = (u32, &GlyphAttribute)> {
        self.overrides.iter().map(|(cp, attr)| (*cp, attr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_default() {
        let table = AttributeTable::new(GlyphAttribute::centered("pa"))
            .with(0xE0B0, GlyphAttribute::new(HAlign::Left, VAlign::Center, "^xy").overlap(0.02));

        let special = table.resolve(0xE0B0);
        assert_eq!(special.align, HAlign::Left);
        assert_eq!(special.params.overlap, Some(0.02));
        assert!(special.stretch.full_height);

        let other = table.resolve(0xE0B1);
        assert_eq!(other.align, HAlign::Center);
        assert!(other.stretch.preserve_aspect);
    }

    #[test]
    fn ranges_expand_to_every_codepoint() {
        let table = AttributeTable::default()
            .with_range(0x2500..=0x2502, GlyphAttribute::centered("^xy"));
        assert_eq!(table.overrides().count(), 3);
        assert!(table.resolve(0x2501).stretch.scale_x);
        assert!(!table.resolve(0x2503).stretch.scale_x);
    }

    #[test]
    fn zero_overlap_is_no_overlap() {
        let attr = GlyphAttribute::centered("pa").overlap(0.0).y_padding(0.0);
        assert_eq!(attr.params.effective_overlap(), None);
        assert_eq!(attr.params.effective_y_padding(), None);
        let attr = GlyphAttribute::centered("pa").overlap(-0.02);
        assert_eq!(attr.params.effective_overlap(), Some(-0.02));
    }
}
