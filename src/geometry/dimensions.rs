//! Glyph and cell measurements
//!
//! [`GlyphDimensions`] is the bounding box of one glyph or of a whole scale
//! group. [`CellDimensions`] is the box every patched glyph is fitted into.

use crate::font_source::GlyphHandle;
use kurbo::Rect;

/// Bounding box of a glyph or glyph group
///
/// `advance` is only known for groups: it is the common advance width of
/// all members, or `None` when the group is a single glyph or the members
/// disagree.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphDimensions {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub width: f64,
    pub height: f64,
    pub advance: Option<f64>,
}

impl GlyphDimensions {
    pub fn from_rect(rect: Rect, advance: Option<f64>) -> Self {
        Self {
            xmin: rect.x0,
            ymin: rect.y0,
            xmax: rect.x1,
            ymax: rect.y1,
            width: rect.x1 - rect.x0,
            height: rect.y1 - rect.y0,
            advance,
        }
    }

    /// Measure a single glyph
    pub fn of_glyph<G: GlyphHandle>(glyph: &G) -> Self {
        Self::combined(std::iter::once(Some(glyph)))
    }

    /// Combined box of several glyphs
    ///
    /// Members that are `None` (listed in a group but missing from the font)
    /// are skipped. Empty glyphs are ignored when more than one member is
    /// listed.
    pub fn combined<'a, G, I>(glyphs: I) -> Self
    where
        G: GlyphHandle + 'a,
        I: IntoIterator<Item = Option<&'a G>>,
    {
        let glyphs: Vec<Option<&G>> = glyphs.into_iter().collect();
        let listed = glyphs.len();

        let mut rect: Option<Rect> = None;
        let mut first_advance: Option<f64> = None;
        let mut uniform = true;
        let mut measured = 0usize;

        for glyph in glyphs.into_iter().flatten() {
            let bounds = glyph.bounds().unwrap_or(Rect::ZERO);
            if listed > 1 && bounds.x0 == bounds.x1 && bounds.y0 == bounds.y1 {
                continue;
            }
            rect = Some(match rect {
                Some(acc) => acc.union(bounds),
                None => bounds,
            });
            match first_advance {
                None => first_advance = Some(glyph.advance()),
                Some(advance) if advance != glyph.advance() => uniform = false,
                Some(_) => {}
            }
            measured += 1;
        }

        let advance = if measured > 1 && uniform {
            first_advance
        } else {
            None
        };

        match rect {
            Some(rect) => Self::from_rect(rect, advance),
            None => Self::default(),
        }
    }

    /// Simulate scaling the box, truncating every coordinate toward zero
    pub fn scaled(&self, scale_x: f64, scale_y: f64) -> Self {
        let xmin = (self.xmin * scale_x).trunc();
        let ymin = (self.ymin * scale_y).trunc();
        let xmax = (self.xmax * scale_x).trunc();
        let ymax = (self.ymax * scale_y).trunc();
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            width: xmax - xmin,
            height: ymax - ymin,
            advance: self.advance.map(|advance| (advance * scale_x).trunc()),
        }
    }

    /// True when the box has no area to scale
    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    pub fn center_y(&self) -> f64 {
        self.ymax - self.height / 2.0
    }
}

/// The target box for patched glyphs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellDimensions {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub width: f64,
    pub height: f64,
    /// Height icons are scaled to, may be smaller than `height`
    pub icon_height: f64,
}

impl CellDimensions {
    /// Vertical cell extent without any horizontal information yet
    pub fn from_vertical(ymin: f64, ymax: f64) -> Self {
        let height = ymax - ymin;
        Self {
            ymin,
            ymax,
            height,
            icon_height: height,
            ..Self::default()
        }
    }

    pub fn center_y(&self) -> f64 {
        self.ymax - self.height / 2.0
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
        self.xmax = self.xmin + width;
    }
}
