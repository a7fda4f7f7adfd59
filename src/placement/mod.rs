//! Symbol placement
//!
//! [`PlacementEngine`] fits a pasted symbol into the target cell: it picks
//! the scale factors, applies them, aligns the result horizontally and
//! vertically, fixes up bearings and finally sets the advance width.

pub mod attributes;
pub mod scale_group;
pub mod stretch;

pub use attributes::{AttributeTable, GlyphAttribute, GlyphParams, HAlign, VAlign};
pub use scale_group::{
    CodepointSet, GroupScale, LeadGlyphRule, ResolvedScaleRules, ScaleGroup, ScaleRuleCache,
    ScaleRules, ShiftMode,
};
pub use stretch::Stretch;

use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::{format_codepoint, GlyphHandle};
use crate::geometry::{CellDimensions, GlyphDimensions};
use crate::logging::Diagnostics;
use kurbo::Affine;

/// Attempts to shrink a rounded glyph back into a single cell
const SINGLE_WIDTH_RETRIES: usize = 3;

/// Vertical overlap is never more than this fraction
const MAX_VERTICAL_OVERLAP: f64 = 0.01;

/// How symbols relate to the cell width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellMode {
    /// Aspect preserving symbols may take two cells
    #[default]
    Double,
    /// Every symbol fits into one cell
    Single,
    /// Symbols keep their own advance width
    Variable,
}

impl CellMode {
    pub fn is_monospaced(self) -> bool {
        !matches!(self, Self::Variable)
    }
}

/// What happened to one glyph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale_x: f64,
    pub scale_y: f64,
    pub shift_x: f64,
    pub shift_y: f64,
    pub advance: f64,
}

#[derive(Debug, Clone)]
pub struct PlacementEngine {
    cell: CellDimensions,
    mode: CellMode,
    units_per_em: f64,
}

impl PlacementEngine {
    pub fn new(cell: CellDimensions, mode: CellMode, units_per_em: f64) -> Self {
        Self {
            cell,
            mode,
            units_per_em,
        }
    }

    pub fn cell(&self) -> &CellDimensions {
        &self.cell
    }

    pub fn mode(&self) -> CellMode {
        self.mode
    }

    /// Number of cells a symbol with `stretch` may cover
    pub fn target_width_multiplier(&self, stretch: &Stretch) -> f64 {
        if self.mode == CellMode::Single
            || (!stretch.preserve_aspect && !stretch.double_cell)
            || stretch.single_cell
        {
            1.0
        } else {
            2.0
        }
    }

    /// Horizontal and vertical scale that fit `dims` into the cell
    pub fn scale_factors(
        &self,
        dims: &GlyphDimensions,
        stretch: &Stretch,
        overlap: Option<f64>,
        y_padding: f64,
    ) -> (f64, f64) {
        if dims.is_degenerate() {
            return (1.0, 1.0);
        }

        let mut target_width = self.cell.width * self.target_width_multiplier(stretch);
        if let Some(overlap) = overlap {
            target_width += self.cell.width * overlap;
        }
        let mut scale_x = target_width / dims.width;

        let mut target_height = if stretch.full_height {
            self.cell.height
        } else {
            self.cell.icon_height
        };
        target_height *= 1.0 - y_padding;
        if let Some(overlap) = overlap {
            target_height *= 1.0 + overlap.min(MAX_VERTICAL_OVERLAP);
        }
        let mut scale_y = target_height / dims.height;

        if stretch.preserve_aspect {
            scale_x = scale_x.min(scale_y);
            if self.mode != CellMode::Single && !stretch.allow_growth && overlap.is_none() {
                // Without a single cell to fill, symbols only ever shrink
                scale_x = scale_x.min(1.0);
            }
            scale_y = scale_x;
        } else {
            if !stretch.scale_x {
                scale_x = 1.0;
            }
            if !stretch.scale_y {
                scale_y = 1.0;
            }
        }

        (scale_x, scale_y)
    }

    /// Scale, align and size `glyph`, which is encoded at `codepoint`
    ///
    /// `group` carries the shared scale of the glyph's scale group, if any.
    pub fn place<G: GlyphHandle>(
        &self,
        glyph: &mut G,
        codepoint: u32,
        attr: &GlyphAttribute,
        group: Option<&GroupScale>,
        diag: &mut Diagnostics,
    ) -> PatchResult<Placement> {
        let overlap = attr.params.effective_overlap();
        let y_padding = attr.params.effective_y_padding();
        if overlap.is_some() && y_padding.is_some() {
            return Err(PatchError::configuration(format!(
                "Conflicting params at {}: overlap and ypadding",
                format_codepoint(codepoint)
            )));
        }
        let y_padding = y_padding.unwrap_or(0.0);
        let stretch = &attr.stretch;

        let pristine = glyph.clone();
        let mut dims = GlyphDimensions::of_glyph(glyph);

        let (mut scale_x, scale_y) = match group {
            Some(GroupScale {
                combined: Some(combined),
                ..
            }) => {
                dims = *combined;
                self.scale_factors(combined, stretch, overlap, y_padding)
            }
            Some(GroupScale { scale, combined: None }) => {
                let (mut scale_x, mut scale_y) = (*scale, *scale);
                if let Some(overlap) = overlap {
                    if !dims.is_degenerate() {
                        scale_x *= 1.0 + (self.cell.width / (dims.width * scale_x)) * overlap;
                        let y_overlap = overlap.min(MAX_VERTICAL_OVERLAP);
                        scale_y *= 1.0 + (self.cell.height / (dims.height * scale_y)) * y_overlap;
                    }
                }
                (scale_x, scale_y)
            }
            None => self.scale_factors(&dims, stretch, overlap, y_padding),
        };

        if let Some(max_ratio) = attr.params.xy_ratio {
            if dims.height != 0.0 && scale_y != 0.0 {
                let ratio = dims.width * scale_x / (dims.height * scale_y);
                if ratio > max_ratio {
                    scale_x *= max_ratio / ratio;
                }
            }
        }

        if scale_x != 1.0 || scale_y != 1.0 {
            // A hair too small so rounding never pushes the glyph out
            scale_x *= self.units_per_em / (self.units_per_em + 1.0);
            glyph.transform(Affine::scale_non_uniform(scale_x, scale_y));
        }
        glyph.round_coordinates();

        if self.mode == CellMode::Single {
            let max_width = self.cell.width * (1.0 + overlap.unwrap_or(0.0)).max(1.0);
            for attempt in 0..SINGLE_WIDTH_RETRIES {
                let width = glyph.bounds().map(|rect| rect.width()).unwrap_or(0.0);
                let excess = width - max_width;
                if excess <= 0.0 {
                    break;
                }
                scale_x /= 1.0 + (excess + attempt as f64) / max_width;
                *glyph = pristine.clone();
                glyph.transform(Affine::scale_non_uniform(scale_x, scale_y));
                glyph.round_coordinates();
            }
        }

        // Measure again to pick up rounding
        let mut dims = GlyphDimensions::of_glyph(glyph);
        if let Some(GroupScale {
            combined: Some(combined),
            ..
        }) = group
        {
            let mut shared = combined.scaled(scale_x, scale_y);
            if shared.advance.is_none() {
                // Proportional groups only share the vertical position
                shared.xmin = dims.xmin;
                shared.xmax = dims.xmax;
                shared.width = dims.width;
            }
            dims = shared;
        }

        let shift_y = match attr.valign {
            VAlign::Center => self.cell.center_y() - dims.center_y(),
            VAlign::None => 0.0,
        };

        let multiplier = self.target_width_multiplier(stretch);
        let simple_proportional = self.mode == CellMode::Variable && dims.advance.is_none();
        let mut shift_x = if simple_proportional {
            -glyph.left_side_bearing()
        } else {
            let left = self.cell.xmin - dims.xmin;
            let cell_width = if self.mode == CellMode::Variable && stretch.preserve_aspect {
                dims.advance.unwrap_or(dims.width)
            } else {
                self.cell.width
            };
            let shift = match attr.align {
                HAlign::Left => left,
                HAlign::Center => left + cell_width / 2.0 - dims.width / 2.0,
                HAlign::Right => left + cell_width * multiplier - dims.width,
            };
            if overlap.is_none() {
                // Wider than the cell, left align
                shift.max(left)
            } else {
                shift
            }
        };

        let overlap_width = overlap.map(|overlap| self.cell.width * overlap);
        if let Some(overlap_width) = overlap_width {
            match attr.align {
                HAlign::Left => shift_x -= overlap_width,
                HAlign::Center => {
                    if overlap_width < 0.0 && simple_proportional {
                        shift_x -= overlap_width / 2.0;
                    }
                }
                HAlign::Right if !simple_proportional => {
                    // xy-ratio limits can leave the right edge short
                    let target_xmax =
                        (self.cell.xmin + self.cell.width) * multiplier + overlap_width;
                    shift_x += target_xmax - (dims.xmax + shift_x);
                }
                HAlign::Right => {}
            }
        }

        glyph.translate(shift_x, shift_y);

        if overlap.is_none() {
            glyph.remove_negative_bearings();
        }

        let advance = if self.mode.is_monospaced() {
            self.cell.width
        } else {
            let width = dims.advance.unwrap_or(dims.width) - overlap_width.unwrap_or(0.0);
            width.trunc()
        };
        glyph.set_advance(advance);

        if self.mode == CellMode::Single {
            let max_width = self.cell.width * (1.0 + overlap.unwrap_or(0.0)).max(1.0);
            let width = glyph.bounds().map(|rect| rect.width()).unwrap_or(0.0);
            if width > max_width {
                diag.warn(format!(
                    "Scaled glyph {} wider than one monospace width ({} / {} (overlap {:?}))",
                    format_codepoint(codepoint),
                    width as i64,
                    self.cell.width,
                    overlap
                ));
            }
        }

        Ok(Placement {
            scale_x,
            scale_y,
            shift_x,
            shift_y,
            advance,
        })
    }
}
