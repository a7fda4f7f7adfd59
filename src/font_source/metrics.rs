//! Vertical metrics and cell detection
//!
//! A font describes its line spacing three times (hhea, OS/2 typo and
//! OS/2 win). [`MetricsNormalizer`] picks the trustworthy one, derives the
//! cell box from it and rewrites all three sets to agree. The horizontal
//! cell extent is measured from the Latin glyphs afterwards.

use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::{format_codepoint, FontEngine, GlyphHandle};
use crate::geometry::CellDimensions;
use crate::logging::Diagnostics;
use std::fmt;
use std::str::FromStr;

/// The three vertical metric sets of a font
///
/// Descents of hhea and typo are negative, the win descent is positive as
/// stored in the OS/2 table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerticalMetrics {
    pub hhea_ascent: i32,
    pub hhea_descent: i32,
    pub hhea_line_gap: i32,
    pub typo_ascent: i32,
    pub typo_descent: i32,
    pub typo_line_gap: i32,
    pub win_ascent: i32,
    pub win_descent: i32,
    pub use_typo_metrics: bool,
}

/// Baseline to baseline distances of all three metric sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpacing {
    pub hhea: i32,
    pub typo: i32,
    pub win: i32,
    /// Line gap implied for the win metrics, which have no gap field
    pub win_gap: i32,
}

impl VerticalMetrics {
    pub fn line_spacing(&self) -> LineSpacing {
        let hhea_height = self.hhea_ascent - self.hhea_descent;
        let typo_height = self.typo_ascent - self.typo_descent;
        let win_height = self.win_ascent + self.win_descent;
        let win_gap = (self.hhea_line_gap - win_height + hhea_height).max(0);
        LineSpacing {
            hhea: hhea_height + self.hhea_line_gap,
            typo: typo_height + self.typo_line_gap,
            win: win_height + win_gap,
            win_gap,
        }
    }

    /// Cell extent (ymin, ymax) derived from one metric set, with its line
    /// gap distributed into the cell
    pub fn vertical_extent(&self, source: MetricSource) -> (i32, i32) {
        match source {
            MetricSource::Hhea => (
                self.hhea_descent - half_gap(self.hhea_line_gap, false),
                self.hhea_ascent + half_gap(self.hhea_line_gap, true),
            ),
            MetricSource::Typo => (
                self.typo_descent - half_gap(self.typo_line_gap, false),
                self.typo_ascent + half_gap(self.typo_line_gap, true),
            ),
            MetricSource::Win => {
                let gap = self.line_spacing().win_gap;
                (
                    -self.win_descent - half_gap(gap, false),
                    self.win_ascent + half_gap(gap, true),
                )
            }
        }
    }

    /// Make all three sets describe exactly `ymin..ymax` with no line gap
    pub fn equalize(&mut self, ymin: i32, ymax: i32) {
        self.typo_line_gap = 0;
        self.typo_ascent = ymax;
        self.typo_descent = ymin;
        self.win_ascent = ymax;
        self.win_descent = -ymin;
        self.hhea_ascent = ymax;
        self.hhea_descent = ymin;
        self.hhea_line_gap = 0;
        self.use_typo_metrics = true;
    }
}

impl LineSpacing {
    pub fn of(&self, source: MetricSource) -> i32 {
        match source {
            MetricSource::Hhea => self.hhea,
            MetricSource::Typo => self.typo,
            MetricSource::Win => self.win,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.hhea == self.typo && self.typo == self.win
    }
}

/// Split a line gap into a top and a bottom share
///
/// The top gets the truncated half, the bottom the remainder.
pub fn half_gap(gap: i32, top: bool) -> i32 {
    if gap <= 0 {
        return 0;
    }
    let gap_top = gap / 2;
    if top {
        gap_top
    } else {
        gap - gap_top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricSource {
    Hhea,
    Typo,
    Win,
}

impl fmt::Display for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetricSource::Hhea => "HHEA",
            MetricSource::Typo => "TYPO",
            MetricSource::Win => "WIN",
        })
    }
}

impl FromStr for MetricSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HHEA" => Ok(MetricSource::Hhea),
            "TYPO" => Ok(MetricSource::Typo),
            "WIN" => Ok(MetricSource::Win),
            other => Err(format!("unknown metrics source '{other}' (use HHEA, TYPO or WIN)")),
        }
    }
}

/// Explicit cell box given on the command line as `xmin:xmax:ymin:ymax`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellOverride {
    pub xmin: i32,
    pub xmax: i32,
    pub ymin: i32,
    pub ymax: i32,
}

impl FromStr for CellOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err(format!(
                "cell must be given as xmin:xmax:ymin:ymax, got '{s}'"
            ));
        }
        let mut values = [0i32; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .trim()
                .parse()
                .map_err(|_| format!("cell value '{part}' is not an integer"))?;
        }
        let [xmin, xmax, ymin, ymax] = values;
        if xmax <= xmin || ymax <= ymin {
            return Err(format!("cell '{s}' has no area"));
        }
        Ok(Self {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }
}

/// The parts of a font's header needed to build a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontFrame {
    pub units_per_em: f64,
    pub ascent: f64,
    pub descent: f64,
    pub cap_height: Option<f64>,
}

impl FontFrame {
    pub fn of<E: FontEngine>(font: &E) -> Self {
        Self {
            units_per_em: font.units_per_em(),
            ascent: font.ascent(),
            descent: font.descent(),
            cap_height: font.cap_height(),
        }
    }
}

/// Result of vertical normalisation
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetrics {
    /// Cell with its vertical extent set, width still unknown
    pub cell: CellDimensions,
    /// Rewritten metrics, all three sets equal
    pub metrics: VerticalMetrics,
    pub source: MetricSource,
    /// The font had no usable metrics, it is an empty symbol template
    pub template_mode: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsNormalizer {
    /// Use this metric set without any plausibility checks
    pub forced_source: Option<MetricSource>,
    pub cell_override: Option<CellOverride>,
    /// Single-width targets get a reduced icon height
    pub single_width: bool,
}

impl MetricsNormalizer {
    /// Decide which metric set describes the real line spacing.
    ///
    /// The preferred set (typo when USE_TYPO_METRICS is on, win otherwise)
    /// is accepted if it matches hhea, or comes within 3% of it. Otherwise
    /// the other set is tried, and if that matches exactly the flag is
    /// flipped. When nothing agrees win is used.
    pub fn choose_source(
        &self,
        metrics: &mut VerticalMetrics,
        diag: &mut Diagnostics,
    ) -> MetricSource {
        let spacing = metrics.line_spacing();
        if let Some(source) = self.forced_source {
            diag.debug(format!(
                "Metrics in the font: HHEA {} / TYPO {} / WIN {}",
                spacing.hhea, spacing.typo, spacing.win
            ));
            diag.info(format!(
                "Manually selected metrics: {} ({})",
                source,
                spacing.of(source)
            ));
            return source;
        }

        let (preferred, other) = if metrics.use_typo_metrics {
            (MetricSource::Typo, MetricSource::Win)
        } else {
            (MetricSource::Win, MetricSource::Typo)
        };

        let ours = spacing.of(preferred);
        if ours == spacing.hhea {
            return preferred;
        }
        if ours != 0 {
            let deviation = f64::from(ours - spacing.hhea) / f64::from(ours);
            if deviation.abs() < 0.03 {
                diag.warn(format!(
                    "Font vertical metrics slightly off ({:.1}%)",
                    deviation * 100.0
                ));
                return preferred;
            }
        }

        if spacing.of(other) == spacing.hhea {
            metrics.use_typo_metrics = !metrics.use_typo_metrics;
            diag.warn(format!(
                "Font vertical metrics probably wrong USE TYPO METRICS, assume opposite (i.e. {})",
                metrics.use_typo_metrics
            ));
            return other;
        }

        diag.warn(format!(
            "Font vertical metrics inconsistent (HHEA {} / TYPO {} / WIN {}), using WIN",
            spacing.hhea, spacing.typo, spacing.win
        ));
        MetricSource::Win
    }

    /// Derive the vertical cell extent and equalise the metric sets.
    pub fn normalize(
        &self,
        metrics: VerticalMetrics,
        frame: FontFrame,
        diag: &mut Diagnostics,
    ) -> PatchResult<NormalizedMetrics> {
        let mut metrics = metrics;

        let (source, mut ymin, mut ymax) = match self.cell_override {
            Some(cell) => {
                diag.debug(format!(
                    "Overriding cell Y with Y{{{}:{}}}",
                    cell.ymin, cell.ymax
                ));
                let source = self.forced_source.unwrap_or(MetricSource::Typo);
                (source, cell.ymin, cell.ymax)
            }
            None => {
                let source = self.choose_source(&mut metrics, diag);
                let (ymin, ymax) = metrics.vertical_extent(source);
                if source != MetricSource::Hhea {
                    let gap = match source {
                        MetricSource::Typo => metrics.typo_line_gap,
                        _ => metrics.line_spacing().win_gap,
                    };
                    if gap > 0 {
                        diag.info(format!(
                            "Redistributing line gap of {} ({} top and {} bottom)",
                            gap,
                            half_gap(gap, true),
                            half_gap(gap, false)
                        ));
                    }
                }
                (source, ymin, ymax)
            }
        };

        let mut template_mode = false;
        if ymax - ymin == 0 {
            // an empty font: build the cell from the em square
            template_mode = true;
            ymin = -(frame.descent.round() as i32);
            ymax = frame.ascent.round() as i32;
            diag.info("Font has no vertical metrics, treating it as a symbol template");
        }

        let height = ymax - ymin;
        if height <= 0 {
            return Err(PatchError::data("Can not detect sane font height"));
        }

        let mut cell = CellDimensions::from_vertical(f64::from(ymin), f64::from(ymax));
        if template_mode {
            cell.set_width(frame.units_per_em);
        } else if self.single_width && self.cell_override.is_none() {
            if let Some(cap_height) = frame.cap_height.filter(|cap| *cap > 0.0) {
                // slender icons look too tall in a monospaced cell
                cell.icon_height = (cap_height * 2.0 + cell.height) / 3.0;
            }
        }

        metrics.equalize(ymin, ymax);
        let check = metrics.line_spacing();
        if !check.is_consistent() || check.hhea != height {
            return Err(PatchError::data(
                "Error in baseline to baseline code detected",
            ));
        }

        Ok(NormalizedMetrics {
            cell,
            metrics,
            source,
            template_mode,
        })
    }
}

/// Codepoints ignored when measuring the cell width: the Latin-1
/// punctuation block and glyphs that are commonly too wide in monospaced
/// fonts
const WIDTH_EXCEPTIONS: [u32; 14] = [
    0x132, 0x133, 0x022, 0x027, 0x060, 0x0D0, 0x10F, 0x110, 0x111, 0x127, 0x13E, 0x140, 0x165,
    0x149,
];

fn counts_for_width(codepoint: u32) -> bool {
    !(0x7F..0xBF).contains(&codepoint)
        && codepoint != 0x02D
        && !WIDTH_EXCEPTIONS.contains(&codepoint)
}

/// Measure the cell width from the Latin glyphs.
///
/// The cell width is the largest advance among U+0021..U+017E, skipping
/// the known exceptions. An explicit override replaces it.
pub fn detect_cell_width<E: FontEngine>(
    font: &E,
    cell: &mut CellDimensions,
    proportional: bool,
    cell_override: Option<CellOverride>,
    diag: &mut Diagnostics,
) -> PatchResult<()> {
    let mut width = cell.width;
    let mut xmax = cell.xmax;
    let mut warned_advance = proportional;
    let mut warned_bounds = proportional;

    for codepoint in (0x21..0x17F).filter(|cp| counts_for_width(*cp)) {
        let Some(glyph) = font.glyph(codepoint) else {
            continue;
        };
        let Some(bounds) = glyph.bounds() else {
            continue;
        };
        if width < glyph.advance() {
            width = glyph.advance();
            if !warned_advance && codepoint > 0x7A {
                diag.debug(format!(
                    "Extended glyphs wider than basic glyphs ({}), results might be useless",
                    format_codepoint(codepoint)
                ));
                warned_advance = true;
            }
        }
        if bounds.x1 > xmax {
            xmax = bounds.x1;
            if !warned_bounds && codepoint > 0x7A {
                diag.debug("Extended glyphs wider bounding box than basic glyphs");
                warned_bounds = true;
            }
        }
    }
    if width < xmax {
        diag.debug("Font has negative right side bearing in extended glyphs");
    }
    if width <= 0.0 {
        return Err(PatchError::data("Can not detect sane font width"));
    }
    cell.xmin = 0.0;
    cell.set_width(width);

    if let Some(over) = cell_override {
        diag.debug(format!(
            "Overriding cell X{{{}:{}}} with X{{{}:{}}}",
            cell.xmin,
            cell.xmin + cell.width,
            over.xmin,
            over.xmax
        ));
        cell.xmin = f64::from(over.xmin);
        cell.width = f64::from(over.xmax);
        cell.xmax = f64::from(over.xmax);
    }

    let icon_note = if cell.icon_height != cell.height {
        format!(" (with icon cell {} h)", cell.icon_height.trunc())
    } else {
        String::new()
    };
    diag.debug(format!(
        "Final font cell dimensions {} w x {} h{}",
        cell.width, cell.height, icon_note
    ));
    Ok(())
}

/// Weights of the pre-version-3 OS/2 average width, per mille
const LEGACY_AVERAGE_WEIGHTS: [(char, u32); 27] = [
    ('a', 64),
    ('b', 14),
    ('c', 27),
    ('d', 35),
    ('e', 100),
    ('f', 20),
    ('g', 14),
    ('h', 42),
    ('i', 63),
    ('j', 3),
    ('k', 6),
    ('l', 35),
    ('m', 20),
    ('n', 56),
    ('o', 56),
    ('p', 17),
    ('q', 4),
    ('r', 49),
    ('s', 56),
    ('t', 71),
    ('u', 31),
    ('v', 10),
    ('w', 18),
    ('x', 3),
    ('y', 18),
    ('z', 2),
    (' ', 166),
];

/// The old style xAvgCharWidth: letter frequency weighted advance of the
/// lowercase Latin letters and the space
pub fn legacy_average_width<E: FontEngine>(font: &E) -> PatchResult<u16> {
    let mut sum = 0.0;
    for (ch, weight) in LEGACY_AVERAGE_WEIGHTS {
        let glyph = font.glyph(u32::from(ch)).ok_or_else(|| {
            PatchError::data(format!(
                "Can not determine ancient style xAvgCharWidth, {} is missing",
                format_codepoint(u32::from(ch))
            ))
        })?;
        sum += glyph.advance() * f64::from(weight);
    }
    let average = (sum / 1000.0).trunc();
    Ok(average.clamp(0.0, f64::from(u16::MAX)) as u16)
}
