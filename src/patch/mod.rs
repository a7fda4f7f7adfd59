//! The patch run
//!
//! [`patch_font`] prepares the destination font (monospace check, ligature
//! removal, re-hinting, metrics and cell detection) and then hands the
//! enabled ranges of the built-in patch set to the [`PatchOrchestrator`].

pub mod options;
pub mod orchestrator;
pub mod patch_set;

pub use options::{AvgCharWidth, PatchOptions, SymbolSets};
pub use orchestrator::{PatchOrchestrator, PatchSummary, RangeReport};
pub use patch_set::{builtin_patch_set, PatchRangeSpec};

use crate::binary::AvgWidthFix;
use crate::core::errors::PatchResult;
use crate::font_source::metrics::{detect_cell_width, legacy_average_width, FontFrame};
use crate::font_source::monospace::assert_monospace;
use crate::font_source::{
    DonorLoader, EssentialSet, FontEngine, GlyphHandle, MetricSource, MetricsNormalizer,
};
use crate::geometry::CellDimensions;
use crate::logging::Diagnostics;
use crate::placement::{CellMode, PlacementEngine};

/// What a patch run found and did
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    pub cell: CellDimensions,
    pub metric_source: MetricSource,
    /// The source measured as monospaced
    pub source_monospaced: bool,
    /// The source was an empty symbol template
    pub template_mode: bool,
    pub essential_glyphs: usize,
    /// Fix for `OS/2.xAvgCharWidth` of the compiled font
    pub avg_width: AvgWidthFix,
    /// `None` after a dry run
    pub summary: Option<PatchSummary>,
}

/// Patch `font` with the built-in symbol sets selected in `options`
pub fn patch_font<E: FontEngine, L: DonorLoader<E>>(
    font: &mut E,
    loader: &mut L,
    options: &PatchOptions,
    diag: &mut Diagnostics,
) -> PatchResult<PatchOutcome> {
    let proportional = options.cell_mode == CellMode::Variable;
    let source_monospaced = assert_monospace(font, proportional, options.force_mono, diag)?;

    remove_ligatures(font, options, diag);
    let patterns = options.rehint_regexes()?;
    if !patterns.is_empty() {
        diag.debug(format!("Working on {} rehinting rules", patterns.len()));
        let count = font.rehint(&patterns);
        diag.info(format!("Rehinted {count} glyphs"));
    }

    let essential = EssentialSet::compute(font);
    diag.debug(format!("Found {} essential glyphs", essential.len()));

    let normalizer = MetricsNormalizer {
        forced_source: options.metrics,
        cell_override: options.cell,
        single_width: options.cell_mode == CellMode::Single,
    };
    let normalized = normalizer.normalize(font.vertical_metrics(), FontFrame::of(font), diag)?;
    let mut cell = normalized.cell;
    detect_cell_width(font, &mut cell, proportional, options.cell, diag)?;
    if options.report_cell || options.cell.is_some() {
        diag.info(format!(
            "Cell coordinates (Xmin:Xmax:Ymin:Ymax) {}{}:{}:{}:{}",
            if options.cell.is_some() { "overridden with " } else { "" },
            cell.xmin,
            cell.width,
            cell.ymin,
            cell.ymax
        ));
    }

    let avg_width = match options.avg_char_width {
        None => AvgWidthFix::Untouched,
        Some(AvgCharWidth::CopyFromSource) => AvgWidthFix::CopyFromSource,
        Some(AvgCharWidth::ComputeLegacyAverage) => {
            AvgWidthFix::Set(legacy_average_width(font)?)
        }
        Some(AvgCharWidth::ExplicitValue(value)) => AvgWidthFix::Set(value),
    };

    let box_enabled = box_drawing_enabled(
        font,
        options,
        source_monospaced,
        normalized.template_mode,
        diag,
    );
    let ranges = builtin_patch_set(options, box_enabled);

    let mut metrics = normalized.metrics;
    if options.adjust_line_height && (metrics.win_ascent + metrics.win_descent) % 2 != 0 {
        metrics.hhea_ascent += 1;
        metrics.typo_ascent += 1;
        metrics.win_ascent += 1;
        diag.debug("Made the line height even");
    }
    font.set_vertical_metrics(&metrics);

    if options.force_mono > 0 {
        force_monospaced_widths(font, cell.width);
    }

    let extra_wide = cell.height * 1.8 < cell.width * 2.0;
    if extra_wide {
        diag.warn("Very wide and short font, disabling 2 cell Powerline glyphs");
    }

    let mut outcome = PatchOutcome {
        cell,
        metric_source: normalized.source,
        source_monospaced,
        template_mode: normalized.template_mode,
        essential_glyphs: essential.len(),
        avg_width,
        summary: None,
    };
    if options.dry_run {
        diag.info("Dry run, no glyphs copied");
        return Ok(outcome);
    }

    let placement = PlacementEngine::new(cell, options.cell_mode, font.units_per_em());
    let summary = PatchOrchestrator::new(font, loader, placement, &essential)
        .careful(options.careful)
        .extra_wide(extra_wide)
        .run(&ranges, diag)?;
    diag.info(format!(
        "Placed {} glyphs, skipped {}",
        summary.placed(),
        summary.skipped()
    ));
    outcome.summary = Some(summary);
    Ok(outcome)
}

fn remove_ligatures<E: FontEngine>(
    font: &mut E,
    options: &PatchOptions,
    diag: &mut Diagnostics,
) {
    if !options.remove_ligatures {
        return;
    }
    diag.info("Removing ligatures from configfile `ligatures` list");
    if options.ligature_lookups.is_empty() {
        diag.warn("No ligature data (config file missing?)");
        return;
    }
    for lookup in &options.ligature_lookups {
        diag.debug(format!("Removing subtable: {lookup}"));
        match font.remove_lookup(lookup) {
            Ok(()) => diag.debug(format!("Successfully removed subtable: {lookup}")),
            Err(err) => diag.error(format!("Failed to remove subtable: {lookup} ({err})")),
        }
    }
}

/// Box drawing glyphs are patched into monospaced fonts that lack some of
/// them; a font with the full block keeps its own
fn box_drawing_enabled<E: FontEngine>(
    font: &E,
    options: &PatchOptions,
    source_monospaced: bool,
    template_mode: bool,
    diag: &mut Diagnostics,
) -> bool {
    let (start, end) = patch_set::BOX_DRAWING;
    if !(source_monospaced && !template_mode) && !options.force_box_drawing {
        return false;
    }
    let target = (end - start + 1) as usize;
    let current = (start..=end).filter(|cp| font.contains(*cp)).count();
    if current < target || options.force_box_drawing {
        if current > 0 {
            diag.debug(format!("{current}/{target} box drawing glyphs will be replaced"));
        }
        true
    } else {
        false
    }
}

/// Give every glyph the cell width, pulling negative bearings in first on
/// glyphs that are not zero width marks
fn force_monospaced_widths<E: FontEngine>(font: &mut E, width: f64) {
    font.for_each_glyph_mut(&mut |glyph| {
        if glyph.advance() == width {
            return;
        }
        if glyph.advance() != 0.0 {
            glyph.remove_negative_bearings();
        }
        glyph.set_advance(width);
    });
}
