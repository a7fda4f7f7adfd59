//! Range by range symbol copying

use crate::core::errors::PatchResult;
use crate::font_source::{format_codepoint, DonorLoader, EssentialSet, FontEngine};
use crate::logging::Diagnostics;
use crate::patch::patch_set::PatchRangeSpec;
use crate::placement::{GlyphAttribute, GroupScale, PlacementEngine, ScaleRuleCache};
use std::collections::BTreeSet;

/// Outcome of one patched range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeReport {
    pub name: String,
    /// Donor glyphs selected for the range
    pub selected: usize,
    pub placed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub ranges: Vec<RangeReport>,
}

impl PatchSummary {
    pub fn placed(&self) -> usize {
        self.ranges.iter().map(|range| range.placed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.ranges.iter().map(|range| range.skipped).sum()
    }
}

/// An open donor font and the file it came from
struct OpenDonor<E> {
    file_name: String,
    font: E,
}

/// Copies the glyphs of every enabled range into the destination font
///
/// Ranges run in declaration order and observe what earlier ranges did.
/// The essential set must be computed before the first range runs.
pub struct PatchOrchestrator<'a, E: FontEngine, L: DonorLoader<E>> {
    font: &'a mut E,
    loader: &'a mut L,
    placement: PlacementEngine,
    essential: &'a EssentialSet,
    careful: bool,
    extra_wide: bool,
    scale_rules: ScaleRuleCache,
    donor: Option<OpenDonor<E>>,
}

impl<'a, E: FontEngine, L: DonorLoader<E>> PatchOrchestrator<'a, E, L> {
    pub fn new(
        font: &'a mut E,
        loader: &'a mut L,
        placement: PlacementEngine,
        essential: &'a EssentialSet,
    ) -> Self {
        Self {
            font,
            loader,
            placement,
            essential,
            careful: false,
            extra_wide: false,
            scale_rules: ScaleRuleCache::new(),
            donor: None,
        }
    }

    /// Never overwrite glyphs that already exist
    pub fn careful(mut self, careful: bool) -> Self {
        self.careful = careful;
        self
    }

    /// Drop double width stretches, the cell is already wide
    pub fn extra_wide(mut self, extra_wide: bool) -> Self {
        self.extra_wide = extra_wide;
        self
    }

    pub fn run(
        &mut self,
        ranges: &[PatchRangeSpec],
        diag: &mut Diagnostics,
    ) -> PatchResult<PatchSummary> {
        let mut summary = PatchSummary::default();
        for (index, range) in ranges.iter().enumerate() {
            if !range.enabled {
                continue;
            }
            range.validate()?;
            self.open_donor(&range.donor, diag)?;
            summary.ranges.push(self.patch_range(index, range, diag)?);
        }
        if let Some(donor) = self.donor.take() {
            diag.debug(format!("Closing symbol font {}", donor.file_name));
        }
        Ok(summary)
    }

    /// Keep the current donor open while ranges use the same file
    fn open_donor(&mut self, file_name: &str, diag: &mut Diagnostics) -> PatchResult<()> {
        if self
            .donor
            .as_ref()
            .is_some_and(|donor| donor.file_name == file_name)
        {
            return Ok(());
        }
        if let Some(previous) = self.donor.take() {
            diag.debug(format!("Closing symbol font {}", previous.file_name));
        }
        let mut font = self.loader.load(file_name)?;
        font.set_units_per_em(self.font.units_per_em());
        diag.debug(format!("Opened symbol font {file_name}"));
        self.donor = Some(OpenDonor {
            file_name: file_name.to_string(),
            font,
        });
        Ok(())
    }

    fn patch_range(
        &mut self,
        index: usize,
        range: &PatchRangeSpec,
        diag: &mut Diagnostics,
    ) -> PatchResult<RangeReport> {
        let Self {
            font,
            placement,
            essential,
            careful,
            extra_wide,
            scale_rules,
            donor,
            ..
        } = self;
        let Some(OpenDonor { font: donor, .. }) = donor.as_ref() else {
            return Ok(RangeReport::default());
        };

        let run_careful = *careful || range.copies_everything();
        let selection = select_donor_glyphs(donor, range);
        let mut report = RangeReport {
            name: range.name.clone(),
            selected: selection.len(),
            ..RangeReport::default()
        };

        let rescaling = range.attributes.default_attribute().params.dont_copy;
        diag.info(format!(
            "{} {} Glyphs from {} Set",
            if rescaling { "Rescaling" } else { "Adding" },
            selection.len(),
            range.name
        ));

        let mut current: Option<u32> = None;
        for (counter, donor_cp) in selection.into_iter().enumerate() {
            let mut attr = range.attributes.resolve(donor_cp).clone();
            if *extra_wide {
                attr.stretch = attr.stretch.without_double_width();
            }

            let dest = if range.exact {
                let candidates = std::iter::once(donor_cp)
                    .chain(donor.alternate_codepoints(donor_cp))
                    .filter(|cp| current.is_none_or(|last| *cp > last));
                match candidates.min() {
                    Some(cp) => cp,
                    None => {
                        diag.warn(format!(
                            "Can not determine codepoint of {donor_cp:X}. Skipping..."
                        ));
                        report.skipped += 1;
                        continue;
                    }
                }
            } else {
                range.dest_start() + counter as u32
            };
            current = Some(dest);

            let do_careful = attr.params.careful.unwrap_or(run_careful);
            let is_essential = essential.contains(dest);
            if do_careful || is_essential {
                if font.contains(dest) {
                    let kind = if is_essential { "essential" } else { "existing" };
                    diag.debug(format!("Found {kind} Glyph at {dest:X}. Skipping..."));
                    report.skipped += 1;
                    continue;
                }
            } else if font.contains(dest) {
                font.remove_substitutions(dest);
            }

            let y_padding = attr.params.effective_y_padding().unwrap_or(0.0);
            let group: Option<GroupScale> = if attr.params.dont_copy {
                if !font.contains(dest) {
                    diag.debug(format!(
                        "No glyph at {} to rescale. Skipping...",
                        format_codepoint(dest)
                    ));
                    report.skipped += 1;
                    continue;
                }
                group_scale(
                    scale_rules,
                    index,
                    range,
                    &**font,
                    placement,
                    &attr,
                    donor_cp,
                    y_padding,
                )?
            } else {
                if font.contains(dest) {
                    let removed = font.clear_alternates(dest);
                    if !removed.is_empty() {
                        let codes: Vec<String> =
                            removed.iter().map(|cp| format!("{cp:04X}")).collect();
                        diag.debug(format!(
                            "Removing alternate unicode on {dest:X} ({})",
                            codes.join(" ")
                        ));
                    }
                }
                let group = group_scale(
                    scale_rules,
                    index,
                    range,
                    donor,
                    placement,
                    &attr,
                    donor_cp,
                    y_padding,
                )?;
                let Some(glyph) = donor.copy_glyph(donor_cp) else {
                    diag.warn(format!(
                        "Symbol {} vanished from {}",
                        format_codepoint(donor_cp),
                        range.donor
                    ));
                    report.skipped += 1;
                    continue;
                };
                if !font.contains(dest) {
                    font.create_glyph(dest);
                }
                font.paste_glyph(dest, &glyph);
                group
            };

            let Some(glyph) = font.glyph_mut(dest) else {
                report.skipped += 1;
                continue;
            };
            placement.place(glyph, dest, &attr, group.as_ref(), diag)?;
            report.placed += 1;
        }

        diag.debug(format!(
            "Range {}: {} placed, {} skipped",
            report.name, report.placed, report.skipped
        ));
        Ok(report)
    }
}

/// Donor glyphs of a range in encoding order, each glyph once by its
/// primary codepoint
fn select_donor_glyphs<E: FontEngine>(donor: &E, range: &PatchRangeSpec) -> Vec<u32> {
    let mut seen = BTreeSet::new();
    donor
        .codepoints()
        .into_iter()
        .filter(|cp| {
            range.copies_everything() || (range.donor_start..=range.donor_end).contains(cp)
        })
        .filter_map(|cp| donor.primary_codepoint(cp))
        .filter(|primary| seen.insert(*primary))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn group_scale<E: FontEngine>(
    cache: &mut ScaleRuleCache,
    index: usize,
    range: &PatchRangeSpec,
    font: &E,
    placement: &PlacementEngine,
    attr: &GlyphAttribute,
    codepoint: u32,
    y_padding: f64,
) -> PatchResult<Option<GroupScale>> {
    let Some(rules) = &range.scale_rules else {
        return Ok(None);
    };
    let resolved =
        cache.get_or_resolve(index, rules, font, placement, &attr.stretch, y_padding)?;
    Ok(resolved.lookup(codepoint).copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::EXIT_DATA;
    use crate::font_source::fixtures::{font_with, latin_font, rect_glyph, MemoryLoader};
    use crate::font_source::{GlyphHandle, UfoFont};
    use crate::geometry::CellDimensions;
    use crate::placement::{AttributeTable, CellMode};

    fn engine() -> PlacementEngine {
        let mut cell = CellDimensions::from_vertical(-200.0, 800.0);
        cell.set_width(600.0);
        PlacementEngine::new(cell, CellMode::Single, 1000.0)
    }

    fn icons() -> UfoFont {
        font_with(vec![
            rect_glyph("one", 0xE000, [0.0, 0.0, 1000.0, 1000.0], 1000.0),
            rect_glyph("two", 0xE001, [100.0, -100.0, 500.0, 900.0], 600.0),
            rect_glyph("three", 0xE002, [0.0, 0.0, 2000.0, 500.0], 2000.0),
        ])
    }

    fn range(name: &str, donor: &str, start: u32, end: u32) -> PatchRangeSpec {
        PatchRangeSpec {
            name: name.to_string(),
            enabled: true,
            donor: donor.to_string(),
            donor_start: start,
            donor_end: end,
            dest_start: None,
            exact: true,
            scale_rules: None,
            attributes: AttributeTable::new(GlyphAttribute::centered("pa")),
        }
    }

    fn patch(
        font: &mut UfoFont,
        loader: &mut MemoryLoader,
        ranges: &[PatchRangeSpec],
        careful: bool,
        diag: &mut Diagnostics,
    ) -> PatchResult<PatchSummary> {
        let essential = EssentialSet::compute(&*font);
        PatchOrchestrator::new(font, loader, engine(), &essential)
            .careful(careful)
            .run(ranges, diag)
    }

    #[test]
    fn monospaced_range_gets_cell_advance() {
        let mut font = latin_font(600.0);
        let mut loader = MemoryLoader::default().with("icons.ufo", icons());
        let mut diag = Diagnostics::new();
        let ranges = [range("Icons", "icons.ufo", 0xE000, 0xE002)];

        let summary = patch(&mut font, &mut loader, &ranges, false, &mut diag).unwrap();

        assert_eq!(summary.placed(), 3);
        for codepoint in 0xE000..=0xE002 {
            let glyph = font.glyph(codepoint).unwrap();
            assert_eq!(glyph.advance(), 600.0);
            let bounds = glyph.bounds().unwrap();
            assert!(bounds.x0 >= 0.0 && bounds.x1 <= 600.0, "{bounds:?}");
        }
        assert!(diag.mentions("Adding 3 Glyphs from Icons Set"));
    }

    #[test]
    fn sequential_ranges_pack_from_destination_start() {
        let mut font = latin_font(600.0);
        let mut loader = MemoryLoader::default().with("icons.ufo", icons());
        let mut diag = Diagnostics::new();
        let mut packed = range("Packed", "icons.ufo", 0xE000, 0xE002);
        packed.exact = false;
        packed.dest_start = Some(0xF500);

        patch(&mut font, &mut loader, &[packed], false, &mut diag).unwrap();

        assert!(!font.contains(0xE000));
        assert!((0xF500..=0xF502).all(|cp| font.contains(cp)));
    }

    #[test]
    fn essential_glyphs_are_never_overwritten() {
        let mut font = latin_font(600.0);
        let before = font.glyph(0x41).unwrap().bounds();
        let donor = font_with(vec![rect_glyph("A", 0x41, [0.0, 0.0, 50.0, 50.0], 100.0)]);
        let mut loader = MemoryLoader::default().with("letters.ufo", donor);
        let mut diag = Diagnostics::new();

        let summary = patch(
            &mut font,
            &mut loader,
            &[range("Letters", "letters.ufo", 0x41, 0x41)],
            false,
            &mut diag,
        )
        .unwrap();

        assert_eq!(summary.placed(), 0);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(font.glyph(0x41).unwrap().bounds(), before);
        assert!(diag.mentions("Found essential Glyph at 41"));
        assert!(!diag.has_warnings());
    }

    #[test]
    fn careful_mode_keeps_existing_glyphs() {
        let mut font = latin_font(600.0);
        font.insert_glyph(rect_glyph("mine", 0xE000, [0.0, 0.0, 10.0, 10.0], 600.0));
        let mut loader = MemoryLoader::default().with("icons.ufo", icons());
        let mut diag = Diagnostics::new();

        let summary = patch(
            &mut font,
            &mut loader,
            &[range("Icons", "icons.ufo", 0xE000, 0xE002)],
            true,
            &mut diag,
        )
        .unwrap();

        assert_eq!(summary.placed(), 2);
        assert_eq!(GlyphHandle::name(font.glyph(0xE000).unwrap()), "mine");
        assert!(diag.mentions("Found existing Glyph at E000"));
    }

    #[test]
    fn glyph_params_override_careful_mode() {
        let mut font = latin_font(600.0);
        font.insert_glyph(rect_glyph("mine", 0xE000, [0.0, 0.0, 10.0, 10.0], 600.0));
        let mut loader = MemoryLoader::default().with("icons.ufo", icons());
        let mut diag = Diagnostics::new();
        let mut icons = range("Icons", "icons.ufo", 0xE000, 0xE000);
        icons.attributes = AttributeTable::new(GlyphAttribute::centered("pa").careful(false));

        let summary = patch(&mut font, &mut loader, &[icons], true, &mut diag).unwrap();

        assert_eq!(summary.placed(), 1);
        assert_ne!(font.glyph(0xE000).unwrap().bounds().unwrap().width(), 10.0);
    }

    #[test]
    fn copying_a_whole_donor_is_careful() {
        let mut font = latin_font(600.0);
        font.insert_glyph(rect_glyph("mine", 0xE001, [0.0, 0.0, 10.0, 10.0], 600.0));
        let mut loader = MemoryLoader::default().with("custom.ufo", icons());
        let mut diag = Diagnostics::new();

        let summary = patch(
            &mut font,
            &mut loader,
            &[range("Custom", "custom.ufo", 0, 0)],
            false,
            &mut diag,
        )
        .unwrap();

        assert_eq!(summary.ranges[0].selected, 3);
        assert_eq!(summary.placed(), 2);
        assert_eq!(GlyphHandle::name(font.glyph(0xE001).unwrap()), "mine");
    }

    #[test]
    fn donor_stays_open_for_consecutive_ranges() {
        let mut font = latin_font(600.0);
        let other = font_with(vec![rect_glyph("x", 0xF000, [0.0, 0.0, 500.0, 500.0], 500.0)]);
        let mut loader = MemoryLoader::default()
            .with("icons.ufo", icons())
            .with("other.ufo", other);
        let mut diag = Diagnostics::new();
        let mut disabled = range("Disabled", "missing.ufo", 0xE000, 0xE000);
        disabled.enabled = false;
        let ranges = [
            range("First", "icons.ufo", 0xE000, 0xE000),
            range("Second", "icons.ufo", 0xE001, 0xE002),
            disabled,
            range("Third", "other.ufo", 0xF000, 0xF000),
        ];

        let summary = patch(&mut font, &mut loader, &ranges, false, &mut diag).unwrap();

        assert_eq!(loader.loads, vec!["icons.ufo", "other.ufo"]);
        assert_eq!(summary.ranges.len(), 3);
        assert_eq!(summary.placed(), 4);
    }

    #[test]
    fn missing_donor_is_a_data_error() {
        let mut font = latin_font(600.0);
        let mut loader = MemoryLoader::default();
        let mut diag = Diagnostics::new();

        let err = patch(
            &mut font,
            &mut loader,
            &[range("Icons", "icons.ufo", 0xE000, 0xE002)],
            false,
            &mut diag,
        )
        .unwrap_err();

        assert_eq!(err.exit_code(), EXIT_DATA);
    }

    #[test]
    fn dont_copy_rescales_existing_glyphs() {
        let mut font = latin_font(600.0);
        font.insert_glyph(rect_glyph("box", 0x2500, [0.0, 0.0, 1200.0, 1000.0], 1200.0));
        let mut loader = MemoryLoader::default().with("icons.ufo", icons());
        let mut diag = Diagnostics::new();
        let mut rescale = range("Rescale", "icons.ufo", 0xE000, 0xE000);
        rescale.exact = false;
        rescale.dest_start = Some(0x2500);
        rescale.attributes =
            AttributeTable::new(GlyphAttribute::centered("xy").dont_copy(true));

        let summary = patch(&mut font, &mut loader, &[rescale], false, &mut diag).unwrap();

        assert_eq!(summary.placed(), 1);
        let glyph = font.glyph(0x2500).unwrap();
        assert_eq!(GlyphHandle::name(glyph), "box");
        assert_eq!(glyph.advance(), 600.0);
        assert!(glyph.bounds().unwrap().width() <= 600.0);
        assert!(diag.mentions("Rescaling 1 Glyphs from Rescale Set"));
    }

    #[test]
    fn patching_an_alias_keeps_the_aliased_glyph() {
        let mut font = latin_font(600.0);
        let mut heart = rect_glyph("heart", 0x2665, [50.0, 0.0, 550.0, 600.0], 600.0);
        heart.codepoints.insert('\u{E001}');
        font.insert_glyph(heart);
        assert_eq!(font.primary_codepoint(0xE001), Some(0x2665));
        let mut loader = MemoryLoader::default().with("icons.ufo", icons());
        let mut diag = Diagnostics::new();

        let summary = patch(
            &mut font,
            &mut loader,
            &[range("Icons", "icons.ufo", 0xE000, 0xE002)],
            false,
            &mut diag,
        )
        .unwrap();

        assert_eq!(summary.placed(), 3);
        let heart = font.glyph(0x2665).unwrap();
        assert_eq!(GlyphHandle::name(heart), "heart");
        assert!(heart.codepoints.iter().all(|ch| ch != '\u{E001}'));
        let pasted = font.glyph(0xE001).unwrap();
        assert_eq!(GlyphHandle::name(pasted), "two");
        assert_eq!(pasted.codepoints.len(), 1);
        assert!(diag.mentions("Removing alternate unicode on E001 (E001)"));
    }
}
