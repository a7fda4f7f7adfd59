//! The built-in table of symbol ranges
//!
//! Every entry names a donor font in the glyph directory, the donor
//! codepoints to take and where they go, plus scale rules and placement
//! attributes for the symbols of that set.

use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::format_codepoint;
use crate::patch::options::PatchOptions;
use crate::placement::{
    AttributeTable, CodepointSet, GlyphAttribute, HAlign, ScaleGroup, ScaleRules, ShiftMode,
    VAlign,
};

/// First and last codepoint of the box drawing block
pub const BOX_DRAWING: (u32, u32) = (0x2500, 0x259F);

/// One declared range of glyphs to copy
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRangeSpec {
    pub name: String,
    pub enabled: bool,
    /// Donor file, relative to the glyph directory
    pub donor: String,
    pub donor_start: u32,
    pub donor_end: u32,
    /// Where sequential copies start, defaults to `donor_start`
    pub dest_start: Option<u32>,
    /// Keep the donor codepoints instead of packing glyphs from `dest_start`
    pub exact: bool,
    pub scale_rules: Option<ScaleRules>,
    pub attributes: AttributeTable,
}

impl PatchRangeSpec {
    pub fn dest_start(&self) -> u32 {
        self.dest_start.unwrap_or(self.donor_start)
    }

    /// A zero start selects every glyph of the donor
    pub fn copies_everything(&self) -> bool {
        self.donor_start == 0
    }

    pub fn validate(&self) -> PatchResult<()> {
        if self.donor_end < self.donor_start {
            return Err(PatchError::configuration(format!(
                "Range '{}' ends at {} before it starts at {}",
                self.name,
                format_codepoint(self.donor_end),
                format_codepoint(self.donor_start)
            )));
        }
        if self.donor.is_empty() {
            return Err(PatchError::configuration(format!(
                "Range '{}' has no donor font",
                self.name
            )));
        }
        Ok(())
    }
}

struct Range {
    name: &'static str,
    enabled: bool,
    donor: &'static str,
    exact: bool,
    start: u32,
    end: u32,
    dest: Option<u32>,
}

impl Range {
    fn with(self, scale_rules: Option<ScaleRules>, attributes: AttributeTable) -> PatchRangeSpec {
        PatchRangeSpec {
            name: self.name.to_string(),
            enabled: self.enabled,
            donor: self.donor.to_string(),
            donor_start: self.start,
            donor_end: self.end,
            dest_start: self.dest,
            exact: self.exact,
            scale_rules,
            attributes,
        }
    }
}

fn attr(align: HAlign, valign: VAlign, stretch: &str) -> GlyphAttribute {
    GlyphAttribute::new(align, valign, stretch)
}

fn left(stretch: &str) -> GlyphAttribute {
    attr(HAlign::Left, VAlign::Center, stretch)
}

fn right(stretch: &str) -> GlyphAttribute {
    attr(HAlign::Right, VAlign::Center, stretch)
}

fn center(stretch: &str) -> GlyphAttribute {
    attr(HAlign::Center, VAlign::Center, stretch)
}

fn default_attributes() -> AttributeTable {
    AttributeTable::new(center("pa"))
}

fn powerline_attributes() -> AttributeTable {
    AttributeTable::new(center("^pa"))
        // arrow tips
        .with(0xE0B0, left("^xy").overlap(0.06).xy_ratio(0.7))
        .with(0xE0B1, left("^xy").xy_ratio(0.7))
        .with(0xE0B2, right("^xy").overlap(0.06).xy_ratio(0.7))
        .with(0xE0B3, right("^xy").xy_ratio(0.7))
        // inverse arrow tips
        .with(0xE0D6, left("^xy").overlap(0.05).xy_ratio(0.7))
        .with(0xE0D7, right("^xy").overlap(0.05).xy_ratio(0.7))
        // rounded arcs
        .with(0xE0B4, left("^xy").overlap(0.06).xy_ratio(0.59))
        .with(0xE0B5, left("^xy").xy_ratio(0.5))
        .with(0xE0B6, right("^xy").overlap(0.06).xy_ratio(0.59))
        .with(0xE0B7, right("^xy").xy_ratio(0.5))
        // bottom triangles
        .with(0xE0B8, left("^xy").overlap(0.05))
        .with(0xE0B9, left("^xy"))
        .with(0xE0BA, right("^xy").overlap(0.05))
        .with(0xE0BB, right("^xy"))
        // top triangles
        .with(0xE0BC, left("^xy").overlap(0.05))
        .with(0xE0BD, left("^xy"))
        .with(0xE0BE, right("^xy").overlap(0.05))
        .with(0xE0BF, right("^xy"))
        // flames
        .with(0xE0C0, left("^xy2").overlap(0.05))
        .with(0xE0C1, left("^xy2"))
        .with(0xE0C2, right("^xy2").overlap(0.05))
        .with(0xE0C3, right("^xy2"))
        // small squares
        .with(0xE0C4, left("^xy2").overlap(-0.03).xy_ratio(0.86))
        .with(0xE0C5, right("^xy2").overlap(-0.03).xy_ratio(0.86))
        // bigger squares
        .with(0xE0C6, left("^xy2").overlap(-0.03).xy_ratio(0.78))
        .with(0xE0C7, right("^xy2").overlap(-0.03).xy_ratio(0.78))
        // waveform
        .with(0xE0C8, left("^xy2").overlap(0.05))
        .with(0xE0CA, right("^xy2").overlap(0.05))
        // hexagons
        .with(0xE0CC, left("^xy2").overlap(0.02).xy_ratio(0.85))
        .with(0xE0CD, left("^xy2").xy_ratio(0.865))
        // legos
        .with(0xE0CE, left("^pa"))
        .with(0xE0CF, center("^pa"))
        .with(0xE0D0, left("^pa"))
        .with(0xE0D1, left("^pa"))
        // top and bottom trapezoid
        .with(0xE0D2, left("^xy").overlap(0.02).xy_ratio(0.7))
        .with(0xE0D4, right("^xy").overlap(0.02).xy_ratio(0.7))
}

fn trigraph_attributes() -> AttributeTable {
    AttributeTable::new(center("pa1!").overlap(-0.10).careful(true))
}

fn fontawesome_attributes() -> AttributeTable {
    // sort arrows keep their vertical position
    let unaligned = attr(HAlign::Center, VAlign::None, "pa");
    default_attributes().with_range(0xF0DC..=0xF0DE, unaligned)
}

fn heavy_bracket_attributes() -> AttributeTable {
    AttributeTable::new(center("^pa1!").y_padding(0.3).careful(true))
}

fn box_attributes() -> AttributeTable {
    AttributeTable::new(center("^xy").overlap(0.02))
}

fn progress_attributes() -> AttributeTable {
    // circles by default, squares listed
    AttributeTable::new(center("^pa1!").overlap(-0.03).careful(true))
        .with(0xEE00, right("^xy").overlap(0.05).careful(true))
        .with(0xEE01, center("^xy").overlap(0.10).careful(true))
        .with(0xEE02, left("^xy").overlap(0.05).careful(true))
        .with(0xEE03, right("^xy").overlap(0.05).careful(true))
        .with(0xEE04, center("^xy").overlap(0.10).careful(true))
        .with(0xEE05, left("^xy").overlap(0.05).careful(true))
}

fn custom_attributes(careful: bool) -> AttributeTable {
    AttributeTable::new(center("pa").careful(careful))
}

fn group(sets: &[CodepointSet]) -> ScaleGroup {
    ScaleGroup::new(sets.to_vec())
}

use CodepointSet::Single as S;

fn r(start: u32, end: u32) -> CodepointSet {
    CodepointSet::range(start, end)
}

fn box_scale_rules() -> ScaleRules {
    ScaleRules::new(
        ShiftMode::XY,
        vec![
            group(&[r(0x2500, 0x2570), r(0x2574, 0x257F)]),
            ScaleGroup::range(0x2571, 0x2573),
            ScaleGroup::range(0x2580, 0x259F),
        ],
    )
}

fn codicon_scale_rules() -> ScaleRules {
    ScaleRules::new(
        ShiftMode::XY,
        vec![
            ScaleGroup::list(&[0xEA61, 0xEB13]),
            ScaleGroup::range(0xEAB4, 0xEAB7),
            group(&[S(0xEA7D), r(0xEA99, 0xEAA1), S(0xEBCB)]),
            ScaleGroup::list(&[0xEAA2, 0xEB9A, 0xEC08, 0xEC09]),
            ScaleGroup::range(0xEAD4, 0xEAD6),
            ScaleGroup::list(&[0xEB43, 0xEC0B, 0xEC0C]),
            ScaleGroup::range(0xEB6E, 0xEB71),
            group(&[r(0xEB89, 0xEB8B), S(0xEC07)]),
            ScaleGroup::range(0xEBD5, 0xEBD7),
        ],
    )
}

fn fontawesome_scale_rules() -> ScaleRules {
    ScaleRules::new(
        ShiftMode::Unchecked,
        vec![
            ScaleGroup::list(&[0xF005, 0xF006, 0xF089]),
            ScaleGroup::range(0xF026, 0xF028),
            ScaleGroup::range(0xF02B, 0xF02C),
            ScaleGroup::range(0xF031, 0xF035),
            ScaleGroup::range(0xF044, 0xF046),
            ScaleGroup::range(0xF048, 0xF052),
            ScaleGroup::range(0xF060, 0xF063),
            ScaleGroup::list(&[0xF053, 0xF054, 0xF077, 0xF078]),
            ScaleGroup::range(0xF07D, 0xF07E),
            ScaleGroup::range(0xF0A4, 0xF0A7),
            ScaleGroup::list(&[0xF0D7, 0xF0D8, 0xF0D9, 0xF0DA, 0xF0DC, 0xF0DD, 0xF0DE]),
            ScaleGroup::range(0xF100, 0xF107),
            ScaleGroup::range(0xF130, 0xF131),
            ScaleGroup::range(0xF141, 0xF142),
            ScaleGroup::range(0xF153, 0xF15A),
            ScaleGroup::range(0xF175, 0xF178),
            ScaleGroup::range(0xF182, 0xF183),
            ScaleGroup::range(0xF221, 0xF22D),
            ScaleGroup::range(0xF255, 0xF25B),
        ],
    )
}

fn heavy_bracket_scale_rules() -> ScaleRules {
    ScaleRules::new(ShiftMode::XY, vec![ScaleGroup::range(0x276C, 0x2771)])
}

fn octicon_scale_rules() -> ScaleRules {
    ScaleRules::new(
        ShiftMode::Unchecked,
        vec![
            group(&[
                r(0xF03D, 0xF040),
                S(0xF019),
                S(0xF030),
                S(0xF04A),
                S(0xF051),
                S(0xF071),
                S(0xF08C),
            ]),
            ScaleGroup::list(&[
                0xF0E7, 0xF044, 0xF05A, 0xF05B, 0xF0AA, 0xF052, 0xF053, 0xF296, 0xF2F0, 0xF078,
                0xF0A2, 0xF0A3, 0xF0A4, 0xF0CA, 0xF081, 0xF092,
            ]),
            ScaleGroup::list(&[0xF09C, 0xF09F, 0xF0DE]),
            ScaleGroup::range(0xF2C2, 0xF2C5),
            ScaleGroup::list(&[0xF07B, 0xF0A1, 0xF0D6, 0xF306]),
        ],
    )
}

fn progress_scale_rules() -> ScaleRules {
    // EDFF is a helper glyph that only sets the vertical padding
    ScaleRules::new(
        ShiftMode::XY,
        vec![
            ScaleGroup::range(0xEDFF, 0xEE05),
            ScaleGroup::range(0xEE06, 0xEE0B),
        ],
    )
}

fn weather_scale_rules() -> ScaleRules {
    ScaleRules::new(
        ShiftMode::Unchecked,
        vec![
            ScaleGroup::list(&[0xF03C, 0xF042, 0xF045]),
            ScaleGroup::list(&[
                0xF043, 0xF044, 0xF048, 0xF04B, 0xF04C, 0xF04D, 0xF057, 0xF058, 0xF087, 0xF088,
            ]),
            ScaleGroup::range(0xF053, 0xF055),
            group(&[r(0xF059, 0xF061), S(0xF0B1)]),
            ScaleGroup::range(0xF089, 0xF094),
            ScaleGroup::range(0xF095, 0xF0B0),
            ScaleGroup::range(0xF0B7, 0xF0C3),
            ScaleGroup::list(&[0xF06E, 0xF070]),
            ScaleGroup::list(&[0xF051, 0xF052, 0xF0C9, 0xF0CA, 0xF072]),
            group(&[S(0xF049), S(0xF056), S(0xF071), r(0xF073, 0xF07C), S(0xF08A)]),
            // Glyphs of earlier groups keep that scale, but still widen
            // this group's combined box
            group(&[
                r(0xF000, 0xF041),
                r(0xF064, 0xF06D),
                r(0xF07D, 0xF083),
                r(0xF085, 0xF086),
                r(0xF0B2, 0xF0B6),
            ]),
        ],
    )
}

/// The ranges patched into a font, in patching order
pub fn builtin_patch_set(options: &PatchOptions, box_enabled: bool) -> Vec<PatchRangeSpec> {
    let sets = &options.symbols;
    let range = |name, enabled, donor, exact, start, end, dest| Range {
        name,
        enabled,
        donor,
        exact,
        start,
        end,
        dest,
    };

    let mut ranges = vec![
        range("Seti-UI + Custom", true, "original-source.ufo", false, 0xE4FA, 0xE5FF, Some(0xE5FA))
            .with(None, default_attributes()),
        range("Heavy Angle Brackets", true, "extraglyphs.ufo", true, 0x276C, 0x2771, None)
            .with(Some(heavy_bracket_scale_rules()), heavy_bracket_attributes()),
        range("Box Drawing", box_enabled, "extraglyphs.ufo", true, BOX_DRAWING.0, BOX_DRAWING.1, None)
            .with(Some(box_scale_rules()), box_attributes()),
        range("Progress Indicators", true, "extraglyphs.ufo", true, 0xEE00, 0xEE0B, None)
            .with(Some(progress_scale_rules()), progress_attributes()),
        range("Devicons", true, "devicons/devicons.ufo", false, 0xE600, 0xE7EF, Some(0xE700))
            .with(None, default_attributes()),
    ];

    let powerline = "powerline-symbols/PowerlineSymbols.ufo";
    for (start, end) in [(0xE0A0, 0xE0A2), (0xE0B0, 0xE0B3)] {
        ranges.push(
            range("Powerline Symbols", sets.powerline, powerline, true, start, end, None)
                .with(None, powerline_attributes()),
        );
    }

    let powerline_extra = "powerline-extra/PowerlineExtraSymbols.ufo";
    for (start, end) in [(0xE0A3, 0xE0A3), (0xE0B4, 0xE0C8), (0xE0CA, 0xE0CA), (0xE0CC, 0xE0D7)] {
        ranges.push(
            range("Powerline Extra Symbols", sets.powerline_extra, powerline_extra, true, start, end, None)
                .with(None, powerline_attributes()),
        );
    }
    ranges.push(
        range("Powerline Extra Symbols", sets.powerline_extra, powerline_extra, true, 0x2630, 0x2630, None)
            .with(None, trigraph_attributes()),
    );

    ranges.push(
        range("Pomicons", sets.pomicons, "pomicons/Pomicons.ufo", true, 0xE000, 0xE00A, None)
            .with(None, default_attributes()),
    );
    ranges.push(
        range("Font Awesome", sets.fontawesome, "font-awesome/FontAwesome.ufo", true, 0xED00, 0xF2FF, None)
            .with(Some(fontawesome_scale_rules()), fontawesome_attributes()),
    );
    ranges.push(
        range(
            "Font Awesome Extension",
            sets.fontawesome_extension,
            "font-awesome-extension.ufo",
            false,
            0xE000,
            0xE0A9,
            Some(0xE200),
        )
        .with(None, default_attributes()),
    );

    let power = "Unicode_IEC_symbol_font.ufo";
    for (start, end) in [(0x23FB, 0x23FE), (0x2B58, 0x2B58)] {
        ranges.push(
            range("Power Symbols", sets.power_symbols, power, true, start, end, None)
                .with(None, default_attributes()),
        );
    }

    ranges.push(
        range(
            "Material",
            sets.material,
            "materialdesign/MaterialDesignIconsDesktop.ufo",
            true,
            0xF0001,
            0xF1AF0,
            None,
        )
        .with(None, default_attributes()),
    );
    ranges.push(
        range(
            "Weather Icons",
            sets.weather,
            "weather-icons/weathericons-regular-webfont.ufo",
            false,
            0xF000,
            0xF0EB,
            Some(0xE300),
        )
        .with(Some(weather_scale_rules()), default_attributes()),
    );
    ranges.push(
        range("Font Logos", sets.fontlogos, "font-logos.ufo", true, 0xF300, 0xF381, None)
            .with(None, default_attributes()),
    );

    let octicons = "octicons/octicons.ufo";
    for (exact, start, end, dest) in [
        (false, 0xF000, 0xF105, Some(0xF400)),
        (true, 0x2665, 0x2665, None),
        (true, 0x26A1, 0x26A1, None),
        (false, 0xF27C, 0xF306, Some(0xF4A9)),
    ] {
        ranges.push(
            range("Octicons", sets.octicons, octicons, exact, start, end, dest)
                .with(Some(octicon_scale_rules()), default_attributes()),
        );
    }

    ranges.push(
        range("Codicons", sets.codicons, "codicons/codicon.ufo", true, 0xEA60, 0xEC1E, None)
            .with(Some(codicon_scale_rules()), default_attributes()),
    );

    if let Some(custom) = &options.custom {
        ranges.push(PatchRangeSpec {
            name: "Custom".to_string(),
            enabled: true,
            donor: custom.clone(),
            donor_start: 0,
            donor_end: 0,
            dest_start: None,
            exact: true,
            scale_rules: None,
            attributes: custom_attributes(options.careful),
        });
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::options::SymbolSets;

    #[test]
    fn default_run_enables_base_sets_only() {
        let ranges = builtin_patch_set(&PatchOptions::default(), false);
        let enabled: Vec<&str> = ranges
            .iter()
            .filter(|range| range.enabled)
            .map(|range| range.name.as_str())
            .collect();
        assert_eq!(
            enabled,
            vec!["Seti-UI + Custom", "Heavy Angle Brackets", "Progress Indicators", "Devicons"]
        );
    }

    #[test]
    fn complete_run_enables_every_set() {
        let options = PatchOptions {
            symbols: SymbolSets::all(),
            ..PatchOptions::default()
        };
        let ranges = builtin_patch_set(&options, true);
        assert!(ranges.iter().all(|range| range.enabled));
        assert!(ranges.iter().all(|range| range.validate().is_ok()));
        assert!(ranges.iter().any(|range| range.name == "Box Drawing"));
    }

    #[test]
    fn custom_donor_copies_everything() {
        let options = PatchOptions {
            custom: Some("extra/MySymbols.ufo".to_string()),
            careful: true,
            ..PatchOptions::default()
        };
        let ranges = builtin_patch_set(&options, false);
        let custom = ranges.last().unwrap();
        assert_eq!(custom.donor, "extra/MySymbols.ufo");
        assert!(custom.copies_everything());
        assert_eq!(custom.attributes.default_attribute().params.careful, Some(true));
    }

    #[test]
    fn sequential_ranges_have_destinations() {
        let ranges = builtin_patch_set(&PatchOptions::default(), false);
        let devicons = ranges.iter().find(|range| range.name == "Devicons").unwrap();
        assert!(!devicons.exact);
        assert_eq!(devicons.dest_start(), 0xE700);
        let heavy = ranges.iter().find(|range| range.name == "Heavy Angle Brackets").unwrap();
        assert_eq!(heavy.dest_start(), 0x276C);
    }

    #[test]
    fn powerline_attributes_override_arrows() {
        let attributes = powerline_attributes();
        let arrow = attributes.resolve(0xE0B0);
        assert_eq!(arrow.align, HAlign::Left);
        assert_eq!(arrow.params.overlap, Some(0.06));
        assert_eq!(arrow.params.xy_ratio, Some(0.7));
        assert!(attributes.resolve(0xE0A0).stretch.preserve_aspect);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let mut range = builtin_patch_set(&PatchOptions::default(), false).remove(0);
        range.donor_end = range.donor_start - 1;
        assert!(range.validate().is_err());
    }
}
