//! Monospace detection and the Panose proportion flag

use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::{FontEngine, GlyphHandle};
use crate::logging::Diagnostics;

/// The ten Panose classification digits of the OS/2 table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Panose(pub [u8; 10]);

impl Panose {
    pub fn family_kind(&self) -> u8 {
        self.0[0]
    }

    /// Fourth digit, the proportion for Latin text families
    pub fn proportion(&self) -> u8 {
        self.0[3]
    }

    pub fn monospace_state(&self) -> PanoseMonospace {
        match (self.family_kind(), self.proportion()) {
            (kind, _) if !(2..=5).contains(&kind) => PanoseMonospace::Invalid,
            (2, 9) | (3, 3) => PanoseMonospace::Monospaced,
            _ => PanoseMonospace::Proportional,
        }
    }
}

/// What the Panose digits claim about the font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanoseMonospace {
    Proportional,
    Monospaced,
    Invalid,
}

impl PanoseMonospace {
    fn describe(self, panose: Panose) -> String {
        match self {
            PanoseMonospace::Proportional => "Panose says \"not monospaced\"".to_string(),
            PanoseMonospace::Monospaced => "Panose says \"monospaced\"".to_string(),
            PanoseMonospace::Invalid => format!("Panose is invalid ({:?})", panose.0),
        }
    }
}

fn proportion_name(value: u8) -> String {
    match value {
        0 => "Any".into(),
        1 => "No Fit".into(),
        2 => "Old Style".into(),
        3 => "Modern".into(),
        4 => "Even Width".into(),
        5 => "Extended".into(),
        6 => "Condensed".into(),
        7 => "Very Extended".into(),
        8 => "Very Condensed".into(),
        9 => "Monospaced".into(),
        other => format!("??? {other}"),
    }
}

/// Wide and slim glyphs compared by the spot check: I M W a i m and period
const SPOT_CHECK: [u32; 7] = [0x49, 0x4D, 0x57, 0x61, 0x69, 0x6D, 0x2E];

/// Spot check the advance widths of a few glyphs.
///
/// Returns whether the font looks monospaced, and the first glyph that
/// breaks the pattern. If any probe glyph is missing the Panose digits are
/// believed instead.
pub fn is_monospaced<E: FontEngine>(font: &E) -> (bool, Option<u32>) {
    let mut reference: Option<f64> = None;
    for codepoint in SPOT_CHECK {
        let Some(glyph) = font.glyph(codepoint) else {
            let mono = font.panose().monospace_state() == PanoseMonospace::Monospaced;
            return (mono, None);
        };
        let advance = glyph.advance();
        let Some(width) = reference else {
            reference = Some(advance);
            continue;
        };
        if advance == width {
            continue;
        }
        // some fonts draw 'i' and '.' narrower than the rest
        if codepoint == 0x69 || codepoint == 0x2E {
            if width > advance {
                continue;
            }
            let ink = glyph.bounds().map(|rect| rect.width()).unwrap_or(0.0);
            if width > ink {
                continue;
            }
        }
        return (false, Some(codepoint));
    }
    (true, None)
}

/// Largest or smallest advance in the basic or extended Latin range
fn advance_width<E: FontEngine>(font: &E, extended: bool, minimum: bool) -> f64 {
    let range = if extended { 0x7F..0x17F } else { 0x21..0x7E };
    let mut width = 0.0;
    for codepoint in range.filter(|cp| !(0x7F..0xBF).contains(cp)) {
        let Some(glyph) = font.glyph(codepoint) else {
            continue;
        };
        let advance = glyph.advance();
        if width == 0.0 || (minimum && advance < width) || (!minimum && advance > width) {
            width = advance;
        }
    }
    width
}

pub fn advance_width_report<E: FontEngine>(font: &E) -> String {
    format!(
        "Advance widths (base/extended): {} - {} / {} - {}",
        advance_width(font, false, true),
        advance_width(font, false, false),
        advance_width(font, true, true),
        advance_width(font, true, false)
    )
}

/// Set the Panose digits to monospaced when they are unset or Latin text
pub fn force_panose_monospaced<E: FontEngine>(font: &mut E, diag: &mut Diagnostics) {
    let mut panose = font.panose();
    if panose.0[0] == 0 {
        panose.0[0] = 2;
        diag.info("Setting Panose 'Family Kind' to 'Latin Text and Display' (was 'Any')");
    }
    if panose.0[0] == 2 && panose.0[3] != 9 {
        diag.info(format!(
            "Setting Panose 'Proportion' to 'Monospaced' (was '{}')",
            proportion_name(panose.0[3])
        ));
        panose.0[3] = 9;
    }
    if panose != font.panose() {
        font.set_panose(panose);
    }
}

/// Check the source font's monospacing before patching.
///
/// Returns whether the source is monospaced by measurement. Forcing a
/// monospaced result on a font that is not requires `force_mono >= 2`.
pub fn assert_monospace<E: FontEngine>(
    font: &mut E,
    proportional_target: bool,
    force_mono: u8,
    diag: &mut Diagnostics,
) -> PatchResult<bool> {
    let (width_mono, offending) = is_monospaced(font);
    if proportional_target {
        return Ok(width_mono);
    }

    let panose = font.panose();
    let panose_state = panose.monospace_state();
    diag.debug(format!(
        "Monospace check: {}; glyph-width-mono {}",
        panose_state.describe(panose),
        width_mono
    ));
    let disagree = matches!(
        (width_mono, panose_state),
        (true, PanoseMonospace::Proportional) | (false, PanoseMonospace::Monospaced)
    );
    if disagree {
        diag.warn("Monospaced check: Panose assumed to be wrong");
        diag.warn(format!(
            "Monospaced check: {} and {}",
            advance_width_report(font),
            panose_state.describe(panose)
        ));
    }

    if force_mono > 0 && !width_mono {
        let offending = offending
            .map(|cp| format!(" - offending char: {cp:X}"))
            .unwrap_or_default();
        diag.warn(format!(
            "Sourcefont is not monospaced - forcing to monospace not advisable, results might be useless{offending}"
        ));
        if force_mono <= 1 {
            return Err(PatchError::data(
                "Font will not be patched! Give --mono (or -s) twice to force patching",
            ));
        }
    }

    if width_mono {
        force_panose_monospaced(font, diag);
    }
    Ok(width_mono)
}
