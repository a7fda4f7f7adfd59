//! In-memory fonts shared by the unit tests

use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::{DonorLoader, UfoFont};
use norad::{Contour, ContourPoint, Font, Glyph, PointType};
use std::collections::BTreeMap;

pub fn rect_glyph(name: &str, codepoint: u32, rect: [f64; 4], advance: f64) -> Glyph {
    let [x0, y0, x1, y1] = rect;
    let mut glyph = Glyph::new(name);
    glyph.width = advance;
    glyph.codepoints.insert(char::from_u32(codepoint).unwrap());
    let point = |x, y| ContourPoint::new(x, y, PointType::Line, false, None, None);
    glyph.contours.push(Contour::new(
        vec![point(x0, y0), point(x1, y0), point(x1, y1), point(x0, y1)],
        None,
    ));
    glyph
}

pub fn font_with(glyphs: Vec<Glyph>) -> UfoFont {
    let mut font = UfoFont::default();
    for glyph in glyphs {
        font.insert_glyph(glyph);
    }
    font
}

/// A monospaced Latin font on a 1000 unit em, ascender 800 and descender
/// -200, every printable ASCII glyph `advance` wide
pub fn latin_font(advance: f64) -> UfoFont {
    let mut norad = Font::new();
    norad.font_info.ascender = Some(800.0);
    norad.font_info.descender = Some(-200.0);
    norad.font_info.cap_height = Some(700.0);
    let mut font = UfoFont::from_norad(norad);
    for codepoint in 0x21..=0x7E_u32 {
        let name = format!("g{codepoint:04X}");
        font.insert_glyph(rect_glyph(
            &name,
            codepoint,
            [50.0, 0.0, advance - 50.0, 700.0],
            advance,
        ));
    }
    let mut space = Glyph::new("space");
    space.width = advance;
    space.codepoints.insert(' ');
    font.insert_glyph(space);
    font
}

/// Donor loader over fonts kept in memory, recording every load
#[derive(Default)]
pub struct MemoryLoader {
    fonts: BTreeMap<String, UfoFont>,
    pub loads: Vec<String>,
}

impl MemoryLoader {
    pub fn with(mut self, file_name: &str, font: UfoFont) -> Self {
        self.fonts.insert(file_name.to_string(), font);
        self
    }
}

impl DonorLoader<UfoFont> for MemoryLoader {
    fn load(&mut self, file_name: &str) -> PatchResult<UfoFont> {
        self.loads.push(file_name.to_string());
        self.fonts.get(file_name).cloned().ok_or_else(|| {
            PatchError::data(format!("Can not find symbol source for {file_name}"))
        })
    }
}
