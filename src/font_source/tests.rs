//! UFO engine tests on in-memory fonts

use super::metrics::{detect_cell_width, legacy_average_width};
use super::monospace::{assert_monospace, is_monospaced};
use super::*;
use crate::geometry::CellDimensions;
use crate::logging::Diagnostics;
use norad::{AffineTransform, Component, Contour, ContourPoint, Glyph, PointType};

fn point(x: f64, y: f64) -> ContourPoint {
    ContourPoint::new(x, y, PointType::Line, false, None, None)
}

fn rect_glyph(name: &str, codepoints: &[char], rect: [f64; 4], advance: f64) -> Glyph {
    let [x0, y0, x1, y1] = rect;
    let mut glyph = Glyph::new(name);
    glyph.width = advance;
    for ch in codepoints {
        glyph.codepoints.insert(*ch);
    }
    glyph.contours.push(Contour::new(
        vec![point(x0, y0), point(x1, y0), point(x1, y1), point(x0, y1)],
        None,
    ));
    glyph
}

fn component(base: &str, dx: f64, dy: f64) -> Component {
    let base: norad::Name = base.parse().unwrap();
    let transform = AffineTransform {
        x_scale: 1.0,
        xy_scale: 0.0,
        yx_scale: 0.0,
        y_scale: 1.0,
        x_offset: dx,
        y_offset: dy,
    };
    Component::new(base, transform, None)
}

/// A small monospaced Latin font with 600 unit advances
fn mono_font() -> UfoFont {
    let mut font = UfoFont::default();
    for ch in ('!'..='~').chain(std::iter::once(' ')) {
        let name = format!("g{:04X}", ch as u32);
        font.insert_glyph(rect_glyph(&name, &[ch], [50.0, 0.0, 550.0, 700.0], 600.0));
    }
    font
}

#[test]
fn cmap_resolves_alternate_encodings() {
    let mut font = UfoFont::default();
    font.insert_glyph(rect_glyph("A", &['A', '\u{391}'], [0.0, 0.0, 500.0, 700.0], 600.0));

    assert!(font.contains(0x41));
    assert!(font.contains(0x391));
    assert_eq!(font.primary_codepoint(0x391), Some(0x41));
    assert_eq!(font.alternate_codepoints(0x41), vec![0x391]);
    assert_eq!(font.codepoints(), vec![0x41, 0x391]);

    let removed = font.clear_alternates(0x41);
    assert_eq!(removed, vec![0x391]);
    assert!(!font.contains(0x391));
    assert!(font.contains(0x41));
}

#[test]
fn clearing_an_alias_frees_only_that_slot() {
    let mut font = UfoFont::default();
    font.insert_glyph(rect_glyph("A", &['A', '\u{391}'], [0.0, 0.0, 500.0, 700.0], 600.0));

    let removed = font.clear_alternates(0x391);
    assert_eq!(removed, vec![0x391]);
    assert!(!font.contains(0x391));
    assert_eq!(font.primary_codepoint(0x41), Some(0x41));
    assert_eq!(font.glyph(0x41).unwrap().codepoints.len(), 1);
}

#[test]
fn paste_renames_on_collision_and_replaces_slot() {
    let mut font = UfoFont::default();
    font.insert_glyph(rect_glyph("bolt", &['A'], [0.0, 0.0, 10.0, 10.0], 600.0));
    font.insert_glyph(rect_glyph("old", &['\u{E0A0}'], [0.0, 0.0, 10.0, 10.0], 600.0));

    let donor = rect_glyph("bolt", &['\u{F0E7}'], [0.0, 0.0, 300.0, 300.0], 1000.0);
    font.paste_glyph(0xE0A0, &donor);

    let pasted = font.glyph(0xE0A0).unwrap();
    assert_eq!(GlyphHandle::name(pasted), "uniE0A0");
    assert_eq!(pasted.advance(), 1000.0);
    assert!(font.glyph_by_name("old").is_none());
    assert_eq!(GlyphHandle::name(font.glyph(0x41).unwrap()), "bolt");
    assert!(!font.contains(0xF0E7));
}

#[test]
fn create_glyph_uses_codepoint_name() {
    let mut font = UfoFont::default();
    font.create_glyph(0x1F600);
    let glyph = font.glyph(0x1F600).unwrap();
    assert_eq!(GlyphHandle::name(glyph), "u1F600");
    assert_eq!(glyph.bounds(), None);
}

#[test]
fn copy_decomposes_nested_components() {
    let mut font = UfoFont::default();
    font.insert_glyph(rect_glyph("dot", &[], [0.0, 0.0, 100.0, 100.0], 200.0));
    let mut pair = Glyph::new("pair");
    pair.components.push(component("dot", 0.0, 0.0));
    pair.components.push(component("dot", 300.0, 0.0));
    font.insert_glyph(pair);
    let mut stack = Glyph::new("stack");
    stack.codepoints.insert('\u{E000}');
    stack.components.push(component("pair", 0.0, 500.0));
    font.insert_glyph(stack);

    let copy = font.copy_glyph(0xE000).unwrap();
    assert!(copy.components.is_empty());
    assert_eq!(copy.contours.len(), 2);
    let bounds = copy.bounds().unwrap();
    assert_eq!(bounds.x0, 0.0);
    assert_eq!(bounds.x1, 400.0);
    assert_eq!(bounds.y0, 500.0);
    assert_eq!(bounds.y1, 600.0);
}

#[test]
fn component_cycles_do_not_hang_decomposition() {
    let mut font = UfoFont::default();
    let mut a = Glyph::new("a.cycle");
    a.codepoints.insert('\u{E001}');
    a.components.push(component("b.cycle", 0.0, 0.0));
    let mut b = Glyph::new("b.cycle");
    b.components.push(component("a.cycle", 0.0, 0.0));
    font.insert_glyph(a);
    font.insert_glyph(b);

    let copy = font.copy_glyph(0xE001).unwrap();
    assert!(copy.contours.is_empty());
}

#[test]
fn transform_and_round() {
    let mut glyph = rect_glyph("x", &[], [0.0, 0.0, 101.0, 51.0], 200.0);
    glyph.transform(kurbo::Affine::scale(0.5));
    glyph.round_coordinates();
    let bounds = glyph.bounds().unwrap();
    assert_eq!(bounds.x1, 51.0);
    assert_eq!(bounds.y1, 26.0);
}

#[test]
fn negative_bearings_are_removed() {
    let mut glyph = rect_glyph("x", &[], [-20.0, 0.0, 630.0, 10.0], 600.0);
    glyph.remove_negative_bearings();
    let bounds = glyph.bounds().unwrap();
    assert_eq!(bounds.x0, 0.0);
    assert_eq!(glyph.advance(), 650.0);
    assert_eq!(glyph.right_side_bearing(), 0.0);
}

#[test]
fn vertical_metrics_round_trip() {
    let mut font = UfoFont::default();
    let metrics = VerticalMetrics {
        hhea_ascent: 900,
        hhea_descent: -300,
        hhea_line_gap: 0,
        typo_ascent: 900,
        typo_descent: -300,
        typo_line_gap: 0,
        win_ascent: 900,
        win_descent: 300,
        use_typo_metrics: true,
    };
    font.set_vertical_metrics(&metrics);
    assert_eq!(font.vertical_metrics(), metrics);

    let mut cleared = metrics;
    cleared.use_typo_metrics = false;
    font.set_vertical_metrics(&cleared);
    assert!(!font.vertical_metrics().use_typo_metrics);
}

#[test]
fn empty_font_has_zero_metrics() {
    let font = UfoFont::default();
    assert_eq!(font.vertical_metrics().line_spacing().hhea, 0);
    assert_eq!(font.ascent(), 800.0);
    assert_eq!(font.descent(), 200.0);
}

#[test]
fn rescaling_the_em() {
    let mut font = UfoFont::default();
    font.insert_glyph(rect_glyph("box", &['\u{E000}'], [0.0, 0.0, 1000.0, 1000.0], 1000.0));
    font.set_units_per_em(2000.0);
    assert_eq!(font.units_per_em(), 2000.0);
    let glyph = font.glyph(0xE000).unwrap();
    assert_eq!(glyph.advance(), 2000.0);
    assert_eq!(glyph.bounds().unwrap().x1, 2000.0);
}

#[test]
fn panose_round_trip() {
    let mut font = UfoFont::default();
    assert_eq!(font.panose(), Panose::default());
    let panose = Panose([2, 11, 6, 9, 2, 2, 2, 2, 2, 4]);
    font.set_panose(panose);
    assert_eq!(font.panose(), panose);
}

#[test]
fn substitution_partners_resolve_to_codepoints() {
    let mut font = mono_font();
    font.insert_glyph(rect_glyph("f_i", &['\u{FB01}'], [0.0, 0.0, 500.0, 700.0], 600.0));
    font.set_features("feature liga { sub g0066 g0069 by f_i; } liga;");

    let mut partners = font.substitution_partners(0xFB01);
    partners.sort_unstable();
    assert_eq!(partners, vec![0x66, 0x69]);

    assert_eq!(font.remove_substitutions(0x66), 1);
    assert!(font.substitution_partners(0xFB01).is_empty());
}

#[test]
fn remove_lookup_reports_missing_lookups() {
    let mut font = UfoFont::default();
    font.set_features("lookup LIGS { sub a b by c; } LIGS;");
    assert!(font.remove_lookup("LIGS").is_ok());
    assert!(font.remove_lookup("LIGS").is_err());
}

#[test]
fn rehint_counts_matching_glyphs() {
    let mut font = mono_font();
    let patterns = vec![regex::Regex::new("^(?:g004[1-3])$").unwrap()];
    assert_eq!(font.rehint(&patterns), 3);
}

#[test]
fn essential_closure_follows_links_and_terminates_on_cycles() {
    let mut font = mono_font();
    // f_i ligature reached through the feature rules
    font.insert_glyph(rect_glyph("f_i", &['\u{FB01}'], [0.0, 0.0, 500.0, 700.0], 600.0));
    font.set_features("feature liga { sub g0066 g0069 by f_i; } liga;");
    // A-ring references a private-use ring glyph
    let mut aring = Glyph::new("Aring");
    aring.codepoints.insert('\u{C5}');
    aring.components.push(component("g0041", 0.0, 0.0));
    aring.components.push(component("ring", 0.0, 700.0));
    font.insert_glyph(aring);
    font.insert_glyph(rect_glyph("ring", &['\u{E900}'], [0.0, 0.0, 100.0, 100.0], 0.0));
    // a reference cycle through alternate encodings
    let mut loop_a = Glyph::new("loop.a");
    loop_a.codepoints.insert('\u{E901}');
    loop_a.codepoints.insert('\u{E902}');
    loop_a.components.push(component("loop.b", 0.0, 0.0));
    let mut loop_b = Glyph::new("loop.b");
    loop_b.codepoints.insert('\u{E903}');
    loop_b.components.push(component("loop.a", 0.0, 0.0));
    font.insert_glyph(loop_a);
    font.insert_glyph(loop_b);
    let mut uses_loop = Glyph::new("Ccedilla");
    uses_loop.codepoints.insert('\u{C7}');
    uses_loop.components.push(component("loop.a", 0.0, 0.0));
    font.insert_glyph(uses_loop);
    // an unrelated icon
    font.insert_glyph(rect_glyph("icon", &['\u{F000}'], [0.0, 0.0, 100.0, 100.0], 600.0));

    let essential = EssentialSet::compute(&font);
    assert!(essential.contains(0x41));
    assert!(essential.contains(0xFB01));
    assert!(essential.contains(0xE900));
    assert!(essential.contains(0xE901));
    assert!(essential.contains(0xE902));
    assert!(essential.contains(0xE903));
    assert!(!essential.contains(0xF000));
    assert!(!essential.contains(0x20));

    assert_eq!(EssentialSet::compute(&font), essential);
}

#[test]
fn spot_check_detects_monospace() {
    let font = mono_font();
    assert_eq!(is_monospaced(&font), (true, None));

    let mut proportional = mono_font();
    proportional.insert_glyph(rect_glyph("g004D", &['M'], [0.0, 0.0, 800.0, 700.0], 900.0));
    assert_eq!(is_monospaced(&proportional), (false, Some(0x4D)));
}

#[test]
fn narrow_i_and_period_are_tolerated() {
    let mut font = mono_font();
    font.insert_glyph(rect_glyph("g0069", &['i'], [200.0, 0.0, 300.0, 700.0], 500.0));
    assert_eq!(is_monospaced(&font), (true, None));
}

#[test]
fn monospace_check_sets_panose() {
    let mut font = mono_font();
    let mut diag = Diagnostics::new();
    assert!(assert_monospace(&mut font, false, 0, &mut diag).unwrap());
    assert_eq!(font.panose().family_kind(), 2);
    assert_eq!(font.panose().proportion(), 9);
}

#[test]
fn forcing_mono_on_proportional_font_needs_two_flags() {
    let mut font = mono_font();
    font.insert_glyph(rect_glyph("g004D", &['M'], [0.0, 0.0, 800.0, 700.0], 900.0));

    let mut diag = Diagnostics::new();
    let err = assert_monospace(&mut font, false, 1, &mut diag).unwrap_err();
    assert_eq!(err.exit_code(), 1);

    let mut diag = Diagnostics::new();
    assert!(!assert_monospace(&mut font, false, 2, &mut diag).unwrap());
    assert!(diag.mentions("offending char: 4D"));
}

#[test]
fn cell_width_skips_exceptions() {
    let mut font = mono_font();
    // a wide hyphen and a wide IJ are ignored
    font.insert_glyph(rect_glyph("g002D", &['-'], [0.0, 0.0, 900.0, 10.0], 1000.0));
    font.insert_glyph(rect_glyph("IJ", &['\u{132}'], [0.0, 0.0, 900.0, 700.0], 1000.0));

    let mut cell = CellDimensions::from_vertical(-200.0, 800.0);
    let mut diag = Diagnostics::new();
    detect_cell_width(&font, &mut cell, false, None, &mut diag).unwrap();
    assert_eq!(cell.width, 600.0);
    assert_eq!(cell.xmin, 0.0);
}

#[test]
fn cell_width_override() {
    let font = mono_font();
    let mut cell = CellDimensions::from_vertical(-200.0, 800.0);
    let mut diag = Diagnostics::new();
    let over = "0:500:-200:800".parse().ok();
    detect_cell_width(&font, &mut cell, false, over, &mut diag).unwrap();
    assert_eq!(cell.width, 500.0);
}

#[test]
fn empty_font_has_no_cell_width() {
    let font = UfoFont::default();
    let mut cell = CellDimensions::from_vertical(-200.0, 800.0);
    let mut diag = Diagnostics::new();
    assert!(detect_cell_width(&font, &mut cell, false, None, &mut diag).is_err());
}

#[test]
fn legacy_average_of_monospaced_font_is_the_advance() {
    let font = mono_font();
    assert_eq!(legacy_average_width(&font).unwrap(), 600);

    let mut missing = UfoFont::default();
    missing.insert_glyph(rect_glyph("a", &['a'], [0.0, 0.0, 1.0, 1.0], 600.0));
    assert!(legacy_average_width(&missing).is_err());
}
