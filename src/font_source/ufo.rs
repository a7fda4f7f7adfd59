//! UFO font engine
//!
//! [`UfoFont`] wraps a `norad::Font` and keeps a codepoint map of its
//! default layer so glyphs can be found through any of their encodings.
//! Outlines are measured and transformed with `kurbo`.

use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::features;
use crate::font_source::outline::{
    affine_from_norad, affine_to_norad, contours_bounds, transform_contour,
};
use crate::font_source::{DonorLoader, FontEngine, GlyphHandle, Panose, VerticalMetrics};
use kurbo::{Affine, Point, Rect};
use norad::{Font, Glyph};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Glyph lib key holding compiled TrueType instructions
const TRUETYPE_INSTRUCTIONS_KEY: &str = "public.truetype.instructions";

/// Component nesting deeper than this is treated as a cycle
const MAX_COMPONENT_DEPTH: usize = 32;

/// OS/2 fsSelection bit for USE_TYPO_METRICS
const USE_TYPO_METRICS_BIT: u8 = 7;

/// Load a UFO font file from disk
pub fn load_ufo_from_path(path: impl AsRef<Path>) -> PatchResult<Font> {
    let path = path.as_ref();
    Font::load(path).map_err(|err| {
        PatchError::data(format!("Can not open font {}: {}", path.display(), err))
    })
}

/// Conventional name for a glyph known only by its codepoint
pub fn codepoint_glyph_name(codepoint: u32) -> String {
    if codepoint <= 0xFFFF {
        format!("uni{codepoint:04X}")
    } else {
        format!("u{codepoint:05X}")
    }
}

fn to_char(codepoint: u32) -> Option<char> {
    char::from_u32(codepoint)
}

impl GlyphHandle for Glyph {
    fn name(&self) -> &str {
        Glyph::name(self).as_str()
    }

    // Components are not measured; copied glyphs are always decomposed.
    fn bounds(&self) -> Option<Rect> {
        contours_bounds(&self.contours)
    }

    fn advance(&self) -> f64 {
        self.width
    }

    fn set_advance(&mut self, advance: f64) {
        self.width = advance;
    }

    fn transform(&mut self, affine: Affine) {
        for contour in self.contours.iter_mut() {
            transform_contour(contour, affine);
        }
        for component in self.components.iter_mut() {
            let combined = affine * affine_from_norad(&component.transform);
            component.transform = affine_to_norad(combined);
        }
        for anchor in self.anchors.iter_mut() {
            let moved = affine * Point::new(anchor.x, anchor.y);
            anchor.x = moved.x;
            anchor.y = moved.y;
        }
    }

    fn round_coordinates(&mut self) {
        for contour in self.contours.iter_mut() {
            for point in contour.points.iter_mut() {
                point.x = point.x.round();
                point.y = point.y.round();
            }
        }
        for component in self.components.iter_mut() {
            component.transform.x_offset = component.transform.x_offset.round();
            component.transform.y_offset = component.transform.y_offset.round();
        }
    }
}

/// A copy of `glyph` under a different name
fn renamed(glyph: &Glyph, name: &str) -> Glyph {
    let mut copy = Glyph::new(name);
    copy.width = glyph.width;
    copy.height = glyph.height;
    copy.contours = glyph.contours.clone();
    copy.components = glyph.components.clone();
    copy.anchors = glyph.anchors.clone();
    for ch in glyph.codepoints.iter() {
        copy.codepoints.insert(ch);
    }
    copy
}

/// A UFO source font with a codepoint map of its default layer
#[derive(Debug, Clone)]
pub struct UfoFont {
    font: Font,
    cmap: BTreeMap<u32, String>,
}

impl Default for UfoFont {
    fn default() -> Self {
        Self::from_norad(Font::new())
    }
}

impl UfoFont {
    pub fn from_norad(font: Font) -> Self {
        let mut ufo = Self {
            font,
            cmap: BTreeMap::new(),
        };
        ufo.rebuild_cmap();
        ufo
    }

    pub fn load(path: impl AsRef<Path>) -> PatchResult<Self> {
        let path = path.as_ref();
        let ufo = Self::from_norad(load_ufo_from_path(path)?);
        debug!(
            "Loaded {} with {} encoded codepoints",
            path.display(),
            ufo.cmap.len()
        );
        Ok(ufo)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PatchResult<()> {
        let path = path.as_ref();
        self.font.save(path).map_err(|err| {
            PatchError::data(format!("Can not write font {}: {}", path.display(), err))
        })
    }

    pub fn norad(&self) -> &Font {
        &self.font
    }

    pub fn into_norad(self) -> Font {
        self.font
    }

    pub fn features(&self) -> &str {
        &self.font.features
    }

    pub fn set_features(&mut self, features: impl Into<String>) {
        self.font.features = features.into();
    }

    pub fn glyph_count(&self) -> usize {
        self.font.default_layer().len()
    }

    pub fn glyph_by_name(&self, name: &str) -> Option<&Glyph> {
        self.font.default_layer().get_glyph(name)
    }

    /// Add a glyph, replacing any glyph of the same name
    pub fn insert_glyph(&mut self, glyph: Glyph) {
        let name = glyph.name().to_string();
        if let Some(old) = self.font.default_layer_mut().remove_glyph(&name) {
            self.unmap(&old);
        }
        self.map(&glyph);
        self.font.default_layer_mut().insert_glyph(glyph);
    }

    fn rebuild_cmap(&mut self) {
        self.cmap.clear();
        for glyph in self.font.default_layer().iter() {
            for ch in glyph.codepoints.iter() {
                self.cmap
                    .entry(u32::from(ch))
                    .or_insert_with(|| glyph.name().to_string());
            }
        }
    }

    fn map(&mut self, glyph: &Glyph) {
        for ch in glyph.codepoints.iter() {
            self.cmap
                .entry(u32::from(ch))
                .or_insert_with(|| glyph.name().to_string());
        }
    }

    fn unmap(&mut self, glyph: &Glyph) {
        let name = glyph.name().as_str();
        self.cmap.retain(|_, mapped| mapped.as_str() != name);
    }

    fn name_at(&self, codepoint: u32) -> Option<&str> {
        self.cmap.get(&codepoint).map(String::as_str)
    }

    fn codepoint_of(&self, name: &str) -> Option<u32> {
        self.glyph_by_name(name)?.codepoints.iter().next().map(u32::from)
    }

    /// A glyph name not used in the font yet, preferring `wanted`
    fn free_name(&self, wanted: &str, codepoint: u32) -> String {
        let layer = self.font.default_layer();
        if !wanted.is_empty() && layer.get_glyph(wanted).is_none() {
            return wanted.to_string();
        }
        let base = codepoint_glyph_name(codepoint);
        if layer.get_glyph(&base).is_none() {
            return base;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{base}.{suffix}");
            if layer.get_glyph(&candidate).is_none() {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Inline all component outlines into one glyph
    fn decomposed(&self, glyph: &Glyph) -> Glyph {
        let layer = self.font.default_layer();
        let mut flat = glyph.clone();
        flat.components.clear();

        let mut stack: Vec<(String, Affine, usize)> = glyph
            .components
            .iter()
            .map(|c| (c.base.to_string(), affine_from_norad(&c.transform), 1))
            .collect();
        while let Some((base, affine, depth)) = stack.pop() {
            if depth > MAX_COMPONENT_DEPTH {
                debug!("Component nesting too deep below {}", glyph.name());
                continue;
            }
            let Some(base_glyph) = layer.get_glyph(&base) else {
                continue;
            };
            for contour in &base_glyph.contours {
                let mut contour = contour.clone();
                transform_contour(&mut contour, affine);
                flat.contours.push(contour);
            }
            for component in &base_glyph.components {
                let nested = affine * affine_from_norad(&component.transform);
                stack.push((component.base.to_string(), nested, depth + 1));
            }
        }
        flat
    }

    fn scale_metric(value: &mut Option<i32>, factor: f64) {
        if let Some(v) = value.as_mut() {
            *v = (f64::from(*v) * factor).round() as i32;
        }
    }
}

impl FontEngine for UfoFont {
    type Glyph = Glyph;

    fn units_per_em(&self) -> f64 {
        self.font
            .font_info
            .units_per_em
            .map(|v| v.as_f64())
            .unwrap_or(1000.0)
    }

    fn set_units_per_em(&mut self, units_per_em: f64) {
        let current = self.units_per_em();
        let factor = units_per_em / current;
        if factor == 1.0 || !factor.is_finite() {
            return;
        }
        let scale = Affine::scale(factor);
        for glyph in self.font.default_layer_mut().iter_mut() {
            glyph.transform(scale);
            glyph.width *= factor;
            glyph.height *= factor;
        }

        let info = &mut self.font.font_info;
        info.units_per_em = norad::fontinfo::NonNegativeIntegerOrFloat::new(units_per_em);
        for value in [
            &mut info.ascender,
            &mut info.descender,
            &mut info.cap_height,
            &mut info.x_height,
        ] {
            if let Some(v) = value.as_mut() {
                *v *= factor;
            }
        }
        for value in [
            &mut info.open_type_hhea_ascender,
            &mut info.open_type_hhea_descender,
            &mut info.open_type_hhea_line_gap,
            &mut info.open_type_os2_typo_ascender,
            &mut info.open_type_os2_typo_descender,
            &mut info.open_type_os2_typo_line_gap,
        ] {
            Self::scale_metric(value, factor);
        }
        debug!("Rescaled font from {} to {} units per em", current, units_per_em);
    }

    fn ascent(&self) -> f64 {
        let em = self.units_per_em();
        self.font.font_info.ascender.unwrap_or(em * 0.8)
    }

    fn descent(&self) -> f64 {
        let em = self.units_per_em();
        -self.font.font_info.descender.unwrap_or(-em * 0.2)
    }

    fn cap_height(&self) -> Option<f64> {
        self.font.font_info.cap_height
    }

    fn vertical_metrics(&self) -> VerticalMetrics {
        let info = &self.font.font_info;
        let ascender = info.ascender.unwrap_or(0.0).round() as i32;
        let descender = info.descender.unwrap_or(0.0).round() as i32;
        VerticalMetrics {
            hhea_ascent: info.open_type_hhea_ascender.unwrap_or(ascender),
            hhea_descent: info.open_type_hhea_descender.unwrap_or(descender),
            hhea_line_gap: info.open_type_hhea_line_gap.unwrap_or(0),
            typo_ascent: info.open_type_os2_typo_ascender.unwrap_or(ascender),
            typo_descent: info.open_type_os2_typo_descender.unwrap_or(descender),
            typo_line_gap: info.open_type_os2_typo_line_gap.unwrap_or(0),
            win_ascent: info
                .open_type_os2_win_ascent
                .map(|v| i32::try_from(v).unwrap_or(i32::MAX))
                .unwrap_or(ascender),
            win_descent: info
                .open_type_os2_win_descent
                .map(|v| i32::try_from(v).unwrap_or(i32::MAX))
                .unwrap_or(-descender),
            use_typo_metrics: info
                .open_type_os2_selection
                .as_ref()
                .is_some_and(|bits| {
                    bits.iter()
                        .any(|bit| u32::from(*bit) == u32::from(USE_TYPO_METRICS_BIT))
                }),
        }
    }

    fn set_vertical_metrics(&mut self, metrics: &VerticalMetrics) {
        let info = &mut self.font.font_info;
        info.open_type_hhea_ascender = Some(metrics.hhea_ascent);
        info.open_type_hhea_descender = Some(metrics.hhea_descent);
        info.open_type_hhea_line_gap = Some(metrics.hhea_line_gap);
        info.open_type_os2_typo_ascender = Some(metrics.typo_ascent);
        info.open_type_os2_typo_descender = Some(metrics.typo_descent);
        info.open_type_os2_typo_line_gap = Some(metrics.typo_line_gap);
        info.open_type_os2_win_ascent = Some(metrics.win_ascent.max(0) as u32);
        info.open_type_os2_win_descent = Some(metrics.win_descent.max(0) as u32);

        let selection = info.open_type_os2_selection.get_or_insert_with(Vec::new);
        selection.retain(|bit| u32::from(*bit) != u32::from(USE_TYPO_METRICS_BIT));
        if metrics.use_typo_metrics {
            selection.push(USE_TYPO_METRICS_BIT.into());
            selection.sort_unstable();
        }
    }

    fn panose(&self) -> Panose {
        let Some(p) = self.font.font_info.open_type_os2_panose.as_ref() else {
            return Panose::default();
        };
        let digit = |v: u32| u8::try_from(v).unwrap_or(0);
        Panose([
            digit(p.family_type),
            digit(p.serif_style),
            digit(p.weight),
            digit(p.proportion),
            digit(p.contrast),
            digit(p.stroke_variation),
            digit(p.arm_style),
            digit(p.letterform),
            digit(p.midline),
            digit(p.x_height),
        ])
    }

    fn set_panose(&mut self, panose: Panose) {
        let d = panose.0.map(u32::from);
        self.font.font_info.open_type_os2_panose = Some(norad::fontinfo::Os2Panose {
            family_type: d[0],
            serif_style: d[1],
            weight: d[2],
            proportion: d[3],
            contrast: d[4],
            stroke_variation: d[5],
            arm_style: d[6],
            letterform: d[7],
            midline: d[8],
            x_height: d[9],
        });
    }

    fn codepoints(&self) -> Vec<u32> {
        self.cmap.keys().copied().collect()
    }

    fn contains(&self, codepoint: u32) -> bool {
        self.cmap.contains_key(&codepoint)
    }

    fn glyph(&self, codepoint: u32) -> Option<&Glyph> {
        let name = self.name_at(codepoint)?;
        self.font.default_layer().get_glyph(name)
    }

    fn glyph_mut(&mut self, codepoint: u32) -> Option<&mut Glyph> {
        let name = self.cmap.get(&codepoint)?.clone();
        self.font.default_layer_mut().get_glyph_mut(&name)
    }

    fn for_each_glyph_mut(&mut self, visit: &mut dyn FnMut(&mut Glyph)) {
        for glyph in self.font.default_layer_mut().iter_mut() {
            visit(glyph);
        }
    }

    fn copy_glyph(&self, codepoint: u32) -> Option<Glyph> {
        let glyph = self.glyph(codepoint)?;
        Some(self.decomposed(glyph))
    }

    fn paste_glyph(&mut self, codepoint: u32, glyph: &Glyph) {
        let Some(ch) = to_char(codepoint) else {
            return;
        };
        let mut encodings = vec![ch];
        if let Some(previous) = self.cmap.get(&codepoint).cloned() {
            if let Some(old) = self.font.default_layer_mut().remove_glyph(&previous) {
                self.unmap(&old);
                encodings = old.codepoints.iter().collect();
            }
        }

        let name = self.free_name(GlyphHandle::name(glyph), codepoint);
        let mut pasted = renamed(glyph, &name);
        pasted.codepoints.clear();
        for ch in encodings {
            pasted.codepoints.insert(ch);
        }
        self.map(&pasted);
        self.font.default_layer_mut().insert_glyph(pasted);
    }

    fn create_glyph(&mut self, codepoint: u32) {
        let Some(ch) = to_char(codepoint) else {
            return;
        };
        let name = self.free_name("", codepoint);
        let mut glyph = Glyph::new(&name);
        glyph.codepoints.insert(ch);
        self.insert_glyph(glyph);
    }

    fn primary_codepoint(&self, codepoint: u32) -> Option<u32> {
        self.glyph(codepoint)?
            .codepoints
            .iter()
            .next()
            .map(u32::from)
    }

    fn alternate_codepoints(&self, codepoint: u32) -> Vec<u32> {
        self.glyph(codepoint)
            .map(|glyph| {
                glyph
                    .codepoints
                    .iter()
                    .map(u32::from)
                    .filter(|cp| *cp != codepoint)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn clear_alternates(&mut self, codepoint: u32) -> Vec<u32> {
        let Some(ch) = to_char(codepoint) else {
            return Vec::new();
        };
        if self.primary_codepoint(codepoint) != Some(codepoint) {
            // Only an alias of another glyph: free the slot, keep the glyph
            if let Some(glyph) = self.glyph_mut(codepoint) {
                let kept: Vec<char> = glyph.codepoints.iter().filter(|c| *c != ch).collect();
                glyph.codepoints.clear();
                for c in kept {
                    glyph.codepoints.insert(c);
                }
            }
            self.cmap.remove(&codepoint);
            return vec![codepoint];
        }

        let removed = self.alternate_codepoints(codepoint);
        if removed.is_empty() {
            return removed;
        }
        if let Some(glyph) = self.glyph_mut(codepoint) {
            glyph.codepoints.clear();
            glyph.codepoints.insert(ch);
        }
        for cp in &removed {
            self.cmap.remove(cp);
        }
        removed
    }

    fn references(&self, codepoint: u32) -> Vec<u32> {
        let Some(glyph) = self.glyph(codepoint) else {
            return Vec::new();
        };
        glyph
            .components
            .iter()
            .filter_map(|component| self.codepoint_of(component.base.as_str()))
            .collect()
    }

    fn substitution_partners(&self, codepoint: u32) -> Vec<u32> {
        let Some(name) = self.name_at(codepoint) else {
            return Vec::new();
        };
        features::substitution_partners(&self.font.features, name)
            .iter()
            .filter_map(|partner| self.codepoint_of(partner))
            .collect()
    }

    fn remove_substitutions(&mut self, codepoint: u32) -> usize {
        let Some(name) = self.cmap.get(&codepoint).cloned() else {
            return 0;
        };
        features::remove_rules_mentioning(&mut self.font.features, &name)
    }

    fn remove_lookup(&mut self, name: &str) -> PatchResult<()> {
        if features::remove_lookup(&mut self.font.features, name) {
            Ok(())
        } else {
            Err(PatchError::data(format!("No lookup named {name} in the features")))
        }
    }

    /// UFO glyphs carry compiled instructions in their lib; dropping them
    /// makes the compiler hint the glyph afresh.
    fn rehint(&mut self, patterns: &[Regex]) -> usize {
        let mut count = 0;
        for glyph in self.font.default_layer_mut().iter_mut() {
            let name = glyph.name().to_string();
            if patterns.iter().any(|pattern| pattern.is_match(&name)) {
                glyph.lib.remove(TRUETYPE_INSTRUCTIONS_KEY);
                count += 1;
            }
        }
        count
    }
}

/// Opens donor UFOs from the glyph directory
#[derive(Debug, Clone)]
pub struct UfoDonorLoader {
    glyph_dir: PathBuf,
}

impl UfoDonorLoader {
    pub fn new(glyph_dir: impl Into<PathBuf>) -> Self {
        Self {
            glyph_dir: glyph_dir.into(),
        }
    }

    pub fn glyph_dir(&self) -> &Path {
        &self.glyph_dir
    }
}

impl DonorLoader<UfoFont> for UfoDonorLoader {
    fn load(&mut self, file_name: &str) -> PatchResult<UfoFont> {
        let path = self.glyph_dir.join(file_name);
        if !path.exists() {
            return Err(PatchError::data(format!(
                "Can not find symbol source for {file_name} in {}",
                self.glyph_dir.display()
            )));
        }
        UfoFont::load(path)
    }
}
