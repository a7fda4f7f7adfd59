//! Scale groups
//!
//! Glyphs that must keep their relative size (arrows of one family, box
//! drawing pieces) are scaled with one factor computed from their combined
//! bounding box. Each patch range may declare such groups; they are
//! resolved lazily against the donor font the first time a glyph of that
//! range is placed and cached afterwards.

use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::{format_codepoint, FontEngine};
use crate::geometry::GlyphDimensions;
use crate::placement::stretch::Stretch;
use crate::placement::PlacementEngine;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single codepoint or a closed codepoint range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodepointSet {
    Single(u32),
    Range { start: u32, end: u32 },
}

impl CodepointSet {
    pub fn range(start: u32, end: u32) -> Self {
        Self::Range { start, end }
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        match *self {
            Self::Single(single) => single == codepoint,
            Self::Range { start, end } => (start..=end).contains(&codepoint),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        let (start, end) = match *self {
            Self::Single(single) => (single, single),
            Self::Range { start, end } => (start, end),
        };
        start..=end
    }
}

/// Glyphs scaled and shifted as one unit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScaleGroup {
    members: Vec<CodepointSet>,
}

impl ScaleGroup {
    pub fn new(members: Vec<CodepointSet>) -> Self {
        Self { members }
    }

    /// A group made of one closed range
    pub fn range(start: u32, end: u32) -> Self {
        Self::new(vec![CodepointSet::range(start, end)])
    }

    /// A group made of individual codepoints
    pub fn list(codepoints: &[u32]) -> Self {
        Self::new(codepoints.iter().copied().map(CodepointSet::Single).collect())
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        self.members.iter().any(|set| set.contains(codepoint))
    }

    /// Every listed codepoint in declaration order
    pub fn codepoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.members.iter().flat_map(CodepointSet::iter)
    }

    fn describe(&self) -> String {
        let first = self.codepoints().next();
        let last = self.codepoints().last();
        match (first, last) {
            (Some(first), Some(last)) => {
                format!("{} - {}", format_codepoint(first), format_codepoint(last))
            }
            _ => "(empty)".to_string(),
        }
    }
}

/// Declared horizontal/vertical shifting of a group
///
/// The mode does not select behaviour. It documents what the group's
/// glyphs imply and is checked against them: horizontal shifting is only
/// possible when all members share one advance width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftMode {
    #[default]
    Unchecked,
    X,
    Y,
    XY,
}

impl ShiftMode {
    pub fn shifts_horizontally(self) -> bool {
        matches!(self, Self::X | Self::XY)
    }
}

impl FromStr for ShiftMode {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Unchecked),
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "xy" => Ok(Self::XY),
            other => Err(PatchError::configuration(format!(
                "unknown shift mode '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ShiftMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unchecked => "",
            Self::X => "x",
            Self::Y => "y",
            Self::XY => "xy",
        };
        f.write_str(text)
    }
}

/// Older rule form: one lead glyph dictates the scale of a list of glyphs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadGlyphRule {
    pub lead: u32,
    pub members: Vec<CodepointSet>,
    /// Also align the members with the lead glyph's bounding box
    pub share_bounds: bool,
}

/// Scale rules of one patch range
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScaleRules {
    pub shift_mode: ShiftMode,
    pub groups: Vec<ScaleGroup>,
    pub lead_glyph: Option<LeadGlyphRule>,
}

impl ScaleRules {
    pub fn new(shift_mode: ShiftMode, groups: Vec<ScaleGroup>) -> Self {
        Self {
            shift_mode,
            groups,
            lead_glyph: None,
        }
    }

    pub fn with_lead_glyph(mut self, rule: LeadGlyphRule) -> Self {
        self.lead_glyph = Some(rule);
        self
    }
}

/// Scale shared by a group, plus the combined box used for shifting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupScale {
    pub scale: f64,
    pub combined: Option<GlyphDimensions>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedScaleRules {
    entries: Vec<(ScaleGroup, GroupScale)>,
}

impl ResolvedScaleRules {
    /// First group in declaration order containing `codepoint`
    pub fn lookup(&self, codepoint: u32) -> Option<&GroupScale> {
        self.entries
            .iter()
            .find(|(group, _)| group.contains(codepoint))
            .map(|(_, scale)| scale)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve every group of `rules` against `font`
///
/// `stretch` and `y_padding` are those of the glyph that triggered the
/// resolution; all glyphs of one range are expected to share the stretch.
pub fn resolve<E: FontEngine>(
    rules: &ScaleRules,
    font: &E,
    placement: &PlacementEngine,
    stretch: &Stretch,
    y_padding: f64,
) -> PatchResult<ResolvedScaleRules> {
    let mut entries = Vec::with_capacity(rules.groups.len() + 1);

    for group in &rules.groups {
        let members: Vec<Option<&E::Glyph>> =
            group.codepoints().map(|cp| font.glyph(cp)).collect();
        let present = members.iter().flatten().count();
        let combined = GlyphDimensions::combined(members);
        let (scale, _) = placement.scale_factors(&combined, stretch, None, y_padding);

        if rules.shift_mode != ShiftMode::Unchecked && present > 0 {
            let horizontal = rules.shift_mode.shifts_horizontally();
            if horizontal != combined.advance.is_some() {
                let message = if horizontal {
                    format!(
                        "Scaling in group {} is expected to do horizontal shifts but can not",
                        group.describe()
                    )
                } else {
                    format!(
                        "Scaling in group {} is expected to not do horizontal shifts but will",
                        group.describe()
                    )
                };
                return Err(PatchError::configuration(message));
            }
        }

        entries.push((
            group.clone(),
            GroupScale {
                scale,
                combined: Some(combined),
            },
        ));
    }

    if let Some(rule) = &rules.lead_glyph {
        let lead = font
            .glyph(rule.lead)
            .map(GlyphDimensions::of_glyph)
            .unwrap_or_default();
        let (scale, _) = placement.scale_factors(&lead, stretch, None, y_padding);
        entries.push((
            ScaleGroup::new(rule.members.clone()),
            GroupScale {
                scale,
                combined: rule.share_bounds.then_some(lead),
            },
        ));
    }

    Ok(ResolvedScaleRules { entries })
}

/// Resolved rules per patch range, computed on first use
#[derive(Debug, Default)]
pub struct ScaleRuleCache {
    resolved: BTreeMap<usize, ResolvedScaleRules>,
}

impl ScaleRuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_resolve<E: FontEngine>(
        &mut self,
        range_index: usize,
        rules: &ScaleRules,
        font: &E,
        placement: &PlacementEngine,
        stretch: &Stretch,
        y_padding: f64,
    ) -> PatchResult<&ResolvedScaleRules> {
        match self.resolved.entry(range_index) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let resolved = resolve(rules, font, placement, stretch, y_padding)?;
                Ok(entry.insert(resolved))
            }
        }
    }

    pub fn is_resolved(&self, range_index: usize) -> bool {
        self.resolved.contains_key(&range_index)
    }
}
