//! Glyphs that must survive patching
//!
//! The basic Latin glyphs, the glyphs linked to them by substitution or
//! ligature rules, and everything those reach through alternate encodings
//! or composite references form the essential set. Patched symbols never
//! overwrite a member.

use crate::font_source::FontEngine;
use std::collections::BTreeSet;

/// Range of glyphs considered basic, Basic Latin through Latin Extended-A
const BASIC_RANGE: std::ops::RangeInclusive<u32> = 0x21..=0x17F;

/// Latin presentation forms (the fi/fl ligatures)
const LIGATURE_RANGE: std::ops::RangeInclusive<u32> = 0xFB00..=0xFB06;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EssentialSet {
    codepoints: BTreeSet<u32>,
}

impl EssentialSet {
    /// Compute the closure for a font.
    ///
    /// Link following runs on an explicit worklist; a codepoint is expanded
    /// once, so cycles in alternate encodings or references terminate.
    pub fn compute<E: FontEngine>(font: &E) -> Self {
        let mut roots: BTreeSet<u32> = BASIC_RANGE.filter(|cp| font.contains(*cp)).collect();

        let seeds: Vec<u32> = roots.iter().copied().chain(LIGATURE_RANGE).collect();
        for codepoint in seeds {
            if !font.contains(codepoint) {
                continue;
            }
            let partners = font.substitution_partners(codepoint);
            if !partners.is_empty() {
                roots.insert(codepoint);
                roots.extend(partners);
            }
        }

        let mut codepoints = BTreeSet::new();
        let mut worklist: Vec<u32> = roots.into_iter().rev().collect();
        while let Some(codepoint) = worklist.pop() {
            if !codepoints.insert(codepoint) {
                continue;
            }
            if !font.contains(codepoint) {
                continue;
            }
            let linked = font
                .alternate_codepoints(codepoint)
                .into_iter()
                .chain(font.references(codepoint));
            for next in linked {
                if !codepoints.contains(&next) {
                    worklist.push(next);
                }
            }
        }

        Self { codepoints }
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        self.codepoints.contains(&codepoint)
    }

    pub fn len(&self) -> usize {
        self.codepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codepoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.codepoints.iter().copied()
    }
}

impl FromIterator<u32> for EssentialSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            codepoints: iter.into_iter().collect(),
        }
    }
}
