//! Substitution rules in a UFO `features.fea`
//!
//! Only what the patcher needs is understood: `sub ... by ...;` statements
//! (single, multiple and ligature substitutions) and named lookup blocks.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static SUBSTITUTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(?:sub|substitute)\s+([^;{}]+?)\s+by\s+([^;{}]+?)\s*;").ok()
});

/// One substitution statement and where it sits in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRule {
    pub span: Range<usize>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl SubstitutionRule {
    pub fn mentions(&self, glyph: &str) -> bool {
        self.inputs.iter().chain(&self.outputs).any(|name| name == glyph)
    }
}

/// Glyph names of one side of a rule; classes and marks are ignored
fn glyph_names(side: &str) -> Vec<String> {
    side.split(|c: char| c.is_whitespace() || c == '[' || c == ']')
        .filter(|token| !token.is_empty() && !token.starts_with('@'))
        .map(|token| {
            token
                .trim_start_matches('\\')
                .trim_end_matches('\'')
                .to_string()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

pub fn substitution_rules(features: &str) -> Vec<SubstitutionRule> {
    let Some(pattern) = SUBSTITUTION.as_ref() else {
        return Vec::new();
    };
    pattern
        .captures_iter(features)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(SubstitutionRule {
                span: whole.range(),
                inputs: glyph_names(caps.get(1)?.as_str()),
                outputs: glyph_names(caps.get(2)?.as_str()),
            })
        })
        .collect()
}

/// Names linked to `glyph` by a rule, looking both ways
pub fn substitution_partners(features: &str, glyph: &str) -> Vec<String> {
    let mut partners = Vec::new();
    for rule in substitution_rules(features) {
        let other_side = if rule.inputs.iter().any(|name| name == glyph) {
            &rule.outputs
        } else if rule.outputs.iter().any(|name| name == glyph) {
            &rule.inputs
        } else {
            continue;
        };
        for name in other_side {
            if name != glyph && !partners.contains(name) {
                partners.push(name.clone());
            }
        }
    }
    partners
}

/// Delete every rule mentioning `glyph`, returning how many went away
pub fn remove_rules_mentioning(features: &mut String, glyph: &str) -> usize {
    let doomed: Vec<Range<usize>> = substitution_rules(features)
        .into_iter()
        .filter(|rule| rule.mentions(glyph))
        .map(|rule| rule.span)
        .collect();
    for span in doomed.iter().rev() {
        features.replace_range(span.clone(), "");
    }
    doomed.len()
}

/// Delete a named lookup block and every `lookup NAME;` reference to it.
///
/// Returns false when the lookup is not defined.
pub fn remove_lookup(features: &mut String, name: &str) -> bool {
    let name = regex::escape(name);
    let Ok(block) = Regex::new(&format!(
        r"(?s)\blookup\s+{name}\s*(?:useExtension\s*)?\{{.*?\}}\s*{name}\s*;"
    )) else {
        return false;
    };
    if !block.is_match(features) {
        return false;
    }
    let mut edited = block.replace_all(features, "").into_owned();
    if let Ok(reference) = Regex::new(&format!(r"\blookup\s+{name}\s*;")) {
        edited = reference.replace_all(&edited, "").into_owned();
    }
    *features = edited;
    true
}
