//! Resolved run options
//!
//! The command line and the config file are turned into [`PatchOptions`]
//! once; nothing below `core` looks at raw arguments.

use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::metrics::CellOverride;
use crate::font_source::MetricSource;
use crate::placement::CellMode;
use regex::Regex;

/// Upper bound accepted for an explicit `xAvgCharWidth`
pub const MAX_AVG_CHAR_WIDTH: u16 = 16384;

/// How `OS/2.xAvgCharWidth` of the output is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvgCharWidth {
    /// Keep the value of the unpatched font
    CopyFromSource,
    /// Weighted average of `a`-`z` and space, as OS/2 version 2 defined it
    ComputeLegacyAverage,
    ExplicitValue(u16),
}

impl AvgCharWidth {
    /// Map the numeric command line form: no value copies, 0 computes,
    /// anything else is taken as is
    pub fn from_arg(value: Option<i64>) -> PatchResult<Self> {
        match value {
            None => Ok(Self::CopyFromSource),
            Some(0) => Ok(Self::ComputeLegacyAverage),
            Some(value) if value < 0 => Err(PatchError::configuration(
                "--xavgcharwidth takes no negative numbers",
            )),
            Some(value) if value > i64::from(MAX_AVG_CHAR_WIDTH) => Err(
                PatchError::configuration(format!(
                    "--xavgcharwidth takes only numbers up to {MAX_AVG_CHAR_WIDTH}"
                )),
            ),
            Some(value) => Ok(Self::ExplicitValue(value as u16)),
        }
    }
}

/// Which optional symbol sets are patched in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbolSets {
    pub codicons: bool,
    pub fontawesome: bool,
    pub fontawesome_extension: bool,
    pub fontlogos: bool,
    pub material: bool,
    pub octicons: bool,
    pub pomicons: bool,
    pub powerline: bool,
    pub powerline_extra: bool,
    pub power_symbols: bool,
    pub weather: bool,
}

impl SymbolSets {
    pub fn all() -> Self {
        Self {
            codicons: true,
            fontawesome: true,
            fontawesome_extension: true,
            fontlogos: true,
            material: true,
            octicons: true,
            pomicons: true,
            powerline: true,
            powerline_extra: true,
            power_symbols: true,
            weather: true,
        }
    }

    pub fn is_complete(&self) -> bool {
        *self == Self::all()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    pub cell_mode: CellMode,
    /// How often `--mono` was given
    pub force_mono: u8,
    pub careful: bool,
    pub symbols: SymbolSets,
    /// Extra donor font of which every glyph is copied
    pub custom: Option<String>,
    pub force_box_drawing: bool,
    pub adjust_line_height: bool,
    pub metrics: Option<MetricSource>,
    pub cell: Option<CellOverride>,
    /// Print the cell coordinates (`--cell ?`)
    pub report_cell: bool,
    /// `None` leaves the compiled value alone
    pub avg_char_width: Option<AvgCharWidth>,
    pub remove_ligatures: bool,
    /// Lookup names removed with `--removeligatures`
    pub ligature_lookups: Vec<String>,
    /// Glyph name patterns to re-hint
    pub rehint_patterns: Vec<String>,
    pub dry_run: bool,
}

impl PatchOptions {
    /// Compile the re-hint patterns so that they must match whole names
    pub fn rehint_regexes(&self) -> PatchResult<Vec<Regex>> {
        self.rehint_patterns
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
                    PatchError::configuration(format!(
                        "Invalid re_hint pattern '{pattern}': {err}"
                    ))
                })
            })
            .collect()
    }
}
