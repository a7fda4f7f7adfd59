//! Command line interface for the glyph patcher
//!
//! Handles parsing command line arguments and turns them into
//! [`PatchOptions`] after validation. Options that only matter to the
//! surrounding application (paths, logging, compilation) stay here.

use crate::core::config_file::ConfigFile;
use crate::core::errors::{PatchError, PatchResult};
use crate::font_source::metrics::CellOverride;
use crate::font_source::MetricSource;
use crate::logging::{DebugMode, Diagnostics};
use crate::patch::{AvgCharWidth, PatchOptions, SymbolSets};
use crate::placement::CellMode;
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};

/// Program name used when parsing argument lists in tests
#[cfg(test)]
const BINARY_NAME: &str = "glyph-patcher";

/// Glyph patcher CLI arguments
///
/// Examples:
///   glyph-patcher MyFont.ufo                          # Seti-UI, devicons and friends
///   glyph-patcher MyFont.ufo --complete --mono        # Every set, single width
///   glyph-patcher MyFont.ufo -c --compile \
///       --source-binary MyFont.ttf                    # Also build and fix a TTF
///   glyph-patcher MyFont.ufo --cell ?                 # Only report the cell
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    name = "glyph-patcher",
    version,
    about = "Patches monospaced programming fonts with icon glyphs",
    long_about = "Copies icon glyphs from symbol fonts into a UFO source, scaling and aligning them to the character cell of the font. The patched source can be compiled, after which binary table fields the compiler cannot know are repaired."
)]
pub struct CliArgs {
    /// The UFO source to patch
    #[clap(help = "The path to the font source to patch (e.g. Inconsolata.ufo)")]
    pub font: PathBuf,

    #[clap(long, help = "Do not overwrite existing glyphs if detected")]
    pub careful: bool,

    /// Debug mode: 1 logs to file, 2 logs debug output to the terminal, 3 does both
    #[clap(
        long,
        num_args = 0..=1,
        default_value_t = 0,
        default_missing_value = "2",
        value_parser = clap::value_parser!(u8).range(0..=3),
        help = "Verbose mode (optional: 1=just to file; 2*=just to terminal; 3=display and file)"
    )]
    pub debug: u8,

    #[clap(
        long = "extension",
        alias = "ext",
        default_value = "",
        help = "Change font file type to create when compiling (ttf or otf)"
    )]
    pub extension: String,

    #[clap(
        long = "mono",
        short = 's',
        alias = "use-single-width-glyphs",
        action = ArgAction::Count,
        help = "Create monospaced font, existing and added glyphs are single-width (implies --single-width-glyphs)"
    )]
    pub mono: u8,

    #[clap(
        long = "outputdir",
        alias = "out",
        default_value = ".",
        help = "The directory to output the patched font file to"
    )]
    pub output_dir: PathBuf,

    #[clap(long, short = 'q', help = "Do not generate verbose output")]
    pub quiet: bool,

    #[clap(
        long = "single-width-glyphs",
        help = "Generate the glyphs as single-width not double-width"
    )]
    pub single_width: bool,

    #[clap(
        long = "variable-width-glyphs",
        help = "Do not adjust advance width (no \"overhang\")"
    )]
    pub variable_width: bool,

    // Symbol sets
    #[clap(long, short = 'c', help = "Add all available glyphs")]
    pub complete: bool,
    #[clap(long, help = "Add Codicons glyphs")]
    pub codicons: bool,
    #[clap(long, help = "Add Font Awesome glyphs")]
    pub fontawesome: bool,
    #[clap(long = "fontawesomeext", help = "Add Font Awesome Extension glyphs")]
    pub fontawesome_extension: bool,
    #[clap(long, help = "Add Font Logos glyphs")]
    pub fontlogos: bool,
    #[clap(long, alias = "mdi", help = "Add Material Design Icons")]
    pub material: bool,
    #[clap(long, help = "Add Octicons glyphs")]
    pub octicons: bool,
    #[clap(long, help = "Add Pomicon glyphs")]
    pub pomicons: bool,
    #[clap(long, help = "Add Powerline glyphs")]
    pub powerline: bool,
    #[clap(long = "powerlineextra", help = "Add Powerline Extra glyphs")]
    pub powerline_extra: bool,
    #[clap(long = "powersymbols", help = "Add IEC Power Symbols")]
    pub power_symbols: bool,
    #[clap(long, help = "Add Weather Icons")]
    pub weather: bool,

    // Expert options
    #[clap(
        long = "adjust-line-height",
        short = 'l',
        help = "Make the line height even (centers powerline separators more evenly)"
    )]
    pub adjust_line_height: bool,

    #[clap(
        long = "boxdrawing",
        help = "Force patching in (over existing) box drawing glyphs"
    )]
    pub box_drawing: bool,

    #[clap(
        long,
        help = "Adjust or query the cell size, e.g. use \"0:1000:-200:800\" or \"?\""
    )]
    pub cell: Option<String>,

    #[clap(
        long = "configfile",
        help = "JSON configuration file with ligature lookups, re-hint patterns and extra flags"
    )]
    pub config_file: Option<PathBuf>,

    #[clap(
        long,
        help = "A custom symbol font, all glyphs will be copied; absolute path suggested"
    )]
    pub custom: Option<String>,

    #[clap(long = "dry", help = "Do neither patch nor store the font")]
    pub dry_run: bool,

    #[clap(
        long = "glyphdir",
        default_value = "src/glyphs",
        help = "Path to the symbol fonts used for patching"
    )]
    pub glyph_dir: PathBuf,

    #[clap(
        long,
        value_parser = clap::value_parser!(MetricSource),
        help = "Select vertical metrics source (HHEA, TYPO or WIN)"
    )]
    pub metrics: Option<MetricSource>,

    #[clap(long, help = "Executable run with the path of the generated font")]
    pub postprocess: Option<PathBuf>,

    #[clap(
        long = "removeligatures",
        alias = "removeligs",
        help = "Remove the ligature lookups named in the configuration file"
    )]
    pub remove_ligatures: bool,

    /// `--xavgcharwidth` alone copies the source value, `0` computes the
    /// legacy average, any other number is used as is
    #[clap(
        long = "xavgcharwidth",
        num_args = 0..=1,
        allow_negative_numbers = true,
        help = "Adjust xAvgCharWidth (optional: concrete value)"
    )]
    pub avg_char_width: Option<Option<i64>>,

    // Compilation
    #[clap(long, help = "Compile the patched source into a binary font")]
    pub compile: bool,

    #[clap(
        long = "source-binary",
        help = "Binary build of the unpatched source, used to repair the compiled tables"
    )]
    pub source_binary: Option<PathBuf>,

    #[clap(
        long,
        default_value = "fontc",
        help = "Font compiler executable used by --compile"
    )]
    pub compiler: PathBuf,
}

impl CliArgs {
    /// Validate the CLI arguments after parsing
    ///
    /// Malformed values are configuration errors; paths that do not exist
    /// are data errors.
    pub fn validate(&self) -> PatchResult<()> {
        if let Some(cell) = self.cell.as_deref().filter(|cell| *cell != "?") {
            parse_cell(cell)?;
        }
        if let Some(value) = self.avg_char_width {
            AvgCharWidth::from_arg(value)?;
        }
        if !matches!(self.extension.as_str(), "" | "ttf" | "otf") {
            return Err(PatchError::configuration(format!(
                "Unsupported output extension '{}', use ttf or otf",
                self.extension
            )));
        }
        if self.source_binary.is_some() && !self.compile {
            return Err(PatchError::configuration(
                "--source-binary needs --compile",
            ));
        }

        if !self.font.exists() {
            return Err(PatchError::data(format!(
                "Font file does not exist: {}",
                self.font.display()
            )));
        }
        if let Some(source) = &self.source_binary {
            if !source.is_file() {
                return Err(PatchError::data(format!(
                    "Source binary does not exist: {}",
                    source.display()
                )));
            }
        }
        Ok(())
    }

    pub fn debug_mode(&self) -> DebugMode {
        DebugMode::new(self.debug)
    }

    /// Parse `args` again with the extra flags stored in a config file
    /// appended, so they act as if given on the command line
    pub fn with_config_commandline<I>(args: I, config: &ConfigFile) -> PatchResult<Option<Self>>
    where
        I: IntoIterator<Item = String>,
    {
        let Some(commandline) = config.commandline.as_deref() else {
            return Ok(None);
        };
        let extra = commandline.split_whitespace().map(str::to_string);
        Self::try_parse_from(args.into_iter().chain(extra))
            .map(Some)
            .map_err(|err| {
                PatchError::configuration(format!(
                    "Bad commandline in config file: {}",
                    err.kind()
                ))
            })
    }

    pub fn cell_mode(&self) -> CellMode {
        if self.single_width || self.mono > 0 {
            CellMode::Single
        } else if self.variable_width {
            CellMode::Variable
        } else {
            CellMode::Double
        }
    }

    pub fn symbol_sets(&self) -> SymbolSets {
        if self.complete {
            return SymbolSets::all();
        }
        SymbolSets {
            codicons: self.codicons,
            fontawesome: self.fontawesome,
            fontawesome_extension: self.fontawesome_extension,
            fontlogos: self.fontlogos,
            material: self.material,
            octicons: self.octicons,
            pomicons: self.pomicons,
            powerline: self.powerline,
            powerline_extra: self.powerline_extra,
            power_symbols: self.power_symbols,
            weather: self.weather,
        }
    }

    /// Resolve the patch options of this run
    pub fn patch_options(
        &self,
        config: &ConfigFile,
        diag: &mut Diagnostics,
    ) -> PatchResult<PatchOptions> {
        if self.variable_width && self.cell_mode() == CellMode::Single {
            diag.warn("Both --variable-width-glyphs and --single-width-glyphs (or --mono) given, ignoring --variable-width-glyphs");
        }

        let (cell, report_cell) = match self.cell.as_deref() {
            None => (None, false),
            Some("?") => (None, true),
            Some(cell) => {
                let cell = parse_cell(cell)?;
                if cell.xmin != 0 {
                    diag.warn("First parameter for --cell should be zero, this is probably not working");
                }
                (Some(cell), false)
            }
        };

        Ok(PatchOptions {
            cell_mode: self.cell_mode(),
            force_mono: self.mono,
            careful: self.careful,
            symbols: self.symbol_sets(),
            custom: self.custom.clone(),
            force_box_drawing: self.box_drawing,
            adjust_line_height: self.adjust_line_height,
            metrics: self.metrics,
            cell,
            report_cell,
            avg_char_width: self.avg_char_width.map(AvgCharWidth::from_arg).transpose()?,
            remove_ligatures: self.remove_ligatures,
            ligature_lookups: config.ligatures.clone(),
            rehint_patterns: config.re_hint.clone(),
            dry_run: self.dry_run,
        })
    }

    /// Where the patched source is written
    pub fn output_source_path(&self) -> PathBuf {
        self.output_dir.join(patched_file_name(&self.font, "ufo"))
    }

    /// Where the compiled font is written
    pub fn output_binary_path(&self) -> PathBuf {
        let extension = match self.extension.as_str() {
            "" => "ttf",
            other => other,
        };
        self.output_dir.join(patched_file_name(&self.font, extension))
    }
}

fn parse_cell(cell: &str) -> PatchResult<CellOverride> {
    cell.parse::<CellOverride>().map_err(|err| {
        PatchError::configuration(format!("Parameter for --cell is invalid: {err}"))
    })
}

fn patched_file_name(font: &Path, extension: &str) -> String {
    let stem = font
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "font".to_string());
    format!("{stem}-patched.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::EXIT_CONFIGURATION;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once(BINARY_NAME).chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn mono_implies_single_width() {
        let args = parse(&["Font.ufo", "-s", "-s"]);
        assert_eq!(args.mono, 2);
        assert_eq!(args.cell_mode(), CellMode::Single);
        assert_eq!(parse(&["Font.ufo"]).cell_mode(), CellMode::Double);
        assert_eq!(
            parse(&["Font.ufo", "--variable-width-glyphs"]).cell_mode(),
            CellMode::Variable
        );
    }

    #[test]
    fn variable_width_loses_against_single_width() {
        let args = parse(&["Font.ufo", "--variable-width-glyphs", "--single-width-glyphs"]);
        let mut diag = Diagnostics::new();
        let options = args.patch_options(&ConfigFile::default(), &mut diag).unwrap();
        assert_eq!(options.cell_mode, CellMode::Single);
        assert!(diag.mentions("ignoring --variable-width-glyphs"));
    }

    #[test]
    fn debug_flag_defaults_to_terminal() {
        assert_eq!(parse(&["Font.ufo"]).debug, 0);
        assert_eq!(parse(&["Font.ufo", "--debug"]).debug, 2);
        assert_eq!(parse(&["Font.ufo", "--debug", "3"]).debug, 3);
        assert!(CliArgs::try_parse_from([BINARY_NAME, "Font.ufo", "--debug", "4"]).is_err());
    }

    #[test]
    fn avg_char_width_forms() {
        let mut diag = Diagnostics::new();
        let config = ConfigFile::default();
        let copy = parse(&["Font.ufo", "--xavgcharwidth"]);
        assert_eq!(
            copy.patch_options(&config, &mut diag).unwrap().avg_char_width,
            Some(AvgCharWidth::CopyFromSource)
        );
        let compute = parse(&["Font.ufo", "--xavgcharwidth", "0"]);
        assert_eq!(
            compute.patch_options(&config, &mut diag).unwrap().avg_char_width,
            Some(AvgCharWidth::ComputeLegacyAverage)
        );
        let none = parse(&["Font.ufo"]);
        assert_eq!(none.patch_options(&config, &mut diag).unwrap().avg_char_width, None);

        let negative = parse(&["Font.ufo", "--xavgcharwidth", "-3"]);
        let err = negative.patch_options(&config, &mut diag).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIGURATION);
    }

    #[test]
    fn cell_option_forms() {
        let mut diag = Diagnostics::new();
        let config = ConfigFile::default();

        let query = parse(&["Font.ufo", "--cell", "?"]);
        let options = query.patch_options(&config, &mut diag).unwrap();
        assert!(options.report_cell);
        assert!(options.cell.is_none());

        let explicit = parse(&["Font.ufo", "--cell", "10:1000:-200:800"]);
        let options = explicit.patch_options(&config, &mut diag).unwrap();
        assert_eq!(options.cell.unwrap().xmax, 1000);
        assert!(diag.mentions("should be zero"));

        let broken = parse(&["Font.ufo", "--cell", "0:1000:-200"]);
        assert_eq!(broken.validate().unwrap_err().exit_code(), EXIT_CONFIGURATION);
    }

    #[test]
    fn complete_enables_every_set() {
        assert!(parse(&["Font.ufo", "-c"]).symbol_sets().is_complete());
        let some = parse(&["Font.ufo", "--powerline", "--mdi"]).symbol_sets();
        assert!(some.powerline && some.material && !some.weather);
    }

    #[test]
    fn config_commandline_is_applied() {
        let argv = || {
            [BINARY_NAME, "Font.ufo", "--outputdir", "out"]
                .into_iter()
                .map(str::to_string)
        };
        let config = ConfigFile {
            commandline: Some("--careful --powerline".to_string()),
            ..ConfigFile::default()
        };
        let args = CliArgs::with_config_commandline(argv(), &config)
            .unwrap()
            .unwrap();
        assert!(args.careful);
        assert!(args.powerline);
        assert_eq!(args.font, PathBuf::from("Font.ufo"));
        assert_eq!(args.output_dir, PathBuf::from("out"));

        let without = CliArgs::with_config_commandline(argv(), &ConfigFile::default()).unwrap();
        assert!(without.is_none());

        let broken = ConfigFile {
            commandline: Some("--no-such-flag".to_string()),
            ..ConfigFile::default()
        };
        let err = CliArgs::with_config_commandline(argv(), &broken).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIGURATION);
    }

    #[test]
    fn output_paths_follow_source_name() {
        let args = parse(&["fonts/Mono.ufo", "--outputdir", "out", "--ext", "otf"]);
        assert_eq!(args.output_source_path(), PathBuf::from("out/Mono-patched.ufo"));
        assert_eq!(args.output_binary_path(), PathBuf::from("out/Mono-patched.otf"));
    }
}
