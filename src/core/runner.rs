//! Application runner logic
//!
//! One run patches one font: load the source, patch it, write it out and
//! optionally compile and fix up the binary.

use crate::binary::{self, AvgWidthFix, FontCompiler};
use crate::core::cli::CliArgs;
use crate::core::config_file::ConfigFile;
use crate::core::errors::PatchError;
use crate::font_source::{UfoDonorLoader, UfoFont};
use crate::logging::{self, Diagnostics};
use crate::patch::{patch_font, PatchOutcome};
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Run the patcher with the given CLI arguments
pub fn run_app(cli_args: CliArgs) -> Result<()> {
    let config = ConfigFile::resolve(cli_args.config_file.as_deref())?;
    let cli_args = CliArgs::with_config_commandline(std::env::args(), &config)?
        .unwrap_or(cli_args);
    cli_args.validate()?;

    let _guard = logging::init(cli_args.debug_mode(), cli_args.quiet, &cli_args.output_dir)?;
    debug!("Arguments: {:?}", cli_args);

    if !cli_args.glyph_dir.is_dir() {
        return Err(PatchError::data(format!(
            "Can not find symbol glyph directory {}",
            cli_args.glyph_dir.display()
        ))
        .into());
    }

    let mut diag = Diagnostics::new();
    if let Some(source) = &cli_args.source_binary {
        let tags = binary::variation_tables(source, &mut diag);
        if !tags.is_empty() {
            let names: Vec<String> = tags.iter().map(ToString::to_string).collect();
            diag.warn(format!(
                "Source font is a variable font ({}), the patched font will not be variable",
                names.join(", ")
            ));
        }
    }

    let options = cli_args.patch_options(&config, &mut diag)?;
    let mut font = UfoFont::load(&cli_args.font)?;
    let mut loader = UfoDonorLoader::new(&cli_args.glyph_dir);
    let outcome = patch_font(&mut font, &mut loader, &options, &mut diag)?;

    if options.dry_run {
        info!("Dry run, nothing written");
        info!("{}", diag.summary());
        return Ok(());
    }

    let source_out = cli_args.output_source_path();
    std::fs::create_dir_all(&cli_args.output_dir).with_context(|| {
        format!("Can not create output directory {}", cli_args.output_dir.display())
    })?;
    font.save(&source_out)?;
    info!("Generated {}", source_out.display());

    let mut written = source_out;
    if cli_args.compile {
        let binary_out = cli_args.output_binary_path();
        FontCompiler::new(&cli_args.compiler).compile(&written, &binary_out)?;
        if let Some(source) = &cli_args.source_binary {
            fix_binary(source, &binary_out, &outcome, &mut diag)?;
        }
        written = binary_out;
    }

    if let Some(script) = &cli_args.postprocess {
        postprocess(script, &written, &mut diag);
    }

    info!("{}", diag.summary());
    Ok(())
}

/// Carry flags and the average width over from the original binary
fn fix_binary(
    source: &Path,
    dest: &Path,
    outcome: &PatchOutcome,
    diag: &mut Diagnostics,
) -> Result<()> {
    if !binary::is_binary_font(source) || !binary::is_binary_font(dest) {
        diag.warn("Can not fix up font flags, source or output is not a binary font");
        return Ok(());
    }
    let widths: &[AvgWidthFix] = &[outcome.avg_width];
    let report = binary::fix_font_files(source, dest, widths, diag)?;
    if report.changed() {
        debug!("Fixed up {}", dest.display());
    }
    Ok(())
}

fn postprocess(script: &Path, output: &Path, diag: &mut Diagnostics) {
    info!("Running postprocess script {}", script.display());
    match Command::new(script).arg(output).status() {
        Ok(status) if status.success() => {}
        Ok(status) => diag.error(format!(
            "Postprocess script {} failed with {status}",
            script.display()
        )),
        Err(err) => {
            warn!("{err}");
            diag.error(format!(
                "Can not run postprocess script {}",
                script.display()
            ));
        }
    }
}
