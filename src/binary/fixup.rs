//! Post-compilation table repair
//!
//! Compares the freshly generated font with the unpatched source and puts
//! back the `head` flags, `lowestRecPPEM` and `OS/2.xAvgCharWidth` the
//! compiler changed. Checksums are recomputed afterwards.

use super::{Field, TableEditor, TableError, TableResult, Tag};
use crate::core::errors::{PatchError, PatchResult};
use crate::logging::Diagnostics;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// `head.flags` bit 3: force ppem to integer values
const FLAG_INTEGER_PPEM: u32 = 0x08;

/// What to do with `OS/2.xAvgCharWidth` of one subfont
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvgWidthFix {
    #[default]
    Untouched,
    CopyFromSource,
    Set(u16),
}

/// Fields changed by one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    pub avg_width_changes: usize,
    pub flag_changes: usize,
    pub ppem_changes: usize,
    pub checksum_reset: bool,
}

impl FixReport {
    pub fn changed(&self) -> bool {
        self.avg_width_changes + self.flag_changes + self.ppem_changes > 0
    }
}

/// Repair every subfont of `dest` using the matching subfont of `source`
pub fn fix_tables<S, D>(
    source: &mut TableEditor<S>,
    dest: &mut TableEditor<D>,
    widths: &[AvgWidthFix],
    diag: &mut Diagnostics,
) -> TableResult<FixReport>
where
    S: Read + Write + Seek,
    D: Read + Write + Seek,
{
    let mut report = FixReport::default();

    for subfont in 0..source.num_fonts() {
        diag.debug(format!("Tweaking {}/{}", subfont + 1, source.num_fonts()));

        let width = match widths.get(subfont as usize).copied().unwrap_or_default() {
            AvgWidthFix::Untouched => None,
            AvgWidthFix::Set(width) => Some((u32::from(width), "")),
            AvgWidthFix::CopyFromSource => {
                let os2 = source.locate(Tag::OS2, subfont)?;
                Some((source.read_field(&os2, Field::AvgCharWidth)?, " (copied from source)"))
            }
        };
        if let Some((width, origin)) = width {
            let os2 = dest.locate(Tag::OS2, subfont)?;
            let current = dest.read_field(&os2, Field::AvgCharWidth)?;
            if dest.write_field(&os2, Field::AvgCharWidth, width)? {
                diag.debug(format!(
                    "Changing xAvgCharWidth from {current} to {width}{origin}"
                ));
                dest.reset_table_checksum(&os2)?;
                report.avg_width_changes += 1;
            }
        }

        let source_head = source.locate(Tag::HEAD, subfont)?;
        let dest_head = dest.locate(Tag::HEAD, subfont)?;
        let mut head_changed = false;

        let source_flags = source.read_field(&source_head, Field::Flags)?;
        let dest_flags = dest.read_field(&dest_head, Field::Flags)?;
        if source_flags & FLAG_INTEGER_PPEM == 0 && dest_flags & FLAG_INTEGER_PPEM != 0 {
            let flags = dest_flags & !FLAG_INTEGER_PPEM;
            diag.debug(format!("Changing flags from 0x{dest_flags:X} to 0x{flags:X}"));
            head_changed |= dest.write_field(&dest_head, Field::Flags, flags)?;
            report.flag_changes += 1;
        }

        let source_ppem = source.read_field(&source_head, Field::LowestRecPpem)?;
        let dest_ppem = dest.read_field(&dest_head, Field::LowestRecPpem)?;
        if source_ppem != dest_ppem {
            diag.debug(format!(
                "Changing lowestRecPPEM from {dest_ppem} to {source_ppem}"
            ));
            head_changed |= dest.write_field(&dest_head, Field::LowestRecPpem, source_ppem)?;
            report.ppem_changes += 1;
        }

        if head_changed {
            dest.reset_table_checksum(&dest_head)?;
        }
    }

    if dest.is_dirty() {
        let head = dest.locate(Tag::HEAD, 0)?;
        dest.reset_full_checksum(&head)?;
        report.checksum_reset = true;
    }

    Ok(report)
}

/// Run [`fix_tables`] on two files
///
/// Structural problems are logged and leave the output as compiled. A
/// rewritten file whose checksum does not verify afterwards is a data error.
pub fn fix_font_files(
    source_path: &Path,
    dest_path: &Path,
    widths: &[AvgWidthFix],
    diag: &mut Diagnostics,
) -> PatchResult<FixReport> {
    let attempt = (|| -> TableResult<FixReport> {
        let mut source = TableEditor::open(source_path, false)?;
        let mut dest = TableEditor::open(dest_path, true)?;
        fix_tables(&mut source, &mut dest, widths, diag)
    })();

    let report = match attempt {
        Ok(report) => report,
        Err(err) => {
            diag.error(format!("Can not handle font flags ({err})"));
            return Ok(FixReport::default());
        }
    };

    if report.checksum_reset {
        let verified = TableEditor::open(dest_path, false).and_then(|mut dest| {
            let head = dest.locate(Tag::HEAD, 0)?;
            dest.verify_full_checksum(&head)
        });
        match verified {
            Ok(()) => {}
            Err(err @ TableError::ChecksumMismatch { .. }) => {
                return Err(PatchError::data(format!(
                    "{}: {err}",
                    dest_path.display()
                )));
            }
            Err(err) => diag.error(format!("Can not verify checksum ({err})")),
        }
    }

    Ok(report)
}

/// Variation tables of a binary font, empty when it can not be read
pub fn variation_tables(path: &Path, diag: &mut Diagnostics) -> Vec<Tag> {
    match TableEditor::open(path, false).and_then(|mut font| font.variation_tables()) {
        Ok(tags) => tags,
        Err(err) => {
            diag.debug(format!("Can not inspect {} ({err})", path.display()));
            Vec::new()
        }
    }
}
