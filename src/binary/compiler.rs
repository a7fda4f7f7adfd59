//! Compiling the patched source with an external font compiler

use crate::core::errors::{PatchError, PatchResult};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Runs `<executable> <source> --output <binary>`
pub struct FontCompiler {
    executable: PathBuf,
}

impl FontCompiler {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn compile(&self, source: &Path, output: &Path) -> PatchResult<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                PatchError::data(format!("Can not create {}: {err}", parent.display()))
            })?;
        }

        let mut cmd = Command::new(&self.executable);
        cmd.arg(source).arg("--output").arg(output);
        debug!("Running {:?}", cmd);

        let result = cmd.output().map_err(|err| {
            PatchError::data(format!(
                "Can not run font compiler {}: {err}",
                self.executable.display()
            ))
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(PatchError::data(format!(
                "Font compilation failed ({}): {}",
                result.status,
                stderr.trim()
            )));
        }

        info!("Compiled {}", output.display());
        Ok(())
    }
}

/// Whether `path` names a binary font the table editor can work on
pub fn is_binary_font(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"))
        .unwrap_or(false)
}
