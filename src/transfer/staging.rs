// 本地临时文件：保存镜像归档，用后删除
use crate::utils::error::TransferError;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    removed: bool,
}

impl StagingFile {
    /// Reserves a unique file name in `dir`.
    ///
    /// The temporary file is deleted right away so that the save command can
    /// create it itself; only the name is kept.
    pub fn allocate<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let temp = tempfile::Builder::new()
            .prefix("podman")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
        let path = temp.path().to_path_buf();
        temp.close()
            .with_context(|| format!("Failed to release temporary file {}", path.display()))?;

        Ok(Self::at(path)?)
    }

    /// Uses `path` as the staging name, which must not exist yet.
    pub fn at(path: PathBuf) -> Result<Self, TransferError> {
        if path.symlink_metadata().is_ok() {
            return Err(TransferError::StaleArtifact { path: path.display().to_string() });
        }
        debug!("Staging image archive at {}", path.display());
        Ok(StagingFile { path, removed: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file after its contents have been loaded.
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
