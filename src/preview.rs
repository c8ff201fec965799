//! Local previews of avatar files that have not been uploaded yet.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use uuid::Uuid;

use crate::form::AvatarFile;

const PREVIEW_SUBDIR: &str = "contactdesk/preview";

/// Directory where previews are staged.
#[derive(Debug, Clone)]
pub struct PreviewStore {
    dir: PathBuf,
}

impl PreviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in the user's cache directory.
    pub fn in_cache_dir() -> Result<Self> {
        let base = BaseDirs::new().context("unable to determine cache directory")?;
        Ok(Self::new(base.cache_dir().join(PREVIEW_SUBDIR)))
    }

    pub fn stage(&self, file: &AvatarFile) -> io::Result<PreviewHandle> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}.{}", Uuid::new_v4(), extension_for(&file.mime_type)));
        fs::write(&path, &file.bytes)?;
        tracing::debug!(path = %path.display(), "staged avatar preview");
        Ok(PreviewHandle { path })
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type.to_ascii_lowercase().as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// A staged preview file. The file is removed when the handle is dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    path: PathBuf,
}

impl PreviewHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "released avatar preview"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to release avatar preview")
            }
        }
    }
}
