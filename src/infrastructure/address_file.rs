//! Cached device address on disk.
//!
//! A single text file holding one address. Written whenever the reconciler
//! learns a new address, read when nothing is attached to ask.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, Result};

use super::runner::clean;
use super::AddressStore;

/// File-backed [`AddressStore`].
#[derive(Debug, Clone)]
pub struct AddressFile {
    path: PathBuf,
}

impl AddressFile {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the cached address, if any.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Cleared cached address");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::address_file(&self.path, "Failed to remove", e)),
        }
    }
}

impl AddressStore for AddressFile {
    fn load(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::address_file(&self.path, "Failed to read", e)),
        };

        let address = clean(&content);
        Ok((!address.is_empty()).then_some(address))
    }

    fn save(&self, address: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::address_file(&self.path, "Failed to create directory", e))?;
        }

        fs::write(&self.path, address)
            .map_err(|e| AppError::address_file(&self.path, "Failed to write", e))?;

        tracing::debug!(address, path = %self.path.display(), "Saved device address");
        Ok(())
    }
}
