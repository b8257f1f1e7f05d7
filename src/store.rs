//! File-backed storage for normalized callback definitions.
//!
//! A pending callback sits on disk for its whole delay; the scheduler keeps
//! only this handle. Each file is exclusively owned by the one scheduled task
//! that created it and is removed when the dispatch attempt completes. This
//! bounds memory, it is not crash recovery: timers live in memory, so a
//! restart abandons the files' callbacks.

use crate::config::Callback;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Handle to a persisted callback definition file.
#[derive(Debug)]
pub struct CallbackHandle {
    path: PathBuf,
}

impl CallbackHandle {
    /// Serialize a normalized callback into a uniquely named temp file.
    pub fn persist(callback: &Callback) -> anyhow::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("callback-json-")
            .suffix(".json")
            .tempfile()
            .context("creating callback definition file")?;
        serde_json::to_writer(file.as_file(), callback)
            .context("writing callback definition")?;
        let (_, path) = file.keep().context("keeping callback definition file")?;
        debug!(path = %path.display(), "persisted callback definition");
        Ok(Self { path })
    }

    /// Read the persisted definition back.
    pub fn load(&self) -> anyhow::Result<Callback> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading callback definition {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("decoding callback definition {}", self.path.display()))
    }

    /// Remove the definition file. Removal errors are logged, not escalated.
    pub fn remove(&self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "unable to delete callback definition file"
                );
            }
        }
    }

    /// Location of the persisted definition.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
