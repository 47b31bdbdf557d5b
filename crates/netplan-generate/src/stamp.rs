//! Run-once guard for generator invocations.
//!
//! systemd may run generators more than once per boot (for instance on
//! `daemon-reload`). After a successful run an empty stamp file is left in
//! the first generator directory; while it exists further runs do nothing.
//! The stamp is never removed here.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the stamp file inside the generator directory.
pub const STAMP_NAME: &str = "netplan.stamp";

/// Failure to record a completed run. Never ignored: without the stamp
/// every later trigger regenerates the configuration.
#[derive(Debug, Error)]
pub enum StampError {
    #[error("internal error: cannot create run stamp {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Whether generation already happened for this boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotRun,
    Run,
}

/// The stamp file of one generator directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    path: PathBuf,
}

impl Stamp {
    /// Stamp inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(STAMP_NAME),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        if self.path.exists() {
            RunState::Run
        } else {
            RunState::NotRun
        }
    }

    /// Record a completed run.
    ///
    /// # Errors
    ///
    /// Returns [`StampError::Write`] if the file cannot be created.
    pub fn write(&self) -> Result<(), StampError> {
        File::create(&self.path).map_err(|source| StampError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}
