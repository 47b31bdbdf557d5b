//! Backend writers.
//!
//! A backend turns merged definitions into configuration for one network
//! daemon. Writers report whether they produced anything that needs
//! `systemd-networkd` running; the orchestrator folds those answers into a
//! single signal.

pub mod networkd;
pub mod nm;

use netplan_lib::{NetDefinition, RouteEntry, RuleEntry};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::Layout;
use crate::util::has_prefix;

pub use networkd::NetworkdWriter;
pub use nm::NmWriter;

/// Errors raised while writing or removing backend output.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Writing an output file failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Removing stale output failed.
    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// A per-definition configuration writer.
pub trait Backend {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Remove everything a previous run of this backend wrote.
    fn cleanup(&self, layout: &Layout) -> Result<()>;

    /// Write configuration for one definition. Returns `true` if the output
    /// requires `systemd-networkd`.
    fn write_definition(&mut self, def: &NetDefinition, layout: &Layout) -> Result<bool>;

    /// Flush state accumulated across definitions.
    fn finish(&mut self, _layout: &Layout) -> Result<()> {
        Ok(())
    }
}

/// Writer for routes and rules that live outside any definition.
pub trait GlobalRouting {
    /// Write one global route. Returns `true` if the output requires
    /// `systemd-networkd`.
    fn write_route(&mut self, route: &RouteEntry, layout: &Layout) -> Result<bool>;

    /// Write one global routing policy rule.
    fn write_rule(&mut self, rule: &RuleEntry, layout: &Layout) -> Result<bool>;
}

/// Create or truncate `path` with `contents`, creating parent directories.
///
/// With a `mode`, the file is created with it and an existing file is
/// narrowed to it before any contents are written.
pub(crate) fn write_file(path: &Path, contents: &str, mode: Option<u32>) -> Result<()> {
    let wrap = |source| BackendError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    if let Some(mode) = mode {
        options.mode(mode);
    }
    let mut file = options.open(path).map_err(wrap)?;
    if let Some(mode) = mode {
        file.set_permissions(fs::Permissions::from_mode(mode))
            .map_err(wrap)?;
    }
    file.write_all(contents.as_bytes()).map_err(wrap)?;
    debug!(path = %path.display(), "Wrote output file");
    Ok(())
}

/// Remove entries of `dir` whose names start with `prefix`.
pub(crate) fn remove_prefixed(dir: &Path, prefix: &str) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(BackendError::Remove {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    for entry in entries {
        let entry = entry.map_err(|source| BackendError::Remove {
            path: dir.to_path_buf(),
            source,
        })?;
        if has_prefix(entry.file_name(), prefix) {
            remove_path(&entry.path())?;
        }
    }
    Ok(())
}

/// Remove a file or directory tree if present.
pub(crate) fn remove_path(path: &Path) -> Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BackendError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "simplify test output")]
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_file_creates_parents_and_mode() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("a/b/c.conf");
        write_file(&path, "x", Some(0o600)).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "x");
        let mode = fs::metadata(&path).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn write_file_narrows_existing_file_before_writing() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("netplan-eth0.nmconnection");
        fs::write(&path, "old contents that are longer").expect("seed");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

        write_file(&path, "new", Some(0o600)).expect("write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
        let mode = fs::metadata(&path).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn remove_prefixed_keeps_foreign_entries() {
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join("10-netplan-eth0.network"), "").expect("write");
        fs::create_dir(dir.path().join("10-netplan-eth0.network.d")).expect("mkdir");
        fs::write(dir.path().join("10-netplan-eth0.network.d/70-route-0.conf"), "")
            .expect("write");
        fs::write(dir.path().join("20-wired.network"), "").expect("write");

        remove_prefixed(dir.path(), "10-netplan-").expect("cleanup");

        let left: Vec<_> = fs::read_dir(dir.path())
            .expect("list")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("20-wired.network")]);
    }

    #[test]
    fn remove_prefixed_tolerates_missing_dir() {
        let dir = tempdir().expect("temp dir");
        remove_prefixed(&dir.path().join("absent"), "x").expect("no-op");
    }

    #[test]
    fn remove_path_tolerates_missing_file() {
        let dir = tempdir().expect("temp dir");
        remove_path(&dir.path().join("absent")).expect("no-op");
    }
}
