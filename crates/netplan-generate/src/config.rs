//! Filesystem layout used by the generator.
//!
//! Every path the generator reads or writes hangs off a single root
//! directory, `/` unless overridden with `--root-dir`. The relative
//! locations are fixed and collected here so the source scan, the backend
//! writers and the side effects agree on them.

use std::path::{Path, PathBuf};

/// Root directory used when `--root-dir` is not given.
pub const DEFAULT_ROOT: &str = "/";
/// Output directory for `systemd-networkd` units, relative to the root.
pub const NETWORKD_DIR: &str = "run/systemd/network";
/// Output directory for NetworkManager keyfiles, relative to the root.
pub const NM_CONNECTIONS_DIR: &str = "run/NetworkManager/system-connections";
/// NetworkManager drop-in configuration directory, relative to the root.
pub const NM_CONF_DIR: &str = "run/NetworkManager/conf.d";
/// Drop-in that shadows the distribution policy limiting NetworkManager to
/// wifi and wwan devices.
pub const GLOBALLY_MANAGED_DEVICES: &str = "10-globally-managed-devices.conf";
/// Device manager control binary invoked to drop its rule cache.
pub const UDEVADM: &str = "/sbin/udevadm";

/// Resolved locations under a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl Layout {
    /// Create a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a root-relative path onto the root.
    #[must_use]
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    #[must_use]
    pub fn networkd_dir(&self) -> PathBuf {
        self.join(NETWORKD_DIR)
    }

    #[must_use]
    pub fn nm_connections_dir(&self) -> PathBuf {
        self.join(NM_CONNECTIONS_DIR)
    }

    #[must_use]
    pub fn nm_conf_dir(&self) -> PathBuf {
        self.join(NM_CONF_DIR)
    }

    /// Path of the globally-managed-devices override.
    #[must_use]
    pub fn globally_managed_devices(&self) -> PathBuf {
        self.nm_conf_dir().join(GLOBALLY_MANAGED_DEVICES)
    }
}
