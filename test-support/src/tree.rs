//! Scratch root directories for end-to-end tests.

#![expect(clippy::expect_used, reason = "simplify test setup")]

use std::fs;
use std::path::{Path, PathBuf};

use netplan_generate::cli::Invocation;
use netplan_generate::sources::Tier;
use tempfile::TempDir;

/// A temporary root holding tier directories, generated output and,
/// optionally, generator output directories.
#[derive(Debug)]
pub struct ConfigTree {
    root: TempDir,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTree {
    /// Create an empty root.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp root"),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Write `yaml` as `name` into `tier`, returning its path.
    pub fn source(&self, tier: Tier, name: &str, yaml: &str) -> PathBuf {
        let dir = self.root().join(tier.dir());
        fs::create_dir_all(&dir).expect("create tier dir");
        let path = dir.join(name);
        fs::write(&path, yaml).expect("write source");
        path
    }

    /// Write `yaml` outside the tier directories, for explicit invocation.
    pub fn loose_file(&self, name: &str, yaml: &str) -> PathBuf {
        let dir = self.root().join("srv");
        fs::create_dir_all(&dir).expect("create loose dir");
        let path = dir.join(name);
        fs::write(&path, yaml).expect("write loose file");
        path
    }

    /// Plant a file at a root-relative path, e.g. stale output.
    pub fn plant(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("plant file");
        path
    }

    /// Read a root-relative file, `None` if absent.
    pub fn read(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.root().join(relative)).ok()
    }

    /// Whether a root-relative path exists.
    pub fn exists(&self, relative: &str) -> bool {
        self.root().join(relative).exists()
    }

    /// Generator output directories (normal, early, late), created on disk.
    pub fn generator_dirs(&self) -> [PathBuf; 3] {
        ["generator", "generator.early", "generator.late"].map(|name| {
            let dir = self.root().join("run/systemd").join(name);
            fs::create_dir_all(&dir).expect("create generator dir");
            dir
        })
    }

    /// Invocation of the binary by hand against this root.
    pub fn direct(&self, files: &[PathBuf]) -> Invocation {
        let mut args = vec![
            "netplan-generate".into(),
            "--root-dir".into(),
            self.root().as_os_str().to_owned(),
        ];
        args.extend(files.iter().map(|f| f.as_os_str().to_owned()));
        Invocation::from_args(args).expect("valid direct invocation")
    }

    /// Invocation as a systemd generator against this root.
    pub fn generator(&self) -> Invocation {
        let mut args = vec![
            "/lib/systemd/system-generators/netplan".into(),
            "--root-dir".into(),
            self.root().as_os_str().to_owned(),
        ];
        args.extend(self.generator_dirs().map(PathBuf::into_os_string));
        Invocation::from_args(args).expect("valid generator invocation")
    }
}
