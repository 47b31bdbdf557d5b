//! Discovery of netplan sources across the three configuration tiers.
//!
//! Files in `/run/netplan` shadow same-named files in `/etc/netplan`, which
//! shadow those in `/lib/netplan`. The surviving files are processed in
//! byte-wise order of their names, regardless of tier, so `10-a.yaml` from
//! `/lib` is read before `20-b.yaml` from `/run`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::Layout;
use crate::util::is_source_file;

/// Errors raised while scanning tier directories.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A tier directory exists but could not be listed.
    #[error("failed to enumerate {}: {source}", .dir.display())]
    Enumerate {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Configuration tiers, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Distribution defaults.
    Lib,
    /// Administrator configuration.
    Etc,
    /// Runtime configuration.
    Run,
}

impl Tier {
    /// Every tier in overlay order.
    pub const ALL: [Self; 3] = [Self::Lib, Self::Etc, Self::Run];

    /// Directory of the tier relative to the root.
    #[must_use]
    pub const fn dir(self) -> &'static str {
        match self {
            Self::Lib => "lib/netplan",
            Self::Etc => "etc/netplan",
            Self::Run => "run/netplan",
        }
    }
}

/// Winning path for every source name, ordered by name.
///
/// `OsString` orders by raw bytes on Unix, so iteration order is the
/// processing order.
pub type ResolvedFileSet = BTreeMap<OsString, PathBuf>;

/// Choose the files to parse.
///
/// Explicit paths are returned unchanged and in order; only when none are
/// given are the tier directories under `layout` scanned.
///
/// # Errors
///
/// Returns [`SourceError::Enumerate`] if a tier directory cannot be read.
pub fn select(explicit: &[PathBuf], layout: &Layout) -> Result<Vec<PathBuf>, SourceError> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }
    Ok(resolve(layout)?.into_values().collect())
}

/// Overlay the tiers under `layout` into a single file set.
///
/// # Errors
///
/// Returns [`SourceError::Enumerate`] if a tier directory cannot be read.
pub fn resolve(layout: &Layout) -> Result<ResolvedFileSet, SourceError> {
    let mut resolved = ResolvedFileSet::new();
    for tier in Tier::ALL {
        for path in enumerate(&layout.join(tier.dir()))? {
            if let Some(name) = path.file_name() {
                if let Some(shadowed) = resolved.insert(name.to_os_string(), path.clone()) {
                    debug!(
                        shadowed = %shadowed.display(),
                        by = %path.display(),
                        "Source overridden by higher tier"
                    );
                }
            }
        }
    }
    Ok(resolved)
}

/// List source files in `dir`. A missing directory simply has no sources.
fn enumerate(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(SourceError::Enumerate {
                dir: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SourceError::Enumerate {
            dir: dir.to_path_buf(),
            source,
        })?;
        if is_source_file(entry.file_name()) {
            found.push(entry.path());
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "simplify test output")]
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::{TempDir, tempdir};

    #[fixture]
    fn root() -> TempDir {
        tempdir().expect("create temp root")
    }

    fn place(root: &Path, tier: Tier, name: &str) -> PathBuf {
        let dir = root.join(tier.dir());
        fs::create_dir_all(&dir).expect("create tier dir");
        let path = dir.join(name);
        fs::write(&path, "network: {}\n").expect("write source");
        path
    }

    #[rstest]
    fn empty_root_has_no_sources(root: TempDir) {
        let layout = Layout::new(root.path());
        assert!(select(&[], &layout).expect("select").is_empty());
    }

    #[rstest]
    #[case::lib_only(&[Tier::Lib], Tier::Lib)]
    #[case::etc_over_lib(&[Tier::Lib, Tier::Etc], Tier::Etc)]
    #[case::run_over_etc(&[Tier::Etc, Tier::Run], Tier::Run)]
    #[case::run_over_all(&[Tier::Lib, Tier::Etc, Tier::Run], Tier::Run)]
    #[case::run_over_lib(&[Tier::Lib, Tier::Run], Tier::Run)]
    fn highest_tier_wins(root: TempDir, #[case] present: &[Tier], #[case] winner: Tier) {
        for tier in present {
            place(root.path(), *tier, "01-netcfg.yaml");
        }
        let resolved = resolve(&Layout::new(root.path())).expect("resolve");
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved.get(&OsString::from("01-netcfg.yaml")),
            Some(&root.path().join(winner.dir()).join("01-netcfg.yaml"))
        );
    }

    #[rstest]
    fn order_is_by_name_across_tiers(root: TempDir) {
        let b = place(root.path(), Tier::Lib, "20-b.yaml");
        let a = place(root.path(), Tier::Run, "10-a.yaml");
        let c = place(root.path(), Tier::Etc, "30-c.yaml");
        let selected = select(&[], &Layout::new(root.path())).expect("select");
        assert_eq!(selected, vec![a, b, c]);
    }

    #[rstest]
    fn order_is_bytewise(root: TempDir) {
        let upper = place(root.path(), Tier::Etc, "Z.yaml");
        let lower = place(root.path(), Tier::Etc, "a.yaml");
        let selected = select(&[], &Layout::new(root.path())).expect("select");
        assert_eq!(selected, vec![upper, lower]);
    }

    #[rstest]
    fn non_utf8_names_are_sources_ordered_by_bytes(root: TempDir) {
        use std::os::unix::ffi::OsStrExt;
        let dir = root.path().join(Tier::Etc.dir());
        fs::create_dir_all(&dir).expect("create tier dir");
        let latin1 = dir.join(std::ffi::OsStr::from_bytes(b"10-caf\xe9.yaml"));
        fs::write(&latin1, "network: {}\n").expect("write source");
        let ascii = place(root.path(), Tier::Etc, "10-cafe.yaml");
        let selected = select(&[], &Layout::new(root.path())).expect("select");
        assert_eq!(selected, vec![ascii, latin1]);
    }

    #[rstest]
    fn non_sources_are_ignored(root: TempDir) {
        place(root.path(), Tier::Etc, "01.yaml.bak");
        place(root.path(), Tier::Etc, ".hidden.yaml");
        place(root.path(), Tier::Etc, "README");
        let kept = place(root.path(), Tier::Etc, "01.yaml");
        let selected = select(&[], &Layout::new(root.path())).expect("select");
        assert_eq!(selected, vec![kept]);
    }

    #[rstest]
    fn explicit_files_bypass_scan(root: TempDir) {
        place(root.path(), Tier::Etc, "01.yaml");
        let explicit = vec![PathBuf::from("/srv/b.yaml"), PathBuf::from("/srv/a.yaml")];
        let selected = select(&explicit, &Layout::new(root.path())).expect("select");
        assert_eq!(selected, explicit);
    }

    #[rstest]
    fn tier_path_that_is_a_file_has_no_sources(root: TempDir) {
        let lib = root.path().join("lib");
        fs::create_dir_all(&lib).expect("create lib");
        fs::write(lib.join("netplan"), "not a dir").expect("write file");
        let resolved = resolve(&Layout::new(root.path())).expect("resolve");
        assert!(resolved.is_empty());
    }
}
