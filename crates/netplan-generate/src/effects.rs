//! Actions taken after the backend writers have run.
//!
//! These touch the running system rather than the generated files: the
//! device manager's rule cache, NetworkManager's device scope and the
//! enablement of `systemd-networkd` from a generator.

use netplan_lib::{DefinitionStore, Renderer};
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::{self, write_file};
use crate::config::{Layout, UDEVADM};

/// Errors raised by service collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The helper process could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The helper process exited unsuccessfully.
    #[error("{program} exited with {status}")]
    Status {
        program: String,
        status: std::process::ExitStatus,
    },
    /// An enablement symlink could not be created.
    #[error("failed to create {}: {source}", .path.display())]
    Link {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// System services the generator interacts with.
pub trait Services {
    /// Make the device manager drop its cached rule files.
    fn reload_device_rules(&self) -> Result<(), ServiceError>;

    /// Pull `systemd-networkd` into the boot transaction from a generator
    /// output directory.
    fn enable_networkd(&self, generator_dir: &Path) -> Result<(), ServiceError>;
}

/// Links created in the generator directory to enable networkd.
pub const NETWORKD_LINKS: [(&str, &str, &str); 2] = [
    (
        "multi-user.target.wants",
        "systemd-networkd.service",
        "../systemd-networkd.service",
    ),
    (
        "network-online.target.wants",
        "systemd-networkd-wait-online.service",
        "/lib/systemd/system/systemd-networkd-wait-online.service",
    ),
];

/// The real system: `udevadm` and systemd generator symlinks.
#[derive(Debug, Clone)]
pub struct Systemd {
    udevadm: PathBuf,
}

impl Default for Systemd {
    fn default() -> Self {
        Self {
            udevadm: PathBuf::from(UDEVADM),
        }
    }
}

impl Systemd {
    /// Use a different `udevadm` binary.
    #[must_use]
    pub fn with_udevadm(udevadm: impl Into<PathBuf>) -> Self {
        Self {
            udevadm: udevadm.into(),
        }
    }
}

impl Services for Systemd {
    fn reload_device_rules(&self) -> Result<(), ServiceError> {
        let program = self.udevadm.display().to_string();
        let status = Command::new(&self.udevadm)
            .args(["control", "--reload"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| ServiceError::Spawn {
                program: program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ServiceError::Status { program, status })
        }
    }

    fn enable_networkd(&self, generator_dir: &Path) -> Result<(), ServiceError> {
        for (wants, unit, target) in NETWORKD_LINKS {
            let dir = generator_dir.join(wants);
            let link = dir.join(unit);
            debug!(link = %link.display(), "Adding networkd enablement symlink");
            std::fs::create_dir_all(&dir).map_err(|source| ServiceError::Link {
                path: dir.clone(),
                source,
            })?;
            match symlink(target, &link) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => return Err(ServiceError::Link { path: link, source }),
            }
        }
        Ok(())
    }
}

/// Drop the device manager's rule cache after networkd output was written.
///
/// Newly written `.link` files are otherwise only noticed on the next
/// periodic cache refresh. Best effort: a missing or failing `udevadm` must
/// not fail generation, so the error is logged and dropped here.
pub fn refresh_device_rules(services: &impl Services, any_networkd: bool) {
    if !any_networkd {
        return;
    }
    if let Err(e) = services.reload_device_rules() {
        debug!(error = %e, "Ignoring device rule reload failure");
    }
}

/// Shadow the distribution policy that restricts NetworkManager to wifi and
/// wwan devices when NetworkManager is the global renderer.
///
/// Returns whether the override was written.
///
/// # Errors
///
/// Returns an error if the override file cannot be written.
pub fn release_nm_devices(store: &DefinitionStore, layout: &Layout) -> backend::Result<bool> {
    if store.global_renderer() != Some(Renderer::NetworkManager) {
        return Ok(false);
    }
    write_file(&layout.globally_managed_devices(), "", None)?;
    info!("NetworkManager manages all devices");
    Ok(true)
}

/// Enable networkd from a generator run when any output needs it.
///
/// Called before the run stamp is written, so a crash in between simply
/// repeats enablement on the next trigger.
///
/// # Errors
///
/// Returns the collaborator's error; the caller must not write the stamp.
pub fn enable_networkd(
    services: &impl Services,
    any_networkd: bool,
    generator_dir: &Path,
) -> Result<bool, ServiceError> {
    if !any_networkd {
        return Ok(false);
    }
    services.enable_networkd(generator_dir)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "simplify test output")]
    use super::*;
    use netplan_lib::Parser;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Calls {
        reloads: RefCell<usize>,
        enabled: RefCell<Vec<PathBuf>>,
        fail_reload: bool,
    }

    impl Services for Calls {
        fn reload_device_rules(&self) -> Result<(), ServiceError> {
            *self.reloads.borrow_mut() += 1;
            if self.fail_reload {
                return Err(ServiceError::Spawn {
                    program: "udevadm".into(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            Ok(())
        }

        fn enable_networkd(&self, generator_dir: &Path) -> Result<(), ServiceError> {
            self.enabled.borrow_mut().push(generator_dir.to_path_buf());
            Ok(())
        }
    }

    fn store(yaml: &str) -> DefinitionStore {
        let mut parser = Parser::new();
        parser
            .parse_str(Path::new("test.yaml"), yaml)
            .expect("parse");
        parser.finish().expect("finish")
    }

    #[test]
    fn reload_only_when_networkd_output_exists() {
        let calls = Calls::default();
        refresh_device_rules(&calls, false);
        assert_eq!(*calls.reloads.borrow(), 0);
        refresh_device_rules(&calls, true);
        assert_eq!(*calls.reloads.borrow(), 1);
    }

    #[test]
    fn reload_failure_is_swallowed() {
        let calls = Calls {
            fail_reload: true,
            ..Calls::default()
        };
        refresh_device_rules(&calls, true);
        assert_eq!(*calls.reloads.borrow(), 1);
    }

    #[test]
    fn missing_udevadm_reports_spawn_error() {
        let dir = tempdir().expect("temp dir");
        let services = Systemd::with_udevadm(dir.path().join("no-udevadm"));
        let err = services.reload_device_rules().expect_err("missing binary");
        assert!(matches!(err, ServiceError::Spawn { .. }));
    }

    #[test]
    fn override_written_for_network_manager() {
        let dir = tempdir().expect("temp dir");
        let layout = Layout::new(dir.path());
        let store = store("network:\n  renderer: NetworkManager\n");

        assert!(release_nm_devices(&store, &layout).expect("write"));
        assert_eq!(
            fs::read(layout.globally_managed_devices()).expect("read").len(),
            0
        );
    }

    #[test]
    fn override_truncates_existing_content() {
        let dir = tempdir().expect("temp dir");
        let layout = Layout::new(dir.path());
        fs::create_dir_all(layout.nm_conf_dir()).expect("mkdir");
        fs::write(layout.globally_managed_devices(), "[keyfile]\n").expect("seed");
        let store = store("network:\n  renderer: NetworkManager\n");

        release_nm_devices(&store, &layout).expect("write");

        assert_eq!(
            fs::read(layout.globally_managed_devices()).expect("read").len(),
            0
        );
    }

    #[test]
    fn no_override_for_networkd() {
        let dir = tempdir().expect("temp dir");
        let layout = Layout::new(dir.path());
        let store = store("network:\n  renderer: networkd\n");
        assert!(!release_nm_devices(&store, &layout).expect("skip"));
        assert!(!layout.globally_managed_devices().exists());
    }

    #[test]
    fn enable_respects_signal() {
        let calls = Calls::default();
        let dir = Path::new("/run/systemd/generator");
        assert!(!enable_networkd(&calls, false, dir).expect("skip"));
        assert!(calls.enabled.borrow().is_empty());
        assert!(enable_networkd(&calls, true, dir).expect("enable"));
        assert_eq!(*calls.enabled.borrow(), vec![dir.to_path_buf()]);
    }

    #[test]
    fn systemd_enablement_creates_links_idempotently() {
        let dir = tempdir().expect("temp dir");
        let services = Systemd::default();
        services.enable_networkd(dir.path()).expect("first");
        services.enable_networkd(dir.path()).expect("second");

        let link = dir
            .path()
            .join("multi-user.target.wants/systemd-networkd.service");
        assert_eq!(
            fs::read_link(&link).expect("read link"),
            PathBuf::from("../systemd-networkd.service")
        );
        let wait = dir
            .path()
            .join("network-online.target.wants/systemd-networkd-wait-online.service");
        assert_eq!(
            fs::read_link(&wait).expect("read link"),
            PathBuf::from("/lib/systemd/system/systemd-networkd-wait-online.service")
        );
    }
}
