//! A [`Services`] double that records calls instead of touching the system.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use netplan_generate::effects::{ServiceError, Services};

/// Records reload and enablement requests.
#[derive(Debug, Default)]
pub struct RecordingServices {
    reloads: RefCell<usize>,
    enabled: RefCell<Vec<PathBuf>>,
    fail_reload: bool,
    fail_enable: bool,
}

impl RecordingServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every reload fail as if `udevadm` were missing.
    #[must_use]
    pub fn failing_reload(mut self) -> Self {
        self.fail_reload = true;
        self
    }

    /// Make every enablement request fail.
    #[must_use]
    pub fn failing_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    /// Number of reload requests.
    pub fn reloads(&self) -> usize {
        *self.reloads.borrow()
    }

    /// Generator directories passed to enablement, in call order.
    pub fn enabled(&self) -> Vec<PathBuf> {
        self.enabled.borrow().clone()
    }

    /// `true` if neither reload nor enablement was requested.
    pub fn untouched(&self) -> bool {
        self.reloads() == 0 && self.enabled.borrow().is_empty()
    }
}

impl Services for RecordingServices {
    fn reload_device_rules(&self) -> Result<(), ServiceError> {
        *self.reloads.borrow_mut() += 1;
        if self.fail_reload {
            return Err(ServiceError::Spawn {
                program: "/sbin/udevadm".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        Ok(())
    }

    fn enable_networkd(&self, generator_dir: &Path) -> Result<(), ServiceError> {
        self.enabled.borrow_mut().push(generator_dir.to_path_buf());
        if self.fail_enable {
            return Err(ServiceError::Link {
                path: generator_dir.join("multi-user.target.wants"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }
}
