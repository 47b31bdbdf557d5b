//! Test support utilities.
//!
//! Builders for scratch root directories laid out like a real system, and a
//! [`RecordingServices`] double that stands in for `udevadm` and systemd.

pub mod logging;
pub mod services;
pub mod tree;

pub use services::RecordingServices;
pub use tree::ConfigTree;
