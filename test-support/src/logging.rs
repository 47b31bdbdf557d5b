//! Log capture for integration tests.
//!
//! Installs a subscriber with a fixed filter instead of reading `RUST_LOG`,
//! so tests neither depend on nor mutate the environment.

#![expect(clippy::expect_used, reason = "simplify test setup")]

use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt};

/// Shared buffer receiving formatted log lines.
#[derive(Clone, Debug, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Everything logged so far.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("lock log buffer")).into_owned()
    }

    /// Drop what has been captured so far.
    pub fn clear(&self) {
        self.0.lock().expect("lock log buffer").clear();
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("lock log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture every event matching `filter` for the rest of the process.
///
/// Only the first call installs a subscriber; later calls return the same
/// buffer and their filter is ignored. Tests sharing a process should
/// [`CapturedLogs::clear`] it and run serially.
///
/// # Examples
///
/// ```rust,no_run
/// use test_support::logging::capture;
///
/// let logs = capture("debug");
/// tracing::debug!("hello");
/// assert!(logs.text().contains("hello"));
/// ```
pub fn capture(filter: &str) -> CapturedLogs {
    static LOGS: OnceLock<CapturedLogs> = OnceLock::new();
    LOGS.get_or_init(|| {
        let logs = CapturedLogs::default();
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(logs.clone())
            .with_ansi(false)
            .without_time()
            .try_init();
        logs
    })
    .clone()
}
