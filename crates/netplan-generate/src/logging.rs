//! Logging utilities for the generator.
//!
//! Initializes structured logging using `tracing` and
//! `tracing-subscriber`, reading filter settings from the `RUST_LOG`
//! environment variable. Output goes to stderr: generators run before
//! the journal is fully up, and systemd captures their stderr.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global tracing subscriber.
///
/// Call `init` before any logging statements to avoid missing logs.
///
/// # Examples
///
/// ```rust,no_run
/// use netplan_generate::logging::init;
///
/// init();
/// tracing::debug!("Logging is initialized!");
/// ```
pub fn init() {
    init_with_writer(fmt::writer::BoxMakeWriter::new(std::io::stderr));
}

/// Initialize logging with a custom writer.
///
/// Lines carry neither timestamps nor colour codes: the journal stamps
/// each line itself and stores escape sequences verbatim. Does nothing if
/// a global subscriber is already installed, so the first writer wins.
///
/// # Examples
///
/// ```rust,no_run
/// use netplan_generate::logging::init_with_writer;
/// use tracing_subscriber::fmt;
///
/// init_with_writer(fmt::writer::BoxMakeWriter::new(std::io::stderr));
/// ```
pub fn init_with_writer<W>(writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .without_time()
        .try_init();
}
