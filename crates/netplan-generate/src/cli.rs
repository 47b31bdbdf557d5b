//! Command line handling.
//!
//! The same binary serves two callers: an administrator (or the `netplan`
//! front end) running it directly, and systemd running it as a generator
//! from `/lib/systemd/system-generators/`. The invocation path decides
//! which.

use clap::{CommandFactory, FromArgMatches, Parser};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{DEFAULT_ROOT, Layout};

/// Path segment identifying a systemd generator invocation.
pub const GENERATOR_PATH_MARKER: &str = "systemd/system-generators/";

/// Command line arguments for `netplan-generate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "netplan-generate",
    about = "Generate backend network configuration from netplan YAML definition.",
    after_help = "This program reads the specified netplan YAML definition file(s)\n\
                  or, if none are given, /etc/netplan/*.yaml.\n\
                  It then generates the corresponding systemd-networkd, NetworkManager,\n\
                  and udev configuration files in /run."
)]
pub struct Args {
    /// Search for and generate configuration files in this root directory
    /// instead of /.
    #[arg(short, long, value_name = "DIR")]
    pub root_dir: Option<PathBuf>,

    /// Read configuration from this/these file(s) instead of
    /// /etc/netplan/*.yaml.
    #[arg(value_name = "CONFIG_FILE")]
    pub files: Vec<PathBuf>,
}

/// Errors returned when the command line cannot be accepted.
#[derive(Debug, Error)]
pub enum UsageError {
    /// clap rejected the arguments, or help/version was requested.
    #[error(transparent)]
    Clap(#[from] clap::Error),
    /// A generator invocation did not receive its three directories.
    #[error("{program} can not be called directly, use 'netplan generate'.")]
    NotDirect { program: String },
}

/// How the binary was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run by hand, optionally with explicit sources.
    Direct { files: Vec<PathBuf> },
    /// Run by systemd with its normal, early and late output directories.
    Generator { dirs: [PathBuf; 3] },
}

impl Mode {
    /// Directory receiving the stamp and enablement links.
    #[must_use]
    pub fn generator_dir(&self) -> Option<&Path> {
        match self {
            Self::Direct { .. } => None,
            Self::Generator { dirs: [normal, _, _] } => Some(normal.as_path()),
        }
    }

    /// Sources named on the command line; generators never name any.
    #[must_use]
    pub fn explicit_files(&self) -> &[PathBuf] {
        match self {
            Self::Direct { files } => files,
            Self::Generator { .. } => &[],
        }
    }
}

/// A validated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub mode: Mode,
    pub layout: Layout,
}

/// Returns whether `program` is being run as a systemd generator.
///
/// # Examples
///
/// ```
/// use netplan_generate::cli::is_generator;
/// assert!(is_generator("/lib/systemd/system-generators/netplan".as_ref()));
/// assert!(!is_generator("/usr/sbin/netplan-generate".as_ref()));
/// ```
#[must_use]
pub fn is_generator(program: &OsStr) -> bool {
    program.to_string_lossy().contains(GENERATOR_PATH_MARKER)
}

impl Invocation {
    /// Parse a full argument vector, `argv[0]` included.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::Clap`] for malformed options (and for
    /// `--help`, outside generator mode) and [`UsageError::NotDirect`] if a
    /// generator invocation does not carry exactly three directories.
    pub fn from_args<I, T>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let program = args.first().cloned().unwrap_or_default();
        let generator = is_generator(&program);

        let mut command = Args::command();
        if generator {
            command = command.disable_help_flag(true);
        }
        let matches = command.try_get_matches_from(&args)?;
        let parsed = Args::from_arg_matches(&matches)?;

        let layout = Layout::new(
            parsed
                .root_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
        );
        let mode = if generator {
            let dirs = <[PathBuf; 3]>::try_from(parsed.files).map_err(|_| {
                UsageError::NotDirect {
                    program: program.to_string_lossy().into_owned(),
                }
            })?;
            Mode::Generator { dirs }
        } else {
            Mode::Direct {
                files: parsed.files,
            }
        };
        Ok(Self { mode, layout })
    }
}
