//! One complete generation run.
//!
//! Stamp check (generator mode only), source selection, parsing, stale
//! output cleanup, backend dispatch, side effects, stamp write. Every
//! failure aborts the run before the stamp is written.

use netplan_lib::{DefinitionStore, ParseError, Parser};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::{BackendError, NetworkdWriter, NmWriter};
use crate::cli::Invocation;
use crate::effects::{self, ServiceError, Services};
use crate::generate;
use crate::sources::{self, SourceError};
use crate::stamp::{RunState, Stamp, StampError};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Sources(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Stamp(#[from] StampError),
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A previous generator run left its stamp; nothing was done.
    AlreadyRan { stamp: PathBuf },
    /// Configuration was generated.
    Generated {
        /// Sources parsed, in processing order.
        sources: Vec<PathBuf>,
        /// Whether any output needs `systemd-networkd`.
        any_networkd: bool,
    },
}

/// Parse `sources` in order and freeze the merged state.
///
/// # Errors
///
/// Returns the first parse error; nothing after the failing file is read.
pub fn load(sources: &[PathBuf]) -> Result<DefinitionStore, ParseError> {
    let mut parser = Parser::new();
    for source in sources {
        parser.parse_file(source)?;
    }
    parser.finish()
}

/// Run the generator for `invocation`.
///
/// # Errors
///
/// Returns a [`GenerateError`] for the first failing step. The stamp is
/// written only when every step succeeded.
pub fn run(invocation: &Invocation, services: &impl Services) -> Result<Outcome, GenerateError> {
    let generator_dir = invocation.mode.generator_dir();
    let stamp = generator_dir.map(Stamp::in_dir);
    if let Some(stamp) = &stamp
        && stamp.state() == RunState::Run
    {
        info!(stamp = %stamp.path().display(), "Generator already ran");
        return Ok(Outcome::AlreadyRan {
            stamp: stamp.path().to_path_buf(),
        });
    }

    let layout = &invocation.layout;
    let sources = sources::select(invocation.mode.explicit_files(), layout)?;
    debug!(count = sources.len(), "Selected sources");
    let store = load(&sources)?;

    let mut networkd = NetworkdWriter::new(&store);
    let mut nm = NmWriter::new();
    generate::cleanup(layout, &networkd, &nm)?;
    let any_networkd = generate::generate(&store, layout, &mut networkd, &mut nm)?;

    effects::refresh_device_rules(services, any_networkd);
    effects::release_nm_devices(&store, layout)?;

    if let (Some(dir), Some(stamp)) = (generator_dir, &stamp) {
        finish_generator(services, any_networkd, dir, stamp)?;
    }

    Ok(Outcome::Generated {
        sources,
        any_networkd,
    })
}

fn finish_generator(
    services: &impl Services,
    any_networkd: bool,
    dir: &Path,
    stamp: &Stamp,
) -> Result<(), GenerateError> {
    if effects::enable_networkd(services, any_networkd, dir)? {
        info!(dir = %dir.display(), "Enabled systemd-networkd");
    }
    stamp.write()?;
    debug!(stamp = %stamp.path().display(), "Recorded generator run");
    Ok(())
}
