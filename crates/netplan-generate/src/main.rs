//! Entry point for the `netplan-generate` binary.
//!
//! Reads netplan YAML sources and writes systemd-networkd and
//! NetworkManager configuration under `/run`. Also installed as a systemd
//! generator, in which case it runs at most once per boot.

use anyhow::Result;
use std::io::{self, Write};
use std::process::ExitCode;

use netplan_generate::cli::{Invocation, UsageError};
use netplan_generate::effects::Systemd;
use netplan_generate::logging;
use netplan_generate::pipeline::{self, Outcome};

fn main() -> ExitCode {
    logging::init();
    match try_main() {
        Ok(code) => code,
        Err(e) => {
            report(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let invocation = match Invocation::from_args(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(UsageError::Clap(e)) if !e.use_stderr() => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(UsageError::Clap(e)) => {
            report(&format!("failed to parse options: {e}"));
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    match pipeline::run(&invocation, &Systemd::default())? {
        Outcome::AlreadyRan { stamp } => report(&format!(
            "netplan generate already ran, remove {} to force re-run",
            stamp.display()
        )),
        Outcome::Generated { .. } => {}
    }
    Ok(ExitCode::SUCCESS)
}

/// Write a message for the operator or service manager.
fn report(message: &str) {
    let _ = writeln!(io::stderr(), "{}", message.trim_end());
}
