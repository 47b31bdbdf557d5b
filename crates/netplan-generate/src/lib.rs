#![cfg_attr(docsrs, feature(doc_cfg))]

//! Library components for the `netplan-generate` binary.
//!
//! # Overview
//! This crate exposes:
//! - [`cli::Invocation`]: the parsed command line, distinguishing direct
//!   runs from systemd generator runs.
//! - [`sources`]: discovery of YAML sources across `/lib`, `/etc` and
//!   `/run`.
//! - [`generate`]: single-pass dispatch to the [`backend`] writers.
//! - [`stamp`] and [`effects`]: the run-once guard and post-generation
//!   actions.
//! - [`pipeline::run`]: all of the above in order.
//!
//! # Examples
//! ```rust,no_run
//! use netplan_generate::cli::Invocation;
//! use netplan_generate::effects::Systemd;
//! use netplan_generate::pipeline::run;
//!
//! let invocation = Invocation::from_args(["netplan-generate", "--root-dir", "/mnt"])
//!     .expect("arguments must be valid");
//! run(&invocation, &Systemd::default()).expect("generation must succeed");
//! ```
pub mod backend;
pub mod cli;
pub mod config;
pub mod effects;
pub mod generate;
pub mod logging;
pub mod pipeline;
pub mod sources;
pub mod stamp;
pub mod util;
