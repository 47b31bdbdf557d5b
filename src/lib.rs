//! Shared types for the netplan generator.
//!
//! This library turns netplan YAML sources into an immutable
//! [`DefinitionStore`]: the parse phase feeds every selected file into a
//! [`Parser`], and [`Parser::finish`] hands back the merged state that the
//! backend writers consume.

pub mod definition;
pub mod parse;

pub use definition::{
    DefinitionStore, DeviceKind, NetDefinition, Renderer, RouteEntry, RuleEntry,
};
pub use parse::{ParseError, Parser};

/// Name of the YAML section that holds every netplan setting.
pub const NETWORK_KEY: &str = "network";

/// The only configuration language version understood by the parser.
pub const SUPPORTED_VERSION: u64 = 2;
