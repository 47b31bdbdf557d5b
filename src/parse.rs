//! Parsing netplan YAML sources into a [`DefinitionStore`].
//!
//! Sources are fed one at a time through [`Parser::parse_file`]; later
//! sources override settings of same-named definitions from earlier ones.
//! [`Parser::finish`] consumes the parser, resolves backends, checks
//! cross-definition references and returns the immutable store.

use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::definition::{DefinitionStore, DeviceKind, NetDefinition, Renderer, RouteEntry, RuleEntry};
use crate::{NETWORK_KEY, SUPPORTED_VERSION};

/// Errors reported while reading or merging a source.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file is not valid YAML.
    #[error("{}: invalid YAML: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    /// The document has no `network` section.
    #[error("{}: missing 'network' key", .path.display())]
    MissingNetwork { path: PathBuf },
    /// A value has the wrong shape.
    #[error("{}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
    /// An unsupported `version` was requested.
    #[error("{}: only version 2 is supported", .path.display())]
    Version { path: PathBuf },
    /// A route or rule entry failed to deserialise.
    #[error("{}: invalid {what}: {source}", .path.display())]
    Entry {
        path: PathBuf,
        what: &'static str,
        #[source]
        source: serde_yaml::Error,
    },
    /// A later source changed the device kind of an existing definition.
    #[error("{}: updated definition '{id}' changes device type", .path.display())]
    KindChanged { path: PathBuf, id: String },
    /// A definition, route or rule refers to an undefined interface.
    #[error("{}: {owner}: interface '{reference}' is not defined", .path.display())]
    MissingReference {
        path: PathBuf,
        owner: String,
        reference: String,
    },
    /// A global route or rule is attached to a definition that networkd
    /// does not render; no backend would write it.
    #[error("{}: {what} on '{interface}' requires the networkd renderer", .path.display())]
    RequiresNetworkd {
        path: PathBuf,
        what: &'static str,
        interface: String,
    },
}

impl ParseError {
    fn invalid(path: &Path, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct Draft {
    kind: DeviceKind,
    renderer: Option<Renderer>,
    settings: Mapping,
    origin: PathBuf,
}

#[derive(Debug)]
struct Sourced<T> {
    entry: T,
    origin: PathBuf,
}

type RouteKey = (String, String, Option<u32>, Option<u32>);
type RuleKey = (String, Option<String>, Option<String>, u32, Option<u32>);

/// Accumulates definitions across sources.
#[derive(Debug, Default)]
pub struct Parser {
    drafts: BTreeMap<String, Draft>,
    routes: BTreeMap<RouteKey, Sourced<RouteEntry>>,
    rules: BTreeMap<RuleKey, Sourced<RuleEntry>>,
    renderer: Option<Renderer>,
}

impl Parser {
    /// Create an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and merge one source file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid netplan
    /// document.
    pub fn parse_file(&mut self, path: &Path) -> Result<(), ParseError> {
        debug!(file = %path.display(), "Processing input file");
        let text = fs::read_to_string(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(path, &text)
    }

    /// Merge a source already held in memory. `origin` is used for error
    /// messages and provenance only.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not a valid netplan document.
    pub fn parse_str(&mut self, origin: &Path, text: &str) -> Result<(), ParseError> {
        let doc: Value = serde_yaml::from_str(text).map_err(|source| ParseError::Yaml {
            path: origin.to_path_buf(),
            source,
        })?;
        let Some(network) = doc.get(NETWORK_KEY) else {
            return Err(ParseError::MissingNetwork {
                path: origin.to_path_buf(),
            });
        };
        let Some(network) = network.as_mapping() else {
            return Err(ParseError::invalid(origin, "'network' must be a mapping"));
        };

        for (key, value) in network {
            let Some(key) = key.as_str() else {
                return Err(ParseError::invalid(origin, "keys must be strings"));
            };
            match key {
                "version" => {
                    if value.as_u64() != Some(SUPPORTED_VERSION) {
                        return Err(ParseError::Version {
                            path: origin.to_path_buf(),
                        });
                    }
                }
                "renderer" => self.renderer = Some(renderer(origin, value)?),
                "routes" => self.merge_routes(origin, value)?,
                "routing-policy" => self.merge_rules(origin, value)?,
                section => {
                    let Some(kind) = DeviceKind::from_section(section) else {
                        return Err(ParseError::invalid(
                            origin,
                            format!("unknown key '{section}'"),
                        ));
                    };
                    self.merge_section(origin, kind, value)?;
                }
            }
        }
        Ok(())
    }

    fn merge_section(
        &mut self,
        origin: &Path,
        kind: DeviceKind,
        value: &Value,
    ) -> Result<(), ParseError> {
        let entries = match value {
            Value::Null => return Ok(()),
            Value::Mapping(m) => m,
            _ => {
                return Err(ParseError::invalid(
                    origin,
                    format!("'{}' must be a mapping", kind.section()),
                ));
            }
        };

        for (id, settings) in entries {
            let Some(id) = id.as_str() else {
                return Err(ParseError::invalid(origin, "definition ids must be strings"));
            };
            let mut settings = match settings {
                Value::Null => Mapping::new(),
                Value::Mapping(m) => m.clone(),
                _ => {
                    return Err(ParseError::invalid(
                        origin,
                        format!("{id}: settings must be a mapping"),
                    ));
                }
            };
            let own_renderer = settings
                .remove("renderer")
                .map(|v| renderer(origin, &v))
                .transpose()?;

            if let Some(draft) = self.drafts.get_mut(id) {
                if draft.kind != kind {
                    return Err(ParseError::KindChanged {
                        path: origin.to_path_buf(),
                        id: id.to_owned(),
                    });
                }
                for (key, value) in settings {
                    draft.settings.insert(key, value);
                }
                if own_renderer.is_some() {
                    draft.renderer = own_renderer;
                }
                draft.origin = origin.to_path_buf();
            } else {
                self.drafts.insert(
                    id.to_owned(),
                    Draft {
                        kind,
                        renderer: own_renderer,
                        settings,
                        origin: origin.to_path_buf(),
                    },
                );
            }
        }
        Ok(())
    }

    fn merge_routes(&mut self, origin: &Path, value: &Value) -> Result<(), ParseError> {
        for item in sequence(origin, "routes", value)? {
            let entry: RouteEntry =
                serde_yaml::from_value(item.clone()).map_err(|source| ParseError::Entry {
                    path: origin.to_path_buf(),
                    what: "route",
                    source,
                })?;
            self.routes.insert(
                entry.key(),
                Sourced {
                    entry,
                    origin: origin.to_path_buf(),
                },
            );
        }
        Ok(())
    }

    fn merge_rules(&mut self, origin: &Path, value: &Value) -> Result<(), ParseError> {
        for item in sequence(origin, "routing-policy", value)? {
            let entry: RuleEntry =
                serde_yaml::from_value(item.clone()).map_err(|source| ParseError::Entry {
                    path: origin.to_path_buf(),
                    what: "routing policy rule",
                    source,
                })?;
            if entry.from.is_none() && entry.to.is_none() {
                return Err(ParseError::invalid(
                    origin,
                    "routing policy rules need 'from' or 'to'",
                ));
            }
            self.rules.insert(
                entry.key(),
                Sourced {
                    entry,
                    origin: origin.to_path_buf(),
                },
            );
        }
        Ok(())
    }

    /// Resolve backends, validate references and freeze the merged state.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingReference`] if a definition, route or
    /// rule names an interface that no source defines, and
    /// [`ParseError::RequiresNetworkd`] if a route or rule is attached to a
    /// definition rendered by NetworkManager.
    pub fn finish(self) -> Result<DefinitionStore, ParseError> {
        let Self {
            drafts,
            routes,
            rules,
            renderer,
        } = self;

        for (id, draft) in &drafts {
            for reference in references(draft) {
                if !drafts.contains_key(reference) {
                    return Err(ParseError::MissingReference {
                        path: draft.origin.clone(),
                        owner: id.clone(),
                        reference: reference.to_owned(),
                    });
                }
            }
        }
        check_attached(&drafts, routes.values().map(|r| (&r.entry.interface, &r.origin, "route")))?;
        check_attached(&drafts, rules.values().map(|r| (&r.entry.interface, &r.origin, "rule")))?;

        let definitions: BTreeMap<String, NetDefinition> = drafts
            .into_iter()
            .map(|(id, draft)| {
                let backend = draft
                    .renderer
                    .or(renderer)
                    .unwrap_or(Renderer::Networkd);
                let def = NetDefinition {
                    id: id.clone(),
                    kind: draft.kind,
                    backend,
                    settings: draft.settings,
                    origin: draft.origin,
                };
                (id, def)
            })
            .collect();

        check_networkd(&definitions, routes.values().map(|r| (&r.entry.interface, &r.origin, "route")))?;
        check_networkd(&definitions, rules.values().map(|r| (&r.entry.interface, &r.origin, "rule")))?;

        Ok(DefinitionStore {
            definitions,
            routes: routes.into_values().map(|r| r.entry).collect(),
            rules: rules.into_values().map(|r| r.entry).collect(),
            renderer,
        })
    }
}

fn renderer(origin: &Path, value: &Value) -> Result<Renderer, ParseError> {
    value
        .as_str()
        .ok_or_else(|| ParseError::invalid(origin, "'renderer' must be a string"))?
        .parse()
        .map_err(|message: String| ParseError::invalid(origin, message))
}

fn sequence<'a>(origin: &Path, key: &str, value: &'a Value) -> Result<&'a [Value], ParseError> {
    match value {
        Value::Null => Ok(&[]),
        Value::Sequence(items) => Ok(items),
        _ => Err(ParseError::invalid(origin, format!("'{key}' must be a list"))),
    }
}

fn references(draft: &Draft) -> Vec<&str> {
    let mut refs = Vec::new();
    match draft.kind {
        DeviceKind::Vlan => {
            if let Some(link) = draft.settings.get("link").and_then(Value::as_str) {
                refs.push(link);
            }
        }
        DeviceKind::Bridge | DeviceKind::Bond => {
            if let Some(items) = draft.settings.get("interfaces").and_then(Value::as_sequence) {
                refs.extend(items.iter().filter_map(Value::as_str));
            }
        }
        DeviceKind::Ethernet | DeviceKind::Wifi => {}
    }
    refs
}

fn check_attached<'a>(
    drafts: &BTreeMap<String, Draft>,
    entries: impl Iterator<Item = (&'a String, &'a PathBuf, &'static str)>,
) -> Result<(), ParseError> {
    for (interface, origin, what) in entries {
        if !drafts.contains_key(interface) {
            return Err(ParseError::MissingReference {
                path: origin.clone(),
                owner: what.to_owned(),
                reference: interface.clone(),
            });
        }
    }
    Ok(())
}

fn check_networkd<'a>(
    definitions: &BTreeMap<String, NetDefinition>,
    entries: impl Iterator<Item = (&'a String, &'a PathBuf, &'static str)>,
) -> Result<(), ParseError> {
    for (interface, origin, what) in entries {
        if definitions
            .get(interface)
            .is_some_and(|def| def.backend != Renderer::Networkd)
        {
            return Err(ParseError::RequiresNetworkd {
                path: origin.clone(),
                what,
                interface: interface.clone(),
            });
        }
    }
    Ok(())
}
