//! Merged network definitions and global routing records.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Backend responsible for bringing up a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Renderer {
    /// `systemd-networkd`.
    Networkd,
    /// NetworkManager.
    NetworkManager,
}

impl Renderer {
    /// Spelling used in YAML sources.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Networkd => "networkd",
            Self::NetworkManager => "NetworkManager",
        }
    }
}

impl fmt::Display for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Renderer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "networkd" => Ok(Self::Networkd),
            "NetworkManager" => Ok(Self::NetworkManager),
            other => Err(format!("unknown renderer '{other}'")),
        }
    }
}

/// Device class of a definition, one per top-level YAML section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Ethernet,
    Wifi,
    Bridge,
    Bond,
    Vlan,
}

impl DeviceKind {
    /// Every kind, in section order.
    pub const ALL: [Self; 5] = [
        Self::Ethernet,
        Self::Wifi,
        Self::Bridge,
        Self::Bond,
        Self::Vlan,
    ];

    /// YAML section holding definitions of this kind.
    #[must_use]
    pub const fn section(self) -> &'static str {
        match self {
            Self::Ethernet => "ethernets",
            Self::Wifi => "wifis",
            Self::Bridge => "bridges",
            Self::Bond => "bonds",
            Self::Vlan => "vlans",
        }
    }

    /// Look up the kind stored under a YAML section name.
    #[must_use]
    pub fn from_section(section: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.section() == section)
    }

    /// Whether the backend has to create the device itself.
    #[must_use]
    pub const fn is_virtual(self) -> bool {
        matches!(self, Self::Bridge | Self::Bond | Self::Vlan)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ethernet => "ethernet",
            Self::Wifi => "wifi",
            Self::Bridge => "bridge",
            Self::Bond => "bond",
            Self::Vlan => "vlan",
        })
    }
}

/// One named network configuration unit.
///
/// The settings mapping is opaque to the orchestrator; only backend writers
/// look inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct NetDefinition {
    /// Identifier, unique across all sources.
    pub id: String,
    /// Device class.
    pub kind: DeviceKind,
    /// Effective backend after applying the global renderer.
    pub backend: Renderer,
    /// Merged settings, with `renderer` already removed.
    pub settings: Mapping,
    /// Source file that last contributed to this definition.
    pub origin: PathBuf,
}

impl NetDefinition {
    /// Raw value of a setting.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// A boolean setting, treating absence as `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.setting(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// A string setting.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.setting(key).and_then(Value::as_str)
    }

    /// Strings in a list setting; non-string items are skipped.
    #[must_use]
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.setting(key)
            .and_then(Value::as_sequence)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// A string nested one level down, e.g. `match: {macaddress: ..}`.
    #[must_use]
    pub fn nested_text(&self, key: &str, inner: &str) -> Option<&str> {
        self.setting(key)
            .and_then(|v| v.get(inner))
            .and_then(Value::as_str)
    }
}

/// A route that is not scoped to a single definition's settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    /// Destination prefix.
    pub to: String,
    /// Gateway address.
    #[serde(default)]
    pub via: Option<String>,
    /// Definition id the route is attached to.
    pub interface: String,
    /// Routing table, `main` when absent.
    #[serde(default)]
    pub table: Option<u32>,
    /// Route metric.
    #[serde(default)]
    pub metric: Option<u32>,
}

impl RouteEntry {
    /// Identity used when merging sources. The gateway is not part of it,
    /// so a later file can move a route to a different `via`.
    pub(crate) fn key(&self) -> (String, String, Option<u32>, Option<u32>) {
        (
            self.interface.clone(),
            self.to.clone(),
            self.table,
            self.metric,
        )
    }
}

/// A routing policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    /// Source prefix selector.
    #[serde(default)]
    pub from: Option<String>,
    /// Destination prefix selector.
    #[serde(default)]
    pub to: Option<String>,
    /// Definition id the rule is attached to.
    pub interface: String,
    /// Table looked up when the rule matches.
    pub table: u32,
    /// Rule priority.
    #[serde(default)]
    pub priority: Option<u32>,
}

impl RuleEntry {
    pub(crate) fn key(&self) -> (String, Option<String>, Option<String>, u32, Option<u32>) {
        (
            self.interface.clone(),
            self.from.clone(),
            self.to.clone(),
            self.table,
            self.priority,
        )
    }
}

/// Result of parsing every selected source.
///
/// Built once by [`crate::Parser::finish`] and read-only afterwards.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DefinitionStore {
    pub(crate) definitions: BTreeMap<String, NetDefinition>,
    pub(crate) routes: Vec<RouteEntry>,
    pub(crate) rules: Vec<RuleEntry>,
    pub(crate) renderer: Option<Renderer>,
}

impl DefinitionStore {
    /// All definitions. Order is stable but carries no meaning.
    pub fn definitions(&self) -> impl Iterator<Item = &NetDefinition> {
        self.definitions.values()
    }

    /// Look up a definition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&NetDefinition> {
        self.definitions.get(id)
    }

    /// Global routes.
    #[must_use]
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Global routing policy rules.
    #[must_use]
    pub fn rules(&self) -> &[RuleEntry] {
        &self.rules
    }

    /// Renderer selected by `network: {renderer: ..}`, if any source set one.
    #[must_use]
    pub const fn global_renderer(&self) -> Option<Renderer> {
        self.renderer
    }

    /// `true` when there is nothing for any writer to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.routes.is_empty() && self.rules.is_empty()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}
