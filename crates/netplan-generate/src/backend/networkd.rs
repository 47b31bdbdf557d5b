//! `systemd-networkd` writer.
//!
//! Every file written here is named `10-netplan-*` inside
//! `/run/systemd/network` so that cleanup can find it again without a
//! manifest.

use netplan_lib::{DefinitionStore, DeviceKind, NetDefinition, Renderer, RouteEntry, RuleEntry};
use serde_yaml::Value;
use std::fmt::Write as _;
use std::path::PathBuf;

use super::{Backend, GlobalRouting, Result, remove_prefixed, write_file};
use crate::config::Layout;

/// Prefix of every file this backend owns.
pub const FILE_PREFIX: &str = "10-netplan-";

/// Writes `.network`, `.netdev` and `.link` units.
#[derive(Debug)]
pub struct NetworkdWriter<'a> {
    store: &'a DefinitionStore,
    routes_written: usize,
    rules_written: usize,
}

impl<'a> NetworkdWriter<'a> {
    /// Create a writer that resolves memberships against `store`.
    #[must_use]
    pub const fn new(store: &'a DefinitionStore) -> Self {
        Self {
            store,
            routes_written: 0,
            rules_written: 0,
        }
    }

    fn unit_path(layout: &Layout, id: &str, suffix: &str) -> PathBuf {
        layout
            .networkd_dir()
            .join(format!("{FILE_PREFIX}{id}.{suffix}"))
    }

    fn dropin_path(layout: &Layout, interface: &str, name: &str) -> PathBuf {
        layout
            .networkd_dir()
            .join(format!("{FILE_PREFIX}{interface}.network.d"))
            .join(name)
    }

    fn network_unit(&self, def: &NetDefinition) -> String {
        let mut out = String::from("[Match]\n");
        let name = def
            .text("set-name")
            .or_else(|| def.nested_text("match", "name"))
            .unwrap_or(def.id.as_str());
        let _ = writeln!(out, "Name={name}");
        if let Some(mac) = def.nested_text("match", "macaddress") {
            let _ = writeln!(out, "MACAddress={mac}");
        }

        out.push_str("\n[Network]\n");
        match (def.flag("dhcp4"), def.flag("dhcp6")) {
            (true, true) => out.push_str("DHCP=yes\n"),
            (true, false) => out.push_str("DHCP=ipv4\n"),
            (false, true) => out.push_str("DHCP=ipv6\n"),
            (false, false) => {}
        }
        for address in def.list("addresses") {
            let _ = writeln!(out, "Address={address}");
        }
        for key in ["gateway4", "gateway6"] {
            if let Some(gateway) = def.text(key) {
                let _ = writeln!(out, "Gateway={gateway}");
            }
        }
        for vlan in self.store.definitions() {
            if vlan.kind == DeviceKind::Vlan && vlan.text("link") == Some(def.id.as_str()) {
                let _ = writeln!(out, "VLAN={}", vlan.id);
            }
        }
        for parent in self.store.definitions() {
            let key = match parent.kind {
                DeviceKind::Bridge => "Bridge",
                DeviceKind::Bond => "Bond",
                _ => continue,
            };
            if parent.list("interfaces").contains(&def.id.as_str()) {
                let _ = writeln!(out, "{key}={}", parent.id);
            }
        }
        out
    }

    fn netdev_unit(def: &NetDefinition) -> String {
        let mut out = format!("[NetDev]\nName={}\nKind={}\n", def.id, def.kind);
        match def.kind {
            DeviceKind::Vlan => {
                if let Some(id) = def.setting("id").and_then(Value::as_u64) {
                    let _ = write!(out, "\n[VLAN]\nId={id}\n");
                }
            }
            DeviceKind::Bond => {
                if let Some(mode) = def.nested_text("parameters", "mode") {
                    let _ = write!(out, "\n[Bond]\nMode={mode}\n");
                }
            }
            _ => {}
        }
        out
    }

    fn link_unit(mac: &str, name: &str) -> String {
        format!("[Match]\nMACAddress={mac}\n\n[Link]\nName={name}\nWakeOnLan=off\n")
    }
}

impl Backend for NetworkdWriter<'_> {
    fn name(&self) -> &'static str {
        "networkd"
    }

    fn cleanup(&self, layout: &Layout) -> Result<()> {
        remove_prefixed(&layout.networkd_dir(), FILE_PREFIX)
    }

    fn write_definition(&mut self, def: &NetDefinition, layout: &Layout) -> Result<bool> {
        if def.backend != Renderer::Networkd {
            return Ok(false);
        }

        write_file(
            &Self::unit_path(layout, &def.id, "network"),
            &self.network_unit(def),
            None,
        )?;
        if def.kind.is_virtual() {
            write_file(
                &Self::unit_path(layout, &def.id, "netdev"),
                &Self::netdev_unit(def),
                None,
            )?;
        }
        if let (Some(name), Some(mac)) = (def.text("set-name"), def.nested_text("match", "macaddress")) {
            write_file(
                &Self::unit_path(layout, &def.id, "link"),
                &Self::link_unit(mac, name),
                None,
            )?;
        }
        Ok(true)
    }
}

impl GlobalRouting for NetworkdWriter<'_> {
    fn write_route(&mut self, route: &RouteEntry, layout: &Layout) -> Result<bool> {
        let mut out = format!("[Route]\nDestination={}\n", route.to);
        if let Some(via) = &route.via {
            let _ = writeln!(out, "Gateway={via}");
        }
        if let Some(table) = route.table {
            let _ = writeln!(out, "Table={table}");
        }
        if let Some(metric) = route.metric {
            let _ = writeln!(out, "Metric={metric}");
        }
        let name = format!("70-route-{}.conf", self.routes_written);
        write_file(&Self::dropin_path(layout, &route.interface, &name), &out, None)?;
        self.routes_written += 1;
        Ok(true)
    }

    fn write_rule(&mut self, rule: &RuleEntry, layout: &Layout) -> Result<bool> {
        let mut out = String::from("[RoutingPolicyRule]\n");
        if let Some(from) = &rule.from {
            let _ = writeln!(out, "From={from}");
        }
        if let Some(to) = &rule.to {
            let _ = writeln!(out, "To={to}");
        }
        let _ = writeln!(out, "Table={}", rule.table);
        if let Some(priority) = rule.priority {
            let _ = writeln!(out, "Priority={priority}");
        }
        let name = format!("71-rule-{}.conf", self.rules_written);
        write_file(&Self::dropin_path(layout, &rule.interface, &name), &out, None)?;
        self.rules_written += 1;
        Ok(true)
    }
}
