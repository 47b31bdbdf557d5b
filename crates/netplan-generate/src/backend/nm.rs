//! NetworkManager keyfile writer.

use netplan_lib::{DeviceKind, NetDefinition, Renderer};
use serde_yaml::Value;
use std::fmt::Write as _;

use super::{Backend, Result, remove_path, remove_prefixed, write_file};
use crate::config::Layout;

/// Prefix of every keyfile this backend owns.
pub const CONNECTION_PREFIX: &str = "netplan-";
/// Drop-in listing devices NetworkManager must leave alone.
pub const UNMANAGED_CONF: &str = "netplan.conf";

/// Keyfiles are readable by root only.
const KEYFILE_MODE: u32 = 0o600;

/// Writes `.nmconnection` keyfiles and the unmanaged-devices drop-in.
#[derive(Debug, Default)]
pub struct NmWriter {
    unmanaged: Vec<String>,
}

impl NmWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn keyfile(def: &NetDefinition) -> String {
        let mut out = format!(
            "[connection]\nid=netplan-{id}\ntype={kind}\ninterface-name={id}\n",
            id = def.id,
            kind = def.kind
        );

        match def.kind {
            DeviceKind::Vlan => {
                out.push_str("\n[vlan]\n");
                if let Some(id) = def.setting("id").and_then(Value::as_u64) {
                    let _ = writeln!(out, "id={id}");
                }
                if let Some(link) = def.text("link") {
                    let _ = writeln!(out, "parent={link}");
                }
            }
            DeviceKind::Wifi => out.push_str("\n[wifi]\nmode=infrastructure\n"),
            DeviceKind::Ethernet | DeviceKind::Bridge | DeviceKind::Bond => {}
        }

        let (v6, v4): (Vec<&str>, Vec<&str>) =
            def.list("addresses").into_iter().partition(|a| a.contains(':'));

        out.push_str("\n[ipv4]\n");
        if def.flag("dhcp4") {
            out.push_str("method=auto\n");
        } else if v4.is_empty() {
            out.push_str("method=link-local\n");
        } else {
            out.push_str("method=manual\n");
        }
        push_addresses(&mut out, &v4, def.text("gateway4"));

        out.push_str("\n[ipv6]\n");
        if def.flag("dhcp6") {
            out.push_str("method=auto\n");
        } else if v6.is_empty() {
            out.push_str("method=ignore\n");
        } else {
            out.push_str("method=manual\n");
        }
        push_addresses(&mut out, &v6, def.text("gateway6"));
        out
    }
}

fn push_addresses(out: &mut String, addresses: &[&str], gateway: Option<&str>) {
    for (n, address) in addresses.iter().enumerate() {
        let _ = writeln!(out, "address{}={address}", n + 1);
    }
    if let Some(gateway) = gateway {
        let _ = writeln!(out, "gateway={gateway}");
    }
}

impl Backend for NmWriter {
    fn name(&self) -> &'static str {
        "NetworkManager"
    }

    fn cleanup(&self, layout: &Layout) -> Result<()> {
        remove_prefixed(&layout.nm_connections_dir(), CONNECTION_PREFIX)?;
        remove_path(&layout.nm_conf_dir().join(UNMANAGED_CONF))?;
        remove_path(&layout.globally_managed_devices())
    }

    fn write_definition(&mut self, def: &NetDefinition, layout: &Layout) -> Result<bool> {
        if def.backend != Renderer::NetworkManager {
            self.unmanaged.push(def.id.clone());
            return Ok(false);
        }
        let path = layout
            .nm_connections_dir()
            .join(format!("{CONNECTION_PREFIX}{}.nmconnection", def.id));
        write_file(&path, &Self::keyfile(def), Some(KEYFILE_MODE))?;
        Ok(false)
    }

    fn finish(&mut self, layout: &Layout) -> Result<()> {
        if self.unmanaged.is_empty() {
            return Ok(());
        }
        let devices = self
            .unmanaged
            .iter()
            .map(|id| format!("interface-name:{id}"))
            .collect::<Vec<_>>()
            .join(",");
        write_file(
            &layout.nm_conf_dir().join(UNMANAGED_CONF),
            &format!("[keyfile]\n# devices managed by networkd\nunmanaged-devices+={devices}\n"),
            None,
        )
    }
}
