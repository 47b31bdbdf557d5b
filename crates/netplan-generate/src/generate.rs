//! Single-pass dispatch of the merged state to the backend writers.

use netplan_lib::DefinitionStore;
use tracing::debug;

use crate::backend::{Backend, GlobalRouting, Result};
use crate::config::Layout;

/// Remove output left behind by a previous run, networkd first.
///
/// # Errors
///
/// Returns an error if stale output exists but cannot be removed.
pub fn cleanup<N, M>(layout: &Layout, networkd: &N, nm: &M) -> Result<()>
where
    N: Backend,
    M: Backend,
{
    debug!(backend = networkd.name(), "Cleaning up previous output");
    networkd.cleanup(layout)?;
    debug!(backend = nm.name(), "Cleaning up previous output");
    nm.cleanup(layout)
}

/// Write every definition, route and rule exactly once.
///
/// Each definition goes to both writers; each backend decides whether it
/// renders it. The NetworkManager writer is finished after the last
/// definition, before global routes and rules are written. Returns `true`
/// if any write produced output that needs `systemd-networkd`.
///
/// An empty store performs no writer calls at all.
///
/// # Errors
///
/// Returns the first writer error; later entities are not written.
pub fn generate<N, M>(
    store: &DefinitionStore,
    layout: &Layout,
    networkd: &mut N,
    nm: &mut M,
) -> Result<bool>
where
    N: Backend + GlobalRouting,
    M: Backend,
{
    if store.is_empty() {
        debug!("Nothing to generate");
        return Ok(false);
    }

    debug!(definitions = store.len(), "Generating output files");
    let mut any_networkd = false;
    for def in store.definitions() {
        any_networkd |= networkd.write_definition(def, layout)?;
        any_networkd |= nm.write_definition(def, layout)?;
    }
    nm.finish(layout)?;

    for route in store.routes() {
        any_networkd |= networkd.write_route(route, layout)?;
    }
    for rule in store.rules() {
        any_networkd |= networkd.write_rule(rule, layout)?;
    }
    Ok(any_networkd)
}
