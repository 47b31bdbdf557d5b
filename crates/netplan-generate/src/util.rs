//! File name predicates shared by the source scan and output cleanup.

use std::ffi::OsStr;

/// Extension of netplan sources.
pub(crate) const SOURCE_SUFFIX: &str = ".yaml";

/// Returns whether a directory entry is a netplan source.
///
/// Mirrors the shell glob `*.yaml` on raw name bytes: hidden names never
/// match, names that are not UTF-8 do.
///
/// # Examples
///
/// ```
/// use netplan_generate::util::is_source_file;
/// assert!(is_source_file("01-netcfg.yaml"));
/// assert!(!is_source_file(".01-netcfg.yaml"));
/// assert!(!is_source_file("01-netcfg.yml"));
/// ```
pub fn is_source_file(name: impl AsRef<OsStr>) -> bool {
    let name = name.as_ref().as_encoded_bytes();
    !name.starts_with(b".") && name.ends_with(SOURCE_SUFFIX.as_bytes())
}

/// Returns whether a directory entry carries the given output prefix.
///
/// # Examples
///
/// ```
/// use netplan_generate::util::has_prefix;
/// assert!(has_prefix("10-netplan-eth0.network", "10-netplan-"));
/// assert!(!has_prefix("20-wired.network", "10-netplan-"));
/// ```
pub fn has_prefix(name: impl AsRef<OsStr>, prefix: &str) -> bool {
    name.as_ref()
        .as_encoded_bytes()
        .starts_with(prefix.as_bytes())
}
