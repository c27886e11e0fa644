//! Text renderers for the DHCP and DNS server configuration files.
//!
//! Renderers are pure: the same parameters (and, for zones, the same clock
//! reading) always produce byte-identical artifacts.

pub mod dhcp;
pub mod dns;

pub use dhcp::{render_dhcp, DhcpArtifacts};
pub use dns::{render_dns, zone_serial, DnsArtifacts};

/// Header stamped on every generated file.
pub(crate) const GENERATED_BY: &str = "Generated by netprov. Manual edits are overwritten on the next configure run.";
