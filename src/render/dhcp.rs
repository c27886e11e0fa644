use std::fmt::Write as _;

use crate::config::DhcpSettings;
use crate::request::DhcpParams;
use crate::{AddressPool, Artifact, ArtifactKind};

use super::GENERATED_BY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpArtifacts {
    pub main_config: Artifact,
    pub interface_binding: Artifact,
}

impl DhcpArtifacts {
    pub fn into_vec(self) -> Vec<Artifact> {
        vec![self.main_config, self.interface_binding]
    }
}

/// Render `dhcpd.conf` and the `isc-dhcp-server` defaults file for one subnet.
pub fn render_dhcp(params: &DhcpParams, pool: &AddressPool, paths: &DhcpSettings) -> DhcpArtifacts {
    DhcpArtifacts {
        main_config: Artifact {
            kind: ArtifactKind::DhcpMain,
            path: paths.config_path.clone(),
            content: render_main_config(params, pool),
        },
        interface_binding: Artifact {
            kind: ArtifactKind::DhcpInterfaces,
            path: paths.interfaces_path.clone(),
            content: render_interface_binding(&params.iface),
        },
    }
}

fn render_main_config(params: &DhcpParams, pool: &AddressPool) -> String {
    let subnet = &params.subnet;
    let dns_servers = if params.dns_servers.is_empty() {
        params.router.to_string()
    } else {
        join(params.dns_servers.iter())
    };
    let excluded = if params.excluded.is_empty() {
        "none".to_string()
    } else {
        join(params.excluded.iter())
    };

    // Writing to a String cannot fail
    let mut out = String::new();
    let _ = writeln!(out, "# {}", GENERATED_BY);
    let _ = writeln!(out, "# Excluded from pool: {}", excluded);
    if pool.fallback {
        let _ = writeln!(
            out,
            "# WARNING: no clean block of {} addresses; range may include excluded addresses",
            params.pool_size
        );
    }
    out.push('\n');
    let _ = writeln!(out, "default-lease-time {};", params.leases.default_secs);
    let _ = writeln!(out, "max-lease-time {};", params.leases.max_secs);
    out.push('\n');
    out.push_str("authoritative;\n");
    out.push('\n');
    let _ = writeln!(out, "option domain-name-servers {};", dns_servers);
    out.push('\n');
    let _ = writeln!(
        out,
        "subnet {} netmask {} {{",
        subnet.network(),
        subnet.netmask()
    );
    let _ = writeln!(out, "  range {} {};", pool.first, pool.last);
    let _ = writeln!(out, "  option routers {};", params.router);
    let _ = writeln!(out, "  option subnet-mask {};", subnet.netmask());
    let _ = writeln!(out, "  option broadcast-address {};", subnet.broadcast());
    out.push_str("}\n");
    out
}

fn render_interface_binding(iface: &str) -> String {
    format!(
        "# {}\n\nINTERFACESv4=\"{}\"\nINTERFACESv6=\"\"\n",
        GENERATED_BY, iface
    )
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}
