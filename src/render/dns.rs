use chrono::{DateTime, Datelike, Timelike, Utc};
use std::fmt::Write as _;

use crate::config::DnsSettings;
use crate::request::DnsParams;
use crate::{Artifact, ArtifactKind};

use super::GENERATED_BY;

pub const ZONE_TTL: u32 = 604_800;
pub const SOA_REFRESH: u32 = 604_800;
pub const SOA_RETRY: u32 = 86_400;
pub const SOA_EXPIRE: u32 = 2_419_200;
pub const SOA_NEGATIVE_TTL: u32 = 604_800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsArtifacts {
    pub zone_file: Artifact,
    pub resolver_options: Artifact,
    pub zone_registration: Artifact,
}

impl DnsArtifacts {
    pub fn into_vec(self) -> Vec<Artifact> {
        vec![self.zone_file, self.resolver_options, self.zone_registration]
    }
}

/// `YYYYMMDDHH` in UTC.
///
/// Two renders within the same hour share a serial, so secondaries will not
/// notice a change made less than an hour after the previous one.
pub fn zone_serial(now: DateTime<Utc>) -> u32 {
    (now.year() as u32) * 1_000_000 + now.month() * 10_000 + now.day() * 100 + now.hour()
}

/// Render the zone file, `named.conf.options` and the `named.conf.local` zone stanza.
pub fn render_dns(params: &DnsParams, paths: &DnsSettings, now: DateTime<Utc>) -> DnsArtifacts {
    let zone_path = paths.zone_path(&params.domain);
    let zone_registration = render_zone_registration(&params.domain, &zone_path.display().to_string());

    DnsArtifacts {
        zone_file: Artifact {
            kind: ArtifactKind::DnsZone,
            path: zone_path,
            content: render_zone_file(params, zone_serial(now)),
        },
        resolver_options: Artifact {
            kind: ArtifactKind::DnsOptions,
            path: paths.options_path.clone(),
            content: render_options(params, &paths.bind_directory),
        },
        zone_registration: Artifact {
            kind: ArtifactKind::DnsRegistration,
            path: paths.local_path.clone(),
            content: zone_registration,
        },
    }
}

fn render_zone_file(params: &DnsParams, serial: u32) -> String {
    let domain = &params.domain;
    let ns_fqdn = format!("{}.{}.", params.ns_host, domain);
    let server = params.server;

    let mut out = String::new();
    let _ = writeln!(out, "; {}", GENERATED_BY);
    let _ = writeln!(out, "; Zone: {}", domain);
    let _ = writeln!(out, "$TTL {}", ZONE_TTL);
    let _ = writeln!(out, "@\tIN\tSOA\t{} admin.{}. (", ns_fqdn, domain);
    let _ = writeln!(out, "\t\t{:<10} ; Serial", serial);
    let _ = writeln!(out, "\t\t{:<10} ; Refresh", SOA_REFRESH);
    let _ = writeln!(out, "\t\t{:<10} ; Retry", SOA_RETRY);
    let _ = writeln!(out, "\t\t{:<10} ; Expire", SOA_EXPIRE);
    let _ = writeln!(out, "\t\t{:<10} ) ; Negative Cache TTL", SOA_NEGATIVE_TTL);
    out.push_str(";\n");
    let _ = writeln!(out, "@\tIN\tNS\t{}", ns_fqdn);
    let _ = writeln!(out, "@\tIN\tA\t{}", server);
    let _ = writeln!(out, "{}\tIN\tA\t{}", params.ns_host, server);
    if params.ns_host != "www" {
        let _ = writeln!(out, "www\tIN\tA\t{}", server);
    }
    out
}

fn render_options(params: &DnsParams, directory: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// {}", GENERATED_BY);
    out.push_str("options {\n");
    let _ = writeln!(out, "\tdirectory \"{}\";", directory);
    out.push('\n');
    out.push_str("\trecursion yes;\n");
    out.push_str("\tdnssec-validation auto;\n");
    out.push('\n');
    out.push_str("\tlisten-on { any; };\n");
    out.push_str("\tlisten-on-v6 { any; };\n");
    if !params.forwarders.is_empty() {
        out.push('\n');
        out.push_str("\tforwarders {\n");
        for fwd in &params.forwarders {
            let _ = writeln!(out, "\t\t{};", fwd);
        }
        out.push_str("\t};\n");
    }
    out.push_str("};\n");
    out
}

fn render_zone_registration(domain: &str, zone_path: &str) -> String {
    format!(
        "// {}\n\nzone \"{}\" {{\n\ttype master;\n\tfile \"{}\";\n}};\n",
        GENERATED_BY, domain, zone_path
    )
}
