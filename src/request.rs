//! Turning flat request fields into typed, validated parameters.
//!
//! Required fields are strict: a missing or malformed subnet, router,
//! interface, domain, server address or NS host rejects the whole request.
//! List fields are permissive: bad entries are dropped and reported as
//! warnings so one typo does not block the rest.

use ipnet::Ipv4Net;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use tracing::warn;

use crate::subnet::{parse_address_list, parse_ipv4, parse_subnet, usable_hosts};
use crate::{DhcpRequest, DnsRequest, LeaseTimes, ProvisionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpParams {
    pub subnet: Ipv4Net,
    pub router: Ipv4Addr,
    pub iface: String,
    pub dns_servers: Vec<Ipv4Addr>,
    pub excluded: BTreeSet<Ipv4Addr>,
    pub pool_size: u32,
    pub leases: LeaseTimes,
    /// Entries that were skipped while parsing list fields
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsParams {
    /// Lowercase, no trailing dot
    pub domain: String,
    pub server: Ipv4Addr,
    /// Single label relative to `domain`
    pub ns_host: String,
    pub forwarders: Vec<Ipv4Addr>,
    pub warnings: Vec<String>,
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ProvisionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProvisionError::MissingField(field));
    }
    Ok(value)
}

impl DhcpRequest {
    pub fn validate(&self) -> Result<DhcpParams, ProvisionError> {
        let subnet = parse_subnet(required(&self.network_cidr, "network_cidr")?)?;
        let router = parse_ipv4(required(&self.router_ip, "router_ip")?)?;
        let iface = validate_iface(required(&self.iface, "iface")?)?;

        if usable_hosts(&subnet).is_none() {
            return Err(ProvisionError::NoUsableHosts(subnet.to_string()));
        }
        if !subnet.contains(&router) || router == subnet.network() || router == subnet.broadcast()
        {
            return Err(ProvisionError::RouterOutsideSubnet {
                router: router.to_string(),
                subnet: subnet.to_string(),
            });
        }

        if self.pool_size <= 0 || self.pool_size > i64::from(u32::MAX) {
            return Err(ProvisionError::InvalidPoolSize(self.pool_size));
        }
        let leases = validate_leases(self.default_lease, self.max_lease)?;

        let mut warnings = Vec::new();

        let (dns_servers, bad_dns) = parse_address_list(&self.dns_list, &[',']);
        for entry in bad_dns {
            warn!("Skipping malformed DNS server entry '{}'", entry);
            warnings.push(format!("Skipped malformed DNS server '{}'", entry));
        }

        let (excluded_raw, bad_excluded) = parse_address_list(&self.excluded, &[',']);
        for entry in bad_excluded {
            warn!("Skipping malformed exclusion entry '{}'", entry);
            warnings.push(format!("Skipped malformed exclusion '{}'", entry));
        }
        let mut excluded = BTreeSet::new();
        for addr in excluded_raw {
            if subnet.contains(&addr) {
                excluded.insert(addr);
            } else {
                warn!("Skipping exclusion {} outside subnet {}", addr, subnet);
                warnings.push(format!("Skipped exclusion {} (outside {})", addr, subnet));
            }
        }

        Ok(DhcpParams {
            subnet,
            router,
            iface,
            dns_servers,
            excluded,
            pool_size: self.pool_size as u32,
            leases,
            warnings,
        })
    }
}

impl DnsRequest {
    pub fn validate(&self) -> Result<DnsParams, ProvisionError> {
        let domain = normalize_domain(required(&self.domain, "domain")?)?;
        let server = parse_ipv4(required(&self.server_ip, "server_ip")?)?;
        let ns_host = normalize_ns_host(required(&self.ns_host, "ns_host")?, &domain)?;

        let mut warnings = Vec::new();
        let (forwarders, bad) = parse_address_list(&self.forwarders, &[',', ';']);
        for entry in bad {
            warn!("Skipping malformed forwarder entry '{}'", entry);
            warnings.push(format!("Skipped malformed forwarder '{}'", entry));
        }

        Ok(DnsParams {
            domain,
            server,
            ns_host,
            forwarders,
            warnings,
        })
    }
}

fn validate_leases(default: i64, max: i64) -> Result<LeaseTimes, ProvisionError> {
    let invalid = || ProvisionError::InvalidLeaseTimes { default, max };
    if default <= 0 || max <= 0 || default > max {
        return Err(invalid());
    }
    Ok(LeaseTimes {
        default_secs: u32::try_from(default).map_err(|_| invalid())?,
        max_secs: u32::try_from(max).map_err(|_| invalid())?,
    })
}

fn validate_iface(iface: &str) -> Result<String, ProvisionError> {
    let ok = iface.len() <= 64
        && iface
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '@'));
    if !ok {
        return Err(ProvisionError::InvalidInterface(iface.to_string()));
    }
    Ok(iface.to_string())
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Strip trailing dots and lowercase; every label must be a valid hostname label.
pub fn normalize_domain(domain: &str) -> Result<String, ProvisionError> {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() || domain.len() > 253 || !domain.split('.').all(is_valid_label) {
        return Err(ProvisionError::InvalidDomain(domain));
    }
    Ok(domain)
}

/// Reduce `ns1`, `ns1.` or `ns1.example.local.` to the bare label `ns1`.
pub fn normalize_ns_host(ns_host: &str, domain: &str) -> Result<String, ProvisionError> {
    let host = ns_host.trim().trim_end_matches('.').to_ascii_lowercase();
    let label = host
        .strip_suffix(domain)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(&host);
    if !is_valid_label(label) {
        return Err(ProvisionError::InvalidHostLabel(ns_host.trim().to_string()));
    }
    Ok(label.to_string())
}
