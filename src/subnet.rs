use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::ProvisionError;

/// Parse an IPv4 CIDR, normalizing host bits away (192.168.1.7/24 -> 192.168.1.0/24)
pub fn parse_subnet(cidr: &str) -> Result<Ipv4Net, ProvisionError> {
    let cidr = cidr.trim();
    let net = Ipv4Net::from_str(cidr).map_err(|_| ProvisionError::InvalidCidr(cidr.to_string()))?;
    Ok(net.trunc())
}

/// Parse a single dotted-quad IPv4 address
pub fn parse_ipv4(ip: &str) -> Result<Ipv4Addr, ProvisionError> {
    let ip = ip.trim();
    Ipv4Addr::from_str(ip).map_err(|_| ProvisionError::InvalidIpAddress(ip.to_string()))
}

/// First and last usable host of a subnet. The network and broadcast
/// addresses are never usable, so /31 and /32 have no host range.
pub fn usable_hosts(net: &Ipv4Net) -> Option<(Ipv4Addr, Ipv4Addr)> {
    if net.prefix_len() > 30 {
        return None;
    }
    let first = u32::from(net.network()) + 1;
    let last = u32::from(net.broadcast()) - 1;
    Some((Ipv4Addr::from(first), Ipv4Addr::from(last)))
}

/// Split a separator-tolerant address list into parsed addresses and the
/// entries that could not be parsed. Empty entries are ignored.
pub fn parse_address_list(input: &str, separators: &[char]) -> (Vec<Ipv4Addr>, Vec<String>) {
    let mut addrs = Vec::new();
    let mut skipped = Vec::new();

    for entry in input.split(|c| separators.contains(&c)) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match Ipv4Addr::from_str(entry) {
            Ok(addr) => addrs.push(addr),
            Err(_) => skipped.push(entry.to_string()),
        }
    }

    (addrs, skipped)
}
