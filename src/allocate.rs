//! Contiguous address pool selection.
//!
//! ISC dhcpd wants a single `range start end;` clause, so the allocator looks
//! for one window of `size` consecutive usable hosts that avoids the router
//! and every excluded address.

use ipnet::Ipv4Net;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::subnet::usable_hosts;
use crate::{AddressPool, ProvisionError};

/// Pick the lowest clean window of `size` addresses inside `subnet`.
///
/// When no clean window exists the pool starts at the first usable host and
/// is returned with `fallback` set; callers must surface that as a warning.
pub fn allocate(
    subnet: &Ipv4Net,
    router: Ipv4Addr,
    excluded: &BTreeSet<Ipv4Addr>,
    size: u32,
) -> Result<AddressPool, ProvisionError> {
    if size == 0 {
        return Err(ProvisionError::InvalidPoolSize(0));
    }
    let (first_host, last_host) =
        usable_hosts(subnet).ok_or_else(|| ProvisionError::NoUsableHosts(subnet.to_string()))?;
    let first_host = u32::from(first_host);
    let last_host = u32::from(last_host);

    let blocked: BTreeSet<u32> = excluded
        .iter()
        .copied()
        .chain(std::iter::once(router))
        .map(u32::from)
        .filter(|ip| (first_host..=last_host).contains(ip))
        .collect();

    let mut start = first_host;
    loop {
        // u64 so a window near 255.255.255.255 cannot wrap
        let end = u64::from(start) + u64::from(size) - 1;
        if end > u64::from(last_host) {
            break;
        }
        let end = end as u32;
        match blocked.range(start..=end).next_back() {
            Some(&hit) => start = hit + 1,
            None => {
                return Ok(AddressPool {
                    first: Ipv4Addr::from(start),
                    last: Ipv4Addr::from(end),
                    fallback: false,
                })
            }
        }
    }

    let end = (u64::from(first_host) + u64::from(size) - 1).min(u64::from(last_host)) as u32;
    Ok(AddressPool {
        first: Ipv4Addr::from(first_host),
        last: Ipv4Addr::from(end),
        fallback: true,
    })
}
