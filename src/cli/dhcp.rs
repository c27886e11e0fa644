use anyhow::Result;

use crate::config::Settings;
use crate::exec::SystemRunner;
use crate::provision::{configure_dhcp, Mode};
use crate::DhcpRequest;

use super::{print_report, DhcpArgs, Output};

pub(crate) fn run_configure(args: DhcpArgs, settings: &Settings, output: &Output) -> Result<()> {
    let request = DhcpRequest {
        network_cidr: args.network,
        router_ip: args.router,
        iface: args.iface,
        dns_list: args.dns,
        excluded: args.excluded,
        pool_size: args.pool_size,
        default_lease: args.default_lease,
        max_lease: args.max_lease,
    };
    let mode = if args.dry_run { Mode::DryRun } else { Mode::Apply };

    let report = configure_dhcp(&request, settings, &SystemRunner, mode);
    print_report(&report, output, "DHCP configure")
}
