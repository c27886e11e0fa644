use anyhow::Result;
use chrono::Utc;

use crate::config::Settings;
use crate::exec::SystemRunner;
use crate::provision::{configure_dns, Mode};
use crate::DnsRequest;

use super::{print_report, DnsArgs, Output};

pub(crate) fn run_configure(args: DnsArgs, settings: &Settings, output: &Output) -> Result<()> {
    let request = DnsRequest {
        domain: args.domain,
        server_ip: args.server_ip,
        ns_host: args.ns_host,
        forwarders: args.forwarders,
    };
    let mode = if args.dry_run { Mode::DryRun } else { Mode::Apply };

    let report = configure_dns(&request, settings, &SystemRunner, Utc::now(), mode);
    print_report(&report, output, "DNS configure")
}
