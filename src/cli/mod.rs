use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::Settings;
use crate::service::{Service, ServiceAction};
use crate::{OperationReport, DEFAULT_LEASE_SECS, MAX_LEASE_SECS};

mod dhcp;
mod dns;
mod service;

pub(crate) struct Output {
    pub(crate) json: bool,
}

pub(crate) struct DhcpArgs {
    pub(crate) network: String,
    pub(crate) router: String,
    pub(crate) iface: String,
    pub(crate) dns: String,
    pub(crate) excluded: String,
    pub(crate) pool_size: i64,
    pub(crate) default_lease: i64,
    pub(crate) max_lease: i64,
    pub(crate) dry_run: bool,
}

pub(crate) struct DnsArgs {
    pub(crate) domain: String,
    pub(crate) server_ip: String,
    pub(crate) ns_host: String,
    pub(crate) forwarders: String,
    pub(crate) dry_run: bool,
}

#[derive(Parser)]
#[command(
    name = "netprov",
    about = "Generate, validate and apply ISC DHCP and BIND9 configurations",
    long_about = "Regenerates dhcpd.conf or a BIND9 zone from a handful of parameters, runs the \
                  servers' own syntax checkers and restarts the service. Needs root to apply.",
    after_help = "Examples:\n  netprov dhcp configure --network 192.168.50.0/24 --router 192.168.50.1 --iface eth0 --pool-size 50\n  netprov dns configure --domain example.local --server-ip 10.0.0.1 --ns-host ns1 --forwarders 8.8.8.8,1.1.1.1\n  netprov service dns restart\n\nRun 'netprov dhcp configure --help' or 'netprov dns configure --help' to see all flags."
)]
struct Cli {
    /// TOML settings file (paths, service names, checker commands)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the report as JSON ({"success", "output", "operation_id"})
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// DHCP server (isc-dhcp-server) configuration
    Dhcp {
        #[command(subcommand)]
        command: DhcpCommand,
    },

    /// DNS server (bind9) configuration
    Dns {
        #[command(subcommand)]
        command: DnsCommand,
    },

    /// Start, stop, restart or query a managed service
    Service {
        /// Which service
        #[arg(value_enum)]
        service: Service,

        /// What to do with it
        #[arg(value_enum)]
        action: ServiceAction,
    },
}

#[derive(Subcommand)]
enum DhcpCommand {
    /// Regenerate dhcpd.conf and the interface binding, check and restart
    Configure {
        /// Subnet in CIDR notation
        #[arg(short, long)]
        network: String,

        /// Router (gateway) address inside the subnet
        #[arg(short, long)]
        router: String,

        /// Interface the server listens on
        #[arg(short, long)]
        iface: String,

        /// Comma-separated DNS servers for clients (defaults to the router)
        #[arg(long, default_value = "")]
        dns: String,

        /// Comma-separated addresses to keep out of the pool
        #[arg(long, default_value = "")]
        excluded: String,

        /// Number of addresses in the pool
        #[arg(short, long)]
        pool_size: i64,

        /// Default lease time in seconds
        #[arg(long, default_value_t = DEFAULT_LEASE_SECS)]
        default_lease: i64,

        /// Maximum lease time in seconds
        #[arg(long, default_value_t = MAX_LEASE_SECS)]
        max_lease: i64,

        /// Render and print without writing, checking or restarting
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum DnsCommand {
    /// Regenerate the zone, options and zone registration, check and restart
    Configure {
        /// Zone name, e.g. example.local
        #[arg(short, long)]
        domain: String,

        /// Address the apex, name server and www records point at
        #[arg(short, long)]
        server_ip: String,

        /// Name server host label, e.g. ns1
        #[arg(short, long)]
        ns_host: String,

        /// Upstream resolvers separated by commas or semicolons
        #[arg(short, long, default_value = "")]
        forwarders: String,

        /// Render and print without writing, checking or restarting
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed when called repeatedly in-process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    let output = Output { json: cli.json };

    match cli.command {
        Commands::Dhcp {
            command:
                DhcpCommand::Configure {
                    network,
                    router,
                    iface,
                    dns,
                    excluded,
                    pool_size,
                    default_lease,
                    max_lease,
                    dry_run,
                },
        } => dhcp::run_configure(
            DhcpArgs {
                network,
                router,
                iface,
                dns,
                excluded,
                pool_size,
                default_lease,
                max_lease,
                dry_run,
            },
            &settings,
            &output,
        ),
        Commands::Dns {
            command:
                DnsCommand::Configure {
                    domain,
                    server_ip,
                    ns_host,
                    forwarders,
                    dry_run,
                },
        } => dns::run_configure(
            DnsArgs {
                domain,
                server_ip,
                ns_host,
                forwarders,
                dry_run,
            },
            &settings,
            &output,
        ),
        Commands::Service { service, action } => {
            service::run_service(service, action, &settings, &output)
        }
    }
}

/// Print the report and turn a failed aggregate into a non-zero exit.
pub(crate) fn print_report(report: &OperationReport, output: &Output, what: &str) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        print!("{}", report.render());
    }

    if !report.success {
        bail!("{} failed (operation {})", what, report.operation_id);
    }
    Ok(())
}
