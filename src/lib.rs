pub mod allocate;
pub mod apply;
pub mod cli;
pub mod config;
mod errors;
pub mod exec;
pub mod provision;
pub mod render;
pub mod request;
pub mod service;
pub mod subnet;
mod types;

pub use allocate::allocate;
pub use config::Settings;
pub use errors::ProvisionError;
pub use exec::{CommandOutcome, CommandRunner, ProcessStatus, SystemRunner};
pub use provision::{configure_dhcp, configure_dns, control, plan_dhcp, plan_dns, Mode};
pub use service::{Service, ServiceAction};
pub use types::{
    AddressPool, Artifact, ArtifactKind, DhcpRequest, DnsRequest, LeaseTimes, OperationReport,
    ReportSection, ReportSummary, DEFAULT_LEASE_SECS, MAX_LEASE_SECS,
};
