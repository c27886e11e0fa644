use std::fmt;
use std::time::Duration;

use crate::config::Settings;
use crate::exec::{CommandOutcome, CommandRunner};

/// Managed system service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Service {
    /// ISC DHCP server
    Dhcp,
    /// BIND9 name server
    Dns,
}

impl Service {
    /// systemd unit name from settings
    pub fn unit<'a>(&self, settings: &'a Settings) -> &'a str {
        match self {
            Service::Dhcp => &settings.dhcp.service,
            Service::Dns => &settings.dns.service,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Dhcp => write!(f, "DHCP"),
            Service::Dns => write!(f, "DNS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Status,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Status => "status",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `systemctl <action> <unit>`
pub fn control_service(
    runner: &dyn CommandRunner,
    systemctl: &str,
    unit: &str,
    action: ServiceAction,
    timeout: Duration,
) -> CommandOutcome {
    runner.run(
        systemctl,
        &[action.as_str().to_string(), unit.to_string()],
        timeout,
    )
}
