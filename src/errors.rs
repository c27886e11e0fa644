use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Subnet {0} has no usable host addresses (prefix must be /30 or shorter)")]
    NoUsableHosts(String),

    #[error("Router address {router} is not inside subnet {subnet}")]
    RouterOutsideSubnet { router: String, subnet: String },

    #[error("Invalid pool size {0}: must be a positive number of addresses")]
    InvalidPoolSize(i64),

    #[error(
        "Invalid lease times (default {default}, max {max}): both must be positive and \
         default must not exceed max"
    )]
    InvalidLeaseTimes { default: i64, max: i64 },

    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    #[error("Invalid host label: {0}")]
    InvalidHostLabel(String),

    #[error("Invalid interface name: {0}")]
    InvalidInterface(String),

    #[error("Invalid configuration file {path}: {reason}")]
    InvalidConfig { path: String, reason: String },
}
