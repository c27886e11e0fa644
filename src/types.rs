use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use uuid::Uuid;

/// Flat DHCP configure request, field names as submitted by the web wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DhcpRequest {
    pub network_cidr: String,
    pub router_ip: String,
    pub iface: String,
    /// Comma-separated DNS servers handed to clients
    pub dns_list: String,
    /// Comma-separated addresses that must stay out of the pool
    pub excluded: String,
    pub pool_size: i64,
    pub default_lease: i64,
    pub max_lease: i64,
}

impl Default for DhcpRequest {
    fn default() -> Self {
        Self {
            network_cidr: String::new(),
            router_ip: String::new(),
            iface: String::new(),
            dns_list: String::new(),
            excluded: String::new(),
            pool_size: 0,
            default_lease: DEFAULT_LEASE_SECS,
            max_lease: MAX_LEASE_SECS,
        }
    }
}

pub const DEFAULT_LEASE_SECS: i64 = 600;
pub const MAX_LEASE_SECS: i64 = 7200;

/// Flat DNS configure request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsRequest {
    pub domain: String,
    pub server_ip: String,
    pub ns_host: String,
    /// Forwarders separated by commas or semicolons
    pub forwarders: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseTimes {
    pub default_secs: u32,
    pub max_secs: u32,
}

/// A contiguous block of addresses for the `range` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPool {
    pub first: Ipv4Addr,
    pub last: Ipv4Addr,
    /// Set when no clean window existed and the pool may overlap exclusions
    pub fallback: bool,
}

impl AddressPool {
    pub fn size(&self) -> u32 {
        u32::from(self.last) - u32::from(self.first) + 1
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        (self.first..=self.last).contains(&addr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    DhcpMain,
    DhcpInterfaces,
    DnsZone,
    DnsOptions,
    DnsRegistration,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::DhcpMain => write!(f, "DHCP main config"),
            ArtifactKind::DhcpInterfaces => write!(f, "DHCP interface binding"),
            ArtifactKind::DnsZone => write!(f, "DNS zone file"),
            ArtifactKind::DnsOptions => write!(f, "DNS resolver options"),
            ArtifactKind::DnsRegistration => write!(f, "DNS zone registration"),
        }
    }
}

/// Rendered file contents and where they go. Always written whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub label: String,
    pub body: String,
}

/// Ordered, human-readable account of one operation plus its aggregate outcome.
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub operation_id: Uuid,
    pub sections: Vec<ReportSection>,
    pub success: bool,
}

/// Response shape handed to callers: success flag plus the full report text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub success: bool,
    pub output: String,
    pub operation_id: Uuid,
}

impl OperationReport {
    pub fn new(operation_id: Uuid) -> Self {
        Self {
            operation_id,
            sections: Vec::new(),
            success: false,
        }
    }

    pub fn push(&mut self, label: impl Into<String>, body: impl Into<String>) {
        self.sections.push(ReportSection {
            label: label.into(),
            body: body.into(),
        });
    }

    /// A report for a request that never got past its first failure.
    pub fn failed(operation_id: Uuid, label: &str, reason: impl fmt::Display) -> Self {
        let mut report = Self::new(operation_id);
        report.push(label, reason.to_string());
        report
    }

    pub fn section(&self, label: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.label == label)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("=== {} ===\n", section.label));
            out.push_str(&section.body);
            if !section.body.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str(if self.success {
            "Result: SUCCESS\n"
        } else {
            "Result: FAILED\n"
        });
        out
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            success: self.success,
            output: self.render(),
            operation_id: self.operation_id,
        }
    }
}
