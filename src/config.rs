//! Host layout and external command settings, loaded from TOML.
//!
//! Every field has a Debian default, so an empty file (or no file) yields a
//! working configuration for `isc-dhcp-server` and `bind9`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ProvisionError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub dhcp: DhcpSettings,
    pub dns: DnsSettings,
    pub commands: CommandSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DhcpSettings {
    pub service: String,
    pub config_path: PathBuf,
    pub interfaces_path: PathBuf,
    /// Placeholders: `{config}`, `{interfaces}`
    pub check_command: Vec<String>,
    pub accepted_check_codes: Vec<i32>,
}

impl Default for DhcpSettings {
    fn default() -> Self {
        Self {
            service: "isc-dhcp-server".to_string(),
            config_path: PathBuf::from("/etc/dhcp/dhcpd.conf"),
            interfaces_path: PathBuf::from("/etc/default/isc-dhcp-server"),
            check_command: vec![
                "dhcpd".to_string(),
                "-t".to_string(),
                "-cf".to_string(),
                "{config}".to_string(),
            ],
            // dhcpd -t exits 1 on some warnings that do not stop it from starting
            accepted_check_codes: vec![0, 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DnsSettings {
    pub service: String,
    /// Zone files land here as `db.<domain>`
    pub zone_dir: PathBuf,
    pub options_path: PathBuf,
    pub local_path: PathBuf,
    /// Working directory written into the `options` block
    pub bind_directory: String,
    /// Placeholders: `{options}`, `{local}`
    pub checkconf_command: Vec<String>,
    /// Placeholders: `{domain}`, `{zone}`
    pub checkzone_command: Vec<String>,
    pub accepted_check_codes: Vec<i32>,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            service: "bind9".to_string(),
            zone_dir: PathBuf::from("/etc/bind"),
            options_path: PathBuf::from("/etc/bind/named.conf.options"),
            local_path: PathBuf::from("/etc/bind/named.conf.local"),
            bind_directory: "/var/cache/bind".to_string(),
            checkconf_command: vec!["named-checkconf".to_string()],
            checkzone_command: vec![
                "named-checkzone".to_string(),
                "{domain}".to_string(),
                "{zone}".to_string(),
            ],
            accepted_check_codes: vec![0],
        }
    }
}

impl DnsSettings {
    pub fn zone_path(&self, domain: &str) -> PathBuf {
        self.zone_dir.join(format!("db.{}", domain))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandSettings {
    pub systemctl: String,
    /// Upper bound for every checker and service-control invocation
    pub timeout_secs: u64,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            systemctl: "systemctl".to_string(),
            timeout_secs: 30,
        }
    }
}

impl CommandSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Load settings from a TOML file, or the built-in defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ProvisionError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(path, e))?;
        Self::from_toml(path, &text)
    }

    /// Parse and check settings; `path` only names the source in errors.
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ProvisionError> {
        let settings: Settings = toml::from_str(text).map_err(|e| invalid(path, e))?;
        if settings.dhcp.check_command.is_empty()
            || settings.dns.checkconf_command.is_empty()
            || settings.dns.checkzone_command.is_empty()
        {
            return Err(invalid(path, "checker commands must name a program"));
        }
        if settings.commands.timeout_secs == 0 {
            return Err(invalid(path, "commands.timeout_secs must be at least 1"));
        }
        Ok(settings)
    }
}

fn invalid(path: &Path, reason: impl ToString) -> ProvisionError {
    ProvisionError::InvalidConfig {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Substitute `{name}` placeholders in each argument of a command template.
pub fn expand_command(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
        })
        .collect()
}
