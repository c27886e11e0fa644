//! Request-level operations: validate, render, apply, report.
//!
//! These are the outermost boundary. They never return an error; every
//! failure ends up as a failed [`OperationReport`].

use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocate::allocate;
use crate::apply::{apply, ApplyJob, CheckSpec};
use crate::config::{expand_command, Settings};
use crate::exec::CommandRunner;
use crate::render::{render_dhcp, render_dns, zone_serial, DhcpArtifacts, DnsArtifacts};
use crate::request::{DhcpParams, DnsParams};
use crate::service::{control_service, Service, ServiceAction};
use crate::{AddressPool, Artifact, DhcpRequest, DnsRequest, OperationReport, ProvisionError};

pub const VALIDATION_ERROR: &str = "Validation error";
pub const INTERNAL_ERROR: &str = "Internal error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Write, check and restart
    #[default]
    Apply,
    /// Render only; nothing touches the host
    DryRun,
}

/// Validate a DHCP request, allocate its pool and render both artifacts.
pub fn plan_dhcp(
    request: &DhcpRequest,
    settings: &Settings,
) -> Result<(DhcpParams, AddressPool, DhcpArtifacts), ProvisionError> {
    let params = request.validate()?;
    let pool = allocate(
        &params.subnet,
        params.router,
        &params.excluded,
        params.pool_size,
    )?;
    let artifacts = render_dhcp(&params, &pool, &settings.dhcp);
    Ok((params, pool, artifacts))
}

/// Validate a DNS request and render the zone, options and registration files.
pub fn plan_dns(
    request: &DnsRequest,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<(DnsParams, DnsArtifacts), ProvisionError> {
    let params = request.validate()?;
    let artifacts = render_dns(&params, &settings.dns, now);
    Ok((params, artifacts))
}

fn guarded(operation_id: Uuid, f: impl FnOnce() -> OperationReport) -> OperationReport {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(report) => report,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("Operation {} aborted: {}", operation_id, reason);
            OperationReport::failed(operation_id, INTERNAL_ERROR, reason)
        }
    }
}

fn push_artifacts(report: &mut OperationReport, artifacts: &[Artifact]) {
    for artifact in artifacts {
        report.push(
            format!("{} ({})", artifact.kind, artifact.path.display()),
            artifact.content.clone(),
        );
    }
}

fn push_warnings(report: &mut OperationReport, warnings: &[String]) {
    if !warnings.is_empty() {
        report.push("Warnings", warnings.join("\n"));
    }
}

fn finish(
    mut report: OperationReport,
    mode: Mode,
    job: ApplyJob,
    runner: &dyn CommandRunner,
) -> OperationReport {
    match mode {
        Mode::DryRun => {
            report.push("Dry run", "No files written; checks and restart skipped.");
            report.success = true;
        }
        Mode::Apply => apply(&job, runner, &mut report),
    }
    report
}

fn dhcp_summary(params: &DhcpParams) -> String {
    let list = |items: Vec<String>| {
        if items.is_empty() {
            "none".to_string()
        } else {
            items.join(", ")
        }
    };
    format!(
        "Subnet: {}\nRouter: {}\nInterface: {}\nDNS servers: {}\nExcluded: {}\nPool size: {}\nLease times: default {}s, max {}s",
        params.subnet,
        params.router,
        params.iface,
        list(params.dns_servers.iter().map(|a| a.to_string()).collect()),
        list(params.excluded.iter().map(|a| a.to_string()).collect()),
        params.pool_size,
        params.leases.default_secs,
        params.leases.max_secs,
    )
}

/// Regenerate the DHCP server configuration from scratch and apply it.
pub fn configure_dhcp(
    request: &DhcpRequest,
    settings: &Settings,
    runner: &dyn CommandRunner,
    mode: Mode,
) -> OperationReport {
    let operation_id = Uuid::new_v4();
    guarded(operation_id, || {
        let (params, pool, artifacts) = match plan_dhcp(request, settings) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Rejected DHCP request: {}", e);
                return OperationReport::failed(operation_id, VALIDATION_ERROR, e);
            }
        };
        info!(
            "Configuring DHCP for {} with pool {}-{}",
            params.subnet, pool.first, pool.last
        );

        let mut report = OperationReport::new(operation_id);
        report.push("Request", dhcp_summary(&params));
        push_warnings(&mut report, &params.warnings);
        report.push(
            "Pool",
            format!("{} - {} ({} addresses)", pool.first, pool.last, pool.size()),
        );
        if pool.fallback {
            warn!(
                "No clean block of {} addresses in {}, using fallback range",
                params.pool_size, params.subnet
            );
            report.push(
                "WARNING",
                format!(
                    "No contiguous block of {} addresses avoids the router and exclusions; \
                     the range starts at the first usable host and may hand out excluded addresses.",
                    params.pool_size
                ),
            );
        }

        let artifacts = artifacts.into_vec();
        push_artifacts(&mut report, &artifacts);

        let dhcp = &settings.dhcp;
        let config_path = dhcp.config_path.display().to_string();
        let interfaces_path = dhcp.interfaces_path.display().to_string();
        let command = expand_command(
            &dhcp.check_command,
            &[
                ("config", config_path.as_str()),
                ("interfaces", interfaces_path.as_str()),
            ],
        );
        let job = ApplyJob {
            artifacts,
            checks: CheckSpec::from_command("dhcpd", command, &dhcp.accepted_check_codes)
                .into_iter()
                .collect(),
            unit: dhcp.service.clone(),
            systemctl: settings.commands.systemctl.clone(),
            timeout: settings.commands.timeout(),
        };
        finish(report, mode, job, runner)
    })
}

/// Regenerate the zone, resolver options and zone registration and apply them.
pub fn configure_dns(
    request: &DnsRequest,
    settings: &Settings,
    runner: &dyn CommandRunner,
    now: DateTime<Utc>,
    mode: Mode,
) -> OperationReport {
    let operation_id = Uuid::new_v4();
    guarded(operation_id, || {
        let (params, artifacts) = match plan_dns(request, settings, now) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Rejected DNS request: {}", e);
                return OperationReport::failed(operation_id, VALIDATION_ERROR, e);
            }
        };
        info!("Configuring DNS zone {}", params.domain);

        let forwarders = if params.forwarders.is_empty() {
            "none".to_string()
        } else {
            params
                .forwarders
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut report = OperationReport::new(operation_id);
        report.push(
            "Request",
            format!(
                "Domain: {}\nServer address: {}\nName server: {}.{}\nForwarders: {}\nSerial: {}",
                params.domain,
                params.server,
                params.ns_host,
                params.domain,
                forwarders,
                zone_serial(now)
            ),
        );
        push_warnings(&mut report, &params.warnings);

        let dns = &settings.dns;
        let zone_path = artifacts.zone_file.path.display().to_string();
        let options_path = dns.options_path.display().to_string();
        let local_path = dns.local_path.display().to_string();
        let artifacts = artifacts.into_vec();
        push_artifacts(&mut report, &artifacts);

        let vars = [
            ("domain", params.domain.as_str()),
            ("zone", zone_path.as_str()),
            ("options", options_path.as_str()),
            ("local", local_path.as_str()),
        ];
        let checks = [
            CheckSpec::from_command(
                "named-checkconf",
                expand_command(&dns.checkconf_command, &vars),
                &dns.accepted_check_codes,
            ),
            CheckSpec::from_command(
                "named-checkzone",
                expand_command(&dns.checkzone_command, &vars),
                &dns.accepted_check_codes,
            ),
        ];
        let job = ApplyJob {
            artifacts,
            checks: checks.into_iter().flatten().collect(),
            unit: dns.service.clone(),
            systemctl: settings.commands.systemctl.clone(),
            timeout: settings.commands.timeout(),
        };
        finish(report, mode, job, runner)
    })
}

/// Start, stop, restart or query one of the managed services.
pub fn control(
    service: Service,
    action: ServiceAction,
    settings: &Settings,
    runner: &dyn CommandRunner,
) -> OperationReport {
    let operation_id = Uuid::new_v4();
    guarded(operation_id, || {
        let unit = service.unit(settings);
        let outcome = control_service(
            runner,
            &settings.commands.systemctl,
            unit,
            action,
            settings.commands.timeout(),
        );
        info!("{} {} -> {}", action, unit, outcome.status);

        let mut body = format!("$ {}\n{}\n", outcome.command, outcome.status);
        if !outcome.output.is_empty() {
            body.push_str(&outcome.output);
            body.push('\n');
        }
        let mut report = OperationReport::new(operation_id);
        report.push(format!("{} {} ({})", action, service, unit), body);
        report.success = outcome.succeeded();
        report
    })
}
