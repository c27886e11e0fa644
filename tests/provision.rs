use chrono::{TimeZone, Utc};
use netprov::config::Settings;
use netprov::exec::command_line;
use netprov::provision::VALIDATION_ERROR;
use netprov::{
    configure_dhcp, configure_dns, plan_dhcp, CommandOutcome, CommandRunner, DhcpRequest,
    DnsRequest, Mode, ProcessStatus,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Records every command and answers with a per-program exit code.
#[derive(Default)]
struct RecordingRunner {
    codes: HashMap<String, i32>,
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    fn failing(program: &str, code: i32) -> Self {
        let mut runner = Self::default();
        runner.codes.insert(program.to_string(), code);
        runner
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String], _timeout: Duration) -> CommandOutcome {
        let command = command_line(program, args);
        self.calls.lock().unwrap().push(command.clone());
        let code = self.codes.get(program).copied().unwrap_or(0);
        CommandOutcome {
            command,
            status: ProcessStatus::Exited(code),
            output: format!("{} output", program),
        }
    }
}

fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.dhcp.config_path = dir.join("dhcp/dhcpd.conf");
    settings.dhcp.interfaces_path = dir.join("default/isc-dhcp-server");
    settings.dns.zone_dir = dir.join("bind");
    settings.dns.options_path = dir.join("bind/named.conf.options");
    settings.dns.local_path = dir.join("bind/named.conf.local");
    settings
}

fn dhcp_request(excluded: &str) -> DhcpRequest {
    DhcpRequest {
        network_cidr: "192.168.50.0/24".to_string(),
        router_ip: "192.168.50.1".to_string(),
        iface: "eth0".to_string(),
        excluded: excluded.to_string(),
        pool_size: 50,
        ..Default::default()
    }
}

fn dns_request() -> DnsRequest {
    DnsRequest {
        domain: "example.local".to_string(),
        server_ip: "10.0.0.1".to_string(),
        ns_host: "ns1".to_string(),
        forwarders: "8.8.8.8;1.1.1.1".to_string(),
    }
}

/// Pulls the interesting values back out of a rendered dhcpd.conf.
fn extract_dhcp_fields(text: &str) -> HashMap<&'static str, String> {
    let mut fields = HashMap::new();
    for line in text.lines().map(str::trim) {
        let line = line.trim_end_matches(';').trim_end_matches('{').trim();
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["default-lease-time", v] => {
                fields.insert("default_lease", v.to_string());
            }
            ["max-lease-time", v] => {
                fields.insert("max_lease", v.to_string());
            }
            ["subnet", net, "netmask", mask] => {
                fields.insert("network", net.to_string());
                fields.insert("netmask", mask.to_string());
            }
            ["range", first, last] => {
                fields.insert("pool_first", first.to_string());
                fields.insert("pool_last", last.to_string());
            }
            ["option", "routers", r] => {
                fields.insert("router", r.to_string());
            }
            ["option", "broadcast-address", b] => {
                fields.insert("broadcast", b.to_string());
            }
            _ => {}
        }
    }
    fields
}

#[test]
fn test_scenario_a_plain_subnet() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let runner = RecordingRunner::default();

    let report = configure_dhcp(&dhcp_request(""), &settings, &runner, Mode::Apply);
    assert!(report.success, "{}", report.render());

    let conf = fs::read_to_string(&settings.dhcp.config_path).unwrap();
    let fields = extract_dhcp_fields(&conf);
    assert_eq!(fields["pool_first"], "192.168.50.2");
    assert_eq!(fields["pool_last"], "192.168.50.51");
    assert_eq!(fields["router"], "192.168.50.1");
    assert_eq!(fields["broadcast"], "192.168.50.255");

    let binding = fs::read_to_string(&settings.dhcp.interfaces_path).unwrap();
    assert!(binding.contains("INTERFACESv4=\"eth0\""));

    assert_eq!(
        runner.calls(),
        vec![
            format!("dhcpd -t -cf {}", settings.dhcp.config_path.display()),
            "systemctl restart isc-dhcp-server".to_string(),
        ]
    );
}

#[test]
fn test_scenario_b_exclusions_skipped() {
    let settings = Settings::default();
    let (_, pool, _) = plan_dhcp(&dhcp_request("192.168.50.2,192.168.50.3"), &settings).unwrap();
    assert_eq!(pool.first.to_string(), "192.168.50.4");
    assert_eq!(pool.last.to_string(), "192.168.50.53");
    assert!(!pool.fallback);
}

#[test]
fn test_rendered_config_round_trips_request_values() {
    let request = DhcpRequest {
        network_cidr: "10.20.0.0/16".to_string(),
        router_ip: "10.20.0.254".to_string(),
        iface: "br0".to_string(),
        pool_size: 1000,
        default_lease: 3600,
        max_lease: 86400,
        ..Default::default()
    };
    let (_, pool, artifacts) = plan_dhcp(&request, &Settings::default()).unwrap();
    let fields = extract_dhcp_fields(&artifacts.main_config.content);

    assert_eq!(fields["network"], "10.20.0.0");
    assert_eq!(fields["netmask"], "255.255.0.0");
    assert_eq!(fields["router"], "10.20.0.254");
    assert_eq!(fields["pool_first"], pool.first.to_string());
    assert_eq!(fields["pool_last"], pool.last.to_string());
    assert_eq!(fields["default_lease"], "3600");
    assert_eq!(fields["max_lease"], "86400");
    assert_eq!(pool.size(), 1000);
}

#[test]
fn test_fallback_pool_is_reported_as_warning() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let request = DhcpRequest {
        network_cidr: "192.168.7.0/28".to_string(),
        router_ip: "192.168.7.1".to_string(),
        iface: "eth1".to_string(),
        excluded: "192.168.7.8".to_string(),
        pool_size: 10,
        ..Default::default()
    };

    let report = configure_dhcp(&request, &settings, &RecordingRunner::default(), Mode::Apply);
    assert!(report.success);
    assert!(report.section("WARNING").is_some());
    assert_eq!(
        report.section("Pool").unwrap().body,
        "192.168.7.1 - 192.168.7.10 (10 addresses)"
    );
}

#[test]
fn test_validation_error_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let runner = RecordingRunner::default();
    let mut request = dhcp_request("");
    request.router_ip = "192.168.99.1".to_string();

    let report = configure_dhcp(&request, &settings, &runner, Mode::Apply);
    assert!(!report.success);
    assert_eq!(report.sections.len(), 1);
    assert_eq!(report.sections[0].label, VALIDATION_ERROR);
    assert!(report.sections[0].body.contains("not inside subnet"));
    assert!(runner.calls().is_empty());
    assert!(!settings.dhcp.config_path.exists());
}

#[test]
fn test_dry_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let runner = RecordingRunner::default();

    let report = configure_dhcp(&dhcp_request(""), &settings, &runner, Mode::DryRun);
    assert!(report.success);
    assert!(report.render().contains("range 192.168.50.2 192.168.50.51;"));
    assert!(report.section("Dry run").is_some());
    assert!(runner.calls().is_empty());
    assert!(!settings.dhcp.config_path.exists());
}

#[test]
fn test_restart_failure_with_passing_checkers() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let runner = RecordingRunner::failing("systemctl", 1);

    let report = configure_dns(
        &dns_request(),
        &settings,
        &runner,
        Utc::now(),
        Mode::Apply,
    );
    assert!(!report.success);

    let text = report.render();
    assert!(report
        .section("Check: named-checkconf")
        .unwrap()
        .body
        .contains("exit code 0 (accepted)"));
    assert!(report
        .section("Check: named-checkzone")
        .unwrap()
        .body
        .contains("exit code 0 (accepted)"));
    assert!(report
        .section("Restart: bind9")
        .unwrap()
        .body
        .contains("exit code 1"));
    assert!(text.ends_with("Result: FAILED\n"));
}

#[test]
fn test_scenario_c_zone_records() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let runner = RecordingRunner::default();
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();

    let report = configure_dns(&dns_request(), &settings, &runner, now, Mode::Apply);
    assert!(report.success, "{}", report.render());

    let zone_path = dir.path().join("bind/db.example.local");
    let zone = fs::read_to_string(&zone_path).unwrap();
    assert!(zone.contains("IN\tSOA\tns1.example.local. admin.example.local. ("));
    assert!(zone.contains("2026101908 ; Serial"));
    assert!(zone.contains("@\tIN\tNS\tns1.example.local.\n"));
    assert!(zone.contains("@\tIN\tA\t10.0.0.1\n"));
    assert!(zone.contains("ns1\tIN\tA\t10.0.0.1\n"));
    assert!(zone.contains("www\tIN\tA\t10.0.0.1\n"));

    let options = fs::read_to_string(&settings.dns.options_path).unwrap();
    assert!(options.contains("\t\t8.8.8.8;\n\t\t1.1.1.1;\n"));

    let local = fs::read_to_string(&settings.dns.local_path).unwrap();
    assert!(local.contains(&format!("file \"{}\";", zone_path.display())));

    assert_eq!(
        runner.calls(),
        vec![
            "named-checkconf".to_string(),
            format!("named-checkzone example.local {}", zone_path.display()),
            "systemctl restart bind9".to_string(),
        ]
    );
}

#[test]
fn test_dns_checker_exit_one_is_rejected_but_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let runner = RecordingRunner::failing("named-checkzone", 1);

    let report = configure_dns(&dns_request(), &settings, &runner, Utc::now(), Mode::Apply);
    assert!(report.success);
    assert!(report
        .section("Check: named-checkzone")
        .unwrap()
        .body
        .contains("exit code 1 (rejected)"));
}

#[test]
fn test_reconfigure_overwrites_previous_files() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let runner = RecordingRunner::default();

    configure_dhcp(&dhcp_request(""), &settings, &runner, Mode::Apply);
    let mut smaller = dhcp_request("");
    smaller.pool_size = 5;
    configure_dhcp(&smaller, &settings, &runner, Mode::Apply);

    let conf = fs::read_to_string(&settings.dhcp.config_path).unwrap();
    assert!(conf.contains("range 192.168.50.2 192.168.50.6;"));
    assert_eq!(conf.matches("subnet ").count(), 1);
}

#[test]
fn test_zone_serial_advances_with_the_hour() {
    let settings = Settings::default();
    let early = Utc.with_ymd_and_hms(2026, 10, 19, 8, 59, 59).unwrap();
    let later = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
    let (_, a) = netprov::plan_dns(&dns_request(), &settings, early).unwrap();
    let (_, b) = netprov::plan_dns(&dns_request(), &settings, later).unwrap();
    assert_ne!(a.zone_file.content, b.zone_file.content);
    assert_eq!(a.resolver_options, b.resolver_options);
    assert_eq!(a.zone_registration, b.zone_registration);
}
