use anyhow::Result;

use crate::config::Settings;
use crate::exec::SystemRunner;
use crate::provision::control;
use crate::service::{Service, ServiceAction};

use super::{print_report, Output};

pub(crate) fn run_service(
    service: Service,
    action: ServiceAction,
    settings: &Settings,
    output: &Output,
) -> Result<()> {
    let report = control(service, action, settings, &SystemRunner);
    print_report(&report, output, &format!("{} {}", service, action))
}
