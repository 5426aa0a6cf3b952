//! Configuration validation command.

use anyhow::Result;
use serde::Serialize;

use geoguard_core::config::Config;

use crate::output::{self, Details, OutputFormat, Status};

#[derive(Debug, Serialize)]
struct ValidationSummary {
    environment: String,
    chains: usize,
    rules: usize,
    catalog_mode: String,
    admin_role: String,
}

pub fn execute(config: &Config, format: OutputFormat) -> Result<()> {
    config.security.validate()?;

    let rules = config.security.access_rules()?;
    let summary = ValidationSummary {
        environment: config.environment.clone(),
        chains: config.security.filter_chains()?.len(),
        rules: rules.len(),
        catalog_mode: rules.mode.to_string(),
        admin_role: config.security.admin_role()?.to_string(),
    };

    match format {
        OutputFormat::Table => {
            output::status(Status::Ok, "Configuration is valid");
            Details::untitled()
                .row("Environment", &summary.environment)
                .row("Filter Chains", summary.chains)
                .row("Rules", summary.rules)
                .row("Catalog Mode", &summary.catalog_mode)
                .row("Admin Role", &summary.admin_role)
                .print();
        }
        _ => output::print_item(&summary, format)?,
    }

    Ok(())
}
