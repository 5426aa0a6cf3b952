//! Request routing command.

use anyhow::Result;
use clap::Args;

use geoguard_core::chain::{FilterChainRouter, HttpMethod, RequestTarget};
use geoguard_core::config::Config;

use crate::output::{self, Details, OutputFormat};

#[derive(Args)]
pub struct ResolveArgs {
    /// Request path, query string allowed
    path: String,

    /// HTTP method of the request
    #[arg(short, long)]
    method: Option<HttpMethod>,
}

pub fn execute(args: ResolveArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let router = FilterChainRouter::new(config.security.filter_chains()?)?;

    let mut target = RequestTarget::new(&args.path);
    if let Some(method) = args.method {
        target = target.with_method(method);
    }
    let resolved = router.resolve_request(&target)?;

    match format {
        OutputFormat::Table => Details::titled(format!("{} -> {}", args.path, resolved.chain))
            .row("Filters", resolved.filters.join(", "))
            .row("Session Creation", resolved.allow_session_creation)
            .row("Require SSL", resolved.require_ssl)
            .row_if("Role Filter", resolved.role_filter.as_deref())
            .row_if("Interceptor", resolved.interceptor.as_deref())
            .row_if("Exception Translation", resolved.exception_translation.as_deref())
            .print(),
        _ => output::print_item(&resolved, format)?,
    }

    Ok(())
}
