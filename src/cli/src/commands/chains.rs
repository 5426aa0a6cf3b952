//! Filter chain table commands.
//!
//! Provides list, show, and export operations over the configured table.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use geoguard_core::chain::{ChainKind, RequestFilterChain};
use geoguard_core::config::{Config, FilterChainConfig};

use crate::output::{self, Details, OutputFormat};

#[derive(Subcommand)]
pub enum ChainCommands {
    /// List chains in evaluation order
    List,

    /// Inspect a single chain
    Show {
        /// Chain name
        name: String,
    },

    /// Print the table as configuration entries
    Export,
}

#[derive(Debug, Serialize, Tabled)]
struct ChainRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Patterns")]
    patterns: String,
    #[tabled(rename = "Filters")]
    filters: String,
    #[tabled(rename = "Methods")]
    methods: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

fn kind_label(kind: ChainKind) -> &'static str {
    match kind {
        ChainKind::Constant => "constant",
        ChainKind::Variable { removable: true } => "variable",
        ChainKind::Variable { removable: false } => "variable (locked)",
    }
}

fn flags(chain: &RequestFilterChain) -> String {
    let mut flags = Vec::new();
    if chain.is_disabled() {
        flags.push("disabled");
    }
    if chain.is_allow_session_creation() {
        flags.push("session");
    }
    if chain.is_require_ssl() {
        flags.push("ssl");
    }
    flags.join(",")
}

fn methods(chain: &RequestFilterChain) -> String {
    if !chain.is_match_http_method() {
        return "*".to_string();
    }
    chain
        .http_method_set()
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn row(position: usize, chain: &RequestFilterChain) -> ChainRow {
    ChainRow {
        position,
        name: chain.name().to_string(),
        kind: kind_label(chain.kind()).to_string(),
        patterns: chain
            .patterns()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        filters: chain.filter_names().join(","),
        methods: methods(chain),
        flags: flags(chain),
    }
}

pub fn execute(cmd: ChainCommands, config: &Config, format: OutputFormat) -> Result<()> {
    let chains = config.security.filter_chains()?;

    match cmd {
        ChainCommands::List => {
            let rows: Vec<ChainRow> = chains
                .iter()
                .enumerate()
                .map(|(i, c)| row(i, c))
                .collect();
            output::print_list(&rows, format)?;
        }

        ChainCommands::Show { name } => {
            let (position, chain) = chains
                .iter()
                .enumerate()
                .find(|(_, c)| c.name() == name)
                .with_context(|| format!("No filter chain named '{}'", name))?;

            match format {
                OutputFormat::Table => {
                    let r = row(position, chain);
                    Details::titled(format!("Chain: {}", r.name))
                        .row("Position", r.position)
                        .row("Kind", r.kind)
                        .row("Patterns", r.patterns)
                        .row("Filters", r.filters)
                        .row("Methods", r.methods)
                        .row("Flags", r.flags)
                        .row("Role Filter", chain.role_filter_name().unwrap_or("-"))
                        .row("Interceptor", chain.interceptor_name().unwrap_or("-"))
                        .row(
                            "Exception Translation",
                            chain.exception_translation_name().unwrap_or("-"),
                        )
                        .print();
                }
                _ => output::print_item(chain, format)?,
            }
        }

        ChainCommands::Export => {
            let entries: Vec<FilterChainConfig> =
                chains.iter().map(FilterChainConfig::from_chain).collect();
            output::print_item(&entries, format)?;
        }
    }

    Ok(())
}
