//! Raw access decision command.
//!
//! Without `--requested` and `--granted` the full decision grid for the mode
//! is printed.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use geoguard_core::access::{decide, AccessLevel, CatalogMode, Decision};

use crate::output::{self, OutputFormat, Status};

#[derive(Args)]
pub struct DecideArgs {
    /// Requested access level (hidden, metadata, read-only, read-write)
    #[arg(short, long)]
    requested: Option<AccessLevel>,

    /// Granted access level
    #[arg(short, long)]
    granted: Option<AccessLevel>,

    /// Catalog mode (hide, mixed, challenge)
    #[arg(short, long, default_value = "hide")]
    mode: CatalogMode,

    /// The object was addressed directly rather than listed
    #[arg(short, long)]
    direct: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct DecisionRow {
    #[tabled(rename = "Requested")]
    requested: AccessLevel,
    #[tabled(rename = "Granted")]
    granted: AccessLevel,
    #[tabled(rename = "Decision")]
    #[serde(skip)]
    label: String,
    #[tabled(skip)]
    decision: Decision,
}

fn label(decision: Decision) -> String {
    match decision {
        Decision::Permit => "permit".to_string(),
        Decision::Deny(response) => format!("deny ({})", response),
    }
}

fn evaluate(requested: AccessLevel, granted: AccessLevel, args: &DecideArgs) -> DecisionRow {
    let decision = decide(requested, granted, args.mode, args.direct);
    DecisionRow {
        requested,
        granted,
        label: label(decision),
        decision,
    }
}

pub fn execute(args: DecideArgs, format: OutputFormat) -> Result<()> {
    let rows: Vec<DecisionRow> = match (args.requested, args.granted) {
        (Some(requested), Some(granted)) => vec![evaluate(requested, granted, &args)],
        (requested, granted) => {
            let requested: Vec<AccessLevel> = requested.map_or(AccessLevel::ALL.to_vec(), |r| vec![r]);
            let granted: Vec<AccessLevel> = granted.map_or(AccessLevel::ALL.to_vec(), |g| vec![g]);
            requested
                .iter()
                .flat_map(|&r| granted.iter().map(move |&g| (r, g)))
                .map(|(r, g)| evaluate(r, g, &args))
                .collect()
        }
    };

    if let OutputFormat::Table = format {
        let context = if args.direct { "direct access" } else { "listing" };
        output::status(Status::Info, &format!("mode {}, {}", args.mode, context));
    }
    output::print_list(&rows, format)
}
