//! Access rule commands.
//!
//! Lists the active rule set and evaluates the policy a user gets on a
//! workspace, layer, layer group or style.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use geoguard_core::access::{AccessContext, AccessLevel, Decision, WrapperPolicy};
use geoguard_core::admin::AdminRequest;
use geoguard_core::catalog::{CatalogTarget, LayerGroupRef, LayerRef, StyleRef, WorkspaceRef};
use geoguard_core::config::Config;
use geoguard_core::manager::SecurityManager;
use geoguard_core::rules::{Principal, RoleId};

use crate::output::{self, Details, OutputFormat, Status};

#[derive(Subcommand)]
pub enum AccessCommands {
    /// List the active data access rules
    Rules,

    /// Show the policy a user gets on a catalog object
    Check(CheckArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// User name. Omit with no roles for the anonymous user.
    #[arg(short, long)]
    user: Option<String>,

    /// Comma separated roles
    #[arg(short, long, value_delimiter = ',')]
    roles: Vec<RoleId>,

    /// Workspace holding the object
    workspace: String,

    /// Layer within the workspace
    #[arg(long, conflicts_with_all = ["group", "style"])]
    layer: Option<String>,

    /// Layer group within the workspace, given with its member layers
    #[arg(long, conflicts_with = "style")]
    group: Option<String>,

    /// Member layers of `--group`
    #[arg(long, value_delimiter = ',', requires = "group")]
    members: Vec<String>,

    /// Style within the workspace
    #[arg(long)]
    style: Option<String>,

    /// Level to decide, in addition to showing the policy
    #[arg(long)]
    requested: Option<AccessLevel>,

    /// The object is addressed directly rather than listed
    #[arg(short, long)]
    direct: bool,

    /// Evaluate as an administrative request
    #[arg(long)]
    admin: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct RuleRow {
    #[tabled(rename = "Workspace")]
    workspace: String,
    #[tabled(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Roles")]
    roles: String,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    user: String,
    target_kind: &'static str,
    target: String,
    admin_request: bool,
    hidden: bool,
    policy: WrapperPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<Decision>,
}

enum Target {
    Workspace(WorkspaceRef),
    Layer(LayerRef),
    Group(LayerGroupRef),
    Style(StyleRef),
}

impl Target {
    fn from_args(args: &CheckArgs) -> Self {
        let ws = &args.workspace;
        if let Some(layer) = &args.layer {
            Self::Layer(LayerRef::feature_type(ws.as_str(), layer.as_str()))
        } else if let Some(group) = &args.group {
            let layers = args
                .members
                .iter()
                .map(|m| LayerRef::feature_type(ws.as_str(), m.as_str()))
                .collect();
            Self::Group(LayerGroupRef::new(Some(ws.clone()), group.as_str(), layers))
        } else if let Some(style) = &args.style {
            Self::Style(StyleRef::new(Some(ws.clone()), style.as_str()))
        } else {
            Self::Workspace(WorkspaceRef::new(ws.as_str()))
        }
    }

    fn as_catalog(&self) -> CatalogTarget<'_> {
        match self {
            Self::Workspace(ws) => CatalogTarget::Workspace(ws),
            Self::Layer(layer) => CatalogTarget::Layer(layer),
            Self::Group(group) => CatalogTarget::LayerGroup(group),
            Self::Style(style) => CatalogTarget::Style(style),
        }
    }
}

fn principal(args: &CheckArgs) -> Principal {
    match &args.user {
        None if args.roles.is_empty() => Principal::anonymous(),
        user => Principal::new(
            user.as_deref().unwrap_or("anonymous"),
            args.roles.iter().cloned(),
        ),
    }
}

fn check(manager: &SecurityManager, args: &CheckArgs) -> CheckReport {
    let principal = principal(args);
    let target = Target::from_args(args);
    let catalog = target.as_catalog();

    let policy = manager.policy(&principal, catalog, AccessContext::current(args.direct));
    let decision = args
        .requested
        .map(|requested| manager.check(&principal, catalog, requested, args.direct));

    CheckReport {
        user: principal.user.to_string(),
        target_kind: catalog.kind(),
        target: catalog.name().to_string(),
        admin_request: AdminRequest::is_active(),
        hidden: manager.is_hidden(&principal, catalog),
        policy,
        decision,
    }
}

pub fn execute(cmd: AccessCommands, config: &Config, format: OutputFormat) -> Result<()> {
    let manager = SecurityManager::from_config(config)?;

    match cmd {
        AccessCommands::Rules => {
            let rules = manager.access_manager().rules().clone();
            if let OutputFormat::Table = format {
                output::status(Status::Info, &format!("catalog mode {}", rules.mode));
            }
            let rows: Vec<RuleRow> = rules
                .rules
                .iter()
                .map(|r| RuleRow {
                    workspace: r.workspace.clone(),
                    layer: r.layer.clone(),
                    mode: r.mode.to_string(),
                    roles: r.roles_value(),
                })
                .collect();
            output::print_list(&rows, format)?;
        }

        AccessCommands::Check(args) => {
            let report = if args.admin {
                AdminRequest::scope("cli", || check(&manager, &args))
            } else {
                check(&manager, &args)
            };

            match format {
                OutputFormat::Table => {
                    let limits = report.policy.limits.as_ref();
                    Details::titled(format!("{} {}", report.target_kind, report.target))
                        .row("User", &report.user)
                        .row("Admin Request", report.admin_request)
                        .row("Level", report.policy.level)
                        .row("Response", report.policy.response)
                        .row("Listed", !report.hidden)
                        .row_if("Limits", limits.map(|l| l.restriction.kind_name()))
                        .row_if("Members", limits.and_then(|l| l.allowed_layers()).map(|m| m.join(", ")))
                        .print();
                    match report.decision {
                        Some(Decision::Permit) => output::status(Status::Ok, "permitted"),
                        Some(Decision::Deny(response)) => {
                            output::status(Status::Denied, &format!("denied ({})", response))
                        }
                        None => {}
                    }
                }
                _ => output::print_item(&report, format)?,
            }
        }
    }

    Ok(())
}
