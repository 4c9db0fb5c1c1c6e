//! tgwmgrd - transit gateway routing manager
//!
//! Plans reachability for a routing policy and attachment inventory, and
//! synthesizes static routes for peering links. Results are printed as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tgwmgrd::{
    paths, AttachmentPlan, AttachmentRegistrar, DomainMode, PeeringLink, PeeringRouteSynthesizer,
    RoutingDomainModel, TgwMgr,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use transit_orch_common::{Directive, DirectiveExecutor, InMemoryProvisioner, SubmitReport};
use transit_policy::{AttachmentSpec, PeeringConfig, RoutingPolicy};
use transit_types::{GroupRef, TableId};

/// Transit Gateway Routing Manager
#[derive(Parser, Debug)]
#[command(name = "tgwmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the directives required by a policy and attachment inventory
    Plan {
        /// Routing policy document (YAML or JSON)
        #[arg(short, long, default_value = paths::DEFAULT_POLICY)]
        policy: PathBuf,

        /// Attachment inventory document (YAML or JSON)
        #[arg(short, long, default_value = paths::DEFAULT_ATTACHMENTS)]
        attachments: PathBuf,
    },

    /// Plan and submit to the in-memory provisioner (dry run)
    Apply {
        #[arg(short, long, default_value = paths::DEFAULT_POLICY)]
        policy: PathBuf,

        #[arg(short, long, default_value = paths::DEFAULT_ATTACHMENTS)]
        attachments: PathBuf,
    },

    /// Synthesize static routes for a peering link
    Peer {
        /// Peering link document (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Also submit the routes to the in-memory provisioner
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Serialize)]
struct PlanOutput {
    mode: DomainMode,
    tables: Vec<Directive>,
    attachments: Vec<AttachmentPlan>,
    errors: Vec<String>,
}

#[derive(Serialize)]
struct ApplyOutput {
    tables: std::collections::BTreeMap<GroupRef, TableId>,
    report: SubmitReport,
    errors: Vec<String>,
}

#[derive(Serialize)]
struct PeerOutput {
    link: Directive,
    local: Vec<Directive>,
    remote: Vec<Directive>,
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<SubmitReport>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting tgwmgrd ---");

    match run(args.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

/// Returns Ok(false) when some input was rejected but output was produced
async fn run(command: Command) -> Result<bool> {
    match command {
        Command::Plan {
            policy,
            attachments,
        } => plan(&policy, &attachments),
        Command::Apply {
            policy,
            attachments,
        } => apply(&policy, &attachments).await,
        Command::Peer { config, apply } => peer(&config, apply).await,
    }
}

fn load_inputs(policy: &Path, attachments: &Path) -> Result<(RoutingPolicy, Vec<AttachmentSpec>)> {
    let policy = RoutingPolicy::load(policy)
        .with_context(|| format!("loading policy {}", policy.display()))?;
    let specs = AttachmentSpec::load_all(attachments)
        .with_context(|| format!("loading attachments {}", attachments.display()))?;
    info!(
        "Loaded {} groups and {} attachments",
        policy.groups.len(),
        specs.len()
    );
    Ok((policy, specs))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn plan(policy: &Path, attachments: &Path) -> Result<bool> {
    let (policy, specs) = load_inputs(policy, attachments)?;
    let mut model = RoutingDomainModel::from_policy(&policy)?;
    let tables = model.table_directives();

    let mut plans = Vec::with_capacity(specs.len());
    let mut errors = Vec::new();
    let mut registrar = AttachmentRegistrar::new(&mut model);
    for spec in &specs {
        match registrar.attach(&spec.attachment_id, &spec.group_name, spec.owned_prefixes.clone()) {
            Ok(plan) => {
                errors.extend(plan.dangling.iter().map(|e| e.to_string()));
                plans.push(plan);
            }
            Err(e) => errors.push(format!("{}: {}", spec.attachment_id, e)),
        }
    }

    let ok = errors.is_empty();
    print_json(&PlanOutput {
        mode: model.mode(),
        tables,
        attachments: plans,
        errors,
    })?;
    Ok(ok)
}

async fn apply(policy: &Path, attachments: &Path) -> Result<bool> {
    let (policy, specs) = load_inputs(policy, attachments)?;
    let mut mgr = TgwMgr::from_policy(&policy, InMemoryProvisioner::new())?;

    let mut errors = Vec::new();
    for spec in &specs {
        match mgr.attach(spec) {
            Ok(plan) => errors.extend(plan.dangling.iter().map(|e| e.to_string())),
            Err(e) => errors.push(format!("{}: {}", spec.attachment_id, e)),
        }
    }

    let report = mgr.submit().await;
    let ok = errors.is_empty() && report.is_complete();
    print_json(&ApplyOutput {
        tables: mgr.table_ids(),
        report,
        errors,
    })?;
    Ok(ok)
}

async fn peer(config: &Path, apply: bool) -> Result<bool> {
    let config = PeeringConfig::load(config)
        .with_context(|| format!("loading peering link {}", config.display()))?;
    let link = PeeringLink::from_config(&config)?;
    let plan = PeeringRouteSynthesizer::new().synthesize(
        &link,
        &config.local.prefixes,
        &config.remote.prefixes,
    );

    let report = if apply {
        let client = InMemoryProvisioner::new();
        let mut executor = DirectiveExecutor::new();
        Some(executor.submit(&client, &plan.directives()).await)
    } else {
        None
    };

    let errors: Vec<String> = plan.errors().iter().map(|e| e.to_string()).collect();
    let ok = errors.is_empty() && report.as_ref().map_or(true, SubmitReport::is_complete);
    print_json(&PeerOutput {
        link: plan.link.clone(),
        local: plan.local.clone().unwrap_or_default(),
        remote: plan.remote.clone().unwrap_or_default(),
        errors,
        report,
    })?;
    Ok(ok)
}
