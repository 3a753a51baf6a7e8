use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use fs_err as fs;
use serde::Serialize;
use srcplan_cli::config::{self, ConfigMerger};
use srcplan_domain::{DependencyGraph, OutcomeLedger, check_configuration};
use srcplan_render::render_results_md;
use srcplan_types::configured::ConfiguredPackage;
use srcplan_types::description::VersionRange;
use srcplan_types::identity::{
    HasComponentId, PackageId, PackageName, Version, synthesize_component_id,
};
use srcplan_types::repo::Repo;
use std::collections::BTreeMap;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "srcplan",
    version,
    about = "Inspect source-package install plans and build results."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the configured repositories, cache and version preferences.
    Repos(ReposArgs),
    /// Print the component id a planned package uses before it is installed.
    ComponentId(ComponentIdArgs),
    /// Print the build order of an install plan.
    Order(OrderArgs),
    /// Render a build results file as Markdown.
    Report(ReportArgs),
}

#[derive(Debug, Parser)]
struct ReposArgs {
    /// Project root holding srcplan.toml (default: current directory).
    #[arg(long, default_value = ".")]
    root: Utf8PathBuf,

    /// Cache directory (overrides [cache] dir).
    #[arg(long, env = "SRCPLAN_CACHE_DIR")]
    cache_dir: Option<Utf8PathBuf>,

    /// Version preference as NAME=RANGE (repeatable, overrides [preferences]).
    #[arg(long = "prefer")]
    prefer: Vec<String>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ComponentIdArgs {
    /// Package name, e.g. "text".
    name: String,

    /// Exact version, e.g. "2.0.1".
    version: String,
}

#[derive(Debug, Parser)]
struct OrderArgs {
    /// JSON file with the configured packages of the plan.
    plan: Utf8PathBuf,

    /// Check every package's dependencies against its description first.
    #[arg(long, default_value_t = false)]
    check: bool,
}

#[derive(Debug, Parser)]
struct ReportArgs {
    /// JSON file mapping package ids to build results.
    results: Utf8PathBuf,

    /// Write the report here instead of stdout.
    #[arg(long)]
    out: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct ReposReport<'a> {
    cache_dir: &'a Utf8Path,
    repos: &'a [Repo],
    preferences: BTreeMap<String, String>,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Repos(args) => cmd_repos(args),
        Command::ComponentId(args) => cmd_component_id(args),
        Command::Order(args) => cmd_order(args),
        Command::Report(args) => cmd_report(args),
    }
}

fn cmd_repos(args: ReposArgs) -> anyhow::Result<()> {
    let file_config = config::load_or_default(&args.root).context("load srcplan.toml config")?;
    let merged =
        ConfigMerger::new(file_config).merge(&args.root, args.cache_dir, &args.prefer)?;

    match args.format {
        OutputFormat::Json => {
            let report = ReposReport {
                cache_dir: &merged.cache_dir,
                repos: &merged.repos,
                preferences: preference_text(&merged.preferences),
            };
            let json = serde_json::to_string_pretty(&report).context("serialize repos")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("cache: {}", merged.cache_dir);
            for repo in &merged.repos {
                match repo.remote_of() {
                    Some(remote) => println!(
                        "remote {} {} secure={} try_https={} cache={}",
                        remote.name,
                        remote.uri,
                        remote.secure,
                        remote.should_try_https,
                        repo.dir()
                    ),
                    None => println!("local {}", repo.dir()),
                }
            }
            for (name, range) in &merged.preferences {
                println!("prefer {} {}", name, range);
            }
        }
    }
    Ok(())
}

fn preference_text(prefs: &BTreeMap<PackageName, VersionRange>) -> BTreeMap<String, String> {
    prefs
        .iter()
        .map(|(name, range)| (name.to_string(), range.to_string()))
        .collect()
}

fn cmd_component_id(args: ComponentIdArgs) -> anyhow::Result<()> {
    let name: PackageName = args
        .name
        .parse()
        .with_context(|| format!("invalid package name {}", args.name))?;
    let version: Version = args
        .version
        .parse()
        .with_context(|| format!("invalid version {}", args.version))?;
    let id = PackageId::new(name, version);
    println!("{}", synthesize_component_id(&id));
    Ok(())
}

fn cmd_order(args: OrderArgs) -> anyhow::Result<()> {
    let contents =
        fs::read_to_string(&args.plan).with_context(|| format!("read plan {}", args.plan))?;
    let plan: Vec<ConfiguredPackage> = serde_json::from_str(&contents)
        .with_context(|| format!("parse plan {}", args.plan))?;
    debug!(packages = plan.len(), "loaded plan");

    if args.check {
        for pkg in &plan {
            check_configuration(pkg)?;
        }
        info!(packages = plan.len(), "plan configuration is consistent");
    }

    let graph = DependencyGraph::from_packages(&plan)?;
    let by_id: BTreeMap<&PackageId, &ConfiguredPackage> =
        plan.iter().map(|p| (&p.source.package_id, p)).collect();
    for id in graph.build_order()? {
        let component = by_id
            .get(&id)
            .map(|p| p.component_id().to_string())
            .unwrap_or_default();
        println!("{} {}", id, component);
    }
    for external in graph.external() {
        info!(component = %external, "dependency is outside the plan");
    }
    Ok(())
}

fn cmd_report(args: ReportArgs) -> anyhow::Result<()> {
    let contents = fs::read_to_string(&args.results)
        .with_context(|| format!("read results {}", args.results))?;
    let ledger: OutcomeLedger = serde_json::from_str(&contents)
        .with_context(|| format!("parse results {}", args.results))?;

    let md = render_results_md(&ledger);
    match args.out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
            }
            fs::write(&path, md).with_context(|| format!("write {}", path))?;
            info!(path = %path, packages = ledger.len(), "wrote report");
        }
        None => print!("{}", md),
    }
    Ok(())
}
