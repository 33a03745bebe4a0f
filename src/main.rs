use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use dep_freshness::config::{Config, log_path};
use dep_freshness::freshness::DependencyState;
use dep_freshness::logging::{self, LogOptions, LogTarget};
use dep_freshness::manifest::ProjectIdentity;
use dep_freshness::service::{FreshnessService, ProjectStatus};

#[derive(Parser)]
#[command(name = "dep-freshness")]
#[command(version, about = "Check whether a project's dependencies are up to date")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to a file instead of stderr (defaults to the data directory)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<Option<PathBuf>>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a project's dependencies and print its freshness
    Check {
        /// Project as owner/repo
        project: ProjectIdentity,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let target = match cli.log_file {
        None => LogTarget::Stderr,
        Some(path) => LogTarget::File(path.unwrap_or_else(log_path)),
    };
    logging::init(&LogOptions {
        target,
        json: cli.log_json,
    })?;

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Check { project, json } => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(check(&config, &project, json)),
    }
}

async fn check(config: &Config, project: &ProjectIdentity, json: bool) -> anyhow::Result<()> {
    let service = FreshnessService::new(config);
    let status = service
        .status(project)
        .await
        .with_context(|| format!("Failed to check {}", project))?;
    service.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn print_status(status: &ProjectStatus) {
    let report = &status.report;
    let width = report
        .deps
        .iter()
        .map(|d| d.name.len())
        .max()
        .unwrap_or(0)
        .max("DEPENDENCY".len());

    println!(
        "{:<width$}  {:<16}  {:<16}  STATE",
        "DEPENDENCY", "DECLARED", "LATEST"
    );
    for dep in &report.deps {
        let state = match dep.state {
            DependencyState::UpToDate => "up to date",
            DependencyState::OutOfDate => "out of date",
            DependencyState::Unknown => "unknown",
        };
        println!(
            "{:<width$}  {:<16}  {:<16}  {}",
            dep.name,
            dep.declared_constraint,
            dep.latest_known_version.as_deref().unwrap_or("-"),
            state
        );
    }
    println!();
    println!(
        "{}: {} ({} of {} out of date, {} unknown)",
        report.project,
        status.verdict,
        report.total_out_of_date,
        report.total_deps,
        report.total_unknown
    );
}
