//! ClassGrader - grading helper for GitHub Classroom assignments
//!
//! A CLI tool that clones student repositories into a grading workspace,
//! exports the scores recorded in each submission's grade file, and
//! pushes the graded branches back to GitHub.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, roster, authentication, etc.)
//!   2 - Batch completed but some repositories failed

mod analysis;
mod cli;
mod config;
mod error;
mod forge;
mod grading;
mod models;
mod repo;
mod report;
mod roster;
mod scanner;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, CloneArgs, Command, PushArgs};
use config::{Config, CONFIG_FILE};
use forge::{filter_repositories, ForgeClient};
use models::{ExportMetadata, ExportReport, GradeSummary};
use repo::GitBackend;
use scanner::FolderIndex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("ClassGrader v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Grading run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .classgrader.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set your organization, workspace and export options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch a subcommand. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    match &args.command {
        Command::Clone(clone) => run_clone(clone, &config, args.quiet).await,
        Command::Push(push) => run_push(push, &config),
        Command::Export(_) => run_export(&config),
        Command::InitConfig => Ok(0),
    }
}

/// List the organization's repositories and clone the matching ones.
async fn run_clone(clone: &CloneArgs, config: &Config, quiet: bool) -> Result<i32> {
    let org = config
        .forge
        .organization
        .as_deref()
        .context("No organization given. Use --org, CLASSGRADER_ORG or [forge] organization")?;
    let credentials = clone
        .forge
        .credentials()
        .context("No GitHub credentials given. Use --token or --username/--password")?;

    let client = ForgeClient::new(
        &config.forge.api_url,
        credentials.clone(),
        config.forge.timeout_seconds,
    )?;
    client.verify_organization(org).await?;

    println!("🔍 Listing repositories in {}...", org);
    let repos = client.list_repositories(org).await?;
    let repos = filter_repositories(repos, clone.filter.as_deref());

    if repos.is_empty() {
        println!("   No repositories match the filter.");
        return Ok(0);
    }

    if clone.dry_run {
        println!("   Found {} repositories that would be cloned:\n", repos.len());
        for repo in &repos {
            println!("     📦 {} -> {}", repo.full_name, repo.folder_name());
        }
        println!("\n✅ Dry run complete. Nothing was cloned.");
        return Ok(0);
    }

    let workspace = config.workspace_path()?;
    let template = grading::template::load_template(config.workspace.template.as_deref())?;

    println!("📥 Cloning {} repositories into {}", repos.len(), workspace.display());
    let git = GitBackend::new(Some(credentials), !quiet);
    let summary = repo::clone_for_grading(
        &git,
        &repos,
        &workspace,
        &config.workspace.branch,
        &config.workspace.grade_file,
        &template,
    )?;

    println!("\n📊 Clone Summary:");
    println!("   Cloned: {}", summary.cloned.len());
    println!("   Skipped (already present): {}", summary.skipped.len());
    println!("   Failed: {}", summary.failed.len());
    for (folder, reason) in &summary.failed {
        println!("   - {}: {}", folder, reason);
    }

    if summary.failed.is_empty() {
        println!("\n✅ Cloning complete!");
        Ok(0)
    } else {
        Ok(2)
    }
}

/// Commit and push every repository in the workspace.
fn run_push(push: &PushArgs, config: &Config) -> Result<i32> {
    let workspace = config.workspace_path()?;
    let credentials = push.forge.credentials();
    if credentials.is_none() {
        warn!("No GitHub credentials given; relying on anonymous or ssh transport");
    }

    println!("📤 Pushing graded repositories in {}", workspace.display());
    let git = GitBackend::new(credentials, false);
    let summary = repo::commit_and_push(&git, &workspace, &push.message, &config.workspace.branch)?;

    println!("\n📊 Push Summary:");
    println!("   Pushed: {}", summary.pushed.len());
    println!("   Skipped (not a repository): {}", summary.skipped.len());
    println!("   Needs manual attention: {}", summary.failed.len());
    for (folder, reason) in &summary.failed {
        println!("   - {}: {}", folder, reason);
    }

    if summary.failed.is_empty() {
        println!("\n✅ All repositories committed and pushed.");
        Ok(0)
    } else {
        Ok(2)
    }
}

/// Collect grades for every roster entry and write the grade roster.
fn run_export(config: &Config) -> Result<i32> {
    let base = config.workspace_path()?;
    let roster_path = base.join(&config.export.roster);
    let output_path = base.join(&config.export.output);

    println!("📋 Loading roster from {}", roster_path.display());
    let students = roster::load_roster(&roster_path)?;

    let index = FolderIndex::build(&base, config.export.ambiguity)?;
    println!(
        "🔬 Grading {} students from {} submission folders...",
        students.len(),
        index.folders().len()
    );

    let grades = analysis::aggregate_grades(&students, &index, &config.workspace.grade_file);
    let summary = GradeSummary::from_records(&grades);

    let export = ExportReport {
        metadata: ExportMetadata {
            roster_path: roster_path.display().to_string(),
            submissions_dir: base.display().to_string(),
            generated_at: Utc::now(),
        },
        summary: summary.clone(),
        grades,
    };
    report::write_export(&output_path, &export, config.export.format)?;

    println!("\n📊 Grade Summary:");
    println!("   Students: {}", summary.students);
    println!("   Graded: {}", summary.graded);
    println!("   Not available: {}", summary.not_available);
    for primary_id in analysis::missing_students(&export.grades) {
        println!("   - {}", primary_id);
    }
    if let (Some(mean), Some(min), Some(max)) = (summary.mean, summary.min, summary.max) {
        println!("   Mean: {:.1} | Min: {} | Max: {}", mean, min, max);
    }
    println!("\n✅ Export complete! Grades saved to: {}", output_path.display());

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
