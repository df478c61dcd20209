use anyhow::{Context, Result};
use beacon_patcher::config::load_from_path;
use beacon_patcher::{
    PatchOutcome, Pipeline, PluginConfig, PluginMetadata, ProjectLayout, SkipReason, StepReport,
};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "beacon-patcher")]
#[command(about = "Wire the Beacon analytics SDK into iOS and Android projects", long_about = None)]
#[command(version)]
struct Cli {
    /// Show debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Project root containing ios/ and/or android/ (auto-detected if not specified)
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Plugin options file (.toml or .json; defaults to beacon.toml, then app.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch the project
    Apply {
        #[command(flatten)]
        target: Target,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report which patches are present without changing anything
    Status {
        #[command(flatten)]
        target: Target,
    },

    /// Exit non-zero unless every patch is already applied
    Verify {
        #[command(flatten)]
        target: Target,
    },

    /// Print the validated configuration
    ShowConfig {
        #[command(flatten)]
        target: Target,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Apply {
            target,
            dry_run,
            diff,
        } => cmd_apply(target, dry_run, diff),

        Commands::Status { target } => cmd_status(target),

        Commands::Verify { target } => cmd_verify(target),

        Commands::ShowConfig { target } => cmd_show_config(target),
    }
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("beacon_patcher=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beacon_patcher=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Resolve the project root
///
/// Priority order:
/// 1. Explicit --project flag
/// 2. BEACON_PROJECT environment variable
/// 3. Nearest ancestor of the current directory with ios/ or android/
fn resolve_project(cli_project: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_project {
        return path
            .canonicalize()
            .with_context(|| format!("project path {} does not exist", path.display()));
    }

    if let Ok(env_path) = env::var("BEACON_PROJECT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!("Warning: BEACON_PROJECT is set but path doesn't exist: {env_path}").yellow()
        );
    }

    if let Some(path) = auto_detect_project() {
        println!(
            "{}",
            format!("Auto-detected project: {}", path.display()).dimmed()
        );
        return Ok(path);
    }

    anyhow::bail!(
        "{}\n{}\n  {}\n  {}\n  {}",
        "Could not find a mobile project.".red(),
        "Try one of:".bold(),
        "1. cd into the directory that contains ios/ or android/",
        "2. Specify explicitly: beacon-patcher apply --project /path/to/app",
        "3. Set environment variable: export BEACON_PROJECT=/path/to/app"
    )
}

fn auto_detect_project() -> Option<PathBuf> {
    let current = env::current_dir().ok()?;
    current
        .ancestors()
        .find(|dir| dir.join("ios").is_dir() || dir.join("android").is_dir())
        .map(Path::to_path_buf)
}

/// `--config`, else `beacon.toml`, else `app.json` in the project root.
fn resolve_config_file(project: &Path, cli_config: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_config {
        return Ok(path);
    }
    ["beacon.toml", "app.json"]
        .iter()
        .map(|name| project.join(name))
        .find(|path| path.is_file())
        .with_context(|| {
            format!(
                "no beacon.toml or app.json in {}; pass --config",
                project.display()
            )
        })
}

struct Session {
    config: PluginConfig,
    layout: ProjectLayout,
}

/// Load and validate configuration before touching any artifact.
fn open_session(target: Target) -> Result<Session> {
    let project = resolve_project(target.project)?;
    let config_file = resolve_config_file(&project, target.config)?;
    let config = load_from_path(&config_file)?.validate()?;
    let layout = ProjectLayout::discover(project);

    if !layout.has_ios() && !layout.has_android() {
        eprintln!(
            "{}",
            format!(
                "Warning: no ios/ or android/ directory under {}; nothing to patch",
                layout.root.display()
            )
            .yellow()
        );
    }

    Ok(Session { config, layout })
}

fn artifact_label(layout: &ProjectLayout, report: &StepReport) -> String {
    report
        .artifact
        .as_deref()
        .map(|path| layout.relative(path).display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &str, original: &str, modified: &str) {
    println!("\n{}", format!("--- {file} (original)").dimmed());
    println!("{}", format!("+++ {file} (patched)").dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{sign}");
    }
}

fn cmd_apply(target: Target, dry_run: bool, show_diff: bool) -> Result<()> {
    let session = open_session(target)?;
    let layout = session.layout.clone();

    println!("Project: {}", layout.root.display());
    if dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
    }
    println!();

    let reports = Pipeline::new(session.config, session.layout, PluginMetadata::current())?
        .dry_run(dry_run)
        .run()?;

    let mut applied = 0;
    let mut already_applied = 0;
    let mut skipped = 0;
    let mut no_anchor = 0;

    for report in &reports {
        let label = artifact_label(&layout, report);
        let verb = if dry_run { "Would apply" } else { "Applied" };
        match report.outcome {
            PatchOutcome::Applied { anchor } => {
                println!("{} {}: {verb} to {label} ({anchor})", "✓".green(), report.step);
                applied += 1;
            }
            PatchOutcome::AppliedViaFallback { anchor } => {
                println!(
                    "{} {}: {verb} to {label} {}",
                    "✓".yellow(),
                    report.step,
                    format!("(fallback anchor: {anchor})").yellow()
                );
                applied += 1;
            }
            PatchOutcome::Skipped(SkipReason::AlreadyApplied) => {
                println!("{} {}: Already applied to {label}", "⊙".yellow(), report.step);
                already_applied += 1;
            }
            PatchOutcome::Skipped(SkipReason::ArtifactMissing) => {
                println!("{} {}: Skipped (artifact not found)", "⊘".cyan(), report.step);
                skipped += 1;
            }
            PatchOutcome::Skipped(SkipReason::AnchorNotFound) => {
                eprintln!(
                    "{} {}: No insertion anchor in {label}; left unchanged",
                    "✗".red(),
                    report.step
                );
                no_anchor += 1;
            }
        }

        if show_diff {
            if let Some((before, after)) = report.diff() {
                display_diff(&label, before, after);
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{applied}").green());
    println!("  {} already applied", format!("{already_applied}").yellow());
    println!("  {} skipped", format!("{skipped}").cyan());
    println!("  {} without anchor", format!("{no_anchor}").red());

    Ok(())
}

fn cmd_status(target: Target) -> Result<()> {
    let session = open_session(target)?;
    let layout = session.layout.clone();

    println!("{}", "Patch Status Report".bold());
    println!("Project: {}", layout.root.display());
    println!();

    let reports = Pipeline::new(session.config, session.layout, PluginMetadata::current())?
        .dry_run(true)
        .run()?;

    let mut applied = Vec::new();
    let mut pending = Vec::new();
    let mut no_anchor = Vec::new();
    let mut missing = Vec::new();

    for report in &reports {
        let entry = (report.step, artifact_label(&layout, report));
        match report.outcome {
            PatchOutcome::Skipped(SkipReason::AlreadyApplied) => applied.push(entry),
            PatchOutcome::Applied { .. } | PatchOutcome::AppliedViaFallback { .. } => {
                pending.push(entry)
            }
            PatchOutcome::Skipped(SkipReason::AnchorNotFound) => no_anchor.push(entry),
            PatchOutcome::Skipped(SkipReason::ArtifactMissing) => missing.push(entry),
        }
    }

    let groups = [
        ("✓".green(), "APPLIED".green().bold(), &applied),
        ("⊙".yellow(), "PENDING".yellow().bold(), &pending),
        ("✗".red(), "ANCHOR MISSING".red().bold(), &no_anchor),
        ("⊘".cyan(), "NOT IN PROJECT".cyan().bold(), &missing),
    ];
    for (glyph, title, entries) in groups {
        if entries.is_empty() {
            continue;
        }
        println!("{glyph} {title} ({} steps)", entries.len());
        for (step, label) in entries.iter() {
            println!("  - {step} ({})", label.dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_verify(target: Target) -> Result<()> {
    let session = open_session(target)?;
    let layout = session.layout.clone();

    println!("{}", "Verifying patches...".bold());
    println!("Project: {}", layout.root.display());
    println!();

    let reports = Pipeline::new(session.config, session.layout, PluginMetadata::current())?
        .dry_run(true)
        .run()?;

    let mut verified = 0;
    let mut mismatch = 0;
    let mut skipped = 0;

    for report in &reports {
        let label = artifact_label(&layout, report);
        match report.outcome {
            PatchOutcome::Skipped(SkipReason::AlreadyApplied) => {
                println!("{} {}: Verified (already applied)", "✓".green(), report.step);
                verified += 1;
            }
            PatchOutcome::Skipped(SkipReason::ArtifactMissing) => {
                println!("{} {}: Skipped (artifact not found)", "⊘".cyan(), report.step);
                skipped += 1;
            }
            PatchOutcome::Skipped(SkipReason::AnchorNotFound) => {
                eprintln!("{} {}: MISMATCH", "✗".red(), report.step);
                eprintln!("  Found: no insertion anchor");
                eprintln!("  Location: {label}");
                mismatch += 1;
            }
            PatchOutcome::Applied { .. } | PatchOutcome::AppliedViaFallback { .. } => {
                eprintln!("{} {}: MISMATCH", "✗".red(), report.step);
                eprintln!("  Expected: patch already applied");
                eprintln!("  Found: patch not yet applied");
                eprintln!("  Location: {label}");
                mismatch += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} verified", format!("{verified}").green());
    println!("  {} mismatch", format!("{mismatch}").red());
    println!("  {} skipped", format!("{skipped}").cyan());

    if mismatch > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_show_config(target: Target) -> Result<()> {
    let session = open_session(target)?;
    let config = &session.config;

    println!("{}", "Beacon configuration".bold());
    println!("  subscription:          {}", config.subscription);
    println!("  uid:                   {}", config.uid);
    match &config.credentials {
        Some(credentials) => {
            println!("  username:              {}", credentials.username);
            println!("  password:              {}", "********".dimmed());
        }
        None => println!("  credentials:           {}", "none (public sources)".dimmed()),
    }
    println!(
        "  browserName:           {}",
        config.browser_name.as_deref().unwrap_or("-")
    );
    println!("  enableTestMode:        {}", config.enable_test_mode);
    println!("  disableCrashReporting: {}", config.disable_crash_reporting);
    println!("  sdkVersion:            {}", config.sdk_version);
    println!("  nativeLibraryVersion:  {}", config.native_library_version);
    println!(
        "  nativeLibraryPath:     {}",
        config.native_library_path.display()
    );

    Ok(())
}
