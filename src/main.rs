use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use replay::config::{AuthorMap, MigrateConfig};
use replay::doctor;
use replay::engine::{ReplaySummary, Replayer};
use replay::format::OutputFormat;
use replay::git::GitCli;
use replay::model::{ChangesetId, ChangesetRange};
use replay::telemetry;
use replay::tf::TfCli;

/// Changeset replay engine
///
/// Replays the full changeset history of a centralized version-control
/// repository into a git repository — one commit per changeset, in strict
/// ascending order, preserving author, date and comment.
///
/// The source system is driven through its `tf` command-line client; the
/// destination through `git`. Both must be on PATH and authenticated
/// (`replay doctor` checks this).
///
/// QUICK START:
///
///   replay doctor
///   replay migrate --source '$/Project' --work-dir ./migrated --dry-run
///   replay migrate --source '$/Project' --work-dir ./migrated \
///       --authors authors.toml
///
/// A failed run keeps every commit made so far; resume with
/// --from <last-committed-id + 1>.
#[derive(Parser)]
#[command(name = "replay")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'replay <command> --help' for more information on a specific command.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay source changesets into the destination repository
    Migrate(MigrateArgs),

    /// Check that required external tools are available
    ///
    /// Verifies that the source client (tf) and the destination client (git)
    /// are installed and runnable.
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Source repository root (server path, e.g. '$/Project')
    #[arg(long)]
    source: String,

    /// Working tree / destination repository directory
    #[arg(long)]
    work_dir: PathBuf,

    /// First changeset to replay (inclusive)
    #[arg(long)]
    from: Option<u64>,

    /// Last changeset to replay (inclusive)
    #[arg(long)]
    to: Option<u64>,

    /// TOML author-mapping file ([authors] table)
    #[arg(long)]
    authors: Option<PathBuf>,

    /// The source history never reused a path under a different casing;
    /// skip case reconciliation entirely
    #[arg(long)]
    case_sensitive: bool,

    /// List the changesets that would be replayed, then exit
    #[arg(long)]
    dry_run: bool,

    /// Output format for the run summary
    #[arg(long)]
    format: Option<OutputFormat>,
}

#[derive(Args, Debug)]
struct DoctorArgs {
    /// Output format
    #[arg(long)]
    format: Option<OutputFormat>,
}

fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate(args) => migrate(&args),
        Commands::Doctor(args) => {
            if doctor::run(args.format)? {
                Ok(())
            } else {
                std::process::exit(1);
            }
        }
    }
}

fn migrate(args: &MigrateArgs) -> Result<()> {
    let parse_bound = |raw: Option<u64>, flag: &str| -> Result<Option<ChangesetId>> {
        raw.map(|n| ChangesetId::new(n).with_context(|| format!("--{flag} must be at least 1")))
            .transpose()
    };
    let range = ChangesetRange::new(
        parse_bound(args.from, "from")?,
        parse_bound(args.to, "to")?,
    )?;

    let cfg = MigrateConfig {
        server_path: args.source.clone(),
        work_dir: args.work_dir.clone(),
        range,
        reconcile_case: !args.case_sensitive,
    };

    let authors = match &args.authors {
        Some(path) => AuthorMap::load(path)?,
        None => AuthorMap::empty(),
    };

    std::fs::create_dir_all(&cfg.work_dir)
        .with_context(|| format!("cannot create work dir {}", cfg.work_dir.display()))?;

    let source = TfCli::new(cfg.server_path.clone(), cfg.work_dir.clone());
    let dest = GitCli::new(cfg.work_dir.clone());
    let replayer = Replayer::new(&cfg, &source, &dest, &authors);

    let format = args.format.unwrap_or_default();

    if args.dry_run {
        let ids = replayer.plan()?;
        match format {
            OutputFormat::Json => println!("{}", format.serialize(&ids)?),
            OutputFormat::Text => {
                println!("{} changeset(s) would be replayed:", ids.len());
                for id in &ids {
                    println!("  {id}");
                }
            }
        }
        return Ok(());
    }

    let summary = replayer.run()?;
    print_summary(&summary, format)
}

fn print_summary(summary: &ReplaySummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", format.serialize(summary)?),
        OutputFormat::Text => {
            println!(
                "Replayed {} changeset(s), {} case rename(s).",
                summary.commits.len(),
                summary.renames
            );
            if let Some((first, last)) = summary.span() {
                println!("  {first} through {last}");
            }
        }
    }
    Ok(())
}
