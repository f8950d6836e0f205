use anyhow::{Context, Result};
use changescope::artifacts::modules::catalog::ModuleCatalog;
use changescope::artifacts::objects::commit::Commit;
use changescope::artifacts::objects::object::Object;
use changescope::{ChangeExtractor, ExtractOptions, GitChange};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use is_terminal::IsTerminal;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "changescope",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Extract the files and lines a branch changed since it forked from trunk",
    long_about = "This tool finds the best common ancestor of a candidate branch and the trunk, \
    diffs the two trees with rename detection and reports the exact added and deleted lines \
    of every touched file.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BranchArgs {
    #[arg(short, long, help = "Path to the repository")]
    repository: PathBuf,
    #[arg(short = 'p', long = "branch", help = "The candidate branch")]
    branch: String,
    #[arg(
        short,
        long,
        env = "CHANGESCOPE_TRUNK",
        default_value = "master",
        help = "The trunk branch the candidate is compared against"
    )]
    trunk: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "changes",
        about = "List changed files with their added and deleted lines",
        long_about = "This command prints one line per changed file: the path, the added line \
        numbers and the deleted line numbers, zero-indexed. Deleted files are not listed."
    )]
    Changes {
        #[command(flatten)]
        branches: BranchArgs,
        #[arg(long, value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
        #[arg(long, help = "Report renamed files as an addition and a deletion")]
        no_renames: bool,
        #[arg(
            long,
            default_value_t = 50,
            value_parser = clap::value_parser!(u8).range(0..=100),
            help = "Minimum similarity percentage of a rename"
        )]
        rename_threshold: u8,
        #[arg(long, help = "Check the hash of every object read")]
        verify_objects: bool,
    },
    #[command(
        name = "name-status",
        about = "List the path-level changes of the candidate branch",
        long_about = "This command prints the status letter and path of every file changed \
        since the merge base, deletions included, with renames and copies as `old -> new`."
    )]
    NameStatus {
        #[command(flatten)]
        branches: BranchArgs,
        #[arg(long, help = "Report renamed files as an addition and a deletion")]
        no_renames: bool,
    },
    #[command(
        name = "merge-base",
        about = "Print the best common ancestor of the candidate and the trunk"
    )]
    MergeBase {
        #[command(flatten)]
        branches: BranchArgs,
        #[arg(short, long, help = "Also print the author, date and summary")]
        verbose: bool,
    },
    #[command(
        name = "modules",
        about = "List the rule modules touched by the candidate branch",
        long_about = "This command classifies every changed path against a module catalog \
        (a JSON array of module records) and prints the touched rule modules."
    )]
    Modules {
        #[command(flatten)]
        branches: BranchArgs,
        #[arg(short, long, help = "Path to the module catalog")]
        catalog: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Changes {
            branches,
            format,
            no_renames,
            rename_threshold,
            verify_objects,
        } => {
            let options = ExtractOptions::default()
                .with_trunk(branches.trunk)
                .with_detect_renames(!no_renames)
                .with_rename_threshold(rename_threshold)
                .with_verify_objects(verify_objects);
            let changes = ChangeExtractor::open(&branches.repository, options)?
                .extract(&branches.branch)?;

            match format {
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut stdout, &changes)?;
                    writeln!(stdout)?;
                }
                OutputFormat::Text => {
                    for change in &changes {
                        writeln!(stdout, "{}", format_change(change))?;
                    }
                }
            }
        }
        Commands::NameStatus {
            branches,
            no_renames,
        } => {
            let options = ExtractOptions::default()
                .with_trunk(branches.trunk)
                .with_detect_renames(!no_renames);
            let entries = ChangeExtractor::open(&branches.repository, options)?
                .diff_entries(&branches.branch)?;

            for entry in entries {
                writeln!(stdout, "{entry}")?;
            }
        }
        Commands::MergeBase { branches, verbose } => {
            let options = ExtractOptions::default().with_trunk(branches.trunk);
            let merge_base =
                ChangeExtractor::open(&branches.repository, options)?.merge_base(&branches.branch)?;

            if verbose {
                write!(stdout, "{}", format_commit(&merge_base))?;
            } else {
                writeln!(stdout, "{}", merge_base.object_id())?;
            }
        }
        Commands::Modules { branches, catalog } => {
            let catalog = ModuleCatalog::from_path(&catalog)?;
            let options = ExtractOptions::default().with_trunk(branches.trunk);
            let changes = ChangeExtractor::open(&branches.repository, options)?
                .extract(&branches.branch)
                .with_context(|| format!("Unable to extract changes of {}", branches.branch))?;

            for module in catalog.collect_modules(&changes) {
                writeln!(stdout, "{}\t{}", module.parent, module.full_name())?;
            }
        }
    }

    Ok(())
}

fn format_change(change: &GitChange) -> String {
    format!(
        "{}\t{}\t{}",
        change.path(),
        format!("+{}", format_ranges(change.added_lines())).green(),
        format!("-{}", format_ranges(change.deleted_lines())).red()
    )
}

/// `git log`-style header of a commit
fn format_commit(commit: &Commit) -> String {
    let mut out = format!("commit {}\n", commit.object_id().to_string().yellow());

    if commit.is_merge() {
        let parents = commit
            .parents()
            .iter()
            .map(|parent| parent.to_short_oid())
            .collect::<Vec<_>>();
        out.push_str(&format!("Merge: {}\n", parents.join(" ")));
    }
    if let Some(author) = commit.author() {
        out.push_str(&format!("Author: {}\n", author.display_name()));
        out.push_str(&format!("Date:   {}\n", author.readable_timestamp()));
    }
    out.push_str(&format!("\n    {}\n", commit.short_message()));

    out
}

/// Compact line list: `0-2,5,7-8`
fn format_ranges(lines: &BTreeSet<usize>) -> String {
    let mut ranges: Vec<(usize, usize)> = Vec::new();

    for &line in lines {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == line => *end = line,
            _ => ranges.push((line, line)),
        }
    }

    ranges
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
