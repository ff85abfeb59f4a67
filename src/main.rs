use anyhow::{Context, Result};
use bitlist::CommitDisplayFormat;
use bitlist::areas::repository::Repository;
use bitlist::artifacts::archive::ArchiveFormat;
use bitlist::artifacts::core::PagerWriter;
use bitlist::commands::plumbing::cat_file::CatFileMode;
use bitlist::commands::porcelain::diff::DiffCommandOptions;
use bitlist::commands::porcelain::log::LogOptions;
use bitlist::config::{Config, EngineSettings};
use clap::{Args, Parser, Subcommand};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "BITLIST_LOG";

#[derive(Parser)]
#[command(
    name = "bitlist",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A read-only git repository browser",
    long_about = "This is a read-only browser for git repositories, written in Rust. \
    It reads loose and packed objects directly from disk and never modifies the repository.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(long, global = true, conflicts_with = "config", help = "Path to the repository")]
    repo: Option<PathBuf>,
    #[arg(long, global = true, requires = "name", help = "Configuration file listing repositories")]
    config: Option<PathBuf>,
    #[arg(long, global = true, requires = "config", help = "Repository name from the configuration file")]
    name: Option<String>,
    #[arg(long, global = true, help = "Never page output")]
    no_pager: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DiffArgs {
    #[arg(long, help = "Show only names and status of changed files")]
    name_status: bool,
    #[arg(long, help = "Keep only changes of these kinds (A, D, M, R)")]
    diff_filter: Option<String>,
    #[arg(long, help = "Report renames as a deletion plus an addition")]
    no_renames: bool,
    #[arg(last = true, help = "Limit the diff to these paths")]
    paths: Vec<String>,
}

impl DiffArgs {
    fn into_options(self) -> DiffCommandOptions {
        DiffCommandOptions {
            paths: self.paths,
            name_status: self.name_status,
            filter: self.diff_filter,
            no_renames: self.no_renames,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "cat-file",
        about = "Print the type, size or content of an object",
        long_about = "This command prints information about an object in the repository. \
        The object may be given as any revision expression."
    )]
    CatFile {
        #[arg(short, long, value_enum, default_value = "pretty", help = "What to print")]
        mode: CatFileMode,
        #[arg(index = 1)]
        object: String,
    },
    #[command(
        name = "ls-tree",
        about = "List the contents of a tree",
        long_about = "This command lists a directory of a commit. \
        The argument is a revision optionally followed by a path, e.g. main/src."
    )]
    LsTree {
        #[arg(short, long, help = "Recurse into subdirectories")]
        recursive: bool,
        #[arg(short, long, help = "Show blob sizes")]
        long: bool,
        #[arg(index = 1, default_value = "HEAD")]
        commitish: String,
    },
    #[command(
        name = "rev-parse",
        about = "Resolve revisions to object ids",
        long_about = "This command prints the commit each revision expression resolves to."
    )]
    RevParse {
        #[arg(long, help = "Split revision/path strings instead of resolving them")]
        split: bool,
        #[arg(index = 1, required = true)]
        revisions: Vec<String>,
    },
    #[command(
        name = "log",
        about = "Show commit history",
        long_about = "This command walks history from a revision (HEAD by default), \
        newest commits first."
    )]
    Log {
        #[arg(index = 1)]
        revision: Option<String>,
        #[arg(long, help = "Only commits that change this path")]
        path: Option<String>,
        #[arg(long, help = "Only commits whose message contains this text")]
        grep: Option<String>,
        #[arg(long, default_value_t = 0, help = "Skip this many commits")]
        skip: usize,
        #[arg(short = 'n', long, help = "Show at most this many commits")]
        max_count: Option<usize>,
        #[arg(long, conflicts_with_all = ["skip", "max_count"], help = "Show one page of commits (zero-based)")]
        page: Option<usize>,
        #[arg(long, help = "One line per commit")]
        oneline: bool,
        #[arg(long, help = "Abbreviate commit ids")]
        abbrev_commit: bool,
        #[arg(long, value_enum, default_value = "medium")]
        format: CommitDisplayFormat,
        #[arg(long, help = "Show branch and tag names")]
        decorate: bool,
        #[arg(long, help = "Only print the number of commits")]
        count: bool,
    },
    #[command(
        name = "show",
        about = "Show a commit and its changes",
        long_about = "This command prints a commit and the patch against its first parent."
    )]
    Show {
        #[arg(default_value = "HEAD")]
        revision: String,
        #[command(flatten)]
        diff: DiffArgs,
    },
    #[command(
        name = "diff",
        about = "Show changes between two commits",
        long_about = "This command compares the trees of two revisions."
    )]
    Diff {
        old: String,
        new: String,
        #[command(flatten)]
        diff: DiffArgs,
    },
    #[command(
        name = "blame",
        about = "Show which commit last changed each line of a file",
        long_about = "This command attributes every line of a file. \
        The argument is a revision followed by a path, e.g. main/src/lib.rs."
    )]
    Blame {
        #[arg(index = 1)]
        commitish: String,
    },
    #[command(name = "branch", about = "List branches")]
    Branch {
        #[arg(short, long, help = "Show the commit each branch points at")]
        verbose: bool,
    },
    #[command(name = "tag", about = "List tags")]
    Tag {
        #[arg(short, long, help = "Show the commit each tag points at")]
        verbose: bool,
    },
    #[command(
        name = "archive",
        about = "Write a zip or tar archive of a commit",
        long_about = "This command writes the full tree of a revision as an archive. \
        The same commit always produces the same bytes."
    )]
    Archive {
        #[arg(index = 1, default_value = "HEAD")]
        revision: String,
        #[arg(long, default_value = "tar")]
        format: ArchiveFormat,
        #[arg(long, help = "Directory prepended to every path")]
        prefix: Option<String>,
        #[arg(short, long, help = "Write to this file instead of stdout")]
        output: Option<PathBuf>,
    },
    #[command(name = "stats", about = "Summarise authors and files of a revision")]
    Stats {
        #[arg(index = 1, default_value = "HEAD")]
        revision: String,
    },
    #[command(name = "grep", about = "Search file contents of a revision")]
    Grep {
        #[arg(index = 1)]
        pattern: String,
        #[arg(index = 2, default_value = "HEAD")]
        revision: String,
        #[arg(long, help = "Show one page of matches (zero-based)")]
        page: Option<usize>,
    },
}

impl Commands {
    /// Commands whose output is worth paging on a terminal
    fn is_pageable(&self) -> bool {
        !matches!(
            self,
            Commands::Archive { .. } | Commands::RevParse { .. } | Commands::CatFile { .. }
        )
    }
}

fn open_repository(cli: &Cli) -> Result<Repository> {
    if let (Some(config), Some(name)) = (&cli.config, &cli.name) {
        let config = Config::load(config)
            .with_context(|| format!("failed to load {}", config.display()))?;
        let path = config.repository_path(name)?;
        return Ok(Repository::open_with(path, config.engine)?);
    }

    let path = match &cli.repo {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    Ok(Repository::open_with(path, EngineSettings::default())?)
}

fn run(repository: &Repository, command: Commands) -> Result<()> {
    match command {
        Commands::CatFile { mode, object } => repository.cat_file(&object, mode)?,
        Commands::LsTree {
            recursive,
            long,
            commitish,
        } => repository.ls_tree(&commitish, recursive, long)?,
        Commands::RevParse { split, revisions } => repository.rev_parse(&revisions, split)?,
        Commands::Log {
            revision,
            path,
            grep,
            skip,
            max_count,
            page,
            oneline,
            abbrev_commit,
            format,
            decorate,
            count,
        } => repository.log(&LogOptions {
            revision,
            path,
            grep,
            skip,
            max_count,
            page,
            oneline,
            abbrev_commit,
            format,
            decorate,
            count,
        })?,
        Commands::Show { revision, diff } => repository.show(&revision, &diff.into_options())?,
        Commands::Diff { old, new, diff } => repository.diff(&old, &new, &diff.into_options())?,
        Commands::Blame { commitish } => repository.blame_file(&commitish)?,
        Commands::Branch { verbose } => repository.branch(verbose)?,
        Commands::Tag { verbose } => repository.tag(verbose)?,
        Commands::Archive {
            revision,
            format,
            prefix,
            output,
        } => repository.archive(&revision, format, prefix.as_deref(), output.as_deref())?,
        Commands::Stats { revision } => repository.print_stats(&revision)?,
        Commands::Grep {
            pattern,
            revision,
            page,
        } => repository.grep(&pattern, &revision, page)?,
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let repository = open_repository(&cli)?;

    let interactive = std::io::stdout().is_terminal();
    if !interactive {
        colored::control::set_override(false);
    }

    if interactive && !cli.no_pager && cli.command.is_pageable() {
        let pager = minus::Pager::new();
        let repository = repository.with_writer(Box::new(PagerWriter::new(pager.clone())));
        run(&repository, cli.command)?;
        minus::page_all(pager)?;
    } else {
        run(&repository, cli.command)?;
    }

    Ok(())
}
