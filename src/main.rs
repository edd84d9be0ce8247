use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use parrot_compare::cohort::challenge_names;
use parrot_compare::{Comparator, OverlapScorer};
use parrot_core::{OutputFormat, ParrotConfig, RepoCoordinates};
use parrot_github::client::GitHubClient;
use parrot_github::fetch::{DiffFetcher, RetryPolicy};

mod report;
mod url;

use report::{Alarm, RenderOptions, Report, Section};

#[derive(Parser)]
#[command(
    name = "parrot",
    version,
    about = "Detect copied code between branches of a cohort exercise repository",
    long_about = "Parrot compares every branch of an exercise repository against the baseline\n\
                   and scores each pair of branches by how many added lines they share.\n\n\
                   Examples:\n  \
                     parrot all cohort/todo                          Compare every pair of branches\n  \
                     parrot one https://github.com/cohort/todo/tree/alice\n  \
                     parrot student cohort alice                     One student across all exercises\n  \
                     parrot cohort cohort                            Sweep recently pushed exercises\n  \
                     parrot init                                     Create a .parrot.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .parrot.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Ranked pairs with compare links (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown tables"
    )]
    format: OutputFormat,

    /// Log per-file overlap for every pair
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,

    /// Most similar pairs to show per repository, 0 for all (default: [report] top)
    #[arg(long, global = true)]
    top: Option<usize>,

    /// GitHub token (default: [github] token, then GITHUB_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Compare every pair of branches in a repository
    #[command(long_about = "Compare every pair of branches in a repository.\n\n\
        Each branch is diffed against the baseline and every unordered pair of\n\
        branches is scored once.\n\n\
        Examples:\n  parrot all cohort/todo\n  parrot all https://github.com/cohort/todo --top 10")]
    All {
        /// Repository URL or owner/repo
        repo: String,
    },
    /// Compare one branch against every other branch
    #[command(long_about = "Compare one branch against every other branch.\n\n\
        The branch is taken from a /tree/<branch> URL or the second argument.\n\n\
        Examples:\n  parrot one https://github.com/cohort/todo/tree/alice\n  parrot one cohort/todo alice")]
    One {
        /// Repository URL or owner/repo
        url: String,
        /// Branch to compare (overrides a /tree/<branch> URL)
        branch: Option<String>,
    },
    /// Compare one student's branches across the exercise repositories
    #[command(long_about = "Compare one student's branches across the exercise repositories.\n\n\
        A branch belongs to the student when its name contains <name>, ignoring case.\n\
        Repositories come from [cohort] active_repos, or the challenges listing.\n\n\
        Examples:\n  parrot student cohort alice")]
    Student {
        /// Organization owning the exercise repositories
        org: String,
        /// Student name, matched against branch names
        name: String,
    },
    /// Sweep recently pushed exercise repositories and report alarms
    #[command(long_about = "Sweep recently pushed exercise repositories and report alarms.\n\n\
        Compares every pair of branches in each exercise repository pushed within\n\
        the window, then lists cross-author pairs above the alert threshold.\n\n\
        Examples:\n  parrot cohort cohort\n  parrot cohort cohort --hours 72 --threshold 0.8")]
    Cohort {
        /// Organization owning the exercise repositories
        org: String,
        /// Only sweep repositories pushed within this many hours (default: [cohort] recent_hours)
        #[arg(long)]
        hours: Option<u64>,
        /// Similarity above which a pair is an alarm (default: [report] alert_threshold)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Create a default .parrot.toml configuration file
    #[command(long_about = "Create a default .parrot.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .parrot.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

const CONFIG_FILE: &str = ".parrot.toml";

const DEFAULT_CONFIG: &str = r#"# Parrot Configuration

[github]
# token = "ghp_..."          # falls back to GITHUB_TOKEN, then GITHUB_ACCESS_TOKEN
# api_url = "https://api.github.com"
# host = "github.com"

[compare]
# baseline = "main"
# excluded_files = ["package-lock.json", "package.json", "README.md"]
# exclude_patterns = ["*.snap", "dist/**"]
# match_mode = "membership"  # or "consuming" to match each line once

[retry]
# max_attempts = 5
# max_delay_secs = 120

[report]
# top = 5
# alert_threshold = 0.9

[cohort]
# active_repos = ["todo", "weather"]
# challenges_repo = "dev-academy-challenges/challenges"
# challenges_path = "packages"
# recent_hours = 24
"#;

fn load_config(path: Option<&Path>) -> Result<ParrotConfig> {
    let config = match path {
        Some(path) => ParrotConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                ParrotConfig::from_file(default_path)?
            } else {
                ParrotConfig::default()
            }
        }
    };
    Ok(config)
}

fn build_comparator(
    config: &ParrotConfig,
    token: Option<&str>,
    verbose: bool,
) -> Result<Comparator<GitHubClient>> {
    let client = GitHubClient::from_config(&config.github, token)?;
    let fetcher = DiffFetcher::new(
        client,
        &config.compare,
        RetryPolicy::from_config(&config.retry),
    );
    Ok(Comparator::new(
        fetcher,
        OverlapScorer::new(config.compare.match_mode, verbose),
    ))
}

fn spinner(message: String) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

/// Run `work` behind a spinner, clearing it whatever the outcome.
async fn with_spinner<T, E>(
    message: String,
    work: impl std::future::Future<Output = std::result::Result<T, E>>,
) -> std::result::Result<T, E> {
    let pb = spinner(message);
    let result = work.await;
    if let Some(pb) = pb {
        match &result {
            Ok(_) => pb.finish_and_clear(),
            Err(_) => pb.finish_with_message("Failed"),
        }
    }
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(cli.config.as_deref())?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    let opts = RenderOptions {
        host: &config.github.host,
        baseline: &config.compare.baseline,
        top: cli.top.unwrap_or(config.report.top),
        use_color,
    };
    let token = cli.token.as_deref();

    match &cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
        }
        Some(Command::All { repo }) => {
            let target = url::parse_repo_url(repo)?;
            let comparator = build_comparator(&config, token, cli.verbose)?;
            let ranked = with_spinner(
                format!("Comparing branches of {}...", target.coords),
                comparator.compare_all(&target.coords),
            )
            .await?;

            let report = Report {
                sections: vec![Section {
                    coords: target.coords,
                    ranked: &ranked,
                }],
                alarms: None,
            };
            print!("{}", report::render(&report, &opts, cli.format)?);
        }
        Some(Command::One { url: repo, branch }) => {
            let target = url::parse_repo_url(repo)?;
            let Some(branch) = branch.clone().or(target.branch) else {
                miette::bail!(
                    "no branch given for {}: pass a /tree/<branch> URL or name the branch",
                    target.coords
                );
            };
            let comparator = build_comparator(&config, token, cli.verbose)?;
            let ranked = with_spinner(
                format!("Comparing {branch} against {}...", target.coords),
                comparator.compare_one(&target.coords, &branch),
            )
            .await?;

            let report = Report {
                sections: vec![Section {
                    coords: target.coords,
                    ranked: &ranked,
                }],
                alarms: None,
            };
            print!("{}", report::render(&report, &opts, cli.format)?);
        }
        Some(Command::Student { org, name }) => {
            let comparator = build_comparator(&config, token, cli.verbose)?;
            let allow_list = challenge_names(comparator.fetcher().provider(), &config.cohort).await?;
            let results = with_spinner(
                format!("Comparing {name} across {} repositories...", allow_list.len()),
                comparator.compare_one_all_repos(org, name, &allow_list),
            )
            .await?;

            if results.is_empty() {
                eprintln!("No branches matching '{name}' in {org}");
                return Ok(());
            }

            let report = Report {
                sections: results
                    .iter()
                    .map(|r| Section {
                        coords: RepoCoordinates::new(org, &r.repo),
                        ranked: &r.comparisons,
                    })
                    .collect(),
                alarms: None,
            };
            print!("{}", report::render(&report, &opts, cli.format)?);
        }
        Some(Command::Cohort {
            org,
            hours,
            threshold,
        }) => {
            let hours = hours.unwrap_or(config.cohort.recent_hours);
            let threshold = threshold.unwrap_or(config.report.alert_threshold);

            let comparator = build_comparator(&config, token, cli.verbose)?;
            let allow_list = challenge_names(comparator.fetcher().provider(), &config.cohort).await?;
            let cohort = with_spinner(
                format!("Sweeping {org} repositories pushed in the last {hours}h..."),
                comparator.compare_cohort(org, &allow_list, Utc::now(), hours),
            )
            .await?;

            let report = Report {
                sections: cohort
                    .repos
                    .iter()
                    .map(|r| Section {
                        coords: RepoCoordinates::new(org, &r.repo),
                        ranked: &r.comparisons,
                    })
                    .collect(),
                alarms: Some(
                    cohort
                        .alarms(threshold)
                        .into_iter()
                        .map(|(repo, comparison)| Alarm {
                            coords: RepoCoordinates::new(org, repo),
                            comparison,
                        })
                        .collect(),
                ),
            };
            print!("{}", report::render(&report, &opts, cli.format)?);
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "parrot", &mut std::io::stdout());
        }
    }

    Ok(())
}
