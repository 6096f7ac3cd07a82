//! nextver CLI - trunk-based semantic version calculation from Git history

use std::fmt;
use std::path::PathBuf;
use std::process::exit;

use clap::{CommandFactory, FromArgMatches, Parser};
use nextver::{calculate_version_with_fallback, Config, NextVerError};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

shadow_rs::shadow!(build);
const CLI_VERSION: &str = env!("NEXTVER_CALCULATED_VERSION");

/// nextver - trunk-based semantic version calculation from Git history
#[derive(Parser, Debug, Clone)]
#[command(name = "nextver")]
#[command(about = "Calculate the next semantic version from Git history")]
#[command(version = CLI_VERSION)]
struct Args {
    /// Working directory to analyze (defaults to current directory)
    #[arg(default_value = ".")]
    working_directory: PathBuf,

    /// Path to a configuration file (defaults to `nextver.toml` in the working directory)
    #[arg(short = 'c', long = "config")]
    config_file: Option<PathBuf>,

    /// Tag prefix to filter tags (e.g., 'v' for 'v1.0.0')
    #[arg(short = 't', long = "tag-prefix")]
    tag_prefix: Option<String>,

    /// Top-level increment policy (none, patch, minor, major)
    #[arg(short = 'i', long = "increment", value_parser = parse_increment_field)]
    increment: Option<nextver::version::IncrementField>,

    /// Output format (semver, json, full)
    #[arg(short = 'f', long = "format", default_value = "semver")]
    format: OutputFormat,

    /// Verbosity level (quiet, normal, verbose, debug, trace)
    #[arg(short = 'v', long = "verbosity", value_parser = parse_verbosity, env = "NEXTVER_VERBOSITY")]
    verbosity: Option<Verbosity>,
}

fn parse_increment_field(s: &str) -> Result<nextver::version::IncrementField, String> {
    s.parse().map_err(|e: NextVerError| e.to_string())
}

/// How much of a `SemanticVersion` the CLI prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum OutputFormat {
    /// `{major}.{minor}.{patch}[-{label}.{number}]`, no build metadata.
    #[default]
    Semver,
    /// The full `CalculationResult`, serialized with `serde_json`.
    Json,
    /// `render()` plus commits-since and branch/commit build metadata.
    Full,
}

/// A local mapping from CLI verbosity onto a `tracing::Level`, mirroring the
/// teacher's own `Verbosity` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Debug,
    Trace,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Normal
    }
}

impl std::str::FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(Verbosity::Quiet),
            "normal" => Ok(Verbosity::Normal),
            "verbose" => Ok(Verbosity::Verbose),
            "debug" => Ok(Verbosity::Debug),
            "trace" => Ok(Verbosity::Trace),
            other => Err(format!("unrecognised verbosity level: {other}")),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        };
        write!(f, "{s}")
    }
}

fn parse_verbosity(s: &str) -> Result<Verbosity, String> {
    s.parse::<Verbosity>()
}

fn main() {
    let long_ver: &'static str = Box::leak(long_version().into_boxed_str());

    let mut cmd = Args::command();
    cmd = cmd.version(CLI_VERSION).long_version(long_ver);
    let args = Args::from_arg_matches(&cmd.get_matches()).unwrap_or_else(|e| e.exit());

    let verbosity = args.verbosity.unwrap_or_default();
    let tracing_level = match verbosity {
        Verbosity::Quiet => tracing::Level::ERROR,
        Verbosity::Normal => tracing::Level::WARN,
        Verbosity::Verbose => tracing::Level::INFO,
        Verbosity::Debug => tracing::Level::DEBUG,
        Verbosity::Trace => tracing::Level::TRACE,
    };

    // `RUST_LOG`, when set, refines the `--verbosity` level rather than
    // replacing it, matching the teacher's layered filter setup.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.to_string()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            exit(2);
        }
    };

    debug!("Using configuration: {:?}", config);

    let working_dir = args.working_directory.clone();
    let exit_code = match calculate_version_with_fallback(working_dir, &config) {
        Ok(result) => {
            info!("Calculated version: {}", result);
            print_result(&result, args.format);

            if !result.is_from_tag {
                debug!(
                    commits_since_source = result.commits_since_source,
                    "version derived from an ancestor base, not an exact tag hit"
                );
            }

            0
        }
        Err(e) => {
            match &e {
                NextVerError::GitRepoNotFound(path) => {
                    error!("'{}' is not a valid Git working directory", path);
                }
                NextVerError::Configuration(message) => {
                    error!("invalid configuration: {message}");
                }
                NextVerError::Repository { branch, message } => {
                    error!("repository error on branch '{branch}': {message}");
                }
                other => {
                    error!("version calculation failed: {other}");
                }
            }
            2
        }
    };

    exit(exit_code);
}

fn print_result(result: &nextver::CalculationResult, format: OutputFormat) {
    match format {
        OutputFormat::Semver => println!("{}", result.version.render()),
        OutputFormat::Json => match serde_json::to_string(result) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("failed to serialize result as JSON: {e}"),
        },
        OutputFormat::Full => println!("{}", result.version.informational_version()),
    }
}

fn build_config(args: &Args) -> Result<Config, NextVerError> {
    let config_path = args.config_file.clone().or_else(|| {
        [
            args.working_directory.join("nextver.toml"),
            args.working_directory.join(".nextver.toml"),
        ]
        .into_iter()
        .find(|p| p.is_file())
    });

    let mut config = match &config_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            Config::from_toml_str(&contents)?
        }
        None => Config::default(),
    };

    apply_env_vars(&mut config)?;

    if let Some(prefix) = &args.tag_prefix {
        config.tag_prefix = prefix.clone();
    }

    if let Some(increment) = args.increment {
        config.increment = increment;
    }

    if config.increment == nextver::version::IncrementField::Inherit {
        return Err(NextVerError::Configuration(
            "global `increment` cannot be `Inherit`: there is no parent scope to inherit from"
                .to_string(),
        ));
    }

    Ok(config)
}

fn apply_env_vars(config: &mut Config) -> Result<(), NextVerError> {
    use std::env;

    if let Ok(tag_prefix) = env::var("NEXTVER_TAG_PREFIX") {
        if !tag_prefix.is_empty() {
            config.tag_prefix = tag_prefix;
        }
    }

    if let Ok(increment) = env::var("NEXTVER_INCREMENT") {
        if !increment.is_empty() {
            config.increment = increment.parse()?;
        }
    }

    Ok(())
}

fn long_version() -> String {
    format!(
        "{version}\ncommit: {commit} ({date})\nbuild: {build}\nrustc: {rustc}",
        version = CLI_VERSION,
        commit = build::SHORT_COMMIT,
        date = build::COMMIT_DATE,
        build = build::BUILD_TIME,
        rustc = build::RUST_VERSION,
    )
}
