use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use changes_markup::{
    convert_path, convert_reader, ConvertOptions, Dialect, GitTagLookup, NoReleaseLookup,
    ReleaseLookup,
};
use changes_markup_config::{Config, LoadOptions};
use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Convert plain-text outlines and changelogs into sectioned XML
#[derive(Parser)]
#[command(name = "changes-markup", version, about, long_about = None)]
pub struct Cli {
    /// Files to convert; `-` reads standard input
    #[arg(value_name = "FILE", required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file applied on top of discovered settings
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Line convention of the input, overriding the configuration
    #[arg(long, value_enum)]
    dialect: Option<DialectValue>,

    /// Do not look up release tags and dates
    #[arg(long)]
    no_release_dates: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DialectValue {
    Outline,
    Changes,
}

impl From<DialectValue> for Dialect {
    fn from(value: DialectValue) -> Self {
        match value {
            DialectValue::Outline => Dialect::Outline,
            DialectValue::Changes => Dialect::Changes,
        }
    }
}

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut load = LoadOptions::default();
    if let Some(path) = &cli.config {
        load = load.with_override_path(path);
    }
    let config = Config::load(load)?;
    for layer in &config.sources.layers {
        tracing::info!("configuration layer: {}", layer.describe());
    }

    let mut options = config.convert_options();
    if let Some(dialect) = cli.dialect {
        options.dialect = dialect.into();
    }

    let releases = release_lookup(&config, cli.no_release_dates);

    for path in &cli.paths {
        let document = convert_input(path, &options, releases.as_ref())
            .with_context(|| format!("Unable to convert {}", path.display()))?;

        if !emit(&document)? {
            tracing::debug!("stdout closed, skipping remaining inputs");
            break;
        }
    }

    Ok(0)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn release_lookup(config: &Config, disabled: bool) -> Box<dyn ReleaseLookup> {
    if disabled || !config.release.enabled {
        tracing::info!("release lookup disabled");
        return Box::new(NoReleaseLookup);
    }

    match config.repository_root() {
        Some(root) => {
            tracing::info!("resolving release tags in {}", root.display());
            Box::new(GitTagLookup::new(root, config.release.tag_prefix.clone()))
        }
        None => {
            tracing::info!("not inside a git repository, release dates unavailable");
            Box::new(NoReleaseLookup)
        }
    }
}

fn convert_input(
    path: &Path,
    options: &ConvertOptions,
    releases: &dyn ReleaseLookup,
) -> Result<String> {
    if path == Path::new("-") {
        let stdin = io::stdin();
        let mut reader = stdin.lock();
        Ok(convert_reader(&mut reader, options, releases)?)
    } else {
        Ok(convert_path(path, options, releases)?)
    }
}

/// Writes one document to stdout. Returns `false` once the reader has gone away.
fn emit(document: &str) -> Result<bool> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match handle.write_all(document.as_bytes()) {
        Ok(_) => {}
        Err(err) if should_ignore_pipe_error(&err) => return Ok(false),
        Err(err) => return Err(err).context("Failed to write document"),
    }

    match handle.flush() {
        Ok(_) => Ok(true),
        Err(err) if should_ignore_pipe_error(&err) => Ok(false),
        Err(err) => Err(err).context("Failed to flush stdout"),
    }
}

fn should_ignore_pipe_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags_and_paths() {
        let cli = Cli::try_parse_from([
            "changes-markup",
            "--dialect",
            "changes",
            "--no-release-dates",
            "-vv",
            "a.txt",
            "-",
        ])
        .unwrap();
        assert!(matches!(cli.dialect, Some(DialectValue::Changes)));
        assert!(cli.no_release_dates);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.paths, vec![PathBuf::from("a.txt"), PathBuf::from("-")]);
    }

    #[test]
    fn requires_at_least_one_path() {
        assert!(Cli::try_parse_from(["changes-markup"]).is_err());
    }
}
