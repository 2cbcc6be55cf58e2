//! sitemap-inspect - query the sitemap structure cache from the command line.
//!
//! Loads a repository fixture (JSON) into the in-memory repository, builds the
//! sitemap structure cache over it and runs one query.
//!
//! ```text
//! sitemap-inspect --fixture site.json --locale en --site-root /sites/default uri /about
//! ```

mod commands;
mod error;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use sitemap_cache::config::default_config_path;
use sitemap_cache::logging::init_logging;
use sitemap_cache::repository::{InMemoryRepository, JsonSitemapUnmarshaller};
use sitemap_cache::{
    LoggingConfig, RepositoryMode, RequestContext, SitemapCacheConfig, SitemapStructureCache,
};
use tracing::debug;

use commands::inspect::InspectCommand;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "sitemap-inspect", version, about, long_about = None)]
struct Cli {
    /// Repository fixture to load (JSON)
    #[arg(long, short = 'f')]
    fixture: PathBuf,

    /// Configuration file (INI); defaults to the user config file if present
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Repository mode to read (online or offline)
    #[arg(long)]
    mode: Option<RepositoryMode>,

    /// Locale of the request
    #[arg(long, default_value = "en")]
    locale: String,

    /// Site root prepended to site-relative URIs
    #[arg(long, default_value = "")]
    site_root: String,

    #[command(subcommand)]
    command: InspectCommand,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| default_config_path().filter(|p| p.exists()));
    let (mut cache_config, logging_config) = load_configs(config_path.as_deref())?;
    if let Some(mode) = cli.mode {
        cache_config = cache_config.with_mode(mode);
    }

    let _logging = init_logging(&logging_config).map_err(|e| CliError::Logging(e.to_string()))?;
    debug!(
        version = sitemap_cache::VERSION,
        fixture = %cli.fixture.display(),
        config = ?config_path,
        mode = %cache_config.mode,
        "Starting sitemap-inspect"
    );

    let repository =
        InMemoryRepository::from_fixture_file(&cli.fixture).map_err(CliError::Fixture)?;
    let cache = SitemapStructureCache::new(
        cache_config,
        Arc::new(repository),
        Arc::new(JsonSitemapUnmarshaller::new()),
    );
    let ctx = RequestContext::new(cli.locale.as_str(), cli.site_root);

    commands::inspect::run(&cache, &ctx, cli.command)
}

/// Read cache and logging settings, falling back to defaults without a file.
fn load_configs(path: Option<&Path>) -> Result<(SitemapCacheConfig, LoggingConfig), CliError> {
    match path {
        Some(path) => Ok((
            SitemapCacheConfig::from_ini_file(path)?,
            LoggingConfig::from_ini_file(path)?,
        )),
        None => Ok((SitemapCacheConfig::default(), LoggingConfig::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_configs_defaults_without_file() {
        let (cache, logging) = load_configs(None).unwrap();
        assert_eq!(cache, SitemapCacheConfig::default());
        assert_eq!(logging, LoggingConfig::default());
    }

    #[test]
    fn test_load_configs_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[sitemap_cache]\nmode = online\n\n[logging]\nlevel = warn"
        )
        .unwrap();

        let (cache, logging) = load_configs(Some(file.path())).unwrap();
        assert_eq!(cache.mode, RepositoryMode::Online);
        assert_eq!(logging.level, "warn");
    }

    #[test]
    fn test_load_configs_bad_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sitemap_cache]\nmode = draft").unwrap();

        let err = load_configs(Some(file.path())).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_cli_parses_subcommand() {
        let cli = Cli::try_parse_from([
            "sitemap-inspect",
            "--fixture",
            "site.json",
            "--mode",
            "online",
            "--site-root",
            "/sites/default",
            "uri",
            "/about",
        ])
        .unwrap();
        assert_eq!(cli.mode, Some(RepositoryMode::Online));
        assert!(matches!(cli.command, InspectCommand::Uri { ref uri } if uri == "/about"));
    }
}
