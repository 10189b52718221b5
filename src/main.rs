use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use imgcache::cli::{Cli, Command};
use imgcache::{CacheConfig, DecodingCache, EncodingConfig, ImageCodec, commands};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut out = io::stdout().lock();

    // Needs no cache directory
    if let Command::Hash { key } = &cli.command {
        commands::hash(key, &mut out)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = CacheConfig::resolve(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(dir) = cli.dir {
        config.directory = Some(dir);
    }
    let cache_dir = config.cache_dir()?;
    let cache = DecodingCache::new(&cache_dir, ImageCodec::new());

    match cli.command {
        Command::Hash { .. } => {}
        Command::Put {
            key,
            file,
            encode,
            format,
            quality,
        } => {
            let encoding = encode.then(|| {
                EncodingConfig::new(
                    format.unwrap_or(config.format),
                    quality.unwrap_or(config.quality),
                )
            });
            commands::put(&cache, &key, &file, encoding, &mut out)
                .with_context(|| format!("Failed to cache {}", file.display()))?;
        }
        Command::Get {
            key,
            max_width,
            max_height,
            output,
        } => {
            if !commands::get(&cache, &key, max_width, max_height, output.as_deref(), &mut out)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Purge { older_than } => {
            let max_age = older_than.unwrap_or_else(|| config.max_age());
            commands::purge(&cache, max_age, &mut out)?;
        }
        Command::List { json } => {
            commands::list(&cache, json, &mut out)
                .with_context(|| format!("Failed to list {}", cache_dir.display()))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "imgcache=debug" } else { "imgcache=info" };
    let env_filter = EnvFilter::from_default_env().add_directive(level.parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}
