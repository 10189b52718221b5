use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::codec::ImageFormat;

#[derive(Parser, Debug)]
#[command(name = "imgcache")]
#[command(about = "Inspect and maintain a disk-backed image cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Cache directory (overrides config file and IMGCACHE_DIR)
    #[arg(long, short = 'd', global = true)]
    pub dir: Option<PathBuf>,

    /// Configuration file (default: platform config dir)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store a file under a key
    Put {
        /// Logical cache key
        key: String,

        /// File whose content is stored
        file: PathBuf,

        /// Decode the file and re-encode it instead of storing raw bytes
        #[arg(long, short = 'e')]
        encode: bool,

        /// Format for --encode (default from config)
        #[arg(long, short = 'f', requires = "encode")]
        format: Option<ImageFormat>,

        /// Quality for lossy formats (default from config)
        #[arg(long, short = 'q', requires = "encode", value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },

    /// Decode a cached entry, optionally writing it to a file
    Get {
        /// Logical cache key
        key: String,

        /// Maximum width (0 = unbounded)
        #[arg(long, short = 'W', default_value = "0")]
        max_width: u32,

        /// Maximum height (0 = unbounded)
        #[arg(long, short = 'H', default_value = "0")]
        max_height: u32,

        /// Write the decoded image here (format from extension)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Delete entries not accessed recently
    Purge {
        /// Maximum entry age (e.g. 7d, 12h, 3600; default from config)
        #[arg(long, short = 'a', value_parser = parse_duration)]
        older_than: Option<Duration>,
    },

    /// List cache entries, most recently used first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the on-disk filename for a key
    Hash {
        /// Logical cache key
        key: String,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 30m, 12h, 7d, 3600",
        s
    ))
}
