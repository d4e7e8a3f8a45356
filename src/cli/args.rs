//! CLI argument structures

use crate::config::EngineConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fold per-job annotation masks into per-location consensus masks
#[derive(Parser, Debug)]
#[command(name = "mask-consensus")]
#[command(about = "mask-consensus - Majority-vote consensus over annotation job masks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML configuration file
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding one sub-directory of job archives per location
    #[arg(long, value_name = "DIR", global = true)]
    pub source_root: Option<PathBuf>,

    /// Directory receiving consensus masks (defaults to the source root)
    #[arg(long, value_name = "DIR", global = true)]
    pub output_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fold the job masks of one location and date into its consensus mask
    Combine {
        /// Location id
        #[arg(short, long)]
        location: String,

        /// Acquisition date, as it appears in archive names
        #[arg(short, long)]
        date: String,

        /// Class to record even without votes (repeatable)
        #[arg(long = "class", value_name = "CLASS")]
        classes: Vec<String>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Combine every row of a `loc_id,date,classes` CSV table, in order
    Batch {
        /// CSV table to drive
        table: PathBuf,

        /// Data rows to skip before the first combine
        #[arg(long, default_value_t = 0, value_name = "N")]
        skip_rows: usize,
    },
    /// Render one class of a consensus mask as a PGM image
    View {
        /// Location id
        #[arg(short, long)]
        location: String,

        /// Class to render
        #[arg(long)]
        class: String,

        /// Output image file
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// Render undefined pixels in a third, middle gray tone
        #[arg(long)]
        shade_undefined: bool,
    },
    /// Report how consistently classes partition a consensus mask
    Performance {
        /// Location id
        #[arg(short, long)]
        location: String,

        /// Print the metric as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Configuration file and environment, then command-line overrides
    pub fn engine_config(&self) -> crate::error::Result<EngineConfig> {
        let mut config = EngineConfig::load(self.config.as_deref())?;
        if let Some(root) = &self.source_root {
            config.source_root = root.clone();
        }
        if let Some(root) = &self.output_root {
            config.output_root = Some(root.clone());
        }
        config.validate()?;
        Ok(config)
    }
}
