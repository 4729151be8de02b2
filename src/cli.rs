use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::export::ExportOptions;

#[derive(Parser, Debug)]
#[command(name = "zipdrop")]
#[command(version)]
#[command(about = "Package files into a ZIP archive, falling back to individual copies", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipdrop frame_*.png info.txt -o frames.zip     pack files into ./frames.zip\n  \
  zipdrop -d out --store *.png                   pack without compression into out/\n  \
  zipdrop -l frames.zip                          list the contents of an archive")]
pub struct Cli {
    /// Files to package
    #[arg(value_name = "FILES", required_unless_present = "list")]
    pub files: Vec<PathBuf>,

    /// Archive name
    #[arg(short = 'o', value_name = "NAME", default_value = "export.zip")]
    pub output: String,

    /// Directory the archive (or the individual files) is written to
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Store files without compression
    #[arg(long)]
    pub store: bool,

    /// Ask before copying more than this many files individually
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub threshold: usize,

    /// Pause between individual copies, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 300)]
    pub delay_ms: u64,

    /// Answer yes to every prompt
    #[arg(short = 'y')]
    pub yes: bool,

    /// Overwrite existing files
    #[arg(short = 'f')]
    pub force: bool,

    /// List the contents of an existing archive instead
    #[arg(short = 'l', value_name = "ARCHIVE", conflicts_with = "files")]
    pub list: Option<PathBuf>,

    /// More log output
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Less log output
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions::default()
            .confirm_threshold(self.threshold)
            .pacing_delay(Duration::from_millis(self.delay_ms))
    }

    /// Default tracing filter directive for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
