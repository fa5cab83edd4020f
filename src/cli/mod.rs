use crate::constants::{APP_DESCRIPTION, APP_NAME, LOG_FORMAT_JSON, LOG_FORMAT_TEXT, MAX_VERBOSITY};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

/// Wrapper for duplicity
#[derive(Parser, Debug)]
#[command(name = APP_NAME, about = APP_DESCRIPTION)]
#[command(author, version, long_about = None)]
pub struct CliArgs {
    /// Config file location
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Between 0 (no output) and 9 (full output); also passed to duplicity
    #[arg(
        short = 'v',
        long = "verbosity",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=MAX_VERBOSITY as i64)
    )]
    pub verbosity: u8,

    /// Log output format
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        default_value = LOG_FORMAT_TEXT,
        value_parser = [LOG_FORMAT_TEXT, LOG_FORMAT_JSON]
    )]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run backup
    Backup {
        /// Extra arguments for duplicity, given after `--`
        #[arg(last = true, value_name = "EXTRA_ARGS")]
        extra_args: Vec<String>,
    },

    /// List backed up files
    List,

    /// Restore file(s)
    Restore {
        /// Path to restore, as listed by `list`; the whole backup when omitted
        #[arg(short = 'f', long = "file")]
        file: Option<String>,

        /// Point in time to restore, in any format duplicity accepts
        #[arg(short = 't', long = "time")]
        time: Option<String>,

        /// Where the restored data is written
        target: PathBuf,
    },

    /// Compare the backup with the local files
    Verify,

    /// Show the backup chain status
    Status,

    /// Restore all backed up versions of a file to a git repository
    Gitrestore {
        /// Backed-up path whose history is wanted
        file_to_restore: String,

        /// Directory that must not exist or be empty
        git_directory: PathBuf,

        /// Name of the restored file inside the repository
        target: PathBuf,
    },
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Log level for the chosen verbosity.
    ///
    /// 0-1 shows errors, 2-3 adds warnings, 4-8 adds progress and 9 shows
    /// everything including each line the external programs print.
    pub fn log_level(&self) -> Level {
        match self.verbosity {
            0..=1 => Level::ERROR,
            2..=3 => Level::WARN,
            4..=8 => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == LOG_FORMAT_JSON
    }
}
