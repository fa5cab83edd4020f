//! Constants used throughout the application.
//!
//! This module contains all constants used in doublewrap, organized into
//! logical groups. Having constants centralized makes them easier to find,
//! modify, and reference consistently.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "doublewrap";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "Wrapper for duplicity";

// CLI Arguments & Defaults
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Highest verbosity accepted by `-v` (and by the backup engine).
pub const MAX_VERBOSITY: u8 = 9;

// Configuration Keys & Environment Variables
/// Environment variable overriding the configuration file location.
pub const ENV_VAR_CONFIG: &str = "DOUBLEWRAP_CONFIG";
/// Environment variable supplying the passphrase non-interactively.
pub const ENV_VAR_PASSPHRASE: &str = "DOUBLEWRAP_PASSPHRASE";
/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/doublewrap.toml";
/// Default URL scheme of the backup destination.
pub const DEFAULT_PROTOCOL: &str = "rsync";
/// Default backup engine program.
pub const DEFAULT_ENGINE_PROGRAM: &str = "duplicity";
/// Default transport program.
pub const DEFAULT_TRANSPORT_PROGRAM: &str = "ssh";
/// Default version-control program.
pub const DEFAULT_GIT_PROGRAM: &str = "git";
/// Placeholder string for redacted information in debug output.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

// Backup Engine Contract
/// Variable through which the engine reads the encryption passphrase.
pub const ENGINE_PASSPHRASE_VAR: &str = "PASSPHRASE";
/// Substring that marks a remote directory as holding a backup chain.
pub const FULL_SIGNATURES_MARKER: &str = "duplicity-full-signatures";
/// Leading status token of a full snapshot line.
pub const STATUS_TOKEN_FULL: &str = "Full";
/// Leading status token of an incremental snapshot line.
pub const STATUS_TOKEN_INCREMENTAL: &str = "Incremental";
/// Layout of the date columns in collection-status output.
pub const STATUS_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";
/// Exit status with which ssh reports its own connection failures.
pub const TRANSPORT_FAILURE_EXIT_CODE: i32 = 255;

// History Reconstruction
/// Committer name and email of reconstructed history.
pub const HISTORY_COMMITTER: &str = "autorecovery";
/// `ctime(3)` layout used in reconstructed commit messages.
pub const COMMIT_TIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

// Logging Configuration
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";
