//! Configuration management for the doublewrap application.
//!
//! Settings come from a TOML file. Its location is, in order of precedence,
//! the `-c/--config` flag, the `DOUBLEWRAP_CONFIG` environment variable, and
//! `~/.config/doublewrap.toml`. Include paths and the file location itself
//! are expanded with `shellexpand` (`~` and `$VAR`).
//!
//! ```toml
//! [paths]
//! include = ["~/Documents", "/etc/nginx"]
//!
//! [destination]
//! host = "backup.example.org"
//! port = 2222
//! user = "alice"
//! backup_root = "backups/laptop"
//!
//! [auth]
//! keyid = "33EA05F1"
//! prompt_for_passphrase = true
//! ```

use crate::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_ENGINE_PROGRAM, DEFAULT_GIT_PROGRAM, DEFAULT_PROTOCOL,
    DEFAULT_TRANSPORT_PROGRAM, ENV_VAR_CONFIG, REDACTED_PLACEHOLDER,
};
use crate::engine::Destination;
use crate::errors::{AppError, AppResult};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration for the doublewrap application.
///
/// # Examples
///
/// ```
/// use doublewrap::Config;
///
/// let config = Config::from_toml(r#"
///     [paths]
///     include = ["/etc/nginx"]
///
///     [destination]
///     host = "backup.example.org"
///     backup_root = "backups/laptop"
///
///     [auth]
///     keyid = "33EA05F1"
/// "#).unwrap();
///
/// assert_eq!(config.include, vec!["/etc/nginx".to_string()]);
/// assert_eq!(config.to_destination().url(), "rsync://backup.example.org/backups/laptop");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Local paths to back up, already expanded.
    pub include: Vec<String>,
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Directory on the host that holds the backup chain.
    pub backup_root: String,
    pub protocol: String,
    /// Key used to encrypt and sign.
    pub key_id: String,
    pub prompt_for_passphrase: bool,
    pub tools: Tools,
}

/// Program names of the external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tools {
    #[serde(default = "default_duplicity")]
    pub duplicity: String,
    #[serde(default = "default_ssh")]
    pub ssh: String,
    #[serde(default = "default_git")]
    pub git: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            duplicity: default_duplicity(),
            ssh: default_ssh(),
            git: default_git(),
        }
    }
}

fn default_duplicity() -> String {
    DEFAULT_ENGINE_PROGRAM.to_string()
}

fn default_ssh() -> String {
    DEFAULT_TRANSPORT_PROGRAM.to_string()
}

fn default_git() -> String {
    DEFAULT_GIT_PROGRAM.to_string()
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    paths: RawPaths,
    destination: RawDestination,
    auth: RawAuth,
    #[serde(default)]
    tools: Tools,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPaths {
    include: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDestination {
    host: String,
    port: Option<u16>,
    user: Option<String>,
    #[serde(default)]
    backup_root: String,
    #[serde(default = "default_protocol")]
    protocol: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAuth {
    keyid: String,
    #[serde(default)]
    prompt_for_passphrase: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("include", &self.include)
            .field("host", &REDACTED_PLACEHOLDER)
            .field("port", &self.port)
            .field("user", &self.user.as_ref().map(|_| REDACTED_PLACEHOLDER))
            .field("backup_root", &self.backup_root)
            .field("protocol", &self.protocol)
            .field("key_id", &REDACTED_PLACEHOLDER)
            .field("prompt_for_passphrase", &self.prompt_for_passphrase)
            .field("tools", &self.tools)
            .finish()
    }
}

impl Config {
    /// Picks the configuration file: `explicit`, then `DOUBLEWRAP_CONFIG`,
    /// then the default location.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the path cannot be expanded.
    pub fn resolve_path(explicit: Option<&Path>) -> AppResult<PathBuf> {
        let raw = match explicit {
            Some(path) => path.to_string_lossy().into_owned(),
            None => std::env::var(ENV_VAR_CONFIG).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        };
        Ok(PathBuf::from(expand(&raw)?))
    }

    /// Loads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file is missing or unreadable, is not
    /// valid TOML, lacks a required key, or fails validation.
    pub fn load(path: &Path) -> AppResult<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;

        for source in &config.include {
            if !Path::new(source).exists() {
                warn!("{} does not exist", source);
            }
        }
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Invalid config file: {}", e)))?;

        let include = raw
            .paths
            .include
            .iter()
            .map(|path| expand(path))
            .collect::<AppResult<Vec<_>>>()?;

        let config = Config {
            include,
            host: raw.destination.host,
            port: raw.destination.port,
            user: raw.destination.user,
            backup_root: raw.destination.backup_root,
            protocol: raw.destination.protocol,
            key_id: raw.auth.keyid,
            prompt_for_passphrase: raw.auth.prompt_for_passphrase,
            tools: raw.tools,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the values that TOML typing alone cannot.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first offending setting.
    pub fn validate(&self) -> AppResult<()> {
        if self.include.is_empty() || self.include.iter().any(|p| p.trim().is_empty()) {
            return Err(AppError::Config(
                "[paths] include must list at least one non-empty path".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(AppError::Config("[destination] host is empty".to_string()));
        }
        if self.key_id.trim().is_empty() {
            return Err(AppError::Config("[auth] keyid is empty".to_string()));
        }
        if self.protocol.trim().is_empty() {
            return Err(AppError::Config("[destination] protocol is empty".to_string()));
        }
        for (name, program) in [
            ("duplicity", &self.tools.duplicity),
            ("ssh", &self.tools.ssh),
            ("git", &self.tools.git),
        ] {
            if program.trim().is_empty() {
                return Err(AppError::Config(format!("[tools] {} is empty", name)));
            }
        }
        Ok(())
    }

    /// The backup destination these settings describe.
    pub fn to_destination(&self) -> Destination {
        let mut dest = Destination::new(self.host.as_str(), self.key_id.as_str())
            .with_protocol(self.protocol.as_str())
            .with_root(self.backup_root.as_str());
        if let Some(port) = self.port {
            dest = dest.with_port(port);
        }
        if let Some(user) = &self.user {
            dest = dest.with_user(user.as_str());
        }
        dest
    }
}

fn expand(raw: &str) -> AppResult<String> {
    shellexpand::full(raw)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| AppError::Config(format!("Failed to expand path '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
        [paths]
        include = ["/etc/nginx"]

        [destination]
        host = "backup.example.org"

        [auth]
        keyid = "33EA05F1"
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();

        assert_eq!(config.port, None);
        assert_eq!(config.user, None);
        assert_eq!(config.backup_root, "");
        assert_eq!(config.protocol, "rsync");
        assert!(!config.prompt_for_passphrase);
        assert_eq!(config.tools, Tools::default());
        assert_eq!(config.to_destination().root_components(), None);
    }

    #[test]
    fn test_full_config_to_destination() {
        let config = Config::from_toml(
            r#"
            [paths]
            include = ["/etc/nginx", "/var/www"]

            [destination]
            host = "nas"
            port = 2222
            user = "alice"
            backup_root = "/srv/backups/"
            protocol = "sftp"

            [auth]
            keyid = "DEADBEEF"
            prompt_for_passphrase = true

            [tools]
            ssh = "/usr/local/bin/ssh"
        "#,
        )
        .unwrap();

        let dest = config.to_destination();
        assert_eq!(dest.url(), "sftp://nas:2222//srv/backups/");
        assert_eq!(dest.ssh_target(), "alice@nas");
        assert_eq!(
            dest.root_components(),
            Some(("/srv".to_string(), "backups".to_string()))
        );
        assert!(config.prompt_for_passphrase);
        assert_eq!(config.tools.ssh, "/usr/local/bin/ssh");
        assert_eq!(config.tools.duplicity, "duplicity");
    }

    #[test]
    #[serial]
    fn test_include_paths_are_expanded() {
        env::set_var("DOUBLEWRAP_TEST_DATA", "/data");
        let config = Config::from_toml(&MINIMAL.replace("/etc/nginx", "$DOUBLEWRAP_TEST_DATA/docs"));
        env::remove_var("DOUBLEWRAP_TEST_DATA");

        assert_eq!(config.unwrap().include, vec!["/data/docs".to_string()]);
    }

    #[test]
    fn test_missing_required_keys() {
        for (needle, replacement) in [
            ("keyid = \"33EA05F1\"", ""),
            ("host = \"backup.example.org\"", ""),
            ("include = [\"/etc/nginx\"]", ""),
        ] {
            let result = Config::from_toml(&MINIMAL.replace(needle, replacement));
            assert!(
                matches!(result, Err(AppError::Config(_))),
                "removing {} should fail",
                needle
            );
        }
    }

    #[test]
    fn test_empty_values_rejected() {
        let cases = [
            ("[\"/etc/nginx\"]", "[]", "include"),
            ("\"backup.example.org\"", "\"\"", "host"),
            ("\"33EA05F1\"", "\" \"", "keyid"),
        ];
        for (needle, replacement, expected) in cases {
            match Config::from_toml(&MINIMAL.replace(needle, replacement)) {
                Err(AppError::Config(message)) => assert!(message.contains(expected), "{}", message),
                other => panic!("Expected Config error for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Config::from_toml(&MINIMAL.replace("[auth]", "[auth]\npasphrase = \"x\""));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        match Config::from_toml("[paths\ninclude = ") {
            Err(AppError::Config(message)) => assert!(message.starts_with("Invalid config file")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        match Config::load(&dir.path().join("absent.toml")) {
            Err(AppError::Config(message)) => assert!(message.contains("absent.toml")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_keeps_missing_sources() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doublewrap.toml");
        fs::write(&path, MINIMAL.replace("/etc/nginx", "/nonexistent/doublewrap/source")).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.include, vec!["/nonexistent/doublewrap/source".to_string()]);
    }

    #[test]
    #[serial]
    fn test_resolve_path_precedence() {
        env::set_var(ENV_VAR_CONFIG, "/tmp/from-env.toml");
        let from_flag = Config::resolve_path(Some(Path::new("/tmp/from-flag.toml"))).unwrap();
        let from_env = Config::resolve_path(None).unwrap();
        env::remove_var(ENV_VAR_CONFIG);

        assert_eq!(from_flag, PathBuf::from("/tmp/from-flag.toml"));
        assert_eq!(from_env, PathBuf::from("/tmp/from-env.toml"));

        let default = Config::resolve_path(None).unwrap();
        assert!(default.ends_with(".config/doublewrap.toml"));
        assert!(!default.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_debug_redacts_sensitive_fields() {
        let config = Config::from_toml(&MINIMAL.replace(
            "host = \"backup.example.org\"",
            "host = \"backup.example.org\"\nuser = \"alice\"",
        ))
        .unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("backup.example.org"));
        assert!(!debug.contains("alice"));
        assert!(!debug.contains("33EA05F1"));
        assert!(debug.contains(REDACTED_PLACEHOLDER));
    }
}
