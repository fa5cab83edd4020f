//! Resolved connection details of the backup store.

use crate::constants::REDACTED_PLACEHOLDER;
use std::fmt;

/// Where backups go and which key encrypts them.
///
/// Built once from configuration and shared by every engine and transport
/// invocation.
///
/// # Examples
///
/// ```
/// use doublewrap::engine::Destination;
///
/// let dest = Destination::new("backup.example.org", "33EA05F1")
///     .with_port(2222)
///     .with_user("alice")
///     .with_root("backups/laptop");
///
/// assert_eq!(dest.url(), "rsync://backup.example.org:2222/backups/laptop");
/// assert_eq!(dest.ssh_target(), "alice@backup.example.org");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Destination {
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub root: String,
    pub key_id: String,
}

impl Destination {
    pub fn new(host: impl Into<String>, key_id: impl Into<String>) -> Self {
        Self {
            protocol: crate::constants::DEFAULT_PROTOCOL.to_string(),
            host: host.into(),
            port: None,
            user: None,
            root: String::new(),
            key_id: key_id.into(),
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Destination URI handed to the backup engine.
    pub fn url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}/{}", self.protocol, self.host, port, self.root),
            None => format!("{}://{}/{}", self.protocol, self.host, self.root),
        }
    }

    /// `[user@]host` as the transport expects it.
    pub fn ssh_target(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// Splits the backup root into its parent and leaf directory.
    ///
    /// Returns `None` for an empty root, which needs no remote directory.
    /// Trailing separators are ignored.
    ///
    /// ```
    /// use doublewrap::engine::Destination;
    ///
    /// let dest = Destination::new("host", "key").with_root("backups/laptop/");
    /// assert_eq!(
    ///     dest.root_components(),
    ///     Some(("backups".to_string(), "laptop".to_string()))
    /// );
    ///
    /// let dest = Destination::new("host", "key").with_root("laptop");
    /// assert_eq!(dest.root_components(), Some((String::new(), "laptop".to_string())));
    /// ```
    pub fn root_components(&self) -> Option<(String, String)> {
        let root = self.root.trim_end_matches('/');
        if root.is_empty() {
            return None;
        }
        match root.rfind('/') {
            Some(0) => Some(("/".to_string(), root[1..].to_string())),
            Some(idx) => Some((root[..idx].to_string(), root[idx + 1..].to_string())),
            None => Some((String::new(), root.to_string())),
        }
    }

    /// The root as a listing argument, `None` meaning the login directory.
    pub fn root_dir(&self) -> Option<&str> {
        if self.root.is_empty() {
            None
        } else {
            Some(&self.root)
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("protocol", &self.protocol)
            .field("host", &REDACTED_PLACEHOLDER)
            .field("port", &self.port)
            .field("user", &self.user.as_ref().map(|_| REDACTED_PLACEHOLDER))
            .field("root", &self.root)
            .field("key_id", &REDACTED_PLACEHOLDER)
            .finish()
    }
}
