//! Runtime settings passed explicitly into a [`crate::Repository`].
use crate::types::{DEFAULT_TIMEOUT, EXTENDED_TIMEOUT};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How git is located and invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct Config {
    /// The git executable; resolved through `PATH` when not absolute.
    pub git_binary: PathBuf,
    pub default_timeout: Duration,
    /// Used for clone, fetch and push.
    pub extended_timeout: Duration,
    /// Wrap working-tree mutations in stash / operate / un-stash.
    pub auto_stash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            git_binary: PathBuf::from("git"),
            default_timeout: DEFAULT_TIMEOUT,
            extended_timeout: EXTENDED_TIMEOUT,
            auto_stash: true,
        }
    }
}

impl Config {
    pub fn with_git_binary<P: AsRef<Path>>(mut self, git_binary: P) -> Config {
        self.git_binary = git_binary.as_ref().to_path_buf();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Config {
        self.default_timeout = timeout;
        self
    }

    pub fn with_extended_timeout(mut self, timeout: Duration) -> Config {
        self.extended_timeout = timeout;
        self
    }

    pub fn with_auto_stash(mut self, auto_stash: bool) -> Config {
        self.auto_stash = auto_stash;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.git_binary, PathBuf::from("git"));
        assert_eq!(config.default_timeout, Duration::from_secs(120));
        assert!(config.extended_timeout > config.default_timeout);
        assert!(config.auto_stash);
    }

    #[test]
    fn builder_overrides() {
        let config = Config::default()
            .with_git_binary("/usr/local/bin/git")
            .with_default_timeout(Duration::from_secs(1))
            .with_extended_timeout(Duration::from_secs(2))
            .with_auto_stash(false);
        assert_eq!(config.git_binary, PathBuf::from("/usr/local/bin/git"));
        assert_eq!(config.default_timeout, Duration::from_secs(1));
        assert_eq!(config.extended_timeout, Duration::from_secs(2));
        assert!(!config.auto_stash);
    }
}
