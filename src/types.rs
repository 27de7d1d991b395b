//! Defines core value types: commit ids and invocation specs.
use super::Error;
use once_cell::sync::Lazy;
use regex::Regex;
#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use std::{
    ffi::OsStr,
    fmt,
    fmt::{Display, Formatter},
    result::Result as stdResult,
};

/// A specialized `Result` type for git operations.
pub type Result<A> = stdResult<A, Error>;

/// Budget for ordinary invocations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Budget for networked invocations (clone, fetch, push).
pub const EXTENDED_TIMEOUT: Duration = Duration::from_secs(10 * 60);

static SHA1_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[0-9a-f]{40}$").expect("Invalid static sha1 regex"));

/// A full 40-character object id exactly as git printed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha1 {
    pub(crate) value: String,
}

impl Sha1 {
    /// Returns true if `value` is a full lowercase 40-hex object id.
    pub fn is_valid(value: &str) -> bool {
        SHA1_REGEX.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl FromStr for Sha1 {
    type Err = String;

    /// Parses an object id, returning the rejected text on failure.
    fn from_str(value: &str) -> stdResult<Self, Self::Err> {
        if Sha1::is_valid(value) {
            Ok(Sha1 {
                value: value.to_owned(),
            })
        } else {
            Err(value.to_owned())
        }
    }
}

impl Display for Sha1 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl AsRef<str> for Sha1 {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl AsRef<OsStr> for Sha1 {
    fn as_ref(&self) -> &OsStr {
        self.value.as_ref()
    }
}

impl PartialEq<&str> for Sha1 {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

#[cfg(feature = "serde")]
impl Serialize for Sha1 {
    fn serialize<S>(&self, serializer: S) -> stdResult<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Sha1 {
    /// Deserializes a string into a `Sha1`, validating the format.
    fn deserialize<D>(deserializer: D) -> stdResult<Sha1, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha1::from_str(&s).map_err(|bad| de::Error::custom(format!("invalid sha1: {bad}")))
    }
}

/// One invocation of git: what to run, where, and how long to wait.
///
/// Built once and never mutated while running. Standard output streaming is
/// chosen at call time with [`crate::runner::GitRunner::run_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    args: Vec<String>,
    working_directory: PathBuf,
    allowed_exit_codes: Vec<i32>,
    timeout: Duration,
    input: Option<String>,
}

impl CommandSpec {
    /// A spec with no extra allowed exit codes, no stdin and [`DEFAULT_TIMEOUT`].
    pub fn new<P, I, S>(working_directory: P, args: I) -> CommandSpec
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec {
            args: args.into_iter().map(Into::into).collect(),
            working_directory: working_directory.as_ref().to_path_buf(),
            allowed_exit_codes: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            input: None,
        }
    }

    /// Treats `code` as success in addition to 0.
    pub fn allow_exit_code(mut self, code: i32) -> CommandSpec {
        if !self.allowed_exit_codes.contains(&code) {
            self.allowed_exit_codes.push(code);
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> CommandSpec {
        self.timeout = timeout;
        self
    }

    /// Text written to the child's standard input.
    pub fn input(mut self, input: impl Into<String>) -> CommandSpec {
        self.input = Some(input.into());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The repository path; mutating calls against the same path must be serialized by the caller.
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn allowed_exit_codes(&self) -> &[i32] {
        &self.allowed_exit_codes
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Returns true if an exit code counts as success for this spec.
    pub fn is_allowed(&self, code: i32) -> bool {
        code == 0 || self.allowed_exit_codes.contains(&code)
    }

    /// A sibling spec against the same directory, keeping the timeout.
    pub(crate) fn sibling<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(&self.working_directory, args).timeout(self.timeout)
    }
}

// --- Tests ---
