//! Defines the error types used throughout the library.
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The closed set of failure kinds a git invocation can be reduced to.
///
/// Produced by [`crate::classify::classify`]; calling code branches on these
/// (retry, surface to the user, ignore) instead of on free-form text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum ErrorKind {
    NotARepository,
    RemoteTimeout,
    PermissionDeniedPublickey,
    SshBadFileNumber,
    NoRemoteConfigured,
    Offline,
    ProxyAuthenticationRequired,
    NoGitNameEmailConfigured,
    NoSupportedAuthenticationProvided,
    NoRemoteSpecified,
    NonFastForward,
    MergeFailed,
    MustBeInWorkingTree,
    LocalChangesWouldBeOverwritten,
    Unknown,
    /// Owned by the routing layer; never produced by this crate.
    PathDoesNotExist,
    /// Owned by the routing layer; never produced by this crate.
    MissingParameter,
}

impl ErrorKind {
    /// The stable kebab-case name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotARepository => "not-a-repository",
            ErrorKind::RemoteTimeout => "remote-timeout",
            ErrorKind::PermissionDeniedPublickey => "permission-denied-publickey",
            ErrorKind::SshBadFileNumber => "ssh-bad-file-number",
            ErrorKind::NoRemoteConfigured => "no-remote-configured",
            ErrorKind::Offline => "offline",
            ErrorKind::ProxyAuthenticationRequired => "proxy-authentication-required",
            ErrorKind::NoGitNameEmailConfigured => "no-git-name-email-configured",
            ErrorKind::NoSupportedAuthenticationProvided => "no-supported-authentication-provided",
            ErrorKind::NoRemoteSpecified => "no-remote-specified",
            ErrorKind::NonFastForward => "non-fast-forward",
            ErrorKind::MergeFailed => "merge-failed",
            ErrorKind::MustBeInWorkingTree => "must-be-in-working-tree",
            ErrorKind::LocalChangesWouldBeOverwritten => "local-changes-would-be-overwritten",
            ErrorKind::Unknown => "unknown",
            ErrorKind::PathDoesNotExist => "path-does-not-exist",
            ErrorKind::MissingParameter => "missing-parameter",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A git invocation that ran to completion but exited with a disallowed code.
#[derive(Debug, Clone, Error)]
#[error("git {} failed in {} ({kind}): {raw_message}", .command.join(" "), .working_directory.display())]
pub struct GitError {
    pub kind: ErrorKind,
    /// The argument list passed to git (without the binary itself).
    pub command: Vec<String>,
    pub working_directory: PathBuf,
    /// The diagnostic text the kind was derived from.
    pub raw_message: String,
    pub stdout: String,
    pub stderr: String,
}

impl GitError {
    /// Builds an error from captured output, running the classifier to completion.
    pub fn from_output(
        command: Vec<String>,
        working_directory: PathBuf,
        stdout: String,
        stderr: String,
    ) -> GitError {
        let kind = crate::classify::classify_output(&stderr, &stdout);
        let raw_message = if stderr.trim().is_empty() {
            stdout.trim_end().to_owned()
        } else {
            stderr.trim_end().to_owned()
        };
        GitError {
            kind,
            command,
            working_directory,
            raw_message,
            stdout,
            stderr,
        }
    }
}

/// The tool's output did not match the grammar a parser expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{parser} parser: {reason} at line {line_number}: {line:?}")]
pub struct ParseError {
    /// Which parser rejected the input (e.g. `"log"`, `"status"`).
    pub parser: &'static str,
    /// 1-based line number within the parsed text.
    pub line_number: usize,
    pub line: String,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(
        parser: &'static str,
        line_number: usize,
        line: &str,
        reason: impl Into<String>,
    ) -> ParseError {
        ParseError {
            parser,
            line_number,
            line: line.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Represents every failure this library can report.
#[derive(Debug, Error)]
pub enum Error {
    /// git ran and reported a failure; see [`GitError::kind`].
    #[error(transparent)]
    Git(#[from] GitError),

    /// git succeeded but its output could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The git executable was not found.
    #[error("'{}' command not found. Please ensure Git is installed and that its executable is included in your system's PATH environment variable.", .0.display())]
    GitNotFound(PathBuf),

    /// Failed to spawn or talk to the git process for another reason.
    #[error("Unable to execute git process: {0}")]
    Execution(#[source] std::io::Error),

    /// The invocation exceeded its wall-clock budget and was killed.
    #[error("git {} timed out after {timeout:?}", .command.join(" "))]
    Timeout {
        command: Vec<String>,
        timeout: Duration,
    },

    /// The standard output of git was not valid UTF-8.
    #[error("Unable to decode output from git executable")]
    Undecodable,
}

impl Error {
    /// The classified kind, when this is a git failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Git(e) => Some(e.kind),
            _ => None,
        }
    }
}
