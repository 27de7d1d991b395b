//! Reduces git's free-form diagnostics to an [`ErrorKind`].
//!
//! The rules form an ordered table and the first match wins, so more specific
//! diagnostics must stay above the ones they overlap with.
use crate::error::ErrorKind;

/// A literal test against the captured output of a failed invocation.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// stderr contains the text anywhere.
    Contains(&'static str),
    /// stderr begins with the text.
    StartsWith(&'static str),
    /// stdout contains the text anywhere.
    StdoutContains(&'static str),
    /// Every inner pattern matches.
    All(&'static [Pattern]),
}

impl Pattern {
    fn matches(&self, stderr: &str, stdout: &str) -> bool {
        match self {
            Pattern::Contains(text) => stderr.contains(text),
            Pattern::StartsWith(text) => stderr.starts_with(text),
            Pattern::StdoutContains(text) => stdout.contains(text),
            Pattern::All(inner) => inner.iter().all(|p| p.matches(stderr, stdout)),
        }
    }
}

use Pattern::{All, Contains, StartsWith, StdoutContains};

/// A kind is selected when any of its patterns match.
const RULES: &[(ErrorKind, &[Pattern])] = &[
    (
        ErrorKind::NotARepository,
        &[Contains("Not a git repository"), Contains("not a git repository")],
    ),
    (ErrorKind::RemoteTimeout, &[Contains("Connection timed out")]),
    (
        ErrorKind::PermissionDeniedPublickey,
        &[Contains("Permission denied (publickey)")],
    ),
    (
        ErrorKind::SshBadFileNumber,
        &[All(&[Contains("ssh: connect to host"), Contains("Bad file number")])],
    ),
    (
        ErrorKind::NoRemoteConfigured,
        &[Contains("No remote configured to list refs from.")],
    ),
    (
        ErrorKind::Offline,
        &[
            All(&[Contains("unable to access"), Contains("Could not resolve host:")]),
            Contains("Could not resolve hostname"),
        ],
    ),
    (
        ErrorKind::ProxyAuthenticationRequired,
        &[Contains("Proxy Authentication Required")],
    ),
    (
        ErrorKind::NoGitNameEmailConfigured,
        &[Contains("Please tell me who you are")],
    ),
    (
        ErrorKind::NoSupportedAuthenticationProvided,
        &[StartsWith(
            "FATAL ERROR: Disconnected: No supported authentication methods available",
        )],
    ),
    (
        ErrorKind::NoRemoteSpecified,
        &[StartsWith("fatal: No remote repository specified.")],
    ),
    (ErrorKind::NonFastForward, &[Contains("non-fast-forward")]),
    (
        ErrorKind::MergeFailed,
        &[
            StartsWith("Failed to merge in the changes."),
            StdoutContains("CONFLICT (content): Merge conflict in"),
            Contains("after resolving the conflicts"),
        ],
    ),
    (
        ErrorKind::MustBeInWorkingTree,
        &[Contains("This operation must be run in a work tree")],
    ),
    (
        ErrorKind::LocalChangesWouldBeOverwritten,
        &[Contains(
            "Your local changes to the following files would be overwritten by checkout",
        )],
    ),
];

/// Classifies a diagnostic printed on standard error.
///
/// ```
/// use gitscope::classify::classify;
/// use gitscope::ErrorKind;
///
/// assert_eq!(classify("fatal: Not a git repository"), ErrorKind::NotARepository);
/// assert_eq!(classify("unrelated text"), ErrorKind::Unknown);
/// ```
pub fn classify(stderr: &str) -> ErrorKind {
    classify_output(stderr, "")
}

/// Classifies a failed invocation from both of its output streams.
///
/// Only the merge-conflict rule consults stdout, where git reports `CONFLICT` lines.
pub fn classify_output(stderr: &str, stdout: &str) -> ErrorKind {
    RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| p.matches(stderr, stdout)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}
