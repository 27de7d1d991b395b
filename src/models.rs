//! Provides structured types representing repository state.
//!
//! Every value here is rebuilt from a fresh git invocation; nothing is cached
//! and two values describing the same commit are simply equal, not shared.

use crate::types::Sha1;
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;

/// The format git uses for `--date=default`, e.g. `Thu Oct 15 10:00:00 2026 +0200`.
const DEFAULT_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y %z";

/// Added/deleted line counts for one path of a commit.
///
/// Binary files report `-` for both counts, kept here as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct FileLineDiff {
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub path: String,
}

/// Numeric sums over a commit's [`FileLineDiff`]s; binary entries count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct LineTotals {
    pub additions: u64,
    pub deletions: u64,
}

/// Represents one entry of the history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Commit {
    pub sha1: Sha1,
    /// Parent ids in reported order; the first is the mainline parent.
    pub parents: Vec<Sha1>,
    /// Decorations verbatim, e.g. `refs/heads/master` or `tag: refs/tags/v1.0`.
    pub refs: Vec<String>,
    /// Whether `HEAD` points at this commit.
    pub is_head: bool,
    pub author_name: String,
    pub author_email: String,
    pub author_date: String,
    pub committer_name: String,
    pub committer_email: String,
    pub commit_date: String,
    /// Reflog selector name (e.g. `refs/stash`), only when walking a reflog.
    pub reflog_name: Option<String>,
    /// The selector index between braces, e.g. `0` for `refs/stash@{0}`.
    pub reflog_id: Option<String>,
    pub reflog_author_name: Option<String>,
    pub reflog_author_email: Option<String>,
    pub message: String,
    /// Per-file stats; when present the first row is the synthesized `Total`.
    pub file_line_diffs: Vec<FileLineDiff>,
    pub total_diff: LineTotals,
}

impl Commit {
    /// The author date as a timestamp, if git printed it in the default format.
    pub fn author_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(&self.author_date, DEFAULT_DATE_FORMAT).ok()
    }

    /// The committer date as a timestamp, if git printed it in the default format.
    pub fn commit_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(&self.commit_date, DEFAULT_DATE_FORMAT).ok()
    }

    /// The first line of the message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Coarse content type of a path, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FileType {
    Image,
    Text,
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

impl FileType {
    pub fn from_path(path: &str) -> FileType {
        let extension = path
            .rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty() && !stem.ends_with('/'))
            .map(|(_, ext)| ext);
        match extension {
            Some(ext) if IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) => {
                FileType::Image
            }
            _ => FileType::Text,
        }
    }
}

/// Represents one path reported by the short status format.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct FileStatusEntry {
    pub file_name: String,
    /// Equal to `file_name` unless renamed.
    pub old_file_name: String,
    /// `old → new` for renames, otherwise the path.
    pub display_name: String,
    pub is_new: bool,
    pub staged: bool,
    pub removed: bool,
    pub conflict: bool,
    pub renamed: bool,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub file_type: FileType,
}

/// Represents the result of a status query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct RepositoryStatus {
    pub branch: String,
    /// Keyed by current path; one entry per path.
    pub files: BTreeMap<String, FileStatusEntry>,
    pub in_rebase: bool,
    pub in_merge: bool,
    pub in_conflict: bool,
    /// The prepared merge message while a merge is in progress.
    pub commit_message: Option<String>,
}

/// Represents a local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Branch {
    pub name: String,
    /// Whether the branch is checked out.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "std::ops::Not::not"))]
    pub current: bool,
}

/// Represents one ref advertised by a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct LsRemoteEntry {
    pub sha1: Sha1,
    pub name: String,
}

/// Represents a submodule declared in `.gitmodules`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Submodule {
    pub name: String,
    pub path: String,
    /// An http(s) form of the url, suitable for display.
    pub url: String,
    /// The url as written in the file.
    pub raw_url: String,
}

/// How far `git reset` rewinds: refs only, refs and index, or everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ResetMode {
    Soft,
    #[default]
    Mixed,
    Hard,
    Merge,
    Keep,
}

impl ResetMode {
    /// The command-line flag, e.g. `--hard`.
    pub fn as_flag(&self) -> &'static str {
        match self {
            ResetMode::Soft => "--soft",
            ResetMode::Mixed => "--mixed",
            ResetMode::Hard => "--hard",
            ResetMode::Merge => "--merge",
            ResetMode::Keep => "--keep",
        }
    }
}

/// Represents a stash entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Stash {
    /// Position in the stash list, newest first.
    pub index: usize,
    /// The selector, e.g. `stash@{0}`.
    pub name: String,
    pub title: String,
    pub sha1: Sha1,
    pub date: String,
    pub file_line_diffs: Vec<FileLineDiff>,
}

impl Stash {
    pub(crate) fn from_commit(index: usize, commit: Commit) -> Stash {
        let name = match (&commit.reflog_name, &commit.reflog_id) {
            (Some(name), Some(id)) => {
                format!("{}@{{{}}}", name.strip_prefix("refs/").unwrap_or(name), id)
            }
            _ => format!("stash@{{{}}}", index),
        };
        Stash {
            index,
            name,
            title: commit.message,
            sha1: commit.sha1,
            date: commit.commit_date,
            file_line_diffs: commit.file_line_diffs,
        }
    }
}
