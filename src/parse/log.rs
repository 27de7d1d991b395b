//! Parser for the decorated, full-format history listing.
//!
//! Input is what `git log --decorate=full --pretty=fuller --parents --numstat`
//! (or `git stash list` with the same options) prints:
//!
//! ```text
//! commit <sha1> [<parent>...] [(<ref>, HEAD -> <ref>, ...)]
//! Author:     Name <email>
//! AuthorDate: Thu Oct 15 10:00:00 2026 +0200
//! Commit:     Name <email>
//! CommitDate: Thu Oct 15 10:00:00 2026 +0200
//!
//!     Subject
//!
//!     Body
//!
//! 3\t1\tpath
//! -\t-\tbinary.png
//! ```
use crate::error::ParseError;
use crate::models::{Commit, FileLineDiff, LineTotals};
use crate::types::Sha1;
use once_cell::sync::Lazy;
use regex::Regex;

const PARSER: &str = "log";

static NUMSTAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+|-)\t(\d+|-)\t(.+)$").expect("Invalid static numstat regex")
});

static IDENTITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^<]+)<([^>]+)>").expect("Invalid static identity regex"));

static REFLOG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)@\{(.*?)\}(?:\s+\((.*)\))?$").expect("Invalid static reflog regex")
});

/// Where the machine is within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectCommitLine,
    ExpectHeader,
    ExpectMessage,
    ExpectFileStats,
}

/// A commit whose message and stats are still being collected.
#[derive(Debug)]
struct PendingCommit {
    sha1: Sha1,
    parents: Vec<Sha1>,
    refs: Vec<String>,
    author_name: String,
    author_email: String,
    author_date: String,
    committer_name: String,
    committer_email: String,
    commit_date: String,
    reflog_name: Option<String>,
    reflog_id: Option<String>,
    reflog_author_name: Option<String>,
    reflog_author_email: Option<String>,
    message_lines: Vec<String>,
    file_line_diffs: Vec<FileLineDiff>,
    has_stats: bool,
}

impl PendingCommit {
    fn new(sha1: Sha1, parents: Vec<Sha1>, refs: Vec<String>) -> PendingCommit {
        PendingCommit {
            sha1,
            parents,
            refs,
            author_name: String::new(),
            author_email: String::new(),
            author_date: String::new(),
            committer_name: String::new(),
            committer_email: String::new(),
            commit_date: String::new(),
            reflog_name: None,
            reflog_id: None,
            reflog_author_name: None,
            reflog_author_email: None,
            message_lines: Vec::new(),
            file_line_diffs: Vec::new(),
            has_stats: false,
        }
    }

    fn finish(self) -> Commit {
        let mut total_diff = LineTotals::default();
        for diff in &self.file_line_diffs {
            total_diff.additions += diff.additions.unwrap_or(0);
            total_diff.deletions += diff.deletions.unwrap_or(0);
        }

        let mut file_line_diffs = self.file_line_diffs;
        if self.has_stats {
            file_line_diffs.insert(
                0,
                FileLineDiff {
                    additions: Some(total_diff.additions),
                    deletions: Some(total_diff.deletions),
                    path: "Total".to_owned(),
                },
            );
        }

        let is_head = self.refs.iter().any(|r| r == "HEAD");
        Commit {
            sha1: self.sha1,
            parents: self.parents,
            refs: self.refs,
            is_head,
            author_name: self.author_name,
            author_email: self.author_email,
            author_date: self.author_date,
            committer_name: self.committer_name,
            committer_email: self.committer_email,
            commit_date: self.commit_date,
            reflog_name: self.reflog_name,
            reflog_id: self.reflog_id,
            reflog_author_name: self.reflog_author_name,
            reflog_author_email: self.reflog_author_email,
            message: self.message_lines.join("\n").trim().to_owned(),
            file_line_diffs,
            total_diff,
        }
    }
}

/// Line-at-a-time state machine; one instance per parse call.
struct LogParser {
    state: State,
    current: Option<PendingCommit>,
    commits: Vec<Commit>,
}

impl LogParser {
    fn new() -> LogParser {
        LogParser {
            state: State::ExpectCommitLine,
            current: None,
            commits: Vec::new(),
        }
    }

    fn feed(&mut self, line_number: usize, line: &str) -> Result<(), ParseError> {
        match self.state {
            State::ExpectCommitLine => {
                if line.trim().is_empty() {
                    return Ok(());
                }
                let ids = commit_line_body(line).ok_or_else(|| {
                    ParseError::new(PARSER, line_number, line, "expected a commit line")
                })?;
                self.current = Some(parse_commit_line(line_number, line, ids)?);
                self.state = State::ExpectHeader;
            }
            State::ExpectHeader => {
                if line.trim().is_empty() {
                    self.state = State::ExpectMessage;
                    return Ok(());
                }
                let commit = self.pending(line_number, line)?;
                parse_header_line(commit, line_number, line)?;
            }
            State::ExpectMessage => {
                if commit_line_body(line).is_some() {
                    return self.start_next(line_number, line);
                }
                if NUMSTAT_REGEX.is_match(line) {
                    self.state = State::ExpectFileStats;
                    return self.feed(line_number, line);
                }
                let commit = self.pending(line_number, line)?;
                commit.message_lines.push(line.trim().to_owned());
            }
            State::ExpectFileStats => {
                if line.trim().is_empty() {
                    return Ok(());
                }
                if commit_line_body(line).is_some() {
                    return self.start_next(line_number, line);
                }
                let diff = parse_numstat_line(line_number, line)?;
                let commit = self.pending(line_number, line)?;
                commit.has_stats = true;
                commit.file_line_diffs.push(diff);
            }
        }
        Ok(())
    }

    fn pending(&mut self, line_number: usize, line: &str) -> Result<&mut PendingCommit, ParseError> {
        self.current
            .as_mut()
            .ok_or_else(|| ParseError::new(PARSER, line_number, line, "no commit in progress"))
    }

    /// Closes the current record and re-reads `line` as the next commit line.
    fn start_next(&mut self, line_number: usize, line: &str) -> Result<(), ParseError> {
        self.flush();
        self.state = State::ExpectCommitLine;
        self.feed(line_number, line)
    }

    fn flush(&mut self) {
        if let Some(commit) = self.current.take() {
            self.commits.push(commit.finish());
        }
    }

    fn finish(mut self) -> Vec<Commit> {
        self.flush();
        self.commits
    }
}

/// Parses history text into commits, in the order git printed them.
pub fn parse_log(text: &str) -> Result<Vec<Commit>, ParseError> {
    let mut parser = LogParser::new();
    for (index, line) in text.lines().enumerate() {
        parser.feed(index + 1, line)?;
    }
    Ok(parser.finish())
}

/// Parses `--numstat -z` output such as `git diff --numstat -z`.
///
/// Paths are printed verbatim (never quoted). A rename record leaves the
/// path empty and is followed by the old and the new path as separate
/// fields; the entry is reported under the new path.
pub fn parse_numstat_z(text: &str) -> Result<Vec<FileLineDiff>, ParseError> {
    let mut diffs = Vec::new();
    let mut fields = text.split('\0').enumerate();

    while let Some((index, record)) = fields.next() {
        let record = record.trim_start_matches('\n');
        if record.is_empty() {
            continue;
        }
        let record_number = index + 1;
        let error = |reason: &str| ParseError::new(PARSER, record_number, record, reason);

        let mut parts = record.splitn(3, '\t');
        let (added, deleted, path) = match (parts.next(), parts.next(), parts.next()) {
            (Some(added), Some(deleted), Some(path)) => (added, deleted, path),
            _ => return Err(error("expected '<added>\\t<deleted>\\t<path>'")),
        };

        let path = if path.is_empty() {
            let _old = fields.next().ok_or_else(|| error("rename record without an old path"))?;
            match fields.next() {
                Some((_, new)) if !new.is_empty() => new,
                _ => return Err(error("rename record without a new path")),
            }
        } else {
            path
        };

        diffs.push(FileLineDiff {
            additions: line_count(added, record_number, record)?,
            deletions: line_count(deleted, record_number, record)?,
            path: path.to_owned(),
        });
    }

    Ok(diffs)
}

/// Returns the part of a record-opening line after the `commit` keyword.
///
/// Bare lines that start with a full id are accepted too; message text is
/// always indented by git, so it never looks like this.
fn commit_line_body(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("commit ") {
        return Some(rest);
    }
    let first = line.split_whitespace().next()?;
    if !line.starts_with(char::is_whitespace) && Sha1::is_valid(first) {
        Some(line)
    } else {
        None
    }
}

fn parse_commit_line(line_number: usize, line: &str, body: &str) -> Result<PendingCommit, ParseError> {
    let (ids, refs) = match body.find('(') {
        Some(start) => {
            let inner = body[start + 1..].trim_end();
            let inner = inner.strip_suffix(')').ok_or_else(|| {
                ParseError::new(PARSER, line_number, line, "unterminated ref list")
            })?;
            (&body[..start], split_refs(inner))
        }
        None => (body, Vec::new()),
    };

    let mut ids = ids.split_whitespace().map(|id| {
        id.parse::<Sha1>().map_err(|bad| {
            ParseError::new(PARSER, line_number, line, format!("invalid object id {bad:?}"))
        })
    });
    let sha1 = ids
        .next()
        .ok_or_else(|| ParseError::new(PARSER, line_number, line, "missing commit id"))??;
    let parents = ids.collect::<Result<Vec<_>, _>>()?;

    Ok(PendingCommit::new(sha1, parents, refs))
}

fn split_refs(inner: &str) -> Vec<String> {
    inner
        .split(", ")
        .flat_map(|part| part.split(" -> "))
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_header_line(commit: &mut PendingCommit, line_number: usize, line: &str) -> Result<(), ParseError> {
    let (label, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::new(PARSER, line_number, line, "expected a header line"))?;
    let value = value.trim();
    match label {
        "Author" => {
            let (name, email) = parse_identity(value);
            commit.author_name = name;
            commit.author_email = email;
        }
        "Commit" => {
            let (name, email) = parse_identity(value);
            commit.committer_name = name;
            commit.committer_email = email;
        }
        "AuthorDate" => commit.author_date = value.to_owned(),
        "CommitDate" => commit.commit_date = value.to_owned(),
        "Reflog" => {
            let captures = REFLOG_REGEX.captures(value).ok_or_else(|| {
                ParseError::new(PARSER, line_number, line, "malformed reflog selector")
            })?;
            commit.reflog_name = Some(captures[1].to_owned());
            commit.reflog_id = Some(captures[2].to_owned());
            if let Some(author) = captures.get(3) {
                let (name, email) = parse_identity(author.as_str());
                commit.reflog_author_name = Some(name);
                commit.reflog_author_email = Some(email);
            }
        }
        // "Merge", "Reflog message" and anything newer carry nothing we keep
        _ => {}
    }
    Ok(())
}

/// Splits `Name <email>`; without an email the raw text becomes the name.
fn parse_identity(value: &str) -> (String, String) {
    match IDENTITY_REGEX.captures(value) {
        Some(captures) => (captures[1].trim().to_owned(), captures[2].to_owned()),
        None => (value.to_owned(), String::new()),
    }
}

fn parse_numstat_line(line_number: usize, line: &str) -> Result<FileLineDiff, ParseError> {
    let captures = NUMSTAT_REGEX
        .captures(line)
        .ok_or_else(|| ParseError::new(PARSER, line_number, line, "expected a numstat line"))?;
    Ok(FileLineDiff {
        additions: line_count(&captures[1], line_number, line)?,
        deletions: line_count(&captures[2], line_number, line)?,
        path: captures[3].to_owned(),
    })
}

/// `-` (binary) is `None`; anything else must be a decimal count.
fn line_count(text: &str, line_number: usize, line: &str) -> Result<Option<u64>, ParseError> {
    if text == "-" {
        return Ok(None);
    }
    text.parse::<u64>()
        .map(Some)
        .map_err(|_| ParseError::new(PARSER, line_number, line, format!("invalid line count: {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "1111111111111111111111111111111111111111";
    const B: &str = "2222222222222222222222222222222222222222";
    const C: &str = "3333333333333333333333333333333333333333";

    fn sample() -> String {
        format!(
            "commit {B} {A} (HEAD -> refs/heads/master, tag: refs/tags/v1.0, refs/remotes/origin/master)\n\
             Author:     Ann Example <ann@example.com>\n\
             AuthorDate: Thu Oct 15 10:00:00 2026 +0200\n\
             Commit:     Bob Example <bob@example.com>\n\
             CommitDate: Thu Oct 15 11:00:00 2026 +0200\n\
             \n\
             \x20   Second commit\n\
             \n\
             \x20   With a body line\n\
             \n\
             3\t1\tfile.txt\n\
             -\t-\timage.png\n\
             10\t0\tsrc/{{old => new}}/lib.rs\n\
             \n\
             commit {A}\n\
             Author:     Ann Example <ann@example.com>\n\
             AuthorDate: Wed Oct 14 10:00:00 2026 +0200\n\
             Commit:     Ann Example <ann@example.com>\n\
             CommitDate: Wed Oct 14 10:00:00 2026 +0200\n\
             \n\
             \x20   Initial commit\n\
             \n\
             1\t0\tfile.txt\n"
        )
    }

    #[test]
    fn test_parse_decorated_log() {
        let commits = parse_log(&sample()).unwrap();
        assert_eq!(commits.len(), 2);

        let second = &commits[0];
        assert_eq!(second.sha1, B);
        assert_eq!(second.parents.len(), 1);
        assert_eq!(second.parents[0], A);
        assert_eq!(
            second.refs,
            vec![
                "HEAD",
                "refs/heads/master",
                "tag: refs/tags/v1.0",
                "refs/remotes/origin/master"
            ]
        );
        assert!(second.is_head);
        assert_eq!(second.author_name, "Ann Example");
        assert_eq!(second.author_email, "ann@example.com");
        assert_eq!(second.committer_name, "Bob Example");
        assert_eq!(second.committer_email, "bob@example.com");
        assert_eq!(second.author_date, "Thu Oct 15 10:00:00 2026 +0200");
        assert_eq!(second.commit_date, "Thu Oct 15 11:00:00 2026 +0200");
        assert_eq!(second.message, "Second commit\n\nWith a body line");

        assert_eq!(second.file_line_diffs.len(), 4);
        assert_eq!(
            second.file_line_diffs[0],
            FileLineDiff {
                additions: Some(13),
                deletions: Some(1),
                path: "Total".into()
            }
        );
        assert_eq!(second.file_line_diffs[2].additions, None);
        assert_eq!(second.file_line_diffs[2].deletions, None);
        assert_eq!(second.file_line_diffs[3].path, "src/{old => new}/lib.rs");
        assert_eq!(second.total_diff, LineTotals { additions: 13, deletions: 1 });

        let first = &commits[1];
        assert_eq!(first.sha1, A);
        assert!(first.parents.is_empty());
        assert!(first.refs.is_empty());
        assert!(!first.is_head);
        assert_eq!(first.message, "Initial commit");
        assert_eq!(first.file_line_diffs[0].path, "Total");
    }

    #[test]
    fn test_two_commit_blob_with_stats_on_second() {
        let text = format!(
            "commit {A}\nAuthor: Ann <ann@example.com>\nAuthorDate: d1\nCommitDate: d1\n\n    first\n\n\
             commit {B} {A}\nAuthor: Ann <ann@example.com>\nAuthorDate: d2\nCommitDate: d2\n\n    second\n\n3\t1\tfile.txt\n"
        );
        let commits = parse_log(&text).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha1, A);
        assert!(commits[0].file_line_diffs.is_empty());
        assert_eq!(commits[0].message, "first");
        assert_eq!(commits[1].parents, vec![A.parse::<Sha1>().unwrap()]);
        assert_eq!(
            commits[1].file_line_diffs[0],
            FileLineDiff {
                additions: Some(3),
                deletions: Some(1),
                path: "Total".into()
            }
        );
        assert_eq!(commits[1].file_line_diffs[1].path, "file.txt");
    }

    #[test]
    fn test_bare_id_lines_open_records() {
        let text = format!(
            "{A}\nAuthor: Ann <a@x>\n\nfirst\n\n{B} {A}\nAuthor: Ann <a@x>\n\nsecond\n\n3\t1\tfile.txt\n"
        );
        let commits = parse_log(&text).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].file_line_diffs[0].additions, Some(3));
    }

    #[test]
    fn test_merge_commit_without_stats() {
        let text = format!(
            "commit {C} {B} {A}\nMerge: 2222222 1111111\nAuthor: Ann <a@x>\nAuthorDate: d\nCommit: Ann <a@x>\nCommitDate: d\n\n    Merge branch 'dev'\n"
        );
        let commits = parse_log(&text).unwrap();
        assert_eq!(commits[0].parents.len(), 2);
        assert_eq!(commits[0].parents[0], B);
        assert!(commits[0].file_line_diffs.is_empty());
        assert_eq!(commits[0].total_diff, LineTotals::default());
        assert_eq!(commits[0].message, "Merge branch 'dev'");
    }

    #[test]
    fn test_binary_only_commit_totals_zero() {
        let text = format!("commit {A}\nAuthor: Ann <a@x>\n\n    add image\n\n-\t-\tlogo.png\n");
        let commits = parse_log(&text).unwrap();
        let diffs = &commits[0].file_line_diffs;
        assert_eq!(diffs[0].additions, Some(0));
        assert_eq!(diffs[1].additions, None);
    }

    #[test]
    fn test_author_without_email() {
        let text = format!("commit {A}\nAuthor: just-a-name\n\n    msg\n");
        let commits = parse_log(&text).unwrap();
        assert_eq!(commits[0].author_name, "just-a-name");
        assert_eq!(commits[0].author_email, "");
    }

    #[test]
    fn test_reflog_headers() {
        let text = format!(
            "commit {B} {A} {C} (refs/stash)\n\
             Reflog: refs/stash@{{0}} (Ann Example <ann@example.com>)\n\
             Reflog message: WIP on master: 1111111 Initial commit\n\
             Author:     Ann Example <ann@example.com>\n\
             AuthorDate: Thu Oct 15 10:00:00 2026 +0200\n\
             Commit:     Ann Example <ann@example.com>\n\
             CommitDate: Thu Oct 15 10:00:00 2026 +0200\n\
             \n\
             \x20   WIP on master: 1111111 Initial commit\n"
        );
        let commits = parse_log(&text).unwrap();
        let stash = &commits[0];
        assert_eq!(stash.reflog_name.as_deref(), Some("refs/stash"));
        assert_eq!(stash.reflog_id.as_deref(), Some("0"));
        assert_eq!(stash.reflog_author_name.as_deref(), Some("Ann Example"));
        assert_eq!(stash.reflog_author_email.as_deref(), Some("ann@example.com"));
        assert_eq!(stash.refs, vec!["refs/stash"]);
        assert_eq!(stash.message, "WIP on master: 1111111 Initial commit");
    }

    #[test]
    fn test_detached_head_decoration() {
        let text = format!("commit {A} (HEAD, refs/heads/feature)\nAuthor: a <b@c>\n\n    m\n");
        let commits = parse_log(&text).unwrap();
        assert!(commits[0].is_head);
        assert_eq!(commits[0].refs, vec!["HEAD", "refs/heads/feature"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_log("").unwrap().is_empty());
        assert!(parse_log("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_malformed_commit_line() {
        let err = parse_log("commit not-a-sha\n").unwrap_err();
        assert_eq!(err.parser, "log");
        assert_eq!(err.line_number, 1);

        let err = parse_log(&format!("commit {A} abc\n")).unwrap_err();
        assert!(err.reason.contains("abc"));

        let err = parse_log("garbage before any record\n").unwrap_err();
        assert_eq!(err.reason, "expected a commit line");
    }

    #[test]
    fn test_rejects_unterminated_refs() {
        let err = parse_log(&format!("commit {A} (HEAD -> refs/heads/master\n")).unwrap_err();
        assert_eq!(err.reason, "unterminated ref list");
    }

    #[test]
    fn test_rejects_garbage_in_stats() {
        let text = format!("commit {A}\nAuthor: a <b@c>\n\n    m\n\n1\t2\tf\nnot a stat\n");
        let err = parse_log(&text).unwrap_err();
        assert_eq!(err.line_number, 7);
        assert_eq!(err.reason, "expected a numstat line");
    }

    #[test]
    fn test_parse_numstat_z_renames_and_raw_paths() {
        let text = "1\t0\tcaf\u{e9}.txt\u{0}1\t0\t\u{0}old.txt\u{0}new.txt\u{0}-\t-\twith space.png\u{0}";
        let diffs = parse_numstat_z(text).unwrap();
        assert_eq!(diffs.len(), 3);
        assert_eq!(diffs[0].path, "caf\u{e9}.txt");
        assert_eq!(diffs[0].additions, Some(1));
        assert_eq!(diffs[1].path, "new.txt");
        assert_eq!(diffs[1].additions, Some(1));
        assert_eq!(diffs[1].deletions, Some(0));
        assert_eq!(diffs[2].path, "with space.png");
        assert_eq!(diffs[2].additions, None);
        assert!(parse_numstat_z("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_numstat_z_rejects_truncated_records() {
        assert!(parse_numstat_z("1\t0\t\u{0}old.txt\u{0}").is_err());
        assert!(parse_numstat_z("1\t0\u{0}").is_err());
        assert!(parse_numstat_z("x\t0\ta.txt\u{0}").is_err());
    }

    #[test]
    fn test_parse_is_repeatable() {
        let text = sample();
        assert_eq!(parse_log(&text).unwrap(), parse_log(&text).unwrap());
    }
}
