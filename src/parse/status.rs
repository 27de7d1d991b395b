//! Parser for the short status format with a branch header (`git status -s -b -u`).
use crate::error::ParseError;
use crate::models::{FileStatusEntry, FileType, RepositoryStatus};

const PARSER: &str = "status";

/// The two-character `XY` code of a short-format status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode {
    /// Index (staging area) side.
    pub index: char,
    /// Working-tree side.
    pub worktree: char,
}

/// Flags derived from a [`StatusCode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub staged: bool,
    pub removed: bool,
    pub is_new: bool,
    pub conflict: bool,
    pub renamed: bool,
}

/// Every character git may print in either column.
const CODE_CHARS: &str = " MTADRCU?!";

impl StatusCode {
    /// Accepts the characters git documents for short-format status.
    pub fn new(index: char, worktree: char) -> Option<StatusCode> {
        if CODE_CHARS.contains(index) && CODE_CHARS.contains(worktree) {
            Some(StatusCode { index, worktree })
        } else {
            None
        }
    }

    /// Derives the flags from the code alone.
    ///
    /// Only the index column marks a path as staged or new, so an
    /// intent-to-add path (` A`) is neither.
    pub fn flags(&self) -> StatusFlags {
        let (x, y) = (self.index, self.worktree);
        let removed = x == 'D' || y == 'D';
        StatusFlags {
            staged: x == 'A' || x == 'M',
            removed,
            is_new: (x == '?' || x == 'A') && !removed,
            conflict: (x == 'A' && y == 'A') || x == 'U' || y == 'U',
            renamed: x == 'R',
        }
    }
}

/// Parses status text into the branch name and one entry per current path.
///
/// The in-progress flags and line counts are left unset; they come from
/// other sources and are filled in by [`crate::Repository::status`].
pub fn parse_status(text: &str) -> Result<RepositoryStatus, ParseError> {
    let mut lines = text.lines().enumerate();

    let (_, header) = lines
        .next()
        .ok_or_else(|| ParseError::new(PARSER, 1, "", "missing branch header"))?;
    let branch = parse_branch_header(header)
        .ok_or_else(|| ParseError::new(PARSER, 1, header, "expected a '## ' branch header"))?;

    let mut status = RepositoryStatus {
        branch,
        ..RepositoryStatus::default()
    };

    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let entry = parse_entry(index + 1, line)?;
        status.files.insert(entry.file_name.clone(), entry);
    }

    Ok(status)
}

fn parse_branch_header(line: &str) -> Option<String> {
    let rest = line.strip_prefix("## ")?.trim();
    for prefix in ["No commits yet on ", "Initial commit on "] {
        if let Some(name) = rest.strip_prefix(prefix) {
            return Some(name.trim().to_owned());
        }
    }
    if rest.starts_with("HEAD (no branch)") {
        return Some("HEAD".to_owned());
    }
    let name = rest.split(' ').next().unwrap_or(rest);
    let name = name.split("...").next().unwrap_or(name);
    Some(name.to_owned())
}

fn parse_entry(line_number: usize, line: &str) -> Result<FileStatusEntry, ParseError> {
    let error = |reason: &str| ParseError::new(PARSER, line_number, line, reason);

    let mut chars = line.chars();
    let code = match (chars.next(), chars.next(), chars.next()) {
        (Some(x), Some(y), Some(' ')) => StatusCode::new(x, y).ok_or_else(|| error("unknown status code"))?,
        _ => return Err(error("expected 'XY path'")),
    };
    let path = line[3..].trim();
    if path.is_empty() {
        return Err(error("missing path"));
    }

    let flags = code.flags();
    let (old_file_name, file_name) = if code.index == 'R' || code.index == 'C' {
        let (old, new) = split_rename(path).ok_or_else(|| error("expected 'old -> new'"))?;
        (unquote(old), unquote(new))
    } else {
        let name = unquote(path);
        (name.clone(), name)
    };
    let display_name = if flags.renamed {
        format!("{} → {}", old_file_name, file_name)
    } else {
        file_name.clone()
    };

    Ok(FileStatusEntry {
        file_type: FileType::from_path(&file_name),
        file_name,
        old_file_name,
        display_name,
        is_new: flags.is_new,
        staged: flags.staged,
        removed: flags.removed,
        conflict: flags.conflict,
        renamed: flags.renamed,
        additions: None,
        deletions: None,
    })
}

/// Splits `old -> new`, ignoring arrows inside quoted names.
fn split_rename(path: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in path.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ' ' if !in_quotes && path[i..].starts_with(" -> ") => {
                return Some((&path[..i], &path[i + 4..]));
            }
            _ => {}
        }
    }
    None
}

/// Strips git's C-style quoting, decoding octal escapes as UTF-8 bytes.
fn unquote(path: &str) -> String {
    let inner = match path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) => inner,
        None => return path.to_owned(),
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match iter.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'v') => bytes.push(0x0b),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(o - b'0');
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
