//! Line-oriented parsers for branch, tag, remote and ls-remote listings.
use crate::error::ParseError;
use crate::models::{Branch, LsRemoteEntry};
use crate::types::Sha1;

/// Parses `git branch` output (`* current`, `  other`).
pub fn parse_branches(text: &str) -> Result<Vec<Branch>, ParseError> {
    let mut branches = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let error = |reason: &str| ParseError::new("branch", index + 1, line, reason);

        let mut chars = line.chars();
        let current = match (chars.next(), chars.next()) {
            (Some('*'), Some(' ')) => true,
            // '+' marks a branch checked out in another worktree
            (Some(' ' | '+'), Some(' ')) => false,
            _ => return Err(error("expected '<marker> <name>'")),
        };
        let name = line[2..].trim();
        if name.is_empty() {
            return Err(error("missing branch name"));
        }

        branches.push(Branch {
            name: name.to_owned(),
            current,
        });
    }

    Ok(branches)
}

/// Parses one-name-per-line listings such as `git tag -l` and `git remote`.
pub fn parse_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses `git tag -l` output.
pub fn parse_tags(text: &str) -> Vec<String> {
    parse_names(text)
}

/// Parses `git remote` output.
pub fn parse_remotes(text: &str) -> Vec<String> {
    parse_names(text)
}

/// Parses `git ls-remote` output (`<sha1>\t<ref>`), skipping the `From <url>` banner.
pub fn parse_ls_remote(text: &str) -> Result<Vec<LsRemoteEntry>, ParseError> {
    let mut entries = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with("From ") {
            continue;
        }
        let error = |reason: String| ParseError::new("ls-remote", index + 1, line, reason);

        let (id, name) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| error("expected '<sha1> <ref>'".to_owned()))?;
        let sha1 = id
            .parse::<Sha1>()
            .map_err(|bad| error(format!("invalid object id {bad:?}")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(error("missing ref name".to_owned()));
        }

        entries.push(LsRemoteEntry {
            sha1,
            name: name.to_owned(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_branches() {
        let branches = parse_branches("* master\n  dev\n").unwrap();
        assert_eq!(
            branches,
            vec![
                Branch {
                    name: "master".into(),
                    current: true
                },
                Branch {
                    name: "dev".into(),
                    current: false
                },
            ]
        );
    }

    #[test]
    fn test_parse_branches_detached_and_worktree() {
        let branches =
            parse_branches("* (HEAD detached at 1a2b3c4)\n  feature/x\n+ checked-out-elsewhere\n\n").unwrap();
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[0].name, "(HEAD detached at 1a2b3c4)");
        assert!(branches[0].current);
        assert_eq!(branches[2].name, "checked-out-elsewhere");
        assert!(!branches[2].current);
    }

    #[test]
    fn test_parse_branches_rejects_unmarked_lines() {
        let err = parse_branches("* master\nbroken\n").unwrap_err();
        assert_eq!(err.parser, "branch");
        assert_eq!(err.line_number, 2);
        assert!(parse_branches("* \n").is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_tags("v1.0\nv1.1\n\n"), vec!["v1.0", "v1.1"]);
        assert_eq!(parse_remotes("origin\nupstream\n"), vec!["origin", "upstream"]);
        assert!(parse_remotes("").is_empty());
    }

    #[test]
    fn test_parse_ls_remote() {
        let text = "From git@github.com:user/project.git\n\
                    1111111111111111111111111111111111111111\trefs/tags/v1.0\n\
                    2222222222222222222222222222222222222222\trefs/tags/v1.0^{}\n";
        let entries = parse_ls_remote(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sha1, "1111111111111111111111111111111111111111");
        assert_eq!(entries[0].name, "refs/tags/v1.0");
        assert_eq!(entries[1].name, "refs/tags/v1.0^{}");
    }

    #[test]
    fn test_parse_ls_remote_rejects_bad_ids() {
        let err = parse_ls_remote("deadbeef\trefs/tags/v1\n").unwrap_err();
        assert_eq!(err.parser, "ls-remote");
        assert!(parse_ls_remote("1111111111111111111111111111111111111111\n").is_err());
        assert!(parse_ls_remote("1111111111111111111111111111111111111111\t \n").is_err());
    }
}
