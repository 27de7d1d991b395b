//! Parser for the submodule configuration (`.gitmodules`).
//!
//! Each block cycles through three states: the `[submodule "name"]` header,
//! then `path = ...`, then `url = ...`, at which point a record is emitted.
use crate::error::ParseError;
use crate::models::Submodule;
use once_cell::sync::Lazy;
use regex::Regex;

const PARSER: &str = "submodule";

static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\[submodule\s+"(.*)"\]$"#).expect("Invalid static submodule header regex")
});

static SCP_LIKE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@/:\s]+@([^:/\s]+):/?(.+)$").expect("Invalid static scp url regex")
});

#[derive(Debug)]
enum State {
    ExpectName,
    ExpectPath { name: String },
    ExpectUrl { name: String, path: String },
}

/// A classified line of the configuration text.
enum Line<'a> {
    Header(&'a str),
    Entry(&'a str, &'a str),
}

fn classify_line<'a>(line_number: usize, line: &'a str) -> Result<Line<'a>, ParseError> {
    if let Some(captures) = HEADER_REGEX.captures(line) {
        let name = captures.get(1).map(|m| m.as_str()).unwrap_or("");
        return Ok(Line::Header(name));
    }
    match line.split_once('=') {
        Some((key, value)) => Ok(Line::Entry(key.trim(), value.trim())),
        None => Err(ParseError::new(PARSER, line_number, line, "expected a header or 'key = value'")),
    }
}

/// Parses `.gitmodules` text into submodules, in file order.
pub fn parse_submodules(text: &str) -> Result<Vec<Submodule>, ParseError> {
    let mut submodules = Vec::new();
    let mut state = State::ExpectName;
    let mut last_line = (0, "");

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        last_line = (line_number, raw);
        let error = |reason: &str| ParseError::new(PARSER, line_number, raw, reason);

        state = match (state, classify_line(line_number, line)?) {
            (State::ExpectName, Line::Header(name)) => State::ExpectPath {
                name: name.to_owned(),
            },
            // keys such as `branch` may trail the url of the previous block
            (State::ExpectName, Line::Entry(..)) if !submodules.is_empty() => State::ExpectName,
            (State::ExpectName, Line::Entry(..)) => {
                return Err(error("expected a [submodule \"name\"] header"))
            }
            (State::ExpectPath { name }, Line::Entry("path", path)) => State::ExpectUrl {
                name,
                path: path.to_owned(),
            },
            (State::ExpectPath { .. }, Line::Entry("url", _)) => {
                return Err(error("url before path"))
            }
            (State::ExpectUrl { name, path }, Line::Entry("url", url)) => {
                submodules.push(Submodule {
                    name,
                    path,
                    url: display_url(url),
                    raw_url: url.to_owned(),
                });
                State::ExpectName
            }
            (state @ (State::ExpectPath { .. } | State::ExpectUrl { .. }), Line::Entry(..)) => state,
            (State::ExpectPath { .. } | State::ExpectUrl { .. }, Line::Header(_)) => {
                return Err(error("previous submodule is missing its path or url"))
            }
        };
    }

    match state {
        State::ExpectName => Ok(submodules),
        _ => Err(ParseError::new(
            PARSER,
            last_line.0,
            last_line.1,
            "incomplete submodule block at end of input",
        )),
    }
}

/// Rewrites `git://` and SSH remote forms into an `http://` url for display.
pub fn display_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_owned();
    }
    if let Some(rest) = raw.strip_prefix("git://") {
        return format!("http://{}", rest);
    }
    if let Some(rest) = raw.strip_prefix("ssh://") {
        let rest = match rest.split_once('/') {
            Some((authority, path)) => {
                let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
                format!("{}/{}", host, path)
            }
            None => rest.rsplit_once('@').map_or(rest, |(_, host)| host).to_owned(),
        };
        return format!("http://{}", rest);
    }
    if let Some(captures) = SCP_LIKE_REGEX.captures(raw) {
        return format!("http://{}/{}", &captures[1], &captures[2]);
    }
    raw.to_owned()
}
