//! Parsers turning git's plain-text output into typed records.
//!
//! Parsers hold no state between calls and fail with a [`crate::error::ParseError`]
//! when a line does not fit the grammar, instead of guessing.

pub mod log;
pub mod refs;
pub mod status;
pub mod submodule;

pub use log::{parse_log, parse_numstat_z};
pub use refs::{parse_branches, parse_ls_remote, parse_names, parse_remotes, parse_tags};
pub use status::{parse_status, StatusCode, StatusFlags};
pub use submodule::{display_url, parse_submodules};
