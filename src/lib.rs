//! A Rust library that reads and manipulates Git repositories
//! by wrapping the `git` command-line tool.
//!
//! Every operation spawns `git` as a child process, classifies failures into a
//! closed set of [`ErrorKind`]s and parses the plain-text output into typed
//! records. Working-tree mutations can be wrapped in stash / operate / un-stash
//! so pending changes survive a checkout or reset.
//!
//! This library requires the `git` executable to be installed and accessible
//! in the system's PATH (or configured through [`Config::git_binary`]).
//!
//! # Examples
//!
//! ```no_run
//! use gitscope::{Config, ErrorKind, Repository};
//!
//! # async fn run() -> gitscope::Result<()> {
//! let repo = Repository::with_config("./my_project", Config::default());
//!
//! // History with decorations and per-file line counts
//! for commit in repo.log(Some(20)).await? {
//!     println!("{} {}", commit.sha1, commit.title());
//! }
//!
//! // Switch branches, carrying uncommitted work across
//! match repo.checkout("develop").await {
//!     Ok(()) => {}
//!     Err(e) if e.kind() == Some(ErrorKind::LocalChangesWouldBeOverwritten) => {
//!         eprintln!("commit or discard your changes first");
//!     }
//!     Err(e) => return Err(e),
//! }
//!
//! let status = repo.status().await?;
//! println!("on {} with {} changed files", status.branch, status.files.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization of model types, [`Config`]
//!   and [`ErrorKind`] using the `serde` crate.

pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod parse;
pub mod repository;
pub mod runner;
pub mod transaction;
pub mod types;

// Re-export key types
pub use crate::config::Config;
pub use crate::error::{Error, ErrorKind, GitError, ParseError};
pub use crate::repository::Repository;
pub use crate::runner::{Execute, GitRunner};
pub use crate::types::{CommandSpec, Result, Sha1};

pub mod prelude {
    //! Convenient import for common gitscope types and traits.
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorKind, GitError, ParseError};
    pub use crate::models::*;
    pub use crate::repository::Repository;
    pub use crate::runner::{Execute, GitRunner};
    pub use crate::types::{CommandSpec, Result, Sha1};
}
