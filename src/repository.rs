//! Provides the core Repository implementation.

use crate::config::Config;
use crate::error::Error;
use crate::models::*;
use crate::parse;
use crate::runner::GitRunner;
use crate::transaction::stash_execute_restore;
use crate::types::{CommandSpec, Result, Sha1};
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWrite;
use tracing::debug;

/// Represents a local Git repository located at a specific path.
///
/// Every method spawns fresh git processes; nothing is cached between calls.
/// Read-only methods may run concurrently. Methods that rewrite the working
/// tree (`checkout`, `reset`, `cherry_pick`, the stash methods) must be
/// serialized per [`Repository::path`] by the caller.
#[derive(Debug, Clone)]
pub struct Repository {
    pub(crate) location: PathBuf,
    config: Config,
    runner: GitRunner,
}

impl Repository {
    /// Creates a `Repository` instance pointing to an existing local Git repository.
    ///
    /// This does *not* check if the path is actually a valid Git repository.
    /// Operations will fail later with [`crate::ErrorKind::NotARepository`] if it's not.
    pub fn new<P: AsRef<Path>>(p: P) -> Repository {
        Repository::with_config(p, Config::default())
    }

    /// Like [`Repository::new`], with explicit settings.
    pub fn with_config<P: AsRef<Path>>(p: P, config: Config) -> Repository {
        Repository {
            location: PathBuf::from(p.as_ref()),
            runner: GitRunner::from_config(&config),
            config,
        }
    }

    /// The repository path. It is also the key callers serialize mutations on.
    pub fn path(&self) -> &Path {
        &self.location
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clones a remote Git repository into a specified local path.
    ///
    /// Equivalent to `git clone <url> <path>`, run from the current directory
    /// with the extended timeout.
    ///
    /// # Errors
    /// Returns an error if the clone fails (network error, invalid URL, path
    /// exists and is not empty), times out, or git cannot be executed.
    pub async fn clone<P: AsRef<Path>>(url: &str, p: P, config: Config) -> Result<Repository> {
        let p_ref = p.as_ref();
        let cwd = env::current_dir().map_err(Error::Execution)?;
        let spec = CommandSpec::new(cwd, ["clone".to_owned(), url.to_owned(), p_ref.to_string_lossy().into_owned()])
            .timeout(config.extended_timeout);

        let repo = Repository::with_config(p_ref, config);
        repo.runner.run(&spec).await?;
        Ok(repo)
    }

    /// Initializes a new Git repository in the specified directory.
    ///
    /// Equivalent to `git init`, run inside `p`.
    pub async fn init<P: AsRef<Path>>(p: P, config: Config) -> Result<Repository> {
        let repo = Repository::with_config(p, config);
        repo.git(["init"]).await?;
        Ok(repo)
    }

    /// Reads the commit history across all branches, tags and remotes, newest first.
    ///
    /// Equivalent to `git log --decorate=full --pretty=fuller --numstat --date-order ...`.
    ///
    /// # Arguments
    /// * `limit` - Passed as `--max-count` when set.
    ///
    /// # Errors
    /// Returns an error if git fails or its output cannot be parsed.
    pub async fn log(&self, limit: Option<usize>) -> Result<Vec<Commit>> {
        let mut args: Vec<String> = [
            "log",
            "--decorate=full",
            "--date=default",
            "--pretty=fuller",
            "--branches",
            "--tags",
            "--remotes",
            "--parents",
            "--no-notes",
            "--numstat",
            "--date-order",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();
        if let Some(limit) = limit {
            args.push(format!("--max-count={limit}"));
        }

        let output = self.git(args).await?;
        Ok(parse::parse_log(&output)?)
    }

    /// Describes the working tree: branch, changed files and any merge or rebase in progress.
    ///
    /// Equivalent to `git status -s -b -u`, completed with per-file line
    /// counts from `git diff --numstat -z HEAD` and the state files in the git dir.
    ///
    /// # Errors
    /// Returns an error if any of the git invocations fail or their output cannot be parsed.
    pub async fn status(&self) -> Result<RepositoryStatus> {
        let output = self.git(["status", "-s", "-b", "-u"]).await?;
        let mut status = parse::parse_status(&output)?;
        status.in_conflict = status.files.values().any(|file| file.conflict);

        let git_dir = self.git_dir().await?;
        status.in_rebase =
            exists(&git_dir.join("rebase-merge")).await || exists(&git_dir.join("rebase-apply")).await;
        status.in_merge = exists(&git_dir.join("MERGE_HEAD")).await;
        if status.in_merge {
            status.commit_message = tokio::fs::read_to_string(git_dir.join("MERGE_MSG")).await.ok();
        }

        if self.has_commits().await? {
            let numstat = self.git(["diff", "--numstat", "-z", "HEAD"]).await?;
            for diff in parse::parse_numstat_z(&numstat)? {
                if let Some(file) = status.files.get_mut(&diff.path) {
                    file.additions = diff.additions;
                    file.deletions = diff.deletions;
                }
            }
        }

        Ok(status)
    }

    /// Lists local branches, marking the checked-out one.
    ///
    /// Equivalent to `git branch`.
    pub async fn branches(&self) -> Result<Vec<Branch>> {
        let output = self.git(["branch"]).await?;
        Ok(parse::parse_branches(&output)?)
    }

    /// Lists tag names.
    ///
    /// Equivalent to `git tag -l`.
    pub async fn tags(&self) -> Result<Vec<String>> {
        let output = self.git(["tag", "-l"]).await?;
        Ok(parse::parse_tags(&output))
    }

    /// Lists remote names.
    ///
    /// Equivalent to `git remote`.
    pub async fn remotes(&self) -> Result<Vec<String>> {
        let output = self.git(["remote"]).await?;
        Ok(parse::parse_remotes(&output))
    }

    /// Lists the tags a remote advertises.
    ///
    /// Equivalent to `git ls-remote --tags <remote>`, with the extended timeout.
    ///
    /// # Errors
    /// Fails with [`crate::ErrorKind::NoRemoteConfigured`] when the repository has no remote,
    /// or with one of the network kinds when the remote cannot be reached.
    pub async fn ls_remote_tags(&self, remote: &str) -> Result<Vec<LsRemoteEntry>> {
        let spec = self.networked(["ls-remote", "--tags", remote]);
        let output = self.runner.run(&spec).await?;
        Ok(parse::parse_ls_remote(&output)?)
    }

    /// Lists the submodules declared in the working tree's `.gitmodules`.
    ///
    /// A repository without that file has no submodules.
    pub async fn submodules(&self) -> Result<Vec<Submodule>> {
        let path = self.location.join(".gitmodules");
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Execution(e)),
        };
        Ok(parse::parse_submodules(&text)?)
    }

    /// Lists stash entries, newest first.
    ///
    /// Equivalent to `git stash list --decorate=full --pretty=fuller --parents --numstat`.
    pub async fn stashes(&self) -> Result<Vec<Stash>> {
        let output = self
            .git(["stash", "list", "--decorate=full", "--pretty=fuller", "--parents", "--numstat"])
            .await?;
        let commits = parse::parse_log(&output)?;
        Ok(commits
            .into_iter()
            .enumerate()
            .map(|(index, commit)| Stash::from_commit(index, commit))
            .collect())
    }

    /// Checks out a branch, tag or commit, carrying pending changes across.
    ///
    /// Equivalent to `git checkout <target>`, wrapped in stash / restore when
    /// [`Config::auto_stash`] is set.
    ///
    /// # Errors
    /// If the checkout itself fails, stashed changes are left in the stash.
    pub async fn checkout(&self, target: &str) -> Result<()> {
        self.transact(["checkout", target]).await
    }

    /// Moves the current branch to `target`.
    ///
    /// Equivalent to `git reset <mode> <target>`, wrapped like [`Repository::checkout`].
    pub async fn reset(&self, target: &str, mode: ResetMode) -> Result<()> {
        self.transact(["reset", mode.as_flag(), target]).await
    }

    /// Applies a single commit on top of the current branch.
    ///
    /// Equivalent to `git cherry-pick <sha1>`, wrapped like [`Repository::checkout`].
    ///
    /// # Errors
    /// A conflicting pick fails with [`crate::ErrorKind::MergeFailed`].
    pub async fn cherry_pick(&self, sha1: &Sha1) -> Result<()> {
        self.transact(["cherry-pick", sha1.as_str()]).await
    }

    /// Downloads objects and refs from a remote.
    ///
    /// Equivalent to `git fetch <remote>`, with the extended timeout.
    pub async fn fetch(&self, remote: &str) -> Result<()> {
        self.runner.run(&self.networked(["fetch", remote])).await?;
        Ok(())
    }

    /// Updates a remote ref.
    ///
    /// Equivalent to `git push <remote> <refspec>`, with the extended timeout.
    ///
    /// # Errors
    /// A rejected push fails with [`crate::ErrorKind::NonFastForward`].
    pub async fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        self.runner.run(&self.networked(["push", remote, refspec])).await?;
        Ok(())
    }

    /// Saves pending changes to a new stash entry.
    ///
    /// Equivalent to `git stash push [-m <message>]`. Returns false when there was nothing to save.
    pub async fn stash_save(&self, message: Option<&str>) -> Result<bool> {
        let mut args = vec!["stash", "push"];
        if let Some(message) = message {
            args.extend(["-m", message]);
        }
        let output = self.git(args).await?;
        Ok(!output.contains(crate::transaction::NOTHING_TO_SAVE))
    }

    /// Applies and drops the newest stash entry.
    ///
    /// Equivalent to `git stash pop`.
    pub async fn stash_pop(&self) -> Result<()> {
        self.git(["stash", "pop"]).await?;
        Ok(())
    }

    /// Runs an arbitrary spec and returns its standard output.
    ///
    /// The spec's working directory is used as given; it need not be this repository.
    pub async fn run(&self, spec: &CommandSpec) -> Result<String> {
        self.runner.run(spec).await
    }

    /// Runs an arbitrary spec, streaming its standard output into `sink`.
    pub async fn run_to<W>(&self, spec: &CommandSpec, sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.runner.run_to(spec, sink).await
    }

    /// A spec against this repository with the default timeout.
    pub fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(&self.location, args).timeout(self.config.default_timeout)
    }

    fn networked<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(&self.location, args).timeout(self.config.extended_timeout)
    }

    async fn git<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner.run(&self.command(args)).await
    }

    async fn transact<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = self.command(args);
        stash_execute_restore(&self.runner, &spec, self.config.auto_stash).await?;
        Ok(())
    }

    async fn git_dir(&self) -> Result<PathBuf> {
        let output = self.git(["rev-parse", "--git-dir"]).await?;
        // relative to the working tree unless git printed an absolute path
        Ok(self.location.join(output.trim()))
    }

    async fn has_commits(&self) -> Result<bool> {
        let spec = self.command(["rev-parse", "--verify", "--quiet", "HEAD"]).allow_exit_code(1);
        let output = self.runner.run(&spec).await?;
        let has_commits = !output.trim().is_empty();
        if !has_commits {
            debug!(repo = %self.location.display(), "no commits yet");
        }
        Ok(has_commits)
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_command_uses_configured_timeouts() {
        let config = Config::default()
            .with_default_timeout(Duration::from_secs(3))
            .with_extended_timeout(Duration::from_secs(30));
        let repo = Repository::with_config("/repo", config);

        let spec = repo.command(["status"]);
        assert_eq!(spec.working_directory(), Path::new("/repo"));
        assert_eq!(spec.get_timeout(), Duration::from_secs(3));
        assert_eq!(repo.networked(["fetch", "origin"]).get_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_path_is_kept_verbatim() {
        let repo = Repository::new("relative/dir");
        assert_eq!(repo.path(), Path::new("relative/dir"));
        assert!(repo.config().auto_stash);
    }

    #[tokio::test]
    async fn test_missing_gitmodules_means_no_submodules() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::new(dir.path());
        assert!(repo.submodules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submodules_are_read_from_worktree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".gitmodules"),
            "[submodule \"vendor/lib\"]\n\tpath = vendor/lib\n\turl = git://example.com/lib.git\n",
        )
        .unwrap();
        let repo = Repository::new(dir.path());
        let submodules = repo.submodules().await.unwrap();
        assert_eq!(submodules.len(), 1);
        assert_eq!(submodules[0].url, "http://example.com/lib.git");
    }

    #[tokio::test]
    async fn test_malformed_gitmodules_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitmodules"), "[submodule \"a\"]\n\tpath = a\n").unwrap();
        let repo = Repository::new(dir.path());
        assert!(matches!(repo.submodules().await, Err(Error::Parse(_))));
    }
}
