//! Runs the git executable asynchronously, one child process per call.

use crate::config::Config;
use crate::error::{Error, GitError};
use crate::types::{CommandSpec, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

/// Something that can execute a [`CommandSpec`] and hand back its stdout.
///
/// [`GitRunner`] is the real implementation; the seam exists so that
/// sequencing logic such as [`crate::transaction`] can be driven without git.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, spec: &CommandSpec) -> Result<String>;
}

/// Spawns git, enforces the spec's timeout and reduces the result to text or an error.
#[derive(Debug, Clone)]
pub struct GitRunner {
    binary: PathBuf,
}

impl Default for GitRunner {
    fn default() -> Self {
        GitRunner::with_binary("git")
    }
}

impl GitRunner {
    /// A runner for `git` resolved through `PATH`.
    pub fn new() -> GitRunner {
        GitRunner::default()
    }

    /// A runner for a specific executable.
    pub fn with_binary<P: AsRef<Path>>(binary: P) -> GitRunner {
        GitRunner {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> GitRunner {
        GitRunner::with_binary(&config.git_binary)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Runs the spec and returns its captured standard output.
    ///
    /// # Errors
    /// * [`Error::Git`] if git exited with a code the spec does not allow.
    /// * [`Error::Timeout`] if the spec's timeout elapsed; the child is killed.
    /// * [`Error::GitNotFound`] / [`Error::Execution`] if the process could not be spawned.
    /// * [`Error::Undecodable`] if stdout is not valid UTF-8.
    pub async fn run(&self, spec: &CommandSpec) -> Result<String> {
        let started = Instant::now();
        let mut child = self.spawn(spec)?;
        feed_stdin(&mut child, spec);

        // dropping the future on timeout drops the child, which kills it
        let waited = tokio::time::timeout(spec.get_timeout(), child.wait_with_output()).await;
        let output = match waited {
            Ok(result) => result.map_err(Error::Execution)?,
            Err(_) => return Err(timed_out(spec)),
        };

        trace!(
            args = ?spec.args(),
            elapsed = ?started.elapsed(),
            code = ?output.status.code(),
            "git finished"
        );
        self.outcome(spec, output.status, output.stdout, &output.stderr)
    }

    /// Runs the spec, streaming standard output into `sink` instead of buffering it.
    ///
    /// Standard error is still captured for classification.
    pub async fn run_to<W>(&self, spec: &CommandSpec, sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let started = Instant::now();
        let mut child = self.spawn(spec)?;
        feed_stdin(&mut child, spec);

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Execution(io::Error::other("git stdout was not captured")))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Execution(io::Error::other("git stderr was not captured")))?;
        let mut stderr_buf = Vec::new();

        let drained = async {
            tokio::try_join!(
                tokio::io::copy(&mut stdout, &mut *sink),
                stderr.read_to_end(&mut stderr_buf)
            )?;
            sink.flush().await?;
            child.wait().await
        };
        let waited = tokio::time::timeout(spec.get_timeout(), drained).await;
        let status = match waited {
            Ok(result) => result.map_err(Error::Execution)?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "failed to kill timed out git process");
                }
                return Err(timed_out(spec));
            }
        };

        trace!(
            args = ?spec.args(),
            elapsed = ?started.elapsed(),
            code = ?status.code(),
            "git finished (streamed)"
        );
        self.outcome(spec, status, Vec::new(), &stderr_buf).map(|_| ())
    }

    fn spawn(&self, spec: &CommandSpec) -> Result<Child> {
        debug!(
            git = %self.binary.display(),
            args = ?spec.args(),
            cwd = %spec.working_directory().display(),
            timeout = ?spec.get_timeout(),
            "running git"
        );

        let mut command = Command::new(&self.binary);
        command
            .current_dir(spec.working_directory())
            .args(spec.args())
            // diagnostics are classified by their English text
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(if spec.get_input().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound && spec.working_directory().is_dir() {
                warn!(git = %self.binary.display(), "git executable not found");
                Error::GitNotFound(self.binary.clone())
            } else {
                warn!(error = %e, "failed to spawn git");
                Error::Execution(e)
            }
        })
    }

    fn outcome(&self, spec: &CommandSpec, status: ExitStatus, stdout: Vec<u8>, stderr: &[u8]) -> Result<String> {
        if status.code().is_some_and(|code| spec.is_allowed(code)) {
            return String::from_utf8(stdout).map_err(|_| Error::Undecodable);
        }

        let error = GitError::from_output(
            spec.args().to_vec(),
            spec.working_directory().to_path_buf(),
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(stderr).into_owned(),
        );
        warn!(
            args = ?spec.args(),
            cwd = %spec.working_directory().display(),
            code = ?status.code(),
            kind = %error.kind,
            "git failed"
        );
        Err(error.into())
    }
}

#[async_trait]
impl Execute for GitRunner {
    async fn execute(&self, spec: &CommandSpec) -> Result<String> {
        self.run(spec).await
    }
}

/// Writes the spec's input on a separate task so a chatty child cannot deadlock us.
fn feed_stdin(child: &mut Child, spec: &CommandSpec) {
    if let (Some(input), Some(mut stdin)) = (spec.get_input(), child.stdin.take()) {
        let input = input.to_owned();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                debug!(error = %e, "git closed stdin early");
            }
        });
    }
}

fn timed_out(spec: &CommandSpec) -> Error {
    warn!(
        args = ?spec.args(),
        cwd = %spec.working_directory().display(),
        timeout = ?spec.get_timeout(),
        "git timed out"
    );
    Error::Timeout {
        command: spec.args().to_vec(),
        timeout: spec.get_timeout(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new(std::env::temp_dir(), ["-c", script])
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let runner = GitRunner::with_binary("sh");
        assert_eq!(runner.run(&sh("printf hello")).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_allowed_exit_code_is_success() {
        let runner = GitRunner::with_binary("sh");
        let spec = sh("printf partial; exit 1").allow_exit_code(1);
        assert_eq!(runner.run(&spec).await.unwrap(), "partial");
    }

    #[tokio::test]
    async fn test_failure_is_classified() {
        let runner = GitRunner::with_binary("sh");
        let spec = sh("echo out; echo 'fatal: not a git repository (or any of the parent directories): .git' >&2; exit 128");
        match runner.run(&spec).await {
            Err(Error::Git(e)) => {
                assert_eq!(e.kind, ErrorKind::NotARepository);
                assert_eq!(e.command, spec.args());
                assert_eq!(e.working_directory, std::env::temp_dir());
                assert_eq!(e.stdout, "out\n");
                assert!(e.stderr.starts_with("fatal: not a git repository"));
            }
            other => panic!("expected a git error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unrecognised_failure_is_unknown() {
        let runner = GitRunner::with_binary("sh");
        let err = runner.run(&sh("echo nope >&2; exit 2")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Unknown));
    }

    #[tokio::test]
    async fn test_feeds_stdin() {
        let runner = GitRunner::with_binary("sh");
        let spec = sh("cat").input("piped text");
        assert_eq!(runner.run(&spec).await.unwrap(), "piped text");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let runner = GitRunner::with_binary("sleep");
        let spec = CommandSpec::new(std::env::temp_dir(), ["5"]).timeout(Duration::from_millis(200));
        let started = Instant::now();
        match runner.run(&spec).await {
            Err(Error::Timeout { command, timeout }) => {
                assert_eq!(command, vec!["5"]);
                assert_eq!(timeout, Duration::from_millis(200));
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = GitRunner::with_binary("gitscope-no-such-binary");
        let err = runner.run(&sh("true")).await.unwrap_err();
        assert!(matches!(err, Error::GitNotFound(_)));
        assert_eq!(err.kind(), None);
    }

    #[tokio::test]
    async fn test_missing_working_directory() {
        let runner = GitRunner::with_binary("sh");
        let spec = CommandSpec::new("/gitscope/does/not/exist", ["-c", "true"]);
        assert!(matches!(runner.run(&spec).await, Err(Error::Execution(_))));
    }

    #[tokio::test]
    async fn test_undecodable_stdout() {
        let runner = GitRunner::with_binary("sh");
        let err = runner.run(&sh("printf '\\377'")).await.unwrap_err();
        assert!(matches!(err, Error::Undecodable));
    }

    #[tokio::test]
    async fn test_streams_into_sink() {
        let runner = GitRunner::with_binary("sh");
        let mut sink: Vec<u8> = Vec::new();
        runner.run_to(&sh("printf streamed"), &mut sink).await.unwrap();
        assert_eq!(sink, b"streamed");
    }

    #[tokio::test]
    async fn test_streaming_failure_is_classified() {
        let runner = GitRunner::with_binary("sh");
        let mut sink: Vec<u8> = Vec::new();
        let err = runner
            .run_to(&sh("printf partial; echo 'error: failed to push (non-fast-forward)' >&2; exit 1"), &mut sink)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NonFastForward));
        assert_eq!(sink, b"partial");
    }

    #[tokio::test]
    async fn test_streaming_timeout() {
        let runner = GitRunner::with_binary("sleep");
        let spec = CommandSpec::new(std::env::temp_dir(), ["5"]).timeout(Duration::from_millis(200));
        let mut sink: Vec<u8> = Vec::new();
        assert!(matches!(runner.run_to(&spec, &mut sink).await, Err(Error::Timeout { .. })));
    }
}
