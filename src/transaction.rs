//! Stash / operate / un-stash around a command that rewrites the working tree.
//!
//! The three steps run strictly in order against the same repository path.
//! Nothing here serializes concurrent callers: two transactions on one
//! repository can pop each other's stash, so callers must queue mutations
//! per [`CommandSpec::working_directory`].
//!
//! If the wrapped command fails, saved changes are deliberately left in the
//! stash (the restore step is skipped); a timeout or crash between the
//! command and the restore has the same effect.
use crate::error::{Error, GitError};
use crate::runner::Execute;
use crate::types::{CommandSpec, Result};
use tracing::{debug, info, warn};

/// Printed by `git stash` when the working tree is clean.
pub const NOTHING_TO_SAVE: &str = "No local changes to save";

/// Printed by `git stash` in a repository without commits.
const NO_INITIAL_COMMIT: &str = "You do not have the initial commit yet";

/// Runs `spec`, protecting pending changes when `auto_stash` is set.
///
/// Returns the wrapped command's standard output.
pub async fn stash_execute_restore<E>(executor: &E, spec: &CommandSpec, auto_stash: bool) -> Result<String>
where
    E: Execute + ?Sized,
{
    if !auto_stash {
        return executor.execute(spec).await;
    }

    let had_pending_changes = save_pending_changes(executor, spec).await?;

    let output = match executor.execute(spec).await {
        Ok(output) => output,
        Err(e) => {
            if had_pending_changes {
                warn!(
                    cwd = %spec.working_directory().display(),
                    args = ?spec.args(),
                    "command failed; local changes remain in the stash"
                );
            }
            return Err(e);
        }
    };

    if had_pending_changes {
        executor.execute(&spec.sibling(["stash", "pop"])).await?;
        info!(cwd = %spec.working_directory().display(), "restored stashed changes");
    }

    Ok(output)
}

/// Runs the save step; returns whether anything was actually stashed.
async fn save_pending_changes<E>(executor: &E, spec: &CommandSpec) -> Result<bool>
where
    E: Execute + ?Sized,
{
    match executor.execute(&spec.sibling(["stash"])).await {
        Ok(output) => {
            let saved = !output.contains(NOTHING_TO_SAVE);
            if saved {
                info!(cwd = %spec.working_directory().display(), "stashed local changes");
            }
            Ok(saved)
        }
        Err(Error::Git(e)) if is_unborn(&e) => {
            debug!(cwd = %spec.working_directory().display(), "no commits yet, nothing to stash");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn is_unborn(error: &GitError) -> bool {
    error.stderr.contains(NO_INITIAL_COMMIT) || error.stdout.contains(NO_INITIAL_COMMIT)
}
