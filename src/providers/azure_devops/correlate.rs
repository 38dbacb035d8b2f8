use log::debug;

use super::client::QueryExecutor;
use super::fetch::{find_completed_pr_for_commit, oldest_commit_in_pr};
use super::types::{Artifact, Commit, PullRequest};
use crate::error::Result;

/// Outcome of linking a deployed artifact to the pull request that merged it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// The artifact's commit is the merge commit of `pull_request`, whose
    /// earliest commit is `first_commit`.
    Resolved {
        pull_request: PullRequest,
        first_commit: Commit,
    },
    /// No completed pull request into the artifact's branch merged its commit.
    NoPullRequest,
    /// A pull request matched but listed no commits to anchor on.
    NoCommits { pull_request: PullRequest },
}

/// Finds the pull request whose merge produced `artifact.commit_id` on
/// `artifact.branch_name`, then resolves that pull request's earliest commit.
///
/// # Errors
///
/// Propagates `Network` failures from either lookup.
pub async fn correlate_artifact<E: QueryExecutor>(
    executor: &E,
    project: &str,
    artifact: &Artifact,
) -> Result<Correlation> {
    let Some(pull_request) = find_completed_pr_for_commit(
        executor,
        project,
        &artifact.repository_id,
        &artifact.commit_id,
        &artifact.branch_name,
    )
    .await?
    else {
        debug!(
            "No completed pull request into {} merged {}",
            artifact.branch_name, artifact.commit_id
        );
        return Ok(Correlation::NoPullRequest);
    };

    debug!(
        "Pull request {} merged {} into {}",
        pull_request.id, pull_request.last_merge_commit_id, artifact.branch_name
    );

    let first_commit =
        oldest_commit_in_pr(executor, project, &artifact.repository_id, pull_request.id).await?;

    Ok(match first_commit {
        Some(first_commit) => Correlation::Resolved {
            pull_request,
            first_commit,
        },
        None => Correlation::NoCommits { pull_request },
    })
}
