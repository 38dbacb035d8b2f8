use serde::Deserialize;
use serde_json::Value;

use super::{get_json, ListResponse};
use crate::error::{LeadTimeError, Result};
use crate::providers::azure_devops::client::{QueryExecutor, PULL_REQUEST_API_VERSION};
use crate::providers::azure_devops::types::{Commit, PullRequest};

/// Completed pull requests scanned per lookup.
pub const PULL_REQUEST_SCAN_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct GitUserDate {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    committer: Option<GitUserDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPullRequestCommit {
    commit_id: String,
    committer: Option<GitUserDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPullRequest {
    pull_request_id: u64,
    closed_date: Option<String>,
    creation_date: String,
    source_ref_name: String,
    target_ref_name: String,
    merge_status: String,
}

/// Returns the committer timestamp of a commit, if the server reports one.
///
/// # Errors
///
/// `Network` naming the commit when the lookup fails.
pub async fn get_commit_date<E: QueryExecutor>(
    executor: &E,
    project: &str,
    repository_id: &str,
    commit_id: &str,
) -> Result<Option<String>> {
    let path = format!("/{project}/_apis/git/repositories/{repository_id}/commits/{commit_id}");
    let params = [("api-version", executor.api_version().to_string())];
    let commit: RawCommit =
        get_json(executor, &path, &params, || format!("commit {commit_id}")).await?;

    Ok(commit.committer.and_then(|committer| committer.date))
}

/// Finds the completed pull request into `target_ref` whose merge commit is
/// `commit_id`.
///
/// Only the first [`PULL_REQUEST_SCAN_LIMIT`] completed pull requests are
/// scanned. Commit ids compare case-insensitively, the target ref is passed to
/// the server verbatim.
///
/// # Errors
///
/// `Network` when the search fails or the matching pull request cannot be
/// decoded.
pub async fn find_completed_pr_for_commit<E: QueryExecutor>(
    executor: &E,
    project: &str,
    repository_id: &str,
    commit_id: &str,
    target_ref: &str,
) -> Result<Option<PullRequest>> {
    let path = format!("/{project}/_apis/git/repositories/{repository_id}/pullRequests");
    let params = [
        ("api-version", PULL_REQUEST_API_VERSION.to_string()),
        ("searchCriteria.status", "completed".to_string()),
        ("searchCriteria.targetRefName", target_ref.to_string()),
        ("$top", PULL_REQUEST_SCAN_LIMIT.to_string()),
    ];
    let context = || format!("pull request merging commit {commit_id}");
    let pull_requests: ListResponse<Value> = get_json(executor, &path, &params, context).await?;

    let Some((merge_commit, raw)) = pull_requests
        .value
        .into_iter()
        .take(PULL_REQUEST_SCAN_LIMIT)
        .find_map(|pr| {
            let merge_commit = pr
                .pointer("/lastMergeCommit/commitId")
                .and_then(Value::as_str)
                .filter(|merged| merged.eq_ignore_ascii_case(commit_id))?
                .to_string();
            Some((merge_commit, pr))
        })
    else {
        return Ok(None);
    };

    let pr: RawPullRequest =
        serde_json::from_value(raw).map_err(|e| LeadTimeError::network(context(), e.into()))?;

    Ok(Some(PullRequest {
        id: pr.pull_request_id,
        merged_at: pr.closed_date,
        created_at: pr.creation_date,
        source_ref_name: pr.source_ref_name,
        target_ref_name: pr.target_ref_name,
        status: pr.merge_status,
        last_merge_commit_id: merge_commit,
    }))
}

/// Returns the earliest commit of a pull request.
///
/// The commits endpoint lists newest first, so the earliest commit is the last
/// element. Nothing else guarantees that ordering.
///
/// # Errors
///
/// `Network` when the commit list cannot be fetched or decoded.
pub async fn oldest_commit_in_pr<E: QueryExecutor>(
    executor: &E,
    project: &str,
    repository_id: &str,
    pull_request_id: u64,
) -> Result<Option<Commit>> {
    let path = format!(
        "/{project}/_apis/git/repositories/{repository_id}/pullRequests/{pull_request_id}/commits"
    );
    let params = [("api-version", PULL_REQUEST_API_VERSION.to_string())];
    let commits: ListResponse<RawPullRequestCommit> = get_json(executor, &path, &params, || {
        format!("commits of pull request {pull_request_id}")
    })
    .await?;

    Ok(commits.value.into_iter().last().map(|commit| Commit {
        commit_id: commit.commit_id,
        committer_date: commit.committer.and_then(|committer| committer.date),
    }))
}
