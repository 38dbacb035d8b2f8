use serde::{Deserialize, Serialize};

/// An Azure DevOps project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project GUID
    pub id: String,
    pub name: String,
}

/// A classic release pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDefinition {
    pub id: u64,
    pub name: String,
}

/// Deployment outcome of an environment that made it through filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvironmentStatus {
    Succeeded,
    PartiallySucceeded,
}

impl EnvironmentStatus {
    /// Maps the upstream status string, rejecting anything that is not a success.
    pub fn from_upstream(status: &str) -> Option<Self> {
        match status {
            "succeeded" => Some(Self::Succeeded),
            "partiallySucceeded" => Some(Self::PartiallySucceeded),
            _ => None,
        }
    }
}

/// A successful deployment of one release to one environment.
///
/// Timestamps are kept in their wire form and parsed when durations are
/// computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseEnvironment {
    pub environment_id: u64,
    pub environment_name: String,
    pub status: EnvironmentStatus,
    /// Queue time of the first deploy step
    pub start_at: String,
    /// Last modification of the first deploy step, used as the deployment instant
    pub finished_at: String,
    pub definition_environment_id: Option<u64>,
    pub release_id: u64,
    pub release_name: String,
    pub release_status: String,
    pub release_created_on: Option<String>,
    pub release_modified_on: Option<String>,
}

/// A build artifact consumed by a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub alias: String,
    /// Full ref name, e.g. `refs/heads/main`
    pub branch_name: String,
    pub branch_id: String,
    pub repository_name: String,
    pub repository_id: String,
    pub definition_name: String,
    pub definition_id: String,
    pub commit_id: String,
    pub build_id: u64,
    pub build_url: String,
}

/// A completed pull request whose merge produced a deployed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub id: u64,
    pub merged_at: Option<String>,
    pub created_at: String,
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub status: String,
    pub last_merge_commit_id: String,
}

/// A commit together with its committer timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub commit_id: String,
    pub committer_date: Option<String>,
}
