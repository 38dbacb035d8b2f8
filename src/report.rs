use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::metrics::LeadTime;
use crate::providers::EnvironmentStatus;

pub const COMMIT_TO_PROD: &str = "commit_to_prod";
pub const PR_MERGED_TO_PROD: &str = "pr_merged_to_prod";
pub const PR_FIRST_COMMIT_TO_PROD: &str = "pr_first_commit_to_prod";

#[derive(Debug, Serialize, Deserialize)]
pub struct LeadTimeReport {
    pub provider: String,
    pub project: String,
    pub release_definition: String,
    pub collected_at: DateTime<Utc>,
    pub total_environments: usize,
    pub total_records: usize,
    /// Units of work dropped during collection, counted per reason
    pub skipped: IndexMap<String, usize>,
    pub records: Vec<DeploymentRecord>,
}

/// Lead-time measurements for one artifact deployed to one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub collected_at: DateTime<Utc>,
    pub project: ProjectInfo,
    pub release: ReleaseInfo,
    pub environment: EnvironmentInfo,
    pub repository: RepositoryInfo,
    pub branch: BranchInfo,
    pub artifact: ArtifactInfo,
    pub pull_request: Option<PullRequestInfo>,
    pub metrics: IndexMap<String, LeadTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub created_on: Option<String>,
    pub modified_on: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub id: u64,
    pub name: String,
    pub status: EnvironmentStatus,
    pub started_at: String,
    pub deployed_at: String,
    pub definition_environment_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub alias: String,
    pub definition_id: String,
    pub definition_name: String,
    pub build_id: u64,
    pub build_url: String,
    pub commit_id: String,
    pub commit_date: String,
}

/// The merging pull request. The commit fields describe its earliest commit,
/// not its merge commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub id: u64,
    pub created_at: String,
    pub merged_at: Option<String>,
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub status: String,
    pub commit_id: String,
    pub commit_date: String,
    pub url: String,
}
