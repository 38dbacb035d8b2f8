use std::fmt;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use log::{debug, info, warn};
use url::Url;

use super::client::{AzureDevOpsClient, QueryExecutor, RetryingExecutor};
use super::correlate::{correlate_artifact, Correlation};
use super::fetch::{
    get_commit_date, list_active_release_environments, list_artifact_metadata, resolve_project,
    resolve_release_definition,
};
use super::links::{pull_request_url, release_url};
use super::types::{Artifact, Commit, Project, PullRequest, ReleaseEnvironment};
use crate::auth::Token;
use crate::config::AzureDevOpsConfig;
use crate::error::{LeadTimeError, Result};
use crate::metrics::{duration, LeadTime};
use crate::output::PhaseProgress;
use crate::report::{
    ArtifactInfo, BranchInfo, DeploymentRecord, EnvironmentInfo, LeadTimeReport, ProjectInfo,
    PullRequestInfo, ReleaseInfo, RepositoryInfo, COMMIT_TO_PROD, PR_FIRST_COMMIT_TO_PROD,
    PR_MERGED_TO_PROD,
};

/// Knobs for a single collection run.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Number of most recent releases to inspect
    pub top: usize,
    /// Releases, and artifacts within a release, processed at once
    pub concurrency: usize,
    /// Restrict measurements to environments with this exact name
    pub environment: Option<String>,
    /// Emit a commit-only record when no pull request merged the artifact
    pub include_unmerged: bool,
    pub show_progress: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            top: 100,
            concurrency: 8,
            environment: None,
            include_unmerged: false,
            show_progress: false,
        }
    }
}

/// Why a release or artifact produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    ReleaseArtifactsUnavailable,
    MissingDeploymentTime,
    MissingCommitDate,
    CommitLookupFailed,
    NoPullRequest,
    NoFirstCommit,
    CorrelationFailed,
    InvalidTimestamp,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReleaseArtifactsUnavailable => "release_artifacts_unavailable",
            Self::MissingDeploymentTime => "missing_deployment_time",
            Self::MissingCommitDate => "missing_commit_date",
            Self::CommitLookupFailed => "commit_lookup_failed",
            Self::NoPullRequest => "no_pull_request",
            Self::NoFirstCommit => "no_first_commit",
            Self::CorrelationFailed => "correlation_failed",
            Self::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Outcome {
    Emitted(Box<DeploymentRecord>),
    Skipped(SkipReason),
}

/// Azure DevOps lead-time provider.
///
/// Walks project → release definition → active releases → successful
/// environments → deployed artifacts → source commit → merging pull request →
/// earliest pull request commit, and measures the time from each source event
/// to the deployment.
///
/// Only resolving the project, the release definition and the release list can
/// fail a run. Anything that goes wrong for a single release or artifact is
/// logged, counted in [`LeadTimeReport::skipped`] and skipped.
pub struct AzureDevOpsProvider<E = RetryingExecutor<AzureDevOpsClient>> {
    core: E,
    release: E,
    organization_url: Url,
    project_name: String,
    definition_name: String,
    options: CollectOptions,
}

impl AzureDevOpsProvider {
    /// Creates a provider talking to Azure DevOps over HTTP.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token, project, release
    /// definition or service URLs are missing or invalid.
    pub fn new(config: &AzureDevOpsConfig, show_progress: bool) -> Result<Self> {
        let organization_url = config
            .organization_url
            .as_deref()
            .ok_or_else(|| LeadTimeError::Config("organization-url is not set".to_string()))?;
        let release_url = config
            .resolved_release_url()
            .map_err(|e| LeadTimeError::Config(format!("{e:#}")))?;
        let token = config
            .token
            .as_deref()
            .map(Token::from)
            .ok_or_else(|| LeadTimeError::Config("token is not set".to_string()))?;
        let project = required(config.project.as_deref(), "project")?;
        let definition = required(config.release_definition.as_deref(), "release-definition")?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let build = |base_url: &str| -> Result<RetryingExecutor<AzureDevOpsClient>> {
            let client =
                AzureDevOpsClient::new(base_url, &config.api_version, token.clone(), timeout)?;
            Ok(RetryingExecutor::new(
                client,
                config.retries,
                config.backoff_factor,
            ))
        };

        let core = build(organization_url)?;
        let release = build(&release_url)?;
        let organization_url = core.inner().base_url().clone();

        Ok(Self::with_executors(
            core,
            release,
            organization_url,
            project,
            definition,
            CollectOptions {
                top: config.top,
                concurrency: config.concurrency,
                environment: config.environment.clone(),
                include_unmerged: config.include_unmerged,
                show_progress,
            },
        ))
    }
}

fn required(value: Option<&str>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| LeadTimeError::Config(format!("{name} is not set")))
}

impl<E: QueryExecutor> AzureDevOpsProvider<E> {
    /// Creates a provider over arbitrary executors for the core (projects,
    /// git) and release-management service roots.
    pub fn with_executors(
        core: E,
        release: E,
        organization_url: Url,
        project_name: String,
        definition_name: String,
        options: CollectOptions,
    ) -> Self {
        Self {
            core,
            release,
            organization_url,
            project_name,
            definition_name,
            options,
        }
    }

    fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    /// Collects one lead-time record per successfully deployed artifact.
    ///
    /// Records come out in traversal order: environments as listed (newest
    /// release first), artifacts as listed within their release.
    ///
    /// # Errors
    ///
    /// Returns an error if the project or release definition cannot be found,
    /// or if the release list cannot be fetched.
    pub async fn collect_lead_times(&self) -> Result<LeadTimeReport> {
        info!(
            "Collecting lead times for project '{}', release definition '{}'",
            self.project_name, self.definition_name
        );

        let progress = PhaseProgress::start_phase_1(self.options.show_progress);

        let project =
            progress.clear_on_error(resolve_project(&self.core, &self.project_name).await)?;
        let definition = progress.clear_on_error(
            resolve_release_definition(&self.release, &project.id, &self.definition_name).await,
        )?;
        debug!(
            "Resolved project {} and release definition {}",
            project.id, definition.id
        );

        let progress = progress.finish_phase_1_start_phase_2();

        let listed = list_active_release_environments(
            &self.release,
            &project.id,
            definition.id,
            self.options.top,
        )
        .await;
        let environments: Vec<ReleaseEnvironment> = progress
            .clear_on_error(listed)?
            .into_iter()
            .filter(|environment| {
                self.options
                    .environment
                    .as_deref()
                    .map_or(true, |name| environment.environment_name == name)
            })
            .collect();

        if environments.is_empty() {
            warn!(
                "No successful deployments found for release definition '{}'",
                definition.name
            );
        } else {
            info!("Processing {} successful deployments", environments.len());
        }

        let progress = progress.finish_phase_2_start_phase_3(environments.len());

        let outcomes: Vec<Vec<Outcome>> = stream::iter(&environments)
            .map(|environment| self.process_environment(&project, environment))
            .buffered(self.concurrency())
            .collect()
            .await;

        let mut records = Vec::new();
        let mut skipped: IndexMap<String, usize> = IndexMap::new();
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                Outcome::Emitted(record) => records.push(*record),
                Outcome::Skipped(reason) => {
                    *skipped.entry(reason.to_string()).or_insert(0) += 1;
                }
            }
        }

        info!(
            "Measured {} deployments, skipped {}",
            records.len(),
            skipped.values().sum::<usize>()
        );
        progress.finish_phase_3(records.len());

        Ok(LeadTimeReport {
            provider: "Azure DevOps".to_string(),
            project: project.name,
            release_definition: definition.name,
            collected_at: Utc::now(),
            total_environments: environments.len(),
            total_records: records.len(),
            skipped,
            records,
        })
    }

    async fn process_environment(
        &self,
        project: &Project,
        environment: &ReleaseEnvironment,
    ) -> Vec<Outcome> {
        if environment.finished_at.is_empty() {
            warn!(
                "Skipping release {} environment {}: no deployment time",
                environment.release_name, environment.environment_name
            );
            return vec![Outcome::Skipped(SkipReason::MissingDeploymentTime)];
        }

        let artifacts =
            match list_artifact_metadata(&self.release, &project.name, environment.release_id)
                .await
            {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    warn!("Skipping release {}: {e}", environment.release_name);
                    return vec![Outcome::Skipped(SkipReason::ReleaseArtifactsUnavailable)];
                }
            };

        stream::iter(&artifacts)
            .map(|artifact| self.process_artifact(project, environment, artifact))
            .buffered(self.concurrency())
            .collect()
            .await
    }

    async fn process_artifact(
        &self,
        project: &Project,
        environment: &ReleaseEnvironment,
        artifact: &Artifact,
    ) -> Outcome {
        let skip = |reason: SkipReason, detail: &dyn fmt::Display| {
            warn!(
                "Skipping artifact {} ({}) of release {}: {detail}",
                artifact.alias, artifact.commit_id, environment.release_name
            );
            Outcome::Skipped(reason)
        };

        let commit_date = match get_commit_date(
            &self.core,
            &project.name,
            &artifact.repository_id,
            &artifact.commit_id,
        )
        .await
        {
            Ok(Some(date)) => date,
            Ok(None) => return skip(SkipReason::MissingCommitDate, &"commit has no date"),
            Err(e) => return skip(SkipReason::CommitLookupFailed, &e),
        };

        let correlation = match correlate_artifact(&self.core, &project.name, artifact).await {
            Ok(correlation) => correlation,
            Err(e) => return skip(SkipReason::CorrelationFailed, &e),
        };

        let merged = match correlation {
            Correlation::Resolved {
                pull_request,
                first_commit,
            } => match first_commit.committer_date.clone() {
                Some(first_commit_date) => Some((pull_request, first_commit, first_commit_date)),
                None => {
                    return skip(SkipReason::NoFirstCommit, &"first commit has no date");
                }
            },
            Correlation::NoPullRequest if self.options.include_unmerged => None,
            Correlation::NoPullRequest => {
                return skip(SkipReason::NoPullRequest, &"no merging pull request");
            }
            Correlation::NoCommits { pull_request } => {
                return skip(
                    SkipReason::NoFirstCommit,
                    &format!("pull request {} lists no commits", pull_request.id),
                );
            }
        };

        match self.build_record(project, environment, artifact, commit_date, merged) {
            Ok(record) => {
                debug!(
                    "Measured artifact {} of release {}",
                    artifact.alias, environment.release_name
                );
                Outcome::Emitted(Box::new(record))
            }
            Err(e) => skip(SkipReason::InvalidTimestamp, &e),
        }
    }

    fn build_record(
        &self,
        project: &Project,
        environment: &ReleaseEnvironment,
        artifact: &Artifact,
        commit_date: String,
        merged: Option<(PullRequest, Commit, String)>,
    ) -> Result<DeploymentRecord> {
        let deployed_at = environment.finished_at.as_str();

        let mut metrics: IndexMap<String, LeadTime> = IndexMap::new();
        let _ = metrics.insert(
            COMMIT_TO_PROD.to_string(),
            duration(&commit_date, deployed_at)?,
        );

        let pull_request = match merged {
            Some((pull_request, first_commit, first_commit_date)) => {
                if let Some(merged_at) = &pull_request.merged_at {
                    let _ = metrics.insert(
                        PR_MERGED_TO_PROD.to_string(),
                        duration(merged_at, deployed_at)?,
                    );
                }
                let _ = metrics.insert(
                    PR_FIRST_COMMIT_TO_PROD.to_string(),
                    duration(&first_commit_date, deployed_at)?,
                );

                Some(PullRequestInfo {
                    url: pull_request_url(
                        &self.organization_url,
                        &project.name,
                        &artifact.repository_name,
                        pull_request.id,
                    ),
                    id: pull_request.id,
                    created_at: pull_request.created_at,
                    merged_at: pull_request.merged_at,
                    source_ref_name: pull_request.source_ref_name,
                    target_ref_name: pull_request.target_ref_name,
                    status: pull_request.status,
                    commit_id: first_commit.commit_id,
                    commit_date: first_commit_date,
                })
            }
            None => None,
        };

        Ok(DeploymentRecord {
            collected_at: Utc::now(),
            project: ProjectInfo {
                id: project.id.clone(),
                name: project.name.clone(),
            },
            release: ReleaseInfo {
                id: environment.release_id,
                name: environment.release_name.clone(),
                status: environment.release_status.clone(),
                created_on: environment.release_created_on.clone(),
                modified_on: environment.release_modified_on.clone(),
                url: release_url(&self.organization_url, &project.name, environment.release_id),
            },
            environment: EnvironmentInfo {
                id: environment.environment_id,
                name: environment.environment_name.clone(),
                status: environment.status,
                started_at: environment.start_at.clone(),
                deployed_at: environment.finished_at.clone(),
                definition_environment_id: environment.definition_environment_id,
            },
            repository: RepositoryInfo {
                id: artifact.repository_id.clone(),
                name: artifact.repository_name.clone(),
            },
            branch: BranchInfo {
                id: artifact.branch_id.clone(),
                name: artifact.branch_name.clone(),
            },
            artifact: ArtifactInfo {
                alias: artifact.alias.clone(),
                definition_id: artifact.definition_id.clone(),
                definition_name: artifact.definition_name.clone(),
                build_id: artifact.build_id,
                build_url: artifact.build_url.clone(),
                commit_id: artifact.commit_id.clone(),
                commit_date,
            },
            pull_request,
            metrics,
        })
    }
}
