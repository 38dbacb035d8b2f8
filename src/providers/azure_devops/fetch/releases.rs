use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::{get_json, ListResponse};
use crate::error::{LeadTimeError, Result};
use crate::providers::azure_devops::client::QueryExecutor;
use crate::providers::azure_devops::types::{Artifact, EnvironmentStatus, ReleaseEnvironment};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRelease {
    id: Option<u64>,
    name: Option<String>,
    status: Option<String>,
    created_on: Option<String>,
    modified_on: Option<String>,
    environments: Option<Vec<RawEnvironment>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvironment {
    id: Option<u64>,
    name: Option<String>,
    status: Option<String>,
    deploy_steps: Option<Vec<RawDeployStep>>,
    definition_environment_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeployStep {
    queued_on: Option<String>,
    last_modified_on: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDetail {
    artifacts: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    alias: Option<String>,
    definition_reference: DefinitionReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionReference {
    branch: NamedReference,
    repository: NamedReference,
    definition: NamedReference,
    source_version: IdReference,
    version: IdReference,
    artifact_source_version_url: IdReference,
}

#[derive(Debug, Deserialize)]
struct NamedReference {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct IdReference {
    id: String,
}

/// Lists successful deployments of the newest `top` releases of a definition.
///
/// Releases that are not `active`, environments that did not succeed (fully or
/// partially) and environments whose first deploy step lacks either timestamp
/// are dropped without being reported.
///
/// # Errors
///
/// `Network` when the release query fails.
pub async fn list_active_release_environments<E: QueryExecutor>(
    executor: &E,
    project_id: &str,
    definition_id: u64,
    top: usize,
) -> Result<Vec<ReleaseEnvironment>> {
    let path = format!("/{project_id}/_apis/release/releases");
    let params = [
        ("api-version", executor.api_version().to_string()),
        ("queryOrder", "descending".to_string()),
        ("$expand", "environments".to_string()),
        ("definitionId", definition_id.to_string()),
        ("$top", top.to_string()),
    ];
    let releases: ListResponse<RawRelease> = get_json(executor, &path, &params, || {
        format!("releases of definition {definition_id}")
    })
    .await?;

    Ok(releases
        .value
        .into_iter()
        .filter(|release| release.status.as_deref() == Some("active"))
        .flat_map(successful_environments)
        .collect())
}

fn successful_environments(release: RawRelease) -> Vec<ReleaseEnvironment> {
    let RawRelease {
        id,
        name,
        status: release_status,
        created_on,
        modified_on,
        environments,
    } = release;

    environments
        .unwrap_or_default()
        .into_iter()
        .filter_map(|environment| {
            let status = environment
                .status
                .as_deref()
                .and_then(EnvironmentStatus::from_upstream)?;

            let step = environment.deploy_steps.as_ref()?.first()?;
            let start_at = non_empty(step.queued_on.as_ref())?;
            let finished_at = non_empty(step.last_modified_on.as_ref())?;

            let (Some(release_id), Some(release_name), Some(environment_id), Some(environment_name)) =
                (id, name.clone(), environment.id, environment.name)
            else {
                debug!("Dropping environment without identity in release {id:?}");
                return None;
            };

            Some(ReleaseEnvironment {
                environment_id,
                environment_name,
                status,
                start_at,
                finished_at,
                definition_environment_id: environment.definition_environment_id,
                release_id,
                release_name,
                release_status: release_status.clone().unwrap_or_default(),
                release_created_on: created_on.clone(),
                release_modified_on: modified_on.clone(),
            })
        })
        .collect()
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Decodes every artifact of a release.
///
/// All-or-nothing: an empty artifact list, or a single artifact missing any
/// part of its definition reference, fails the whole call.
///
/// # Errors
///
/// `MalformedData` carrying `release_id` for missing or invalid fields,
/// `Network` when the release cannot be fetched.
pub async fn list_artifact_metadata<E: QueryExecutor>(
    executor: &E,
    project: &str,
    release_id: u64,
) -> Result<Vec<Artifact>> {
    let path = format!("/{project}/_apis/release/releases/{release_id}");
    let params = [("api-version", executor.api_version().to_string())];
    let detail: ReleaseDetail =
        get_json(executor, &path, &params, || format!("release {release_id}")).await?;

    let artifacts = detail.artifacts.unwrap_or_default();
    if artifacts.is_empty() {
        return Err(LeadTimeError::MalformedData {
            release_id,
            reason: "release has no artifacts".to_string(),
        });
    }

    artifacts
        .into_iter()
        .map(|raw| decode_artifact(release_id, raw))
        .collect()
}

fn decode_artifact(release_id: u64, raw: Value) -> Result<Artifact> {
    let malformed = |reason: String| LeadTimeError::MalformedData { release_id, reason };

    let RawArtifact {
        alias,
        definition_reference: reference,
    } = serde_json::from_value(raw).map_err(|e| malformed(format!("artifact: {e}")))?;

    let build_id = reference
        .version
        .id
        .parse::<u64>()
        .map_err(|e| malformed(format!("build id '{}': {e}", reference.version.id)))?;

    Ok(Artifact {
        alias: alias.unwrap_or_else(|| "unknown".to_string()),
        branch_name: reference.branch.name,
        branch_id: reference.branch.id,
        repository_name: reference.repository.name,
        repository_id: reference.repository.id,
        definition_name: reference.definition.name,
        definition_id: reference.definition.id,
        commit_id: reference.source_version.id,
        build_id,
        build_url: reference.artifact_source_version_url.id,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::providers::azure_devops::testing::FakeExecutor;

    const RELEASES_PATH: &str = "/p/_apis/release/releases";

    fn release_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("api-version", "7.1"),
            ("queryOrder", "descending"),
            ("$expand", "environments"),
            ("definitionId", "2"),
            ("$top", "100"),
        ]
    }

    fn releases_with(environment: Value) -> Value {
        json!({
            "value": [
                {
                    "id": 1,
                    "name": "r1",
                    "status": "active",
                    "createdOn": "2021-01-01T00:00:00Z",
                    "modifiedOn": "2021-01-01T00:30:00Z",
                    "environments": [environment]
                },
                {"id": 2, "status": "abandoned"}
            ]
        })
    }

    async fn environments_for(environment: Value) -> Vec<ReleaseEnvironment> {
        let executor =
            FakeExecutor::new().respond(RELEASES_PATH, &release_params(), releases_with(environment));
        list_active_release_environments(&executor, "p", 2, 100)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_lists_succeeded_environment() {
        let environments = environments_for(json!({
            "id": 11,
            "name": "Prod",
            "status": "succeeded",
            "deploySteps": [{
                "queuedOn": "2021-01-01T00:00:00Z",
                "lastModifiedOn": "2021-01-01T01:00:00Z"
            }],
            "definitionEnvironmentId": 10
        }))
        .await;

        assert_eq!(environments.len(), 1);
        let environment = &environments[0];
        assert_eq!(environment.environment_id, 11);
        assert_eq!(environment.environment_name, "Prod");
        assert_eq!(environment.status, EnvironmentStatus::Succeeded);
        assert_eq!(environment.start_at, "2021-01-01T00:00:00Z");
        assert_eq!(environment.finished_at, "2021-01-01T01:00:00Z");
        assert_eq!(environment.release_id, 1);
        assert_eq!(environment.release_name, "r1");
        assert_eq!(environment.release_status, "active");
        assert_eq!(environment.definition_environment_id, Some(10));
    }

    #[tokio::test]
    async fn test_keeps_partially_succeeded_environment() {
        let environments = environments_for(json!({
            "id": 11,
            "name": "Prod",
            "status": "partiallySucceeded",
            "deploySteps": [{
                "queuedOn": "2021-01-01T00:00:00Z",
                "lastModifiedOn": "2021-01-01T01:00:00Z"
            }]
        }))
        .await;

        assert_eq!(environments.len(), 1);
        assert_eq!(environments[0].status, EnvironmentStatus::PartiallySucceeded);
    }

    #[tokio::test]
    async fn test_drops_failed_environment() {
        let environments = environments_for(json!({
            "id": 11,
            "name": "Prod",
            "status": "failed",
            "deploySteps": [{
                "queuedOn": "2021-01-01T00:00:00Z",
                "lastModifiedOn": "2021-01-01T01:00:00Z"
            }]
        }))
        .await;

        assert!(environments.is_empty());
    }

    #[tokio::test]
    async fn test_drops_environment_without_deploy_steps() {
        let environments = environments_for(json!({
            "id": 11,
            "name": "Prod",
            "status": "succeeded",
            "deploySteps": []
        }))
        .await;

        assert!(environments.is_empty());
    }

    #[tokio::test]
    async fn test_drops_environment_without_queued_on() {
        let environments = environments_for(json!({
            "id": 11,
            "name": "Prod",
            "status": "succeeded",
            "deploySteps": [{"lastModifiedOn": "2021-01-01T01:00:00Z"}]
        }))
        .await;

        assert!(environments.is_empty());
    }

    #[tokio::test]
    async fn test_drops_environment_without_last_modified_on() {
        let environments = environments_for(json!({
            "id": 11,
            "name": "Prod",
            "status": "succeeded",
            "deploySteps": [{"queuedOn": "2021-01-01T00:00:00Z"}]
        }))
        .await;

        assert!(environments.is_empty());
    }

    #[tokio::test]
    async fn test_drops_environment_with_empty_timestamps() {
        for step in [
            json!({"queuedOn": "", "lastModifiedOn": "2021-01-01T01:00:00Z"}),
            json!({"queuedOn": "2021-01-01T00:00:00Z", "lastModifiedOn": ""}),
        ] {
            let environments = environments_for(json!({
                "id": 11,
                "name": "Prod",
                "status": "succeeded",
                "deploySteps": [step]
            }))
            .await;

            assert!(environments.is_empty());
        }
    }

    #[tokio::test]
    async fn test_only_first_deploy_step_counts() {
        let environments = environments_for(json!({
            "id": 11,
            "name": "Prod",
            "status": "succeeded",
            "deploySteps": [
                {"queuedOn": "2021-01-01T00:00:00Z"},
                {"queuedOn": "2021-01-02T00:00:00Z", "lastModifiedOn": "2021-01-02T01:00:00Z"}
            ]
        }))
        .await;

        assert!(environments.is_empty());
    }

    #[tokio::test]
    async fn test_release_listing_failure_is_network_error() {
        let executor = FakeExecutor::new().fail(RELEASES_PATH, &release_params(), 503);
        let err = list_active_release_environments(&executor, "p", 2, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadTimeError::Network { .. }));
    }

    const RELEASE_PATH: &str = "/proj/_apis/release/releases/1";

    fn full_reference() -> Value {
        json!({
            "branch": {"name": "refs/heads/main", "id": "1"},
            "repository": {"name": "repo", "id": "2"},
            "definition": {"name": "def", "id": "3"},
            "sourceVersion": {"id": "c1"},
            "version": {"id": "4"},
            "artifactSourceVersionUrl": {"id": "url"}
        })
    }

    async fn artifacts_for(body: Value) -> Result<Vec<Artifact>> {
        let executor = FakeExecutor::new().respond(RELEASE_PATH, &[("api-version", "7.1")], body);
        list_artifact_metadata(&executor, "proj", 1).await
    }

    #[tokio::test]
    async fn test_decodes_artifact() {
        let artifacts = artifacts_for(json!({
            "artifacts": [{"alias": "a", "definitionReference": full_reference()}]
        }))
        .await
        .unwrap();

        assert_eq!(
            artifacts,
            vec![Artifact {
                alias: "a".to_string(),
                branch_name: "refs/heads/main".to_string(),
                branch_id: "1".to_string(),
                repository_name: "repo".to_string(),
                repository_id: "2".to_string(),
                definition_name: "def".to_string(),
                definition_id: "3".to_string(),
                commit_id: "c1".to_string(),
                build_id: 4,
                build_url: "url".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_alias_defaults_to_unknown() {
        let artifacts = artifacts_for(json!({
            "artifacts": [{"definitionReference": full_reference()}]
        }))
        .await
        .unwrap();

        assert_eq!(artifacts[0].alias, "unknown");
    }

    #[tokio::test]
    async fn test_empty_artifact_list_is_malformed() {
        let err = artifacts_for(json!({"artifacts": []})).await.unwrap_err();
        assert!(matches!(err, LeadTimeError::MalformedData { release_id: 1, .. }));
    }

    #[tokio::test]
    async fn test_each_missing_reference_voids_the_release() {
        for field in [
            "branch",
            "repository",
            "definition",
            "sourceVersion",
            "version",
            "artifactSourceVersionUrl",
        ] {
            let mut reference = full_reference();
            let _ = reference.as_object_mut().unwrap().remove(field);

            let err = artifacts_for(json!({
                "artifacts": [
                    {"alias": "good", "definitionReference": full_reference()},
                    {"alias": "bad", "definitionReference": reference}
                ]
            }))
            .await
            .unwrap_err();

            assert!(
                matches!(err, LeadTimeError::MalformedData { release_id: 1, .. }),
                "missing {field} should void the release"
            );
        }
    }

    #[tokio::test]
    async fn test_empty_reference_is_malformed() {
        let err = artifacts_for(json!({
            "artifacts": [{"alias": "a", "definitionReference": {}}]
        }))
        .await
        .unwrap_err();
        assert!(matches!(err, LeadTimeError::MalformedData { .. }));
    }

    #[tokio::test]
    async fn test_non_numeric_build_id_is_malformed() {
        let mut reference = full_reference();
        reference["version"] = json!({"id": "20210101.3"});

        let err = artifacts_for(json!({
            "artifacts": [{"alias": "a", "definitionReference": reference}]
        }))
        .await
        .unwrap_err();
        assert!(err.to_string().contains("20210101.3"));
    }
}
