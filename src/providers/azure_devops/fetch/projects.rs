use log::debug;
use serde::Deserialize;

use super::{get_json, ListResponse};
use crate::error::{LeadTimeError, ResourceKind, Result};
use crate::providers::azure_devops::client::QueryExecutor;
use crate::providers::azure_devops::types::{Project, ReleaseDefinition};

#[derive(Debug, Deserialize)]
struct RawProject {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDefinition {
    id: Option<u64>,
    name: Option<String>,
}

/// Finds the project whose name is exactly `name`.
///
/// # Errors
///
/// `NotFound` when no project carries that name, `Network` when the listing
/// itself fails.
pub async fn resolve_project<E: QueryExecutor>(executor: &E, name: &str) -> Result<Project> {
    let params = [("api-version", executor.api_version().to_string())];
    let projects: ListResponse<RawProject> =
        get_json(executor, "/_apis/projects", &params, || "project list".to_string()).await?;

    debug!("Scanning {} projects for '{name}'", projects.value.len());

    projects
        .value
        .into_iter()
        .find_map(|project| match (project.id, project.name) {
            (Some(id), Some(project_name)) if project_name == name => Some(Project {
                id,
                name: project_name,
            }),
            _ => None,
        })
        .ok_or_else(|| LeadTimeError::NotFound {
            kind: ResourceKind::Project,
            name: name.to_string(),
        })
}

/// Finds the release definition named exactly `name` within a project.
///
/// The server-side `searchText` filter is a substring match, so results are
/// re-checked for equality.
///
/// # Errors
///
/// `NotFound` when no definition carries that name, `Network` when the search
/// fails.
pub async fn resolve_release_definition<E: QueryExecutor>(
    executor: &E,
    project_id: &str,
    name: &str,
) -> Result<ReleaseDefinition> {
    let path = format!("/{project_id}/_apis/release/definitions");
    let params = [
        ("api-version", executor.api_version().to_string()),
        ("searchText", name.to_string()),
    ];
    let definitions: ListResponse<RawDefinition> = get_json(executor, &path, &params, || {
        format!("release definitions matching '{name}'")
    })
    .await?;

    definitions
        .value
        .into_iter()
        .find_map(|definition| match (definition.id, definition.name) {
            (Some(id), Some(definition_name)) if definition_name == name => {
                Some(ReleaseDefinition {
                    id,
                    name: definition_name,
                })
            }
            _ => None,
        })
        .ok_or_else(|| LeadTimeError::NotFound {
            kind: ResourceKind::ReleaseDefinition,
            name: name.to_string(),
        })
}
