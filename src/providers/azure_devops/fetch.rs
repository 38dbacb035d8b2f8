//! Single-query fetch functions for the Azure DevOps resources the lead-time
//! traversal walks through.
//!
//! Each function issues one logical request through a [`QueryExecutor`] and
//! decodes the response into the entities in [`super::types`]. Nothing here
//! knows about the order in which the traversal calls them.

mod git;
mod projects;
mod releases;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::client::{QueryExecutor, QueryParams};
use crate::error::{LeadTimeError, Result};

pub use git::{find_completed_pr_for_commit, get_commit_date, oldest_commit_in_pr};
pub use projects::{resolve_project, resolve_release_definition};
pub use releases::{list_active_release_environments, list_artifact_metadata};

/// Envelope used by every Azure DevOps list endpoint.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// Issues a query and decodes the body, attributing any failure to `context`.
async fn get_json<E, T>(
    executor: &E,
    path: &str,
    params: &QueryParams<'_>,
    context: impl Fn() -> String,
) -> Result<T>
where
    E: QueryExecutor,
    T: DeserializeOwned,
{
    let body = executor
        .execute_query(path, params)
        .await
        .map_err(|e| LeadTimeError::network(context(), e))?;

    serde_json::from_value(body).map_err(|e| LeadTimeError::network(context(), e.into()))
}
