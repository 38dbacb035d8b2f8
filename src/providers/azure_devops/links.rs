use url::Url;

/// Web URL of a release's progress page.
///
/// # Arguments
///
/// * `organization_url` - Organisation root (e.g., <https://dev.azure.com/contoso>)
/// * `project` - Project name, percent-encoded as needed
/// * `release_id` - Numeric release id
///
/// # Returns
///
/// e.g. <https://dev.azure.com/contoso/One/_releaseProgress?_a=release-pipeline-progress&releaseId=42>
pub fn release_url(organization_url: &Url, project: &str, release_id: u64) -> String {
    let mut url = with_segments(organization_url, &[project, "_releaseProgress"]);
    url.query_pairs_mut()
        .append_pair("_a", "release-pipeline-progress")
        .append_pair("releaseId", &release_id.to_string());
    url.to_string()
}

/// Web URL of a pull request.
///
/// e.g. <https://dev.azure.com/contoso/One/_git/api/pullrequest/7>
pub fn pull_request_url(
    organization_url: &Url,
    project: &str,
    repository: &str,
    pull_request_id: u64,
) -> String {
    with_segments(
        organization_url,
        &[project, "_git", repository, "pullrequest", &pull_request_id.to_string()],
    )
    .to_string()
}

fn with_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
