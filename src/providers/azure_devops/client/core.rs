use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{QueryExecutor, QueryParams};
use crate::auth::Token;
use crate::error::{LeadTimeError, Result, TransportError};

/// HTTP transport for one Azure DevOps service root.
///
/// Azure DevOps splits its REST surface across hosts: projects and git live
/// under `dev.azure.com/<org>`, release management under
/// `vsrm.dev.azure.com/<org>`. One client is built per root.
pub struct AzureDevOpsClient {
    client: Client,
    base_url: Url,
    api_version: String,
    token: Token,
}

impl AzureDevOpsClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, api_version: &str, token: Token, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!("ado-leadtime/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| LeadTimeError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| LeadTimeError::Config(format!("Invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_version: api_version.to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends an API path to the service root, keeping any organisation
    /// segment already present in the base URL.
    fn endpoint(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))
    }
}

impl QueryExecutor for AzureDevOpsClient {
    fn api_version(&self) -> &str {
        &self.api_version
    }

    async fn execute_query(
        &self,
        path: &str,
        params: &QueryParams<'_>,
    ) -> std::result::Result<Value, TransportError> {
        let url = self.endpoint(path)?;

        debug!("GET {url} {params:?}");

        let response = self
            .client
            .get(url)
            .basic_auth("", Some(self.token.as_str()))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> AzureDevOpsClient {
        AzureDevOpsClient::new(
            &format!("{}/my-org", server.url()),
            "7.1",
            Token::from("secret-pat"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let result =
            AzureDevOpsClient::new("not a url", "7.1", Token::from("t"), Duration::from_secs(1));
        assert!(matches!(result, Err(LeadTimeError::Config(_))));
    }

    #[tokio::test]
    async fn test_sends_basic_auth_and_query() {
        let mut server = mockito::Server::new_async().await;
        // base64(":secret-pat")
        let mock = server
            .mock("GET", "/my-org/_apis/projects")
            .match_header("authorization", "Basic OnNlY3JldC1wYXQ=")
            .match_query(Matcher::UrlEncoded("api-version".into(), "7.1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value": [{"id": "p-1", "name": "One"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let body = client
            .execute_query("/_apis/projects", &[("api-version", "7.1".to_string())])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body["value"][0]["name"], "One");
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/my-org/_apis/projects")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .execute_query("/_apis/projects", &[("api-version", "7.1".to_string())])
            .await
            .unwrap_err();

        match err {
            TransportError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "unauthorized");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/my-org/_apis/projects")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>sign in</html>")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .execute_query("/_apis/projects", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Decode(_)));
        assert!(!err.is_retryable());
    }
}
