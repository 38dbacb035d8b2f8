mod core;
mod retry;

use serde_json::Value;

use crate::error::TransportError;

pub use self::core::AzureDevOpsClient;
pub use retry::RetryingExecutor;

pub const PULL_REQUEST_API_VERSION: &str = "7.1-preview.1";

/// Query parameters in the order they are sent.
pub type QueryParams<'a> = [(&'a str, String)];

/// Executes a single authenticated `GET` against one Azure DevOps service root
/// and returns the decoded JSON body.
///
/// Every fetch function is written against this trait so that transports can be
/// layered (see [`RetryingExecutor`]) or replaced in tests.
#[allow(async_fn_in_trait)]
pub trait QueryExecutor {
    /// Default `api-version` for this service root.
    fn api_version(&self) -> &str;

    async fn execute_query(
        &self,
        path: &str,
        params: &QueryParams<'_>,
    ) -> Result<Value, TransportError>;
}
