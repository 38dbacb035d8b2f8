use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::client::{QueryExecutor, QueryParams};
use crate::error::TransportError;

type Key = (String, Vec<(String, String)>);

enum Canned {
    Body(Value),
    Status(u16),
}

/// In-memory executor answering from canned responses keyed by path and
/// sorted query parameters. Unknown requests answer 404.
pub struct FakeExecutor {
    api_version: String,
    responses: HashMap<Key, Canned>,
    calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            api_version: "7.1".to_string(),
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, path: &str, params: &[(&str, &str)], body: Value) -> Self {
        let _ = self.responses.insert(key(path, params), Canned::Body(body));
        self
    }

    pub fn fail(mut self, path: &str, params: &[(&str, &str)], status: u16) -> Self {
        let _ = self.responses.insert(key(path, params), Canned::Status(status));
        self
    }

    /// Paths requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn key(path: &str, params: &[(&str, &str)]) -> Key {
    let mut params: Vec<_> = params
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    params.sort();
    (path.to_string(), params)
}

impl QueryExecutor for FakeExecutor {
    fn api_version(&self) -> &str {
        &self.api_version
    }

    async fn execute_query(
        &self,
        path: &str,
        params: &QueryParams<'_>,
    ) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(path.to_string());

        let borrowed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        match self.responses.get(&key(path, &borrowed)) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status)) => Err(TransportError::Status {
                status: *status,
                message: "canned failure".to_string(),
            }),
            None => Err(TransportError::Status {
                status: 404,
                message: format!("no canned response for {path} {borrowed:?}"),
            }),
        }
    }
}
