//! HTTP client for an external retrieval service.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::types::{Retriever, ScoredPassage};
use ragline_core::{Error, Result};

/// Retriever backed by a remote search endpoint.
///
/// Sends `{"query": ..., "k": ...}` and expects a JSON array of passages
/// ordered by relevance.
pub struct RemoteRetriever {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteRetriever {
    pub fn new(client: Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

impl Retriever for RemoteRetriever {
    fn query<'a>(&'a self, text: &'a str, k: usize) -> BoxFuture<'a, Result<Vec<ScoredPassage>>> {
        Box::pin(async move {
            debug!("Querying retriever at {} (k={})", self.endpoint, k);

            let request = async {
                let response = self
                    .client
                    .post(&self.endpoint)
                    .json(&json!({ "query": text, "k": k }))
                    .send()
                    .await
                    .map_err(|e| Error::Retrieval(format!("request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::Retrieval(format!(
                        "retriever returned {}: {}",
                        status, body
                    )));
                }

                response
                    .json::<Vec<ScoredPassage>>()
                    .await
                    .map_err(|e| Error::Retrieval(format!("bad response body: {}", e)))
            };

            match tokio::time::timeout(self.timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout("retriever")),
            }
        })
    }
}
