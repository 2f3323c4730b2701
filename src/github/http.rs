//! GitHub API transport
//!
//! Thin wrapper around reqwest providing authenticated REST and GraphQL
//! requests with shared status-code handling. Per-request timeouts live
//! here; callers higher up only propagate cancellation.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GitHubError;

const API_BASE_URL: &str = "https://api.github.com";
const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Default timeout for API requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("ghpin/", env!("CARGO_PKG_VERSION"));

/// Authenticated HTTP client for the GitHub REST and GraphQL APIs.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    token: String,
}

impl ApiClient {
    /// Create a client that sends the given token as a bearer
    /// credential on every request.
    pub fn new(token: impl Into<String>) -> Result<Self, GitHubError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| GitHubError::Transport {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    /// GET a REST endpoint (path relative to the API root) and decode
    /// the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        let url = format!("{API_BASE_URL}{path}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| GitHubError::Transport {
                message: e.to_string(),
            })?;
        let response = check_status(response)?;
        response
            .json::<T>()
            .await
            .map_err(|e| GitHubError::InvalidResponse {
                message: e.to_string(),
            })
    }

    /// Execute a GraphQL query and decode the `data` payload.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, GitHubError> {
        let request = GraphqlRequest { query, variables };
        let response = self
            .client
            .post(GRAPHQL_URL)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| GitHubError::Transport {
                message: e.to_string(),
            })?;
        let response = check_status(response)?;
        let envelope: GraphqlResponse =
            response
                .json()
                .await
                .map_err(|e| GitHubError::InvalidResponse {
                    message: e.to_string(),
                })?;
        if !envelope.errors.is_empty() {
            let message = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GitHubError::GraphQl { message });
        }
        serde_json::from_value(envelope.data.unwrap_or(Value::Null)).map_err(|e| {
            GitHubError::InvalidResponse {
                message: e.to_string(),
            }
        })
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(GitHubError::InvalidAuthToken),
        StatusCode::FORBIDDEN => Err(GitHubError::AccessDenied),
        status if status.is_client_error() || status.is_server_error() => {
            Err(GitHubError::Http {
                status: status.as_u16(),
            })
        }
        _ => Ok(response),
    }
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}
