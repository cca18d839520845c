//! Generic GraphQL transport
//!
//! One POST endpoint, `{query, variables}` in, `{data, errors?}` out. Both
//! remote APIs report some failures as HTTP 200 with an `errors` payload, so
//! the payload is checked on every response before `data` is decoded.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

const USER_AGENT: &str = concat!("byelinear/", env!("CARGO_PKG_VERSION"));

/// Request envelope
#[derive(Debug, Serialize)]
struct GraphQLRequest<'a, V: ?Sized> {
    query: &'a str,
    variables: &'a V,
}

/// Response envelope, decoded loosely so `errors` can be checked first
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error entry
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default)]
    pub locations: Vec<ErrorLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: u32,
}

/// Stateless client for a single GraphQL endpoint
#[derive(Clone)]
pub struct GraphQLClient {
    http: reqwest::Client,
    endpoint: String,
    authorization: Option<String>,
}

impl GraphQLClient {
    /// Create a client for `endpoint` with no authorization header
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            authorization: None,
        }
    }

    /// Send `value` verbatim as the `Authorization` header
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Send `Authorization: Bearer <token>`
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_authorization(format!("Bearer {}", token))
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a query and decode its `data` into `T`
    pub async fn query<V, T>(&self, query: &str, variables: &V) -> Result<T>
    where
        V: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(query, variables).await?;
        decode_response(&body)
    }

    /// Execute a mutation whose result is not needed
    pub async fn mutate<V>(&self, query: &str, variables: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        self.query::<V, IgnoredAny>(query, variables).await.map(|_| ())
    }

    async fn send<V>(&self, query: &str, variables: &V) -> Result<Vec<u8>>
    where
        V: Serialize + ?Sized,
    {
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&GraphQLRequest { query, variables });
        if let Some(auth) = &self.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;

        if let Some(complexity) = response.headers().get("x-complexity") {
            debug!(
                endpoint = %self.endpoint,
                complexity = complexity.to_str().unwrap_or("?"),
                "GraphQL query complexity"
            );
        }

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes.to_vec())
    }
}

impl std::fmt::Debug for GraphQLClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Decode a response body, turning an `errors` payload into an error
pub fn decode_response<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let response: GraphQLResponse = serde_json::from_slice(body)?;

    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<String> = errors
            .iter()
            .map(|e| match e.locations.first() {
                Some(loc) => format!("{} (line {}, column {})", e.message, loc.line, loc.column),
                None => e.message.clone(),
            })
            .collect();
        return Err(Error::GraphQL(messages.join(", ")));
    }

    let data = response
        .data
        .ok_or_else(|| Error::GraphQL("response missing data".to_string()))?;
    Ok(serde_json::from_value(data)?)
}
