//! Minimal Cosmos DB REST session: signed requests for databases,
//! containers, documents and single-partition queries.

use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use chatvault_types::error::StoreError;

use super::auth::{MasterKey, http_date};

/// REST API version sent with every request.
pub const API_VERSION: &str = "2018-12-31";

const HEADER_DATE: &str = "x-ms-date";
const HEADER_VERSION: &str = "x-ms-version";
const HEADER_PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
const HEADER_UPSERT: &str = "x-ms-documentdb-is-upsert";
const HEADER_IS_QUERY: &str = "x-ms-documentdb-isquery";
const HEADER_CONTINUATION: &str = "x-ms-continuation";
const QUERY_CONTENT_TYPE: &str = "application/query+json";

/// Parameterized SQL query body.
#[derive(Debug, Clone, Serialize)]
pub struct SqlQuery {
    pub query: String,
    pub parameters: Vec<SqlParameter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

impl SqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.push(SqlParameter {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }
}

#[derive(Deserialize)]
struct QueryPage {
    #[serde(rename = "Documents", default)]
    documents: Vec<Value>,
}

/// Addresses one container of one database.
///
/// Does NOT derive Debug: it owns the decoded master key.
pub struct CosmosSession {
    http: reqwest::Client,
    endpoint: String,
    key: MasterKey,
    database: String,
    container: String,
}

impl CosmosSession {
    pub fn new(
        endpoint: &str,
        key: &SecretString,
        database: &str,
        container: &str,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: MasterKey::decode(key)?,
            database: database.to_string(),
            container: container.to_string(),
        })
    }

    fn container_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.container)
    }

    fn document_link(&self, id: &str) -> String {
        format!("{}/docs/{id}", self.container_link())
    }

    /// Start a signed request. `path` is the URL path; `resource_link` is
    /// the link the signature covers.
    fn request(
        &self,
        method: Method,
        path: &str,
        resource_type: &str,
        resource_link: &str,
    ) -> Result<RequestBuilder, StoreError> {
        let date = http_date(Utc::now());
        let authorization = self
            .key
            .authorization(method.as_str(), resource_type, resource_link, &date)?;

        Ok(self
            .http
            .request(method, format!("{}/{path}", self.endpoint))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(HEADER_DATE, date)
            .header(HEADER_VERSION, API_VERSION))
    }

    /// Path for a document, with the id percent-encoded for the URL.
    fn document_path(&self, id: &str) -> String {
        format!("{}/docs/{}", self.container_link(), urlencoding::encode(id))
    }

    /// Create the database if absent. A conflict means it already exists.
    pub async fn ensure_database(&self) -> Result<(), StoreError> {
        let response = send(
            self.request(Method::POST, "dbs", "dbs", "")?
                .json(&json!({ "id": self.database })),
        )
        .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!(database = %self.database, "Database already exists");
            return Ok(());
        }
        check(response).await?;
        debug!(database = %self.database, "Database created");
        Ok(())
    }

    /// Create the container partitioned on `partition_path` if absent.
    ///
    /// `indexing_policy` only applies to a newly created container; an
    /// existing container keeps its own policy.
    pub async fn ensure_container(
        &self,
        partition_path: &str,
        indexing_policy: &Value,
    ) -> Result<(), StoreError> {
        let link = format!("dbs/{}", self.database);
        let body = json!({
            "id": self.container,
            "partitionKey": { "paths": [partition_path], "kind": "Hash" },
            "indexingPolicy": indexing_policy,
        });
        let response = send(
            self.request(Method::POST, &format!("{link}/colls"), "colls", &link)?
                .json(&body),
        )
        .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!(container = %self.container, "Container already exists");
            return Ok(());
        }
        check(response).await?;
        debug!(container = %self.container, "Container created");
        Ok(())
    }

    /// Insert or replace a document in `partition_key`. Returns the stored
    /// document, system properties included.
    pub async fn upsert_document(&self, partition_key: &str, doc: &Value) -> Result<Value, StoreError> {
        let link = self.container_link();
        let response = send(
            self.request(Method::POST, &format!("{link}/docs"), "docs", &link)?
                .header(HEADER_PARTITION_KEY, partition_header(partition_key)?)
                .header(HEADER_UPSERT, "True")
                .json(doc),
        )
        .await?;

        json_body(check(response).await?).await
    }

    /// Point read. `None` when the partition has no document with `id`.
    pub async fn read_document(&self, partition_key: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let response = send(
            self.request(Method::GET, &self.document_path(id), "docs", &self.document_link(id))?
                .header(HEADER_PARTITION_KEY, partition_header(partition_key)?),
        )
        .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        json_body(check(response).await?).await.map(Some)
    }

    /// Delete a document. Returns `false` when it was already absent.
    pub async fn delete_document(&self, partition_key: &str, id: &str) -> Result<bool, StoreError> {
        let response = send(
            self.request(Method::DELETE, &self.document_path(id), "docs", &self.document_link(id))?
                .header(HEADER_PARTITION_KEY, partition_header(partition_key)?),
        )
        .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await?;
        Ok(true)
    }

    /// Run a query inside one partition, following continuation tokens.
    ///
    /// Stops paginating once `max_items` documents have been collected and
    /// truncates the result to that count.
    pub async fn query_documents(
        &self,
        partition_key: &str,
        query: &SqlQuery,
        max_items: Option<usize>,
    ) -> Result<Vec<Value>, StoreError> {
        let link = self.container_link();
        let path = format!("{link}/docs");
        let body = serde_json::to_vec(query).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut documents = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::POST, &path, "docs", &link)?
                .header(HEADER_PARTITION_KEY, partition_header(partition_key)?)
                .header(HEADER_IS_QUERY, "True")
                .header(CONTENT_TYPE, QUERY_CONTENT_TYPE)
                .body(body.clone());
            if let Some(token) = &continuation {
                request = request.header(HEADER_CONTINUATION, token);
            }

            let response = check(send(request).await?).await?;
            continuation = continuation_token(response.headers());
            let page: QueryPage = response
                .json()
                .await
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            debug!(page_size = page.documents.len(), more = continuation.is_some(), "Query page received");
            documents.extend(page.documents);

            if let Some(max) = max_items {
                if documents.len() >= max {
                    documents.truncate(max);
                    break;
                }
            }
            if continuation.is_none() {
                break;
            }
        }

        Ok(documents)
    }
}

/// Partition key header value: a JSON array holding the key.
fn partition_header(partition_key: &str) -> Result<String, StoreError> {
    serde_json::to_string(&[partition_key]).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn continuation_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HEADER_CONTINUATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
    request
        .send()
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
}

/// Map non-success statuses to typed errors.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StoreError::Unauthorized {
            status: status.as_u16(),
        });
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Remote {
        status: status.as_u16(),
        message,
    })
}

async fn json_body(response: Response) -> Result<Value, StoreError> {
    response
        .json()
        .await
        .map_err(|e| StoreError::Serialization(e.to_string()))
}
