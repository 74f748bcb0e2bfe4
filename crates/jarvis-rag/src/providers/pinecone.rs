//! Pinecone serverless vector store
//!
//! The control plane (`api.pinecone.io`) is used to describe or create the
//! index and learn its data-plane host; every vector operation then goes to
//! that host. Nothing here retries: transport failures surface as
//! [`Error::Network`], a missing index as [`Error::IndexNotFound`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};

use super::vector_store::{
    IndexStats, MetadataFilter, StoredVector, VectorMatch, VectorRecord, VectorStoreProvider,
};

/// Ids per delete or fetch request
const ID_BATCH_SIZE: usize = 100;

/// Page size for `/vectors/list`
const LIST_PAGE_SIZE: usize = 100;

/// Polls of the control plane while a new index comes up
const READY_POLL_ATTEMPTS: u32 = 60;

/// Pinecone vector store client
pub struct PineconeVectorStore {
    client: Client,
    index_name: String,
    host: String,
    dimension: usize,
    upsert_batch_size: usize,
}

impl PineconeVectorStore {
    /// Connect to an existing index
    ///
    /// When `config.host` is unset the host is looked up on the control plane,
    /// which also verifies that the index dimension matches the embedder.
    pub async fn connect(config: &VectorDbConfig, dimension: usize) -> Result<Self> {
        let client = build_client(config)?;

        let host = match &config.host {
            Some(host) => host.clone(),
            None => {
                let description = describe_index(&client, config)
                    .await?
                    .ok_or_else(|| Error::IndexNotFound(config.index_name.clone()))?;
                if description.dimension != dimension {
                    return Err(Error::DimensionMismatch {
                        expected: description.dimension,
                        actual: dimension,
                    });
                }
                description.host
            }
        };

        tracing::info!(
            index = %config.index_name,
            host = %host,
            "Connected to Pinecone index"
        );

        Ok(Self {
            client,
            index_name: config.index_name.clone(),
            host: normalize_host(&host),
            dimension,
            upsert_batch_size: config.upsert_batch_size.max(1),
        })
    }

    /// Create the configured serverless index unless it already exists
    ///
    /// Returns `true` when a new index was created. Waits until the control
    /// plane reports the index ready.
    pub async fn create_index_if_missing(
        config: &VectorDbConfig,
        dimension: usize,
    ) -> Result<bool> {
        let client = build_client(config)?;

        if describe_index(&client, config).await?.is_some() {
            tracing::info!(index = %config.index_name, "Pinecone index already exists");
            return Ok(false);
        }

        tracing::info!(
            index = %config.index_name,
            dimension,
            cloud = %config.cloud,
            region = %config.region,
            "Creating Pinecone index"
        );

        let request = CreateIndexRequest {
            name: &config.index_name,
            dimension,
            metric: &config.metric,
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &config.cloud,
                    region: &config.region,
                },
            },
        };

        let response = client
            .post(format!("{}/indexes", config.control_plane_url))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() != StatusCode::CONFLICT {
            check_status(response, &config.index_name).await?;
        }

        for _ in 0..READY_POLL_ATTEMPTS {
            if let Some(description) = describe_index(&client, config).await? {
                if description.status.map_or(false, |s| s.ready) {
                    tracing::info!(index = %config.index_name, "Pinecone index is ready");
                    return Ok(true);
                }
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        Err(Error::vector_db(format!(
            "Index {} was created but did not become ready",
            config.index_name
        )))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: len,
            });
        }
        Ok(())
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, &self.index_name).await
    }

    /// Page through `/vectors/list`, optionally restricted to an id prefix
    async fn list_ids(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut token: Option<String> = None;
        let limit = LIST_PAGE_SIZE.to_string();

        loop {
            let mut params: Vec<(&str, &str)> = vec![("limit", limit.as_str())];
            if let Some(prefix) = prefix {
                params.push(("prefix", prefix));
            }
            if let Some(token) = token.as_deref() {
                params.push(("paginationToken", token));
            }

            let response = self
                .client
                .get(self.url("/vectors/list"))
                .query(&params)
                .send()
                .await
                .map_err(transport_error)?;
            let page: ListResponse = check_status(response, &self.index_name)
                .await?
                .json()
                .await
                .map_err(transport_error)?;

            ids.extend(page.vectors.into_iter().map(|v| v.id));

            match page.pagination.and_then(|p| p.next) {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        Ok(ids)
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<StoredVector>> {
        let mut stored = Vec::with_capacity(ids.len());

        for batch in ids.chunks(ID_BATCH_SIZE) {
            let params: Vec<(&str, &str)> = batch.iter().map(|id| ("ids", id.as_str())).collect();
            let response = self
                .client
                .get(self.url("/vectors/fetch"))
                .query(&params)
                .send()
                .await
                .map_err(transport_error)?;
            let fetched: FetchResponse = check_status(response, &self.index_name)
                .await?
                .json()
                .await
                .map_err(transport_error)?;

            // Keep the caller's id order
            let mut by_id = fetched.vectors;
            stored.extend(batch.iter().filter_map(|id| by_id.remove(id)));
        }

        Ok(stored)
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeVectorStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        for record in records {
            self.check_dimension(record.values.len())?;
        }

        for (batch_index, batch) in records.chunks(self.upsert_batch_size).enumerate() {
            self.post("/vectors/upsert", &UpsertRequest { vectors: batch })
                .await?;
            tracing::debug!(
                batch = batch_index,
                vectors = batch.len(),
                "Upserted batch to Pinecone"
            );
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        self.check_dimension(vector.len())?;

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };
        let response: QueryResponse = self
            .post("/query", &request)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        let mut matches = response.matches;
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        for batch in ids.chunks(ID_BATCH_SIZE) {
            self.post("/vectors/delete", &serde_json::json!({ "ids": batch }))
                .await?;
        }
        Ok(())
    }

    /// Serverless indexes reject metadata-filtered deletes, so chunk ids are
    /// listed by the document prefix instead.
    async fn delete_by_filter(&self, filter: &MetadataFilter) -> Result<usize> {
        let MetadataFilter::DocumentId(document_id) = filter;
        let prefix = format!("{}_", document_id);

        let ids: Vec<String> = self
            .list_ids(Some(&prefix))
            .await?
            .into_iter()
            .filter(|id| is_chunk_of(id, document_id))
            .collect();

        if !ids.is_empty() {
            self.delete(&ids).await?;
        }

        tracing::debug!(document_id = %document_id, deleted = ids.len(), "Deleted document chunks");
        Ok(ids.len())
    }

    async fn list_all(&self) -> Result<Vec<StoredVector>> {
        let ids = self.list_ids(None).await?;
        self.fetch(&ids).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.post("/vectors/delete", &serde_json::json!({ "deleteAll": true }))
            .await?;
        tracing::info!(index = %self.index_name, "Deleted all vectors");
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let stats: DescribeStatsResponse = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        Ok(IndexStats {
            total_vectors: stats.total_vector_count,
            dimension: if stats.dimension == 0 {
                self.dimension
            } else {
                stats.dimension
            },
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.stats().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(error = %e, "Pinecone health check failed");
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

fn build_client(config: &VectorDbConfig) -> Result<Client> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::config("PINECONE_API_KEY is not set"))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        "Api-Key",
        HeaderValue::from_str(api_key)
            .map_err(|_| Error::config("PINECONE_API_KEY contains invalid characters"))?,
    );
    headers.insert(
        "X-Pinecone-API-Version",
        HeaderValue::from_str(&config.api_version)
            .map_err(|_| Error::config("invalid Pinecone API version"))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

async fn describe_index(
    client: &Client,
    config: &VectorDbConfig,
) -> Result<Option<IndexDescription>> {
    let response = client
        .get(format!("{}/indexes/{}", config.control_plane_url, config.index_name))
        .send()
        .await
        .map_err(transport_error)?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let description = check_status(response, &config.index_name)
        .await?
        .json()
        .await
        .map_err(transport_error)?;
    Ok(Some(description))
}

async fn check_status(response: Response, index_name: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(Error::IndexNotFound(index_name.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::vector_db(format!("Pinecone returned {}: {}", status, body)))
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::Network(e.to_string())
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Whether `id` is `{document_id}_{ordinal}` for exactly this document
fn is_chunk_of(id: &str, document_id: &str) -> bool {
    id.strip_prefix(document_id)
        .and_then(|rest| rest.strip_prefix('_'))
        .map_or(false, |ordinal| {
            !ordinal.is_empty() && ordinal.bytes().all(|b| b.is_ascii_digit())
        })
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    dimension: usize,
    host: String,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedId>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedId {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    next: Option<String>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, StoredVector>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    total_vector_count: usize,
}
