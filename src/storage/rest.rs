//! Hosted table store over its PostgREST HTTP interface.
//!
//! Tables live under `{base}/rest/v1/{table}`. Every request carries the
//! service key in both the `apikey` and `Authorization` headers.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{StoreError, StoreGateway, StoreResult};
use crate::domain::{EmbeddingRecord, Post, PostId, StoredEmbedding, MEAN_EMBEDDING_LABEL};

/// Table holding token, mean and post-linked vectors.
pub const EMBEDDINGS_TABLE: &str = "embeddings";
/// Table holding blog posts.
pub const POSTS_TABLE: &str = "posts";

/// Rows requested per page on full-table reads.
const PAGE_SIZE: usize = 1000;

/// Sort keys for paged reads. Both are unique per table.
const EMBEDDINGS_ORDER: &str = "content.asc";
const POSTS_ORDER: &str = "id.asc";

const PREFER: &str = "prefer";
const API_KEY: &str = "apikey";

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    details: Option<String>,
}

/// Store gateway for the hosted backend.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base: Url,
}

impl RestStore {
    /// Creates a gateway for the project at `url`, authenticated with
    /// `service_key`.
    pub fn new(url: &str, service_key: &str) -> StoreResult<Self> {
        Self::with_builder(url, service_key, reqwest::Client::builder())
    }

    fn with_builder(
        url: &str,
        service_key: &str,
        builder: reqwest::ClientBuilder,
    ) -> StoreResult<Self> {
        let base = rest_base(url)?;
        let client = builder
            .default_headers(auth_headers(service_key)?)
            .build()?;
        Ok(Self { client, base })
    }

    /// Returns the endpoint for `table`.
    pub fn table_url(&self, table: &str) -> StoreResult<Url> {
        self.base
            .join(table)
            .map_err(|e| StoreError::InvalidUrl(e.to_string()))
    }

    /// Reads every row of `table` matching `filters`, one page at a time.
    ///
    /// Pages are sorted by `order` so offsets stay stable between requests.
    /// The server may cap a page below `PAGE_SIZE`, so only an empty page
    /// ends the scan.
    async fn select_all<T>(
        &self,
        table: &str,
        order: &str,
        filters: &[(&str, String)],
    ) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.table_url(table)?;
        let mut rows = Vec::new();

        loop {
            let response = self
                .client
                .get(url.clone())
                .query(&[("select", "*"), ("order", order)])
                .query(filters)
                .query(&[("limit", PAGE_SIZE), ("offset", rows.len())])
                .send()
                .await?;
            let page: Vec<T> = read_json(response).await?;
            if page.is_empty() {
                break;
            }
            rows.extend(page);
        }

        tracing::debug!(table, count = rows.len(), "Fetched rows");
        Ok(rows)
    }

    async fn send_minimal(&self, request: RequestBuilder) -> StoreResult<()> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(handle_error_response(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl StoreGateway for RestStore {
    async fn upsert_embeddings(&self, records: &[EmbeddingRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let request = self
            .client
            .post(self.table_url(EMBEDDINGS_TABLE)?)
            .query(&[("on_conflict", "content")])
            .header(
                PREFER,
                HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
            )
            .json(records);
        self.send_minimal(request).await
    }

    async fn fetch_embeddings(&self) -> StoreResult<Vec<StoredEmbedding>> {
        self.select_all(EMBEDDINGS_TABLE, EMBEDDINGS_ORDER, &[]).await
    }

    async fn fetch_candidate_embeddings(&self) -> StoreResult<Vec<StoredEmbedding>> {
        let filters = [
            ("post_id", "not.is.null".to_string()),
            ("embedding", "not.is.null".to_string()),
            ("content", format!("neq.{}", MEAN_EMBEDDING_LABEL)),
        ];
        self.select_all(EMBEDDINGS_TABLE, EMBEDDINGS_ORDER, &filters)
            .await
    }

    async fn fetch_posts(&self) -> StoreResult<Vec<Post>> {
        self.select_all(POSTS_TABLE, POSTS_ORDER, &[]).await
    }

    async fn fetch_posts_by_ids(&self, ids: &[PostId]) -> StoreResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select_all(POSTS_TABLE, POSTS_ORDER, &[("id", in_filter(ids))])
            .await
    }

    async fn update_post_embedding(&self, id: &PostId, embedding: &[f32]) -> StoreResult<()> {
        let request = self
            .client
            .patch(self.table_url(POSTS_TABLE)?)
            .query(&[("id", eq_filter(id))])
            .header(PREFER, HeaderValue::from_static("return=minimal"))
            .json(&json!({ "embedding": embedding }));
        self.send_minimal(request).await
    }
}

/// Resolves the REST root for a project URL.
fn rest_base(url: &str) -> StoreResult<Url> {
    let mut base = Url::parse(url.trim()).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("rest/v1/")
        .map_err(|e| StoreError::InvalidUrl(e.to_string()))
}

fn auth_headers(service_key: &str) -> StoreResult<HeaderMap> {
    let invalid = |_| StoreError::InvalidKey;
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(API_KEY, HeaderValue::from_str(service_key).map_err(invalid)?);
    let mut bearer =
        HeaderValue::from_str(&format!("Bearer {}", service_key)).map_err(invalid)?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

/// `in.(...)` filter matching any of `ids`.
fn in_filter(ids: &[PostId]) -> String {
    let literals: Vec<String> = ids.iter().map(PostId::filter_literal).collect();
    format!("in.({})", literals.join(","))
}

/// `eq.` filter matching `id`.
fn eq_filter(id: &PostId) -> String {
    format!("eq.{}", id)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    if !response.status().is_success() {
        return Err(handle_error_response(response).await);
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

async fn handle_error_response(response: Response) -> StoreError {
    let status = response.status().as_u16();

    if let Ok(error) = response.json::<PostgrestError>().await {
        let message = match error.details {
            Some(details) if !details.is_empty() => format!("{} ({})", error.message, details),
            _ => error.message,
        };
        return StoreError::Api { status, message };
    }

    StoreError::Api {
        status,
        message: format!("HTTP {}", status),
    }
}
