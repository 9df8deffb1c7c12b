//! PostgREST client for the hosted tables behind the sync overlay.
//!
//! One table per entity kind (`todos`, `budgets`, `transactions`, `wallets`,
//! `goals`), each row carrying the owning `username`.

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;

use leirad_core::models::EntityKind;
use leirad_core::sync::{RemoteClient, RemoteResult};

use crate::config::RemoteConfig;
use crate::error::{RemoteApiError, Result};

const MAX_LOG_BODY_CHARS: usize = 512;

/// Error body PostgREST returns on failure.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Client for the leirad REST backend.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteApiError::config(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(RemoteConfig::from_env()?)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Remote] API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Remote] API response error ({}): {}", status, preview);
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| RemoteApiError::invalid_request("Invalid API key format"))?;
        headers.insert("apikey", key);

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| RemoteApiError::invalid_request("Invalid API key format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/rest/v1/{}", self.base_url, kind.collection())
    }

    /// Listing order for each table.
    fn order(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Transaction => "date.desc",
            EntityKind::Wallet => "created_at.asc",
            EntityKind::Todo | EntityKind::Budget | EntityKind::Goal => "created_at.desc",
        }
    }

    fn id_filter(id: &str) -> String {
        format!("id=eq.{}", urlencoding::encode(id))
    }

    fn ids_filter(ids: &[String]) -> String {
        let quoted = ids
            .iter()
            .map(|id| format!("\"{}\"", id.replace('"', "")))
            .collect::<Vec<_>>()
            .join(",");
        format!("id=in.{}", urlencoding::encode(&format!("({})", quoted)))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                "[Remote] Failed to deserialize response. Body: {}, Error: {}",
                body, e
            );
            RemoteApiError::Json(e)
        })
    }

    /// Checks the status of a response whose body is not needed.
    async fn expect_success(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if status.is_success() {
            Ok(())
        } else {
            Err(Self::error_from_body(status.as_u16(), &body))
        }
    }

    fn error_from_body(status: u16, body: &str) -> RemoteApiError {
        match serde_json::from_str::<PostgrestError>(body) {
            Ok(PostgrestError {
                message,
                code: Some(code),
            }) => RemoteApiError::api(status, format!("{}: {}", code, message)),
            Ok(PostgrestError {
                message,
                code: None,
            }) => RemoteApiError::api(status, message),
            Err(_) => RemoteApiError::api(status, format!("Request failed: {}", body)),
        }
    }

    /// GET /rest/v1/{table}?select=*&username=eq.{username}&order=...
    pub async fn list_records(&self, kind: EntityKind, username: &str) -> Result<Vec<Value>> {
        let url = format!(
            "{}?select=*&username=eq.{}&order={}",
            self.table_url(kind),
            urlencoding::encode(username),
            Self::order(kind)
        );
        debug!("[Remote] list {} URL: {}", kind.collection(), url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// POST /rest/v1/{table} with `Prefer: return=representation`.
    ///
    /// The record keeps its client-chosen `id`; `username` is stamped on.
    pub async fn create_record(
        &self,
        kind: EntityKind,
        username: &str,
        record: Value,
    ) -> Result<Value> {
        let Value::Object(mut row) = record else {
            return Err(RemoteApiError::invalid_request(format!(
                "{} record must be a JSON object",
                kind
            )));
        };
        row.insert("username".to_string(), Value::String(username.to_string()));

        let response = self
            .client
            .post(self.table_url(kind))
            .headers(self.headers()?)
            .header("Prefer", "return=representation")
            .json(&Value::Array(vec![Value::Object(row)]))
            .send()
            .await?;

        let rows: Vec<Value> = Self::parse_response(response).await?;
        rows.into_iter().next().ok_or_else(|| {
            RemoteApiError::UnexpectedResponse(format!("create on {} returned no rows", kind))
        })
    }

    /// PATCH /rest/v1/{table}?{filter}
    async fn patch_where(&self, kind: EntityKind, filter: &str, patch: Value) -> Result<()> {
        let url = format!("{}?{}", self.table_url(kind), filter);
        let response = self
            .client
            .patch(&url)
            .headers(self.headers()?)
            .json(&patch)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    /// DELETE /rest/v1/{table}?{filter}
    async fn delete_where(&self, kind: EntityKind, filter: &str) -> Result<()> {
        let url = format!("{}?{}", self.table_url(kind), filter);
        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    pub async fn update_record(&self, kind: EntityKind, id: &str, patch: Value) -> Result<()> {
        self.patch_where(kind, &Self::id_filter(id), patch).await
    }

    pub async fn delete_record(&self, kind: EntityKind, id: &str) -> Result<()> {
        self.delete_where(kind, &Self::id_filter(id)).await
    }

    pub async fn update_records(&self, kind: EntityKind, ids: &[String], patch: Value) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.patch_where(kind, &Self::ids_filter(ids), patch).await
    }

    pub async fn delete_records(&self, kind: EntityKind, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.delete_where(kind, &Self::ids_filter(ids)).await
    }
}

#[async_trait]
impl RemoteClient for RestClient {
    async fn get_all(&self, kind: EntityKind, username: &str) -> RemoteResult<Vec<Value>> {
        Ok(self.list_records(kind, username).await?)
    }

    async fn create(&self, kind: EntityKind, username: &str, record: Value) -> RemoteResult<Value> {
        Ok(self.create_record(kind, username, record).await?)
    }

    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> RemoteResult<()> {
        Ok(self.update_record(kind, id, patch).await?)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> RemoteResult<()> {
        Ok(self.delete_record(kind, id).await?)
    }

    async fn bulk_delete(&self, kind: EntityKind, ids: &[String]) -> RemoteResult<()> {
        Ok(self.delete_records(kind, ids).await?)
    }

    async fn bulk_update(
        &self,
        kind: EntityKind,
        ids: &[String],
        patch: Value,
    ) -> RemoteResult<()> {
        Ok(self.update_records(kind, ids, patch).await?)
    }
}
