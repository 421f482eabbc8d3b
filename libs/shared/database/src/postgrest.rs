use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// SQLSTATE for a unique-constraint violation, as reported by PostgREST.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl DbError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Api { status, code, .. } => {
                *status == StatusCode::CONFLICT.as_u16()
                    || code.as_deref() == Some(UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::Api { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }
}

/// Thin client for a PostgREST-compatible API.
///
/// Conditional updates are the one primitive the domain services lean on:
/// `update_where` PATCHes only the rows matching the filter string and
/// returns the post-update rows, so an empty result means the condition no
/// longer held when the update executed.
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl PostgrestClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn headers(&self, extra: Option<HeaderMap>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.service_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(extra) = extra {
            headers.extend(extra);
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(extra_headers));

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            // PostgREST error bodies carry the SQLSTATE in a `code` field.
            let code = serde_json::from_str::<Value>(&error_text)
                .ok()
                .and_then(|v| v.get("code").and_then(Value::as_str).map(String::from));

            return Err(DbError::Api {
                status: status.as_u16(),
                code,
                message: error_text,
            });
        }

        if status == StatusCode::NO_CONTENT {
            // DELETE and PATCH without a representation preference.
            return serde_json::from_value(Value::Null).map_err(|_| DbError::Api {
                status: status.as_u16(),
                code: None,
                message: "empty response where content was expected".to_string(),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// GET rows; `path` carries the table and filter string.
    pub async fn select<T>(&self, path: &str) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, None).await
    }

    /// INSERT returning the created rows.
    pub async fn insert_returning<T>(&self, path: &str, body: Value) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(Method::POST, path, Some(body), Some(representation()))
            .await
    }

    /// Conditional UPDATE: PATCH the rows matching `path`'s filters and
    /// return the post-update rows. An empty Vec means no row satisfied the
    /// filter at execution time.
    pub async fn update_where<T>(&self, path: &str, body: Value) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(Method::PATCH, path, Some(body), Some(representation()))
            .await
    }

    /// DELETE the rows matching `path`'s filters.
    pub async fn delete_where(&self, path: &str) -> Result<(), DbError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let response = self
            .client
            .request(Method::DELETE, &url)
            .headers(self.headers(None))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            let code = serde_json::from_str::<Value>(&error_text)
                .ok()
                .and_then(|v| v.get("code").and_then(Value::as_str).map(String::from));

            return Err(DbError::Api {
                status: status.as_u16(),
                code,
                message: error_text,
            });
        }

        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
