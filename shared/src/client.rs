//! Typed client for the `tasks` collection.
//!
//! Talks PostgREST conventions (`?id=eq.N`, `Prefer: return=representation`)
//! either to the upstream store directly or through the proxy, which accepts
//! already-namespaced `/rest/v1/...` paths.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::REST_ROOT;
use crate::models::{NewTask, Status, StatusPatch, Task, TaskUpdate};
use crate::{Config, Error, Result};

/// Operations the planner needs from wherever tasks are stored.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetch the whole collection, ordered by date and time.
    async fn select_all(&self) -> Result<Vec<Task>>;

    /// Insert a new task and return the stored row.
    async fn insert(&self, task: &NewTask) -> Result<Task>;

    /// Replace every editable field of a task.
    async fn update(&self, id: i64, task: &TaskUpdate) -> Result<Task>;

    /// Change only the status column.
    async fn update_status(&self, id: i64, status: Status) -> Result<Task>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// HTTP implementation of [`TaskStore`].
#[derive(Debug, Clone)]
pub struct TasksClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl TasksClient {
    /// Create a client bound to `base_url` (upstream store or proxy).
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: "tasks".to_string(),
        }
    }

    /// Build from configuration, preferring the proxy when one is set.
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        Self::new(http, config.client_base_url(), config.api_key.clone())
            .with_table(config.default_collection.clone())
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn collection_url(&self) -> String {
        format!("{}{}/{}", self.base_url, REST_ROOT, self.table)
    }

    fn request(&self, method: Method, query: &str) -> RequestBuilder {
        let url = format!("{}?{}", self.collection_url(), query);
        debug!(method = %method, url = %url, "Calling tasks collection");
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
    }

    async fn expect_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "Tasks request rejected upstream");
        Err(Error::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>> {
        let response = Self::expect_success(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn single_row(response: Response, id: Option<i64>) -> Result<Task> {
        Self::rows::<Task>(response).await?.into_iter().next().ok_or_else(|| match id {
            Some(id) => Error::NotFound(format!("task {}", id)),
            None => Error::Internal("Upstream returned no representation".to_string()),
        })
    }
}

#[async_trait]
impl TaskStore for TasksClient {
    async fn select_all(&self) -> Result<Vec<Task>> {
        let response = self
            .request(
                Method::GET,
                "select=*&order=year.asc,month.asc,day.asc,time.asc",
            )
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn insert(&self, task: &NewTask) -> Result<Task> {
        let record = task.to_record()?;
        let response = self
            .request(Method::POST, "select=*")
            .header("prefer", "return=representation")
            .json(&record)
            .send()
            .await?;
        Self::single_row(response, None).await
    }

    async fn update(&self, id: i64, task: &TaskUpdate) -> Result<Task> {
        let record = task.to_record()?;
        let response = self
            .request(Method::PATCH, &format!("id=eq.{}&select=*", id))
            .header("prefer", "return=representation")
            .json(&record)
            .send()
            .await?;
        Self::single_row(response, Some(id)).await
    }

    async fn update_status(&self, id: i64, status: Status) -> Result<Task> {
        let response = self
            .request(Method::PATCH, &format!("id=eq.{}&select=*", id))
            .header("prefer", "return=representation")
            .json(&StatusPatch { status })
            .send()
            .await?;
        Self::single_row(response, Some(id)).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("id=eq.{}", id))
            .header("prefer", "return=representation")
            .send()
            .await?;
        let deleted: Vec<serde_json::Value> = Self::rows(response).await?;
        if deleted.is_empty() {
            return Err(Error::NotFound(format!("task {}", id)));
        }
        Ok(())
    }
}
