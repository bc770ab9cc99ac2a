//! Meilisearch over its HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::data::index::SearchIndex;
use crate::error::AppError;
use crate::models::search::{IndexDocument, SearchHit, TaskId, TaskStatus, PRIMARY_KEY};

const SNIPPET_WORDS: u32 = 12;
const ID_PAGE_SIZE: usize = 1000;

pub struct MeiliIndex {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskInfo {
    task_uid: TaskId,
}

#[derive(Debug, Deserialize)]
struct TaskView {
    status: String,
    error: Option<TaskError>,
}

#[derive(Debug, Deserialize)]
struct TaskError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<MeiliHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeiliHit {
    index_id: String,
    name: String,
    path: String,
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "_formatted")]
    formatted: Option<Formatted>,
}

#[derive(Debug, Deserialize)]
struct Formatted {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentPage {
    results: Vec<DocumentKey>,
    total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentKey {
    index_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    number_of_documents: u64,
}

impl MeiliIndex {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, AppError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            http,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn enqueue(&self, req: RequestBuilder) -> Result<TaskId, AppError> {
        let info: TaskInfo = req.send().await?.error_for_status()?.json().await?;
        Ok(info.task_uid)
    }
}

fn task_status_from(view: TaskView) -> TaskStatus {
    match view.status.as_str() {
        "succeeded" => TaskStatus::Succeeded,
        "failed" | "canceled" => TaskStatus::Failed(
            view.error
                .map(|e| e.message)
                .unwrap_or_else(|| format!("task {}", view.status)),
        ),
        _ => TaskStatus::Pending,
    }
}

impl From<MeiliHit> for SearchHit {
    fn from(hit: MeiliHit) -> Self {
        Self {
            index_id: hit.index_id,
            name: hit.name,
            path: hit.path,
            created_at: hit.created_at,
            snippet: hit
                .formatted
                .and_then(|f| f.text)
                .filter(|s| !s.is_empty()),
        }
    }
}

#[async_trait]
impl SearchIndex for MeiliIndex {
    async fn index_exists(&self, index: &str) -> Result<bool, AppError> {
        let response = self
            .request(Method::GET, &format!("/indexes/{index}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    async fn create_index(&self, index: &str, primary_key: &str) -> Result<TaskId, AppError> {
        let body = json!({ "uid": index, "primaryKey": primary_key });
        self.enqueue(self.request(Method::POST, "/indexes").json(&body))
            .await
    }

    async fn upsert(&self, index: &str, documents: &[IndexDocument]) -> Result<TaskId, AppError> {
        let req = self
            .request(Method::POST, &format!("/indexes/{index}/documents"))
            .query(&[("primaryKey", PRIMARY_KEY)])
            .json(documents);
        self.enqueue(req).await
    }

    async fn delete(&self, index: &str, ids: &[String]) -> Result<TaskId, AppError> {
        let req = self
            .request(Method::POST, &format!("/indexes/{index}/documents/delete-batch"))
            .json(ids);
        self.enqueue(req).await
    }

    async fn document_ids(&self, index: &str) -> Result<Vec<String>, AppError> {
        let mut ids = Vec::new();
        loop {
            let page: DocumentPage = self
                .request(Method::GET, &format!("/indexes/{index}/documents"))
                .query(&[
                    ("fields", PRIMARY_KEY.to_string()),
                    ("limit", ID_PAGE_SIZE.to_string()),
                    ("offset", ids.len().to_string()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let fetched = page.results.len();
            ids.extend(page.results.into_iter().map(|doc| doc.index_id));
            if fetched == 0 || ids.len() >= page.total {
                return Ok(ids);
            }
        }
    }

    async fn task_status(&self, task: TaskId) -> Result<TaskStatus, AppError> {
        let response = self
            .request(Method::GET, &format!("/tasks/{task}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("task {task}")));
        }
        let view: TaskView = response.error_for_status()?.json().await?;
        Ok(task_status_from(view))
    }

    async fn search(
        &self,
        index: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        let body = json!({
            "q": query,
            "limit": limit,
            "attributesToCrop": ["text"],
            "cropLength": SNIPPET_WORDS,
            "attributesToHighlight": ["text"],
            "highlightPreTag": "<em>",
            "highlightPostTag": "</em>",
        });
        let response: SearchResponse = self
            .request(Method::POST, &format!("/indexes/{index}/search"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.hits.into_iter().map(SearchHit::from).collect())
    }

    async fn document_count(&self, index: &str) -> Result<u64, AppError> {
        let stats: IndexStats = self
            .request(Method::GET, &format!("/indexes/{index}/stats"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(stats.number_of_documents)
    }
}
