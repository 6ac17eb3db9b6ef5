//! Notion HTTP client.

use super::{PageId, PageMeta, RemoteClient};
use crate::config::NotionConfig;
use crate::convert::{rich_text, RemoteBlock};
use crate::error::{RemoteError, Result, SyncError};
use serde_json::{json, Map, Value};
use std::time::Duration;

const API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Maximum children per create or append request, and per embedded
/// children array.
pub const MAX_BATCH: usize = 100;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 500;
const TIMEOUT_SECS: u64 = 30;

/// Client for one Notion database.
pub struct NotionClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    database_id: String,
    title_property: String,
    tags_property: String,
    date_property: String,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("database_id", &self.database_id)
            .finish_non_exhaustive()
    }
}

impl NotionClient {
    /// Build a client from configuration. Token and database id are required.
    pub fn new(config: &NotionConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::ConfigError("Notion token is not set".to_string()))?;
        let database_id = config
            .database_id
            .clone()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                SyncError::ConfigError("Notion database id is not set".to_string())
            })?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build();

        Ok(Self {
            agent,
            base_url: API_BASE.to_string(),
            token,
            database_id,
            title_property: config.title_property.clone(),
            tags_property: config.tags_property.clone(),
            date_property: config.date_property.clone(),
        })
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Page properties object for `meta`.
    fn properties(&self, meta: &PageMeta) -> Value {
        let mut properties = Map::new();
        properties.insert(
            self.title_property.clone(),
            json!({ "title": rich_text(&meta.title) }),
        );
        properties.insert(
            self.tags_property.clone(),
            json!({
                "multi_select": meta
                    .tags
                    .iter()
                    .map(|tag| json!({ "name": tag }))
                    .collect::<Vec<_>>()
            }),
        );
        let date = match meta.date {
            Some(date) => json!({ "start": date.format("%Y-%m-%d").to_string() }),
            None => Value::Null,
        };
        properties.insert(self.date_property.clone(), json!({ "date": date }));
        Value::Object(properties)
    }

    fn title_filter(&self, title: &str) -> Value {
        json!({
            "filter": {
                "property": self.title_property,
                "title": { "equals": title },
            },
            "page_size": 1,
        })
    }

    /// Append `blocks` under `block_id`, nested children included.
    fn append_children(
        &self,
        block_id: &str,
        blocks: &[RemoteBlock],
    ) -> std::result::Result<(), RemoteError> {
        for batch in blocks.chunks(MAX_BATCH) {
            let body = json!({ "children": batch_json(batch) });
            let response =
                self.send("PATCH", &format!("/blocks/{}/children", block_id), Some(&body))?;
            if batch.iter().any(has_deferred) {
                self.append_deferred(batch, &result_ids(&response)?)?;
            }
        }
        Ok(())
    }

    /// Send the children that [`batch_json`] left out of `batch`. `ids` are
    /// the ids of the created blocks, in batch order.
    fn append_deferred(
        &self,
        batch: &[RemoteBlock],
        ids: &[String],
    ) -> std::result::Result<(), RemoteError> {
        if ids.len() < batch.len() {
            return Err(RemoteError::InvalidResponse(format!(
                "{} blocks sent, {} ids returned",
                batch.len(),
                ids.len()
            )));
        }

        for (block, id) in batch.iter().zip(ids) {
            if !has_deferred(block) {
                continue;
            }
            let children = block.children();
            let (embedded, rest) = children.split_at(children.len().min(MAX_BATCH));

            if embedded.iter().any(|child| !child.children().is_empty()) {
                let child_ids = self.list_children(id)?;
                if child_ids.len() < embedded.len() {
                    return Err(RemoteError::InvalidResponse(format!(
                        "block {} has {} children, expected {}",
                        id,
                        child_ids.len(),
                        embedded.len()
                    )));
                }
                for (child, child_id) in embedded.iter().zip(&child_ids) {
                    self.append_children(child_id, child.children())?;
                }
            }

            self.append_children(id, rest)?;
        }
        Ok(())
    }

    fn list_children(&self, block_id: &str) -> std::result::Result<Vec<String>, RemoteError> {
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut path = format!("/blocks/{}/children?page_size={}", block_id, MAX_BATCH);
            if let Some(cursor) = &cursor {
                path.push_str("&start_cursor=");
                path.push_str(cursor);
            }
            let response = self.send("GET", &path, None)?;
            ids.extend(result_ids(&response)?);

            match (response["has_more"].as_bool(), response["next_cursor"].as_str()) {
                (Some(true), Some(next)) => cursor = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(ids)
    }

    /// Send one request, retrying rate limits and server errors.
    fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            let request = self
                .agent
                .request(method, &url)
                .set("Authorization", &format!("Bearer {}", self.token))
                .set("Notion-Version", NOTION_VERSION);
            let result = match body {
                Some(body) => request.send_json(body),
                None => request.call(),
            };

            match result {
                Ok(response) => {
                    return response
                        .into_json::<Value>()
                        .map_err(|e| RemoteError::InvalidResponse(e.to_string()));
                }
                Err(ureq::Error::Status(status, response)) => {
                    if is_retryable(status) && attempt < MAX_RETRIES {
                        let delay = retry_delay(attempt, response.header("Retry-After"));
                        tracing::debug!(
                            "{} {} returned {}, retrying in {:?}",
                            method,
                            path,
                            status,
                            delay
                        );
                        std::thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    let message = response
                        .into_string()
                        .ok()
                        .and_then(|text| api_message(&text))
                        .unwrap_or_default();
                    return Err(RemoteError::Api { status, message });
                }
                // A dropped connection may still have applied a create.
                Err(ureq::Error::Transport(transport)) => {
                    return Err(RemoteError::Transport(transport.to_string()));
                }
            }
        }
    }
}

impl RemoteClient for NotionClient {
    fn create_page(
        &mut self,
        meta: &PageMeta,
        blocks: &[RemoteBlock],
    ) -> std::result::Result<PageId, RemoteError> {
        let (first, rest) = blocks.split_at(blocks.len().min(MAX_BATCH));
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": self.properties(meta),
            "children": batch_json(first),
        });

        let response = self.send("POST", "/pages", Some(&body))?;
        let page_id = response["id"]
            .as_str()
            .ok_or_else(|| RemoteError::InvalidResponse("created page without id".to_string()))?
            .to_string();

        // The page response carries no block ids, so look them up when
        // nested content is still to be sent.
        if first.iter().any(has_deferred) {
            let ids = self.list_children(&page_id)?;
            self.append_deferred(first, &ids)?;
        }
        self.append_children(&page_id, rest)?;
        Ok(page_id)
    }

    fn replace_blocks(
        &mut self,
        page_id: &str,
        blocks: &[RemoteBlock],
    ) -> std::result::Result<(), RemoteError> {
        let existing = self
            .list_children(page_id)
            .map_err(|e| page_missing(e, page_id))?;
        for block_id in &existing {
            self.send("DELETE", &format!("/blocks/{}", block_id), None)?;
        }
        tracing::debug!("cleared {} blocks from page {}", existing.len(), page_id);

        self.append_children(page_id, blocks)
    }

    fn update_properties(
        &mut self,
        page_id: &str,
        meta: &PageMeta,
    ) -> std::result::Result<(), RemoteError> {
        let body = json!({ "properties": self.properties(meta) });
        self.send("PATCH", &format!("/pages/{}", page_id), Some(&body))
            .map_err(|e| page_missing(e, page_id))?;
        Ok(())
    }

    fn find_page(&mut self, title: &str) -> std::result::Result<Option<PageId>, RemoteError> {
        let body = self.title_filter(title);
        let response = self.send(
            "POST",
            &format!("/databases/{}/query", self.database_id),
            Some(&body),
        )?;

        Ok(response["results"]
            .as_array()
            .and_then(|results| results.first())
            .and_then(|page| page["id"].as_str())
            .map(str::to_string))
    }
}

/// Blocks for one request. Each block carries at most its first
/// [`MAX_BATCH`] children, one level deep.
fn batch_json(blocks: &[RemoteBlock]) -> Vec<Value> {
    blocks
        .iter()
        .map(|block| block.to_json_limited(1, MAX_BATCH))
        .collect()
}

/// Whether [`batch_json`] leaves part of `block` out.
fn has_deferred(block: &RemoteBlock) -> bool {
    let children = block.children();
    children.len() > MAX_BATCH
        || children
            .iter()
            .take(MAX_BATCH)
            .any(|child| !child.children().is_empty())
}

/// Ids from the `results` array of a block list response.
fn result_ids(response: &Value) -> std::result::Result<Vec<String>, RemoteError> {
    let results = response["results"]
        .as_array()
        .ok_or_else(|| RemoteError::InvalidResponse("block list without results".to_string()))?;
    Ok(results
        .iter()
        .filter_map(|block| block["id"].as_str())
        .map(str::to_string)
        .collect())
}

/// A 404 from a call addressing the page itself means the page is gone.
fn page_missing(error: RemoteError, page_id: &str) -> RemoteError {
    match error {
        RemoteError::Api { status: 404, .. } => RemoteError::PageNotFound(page_id.to_string()),
        other => other,
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Delay before retry number `attempt`, honouring `Retry-After` seconds.
fn retry_delay(attempt: u32, retry_after: Option<&str>) -> Duration {
    if let Some(seconds) = retry_after.and_then(|v| v.trim().parse::<u64>().ok()) {
        return Duration::from_secs(seconds);
    }
    Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt))
}

/// The `message` field of a Notion error body.
fn api_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["message"].as_str().map(str::to_string)
}
