//! reqwest adapter for the entry source and winner selection endpoints.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{EntrySource, WinnerSelector};
use crate::entries::{Entry, EntryStatus};
use crate::error::BackendError;

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub entries_path: String,
    pub draw_path: String,
    pub request_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".into(),
            entries_path: "/entries/current".into(),
            draw_path: "/draw/trigger".into(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Wire shape of `GET entries-for-current-cycle`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    id: String,
    #[serde(default)]
    image_ref: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    owner_ref: String,
    uploaded_at: DateTime<Utc>,
    #[serde(default)]
    is_winner: bool,
}

impl From<EntryRecord> for Entry {
    fn from(r: EntryRecord) -> Self {
        Entry {
            id: r.id,
            image_ref: r.image_ref,
            description: r.description,
            owner_ref: r.owner_ref,
            uploaded_at: r.uploaded_at,
            status: if r.is_winner {
                EntryStatus::Winner
            } else {
                EntryStatus::Pending
            },
        }
    }
}

/// Wire shape of `POST trigger-draw`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawResponse {
    winner_id: String,
    #[serde(default)]
    image_ref: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    owner_ref: String,
    uploaded_at: DateTime<Utc>,
}

impl From<DrawResponse> for Entry {
    fn from(r: DrawResponse) -> Self {
        Entry {
            id: r.winner_id,
            image_ref: r.image_ref,
            description: r.description,
            owner_ref: r.owner_ref,
            uploaded_at: r.uploaded_at,
            status: EntryStatus::Winner,
        }
    }
}

pub struct HttpBackend {
    client: Client,
    entries_url: Url,
    draw_url: Url,
}

impl HttpBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            entries_url: endpoint(&settings.base_url, &settings.entries_path)?,
            draw_url: endpoint(&settings.base_url, &settings.draw_path)?,
        })
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn endpoint(base: &str, path: &str) -> Result<Url, BackendError> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Err(BackendError::InvalidUrl {
            url: base.into(),
            message: "backend base url is empty".into(),
        });
    }
    let joined = format!("{base}/{}", path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| BackendError::InvalidUrl {
        url: joined.clone(),
        message: e.to_string(),
    })
}

#[async_trait]
impl EntrySource for HttpBackend {
    async fn fetch_entries(&self) -> Result<Vec<Entry>, BackendError> {
        let resp = self.client.get(self.entries_url.clone()).send().await?;
        let records: Vec<EntryRecord> = Self::check(resp).await?.json().await?;
        Ok(records.into_iter().map(Entry::from).collect())
    }
}

#[async_trait]
impl WinnerSelector for HttpBackend {
    async fn trigger_draw(&self) -> Result<Entry, BackendError> {
        let resp = self.client.post(self.draw_url.clone()).send().await?;
        let result: DrawResponse = Self::check(resp).await?.json().await?;
        Ok(result.into())
    }
}
