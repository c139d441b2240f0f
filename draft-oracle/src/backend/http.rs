// REST client for the draft backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{BackendError, DraftBackend, PickAccepted, PickStatus};
use crate::config::ApiConfig;
use crate::draft::model::{Draft, DraftSummary, PlayerPool, PlayerPoolCheck, ResumeInfo};

const API_PREFIX: &str = "v1";

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url).map_err(|e| BackendError::Decode {
            op: "parse base URL",
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Decode {
                op: "parse base URL",
                message: format!("{base_url} cannot be used as a base URL"),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| BackendError::Transport {
                op: "build HTTP client",
                source,
            })?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self, BackendError> {
        Self::new(&api.base_url, Duration::from_secs(api.request_timeout_secs))
    }

    /// Build `{base}/v1/{segments...}`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(API_PREFIX).extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        op: &'static str,
        method: Method,
        url: Url,
    ) -> Result<T, BackendError> {
        debug!(%method, %url, "backend request");
        let response = self
            .http
            .request(method, url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| BackendError::Transport { op, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                op,
                status: status.as_u16(),
                detail: error_detail(&body, status),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode {
                op,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl DraftBackend for HttpBackend {
    async fn check_player_pool(&self) -> Result<PlayerPoolCheck, BackendError> {
        let url = self.endpoint(&["player-pool", "check"]);
        self.send("check player pool", Method::GET, url).await
    }

    async fn load_player_pool(&self) -> Result<PlayerPool, BackendError> {
        let url = self.endpoint(&["player-pool"]);
        self.send("fetch player pool", Method::GET, url).await
    }

    async fn create_draft(&self) -> Result<Draft, BackendError> {
        let url = self.endpoint(&["draft"]);
        self.send("create draft", Method::GET, url).await
    }

    async fn get_draft(&self, draft_id: &str) -> Result<Draft, BackendError> {
        let url = self.endpoint(&["drafts", draft_id]);
        self.send("fetch draft", Method::GET, url).await
    }

    async fn list_drafts(&self) -> Result<Vec<DraftSummary>, BackendError> {
        let url = self.endpoint(&["drafts"]);
        match self.send("fetch drafts", Method::GET, url).await {
            // The backend answers 404 when there are no drafts yet.
            Err(BackendError::Status { status: 404, .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn start_pick(
        &self,
        draft_id: &str,
        team_name: &str,
        round: u32,
        pick: u32,
    ) -> Result<PickAccepted, BackendError> {
        let round = round.to_string();
        let pick = pick.to_string();
        let url = self.endpoint(&[
            "drafts",
            draft_id,
            "teams",
            team_name,
            "round",
            &round,
            "pick",
            &pick,
            "select-player-async",
        ]);
        let accepted: PickAccepted = self.send("start pick", Method::POST, url).await?;
        if accepted.status != "accepted" {
            return Err(BackendError::Rejected(format!(
                "pick start not accepted (status {}): {}",
                accepted.status,
                accepted.message.as_deref().unwrap_or("no message")
            )));
        }
        Ok(accepted)
    }

    async fn pick_status(
        &self,
        draft_id: &str,
        round: u32,
        pick: u32,
    ) -> Result<PickStatus, BackendError> {
        let round = round.to_string();
        let pick = pick.to_string();
        let url = self.endpoint(&["drafts", draft_id, "round", &round, "pick", &pick, "status"]);
        self.send("fetch pick status", Method::GET, url).await
    }

    async fn resume_info(&self, draft_id: &str) -> Result<ResumeInfo, BackendError> {
        let url = self.endpoint(&["drafts", draft_id, "resume"]);
        self.send("resume draft", Method::POST, url).await
    }
}

/// Pull `detail` out of a FastAPI-style error body, falling back to the raw
/// body or the status reason.
fn error_detail(body: &str, status: StatusCode) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        match map.get("detail") {
            Some(Value::String(s)) => return s.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        body.trim().to_string()
    }
}
